// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! A request-scoped working copy of a source document.
//!
//! The orchestrator rewrites the source several times during one request.
//! Those intermediate texts live here, never in the registry, so there is
//! nothing to restore afterwards: dropping the overlay discards them.

use lsp_types::TextEdit;

use crate::document::TextDocument;
use crate::region::EmbeddedTree;
use crate::registry::{DocumentRegistry, Source};

pub struct Overlay<'a> {
    registry: &'a dyn DocumentRegistry,
    document: TextDocument,
    tree: Option<EmbeddedTree>,
}

impl<'a> Overlay<'a> {
    pub fn new(registry: &'a dyn DocumentRegistry, source: Source) -> Self {
        Self {
            registry,
            document: source.snapshot,
            tree: Some(source.tree),
        }
    }

    /// The current working text. Its URI is the source URI.
    pub fn document(&self) -> &TextDocument {
        &self.document
    }

    /// The tree of the current working text, if it still embeds anything.
    pub fn tree(&self) -> Option<&EmbeddedTree> {
        self.tree.as_ref()
    }

    /// Apply one batch of edits against the current text and rebuild the tree.
    pub fn apply(&mut self, edits: &[TextEdit]) {
        if edits.is_empty() {
            return;
        }
        self.document = self.document.with_edits(edits);
        self.tree = self.registry.materialize(&self.document);
        tracing::debug!(
            "Applied {} edit(s) to working copy of {} (version {})",
            edits.len(),
            self.document.uri(),
            self.document.version()
        );
    }

    pub fn into_document(self) -> TextDocument {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{Mapping, RangeMapper};
    use crate::region::Region;
    use crate::registry::{DocumentStore, EmbeddingLanguage};
    use std::sync::Arc;

    struct Whole;

    impl EmbeddingLanguage for Whole {
        fn language_id(&self) -> &str {
            "whole"
        }

        fn create_tree(&self, document: &TextDocument) -> Option<EmbeddedTree> {
            let mut tree = EmbeddedTree::new(Region::new(
                "root",
                TextDocument::new("embedded", "whole", 1, &document.text()),
            ));
            tree.add_mappings(
                "root",
                document.uri(),
                RangeMapper::new(vec![Mapping::identity(0..document.len())]),
            );
            Some(tree)
        }
    }

    #[test]
    fn test_apply_rebuilds_tree_without_touching_registry() {
        let store = DocumentStore::new().with_language(Arc::new(Whole));
        store.open(TextDocument::new("file:///a.w", "whole", 1, "abc"));
        let source = store.source("file:///a.w").unwrap();

        let mut overlay = Overlay::new(&store, source);
        let edit = TextEdit {
            range: overlay.document().to_range(0..1),
            new_text: "xyz".to_string(),
        };
        overlay.apply(&[edit]);

        assert_eq!(overlay.document().text(), "xyzbc");
        assert_eq!(overlay.document().uri(), "file:///a.w");
        let tree = overlay.tree().unwrap();
        assert_eq!(tree.root().document().text(), "xyzbc");
        assert_eq!(
            tree.mapper_for("root", "file:///a.w").unwrap().mappings()[0].source,
            0..5
        );

        drop(overlay);
        assert_eq!(store.text_document("file:///a.w").unwrap().text(), "abc");
        assert_eq!(store.source("file:///a.w").unwrap().snapshot.version(), 1);
    }

    #[test]
    fn test_empty_batch_keeps_version() {
        let store = DocumentStore::new().with_language(Arc::new(Whole));
        store.open(TextDocument::new("file:///a.w", "whole", 4, "abc"));
        let mut overlay = Overlay::new(&store, store.source("file:///a.w").unwrap());
        overlay.apply(&[]);
        assert_eq!(overlay.into_document().version(), 4);
    }
}
