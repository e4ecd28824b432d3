// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Level-by-level formatting of an embedding tree.
//!
//! # How it works
//!
//! For each breadth-first level of the tree, starting at the root:
//!
//! 1. Every region with formatting enabled and a mapping set against the
//!    working document is handed to the provider registry, with the request
//!    range (or on-type position) translated into the region's coordinates
//! 2. The returned edits are translated back; edits that fall outside the
//!    mapping set are dropped. A block region's opening and closing line
//!    breaks survive the edit (see [`crate::reflow::keep_boundary_breaks`])
//! 3. All edits of the level are applied to the working copy as one batch,
//!    which rebuilds the tree so deeper levels see the new text
//! 4. Below the root, regions that were range-formatted are re-indented to
//!    the column they are embedded at (see [`crate::reflow`])
//!
//! The loop stops at the first empty level. Files are processed one at a
//! time: every batch shifts offsets in the working document, so mappings are
//! only valid against the text they were built from.

use std::collections::HashMap;

use lsp_types::{FormattingOptions, Position, Range, TextEdit};

use crate::config::indent_unit;
use crate::document::TextDocument;
use crate::mapper::{DocumentMap, RangeMapper};
use crate::overlay::Overlay;
use crate::provider::FormatProviderRegistry;
use crate::reflow::{keep_boundary_breaks, reflow_edits};
use crate::region::{DocumentFormatting, EmbeddedTree, Region};
use crate::traversal::LevelTraversal;

/// What the user asked to have formatted, in outer-document coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatTrigger {
    /// The whole working document, re-measured at every level.
    Document,
    Range(Range),
    OnType { position: Position, ch: String },
}

impl FormatTrigger {
    fn range_in(&self, document: &TextDocument) -> Option<Range> {
        match self {
            FormatTrigger::Document => Some(document.full_range()),
            FormatTrigger::Range(range) => Some(*range),
            FormatTrigger::OnType { .. } => None,
        }
    }
}

/// A region captured from the tree for one level, detached from the tree
/// so the working copy can change while it is being formatted.
struct LevelFile {
    name: String,
    document: TextDocument,
    formatting: DocumentFormatting,
    mapper: RangeMapper,
}

impl LevelFile {
    fn capture(region: &Region, tree: &EmbeddedTree, owner_uri: &str) -> Option<Self> {
        let formatting = region.formatting_enabled()?;
        let mapper = tree.mapper_for(region.name(), owner_uri)?;
        Some(Self {
            name: region.name().to_string(),
            document: region.document().clone(),
            formatting,
            mapper: mapper.clone(),
        })
    }
}

pub struct FormatOrchestrator<'p> {
    providers: &'p FormatProviderRegistry,
    options: FormattingOptions,
    /// Language id -> wants a nested indent baseline.
    initial_indent: HashMap<String, bool>,
}

impl<'p> FormatOrchestrator<'p> {
    pub fn new(
        providers: &'p FormatProviderRegistry,
        options: FormattingOptions,
        initial_indent: HashMap<String, bool>,
    ) -> Self {
        Self {
            providers,
            options,
            initial_indent,
        }
    }

    /// Format every level of the overlay's tree in place.
    ///
    /// Returns the number of non-empty levels visited.
    pub async fn run(&self, overlay: &mut Overlay<'_>, trigger: &FormatTrigger) -> usize {
        let owner_uri = overlay.document().uri().to_string();
        let Some(root_name) = overlay.tree().map(|tree| tree.root().name().to_string()) else {
            return 0;
        };
        let mut traversal = LevelTraversal::new(root_name);

        let mut level = 0;
        loop {
            let Some(tree) = overlay.tree() else {
                break;
            };
            let regions = traversal.level_of(level, tree);
            if regions.is_empty() {
                break;
            }
            let files: Vec<LevelFile> = regions
                .into_iter()
                .filter_map(|region| LevelFile::capture(region, tree, &owner_uri))
                .collect();

            let mut batch = Vec::new();
            let mut touched = Vec::new();
            for file in &files {
                let (edits, was_touched) = self.format_file(overlay.document(), file, trigger).await;
                if was_touched {
                    touched.push(file);
                }
                batch.extend(edits);
            }

            if !batch.is_empty() {
                tracing::debug!("Level {}: applying {} edit(s)", level, batch.len());
                overlay.apply(&batch);
            }

            if level > 0 && !touched.is_empty() {
                let reflow = self.reflow(overlay, &touched, &owner_uri);
                if !reflow.is_empty() {
                    tracing::debug!("Level {}: applying {} reindent edit(s)", level, reflow.len());
                    overlay.apply(&reflow);
                }
            }

            level += 1;
        }
        level
    }

    /// Format one file and translate the result into outer coordinates.
    ///
    /// The flag is set when a range request produced edits for the file.
    async fn format_file(
        &self,
        outer: &TextDocument,
        file: &LevelFile,
        trigger: &FormatTrigger,
    ) -> (Vec<TextEdit>, bool) {
        let map = DocumentMap::new(outer, &file.document, &file.mapper);

        let (result, touched) = match trigger {
            FormatTrigger::OnType { position, ch } => {
                let Some(position) = map.to_generated_position(*position) else {
                    return (Vec::new(), false);
                };
                let result = self
                    .providers
                    .format_on_type(&file.document, position, ch, &self.options)
                    .await;
                (result, false)
            }
            FormatTrigger::Document | FormatTrigger::Range(_) => {
                let Some(range) = trigger.range_in(outer) else {
                    return (Vec::new(), false);
                };
                let Some(target) = map
                    .to_generated_range(range)
                    .or_else(|| map.enclosing_generated_range(range))
                else {
                    return (Vec::new(), false);
                };
                let result = self
                    .providers
                    .format(&file.document, target, &self.options)
                    .await;
                let touched = result.is_some();
                (result, touched)
            }
        };

        let edits = result
            .unwrap_or_default()
            .into_iter()
            .map(|edit| keep_boundary_breaks(&file.document, file.formatting, edit))
            .filter_map(|edit| match map.to_source_range(edit.range) {
                Some(range) => Some(TextEdit {
                    range,
                    new_text: edit.new_text,
                }),
                None => {
                    tracing::debug!(
                        "Dropping edit at {:?} in {}: outside every mapping",
                        edit.range,
                        file.name
                    );
                    None
                }
            })
            .collect();
        (edits, touched)
    }

    /// Reindent edits for the touched files against the current working text.
    fn reflow(&self, overlay: &Overlay<'_>, touched: &[&LevelFile], owner_uri: &str) -> Vec<TextEdit> {
        let Some(tree) = overlay.tree() else {
            return Vec::new();
        };
        let unit = indent_unit(&self.options);

        let mut edits = Vec::new();
        for file in touched {
            let Some(mapper) = tree.mapper_for(&file.name, owner_uri) else {
                continue;
            };
            let nested = if self
                .initial_indent
                .get(file.document.language_id())
                .copied()
                .unwrap_or(false)
            {
                unit.as_str()
            } else {
                ""
            };
            edits.extend(reflow_edits(
                overlay.document(),
                mapper,
                nested,
                file.formatting,
            ));
        }
        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::mapper::Mapping;
    use crate::provider::FormatProvider;
    use crate::region::embedded_uri;
    use crate::registry::{DocumentRegistry, DocumentStore, EmbeddingLanguage, Source};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// `[...]` spans become child regions of the root, recursively.
    struct Brackets;

    fn collect(
        text: &str,
        base: usize,
        parent: &mut Region,
        maps: &mut Vec<(String, RangeMapper)>,
        source_uri: &str,
        counter: &mut usize,
    ) {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'[' {
                let mut depth = 0;
                let mut j = i;
                while j < bytes.len() {
                    match bytes[j] {
                        b'[' => depth += 1,
                        b']' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                if j >= bytes.len() {
                    return;
                }
                let inner = &text[i + 1..j];
                let name = format!("b{}", counter);
                *counter += 1;
                let uri = embedded_uri(source_uri, "brackets", &name);
                let mut child = Region::new(&name, TextDocument::new(uri, "brackets", 1, inner))
                    .with_formatting(DocumentFormatting::Flag(true));
                collect(inner, base + i + 1, &mut child, maps, source_uri, counter);
                maps.push((
                    name,
                    RangeMapper::new(vec![Mapping::new(base + i + 1..base + j, 0..inner.len())]),
                ));
                parent.push_child(child);
                i = j + 1;
            } else {
                i += 1;
            }
        }
    }

    impl EmbeddingLanguage for Brackets {
        fn language_id(&self) -> &str {
            "brackets"
        }

        fn create_tree(&self, document: &TextDocument) -> Option<EmbeddedTree> {
            let text = document.text();
            let uri = embedded_uri(document.uri(), "brackets", "root");
            let mut root = Region::new("root", TextDocument::new(uri, "brackets", 1, &text))
                .with_formatting(DocumentFormatting::Flag(true));
            let mut maps = Vec::new();
            let mut counter = 0;
            collect(&text, 0, &mut root, &mut maps, document.uri(), &mut counter);

            let mut tree = EmbeddedTree::new(root);
            tree.add_mappings("root", document.uri(), RangeMapper::new(vec![Mapping::identity(0..text.len())]));
            for (name, mapper) in maps {
                tree.add_mappings(name, document.uri(), mapper);
            }
            Some(tree)
        }
    }

    /// Uppercases every lowercase `x` it is shown, recording the text it saw.
    #[derive(Default)]
    struct Upper {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FormatProvider for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        async fn format(
            &self,
            document: &TextDocument,
            range: Range,
            _options: &FormattingOptions,
        ) -> Result<Option<Vec<TextEdit>>, FormatError> {
            let text = document.text_in(range);
            self.seen.lock().unwrap().push(text.clone());
            let offsets = document.to_offsets(range);
            let edits: Vec<TextEdit> = text
                .match_indices('x')
                .map(|(i, _)| TextEdit {
                    range: document.to_range(offsets.start + i..offsets.start + i + 1),
                    new_text: "X".to_string(),
                })
                .collect();
            Ok(Some(edits))
        }
    }

    async fn run(text: &str, trigger: FormatTrigger, provider: Arc<Upper>) -> (String, usize) {
        let store = DocumentStore::new().with_language(Arc::new(Brackets));
        store.open(TextDocument::new("file:///a.b", "brackets", 1, text));
        let providers = FormatProviderRegistry::new().with_provider(provider);
        let orchestrator = FormatOrchestrator::new(&providers, FormattingOptions::default(), HashMap::new());

        let mut overlay = Overlay::new(&store, store.source("file:///a.b").unwrap());
        let levels = orchestrator.run(&mut overlay, &trigger).await;
        let text = overlay.into_document().text();
        assert_eq!(store.text_document("file:///a.b").unwrap().version(), 1);
        (text, levels)
    }

    #[tokio::test]
    async fn test_every_level_is_visited() {
        let upper = Arc::new(Upper::default());
        let (text, levels) = run("a[b[c[d]]]", FormatTrigger::Document, upper.clone()).await;
        assert_eq!(text, "a[b[c[d]]]");
        assert_eq!(levels, 4);
        assert_eq!(
            *upper.seen.lock().unwrap(),
            vec!["a[b[c[d]]]", "b[c[d]]", "c[d]", "d"]
        );
    }

    #[tokio::test]
    async fn test_range_outside_region_skips_it() {
        let upper = Arc::new(Upper::default());
        let range = Range::new(Position::new(0, 0), Position::new(0, 2));
        let (text, _) = run("xx[x]", FormatTrigger::Range(range), upper.clone()).await;
        assert_eq!(text, "XX[x]");
        assert_eq!(upper.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_on_type_never_range_formats() {
        let upper = Arc::new(Upper::default());
        let trigger = FormatTrigger::OnType {
            position: Position::new(0, 3),
            ch: "x".to_string(),
        };
        let (text, levels) = run("x[x]", trigger, upper.clone()).await;
        assert_eq!(text, "x[x]");
        assert_eq!(levels, 2);
        assert!(upper.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_region_without_mappings_is_skipped() {
        let store = DocumentStore::new();
        let providers = FormatProviderRegistry::new();
        let orchestrator = FormatOrchestrator::new(&providers, FormattingOptions::default(), HashMap::new());
        let tree = EmbeddedTree::new(Region::new("root", TextDocument::new("r", "t", 1, "")));
        let source = Source {
            uri: "file:///a".to_string(),
            snapshot: TextDocument::new("file:///a", "t", 1, "text"),
            tree,
        };
        let mut overlay = Overlay::new(&store, source);
        // The root has no mapping set against the document, so nothing runs;
        // the level still counts as visited.
        assert_eq!(orchestrator.run(&mut overlay, &FormatTrigger::Document).await, 1);
        assert!(store.source("file:///a").is_none());
    }
}
