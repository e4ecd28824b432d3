// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Built-in embedding languages.
//!
//! Each language knows how to find the blocks embedded directly in a piece
//! of its own text. Trees are built recursively from those scanners: a block
//! whose language also has a scanner is scanned in turn, so a markdown fence
//! holding HTML holding a `<script>` yields three levels. Every mapping set
//! is expressed in offsets of the root document.
//!
//! Region names are positional (`root`, `root.0`, `root.0.1`, ...), so
//! rebuilding the tree from edited text keeps the names of regions that
//! survived the edit.

pub mod html;
pub mod markdown;

use std::ops::Range as OffsetRange;

use crate::document::TextDocument;
use crate::mapper::{Mapping, RangeMapper};
use crate::region::{embedded_uri, DocumentFormatting, EmbeddedTree, Region};
use crate::registry::EmbeddingLanguage;

pub use html::HtmlEmbedding;
pub use markdown::MarkdownEmbedding;

/// Name of the root region of every built-in tree.
pub const ROOT_REGION: &str = "root";

/// A block found by a scanner, relative to the text that was scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock {
    pub language_id: String,
    pub content: OffsetRange<usize>,
    pub formatting: DocumentFormatting,
}

/// Canonical language id for a fence tag or `lang` attribute.
pub fn normalize_language(tag: &str) -> String {
    let tag = tag.trim().to_ascii_lowercase();
    let canonical = match tag.as_str() {
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "mts" | "cts" => "typescript",
        "md" => "markdown",
        "py" => "python",
        "rs" => "rust",
        "sh" | "bash" | "zsh" => "shellscript",
        "yml" => "yaml",
        "htm" => "html",
        _ => return tag,
    };
    canonical.to_string()
}

fn scan(language_id: &str, text: &str) -> Vec<EmbeddedBlock> {
    match language_id {
        "html" => html::scan(text),
        "markdown" => markdown::scan(text),
        _ => Vec::new(),
    }
}

/// Build the full tree of `document`, whose own language is the root's.
pub fn build_tree(document: &TextDocument) -> EmbeddedTree {
    let text = document.text();
    let builder = TreeBuilder {
        source_uri: document.uri(),
        version: document.version(),
    };

    let mut root = builder
        .region(ROOT_REGION, document.language_id(), &text)
        .with_formatting(DocumentFormatting::Flag(true));
    let mut mappings = vec![(
        ROOT_REGION.to_string(),
        RangeMapper::new(vec![Mapping::identity(0..text.len())]),
    )];
    builder.collect_children(&mut root, &text, 0, &mut mappings);

    let mut tree = EmbeddedTree::new(root);
    for (name, mapper) in mappings {
        tree.add_mappings(name, document.uri(), mapper);
    }
    tree
}

struct TreeBuilder<'a> {
    source_uri: &'a str,
    version: i32,
}

impl TreeBuilder<'_> {
    fn region(&self, name: &str, language_id: &str, text: &str) -> Region {
        let uri = embedded_uri(self.source_uri, language_id, name);
        Region::new(name, TextDocument::new(uri, language_id, self.version, text))
    }

    /// `base` is the root offset of `text`.
    fn collect_children(
        &self,
        parent: &mut Region,
        text: &str,
        base: usize,
        mappings: &mut Vec<(String, RangeMapper)>,
    ) {
        let blocks = scan(parent.language_id(), text);
        for (index, block) in blocks.into_iter().enumerate() {
            let Some(content) = text.get(block.content.clone()) else {
                continue;
            };
            let name = format!("{}.{}", parent.name(), index);
            let mut child = self
                .region(&name, &block.language_id, content)
                .with_formatting(block.formatting);

            let start = base + block.content.start;
            self.collect_children(&mut child, content, start, mappings);
            mappings.push((
                name,
                RangeMapper::new(vec![Mapping::new(
                    start..start + content.len(),
                    0..content.len(),
                )]),
            ));
            parent.push_child(child);
        }
    }
}

pub(crate) fn create_tree(language: &dyn EmbeddingLanguage, document: &TextDocument) -> Option<EmbeddedTree> {
    if document.language_id() != language.language_id() {
        return None;
    }
    Some(build_tree(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("JS"), "javascript");
        assert_eq!(normalize_language(" ts "), "typescript");
        assert_eq!(normalize_language("bash"), "shellscript");
        assert_eq!(normalize_language("css"), "css");
        assert_eq!(normalize_language("Go"), "go");
    }

    #[test]
    fn test_nested_tree_uses_root_offsets() {
        let text = "# Doc\n\n```html\n<p>\n<script>\nlet a = 1;\n</script>\n</p>\n```\n";
        let document = TextDocument::new("file:///doc.md", "markdown", 3, text);
        let tree = build_tree(&document);

        assert_eq!(tree.depth(), 2);
        let fence = tree.region("root.0").unwrap();
        assert_eq!(fence.language_id(), "html");
        assert_eq!(fence.document().version(), 3);
        let script = tree.region("root.0.0").unwrap();
        assert_eq!(script.language_id(), "javascript");
        assert_eq!(script.document().text(), "\nlet a = 1;\n");

        let mapper = tree.mapper_for("root.0.0", "file:///doc.md").unwrap();
        let source = mapper.mappings()[0].source.clone();
        assert_eq!(&text[source], "\nlet a = 1;\n");
        assert!(tree.mapper_for("root", "file:///doc.md").is_some());
    }

    #[test]
    fn test_names_are_stable_across_rebuilds() {
        let before = TextDocument::new("file:///a.html", "html", 1, "<style>a{}</style><script>x</script>");
        let after = TextDocument::new("file:///a.html", "html", 2, "<style>\na {}\n</style>\n<script>\nx;\n</script>");
        let names = |tree: &EmbeddedTree| -> Vec<String> {
            tree.root().children().iter().map(|c| c.name().to_string()).collect()
        };
        assert_eq!(names(&build_tree(&before)), names(&build_tree(&after)));
        assert_eq!(build_tree(&after).region("root.1").unwrap().document().text(), "\nx;\n");
    }
}
