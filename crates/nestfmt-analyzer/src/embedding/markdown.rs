// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Fenced code blocks in Markdown.
//!
//! A fence opens with three or more backticks or tildes, indented by at most
//! three spaces, followed by an info string whose first word is the block's
//! language. It closes with a run of the same character at least as long,
//! again indented by at most three spaces and followed only by whitespace.
//! Blocks without a language and blocks never closed are not regions.
//!
//! A body runs from the line break ending the opening fence line to the
//! closing fence marker, like a `<script>` body runs from `>` to `</`. The
//! fence line is then the line reflow measures indentation from, and the
//! closing marker keeps its place when the body is replaced.

use crate::document::TextDocument;
use crate::region::{DocumentFormatting, EmbeddedTree};
use crate::registry::EmbeddingLanguage;

use super::{normalize_language, EmbeddedBlock};

/// Both fence lines must stay on lines of their own.
const FENCE_FORMATTING: DocumentFormatting = DocumentFormatting::Block {
    insert_first_newline: true,
    insert_final_newline: true,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownEmbedding;

impl EmbeddingLanguage for MarkdownEmbedding {
    fn language_id(&self) -> &str {
        "markdown"
    }

    fn create_tree(&self, document: &TextDocument) -> Option<EmbeddedTree> {
        super::create_tree(self, document)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

struct OpenFence {
    fence: Fence,
    language_id: Option<String>,
    content_start: usize,
}

/// Find the bodies of fenced code blocks, in document order.
pub(crate) fn scan(text: &str) -> Vec<EmbeddedBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<OpenFence> = None;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let next_line = line_start + line.len();
        let content = line.trim_end_matches(['\n', '\r']);

        match open.take() {
            None => {
                if let Some((fence, info)) = opening_fence(content) {
                    let tag = info.split_whitespace().next().unwrap_or("");
                    open = Some(OpenFence {
                        fence,
                        language_id: (!tag.is_empty()).then(|| normalize_language(tag)),
                        content_start: line_start + content.len(),
                    });
                }
            }
            Some(current) => {
                if let Some(indent) = closing_indent(content, current.fence) {
                    if let Some(language_id) = current.language_id {
                        blocks.push(EmbeddedBlock {
                            language_id,
                            content: current.content_start..line_start + indent,
                            formatting: FENCE_FORMATTING,
                        });
                    }
                } else {
                    open = Some(current);
                }
            }
        }

        line_start = next_line;
    }
    blocks
}

/// Leading run of `marker` after at most three spaces of indentation.
fn fence_run(line: &str) -> Option<(Fence, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.len() - rest.trim_start_matches(marker).len();
    (len >= 3).then(|| (Fence { marker, len }, &rest[len..]))
}

fn opening_fence(line: &str) -> Option<(Fence, &str)> {
    let (fence, info) = fence_run(line)?;
    // Backtick fences cannot have backticks in their info string.
    if fence.marker == '`' && info.contains('`') {
        return None;
    }
    Some((fence, info.trim()))
}

/// Indentation of `line` when it closes `open`.
fn closing_indent(line: &str, open: Fence) -> Option<usize> {
    let (fence, rest) = fence_run(line)?;
    let closes = fence.marker == open.marker && fence.len >= open.len && rest.trim().is_empty();
    closes.then(|| line.len() - line.trim_start_matches(' ').len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bodies(text: &str) -> Vec<(String, &str)> {
        scan(text)
            .into_iter()
            .map(|block| (block.language_id, &text[block.content]))
            .collect()
    }

    #[test]
    fn test_fences_with_language() {
        let text = "# Title\n\n```js\nlet a;\n```\n\n~~~ css {.class}\na {}\n~~~\n";
        assert_eq!(
            bodies(text),
            vec![
                ("javascript".to_string(), "\nlet a;\n"),
                ("css".to_string(), "\na {}\n"),
            ]
        );
        assert!(scan(text).iter().all(|b| b.formatting == FENCE_FORMATTING));
    }

    #[test]
    fn test_fence_without_language_is_skipped_but_consumed() {
        // The js fence inside the untagged block is just text.
        let text = "```\n```js\n```\n```rust\nfn main() {}\n```\n";
        assert_eq!(bodies(text), vec![("rust".to_string(), "\nfn main() {}\n")]);
    }

    #[test]
    fn test_closing_fence_rules() {
        // Shorter runs, other markers and trailing text do not close.
        let text = "````md\n```js\nx\n```\n~~~~\n```` trailing\n````\n";
        assert_eq!(
            bodies(text),
            vec![(
                "markdown".to_string(),
                "\n```js\nx\n```\n~~~~\n```` trailing\n"
            )]
        );
    }

    #[test]
    fn test_indentation_limits() {
        // The closing marker's indentation belongs to the body.
        assert_eq!(
            bodies("   ```py\nx = 1\n   ```\n"),
            vec![("python".to_string(), "\nx = 1\n   ")]
        );
        assert!(scan("    ```py\nx = 1\n    ```\n").is_empty());
    }

    #[test]
    fn test_unclosed_fence_is_not_a_region() {
        assert!(scan("```js\nlet a;\n").is_empty());
    }

    #[test]
    fn test_crlf_and_empty_body() {
        assert_eq!(
            bodies("```ts\r\nlet a;\r\n```\r\n```css\n```"),
            vec![
                ("typescript".to_string(), "\r\nlet a;\r\n"),
                ("css".to_string(), "\n"),
            ]
        );
    }

    #[test]
    fn test_backticks_in_info_string() {
        assert!(scan("``` a`b\nx\n```\n").is_empty());
    }
}
