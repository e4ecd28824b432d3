// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! `<script>` and `<style>` bodies in HTML.

use crate::document::TextDocument;
use crate::region::{DocumentFormatting, EmbeddedTree};
use crate::registry::EmbeddingLanguage;

use super::{normalize_language, EmbeddedBlock};

/// Script and style bodies are standalone code: they get their own lines.
const BODY_FORMATTING: DocumentFormatting = DocumentFormatting::Block {
    insert_first_newline: true,
    insert_final_newline: true,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlEmbedding;

impl EmbeddingLanguage for HtmlEmbedding {
    fn language_id(&self) -> &str {
        "html"
    }

    fn create_tree(&self, document: &TextDocument) -> Option<EmbeddedTree> {
        super::create_tree(self, document)
    }
}

/// Find the bodies of `<script>` and `<style>` elements, in document order.
pub(crate) fn scan(text: &str) -> Vec<EmbeddedBlock> {
    let lower = text.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(found) = lower[pos..].find('<') {
        let open = pos + found;
        let rest = &lower[open..];

        if rest.starts_with("<!--") {
            pos = match rest.find("-->") {
                Some(end) => open + end + 3,
                None => break,
            };
            continue;
        }

        let Some(tag) = ["script", "style"]
            .into_iter()
            .find(|tag| starts_with_tag(&rest[1..], tag))
        else {
            pos = open + 1;
            continue;
        };

        let Some(tag_end) = lower[open..].find('>').map(|i| open + i) else {
            break;
        };
        let body_start = tag_end + 1;
        // `<script />` has no body.
        if text[..tag_end].ends_with('/') {
            pos = body_start;
            continue;
        }

        let attributes = parse_attributes(&text[open + 1 + tag.len()..tag_end]);
        let close_tag = format!("</{tag}");
        let Some(body_end) = lower[body_start..].find(&close_tag).map(|i| body_start + i) else {
            break;
        };

        if let Some(language_id) = body_language(tag, &attributes) {
            blocks.push(EmbeddedBlock {
                language_id,
                content: body_start..body_end,
                formatting: BODY_FORMATTING,
            });
        }
        pos = body_end + close_tag.len();
    }
    blocks
}

/// `rest` starts right after `<`; the tag name must end there.
fn starts_with_tag(rest: &str, tag: &str) -> bool {
    rest.starts_with(tag)
        && rest[tag.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace())
}

fn body_language(tag: &str, attributes: &[(String, String)]) -> Option<String> {
    let attribute = |name: &str| {
        attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.to_ascii_lowercase())
    };

    if let Some(lang) = attribute("lang") {
        return Some(normalize_language(&lang));
    }
    match tag {
        "style" => Some("css".to_string()),
        _ => match attribute("type").as_deref() {
            None | Some("") | Some("module") | Some("text/javascript")
            | Some("application/javascript") => Some("javascript".to_string()),
            Some("application/json") | Some("application/ld+json") | Some("importmap") => {
                Some("json".to_string())
            }
            // Templates and other opaque payloads are left alone.
            Some(_) => None,
        },
    }
}

/// Attributes of a start tag: `name`, `name=value`, `name="value"`, `name='value'`.
fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() || c == '/' {
            chars.next();
            continue;
        }

        let mut name_end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '/' {
                break;
            }
            name_end = i + c.len_utf8();
            chars.next();
        }
        let name = source[start..name_end].to_ascii_lowercase();

        while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            chars.next();
        }
        let mut value = String::new();
        if chars.peek().is_some_and(|(_, c)| *c == '=') {
            chars.next();
            while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
                chars.next();
            }
            match chars.peek().map(|(_, c)| *c) {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    for (_, c) in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }

        if !name.is_empty() {
            attributes.push((name, value));
        }
    }
    attributes
}
