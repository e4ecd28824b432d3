// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Embedded regions and the tree they form.
//!
//! A [`Region`] is a virtual sub-document in its own language. Regions own
//! their children, but everything else refers to a region by its stable
//! name: mapping sets live in an index on the [`EmbeddedTree`] keyed by that
//! name, so a tree rebuilt from new text can be queried with the same keys.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::document::TextDocument;
use crate::mapper::RangeMapper;

/// Scheme used for the URIs of embedded region documents.
pub const EMBEDDED_SCHEME: &str = "nestfmt-embedded";

const HOST_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b':')
    .add(b'@')
    .add(b'%');

/// Build the URI of an embedded region document.
///
/// Format: `nestfmt-embedded://{language}/{name}?host={percent-encoded source uri}`
pub fn embedded_uri(source_uri: &str, language_id: &str, name: &str) -> String {
    let host = utf8_percent_encode(source_uri, HOST_ENCODE_SET);
    format!("{EMBEDDED_SCHEME}://{language_id}/{name}?host={host}")
}

/// Split an embedded region URI into `(source uri, region name)`.
pub fn parse_embedded_uri(uri: &str) -> Option<(String, String)> {
    let rest = uri.strip_prefix(EMBEDDED_SCHEME)?.strip_prefix("://")?;
    let (path, host) = rest.split_once("?host=")?;
    let (_language, name) = path.split_once('/')?;
    let source = percent_decode_str(host).decode_utf8().ok()?;
    Some((source.into_owned(), name.to_string()))
}

/// The document formatting capability of a region.
///
/// Deserializes from `true`/`false` or from
/// `{ "insertFirstNewline": bool, "insertFinalNewline": bool }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentFormatting {
    Flag(bool),
    #[serde(rename_all = "camelCase")]
    Block {
        #[serde(default)]
        insert_first_newline: bool,
        #[serde(default)]
        insert_final_newline: bool,
    },
}

impl DocumentFormatting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DocumentFormatting::Flag(false))
    }

    /// Standalone code blocks (the `Block` form) get a nested indent baseline.
    pub fn is_block(&self) -> bool {
        matches!(self, DocumentFormatting::Block { .. })
    }

    pub fn insert_first_newline(&self) -> bool {
        matches!(
            self,
            DocumentFormatting::Block {
                insert_first_newline: true,
                ..
            }
        )
    }

    pub fn insert_final_newline(&self) -> bool {
        matches!(
            self,
            DocumentFormatting::Block {
                insert_final_newline: true,
                ..
            }
        )
    }
}

/// A node in the embedding tree.
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    document: TextDocument,
    document_formatting: Option<DocumentFormatting>,
    children: Vec<Region>,
}

impl Region {
    pub fn new(name: impl Into<String>, document: TextDocument) -> Self {
        Self {
            name: name.into(),
            document,
            document_formatting: None,
            children: Vec::new(),
        }
    }

    pub fn with_formatting(mut self, formatting: DocumentFormatting) -> Self {
        self.document_formatting = Some(formatting);
        self
    }

    pub fn with_child(mut self, child: Region) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_child(&mut self, child: Region) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language_id(&self) -> &str {
        self.document.language_id()
    }

    pub fn document(&self) -> &TextDocument {
        &self.document
    }

    pub fn document_formatting(&self) -> Option<DocumentFormatting> {
        self.document_formatting
    }

    /// The formatting capability, only if it is truthy.
    pub fn formatting_enabled(&self) -> Option<DocumentFormatting> {
        self.document_formatting.filter(DocumentFormatting::is_enabled)
    }

    pub fn children(&self) -> &[Region] {
        &self.children
    }

    fn find(&self, name: &str) -> Option<&Region> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// A root region plus the mapping sets of every region in it.
#[derive(Debug, Clone)]
pub struct EmbeddedTree {
    root: Region,
    /// Region name -> (owner document uri, mapping set).
    mappings: HashMap<String, Vec<(String, RangeMapper)>>,
}

impl EmbeddedTree {
    pub fn new(root: Region) -> Self {
        Self {
            root,
            mappings: HashMap::new(),
        }
    }

    /// Register the mapping set between region `name` and document `owner_uri`.
    pub fn add_mappings(
        &mut self,
        name: impl Into<String>,
        owner_uri: impl Into<String>,
        mapper: RangeMapper,
    ) {
        self.mappings
            .entry(name.into())
            .or_default()
            .push((owner_uri.into(), mapper));
    }

    pub fn root(&self) -> &Region {
        &self.root
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.root.find(name)
    }

    /// Depth of the tree; a lone root has depth 0.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn mappings_by_region_name<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = (&'a str, &'a RangeMapper)> + 'a {
        self.mappings
            .get(name)
            .into_iter()
            .flatten()
            .map(|(owner, mapper)| (owner.as_str(), mapper))
    }

    pub fn mappings_by_region_uri<'a>(
        &'a self,
        uri: &str,
    ) -> impl Iterator<Item = (&'a str, &'a RangeMapper)> + 'a {
        let entries = parse_embedded_uri(uri).and_then(|(_, name)| self.mappings.get(&name));
        entries
            .into_iter()
            .flatten()
            .map(|(owner, mapper)| (owner.as_str(), mapper))
    }

    /// The mapping set of region `name` against document `owner_uri`.
    pub fn mapper_for(&self, name: &str, owner_uri: &str) -> Option<&RangeMapper> {
        self.mappings_by_region_name(name)
            .find(|(owner, _)| *owner == owner_uri)
            .map(|(_, mapper)| mapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Mapping;

    fn region(name: &str, language: &str) -> Region {
        let uri = embedded_uri("file:///a.md", language, name);
        Region::new(name, TextDocument::new(uri, language, 1, ""))
    }

    #[test]
    fn test_embedded_uri_round_trip() {
        let uri = embedded_uri("file:///tmp/my doc.md", "javascript", "fence-0");
        assert!(uri.starts_with("nestfmt-embedded://javascript/fence-0?host="));
        assert!(!uri.contains(' '));
        assert_eq!(
            parse_embedded_uri(&uri),
            Some(("file:///tmp/my doc.md".to_string(), "fence-0".to_string()))
        );
        assert_eq!(parse_embedded_uri("file:///a.md"), None);
    }

    #[test]
    fn test_document_formatting_deserialize() {
        let flag: DocumentFormatting = serde_json::from_str("true").unwrap();
        assert_eq!(flag, DocumentFormatting::Flag(true));
        assert!(flag.is_enabled() && !flag.is_block());

        let off: DocumentFormatting = serde_json::from_str("false").unwrap();
        assert!(!off.is_enabled());

        let block: DocumentFormatting =
            serde_json::from_str(r#"{ "insertFirstNewline": true }"#).unwrap();
        assert!(block.is_enabled() && block.is_block());
        assert!(block.insert_first_newline());
        assert!(!block.insert_final_newline());
    }

    #[test]
    fn test_tree_lookup_by_name() {
        let root = region("root", "markdown")
            .with_child(region("fence-0", "markdown").with_child(region("fence-0-0", "css")))
            .with_child(region("fence-1", "javascript"));
        let mut tree = EmbeddedTree::new(root);
        tree.add_mappings("fence-1", "file:///a.md", RangeMapper::new(vec![Mapping::identity(0..3)]));
        tree.add_mappings("fence-1", "file:///b.md", RangeMapper::default());

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.region("fence-0-0").unwrap().language_id(), "css");
        assert!(tree.region("missing").is_none());
        assert_eq!(tree.mappings_by_region_name("fence-1").count(), 2);
        assert!(tree.mapper_for("fence-1", "file:///a.md").is_some_and(|m| !m.is_empty()));
        assert!(tree.mapper_for("fence-0", "file:///a.md").is_none());

        let uri = tree.region("fence-1").unwrap().document().uri().to_string();
        assert_eq!(tree.mappings_by_region_uri(&uri).count(), 2);
    }

    #[test]
    fn test_formatting_enabled_filters_false() {
        let r = region("a", "css").with_formatting(DocumentFormatting::Flag(false));
        assert_eq!(r.document_formatting(), Some(DocumentFormatting::Flag(false)));
        assert!(r.formatting_enabled().is_none());
        assert!(region("b", "css").formatting_enabled().is_none());
    }
}
