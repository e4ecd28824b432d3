// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Open documents and their embedding trees.
//!
//! # How it works
//!
//! 1. A document is opened (or changed) with its full text
//! 2. If an [`EmbeddingLanguage`] is registered for its language id, the
//!    language builds an [`EmbeddedTree`] from the text
//! 3. The snapshot and tree are stored together as the document's [`Source`]
//!
//! Format requests only read from the registry. To see the tree of text that
//! exists only mid-request, they call [`DocumentRegistry::materialize`],
//! which builds a tree without storing it.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use lsp_types::{TextDocumentContentChangeEvent, TextEdit};

use crate::document::TextDocument;
use crate::mapper::RangeMapper;
use crate::region::{parse_embedded_uri, EmbeddedTree};

/// Builds the embedding tree for documents of one language.
pub trait EmbeddingLanguage: Send + Sync {
    fn language_id(&self) -> &str;

    /// `None` when the document embeds nothing worth formatting separately.
    fn create_tree(&self, document: &TextDocument) -> Option<EmbeddedTree>;
}

/// A root document with its embedding tree.
#[derive(Debug, Clone)]
pub struct Source {
    pub uri: String,
    pub snapshot: TextDocument,
    pub tree: EmbeddedTree,
}

pub trait DocumentRegistry: Send + Sync {
    fn text_document(&self, uri: &str) -> Option<TextDocument>;

    fn source(&self, uri: &str) -> Option<Source>;

    /// Mapping sets of region `name` in the tree of `source_uri`.
    fn mappings_by_region_name(&self, source_uri: &str, name: &str) -> Vec<(String, RangeMapper)> {
        self.source(source_uri)
            .map(|source| {
                source
                    .tree
                    .mappings_by_region_name(name)
                    .map(|(owner, mapper)| (owner.to_string(), mapper.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mapping sets of the region whose embedded document has `region_uri`.
    fn mappings_by_region_uri(&self, region_uri: &str) -> Vec<(String, RangeMapper)> {
        match parse_embedded_uri(region_uri) {
            Some((source_uri, name)) => self.mappings_by_region_name(&source_uri, &name),
            None => Vec::new(),
        }
    }

    /// Store `snapshot` as the current text of `uri` and rebuild its tree.
    fn update_source(&self, uri: &str, snapshot: TextDocument);

    /// Build the tree for `snapshot` without storing anything.
    fn materialize(&self, snapshot: &TextDocument) -> Option<EmbeddedTree>;
}

/// The in-memory registry used by the server.
pub struct DocumentStore {
    documents: DashMap<String, TextDocument>,
    sources: DashMap<String, Source>,
    languages: HashMap<String, Arc<dyn EmbeddingLanguage>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            sources: DashMap::new(),
            languages: HashMap::new(),
        }
    }

    pub fn with_language(mut self, language: Arc<dyn EmbeddingLanguage>) -> Self {
        self.languages
            .insert(language.language_id().to_string(), language);
        self
    }

    pub fn open(&self, document: TextDocument) {
        tracing::debug!("Document opened: {}", document.uri());
        let uri = document.uri().to_string();
        self.update_source(&uri, document);
    }

    /// Apply editor changes in order, each against the result of the last.
    pub fn change(&self, uri: &str, version: i32, changes: Vec<TextDocumentContentChangeEvent>) {
        let Some(mut document) = self.text_document(uri) else {
            tracing::warn!("Change for unknown document: {}", uri);
            return;
        };

        for change in changes {
            document = match change.range {
                Some(range) => document.with_edits(&[TextEdit {
                    range,
                    new_text: change.text,
                }]),
                None => TextDocument::new(uri, document.language_id(), version, &change.text),
            };
        }

        self.update_source(uri, document.with_version(version));
    }

    pub fn close(&self, uri: &str) {
        self.documents.remove(uri);
        self.sources.remove(uri);
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRegistry for DocumentStore {
    fn text_document(&self, uri: &str) -> Option<TextDocument> {
        self.documents.get(uri).map(|doc| doc.clone())
    }

    fn source(&self, uri: &str) -> Option<Source> {
        self.sources.get(uri).map(|source| source.clone())
    }

    fn update_source(&self, uri: &str, snapshot: TextDocument) {
        match self.materialize(&snapshot) {
            Some(tree) => {
                self.sources.insert(
                    uri.to_string(),
                    Source {
                        uri: uri.to_string(),
                        snapshot: snapshot.clone(),
                        tree,
                    },
                );
            }
            None => {
                self.sources.remove(uri);
            }
        }
        self.documents.insert(uri.to_string(), snapshot);
    }

    fn materialize(&self, snapshot: &TextDocument) -> Option<EmbeddedTree> {
        self.languages
            .get(snapshot.language_id())?
            .create_tree(snapshot)
    }
}
