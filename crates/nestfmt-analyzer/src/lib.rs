// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Nestfmt Analyzer - formatting for documents with embedded languages
//!
//! This crate provides:
//! - Document model: text snapshots, embedded regions and their mappings
//! - Format orchestration: level-by-level formatting of nested regions,
//!   with edits translated back and re-indented in the outer document
//! - Providers: the pluggable formatter interface and an external-binary
//!   implementation
//! - Embeddings: region trees for HTML and Markdown documents

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod format;
pub mod formatter;
pub mod mapper;
pub mod orchestrator;
pub mod overlay;
pub mod provider;
pub mod reflow;
pub mod region;
pub mod registry;
pub mod traversal;

pub use config::{ConfigurationHost, StaticConfiguration};
pub use document::TextDocument;
pub use embedding::{HtmlEmbedding, MarkdownEmbedding};
pub use error::FormatError;
pub use format::{FormatRequest, FormatService, OnTypeTrigger};
pub use formatter::{ExternalFormatter, FormatterCommand};
pub use mapper::{DocumentMap, Mapping, RangeMapper};
pub use provider::{FormatProvider, FormatProviderRegistry};
pub use region::{DocumentFormatting, EmbeddedTree, Region};
pub use registry::{DocumentRegistry, DocumentStore, EmbeddingLanguage, Source};
