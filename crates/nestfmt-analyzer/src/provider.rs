// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Pluggable per-language formatters and their ordered dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{FormattingOptions, Position, Range, TextEdit};

use crate::document::TextDocument;
use crate::error::FormatError;

/// A formatter for one or more languages.
///
/// Both operations default to "no opinion" (`Ok(None)`), so a provider only
/// implements what it supports and decides for itself which documents
/// (usually by language id) it handles.
#[async_trait]
pub trait FormatProvider: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    async fn format(
        &self,
        _document: &TextDocument,
        _range: Range,
        _options: &FormattingOptions,
    ) -> Result<Option<Vec<TextEdit>>, FormatError> {
        Ok(None)
    }

    async fn format_on_type(
        &self,
        _document: &TextDocument,
        _position: Position,
        _ch: &str,
        _options: &FormattingOptions,
    ) -> Result<Option<Vec<TextEdit>>, FormatError> {
        Ok(None)
    }
}

/// Providers tried in registration order.
///
/// The first provider returning a non-empty edit list wins; results from
/// different providers are never merged. A provider that fails is logged and
/// skipped.
#[derive(Clone, Default)]
pub struct FormatProviderRegistry {
    providers: Vec<Arc<dyn FormatProvider>>,
}

impl FormatProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn FormatProvider>) {
        tracing::debug!("Registered format provider: {}", provider.name());
        self.providers.push(provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn FormatProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn format(
        &self,
        document: &TextDocument,
        range: Range,
        options: &FormattingOptions,
    ) -> Option<Vec<TextEdit>> {
        for provider in &self.providers {
            let result = provider.format(document, range, options).await;
            if let Some(edits) = accept(provider.as_ref(), document, result) {
                return Some(edits);
            }
        }
        None
    }

    pub async fn format_on_type(
        &self,
        document: &TextDocument,
        position: Position,
        ch: &str,
        options: &FormattingOptions,
    ) -> Option<Vec<TextEdit>> {
        for provider in &self.providers {
            let result = provider
                .format_on_type(document, position, ch, options)
                .await;
            if let Some(edits) = accept(provider.as_ref(), document, result) {
                return Some(edits);
            }
        }
        None
    }
}

fn accept(
    provider: &dyn FormatProvider,
    document: &TextDocument,
    result: Result<Option<Vec<TextEdit>>, FormatError>,
) -> Option<Vec<TextEdit>> {
    match result {
        Ok(Some(edits)) if !edits.is_empty() => Some(edits),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(
                "Format provider {} failed on {}: {}",
                provider.name(),
                document.uri(),
                e
            );
            None
        }
    }
}
