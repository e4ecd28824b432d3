// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Entry point for formatting requests.

use std::sync::Arc;

use lsp_types::{FormattingOptions, Position, Range, TextEdit};

use crate::config::{initial_indent_languages, ConfigurationHost};
use crate::document::TextDocument;
use crate::orchestrator::{FormatOrchestrator, FormatTrigger};
use crate::overlay::Overlay;
use crate::provider::FormatProviderRegistry;
use crate::registry::DocumentRegistry;

/// The character typed and where, for on-type formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct OnTypeTrigger {
    pub ch: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatRequest {
    pub uri: String,
    pub options: FormattingOptions,
    /// `None` formats the whole document.
    pub range: Option<Range>,
    pub on_type: Option<OnTypeTrigger>,
}

impl FormatRequest {
    pub fn document(uri: impl Into<String>, options: FormattingOptions) -> Self {
        Self {
            uri: uri.into(),
            options,
            range: None,
            on_type: None,
        }
    }

    pub fn range(uri: impl Into<String>, options: FormattingOptions, range: Range) -> Self {
        Self {
            range: Some(range),
            ..Self::document(uri, options)
        }
    }

    pub fn on_type(
        uri: impl Into<String>,
        options: FormattingOptions,
        position: Position,
        ch: impl Into<String>,
    ) -> Self {
        Self {
            on_type: Some(OnTypeTrigger {
                ch: ch.into(),
                position,
            }),
            ..Self::document(uri, options)
        }
    }

    fn trigger(&self) -> FormatTrigger {
        match (&self.on_type, self.range) {
            (Some(on_type), _) => FormatTrigger::OnType {
                position: on_type.position,
                ch: on_type.ch.clone(),
            },
            (None, Some(range)) => FormatTrigger::Range(range),
            (None, None) => FormatTrigger::Document,
        }
    }
}

/// Formats documents, embedded regions included.
#[derive(Clone)]
pub struct FormatService {
    registry: Arc<dyn DocumentRegistry>,
    providers: Arc<FormatProviderRegistry>,
    configuration: Arc<dyn ConfigurationHost>,
}

impl FormatService {
    pub fn new(
        registry: Arc<dyn DocumentRegistry>,
        providers: Arc<FormatProviderRegistry>,
        configuration: Arc<dyn ConfigurationHost>,
    ) -> Self {
        Self {
            registry,
            providers,
            configuration,
        }
    }

    pub fn registry(&self) -> &Arc<dyn DocumentRegistry> {
        &self.registry
    }

    /// Edits against the document as it was when the request arrived.
    ///
    /// Documents without an embedding tree are formatted directly and the
    /// provider's edits are returned as they are. Otherwise the result is a
    /// single edit replacing the whole original text, or `None` when nothing
    /// changed.
    pub async fn format(&self, request: FormatRequest) -> Option<Vec<TextEdit>> {
        let Some(document) = self.registry.text_document(&request.uri) else {
            tracing::debug!("Format request for unknown document: {}", request.uri);
            return None;
        };

        let Some(source) = self.registry.source(&request.uri) else {
            return self.format_direct(&document, &request).await;
        };

        let initial_indent = initial_indent_languages(self.configuration.as_ref()).await;
        let original = source.snapshot.clone();

        let mut overlay = Overlay::new(self.registry.as_ref(), source);
        let orchestrator =
            FormatOrchestrator::new(&self.providers, request.options.clone(), initial_indent);
        let levels = orchestrator.run(&mut overlay, &request.trigger()).await;

        let formatted = overlay.into_document();
        tracing::debug!(
            "Formatted {} across {} level(s), {} batch(es) applied",
            request.uri,
            levels,
            formatted.version() - original.version()
        );

        let new_text = formatted.text();
        if new_text == original.text() {
            return None;
        }
        Some(vec![TextEdit {
            range: original.full_range(),
            new_text,
        }])
    }

    async fn format_direct(
        &self,
        document: &TextDocument,
        request: &FormatRequest,
    ) -> Option<Vec<TextEdit>> {
        match &request.on_type {
            Some(on_type) => {
                self.providers
                    .format_on_type(document, on_type.position, &on_type.ch, &request.options)
                    .await
            }
            None => {
                let range = request.range.unwrap_or_else(|| document.full_range());
                self.providers
                    .format(document, range, &request.options)
                    .await
            }
        }
    }
}
