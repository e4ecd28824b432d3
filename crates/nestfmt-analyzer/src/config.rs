// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Per-request configuration lookup.
//!
//! The host (usually the editor, through `workspace/configuration`) answers
//! with raw JSON; [`get_configuration`] decodes it into the type the caller
//! expects. Anything missing or malformed falls back to defaults.

use std::collections::HashMap;

use async_trait::async_trait;
use lsp_types::FormattingOptions;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Language id -> whether embedded blocks of that language get an extra
/// indent level relative to the line they are embedded on.
pub const INITIAL_INDENT_SECTION: &str = "nestfmt.format.initialIndent";

#[async_trait]
pub trait ConfigurationHost: Send + Sync {
    async fn configuration(&self, section: &str) -> Option<Value>;
}

/// Fetch and decode a configuration section.
pub async fn get_configuration<T: DeserializeOwned>(
    host: &dyn ConfigurationHost,
    section: &str,
) -> Option<T> {
    let value = host.configuration(section).await?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!("Ignoring malformed configuration for {}: {}", section, e);
            None
        }
    }
}

/// Languages that want a nested indent baseline, defaulting to `{ html: true }`.
pub async fn initial_indent_languages(host: &dyn ConfigurationHost) -> HashMap<String, bool> {
    get_configuration(host, INITIAL_INDENT_SECTION)
        .await
        .unwrap_or_else(|| HashMap::from([("html".to_string(), true)]))
}

/// One indent level as described by the request's formatting options.
pub fn indent_unit(options: &FormattingOptions) -> String {
    if options.insert_spaces {
        " ".repeat(options.tab_size as usize)
    } else {
        "\t".to_string()
    }
}

/// A fixed set of sections, for embedders without a live host and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticConfiguration {
    sections: HashMap<String, Value>,
}

impl StaticConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, section: impl Into<String>, value: Value) -> Self {
        self.sections.insert(section.into(), value);
        self
    }
}

#[async_trait]
impl ConfigurationHost for StaticConfiguration {
    async fn configuration(&self, section: &str) -> Option<Value> {
        self.sections.get(section).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_initial_indent_default() {
        let languages = initial_indent_languages(&StaticConfiguration::new()).await;
        assert_eq!(languages.get("html"), Some(&true));
        assert_eq!(languages.len(), 1);
    }

    #[tokio::test]
    async fn test_initial_indent_from_host() {
        let host = StaticConfiguration::new().with_section(
            INITIAL_INDENT_SECTION,
            json!({ "javascript": true, "html": false }),
        );
        let languages = initial_indent_languages(&host).await;
        assert_eq!(languages.get("javascript"), Some(&true));
        assert_eq!(languages.get("html"), Some(&false));
    }

    #[tokio::test]
    async fn test_malformed_or_null_falls_back() {
        let malformed = StaticConfiguration::new()
            .with_section(INITIAL_INDENT_SECTION, json!(["javascript"]));
        assert_eq!(
            initial_indent_languages(&malformed).await.get("html"),
            Some(&true)
        );

        let null = StaticConfiguration::new().with_section(INITIAL_INDENT_SECTION, Value::Null);
        assert!(get_configuration::<HashMap<String, bool>>(&null, INITIAL_INDENT_SECTION)
            .await
            .is_none());
    }

    #[test]
    fn test_indent_unit() {
        let spaces = FormattingOptions {
            tab_size: 4,
            insert_spaces: true,
            ..Default::default()
        };
        assert_eq!(indent_unit(&spaces), "    ");

        let tabs = FormattingOptions {
            tab_size: 4,
            insert_spaces: false,
            ..Default::default()
        };
        assert_eq!(indent_unit(&tabs), "\t");
    }
}
