//! Server settings from `initializationOptions`.
//!
//! ```json
//! {
//!   "formatters": {
//!     "javascript": { "command": "prettier", "args": ["{file}"], "extension": "js" },
//!     "css": { "command": "prettier", "args": ["{file}"] }
//!   },
//!   "onTypeTriggers": ["}", ";"]
//! }
//! ```
//!
//! `NESTFMT_FORMATTER_<LANGUAGE>` overrides the program of a configured
//! language (see [`nestfmt_analyzer::formatter::env_var_for`]).

use std::collections::BTreeMap;
use std::sync::Arc;

use nestfmt_analyzer::{ExternalFormatter, FormatProviderRegistry, FormatterCommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Language id -> external formatter.
    pub formatters: BTreeMap<String, FormatterCommand>,
    /// Characters that trigger on-type formatting.
    pub on_type_triggers: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            formatters: BTreeMap::new(),
            on_type_triggers: vec!["}".to_string(), ";".to_string(), "\n".to_string()],
        }
    }
}

impl ServerSettings {
    /// Decode settings, falling back to defaults when absent or malformed.
    pub fn from_initialization_options(options: Option<Value>) -> Self {
        let Some(options) = options.filter(|value| !value.is_null()) else {
            return Self::default();
        };
        match serde_json::from_value(options) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring malformed initializationOptions: {}", e);
                Self::default()
            }
        }
    }

    /// One external formatter per configured language, in language id order.
    pub fn providers(&self) -> FormatProviderRegistry {
        let mut providers = FormatProviderRegistry::new();
        for (language_id, command) in &self.formatters {
            let formatter = ExternalFormatter::new(language_id.as_str(), command.clone());
            if formatter.is_available() {
                tracing::info!("Formatter for {} found", language_id);
            } else {
                tracing::warn!(
                    "Formatter for {} not found - {} regions will be left as is",
                    language_id,
                    language_id
                );
            }
            providers.register(Arc::new(formatter));
        }
        providers
    }

    /// `(first, more)` as the on-type capability wants them.
    pub fn trigger_characters(&self) -> Option<(String, Vec<String>)> {
        let mut triggers = self
            .on_type_triggers
            .iter()
            .filter(|trigger| !trigger.is_empty())
            .cloned();
        let first = triggers.next()?;
        Some((first, triggers.collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = ServerSettings::from_initialization_options(None);
        assert!(settings.formatters.is_empty());
        assert_eq!(
            settings.trigger_characters(),
            Some(("}".to_string(), vec![";".to_string(), "\n".to_string()]))
        );
        assert_eq!(ServerSettings::from_initialization_options(Some(Value::Null)), settings);
    }

    #[test]
    fn test_decode_formatters() {
        let settings = ServerSettings::from_initialization_options(Some(json!({
            "formatters": {
                "css": { "command": "prettier", "args": ["{file}"] },
                "javascript": { "command": "prettier", "extension": "js" }
            }
        })));
        assert_eq!(settings.formatters.len(), 2);
        assert_eq!(settings.formatters["css"].args, vec!["{file}"]);
        assert_eq!(settings.formatters["javascript"].extension.as_deref(), Some("js"));
        // Unspecified fields keep their defaults.
        assert_eq!(settings.on_type_triggers.len(), 3);
        assert_eq!(settings.providers().len(), 2);
    }

    #[test]
    fn test_malformed_options_fall_back() {
        let settings =
            ServerSettings::from_initialization_options(Some(json!({ "formatters": ["css"] })));
        assert_eq!(settings, ServerSettings::default());
    }

    #[test]
    fn test_no_triggers() {
        let settings = ServerSettings {
            on_type_triggers: vec![String::new()],
            ..Default::default()
        };
        assert!(settings.trigger_characters().is_none());
    }
}
