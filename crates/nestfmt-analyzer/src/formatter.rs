// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Format provider that wraps an external formatter binary.
//!
//! # How it works
//!
//! 1. We receive an (embedded or top-level) document of our language
//! 2. We write it to a temp file
//! 3. We invoke the configured command on the temp file
//! 4. We read the formatted output from stdout
//! 5. We return one edit replacing the whole document
//!
//! The requested range is not narrowed: external formatters work on whole
//! files, and the edit is still clipped to the region by the caller's
//! mapping translation.

use std::path::Path;

use async_trait::async_trait;
use lsp_types::{FormattingOptions, Range, TextEdit};
use serde::{Deserialize, Serialize};

use crate::document::TextDocument;
use crate::error::FormatError;
use crate::provider::FormatProvider;

/// Placeholder in [`FormatterCommand::args`] replaced by the temp file path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// How to invoke a formatter, as given in the server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatterCommand {
    /// Program name (looked up in `PATH`) or path.
    pub command: String,
    /// Arguments; the temp file path is appended unless one of them is `{file}`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extension of the temp file, defaulting to the language id.
    #[serde(default)]
    pub extension: Option<String>,
}

impl FormatterCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            extension: None,
        }
    }

    fn arguments(&self, file: &Path) -> Vec<String> {
        let file = file.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
            .collect();
        if !self.args.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
            args.push(file.into_owned());
        }
        args
    }
}

/// Environment variable overriding the program for `language_id`,
/// e.g. `NESTFMT_FORMATTER_JAVASCRIPT`.
pub fn env_var_for(language_id: &str) -> String {
    let suffix: String = language_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("NESTFMT_FORMATTER_{suffix}")
}

/// Formats documents of one language with an external program.
pub struct ExternalFormatter {
    language_id: String,
    name: String,
    command: FormatterCommand,
    /// Resolved program, if one was found.
    program: Option<String>,
}

impl ExternalFormatter {
    /// Create a formatter for `language_id`, locating its program.
    pub fn new(language_id: impl Into<String>, command: FormatterCommand) -> Self {
        let language_id = language_id.into();
        let program = Self::find_program(&language_id, &command.command);
        Self {
            name: format!("{}:{}", language_id, command.command),
            language_id,
            command,
            program,
        }
    }

    /// Search order:
    /// 1. `NESTFMT_FORMATTER_<LANGUAGE>` environment variable
    /// 2. the configured command, if it is an existing path
    /// 3. the configured command in `PATH`
    fn find_program(language_id: &str, command: &str) -> Option<String> {
        let var = env_var_for(language_id);
        if let Ok(path) = std::env::var(&var) {
            if Path::new(&path).exists() {
                tracing::info!("Found {} formatter via {} env: {}", language_id, var, path);
                return Some(path);
            }
        }

        if Path::new(command).is_file() {
            tracing::info!("Found {} formatter at: {}", language_id, command);
            return Some(command.to_string());
        }

        if let Ok(output) = std::process::Command::new("which").arg(command).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                tracing::info!("Found {} formatter in PATH: {}", language_id, path);
                return Some(path);
            }
        }

        tracing::warn!("Could not find formatter {} for {}", command, language_id);
        None
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }

    /// Run the program on `content` and return its output.
    pub async fn run(&self, content: &str) -> Result<String, FormatError> {
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| FormatError::Unavailable(self.language_id.clone()))?;

        let temp_dir = tempfile::tempdir()?;
        let extension = self
            .command
            .extension
            .as_deref()
            .unwrap_or(&self.language_id);
        let temp_file = temp_dir.path().join(format!("format_input.{extension}"));
        tokio::fs::write(&temp_file, content).await?;

        let args = self.command.arguments(&temp_file);
        tracing::debug!("Running formatter: {} {}", program, args.join(" "));

        let output = tokio::process::Command::new(program)
            .args(&args)
            .output()
            .await?;

        if !output.status.success() {
            return Err(FormatError::Failed {
                program: program.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let formatted = String::from_utf8_lossy(&output.stdout).to_string();
        tracing::debug!("Formatter succeeded, output length: {}", formatted.len());
        Ok(formatted)
    }
}

#[async_trait]
impl FormatProvider for ExternalFormatter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn format(
        &self,
        document: &TextDocument,
        _range: Range,
        _options: &FormattingOptions,
    ) -> Result<Option<Vec<TextEdit>>, FormatError> {
        if document.language_id() != self.language_id {
            return Ok(None);
        }

        let text = document.text();
        let formatted = self.run(&text).await?;
        if formatted == text {
            return Ok(None);
        }
        Ok(Some(vec![TextEdit {
            range: document.full_range(),
            new_text: formatted,
        }]))
    }
}
