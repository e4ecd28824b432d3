// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Immutable text snapshots.
//!
//! # Coordinates
//!
//! - Offsets are UTF-8 byte offsets into the document text.
//! - Positions are LSP positions: a zero-based line and a UTF-16 code unit
//!   column, with `\n`, `\r\n` and `\r` as line breaks.
//!
//! Every conversion clamps instead of failing, so a position past the end of
//! a line lands on the end of that line and an offset past the end of the
//! document lands on the end of the document.

use std::ops::Range as OffsetRange;

use lsp_types::{Position, Range, TextEdit};
use ropey::Rope;

/// A snapshot of one document (an open file or an embedded region).
#[derive(Debug, Clone, PartialEq)]
pub struct TextDocument {
    uri: String,
    language_id: String,
    version: i32,
    /// Stored as a rope so snapshots are cheap to clone and edit.
    content: Rope,
}

impl TextDocument {
    pub fn new(
        uri: impl Into<String>,
        language_id: impl Into<String>,
        version: i32,
        text: &str,
    ) -> Self {
        Self {
            uri: uri.into(),
            language_id: language_id.into(),
            version,
            content: Rope::from_str(text),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn rope(&self) -> &Rope {
        &self.content
    }

    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Length of the document in bytes.
    pub fn len(&self) -> usize {
        self.content.len_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.content.len_bytes() == 0
    }

    /// Same text with an explicit version (used when the editor dictates it).
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Convert an LSP position to a byte offset.
    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.content.len_lines() {
            return self.content.len_bytes();
        }

        let line_start = self.content.line_to_char(line);
        let line_end = self.line_content_end(line);
        let start_cu = self.content.char_to_utf16_cu(line_start);
        let end_cu = self.content.char_to_utf16_cu(line_end);

        let target = (start_cu + position.character as usize).min(end_cu);
        let char_idx = self.content.utf16_cu_to_char(target);
        self.content.char_to_byte(char_idx)
    }

    /// Convert a byte offset to an LSP position.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.content.len_bytes());
        let char_idx = self.content.byte_to_char(offset);
        let line = self.content.char_to_line(char_idx);
        let line_start = self.content.line_to_char(line);
        let character =
            self.content.char_to_utf16_cu(char_idx) - self.content.char_to_utf16_cu(line_start);

        Position {
            line: line as u32,
            character: character as u32,
        }
    }

    /// The range covering the whole document.
    pub fn full_range(&self) -> Range {
        Range {
            start: Position {
                line: 0,
                character: 0,
            },
            end: self.position_at(self.len()),
        }
    }

    pub fn to_offsets(&self, range: Range) -> OffsetRange<usize> {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        start..end
    }

    pub fn to_range(&self, offsets: OffsetRange<usize>) -> Range {
        Range {
            start: self.position_at(offsets.start),
            end: self.position_at(offsets.end),
        }
    }

    /// Text between two byte offsets (clamped to the document).
    pub fn slice(&self, offsets: OffsetRange<usize>) -> String {
        let end = offsets.end.min(self.len());
        let start = offsets.start.min(end);
        let start_char = self.content.byte_to_char(start);
        let end_char = self.content.byte_to_char(end);
        self.content.slice(start_char..end_char).to_string()
    }

    pub fn text_in(&self, range: Range) -> String {
        self.slice(self.to_offsets(range))
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn line_indent(&self, offset: usize) -> String {
        let offset = offset.min(self.content.len_bytes());
        let line = self.content.char_to_line(self.content.byte_to_char(offset));
        self.content
            .line(line)
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }

    /// Apply a batch of edits expressed against this snapshot.
    ///
    /// Edits are ordered by start offset, keeping the order they were given
    /// in for equal starts. An edit that begins before the end of the previous
    /// kept edit overlaps it and is dropped. The result has version + 1.
    pub fn with_edits(&self, edits: &[TextEdit]) -> TextDocument {
        let mut resolved: Vec<(OffsetRange<usize>, &str)> = edits
            .iter()
            .map(|edit| (self.to_offsets(edit.range), edit.new_text.as_str()))
            .collect();
        resolved.sort_by_key(|(offsets, _)| offsets.start);

        let mut text = String::with_capacity(self.len());
        let mut last_end = 0;
        for (offsets, new_text) in resolved {
            if offsets.start < last_end {
                tracing::warn!(
                    "Dropping edit {:?} in {}: overlaps an earlier edit in the same batch",
                    offsets,
                    self.uri
                );
                continue;
            }
            self.push_slice(&mut text, last_end..offsets.start);
            text.push_str(new_text);
            last_end = offsets.end;
        }
        self.push_slice(&mut text, last_end..self.len());

        TextDocument {
            uri: self.uri.clone(),
            language_id: self.language_id.clone(),
            version: self.version + 1,
            content: Rope::from_str(&text),
        }
    }

    fn push_slice(&self, out: &mut String, offsets: OffsetRange<usize>) {
        let start = self.content.byte_to_char(offsets.start);
        let end = self.content.byte_to_char(offsets.end);
        for chunk in self.content.slice(start..end).chunks() {
            out.push_str(chunk);
        }
    }

    /// Char index of the end of `line`, excluding its line break.
    fn line_content_end(&self, line: usize) -> usize {
        let line_start = self.content.line_to_char(line);
        let mut end = if line + 1 < self.content.len_lines() {
            self.content.line_to_char(line + 1)
        } else {
            self.content.len_chars()
        };

        if end > line_start && self.content.char(end - 1) == '\n' {
            end -= 1;
        }
        if end > line_start && self.content.char(end - 1) == '\r' {
            end -= 1;
        }
        end
    }
}
