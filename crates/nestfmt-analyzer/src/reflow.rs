// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Re-indentation of embedded formatter output.
//!
//! A formatter run on an embedded region sees that region starting at
//! column 0. After its output has been substituted into the outer document,
//! each mapped span is re-indented relative to the line it sits on:
//!
//! - interior non-empty lines get `base + nested`
//! - the last line gets `base` alone, lining a closing delimiter up with the
//!   line that opened the region
//! - the first line is left where it is
//!
//! `base` is the indentation of the outer line containing the span's start.
//! `nested` only applies to `Block` regions (standalone code blocks); inline
//! regions keep their interior lines at `base`. `test_inline_region_realigns_to_base`
//! is the case this settles: `x = function f() {...}` on a line indented by
//! two puts `return 1;` at four spaces, not six.
//!
//! Inserted line breaks follow the span: `\r\n` when it already uses them.

use lsp_types::TextEdit;

use crate::document::TextDocument;
use crate::mapper::RangeMapper;
use crate::region::DocumentFormatting;

/// Edits that re-indent every multi-line span of `mapper` in `document`.
pub fn reflow_edits(
    document: &TextDocument,
    mapper: &RangeMapper,
    nested_indent: &str,
    formatting: DocumentFormatting,
) -> Vec<TextEdit> {
    let nested_indent = if formatting.is_block() {
        nested_indent
    } else {
        ""
    };
    let last = mapper.mappings().len().saturating_sub(1);

    let mut edits = Vec::new();
    for (index, mapping) in mapper.mappings().iter().enumerate() {
        let end = mapping.source.end.min(document.len());
        let start = mapping.source.start.min(end);
        let text = document.slice(start..end);
        if !text.contains('\n') {
            continue;
        }

        let base_indent = document.line_indent(start);
        let newline = line_break(&text);
        let mut patched = text.clone();
        if formatting.insert_first_newline() && index == 0 && !starts_with_newline(&patched) {
            patched.insert_str(0, newline);
        }
        if formatting.insert_final_newline() && index == last && !patched.ends_with('\n') {
            patched.push_str(newline);
        }

        let reindented = reindent(&patched, &base_indent, nested_indent);
        if reindented != text {
            edits.push(TextEdit {
                range: document.to_range(start..end),
                new_text: reindented,
            });
        }
    }
    edits
}

/// Put back the opening or closing line break of a block region when `edit`
/// replaces it without one.
///
/// A region that starts on the break ending its delimiter line (a fence) has
/// nothing else separating formatted text from that line, and formatters
/// drop leading blank lines.
pub fn keep_boundary_breaks(
    region: &TextDocument,
    formatting: DocumentFormatting,
    mut edit: TextEdit,
) -> TextEdit {
    let text = region.text();
    let offsets = region.to_offsets(edit.range);
    let replaces = |at: usize| offsets.start <= at && at < offsets.end;
    let newline = line_break(&text);

    let first_break = text.find('\n').filter(|at| text[..*at].trim().is_empty());
    if formatting.insert_first_newline() && first_break.is_some_and(replaces) {
        let leading = edit.new_text.len() - edit.new_text.trim_start().len();
        if !edit.new_text[..leading].contains('\n') {
            edit.new_text.insert_str(0, newline);
        }
    }

    let last_break = text.rfind('\n').filter(|at| text[at + 1..].trim().is_empty());
    if formatting.insert_final_newline() && last_break.is_some_and(replaces) {
        let trailing = edit.new_text.trim_end().len();
        if !edit.new_text[trailing..].contains('\n') {
            edit.new_text.push_str(newline);
        }
    }
    edit
}

fn reindent(text: &str, base_indent: &str, nested_indent: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len() - 1;

    let mut out = String::with_capacity(text.len() + lines.len() * base_indent.len());
    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if index == last && index > 0 {
            out.push_str(base_indent);
        } else if index > 0 && !is_blank_line(line) {
            out.push_str(base_indent);
            out.push_str(nested_indent);
        }
        out.push_str(line);
    }
    out
}

fn line_break(text: &str) -> &'static str {
    if text.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

fn starts_with_newline(text: &str) -> bool {
    text.starts_with('\n') || text.starts_with("\r\n")
}

/// Empty once a trailing `\r` from a CRLF break is ignored.
fn is_blank_line(line: &str) -> bool {
    line.is_empty() || line == "\r"
}
