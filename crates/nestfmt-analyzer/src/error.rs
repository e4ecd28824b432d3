// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Error types for format providers.
//!
//! None of these ever reach the caller of a format request: the provider
//! registry logs them and moves on to the next provider.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("formatter for `{0}` is not available")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("formatter `{program}` failed: {stderr}")]
    Failed { program: String, stderr: String },

    #[error("provider error: {0}")]
    Provider(String),
}
