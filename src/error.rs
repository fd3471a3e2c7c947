// src/error.rs

//! Error types for the recipe executor
//!
//! Every pipeline stage fails fast with one of these variants. The first
//! group mirrors the stages that can fail (source acquisition, environment
//! resolution, patching, building, packaging); the second group covers
//! ambient failures (I/O, parsing, configuration, misuse of the pipeline).

use thiserror::Error;

/// Errors that can occur while cooking a recipe
#[derive(Debug, Error)]
pub enum Error {
    /// Source download failed
    #[error("Network error: {0}")]
    Network(String),

    /// Downloaded content does not match the recipe checksum
    #[error("Integrity check failed: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// Source archive is corrupt or has an unexpected layout
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A required external dependency location could not be resolved
    #[error("Environment error: {0}")]
    Environment(String),

    /// A required patch anchor is absent from its target file
    #[error("Patch anchor not found in {file}: {anchor:?}")]
    PatchNotFound { file: String, anchor: String },

    /// A build subprocess exited unsuccessfully
    #[error("{step} {}{}", format_status(.code), format_stderr(.stderr))]
    Build {
        step: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An expected artifact is missing after the build
    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// No build strategy exists for this target
    #[error("Unsupported target: {0}")]
    UnsupportedTarget(String),

    /// A pipeline stage was invoked out of order
    #[error("Invalid pipeline state: expected {expected}, found {found}")]
    InvalidState { expected: String, found: String },
}

fn format_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("failed with exit code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\nstderr: {}", trimmed)
    }
}

/// Result type for recipe operations
pub type Result<T> = std::result::Result<T, Error>;
