//! Error types for a linearize run.
//!
//! Every variant here is fatal. Blocks that are not part of the canonical
//! chain are not errors: they come back from the validator as
//! [`Verdict::Rejected`](crate::validator::Verdict) and are skipped.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinearizeError>;

#[derive(Error, Debug)]
pub enum LinearizeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("out of order block at height {height}: expected {expected}, got {got}")]
    OrderViolation {
        height: usize,
        expected: String,
        got: String,
    },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("invalid configuration for `{key}`: {message}")]
    Config { key: String, message: String },

    #[error("input exhausted after {written} of {expected} canonical blocks")]
    InputExhausted { written: usize, expected: usize },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Malformed or wrong-chain input framing.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid magic {found} (expected {expected}) in {} at offset {offset}", .path.display())]
    BadMagic {
        path: PathBuf,
        offset: u64,
        expected: String,
        found: String,
    },

    #[error("partial record prefix ({len} of 8 bytes) in {} at offset {offset}", .path.display())]
    PartialPrefix { path: PathBuf, offset: u64, len: usize },

    #[error("truncated block in {} at offset {offset}: declared {declared} bytes, found {available}", .path.display())]
    Truncated {
        path: PathBuf,
        offset: u64,
        declared: u32,
        available: usize,
    },

    #[error("block in {} at offset {offset} is {len} bytes, shorter than an 80-byte header", .path.display())]
    ShortHeader { path: PathBuf, offset: u64, len: usize },
}

impl LinearizeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LinearizeError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        LinearizeError::Config {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
