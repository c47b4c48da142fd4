//! Error types for hermes-bitmap

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid cookie: expected {expected:#x}, got {got:#x}")]
    InvalidCookie { expected: u32, got: u32 },

    #[error("Corruption: {0}")]
    Corruption(String),
}

pub type Result<T> = std::result::Result<T, Error>;
