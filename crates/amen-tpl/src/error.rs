//! Errors raised while reading or writing .tpl files

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TplError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid .tpl file: magic bytes mismatch")]
    BadMagic,

    #[error("unsupported .tpl version {0}")]
    UnsupportedVersion(u16),

    #[error("payload size {actual} does not match {rows}x{cols} matrix")]
    PayloadSize { rows: u32, cols: u32, actual: u64 },

    #[error("checksum mismatch: header {expected:#018x}, payload {actual:#018x}")]
    Checksum { expected: u64, actual: u64 },

    #[error("invalid metadata section: {0}")]
    Metadata(#[from] serde_json::Error),
}
