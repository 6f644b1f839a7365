use std::io;

use crate::varint::VarintError;

#[cfg(doc)]
use super::ProofReader;

/// The errors that can be encountered by the [`ProofReader`].
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read from source: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse proof record {line_nr}: {reason}")]
    Parse { line_nr: usize, reason: String },

    #[error("invalid integer encoding: {0}")]
    Varint(#[from] VarintError),
}
