//! Pickle codec trait definitions.

use strata_core::{Bin, Error, LimitError};

/// Pickle codec trait.
///
/// A pickle is the serialized bin payload of a record as it travels between
/// nodes and as it is written to the device. The replace path writes pickles
/// verbatim and only decodes them when bins must be materialized (memory
/// resident namespaces, or secondary-index maintenance).
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync` to allow concurrent decoding from multiple
/// replace workers.
pub trait PickleCodec: Send + Sync {
    /// Encode bins into a pickle.
    fn pack(&self, bins: &[Bin]) -> Vec<u8>;

    /// Decode a pickle that must hold exactly `n_bins` bins.
    fn unpack(&self, pickle: &[u8], n_bins: u16) -> Result<Vec<Bin>, CodecError>;

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Payload ended before the announced content.
    #[error("Truncated pickle: needed {needed} bytes at offset {offset}")]
    Truncated {
        /// Offset where decoding stopped
        offset: usize,
        /// Bytes needed past the offset
        needed: usize,
    },

    /// Checksum trailer does not match the payload.
    #[error("Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the trailer
        stored: u32,
        /// Checksum computed over the payload
        computed: u32,
    },

    /// Unknown particle type tag.
    #[error("Unknown particle type {0}")]
    UnknownParticle(u8),

    /// Invalid particle contents.
    #[error("Invalid {particle} particle: {reason}")]
    InvalidParticle {
        /// Particle type name
        particle: &'static str,
        /// What was wrong
        reason: String,
    },

    /// Invalid bin name.
    #[error("Invalid bin name: {0}")]
    InvalidBinName(#[from] LimitError),

    /// Bin name repeated within one record.
    #[error("Duplicate bin {0:?}")]
    DuplicateBin(String),

    /// Bytes left over after the announced bins.
    #[error("{0} trailing bytes after last bin")]
    TrailingBytes(usize),

    /// Unknown codec identifier.
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Corrupt(e.to_string())
    }
}
