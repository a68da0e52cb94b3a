//! Pickle codec abstraction.
//!
//! The codec seam decouples the replace path from the bin wire format. The
//! replace path treats every decoding failure as a single `Corrupt` outcome.
//!
//! # Usage
//!
//! ```ignore
//! use strata_storage::codec::{FlatCodec, PickleCodec};
//!
//! let codec = FlatCodec;
//! let pickle = codec.pack(&bins);
//! let decoded = codec.unpack(&pickle, bins.len() as u16)?;
//! ```

mod flat;
mod traits;

pub use flat::FlatCodec;
pub use traits::{CodecError, PickleCodec};

/// Get a codec by its identifier.
///
/// # Known Codecs
///
/// - `"flat"`: length-prefixed bins with a CRC32 trailer
pub fn get_codec(codec_id: &str) -> Result<Box<dyn PickleCodec>, CodecError> {
    match codec_id {
        "flat" => Ok(Box::new(FlatCodec)),
        _ => Err(CodecError::UnknownCodec(codec_id.to_string())),
    }
}
