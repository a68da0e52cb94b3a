//! Size limits for records, bins and sets
//!
//! These limits are enforced when remote payloads are decoded and when set
//! names are interned. Violations are reported as `LimitError` and surface to
//! replace callers as `BadParam` or `Corrupt`, depending on where they are hit.
//!
//! ## Contract
//!
//! The limits are part of the on-device and wire contract and cannot change
//! without a format version bump.

use thiserror::Error;

/// Size of a record digest in bytes.
pub const DIGEST_SIZE: usize = 20;

/// Number of partitions a namespace is split into.
pub const N_PARTITIONS: u16 = 4096;

/// Maximum number of bins a multi-bin record may hold.
pub const MAX_BINS: usize = 32_767;

/// Maximum bin name length in bytes.
pub const MAX_BIN_NAME_LEN: usize = 15;

/// Maximum set name length in bytes.
pub const MAX_SET_NAME_LEN: usize = 63;

/// Maximum number of distinct sets per namespace.
pub const MAX_SETS: usize = 1023;

/// Characters that may not appear in a set name.
const FORBIDDEN_SET_NAME_CHARS: [char; 3] = [':', ';', '\0'];

/// Limit violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    /// Bin name is empty
    #[error("bin name is empty")]
    EmptyBinName,

    /// Bin name exceeds maximum length
    #[error("bin name too long: {actual} bytes exceeds maximum {max}")]
    BinNameTooLong {
        /// Actual length
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Record carries more bins than allowed
    #[error("too many bins: {actual} exceeds maximum {max}")]
    TooManyBins {
        /// Actual count
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Set name is empty
    #[error("set name is empty")]
    EmptySetName,

    /// Set name exceeds maximum length
    #[error("set name too long: {actual} bytes exceeds maximum {max}")]
    SetNameTooLong {
        /// Actual length
        actual: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Set name contains a reserved character
    #[error("set name contains forbidden character {0:?}")]
    SetNameForbiddenChar(char),
}

/// Validate a bin name.
pub fn validate_bin_name(name: &str) -> Result<(), LimitError> {
    if name.is_empty() {
        return Err(LimitError::EmptyBinName);
    }
    if name.len() > MAX_BIN_NAME_LEN {
        return Err(LimitError::BinNameTooLong {
            actual: name.len(),
            max: MAX_BIN_NAME_LEN,
        });
    }
    Ok(())
}

/// Validate a bin count against the layout's maximum.
pub fn validate_bin_count(count: usize, max: usize) -> Result<(), LimitError> {
    if count > max {
        return Err(LimitError::TooManyBins { actual: count, max });
    }
    Ok(())
}

/// Validate a set name.
pub fn validate_set_name(name: &str) -> Result<(), LimitError> {
    if name.is_empty() {
        return Err(LimitError::EmptySetName);
    }
    if name.len() > MAX_SET_NAME_LEN {
        return Err(LimitError::SetNameTooLong {
            actual: name.len(),
            max: MAX_SET_NAME_LEN,
        });
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_SET_NAME_CHARS.contains(c)) {
        return Err(LimitError::SetNameForbiddenChar(c));
    }
    Ok(())
}
