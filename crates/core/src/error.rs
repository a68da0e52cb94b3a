//! Error types for the record-replace core
//!
//! Every fallible step returns its outcome to its immediate caller. Only the
//! replace orchestrator decides between failing outright and rolling back
//! first. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Errors map 1:1 onto wire result codes through [`Error::result_code`].

use crate::limits::LimitError;
use thiserror::Error;

/// Result type alias for record-replace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the record-replace core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Index arena exhausted, or set table full
    #[error("Out of space")]
    OutOfSpace,

    /// Admission or ownership check failed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Local record won conflict resolution
    #[error("Record exists")]
    RecordExists,

    /// Remote copy carries a stale generation
    #[error("Generation mismatch")]
    Generation,

    /// Malformed set name or similar parameter
    #[error("Bad parameter: {0}")]
    BadParam(String),

    /// Remote payload could not be decoded
    #[error("Corrupt payload: {0}")]
    Corrupt(String),

    /// Record is not present
    #[error("Record not found")]
    NotFound,

    /// Passthrough from the storage engine
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// Wire result code for this error
    pub fn result_code(&self) -> ResultCode {
        match self {
            Error::OutOfSpace => ResultCode::OutOfSpace,
            Error::Forbidden(_) => ResultCode::Forbidden,
            Error::RecordExists => ResultCode::RecordExists,
            Error::Generation => ResultCode::Generation,
            Error::BadParam(_) => ResultCode::BadParam,
            Error::Corrupt(_) => ResultCode::Unknown,
            Error::NotFound => ResultCode::NotFound,
            Error::Storage(e) => e.result_code(),
        }
    }
}

impl From<LimitError> for Error {
    fn from(e: LimitError) -> Self {
        Error::BadParam(e.to_string())
    }
}

/// Errors reported by the storage engine
///
/// Storage engines report failures as small negative integers; `from_raw`
/// normalizes the sign and `code` always returns the positive wire code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Device has no room for the record
    #[error("device full")]
    DeviceFull,

    /// Record exceeds the device's maximum record size
    #[error("record too big")]
    RecordTooBig,

    /// Device write queue is saturated
    #[error("device overload")]
    DeviceOverload,

    /// Any other device failure
    #[error("device I/O failure (code {0})")]
    Io(u8),
}

impl StorageError {
    /// Map a raw storage return code (negative or positive) to an error
    pub fn from_raw(raw: i32) -> Self {
        let code = raw.unsigned_abs();
        match code {
            8 => StorageError::DeviceFull,
            13 => StorageError::RecordTooBig,
            18 => StorageError::DeviceOverload,
            other => StorageError::Io(u8::try_from(other).unwrap_or(u8::MAX)),
        }
    }

    /// Positive wire code
    pub fn code(&self) -> u8 {
        match self {
            StorageError::DeviceFull => 8,
            StorageError::RecordTooBig => 13,
            StorageError::DeviceOverload => 18,
            StorageError::Io(code) => *code,
        }
    }

    /// Raw (negated) form, as returned by a storage engine
    pub fn to_raw(&self) -> i32 {
        -i32::from(self.code())
    }

    fn result_code(&self) -> ResultCode {
        match self {
            StorageError::DeviceFull => ResultCode::OutOfSpace,
            StorageError::RecordTooBig => ResultCode::RecordTooBig,
            StorageError::DeviceOverload => ResultCode::DeviceOverload,
            StorageError::Io(code) => ResultCode::Other(*code),
        }
    }
}

/// Wire result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Success
    Ok,
    /// Unclassified failure
    Unknown,
    /// Record not found
    NotFound,
    /// Generation mismatch
    Generation,
    /// Bad parameter
    BadParam,
    /// Record already exists
    RecordExists,
    /// Out of space
    OutOfSpace,
    /// Record too big
    RecordTooBig,
    /// Device overload
    DeviceOverload,
    /// Forbidden
    Forbidden,
    /// Passthrough code without a dedicated variant
    Other(u8),
}

impl ResultCode {
    /// Numeric code as sent to callers
    pub fn as_u8(self) -> u8 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::Unknown => 1,
            ResultCode::NotFound => 2,
            ResultCode::Generation => 3,
            ResultCode::BadParam => 4,
            ResultCode::RecordExists => 5,
            ResultCode::OutOfSpace => 8,
            ResultCode::RecordTooBig => 13,
            ResultCode::DeviceOverload => 18,
            ResultCode::Forbidden => 22,
            ResultCode::Other(code) => code,
        }
    }
}
