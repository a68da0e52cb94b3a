//! Namespace configuration via `namespace.toml`
//!
//! A namespace is configured from a small TOML file. Missing fields take
//! defaults; `validate` rejects combinations the replace path cannot serve.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strata_core::{ConflictResolutionPolicy, StorageLayout};

/// Config file name for a namespace
pub const CONFIG_FILE_NAME: &str = "namespace.toml";

/// Longest namespace name
pub const MAX_NAMESPACE_NAME_LEN: usize = 31;

/// Smallest accepted `max_record_size`
pub const MIN_RECORD_SIZE: usize = 64;

/// Namespace configuration loaded from `namespace.toml`.
///
/// # Example
///
/// ```toml
/// name = "users"
/// storage = "device"
/// conflict_resolution_policy = "last-update-time"
/// index_capacity = 1048576
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceConfig {
    /// Namespace name.
    pub name: String,
    /// Where bins live: `"memory"` or `"device"`.
    #[serde(default = "default_storage_str")]
    pub storage: String,
    /// Records hold at most one bin.
    #[serde(default)]
    pub single_bin: bool,
    /// Policy used for migration and duplicate resolution.
    #[serde(default)]
    pub conflict_resolution_policy: ConflictResolutionPolicy,
    /// Strong-consistency namespace.
    #[serde(default)]
    pub strong_consistency: bool,
    /// Index arena slots.
    #[serde(default = "default_index_capacity")]
    pub index_capacity: u32,
    /// Largest record the device accepts, in bytes.
    #[serde(default = "default_max_record_size")]
    pub max_record_size: usize,
    /// Total device capacity, in bytes.
    #[serde(default = "default_device_capacity")]
    pub device_capacity: u64,
    /// Pickle codec id.
    #[serde(default = "default_codec_str")]
    pub codec: String,
}

fn default_storage_str() -> String {
    "memory".to_string()
}

fn default_codec_str() -> String {
    "flat".to_string()
}

fn default_index_capacity() -> u32 {
    1 << 20
}

fn default_max_record_size() -> usize {
    1024 * 1024
}

fn default_device_capacity() -> u64 {
    4 * 1024 * 1024 * 1024
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            name: "test".to_string(),
            storage: default_storage_str(),
            single_bin: false,
            conflict_resolution_policy: ConflictResolutionPolicy::default(),
            strong_consistency: false,
            index_capacity: default_index_capacity(),
            max_record_size: default_max_record_size(),
            device_capacity: default_device_capacity(),
            codec: default_codec_str(),
        }
    }
}

impl NamespaceConfig {
    /// Create a config with defaults for the named namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set storage to `"memory"` or `"device"`
    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = storage.into();
        self
    }

    /// Set single-bin mode
    pub fn with_single_bin(mut self, single_bin: bool) -> Self {
        self.single_bin = single_bin;
        self
    }

    /// Set the conflict-resolution policy
    pub fn with_conflict_resolution_policy(mut self, policy: ConflictResolutionPolicy) -> Self {
        self.conflict_resolution_policy = policy;
        self
    }

    /// Set strong-consistency mode
    pub fn with_strong_consistency(mut self, enabled: bool) -> Self {
        self.strong_consistency = enabled;
        self
    }

    /// Set the index arena size
    pub fn with_index_capacity(mut self, slots: u32) -> Self {
        self.index_capacity = slots;
        self
    }

    /// Set the per-record size limit
    pub fn with_max_record_size(mut self, bytes: usize) -> Self {
        self.max_record_size = bytes;
        self
    }

    /// Set the device capacity
    pub fn with_device_capacity(mut self, bytes: u64) -> Self {
        self.device_capacity = bytes;
        self
    }

    /// Set the pickle codec id
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Storage layout implied by `storage` and `single_bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `storage` is not `"memory"` or `"device"`.
    pub fn layout(&self) -> Result<StorageLayout, ConfigError> {
        let bins_in_memory = match self.storage.as_str() {
            "memory" => true,
            "device" => false,
            other => return Err(ConfigError::InvalidStorage(other.to_string())),
        };
        Ok(StorageLayout {
            bins_in_memory,
            single_bin: self.single_bin,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() || self.name.len() > MAX_NAMESPACE_NAME_LEN {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }
        self.layout()?;
        if self.conflict_resolution_policy == ConflictResolutionPolicy::Consistency {
            return Err(ConfigError::ConsistencyPolicyNotConfigurable);
        }
        if self.index_capacity == 0 {
            return Err(ConfigError::ZeroIndexCapacity);
        }
        if self.max_record_size < MIN_RECORD_SIZE {
            return Err(ConfigError::RecordSizeTooSmall(self.max_record_size));
        }
        if self.device_capacity < self.max_record_size as u64 {
            return Err(ConfigError::DeviceSmallerThanRecord);
        }
        if strata_storage::get_codec(&self.codec).is_err() {
            return Err(ConfigError::UnknownCodec(self.codec.clone()));
        }
        Ok(())
    }

    /// Small in-memory namespace for tests
    pub fn for_testing() -> Self {
        Self {
            name: "test".to_string(),
            index_capacity: 1024,
            max_record_size: 128 * 1024,
            device_capacity: 64 * 1024 * 1024,
            ..Self::default()
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Namespace configuration
name = "test"

# Where bins live: "memory" (default) or "device"
storage = "memory"

# Records hold at most one bin (default: false)
single_bin = false

# Conflict resolution for migration and duplicate resolution:
#   "generation" (default) or "last-update-time"
# Replica writes always resolve by last-update-time.
conflict_resolution_policy = "generation"

# Strong consistency (default: false)
strong_consistency = false

# Index arena slots (default: 1048576)
index_capacity = 1048576

# Largest record the device accepts, bytes (default: 1 MiB)
max_record_size = 1048576

# Total device capacity, bytes (default: 4 GiB)
device_capacity = 4294967296

# Pickle codec (default: "flat")
codec = "flat"
"#
    }

    /// Parse and validate config from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NamespaceConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Namespace configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("Failed to access config file '{path}': {reason}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        reason: String,
    },

    /// TOML could not be parsed
    #[error("Failed to parse namespace config: {0}")]
    Parse(String),

    /// Namespace name empty or too long
    #[error("Invalid namespace name '{0}'")]
    InvalidName(String),

    /// Unknown storage kind
    #[error("Invalid storage '{0}'. Expected \"memory\" or \"device\".")]
    InvalidStorage(String),

    /// The consistency policy follows from `strong_consistency`
    #[error("conflict_resolution_policy cannot be \"consistency\"; set strong_consistency instead")]
    ConsistencyPolicyNotConfigurable,

    /// Index needs at least one slot
    #[error("index_capacity must be at least 1")]
    ZeroIndexCapacity,

    /// Record size limit below the minimum
    #[error("max_record_size {0} is below the minimum of 64 bytes")]
    RecordSizeTooSmall(usize),

    /// Device cannot hold even one maximum-size record
    #[error("device_capacity cannot be smaller than max_record_size")]
    DeviceSmallerThanRecord,

    /// No pickle codec registered under this id
    #[error("Unknown codec '{0}'")]
    UnknownCodec(String),
}
