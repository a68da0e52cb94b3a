//! Bin values
//!
//! A record's data is a set of named bins. Each bin holds one particle of a
//! small fixed set of types. The particle type tag is part of the pickle wire
//! format and must not be renumbered.

use std::fmt;

/// Particle type tag as it appears on the wire and on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParticleType {
    /// 64-bit signed integer
    Integer = 1,
    /// 64-bit float
    Float = 2,
    /// UTF-8 string
    String = 3,
    /// Opaque bytes
    Blob = 4,
    /// Boolean
    Bool = 17,
}

impl ParticleType {
    /// Decode a particle type tag
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ParticleType::Integer),
            2 => Some(ParticleType::Float),
            3 => Some(ParticleType::String),
            4 => Some(ParticleType::Blob),
            17 => Some(ParticleType::Bool),
            _ => None,
        }
    }
}

/// Value held by a bin
#[derive(Debug, Clone, PartialEq)]
pub enum BinValue {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Opaque bytes
    Blob(Vec<u8>),
    /// Boolean
    Bool(bool),
}

impl BinValue {
    /// Particle type of this value
    pub fn particle_type(&self) -> ParticleType {
        match self {
            BinValue::Integer(_) => ParticleType::Integer,
            BinValue::Float(_) => ParticleType::Float,
            BinValue::String(_) => ParticleType::String,
            BinValue::Blob(_) => ParticleType::Blob,
            BinValue::Bool(_) => ParticleType::Bool,
        }
    }

    /// Heap bytes held by this value
    ///
    /// Fixed-width particles live inline in the bin and cost nothing extra.
    pub fn heap_size(&self) -> usize {
        match self {
            BinValue::String(s) => s.len(),
            BinValue::Blob(b) => b.len(),
            BinValue::Integer(_) | BinValue::Float(_) | BinValue::Bool(_) => 0,
        }
    }
}

impl fmt::Display for BinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinValue::Integer(v) => write!(f, "{}", v),
            BinValue::Float(v) => write!(f, "{}", v),
            BinValue::String(v) => write!(f, "{:?}", v),
            BinValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
            BinValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for BinValue {
    fn from(v: i64) -> Self {
        BinValue::Integer(v)
    }
}

impl From<f64> for BinValue {
    fn from(v: f64) -> Self {
        BinValue::Float(v)
    }
}

impl From<&str> for BinValue {
    fn from(v: &str) -> Self {
        BinValue::String(v.to_string())
    }
}

impl From<String> for BinValue {
    fn from(v: String) -> Self {
        BinValue::String(v)
    }
}

impl From<Vec<u8>> for BinValue {
    fn from(v: Vec<u8>) -> Self {
        BinValue::Blob(v)
    }
}

impl From<bool> for BinValue {
    fn from(v: bool) -> Self {
        BinValue::Bool(v)
    }
}

/// A named value
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// Bin name, unique within a record
    pub name: String,
    /// Bin value
    pub value: BinValue,
}

impl Bin {
    /// Create a bin
    pub fn new(name: impl Into<String>, value: impl Into<BinValue>) -> Self {
        Bin {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Memory charged for this bin when resident in memory
    pub fn mem_size(&self) -> usize {
        std::mem::size_of::<Bin>() + self.name.len() + self.value.heap_size()
    }
}
