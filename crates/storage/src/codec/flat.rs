//! Flat pickle codec.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! repeated n_bins times:
//!     name_len: u8
//!     name:     [u8; name_len]
//!     particle: u8
//!     len:      u32
//!     value:    [u8; len]
//! crc32: u32   (over everything above)
//! ```
//!
//! The bin count is carried out of band in the remote record header.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::collections::HashSet;
use strata_core::limits::validate_bin_name;
use strata_core::{Bin, BinValue, ParticleType};

use super::traits::{CodecError, PickleCodec};

const CRC_LEN: usize = 4;

/// Flat pickle codec - length-prefixed bins with a CRC32 trailer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatCodec;

impl PickleCodec for FlatCodec {
    fn pack(&self, bins: &[Bin]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(bins.iter().map(encoded_len).sum::<usize>() + CRC_LEN);

        for bin in bins {
            // Writes into a Vec cannot fail.
            let _ = buf.write_u8(bin.name.len() as u8);
            buf.extend_from_slice(bin.name.as_bytes());
            let _ = buf.write_u8(bin.value.particle_type() as u8);
            match &bin.value {
                BinValue::Integer(v) => {
                    let _ = buf.write_u32::<BigEndian>(8);
                    let _ = buf.write_i64::<BigEndian>(*v);
                }
                BinValue::Float(v) => {
                    let _ = buf.write_u32::<BigEndian>(8);
                    let _ = buf.write_f64::<BigEndian>(*v);
                }
                BinValue::String(v) => {
                    let _ = buf.write_u32::<BigEndian>(v.len() as u32);
                    buf.extend_from_slice(v.as_bytes());
                }
                BinValue::Blob(v) => {
                    let _ = buf.write_u32::<BigEndian>(v.len() as u32);
                    buf.extend_from_slice(v);
                }
                BinValue::Bool(v) => {
                    let _ = buf.write_u32::<BigEndian>(1);
                    let _ = buf.write_u8(u8::from(*v));
                }
            }
        }

        let crc = crc32fast::hash(&buf);
        let _ = buf.write_u32::<BigEndian>(crc);
        buf
    }

    fn unpack(&self, pickle: &[u8], n_bins: u16) -> Result<Vec<Bin>, CodecError> {
        if pickle.len() < CRC_LEN {
            return Err(CodecError::Truncated {
                offset: 0,
                needed: CRC_LEN,
            });
        }

        let (body, trailer) = pickle.split_at(pickle.len() - CRC_LEN);
        let stored = BigEndian::read_u32(trailer);
        let computed = crc32fast::hash(body);
        if stored != computed {
            return Err(CodecError::ChecksumMismatch { stored, computed });
        }

        let mut reader = Reader { buf: body, pos: 0 };
        let mut bins = Vec::with_capacity(usize::from(n_bins));
        let mut seen = HashSet::with_capacity(usize::from(n_bins));

        for _ in 0..n_bins {
            let name_len = usize::from(reader.take(1)?[0]);
            let name = std::str::from_utf8(reader.take(name_len)?)
                .map_err(|e| CodecError::InvalidParticle {
                    particle: "bin name",
                    reason: e.to_string(),
                })?
                .to_string();
            validate_bin_name(&name)?;
            if !seen.insert(name.clone()) {
                return Err(CodecError::DuplicateBin(name));
            }

            let tag = reader.take(1)?[0];
            let particle = ParticleType::from_u8(tag).ok_or(CodecError::UnknownParticle(tag))?;
            let len = BigEndian::read_u32(reader.take(4)?) as usize;
            let raw = reader.take(len)?;

            bins.push(Bin {
                name,
                value: decode_particle(particle, raw)?,
            });
        }

        if reader.remaining() != 0 {
            return Err(CodecError::TrailingBytes(reader.remaining()));
        }

        Ok(bins)
    }

    fn codec_id(&self) -> &str {
        "flat"
    }
}

fn encoded_len(bin: &Bin) -> usize {
    let value_len = match &bin.value {
        BinValue::Integer(_) | BinValue::Float(_) => 8,
        BinValue::Bool(_) => 1,
        BinValue::String(s) => s.len(),
        BinValue::Blob(b) => b.len(),
    };
    1 + bin.name.len() + 1 + 4 + value_len
}

fn decode_particle(particle: ParticleType, raw: &[u8]) -> Result<BinValue, CodecError> {
    let fixed = |name: &'static str, want: usize| {
        if raw.len() == want {
            Ok(())
        } else {
            Err(CodecError::InvalidParticle {
                particle: name,
                reason: format!("expected {} bytes, got {}", want, raw.len()),
            })
        }
    };

    match particle {
        ParticleType::Integer => {
            fixed("integer", 8)?;
            Ok(BinValue::Integer(BigEndian::read_i64(raw)))
        }
        ParticleType::Float => {
            fixed("float", 8)?;
            Ok(BinValue::Float(BigEndian::read_f64(raw)))
        }
        ParticleType::Bool => {
            fixed("bool", 1)?;
            match raw[0] {
                0 => Ok(BinValue::Bool(false)),
                1 => Ok(BinValue::Bool(true)),
                other => Err(CodecError::InvalidParticle {
                    particle: "bool",
                    reason: format!("value {}", other),
                }),
            }
        }
        ParticleType::String => std::str::from_utf8(raw)
            .map(|s| BinValue::String(s.to_string()))
            .map_err(|e| CodecError::InvalidParticle {
                particle: "string",
                reason: e.to_string(),
            }),
        ParticleType::Blob => Ok(BinValue::Blob(raw.to_vec())),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}
