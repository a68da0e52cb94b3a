//! In-memory storage engine
//!
//! Stores each record as a self-checking block in a hash map keyed by digest.
//! Enforces a maximum record size and a total device capacity, counts writes
//! per write-buffer class, and tracks open handles so callers can verify
//! every handle is closed.
//!
//! Each block remembers the record instance that wrote it. `destroy` only
//! removes a block still owned by the given instance, so reclaiming a
//! deleted record never touches a newer record for the same digest.
//!
//! # Block Layout
//!
//! ```text
//! ┌────────────┬──────────┬───────────────┬───────────┬────────────┬──────────┬──────────┐
//! │ Magic (2)  │ Gen (2)  │ LUT (8)       │ Void (4)  │ NBins (2)  │ Len (4)  │ Pickle   │
//! └────────────┴──────────┴───────────────┴───────────┴────────────┴──────────┴──────────┘
//! followed by CRC32 (4) over everything before it
//! ```
//!
//! # Fault injection
//!
//! `fail_next_write` and `fail_next_read` arm a one-shot error returned by
//! the next `write` or `read`.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use strata_core::{Digest, Generation, StorageError, WriteBuffer};
use tracing::debug;

use crate::device::{StorageEngine, StorageRecord, StoredBlock};
use crate::record::{Record, RecordMeta};

const BLOCK_MAGIC: u16 = 0x5352;
const HEADER_LEN: usize = 2 + 2 + 8 + 4 + 2 + 4;
const CRC_LEN: usize = 4;

/// Error code reported when a stored block fails its checksum
const CORRUPT_BLOCK_CODE: u8 = 1;

#[derive(Debug)]
struct Block {
    owner: u64,
    bytes: Vec<u8>,
}

/// In-memory storage engine
#[derive(Debug)]
pub struct MemoryDevice {
    blocks: RwLock<FxHashMap<Digest, Block>>,
    max_record_size: usize,
    capacity: u64,
    used_bytes: AtomicU64,
    writes: [AtomicU64; 3],
    open_handles: AtomicI64,
    fail_next: Mutex<Option<StorageError>>,
    fail_next_read: Mutex<Option<StorageError>>,
}

impl MemoryDevice {
    /// Create a device with a per-record size limit and total capacity
    pub fn new(max_record_size: usize, capacity: u64) -> Self {
        MemoryDevice {
            blocks: RwLock::new(FxHashMap::default()),
            max_record_size,
            capacity,
            used_bytes: AtomicU64::new(0),
            writes: Default::default(),
            open_handles: AtomicI64::new(0),
            fail_next: Mutex::new(None),
            fail_next_read: Mutex::new(None),
        }
    }

    /// Make the next `write` fail with `error`
    pub fn fail_next_write(&self, error: StorageError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Make the next `read` fail with `error`
    pub fn fail_next_read(&self, error: StorageError) {
        *self.fail_next_read.lock() = Some(error);
    }

    /// Bytes held by stored blocks
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Relaxed)
    }

    /// Number of stored records
    pub fn record_count(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether a block is stored for `digest`
    pub fn contains(&self, digest: &Digest) -> bool {
        self.blocks.read().contains_key(digest)
    }

    /// Successful writes through a write-buffer class
    pub fn writes(&self, write_buffer: WriteBuffer) -> u64 {
        self.writes[buffer_index(write_buffer)].load(Ordering::Relaxed)
    }

    /// Handles opened and not yet closed
    pub fn open_handles(&self) -> i64 {
        self.open_handles.load(Ordering::Relaxed)
    }

    fn encode(meta: &RecordMeta, n_bins: u16, pickle: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + pickle.len() + CRC_LEN);
        // Writes into a Vec cannot fail.
        let _ = buf.write_u16::<BigEndian>(BLOCK_MAGIC);
        let _ = buf.write_u16::<BigEndian>(meta.generation.get());
        let _ = buf.write_u64::<BigEndian>(meta.last_update_time);
        let _ = buf.write_u32::<BigEndian>(meta.void_time);
        let _ = buf.write_u16::<BigEndian>(n_bins);
        let _ = buf.write_u32::<BigEndian>(pickle.len() as u32);
        buf.extend_from_slice(pickle);
        let crc = crc32fast::hash(&buf);
        let _ = buf.write_u32::<BigEndian>(crc);
        buf
    }

    fn decode(block: &[u8]) -> Option<StoredBlock> {
        if block.len() < HEADER_LEN + CRC_LEN {
            return None;
        }
        let (body, trailer) = block.split_at(block.len() - CRC_LEN);
        if crc32fast::hash(body) != BigEndian::read_u32(trailer) {
            return None;
        }
        if BigEndian::read_u16(&body[0..2]) != BLOCK_MAGIC {
            return None;
        }
        let len = BigEndian::read_u32(&body[18..22]) as usize;
        let pickle = body.get(HEADER_LEN..)?;
        if pickle.len() != len {
            return None;
        }

        Some(StoredBlock {
            meta: RecordMeta {
                generation: Generation::new(BigEndian::read_u16(&body[2..4])),
                last_update_time: BigEndian::read_u64(&body[4..12]),
                void_time: BigEndian::read_u32(&body[12..16]),
            },
            n_bins: BigEndian::read_u16(&body[16..18]),
            pickle: pickle.to_vec(),
        })
    }

    fn open_handle<'a>(&self, digest: &Digest, is_create: bool) -> StorageRecord<'a> {
        self.open_handles.fetch_add(1, Ordering::Relaxed);
        StorageRecord::new(*digest, is_create)
    }
}

impl StorageEngine for MemoryDevice {
    fn create<'a>(&self, digest: &Digest) -> StorageRecord<'a> {
        self.open_handle(digest, true)
    }

    fn open<'a>(&self, digest: &Digest) -> StorageRecord<'a> {
        self.open_handle(digest, false)
    }

    fn write(&self, rd: &StorageRecord<'_>, record: &Record) -> Result<(), StorageError> {
        if let Some(error) = self.fail_next.lock().take() {
            debug!(target: "strata::device", digest = %rd.digest(), %error, "injected write failure");
            return Err(error);
        }

        let block = Self::encode(&record.meta, rd.n_bins(), rd.pickle().unwrap_or(&[]));
        if block.len() > self.max_record_size {
            return Err(StorageError::RecordTooBig);
        }

        let mut blocks = self.blocks.write();
        let prior = blocks.get(rd.digest()).map(|b| b.bytes.len()).unwrap_or(0) as u64;
        let used = self.used_bytes.load(Ordering::Relaxed);
        if used - prior + block.len() as u64 > self.capacity {
            return Err(StorageError::DeviceFull);
        }

        self.used_bytes
            .store(used - prior + block.len() as u64, Ordering::Relaxed);
        blocks.insert(
            *rd.digest(),
            Block {
                owner: record.instance(),
                bytes: block,
            },
        );
        self.writes[buffer_index(rd.write_buffer())].fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read(&self, digest: &Digest) -> Result<Option<StoredBlock>, StorageError> {
        if let Some(error) = self.fail_next_read.lock().take() {
            debug!(target: "strata::device", %digest, %error, "injected read failure");
            return Err(error);
        }

        match self.blocks.read().get(digest) {
            None => Ok(None),
            Some(block) => Self::decode(&block.bytes)
                .map(Some)
                .ok_or(StorageError::Io(CORRUPT_BLOCK_CODE)),
        }
    }

    fn close(&self, _rd: StorageRecord<'_>) {
        self.open_handles.fetch_sub(1, Ordering::Relaxed);
    }

    fn destroy(&self, digest: &Digest, instance: u64) {
        let mut blocks = self.blocks.write();
        if blocks.get(digest).map(|b| b.owner) != Some(instance) {
            return;
        }
        if let Some(block) = blocks.remove(digest) {
            self.used_bytes
                .fetch_sub(block.bytes.len() as u64, Ordering::Relaxed);
        }
    }
}

fn buffer_index(write_buffer: WriteBuffer) -> usize {
    match write_buffer {
        WriteBuffer::Master => 0,
        WriteBuffer::Prole => 1,
        WriteBuffer::Uncached => 2,
    }
}
