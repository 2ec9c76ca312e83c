//! Generic fixed-record store with free-list slot reuse
//!
//! A store file is an 8-byte [`StoreHeader`] followed by `record_count`
//! slots of `R::WIDTH` bytes each. Deleted slots are threaded into a LIFO
//! free list through their trailing `next_free` field and handed out again
//! by [`RecordStore::append_or_reuse`] before the file grows.
//!
//! ```text
//! ┌──────────────┬──────────┬──────────┬──────────┬─────
//! │ count │ head │ slot 0   │ slot 1   │ slot 2   │ ...
//! └──────────────┴──────────┴──────────┴──────────┴─────
//!   0      4      8          8+W        8+2W
//! ```

use crate::codec::{Record, Slot};
use crate::error::{Result, ShelfError};
use crate::header::{StoreHeader, HEADER_SIZE, NO_FREE_SLOT};
use crate::ids;
use crate::io::StoreFile;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, warn};

/// Record minus its identifier and status, as supplied by callers of
/// [`RecordStore::create`]
pub trait Draft {
    type Record: Record;

    fn into_record(self, id: String) -> Self::Record;
}

/// Partial update applied by [`RecordStore::update`]
pub trait Patch<R> {
    fn apply_to(self, record: &mut R);
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    pub id: String,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    AlreadyDeleted,
}

/// Slot-level persistence for one record type
pub struct RecordStore<R: Record> {
    file: StoreFile,

    /// Cached copy of the on-disk header; the file lock keeps it current
    header: StoreHeader,

    _record: PhantomData<R>,
}

impl<R: Record> RecordStore<R> {
    /// Open (or create) a store with durable writes
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open (or create) a store; `sync_writes = false` skips fsync
    pub fn open_with<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<Self> {
        let (file, header) = StoreFile::open(path, sync_writes)?;
        let mut store = RecordStore {
            file,
            header,
            _record: PhantomData,
        };
        store.check_free_head()?;
        Ok(store)
    }

    /// Reset a free-list head that names a live or unreadable slot
    ///
    /// The rest of the old chain is unreachable from such a head and stays
    /// leaked.
    fn check_free_head(&mut self) -> Result<()> {
        if !self.header.has_free_slot() {
            return Ok(());
        }

        let head = self.header.free_head as u32;
        match self.read(head) {
            Ok(Slot::Free { .. }) => return Ok(()),
            Ok(Slot::Active(_)) => {
                warn!(
                    "{} free head {} points at a live slot; resetting free list",
                    R::KIND,
                    head
                );
            }
            Err(e) if e.is_skippable() => {
                warn!(
                    "{} free head {} is unreadable ({}); resetting free list",
                    R::KIND,
                    head,
                    e
                );
            }
            Err(e) => return Err(e),
        }

        let mut header = self.header;
        header.free_head = NO_FREE_SLOT;
        self.write_header(header)
    }

    /// Cached header
    pub fn header(&self) -> StoreHeader {
        self.header
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of slots ever allocated
    pub fn record_count(&self) -> u32 {
        self.header.slot_count()
    }

    /// Re-read the header from disk and refresh the cache
    pub fn read_header(&mut self) -> Result<StoreHeader> {
        self.header = self.file.read_header()?;
        Ok(self.header)
    }

    /// Validate and durably write the header
    pub fn write_header(&mut self, header: StoreHeader) -> Result<()> {
        header.validate()?;
        self.file.write_header(&header)?;
        self.header = header;
        Ok(())
    }

    /// Byte offset of slot `index`
    pub const fn slot_offset(index: u32) -> u64 {
        HEADER_SIZE as u64 + index as u64 * R::WIDTH as u64
    }

    /// Read the raw bytes of slot `index`
    pub fn read_slot(&self, index: u32) -> Result<Vec<u8>> {
        let out_of_range = ShelfError::OutOfRange {
            index,
            record_count: self.record_count(),
        };
        if index >= self.record_count() {
            return Err(out_of_range);
        }

        let bytes = self.file.read_at(Self::slot_offset(index), R::WIDTH)?;
        if bytes.len() < R::WIDTH {
            return Err(out_of_range);
        }
        Ok(bytes)
    }

    /// Overwrite slot `index` with exactly `R::WIDTH` bytes; durable
    pub fn write_slot(&mut self, index: u32, bytes: &[u8]) -> Result<()> {
        if bytes.len() != R::WIDTH {
            return Err(ShelfError::MalformedRecord {
                kind: R::KIND,
                expected: R::WIDTH,
                actual: bytes.len(),
            });
        }
        self.file.write_at(Self::slot_offset(index), bytes)
    }

    /// Read and decode slot `index`
    pub fn read(&self, index: u32) -> Result<Slot<R>> {
        Slot::decode(&self.read_slot(index)?)
    }

    /// Rewrite an allocated slot in place
    ///
    /// The free list is not touched; use [`free_slot`](Self::free_slot) to
    /// delete.
    pub fn write(&mut self, index: u32, record: &R) -> Result<()> {
        if index >= self.record_count() {
            return Err(ShelfError::OutOfRange {
                index,
                record_count: self.record_count(),
            });
        }
        debug!("Rewriting {} slot {}", R::KIND, index);
        self.write_slot(index, &Slot::from_record(record.clone()).encode())
    }

    /// Store `record` in the most recently freed slot, or append a new slot
    ///
    /// Returns the slot index. The header is durable before this returns.
    ///
    /// A reused slot is unlinked in the header before it is overwritten, and
    /// an appended slot is written before the header counts it. A crash
    /// between the two writes therefore leaks at most one slot and never
    /// leaves the header naming a live slot as free.
    pub fn append_or_reuse(&mut self, record: &R) -> Result<u32> {
        let bytes = Slot::from_record(record.clone()).encode();
        let mut header = self.header;

        if header.has_free_slot() {
            let index = header.free_head as u32;
            let next_free = match self.read(index)? {
                Slot::Free { next_free, .. } => next_free,
                Slot::Active(_) => {
                    return Err(ShelfError::InvalidHeader(format!(
                        "{} free head {} points at a live slot",
                        R::KIND,
                        index
                    )))
                }
            };
            header.free_head = next_free;
            self.write_header(header)?;
            self.write_slot(index, &bytes)?;
            debug!("Reused {} slot {} (next free {})", R::KIND, index, next_free);
            Ok(index)
        } else {
            let index = header.slot_count();
            self.write_slot(index, &bytes)?;
            header.record_count += 1;
            self.write_header(header)?;
            debug!("Appended {} slot {}", R::KIND, index);
            Ok(index)
        }
    }

    /// Push slot `index` onto the free list
    ///
    /// Returns `false` without writing anything if the slot is already free.
    /// `record_count` never changes.
    pub fn free_slot(&mut self, index: u32) -> Result<bool> {
        let record = match self.read(index)? {
            Slot::Active(record) => record,
            Slot::Free { .. } => return Ok(false),
        };

        let mut header = self.header;
        self.write_slot(index, &Slot::free(record, header.free_head).encode())?;
        header.free_head = index as i32;
        self.write_header(header)?;

        debug!("Freed {} slot {}", R::KIND, index);
        Ok(true)
    }

    /// Scan every allocated slot in index order
    ///
    /// Truncated or undecodable slots are skipped. Each call starts a fresh
    /// scan.
    pub fn list_all(&self) -> Scan<'_, R> {
        Scan {
            store: self,
            next: 0,
            end: self.record_count(),
        }
    }

    /// First slot matching `predicate`, in index order
    pub fn find<F>(&self, mut predicate: F) -> Result<Option<(u32, Slot<R>)>>
    where
        F: FnMut(&Slot<R>) -> bool,
    {
        for entry in self.list_all() {
            let (index, slot) = entry?;
            if predicate(&slot) {
                return Ok(Some((index, slot)));
            }
        }
        Ok(None)
    }

    /// First slot, live or freed, whose record carries `id`
    pub fn find_by_id(&self, id: &str) -> Result<Option<(u32, Slot<R>)>> {
        self.find(|slot| slot.record().id() == id)
    }

    /// Every record with its status, in slot order
    pub fn list(&self) -> Result<Vec<R>> {
        self.list_all()
            .map(|entry| entry.map(|(_, slot)| slot.into_record()))
            .collect()
    }

    /// Only live records
    pub fn list_active(&self) -> Result<Vec<R>> {
        let mut records = Vec::new();
        for entry in self.list_all() {
            if let (_, Slot::Active(record)) = entry? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Identifier the next [`create`](Self::create) would assign
    pub fn next_id(&self) -> Result<String> {
        let records = self.list()?;
        ids::next_id(R::ID_PREFIX, records.iter().map(|r| r.id()))
    }

    /// Assign an identifier to `draft` and store it
    pub fn create<D>(&mut self, draft: D) -> Result<Created>
    where
        D: Draft<Record = R>,
    {
        let id = self.next_id()?;
        let record = draft.into_record(id.clone());
        let index = self.append_or_reuse(&record)?;
        Ok(Created { id, index })
    }

    /// Apply `patch` to the live record `id`
    pub fn update<P>(&mut self, id: &str, patch: P) -> Result<UpdateOutcome>
    where
        P: Patch<R>,
    {
        match self.find_by_id(id)? {
            None => Ok(UpdateOutcome::NotFound),
            Some((_, Slot::Free { .. })) => Ok(UpdateOutcome::Inactive),
            Some((index, Slot::Active(mut record))) => {
                patch.apply_to(&mut record);
                self.write(index, &record)?;
                Ok(UpdateOutcome::Updated)
            }
        }
    }

    /// Mark record `id` deleted and recycle its slot
    pub fn soft_delete(&mut self, id: &str) -> Result<DeleteOutcome> {
        match self.find_by_id(id)? {
            None => Ok(DeleteOutcome::NotFound),
            Some((_, Slot::Free { .. })) => Ok(DeleteOutcome::AlreadyDeleted),
            Some((index, Slot::Active(_))) => {
                self.free_slot(index)?;
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    /// Sync all writes to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync()
    }
}

/// Restartable full scan over a store, see [`RecordStore::list_all`]
pub struct Scan<'a, R: Record> {
    store: &'a RecordStore<R>,
    next: u32,
    end: u32,
}

impl<R: Record> Iterator for Scan<'_, R> {
    type Item = Result<(u32, Slot<R>)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let index = self.next;
            self.next += 1;

            match self.store.read(index) {
                Ok(slot) => return Some(Ok((index, slot))),
                Err(e) if e.is_skippable() => {
                    warn!("Skipping {} slot {}: {}", R::KIND, index, e);
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
