//! Fixed-width binary codec for store slots
//!
//! Every record type is laid out as a run of fixed-width fields followed by
//! a shared trailer:
//!
//! ```text
//! [ entity fields ... ][ status: u8 ][ next_free: i32 LE ]
//! ```
//!
//! The trailer is what makes slot recycling work. A live slot (status 1)
//! ignores `next_free`; a freed slot (status 0) uses it as the link to the
//! next free slot. [`Slot`] makes that split explicit: the status byte is
//! inspected first and decides how the trailing link is read.

use crate::error::{Result, ShelfError};
use crate::header::NO_FREE_SLOT;
use serde::{Deserialize, Serialize};

/// Status byte of a live record
pub const STATUS_ACTIVE: u8 = 1;

/// Status byte of a deleted (freed) record
pub const STATUS_DELETED: u8 = 0;

/// Status byte + next_free link
pub const TRAILER_SIZE: usize = 1 + 4;

/// Live/deleted flag shared by catalog items and members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RecordStatus {
    Deleted = 0,
    Active = 1,
}

impl RecordStatus {
    /// Anything other than 1 reads as deleted
    pub fn from_u8(value: u8) -> Self {
        match value {
            STATUS_ACTIVE => Self::Active,
            _ => Self::Deleted,
        }
    }
}

/// Encode `text` into exactly `width` bytes
///
/// Longer input is cut at the last UTF-8 character boundary that fits;
/// the remainder is filled with spaces.
pub fn fit_text(text: &str, width: usize) -> Vec<u8> {
    let mut end = text.len().min(width);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut bytes = Vec::with_capacity(width);
    bytes.extend_from_slice(&text.as_bytes()[..end]);
    bytes.resize(width, b' ');
    bytes
}

/// Decode a padded text field, dropping trailing spaces and NULs
pub fn read_text(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |pos| pos + 1);

    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Sequential writer for fixed-width fields
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        FieldWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn text(&mut self, value: &str, width: usize) -> &mut Self {
        self.buf.extend_from_slice(&fit_text(value, width));
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Sequential reader for fixed-width fields
///
/// Callers check the total length up front (see [`Slot::decode`]), so the
/// individual reads index directly.
pub struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        FieldReader { bytes, pos: 0 }
    }

    fn take(&mut self, width: usize) -> &'a [u8] {
        let field = &self.bytes[self.pos..self.pos + width];
        self.pos += width;
        field
    }

    pub fn text(&mut self, width: usize) -> String {
        read_text(self.take(width))
    }

    pub fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    pub fn u32(&mut self) -> u32 {
        let b = self.take(4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    pub fn i32(&mut self) -> i32 {
        let b = self.take(4);
        i32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }
}

/// A record type that can live in a [`RecordStore`](crate::store::RecordStore)
pub trait Record: Clone + std::fmt::Debug {
    /// Human-readable kind, used in errors and logs
    const KIND: &'static str;

    /// Identifier prefix used when deriving new identifiers
    const ID_PREFIX: char;

    /// Full slot width in bytes, trailer included
    const WIDTH: usize;

    /// Record identifier
    fn id(&self) -> &str;

    /// Whether the status byte marks this record live
    fn is_active(&self) -> bool;

    /// Flip the status to its deleted/closed value
    fn mark_deleted(&mut self);

    /// Write every field up to and including the status byte
    fn write_fields(&self, w: &mut FieldWriter);

    /// Read every field up to and including the status byte
    fn read_fields(r: &mut FieldReader<'_>) -> Self;
}

/// Decoded content of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<R> {
    /// Live record; its trailing link is unused
    Active(R),

    /// Freed slot. The record bytes stay behind as a tombstone until the
    /// slot is reused.
    Free { next_free: i32, record: R },
}

impl<R: Record> Slot<R> {
    /// Wrap a record according to its own status
    ///
    /// Inactive records are not linked into any free list here.
    pub fn from_record(record: R) -> Self {
        if record.is_active() {
            Slot::Active(record)
        } else {
            Slot::Free {
                next_free: NO_FREE_SLOT,
                record,
            }
        }
    }

    /// Build a free-list node linking to `next_free`
    pub fn free(mut record: R, next_free: i32) -> Self {
        record.mark_deleted();
        Slot::Free { next_free, record }
    }

    pub fn record(&self) -> &R {
        match self {
            Slot::Active(record) | Slot::Free { record, .. } => record,
        }
    }

    pub fn into_record(self) -> R {
        match self {
            Slot::Active(record) | Slot::Free { record, .. } => record,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Slot::Active(_))
    }

    /// Free-list link, for freed slots only
    pub fn next_free(&self) -> Option<i32> {
        match self {
            Slot::Active(_) => None,
            Slot::Free { next_free, .. } => Some(*next_free),
        }
    }

    /// Encode to exactly `R::WIDTH` bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut w = FieldWriter::with_capacity(R::WIDTH);
        let link = match self {
            Slot::Active(record) => {
                record.write_fields(&mut w);
                NO_FREE_SLOT
            }
            Slot::Free { next_free, record } => {
                record.write_fields(&mut w);
                *next_free
            }
        };
        w.i32(link);
        debug_assert_eq!(w.len(), R::WIDTH);
        w.into_bytes()
    }

    /// Decode one slot; fails if `bytes` is shorter than `R::WIDTH`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < R::WIDTH {
            return Err(ShelfError::MalformedRecord {
                kind: R::KIND,
                expected: R::WIDTH,
                actual: bytes.len(),
            });
        }

        let status = bytes[R::WIDTH - TRAILER_SIZE];
        let record = R::read_fields(&mut FieldReader::new(&bytes[..R::WIDTH - 4]));

        if status == STATUS_ACTIVE {
            Ok(Slot::Active(record))
        } else {
            let mut tail = FieldReader::new(&bytes[R::WIDTH - 4..R::WIDTH]);
            Ok(Slot::Free {
                next_free: tail.i32(),
                record,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_text_pads_with_spaces() {
        assert_eq!(fit_text("ab", 4), b"ab  ".to_vec());
    }

    #[test]
    fn test_fit_text_truncates() {
        assert_eq!(fit_text("abcdef", 4), b"abcd".to_vec());
    }

    #[test]
    fn test_fit_text_respects_char_boundary() {
        // "é" is two bytes; cutting at 2 would split it
        let bytes = fit_text("aé", 2);
        assert_eq!(bytes, b"a ".to_vec());
        assert_eq!(read_text(&bytes), "a");
    }

    #[test]
    fn test_read_text_strips_spaces_and_nuls() {
        assert_eq!(read_text(b"M001"), "M001");
        assert_eq!(read_text(b"hi  \0\0"), "hi");
        assert_eq!(read_text(b"    "), "");
        assert_eq!(read_text(b"a b "), "a b");
    }

    #[test]
    fn test_read_text_lossy_on_invalid_utf8() {
        assert_eq!(read_text(&[b'o', b'k', 0xFF]), "ok\u{FFFD}");
    }

    #[test]
    fn test_field_writer_layout() {
        let mut w = FieldWriter::with_capacity(13);
        w.text("x", 4).u8(7).u32(258).i32(-1);
        assert_eq!(
            w.into_bytes(),
            vec![b'x', b' ', b' ', b' ', 7, 2, 1, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_field_reader_round_trip() {
        let mut w = FieldWriter::with_capacity(13);
        w.text("abc", 4).u8(9).u32(70_000).i32(-5);
        let bytes = w.into_bytes();

        let mut r = FieldReader::new(&bytes);
        assert_eq!(r.text(4), "abc");
        assert_eq!(r.u8(), 9);
        assert_eq!(r.u32(), 70_000);
        assert_eq!(r.i32(), -5);
    }

    #[test]
    fn test_record_status_from_u8() {
        assert_eq!(RecordStatus::from_u8(1), RecordStatus::Active);
        assert_eq!(RecordStatus::from_u8(0), RecordStatus::Deleted);
        assert_eq!(RecordStatus::from_u8(42), RecordStatus::Deleted);
    }
}
