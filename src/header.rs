use crate::error::{Result, ShelfError};
use serde::{Deserialize, Serialize};

/// Size of the store header in bytes
pub const HEADER_SIZE: usize = 8;

/// Sentinel for an empty free list
pub const NO_FREE_SLOT: i32 = -1;

/// Store file header
///
/// Occupies the first 8 bytes of every store file:
///
/// ```text
/// offset 0: record_count (i32 LE)  slots ever allocated
/// offset 4: free_head    (i32 LE)  most recently freed slot, or -1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHeader {
    /// Total number of slots ever allocated (active + freed)
    pub record_count: i32,

    /// Head of the free list, or [`NO_FREE_SLOT`]
    pub free_head: i32,
}

impl StoreHeader {
    /// Header of a freshly initialized store
    pub fn new() -> Self {
        StoreHeader {
            record_count: 0,
            free_head: NO_FREE_SLOT,
        }
    }

    /// Whether a freed slot is available for reuse
    pub fn has_free_slot(&self) -> bool {
        self.free_head != NO_FREE_SLOT
    }

    /// Slot count as an index bound
    pub fn slot_count(&self) -> u32 {
        self.record_count.max(0) as u32
    }

    /// Check the header invariants
    pub fn validate(&self) -> Result<()> {
        if self.record_count < 0 {
            return Err(ShelfError::InvalidHeader(format!(
                "negative record count {}",
                self.record_count
            )));
        }

        if self.free_head != NO_FREE_SLOT
            && (self.free_head < 0 || self.free_head >= self.record_count)
        {
            return Err(ShelfError::InvalidHeader(format!(
                "free head {} outside 0..{}",
                self.free_head, self.record_count
            )));
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.record_count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.free_head.to_le_bytes());
        bytes
    }

    /// Deserialize and validate a header
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ShelfError::InvalidHeader(format!(
                "need {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let header = StoreHeader {
            record_count: i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            free_head: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        };

        header.validate()?;

        Ok(header)
    }
}

impl Default for StoreHeader {
    fn default() -> Self {
        Self::new()
    }
}
