//! Disk I/O for store files

use crate::error::{Result, ShelfError};
use crate::header::{StoreHeader, HEADER_SIZE};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Take an exclusive advisory lock on `file`, mapping contention to
/// [`ShelfError::StoreLocked`]
pub(crate) fn lock_exclusive(file: &File, path: &Path) -> Result<()> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(()),
        Err(e)
            if e.kind() == io::ErrorKind::WouldBlock
                || e.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
        {
            Err(ShelfError::StoreLocked(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// One open, exclusively locked store file
///
/// All reads and writes go through `&File`, so reads only need `&self`.
/// Every write is flushed and, when `sync_writes` is set, synced before
/// returning.
pub struct StoreFile {
    file: File,
    path: PathBuf,
    sync_writes: bool,
}

impl StoreFile {
    /// Open a store file, creating and initializing it if missing
    ///
    /// A file shorter than a header holds no slots and is (re)initialized
    /// with an empty header.
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<(Self, StoreHeader)> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        lock_exclusive(&file, path)?;

        let store = StoreFile {
            file,
            path: path.to_path_buf(),
            sync_writes,
        };

        let header = if store.len()? < HEADER_SIZE as u64 {
            let header = StoreHeader::new();
            store.write_header(&header)?;
            info!("Initialized store file {:?}", path);
            header
        } else {
            let header = store.read_header()?;
            debug!(
                "Opened store file {:?} ({} slots, free head {})",
                path, header.record_count, header.free_head
            );
            header
        };

        Ok((store, header))
    }

    /// Read the header from disk
    pub fn read_header(&self) -> Result<StoreHeader> {
        let mut buffer = [0u8; HEADER_SIZE];
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buffer)?;
        StoreHeader::from_bytes(&buffer)
    }

    /// Overwrite the header; durable on return
    pub fn write_header(&self, header: &StoreHeader) -> Result<()> {
        self.write_at(0, &header.to_bytes())
    }

    /// Read up to `len` bytes at `offset`
    ///
    /// Returns fewer bytes when the file ends early.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(len);
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.take(len as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Write `data` at `offset`; durable on return
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Current file length in bytes
    pub(crate) fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync all writes to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

impl Drop for StoreFile {
    fn drop(&mut self) {
        if let Err(e) = self.file.sync_all() {
            tracing::warn!("Failed to sync {:?} on close: {}", self.path, e);
        }
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::NO_FREE_SLOT;
    use tempfile::TempDir;

    #[test]
    fn test_open_initializes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.dat");

        let (file, header) = StoreFile::open(&path, true).unwrap();
        assert_eq!(header, StoreHeader::new());
        assert_eq!(file.len().unwrap(), HEADER_SIZE as u64);
        assert_eq!(file.read_header().unwrap().free_head, NO_FREE_SLOT);
    }

    #[test]
    fn test_reopen_keeps_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.dat");

        {
            let (file, _) = StoreFile::open(&path, true).unwrap();
            file.write_header(&StoreHeader {
                record_count: 4,
                free_head: 2,
            })
            .unwrap();
        }

        let (_, header) = StoreFile::open(&path, true).unwrap();
        assert_eq!(header.record_count, 4);
        assert_eq!(header.free_head, 2);
    }

    #[test]
    fn test_short_read_at_end_of_file() {
        let dir = TempDir::new().unwrap();
        let (file, _) = StoreFile::open(dir.path().join("s.dat"), false).unwrap();

        file.write_at(8, b"abc").unwrap();
        assert_eq!(file.read_at(8, 10).unwrap(), b"abc".to_vec());
        assert!(file.read_at(100, 4).unwrap().is_empty());
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.dat");

        let _first = StoreFile::open(&path, true).unwrap();
        assert!(matches!(
            StoreFile::open(&path, true),
            Err(ShelfError::StoreLocked(_))
        ));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relock.dat");

        drop(StoreFile::open(&path, true).unwrap());
        assert!(StoreFile::open(&path, true).is_ok());
    }
}
