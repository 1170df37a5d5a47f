//! `DiskManager` is the page-file: the narrow, synchronous block-addressed
//! interface the buffer pool consumes. Block `n` occupies file bytes
//! `[n * PAGE_SIZE, (n + 1) * PAGE_SIZE)` — no header page is prepended, so
//! the total page count is always `file_len / PAGE_SIZE`, recomputed on
//! `open` rather than trusted from a stored counter.
//!
//! Every operation here runs to completion before returning: there is no
//! background worker thread and nothing is scheduled. The buffer pool is the
//! only client allowed to hold a given page file open at a time.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::common::config::PAGE_SIZE;
use crate::common::error::{DbError, DbResult};
use crate::common::PageId;

/// Takes care of allocation, reading, and writing of fixed-size pages
/// within a single named file.
#[derive(Debug)]
pub struct DiskManager {
    file: File,
    file_name: String,
    total_num_pages: usize,
    num_reads: usize,
    num_writes: usize,
}

impl DiskManager {
    /// Creates a fresh page file containing exactly one zero-filled page.
    /// Fails with `FileAlreadyExists` if a file of this name is already on
    /// disk.
    pub fn create(file_name: &str) -> DbResult<Self> {
        if Path::new(file_name).exists() {
            return Err(DbError::FileAlreadyExists(file_name.to_string()));
        }

        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(file_name)
            .map_err(|e| DbError::FileCreationFailed(format!("{file_name}: {e}")))?;

        file.write_all(&[0u8; PAGE_SIZE])
            .map_err(|e| DbError::WriteFailed(e.to_string()))?;
        file.flush().map_err(|e| DbError::WriteFailed(e.to_string()))?;

        Ok(Self {
            file,
            file_name: file_name.to_string(),
            total_num_pages: 1,
            num_reads: 0,
            num_writes: 0,
        })
    }

    /// Opens an existing page file. Fails with `FileNotFound` if it doesn't
    /// exist, or a `ReadFailed` if its length isn't an exact multiple of
    /// `PAGE_SIZE` (a corrupt header, in spec terms).
    pub fn open(file_name: &str) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(file_name)
            .map_err(|_| DbError::FileNotFound(file_name.to_string()))?;

        let len = file
            .metadata()
            .map_err(|e| DbError::ReadFailed(e.to_string()))?
            .len() as usize;
        if len % PAGE_SIZE != 0 {
            return Err(DbError::ReadFailed(format!(
                "{file_name}: length {len} is not a multiple of PAGE_SIZE ({PAGE_SIZE})"
            )));
        }

        Ok(Self {
            file,
            file_name: file_name.to_string(),
            total_num_pages: len / PAGE_SIZE,
            num_reads: 0,
            num_writes: 0,
        })
    }

    /// Deletes the named page file from disk. Does not require the file to
    /// be open.
    pub fn destroy(file_name: &str) -> DbResult<()> {
        fs::remove_file(file_name).map_err(|_| DbError::FileNotFound(file_name.to_string()))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total_num_pages(&self) -> usize {
        self.total_num_pages
    }

    pub fn num_reads(&self) -> usize {
        self.num_reads
    }

    pub fn num_writes(&self) -> usize {
        self.num_writes
    }

    /// Reads page `page_id` into `buf`. `buf` must be exactly `PAGE_SIZE`
    /// bytes. Fails with `NoSuchPage` if `page_id` is beyond the current
    /// page count.
    pub fn read_block(&mut self, page_id: PageId, buf: &mut [u8]) -> DbResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        if page_id as usize >= self.total_num_pages {
            return Err(DbError::NoSuchPage(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::ReadFailed(e.to_string()))?;
        self.file
            .read_exact(buf)
            .map_err(|e| DbError::ReadFailed(e.to_string()))?;

        self.num_reads += 1;
        debug!("disk read: page {page_id} from {}", self.file_name);
        Ok(())
    }

    /// Overwrites page `page_id` with the contents of `buf`, which must be
    /// exactly `PAGE_SIZE` bytes. Fails with `NoSuchPage` if `page_id` is
    /// beyond the current page count — the heap layer is responsible for
    /// calling `ensure_capacity`/`append_empty_block` first when it means to
    /// extend the file.
    pub fn write_block(&mut self, page_id: PageId, buf: &[u8]) -> DbResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        if page_id as usize >= self.total_num_pages {
            return Err(DbError::NoSuchPage(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::WriteFailed(e.to_string()))?;
        self.file
            .write_all(buf)
            .map_err(|e| DbError::WriteFailed(e.to_string()))?;
        self.file
            .flush()
            .map_err(|e| DbError::WriteFailed(e.to_string()))?;

        self.num_writes += 1;
        debug!("disk write: page {page_id} to {}", self.file_name);
        Ok(())
    }

    /// Appends one zero-filled page to the end of the file.
    pub fn append_empty_block(&mut self) -> DbResult<PageId> {
        let new_page_id = self.total_num_pages as PageId;
        self.file
            .seek(SeekFrom::End(0))
            .map_err(|e| DbError::WriteFailed(e.to_string()))?;
        self.file
            .write_all(&[0u8; PAGE_SIZE])
            .map_err(|e| DbError::WriteFailed(e.to_string()))?;
        self.file
            .flush()
            .map_err(|e| DbError::WriteFailed(e.to_string()))?;
        self.total_num_pages += 1;
        Ok(new_page_id)
    }

    /// Appends empty pages until the file holds at least `num_pages` pages.
    pub fn ensure_capacity(&mut self, num_pages: usize) -> DbResult<()> {
        while self.total_num_pages < num_pages {
            self.append_empty_block()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn create_fails_if_file_exists() {
        let dir = TempDir::new("test").unwrap();
        let db_file = dir.path().join("test.db");
        let db_file = db_file.to_str().unwrap();

        DiskManager::create(db_file).unwrap();
        let err = DiskManager::create(db_file).unwrap_err();
        assert!(matches!(err, DbError::FileAlreadyExists(_)));
    }

    #[test]
    fn open_missing_file_fails() {
        let err = DiskManager::open("/nonexistent/path/to/db").unwrap_err();
        assert!(matches!(err, DbError::FileNotFound(_)));
    }

    #[test]
    fn read_write_round_trip() {
        let dir = TempDir::new("test").unwrap();
        let db_file = dir.path().join("test.db");
        let db_file = db_file.to_str().unwrap();

        let mut dm = DiskManager::create(db_file).unwrap();
        dm.ensure_capacity(6).unwrap();

        let mut data = [0u8; PAGE_SIZE];
        data[..14].copy_from_slice(b"A test string.");

        dm.write_block(5, &data).unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        dm.read_block(5, &mut buf).unwrap();
        assert_eq!(buf, data);
        assert_eq!(dm.num_writes(), 1);
        assert_eq!(dm.num_reads(), 1);
    }

    #[test]
    fn read_past_end_fails() {
        let dir = TempDir::new("test").unwrap();
        let db_file = dir.path().join("test.db");
        let db_file = db_file.to_str().unwrap();

        let mut dm = DiskManager::create(db_file).unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        let err = dm.read_block(5, &mut buf).unwrap_err();
        assert!(matches!(err, DbError::NoSuchPage(5)));
    }

    #[test]
    fn reopen_preserves_total_page_count() {
        let dir = TempDir::new("test").unwrap();
        let db_file = dir.path().join("test.db");
        let db_file = db_file.to_str().unwrap();

        {
            let mut dm = DiskManager::create(db_file).unwrap();
            dm.ensure_capacity(4).unwrap();
        }
        let dm = DiskManager::open(db_file).unwrap();
        assert_eq!(dm.total_num_pages(), 4);
    }
}
