//! Block device abstraction over a fixed-size host image file.
//!
//! This is the only path by which the rest of the crate touches the backing
//! file: every higher-level structure is expressed in terms of whole-block
//! reads and writes through [`BlockDevice`].

use crate::fs::error::{FsError, FsResult};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Size in bytes of one block.
pub const BLOCK_SIZE: usize = 512;
/// Total number of blocks on the simulated disk.
pub const DISK_BLOCKS: u32 = 4096;
/// Total size in bytes of the backing image file.
pub const DISK_SIZE: u64 = BLOCK_SIZE as u64 * DISK_BLOCKS as u64;

/// A fixed-size disk image, addressed in whole blocks.
pub struct BlockDevice {
    file: File,
}

impl BlockDevice {
    /// Opens the image at `path`, creating and zero-extending it to
    /// [`DISK_SIZE`] bytes if it does not already exist.
    pub fn open<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        let path = path.as_ref();
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(f) => f,
            Err(_) => {
                let f = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)?;
                f.set_len(DISK_SIZE)?;
                f
            }
        };
        Ok(Self { file })
    }

    /// Flushes and releases the underlying file handle.
    pub fn close(mut self) -> FsResult<()> {
        self.file.flush()?;
        Ok(())
    }

    /// Reads block `n` into `buf`, which must be exactly [`BLOCK_SIZE`] bytes.
    pub fn read_block(&mut self, n: u32, buf: &mut [u8]) -> FsResult<()> {
        if n >= DISK_BLOCKS || buf.len() != BLOCK_SIZE {
            return Err(FsError::InvalidIndex);
        }
        self.file.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Writes `buf` (exactly [`BLOCK_SIZE`] bytes) to block `n`, flushing so
    /// a subsequent read on any thread observes the write.
    pub fn write_block(&mut self, n: u32, buf: &[u8]) -> FsResult<()> {
        if n >= DISK_BLOCKS || buf.len() != BLOCK_SIZE {
            return Err(FsError::InvalidIndex);
        }
        self.file.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(buf)?;
        self.file.flush()?;
        Ok(())
    }
}
