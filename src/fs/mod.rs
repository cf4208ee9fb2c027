//! The on-disk layout, metadata cache and the filesystem-wide lock
//! (spec.md ยง4.2, ยง4.5).
//!
//! [`Filesystem`] is the single owned object constructed at startup and
//! shared (via `Arc`) into every worker; its internal `Mutex<Inner>`
//! protects the cached superblock, both bitmaps and the block device
//! handle. Every public method below acquires that mutex on entry and
//! releases it on every exit path through ordinary RAII guard drop.

pub mod bitmap;
pub mod error;
pub mod inode;
pub mod layout;

use crate::disk::BlockDevice;
use bitmap::Bitmap;
use error::{FsError, FsResult};
use inode::{DirListEntry, DiskInfo};
use layout::{RawInode, Superblock, DATA_START_BLOCK, INODE_BITMAP_BLOCK, DATA_BITMAP_BLOCK, SUPERBLOCK_BLOCK};
use std::path::Path;
use std::sync::Mutex;

/// The in-memory mirror of the superblock and both bitmaps, plus the block
/// device handle they are written through to. Private to `fs::*`; every
/// field is reachable from the allocator and inode/directory submodules
/// but not from outside this module tree.
pub(crate) struct Inner {
    device: BlockDevice,
    superblock: Superblock,
    inode_bitmap: Bitmap,
    data_bitmap: Bitmap,
    formatted: bool,
}

impl Inner {
    fn open(mut device: BlockDevice) -> FsResult<Self> {
        let mut sb_buf = [0u8; crate::disk::BLOCK_SIZE];
        device.read_block(SUPERBLOCK_BLOCK, &mut sb_buf)?;
        let superblock = Superblock::from_block(&sb_buf);

        if superblock.magic != layout::MAGIC {
            return Ok(Self {
                device,
                superblock,
                inode_bitmap: Bitmap::zeroed(),
                data_bitmap: Bitmap::zeroed(),
                formatted: false,
            });
        }

        let mut inode_buf = [0u8; crate::disk::BLOCK_SIZE];
        device.read_block(INODE_BITMAP_BLOCK, &mut inode_buf)?;
        let mut data_buf = [0u8; crate::disk::BLOCK_SIZE];
        device.read_block(DATA_BITMAP_BLOCK, &mut data_buf)?;

        Ok(Self {
            device,
            superblock,
            inode_bitmap: Bitmap(inode_buf),
            data_bitmap: Bitmap(data_buf),
            formatted: true,
        })
    }

    fn require_formatted(&self) -> FsResult<()> {
        if self.formatted {
            Ok(())
        } else {
            Err(FsError::Unformatted)
        }
    }

    /// Unconditional re-initialization of on-disk state (spec.md ยง4.2).
    fn format_disk(&mut self) -> FsResult<()> {
        self.superblock = Superblock::formatted();
        self.write_superblock()?;

        self.inode_bitmap = Bitmap::zeroed();
        self.inode_bitmap.set(0);
        self.write_inode_bitmap()?;

        self.data_bitmap = Bitmap::zeroed();
        self.data_bitmap.set(0);
        self.write_data_bitmap()?;

        self.write_inode(
            0,
            RawInode::new(RawInode::TYPE_DIR, 0, {
                let mut b = [0u32; 8];
                b[0] = DATA_START_BLOCK;
                b
            }),
        )?;

        let zero_block = [0u8; crate::disk::BLOCK_SIZE];
        self.device.write_block(DATA_START_BLOCK, &zero_block)?;

        self.formatted = true;
        Ok(())
    }
}

/// A simulated single-directory filesystem backed by a fixed-size host
/// image file.
pub struct Filesystem {
    inner: Mutex<Inner>,
}

impl Filesystem {
    /// Opens (creating if necessary) the disk image at `path` and loads its
    /// cached metadata. An image whose superblock magic does not match
    /// remains open but unformatted: every operation other than
    /// [`Filesystem::format`] will fail with [`FsError::Unformatted`] until
    /// a format completes.
    pub fn open<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        let device = BlockDevice::open(path)?;
        let inner = Inner::open(device)?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Tells whether the image currently holds a valid, formatted
    /// filesystem.
    pub fn is_formatted(&self) -> bool {
        self.inner.lock().unwrap().formatted
    }

    /// Unconditionally reinitializes the on-disk state.
    pub fn format(&self) -> FsResult<()> {
        self.inner.lock().unwrap().format_disk()
    }

    /// Reports the cached superblock's state and free-space summary.
    pub fn show_disk_info(&self) -> FsResult<DiskInfo> {
        let guard = self.inner.lock().unwrap();
        guard.require_formatted()?;
        Ok(guard.show_disk_info())
    }

    /// Creates a new, empty regular file.
    pub fn create_file(&self, name: &str) -> FsResult<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.require_formatted()?;
        guard.create_file(name)
    }

    /// Deletes a file, freeing its inode and data blocks.
    pub fn delete_file(&self, name: &str) -> FsResult<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.require_formatted()?;
        guard.delete_file(name)
    }

    /// Lists every live entry in the root directory.
    pub fn list_directory(&self) -> FsResult<Vec<DirListEntry>> {
        let mut guard = self.inner.lock().unwrap();
        guard.require_formatted()?;
        guard.list_directory()
    }

    /// Reads up to `max_bytes` bytes from `name`.
    pub fn read_file(&self, name: &str, max_bytes: usize) -> FsResult<Vec<u8>> {
        let mut guard = self.inner.lock().unwrap();
        guard.require_formatted()?;
        guard.read_file(name, max_bytes)
    }

    /// Truncates and writes `data` to `name`, returning the number of
    /// bytes actually written (at most 8 x `BLOCK_SIZE`).
    pub fn write_file(&self, name: &str, data: &[u8]) -> FsResult<usize> {
        let mut guard = self.inner.lock().unwrap();
        guard.require_formatted()?;
        guard.write_file(name, data)
    }

    /// Copies `src` to a newly created file `dst`.
    pub fn copy_file(&self, src: &str, dst: &str) -> FsResult<()> {
        let mut guard = self.inner.lock().unwrap();
        guard.require_formatted()?;
        guard.copy_file(src, dst)
    }

    /// Flushes and releases the backing image file.
    pub fn close(self) -> FsResult<()> {
        self.inner.into_inner().unwrap().device.close()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env::temp_dir;
    use std::fs;

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let mut p = temp_dir();
        p.push(format!(
            "vfsim-fstest-{name}-{:?}",
            std::thread::current().id()
        ));
        p
    }

    fn fresh(name: &str) -> Filesystem {
        let path = tmp_path(name);
        let _ = fs::remove_file(&path);
        let fs = Filesystem::open(&path).unwrap();
        fs.format().unwrap();
        fs
    }

    #[test]
    fn format_resets_free_counts_and_empty_dir() {
        let fs = fresh("format");
        let info = fs.show_disk_info().unwrap();
        assert_eq!(info.free_inode_count, layout::MAX_FILES as u32 - 1);
        assert_eq!(info.free_data_count, layout::DATA_BLOCKS - 1);
        assert!(fs.list_directory().unwrap().is_empty());
    }

    #[test]
    fn unformatted_image_rejects_operations() {
        let path = tmp_path("unformatted");
        let _ = fs::remove_file(&path);
        let fs = Filesystem::open(&path).unwrap();
        assert!(!fs.is_formatted());
        assert!(matches!(fs.list_directory(), Err(FsError::Unformatted)));
    }

    #[test]
    fn create_write_read_round_trip() {
        let fs = fresh("rw");
        fs.create_file("a").unwrap();
        let payload = b"hello, world";
        let written = fs.write_file("a", payload).unwrap();
        assert_eq!(written, payload.len());
        let read_back = fs.read_file("a", payload.len()).unwrap();
        assert_eq!(&read_back, payload);
    }

    #[test]
    fn rewrite_shrinks_and_grows_correctly() {
        let fs = fresh("rewrite");
        fs.create_file("a").unwrap();
        fs.write_file("a", b"v1").unwrap();
        let before = fs.show_disk_info().unwrap().free_data_count;
        fs.write_file("a", b"a longer v2 payload").unwrap();
        let after = fs.show_disk_info().unwrap().free_data_count;
        assert_eq!(before, after);
        assert_eq!(fs.read_file("a", 64).unwrap(), b"a longer v2 payload");
    }

    #[test]
    fn delete_restores_free_counters() {
        let fs = fresh("delete");
        let before = fs.show_disk_info().unwrap();
        fs.create_file("a").unwrap();
        fs.delete_file("a").unwrap();
        let after = fs.show_disk_info().unwrap();
        assert_eq!(before.free_inode_count, after.free_inode_count);
        assert_eq!(before.free_data_count, after.free_data_count);
    }

    #[test]
    fn copy_is_independent_of_source() {
        let fs = fresh("copy");
        fs.create_file("a").unwrap();
        fs.write_file("a", b"data").unwrap();
        fs.copy_file("a", "b").unwrap();
        assert_eq!(fs.read_file("b", 64).unwrap(), b"data");
        fs.delete_file("a").unwrap();
        assert_eq!(fs.read_file("b", 64).unwrap(), b"data");
    }

    #[test]
    fn write_beyond_capacity_is_truncated() {
        let fs = fresh("big-write");
        fs.create_file("a").unwrap();
        let payload = vec![0x5a; 8 * crate::disk::BLOCK_SIZE + 100];
        let written = fs.write_file("a", &payload).unwrap();
        assert_eq!(written, 8 * crate::disk::BLOCK_SIZE);
    }

    #[test]
    fn zero_byte_write_allocates_nothing() {
        let fs = fresh("zero-write");
        fs.create_file("a").unwrap();
        let before = fs.show_disk_info().unwrap().free_data_count;
        let written = fs.write_file("a", &[]).unwrap();
        assert_eq!(written, 0);
        assert_eq!(fs.show_disk_info().unwrap().free_data_count, before);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let fs = fresh("dup");
        fs.create_file("a").unwrap();
        assert!(matches!(fs.create_file("a"), Err(FsError::AlreadyExists)));
    }

    #[test]
    fn missing_file_operations_fail() {
        let fs = fresh("missing");
        assert!(matches!(fs.delete_file("ghost"), Err(FsError::NotFound)));
        assert!(matches!(fs.read_file("ghost", 10), Err(FsError::NotFound)));
    }

    #[test]
    fn directory_full_at_capacity_boundary() {
        let fs = fresh("dir-full");
        for i in 0..layout::DIR_ENTRIES_PER_BLOCK {
            fs.create_file(&format!("f{i}")).unwrap();
        }
        assert!(matches!(
            fs.create_file("one-too-many"),
            Err(FsError::DirectoryFull)
        ));
    }
}
