//! Inode addressing and the directory engine (spec.md ยง4.4).
//!
//! The root directory is always inode 0, whose sole data block holds a
//! packed array of fixed-size directory entries. All of `create_file`,
//! `delete_file`, `list_directory`, `read_file`, `write_file` and
//! `copy_file` are expressed as higher-level operations on top of
//! `read_inode`/`write_inode` and the one directory block.

use super::error::{FsError, FsResult};
use super::layout::{
    RawDirEntry, RawInode, DATA_START_BLOCK, DIR_ENTRIES_PER_BLOCK, INODES_PER_BLOCK,
    INODE_START_BLOCK, MAX_FILENAME,
};
use super::Inner;
use crate::disk::BLOCK_SIZE;
use std::mem::size_of;

/// One entry as reported by [`Inner::list_directory`].
pub struct DirListEntry {
    pub name: String,
    pub kind: u16,
    pub size: u32,
}

/// Superblock + free-space summary as reported by [`Inner::show_disk_info`].
pub struct DiskInfo {
    pub state: u16,
    pub total_blocks: u32,
    pub free_inode_count: u32,
    pub free_data_count: u32,
    pub max_files: u32,
    pub data_blocks: u32,
}

fn truncate_name(name: &str) -> [u8; MAX_FILENAME] {
    let mut buf = [0u8; MAX_FILENAME];
    let bytes = name.as_bytes();
    let len = bytes.len().min(MAX_FILENAME - 1);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn name_str(raw: &[u8; MAX_FILENAME]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn decode_dir_entries(buf: &[u8; BLOCK_SIZE]) -> [RawDirEntry; DIR_ENTRIES_PER_BLOCK] {
    let mut entries = [RawDirEntry::EMPTY; DIR_ENTRIES_PER_BLOCK];
    for (i, entry) in entries.iter_mut().enumerate() {
        let off = i * size_of::<RawDirEntry>();
        *entry = unsafe { (buf.as_ptr().add(off) as *const RawDirEntry).read_unaligned() };
    }
    entries
}

fn encode_dir_entries(entries: &[RawDirEntry; DIR_ENTRIES_PER_BLOCK]) -> [u8; BLOCK_SIZE] {
    let mut buf = [0u8; BLOCK_SIZE];
    for (i, entry) in entries.iter().enumerate() {
        let off = i * size_of::<RawDirEntry>();
        let src = unsafe {
            std::slice::from_raw_parts(entry as *const _ as *const u8, size_of::<RawDirEntry>())
        };
        buf[off..off + size_of::<RawDirEntry>()].copy_from_slice(src);
    }
    buf
}

/// Finds the directory slot index holding `name`, if live.
fn find_entry(name: &str, entries: &[RawDirEntry; DIR_ENTRIES_PER_BLOCK]) -> Option<usize> {
    entries
        .iter()
        .position(|e| e.inode != 0 && name_str(&e.name) == name)
}

impl Inner {
    /// Reads inode `i` out of its inode block.
    pub(super) fn read_inode(&mut self, i: usize) -> FsResult<RawInode> {
        let block = INODE_START_BLOCK + (i / INODES_PER_BLOCK) as u32;
        let off_in_block = (i % INODES_PER_BLOCK) * size_of::<RawInode>();
        let mut buf = [0u8; BLOCK_SIZE];
        self.device.read_block(block, &mut buf)?;
        let rec = unsafe {
            (buf.as_ptr().add(off_in_block) as *const RawInode).read_unaligned()
        };
        Ok(rec)
    }

    /// Read-modify-write: overwrites slot `i` within its inode block.
    pub(super) fn write_inode(&mut self, i: usize, rec: RawInode) -> FsResult<()> {
        let block = INODE_START_BLOCK + (i / INODES_PER_BLOCK) as u32;
        let off_in_block = (i % INODES_PER_BLOCK) * size_of::<RawInode>();
        let mut buf = [0u8; BLOCK_SIZE];
        self.device.read_block(block, &mut buf)?;
        let src = unsafe {
            std::slice::from_raw_parts(&rec as *const _ as *const u8, size_of::<RawInode>())
        };
        buf[off_in_block..off_in_block + size_of::<RawInode>()].copy_from_slice(src);
        self.device.write_block(block, &buf)
    }

    fn read_dir_block(&mut self) -> FsResult<[RawDirEntry; DIR_ENTRIES_PER_BLOCK]> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.device.read_block(DATA_START_BLOCK, &mut buf)?;
        Ok(decode_dir_entries(&buf))
    }

    fn write_dir_block(&mut self, entries: &[RawDirEntry; DIR_ENTRIES_PER_BLOCK]) -> FsResult<()> {
        let buf = encode_dir_entries(entries);
        self.device.write_block(DATA_START_BLOCK, &buf)
    }

    /// Creates a new regular file named `name` in the root directory.
    pub fn create_file(&mut self, name: &str) -> FsResult<()> {
        let mut entries = self.read_dir_block()?;

        if find_entry(name, &entries).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let free_slot = entries
            .iter()
            .position(|e| e.inode == 0)
            .ok_or(FsError::DirectoryFull)?;

        let inode_idx = self.alloc_inode()?;
        self.write_inode(inode_idx, RawInode::new(RawInode::TYPE_FILE, 0, [0; 8]))?;

        entries[free_slot] = RawDirEntry {
            inode: inode_idx as u32,
            name: truncate_name(name),
        };
        self.write_dir_block(&entries)
    }

    /// Deletes `name`, freeing its inode and every data block it owns.
    pub fn delete_file(&mut self, name: &str) -> FsResult<()> {
        let mut entries = self.read_dir_block()?;
        let slot = find_entry(name, &entries).ok_or(FsError::NotFound)?;
        let inode_idx = entries[slot].inode as usize;

        let inode = self.read_inode(inode_idx)?;
        for &b in inode.blocks.iter() {
            if b != 0 {
                self.free_block(b)?;
            }
        }
        self.free_inode(inode_idx)?;

        entries[slot] = RawDirEntry::EMPTY;
        self.write_dir_block(&entries)
    }

    /// Lists every live entry in the root directory.
    pub fn list_directory(&mut self) -> FsResult<Vec<DirListEntry>> {
        let entries = self.read_dir_block()?;
        let mut out = Vec::new();
        for e in entries.iter() {
            if e.inode == 0 {
                continue;
            }
            let inode = self.read_inode(e.inode as usize)?;
            out.push(DirListEntry {
                name: name_str(&e.name),
                kind: inode.kind,
                size: inode.size,
            });
        }
        Ok(out)
    }

    /// Reads up to `max_bytes` from `name`, returning the bytes actually
    /// copied.
    pub fn read_file(&mut self, name: &str, max_bytes: usize) -> FsResult<Vec<u8>> {
        let entries = self.read_dir_block()?;
        let slot = find_entry(name, &entries).ok_or(FsError::NotFound)?;
        let inode_idx = entries[slot].inode as usize;
        let inode = self.read_inode(inode_idx)?;
        if inode.kind != RawInode::TYPE_FILE {
            return Err(FsError::NotRegular);
        }

        let bytes_to_read = max_bytes.min(inode.size as usize);
        let mut out = Vec::with_capacity(bytes_to_read);
        let mut remaining = bytes_to_read;
        for &b in inode.blocks.iter() {
            if remaining == 0 || b == 0 {
                break;
            }
            let mut buf = [0u8; BLOCK_SIZE];
            self.device.read_block(b, &mut buf)?;
            let take = remaining.min(BLOCK_SIZE);
            out.extend_from_slice(&buf[..take]);
            remaining -= take;
        }
        Ok(out)
    }

    /// Truncates `name` and writes `data` to it, up to 8 x [`BLOCK_SIZE`]
    /// bytes. Returns the number of bytes actually written.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> FsResult<usize> {
        let entries = self.read_dir_block()?;
        let slot = find_entry(name, &entries).ok_or(FsError::NotFound)?;
        let inode_idx = entries[slot].inode as usize;
        let mut inode = self.read_inode(inode_idx)?;
        if inode.kind != RawInode::TYPE_FILE {
            return Err(FsError::NotRegular);
        }

        for &b in inode.blocks.iter() {
            if b != 0 {
                self.free_block(b)?;
            }
        }
        inode.blocks = [0; 8];

        let mut written = 0usize;
        for slot_k in inode.blocks.iter_mut() {
            if written >= data.len() {
                break;
            }
            let block_idx = match self.alloc_block() {
                Ok(idx) => idx,
                Err(FsError::NoSpace) => break,
                Err(e) => return Err(e),
            };
            let mut buf = [0u8; BLOCK_SIZE];
            let take = (data.len() - written).min(BLOCK_SIZE);
            buf[..take].copy_from_slice(&data[written..written + take]);
            self.device.write_block(block_idx, &buf)?;
            *slot_k = block_idx;
            written += take;
        }

        inode.size = written as u32;
        self.write_inode(inode_idx, inode)?;
        Ok(written)
    }

    /// Copies `src` to a newly created file `dst`.
    pub fn copy_file(&mut self, src: &str, dst: &str) -> FsResult<()> {
        {
            let entries = self.read_dir_block()?;
            if find_entry(dst, &entries).is_some() {
                return Err(FsError::AlreadyExists);
            }
            let slot = find_entry(src, &entries).ok_or(FsError::NotFound)?;
            let src_inode = self.read_inode(entries[slot].inode as usize)?;
            if src_inode.kind != RawInode::TYPE_FILE {
                return Err(FsError::NotRegular);
            }
        }

        const SCRATCH_CAP: usize = 8 * BLOCK_SIZE;
        let scratch = self.read_file(src, SCRATCH_CAP)?;

        self.create_file(dst)?;
        let written = self.write_file(dst, &scratch)?;
        if written != scratch.len() {
            self.delete_file(dst)?;
            return Err(FsError::IoShort);
        }
        Ok(())
    }

    /// Pure observer: reports the cached superblock's state and free-space
    /// summary.
    pub fn show_disk_info(&self) -> DiskInfo {
        DiskInfo {
            state: self.superblock.state,
            total_blocks: self.superblock.total_blocks,
            free_inode_count: self.superblock.free_inode_count,
            free_data_count: self.superblock.free_data_count,
            max_files: super::layout::MAX_FILES as u32,
            data_blocks: super::layout::DATA_BLOCKS,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_truncation_zero_terminates() {
        let long = "a".repeat(100);
        let raw = truncate_name(&long);
        assert_eq!(raw.len(), MAX_FILENAME);
        assert_eq!(raw[MAX_FILENAME - 1], 0);
        assert_eq!(name_str(&raw).len(), MAX_FILENAME - 1);
    }

    #[test]
    fn name_round_trip() {
        let raw = truncate_name("hello.txt");
        assert_eq!(name_str(&raw), "hello.txt");
    }
}
