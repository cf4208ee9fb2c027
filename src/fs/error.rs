//! The error taxonomy returned by every public filesystem operation.

use std::error;
use std::fmt;
use std::io;

/// An error produced by a filesystem operation.
///
/// Every public operation on [`crate::fs::Filesystem`] returns one of these
/// at the first failure point; there is no partial-failure variant that
/// carries a byte count, since short writes (spec ยง7, `IOShort`) are
/// reported through [`FsError::IoShort`] and partial success is instead
/// encoded by the `usize` returned alongside `Ok` from `read_file` /
/// `write_file`.
#[derive(Debug)]
pub enum FsError {
    /// The image's superblock magic does not match; the filesystem must be
    /// formatted before any other operation is valid.
    Unformatted,
    /// No entry with that name exists in the root directory.
    NotFound,
    /// A create or copy-destination name is already taken.
    AlreadyExists,
    /// The root directory has no free entry slot.
    DirectoryFull,
    /// The inode or data-block allocator is exhausted.
    NoSpace,
    /// The operation's target inode is not a regular file.
    NotRegular,
    /// A block or inode index fell outside the valid range.
    InvalidIndex,
    /// A short read/write occurred on the backing image, or a copy wrote
    /// fewer bytes than it read.
    IoShort,
    /// The backing image could not be read or written.
    Io(io::Error),
}

impl fmt::Display for FsError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unformatted => write!(fmt, "filesystem is not formatted"),
            Self::NotFound => write!(fmt, "no such file"),
            Self::AlreadyExists => write!(fmt, "file already exists"),
            Self::DirectoryFull => write!(fmt, "directory is full"),
            Self::NoSpace => write!(fmt, "no space left on device"),
            Self::NotRegular => write!(fmt, "not a regular file"),
            Self::InvalidIndex => write!(fmt, "index out of range"),
            Self::IoShort => write!(fmt, "short read or write"),
            Self::Io(e) => write!(fmt, "I/O error: {e}"),
        }
    }
}

impl error::Error for FsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shorthand for the result type returned by filesystem operations.
pub type FsResult<T> = Result<T, FsError>;
