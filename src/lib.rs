//! A user-space simulated filesystem: a fixed-size disk image treated as a
//! block device and overlaid with a UNIX-style single-directory
//! filesystem, driven by a concurrent command shell.
//!
//! The core lives in two tightly coupled pieces: [`disk`] and [`fs`] own
//! the on-disk layout and every invariant about what bytes live where,
//! while [`queue`] and [`worker`] own the concurrent request pipeline that
//! dispatches commands against it under [`fs::Filesystem`]'s single lock.

pub mod disk;
pub mod fs;
pub mod queue;
pub mod repl;
pub mod worker;
