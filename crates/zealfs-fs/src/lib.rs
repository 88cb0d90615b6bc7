//! ZealFS engine
//!
//! A memory-resident implementation of the ZealFS file system, covering
//! both on-disk variants:
//!
//! - **v1**: up to 64 KiB, 256-byte pages chained through their first byte;
//! - **v2**: up to 4 GiB, configurable page size, FAT-based chaining, and
//!   optional MBR partition wrapping.
//!
//! [`ZealFs`] exposes a POSIX-like operation set over an image held
//! entirely in memory; [`Mount`] binds that image to a backing file, with
//! the whole cache flushed back on teardown. Host bindings (FUSE, a kernel
//! VFS) sit on top of this crate and map [`FsError`] to their own codes.
//!
//! ```no_run
//! use zealfs_fs::{Mount, MountOptions, Version};
//!
//! let mut mount = Mount::open(&MountOptions::new("zfs.img", Version::V2))?;
//! let fs = mount.fs_mut();
//! fs.mkdir("/notes")?;
//! let file = fs.create("/notes/hello.txt")?;
//! fs.write(file, 0, b"Hello, Zeal!")?;
//! mount.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bitmap;
mod chain;
mod dir;
mod engine;
mod geometry;
mod image;
mod path;


pub use engine::{Attr, DirEntryInfo, DirHandle, FileHandle, FsStats, RenameFlags, ZealFs};
pub use image::{Mount, MountError, MountOptions};

// The on-disk vocabulary is part of this crate's API surface
pub use zealfs_common::{BcdDate, EntryKind, FileEntry, FsError, FsResult, Version};
