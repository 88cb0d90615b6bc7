//! ZealFS Common - Shared ZealFS on-disk structures
//!
//! This crate provides the canonical definitions for the ZealFS on-disk
//! format. Both the filesystem engine and the image tools MUST use these
//! definitions.
//!
//! ## Versions
//!
//! - **ZealFS v1**: up to 64 KiB, fixed 256-byte pages, in-band page chaining
//! - **ZealFS v2**: 256 B - 64 KiB pages, up to 4 GiB, FAT-based chaining,
//!   optional MBR partition wrapping
//!
//! ## Disk Layout (v1)
//!
//! ```text
//! Page 0:         Header (64 bytes) + root directory entries (6 slots)
//! Page 1..N:      File/directory pages; byte 0 of a file page is the index
//!                 of the next page in the chain (0 = end of chain)
//! ```
//!
//! ## Disk Layout (v2)
//!
//! ```text
//! Page 0:         Header (prefix + bitmap, aligned to 32) + root entries
//! Page 1..2:      FAT (next-page table, 1 or 2 bytes per entry)
//! Page 3..N:      File/directory pages; all bytes are payload, chaining
//!                 goes through the FAT
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod bcd;
pub mod entry;
pub mod error;
pub mod mbr;
pub mod v1;
pub mod v2;

pub use bcd::BcdDate;
pub use entry::{EntryKind, FileEntry};
pub use error::{FsError, FsResult};

// ============================================================================
// MAGIC AND VERSIONS
// ============================================================================

/// Magic byte at offset 0 of every ZealFS header ('Z').
pub const FS_MAGIC: u8 = 0x5A;

/// On-disk format revision.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    V1 = 1,
    V2 = 2,
}

impl Version {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Version::V1),
            2 => Some(Version::V2),
            _ => None,
        }
    }
}

// ============================================================================
// DIRECTORY ENTRY CONSTANTS
// ============================================================================

/// Maximum length of a name in the file system, including the extension.
pub const NAME_MAX_LEN: usize = 16;

/// Every directory entry is exactly 32 bytes, in both versions.
pub const ENTRY_SIZE: usize = 32;

// Entry flag bits
pub const FLAG_DIR: u8 = 1 << 0; // 1 = directory, 0 = file
pub const FLAG_OCCUPIED: u8 = 1 << 7; // 1 = occupied, 0 = free slot

// ============================================================================
// HELPERS
// ============================================================================

/// Round `size` up to the next multiple of `bound` (a power of two).
pub const fn align_up(size: usize, bound: usize) -> usize {
    (size + bound - 1) & !(bound - 1)
}

// ============================================================================
// COMPILE-TIME CHECKS
// ============================================================================

const _: () = assert!(FS_MAGIC == b'Z');
const _: () = assert!(v1::HEADER_SIZE % ENTRY_SIZE == 0);
const _: () = assert!(v1::ROOT_MAX_ENTRIES == 6);
const _: () = assert!(v1::DIR_MAX_ENTRIES == 8);
