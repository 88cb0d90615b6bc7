//! ZealFS v1 header layout
//!
//! v1 targets EEPROMs of at most 64 KiB. Pages are always 256 bytes, page
//! indexes fit in one byte, and the header has a fixed 64-byte shape:
//!
//! ```text
//! 0        magic (1)                'Z'
//! 1        version (1)              1
//! 2        bitmap_size (1)          bytes of the bitmap actually used
//! 3        free_pages (1)
//! 4..36    pages_bitmap (32)
//! 36..64   reserved (28)
//! 64..256  root directory entries   6 slots of 32 bytes
//! ```

use crate::ENTRY_SIZE;

pub const PAGE_SIZE: usize = 256;

/// Bytes of payload per file page; byte 0 holds the next-page index.
pub const PAGE_PAYLOAD: usize = PAGE_SIZE - 1;

/// Largest v1 image: one byte of page index, 256 pages of 256 bytes.
pub const MAX_IMAGE_BYTES: usize = 64 * 1024;

// Header field offsets
pub const MAGIC_OFFSET: usize = 0;
pub const VERSION_OFFSET: usize = 1;
pub const BITMAP_SIZE_OFFSET: usize = 2;
pub const FREE_PAGES_OFFSET: usize = 3;
pub const BITMAP_OFFSET: usize = 4;

/// The bitmap region is always 32 bytes, no matter how big the disk is;
/// `bitmap_size` marks how many of them are meaningful.
pub const BITMAP_BYTES: usize = 32;

pub const RESERVED_BYTES: usize = 28;

/// Fixed header size, up to the first root entry.
pub const HEADER_SIZE: usize = 4 + BITMAP_BYTES + RESERVED_BYTES;

/// Byte offset of the first root directory entry inside page 0.
pub const ROOT_ENTRIES_OFFSET: usize = HEADER_SIZE;

/// The root directory lives in the header page's tail, so it has fewer
/// entries than regular directories.
pub const ROOT_MAX_ENTRIES: usize = (PAGE_SIZE - HEADER_SIZE) / ENTRY_SIZE;

/// Entry count for regular directories. A v1 directory is a single page
/// with no in-band next pointer: all 256 bytes are entry slots.
pub const DIR_MAX_ENTRIES: usize = PAGE_SIZE / ENTRY_SIZE;

/// Bitmap bytes needed for an image of `image_size` bytes.
pub const fn bitmap_size_for(image_size: usize) -> usize {
    image_size / PAGE_SIZE / 8
}

const _: () = assert!(HEADER_SIZE == 64);
const _: () = assert!(MAX_IMAGE_BYTES / PAGE_SIZE / 8 == BITMAP_BYTES);
