//! ZealFS v2 header layout
//!
//! v2 scales the format up to 4 GiB block devices. The page size is chosen
//! per image (256 B to 64 KiB), page indexes are 16-bit, and chaining moves
//! out of the pages into a FAT stored at page 1.
//!
//! ```text
//! 0        magic (1)                'Z'
//! 1        version (1)              2
//! 2..4     bitmap_size (2, LE)      bytes of the bitmap
//! 4..6     free_pages (2, LE)
//! 6        page_size code (1)       page size is 256 << code, code 0..8
//! 7..      pages_bitmap (bitmap_size)
//! ...      reserved                 pads the prefix up to a multiple of 32
//! ...      root directory entries   up to the end of page 0
//! ```

use crate::{align_up, ENTRY_SIZE};

pub const MAX_PAGE_SIZE_CODE: u8 = 8;

/// Largest v2 image: 65536 pages of 64 KiB.
pub const MAX_IMAGE_BYTES: u64 = 4 * 1024 * 1024 * 1024;

// Header field offsets
pub const MAGIC_OFFSET: usize = 0;
pub const VERSION_OFFSET: usize = 1;
pub const BITMAP_SIZE_OFFSET: usize = 2;
pub const FREE_PAGES_OFFSET: usize = 4;
pub const PAGE_SIZE_CODE_OFFSET: usize = 6;
pub const BITMAP_OFFSET: usize = 7;

/// Fixed part of the header, before the bitmap.
pub const HEADER_FIXED_SIZE: usize = 7;

/// The FAT starts at page 1.
pub const FAT_FIRST_PAGE: u16 = 1;

/// Page size in bytes for a header code (0..8).
pub const fn page_size_from_code(code: u8) -> usize {
    256 << code
}

/// Header code for a page size. `page_size` must be a power of two between
/// 256 and 64 KiB.
pub const fn code_from_page_size(page_size: usize) -> u8 {
    (page_size.trailing_zeros() - 8) as u8
}

/// Recommended page size for a disk size: the smallest that keeps the
/// header plus bitmap inside page 0 and the FAT within two pages.
pub fn page_size_for_image(disk_size: u64) -> usize {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if disk_size <= 64 * KB {
        256
    } else if disk_size <= 256 * KB {
        512
    } else if disk_size <= 1 * MB {
        1024
    } else if disk_size <= 4 * MB {
        2048
    } else if disk_size <= 16 * MB {
        4096
    } else if disk_size <= 64 * MB {
        8192
    } else if disk_size <= 256 * MB {
        16384
    } else if disk_size <= 1 * GB {
        32768
    } else {
        65536
    }
}

/// Size of the header prefix (fixed part + bitmap), rounded up to the next
/// entry boundary so the first root entry is 32-byte aligned.
pub const fn header_size(bitmap_size: usize) -> usize {
    align_up(HEADER_FIXED_SIZE + bitmap_size, ENTRY_SIZE)
}

/// Slots available in the root directory's first segment (the tail of
/// page 0). The root can still grow through the FAT like any directory.
pub const fn root_entry_count(page_size: usize, bitmap_size: usize) -> usize {
    (page_size - header_size(bitmap_size)) / ENTRY_SIZE
}

/// Slots per page in regular directories.
pub const fn dir_entry_count(page_size: usize) -> usize {
    page_size / ENTRY_SIZE
}

/// Width of a FAT entry in bytes: one byte only for the small-image case
/// (256-byte pages, at most 256 of them), two bytes little-endian otherwise.
pub const fn fat_entry_width(page_size: usize, page_count: usize) -> usize {
    if page_size == 256 && page_count <= 256 {
        1
    } else {
        2
    }
}

/// Pages reserved for the FAT right after the header page.
pub const fn fat_page_count(page_size: usize, page_count: usize) -> usize {
    if fat_entry_width(page_size, page_count) == 1 {
        1
    } else {
        2
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_codes() {
        assert_eq!(page_size_from_code(0), 256);
        assert_eq!(page_size_from_code(8), 65536);
        for code in 0..=MAX_PAGE_SIZE_CODE {
            assert_eq!(code_from_page_size(page_size_from_code(code)), code);
        }
    }

    #[test]
    fn test_page_size_table() {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * KB;
        const GB: u64 = 1024 * MB;
        assert_eq!(page_size_for_image(32 * KB), 256);
        assert_eq!(page_size_for_image(64 * KB), 256);
        assert_eq!(page_size_for_image(64 * KB + 1), 512);
        assert_eq!(page_size_for_image(1 * MB), 1024);
        assert_eq!(page_size_for_image(16 * MB), 4096);
        assert_eq!(page_size_for_image(1 * GB), 32768);
        assert_eq!(page_size_for_image(4 * GB), 65536);
    }

    #[test]
    fn test_header_geometry() {
        // 1 MiB image: 1024 pages of 1 KiB, 128-byte bitmap
        assert_eq!(header_size(128), 160);
        assert_eq!(root_entry_count(1024, 128), 27);
        assert_eq!(dir_entry_count(1024), 32);

        // 64 KiB image: 256 pages of 256 bytes
        assert_eq!(header_size(32), 64);
        assert_eq!(root_entry_count(256, 32), 6);
    }

    #[test]
    fn test_fat_geometry() {
        // Small image special case: one FAT page of single-byte entries
        assert_eq!(fat_entry_width(256, 256), 1);
        assert_eq!(fat_page_count(256, 256), 1);

        // Everything else: two pages of 16-bit entries
        assert_eq!(fat_entry_width(512, 512), 2);
        assert_eq!(fat_page_count(512, 512), 2);
        assert_eq!(fat_entry_width(65536, 65536), 2);
        assert_eq!(fat_page_count(65536, 65536), 2);

        // The recommended page size always keeps the FAT within its pages
        for kib in [64u64, 256, 1024, 4096, 16384, 65536, 262144, 1048576, 4194304] {
            let size = kib * 1024;
            let ps = page_size_for_image(size);
            let pages = (size / ps as u64) as usize;
            let fat_bytes = pages * fat_entry_width(ps, pages);
            assert!(fat_bytes <= fat_page_count(ps, pages) * ps);
        }
    }
}
