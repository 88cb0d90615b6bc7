//! Page chains
//!
//! A file's contents (and, in v2, a directory's entry list) is a linked
//! sequence of pages ending at page 0. The two variants keep the links in
//! different places:
//!
//! - **v1**: the first byte of each file page is the index of the next page
//!   (the remaining 255 bytes are payload);
//! - **v2**: a FAT starting at page 1 maps every page to its successor, and
//!   pages carry nothing but payload.
//!
//! Only this module knows where a link lives; everything else goes through
//! [`next`] and [`set_next`].

use zealfs_common::Version;

use crate::geometry::Geometry;

/// Next page in the chain, or 0 at the end of the chain.
pub(crate) fn next(geo: &Geometry, img: &[u8], page: u16) -> u16 {
    match geo.version {
        Version::V1 => img[geo.page_offset(page)] as u16,
        Version::V2 => {
            let off = fat_offset(geo, page);
            match geo.fat_width {
                1 => img[off] as u16,
                _ => u16::from_le_bytes([img[off], img[off + 1]]),
            }
        }
    }
}

pub(crate) fn set_next(geo: &Geometry, img: &mut [u8], page: u16, next: u16) {
    match geo.version {
        Version::V1 => img[geo.page_offset(page)] = next as u8,
        Version::V2 => {
            let off = fat_offset(geo, page);
            match geo.fat_width {
                1 => img[off] = next as u8,
                _ => img[off..off + 2].copy_from_slice(&next.to_le_bytes()),
            }
        }
    }
}

/// Follow `steps` links from `start`. Returns [`None`] if the chain ends
/// first, which on a healthy image means the caller overshot the file size.
pub(crate) fn walk(geo: &Geometry, img: &[u8], start: u16, steps: usize) -> Option<u16> {
    let mut page = start;
    for _ in 0..steps {
        page = next(geo, img, page);
        if page == 0 {
            return None;
        }
    }
    Some(page)
}

fn fat_offset(geo: &Geometry, page: u16) -> usize {
    geo.page_size + page as usize * geo.fat_width
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use zealfs_common::Version;

    #[test]
    fn test_v1_inband_links() {
        let geo = Geometry::for_format(Version::V1, 8 * 1024).unwrap();
        let mut img = vec![0u8; 8 * 1024];

        set_next(&geo, &mut img, 3, 7);
        set_next(&geo, &mut img, 7, 12);
        assert_eq!(img[3 * 256], 7); // link lives in the page itself
        assert_eq!(next(&geo, &img, 3), 7);
        assert_eq!(walk(&geo, &img, 3, 2), Some(12));
        assert_eq!(walk(&geo, &img, 3, 3), None);
    }

    #[test]
    fn test_v2_fat_links() {
        // 1 MiB: 1 KiB pages, 2-byte FAT entries at page 1
        let geo = Geometry::for_format(Version::V2, 1024 * 1024).unwrap();
        let mut img = vec![0u8; 1024 * 1024];

        set_next(&geo, &mut img, 3, 0x1234);
        assert_eq!(img[1024 + 6], 0x34); // little-endian in the FAT
        assert_eq!(img[1024 + 7], 0x12);
        assert_eq!(next(&geo, &img, 3), 0x1234);
        assert_eq!(img[3 * 1024], 0); // page content untouched
    }

    #[test]
    fn test_v2_single_byte_fat() {
        // 64 KiB with 256-byte pages: the small-image special case
        let geo = Geometry::for_format(Version::V2, 64 * 1024).unwrap();
        assert_eq!(geo.fat_width, 1);
        let mut img = vec![0u8; 64 * 1024];

        set_next(&geo, &mut img, 5, 200);
        assert_eq!(img[256 + 5], 200);
        assert_eq!(next(&geo, &img, 5), 200);
    }
}
