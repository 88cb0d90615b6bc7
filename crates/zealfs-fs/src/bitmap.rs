//! Page allocation bitmap
//!
//! Bit `n` of byte `m` is 1 iff page `m * 8 + n` is allocated. Page 0 holds
//! the header and is always allocated, which is why 0 doubles as the
//! on-disk "allocation failed" sentinel. The `free_pages` header field is
//! kept in lockstep with the bitmap by every operation here.

use crate::geometry::Geometry;

/// Allocate the first free page.
///
/// Scans for a byte that is not 0xFF, then counts trailing one-bits to find
/// the first free page. Returns [`None`] when the bitmap is saturated.
pub(crate) fn allocate(geo: &Geometry, img: &mut [u8]) -> Option<u16> {
    let bitmap = &img[geo.bitmap_offset..geo.bitmap_offset + geo.bitmap_size];

    let found = bitmap
        .iter()
        .enumerate()
        .find(|&(_, &value)| value != 0xFF);
    let Some((byte_index, &value)) = found else {
        log::debug!("no more space in the bitmap of {} bytes", geo.bitmap_size);
        return None;
    };

    let bit_index = (value.trailing_ones()) as usize;
    let page = (byte_index * 8 + bit_index) as u16;

    img[geo.bitmap_offset + byte_index] |= 1 << bit_index;
    let free = geo.free_pages(img);
    geo.set_free_pages(img, free - 1);

    Some(page)
}

/// Free a page. `page` must not be 0.
pub(crate) fn free(geo: &Geometry, img: &mut [u8], page: u16) {
    debug_assert_ne!(page, 0, "page 0 holds the header");
    let byte_index = page as usize / 8;
    img[geo.bitmap_offset + byte_index] &= !(1 << (page % 8));
    let free = geo.free_pages(img);
    geo.set_free_pages(img, free + 1);
}

/// Mark a page allocated without touching `free_pages`. Used by the
/// formatter to reserve the header and FAT pages.
pub(crate) fn set_allocated(geo: &Geometry, img: &mut [u8], page: u16) {
    let byte_index = page as usize / 8;
    img[geo.bitmap_offset + byte_index] |= 1 << (page % 8);
}

pub(crate) fn is_allocated(geo: &Geometry, img: &[u8], page: u16) -> bool {
    let byte_index = page as usize / 8;
    img[geo.bitmap_offset + byte_index] & (1 << (page % 8)) != 0
}

/// Count the zero bits over the meaningful part of the bitmap. Must equal
/// the header's `free_pages` on a healthy image.
pub(crate) fn count_free(geo: &Geometry, img: &[u8]) -> u32 {
    img[geo.bitmap_offset..geo.bitmap_offset + geo.bitmap_size]
        .iter()
        .map(|&b| 8 - b.count_ones())
        .sum()
}

// ============================================================================
// TESTS
// ============================================================================
