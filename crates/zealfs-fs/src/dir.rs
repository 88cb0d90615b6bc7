//! Directory model
//!
//! Root and non-root directories are different entity shapes. The root's
//! entry slots live in the tail of the header page; a non-root directory
//! owns at least one full page of slots. In v2 either kind may continue
//! through the FAT when it fills up (the root chain starts at page 0); v1
//! directories never span more than one page.
//!
//! Entries are addressed by `(page, slot)` descriptors instead of raw
//! buffer addresses so handles stay meaningful across the API boundary.

use zealfs_common::{FileEntry, Version, ENTRY_SIZE, FLAG_OCCUPIED};

use crate::chain;
use crate::geometry::Geometry;

/// Location of a 32-byte entry slot: a directory page (0 = the root
/// segment of the header page) and a slot index within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntrySlot {
    pub page: u16,
    pub slot: u16,
}

/// A directory's page chain, identified by its first page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DirChain {
    pub start: u16,
}

impl DirChain {
    pub fn root() -> Self {
        Self { start: 0 }
    }

    pub fn at(page: u16) -> Self {
        Self { start: page }
    }

    /// All pages of the directory, in chain order.
    ///
    /// v1 directories are always a single page. v2 directories follow the
    /// FAT; traversal is capped at the page count so a corrupt cyclic chain
    /// cannot spin forever.
    pub fn pages(&self, geo: &Geometry, img: &[u8]) -> Vec<u16> {
        let mut pages = vec![self.start];
        if geo.version == Version::V1 {
            return pages;
        }
        let mut page = self.start;
        while pages.len() < geo.page_count {
            page = chain::next(geo, img, page);
            if page == 0 {
                break;
            }
            pages.push(page);
        }
        pages
    }
}

// ============================================================================
// SLOT ACCESS
// ============================================================================

pub(crate) fn read_entry(geo: &Geometry, img: &[u8], slot: EntrySlot) -> FileEntry {
    let off = geo.slot_offset(slot.page, slot.slot);
    FileEntry::decode(&img[off..off + ENTRY_SIZE], geo.version)
}

pub(crate) fn write_entry(geo: &Geometry, img: &mut [u8], slot: EntrySlot, entry: &FileEntry) {
    let off = geo.slot_offset(slot.page, slot.slot);
    entry.encode_into(&mut img[off..off + ENTRY_SIZE], geo.version);
}

/// Flags byte of a slot, cheaper than decoding the whole entry.
pub(crate) fn slot_flags(geo: &Geometry, img: &[u8], slot: EntrySlot) -> u8 {
    img[geo.slot_offset(slot.page, slot.slot)]
}

pub(crate) fn slot_occupied(geo: &Geometry, img: &[u8], slot: EntrySlot) -> bool {
    slot_flags(geo, img, slot) & FLAG_OCCUPIED != 0
}

/// Release a slot. Clearing the flags byte is enough to mark it free.
pub(crate) fn clear_slot_flags(geo: &Geometry, img: &mut [u8], slot: EntrySlot) {
    img[geo.slot_offset(slot.page, slot.slot)] = 0;
}

/// Wipe a slot entirely (used when an entry moves between directories).
pub(crate) fn zero_slot(geo: &Geometry, img: &mut [u8], slot: EntrySlot) {
    let off = geo.slot_offset(slot.page, slot.slot);
    img[off..off + ENTRY_SIZE].fill(0);
}
