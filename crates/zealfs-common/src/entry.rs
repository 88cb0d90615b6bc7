//! Directory entries
//!
//! Every file or directory is described by a 32-byte entry inside its parent
//! directory. The two format versions pack the same information with
//! different field widths:
//!
//! ```text
//!          v1                      v2
//! 0        flags (1)               flags (1)
//! 1..17    name (16)               name (16)
//! 17       start_page (1)          start_page (2, LE)
//! 18/19    size (2, LE)            size (4, LE)
//! 20/23    BCD date (8)            BCD date (8)
//! 28/31    reserved (4)            reserved (1)
//! ```

use crate::bcd::BcdDate;
use crate::{Version, ENTRY_SIZE, FLAG_DIR, FLAG_OCCUPIED, NAME_MAX_LEN};

// Field offsets shared by both versions
const FLAGS_OFFSET: usize = 0;
const NAME_OFFSET: usize = 1;
const START_PAGE_OFFSET: usize = 17;

// v1 tail
const V1_SIZE_OFFSET: usize = 18;
const V1_DATE_OFFSET: usize = 20;

// v2 tail
const V2_SIZE_OFFSET: usize = 19;
const V2_DATE_OFFSET: usize = 23;

/// What a directory entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// In-memory form of a directory entry, wide enough for both versions.
///
/// `start_page` and `size` use the v2 widths; the v1 codec narrows them on
/// encode (v1 images never exceed 256 pages or 64 KiB files).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileEntry {
    pub flags: u8,
    pub name: [u8; NAME_MAX_LEN],
    pub start_page: u16,
    pub size: u32,
    pub date: BcdDate,
}

impl FileEntry {
    /// Check if the slot holds a live entry.
    pub fn is_occupied(&self) -> bool {
        self.flags & FLAG_OCCUPIED != 0
    }

    pub fn is_dir(&self) -> bool {
        self.flags & FLAG_DIR != 0
    }

    pub fn kind(&self) -> EntryKind {
        if self.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    /// Name bytes up to the first NUL padding byte.
    pub fn name_str(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    /// Replace the name, zero-padding the field. `name` must have been
    /// validated against [`NAME_MAX_LEN`].
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; NAME_MAX_LEN];
        let bytes = name.as_bytes();
        self.name[..bytes.len()].copy_from_slice(bytes);
    }

    /// Compare against a path component the way the on-disk format does:
    /// exact bytes, zero-padded, case-sensitive.
    pub fn name_matches(&self, name: &str) -> bool {
        let bytes = name.as_bytes();
        if bytes.len() > NAME_MAX_LEN {
            return false;
        }
        self.name[..bytes.len()] == *bytes
            && self.name[bytes.len()..].iter().all(|&b| b == 0)
    }

    // ------------------------------------------------------------------
    // Codec
    // ------------------------------------------------------------------

    /// Decode a 32-byte slot.
    pub fn decode(buf: &[u8], version: Version) -> Self {
        let mut name = [0u8; NAME_MAX_LEN];
        name.copy_from_slice(&buf[NAME_OFFSET..NAME_OFFSET + NAME_MAX_LEN]);

        let (start_page, size, date) = match version {
            Version::V1 => (
                buf[START_PAGE_OFFSET] as u16,
                u16::from_le_bytes([buf[V1_SIZE_OFFSET], buf[V1_SIZE_OFFSET + 1]]) as u32,
                BcdDate::decode(&buf[V1_DATE_OFFSET..V1_DATE_OFFSET + 8]),
            ),
            Version::V2 => (
                u16::from_le_bytes([buf[START_PAGE_OFFSET], buf[START_PAGE_OFFSET + 1]]),
                u32::from_le_bytes([
                    buf[V2_SIZE_OFFSET],
                    buf[V2_SIZE_OFFSET + 1],
                    buf[V2_SIZE_OFFSET + 2],
                    buf[V2_SIZE_OFFSET + 3],
                ]),
                BcdDate::decode(&buf[V2_DATE_OFFSET..V2_DATE_OFFSET + 8]),
            ),
        };

        Self {
            flags: buf[FLAGS_OFFSET],
            name,
            start_page,
            size,
            date,
        }
    }

    /// Encode into a 32-byte slot. Reserved bytes are zeroed.
    pub fn encode_into(&self, buf: &mut [u8], version: Version) {
        buf[..ENTRY_SIZE].fill(0);
        buf[FLAGS_OFFSET] = self.flags;
        buf[NAME_OFFSET..NAME_OFFSET + NAME_MAX_LEN].copy_from_slice(&self.name);
        match version {
            Version::V1 => {
                buf[START_PAGE_OFFSET] = self.start_page as u8;
                buf[V1_SIZE_OFFSET..V1_SIZE_OFFSET + 2]
                    .copy_from_slice(&(self.size as u16).to_le_bytes());
                self.date.encode_into(&mut buf[V1_DATE_OFFSET..V1_DATE_OFFSET + 8]);
            }
            Version::V2 => {
                buf[START_PAGE_OFFSET..START_PAGE_OFFSET + 2]
                    .copy_from_slice(&self.start_page.to_le_bytes());
                buf[V2_SIZE_OFFSET..V2_SIZE_OFFSET + 4]
                    .copy_from_slice(&self.size.to_le_bytes());
                self.date.encode_into(&mut buf[V2_DATE_OFFSET..V2_DATE_OFFSET + 8]);
            }
        }
    }

    /// Build a fresh occupied entry.
    pub fn new(kind: EntryKind, name: &str, start_page: u16, size: u32, date: BcdDate) -> Self {
        let mut entry = Self {
            flags: FLAG_OCCUPIED
                | match kind {
                    EntryKind::Directory => FLAG_DIR,
                    EntryKind::File => 0,
                },
            name: [0; NAME_MAX_LEN],
            start_page,
            size,
            date,
        };
        entry.set_name(name);
        entry
    }
}

// ============================================================================
// TESTS
// ============================================================================
