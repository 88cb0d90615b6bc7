//! Per-mount geometry
//!
//! v1 and v2 share one operation surface but differ in layout and chain
//! strategy. All the per-variant constants (page size, payload size, root
//! region, FAT width) are computed once, at format or mount time, and
//! carried on a [`Geometry`] value so the rest of the engine never branches
//! on raw header bytes.

use zealfs_common::{v1, v2, FsError, FsResult, Version, ENTRY_SIZE, FS_MAGIC};

#[derive(Clone, Copy, Debug)]
pub(crate) struct Geometry {
    pub version: Version,
    /// Page size in bytes
    pub page_size: usize,
    /// Payload bytes per file page: `page_size - 1` for v1 (byte 0 is the
    /// next-page index), the full page for v2
    pub payload: usize,
    /// Offset of the payload inside a file page (1 for v1, 0 for v2)
    pub content_offset: usize,
    /// Byte offset of the first root entry inside page 0
    pub root_offset: usize,
    /// Entry slots in the root segment of page 0
    pub root_entries: usize,
    /// Entry slots per regular directory page
    pub dir_entries: usize,
    /// Pages addressable through the bitmap (`bitmap_size * 8`)
    pub page_count: usize,
    /// Meaningful bytes in the allocation bitmap
    pub bitmap_size: usize,
    /// Byte offset of the bitmap inside the header
    pub bitmap_offset: usize,
    /// FAT entry width in bytes; 0 for v1 (no FAT)
    pub fat_width: usize,
    /// Pages reserved for the FAT after the header page; 0 for v1
    pub fat_pages: usize,
}

impl Geometry {
    /// Geometry for a fresh image of `image_size` bytes.
    pub fn for_format(version: Version, image_size: u64) -> FsResult<Self> {
        match version {
            Version::V1 => {
                if image_size > v1::MAX_IMAGE_BYTES as u64 {
                    return Err(FsError::InvalidArgument);
                }
                let bitmap_size = v1::bitmap_size_for(image_size as usize);
                if bitmap_size == 0 {
                    return Err(FsError::InvalidArgument);
                }
                Ok(Self::v1(bitmap_size))
            }
            Version::V2 => {
                if image_size > v2::MAX_IMAGE_BYTES {
                    return Err(FsError::InvalidArgument);
                }
                let page_size = v2::page_size_for_image(image_size);
                let bitmap_size = (image_size / page_size as u64 / 8) as usize;
                if bitmap_size == 0 {
                    return Err(FsError::InvalidArgument);
                }
                Self::v2(page_size, bitmap_size)
            }
        }
    }

    /// Geometry of an existing image, parsed from its header.
    pub fn from_image(img: &[u8], expected: Version) -> FsResult<Self> {
        if img.len() < v1::HEADER_SIZE {
            return Err(FsError::Corrupted);
        }
        if img[0] != FS_MAGIC {
            return Err(FsError::Corrupted);
        }
        if Version::from_u8(img[1]) != Some(expected) {
            return Err(FsError::Corrupted);
        }

        match expected {
            Version::V1 => {
                let bitmap_size = img[v1::BITMAP_SIZE_OFFSET] as usize;
                if bitmap_size == 0 || bitmap_size > v1::BITMAP_BYTES {
                    return Err(FsError::Corrupted);
                }
                Ok(Self::v1(bitmap_size))
            }
            Version::V2 => {
                let bitmap_size = u16::from_le_bytes([
                    img[v2::BITMAP_SIZE_OFFSET],
                    img[v2::BITMAP_SIZE_OFFSET + 1],
                ]) as usize;
                let code = img[v2::PAGE_SIZE_CODE_OFFSET];
                if code > v2::MAX_PAGE_SIZE_CODE || bitmap_size == 0 {
                    return Err(FsError::Corrupted);
                }
                Self::v2(v2::page_size_from_code(code), bitmap_size)
            }
        }
    }

    fn v1(bitmap_size: usize) -> Self {
        Self {
            version: Version::V1,
            page_size: v1::PAGE_SIZE,
            payload: v1::PAGE_PAYLOAD,
            content_offset: 1,
            root_offset: v1::ROOT_ENTRIES_OFFSET,
            root_entries: v1::ROOT_MAX_ENTRIES,
            dir_entries: v1::DIR_MAX_ENTRIES,
            page_count: bitmap_size * 8,
            bitmap_size,
            bitmap_offset: v1::BITMAP_OFFSET,
            fat_width: 0,
            fat_pages: 0,
        }
    }

    fn v2(page_size: usize, bitmap_size: usize) -> FsResult<Self> {
        let page_count = bitmap_size * 8;
        let root_offset = v2::header_size(bitmap_size);
        let fat_width = v2::fat_entry_width(page_size, page_count);
        let fat_pages = v2::fat_page_count(page_size, page_count);

        // Header and FAT must fit in their reserved pages
        if root_offset >= page_size || page_count * fat_width > fat_pages * page_size {
            return Err(FsError::Corrupted);
        }

        Ok(Self {
            version: Version::V2,
            page_size,
            payload: page_size,
            content_offset: 0,
            root_offset,
            root_entries: v2::root_entry_count(page_size, bitmap_size),
            dir_entries: v2::dir_entry_count(page_size),
            page_count,
            bitmap_size,
            bitmap_offset: v2::BITMAP_OFFSET,
            fat_width,
            fat_pages,
        })
    }

    // ------------------------------------------------------------------
    // Header field access
    // ------------------------------------------------------------------

    pub fn free_pages(&self, img: &[u8]) -> u32 {
        match self.version {
            Version::V1 => img[v1::FREE_PAGES_OFFSET] as u32,
            Version::V2 => u16::from_le_bytes([
                img[v2::FREE_PAGES_OFFSET],
                img[v2::FREE_PAGES_OFFSET + 1],
            ]) as u32,
        }
    }

    pub fn set_free_pages(&self, img: &mut [u8], count: u32) {
        match self.version {
            Version::V1 => img[v1::FREE_PAGES_OFFSET] = count as u8,
            Version::V2 => {
                // The field is 16-bit; page counts never exceed 65536 so
                // the true value always fits, but saturate to be safe.
                let count = count.min(u16::MAX as u32) as u16;
                img[v2::FREE_PAGES_OFFSET..v2::FREE_PAGES_OFFSET + 2]
                    .copy_from_slice(&count.to_le_bytes());
            }
        }
    }

    /// Byte offset of a page.
    pub fn page_offset(&self, page: u16) -> usize {
        page as usize * self.page_size
    }

    /// Entry slots in a directory page (the root segment is shorter).
    pub fn slots_in(&self, page: u16) -> usize {
        if page == 0 {
            self.root_entries
        } else {
            self.dir_entries
        }
    }

    /// Byte offset of an entry slot.
    pub fn slot_offset(&self, page: u16, slot: u16) -> usize {
        let base = if page == 0 {
            self.root_offset
        } else {
            self.page_offset(page)
        };
        base + slot as usize * ENTRY_SIZE
    }
}
