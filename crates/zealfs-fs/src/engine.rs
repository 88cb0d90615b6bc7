//! Filesystem engine
//!
//! [`ZealFs`] owns the memory-resident image and implements the whole
//! operation surface against it: format, integrity check, and the
//! POSIX-like calls (getattr, open/read/write, create, unlink, mkdir,
//! rmdir, readdir, rename). Nothing here touches the backing file; loading
//! and flushing the cache is the mount session's job.

use chrono::{Datelike, Timelike};

use zealfs_common::{
    BcdDate, EntryKind, FileEntry, FsError, FsResult, Version, FS_MAGIC, NAME_MAX_LEN,
};
use zealfs_common::{v1, v2};

use crate::bitmap;
use crate::chain;
use crate::dir::{self, DirChain, EntrySlot};
use crate::geometry::Geometry;
use crate::path::{resolve, split_parent};

// ============================================================================
// PUBLIC TYPES
// ============================================================================

/// Handle to an open file: the location of its directory entry. There is no
/// per-open state; the handle goes stale if the entry is removed or moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHandle {
    slot: EntrySlot,
}

/// Handle to an open directory: the first page of its entry chain (0 for
/// the root segment inside the header page).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirHandle {
    start: u16,
}

/// Attributes of a file or directory.
#[derive(Clone, Copy, Debug)]
pub struct Attr {
    pub kind: EntryKind,
    pub size: u64,
    pub nlink: u32,
    /// Permission bits; ZealFS has no permission model and advertises 0777
    pub mode: u32,
    /// Creation timestamp; [`None`] for the synthesized root
    pub mtime: Option<BcdDate>,
}

/// One entry produced by [`ZealFs::readdir`].
#[derive(Clone, Debug)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub mtime: Option<BcdDate>,
}

/// Behaviour of [`ZealFs::rename`] towards an existing target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenameFlags {
    /// Replace an existing target
    None,
    /// Fail with `AlreadyExists` if the target exists
    NoReplace,
    /// Atomically swap source and target (not supported)
    Exchange,
}

/// Capacity counters, in pages.
#[derive(Clone, Copy, Debug)]
pub struct FsStats {
    pub version: Version,
    pub page_size: usize,
    pub total_pages: usize,
    pub free_pages: u32,
}

// ============================================================================
// ENGINE
// ============================================================================

/// A mounted ZealFS image.
///
/// All operations run to completion on the caller's thread and mutate the
/// in-memory image directly; persistence happens when the owner writes
/// [`ZealFs::image`] back to its backing store.
pub struct ZealFs {
    pub(crate) geo: Geometry,
    pub(crate) img: Vec<u8>,
}

impl ZealFs {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Format a fresh image of `size` bytes.
    pub fn format(version: Version, size: u64) -> FsResult<Self> {
        let geo = Geometry::for_format(version, size)?;
        let mut img = vec![0u8; size as usize];

        img[0] = FS_MAGIC;
        img[1] = version as u8;
        match version {
            Version::V1 => {
                img[v1::BITMAP_SIZE_OFFSET] = geo.bitmap_size as u8;
            }
            Version::V2 => {
                img[v2::BITMAP_SIZE_OFFSET..v2::BITMAP_SIZE_OFFSET + 2]
                    .copy_from_slice(&(geo.bitmap_size as u16).to_le_bytes());
                img[v2::PAGE_SIZE_CODE_OFFSET] = v2::code_from_page_size(geo.page_size);
            }
        }

        // Reserve the header page, and for v2 the FAT pages after it
        bitmap::set_allocated(&geo, &mut img, 0);
        for page in 0..geo.fat_pages {
            bitmap::set_allocated(&geo, &mut img, 1 + page as u16);
        }
        let free = (size / geo.page_size as u64) as u32 - 1 - geo.fat_pages as u32;
        geo.set_free_pages(&mut img, free);

        log::info!(
            "formatted {:?} image: {} pages of {} bytes, bitmap {} bytes, \
             {} root entries, {} entries per directory page",
            version,
            size / geo.page_size as u64,
            geo.page_size,
            geo.bitmap_size,
            geo.root_entries,
            geo.dir_entries,
        );

        Ok(Self { geo, img })
    }

    /// Adopt an existing image. The integrity check runs before any
    /// operation is allowed; a corrupt image refuses to mount.
    pub fn from_image(img: Vec<u8>, expected: Version) -> FsResult<Self> {
        let geo = Geometry::from_image(&img, expected)?;
        let fs = Self { geo, img };
        fs.check_integrity()?;
        Ok(fs)
    }

    /// Validate the loaded image against its own header: declared size
    /// within the backing size, header page marked allocated, and free-page
    /// accounting consistent with the bitmap.
    pub fn check_integrity(&self) -> FsResult<()> {
        let declared = self.geo.bitmap_size as u64 * 8 * self.geo.page_size as u64;
        let backing = self.img.len() as u64;

        if declared > backing {
            log::error!(
                "header says the image is {declared} bytes ({} bytes/page) \
                 but the backing store only holds {backing}",
                self.geo.page_size
            );
            return Err(FsError::Corrupted);
        }
        if declared < backing {
            log::warn!(
                "image size according to the bitmap is smaller than the \
                 backing store, some of it will be unreachable"
            );
        }

        if !bitmap::is_allocated(&self.geo, &self.img, 0) {
            log::error!("the header page is not marked allocated in the bitmap");
            return Err(FsError::Corrupted);
        }

        let zero_bits = bitmap::count_free(&self.geo, &self.img);
        let free_pages = self.geo.free_pages(&self.img);
        if zero_bits < free_pages {
            log::warn!(
                "the number of pages marked free ({zero_bits}) is smaller than \
                 the recorded count ({free_pages}), some pages may be unreachable"
            );
        }
        if zero_bits > free_pages {
            log::error!(
                "the number of pages marked free ({zero_bits}) is bigger than \
                 the recorded count ({free_pages})"
            );
            return Err(FsError::Corrupted);
        }

        Ok(())
    }

    pub fn version(&self) -> Version {
        self.geo.version
    }

    pub fn page_size(&self) -> usize {
        self.geo.page_size
    }

    pub fn stats(&self) -> FsStats {
        FsStats {
            version: self.geo.version,
            page_size: self.geo.page_size,
            total_pages: self.geo.page_count,
            free_pages: self.geo.free_pages(&self.img),
        }
    }

    /// The raw image, for flushing to the backing store.
    pub fn image(&self) -> &[u8] {
        &self.img
    }

    pub fn into_image(self) -> Vec<u8> {
        self.img
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Attributes of the file or directory at `path`. The root is
    /// synthesized: one page big, no timestamp.
    pub fn getattr(&self, path: &str) -> FsResult<Attr> {
        if path == "/" {
            return Ok(Attr {
                kind: EntryKind::Directory,
                size: self.geo.page_size as u64,
                nlink: 2,
                mode: 0o777,
                mtime: None,
            });
        }
        let res = resolve(&self.geo, &self.img, path, false)?;
        let slot = res.entry.ok_or(FsError::NotFound)?;
        Ok(attr_of(&dir::read_entry(&self.geo, &self.img, slot)))
    }

    /// Open a file. Directories (the root included) refuse with
    /// `IsADirectory`.
    pub fn open(&self, path: &str) -> FsResult<FileHandle> {
        if path == "/" {
            return Err(FsError::IsADirectory);
        }
        let res = resolve(&self.geo, &self.img, path, false)?;
        let slot = res.entry.ok_or(FsError::NotFound)?;
        if dir::read_entry(&self.geo, &self.img, slot).is_dir() {
            return Err(FsError::IsADirectory);
        }
        Ok(FileHandle { slot })
    }

    /// Open a directory for listing.
    pub fn opendir(&self, path: &str) -> FsResult<DirHandle> {
        if path == "/" {
            return Ok(DirHandle { start: 0 });
        }
        let res = resolve(&self.geo, &self.img, path, false)?;
        let slot = res.entry.ok_or(FsError::NotFound)?;
        let entry = dir::read_entry(&self.geo, &self.img, slot);
        if !entry.is_dir() {
            return Err(FsError::NotADirectory);
        }
        Ok(DirHandle {
            start: entry.start_page,
        })
    }

    /// List a directory: `.`, `..`, then every occupied entry across the
    /// whole chain.
    pub fn readdir(&self, handle: DirHandle) -> FsResult<Vec<DirEntryInfo>> {
        let mut entries = vec![
            DirEntryInfo {
                name: ".".into(),
                kind: EntryKind::Directory,
                size: 0,
                mtime: None,
            },
            DirEntryInfo {
                name: "..".into(),
                kind: EntryKind::Directory,
                size: 0,
                mtime: None,
            },
        ];

        for page in DirChain::at(handle.start).pages(&self.geo, &self.img) {
            for s in 0..self.geo.slots_in(page) {
                let slot = EntrySlot { page, slot: s as u16 };
                if !dir::slot_occupied(&self.geo, &self.img, slot) {
                    continue;
                }
                let entry = dir::read_entry(&self.geo, &self.img, slot);
                entries.push(DirEntryInfo {
                    name: entry.name_str().to_string(),
                    kind: entry.kind(),
                    size: entry.size as u64,
                    mtime: Some(entry.date),
                });
            }
        }

        Ok(entries)
    }

    /// Read up to `buf.len()` bytes starting at `offset`. Returns the
    /// number of bytes copied, 0 at or past end of file.
    pub fn read(&self, handle: FileHandle, offset: u64, buf: &mut [u8]) -> FsResult<usize> {
        let entry = self.live_file(handle)?;
        let size = entry.size as u64;
        if offset >= size {
            return Ok(0);
        }
        let total = buf.len().min((size - offset) as usize);
        let payload = self.geo.payload;

        let mut page = chain::walk(
            &self.geo,
            &self.img,
            entry.start_page,
            (offset / payload as u64) as usize,
        )
        .ok_or(FsError::Corrupted)?;
        let mut offset_in_page = (offset % payload as u64) as usize;

        let mut copied = 0;
        while copied < total {
            let count = (payload - offset_in_page).min(total - copied);
            let src = self.geo.page_offset(page) + self.geo.content_offset + offset_in_page;
            buf[copied..copied + count].copy_from_slice(&self.img[src..src + count]);
            copied += count;
            if copied < total {
                page = chain::next(&self.geo, &self.img, page);
                if page == 0 {
                    return Err(FsError::Corrupted);
                }
            }
            offset_in_page = 0;
        }

        Ok(total)
    }

    /// Write `data` at `offset`, allocating and linking pages as the chain
    /// runs out. The file size becomes `max(old size, offset + written)`.
    ///
    /// Fails with `TooLarge` up front when the free pages cannot hold the
    /// request, and with `NoSpace` if the allocator is exhausted mid-write
    /// (possible when extending past the end of the chain first); in that
    /// case the partial chain extension remains and `size` covers exactly
    /// the bytes deposited.
    pub fn write(&mut self, handle: FileHandle, offset: u64, data: &[u8]) -> FsResult<usize> {
        let mut entry = self.live_file(handle)?;
        if data.is_empty() {
            return Ok(0);
        }
        if offset + data.len() as u64 > u32::MAX as u64 {
            return Err(FsError::TooLarge);
        }

        let payload = self.geo.payload;
        let offset_in_first = (offset % payload as u64) as usize;
        let remaining_in_page = (payload - offset_in_first) as u64;
        let free = self.geo.free_pages(&self.img) as u64;
        if free * payload as u64 + remaining_in_page < data.len() as u64 {
            return Err(FsError::TooLarge);
        }

        // Walk to the page holding `offset`, extending the chain when a
        // forward seek points past its end. Fresh pages are zeroed so the
        // gap reads back as zeros even if a page is reused.
        let mut page = entry.start_page;
        for _ in 0..(offset / payload as u64) as usize {
            page = match chain::next(&self.geo, &self.img, page) {
                0 => self.extend_chain(page).ok_or(FsError::NoSpace)?,
                next => next,
            };
        }

        let mut offset_in_page = offset_in_first;
        let mut written = 0;
        loop {
            let count = (payload - offset_in_page).min(data.len() - written);
            let dst = self.geo.page_offset(page) + self.geo.content_offset + offset_in_page;
            self.img[dst..dst + count].copy_from_slice(&data[written..written + count]);
            written += count;
            entry.size = entry.size.max((offset + written as u64) as u32);

            if written == data.len() {
                break;
            }
            page = match chain::next(&self.geo, &self.img, page) {
                0 => match self.extend_chain(page) {
                    Some(next) => next,
                    None => {
                        dir::write_entry(&self.geo, &mut self.img, handle.slot, &entry);
                        return Err(FsError::NoSpace);
                    }
                },
                next => next,
            };
            offset_in_page = 0;
        }

        dir::write_entry(&self.geo, &mut self.img, handle.slot, &entry);
        Ok(written)
    }

    /// Create an empty file.
    pub fn create(&mut self, path: &str) -> FsResult<FileHandle> {
        let slot = self.create_node(EntryKind::File, path)?;
        Ok(FileHandle { slot })
    }

    /// Create an empty directory.
    pub fn mkdir(&mut self, path: &str) -> FsResult<()> {
        self.create_node(EntryKind::Directory, path)?;
        Ok(())
    }

    /// Remove a file, reclaiming its whole page chain.
    pub fn unlink(&mut self, path: &str) -> FsResult<()> {
        let res = resolve(&self.geo, &self.img, path, false)?;
        let slot = res.entry.ok_or(FsError::NotFound)?;
        let entry = dir::read_entry(&self.geo, &self.img, slot);
        if entry.is_dir() {
            return Err(FsError::IsADirectory);
        }
        self.free_chain(entry.start_page);
        dir::clear_slot_flags(&self.geo, &mut self.img, slot);
        Ok(())
    }

    /// Remove an empty directory.
    pub fn rmdir(&mut self, path: &str) -> FsResult<()> {
        if path == "/" {
            return Err(FsError::PermissionDenied);
        }
        let res = resolve(&self.geo, &self.img, path, false)?;
        let slot = res.entry.ok_or(FsError::NotFound)?;
        let entry = dir::read_entry(&self.geo, &self.img, slot);
        if !entry.is_dir() {
            return Err(FsError::NotADirectory);
        }

        for page in DirChain::at(entry.start_page).pages(&self.geo, &self.img) {
            for s in 0..self.geo.slots_in(page) {
                let probe = EntrySlot { page, slot: s as u16 };
                if dir::slot_occupied(&self.geo, &self.img, probe) {
                    return Err(FsError::DirectoryNotEmpty);
                }
            }
        }

        // v1 directories are a single page with no in-band link; v2 chains
        // go through the FAT like any other.
        match self.geo.version {
            Version::V1 => bitmap::free(&self.geo, &mut self.img, entry.start_page),
            Version::V2 => self.free_chain(entry.start_page),
        }
        dir::clear_slot_flags(&self.geo, &mut self.img, slot);
        Ok(())
    }

    /// Rename or move an entry. Content chains are never touched; only
    /// directory entries are rewritten.
    pub fn rename(&mut self, from: &str, to: &str, flags: RenameFlags) -> FsResult<()> {
        let from_slot = match resolve(&self.geo, &self.img, from, false) {
            Ok(res) => res.entry,
            Err(FsError::NotFound) => None,
            Err(e) => return Err(e),
        };
        let (to_slot, to_free) = match resolve(&self.geo, &self.img, to, true) {
            Ok(res) => (res.entry, res.free_slot),
            Err(FsError::NotFound) => (None, None),
            Err(e) => return Err(e),
        };

        let from_slot = from_slot.ok_or(FsError::NotFound)?;
        if flags == RenameFlags::Exchange && to_slot.is_none() {
            return Err(FsError::NotFound);
        }
        if flags == RenameFlags::NoReplace && to_slot.is_some() {
            return Err(FsError::AlreadyExists);
        }
        if flags == RenameFlags::Exchange {
            return Err(FsError::NotSupported);
        }

        let (from_dir, _) = split_parent(from);
        let (to_dir, new_name) = split_parent(to);
        if new_name.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }

        // If the destination already exists, remove it and reuse its slot.
        // Directories refuse here, so a rename cannot clobber one.
        let mut dest = to_free;
        if let Some(slot) = to_slot {
            self.unlink(to)?;
            dest = Some(slot);
        }

        // Rename the source in its own directory first
        let mut entry = dir::read_entry(&self.geo, &self.img, from_slot);
        entry.set_name(new_name);
        dir::write_entry(&self.geo, &mut self.img, from_slot, &entry);

        if from_dir != to_dir {
            let dest = dest.ok_or(FsError::NoFreeDirent)?;
            dir::write_entry(&self.geo, &mut self.img, dest, &entry);
            dir::zero_slot(&self.geo, &mut self.img, from_slot);
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Fetch the entry behind a file handle, rejecting stale handles.
    fn live_file(&self, handle: FileHandle) -> FsResult<FileEntry> {
        let entry = dir::read_entry(&self.geo, &self.img, handle.slot);
        if !entry.is_occupied() {
            return Err(FsError::NotFound);
        }
        if entry.is_dir() {
            return Err(FsError::IsADirectory);
        }
        Ok(entry)
    }

    fn create_node(&mut self, kind: EntryKind, path: &str) -> FsResult<EntrySlot> {
        if path == "/" {
            return Err(FsError::AlreadyExists);
        }
        let (_, name) = split_parent(path);
        if name.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }
        if name.is_empty() {
            return Err(FsError::InvalidArgument);
        }

        let res = resolve(&self.geo, &self.img, path, true)?;
        if res.entry.is_some() {
            return Err(FsError::AlreadyExists);
        }
        let slot = match res.free_slot {
            Some(slot) => slot,
            None => self.grow_dir(res.dir)?,
        };

        let page = bitmap::allocate(&self.geo, &mut self.img).ok_or(FsError::NoSpace)?;
        self.zero_page(page);

        let size = match kind {
            EntryKind::File => 0,
            EntryKind::Directory => self.geo.page_size as u32,
        };
        let entry = FileEntry::new(kind, name, page, size, now());
        dir::write_entry(&self.geo, &mut self.img, slot, &entry);

        log::debug!(
            "{path}: allocated {:?} at page {page}, entry in page {} slot {}",
            kind,
            slot.page,
            slot.slot
        );
        Ok(slot)
    }

    /// Claim a fresh slot in a directory whose chain is full. v1
    /// directories cannot grow; v2 links a zeroed page through the FAT and
    /// hands out its first slot.
    fn grow_dir(&mut self, dir: DirChain) -> FsResult<EntrySlot> {
        if self.geo.version == Version::V1 {
            return Err(FsError::NoFreeDirent);
        }
        let last = *dir
            .pages(&self.geo, &self.img)
            .last()
            .expect("a directory chain has at least one page");
        let page = bitmap::allocate(&self.geo, &mut self.img).ok_or(FsError::NoFreeDirent)?;
        self.zero_page(page);
        chain::set_next(&self.geo, &mut self.img, last, page);
        log::debug!("directory page {last} full, linked new page {page}");
        Ok(EntrySlot { page, slot: 0 })
    }

    /// Allocate, zero, and link a page after `page`. `None` when the
    /// bitmap is saturated.
    fn extend_chain(&mut self, page: u16) -> Option<u16> {
        let next = bitmap::allocate(&self.geo, &mut self.img)?;
        self.zero_page(next);
        chain::set_next(&self.geo, &mut self.img, page, next);
        Some(next)
    }

    /// Free every page reachable from `start`, clearing the links.
    fn free_chain(&mut self, start: u16) {
        let mut page = start;
        while page != 0 {
            let next = chain::next(&self.geo, &self.img, page);
            chain::set_next(&self.geo, &mut self.img, page, 0);
            bitmap::free(&self.geo, &mut self.img, page);
            page = next;
        }
    }

    fn zero_page(&mut self, page: u16) {
        let off = self.geo.page_offset(page);
        self.img[off..off + self.geo.page_size].fill(0);
    }
}

fn attr_of(entry: &FileEntry) -> Attr {
    Attr {
        kind: entry.kind(),
        size: entry.size as u64,
        nlink: if entry.is_dir() { 2 } else { 1 },
        mode: 0o777,
        mtime: Some(entry.date),
    }
}

/// Sample the wall clock into the on-disk BCD format.
fn now() -> BcdDate {
    let now = chrono::Local::now();
    BcdDate::from_parts(
        now.year().clamp(0, 9999) as u16,
        now.month() as u8,
        now.day() as u8,
        now.weekday().num_days_from_sunday() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    )
}
