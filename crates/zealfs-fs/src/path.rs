//! Path resolution
//!
//! Walks an absolute path component by component through the directory
//! chains. The caller may ask for a free slot in the terminal parent, which
//! is how `create` and `rename` claim their directory entries.

use zealfs_common::{FsError, FsResult, NAME_MAX_LEN};

use crate::dir::{self, DirChain, EntrySlot};
use crate::geometry::Geometry;

/// Outcome of resolving a non-root path.
pub(crate) struct Resolution {
    /// Slot of the occupied entry for the leaf, if it exists
    pub entry: Option<EntrySlot>,
    /// First free slot seen in the terminal parent, when requested
    pub free_slot: Option<EntrySlot>,
    /// The terminal parent directory itself
    pub dir: DirChain,
}

/// Resolve `path` (absolute, not `/` itself) against the directory tree.
///
/// Fails with [`FsError::NotFound`] when an intermediate component is
/// missing, is a file, or is over-long. Reaching the terminal directory is
/// a success even if the leaf itself does not exist; the caller decides
/// what a missing leaf means.
pub(crate) fn resolve(
    geo: &Geometry,
    img: &[u8],
    path: &str,
    want_free: bool,
) -> FsResult<Resolution> {
    let rel = path.strip_prefix('/').ok_or(FsError::InvalidArgument)?;

    let components: Vec<&str> = rel.split('/').collect();
    let last_index = components.len() - 1;
    let mut dir = DirChain::root();

    for (ci, component) in components.iter().enumerate() {
        let last = ci == last_index;
        if component.len() > NAME_MAX_LEN {
            return Err(FsError::NotFound);
        }

        let mut found = None;
        let mut free_slot = None;
        'scan: for page in dir.pages(geo, img) {
            for s in 0..geo.slots_in(page) {
                let slot = EntrySlot { page, slot: s as u16 };
                if !dir::slot_occupied(geo, img, slot) {
                    if last && want_free && free_slot.is_none() {
                        free_slot = Some(slot);
                    }
                    continue;
                }
                if dir::read_entry(geo, img, slot).name_matches(component) {
                    found = Some(slot);
                    break 'scan;
                }
            }
        }

        match found {
            Some(slot) => {
                if last {
                    return Ok(Resolution {
                        entry: Some(slot),
                        free_slot,
                        dir,
                    });
                }
                let entry = dir::read_entry(geo, img, slot);
                if !entry.is_dir() {
                    // A file cannot be an interior path component
                    return Err(FsError::NotFound);
                }
                dir = DirChain::at(entry.start_page);
            }
            None => {
                if last {
                    return Ok(Resolution {
                        entry: None,
                        free_slot,
                        dir,
                    });
                }
                return Err(FsError::NotFound);
            }
        }
    }

    Err(FsError::NotFound)
}

/// Split a path into its parent directory and basename.
/// `"/a/x"` becomes `("/a", "x")`, `"/a"` becomes `("", "a")`.
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}
