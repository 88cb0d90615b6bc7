//! Backing-file session
//!
//! The engine only knows about a byte buffer; this module maps that buffer
//! to a file. Opening a missing image formats a fresh one (optionally
//! wrapped in an MBR partition for v2); opening an existing image locates
//! the filesystem (MBR probe or raw), loads it into memory, and validates
//! it. All mutations stay in memory until [`Mount::flush`] writes the
//! cache back at the partition offset.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use zealfs_common::{mbr, v1, FsError, Version};

use crate::engine::ZealFs;

/// Configuration bundle for a mount.
#[derive(Clone, Debug)]
pub struct MountOptions {
    pub image: PathBuf,
    /// Size of a newly created image, in KiB
    pub size_kib: u32,
    /// Wrap a newly created v2 image in an MBR partition
    pub mbr: bool,
    pub version: Version,
}

impl MountOptions {
    pub fn new(image: impl Into<PathBuf>, version: Version) -> Self {
        Self {
            image: image.into(),
            size_kib: 32,
            mbr: false,
            version,
        }
    }
}

/// Errors from the file boundary.
#[derive(Debug)]
pub enum MountError {
    Io(io::Error),
    Fs(FsError),
    /// The existing image contains no recognisable ZealFS partition
    NoPartition,
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::Io(e) => write!(f, "image I/O error: {e}"),
            MountError::Fs(e) => write!(f, "{e}"),
            MountError::NoPartition => {
                f.write_str("could not find any ZealFS partition in the existing image")
            }
        }
    }
}

impl std::error::Error for MountError {}

impl From<io::Error> for MountError {
    fn from(e: io::Error) -> Self {
        MountError::Io(e)
    }
}

impl From<FsError> for MountError {
    fn from(e: FsError) -> Self {
        MountError::Fs(e)
    }
}

/// A filesystem bound to a backing file.
pub struct Mount {
    fs: ZealFs,
    file: File,
    /// Byte offset of the filesystem inside the backing file (non-zero
    /// only for MBR-wrapped v2 images)
    offset: u64,
}

impl Mount {
    /// Open `opts.image`, formatting it first if it does not exist yet.
    pub fn open(opts: &MountOptions) -> Result<Self, MountError> {
        match std::fs::metadata(&opts.image) {
            Err(_) => Self::create(opts),
            Ok(md) => Self::load(opts, md.len()),
        }
    }

    fn create(opts: &MountOptions) -> Result<Self, MountError> {
        let size = opts.size_kib as u64 * 1024;
        if opts.version == Version::V1 && size > v1::MAX_IMAGE_BYTES as u64 {
            log::error!("a v1 image must be at most 64 KiB, got {} KiB", opts.size_kib);
            return Err(FsError::InvalidArgument.into());
        }

        let offset = if opts.version == Version::V2 && opts.mbr {
            mbr::SECTOR_SIZE
        } else {
            0
        };

        let fs = ZealFs::format(opts.version, size)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&opts.image)?;
        file.set_len(offset + size)?;

        if offset != 0 {
            let sector = mbr::create_mbr(offset, size)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&sector)?;
        }

        let mut mount = Self { fs, file, offset };
        mount.flush()?;
        Ok(mount)
    }

    fn load(opts: &MountOptions, file_len: u64) -> Result<Self, MountError> {
        let mut file = OpenOptions::new().read(true).write(true).open(&opts.image)?;

        let (offset, size) = match opts.version {
            // A v1 image is always raw; adopt the file's actual size
            Version::V1 => (0, file_len),
            Version::V2 => {
                let mut sector = Vec::new();
                std::io::Read::by_ref(&mut file)
                    .take(mbr::MBR_SIZE as u64)
                    .read_to_end(&mut sector)?;
                let part =
                    mbr::find_partition(&sector, file_len).ok_or(MountError::NoPartition)?;
                log::info!(
                    "found ZealFS partition at offset {:#x}, size {} bytes",
                    part.offset,
                    part.size
                );
                (part.offset, part.size)
            }
        };

        let mut cache = vec![0u8; size as usize];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut cache)?;

        let fs = ZealFs::from_image(cache, opts.version)?;
        Ok(Self { fs, file, offset })
    }

    pub fn fs(&self) -> &ZealFs {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut ZealFs {
        &mut self.fs
    }

    /// Write the whole cache back at the partition offset.
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.write_all(self.fs.image())?;
        self.file.flush()
    }

    /// Teardown: flush the cache and close the backing file.
    pub fn close(mut self) -> io::Result<()> {
        self.flush()
    }
}
