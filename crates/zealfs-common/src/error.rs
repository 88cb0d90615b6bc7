//! Error types

use core::fmt;

/// Result type used by every filesystem operation.
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem error taxonomy.
///
/// Errors are abstract; hosts map them to their own error codes at the
/// boundary with [`FsError::to_errno`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Path resolution failed (missing component or intermediate
    /// non-directory)
    NotFound,
    /// Create/mkdir/no-replace-rename against an existing target
    AlreadyExists,
    /// File operation requested on a directory
    IsADirectory,
    /// Directory operation requested on a file
    NotADirectory,
    /// rmdir on a non-empty directory
    DirectoryNotEmpty,
    /// Basename exceeds the 16-byte limit
    NameTooLong,
    /// Terminal directory has no free slot and cannot be grown
    NoFreeDirent,
    /// Page bitmap saturated when the allocator was called
    NoSpace,
    /// Write whose total bytes cannot fit in the remaining free pages
    TooLarge,
    /// Operation refused (e.g. rmdir on the root)
    PermissionDenied,
    /// Operation not supported (e.g. exchange-rename)
    NotSupported,
    /// Invalid configuration or parameter
    InvalidArgument,
    /// Image failed validation: bad magic, zero bitmap, bitmap larger than
    /// the backing file, free-page accounting off
    Corrupted,
}

impl FsError {
    /// Convert to an errno-style error code.
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::NotFound => -2,           // ENOENT
            FsError::AlreadyExists => -17,     // EEXIST
            FsError::IsADirectory => -21,      // EISDIR
            FsError::NotADirectory => -20,     // ENOTDIR
            FsError::DirectoryNotEmpty => -39, // ENOTEMPTY
            FsError::NameTooLong => -36,       // ENAMETOOLONG
            FsError::NoFreeDirent => -23,      // ENFILE
            FsError::NoSpace => -28,           // ENOSPC
            FsError::TooLarge => -27,          // EFBIG
            FsError::PermissionDenied => -13,  // EACCES
            FsError::NotSupported => -38,      // ENOSYS
            FsError::InvalidArgument => -22,   // EINVAL
            FsError::Corrupted => -5,          // EIO
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::NotFound => "no such file or directory",
            FsError::AlreadyExists => "file already exists",
            FsError::IsADirectory => "is a directory",
            FsError::NotADirectory => "not a directory",
            FsError::DirectoryNotEmpty => "directory not empty",
            FsError::NameTooLong => "name too long",
            FsError::NoFreeDirent => "no free directory entry",
            FsError::NoSpace => "no space left in the page bitmap",
            FsError::TooLarge => "write does not fit in the remaining pages",
            FsError::PermissionDenied => "permission denied",
            FsError::NotSupported => "operation not supported",
            FsError::InvalidArgument => "invalid argument",
            FsError::Corrupted => "corrupted image",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {}
