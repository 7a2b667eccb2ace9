//! The error type returned by every fallible operation in this crate.

use std::io;

/// An error produced by the filesystem core.
///
/// This is the single currency of the crate: every fallible function returns
/// `Result<T, DfsError>`. [`DfsError::to_errno`] projects a value onto the negated
/// POSIX-style error codes expected by a C-style VFS dispatch table.
#[derive(Debug, thiserror::Error)]
pub enum DfsError {
	/// Malformed options, an unknown option key, or an otherwise invalid argument.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// A read or write to the underlying device failed, or the on-disk state is
	/// internally inconsistent (bad signature, version mismatch, short read/write).
	#[error("I/O error: {0}")]
	Io(String),

	/// The buffer pool or an allocation could not obtain memory.
	#[error("out of memory")]
	NoMemory,

	/// No free block or inode remains to satisfy an allocation request.
	#[error("no space left on device")]
	NoSpace,
}

impl DfsError {
	/// Projects this error onto a negated POSIX-style error code, as expected by the
	/// administrative interface described in the on-disk spec (`format`/`mount`/`unmount`/
	/// `statfs` all return `0` or a negative `errno`).
	pub fn to_errno(&self) -> i32 {
		match self {
			Self::InvalidArgument(_) => -libc::EINVAL,
			Self::Io(_) => -libc::EIO,
			Self::NoMemory => -libc::ENOMEM,
			Self::NoSpace => -libc::ENOSPC,
		}
	}
}

impl From<io::Error> for DfsError {
	fn from(e: io::Error) -> Self {
		Self::Io(e.to_string())
	}
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DfsError>;
