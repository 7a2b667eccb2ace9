//! The block device adapter: the external collaborator this crate consumes but does not
//! implement itself. Only two capabilities are required: byte-offset read/write, and a
//! sector count query.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A sector-addressable block device.
///
/// Implementations are expected to perform synchronous, blocking I/O: this crate never
/// suspends on anything else, per §5.
pub trait BlockDevice {
	/// Reads `buf.len()` bytes starting at byte offset `offset`.
	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

	/// Writes `buf` starting at byte offset `offset`.
	fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;

	/// Returns the number of 512-byte sectors available on the device.
	fn sector_count(&mut self) -> io::Result<u64>;
}

/// A [`BlockDevice`] backed by a regular file or a real block/character device node.
pub struct FileBlockDevice {
	file: File,
	path: PathBuf,
}

impl FileBlockDevice {
	/// Opens `path` for I/O. `writable` controls whether the file is also opened for
	/// writing; `format` and allocation need it, read-only mounts do not.
	pub fn open(path: impl AsRef<Path>, writable: bool) -> io::Result<Self> {
		let path = path.as_ref().to_path_buf();
		let file = OpenOptions::new().read(true).write(writable).open(&path)?;
		Ok(Self { file, path })
	}
}

impl BlockDevice for FileBlockDevice {
	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		self.file.seek(SeekFrom::Start(offset))?;
		self.file.read_exact(buf)
	}

	fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
		self.file.seek(SeekFrom::Start(offset))?;
		self.file.write_all(buf)
	}

	fn sector_count(&mut self) -> io::Result<u64> {
		util::disk::get_sector_count(&self.path)
	}
}

/// An in-memory [`BlockDevice`], used by the crate's own tests and useful to embedders
/// that want to format or inspect a filesystem image without touching a real file.
pub struct MemDevice {
	data: Vec<u8>,
}

impl MemDevice {
	/// Creates a zero-filled device of `sectors` sectors.
	pub fn new(sectors: u64) -> Self {
		Self {
			data: vec![0u8; (sectors * 512) as usize],
		}
	}

	/// Returns a reference to the raw backing storage, mostly useful in tests that want
	/// to inspect bytes the library wrote directly.
	pub fn as_slice(&self) -> &[u8] {
		&self.data
	}
}

impl BlockDevice for MemDevice {
	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		let start = offset as usize;
		let end = start + buf.len();
		if end > self.data.len() {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of device"));
		}
		buf.copy_from_slice(&self.data[start..end]);
		Ok(())
	}

	fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
		let start = offset as usize;
		let end = start + buf.len();
		if end > self.data.len() {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "write past end of device"));
		}
		self.data[start..end].copy_from_slice(buf);
		Ok(())
	}

	fn sector_count(&mut self) -> io::Result<u64> {
		Ok(self.data.len() as u64 / 512)
	}
}
