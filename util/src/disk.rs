//! Disk/device-related utility functions.

use std::ffi::c_long;
use std::fs;
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// ioctl macro: command.
macro_rules! ioc {
	($a:expr, $b:expr, $c:expr, $d:expr) => {
		(($a) << 30) | (($b) << 8) | ($c) | (($d) << 16)
	};
}

/// ioctl macro: read command.
macro_rules! ior {
	($a:expr, $b:expr, $c:ty) => {
		ioc!(2, $a, $b, std::mem::size_of::<$c>() as c_long)
	};
}

/// ioctl command: get size of disk in bytes.
const BLKGETSIZE64: c_long = ior!(0x12, 114, u64);

/// Returns the number of 512-byte sectors on the device or regular file at `path`.
///
/// For a regular file, this is derived from the file's length; for a block or character
/// device, the `BLKGETSIZE64` ioctl is used.
pub fn get_sector_count(path: &Path) -> io::Result<u64> {
	let metadata = fs::metadata(path)?;
	let file_type = metadata.file_type();

	if file_type.is_block_device() || file_type.is_char_device() {
		let dev = fs::File::open(path)?;
		let mut size: u64 = 0;
		let ret = unsafe { libc::ioctl(dev.as_raw_fd(), BLKGETSIZE64 as _, &mut size) };
		if ret < 0 {
			return Err(io::Error::last_os_error());
		}
		Ok(size / 512)
	} else {
		Ok(metadata.len() / 512)
	}
}
