//! Parses the comma-separated `key[=value]` option grammar described in §4.2.
//!
//! Unlike a C implementation, this parser never mutates its input: it borrows the `&str`
//! it is given and produces an owned, value-typed [`Options`] record.

use crate::error::{DfsError, Result};

/// Parsed and defaulted mount/format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
	/// Block size in bytes. Default 4096.
	pub blocksize: u32,
	/// Requested buffer cache size, in buffers. 0 means "derive from the superblock or a
	/// built-in default".
	pub cache: u32,
	/// Bytes of group per inode, used to size `inodes_per_group` at format time. Default 4096.
	pub inoderatio: u32,
	/// Blocks reserved immediately after the superblock. Default 16.
	pub resvblks: u32,
	/// Inodes reserved at the start of inode space. Default 16.
	pub resvinodes: u32,
	/// Skip whole-device zeroing at format time.
	pub quick: bool,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			blocksize: 4096,
			cache: 0,
			inoderatio: 4096,
			resvblks: 16,
			resvinodes: 16,
			quick: false,
		}
	}
}

/// Parses `spec` against the grammar `key[=value](,key[=value])*`.
///
/// A value of `"-1"` means "keep the default". An empty string yields [`Options::default`].
/// An unrecognised key fails with [`DfsError::InvalidArgument`].
pub fn parse(spec: &str) -> Result<Options> {
	let mut opts = Options::default();

	for part in spec.split(',') {
		let part = part.trim();
		if part.is_empty() {
			continue;
		}
		let (key, value) = match part.split_once('=') {
			Some((k, v)) => (k, Some(v)),
			None => (part, None),
		};

		match key {
			"blocksize" => opts.blocksize = parse_u32(key, value, opts.blocksize)?,
			"cache" => opts.cache = parse_u32(key, value, opts.cache)?,
			"inoderatio" => opts.inoderatio = parse_u32(key, value, opts.inoderatio)?,
			"resvblks" => opts.resvblks = parse_u32(key, value, opts.resvblks)?,
			"resvinodes" => opts.resvinodes = parse_u32(key, value, opts.resvinodes)?,
			"quick" => {
				if value.is_some() {
					return Err(DfsError::InvalidArgument("`quick` takes no value".into()));
				}
				opts.quick = true;
			}
			other => {
				log::warn!("rejecting unknown mount/format option `{other}`");
				return Err(DfsError::InvalidArgument(format!("unknown option `{other}`")));
			}
		}
	}

	Ok(opts)
}

fn parse_u32(key: &str, value: Option<&str>, default: u32) -> Result<u32> {
	let raw = value.ok_or_else(|| DfsError::InvalidArgument(format!("option `{key}` requires a value")))?;
	let n: i64 = raw
		.parse()
		.map_err(|_| DfsError::InvalidArgument(format!("option `{key}` has invalid value `{raw}`")))?;
	if n == -1 {
		Ok(default)
	} else if n >= 0 && n <= u32::MAX as i64 {
		Ok(n as u32)
	} else {
		Err(DfsError::InvalidArgument(format!("option `{key}` value `{raw}` out of range")))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn defaults_on_empty_string() {
		assert_eq!(parse("").unwrap(), Options::default());
	}

	#[test]
	fn overrides_and_flag() {
		let o = parse("blocksize=1024,quick,resvblks=4").unwrap();
		assert_eq!(o.blocksize, 1024);
		assert_eq!(o.resvblks, 4);
		assert!(o.quick);
		assert_eq!(o.inoderatio, Options::default().inoderatio);
	}

	#[test]
	fn minus_one_keeps_default() {
		let o = parse("blocksize=-1").unwrap();
		assert_eq!(o.blocksize, Options::default().blocksize);
	}

	#[test]
	fn unknown_key_fails() {
		assert!(matches!(parse("widgets=3"), Err(DfsError::InvalidArgument(_))));
	}

	#[test]
	fn quick_rejects_a_value() {
		assert!(parse("quick=1").is_err());
	}
}
