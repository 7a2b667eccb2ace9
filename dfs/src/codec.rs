//! Typed encode/decode of on-disk structures into and out of buffer bytes.
//!
//! The C idiom this replaces is a raw pointer cast of a buffer's bytes onto a `struct`.
//! Here every on-disk structure derives `bincode::{Encode, Decode}` and is read or written
//! through this module's helpers, which fix a stable little-endian, fixed-width
//! configuration so the on-disk layout does not depend on the host's pointer width or
//! endianness.

use bincode::{Decode, Encode};

use crate::error::{DfsError, Result};

fn config() -> impl bincode::config::Config {
	bincode::config::standard()
		.with_fixed_int_encoding()
		.with_little_endian()
}

/// Decodes a `T` from the start of `buf`. Trailing bytes are ignored.
pub fn decode<T: Decode>(buf: &[u8]) -> Result<T> {
	let (value, _) = bincode::decode_from_slice(buf, config())
		.map_err(|e| DfsError::Io(format!("failed to decode on-disk structure: {e}")))?;
	Ok(value)
}

/// Encodes `value` into the start of `buf`, which must be large enough to hold it.
pub fn encode_into<T: Encode>(buf: &mut [u8], value: &T) -> Result<()> {
	bincode::encode_into_slice(value, buf, config())
		.map_err(|e| DfsError::Io(format!("failed to encode on-disk structure: {e}")))?;
	Ok(())
}
