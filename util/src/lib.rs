//! Small utilities shared between the `dfs` crate and its command-line front-end.

pub mod disk;
pub mod prompt;

use std::fmt;

/// Returns the base-2 logarithm of `n`, or `None` if `n` is not a power of two (or zero).
pub fn log2(n: u64) -> Option<u32> {
	if n == 0 || !n.is_power_of_two() {
		return None;
	}
	Some(n.trailing_zeros())
}

/// Rounds `n` up to the nearest multiple of `mult`.
pub fn ceil_div(n: u64, mult: u64) -> u64 {
	(n + mult - 1) / mult
}

/// A human-readable byte count, formatted with a binary (KiB/MiB/...) suffix.
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		const UNITS: [&str; 7] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB"];

		if self.0 < 1024 {
			return write!(fmt, "{} bytes", self.0);
		}

		let mut order = 0usize;
		let mut scaled = self.0 as f64;
		while scaled >= 1024.0 && order < UNITS.len() - 1 {
			scaled /= 1024.0;
			order += 1;
		}

		write!(fmt, "{:.1} {}", scaled, UNITS[order])
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn log2_powers() {
		assert_eq!(log2(1), Some(0));
		assert_eq!(log2(512), Some(9));
		assert_eq!(log2(4096), Some(12));
		assert_eq!(log2(0), None);
		assert_eq!(log2(3), None);
	}

	#[test]
	fn ceil_div_rounds_up() {
		assert_eq!(ceil_div(10, 3), 4);
		assert_eq!(ceil_div(9, 3), 3);
		assert_eq!(ceil_div(0, 3), 0);
	}

	#[test]
	fn bytesize_units() {
		assert_eq!(format!("{}", ByteSize(512)), "512 bytes");
		assert_eq!(format!("{}", ByteSize(1024)), "1.0 KiB");
		assert_eq!(format!("{}", ByteSize(1024 * 1024 * 128)), "128.0 MiB");
	}
}
