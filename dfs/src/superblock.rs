//! The superblock: the single, versioned root record describing the whole filesystem.
//!
//! Unlike every other piece of metadata, the superblock is never read or written through
//! the buffer cache. It lives at a fixed byte offset (the second 512-byte sector of the
//! device) and is read once at mount, kept as the in-memory authority for the lifetime of
//! the mount, and written back directly whenever it is dirty (see
//! [`crate::fs::Filesystem::sync`]).

use bincode::{Decode, Encode};

use crate::codec;
use crate::error::{DfsError, Result};
use crate::layout::SECTOR_SIZE;

/// Magic number identifying a DFS superblock.
pub const SIGNATURE: u32 = 0x4653_4431;
/// On-disk format version understood by this implementation.
pub const VERSION: u32 = 1;

/// Byte offset of the superblock from the start of the device (sector 1).
pub const SUPERBLOCK_OFFSET: u64 = SECTOR_SIZE;

/// The persisted root record of a DFS filesystem.
///
/// All fields are persisted except none: the in-memory-only `super_dirty` flag described
/// in the data model lives alongside this struct in [`crate::fs::Filesystem`], not inside
/// it, so that `Superblock` stays a pure on-disk record.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Superblock {
	/// Magic constant, must equal [`SIGNATURE`].
	pub signature: u32,
	/// On-disk format version, must equal [`VERSION`].
	pub version: u32,
	/// `blocksize = 1 << log_block_size`.
	pub log_block_size: u32,
	/// Total number of blocks on the device.
	pub block_count: u32,
	/// Number of blocks per group; always `blocksize * 8`.
	pub blocks_per_group: u32,
	/// Number of groups.
	pub group_count: u32,
	/// Number of inodes per group.
	pub inodes_per_group: u32,
	/// Total number of inodes (`inodes_per_group * group_count`).
	pub inode_count: u32,
	/// Advisory number of buffers the cache was created with.
	pub cache_buffers: u32,
	/// First block reserved for filesystem metadata (1 or 2, see §B2).
	pub first_reserved_block: u32,
	/// Count of admin-reserved blocks immediately following the superblock.
	pub reserved_blocks: u32,
	/// First block of the group descriptor table.
	pub groupdesc_table_block: u32,
	/// Count of inodes reserved at the start of inode space.
	pub reserved_inodes: u32,
	/// Number of currently free blocks across all groups.
	pub free_block_count: u32,
	/// Number of currently free inodes across all groups.
	pub free_inode_count: u32,
}

impl Superblock {
	/// The block size in bytes.
	pub fn blocksize(&self) -> u32 {
		1 << self.log_block_size
	}

	/// Verifies the signature and version fields, per §4.4 step 2 / §8 S6.
	pub fn check(&self) -> Result<()> {
		if self.signature != SIGNATURE {
			log::error!("superblock signature mismatch: {:#x}", self.signature);
			return Err(DfsError::Io("invalid superblock signature".into()));
		}
		if self.version != VERSION {
			log::error!("superblock version mismatch: {}", self.version);
			return Err(DfsError::Io(format!("unsupported superblock version {}", self.version)));
		}
		Ok(())
	}

	/// Encodes this superblock into a zero-padded, sector-sized buffer ready to be
	/// written at [`SUPERBLOCK_OFFSET`].
	pub fn encode_sector(&self) -> Result<[u8; SECTOR_SIZE as usize]> {
		let mut buf = [0u8; SECTOR_SIZE as usize];
		codec::encode_into(&mut buf, self)?;
		Ok(buf)
	}

	/// Decodes a superblock from a sector-sized buffer read from [`SUPERBLOCK_OFFSET`].
	pub fn decode_sector(buf: &[u8]) -> Result<Self> {
		codec::decode(buf)
	}
}
