//! Fixed constants and geometry derivation shared by format and mount.
//!
//! A "geometry" is the set of derived (non-persisted) numbers both `format` and `mount`
//! need to agree on: block counts per group, how many inode/group-descriptor entries fit
//! in a block, and so on. `format` derives it from a device's sector count and the parsed
//! [`crate::options::Options`]; `mount` re-derives the same numbers from the on-disk
//! [`crate::superblock::Superblock`] it just read, so the two never drift apart.

use crate::error::{DfsError, Result};
use crate::options::Options;
use crate::superblock::Superblock;

/// Size in bytes of one device sector. Fixed by the on-disk format.
pub const SECTOR_SIZE: u64 = 512;

/// Encoded size in bytes of one [`crate::group::GroupDescriptor`].
pub const GROUP_DESC_SIZE: u32 = 24;

/// Encoded size in bytes of one [`crate::inode::InodeDescriptor`].
pub const INODE_DESC_SIZE: u32 = 84;

/// Default number of buffers in the cache when neither the mount options nor the
/// superblock specify one.
pub const DEFAULT_CACHE_BUFFERS: u32 = 64;

/// Chunk size used when zeroing a freshly formatted device.
pub const FORMAT_BLOCKSIZE: u64 = 128 * 1024;

/// The inode number reserved for the root directory.
pub const DFS_INODE_ROOT: u32 = 0;

/// Geometry derived from either a freshly computed layout (format) or a persisted
/// superblock (mount). None of these fields are written to disk themselves; they are
/// recomputed from the persisted fields every time the filesystem is opened.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
	pub blocksize: u32,
	pub log_block_size: u32,
	pub inodes_per_block: u32,
	pub inode_blocks_per_group: u32,
	pub groupdescs_per_block: u32,
	pub groupdesc_blocks: u32,
	pub log_blkptrs_per_block: u32,
}

impl Geometry {
	fn derive(blocksize: u32, log_block_size: u32, inodes_per_group: u32) -> Result<Self> {
		let inodes_per_block = blocksize / INODE_DESC_SIZE;
		let groupdescs_per_block = blocksize / GROUP_DESC_SIZE;
		if inodes_per_block == 0 || groupdescs_per_block == 0 {
			return Err(DfsError::InvalidArgument(format!(
				"block size {blocksize} is too small to hold a single inode or group descriptor"
			)));
		}
		let inode_blocks_per_group = util::ceil_div(inodes_per_group as u64, inodes_per_block as u64) as u32;
		// log_block_size is at least 9 (blocksize >= SECTOR_SIZE == 512), so this never underflows.
		let log_blkptrs_per_block = log_block_size - 2;
		Ok(Self {
			blocksize,
			log_block_size,
			inodes_per_block,
			inode_blocks_per_group,
			groupdescs_per_block,
			groupdesc_blocks: 0, // patched in by the caller once group_count is known
			log_blkptrs_per_block,
		})
	}
}

/// First block reserved for filesystem metadata, per §3/B2: sector 0 is always a boot
/// sector, sector 1 always holds the superblock; if the block size is larger than one
/// sector the superblock shares its block with the boot sector.
pub fn first_reserved_block(blocksize: u32) -> u32 {
	if blocksize as u64 > SECTOR_SIZE {
		1
	} else {
		2
	}
}

/// Result of computing a brand new layout at format time.
pub struct FormatLayout {
	pub geometry: Geometry,
	pub block_count: u32,
	pub blocks_per_group: u32,
	pub group_count: u32,
	pub inodes_per_group: u32,
	pub first_reserved_block: u32,
	pub groupdesc_table_block: u32,
}

/// Computes a fresh layout for a device with `sector_count` sectors, per §4.3 steps 1-3.
pub fn compute_format_layout(sector_count: u64, opts: &Options) -> Result<FormatLayout> {
	let blocksize = opts.blocksize;
	if blocksize < SECTOR_SIZE as u32 || !blocksize.is_power_of_two() {
		return Err(DfsError::InvalidArgument(format!(
			"blocksize {blocksize} must be a power of two no smaller than {SECTOR_SIZE}"
		)));
	}
	let log_block_size = util::log2(blocksize as u64).unwrap();

	let sectors_per_block = blocksize as u64 / SECTOR_SIZE;
	let block_count = (sector_count / sectors_per_block) as u32;

	let blocks_per_group = blocksize
		.checked_mul(8)
		.ok_or_else(|| DfsError::InvalidArgument("blocksize too large".into()))?;

	let mut group_count = util::ceil_div(block_count as u64, blocks_per_group as u64) as u32;

	let inodes_per_block = blocksize / INODE_DESC_SIZE;
	// A group normally spans blocks_per_group blocks, but a device too small to fill even
	// one group is not fully populated: in that case inode count is sized off the actual
	// block_count instead, or the ratio would reserve inodes for blocks that don't exist.
	let group_blocks = if block_count < blocks_per_group { block_count } else { blocks_per_group };
	let group_bytes = group_blocks as u64 * blocksize as u64;
	let raw_inodes_per_group = (group_bytes / opts.inoderatio.max(1) as u64).max(1) as u32;
	let mut inodes_per_group = util::round_up_to_multiple(raw_inodes_per_group, inodes_per_block);
	// The inode bitmap is a single block: it cannot address more than blocksize*8 inodes.
	inodes_per_group = inodes_per_group.min(blocks_per_group);
	inodes_per_group = util::round_up_to_multiple(inodes_per_group.max(inodes_per_block), inodes_per_block);

	let geometry = Geometry::derive(blocksize, log_block_size, inodes_per_group)?;

	let first_reserved_block = first_reserved_block(blocksize);
	let groupdesc_table_block = first_reserved_block + opts.resvblks;
	let groupdesc_blocks =
		util::ceil_div(group_count.max(1) as u64, geometry.groupdescs_per_block as u64) as u32;

	// Drop the last group if it cannot fit its own two bitmap blocks plus its inode table.
	if group_count > 0 {
		let min_group_blocks = 2 + geometry.inode_blocks_per_group;
		let last_group_start = blocks_per_group as u64 * (group_count as u64 - 1);
		let last_group_blocks = block_count as u64 - last_group_start;
		if last_group_blocks < min_group_blocks as u64 {
			group_count -= 1;
		}
	}
	if group_count == 0 {
		return Err(DfsError::Io("device is too small to hold a filesystem".into()));
	}

	Ok(FormatLayout {
		geometry: Geometry {
			groupdesc_blocks,
			..geometry
		},
		block_count,
		blocks_per_group,
		group_count,
		inodes_per_group,
		first_reserved_block,
		groupdesc_table_block,
	})
}

/// Re-derives the [`Geometry`] for an already-formatted filesystem, per §4.4 step 3.
pub fn derive_mounted_geometry(sb: &Superblock) -> Result<Geometry> {
	let geometry = Geometry::derive(sb.blocksize(), sb.log_block_size, sb.inodes_per_group)?;
	let groupdesc_blocks =
		util::ceil_div(sb.group_count.max(1) as u64, geometry.groupdescs_per_block as u64) as u32;
	Ok(Geometry {
		groupdesc_blocks,
		..geometry
	})
}

/// Number of metadata blocks preceding the data area of group `i`, per §3 "Group layout".
pub fn blocks_before_data(
	group_index: u32,
	groupdesc_table_block: u32,
	groupdesc_blocks: u32,
	inode_blocks_per_group: u32,
) -> u32 {
	let group0_reserved = if group_index == 0 {
		// Everything up to and including the group descriptor table.
		groupdesc_table_block + groupdesc_blocks
	} else {
		0
	};
	group0_reserved + 2 + inode_blocks_per_group
}

/// Fully resolved block numbers for one group's metadata region and data area.
#[derive(Debug, Clone, Copy)]
pub struct GroupLayout {
	pub block_bitmap_block: u32,
	pub inode_bitmap_block: u32,
	pub inode_table_block: u32,
	pub data_start: u32,
	/// Total blocks belonging to this group, including its own metadata.
	pub block_count: u32,
}

/// Resolves the concrete block numbers backing group `group_index`, given the overall
/// device geometry. Group `i`'s region starts at global block `i * blocks_per_group`; the
/// first group additionally carries the boot sector, superblock, admin-reserved blocks and
/// group descriptor table ahead of its own bitmaps.
pub fn group_layout(
	group_index: u32,
	block_count: u32,
	blocks_per_group: u32,
	groupdesc_table_block: u32,
	groupdesc_blocks: u32,
	inode_blocks_per_group: u32,
) -> GroupLayout {
	let group_start = group_index * blocks_per_group;
	let preamble = if group_index == 0 {
		groupdesc_table_block + groupdesc_blocks
	} else {
		group_start
	};
	let block_bitmap_block = preamble;
	let inode_bitmap_block = block_bitmap_block + 1;
	let inode_table_block = inode_bitmap_block + 1;
	let data_start = inode_table_block + inode_blocks_per_group;
	let group_end = (group_start as u64 + blocks_per_group as u64).min(block_count as u64) as u32;
	GroupLayout {
		block_bitmap_block,
		inode_bitmap_block,
		inode_table_block,
		data_start,
		block_count: group_end - group_start,
	}
}

mod util {
	pub fn log2(n: u64) -> Option<u32> {
		if n == 0 || !n.is_power_of_two() {
			None
		} else {
			Some(n.trailing_zeros())
		}
	}

	pub fn ceil_div(n: u64, d: u64) -> u64 {
		(n + d - 1) / d
	}

	pub fn round_up_to_multiple(n: u32, mult: u32) -> u32 {
		if mult == 0 {
			return n;
		}
		ceil_div(n as u64, mult as u64) as u32 * mult
	}
}
