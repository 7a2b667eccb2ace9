//! The filesystem facade: `format`, `mount`, `unmount`, `statfs` and `sync` (§4.3-§4.7).
//!
//! This struct is the crate's single entry point. It owns the buffer cache, the in-memory
//! superblock, and the group descriptor shadow, and every operation that touches on-disk
//! state goes through `&mut self` here — Rust's borrow checker is what enforces the
//! single-writer-per-mount rule a C implementation would enforce with a mutex (§5).

pub use crate::layout::{DEFAULT_CACHE_BUFFERS, DFS_INODE_ROOT, FORMAT_BLOCKSIZE};
pub use crate::superblock::SUPERBLOCK_OFFSET;

use crate::bitmap;
use crate::cache::BufferPool;
use crate::device::BlockDevice;
use crate::error::Result;
use crate::group::GroupTable;
use crate::inode::INODE_FLAG_DIRECTORY;
use crate::layout::{self, Geometry, SECTOR_SIZE};
use crate::options;
use crate::superblock::Superblock;

/// Snapshot of filesystem utilisation returned by [`Filesystem::statfs`] (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct Statfs {
	/// Block size in bytes.
	pub bsize: u32,
	/// Preferred I/O size in bytes; equal to `bsize` for this implementation.
	pub iosize: u32,
	/// Total blocks on the device.
	pub blocks: u64,
	/// Free blocks.
	pub bfree: u64,
	/// Total inodes.
	pub files: u64,
	/// Free inodes.
	pub ffree: u64,
	/// Number of buffers the cache was opened with.
	pub cachesize: u32,
}

/// A mounted filesystem.
pub struct Filesystem<D: BlockDevice> {
	pub(crate) cache: BufferPool<D>,
	pub(crate) sb: Superblock,
	pub(crate) sb_dirty: bool,
	pub(crate) geometry: Geometry,
	pub(crate) groups: GroupTable,
}

impl<D: BlockDevice> Filesystem<D> {
	/// Writes a brand new filesystem onto `device`, per §4.3.
	///
	/// Consumes `device`: the cache and every pinned buffer are dropped (and, as a
	/// consequence, flushed) before this function returns, so the caller gets a plain
	/// `Result<()>` rather than a mounted [`Filesystem`]. Call [`Self::mount`] afterwards
	/// to start using it.
	pub fn format(device: D, option_str: &str) -> Result<()> {
		let opts = options::parse(option_str)?;
		let mut device = device;
		let sector_count = device.sector_count()?;
		let layout = layout::compute_format_layout(sector_count, &opts)?;
		let blocksize = layout.geometry.blocksize;

		let cache_buffers = (if opts.cache != 0 { opts.cache } else { DEFAULT_CACHE_BUFFERS }).min(layout.block_count);

		if !opts.quick {
			let start_block = layout.groupdesc_table_block + layout.geometry.groupdesc_blocks;
			zero_device(&mut device, start_block, layout.block_count, blocksize as u64)?;
		}

		let mut cache = BufferPool::new(device, cache_buffers as usize, blocksize as usize)?;
		cache.set_nosync(true);

		let mut groupdesc_buffers = Vec::with_capacity(layout.geometry.groupdesc_blocks as usize);
		for i in 0..layout.geometry.groupdesc_blocks {
			groupdesc_buffers.push(cache.alloc((layout.groupdesc_table_block + i) as u64)?);
		}
		let mut groups = GroupTable::new(groupdesc_buffers, layout.geometry.groupdescs_per_block, layout.group_count);

		let mut total_free_blocks: u32 = 0;
		let mut total_free_inodes: u32 = 0;

		for group_index in 0..layout.group_count {
			let gl = layout::group_layout(
				group_index,
				layout.block_count,
				layout.blocks_per_group,
				layout.groupdesc_table_block,
				layout.geometry.groupdesc_blocks,
				layout.geometry.inode_blocks_per_group,
			);
			let reserved_in_group = layout::blocks_before_data(
				group_index,
				layout.groupdesc_table_block,
				layout.geometry.groupdesc_blocks,
				layout.geometry.inode_blocks_per_group,
			);

			let block_bitmap = cache.alloc(gl.block_bitmap_block as u64)?;
			block_bitmap.modify(|bytes| bitmap::set_run(bytes, reserved_in_group as usize));

			let reserved_inodes_here = if group_index == 0 { opts.resvinodes } else { 0 };
			let inode_bitmap = cache.alloc(gl.inode_bitmap_block as u64)?;
			if reserved_inodes_here > 0 {
				inode_bitmap.modify(|bytes| bitmap::set_run(bytes, reserved_inodes_here as usize));
			}

			for i in 0..layout.geometry.inode_blocks_per_group {
				cache.alloc((gl.inode_table_block + i) as u64)?;
			}

			if group_index == 0 {
				let buf = cache.get(gl.inode_table_block as u64)?;
				let now = current_unix_time();
				let mut root = crate::inode::InodeDescriptor::empty();
				root.flags = INODE_FLAG_DIRECTORY;
				root.link_count = 1;
				root.ctime = now;
				root.mtime = now;
				buf.encode_at(DFS_INODE_ROOT as usize * crate::layout::INODE_DESC_SIZE as usize, &root)?;
			}

			let free_blocks_here = gl.block_count.saturating_sub(reserved_in_group);
			let free_inodes_here = layout.inodes_per_group.saturating_sub(reserved_inodes_here);

			groups.update(group_index, |d| {
				d.block_bitmap_block = gl.block_bitmap_block;
				d.inode_bitmap_block = gl.inode_bitmap_block;
				d.inode_table_block = gl.inode_table_block;
				d.block_count = gl.block_count;
				d.free_block_count = free_blocks_here;
				d.free_inode_count = free_inodes_here;
			})?;

			total_free_blocks += free_blocks_here;
			total_free_inodes += free_inodes_here;

			log::info!(
				"format: initialised group {group_index}/{} ({} blocks, {} free)",
				layout.group_count - 1,
				gl.block_count,
				free_blocks_here
			);
		}

		let sb = Superblock {
			signature: crate::superblock::SIGNATURE,
			version: crate::superblock::VERSION,
			log_block_size: layout.geometry.log_block_size,
			block_count: layout.block_count,
			blocks_per_group: layout.blocks_per_group,
			group_count: layout.group_count,
			inodes_per_group: layout.inodes_per_group,
			inode_count: layout.inodes_per_group * layout.group_count,
			cache_buffers,
			first_reserved_block: layout.first_reserved_block,
			reserved_blocks: opts.resvblks,
			groupdesc_table_block: layout.groupdesc_table_block,
			reserved_inodes: opts.resvinodes,
			free_block_count: total_free_blocks,
			free_inode_count: total_free_inodes,
		};

		cache.set_nosync(false);
		cache.flush()?;
		cache.raw_write_at(SUPERBLOCK_OFFSET, &sb.encode_sector()?)?;
		log::info!(
			"format: complete, {} blocks, {} groups, {} free blocks, {} free inodes",
			sb.block_count, sb.group_count, sb.free_block_count, sb.free_inode_count
		);
		Ok(())
	}

	/// Opens an already-formatted filesystem image, per §4.4.
	pub fn mount(device: D, option_str: &str) -> Result<Self> {
		let opts = options::parse(option_str)?;
		let mut device = device;
		let mut sector_buf = [0u8; SECTOR_SIZE as usize];
		device.read_at(SUPERBLOCK_OFFSET, &mut sector_buf)?;
		let sb = Superblock::decode_sector(&sector_buf)?;
		sb.check()?;

		let geometry = layout::derive_mounted_geometry(&sb)?;

		let cache_buffers = (if opts.cache != 0 {
			opts.cache
		} else if sb.cache_buffers != 0 {
			sb.cache_buffers
		} else {
			DEFAULT_CACHE_BUFFERS
		})
		.min(sb.block_count);
		let mut cache = BufferPool::new(device, cache_buffers as usize, geometry.blocksize as usize)?;

		let mut groupdesc_buffers = Vec::with_capacity(geometry.groupdesc_blocks as usize);
		for i in 0..geometry.groupdesc_blocks {
			groupdesc_buffers.push(cache.get((sb.groupdesc_table_block + i) as u64)?);
		}
		let groups = GroupTable::new(groupdesc_buffers, geometry.groupdescs_per_block, sb.group_count);

		log::info!(
			"mount: {} blocks, {} groups, {} free blocks, {} free inodes",
			sb.block_count, sb.group_count, sb.free_block_count, sb.free_inode_count
		);

		Ok(Self {
			cache,
			sb,
			sb_dirty: false,
			geometry,
			groups,
		})
	}

	/// Flushes all dirty state and consumes `self`, per §4.5. Pinned buffers and the cache
	/// itself are released by ordinary drop order once this returns.
	pub fn unmount(mut self) -> Result<()> {
		self.sync()?;
		log::info!("unmount: clean");
		Ok(())
	}

	/// Reports current utilisation. Has no side effects (§4.7).
	pub fn statfs(&self) -> Statfs {
		Statfs {
			bsize: self.geometry.blocksize,
			iosize: self.geometry.blocksize,
			blocks: self.sb.block_count as u64,
			bfree: self.sb.free_block_count as u64,
			files: self.sb.inode_count as u64,
			ffree: self.sb.free_inode_count as u64,
			cachesize: self.cache.capacity() as u32,
		}
	}

	/// Flushes the buffer cache, and the superblock if it is dirty and the cache is not in
	/// its `nosync` (mid-format) state.
	pub fn sync(&mut self) -> Result<()> {
		self.cache.flush()?;
		if self.sb_dirty && !self.cache.nosync() {
			self.cache.raw_write_at(SUPERBLOCK_OFFSET, &self.sb.encode_sector()?)?;
			self.sb_dirty = false;
		}
		Ok(())
	}
}

/// Seconds since the Unix epoch, truncated to 32 bits (matches the on-disk `ctime`/`mtime`
/// field width). Falls back to 0 on a clock that reports a time before the epoch.
fn current_unix_time() -> u32 {
	use std::time::{SystemTime, UNIX_EPOCH};
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs() as u32)
		.unwrap_or(0)
}

/// Zeroes blocks `start_block..block_count` in `FORMAT_BLOCKSIZE`-sized chunks, reporting
/// progress via logging rather than the stdout progress bars a CLI-only implementation
/// would use (§4.3 step 6). Blocks before `start_block` hold the boot sector, superblock,
/// admin-reserved blocks and group descriptor table, which format initialises explicitly
/// and so does not need zeroed first.
fn zero_device<D: BlockDevice>(device: &mut D, start_block: u32, block_count: u32, blocksize: u64) -> Result<()> {
	let start_byte = start_block as u64 * blocksize;
	let total_bytes = block_count as u64 * blocksize;
	if start_byte >= total_bytes {
		return Ok(());
	}
	let chunk = vec![0u8; FORMAT_BLOCKSIZE as usize];
	let mut offset = start_byte;
	let mut last_logged_pct = u64::MAX;
	let span = total_bytes - start_byte;
	while offset < total_bytes {
		let remaining = total_bytes - offset;
		let n = remaining.min(chunk.len() as u64) as usize;
		device.write_at(offset, &chunk[..n])?;
		offset += n as u64;
		let pct = (offset - start_byte) * 100 / span.max(1);
		if pct != last_logged_pct && pct % 10 == 0 {
			log::info!("format: zeroing device... {pct}%");
			last_logged_pct = pct;
		}
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::device::MemDevice;

	#[test]
	fn format_accepts_a_small_device() {
		let device = MemDevice::new(16 * 1024); // 8 MiB
		Filesystem::format(device, "blocksize=1024,quick,resvblks=2,resvinodes=4").unwrap();
	}

	#[test]
	fn format_rejects_a_too_small_device() {
		let device = MemDevice::new(4);
		assert!(Filesystem::format(device, "blocksize=1024").is_err());
	}
}
