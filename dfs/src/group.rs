//! The group descriptor table and its in-memory shadow state (§4.4 step 6, §4.6).
//!
//! Each group descriptor records where a group's block bitmap, inode bitmap and inode
//! table live, its size, and its free counts. The descriptors themselves are ordinary
//! cached blocks; what this module adds on top is the per-group "first free" scan hint
//! that the spec keeps purely in memory (it is never persisted, and is always reset to
//! "unknown" on mount).

use bincode::{Decode, Encode};

use crate::cache::BufferHandle;
use crate::error::Result;
use crate::layout::GROUP_DESC_SIZE;

/// One group's on-disk descriptor, encoded at `GROUP_DESC_SIZE` bytes.
#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct GroupDescriptor {
	/// Block number of this group's block bitmap.
	pub block_bitmap_block: u32,
	/// Block number of this group's inode bitmap.
	pub inode_bitmap_block: u32,
	/// Block number of the first block of this group's inode table.
	pub inode_table_block: u32,
	/// Total number of blocks belonging to this group (including its own metadata).
	pub block_count: u32,
	/// Number of currently free blocks in this group.
	pub free_block_count: u32,
	/// Number of currently free inodes in this group.
	pub free_inode_count: u32,
}

/// Hint used to resume an allocation scan without re-reading a bitmap from the start.
/// `-1` means "unknown", which is what every hint is reset to on mount, since the hint
/// itself is never persisted.
const HINT_UNKNOWN: i64 = -1;

/// The live, in-memory view of the group descriptor table: the pinned buffers backing
/// the descriptor blocks, plus the scan hints that never touch disk.
pub struct GroupTable {
	/// One pinned buffer per block of the descriptor table, in block order.
	buffers: Vec<BufferHandle>,
	descs_per_block: u32,
	first_free_block: Vec<i64>,
	first_free_inode: Vec<i64>,
}

impl GroupTable {
	/// Wraps already-pinned descriptor-table buffers. `group_count` is the number of
	/// descriptors actually in use; `descs_per_block` is the geometry constant.
	pub fn new(buffers: Vec<BufferHandle>, descs_per_block: u32, group_count: u32) -> Self {
		Self {
			buffers,
			descs_per_block,
			first_free_block: vec![HINT_UNKNOWN; group_count as usize],
			first_free_inode: vec![HINT_UNKNOWN; group_count as usize],
		}
	}

	fn locate(&self, group: u32) -> (usize, usize) {
		let block_index = (group / self.descs_per_block) as usize;
		let offset = (group % self.descs_per_block) as usize * GROUP_DESC_SIZE as usize;
		(block_index, offset)
	}

	/// Reads the descriptor for `group`.
	pub fn get(&self, group: u32) -> Result<GroupDescriptor> {
		let (block_index, offset) = self.locate(group);
		self.buffers[block_index].decode_at(offset)
	}

	/// Reads, mutates and writes back the descriptor for `group`.
	pub fn update(&self, group: u32, f: impl FnOnce(&mut GroupDescriptor)) -> Result<()> {
		let (block_index, offset) = self.locate(group);
		let mut desc: GroupDescriptor = self.buffers[block_index].decode_at(offset)?;
		f(&mut desc);
		self.buffers[block_index].encode_at(offset, &desc)
	}

	/// The cached "first maybe-free block" index for `group`, or `None` if unknown.
	pub fn block_hint(&self, group: u32) -> Option<usize> {
		let h = self.first_free_block[group as usize];
		(h >= 0).then_some(h as usize)
	}

	/// Records a new block scan hint for `group`.
	pub fn set_block_hint(&mut self, group: u32, idx: usize) {
		self.first_free_block[group as usize] = idx as i64;
	}

	/// Invalidates the block scan hint for `group` (e.g. after the group fills up).
	pub fn clear_block_hint(&mut self, group: u32) {
		self.first_free_block[group as usize] = HINT_UNKNOWN;
	}

	/// The cached "first maybe-free inode" index for `group`, or `None` if unknown.
	pub fn inode_hint(&self, group: u32) -> Option<usize> {
		let h = self.first_free_inode[group as usize];
		(h >= 0).then_some(h as usize)
	}

	/// Records a new inode scan hint for `group`.
	pub fn set_inode_hint(&mut self, group: u32, idx: usize) {
		self.first_free_inode[group as usize] = idx as i64;
	}

	/// Invalidates the inode scan hint for `group`.
	pub fn clear_inode_hint(&mut self, group: u32) {
		self.first_free_inode[group as usize] = HINT_UNKNOWN;
	}

	/// Number of groups this table describes.
	pub fn group_count(&self) -> u32 {
		self.first_free_block.len() as u32
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::cache::BufferPool;
	use crate::device::MemDevice;

	fn make_table(blocksize: usize, descs_per_block: u32, group_count: u32) -> (BufferPool<MemDevice>, GroupTable) {
		let dev = MemDevice::new(4096);
		let mut pool = BufferPool::new(dev, 8, blocksize).unwrap();
		let buf = pool.alloc(10).unwrap();
		let table = GroupTable::new(vec![buf], descs_per_block, group_count);
		(pool, table)
	}

	#[test]
	fn get_set_round_trips() {
		let (_pool, table) = make_table(1024, 42, 2);
		table
			.update(1, |d| {
				d.block_count = 100;
				d.free_block_count = 99;
			})
			.unwrap();
		let d = table.get(1).unwrap();
		assert_eq!(d.block_count, 100);
		assert_eq!(d.free_block_count, 99);
		// Untouched neighbor stays zeroed.
		let d0 = table.get(0).unwrap();
		assert_eq!(d0.block_count, 0);
	}

	#[test]
	fn hints_start_unknown_and_round_trip() {
		let (_pool, mut table) = make_table(1024, 42, 2);
		assert_eq!(table.block_hint(0), None);
		table.set_block_hint(0, 7);
		assert_eq!(table.block_hint(0), Some(7));
		table.clear_block_hint(0);
		assert_eq!(table.block_hint(0), None);
	}
}
