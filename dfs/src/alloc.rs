//! Block and inode allocation (§4.6): first-fit within a group, falling back to the next
//! group when the current one is full.

use crate::bitmap;
use crate::device::BlockDevice;
use crate::error::{DfsError, Result};
use crate::fs::Filesystem;
use crate::inode::{self, InodeDescriptor, InodeRef};
use crate::layout;

impl<D: BlockDevice> Filesystem<D> {
	/// Allocates one free block, marking it used in its group's bitmap and decrementing
	/// both the group and superblock free counts. Scanning starts at the group's cached
	/// "first free" hint and wraps within the group before moving on to the next one
	/// (P1/P2/P3).
	pub fn alloc_block(&mut self) -> Result<u32> {
		let group_count = self.groups.group_count();
		for group in 0..group_count {
			let desc = self.groups.get(group)?;
			if desc.free_block_count == 0 {
				if group == 0 {
					log::warn!("alloc_block: preferred group 0 is full, scanning all groups");
				}
				continue;
			}

			let gl = self.group_layout(group);
			let buf = self.cache.get(gl.block_bitmap_block as u64)?;
			let from = self.groups.block_hint(group).unwrap_or(0);
			let found = bitmap::find_first_zero(&buf.bytes(), gl.block_count as usize, from);
			let Some(idx) = found else {
				// The hint lied (or the group just filled up): nothing free here after all.
				continue;
			};
			buf.modify(|bytes| bitmap::set(bytes, idx));

			let free_block_count = desc.free_block_count - 1;
			self.groups.update(group, |d| d.free_block_count = free_block_count)?;
			self.groups.set_block_hint(group, idx + 1);
			self.sb.free_block_count -= 1;
			self.sb_dirty = true;

			let block_no = group * self.sb.blocks_per_group + idx as u32;
			log::debug!(
				"alloc_block: block {block_no} (group {group}, {free_block_count} free remaining in group)"
			);
			return Ok(block_no);
		}
		Err(DfsError::NoSpace)
	}

	/// Releases a previously allocated block (P7, R3).
	pub fn free_block(&mut self, block_no: u32) -> Result<()> {
		if block_no >= self.sb.block_count {
			return Err(DfsError::InvalidArgument(format!("block {block_no} out of range")));
		}
		let group = block_no / self.sb.blocks_per_group;
		let idx = (block_no % self.sb.blocks_per_group) as usize;

		let gl = self.group_layout(group);
		let buf = self.cache.get(gl.block_bitmap_block as u64)?;
		let was_set = bitmap::test(&buf.bytes(), idx);
		if !was_set {
			return Err(DfsError::InvalidArgument(format!("block {block_no} is already free")));
		}
		buf.modify(|bytes| bitmap::clear(bytes, idx));

		let free_block_count = self.groups.get(group)?.free_block_count + 1;
		self.groups.update(group, |d| d.free_block_count = free_block_count)?;
		if self.groups.block_hint(group).map_or(true, |h| idx < h) {
			self.groups.set_block_hint(group, idx);
		}
		self.sb.free_block_count += 1;
		self.sb_dirty = true;
		log::debug!("free_block: block {block_no} (group {group}, {free_block_count} free remaining in group)");
		Ok(())
	}

	/// Allocates a free inode slot, zeroing its descriptor and marking it used.
	pub fn alloc_inode(&mut self) -> Result<InodeRef> {
		let group_count = self.groups.group_count();
		for group in 0..group_count {
			let desc = self.groups.get(group)?;
			if desc.free_inode_count == 0 {
				if group == 0 {
					log::warn!("alloc_inode: preferred group 0 is full, scanning all groups");
				}
				continue;
			}

			let buf = self.cache.get(desc.inode_bitmap_block as u64)?;
			let from = self.groups.inode_hint(group).unwrap_or(0);
			let limit = self.sb.inodes_per_group as usize;
			let found = bitmap::find_first_zero(&buf.bytes(), limit, from);
			let Some(idx) = found else {
				continue;
			};
			buf.modify(|bytes| bitmap::set(bytes, idx));

			let free_inode_count = desc.free_inode_count - 1;
			self.groups.update(group, |d| d.free_inode_count = free_inode_count)?;
			self.groups.set_inode_hint(group, idx + 1);
			self.sb.free_inode_count -= 1;
			self.sb_dirty = true;

			let number = group * self.sb.inodes_per_group + idx as u32;
			let inode_ref = self.get_inode(number)?;
			inode_ref.update(|d| *d = InodeDescriptor::empty())?;
			log::debug!(
				"alloc_inode: inode {number} (group {group}, {free_inode_count} free remaining in group)"
			);
			return Ok(inode_ref);
		}
		Err(DfsError::NoSpace)
	}

	/// Releases inode `number` back to its group's free pool. There is no separate
	/// `release_inode` step the way a refcounted in-memory inode cache would need: dropping
	/// the returned [`InodeRef`] (and, transitively, its buffer handle) already releases the
	/// cache's pin once nothing else references the block.
	pub fn free_inode(&mut self, number: u32) -> Result<()> {
		if number >= self.sb.inode_count {
			return Err(DfsError::InvalidArgument(format!("inode {number} out of range")));
		}
		let group = number / self.sb.inodes_per_group;
		let idx = (number % self.sb.inodes_per_group) as usize;

		let desc = self.groups.get(group)?;
		let buf = self.cache.get(desc.inode_bitmap_block as u64)?;
		let was_set = bitmap::test(&buf.bytes(), idx);
		if !was_set {
			return Err(DfsError::InvalidArgument(format!("inode {number} is already free")));
		}
		buf.modify(|bytes| bitmap::clear(bytes, idx));

		let inode_ref = self.get_inode(number)?;
		inode_ref.update(|d| *d = InodeDescriptor::empty())?;

		let free_inode_count = desc.free_inode_count + 1;
		self.groups.update(group, |d| d.free_inode_count = free_inode_count)?;
		if self.groups.inode_hint(group).map_or(true, |h| idx < h) {
			self.groups.set_inode_hint(group, idx);
		}
		self.sb.free_inode_count += 1;
		self.sb_dirty = true;
		log::debug!("free_inode: inode {number} (group {group}, {free_inode_count} free remaining in group)");
		Ok(())
	}

	/// Resolves a live handle to inode `number`'s on-disk descriptor.
	pub fn get_inode(&mut self, number: u32) -> Result<InodeRef> {
		if number >= self.sb.inode_count {
			return Err(DfsError::InvalidArgument(format!("inode {number} out of range")));
		}
		let group = number / self.sb.inodes_per_group;
		let index_in_group = number % self.sb.inodes_per_group;
		let desc = self.groups.get(group)?;
		let (block_within_table, offset) = inode::offset_within_table(index_in_group, self.geometry.inodes_per_block);
		let block_no = desc.inode_table_block + block_within_table;
		let buf = self.cache.get(block_no as u64)?;
		Ok(InodeRef::new(buf, offset, number))
	}

	fn group_layout(&self, group: u32) -> layout::GroupLayout {
		layout::group_layout(
			group,
			self.sb.block_count,
			self.sb.blocks_per_group,
			self.sb.groupdesc_table_block,
			self.geometry.groupdesc_blocks,
			self.geometry.inode_blocks_per_group,
		)
	}
}
