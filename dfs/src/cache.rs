//! The buffer cache: a pool of fixed-size block buffers keyed by block number, with
//! dirty tracking and pinned-buffer reference counting (§4.1).
//!
//! There is no separate OS here to supply an implementation of the contract the
//! filesystem consumes, so this module both states the contract (as doc comments on
//! [`BufferPool`]'s methods) and ships the one concrete implementation the crate uses: an
//! LRU-ordered table of reference-counted buffers over a [`BlockDevice`] trait object,
//! in the style of the reference-counted caches found in userspace Rust filesystem
//! implementations (e.g. an inode/dentry LRU cache backed by the `lru` crate).

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use bincode::{Decode, Encode};
use lru::LruCache;

use crate::codec;
use crate::device::BlockDevice;
use crate::error::{DfsError, Result};

struct Buffer {
	block_no: u64,
	data: Vec<u8>,
	dirty: bool,
}

/// A reference to one cached block.
///
/// Cloning a handle is how the spec's "shared reference" works: as long as any clone is
/// alive, [`BufferPool`] will not evict the underlying buffer. Dropping the last clone is
/// the Rust equivalent of `release_buffer`.
#[derive(Clone)]
pub struct BufferHandle(Rc<RefCell<Buffer>>);

impl BufferHandle {
	/// The block number this buffer caches.
	pub fn block_no(&self) -> u64 {
		self.0.borrow().block_no
	}

	/// Borrows the buffer's bytes for reading.
	pub fn bytes(&self) -> Ref<'_, [u8]> {
		Ref::map(self.0.borrow(), |b| b.data.as_slice())
	}

	/// Runs `f` against the buffer's mutable bytes and marks the buffer dirty.
	/// This is the Rust replacement for the separate `mark_buffer_updated` call: dirtying
	/// is tied to the one place the bytes are actually mutated.
	pub fn modify(&self, f: impl FnOnce(&mut [u8])) {
		let mut buf = self.0.borrow_mut();
		f(&mut buf.data);
		buf.dirty = true;
	}

	/// Explicitly marks the buffer dirty without touching its bytes (used when a caller
	/// mutated a decoded copy and is about to `encode_at` it back).
	pub fn mark_dirty(&self) {
		self.0.borrow_mut().dirty = true;
	}

	/// Decodes a typed value starting at byte `offset` within the buffer.
	pub fn decode_at<T: Decode>(&self, offset: usize) -> Result<T> {
		codec::decode(&self.0.borrow().data[offset..])
	}

	/// Encodes `value` at byte `offset` within the buffer and marks it dirty.
	pub fn encode_at<T: Encode>(&self, offset: usize, value: &T) -> Result<()> {
		let mut buf = self.0.borrow_mut();
		codec::encode_into(&mut buf.data[offset..], value)?;
		buf.dirty = true;
		Ok(())
	}
}

/// Pool of fixed-size buffers backed by a [`BlockDevice`].
pub struct BufferPool<D: BlockDevice> {
	device: D,
	blocksize: usize,
	capacity: usize,
	table: LruCache<u64, Rc<RefCell<Buffer>>>,
	/// While set, [`crate::fs::Filesystem::sync`] skips writing the superblock back.
	/// Used during format so allocation and zeroing never race a half-written superblock.
	nosync: bool,
}

impl<D: BlockDevice> BufferPool<D> {
	/// `init_pool`: creates a pool of `capacity` buffers of `blocksize` bytes each, backed
	/// by `device`. Fails with [`DfsError::NoMemory`] if `capacity` is zero.
	pub fn new(device: D, capacity: usize, blocksize: usize) -> Result<Self> {
		if capacity == 0 {
			return Err(DfsError::NoMemory);
		}
		Ok(Self {
			device,
			blocksize,
			capacity,
			table: LruCache::unbounded(),
			nosync: false,
		})
	}

	pub fn blocksize(&self) -> usize {
		self.blocksize
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn set_nosync(&mut self, nosync: bool) {
		self.nosync = nosync;
	}

	pub fn nosync(&self) -> bool {
		self.nosync
	}

	/// Evicts the least-recently-used buffer with no outstanding reference, writing it
	/// back first if dirty. Returns [`DfsError::NoMemory`] if every cached buffer is
	/// currently pinned.
	fn make_room(&mut self) -> Result<()> {
		if self.table.len() < self.capacity {
			return Ok(());
		}
		let attempts = self.table.len();
		for _ in 0..attempts {
			let Some((block_no, victim)) = self.table.pop_lru() else {
				return Ok(());
			};
			if Rc::strong_count(&victim) > 1 {
				// Still referenced by a live BufferHandle: can't evict it. Put it back
				// (this makes it the new MRU entry) and try the next-oldest one.
				self.table.put(block_no, victim);
				continue;
			}
			let dirty = victim.borrow().dirty;
			if dirty {
				self.device.write_at(block_no * self.blocksize as u64, &victim.borrow().data)?;
			}
			return Ok(());
		}
		Err(DfsError::NoMemory)
	}

	/// `alloc_buffer`: returns a handle for `block_no` that need not exist on disk yet.
	/// Its content is zeroed and it is considered dirty. If the block is already cached,
	/// its content is reset to zero (this implementation treats `alloc_buffer` as
	/// "create or reset", see DESIGN.md).
	pub fn alloc(&mut self, block_no: u64) -> Result<BufferHandle> {
		if let Some(existing) = self.table.get(&block_no) {
			let mut buf = existing.borrow_mut();
			buf.data.iter_mut().for_each(|b| *b = 0);
			buf.dirty = true;
			drop(buf);
			return Ok(BufferHandle(existing.clone()));
		}
		self.make_room()?;
		let buf = Rc::new(RefCell::new(Buffer {
			block_no,
			data: vec![0u8; self.blocksize],
			dirty: true,
		}));
		self.table.put(block_no, buf.clone());
		Ok(BufferHandle(buf))
	}

	/// `get_buffer`: returns a handle for `block_no`, reading it from the device on a
	/// cache miss.
	pub fn get(&mut self, block_no: u64) -> Result<BufferHandle> {
		if let Some(existing) = self.table.get(&block_no) {
			return Ok(BufferHandle(existing.clone()));
		}
		self.make_room()?;
		let mut data = vec![0u8; self.blocksize];
		self.device.read_at(block_no * self.blocksize as u64, &mut data)?;
		let buf = Rc::new(RefCell::new(Buffer {
			block_no,
			data,
			dirty: false,
		}));
		self.table.put(block_no, buf.clone());
		Ok(BufferHandle(buf))
	}

	/// `flush_buffers(wait=true)`: writes back every dirty buffer. This implementation has
	/// no background writer, so there is no meaningful "don't wait" variant.
	pub fn flush(&mut self) -> Result<()> {
		let keys: Vec<u64> = self.table.iter().map(|(k, _)| *k).collect();
		for block_no in keys {
			if let Some(buf) = self.table.peek(&block_no) {
				let mut b = buf.borrow_mut();
				if b.dirty {
					self.device.write_at(block_no * self.blocksize as u64, &b.data)?;
					b.dirty = false;
				}
			}
		}
		Ok(())
	}

	/// The single "direct device I/O" path: used only by the superblock manager, which by
	/// design bypasses the cache (§9 design notes).
	pub fn raw_read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
		self.device.read_at(offset, buf)?;
		Ok(())
	}

	/// See [`Self::raw_read_at`].
	pub fn raw_write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
		self.device.write_at(offset, buf)?;
		Ok(())
	}
}

impl<D: BlockDevice> Drop for BufferPool<D> {
	/// `free_buffer_pool`: best-effort flush of any remaining dirty buffers. Callers that
	/// care about propagating a flush error should call [`Self::flush`] explicitly before
	/// dropping the pool (this is what [`crate::fs::Filesystem::unmount`] does).
	fn drop(&mut self) {
		if let Err(e) = self.flush() {
			log::error!("buffer pool: error flushing on drop: {e}");
		}
	}
}
