//! A block-structured, group-organised on-disk filesystem core with a write-back buffer
//! cache.
//!
//! [`Filesystem::format`] lays out a fresh image on a [`BlockDevice`]; [`Filesystem::mount`]
//! opens one for use; the allocator methods (`alloc_block`, `alloc_inode`, ...) and
//! [`Filesystem::statfs`] operate on a mounted instance. See each module for the details of
//! the on-disk layout and the in-memory structures that mirror it.

mod alloc;
mod bitmap;
mod cache;
mod codec;
mod device;
mod error;
mod fs;
mod group;
mod inode;
mod layout;
mod options;
mod superblock;

pub use cache::BufferHandle;
pub use device::{BlockDevice, FileBlockDevice, MemDevice};
pub use error::{DfsError, Result};
pub use fs::{Filesystem, Statfs, DEFAULT_CACHE_BUFFERS, DFS_INODE_ROOT, FORMAT_BLOCKSIZE, SUPERBLOCK_OFFSET};
pub use group::GroupDescriptor;
pub use inode::{InodeDescriptor, InodeRef, INODE_FLAG_DIRECTORY};
pub use layout::SECTOR_SIZE;
pub use options::Options;
pub use superblock::Superblock;
