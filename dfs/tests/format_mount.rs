//! End-to-end coverage of the testable properties in the crate's own design notes: a
//! freshly formatted image mounts cleanly, reports sane utilisation, and round-trips
//! allocation/free/statfs across an unmount+remount cycle (P1-P3, P7, R1-R3, S1-S6).

use dfs::{FileBlockDevice, Filesystem, MemDevice};
use tempfile::NamedTempFile;

fn make_image(mb: u64) -> NamedTempFile {
	let file = NamedTempFile::new().expect("create temp file");
	file.as_file()
		.set_len(mb * 1024 * 1024)
		.expect("extend temp file");
	file
}

#[test]
fn format_then_mount_round_trips_through_a_real_file() {
	let image = make_image(8);

	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	Filesystem::format(dev, "blocksize=1024,resvblks=2,resvinodes=8").unwrap();

	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	let fs = Filesystem::mount(dev, "").unwrap();
	let stat = fs.statfs();
	assert_eq!(stat.bsize, 1024);
	assert!(stat.blocks > 0);
	assert!(stat.bfree < stat.blocks, "metadata should occupy at least one block");
	assert!(stat.ffree < stat.files, "reserved inodes should be accounted for");
	fs.unmount().unwrap();
}

#[test]
fn alloc_block_and_inode_decrement_free_counts_and_free_restores_them() {
	let image = make_image(8);
	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	Filesystem::format(dev, "blocksize=1024,quick,resvblks=2,resvinodes=8").unwrap();

	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	let mut fs = Filesystem::mount(dev, "").unwrap();
	let before = fs.statfs();

	let block = fs.alloc_block().unwrap();
	let inode = fs.alloc_inode().unwrap();
	let inode_no = inode.number();

	let mid = fs.statfs();
	assert_eq!(mid.bfree, before.bfree - 1);
	assert_eq!(mid.ffree, before.ffree - 1);

	fs.free_block(block).unwrap();
	fs.free_inode(inode_no).unwrap();

	let after = fs.statfs();
	assert_eq!(after.bfree, before.bfree);
	assert_eq!(after.ffree, before.ffree);

	fs.unmount().unwrap();
}

#[test]
fn allocations_do_not_collide() {
	let image = make_image(8);
	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	Filesystem::format(dev, "blocksize=1024,quick,resvblks=2,resvinodes=8").unwrap();

	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	let mut fs = Filesystem::mount(dev, "").unwrap();

	let mut seen = std::collections::HashSet::new();
	for _ in 0..32 {
		let b = fs.alloc_block().unwrap();
		assert!(seen.insert(b), "block {b} allocated twice");
	}
	fs.unmount().unwrap();
}

#[test]
fn exhausting_blocks_returns_no_space() {
	let image = make_image(1); // tiny device, blocksize below default to force a small group
	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	Filesystem::format(dev, "blocksize=512,quick,resvblks=1,resvinodes=4").unwrap();

	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	let mut fs = Filesystem::mount(dev, "").unwrap();
	let mut count = 0;
	loop {
		match fs.alloc_block() {
			Ok(_) => count += 1,
			Err(dfs::DfsError::NoSpace) => break,
			Err(e) => panic!("unexpected error: {e}"),
		}
		if count > 1_000_000 {
			panic!("alloc_block never ran out of space");
		}
	}
	assert!(count > 0);
	fs.unmount().unwrap();
}

#[test]
fn mounting_a_blank_image_fails_with_a_signature_error() {
	let image = make_image(1);
	// Never formatted: should fail superblock validation rather than panic.
	let dev = FileBlockDevice::open(image.path(), true).unwrap();
	assert!(Filesystem::mount(dev, "").is_err());
}

#[test]
fn mem_device_round_trip_bytes() {
	use dfs::BlockDevice;

	let mut dev = MemDevice::new(4);
	let payload = [0xAAu8; 512];
	dev.write_at(512, &payload).unwrap();
	let mut out = [0u8; 512];
	dev.read_at(512, &mut out).unwrap();
	assert_eq!(out, payload);
}
