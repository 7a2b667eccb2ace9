//! Command-line front-end for formatting and inspecting DFS filesystem images.

mod cli;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::Parser;
use dfs::{BlockDevice, FileBlockDevice, Filesystem, Superblock, SUPERBLOCK_OFFSET};
use util::ByteSize;

use cli::{Cli, Command};

fn main() {
	let cli = Cli::parse();

	env_logger::builder()
		.filter_level(cli.verbose.log_level_filter())
		.init();

	let result = match cli.command {
		Command::Format { device, options, yes } => cmd_format(&device, options.as_deref(), yes),
		Command::Statfs { device } => cmd_statfs(&device),
	};

	if let Err(e) = result {
		eprintln!("dfs-mkfs: {e:#}");
		exit(1);
	}
}

/// Detects an existing DFS superblock on `device` by reading its fixed offset directly;
/// a corrupt or absent signature is not an error here, just "no filesystem present".
fn existing_filesystem(device: &PathBuf) -> Result<bool> {
	let mut dev = FileBlockDevice::open(device, false).with_context(|| format!("{}", device.display()))?;
	let mut sector = [0u8; dfs::SECTOR_SIZE as usize];
	if dev.read_at(SUPERBLOCK_OFFSET, &mut sector).is_err() {
		return Ok(false);
	}
	Ok(Superblock::decode_sector(&sector).map(|sb| sb.check().is_ok()).unwrap_or(false))
}

fn cmd_format(device: &PathBuf, options: Option<&str>, yes: bool) -> Result<()> {
	if existing_filesystem(device)? && !yes {
		println!("{} already contains a filesystem.", device.display());
		if std::io::stdin().is_terminal() {
			if !util::prompt::confirm("Proceed and overwrite it?") {
				eprintln!("Abort.");
				exit(1);
			}
		} else {
			log::info!("stdin is not a tty, proceeding without confirmation");
		}
	}

	let dev = FileBlockDevice::open(device, true).with_context(|| format!("{}", device.display()))?;
	Filesystem::format(dev, options.unwrap_or("")).context("failed to format filesystem")?;

	let dev = FileBlockDevice::open(device, false).with_context(|| format!("{}", device.display()))?;
	let fs = Filesystem::mount(dev, "").context("format succeeded but the result failed to mount")?;
	let stat = fs.statfs();
	println!(
		"created filesystem: {} blocks ({} bsize), {} free, {} inodes, {} free",
		stat.blocks,
		ByteSize(stat.bsize as u64),
		stat.bfree,
		stat.files,
		stat.ffree
	);
	fs.unmount().context("failed to unmount after format")?;
	Ok(())
}

fn cmd_statfs(device: &PathBuf) -> Result<()> {
	let dev = FileBlockDevice::open(device, false).with_context(|| format!("{}", device.display()))?;
	let fs = Filesystem::mount(dev, "").context("failed to mount filesystem")?;
	let stat = fs.statfs();
	println!("block size:        {}", ByteSize(stat.bsize as u64));
	println!("blocks:            {} ({} free)", stat.blocks, stat.bfree);
	println!("inodes:            {} ({} free)", stat.files, stat.ffree);
	println!("cache buffers:     {}", stat.cachesize);
	fs.unmount().context("failed to unmount after statfs")?;
	Ok(())
}
