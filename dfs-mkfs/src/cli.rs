use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser)]
#[command(version, about = "Format and inspect DFS filesystem images")]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,

	#[command(flatten)]
	pub verbose: Verbosity<WarnLevel>,
}

#[derive(Subcommand)]
pub enum Command {
	/// Write a new filesystem onto a device or image file.
	Format {
		/// Path to the device or image file.
		device: PathBuf,

		/// Comma-separated format options (blocksize, cache, inoderatio, resvblks,
		/// resvinodes, quick).
		#[arg(short, long)]
		options: Option<String>,

		/// Don't ask for confirmation before overwriting an existing filesystem.
		#[arg(short, long)]
		yes: bool,
	},
	/// Print filesystem utilisation for an already-formatted device or image file.
	Statfs {
		/// Path to the device or image file.
		device: PathBuf,
	},
}
