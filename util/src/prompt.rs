//! A minimal interactive yes/no confirmation prompt, for command-line tools that need to
//! ask before an irreversible action.

use std::io::{self, BufRead, Write};

/// Shows `prompt` and reads a line of input from stdin, returning it with the trailing
/// newline stripped. Returns `None` on EOF.
pub fn prompt(prompt: Option<&str>, default_hint: &str) -> Option<String> {
	let text = prompt.unwrap_or("");
	print!("{text}{default_hint}");
	let _ = io::stdout().flush();

	let input = io::stdin().lock().lines().next()?.unwrap_or_default();
	Some(input)
}

/// Asks a yes/no question, defaulting to "no" on an empty or unparseable answer.
///
/// This reads from stdin unconditionally; callers that may run with redirected or closed
/// stdin (scripts, CI) should check `std::io::stdin().is_terminal()` first and skip calling
/// this at all rather than let it block on, or read EOF from, a non-interactive input.
pub fn confirm(question: &str) -> bool {
	prompt(Some(question), " (y/N) ")
		.map(|s| s.trim().eq_ignore_ascii_case("y"))
		.unwrap_or(false)
}
