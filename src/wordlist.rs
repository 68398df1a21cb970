use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

/// Extension of dictionary files picked up from the wordlist folder.
pub const WORDLIST_EXTENSION: &str = "txt";

/// List `*.txt` files directly inside `dir`, sorted by path. A missing or
/// unreadable directory yields an empty list.
pub fn resolve<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
	let dir = dir.as_ref();
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) => {
			debug!("cannot read wordlist folder {}: {}", dir.display(), e);
			return Vec::new();
		}
	};
	let mut files: Vec<PathBuf> = entries
		.flatten()
		.map(|entry| entry.path())
		.filter(|p| p.is_file())
		.filter(|p| p.extension().is_some_and(|ext| ext == WORDLIST_EXTENSION))
		.collect();
	files.sort();
	files
}

/// Comma-joined wordlist argument for the cracking engine.
pub fn join_wordlists(paths: &[PathBuf]) -> String {
	paths
		.iter()
		.map(|p| p.to_string_lossy())
		.collect::<Vec<_>>()
		.join(",")
}

/// Startup report of what the folder currently holds.
pub fn log_inventory<P: AsRef<Path>>(dir: P) -> usize {
	let dir = dir.as_ref();
	let found = resolve(dir).len();
	info!("wordlist folder: {}", dir.display());
	info!("wordlists found: {}", found);
	if found == 0 {
		warn!("no .{} wordlists found in {}", WORDLIST_EXTENSION, dir.display());
	}
	found
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn lists_only_txt_files_sorted() {
		let dir = tempdir().unwrap();
		for name in ["rockyou.txt", "alpha.txt", "notes.md", "zzz.TXT.bak"] {
			fs::write(dir.path().join(name), "x\n").unwrap();
		}
		fs::create_dir(dir.path().join("nested.txt")).unwrap();
		let found = resolve(dir.path());
		let names: Vec<_> = found
			.iter()
			.map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
			.collect();
		assert_eq!(names, vec!["alpha.txt", "rockyou.txt"]);
	}

	#[test]
	fn empty_or_missing_dir_is_not_an_error() {
		let dir = tempdir().unwrap();
		assert!(resolve(dir.path()).is_empty());
		assert!(resolve(dir.path().join("missing")).is_empty());
		assert_eq!(log_inventory(dir.path()), 0);
	}

	#[test]
	fn joins_with_commas() {
		let paths = vec![PathBuf::from("/w/a.txt"), PathBuf::from("/w/b.txt")];
		assert_eq!(join_wordlists(&paths), "/w/a.txt,/w/b.txt");
		assert_eq!(join_wordlists(&[]), "");
	}
}
