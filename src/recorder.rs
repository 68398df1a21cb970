//! Append-only log of recovered credentials.
//!
//! Each line is `<local timestamp>  <network> | <password>`. An entry that is
//! already present is never written again, whatever its timestamp.
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ENTRY_SEPARATOR: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Written,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct ResultRecorder {
    path: PathBuf,
}

/// Canonical `<network> | <password>` entry.
pub fn entry_line(network_name: &str, password: &str) -> String {
    format!("{} | {}", network_name, password)
}

impl ResultRecorder {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, network_name: &str, password: &str) -> Result<Appended> {
        let entry = entry_line(network_name, password);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        if self.contains(&entry)? {
            return Ok(Appended::Duplicate);
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        let ts = Local::now().format(TIMESTAMP_FORMAT);
        writeln!(f, "{}{}{}", ts, ENTRY_SEPARATOR, entry)
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(Appended::Written)
    }

    /// Whether `entry` already appears as a logged entry.
    pub fn contains(&self, entry: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let bytes = fs::read(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        let contents = String::from_utf8_lossy(&bytes);
        Ok(contents.lines().any(|line| {
            let line = line.trim_end_matches('\r');
            let logged = line
                .split_once(ENTRY_SEPARATOR)
                .map(|(_, rest)| rest)
                .unwrap_or(line);
            logged == entry || line == entry
        }))
    }
}
