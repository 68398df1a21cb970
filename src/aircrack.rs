//! The external cracking engine.
//!
//! [`CrackEngine`] is the seam the session talks to; [`Aircrack`] drives the
//! real `aircrack-ng` binary. Invocations block until the tool exits and impose
//! no timeout: dictionary size decides how long a crack takes.
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::debug;
use regex::Regex;

use crate::bssid::Bssid;
use crate::capture::cracked_key_path;
use crate::wordlist::join_wordlists;

pub const DEFAULT_BINARY: &str = "aircrack-ng";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)aircrack-ng\s+(\d[\w.\-]*)").expect("valid version regex"));

pub trait CrackEngine {
    /// Read-only inspection of a capture; returns combined output text.
    fn run_info(&self, capture: &Path) -> Result<String>;

    /// Dictionary attack on `target` using `wordlists`; returns combined
    /// output text.
    fn run_crack(&self, capture: &Path, target: &Bssid, wordlists: &[PathBuf]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct Aircrack {
    binary: PathBuf,
}

impl Default for Aircrack {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl Aircrack {
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Argument vector for a crack run.
    pub fn crack_args(capture: &Path, target: &Bssid, wordlists: &[PathBuf]) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-w".to_string(),
            join_wordlists(wordlists),
            "-l".to_string(),
            cracked_key_path(capture).to_string_lossy().into_owned(),
            "-b".to_string(),
            target.to_string(),
            capture.to_string_lossy().into_owned(),
        ]
    }

    /// Version banner of the installed binary, if it can be run at all. Only
    /// used for the startup report.
    pub fn detect(&self) -> Option<String> {
        let output = Command::new(&self.binary)
            .arg("--help")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        let text = combined_output(&output);
        VERSION_RE
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| Some("unknown version".to_string()))
    }

    fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).stdin(Stdio::null());
        debug!("running {:?}", cmd);
        let output = cmd
            .output()
            .with_context(|| format!("failed to run {}", self.binary.display()))?;
        if !output.status.success() {
            debug!("{} exited with {}", self.binary.display(), output.status);
        }
        Ok(combined_output(&output))
    }
}

impl CrackEngine for Aircrack {
    fn run_info(&self, capture: &Path) -> Result<String> {
        self.run([capture.as_os_str()])
    }

    fn run_crack(&self, capture: &Path, target: &Bssid, wordlists: &[PathBuf]) -> Result<String> {
        self.run(Self::crack_args(capture, target, wordlists))
    }
}

/// stdout followed by stderr, lossily decoded.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let err = String::from_utf8_lossy(&output.stderr);
    if !err.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&err);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crack_arguments_follow_cli_contract() {
        let target: Bssid = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        let args = Aircrack::crack_args(
            Path::new("/hs/Home_aabbccddeeff_1.pcap"),
            &target,
            &[PathBuf::from("/w/a.txt"), PathBuf::from("/w/b.txt")],
        );
        assert_eq!(
            args,
            vec![
                "-q",
                "-w",
                "/w/a.txt,/w/b.txt",
                "-l",
                "/hs/Home_aabbccddeeff_1.pcap.cracked",
                "-b",
                "AA:BB:CC:DD:EE:FF",
                "/hs/Home_aabbccddeeff_1.pcap",
            ]
        );
    }

    #[test]
    fn missing_binary_is_an_invocation_error() {
        let engine = Aircrack::new("/nonexistent/aircrack-ng");
        assert!(engine.run_info(Path::new("x.pcap")).is_err());
        assert!(engine.detect().is_none());
    }

    #[test]
    fn version_banner_is_extracted() {
        let caps = VERSION_RE
            .captures("\n  Aircrack-ng 1.7  - (C) 2006-2022 Thomas d'Otreppe\n")
            .unwrap();
        assert_eq!(&caps[1], "1.7");
    }
}
