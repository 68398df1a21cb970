//! Parsers for the text `aircrack-ng` prints.
//!
//! Both parsers are pure functions over captured output so they can be
//! exercised against recorded samples without running the tool.
use std::sync::LazyLock;

use regex::Regex;

use crate::bssid::Bssid;

/// Printed when every candidate in the dictionaries was exhausted.
pub const EXHAUSTED_MARKER: &str = "KEY NOT FOUND";
/// Line fragment identifying a network with a usable handshake.
pub const HANDSHAKE_MARKER: &str = "1 handshake";
/// How much of the info output is scanned when no handshake line matches.
pub const HEADER_SCAN_LINES: usize = 120;

static KEY_FOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"KEY FOUND!\s*\[(.*?)\]").expect("valid key regex"));
static ANY_BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("valid bracket regex"));

/// How a recovered key was located in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// `KEY FOUND! [...]`
    Marker,
    /// Any bracketed value. Low confidence: banners and progress lines also
    /// contain brackets.
    Bracket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrackOutput {
    Exhausted,
    Key { password: String, matched: KeyMatch },
    Unrecognized,
}

/// Pick the target BSSID out of info-mode output: lines announcing a handshake
/// win, otherwise the first address in the header region.
pub fn extract_bssid(output: &str) -> Option<Bssid> {
    output
        .lines()
        .filter(|line| line.contains(HANDSHAKE_MARKER))
        .find_map(Bssid::find_first)
        .or_else(|| {
            output
                .lines()
                .take(HEADER_SCAN_LINES)
                .find_map(Bssid::find_first)
        })
}

/// Classify crack-mode output.
pub fn parse_crack_output(output: &str) -> CrackOutput {
    if output.contains(EXHAUSTED_MARKER) {
        return CrackOutput::Exhausted;
    }
    let (caps, matched) = match KEY_FOUND_RE.captures(output) {
        Some(caps) => (caps, KeyMatch::Marker),
        None => match ANY_BRACKET_RE.captures(output) {
            Some(caps) => (caps, KeyMatch::Bracket),
            None => return CrackOutput::Unrecognized,
        },
    };
    let password = caps
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    CrackOutput::Key { password, matched }
}
