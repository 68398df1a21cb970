//! Hardware address of an access point, used as the attempts ledger key.
//!
//! A [`Bssid`] always renders in canonical form: six uppercase hex octets
//! separated by colons. Parsing is lenient about case, surrounding whitespace
//! and `-` separators so that every spelling of the same address collides.
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

static MAC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9a-f]{2}(?::[0-9a-f]{2}){5})").expect("valid MAC regex")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BssidError {
    #[error("empty BSSID")]
    Empty,
    #[error("malformed BSSID: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bssid([u8; 6]);

impl Bssid {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Find every address in free text, in order of appearance.
    pub fn find_all(text: &str) -> impl Iterator<Item = Bssid> + '_ {
        MAC_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
    }

    /// First address in free text, if any.
    pub fn find_first(text: &str) -> Option<Bssid> {
        Self::find_all(text).next()
    }
}

impl FromStr for Bssid {
    type Err = BssidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(BssidError::Empty);
        }
        let malformed = || BssidError::Malformed(trimmed.to_string());
        let parts: Vec<&str> = trimmed.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(malformed());
        }
        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(malformed());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| malformed())?;
        }
        Ok(Bssid(octets))
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl Serialize for Bssid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bssid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let lower: Bssid = " aa:bb:cc:dd:ee:ff\n".parse().unwrap();
        let mixed: Bssid = "Aa:bB:CC:dd:EE:fF".parse().unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(lower.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn accepts_dash_separators() {
        let b: Bssid = "00-11-22-33-44-55".parse().unwrap();
        assert_eq!(b.to_string(), "00:11:22:33:44:55");
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!("   ".parse::<Bssid>(), Err(BssidError::Empty));
        assert!("AA:BB:CC:DD:EE".parse::<Bssid>().is_err());
        assert!("AA:BB:CC:DD:EE:GG".parse::<Bssid>().is_err());
        assert!("AAA:BB:CC:DD:EE:FF".parse::<Bssid>().is_err());
        assert!("+a:BB:CC:DD:EE:FF".parse::<Bssid>().is_err());
    }

    #[test]
    fn finds_addresses_in_text() {
        let text = "  1  00:11:22:33:44:55  Guest\n  2  de:ad:be:ef:00:01  Home";
        let found: Vec<String> = Bssid::find_all(text).map(|b| b.to_string()).collect();
        assert_eq!(found, vec!["00:11:22:33:44:55", "DE:AD:BE:EF:00:01"]);
        assert!(Bssid::find_first("no address here").is_none());
    }

    #[test]
    fn finds_addresses_without_word_boundaries() {
        let b = Bssid::find_first("bssid_aa:bb:cc:dd:ee:ff_ch6").unwrap();
        assert_eq!(b.to_string(), "AA:BB:CC:DD:EE:FF");
        let b = Bssid::find_first("station=00:11:22:33:44:55x").unwrap();
        assert_eq!(b.to_string(), "00:11:22:33:44:55");
    }

    #[test]
    fn serializes_as_canonical_string() {
        let b: Bssid = "de:ad:be:ef:00:01".parse().unwrap();
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"DE:AD:BE:EF:00:01\"");
        let back: Bssid = serde_json::from_str("\"de:ad:be:ef:00:01\"").unwrap();
        assert_eq!(back, b);
    }
}
