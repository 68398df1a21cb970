use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Network name encoded in a capture filename.
///
/// Captures are named `<name>_<suffix1>_<suffix2>.<ext>`, where the name may
/// itself contain underscores. The last two segments are dropped; stems with
/// fewer than three segments are returned whole.
pub fn network_name(capture: &Path) -> String {
    let stem = capture
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() >= 3 {
        parts[..parts.len() - 2].join("_")
    } else {
        stem
    }
}

/// Where the engine writes a recovered key for `capture`.
pub fn cracked_key_path(capture: &Path) -> PathBuf {
    let mut name = OsString::from(capture.as_os_str());
    name.push(".cracked");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_two_trailing_segments() {
        assert_eq!(
            network_name(Path::new("livingroom_handshake_20240101_0001.pcap")),
            "livingroom_handshake"
        );
        assert_eq!(
            network_name(Path::new("/home/pi/handshakes/HomeNet_aabbccddeeff_1.pcap")),
            "HomeNet"
        );
    }

    #[test]
    fn short_stems_are_kept_whole() {
        assert_eq!(network_name(Path::new("simple.pcap")), "simple");
        assert_eq!(network_name(Path::new("two_parts.pcap")), "two_parts");
        assert_eq!(network_name(Path::new("noext")), "noext");
    }

    #[test]
    fn only_last_extension_is_stripped() {
        assert_eq!(network_name(Path::new("my.net_a_b.pcap")), "my.net");
    }

    #[test]
    fn key_path_appends_suffix() {
        assert_eq!(
            cracked_key_path(Path::new("/hs/a_b_c.pcap")),
            PathBuf::from("/hs/a_b_c.pcap.cracked")
        );
    }
}
