//! Human-readable rendering of the attempts ledger for terminal output.
use std::fmt::Write;

use colored::Colorize;

use crate::ledger::AttemptsLedger;

pub fn render_attempts(ledger: &AttemptsLedger) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Attempted Networks".bold());
    let _ = writeln!(out, "  Ledger: {}", ledger.path().display());
    let _ = writeln!(
        out,
        "  Last reset: {}",
        ledger
            .last_reset_date()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    let _ = writeln!(out, "  Attempted: {}", ledger.len());
    if ledger.is_empty() {
        return out;
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {:<17}  {:>5}  {:<19}  {:<19}",
        "BSSID", "Count", "First seen", "Last seen"
    );
    for (bssid, rec) in ledger.iter() {
        let _ = writeln!(
            out,
            "  {:<17}  {:>5}  {:<19}  {:<19}",
            bssid.to_string().cyan(),
            rec.count,
            rec.first_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
            rec.last_seen.format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use tempfile::tempdir;

    #[test]
    fn lists_devices_with_counts() {
        colored::control::set_override(false);
        let dir = tempdir().unwrap();
        let mut ledger = AttemptsLedger::new(dir.path().join("attempts.json"));
        let t = NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S").unwrap();
        ledger.record_attempt_at("00:11:22:33:44:55", t);
        ledger.record_attempt_at("00:11:22:33:44:55", t);
        let out = render_attempts(&ledger);
        assert!(out.contains("Attempted: 1"));
        assert!(out.contains("Last reset: never"));
        assert!(out.contains("00:11:22:33:44:55      2  2024-01-02 03:04:05"));
    }

    #[test]
    fn empty_ledger_has_no_table() {
        let dir = tempdir().unwrap();
        let ledger = AttemptsLedger::new(dir.path().join("attempts.json"));
        let out = render_attempts(&ledger);
        assert!(out.contains("Attempted: 0"));
        assert!(!out.contains("BSSID"));
    }
}
