//! Attempts ledger: the durable record of which access points have already
//! been handed to the cracking engine.
//!
//! The ledger is loaded once, consulted before every crack and persisted
//! synchronously after every mutation. Writes go to a sibling temp file that is
//! renamed over the target, so a crash mid-write leaves the previous state
//! intact. Storage failures are logged and swallowed: the in-memory ledger
//! stays authoritative for the lifetime of the process.
//!
//! ```no_run
//! use quickdic::ledger::{AttemptsLedger, ResetPolicy};
//! let mut ledger = AttemptsLedger::load("/tmp/attempts.json", ResetPolicy::default());
//! if !ledger.has_attempted("aa:bb:cc:dd:ee:ff") {
//!     ledger.record_attempt("aa:bb:cc:dd:ee:ff");
//! }
//! ```
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::bssid::Bssid;

/// Highest on-disk schema version this build writes.
pub const SCHEMA_VERSION: u32 = 1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepts the written format as well as ISO-8601 `T`-separated timestamps.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| raw.parse().ok())
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::{TIMESTAMP_FORMAT, parse_timestamp};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("bad timestamp {:?}", raw)))
    }
}

/// Per-entry readers for the on-disk ledger. A damaged entry never takes the
/// rest of the file down with it.
mod lenient {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use log::warn;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{AttemptRecord, parse_timestamp};
    use crate::bssid::Bssid;

    pub fn attempted<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<Bssid, AttemptRecord>, D::Error> {
        let entries = match Value::deserialize(d)? {
            Value::Object(map) => map,
            Value::Null => return Ok(BTreeMap::new()),
            other => {
                warn!("ignoring non-object \"attempted\" in ledger: {}", other);
                return Ok(BTreeMap::new());
            }
        };
        let mut out = BTreeMap::new();
        for (key, value) in entries {
            let bssid = match key.parse::<Bssid>() {
                Ok(b) => b,
                Err(e) => {
                    warn!("dropping ledger entry {:?}: {}", key, e);
                    continue;
                }
            };
            out.entry(bssid).or_insert_with(|| record(&key, &value));
        }
        Ok(out)
    }

    /// Salvage whatever fields are readable. The device stays marked as
    /// attempted even when its metadata is damaged.
    fn record(key: &str, value: &Value) -> AttemptRecord {
        let ts = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
        };
        let first = ts("first_seen");
        let last = ts("last_seen");
        if first.is_none() || last.is_none() {
            warn!("ledger entry {} has unreadable timestamps, keeping it as attempted", key);
        }
        let count = value
            .get("count")
            .and_then(|c| c.as_u64().or_else(|| c.as_str()?.trim().parse().ok()))
            .unwrap_or(0);
        AttemptRecord {
            count,
            first_seen: first.or(last).unwrap_or_default(),
            last_seen: last.or(first).unwrap_or_default(),
        }
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) => match s.trim().parse() {
                Ok(day) => Ok(Some(day)),
                Err(_) => {
                    warn!("ignoring unreadable ledger reset date {:?}", s);
                    Ok(None)
                }
            },
            other => {
                warn!("ignoring unreadable ledger reset date {}", other);
                Ok(None)
            }
        }
    }
}

/// Per-device attempt metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(default)]
    pub count: u64,
    #[serde(with = "timestamp")]
    pub first_seen: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub last_seen: NaiveDateTime,
}

/// Serialized form of the ledger. Field order is alphabetical so the written
/// JSON has sorted keys at every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LedgerData {
    #[serde(default, deserialize_with = "lenient::attempted")]
    attempted: BTreeMap<Bssid, AttemptRecord>,
    #[serde(
        rename = "last_reset",
        alias = "last_reset_date",
        default,
        deserialize_with = "lenient::date"
    )]
    last_reset_date: Option<NaiveDate>,
    #[serde(rename = "version", alias = "schema_version", default = "default_version")]
    schema_version: u32,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for LedgerData {
    fn default() -> Self {
        Self {
            attempted: BTreeMap::new(),
            last_reset_date: None,
            schema_version: SCHEMA_VERSION,
        }
    }
}

/// When the ledger forgets previous attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetPolicy {
    /// Clear all attempts the first time the ledger is loaded on a new day.
    pub once_per_day: bool,
}

#[derive(Debug)]
pub struct AttemptsLedger {
    path: PathBuf,
    data: LedgerData,
}

impl AttemptsLedger {
    /// Empty, unsaved ledger bound to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            data: LedgerData::default(),
        }
    }

    /// Load from `path`, applying `policy` against today's local date.
    pub fn load<P: AsRef<Path>>(path: P, policy: ResetPolicy) -> Self {
        Self::load_on(path, policy, Local::now().date_naive())
    }

    /// Load from `path`, applying `policy` as if the current date were `today`.
    /// A missing or unreadable file yields an empty ledger.
    pub fn load_on<P: AsRef<Path>>(path: P, policy: ResetPolicy, today: NaiveDate) -> Self {
        let path = path.as_ref();
        let data = match read_ledger(path) {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!("no attempts ledger at {}, starting empty", path.display());
                LedgerData::default()
            }
            Err(e) => {
                error!("failed to load attempts ledger: {:#}", e);
                LedgerData::default()
            }
        };
        if data.schema_version > SCHEMA_VERSION {
            warn!(
                "attempts ledger {} has schema version {} (newer than {}), reading what we understand",
                path.display(),
                data.schema_version,
                SCHEMA_VERSION
            );
        }
        let mut ledger = Self {
            path: path.to_path_buf(),
            data,
        };
        if policy.once_per_day && ledger.data.last_reset_date != Some(today) {
            info!(
                "daily reset of attempts ledger ({} entries cleared)",
                ledger.data.attempted.len()
            );
            ledger.data.attempted.clear();
            ledger.data.last_reset_date = Some(today);
            ledger.persist_or_log();
        }
        ledger
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> u32 {
        self.data.schema_version
    }

    pub fn last_reset_date(&self) -> Option<NaiveDate> {
        self.data.last_reset_date
    }

    pub fn len(&self) -> usize {
        self.data.attempted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.attempted.is_empty()
    }

    /// Attempted devices in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bssid, &AttemptRecord)> {
        self.data.attempted.iter()
    }

    pub fn get(&self, bssid: &Bssid) -> Option<&AttemptRecord> {
        self.data.attempted.get(bssid)
    }

    /// Whether `id` has been attempted. Empty or malformed identifiers are
    /// never considered attempted.
    pub fn has_attempted(&self, id: &str) -> bool {
        match id.parse::<Bssid>() {
            Ok(bssid) => self.has_attempted_bssid(&bssid),
            Err(_) => false,
        }
    }

    pub fn has_attempted_bssid(&self, bssid: &Bssid) -> bool {
        self.data.attempted.contains_key(bssid)
    }

    /// Mark `id` as attempted now and persist.
    pub fn record_attempt(&mut self, id: &str) -> Option<&AttemptRecord> {
        self.record_attempt_at(id, Local::now().naive_local())
    }

    /// Mark `id` as attempted at `now` and persist. Empty or malformed
    /// identifiers are ignored.
    pub fn record_attempt_at(&mut self, id: &str, now: NaiveDateTime) -> Option<&AttemptRecord> {
        match id.parse::<Bssid>() {
            Ok(bssid) => Some(self.record_bssid_at(bssid, now)),
            Err(e) => {
                debug!("not recording attempt: {}", e);
                None
            }
        }
    }

    /// Mark `bssid` as attempted now and persist.
    pub fn record_bssid(&mut self, bssid: Bssid) -> &AttemptRecord {
        self.record_bssid_at(bssid, Local::now().naive_local())
    }

    pub fn record_bssid_at(&mut self, bssid: Bssid, now: NaiveDateTime) -> &AttemptRecord {
        // Drop sub-second precision so memory matches what gets written.
        let now = now.with_nanosecond(0).unwrap_or(now);
        self.data
            .attempted
            .entry(bssid)
            .and_modify(|r| {
                r.last_seen = now;
                r.count = r.count.saturating_add(1);
            })
            .or_insert(AttemptRecord {
                count: 1,
                first_seen: now,
                last_seen: now,
            });
        self.persist_or_log();
        &self.data.attempted[&bssid]
    }

    /// Deterministic JSON rendering (sorted keys, two-space indent).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.data).context("serialize attempts ledger")
    }

    /// Atomically write the ledger to its path.
    pub fn persist(&self) -> Result<()> {
        self.persist_to(&self.path)
    }

    /// Atomically write the ledger to `path`: write a sibling temp file, flush
    /// it to disk, then rename it over the target.
    pub fn persist_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let json = self.to_json()?;
        let tmp = temp_path_for(path);
        let write = || -> Result<()> {
            let file =
                File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            writer.write_all(json.as_bytes())?;
            writer.write_all(b"\n")?;
            let file = writer
                .into_inner()
                .map_err(|e| e.into_error())
                .with_context(|| format!("flush {}", tmp.display()))?;
            file.sync_all()
                .with_context(|| format!("sync {}", tmp.display()))?;
            fs::rename(&tmp, path)
                .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))
        };
        write().inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }

    fn persist_or_log(&self) {
        if let Err(e) = self.persist() {
            error!("failed to save attempts ledger: {:#}", e);
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "attempts".into());
    name.push(format!(".tmp.{}", std::process::id()));
    path.with_file_name(name)
}

fn read_ledger(path: &Path) -> Result<Option<LedgerData>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let data = serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn missing_file_gives_empty_ledger() {
        let dir = tempdir().unwrap();
        let ledger = AttemptsLedger::load(dir.path().join("none.json"), ResetPolicy::default());
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_reset_date(), None);
        assert_eq!(ledger.schema_version(), SCHEMA_VERSION);
    }

    #[test]
    fn corrupt_file_gives_empty_ledger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        fs::write(&path, "{ not json").unwrap();
        let ledger = AttemptsLedger::load(&path, ResetPolicy::default());
        assert!(ledger.is_empty());
    }

    #[test]
    fn repeated_marking_counts_up() {
        let dir = tempdir().unwrap();
        let mut ledger = AttemptsLedger::new(dir.path().join("attempts.json"));
        let first = ledger
            .record_attempt_at("aa:bb:cc:dd:ee:ff", at("2024-01-01 10:00:00"))
            .cloned()
            .unwrap();
        assert!(ledger.has_attempted("aa:bb:cc:dd:ee:ff"));
        assert_eq!(first.count, 1);

        let second = ledger
            .record_attempt_at("AA:BB:CC:DD:EE:FF", at("2024-01-01 11:30:00"))
            .cloned()
            .unwrap();
        assert!(ledger.has_attempted("AA:BB:CC:DD:EE:FF"));
        assert_eq!(second.count, 2);
        assert_eq!(second.first_seen, at("2024-01-01 10:00:00"));
        assert_eq!(second.last_seen, at("2024-01-01 11:30:00"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn lookups_ignore_case() {
        let dir = tempdir().unwrap();
        let mut ledger = AttemptsLedger::new(dir.path().join("attempts.json"));
        ledger.record_attempt("De:aD:bE:eF:00:01");
        for spelling in ["de:ad:be:ef:00:01", "DE:AD:BE:EF:00:01", " dE:Ad:Be:Ef:00:01 "] {
            assert!(ledger.has_attempted(spelling), "{spelling}");
        }
        assert!(!ledger.has_attempted("de:ad:be:ef:00:02"));
    }

    #[test]
    fn garbage_ids_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        let mut ledger = AttemptsLedger::new(&path);
        assert!(ledger.record_attempt("").is_none());
        assert!(ledger.record_attempt("not-a-mac").is_none());
        assert!(!ledger.has_attempted(""));
        assert!(!ledger.has_attempted("not-a-mac"));
        assert!(ledger.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn record_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("attempts.json");
        let mut ledger = AttemptsLedger::new(&path);
        ledger.record_attempt("00:11:22:33:44:55");
        assert!(path.exists());
        assert!(!temp_path_for(&path).exists());

        let reloaded = AttemptsLedger::load(&path, ResetPolicy::default());
        assert!(reloaded.has_attempted("00:11:22:33:44:55"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn serialization_is_sorted_and_stable() {
        let dir = tempdir().unwrap();
        let mut ledger = AttemptsLedger::new(dir.path().join("attempts.json"));
        ledger.record_attempt_at("ff:ee:dd:cc:bb:aa", at("2024-03-02 08:15:00"));
        ledger.record_attempt_at("00:11:22:33:44:55", at("2024-03-01 21:00:05"));
        ledger.record_attempt_at("00:11:22:33:44:55", at("2024-03-02 09:00:00"));
        insta::assert_snapshot!(ledger.to_json().unwrap(), @r#"
        {
          "attempted": {
            "00:11:22:33:44:55": {
              "count": 2,
              "first_seen": "2024-03-01 21:00:05",
              "last_seen": "2024-03-02 09:00:00"
            },
            "FF:EE:DD:CC:BB:AA": {
              "count": 1,
              "first_seen": "2024-03-02 08:15:00",
              "last_seen": "2024-03-02 08:15:00"
            }
          },
          "last_reset": null,
          "version": 1
        }
        "#);
    }

    #[test]
    fn reads_legacy_layout_tolerantly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        fs::write(
            &path,
            r#"{"version": 7, "last_reset": "2024-05-01", "extra": true,
                "attempted": {"aa:bb:cc:dd:ee:ff": {"first_seen": "2024-05-01 10:00:00",
                                                    "last_seen": "2024-05-01 10:00:00"}}}"#,
        )
        .unwrap();
        let mut ledger = AttemptsLedger::load(&path, ResetPolicy::default());
        assert_eq!(ledger.schema_version(), 7);
        assert!(ledger.has_attempted("AA:BB:CC:DD:EE:FF"));
        let bssid: Bssid = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(ledger.get(&bssid).unwrap().count, 0);
        let rec = ledger.record_attempt("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(rec.count, 1);
    }

    #[test]
    fn damaged_entries_do_not_wipe_the_ledger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        fs::write(
            &path,
            r#"{"version": 2, "last_reset": "not a date",
                "attempted": {
                    "AA:BB:CC:DD:EE:FF": {"count": 3, "first_seen": "2024-05-01 10:00:00",
                                          "last_seen": "2024-05-02 10:00:00"},
                    "11:22:33:44:55:66": {"count": 1, "first_seen": "2024-05-01T10:00:00",
                                          "last_seen": "2024-05-01T10:00:00"},
                    "22:33:44:55:66:77": {"count": "x", "last_seen": 17},
                    "not-a-mac": {"count": 1}
                }}"#,
        )
        .unwrap();
        let mut ledger = AttemptsLedger::load(&path, ResetPolicy::default());
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.last_reset_date(), None);
        assert!(ledger.has_attempted("aa:bb:cc:dd:ee:ff"));
        assert!(ledger.has_attempted("22:33:44:55:66:77"));
        let iso: Bssid = "11:22:33:44:55:66".parse().unwrap();
        assert_eq!(ledger.get(&iso).unwrap().first_seen, at("2024-05-01 10:00:00"));

        ledger.record_attempt("de:ad:be:ef:00:01");
        let reloaded = AttemptsLedger::load(&path, ResetPolicy::default());
        assert_eq!(reloaded.len(), 4);
        let good: Bssid = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(reloaded.get(&good).unwrap().count, 3);
        assert!(reloaded.has_attempted("22:33:44:55:66:77"));
    }

    #[test]
    fn typed_and_string_lookups_agree() {
        let dir = tempdir().unwrap();
        let mut ledger = AttemptsLedger::new(dir.path().join("attempts.json"));
        let bssid: Bssid = "00:11:22:33:44:55".parse().unwrap();
        assert!(!ledger.has_attempted_bssid(&bssid));
        assert_eq!(ledger.record_bssid(bssid).count, 1);
        assert!(ledger.has_attempted_bssid(&bssid));
        assert!(ledger.has_attempted("00:11:22:33:44:55"));
        assert_eq!(ledger.record_attempt("00:11:22:33:44:55").unwrap().count, 2);
    }

    #[test]
    fn daily_reset_clears_stale_attempts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        let mut ledger = AttemptsLedger::load_on(
            &path,
            ResetPolicy { once_per_day: true },
            day("2024-06-09"),
        );
        ledger.record_attempt("00:11:22:33:44:55");
        assert_eq!(ledger.last_reset_date(), Some(day("2024-06-09")));

        let next_day = AttemptsLedger::load_on(
            &path,
            ResetPolicy { once_per_day: true },
            day("2024-06-10"),
        );
        assert!(next_day.is_empty());
        assert_eq!(next_day.last_reset_date(), Some(day("2024-06-10")));

        // the reset is persisted immediately
        let on_disk = AttemptsLedger::load(&path, ResetPolicy::default());
        assert!(on_disk.is_empty());
        assert_eq!(on_disk.last_reset_date(), Some(day("2024-06-10")));
    }

    #[test]
    fn same_day_reload_keeps_attempts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        let policy = ResetPolicy { once_per_day: true };
        let mut ledger = AttemptsLedger::load_on(&path, policy, day("2024-06-09"));
        ledger.record_attempt("00:11:22:33:44:55");
        let again = AttemptsLedger::load_on(&path, policy, day("2024-06-09"));
        assert!(again.has_attempted("00:11:22:33:44:55"));
    }

    #[test]
    fn no_reset_without_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attempts.json");
        let mut ledger =
            AttemptsLedger::load_on(&path, ResetPolicy { once_per_day: true }, day("2024-06-09"));
        ledger.record_attempt("00:11:22:33:44:55");

        let later = AttemptsLedger::load_on(&path, ResetPolicy::default(), day("2025-01-01"));
        assert!(later.has_attempted("00:11:22:33:44:55"));
        assert_eq!(later.last_reset_date(), Some(day("2024-06-09")));
    }

    #[test]
    fn failed_persist_keeps_memory_state() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"not a dir").unwrap();
        let mut ledger = AttemptsLedger::new(blocker.join("attempts.json"));
        assert!(ledger.record_attempt("00:11:22:33:44:55").is_some());
        assert!(ledger.has_attempted("00:11:22:33:44:55"));
        assert!(ledger.persist().is_err());
    }
}
