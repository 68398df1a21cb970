//! Crack session: one pass from a handshake capture to a recorded key.
//!
//! The session owns the attempts ledger and drives the engine through a fixed
//! sequence:
//!
//! 1. extract the target BSSID from the engine's info output;
//! 2. skip if the ledger already has it, otherwise mark it *before* cracking,
//!    so a duplicate trigger arriving mid-crack is rejected;
//! 3. resolve wordlists;
//! 4. run the crack and parse the output;
//! 5. on success, update the display, append to the cracked log and notify.
//!
//! A session never fails: every problem is logged and ends in a
//! [`CrackOutcome`].
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::aircrack::CrackEngine;
use crate::bssid::Bssid;
use crate::capture::network_name;
use crate::display::{LogDisplay, StatusDisplay};
use crate::ledger::AttemptsLedger;
use crate::notify::Notifier;
use crate::output::{CrackOutput, KeyMatch, extract_bssid, parse_crack_output};
use crate::recorder::{Appended, ResultRecorder};
use crate::wordlist;

/// Lines of engine output kept in the log after a crack run.
const OUTPUT_TAIL_LINES: usize = 12;

pub const DEFAULT_FACE: &str = "(·ω·)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoIdentifier,
    AlreadyAttempted(Bssid),
    NoWordlists,
    EngineFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoIdentifier => write!(f, "no handshake/BSSID found"),
            SkipReason::AlreadyAttempted(b) => write!(f, "already attempted BSSID={}", b),
            SkipReason::NoWordlists => write!(f, "no wordlists available"),
            SkipReason::EngineFailed(msg) => write!(f, "engine failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrackOutcome {
    NotFound,
    Found(String),
    Indeterminate,
    Skipped(SkipReason),
}

impl fmt::Display for CrackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrackOutcome::NotFound => write!(f, "KEY NOT FOUND"),
            CrackOutcome::Found(pw) => write!(f, "KEY FOUND [{}]", pw),
            CrackOutcome::Indeterminate => write!(f, "no key pattern detected"),
            CrackOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}

/// Progress of a session through its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Start,
    IdentifierExtracted,
    LedgerChecked,
    EngineInvoked,
    OutcomeParsed,
    Skipped,
    Done,
    RecordedAndNotified,
}

/// Static settings for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub wordlist_folder: PathBuf,
    pub face: String,
}

impl SessionSettings {
    pub fn new<P: AsRef<Path>>(wordlist_folder: P) -> Self {
        Self {
            wordlist_folder: wordlist_folder.as_ref().to_path_buf(),
            face: DEFAULT_FACE.to_string(),
        }
    }
}

pub struct CrackSession {
    settings: SessionSettings,
    ledger: AttemptsLedger,
    engine: Box<dyn CrackEngine>,
    recorder: ResultRecorder,
    notifier: Option<Box<dyn Notifier>>,
    display: Box<dyn StatusDisplay>,
    state: SessionState,
}

impl CrackSession {
    pub fn new(
        settings: SessionSettings,
        ledger: AttemptsLedger,
        engine: Box<dyn CrackEngine>,
        recorder: ResultRecorder,
    ) -> Self {
        Self {
            settings,
            ledger,
            engine,
            recorder,
            notifier: None,
            display: Box::new(LogDisplay),
            state: SessionState::Start,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_display(mut self, display: Box<dyn StatusDisplay>) -> Self {
        self.display = display;
        self
    }

    pub fn ledger(&self) -> &AttemptsLedger {
        &self.ledger
    }

    /// State reached by the most recent [`run`](Self::run).
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn advance(&mut self, next: SessionState) {
        debug!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn skip(&mut self, reason: SkipReason) -> CrackOutcome {
        self.advance(SessionState::Skipped);
        CrackOutcome::Skipped(reason)
    }

    /// Process one handshake capture.
    pub fn run(&mut self, capture: &Path) -> CrackOutcome {
        self.state = SessionState::Start;

        let info = match self.engine.run_info(capture) {
            Ok(text) => text,
            Err(e) => {
                error!("cannot inspect {}: {:#}", capture.display(), e);
                return self.skip(SkipReason::EngineFailed(format!("{:#}", e)));
            }
        };
        let Some(bssid) = extract_bssid(&info) else {
            info!("no handshake/BSSID found in {}", capture.display());
            return self.skip(SkipReason::NoIdentifier);
        };
        self.advance(SessionState::IdentifierExtracted);

        if self.ledger.has_attempted_bssid(&bssid) {
            info!("skipping crack (already attempted BSSID={})", bssid);
            return self.skip(SkipReason::AlreadyAttempted(bssid));
        }
        self.ledger.record_bssid(bssid);
        self.advance(SessionState::LedgerChecked);
        info!("handshake confirmed (BSSID={}), starting crack", bssid);

        let wordlists = wordlist::resolve(&self.settings.wordlist_folder);
        if wordlists.is_empty() {
            warn!("no wordlists available, skipping crack");
            return self.skip(SkipReason::NoWordlists);
        }

        let output = match self.engine.run_crack(capture, &bssid, &wordlists) {
            Ok(text) => text,
            Err(e) => {
                error!("crack run failed for BSSID={}: {:#}", bssid, e);
                return self.skip(SkipReason::EngineFailed(format!("{:#}", e)));
            }
        };
        self.advance(SessionState::EngineInvoked);
        log_output_tail(&output);

        let outcome = match parse_crack_output(output.trim()) {
            CrackOutput::Exhausted => {
                info!("dictionary finished, KEY NOT FOUND");
                CrackOutcome::NotFound
            }
            CrackOutput::Unrecognized => {
                info!("dictionary finished, no key pattern detected");
                CrackOutcome::Indeterminate
            }
            CrackOutput::Key { password, matched } => {
                match matched {
                    KeyMatch::Marker => info!("KEY FOUND for BSSID={}", bssid),
                    KeyMatch::Bracket => warn!(
                        "no KEY FOUND marker for BSSID={}, using first bracketed value (low confidence)",
                        bssid
                    ),
                }
                CrackOutcome::Found(password)
            }
        };
        self.advance(SessionState::OutcomeParsed);

        match &outcome {
            CrackOutcome::Found(password) => {
                self.publish(capture, password);
                self.advance(SessionState::RecordedAndNotified);
            }
            _ => self.advance(SessionState::Done),
        }
        outcome
    }

    fn publish(&mut self, capture: &Path, password: &str) {
        let ssid = network_name(capture);

        self.display
            .show(&self.settings.face, &format!("Cracked password: {}", password));

        match self.recorder.append(&ssid, password) {
            Ok(Appended::Written) => {
                info!("saved {} to {}", ssid, self.recorder.path().display())
            }
            Ok(Appended::Duplicate) => debug!("{} already in cracked log", ssid),
            Err(e) => error!("could not write cracked log: {:#}", e),
        }

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.send(&ssid, password) {
                error!("notification failed for SSID={}: {}", ssid, e);
            }
        }
    }
}

fn log_output_tail(output: &str) {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        info!("aircrack output: (empty)");
        return;
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    let tail = &lines[lines.len().saturating_sub(OUTPUT_TAIL_LINES)..];
    info!("aircrack last output:\n{}", tail.join("\n"));
}
