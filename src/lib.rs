pub mod aircrack;
pub mod bssid;
pub mod capture;
pub mod config;
pub mod display;
pub mod ledger;
pub mod notify;
pub mod output;
pub mod recorder;
pub mod report;
pub mod session;
pub mod wordlist;

pub mod prelude {
    pub use crate::bssid::Bssid;
    pub use crate::ledger::{AttemptsLedger, ResetPolicy};
    pub use crate::session::{CrackOutcome, CrackSession, SessionSettings, SkipReason};
}
