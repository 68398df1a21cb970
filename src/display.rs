use colored::Colorize;
use log::info;

/// Receives a face token and a one-line status when a key is recovered.
pub trait StatusDisplay {
    fn show(&mut self, face: &str, status: &str);
}

/// Writes status updates to the log only.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl StatusDisplay for LogDisplay {
    fn show(&mut self, face: &str, status: &str) {
        info!("{} {}", face, status);
    }
}

/// Prints status updates to stdout.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl StatusDisplay for ConsoleDisplay {
    fn show(&mut self, face: &str, status: &str) {
        println!("{} {}", face.bold(), status.green());
    }
}
