//! CLI entrypoint for `quickdic`.
//!
//! Loads configuration (TOML file, environment, then flags), and either runs a
//! crack session for each given handshake capture, reports whether the
//! cracking engine and wordlists are available, or prints the attempts ledger.
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::{LevelFilter, error, info, warn};
use quickdic::{
    aircrack::Aircrack,
    config::Config,
    display::{ConsoleDisplay, LogDisplay, StatusDisplay},
    ledger::AttemptsLedger,
    recorder::ResultRecorder,
    report::render_attempts,
    session::{CrackOutcome, CrackSession},
    wordlist,
};

#[derive(Parser, Debug)]
#[command(
    name = "quickdic",
    version,
    about = "Quick dictionary attack against captured handshakes, once per BSSID"
)]
struct Args {
    /// Path to a TOML config file
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Folder holding *.txt wordlists
    #[arg(short = 'w', long = "wordlists", global = true)]
    wordlist_folder: Option<PathBuf>,

    /// Attempts ledger file
    #[arg(long = "attempts-db", global = true)]
    attempts_db: Option<PathBuf>,

    /// Cracked credentials log
    #[arg(long = "cracked-log", global = true)]
    cracked_log: Option<PathBuf>,

    /// Path to the aircrack-ng binary
    #[arg(long = "aircrack", global = true)]
    aircrack_path: Option<PathBuf>,

    /// Forget previous attempts once a day
    #[arg(long = "once-per-day", global = true)]
    once_per_day: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Suppress console output (logging is unaffected)
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a dictionary attack on each capture not attempted before
    Crack {
        /// Handshake capture file(s)
        #[arg(required = true)]
        captures: Vec<PathBuf>,
    },
    /// Report wordlists and aircrack-ng availability
    Check,
    /// Show the attempts ledger
    Attempts,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env(),
    };
    if let Some(p) = &args.wordlist_folder {
        config.wordlist_folder = p.clone();
    }
    if let Some(p) = &args.attempts_db {
        config.attempts_db = p.clone();
    }
    if let Some(p) = &args.cracked_log {
        config.cracked_log = p.clone();
    }
    if let Some(p) = &args.aircrack_path {
        config.aircrack_path = p.clone();
    }
    if args.once_per_day {
        config.attempt_once_per_day = true;
    }
    Ok(config)
}

fn verify_captures(captures: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let existing: Vec<PathBuf> = captures
        .iter()
        .filter(|p| {
            let ok = p.is_file();
            if !ok {
                warn!("capture not found: {} (skipping)", p.display());
            }
            ok
        })
        .cloned()
        .collect();
    if existing.is_empty() {
        bail!("none of the given capture files exist");
    }
    Ok(existing)
}

fn run_crack(config: &Config, captures: &[PathBuf], quiet: bool) -> Result<()> {
    let captures = verify_captures(captures)?;
    let ledger = AttemptsLedger::load(&config.attempts_db, config.reset_policy());
    let display: Box<dyn StatusDisplay> = if quiet {
        Box::new(LogDisplay)
    } else {
        Box::new(ConsoleDisplay)
    };
    let mut session = CrackSession::new(
        config.session_settings(),
        ledger,
        Box::new(Aircrack::new(&config.aircrack_path)),
        ResultRecorder::new(&config.cracked_log),
    )
    .with_display(display);
    match config.telegram() {
        Some(telegram) => session = session.with_notifier(Box::new(telegram)),
        None => info!("telegram not configured, notifications disabled"),
    }

    for capture in &captures {
        let outcome = session.run(capture);
        if quiet {
            continue;
        }
        let line = format!("{}: {}", capture.display(), outcome);
        match outcome {
            CrackOutcome::Found(_) => println!("{}", line.green().bold()),
            CrackOutcome::NotFound | CrackOutcome::Indeterminate => println!("{}", line),
            CrackOutcome::Skipped(_) => println!("{}", line.dimmed()),
        }
    }
    Ok(())
}

fn run_check(config: &Config, quiet: bool) {
    let found = wordlist::log_inventory(&config.wordlist_folder);
    let engine = Aircrack::new(&config.aircrack_path);
    let version = engine.detect();
    match &version {
        Some(v) => info!("found {} {}", engine.binary().display(), v),
        None => warn!(
            "{} not detected (is aircrack-ng installed?)",
            engine.binary().display()
        ),
    }
    if quiet {
        return;
    }
    println!(
        "wordlists: {} in {}",
        found,
        config.wordlist_folder.display()
    );
    match version {
        Some(v) => println!("aircrack-ng: {} ({})", v.green(), engine.binary().display()),
        None => println!("aircrack-ng: {}", "not found".red()),
    }
    let telegram = if config.telegram().is_some() {
        "configured".green()
    } else {
        "disabled".yellow()
    };
    println!("telegram: {}", telegram);
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    };

    match &args.command {
        Command::Crack { captures } => {
            if let Err(e) = run_crack(&config, captures, args.quiet) {
                error!("{:#}", e);
                std::process::exit(3);
            }
        }
        Command::Check => run_check(&config, args.quiet),
        Command::Attempts => {
            // Read-only view: never apply the daily reset here.
            let ledger = AttemptsLedger::load(&config.attempts_db, Default::default());
            if !args.quiet {
                println!("{}", render_attempts(&ledger));
            }
        }
    }
}
