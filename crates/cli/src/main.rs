// ptreport - daily clinic reconciliation reports

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use ptreport_recon::ReconError;

use exit_codes::{EXIT_INPUT, EXIT_INVALID_CONFIG, EXIT_OUTPUT, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "ptreport")]
#[command(about = "Reconcile clinic schedules against lead and prescription exports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// TOML file overriding column names, date formats and name key rules
    #[arg(long, global = true, value_name = "FILE", env = "PTREPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the dated report is written to (overrides output_dir)
    #[arg(long, global = true, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug). RUST_LOG wins.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scheduled visits with no matching lead entry
    #[command(after_help = "\
Writes output_<YYYYMMDD>.csv. A linked patient's visit is reported when the
lead export lacks that date and it falls within 14 days. A patient that
cannot be linked has every visit within 7 days reported.

Examples:
  ptreport visits schedule.csv leads.csv
  ptreport visits schedule.csv leads.csv --out-dir reports -v")]
    Visits {
        /// Clinical schedule export
        schedule: PathBuf,

        /// Lead export
        lead: PathBuf,
    },

    /// Patients whose last visit has passed with nothing booked
    #[command(after_help = "\
Writes followup_<YYYYMMDD>.csv with the most recent past visit of each
patient who has no visit today or later.

Examples:
  ptreport followup schedule.csv")]
    Followup {
        /// Clinical schedule export
        schedule: PathBuf,
    },

    /// Visits of every prescription holder, tagged with the end date
    #[command(after_help = "\
Writes expired_prescription_<YYYYMMDD>.csv.

Examples:
  ptreport expired --prescription rx.csv --visit visits.csv")]
    Expired {
        /// Prescription export (preamble rows before the header are skipped)
        #[arg(long, short = 'p')]
        prescription: PathBuf,

        /// Visit export
        #[arg(long)]
        visit: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  ptreport-recon ", env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = recon::RunOptions {
        config: cli.config,
        out_dir: cli.out_dir,
    };

    let result = match cli.command {
        Commands::Visits { schedule, lead } => recon::cmd_visits(&opts, schedule, lead),
        Commands::Followup { schedule } => recon::cmd_followup(&opts, schedule),
        Commands::Expired { prescription, visit } => recon::cmd_expired(&opts, prescription, visit),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Failure reading one of the input exports.
    pub fn input(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("set the column for this source in --config".to_string())
            }
            ReconError::HeaderNotFound { .. } => {
                Some("is this the right export? set [prescription].header in --config".to_string())
            }
            _ => None,
        };
        Self { code: EXIT_INPUT, message: err.to_string(), hint }
    }

    pub fn config(err: ReconError) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: err.to_string(), hint: None }
    }

    pub fn output(err: ReconError) -> Self {
        Self { code: EXIT_OUTPUT, message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
