// rostermatch - fuzzy contact roster reconciliation (headless)

mod exit_codes;
mod recon;
mod schema;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "rostermatch")]
#[command(about = "Match a contact roster against a reference contact list by name and company")]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match the source roster against the reference list and write the annotated output
    #[command(after_help = "\
Examples:
  rostermatch run match.toml
  rostermatch run match.toml --threshold 85 --json
  rostermatch run --source roster.xlsx --reference contacts.csv --output matched.xlsx
  SOURCE_FILE=roster.csv REFERENCE_FILE=contacts.csv OUTPUT_FILE=out.csv rostermatch run")]
    Run {
        /// Path to the match config (TOML). Defaults apply when omitted
        config: Option<PathBuf>,

        /// Source roster (.csv, .tsv, .xlsx, .xls, .ods)
        #[arg(long, short = 's', env = "SOURCE_FILE")]
        source: Option<PathBuf>,

        /// Reference contact list
        #[arg(long, short = 'r', env = "REFERENCE_FILE")]
        reference: Option<PathBuf>,

        /// Output file (.csv or .xlsx)
        #[arg(long, short = 'o', env = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Minimum score (0-100) for a match
        #[arg(long, short = 't', env = "MATCH_THRESHOLD", value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// Score rows in parallel
        #[arg(long)]
        parallel: bool,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a match config without reading any data
    #[command(after_help = "\
Examples:
  rostermatch validate match.toml")]
    Validate {
        /// Path to the match config (TOML)
        config: PathBuf,
    },

    /// Write a dataset's column schema (JSON) and a 100-row sample (CSV)
    #[command(after_help = "\
Examples:
  rostermatch schema advisors.xlsx
  rostermatch schema roster.xlsx --sheet \"in discovery\" --out-dir schema/")]
    Schema {
        /// Dataset file (.csv, .tsv, .xlsx, .xls, .ods)
        file: PathBuf,

        /// Workbook sheet (first sheet when omitted)
        #[arg(long)]
        sheet: Option<String>,

        /// Directory for <stem>_schema.json and <stem>_sample.csv
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            source,
            reference,
            output,
            threshold,
            parallel,
            json,
        } => recon::cmd_run(recon::RunArgs {
            config,
            source,
            reference,
            output,
            threshold,
            parallel,
            json,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Schema {
            file,
            sheet,
            out_dir,
        } => schema::cmd_schema(file, sheet, out_dir),
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
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
