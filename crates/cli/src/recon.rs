//! `rostermatch run` / `rostermatch validate` — config-driven roster matching.

use std::path::{Path, PathBuf};

use log::info;
use rostermatch_io::{read_dataset, write_tables, IoError, ReadOptions};
use rostermatch_recon::config::ScorerKind;
use rostermatch_recon::model::RunReport;
use rostermatch_recon::{ConfigOverrides, MatchConfig, ReconError, ReconInput};

use crate::exit_codes::{
    EXIT_ERROR, EXIT_INPUT_MISSING, EXIT_INVALID_CONFIG, EXIT_OUTPUT_WRITE, EXIT_SCHEMA,
};
use crate::CliError;

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub threshold: Option<u8>,
    pub parallel: bool,
    pub json: bool,
}

fn recon_err(err: ReconError) -> CliError {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
            CliError::new(EXIT_INVALID_CONFIG, err.to_string())
        }
        ReconError::UnresolvedRole { .. } => CliError::new(EXIT_SCHEMA, err.to_string())
            .with_hint("add the column name to the role's alias list under [source.columns] or [reference.columns]"),
        ReconError::Io(_) => CliError::new(EXIT_SCHEMA, err.to_string()),
    }
}

pub(crate) fn io_err(err: IoError) -> CliError {
    let code = match err {
        IoError::NotFound { .. } | IoError::Read { .. } | IoError::Unsupported { .. } => {
            EXIT_INPUT_MISSING
        }
        IoError::Csv { .. } | IoError::Excel { .. } | IoError::MissingSheet { .. } => EXIT_SCHEMA,
        IoError::Write { .. } => EXIT_OUTPUT_WRITE,
    };
    CliError::new(code, err.to_string())
}

/// Read, parse and validate a config file. Relative data paths in the file
/// are resolved against its directory.
fn load_config(path: &Path) -> Result<MatchConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(
            EXIT_INPUT_MISSING,
            format!("cannot read config {}: {e}", path.display()),
        )
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(MatchConfig::from_toml(&text).map_err(recon_err)?.resolve_paths(base_dir))
}

fn required_path(path: Option<&PathBuf>, what: &str, flag: &str, env: &str, key: &str) -> Result<PathBuf, CliError> {
    path.cloned().ok_or_else(|| {
        CliError::usage(format!("no {what} file given"))
            .with_hint(format!("pass {flag}, set {env}, or set {key} in the config"))
    })
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = match args.config {
        Some(ref path) => load_config(path)?,
        None => MatchConfig::default(),
    };
    let config = config
        .with_overrides(ConfigOverrides {
            source_file: args.source,
            reference_file: args.reference,
            output_file: args.output,
            threshold: args.threshold,
            parallel: args.parallel.then_some(true),
        })
        .map_err(recon_err)?;

    let source_path = required_path(config.source.file.as_ref(), "source", "--source", "SOURCE_FILE", "[source].file")?;
    let reference_path = required_path(
        config.reference.file.as_ref(),
        "reference",
        "--reference",
        "REFERENCE_FILE",
        "[reference].file",
    )?;
    let output_path = required_path(config.output.file.as_ref(), "output", "--output", "OUTPUT_FILE", "[output].file")?;

    let source = read_dataset(&source_path, &ReadOptions::from(&config.source)).map_err(io_err)?;
    let reference = read_dataset(&reference_path, &ReadOptions::from(&config.reference)).map_err(io_err)?;

    let result = rostermatch_recon::run(&config, &ReconInput { source, reference }).map_err(recon_err)?;

    // Output is written only after the whole matching pass succeeded
    let written = write_tables(&output_path, &result.tables).map_err(io_err)?;
    for path in &written {
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&result.report)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&result.report);
    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &RunReport) {
    let s = &report.summary;
    eprintln!(
        "{} ({}, threshold {}): {} of {} rows matched ({:.1}%), {} unmatched",
        report.meta.config_name,
        report.meta.strategy,
        report.meta.threshold,
        s.matched,
        s.total_rows,
        s.match_rate * 100.0,
        s.unmatched,
    );
    if s.by_method.len() > 1 {
        let methods: Vec<String> = s.by_method.iter().map(|(m, n)| format!("{m} {n}")).collect();
        eprintln!("by method: {}", methods.join(", "));
    }
    if s.blocked_rows > 0 || s.fallback_rows > 0 {
        eprintln!(
            "blocking: {} rows scored against a bucket, {} fell back to a full scan",
            s.blocked_rows, s.fallback_rows
        );
    }
    if s.partitions.len() > 1 {
        for p in &s.partitions {
            eprintln!("  {}: {} of {} matched", p.label, p.matched, p.rows);
        }
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    info!("config '{}' is valid", config.name);
    eprintln!(
        "{}: ok ({} strategy, threshold {}, {} scorer)",
        config_path.display(),
        config.strategy,
        config.threshold,
        match config.scorer {
            ScorerKind::TokenSet => "token_set",
            ScorerKind::TokenSetFast => "token_set_fast",
        }
    );
    Ok(())
}
