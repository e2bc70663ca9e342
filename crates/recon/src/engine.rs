use log::{debug, info, warn};

use crate::annotate::{build_tables, partition_rows};
use crate::blocking::BlockingIndex;
use crate::config::{MatchConfig, MatchStrategy, ScorerKind, Side};
use crate::error::ReconError;
use crate::key::KeyBuilder;
use crate::matcher::{match_email_then_fuzzy, match_exact_id, match_fuzzy_name, FuzzyOptions, Roster};
use crate::model::{Dataset, MatchResult, ReconInput, RunMeta, RunReport, RunResult};
use crate::normalize::Normalizer;
use crate::schema::ResolvedColumns;
use crate::similarity::{FastTokenSetRatio, Scorer, TokenSetRatio};
use crate::summary::compute_summary;

/// Run matching per config. Returns per-row decisions, annotated tables and
/// the summary report. Either the whole run succeeds or nothing is produced.
pub fn run(config: &MatchConfig, input: &ReconInput) -> Result<RunResult, ReconError> {
    let normalizer = Normalizer::new(&config.normalize.company_suffixes)?;
    let source_columns = ResolvedColumns::resolve(&input.source, Side::Source, config)?;
    let reference_columns = ResolvedColumns::resolve(&input.reference, Side::Reference, config)?;

    let ctx = MatchContext {
        config,
        input,
        normalizer: &normalizer,
        source_columns: &source_columns,
        reference_columns: &reference_columns,
    };
    let results = match config.scorer {
        ScorerKind::TokenSet => ctx.run_strategy(&TokenSetRatio),
        ScorerKind::TokenSetFast => ctx.run_strategy(&FastTokenSetRatio),
    };

    let groups = partition_rows(&input.source, &source_columns, config);
    let tables = build_tables(&groups, &input.source, &input.reference, &results, config);
    let summary = compute_summary(&results, input.reference.len(), &groups);

    info!(
        "matching complete: {}/{} rows matched ({:.0}%)",
        summary.matched,
        summary.total_rows,
        summary.match_rate * 100.0
    );
    if summary.fallback_rows > 0 {
        info!(
            "{} rows had no blocking candidates and were scanned against the full reference set",
            summary.fallback_rows
        );
    }

    Ok(RunResult {
        report: RunReport {
            meta: RunMeta {
                config_name: config.name.clone(),
                strategy: config.strategy,
                threshold: config.threshold,
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
        },
        results,
        tables,
    })
}

struct MatchContext<'a> {
    config: &'a MatchConfig,
    input: &'a ReconInput,
    normalizer: &'a Normalizer,
    source_columns: &'a ResolvedColumns,
    reference_columns: &'a ResolvedColumns,
}

impl MatchContext<'_> {
    fn run_strategy<S: Scorer>(&self, scorer: &S) -> Vec<MatchResult> {
        let (source, reference) = (&self.input.source, &self.input.reference);
        let options = FuzzyOptions {
            threshold: self.config.threshold,
            parallel: self.config.parallel,
            progress_every: self.config.progress_every,
        };

        if self.config.strategy == MatchStrategy::ExactId {
            return match_exact_id(
                source.rows(),
                self.source_columns,
                reference.rows(),
                self.reference_columns,
            );
        }

        let source_keys = KeyBuilder::new(self.normalizer, self.source_columns).build_all(source.rows());
        let reference_keys =
            KeyBuilder::new(self.normalizer, self.reference_columns).build_all(reference.rows());

        match self.config.strategy {
            MatchStrategy::EmailThenFuzzy => {
                if options.parallel {
                    warn!("parallel matching is not available for the email_then_fuzzy strategy; running sequentially");
                }
                match_email_then_fuzzy(
                    scorer,
                    Roster {
                        records: source.rows(),
                        columns: self.source_columns,
                        keys: &source_keys,
                    },
                    Roster {
                        records: reference.rows(),
                        columns: self.reference_columns,
                        keys: &reference_keys,
                    },
                    options,
                )
            }
            _ => {
                let index = BlockingIndex::build(&reference_keys, &self.config.blocking);
                debug!(
                    "blocking index: {} buckets over {} reference keys (active: {})",
                    index.bucket_count(),
                    index.len(),
                    index.is_active()
                );
                match_fuzzy_name(scorer, &source_keys, &reference_keys, &index, options)
            }
        }
    }
}

/// Parse delimited text with a header row into a dataset. Rows whose cells
/// are all blank are skipped.
pub fn load_csv_dataset(name: &str, csv_data: &str, delimiter: u8) -> Result<Dataset, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(format!("{name}: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut dataset = Dataset::new(name, headers);
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(format!("{name}: {e}")))?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        dataset.push_row(record.iter().map(|v| Some(v.to_string())).collect());
    }
    Ok(dataset)
}
