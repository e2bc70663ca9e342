use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};
use rayon::prelude::*;

use crate::blocking::BlockingIndex;
use crate::config::Role;
use crate::key::NormalizedKey;
use crate::model::{CandidateScope, MatchMethod, MatchResult, Record};
use crate::schema::ResolvedColumns;
use crate::similarity::Scorer;

/// Candidate pools above this size are narrowed by name initials in the
/// one-to-one strategy.
pub const INITIALS_BLOCKING_MIN: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct FuzzyOptions {
    pub threshold: u8,
    pub parallel: bool,
    pub progress_every: usize,
}

/// Row counter shared by workers; logs every `every` rows and at the end.
struct Progress {
    done: AtomicUsize,
    total: usize,
    every: usize,
}

impl Progress {
    fn new(total: usize, every: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            every: every.max(1),
        }
    }

    fn tick(&self) {
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.every == 0 || n == self.total {
            info!("processed {n}/{} rows ({}%)", self.total, 100 * n / self.total.max(1));
        }
    }
}

/// Highest-scoring candidate. The first candidate seeds the best and only a
/// strictly greater score replaces it, so ties keep the earliest row.
fn best_candidate<S, I>(
    scorer: &S,
    key: &NormalizedKey,
    reference: &[NormalizedKey],
    candidates: I,
) -> Option<(usize, u8)>
where
    S: Scorer + ?Sized,
    I: IntoIterator<Item = usize>,
{
    let mut best: Option<(usize, u8)> = None;
    for row in candidates {
        let score = scorer.score(key.as_str(), reference[row].as_str());
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((row, score)),
        }
        if score == 100 {
            break;
        }
    }
    best
}

fn decide(best: Option<(usize, u8)>, threshold: u8, scope: CandidateScope) -> MatchResult {
    match best {
        Some((row, score)) if score >= threshold => {
            MatchResult::linked(row, score, MatchMethod::Fuzzy, scope)
        }
        Some((_, score)) => MatchResult::unmatched(score, scope),
        None => MatchResult::unmatched(0, scope),
    }
}

fn match_one<S: Scorer + ?Sized>(
    scorer: &S,
    key: &NormalizedKey,
    reference: &[NormalizedKey],
    index: &BlockingIndex,
    threshold: u8,
) -> MatchResult {
    if key.is_blank() {
        if threshold > 0 {
            return MatchResult::unmatched(0, CandidateScope::Skipped);
        }
        // A blank key scores 0 against every row, so the first one wins
        let first = (!reference.is_empty()).then_some((0, 0));
        return decide(first, threshold, CandidateScope::Full);
    }
    let set = index.query(key);
    let best = match set.indices() {
        Some(rows) => best_candidate(scorer, key, reference, rows.iter().copied()),
        None => best_candidate(scorer, key, reference, 0..reference.len()),
    };
    decide(best, threshold, set.scope)
}

/// Best reference candidate per source key. Rows are independent, so the
/// parallel path yields the same results as the sequential one, in order.
pub fn match_fuzzy_name<S: Scorer + ?Sized>(
    scorer: &S,
    source: &[NormalizedKey],
    reference: &[NormalizedKey],
    index: &BlockingIndex,
    options: FuzzyOptions,
) -> Vec<MatchResult> {
    info!(
        "fuzzy match: {} source rows vs {} reference rows (threshold={}%, blocking {})",
        source.len(),
        reference.len(),
        options.threshold,
        if index.is_active() { "on" } else { "off" }
    );
    let progress = Progress::new(source.len(), options.progress_every);
    let run = |key: &NormalizedKey| {
        let result = match_one(scorer, key, reference, index, options.threshold);
        progress.tick();
        result
    };

    if options.parallel {
        source.par_iter().map(run).collect()
    } else {
        source.iter().map(run).collect()
    }
}

fn trimmed<'r>(record: &'r Record, columns: &ResolvedColumns, role: Role) -> Option<&'r str> {
    columns
        .value(record, role)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Exact identifier match. When several reference rows share an id, the
/// first one carrying an email wins, otherwise the first one.
pub fn match_exact_id(
    source: &[Record],
    source_columns: &ResolvedColumns,
    reference: &[Record],
    reference_columns: &ResolvedColumns,
) -> Vec<MatchResult> {
    let mut by_id: HashMap<&str, (usize, bool)> = HashMap::new();
    for (row, record) in reference.iter().enumerate() {
        let Some(id) = trimmed(record, reference_columns, Role::Id) else {
            continue;
        };
        let has_email = trimmed(record, reference_columns, Role::Email).is_some();
        by_id
            .entry(id)
            .and_modify(|winner| {
                if !winner.1 && has_email {
                    *winner = (row, true);
                }
            })
            .or_insert((row, has_email));
    }
    debug!("exact id index: {} distinct ids", by_id.len());

    let results: Vec<MatchResult> = source
        .iter()
        .map(|record| {
            match trimmed(record, source_columns, Role::Id).and_then(|id| by_id.get(id)) {
                Some(&(row, _)) => {
                    MatchResult::linked(row, 100, MatchMethod::Id, CandidateScope::Skipped)
                }
                None => MatchResult::unmatched(0, CandidateScope::Skipped),
            }
        })
        .collect();

    info!(
        "exact id match: {}/{} rows matched",
        results.iter().filter(|r| r.matched).count(),
        results.len()
    );
    results
}

fn normalized_email(record: &Record, columns: &ResolvedColumns) -> Option<String> {
    trimmed(record, columns, Role::Email).map(str::to_lowercase)
}

fn email_domain(email: &str) -> Option<&str> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|d| !d.is_empty())
}

/// Inputs of the one-to-one strategy for one side.
pub struct Roster<'a> {
    pub records: &'a [Record],
    pub columns: &'a ResolvedColumns,
    pub keys: &'a [NormalizedKey],
}

/// One-to-one matching. Each source row first looks for an unused reference
/// row with the same email, then fuzzy-matches against unused rows narrowed
/// by email domain and, for large pools, by name initials. Rows are processed
/// in order and a linked reference row is never offered again.
pub fn match_email_then_fuzzy<S: Scorer + ?Sized>(
    scorer: &S,
    source: Roster<'_>,
    reference: Roster<'_>,
    options: FuzzyOptions,
) -> Vec<MatchResult> {
    info!(
        "email-then-fuzzy match: {} source rows vs {} reference rows (threshold={}%)",
        source.records.len(),
        reference.records.len(),
        options.threshold
    );

    let ref_emails: Vec<Option<String>> = reference
        .records
        .iter()
        .map(|r| normalized_email(r, reference.columns))
        .collect();
    let mut by_email: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, email) in ref_emails.iter().enumerate() {
        if let Some(email) = email {
            by_email.entry(email.as_str()).or_default().push(row);
        }
    }

    let mut used = vec![false; reference.records.len()];
    let progress = Progress::new(source.records.len(), options.progress_every);
    let mut results = Vec::with_capacity(source.records.len());

    for (record, key) in source.records.iter().zip(source.keys) {
        let email = normalized_email(record, source.columns);

        let email_hit = email
            .as_deref()
            .and_then(|e| by_email.get(e))
            .and_then(|rows| rows.iter().copied().find(|&r| !used[r]));
        if let Some(row) = email_hit {
            used[row] = true;
            results.push(MatchResult::linked(
                row,
                100,
                MatchMethod::Email,
                CandidateScope::Skipped,
            ));
            progress.tick();
            continue;
        }

        if key.is_blank() && options.threshold > 0 {
            results.push(MatchResult::unmatched(0, CandidateScope::Skipped));
            progress.tick();
            continue;
        }

        let mut candidates: Vec<usize> = (0..used.len()).filter(|&r| !used[r]).collect();
        let mut narrowed = false;

        if let Some(domain) = email.as_deref().and_then(email_domain) {
            let same_domain: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&r| ref_emails[r].as_deref().and_then(email_domain) == Some(domain))
                .collect();
            if !same_domain.is_empty() {
                candidates = same_domain;
                narrowed = true;
            }
        }

        if candidates.len() > INITIALS_BLOCKING_MIN {
            if let Some(initials) = key.initials() {
                let same_initials: Vec<usize> = candidates
                    .iter()
                    .copied()
                    .filter(|&r| reference.keys[r].initials() == Some(initials))
                    .collect();
                if !same_initials.is_empty() {
                    candidates = same_initials;
                    narrowed = true;
                }
            }
        }

        let scope = if candidates.is_empty() {
            CandidateScope::Empty
        } else if narrowed {
            CandidateScope::Blocked
        } else {
            CandidateScope::Full
        };
        let result = decide(
            best_candidate(scorer, key, reference.keys, candidates),
            options.threshold,
            scope,
        );
        if let Some(row) = result.linked {
            used[row] = true;
        }
        results.push(result);
        progress.tick();
    }

    info!(
        "email-then-fuzzy match: {} by email, {} fuzzy, {} unmatched",
        results.iter().filter(|r| r.method == MatchMethod::Email).count(),
        results.iter().filter(|r| r.method == MatchMethod::Fuzzy).count(),
        results.iter().filter(|r| !r.matched).count()
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlockingConfig, MatchConfig, MatchStrategy, Side};
    use crate::model::Dataset;
    use crate::similarity::TokenSetRatio;

    fn k(first: &str, last: &str, company: &str) -> NormalizedKey {
        NormalizedKey::from_parts(first, last, company)
    }

    fn opts(threshold: u8) -> FuzzyOptions {
        FuzzyOptions {
            threshold,
            parallel: false,
            progress_every: 50,
        }
    }

    #[test]
    fn exact_key_matches_at_100() {
        let reference = vec![k("john", "smith", "tech"), k("jane", "doe", "acme")];
        let index = BlockingIndex::build(&reference, &BlockingConfig::default());
        let results = match_fuzzy_name(&TokenSetRatio, &[k("jane", "doe", "acme")], &reference, &index, opts(90));
        assert_eq!(results[0], MatchResult::linked(1, 100, MatchMethod::Fuzzy, CandidateScope::Full));
    }

    #[test]
    fn below_threshold_reports_best_score() {
        let reference = vec![k("jane", "doe", "acme")];
        let index = BlockingIndex::build(&reference, &BlockingConfig::default());
        let results = match_fuzzy_name(&TokenSetRatio, &[k("john", "smith", "tech")], &reference, &index, opts(90));
        assert!(!results[0].matched);
        assert_eq!(results[0].score, 21);
        assert_eq!(results[0].linked, None);
    }

    #[test]
    fn blank_key_skips_scoring() {
        let reference = vec![k("jane", "doe", "acme")];
        let index = BlockingIndex::build(&reference, &BlockingConfig::default());
        let results = match_fuzzy_name(&TokenSetRatio, &[k("", "", "")], &reference, &index, opts(1));
        assert_eq!(results[0], MatchResult::unmatched(0, CandidateScope::Skipped));
    }

    #[test]
    fn blank_key_at_threshold_zero_links_first_row() {
        let reference = vec![k("jane", "doe", "acme"), k("john", "smith", "tech")];
        let index = BlockingIndex::build(&reference, &BlockingConfig::default());
        let results = match_fuzzy_name(&TokenSetRatio, &[k("", "", "")], &reference, &index, opts(0));
        assert_eq!(results[0], MatchResult::linked(0, 0, MatchMethod::Fuzzy, CandidateScope::Full));

        let empty = BlockingIndex::build(&[], &BlockingConfig::default());
        let results = match_fuzzy_name(&TokenSetRatio, &[k("", "", "")], &[], &empty, opts(0));
        assert!(!results[0].matched);
        assert_eq!(results[0].score, 0);
    }

    #[test]
    fn ties_keep_first_reference_row() {
        let reference = vec![k("jane", "doe", "acme"), k("jane", "doe", "acme")];
        let index = BlockingIndex::build(&reference, &BlockingConfig::default());
        let results = match_fuzzy_name(&TokenSetRatio, &[k("doe", "jane", "acme")], &reference, &index, opts(90));
        assert_eq!(results[0].linked, Some(0));
    }

    #[test]
    fn threshold_zero_matches_any_candidate() {
        let reference = vec![k("zed", "zulu", "zeta")];
        let index = BlockingIndex::build(&reference, &BlockingConfig::default());
        let results = match_fuzzy_name(&TokenSetRatio, &[k("ann", "lee", "")], &reference, &index, opts(0));
        assert!(results[0].matched);
        assert_eq!(results[0].linked, Some(0));
    }

    #[test]
    fn parallel_matches_sequential() {
        let reference: Vec<NormalizedKey> = (0..40).map(|i| k("anna", &format!("lee{i}"), "acme")).collect();
        let source: Vec<NormalizedKey> = (0..25).map(|i| k("ana", &format!("lee{}", i * 3), "acme")).collect();
        let cfg = BlockingConfig {
            min_reference_size: 10,
            ..Default::default()
        };
        let index = BlockingIndex::build(&reference, &cfg);
        let seq = match_fuzzy_name(&TokenSetRatio, &source, &reference, &index, opts(80));
        let par = match_fuzzy_name(
            &TokenSetRatio,
            &source,
            &reference,
            &index,
            FuzzyOptions {
                parallel: true,
                ..opts(80)
            },
        );
        assert_eq!(seq, par);
    }

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        let mut ds = Dataset::new("t", headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            ds.push_row(row.iter().map(|v| Some(v.to_string())).collect());
        }
        ds
    }

    #[test]
    fn exact_id_prefers_row_with_email() {
        let config = MatchConfig {
            strategy: MatchStrategy::ExactId,
            ..Default::default()
        };
        let source = dataset(&["CRD"], &[&["111"], &[" 222 "], &["333"], &[""]]);
        let reference = dataset(
            &["CRD", "Email"],
            &[
                &["111", ""],
                &["111", "a@x.com"],
                &["222", "b@x.com"],
                &["222", "c@x.com"],
            ],
        );
        let sc = ResolvedColumns::resolve(&source, Side::Source, &config).unwrap();
        let rc = ResolvedColumns::resolve(&reference, Side::Reference, &config).unwrap();
        let results = match_exact_id(source.rows(), &sc, reference.rows(), &rc);

        assert_eq!(results[0].linked, Some(1));
        assert_eq!(results[1].linked, Some(2));
        assert_eq!(results[1].method, MatchMethod::Id);
        assert_eq!(results[1].score, 100);
        assert!(!results[2].matched);
        assert!(!results[3].matched);
    }

    fn email_side_fixture() -> (Dataset, Dataset, MatchConfig) {
        let config = MatchConfig {
            strategy: MatchStrategy::EmailThenFuzzy,
            threshold: 80,
            ..Default::default()
        };
        let source = dataset(
            &["First Name", "Last Name", "Email"],
            &[
                &["Jane", "Doe", "JANE@acme.com"],
                &["Jane", "Doe", "jane@acme.com"],
                &["Jon", "Smith", "jon@tech.io"],
            ],
        );
        let reference = dataset(
            &["First Name", "Last Name", "Email"],
            &[
                &["Jane", "Doe", "jane@acme.com"],
                &["John", "Smith", "other@tech.io"],
                &["Jane", "Doe", "j.doe@elsewhere.com"],
            ],
        );
        (source, reference, config)
    }

    #[test]
    fn email_then_fuzzy_is_one_to_one() {
        let (source, reference, config) = email_side_fixture();
        let normalizer = crate::normalize::Normalizer::new(&[]).unwrap();
        let sc = ResolvedColumns::resolve(&source, Side::Source, &config).unwrap();
        let rc = ResolvedColumns::resolve(&reference, Side::Reference, &config).unwrap();
        let sk = crate::key::KeyBuilder::new(&normalizer, &sc).build_all(source.rows());
        let rk = crate::key::KeyBuilder::new(&normalizer, &rc).build_all(reference.rows());

        let results = match_email_then_fuzzy(
            &TokenSetRatio,
            Roster { records: source.rows(), columns: &sc, keys: &sk },
            Roster { records: reference.rows(), columns: &rc, keys: &rk },
            opts(80),
        );

        // Email match is case-insensitive
        assert_eq!(results[0].method, MatchMethod::Email);
        assert_eq!(results[0].linked, Some(0));
        // Same email again: row 0 is used, falls through to fuzzy on row 2
        assert_eq!(results[1].method, MatchMethod::Fuzzy);
        assert_eq!(results[1].linked, Some(2));
        assert_eq!(results[1].score, 100);
        // Domain narrows to row 1
        assert_eq!(results[2].linked, Some(1));
        assert_eq!(results[2].scope, CandidateScope::Blocked);
    }

    fn email_then_fuzzy(source: &Dataset, reference: &Dataset, threshold: u8) -> Vec<MatchResult> {
        let config = MatchConfig {
            strategy: MatchStrategy::EmailThenFuzzy,
            threshold,
            ..Default::default()
        };
        let normalizer = crate::normalize::Normalizer::new(&[]).unwrap();
        let sc = ResolvedColumns::resolve(source, Side::Source, &config).unwrap();
        let rc = ResolvedColumns::resolve(reference, Side::Reference, &config).unwrap();
        let sk = crate::key::KeyBuilder::new(&normalizer, &sc).build_all(source.rows());
        let rk = crate::key::KeyBuilder::new(&normalizer, &rc).build_all(reference.rows());
        match_email_then_fuzzy(
            &TokenSetRatio,
            Roster { records: source.rows(), columns: &sc, keys: &sk },
            Roster { records: reference.rows(), columns: &rc, keys: &rk },
            opts(threshold),
        )
    }

    /// `rows` filler contacts, with the given rows overridden.
    fn pool(rows: usize, overrides: &[(usize, &str, &str)]) -> Dataset {
        let mut ds = Dataset::new("ref", vec!["First Name".into(), "Last Name".into(), "Email".into()]);
        for i in 0..rows {
            let (first, last) = overrides
                .iter()
                .find(|(row, ..)| *row == i)
                .map(|&(_, f, l)| (f.to_string(), l.to_string()))
                .unwrap_or_else(|| ("Mark".into(), format!("Nolan{i}")));
            ds.push_row(vec![Some(first), Some(last), None]);
        }
        ds
    }

    fn jane_doe() -> Dataset {
        dataset(&["First Name", "Last Name", "Email"], &[&["Jane", "Doe", ""]])
    }

    #[test]
    fn email_then_fuzzy_narrows_large_pool_by_initials() {
        // "Doe Jane" has the same tokens (100) but initials d/j; only "Jane Dow" shares j/d
        let reference = pool(120, &[(5, "Doe", "Jane"), (100, "Jane", "Dow")]);
        let results = email_then_fuzzy(&jane_doe(), &reference, 80);
        assert_eq!(results[0].linked, Some(100));
        assert_eq!(results[0].score, 88);
        assert_eq!(results[0].method, MatchMethod::Fuzzy);
        assert_eq!(results[0].scope, CandidateScope::Blocked);
    }

    #[test]
    fn email_then_fuzzy_keeps_pool_when_no_initials_match() {
        let reference = pool(120, &[(5, "Doe", "Jane")]);
        let results = email_then_fuzzy(&jane_doe(), &reference, 80);
        assert_eq!(results[0].linked, Some(5));
        assert_eq!(results[0].score, 100);
        assert_eq!(results[0].scope, CandidateScope::Full);
    }

    #[test]
    fn email_then_fuzzy_small_pool_is_not_narrowed() {
        let reference = pool(60, &[(5, "Doe", "Jane"), (40, "Jane", "Dow")]);
        let results = email_then_fuzzy(&jane_doe(), &reference, 80);
        assert_eq!(results[0].linked, Some(5));
        assert_eq!(results[0].scope, CandidateScope::Full);
    }

    #[test]
    fn email_then_fuzzy_blank_key_at_threshold_zero() {
        let source = dataset(&["First Name", "Last Name", "Email"], &[&["", "", ""]]);
        let reference = pool(3, &[]);
        assert_eq!(email_then_fuzzy(&source, &reference, 0)[0].linked, Some(0));
        let skipped = email_then_fuzzy(&source, &reference, 1);
        assert_eq!(skipped[0], MatchResult::unmatched(0, CandidateScope::Skipped));
    }

    #[test]
    fn email_domain_parsing() {
        assert_eq!(email_domain("a@b.com"), Some("b.com"));
        assert_eq!(email_domain("nobody"), None);
        assert_eq!(email_domain("trailing@"), None);
    }
}
