use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::MatchStrategy;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One row of a dataset. Values are positional, aligned with the owning
/// dataset's headers; `None` is an absent/blank cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<Option<String>>,
}

impl Record {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }
}

/// A loaded table: header row plus immutable records.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub headers: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating to the header width. Blank
    /// strings are stored as absent.
    pub fn push_row(&mut self, values: Vec<Option<String>>) {
        let mut values: Vec<Option<String>> = values
            .into_iter()
            .map(|v| v.filter(|s| !s.is_empty()))
            .collect();
        values.resize(self.headers.len(), None);
        self.rows.push(Record { values });
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// Source roster + reference contact list for one run.
#[derive(Debug)]
pub struct ReconInput {
    pub source: Dataset,
    pub reference: Dataset,
}

// ---------------------------------------------------------------------------
// Match decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Fuzzy,
    Id,
    Email,
    None,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Id => write!(f, "id"),
            Self::Email => write!(f, "email"),
            Self::None => write!(f, "none"),
        }
    }
}

/// How the candidate set for a row was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateScope {
    /// Reference set small enough to scan in full.
    Full,
    /// Candidates came from the blocking index.
    Blocked,
    /// Blocking found nothing; the full reference set was scanned.
    Fallback,
    /// Blocking found nothing and the strict policy kept it that way.
    Empty,
    /// No scoring happened (blank key, exact-id or email decision).
    Skipped,
}

/// Decision for one source row. Built exactly once per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    /// 0-100, best score over the candidates considered.
    pub score: u8,
    /// Index of the linked reference row; set only when `matched`.
    pub linked: Option<usize>,
    pub method: MatchMethod,
    pub scope: CandidateScope,
}

impl MatchResult {
    pub fn unmatched(score: u8, scope: CandidateScope) -> Self {
        Self {
            matched: false,
            score,
            linked: None,
            method: MatchMethod::None,
            scope,
        }
    }

    pub fn linked(reference_row: usize, score: u8, method: MatchMethod, scope: CandidateScope) -> Self {
        Self {
            matched: true,
            score,
            linked: Some(reference_row),
            method,
            scope,
        }
    }
}

// ---------------------------------------------------------------------------
// Output tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Bool(bool),
    Int(i64),
}

impl CellValue {
    pub fn from_opt(value: Option<&str>) -> Self {
        match value {
            Some(s) => Self::Text(s.to_string()),
            None => Self::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// An annotated output table (one per partition).
#[derive(Debug, Clone)]
pub struct OutputTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub label: String,
    pub rows: usize,
    pub matched: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub reference_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub match_rate: f64,
    pub by_method: BTreeMap<String, usize>,
    pub blocked_rows: usize,
    pub fallback_rows: usize,
    pub partitions: Vec<PartitionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub strategy: MatchStrategy,
    pub threshold: u8,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub summary: RunSummary,
}

/// Everything a run produces. Only the report is serialized.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub report: RunReport,
    pub results: Vec<MatchResult>,
    pub tables: Vec<OutputTable>,
}
