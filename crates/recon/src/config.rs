use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// Company suffixes stripped as whole words by the normalizer.
pub const DEFAULT_COMPANY_SUFFIXES: &[&str] = &[
    "inc",
    "llc",
    "ltd",
    "co",
    "corp",
    "corporation",
    "pllc",
    "pc",
    "gmbh",
    "ag",
    "bv",
    "sa",
    "sarl",
    "sas",
    "pte",
    "pty",
    "limited",
    "group",
    "investment",
];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Immutable run configuration. Built once at startup and passed explicitly
/// into the engine; nothing downstream reads the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Minimum score (0-100, inclusive) for a match.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default)]
    pub strategy: MatchStrategy,
    #[serde(default)]
    pub scorer: ScorerKind,
    /// Run the per-row matching loop on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
    /// Log a progress line every N processed source rows.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub source: DatasetConfig,
    #[serde(default)]
    pub reference: DatasetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub partition: Option<PartitionConfig>,
}

fn default_name() -> String {
    "contact match".into()
}

fn default_threshold() -> u8 {
    90
}

fn default_progress_every() -> usize {
    50
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            threshold: default_threshold(),
            strategy: MatchStrategy::default(),
            scorer: ScorerKind::default(),
            parallel: false,
            progress_every: default_progress_every(),
            normalize: NormalizeConfig::default(),
            blocking: BlockingConfig::default(),
            source: DatasetConfig::default(),
            reference: DatasetConfig::default(),
            output: OutputConfig::default(),
            partition: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy + scorer selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Blocking + token-set similarity on the composite name/company key.
    #[default]
    FuzzyName,
    /// Exact match on an identifier column (e.g. a CRD number).
    ExactId,
    /// One-to-one: exact email first, then fuzzy name over unused rows.
    EmailThenFuzzy,
}

impl MatchStrategy {
    /// Roles that must resolve on both datasets for this strategy to run.
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            Self::FuzzyName | Self::EmailThenFuzzy => &[Role::FirstName, Role::LastName],
            Self::ExactId => &[Role::Id],
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FuzzyName => write!(f, "fuzzy_name"),
            Self::ExactId => write!(f, "exact_id"),
            Self::EmailThenFuzzy => write!(f, "email_then_fuzzy"),
        }
    }
}

/// Similarity implementation, selected once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    #[default]
    TokenSet,
    TokenSetFast,
}

// ---------------------------------------------------------------------------
// Normalization + blocking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default = "default_suffixes")]
    pub company_suffixes: Vec<String>,
}

fn default_suffixes() -> Vec<String> {
    DEFAULT_COMPANY_SUFFIXES.iter().map(|s| s.to_string()).collect()
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            company_suffixes: default_suffixes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockingConfig {
    /// Reference sets at or below this size are always scanned in full.
    #[serde(default = "default_min_reference_size")]
    pub min_reference_size: usize,
    /// Allowed relative key-length difference (0.30 = ±30%).
    #[serde(default = "default_length_tolerance")]
    pub length_tolerance: f64,
    /// Width of the key-length bands used as part of the bucket signature.
    #[serde(default = "default_bucket_width")]
    pub bucket_width: usize,
    #[serde(default)]
    pub fallback: BlockingFallback,
}

fn default_min_reference_size() -> usize {
    500
}

fn default_length_tolerance() -> f64 {
    0.30
}

fn default_bucket_width() -> usize {
    4
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            min_reference_size: default_min_reference_size(),
            length_tolerance: default_length_tolerance(),
            bucket_width: default_bucket_width(),
            fallback: BlockingFallback::default(),
        }
    }
}

/// What to do when a blocked query finds no candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingFallback {
    /// Scan the whole reference set.
    #[default]
    FullScan,
    /// Report no candidates; the row is unmatched with score 0.
    Strict,
}

// ---------------------------------------------------------------------------
// Datasets + column roles
// ---------------------------------------------------------------------------

/// Logical column roles resolved through alias lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    FirstName,
    LastName,
    Company,
    Email,
    Id,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::FirstName,
        Role::LastName,
        Role::Company,
        Role::Email,
        Role::Id,
    ];

    fn default_aliases(&self, side: Side) -> &'static [&'static str] {
        match (self, side) {
            (Self::FirstName, Side::Source) => &["First_Name_", "First Name", "First name", "First"],
            (Self::FirstName, Side::Reference) => &["First Name", "First name", "First", "First_Name_"],
            (Self::LastName, Side::Source) => &["Last_Name_", "Last Name", "Last name", "Last"],
            (Self::LastName, Side::Reference) => {
                &["Last Name", "Last name", "Last", "Last_Name_", "Last Name "]
            }
            (Self::Company, Side::Source) => {
                &["Business_Name", "Business Name", "Company", "Company Name"]
            }
            (Self::Company, Side::Reference) => {
                &["Company Name", "Company", "Business_Name", "Business Name"]
            }
            (Self::Email, Side::Source) => {
                &["Email_Address", "Email", "Email Address", "EmailAddress", "Email_"]
            }
            (Self::Email, Side::Reference) => {
                &["Email_", "Email", "Email Address", "Email_Address", "EmailAddress"]
            }
            (Self::Id, Side::Source) => &["Matched_CRD", "MatchedRepCRD", "CRD", "Rep_CRD"],
            (Self::Id, Side::Reference) => {
                &["CRD", "Rep_CRD", "RepCRD", "MatchedRepCRD", "Matched_CRD"]
            }
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstName => write!(f, "first_name"),
            Self::LastName => write!(f, "last_name"),
            Self::Company => write!(f, "company"),
            Self::Email => write!(f, "email"),
            Self::Id => write!(f, "id"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Reference,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Sheet to read from a workbook (first sheet when unset).
    #[serde(default)]
    pub sheet: Option<String>,
    /// Several sheets stacked into one dataset; each row is tagged with its
    /// sheet name in `sheet_column`.
    #[serde(default)]
    pub sheets: Vec<String>,
    #[serde(default = "default_sheet_column")]
    pub sheet_column: String,
    #[serde(default)]
    pub columns: ColumnAliases,
}

fn default_sheet_column() -> String {
    "Source_Sheet".into()
}

/// Ordered candidate header names per role. Unset roles use the built-in
/// alias list for the dataset's side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnAliases {
    #[serde(default)]
    pub first_name: Option<Vec<String>>,
    #[serde(default)]
    pub last_name: Option<Vec<String>>,
    #[serde(default)]
    pub company: Option<Vec<String>>,
    #[serde(default)]
    pub email: Option<Vec<String>>,
    #[serde(default)]
    pub id: Option<Vec<String>>,
}

impl ColumnAliases {
    fn configured(&self, role: Role) -> Option<&Vec<String>> {
        match role {
            Role::FirstName => self.first_name.as_ref(),
            Role::LastName => self.last_name.as_ref(),
            Role::Company => self.company.as_ref(),
            Role::Email => self.email.as_ref(),
            Role::Id => self.id.as_ref(),
        }
    }

    /// Alias list for `role`, falling back to the side's defaults.
    pub fn aliases(&self, role: Role, side: Side) -> Vec<String> {
        match self.configured(role) {
            Some(list) => list.clone(),
            None => role
                .default_aliases(side)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output + partition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Prefix for reference columns copied onto matched rows.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_matched_column")]
    pub matched_column: String,
    #[serde(default = "default_score_column")]
    pub score_column: String,
    /// Emitted only for strategies that mix match methods.
    #[serde(default = "default_method_column")]
    pub method_column: String,
}

fn default_prefix() -> String {
    "Adv_".into()
}

fn default_matched_column() -> String {
    "Matched".into()
}

fn default_score_column() -> String {
    "Match_Score".into()
}

fn default_method_column() -> String {
    "Match_Method".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: None,
            prefix: default_prefix(),
            matched_column: default_matched_column(),
            score_column: default_score_column(),
            method_column: default_method_column(),
        }
    }
}

/// Post-match split of source rows by an externally supplied discovery flag.
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionConfig {
    /// Alias list for the flag column on the source dataset.
    pub column: Vec<String>,
    /// Flag values (case-insensitive, trimmed) that put a row in the "in" group.
    #[serde(default = "default_true_values")]
    pub true_values: Vec<String>,
    #[serde(default = "default_in_label")]
    pub in_label: String,
    #[serde(default = "default_out_label")]
    pub out_label: String,
}

fn default_true_values() -> Vec<String> {
    ["true", "yes", "y", "1", "x"].iter().map(|s| s.to_string()).collect()
}

fn default_in_label() -> String {
    "in discovery".into()
}

fn default_out_label() -> String {
    "not in discovery".into()
}

impl PartitionConfig {
    pub fn is_in(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let value = value.trim();
        self.true_values.iter().any(|t| t.trim().eq_ignore_ascii_case(value))
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_file: Option<PathBuf>,
    pub reference_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub threshold: Option<u8>,
    pub parallel: Option<bool>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn dataset(&self, side: Side) -> &DatasetConfig {
        match side {
            Side::Source => &self.source,
            Side::Reference => &self.reference,
        }
    }

    /// Make relative file paths relative to `base_dir` (the config file's directory).
    pub fn resolve_paths(mut self, base_dir: &Path) -> Self {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = base_dir.join(&*path);
                }
            }
        };
        rebase(&mut self.source.file);
        rebase(&mut self.reference.file);
        rebase(&mut self.output.file);
        self
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, ReconError> {
        if let Some(path) = overrides.source_file {
            self.source.file = Some(path);
        }
        if let Some(path) = overrides.reference_file {
            self.reference.file = Some(path);
        }
        if let Some(path) = overrides.output_file {
            self.output.file = Some(path);
        }
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(parallel) = overrides.parallel {
            self.parallel = parallel;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.threshold > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "threshold must be between 0 and 100, got {}",
                self.threshold
            )));
        }

        if self.progress_every == 0 {
            return Err(ReconError::ConfigValidation(
                "progress_every must be at least 1".into(),
            ));
        }

        let tol = self.blocking.length_tolerance;
        if !(tol > 0.0 && tol <= 1.0) {
            return Err(ReconError::ConfigValidation(format!(
                "blocking.length_tolerance must be in (0, 1], got {tol}"
            )));
        }

        if self.blocking.bucket_width == 0 {
            return Err(ReconError::ConfigValidation(
                "blocking.bucket_width must be at least 1".into(),
            ));
        }

        if self.output.prefix.is_empty() {
            return Err(ReconError::ConfigValidation(
                "output.prefix must not be empty".into(),
            ));
        }

        for side in [Side::Source, Side::Reference] {
            for role in Role::ALL {
                if let Some(list) = self.dataset(side).columns.configured(role) {
                    if list.is_empty() {
                        return Err(ReconError::ConfigValidation(format!(
                            "{side}.columns.{role}: alias list is empty"
                        )));
                    }
                }
            }
        }

        if let Some(ref partition) = self.partition {
            if partition.column.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "partition.column: alias list is empty".into(),
                ));
            }
            if partition.in_label == partition.out_label {
                return Err(ReconError::ConfigValidation(format!(
                    "partition labels must differ, both are '{}'",
                    partition.in_label
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
