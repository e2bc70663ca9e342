//! Field normalization: the canonical comparable form of a name or company.

use regex::Regex;

use crate::error::ReconError;

/// Lowercase, trim, and collapse internal whitespace runs to one space.
/// Absent input normalizes to the empty string.
pub fn normalize_field(raw: Option<&str>) -> String {
    match raw {
        Some(s) => collapse_whitespace(&s.to_lowercase()),
        None => String::new(),
    }
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Company normalizer. Holds the compiled suffix pattern so it is built once
/// per run.
#[derive(Debug, Clone)]
pub struct Normalizer {
    punctuation: Regex,
    suffixes: Option<Regex>,
}

impl Normalizer {
    pub fn new(suffixes: &[String]) -> Result<Self, ReconError> {
        let punctuation = Regex::new(r"[^\w\s]")
            .map_err(|e| ReconError::ConfigValidation(format!("punctuation pattern: {e}")))?;

        let alternatives: Vec<String> = suffixes
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| regex::escape(&s))
            .collect();

        let suffixes = if alternatives.is_empty() {
            None
        } else {
            let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
            Some(Regex::new(&pattern).map_err(|e| {
                ReconError::ConfigValidation(format!("company suffix pattern: {e}"))
            })?)
        };

        Ok(Self {
            punctuation,
            suffixes,
        })
    }

    pub fn normalize_name(&self, raw: Option<&str>) -> String {
        normalize_field(raw)
    }

    /// Lowercase, turn punctuation into spaces, drop standalone suffix
    /// tokens, then collapse whitespace.
    pub fn normalize_company(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return String::new();
        };
        let lowered = raw.to_lowercase();
        let spaced = self.punctuation.replace_all(&lowered, " ");
        let stripped = match self.suffixes {
            Some(ref re) => re.replace_all(&spaced, " ").into_owned(),
            None => spaced.into_owned(),
        };
        collapse_whitespace(&stripped)
    }
}
