use crate::config::Role;
use crate::model::Record;
use crate::normalize::{collapse_whitespace, Normalizer};
use crate::schema::ResolvedColumns;

/// Composite matching key: `"{first} {last} | {company}"`, lowercase,
/// whitespace-collapsed, company suffixes stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    text: String,
    blank: bool,
    first_initial: Option<char>,
    last_initial: Option<char>,
}

impl NormalizedKey {
    pub fn from_parts(first: &str, last: &str, company: &str) -> Self {
        let name = collapse_whitespace(&format!("{first} {last}"));
        let blank = name.is_empty() && company.is_empty();
        Self {
            text: collapse_whitespace(&format!("{name} | {company}")),
            blank,
            first_initial: first.chars().next(),
            last_initial: last.chars().next(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when name and company were all empty.
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    pub fn first_char(&self) -> Option<char> {
        self.text.chars().next()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// First letters of first and last name, when both are present.
    pub fn initials(&self) -> Option<(char, char)> {
        Some((self.first_initial?, self.last_initial?))
    }
}

impl std::fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Builds keys for one dataset from its resolved columns.
pub struct KeyBuilder<'a> {
    normalizer: &'a Normalizer,
    columns: &'a ResolvedColumns,
}

impl<'a> KeyBuilder<'a> {
    pub fn new(normalizer: &'a Normalizer, columns: &'a ResolvedColumns) -> Self {
        Self { normalizer, columns }
    }

    pub fn build(&self, record: &Record) -> NormalizedKey {
        let first = self
            .normalizer
            .normalize_name(self.columns.value(record, Role::FirstName));
        let last = self
            .normalizer
            .normalize_name(self.columns.value(record, Role::LastName));
        let company = self
            .normalizer
            .normalize_company(self.columns.value(record, Role::Company));
        NormalizedKey::from_parts(&first, &last, &company)
    }

    pub fn build_all(&self, records: &[Record]) -> Vec<NormalizedKey> {
        records.iter().map(|r| self.build(r)).collect()
    }
}
