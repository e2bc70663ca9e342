use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (threshold out of range, empty alias list, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// No alias in a role's alias list names a column of the dataset.
    #[error(
        "{dataset} dataset: cannot resolve role '{role}' (tried {tried:?}; available columns {found:?})"
    )]
    UnresolvedRole {
        role: String,
        dataset: String,
        tried: Vec<String>,
        found: Vec<String>,
    },

    /// Tabular data could not be parsed.
    #[error("IO error: {0}")]
    Io(String),
}
