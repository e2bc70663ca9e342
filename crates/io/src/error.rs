use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("invalid CSV in {}: {message}", path.display())]
    Csv { path: PathBuf, message: String },

    #[error("cannot read workbook {}: {message}", path.display())]
    Excel { path: PathBuf, message: String },

    #[error("{}: sheet '{sheet}' not found (available: {available:?})", path.display())]
    MissingSheet {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    #[error("cannot write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    #[error("unsupported file type: {} (expected .csv, .tsv, .txt, .xlsx, .xlsm, .xls, .xlsb or .ods)", path.display())]
    Unsupported { path: PathBuf },
}

impl IoError {
    /// True for errors caused by the input location rather than its content.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Read { .. } | Self::Unsupported { .. })
    }
}
