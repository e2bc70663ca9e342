//! `rostermatch-io` — tabular file I/O for contact rosters.
//!
//! Reads CSV/TSV (delimiter sniffing, Windows-1252 fallback) and Excel
//! workbooks into [`Dataset`]s, and writes annotated [`OutputTable`]s back
//! out as CSV or xlsx.

pub mod csv;
pub mod error;
pub mod schema;
pub mod xlsx;

use std::path::{Path, PathBuf};

use log::info;
use rostermatch_recon::config::DatasetConfig;
use rostermatch_recon::model::{Dataset, OutputTable};

pub use error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv" | "tsv" | "txt") => Ok(Self::Csv),
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => Ok(Self::Excel),
            _ => Err(IoError::Unsupported {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Sheet selection for workbook inputs. Ignored for CSV.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions<'a> {
    pub sheet: Option<&'a str>,
    pub sheets: &'a [String],
    pub sheet_column: &'a str,
}

impl<'a> From<&'a DatasetConfig> for ReadOptions<'a> {
    fn from(config: &'a DatasetConfig) -> Self {
        Self {
            sheet: config.sheet.as_deref(),
            sheets: &config.sheets,
            sheet_column: &config.sheet_column,
        }
    }
}

pub(crate) fn dataset_name(path: &Path, sheet: Option<&str>) -> String {
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match sheet {
        Some(sheet) => format!("{file}[{sheet}]"),
        None => file,
    }
}

/// Load a dataset from a CSV or Excel file.
pub fn read_dataset(path: &Path, options: &ReadOptions<'_>) -> Result<Dataset, IoError> {
    if !path.is_file() {
        return Err(IoError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let dataset = match FileKind::from_path(path)? {
        FileKind::Csv => crate::csv::read(path)?,
        FileKind::Excel => xlsx::read(path, options)?,
    };
    info!(
        "loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.headers.len(),
        dataset.name
    );
    Ok(dataset)
}

/// Write output tables. Returns every file written.
pub fn write_tables(path: &Path, tables: &[OutputTable]) -> Result<Vec<PathBuf>, IoError> {
    let written = match FileKind::from_path(path)? {
        FileKind::Csv => crate::csv::write(path, tables)?,
        FileKind::Excel => {
            xlsx::write(path, tables)?;
            vec![path.to_path_buf()]
        }
    };
    for p in &written {
        info!("wrote {}", p.display());
    }
    Ok(written)
}
