// Dataset schema extraction: column names, inferred types, a row sample

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use rostermatch_recon::model::Dataset;
use serde::Serialize;

use crate::error::IoError;

/// Rows copied into the sample CSV.
pub const SAMPLE_ROWS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Empty,
    Integer,
    Float,
    Bool,
    String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSchema {
    pub source_file: String,
    pub sheet: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub dtypes: BTreeMap<String, ColumnType>,
}

#[derive(Debug, Clone)]
pub struct SchemaFiles {
    pub schema: PathBuf,
    pub sample: PathBuf,
}

/// Narrowest type every non-empty value of a column parses as.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen = false;
    let (mut int, mut float, mut boolean) = (true, true, true);
    for value in values.into_iter().flatten() {
        let v = value.trim();
        if v.is_empty() {
            continue;
        }
        seen = true;
        int &= v.parse::<i64>().is_ok();
        float &= v.parse::<f64>().is_ok();
        boolean &= v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false");
    }
    match (seen, int, float, boolean) {
        (false, ..) => ColumnType::Empty,
        (_, true, ..) => ColumnType::Integer,
        (_, _, true, _) => ColumnType::Float,
        (_, _, _, true) => ColumnType::Bool,
        _ => ColumnType::String,
    }
}

pub fn infer_schema(dataset: &Dataset, source_file: &Path, sheet: Option<&str>) -> DatasetSchema {
    let dtypes = dataset
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let ty = infer_column_type(dataset.rows().iter().map(|r| r.get(i)));
            (h.clone(), ty)
        })
        .collect();

    DatasetSchema {
        source_file: source_file.display().to_string(),
        sheet: sheet.map(String::from),
        row_count: dataset.len(),
        column_count: dataset.headers.len(),
        columns: dataset.headers.clone(),
        dtypes,
    }
}

/// Write `<stem>_schema.json` and `<stem>_sample.csv` into `out_dir`.
pub fn write_schema(
    dataset: &Dataset,
    source_file: &Path,
    sheet: Option<&str>,
    out_dir: &Path,
) -> Result<SchemaFiles, IoError> {
    let stem = source_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".into());
    let files = SchemaFiles {
        schema: out_dir.join(format!("{stem}_schema.json")),
        sample: out_dir.join(format!("{stem}_sample.csv")),
    };

    let schema = infer_schema(dataset, source_file, sheet);
    let json = serde_json::to_string_pretty(&schema).map_err(|e| IoError::Write {
        path: files.schema.clone(),
        message: e.to_string(),
    })?;
    let sample_rows = dataset.rows().iter().take(SAMPLE_ROWS).map(|r| {
        r.values()
            .iter()
            .map(|v| v.clone().unwrap_or_default())
            .collect::<Vec<String>>()
    });
    let sample = crate::csv::render(&dataset.headers, sample_rows).map_err(|message| IoError::Write {
        path: files.sample.clone(),
        message,
    })?;

    let write = |path: &Path, bytes: &[u8]| {
        std::fs::write(path, bytes).map_err(|e| IoError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    };
    std::fs::create_dir_all(out_dir).map_err(|e| IoError::Write {
        path: out_dir.to_path_buf(),
        message: e.to_string(),
    })?;
    write(&files.schema, json.as_bytes())?;
    write(&files.sample, &sample)?;

    info!(
        "wrote schema to {} and sample to {}",
        files.schema.display(),
        files.sample.display()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn infers_types() {
        assert_eq!(infer_column_type([Some("1"), None, Some("-20")]), ColumnType::Integer);
        assert_eq!(infer_column_type([Some("1.5"), Some("2")]), ColumnType::Float);
        assert_eq!(infer_column_type([Some("TRUE"), Some("false")]), ColumnType::Bool);
        assert_eq!(infer_column_type([Some("Jane"), Some("2")]), ColumnType::String);
        assert_eq!(infer_column_type([None, Some("  ")]), ColumnType::Empty);
    }

    #[test]
    fn writes_schema_and_capped_sample() {
        let dir = tempdir().unwrap();
        let mut ds = Dataset::new("advisors", vec!["Name".into(), "CRD".into(), "Notes".into()]);
        for i in 0..150 {
            ds.push_row(vec![Some(format!("Rep {i}")), Some(i.to_string()), None]);
        }

        let out = dir.path().join("schema");
        let files = write_schema(&ds, Path::new("data/advisors.xlsx"), Some("Sheet1"), &out).unwrap();
        assert_eq!(files.schema, out.join("advisors_schema.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.schema).unwrap()).unwrap();
        assert_eq!(json["row_count"], 150);
        assert_eq!(json["column_count"], 3);
        assert_eq!(json["sheet"], "Sheet1");
        assert_eq!(json["dtypes"]["CRD"], "integer");
        assert_eq!(json["dtypes"]["Notes"], "empty");

        let sample = std::fs::read_to_string(&files.sample).unwrap();
        assert_eq!(sample.lines().count(), SAMPLE_ROWS + 1);
        assert!(sample.starts_with("Name,CRD,Notes\nRep 0,0,\n"));
    }
}
