// CSV/TSV import/export

use std::io::Read;
use std::path::{Path, PathBuf};

use log::debug;
use rostermatch_recon::engine::load_csv_dataset;
use rostermatch_recon::model::{CellValue, Dataset, OutputTable};
use rostermatch_recon::ReconError;

use crate::error::IoError;

pub fn read(path: &Path) -> Result<Dataset, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = if has_extension(path, "tsv") {
        b'\t'
    } else {
        sniff_delimiter(&content)
    };
    debug!("{}: delimiter {:?}", path.display(), delimiter as char);
    read_from_string(path, &content, delimiter)
}

fn read_from_string(path: &Path, content: &str, delimiter: u8) -> Result<Dataset, IoError> {
    load_csv_dataset(&crate::dataset_name(path, None), content, delimiter).map_err(|e| IoError::Csv {
        path: path.to_path_buf(),
        message: match e {
            ReconError::Io(message) => message,
            other => other.to_string(),
        },
    })
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |e: std::io::Error| IoError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            // Excel-exported CSVs are commonly Windows-1252
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            debug!("{}: not UTF-8, decoded as Windows-1252", path.display());
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Serialize a header row and records to CSV bytes.
pub fn render<I>(headers: &[String], rows: I) -> Result<Vec<u8>, String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(headers).map_err(|e| e.to_string())?;
    for row in rows {
        writer.write_record(&row).map_err(|e| e.to_string())?;
    }
    writer.into_inner().map_err(|e| e.to_string())
}

fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Bool(true) => "True".into(),
        CellValue::Bool(false) => "False".into(),
        other => other.to_string(),
    }
}

/// Lowercase label with runs of non-alphanumerics collapsed to `_`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// Target path for each table: `path` itself for a single table, otherwise
/// `<stem>.<label>.csv` next to it.
pub fn table_paths(path: &Path, tables: &[OutputTable]) -> Vec<PathBuf> {
    if tables.len() == 1 {
        return vec![path.to_path_buf()];
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    tables
        .iter()
        .map(|t| path.with_file_name(format!("{stem}.{}.csv", slugify(&t.name))))
        .collect()
}

/// Write each table as CSV. Everything is rendered before the first file is
/// created.
pub fn write(path: &Path, tables: &[OutputTable]) -> Result<Vec<PathBuf>, IoError> {
    let paths = table_paths(path, tables);
    let mut rendered = Vec::with_capacity(tables.len());
    for (table, target) in tables.iter().zip(&paths) {
        let rows = table.rows.iter().map(|r| r.iter().map(cell_text).collect());
        let bytes = render(&table.headers, rows).map_err(|message| IoError::Write {
            path: target.clone(),
            message,
        })?;
        rendered.push(bytes);
    }

    for (bytes, target) in rendered.iter().zip(&paths) {
        std::fs::write(target, bytes).map_err(|e| IoError::Write {
            path: target.clone(),
            message: e.to_string(),
        })?;
    }
    Ok(paths)
}
