// Excel import (xlsx, xls, xlsb, ods) and export (xlsx only)

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader, Sheets};
use chrono::NaiveTime;
use log::{debug, info};
use rostermatch_recon::model::{CellValue, Dataset, OutputTable};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::IoError;
use crate::ReadOptions;

/// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

/// Cell text as the matcher sees it. Whole floats print without decimals so
/// numeric ids read back as `12345`, not `12345.0`.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(n) => Some(if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", *n as i64)
        } else {
            format!("{}", n)
        }),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Some(format!("#{:?}", e)),
        Data::DateTime(dt) => Some(datetime_text(dt)),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

/// ISO date (`2024-07-15`) or date-time (`2024-07-15T09:30:00`). Durations
/// and serials outside the calendar stay numeric.
fn datetime_text(dt: &ExcelDateTime) -> String {
    match dt.as_datetime() {
        Some(value) if !dt.is_duration() => {
            if value.time() == NaiveTime::MIN {
                value.format("%Y-%m-%d").to_string()
            } else {
                value.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
        }
        _ => dt.as_f64().to_string(),
    }
}

type SheetRows = (Vec<String>, Vec<Vec<Option<String>>>);

fn read_sheet<R>(workbook: &mut Sheets<R>, path: &Path, sheet: &str) -> Result<SheetRows, IoError>
where
    R: std::io::Read + std::io::Seek,
{
    let range = workbook.worksheet_range(sheet).map_err(|e| IoError::Excel {
        path: path.to_path_buf(),
        message: format!("sheet '{sheet}': {e}"),
    })?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|c| cell_to_string(c).unwrap_or_default().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let records: Vec<Vec<Option<String>>> = rows
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty())))
        .collect();

    debug!("{}: sheet '{sheet}' has {} data rows", path.display(), records.len());
    Ok((headers, records))
}

fn check_sheet(path: &Path, available: &[String], sheet: &str) -> Result<(), IoError> {
    if available.iter().any(|s| s == sheet) {
        Ok(())
    } else {
        Err(IoError::MissingSheet {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
            available: available.to_vec(),
        })
    }
}

/// Read one sheet, or stack several sheets into one dataset when
/// `options.sheets` is set.
pub fn read(path: &Path, options: &ReadOptions<'_>) -> Result<Dataset, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::Excel {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let available: Vec<String> = workbook.sheet_names().to_vec();
    if available.is_empty() {
        return Err(IoError::Excel {
            path: path.to_path_buf(),
            message: "workbook contains no sheets".into(),
        });
    }

    if !options.sheets.is_empty() {
        return read_stacked(&mut workbook, path, &available, options);
    }

    let sheet = match options.sheet {
        Some(name) => {
            check_sheet(path, &available, name)?;
            name.to_string()
        }
        None => available[0].clone(),
    };
    let (headers, records) = read_sheet(&mut workbook, path, &sheet)?;
    let mut dataset = Dataset::new(crate::dataset_name(path, Some(&sheet)), headers);
    for record in records {
        dataset.push_row(record);
    }
    Ok(dataset)
}

fn read_stacked<R>(
    workbook: &mut Sheets<R>,
    path: &Path,
    available: &[String],
    options: &ReadOptions<'_>,
) -> Result<Dataset, IoError>
where
    R: std::io::Read + std::io::Seek,
{
    let mut sheets = Vec::with_capacity(options.sheets.len());
    for sheet in options.sheets {
        check_sheet(path, available, sheet)?;
        sheets.push((sheet.as_str(), read_sheet(workbook, path, sheet)?));
    }

    // Union of headers in first-seen order, then the sheet tag column
    let mut headers: Vec<String> = Vec::new();
    for (_, (sheet_headers, _)) in &sheets {
        for h in sheet_headers {
            if !headers.contains(h) {
                headers.push(h.clone());
            }
        }
    }
    let tag_idx = match headers.iter().position(|h| h == options.sheet_column) {
        Some(i) => i,
        None => {
            headers.push(options.sheet_column.to_string());
            headers.len() - 1
        }
    };

    let mut dataset = Dataset::new(crate::dataset_name(path, None), headers);
    for (sheet, (sheet_headers, records)) in sheets {
        let positions: Vec<Option<usize>> = sheet_headers
            .iter()
            .map(|h| dataset.column_index(h))
            .collect();
        let count = records.len();
        for record in records {
            let mut row = vec![None; dataset.headers.len()];
            for (value, pos) in record.into_iter().zip(&positions) {
                if let Some(pos) = pos {
                    row[*pos] = value;
                }
            }
            row[tag_idx] = Some(sheet.to_string());
            dataset.push_row(row);
        }
        info!("{}: stacked {count} rows from sheet '{sheet}'", path.display());
    }
    Ok(dataset)
}

/// Sheet name Excel will accept: forbidden characters replaced, truncated.
pub fn sheet_name(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".into()
    } else {
        cleaned
    }
}

/// One sheet name per table. Excel compares names case-insensitively, so
/// labels that collide after sanitizing get a numeric suffix.
pub fn unique_sheet_names<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::new();
    for label in labels {
        let base = sheet_name(label);
        let mut name = base.clone();
        let mut n = 2;
        while !taken.insert(name.to_lowercase()) {
            let suffix = format!(" ({n})");
            let stem: String = base.chars().take(MAX_SHEET_NAME - suffix.chars().count()).collect();
            name = format!("{stem}{suffix}");
            n += 1;
        }
        names.push(name);
    }
    names
}

/// Write each table to its own sheet. The workbook is built in memory and
/// saved once.
pub fn write(path: &Path, tables: &[OutputTable]) -> Result<(), IoError> {
    let write_err = |e: rust_xlsxwriter::XlsxError| IoError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let names = unique_sheet_names(tables.iter().map(|t| t.name.as_str()));
    for (table, name) in tables.iter().zip(names) {
        let worksheet = workbook
            .add_worksheet()
            .set_name(name)
            .map_err(write_err)?;

        for (col, header) in table.headers.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, header, &header_format)
                .map_err(write_err)?;
        }

        for (r, row) in table.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(s) => {
                        worksheet.write_string(r, c, s).map_err(write_err)?;
                    }
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(r, c, *b).map_err(write_err)?;
                    }
                    CellValue::Int(n) => {
                        worksheet.write_number(r, c, *n as f64).map_err(write_err)?;
                    }
                }
            }
        }

        worksheet.set_freeze_panes(1, 0).map_err(write_err)?;
    }

    workbook.save(path).map_err(write_err)?;
    Ok(())
}
