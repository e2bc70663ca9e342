//! `rostermatch schema` — column schema and row sample of one dataset.

use std::path::PathBuf;

use rostermatch_io::schema::write_schema;
use rostermatch_io::{read_dataset, ReadOptions};

use crate::recon::io_err;
use crate::CliError;

pub fn cmd_schema(file: PathBuf, sheet: Option<String>, out_dir: PathBuf) -> Result<(), CliError> {
    let options = ReadOptions {
        sheet: sheet.as_deref(),
        sheets: &[],
        sheet_column: "",
    };
    let dataset = read_dataset(&file, &options).map_err(io_err)?;
    let files = write_schema(&dataset, &file, sheet.as_deref(), &out_dir).map_err(io_err)?;

    eprintln!(
        "{}: {} rows, {} columns",
        dataset.name,
        dataset.len(),
        dataset.headers.len()
    );
    eprintln!("wrote {}", files.schema.display());
    eprintln!("wrote {}", files.sample.display());
    Ok(())
}
