// src/write.rs
use anyhow::{Context, Result};
use csv::{Terminator, Writer, WriterBuilder};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::consolidate::{ConsolidatedTable, BLOCK_ID_FIELD, FIELDS};
use crate::parse::RawTable;

/// Dump every placemark table as-is:
/// a `title,` row, one `key,value` row per field, then an empty `,` separator row.
/// Rows end in CRLF.
pub fn write_raw<P: AsRef<Path>>(tables: &[RawTable], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut builder = WriterBuilder::new();
    builder.terminator(Terminator::CRLF);

    write_atomically(path, &builder, |wtr| {
        for table in tables {
            wtr.write_record([table.title.as_str(), ""])?;
            for (key, value) in &table.fields {
                wtr.write_record([key, value])?;
            }
            wtr.write_record(["", ""])?;
        }
        Ok(())
    })?;

    info!(path = %path.display(), tables = tables.len(), "Wrote raw tables");
    Ok(())
}

/// Write one row per block: the block identifier, then every output column.
/// Missing values are empty cells.
pub fn write_consolidated<P: AsRef<Path>>(table: &ConsolidatedTable, path: P) -> Result<()> {
    let path = path.as_ref();

    write_atomically(path, &WriterBuilder::new(), |wtr| {
        wtr.write_record(std::iter::once(BLOCK_ID_FIELD).chain(FIELDS))?;
        for (block_id, row) in table.rows() {
            let cells = row.values().map(|v| v.unwrap_or(""));
            wtr.write_record(std::iter::once(block_id).chain(cells))?;
        }
        Ok(())
    })?;

    info!(path = %path.display(), blocks = table.len(), "Wrote consolidated table");
    Ok(())
}

/// Write to a hidden temp file next to `path`, then rename it over `path`.
/// On failure the temp file is removed and `path` is left untouched.
fn write_atomically<F>(path: &Path, builder: &WriterBuilder, fill: F) -> Result<()>
where
    F: FnOnce(&mut Writer<File>) -> Result<()>,
{
    let file_name = path
        .file_name()
        .with_context(|| format!("output path {:?} has no file name", path))?
        .to_string_lossy();
    let tmp_path: PathBuf = path.with_file_name(format!(".{}.tmp", file_name));

    let mut wtr = builder
        .from_path(&tmp_path)
        .with_context(|| format!("creating {:?}", tmp_path))?;
    let written = fill(&mut wtr)
        .with_context(|| format!("writing {:?}", tmp_path))
        .and_then(|()| {
            wtr.flush()
                .with_context(|| format!("flushing {:?}", tmp_path))
        });
    drop(wtr);

    let result = written.and_then(|()| {
        fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))
    });
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            warn!("failed to remove {:?}: {}", tmp_path, e);
        }
    }
    result
}
