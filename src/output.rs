use crate::config::WRITE_BUFFER_SIZE;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Pretty-prints `value` as JSON to `path`, writing a temp file first and
/// renaming it into place.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp output file: {:?}", tmp_path))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize JSON for: {:?}", path))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename temp output file to: {:?}", path))?;

    info!(path = ?path, "Output written");
    Ok(())
}
