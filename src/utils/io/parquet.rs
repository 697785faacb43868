//! Parquet file operations
//!
//! Reading a file or a directory of files into Arrow record batches, and
//! writing batches to a single file that atomically replaces its target.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;

use crate::error::util::{safe_open_file, validate_directory};
use crate::error::{CridError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Helper function to get batch size from environment
#[must_use]
pub fn get_batch_size() -> Option<usize> {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
}

/// Read a parquet file into Arrow record batches
///
/// # Arguments
/// * `path` - Path to the Parquet file
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = safe_open_file(path, "parquet input")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(get_batch_size().unwrap_or(DEFAULT_BATCH_SIZE))
        .build()?;

    let batches: Vec<RecordBatch> = reader.collect::<std::result::Result<_, _>>()?;

    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_operation_complete("read", path, rows, Some(start.elapsed()));
    Ok(batches)
}

/// Find all Parquet files in a directory, sorted by file name
///
/// # Arguments
/// * `dir` - Path to the directory to search
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    validate_directory(dir, "parquet input")?;

    let parquet_files = fs::read_dir(dir)
        .map_err(|e| CridError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| CridError::io(dir, e)))
        .filter_ok(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "parquet"))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sorted_by(|a, b| a.file_name().cmp(&b.file_name()))
        .collect_vec();

    if parquet_files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    }

    Ok(parquet_files)
}

/// Load a Parquet file, or every Parquet file of a directory in parallel
///
/// Batches are returned in file-name order regardless of which file finished
/// loading first.
///
/// # Arguments
/// * `path` - A Parquet file or a directory containing Parquet files
pub fn load_parquet_files_parallel(path: &Path) -> Result<Vec<RecordBatch>> {
    if path.is_file() {
        return read_parquet(path);
    }

    let parquet_files = find_parquet_files(path)?;
    if parquet_files.is_empty() {
        return Ok(Vec::new());
    }

    let per_file: Vec<Vec<RecordBatch>> = parquet_files
        .par_iter()
        .map(|file| read_parquet(file))
        .collect::<Result<_>>()?;

    let batches = per_file.into_iter().flatten().collect_vec();
    log::info!(
        "Loaded {} batches from {} Parquet files in {}",
        batches.len(),
        parquet_files.len(),
        path.display()
    );
    Ok(batches)
}

/// Write record batches to a single Parquet file, atomically replacing `path`
///
/// The data is written to a temporary sibling file, synced, and renamed over
/// the target. On failure the temporary file is removed and any existing
/// file at `path` is left untouched.
///
/// # Arguments
/// * `path` - Destination file
/// * `schema` - Schema of every batch
/// * `batches` - Batches to write, in order
pub fn write_parquet_atomic(path: &Path, schema: Arc<Schema>, batches: &[RecordBatch]) -> Result<()> {
    let start = Instant::now();
    log_operation_start("Writing parquet file", path);

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| CridError::io(parent, e))?;

    let temp_path = temporary_sibling(path);
    let written = write_parquet(&temp_path, schema, batches)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| CridError::io(path, e)));

    if let Err(e) = written {
        if temp_path.exists() {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                log_warning(
                    &format!("Failed to remove temporary file ({cleanup})"),
                    Some(&temp_path),
                );
            }
        }
        return Err(e);
    }

    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_operation_complete("wrote", path, rows, Some(start.elapsed()));
    Ok(())
}

fn write_parquet(path: &Path, schema: Arc<Schema>, batches: &[RecordBatch]) -> Result<()> {
    let file = File::create(path).map_err(|e| CridError::io(path, e))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    for batch in batches {
        writer.write(batch)?;
    }
    let file = writer.into_inner()?;
    file.sync_all().map_err(|e| CridError::io(path, e))
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "output".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
