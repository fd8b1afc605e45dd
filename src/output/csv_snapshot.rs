//! Full-snapshot CSV persistence
//!
//! Every write replaces the whole file: header plus every record held in
//! memory. The rows go to a sibling temporary file first, which is then
//! renamed over the target, so a reader sees either the previous snapshot or
//! the new one.
//!
//! Rows of an existing snapshot that cannot be taken over as records
//! (undecodable or repeating an earlier `product_page_url`) are kept as
//! [`RetainedRow`]s. A resumed run writes them back unchanged at their
//! original position, so no row once written is ever dropped.

use crate::output::{BookRecord, CSV_HEADER};
use crate::{StoreError, StoreResult};
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Why a row was not taken over as a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainReason {
    /// The fields do not decode into a record
    Undecodable,

    /// The detail URL already appeared in an earlier row
    Duplicate,
}

/// A snapshot row carried through rewrites byte for byte
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedRow {
    /// Number of decoded records preceding this row in the file
    pub position: usize,

    /// The row's `id` column, when it holds a number
    pub id: Option<u64>,

    pub reason: RetainReason,

    pub fields: ByteRecord,
}

/// Result of reading a snapshot back
#[derive(Debug, Clone, Default)]
pub struct SnapshotLoad {
    /// Rows that decoded cleanly, in file order
    pub records: Vec<BookRecord>,

    /// Rows that were left out of `records`
    pub retained: Vec<RetainedRow>,
}

impl RetainedRow {
    /// The row's `product_page_url` column, when present and non-empty
    pub fn detail_url(&self) -> Option<&str> {
        let raw = self.fields.get(CSV_HEADER.len() - 1)?;
        std::str::from_utf8(raw).ok().map(str::trim).filter(|u| !u.is_empty())
    }
}

impl SnapshotLoad {
    pub fn skipped_rows(&self) -> usize {
        self.retained.len()
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `records` to `path`, replacing whatever was there
///
/// Parent directories are created as needed.
pub fn write_snapshot(path: &Path, records: &[BookRecord]) -> StoreResult<()> {
    write_snapshot_retaining(path, records, &[])
}

/// Writes `records` with `retained` rows interleaved at their positions
///
/// On failure the temporary file is removed and the previous snapshot is
/// left untouched.
pub fn write_snapshot_retaining(
    path: &Path,
    records: &[BookRecord],
    retained: &[RetainedRow],
) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = write_rows(&temp_path, records, retained) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error(path, e));
    }
    debug!(
        "Wrote {} rows ({} retained) to {}",
        records.len() + retained.len(),
        retained.len(),
        path.display()
    );
    Ok(())
}

fn write_rows(
    temp_path: &Path,
    records: &[BookRecord],
    retained: &[RetainedRow],
) -> StoreResult<()> {
    let file = File::create(temp_path).map_err(|e| io_error(temp_path, e))?;
    // Retained rows may have any number of fields
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file);

    // Written explicitly so an empty record set still gets a header
    writer.write_record(CSV_HEADER)?;

    let mut pending = retained.iter().peekable();
    for (index, record) in records.iter().enumerate() {
        while let Some(row) = pending.next_if(|row| row.position <= index) {
            writer.write_byte_record(&row.fields)?;
        }
        writer.serialize(record)?;
    }
    for row in pending {
        writer.write_byte_record(&row.fields)?;
    }

    writer
        .into_inner()
        .map_err(|e| io_error(temp_path, e.into_error()))?
        .sync_all()
        .map_err(|e| io_error(temp_path, e))
}

fn leading_id(fields: &ByteRecord) -> Option<u64> {
    let raw = std::str::from_utf8(fields.get(0)?).ok()?;
    raw.trim().parse().ok()
}

/// Reads a snapshot back
///
/// The header must match [`CSV_HEADER`] exactly; a file with a different
/// column layout is rejected rather than read positionally. Rows that do not
/// decode, and rows repeating an earlier detail URL, are returned as
/// [`RetainedRow`]s instead of records.
pub fn read_snapshot(path: &Path) -> StoreResult<SnapshotLoad> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);

    let headers = reader.byte_headers()?.clone();
    if !headers.iter().eq(CSV_HEADER.iter().map(|h| h.as_bytes())) {
        return Err(StoreError::Header {
            path: path.display().to_string(),
            found: headers
                .iter()
                .map(String::from_utf8_lossy)
                .collect::<Vec<_>>()
                .join(","),
        });
    }

    let mut load = SnapshotLoad::default();
    let mut seen = HashSet::new();
    for (index, row) in reader.byte_records().enumerate() {
        let fields = row?;
        let reason = match fields.deserialize::<BookRecord>(Some(&headers)) {
            Ok(record) if seen.insert(record.detail_url.clone()) => {
                load.records.push(record);
                continue;
            }
            Ok(record) => {
                warn!(
                    "Row {} of {} repeats {}, keeping it out of the record set",
                    index + 2,
                    path.display(),
                    record.detail_url
                );
                RetainReason::Duplicate
            }
            Err(e) => {
                // Row 1 is the header
                warn!("Row {} of {} does not decode: {}", index + 2, path.display(), e);
                RetainReason::Undecodable
            }
        };

        load.retained.push(RetainedRow {
            position: load.records.len(),
            id: leading_id(&fields),
            reason,
            fields,
        });
    }

    Ok(load)
}

/// Like [`read_snapshot`], but a missing file yields `Ok(None)`
pub fn read_snapshot_if_exists(path: &Path) -> StoreResult<Option<SnapshotLoad>> {
    if !path.exists() {
        return Ok(None);
    }
    read_snapshot(path).map(Some)
}
