//! JSON file helpers shared by the reminder store and the interaction log.

use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Load a JSON array of records.
///
/// A missing, unreadable or unparseable file yields an empty list.  Inside a
/// well-formed array, each record that does not decode as `T` is dropped
/// with a warning and the rest are kept.
pub(crate) fn read_records<T>(path: &Path) -> Vec<T>
where
    T: DeserializeOwned,
{
    let Some(raw) = read_text(path) else {
        return Vec::new();
    };

    let values: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt file, starting empty");
            return Vec::new();
        }
    };

    let total = values.len();
    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %path.display(), index, error = %e, "skipping malformed record");
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            path = %path.display(),
            kept = records.len(),
            dropped = total - records.len(),
            "loaded with malformed records"
        );
    }
    records
}

fn read_text(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no existing file, starting empty");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable file, starting empty");
            None
        }
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// The document is written to a temporary file in the same directory and
/// renamed over the target, so readers never observe a half-written file.
pub(crate) fn write_atomic<T>(path: &Path, value: &T) -> StoreResult<()>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec_pretty(value)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
