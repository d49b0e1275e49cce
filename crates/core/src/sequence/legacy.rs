//! Import of the plain-text counter file written by earlier deployments.

use std::path::Path;

use super::{SequenceError, SqliteSequenceStore};

/// Raise `store` to the value held in a legacy counter file.
///
/// Returns `Ok(None)` when the file does not exist. The store is never lowered,
/// so running the import twice is harmless.
pub fn import_legacy_counter(
    store: &SqliteSequenceStore,
    path: &Path,
) -> Result<Option<u64>, SequenceError> {
    if !path.exists() {
        return Ok(None);
    }

    let invalid = |reason: String| SequenceError::LegacyCounter {
        path: path.display().to_string(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let legacy: u64 = contents
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;

    let value = store.raise_to(legacy)?;
    tracing::info!(legacy, value, path = %path.display(), "Imported legacy ticket counter");
    Ok(Some(value))
}
