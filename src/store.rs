//! Snapshot persistence
//!
//! Reads the previously written snapshot and decides the on-disk outcome of
//! a run. The design favors keeping stale data over erasing good data with a
//! bad fetch: staleness is an accepted, silent condition; data loss is not.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::StatsRecord;

/// Terminal outcome of one run's persistence step
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// New record written, replacing any previous file wholesale
    Written(StatsRecord),
    /// Fetch produced nothing usable; the existing snapshot was left as-is
    /// (a soft success from the scheduler's perspective)
    KeptExisting(StatsRecord),
}

/// Read the existing snapshot if present. An unreadable or malformed file is
/// treated as absent.
pub fn load_snapshot(path: &Path) -> Option<StatsRecord> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "existing snapshot is unreadable; treating it as absent"
            );
            None
        }
    }
}

/// Decide and apply the on-disk outcome for the record a run produced.
///
/// - A valid record overwrites the snapshot.
/// - An empty record loses to an existing snapshot with nonzero citations,
///   and is written only when there is nothing better to keep.
/// - No record keeps the existing snapshot, or fails hard when none exists.
pub fn persist(path: &Path, fetched: Option<StatsRecord>) -> Result<Outcome> {
    let existing = load_snapshot(path);

    match fetched {
        Some(record) if !record.is_empty() => {
            write_snapshot(path, &record)?;
            Ok(Outcome::Written(record))
        }
        Some(record) => match existing {
            Some(previous) if previous.citations > 0 => {
                info!(
                    last_updated = %previous.last_updated,
                    "fetched record is empty; keeping the previous snapshot"
                );
                Ok(Outcome::KeptExisting(previous))
            }
            _ => {
                write_snapshot(path, &record)?;
                Ok(Outcome::Written(record))
            }
        },
        None => match existing {
            Some(previous) => Ok(Outcome::KeptExisting(previous)),
            None => Err(Error::NoPriorData(path.to_path_buf())),
        },
    }
}

/// Serialize to a sibling temp file, then rename over the target so readers
/// never observe a half-written snapshot.
fn write_snapshot(path: &Path, record: &StatsRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut json = serde_json::to_string_pretty(record)?;
    json.push('\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
