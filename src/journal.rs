//! # Append-only run journal
//!
//! The run log and the manifest are JSON Lines files shared by every worker of a run. A
//! [`Journal`] owns one of them and exposes a single operation, [`Journal::append`]: the
//! record is serialized outside the lock, then written and flushed while holding an internal
//! mutex, so concurrent writers never interleave partial lines.
//!
//! Records
//! -----------------
//! * [`LogEvent`] – progress and outcome events, tagged by a `status` field
//!   (`skip_exists`, `search_error`, `ok`, `error`, `summary`, ...).
//! * [`ManifestRecord`] – one entry per emitted target, naming its artifacts.
//!
//! Every line also carries a `ts` field with the UTC wall-clock time of the append.
//! Entries are never rewritten nor removed; reruns keep appending to the same files.
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::Epoch;
use serde::Serialize;

use crate::constants::{Day, Hour};
use crate::exofold_errors::ExofoldError;

#[derive(Debug)]
pub struct Journal {
    path: Utf8PathBuf,
    file: Mutex<File>,
}

#[derive(Serialize)]
struct Stamped<'a, T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<String>,
    #[serde(flatten)]
    record: &'a T,
}

impl Journal {
    /// Open (or create) a journal file in append mode.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, ExofoldError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ExofoldError::JournalError {
                path: path.to_string(),
                source,
            })?;
        Ok(Journal {
            path,
            file: Mutex::new(file),
        })
    }

    /// Append one record as a single JSON line.
    ///
    /// Return
    /// ----------
    /// * `Err(ExofoldError::JournalError)` if the write or the flush fails. This is the only
    ///   error class allowed to abort a run.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), ExofoldError> {
        let stamped = Stamped {
            ts: Epoch::now().ok().map(|now| now.to_string()),
            record,
        };
        let mut line = serde_json::to_string(&stamped)?;
        line.push('\n');

        // A poisoned lock only means another writer panicked between two whole lines.
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| ExofoldError::JournalError {
                path: self.path.to_string(),
                source,
            })
    }
}

/// Events written to the run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogEvent {
    SkipExists {
        planet: String,
    },
    FetchParamsError {
        planet: String,
        error: String,
    },
    AmbiguousCatalogMatch {
        planet: String,
        rows: usize,
    },
    SearchError {
        host: String,
        mission: String,
        error: String,
    },
    DownloadError {
        host: String,
        mission: String,
        author: String,
        error: String,
    },
    DownloadErrorAuto {
        host: String,
        mission: String,
        error: String,
    },
    #[serde(rename = "estimated_t0_from_lc")]
    EstimatedT0FromLc {
        planet: String,
        t0_bjd: Day,
        mission: String,
        author: String,
    },
    #[serde(rename = "estimate_t0_failed")]
    EstimateT0Failed {
        planet: String,
        error: String,
    },
    #[serde(rename = "lc_fetch_failed_for_t0")]
    LcFetchFailedForT0 {
        planet: String,
    },
    SkipMissingParams {
        planet: String,
    },
    AttemptFailed {
        planet: String,
        attempt: u32,
        error: String,
    },
    NoData {
        planet: String,
    },
    Ok {
        planet: String,
        mission: String,
        author: String,
    },
    Error {
        planet: String,
        error: String,
    },
    Summary {
        ok: usize,
        skip_exists: usize,
        skip_missing_params: usize,
        no_data: usize,
        error: usize,
    },
}

/// One manifest entry per emitted target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestRecord {
    pub planet: String,
    pub host: String,
    pub period_day: Day,
    pub t0_bjd: Day,
    /// Reference epoch as a TDB calendar date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t0_iso: Option<String>,
    pub duration_hr: Option<Hour>,
    pub time_offset_applied: Day,
    pub mission: String,
    pub author: String,
    pub plot: String,
    pub table: String,
}

#[cfg(test)]
mod journal_test {
    use super::*;

    #[test]
    fn test_append_writes_tagged_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("log.jsonl")).unwrap();
        let journal = Journal::open(&path).unwrap();

        journal
            .append(&LogEvent::SkipExists {
                planet: "Kepler-10 b".into(),
            })
            .unwrap();
        journal
            .append(&LogEvent::EstimatedT0FromLc {
                planet: "Kepler-10 b".into(),
                t0_bjd: 2454964.57,
                mission: "Kepler".into(),
                author: "Kepler".into(),
            })
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "skip_exists");
        assert_eq!(lines[0]["planet"], "Kepler-10 b");
        assert!(lines[0]["ts"].is_string());
        assert_eq!(lines[1]["status"], "estimated_t0_from_lc");
        assert_eq!(lines[1]["t0_bjd"], 2454964.57);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("manifest.jsonl")).unwrap();
        for _ in 0..2 {
            let journal = Journal::open(&path).unwrap();
            journal
                .append(&LogEvent::NoData {
                    planet: "x".into(),
                })
                .unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_open_in_missing_directory_is_fatal() {
        let err = Journal::open("/nonexistent/dir/log.jsonl").unwrap_err();
        assert!(err.is_fatal());
    }
}
