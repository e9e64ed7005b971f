//! # Orchestrator
//!
//! Bounded concurrent dispatch of [`TargetWorker`]s over a target list.
//!
//! ## Overview
//!
//! Each target runs as its own tokio task; a semaphore sized by
//! [`PipelineConfig::pool_size`] bounds how many are active at once. Targets share nothing
//! but the run journal, and outcomes are collected in completion order, then reported in
//! input order. When every worker is done, the tally is appended to the run log as a
//! `summary` event.
//!
//! A worker task that panics ends its own target with an `error` outcome. A fatal error
//! (journal failure, or a cancelled worker task) aborts the remaining tasks and is returned
//! to the caller; it is the only way a run ends early.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::PipelineConfig;
use crate::exofold_errors::ExofoldError;
use crate::journal::{Journal, LogEvent};
use crate::target::{Outcome, TargetRow};
use crate::worker::TargetWorker;

/// Outcome counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ok: usize,
    pub skip_exists: usize,
    pub skip_missing_params: usize,
    pub no_data: usize,
    pub error: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Ok => self.ok += 1,
            Outcome::SkipExists => self.skip_exists += 1,
            Outcome::SkipMissingParams => self.skip_missing_params += 1,
            Outcome::NoData => self.no_data += 1,
            Outcome::Error { .. } => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.skip_exists + self.skip_missing_params + self.no_data + self.error
    }

    pub fn to_event(&self) -> LogEvent {
        LogEvent::Summary {
            ok: self.ok,
            skip_exists: self.skip_exists,
            skip_missing_params: self.skip_missing_params,
            no_data: self.no_data,
            error: self.error,
        }
    }
}

impl<'a> FromIterator<&'a Outcome> for RunSummary {
    fn from_iter<I: IntoIterator<Item = &'a Outcome>>(iter: I) -> Self {
        let mut summary = RunSummary::default();
        iter.into_iter().for_each(|o| summary.record(o));
        summary
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OK: {} | Skip (exists): {} | Skip (missing params): {} | No-data: {} | Error: {}",
            self.ok, self.skip_exists, self.skip_missing_params, self.no_data, self.error
        )
    }
}

/// Result of a run: the tally plus each target's outcome, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub summary: RunSummary,
    pub outcomes: Vec<(String, Outcome)>,
}

pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    worker: TargetWorker,
    log: Arc<Journal>,
}

impl Orchestrator {
    pub fn new(config: Arc<PipelineConfig>, worker: TargetWorker, log: Arc<Journal>) -> Self {
        Orchestrator {
            config,
            worker,
            log,
        }
    }

    /// Process every row and return the run report.
    ///
    /// Arguments
    /// -----------------
    /// * `rows`: targets to process; planet names are expected to be unique.
    ///
    /// Return
    /// ----------
    /// * The [`RunReport`], or the first fatal error (remaining tasks are aborted).
    pub async fn run(&self, rows: Vec<TargetRow>) -> Result<RunReport, ExofoldError> {
        let pool = self.config.pool_size();
        info!(targets = rows.len(), pool, "starting run");

        let semaphore = Arc::new(Semaphore::new(pool));
        let mut tasks = JoinSet::new();
        let names: Vec<String> = rows.iter().map(|r| r.target.planet.clone()).collect();
        let mut task_rows: HashMap<Id, usize> = HashMap::with_capacity(rows.len());

        for (idx, row) in rows.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let worker = self.worker.clone();
            let handle = tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ExofoldError::WorkerAborted("worker pool closed".into()))?;
                worker.run(&row).await
            });
            task_rows.insert(handle.id(), idx);
        }

        #[cfg(feature = "progress")]
        let bar = ProgressBar::new(names.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut outcomes: Vec<Option<Outcome>> = vec![None; names.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            let row_of = |id: Id| {
                task_rows.get(&id).copied().ok_or_else(|| {
                    ExofoldError::WorkerAborted(format!("unknown worker task {id}"))
                })
            };
            let result = match joined {
                Ok((id, outcome)) => outcome.and_then(|o| Ok((row_of(id)?, o))),
                // A panicking target ends in error; the rest of the batch goes on.
                Err(e) if e.is_panic() => row_of(e.id())
                    .and_then(|idx| Ok((idx, self.record_panic(&names[idx], e)?))),
                Err(e) => Err(ExofoldError::WorkerAborted(e.to_string())),
            };
            match result {
                Ok((idx, outcome)) => {
                    #[cfg(feature = "progress")]
                    {
                        bar.inc(1);
                        bar.set_message(format!("{}: {}", names[idx], outcome.as_str()));
                    }
                    outcomes[idx] = Some(outcome);
                }
                Err(e) => {
                    error!(error = %e, "aborting run");
                    tasks.abort_all();
                    #[cfg(feature = "progress")]
                    bar.abandon();
                    return Err(e);
                }
            }
        }
        #[cfg(feature = "progress")]
        bar.finish();

        let outcomes: Vec<(String, Outcome)> = names
            .into_iter()
            .zip(outcomes)
            .filter_map(|(name, outcome)| outcome.map(|o| (name, o)))
            .collect();
        let summary: RunSummary = outcomes.iter().map(|(_, o)| o).collect();
        self.log.append(&summary.to_event())?;
        info!(%summary, "run finished");

        Ok(RunReport { summary, outcomes })
    }

    /// Turn the panic of a worker task into the terminal error of its target.
    fn record_panic(&self, planet: &str, err: JoinError) -> Result<Outcome, ExofoldError> {
        let last_error = match err.try_into_panic() {
            Ok(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown cause".into());
                format!("worker panicked: {message}")
            }
            Err(err) => err.to_string(),
        };
        error!(planet, error = %last_error, "worker panicked");
        self.log.append(&LogEvent::Error {
            planet: planet.to_string(),
            error: last_error.clone(),
        })?;
        Ok(Outcome::Error { last_error })
    }
}

#[cfg(test)]
mod orchestrator_test {
    use super::*;

    #[test]
    fn test_summary_tally() {
        let outcomes = [
            Outcome::Ok,
            Outcome::Ok,
            Outcome::SkipExists,
            Outcome::NoData,
            Outcome::Error {
                last_error: "boom".into(),
            },
        ];
        let summary: RunSummary = outcomes.iter().collect();
        assert_eq!(summary.ok, 2);
        assert_eq!(summary.skip_exists, 1);
        assert_eq!(summary.skip_missing_params, 0);
        assert_eq!(summary.total(), 5);
        assert_eq!(
            summary.to_string(),
            "OK: 2 | Skip (exists): 1 | Skip (missing params): 0 | No-data: 1 | Error: 1"
        );
    }
}
