//! # Target worker
//!
//! [`TargetWorker::run`] drives one target through its state machine:
//!
//! ```text
//! start ──► artifacts exist? ──yes──► skip_exists
//!             │ no
//!             ▼
//!       resolve parameters ──► period known, epoch missing? ──► estimate epoch from a curve
//!             │
//!             ▼
//!       period & epoch known? ──no──► skip_missing_params
//!             │ yes
//!             ▼
//!       ┌─► acquire ──none──► no_data
//!       │     │ curve
//!       │     ▼
//!       │   fold & emit ──ok──► ok
//!       │     │ error
//!       └─────┘ up to `retry` attempts, sleeping base × 2^attempt in between ──► error
//! ```
//!
//! Every terminal state appends exactly one event to the run log. Collaborator failures are
//! absorbed here; the only error returned to the caller is a fatal journal failure.
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::archive::acquirer::CurveAcquirer;
use crate::catalog::resolver::ParameterResolver;
use crate::config::PipelineConfig;
use crate::constants::{Day, Hour};
use crate::emit::FoldEmitter;
use crate::epoch::estimate_epoch;
use crate::exofold_errors::ExofoldError;
use crate::journal::{Journal, LogEvent};
use crate::target::{Outcome, Target, TargetRow};

#[derive(Clone)]
pub struct TargetWorker {
    config: Arc<PipelineConfig>,
    resolver: ParameterResolver,
    acquirer: CurveAcquirer,
    emitter: FoldEmitter,
    log: Arc<Journal>,
}

impl TargetWorker {
    pub fn new(
        config: Arc<PipelineConfig>,
        resolver: ParameterResolver,
        acquirer: CurveAcquirer,
        emitter: FoldEmitter,
        log: Arc<Journal>,
    ) -> Self {
        TargetWorker {
            config,
            resolver,
            acquirer,
            emitter,
            log,
        }
    }

    /// Process one target up to its terminal outcome.
    ///
    /// Return
    /// ----------
    /// * The terminal [`Outcome`], or a fatal [`ExofoldError`] when the journal fails.
    pub async fn run(&self, row: &TargetRow) -> Result<Outcome, ExofoldError> {
        let target = &row.target;
        let planet = target.planet.clone();

        if self.emitter.artifacts_for(target).exist() {
            debug!(%planet, "artifacts present");
            self.log.append(&LogEvent::SkipExists { planet })?;
            return Ok(Outcome::SkipExists);
        }

        let mut params = self.resolver.resolve(row).await?;
        if params.period.is_some() && params.epoch.is_none() {
            params.epoch = self.estimate_missing_epoch(target).await?;
        }
        let (Some(period), Some(epoch)) = (params.period, params.epoch) else {
            info!(%planet, "missing period or epoch");
            self.log.append(&LogEvent::SkipMissingParams { planet })?;
            return Ok(Outcome::SkipMissingParams);
        };

        self.process_with_retry(target, period, epoch, params.duration)
            .await
    }

    /// Acquire a curve purely to estimate a missing reference epoch.
    async fn estimate_missing_epoch(&self, target: &Target) -> Result<Option<Day>, ExofoldError> {
        let planet = target.planet.clone();
        let Some(acquired) = self.acquirer.acquire(&target.host).await? else {
            self.log.append(&LogEvent::LcFetchFailedForT0 { planet })?;
            return Ok(None);
        };
        match estimate_epoch(&acquired.curve) {
            Ok(t0_bjd) => {
                info!(%planet, t0_bjd, "epoch estimated from light curve");
                self.log.append(&LogEvent::EstimatedT0FromLc {
                    planet,
                    t0_bjd,
                    mission: acquired.mission,
                    author: acquired.author,
                })?;
                Ok(Some(t0_bjd))
            }
            Err(e) => {
                warn!(%planet, error = %e, "epoch estimation failed");
                self.log.append(&LogEvent::EstimateT0Failed {
                    planet,
                    error: e.to_string(),
                })?;
                Ok(None)
            }
        }
    }

    async fn process_with_retry(
        &self,
        target: &Target,
        period: Day,
        epoch: Day,
        duration: Option<Hour>,
    ) -> Result<Outcome, ExofoldError> {
        let planet = target.planet.clone();
        let mut last_error = String::new();

        for attempt in 0..self.config.retry {
            match self.attempt(target, period, epoch, duration).await {
                Ok(Some((mission, author))) => {
                    info!(%planet, %mission, %author, "target completed");
                    self.log.append(&LogEvent::Ok {
                        planet,
                        mission,
                        author,
                    })?;
                    return Ok(Outcome::Ok);
                }
                Ok(None) => {
                    info!(%planet, "no light curve found");
                    self.log.append(&LogEvent::NoData { planet })?;
                    return Ok(Outcome::NoData);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(%planet, attempt, error = %e, "attempt failed");
                    last_error = e.to_string();
                    self.log.append(&LogEvent::AttemptFailed {
                        planet: planet.clone(),
                        attempt,
                        error: last_error.clone(),
                    })?;
                    if attempt + 1 < self.config.retry {
                        tokio::time::sleep(self.config.backoff(attempt)).await;
                    }
                }
            }
        }

        self.log.append(&LogEvent::Error {
            planet,
            error: last_error.clone(),
        })?;
        Ok(Outcome::Error { last_error })
    }

    /// One acquisition + fold/emit pass. `Ok(None)` when no curve exists.
    async fn attempt(
        &self,
        target: &Target,
        period: Day,
        epoch: Day,
        duration: Option<Hour>,
    ) -> Result<Option<(String, String)>, ExofoldError> {
        let Some(acquired) = self.acquirer.acquire(&target.host).await? else {
            return Ok(None);
        };
        self.emitter
            .emit(target, period, epoch, duration, &acquired)?;
        Ok(Some((acquired.mission, acquired.author)))
    }
}
