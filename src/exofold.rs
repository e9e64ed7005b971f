//! # Exofold: the assembled pipeline
//!
//! This module defines the [`Exofold`](crate::exofold::Exofold) struct, the façade that wires
//! together every stage of a run from one [`PipelineConfig`]:
//!
//! 1. **Journals** – the run log and the manifest, opened in append mode under the output
//!    layout (created on construction).
//! 2. **Collaborators** – a [`CatalogService`] for orbital parameters and an
//!    [`ObservationArchive`] for light curves, plus the plot and table writers.
//! 3. **Stages** – [`ParameterResolver`], [`CurveAcquirer`], [`FoldEmitter`] composed into a
//!    [`TargetWorker`], dispatched by the [`Orchestrator`].
//!
//! ## Typical usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use exofold::archive::local_archive::LocalArchive;
//! use exofold::catalog::exoplanet_archive::ExoplanetArchive;
//! use exofold::config::PipelineConfig;
//! use exofold::env_state::ExofoldEnv;
//! use exofold::exofold::Exofold;
//!
//! # async fn run() -> Result<(), exofold::exofold_errors::ExofoldError> {
//! let config = PipelineConfig::builder().output_root("out").build()?;
//! let archive = LocalArchive::new(&config.layout.cache_dir);
//! let exofold = Exofold::new(
//!     config,
//!     Arc::new(ExoplanetArchive::new(ExofoldEnv::new()?)),
//!     Arc::new(archive),
//! )?;
//! let targets = exofold.load_targets(None).await?;
//! let report = exofold.run(targets).await?;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## See also
//! ------------
//! * [`TargetWorker`] – per-target state machine.
//! * [`load_targets`](crate::input::load_targets) – input selection.
use std::sync::Arc;

use camino::Utf8Path;

use crate::archive::acquirer::CurveAcquirer;
use crate::archive::ObservationArchive;
use crate::catalog::resolver::ParameterResolver;
use crate::catalog::CatalogService;
use crate::config::PipelineConfig;
use crate::emit::plot::{PlotRenderer, SvgRenderer};
use crate::emit::table::{CsvTableWriter, TableWriter};
use crate::emit::FoldEmitter;
use crate::exofold_errors::ExofoldError;
use crate::input::load_targets;
use crate::journal::Journal;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::target::TargetRow;
use crate::worker::TargetWorker;

pub struct Exofold {
    config: Arc<PipelineConfig>,
    catalog: Arc<dyn CatalogService>,
    resolver: ParameterResolver,
    orchestrator: Orchestrator,
}

impl Exofold {
    /// Assemble a pipeline with the SVG plot renderer and the CSV table writer.
    pub fn new(
        config: PipelineConfig,
        catalog: Arc<dyn CatalogService>,
        archive: Arc<dyn ObservationArchive>,
    ) -> Result<Self, ExofoldError> {
        Self::with_writers(
            config,
            catalog,
            archive,
            Arc::new(SvgRenderer::default()),
            Arc::new(CsvTableWriter),
        )
    }

    /// Assemble a pipeline with custom artifact writers.
    ///
    /// Creates the output directories and opens both journals.
    pub fn with_writers(
        config: PipelineConfig,
        catalog: Arc<dyn CatalogService>,
        archive: Arc<dyn ObservationArchive>,
        plot: Arc<dyn PlotRenderer>,
        table: Arc<dyn TableWriter>,
    ) -> Result<Self, ExofoldError> {
        config.layout.create_dirs()?;
        let config = Arc::new(config);
        let log = Arc::new(Journal::open(&config.layout.log_path)?);
        let manifest = Arc::new(Journal::open(&config.layout.manifest_path)?);

        let resolver =
            ParameterResolver::new(Arc::clone(&catalog), &config.catalog_table, Arc::clone(&log));
        let acquirer = CurveAcquirer::new(archive, Arc::clone(&config), Arc::clone(&log));
        let emitter = FoldEmitter::new(Arc::clone(&config), plot, table, manifest);
        let worker = TargetWorker::new(
            Arc::clone(&config),
            resolver.clone(),
            acquirer,
            emitter,
            Arc::clone(&log),
        );
        let orchestrator = Orchestrator::new(Arc::clone(&config), worker, log);

        Ok(Exofold {
            config,
            catalog,
            resolver,
            orchestrator,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Targets of the run: the local `input` file when it exists, else a catalog page.
    pub async fn load_targets(
        &self,
        input: Option<&Utf8Path>,
    ) -> Result<Vec<TargetRow>, ExofoldError> {
        load_targets(input, &self.config, self.catalog.as_ref(), &self.resolver).await
    }

    /// Process every target and append the run summary.
    pub async fn run(&self, rows: Vec<TargetRow>) -> Result<RunReport, ExofoldError> {
        self.orchestrator.run(rows).await
    }
}
