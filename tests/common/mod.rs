#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};

use exofold::archive::{ObservationArchive, ObservationProduct};
use exofold::catalog::{CatalogRow, CatalogService};
use exofold::config::PipelineConfig;
use exofold::constants::{COL_DURATION, COL_EPOCH, COL_HOST, COL_PERIOD, COL_PLANET};
use exofold::emit::plot::SvgRenderer;
use exofold::emit::table::{Column, TableWriter};
use exofold::exofold::Exofold;
use exofold::exofold_errors::ExofoldError;
use exofold::lightcurve::{LightCurve, TimeFormat};
use exofold::units::RawValue;

pub fn utf8_root(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

/// Default settings with an output root and a negligible backoff.
pub fn test_config(root: &Utf8Path) -> PipelineConfig {
    PipelineConfig::builder()
        .output_root(root)
        .retry_base_sleep(Duration::from_millis(1))
        .build()
        .unwrap()
}

/// Flat light curve with box-shaped transits of `duration` days every `period` days.
pub fn transit_curve(
    period: f64,
    t0: f64,
    duration: f64,
    start: f64,
    samples: usize,
    cadence: f64,
    time_format: TimeFormat,
) -> LightCurve {
    let time: Vec<f64> = (0..samples).map(|i| start + i as f64 * cadence).collect();
    let flux = time
        .iter()
        .map(|t| {
            let phase = (t - t0 + period / 2.0).rem_euclid(period) - period / 2.0;
            if phase.abs() < duration / 2.0 {
                0.99
            } else {
                1.0
            }
        })
        .collect();
    LightCurve::new(time, flux, vec![1e-3; samples], time_format).unwrap()
}

/// A BTJD curve: 1000 samples at 0.01 d, transits of 0.2 d every 3 d from t = 1001.0.
pub fn tess_curve() -> LightCurve {
    transit_curve(3.0, 1001.0, 0.2, 1000.0, 1000, 0.01, TimeFormat::Btjd)
}

pub fn planet_row(
    planet: &str,
    host: &str,
    period: Option<f64>,
    epoch: Option<f64>,
    duration: Option<f64>,
) -> CatalogRow {
    let num = |v: Option<f64>| v.map(RawValue::Number).unwrap_or_default();
    CatalogRow::new()
        .with(COL_PLANET, RawValue::Text(planet.into()))
        .with(COL_HOST, RawValue::Text(host.into()))
        .with(COL_PERIOD, num(period))
        .with(COL_EPOCH, num(epoch))
        .with(COL_DURATION, num(duration))
}

#[derive(Default)]
pub struct FakeCatalog {
    rows: HashMap<String, Vec<CatalogRow>>,
    page: Vec<CatalogRow>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, row: CatalogRow) -> Self {
        let planet = row.planet().unwrap();
        self.rows.entry(planet).or_default().push(row.clone());
        self.page.push(row);
        self
    }

    pub fn with_failure(mut self, planet: &str) -> Self {
        self.failing.insert(planet.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn query(
        &self,
        _table: &str,
        _fields: &[&str],
        exact_name: &str,
    ) -> Result<Vec<CatalogRow>, ExofoldError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(exact_name) {
            return Err(ExofoldError::CatalogError("service unavailable".into()));
        }
        Ok(self.rows.get(exact_name).cloned().unwrap_or_default())
    }

    async fn query_where(
        &self,
        _table: &str,
        _fields: &[&str],
        _condition: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogRow>, ExofoldError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .page
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// What a download of one product yields.
#[derive(Debug, Clone)]
pub enum Answer {
    Curve(LightCurve),
    Empty,
    Fail,
    Panic,
}

#[derive(Default)]
pub struct FakeArchive {
    products: Vec<ObservationProduct>,
    answers: HashMap<Utf8PathBuf, Answer>,
    failing_searches: HashSet<(String, String)>,
    searches: AtomicUsize,
    searching: AtomicUsize,
    peak_searching: AtomicUsize,
    search_delay: Duration,
    downloads: Mutex<Vec<Vec<String>>>,
}

impl FakeArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, host: &str, mission: &str, author: &str, answer: Answer) -> Self {
        let location = Utf8PathBuf::from(format!(
            "{host}/{mission}/{author}/{}",
            self.products.len()
        ));
        self.answers.insert(location.clone(), answer);
        self.products.push(ObservationProduct {
            host: host.into(),
            mission: mission.into(),
            author: author.into(),
            location,
        });
        self
    }

    pub fn with_search_failure(mut self, host: &str, mission: &str) -> Self {
        self.failing_searches
            .insert((host.to_string(), mission.to_string()));
        self
    }

    /// Every search sleeps for `delay` before answering.
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Highest number of searches observed in flight at once.
    pub fn peak_concurrent_searches(&self) -> usize {
        self.peak_searching.load(Ordering::SeqCst)
    }

    /// Author labels of every download call, in call order.
    pub fn downloads(&self) -> Vec<Vec<String>> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObservationArchive for FakeArchive {
    async fn search(
        &self,
        host: &str,
        mission: &str,
    ) -> Result<Vec<ObservationProduct>, ExofoldError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let now = self.searching.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_searching.fetch_max(now, Ordering::SeqCst);
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        self.searching.fetch_sub(1, Ordering::SeqCst);

        if self
            .failing_searches
            .contains(&(host.to_string(), mission.to_string()))
        {
            return Err(ExofoldError::SearchFailed {
                host: host.into(),
                mission: mission.into(),
                reason: "timeout".into(),
            });
        }
        Ok(self
            .products
            .iter()
            .filter(|p| p.host == host && p.mission == mission)
            .cloned()
            .collect())
    }

    async fn download(
        &self,
        products: &[ObservationProduct],
    ) -> Result<Vec<LightCurve>, ExofoldError> {
        self.downloads
            .lock()
            .unwrap()
            .push(products.iter().map(|p| p.author.clone()).collect());
        let mut segments = Vec::new();
        for product in products {
            match &self.answers[&product.location] {
                Answer::Curve(curve) => segments.push(curve.clone()),
                Answer::Empty => {}
                Answer::Fail => {
                    return Err(ExofoldError::DownloadFailed(product.location.to_string()))
                }
                Answer::Panic => panic!("corrupt segment at {}", product.location),
            }
        }
        Ok(segments)
    }
}

/// Table writer failing on every call.
#[derive(Default)]
pub struct FailingTableWriter {
    calls: AtomicUsize,
}

impl FailingTableWriter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TableWriter for FailingTableWriter {
    fn write(&self, _path: &Utf8Path, _columns: &[Column<'_>]) -> Result<(), ExofoldError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExofoldError::IoError(std::io::Error::other("disk full")))
    }
}

pub fn pipeline(
    config: PipelineConfig,
    catalog: Arc<FakeCatalog>,
    archive: Arc<FakeArchive>,
) -> Exofold {
    Exofold::new(config, catalog, archive).unwrap()
}

pub fn pipeline_with_table(
    config: PipelineConfig,
    catalog: Arc<FakeCatalog>,
    archive: Arc<FakeArchive>,
    table: Arc<dyn TableWriter>,
) -> Exofold {
    Exofold::with_writers(config, catalog, archive, Arc::new(SvgRenderer::default()), table)
        .unwrap()
}

/// Every record of a JSON Lines file.
pub fn read_jsonl(path: &Utf8Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

/// `status` field of every record of a JSON Lines file.
pub fn statuses(path: &Utf8Path) -> Vec<String> {
    read_jsonl(path)
        .iter()
        .map(|v| v["status"].as_str().unwrap_or_default().to_string())
        .collect()
}
