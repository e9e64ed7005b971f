//! On-disk light-curve archive.
//!
//! Products are CSV segments stored under the archive root:
//!
//! ```text
//! <root>/<sanitized host>/<mission>/<author>/<segment>.csv
//! ```
//!
//! Each segment holds a `time,flux,flux_err` header (`flux_err` cells may be empty) and may
//! start with a `# time_format: <tag>` line naming the time convention (`btjd`, `bkjd`).
//! Any other `#` line is a comment.
use std::fs;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use tracing::debug;

use super::{ObservationArchive, ObservationProduct};
use crate::exofold_errors::ExofoldError;
use crate::lightcurve::{LightCurve, TimeFormat};
use crate::target::sanitize_name;

const TIME_FORMAT_TAG: &str = "time_format:";

#[derive(Debug, Deserialize)]
struct SampleRecord {
    time: Option<f64>,
    flux: Option<f64>,
    flux_err: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: Utf8PathBuf,
}

impl LocalArchive {
    pub fn new(root: impl AsRef<Utf8Path>) -> Self {
        LocalArchive {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn mission_dir(&self, host: &str, mission: &str) -> Utf8PathBuf {
        self.root.join(sanitize_name(host)).join(mission)
    }

    /// Store a segment in the archive, creating the directories as needed.
    ///
    /// Return
    /// ----------
    /// * The path of the written segment.
    pub fn store_segment(
        &self,
        host: &str,
        mission: &str,
        author: &str,
        name: &str,
        curve: &LightCurve,
    ) -> Result<Utf8PathBuf, ExofoldError> {
        let dir = self.mission_dir(host, mission).join(author);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.csv", sanitize_name(name)));

        let mut content = String::new();
        let tag = match curve.time_format {
            TimeFormat::Btjd => Some("btjd"),
            TimeFormat::Bkjd => Some("bkjd"),
            TimeFormat::Unrecognized => None,
        };
        if let Some(tag) = tag {
            content.push_str(&format!("# {TIME_FORMAT_TAG} {tag}\n"));
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["time", "flux", "flux_err"])?;
        for i in 0..curve.len() {
            writer.write_record([
                curve.time[i].to_string(),
                curve.flux[i].to_string(),
                curve.flux_err[i].to_string(),
            ])?;
        }
        let body = writer
            .into_inner()
            .map_err(|e| ExofoldError::IoError(e.into_error()))?;
        content.push_str(&String::from_utf8_lossy(&body));
        fs::write(&path, content)?;
        Ok(path)
    }

    fn read_segment(path: &Utf8Path) -> Result<LightCurve, ExofoldError> {
        let content = fs::read_to_string(path)?;
        let time_format = content
            .lines()
            .next()
            .and_then(|first| first.trim().strip_prefix('#'))
            .and_then(|comment| comment.trim().strip_prefix(TIME_FORMAT_TAG))
            .map(TimeFormat::from_tag)
            .unwrap_or_default();

        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let (mut time, mut flux, mut flux_err) = (Vec::new(), Vec::new(), Vec::new());
        for record in reader.deserialize::<SampleRecord>() {
            let record = record?;
            time.push(record.time.unwrap_or(f64::NAN));
            flux.push(record.flux.unwrap_or(f64::NAN));
            flux_err.push(record.flux_err.unwrap_or(f64::NAN));
        }
        LightCurve::new(time, flux, flux_err, time_format)
    }
}

fn sorted_entries(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, std::io::Error> {
    let mut entries = dir
        .read_dir_utf8()?
        .map(|entry| entry.map(|e| e.path().to_path_buf()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

#[async_trait]
impl ObservationArchive for LocalArchive {
    async fn search(
        &self,
        host: &str,
        mission: &str,
    ) -> Result<Vec<ObservationProduct>, ExofoldError> {
        let dir = self.mission_dir(host, mission);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let failed = |e: std::io::Error| ExofoldError::SearchFailed {
            host: host.to_string(),
            mission: mission.to_string(),
            reason: e.to_string(),
        };

        let mut products = Vec::new();
        for author_dir in sorted_entries(&dir).map_err(failed)? {
            if !author_dir.is_dir() {
                continue;
            }
            let Some(author) = author_dir.file_name().map(str::to_string) else {
                continue;
            };
            for file in sorted_entries(&author_dir).map_err(failed)? {
                if file.extension() == Some("csv") {
                    products.push(ObservationProduct {
                        host: host.to_string(),
                        mission: mission.to_string(),
                        author: author.clone(),
                        location: file,
                    });
                }
            }
        }
        debug!(host, mission, products = products.len(), "local archive search");
        Ok(products)
    }

    async fn download(
        &self,
        products: &[ObservationProduct],
    ) -> Result<Vec<LightCurve>, ExofoldError> {
        products
            .iter()
            .map(|product| {
                Self::read_segment(&product.location).map_err(|e| {
                    ExofoldError::DownloadFailed(format!("{}: {e}", product.location))
                })
            })
            .filter(|segment| !matches!(segment, Ok(curve) if curve.is_empty()))
            .collect()
    }
}

#[cfg(test)]
mod local_archive_test {
    use super::*;

    fn archive() -> (tempfile::TempDir, LocalArchive) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, LocalArchive::new(root))
    }

    fn segment(t0: f64) -> LightCurve {
        LightCurve::new(
            vec![t0, t0 + 0.1, t0 + 0.2],
            vec![1.0, 0.99, f64::NAN],
            vec![0.01, 0.01, 0.01],
            TimeFormat::Btjd,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_lists_products_per_author() {
        let (_dir, archive) = archive();
        archive.store_segment("TOI 700", "TESS", "SPOC", "s01", &segment(1.0)).unwrap();
        archive.store_segment("TOI 700", "TESS", "SPOC", "s02", &segment(2.0)).unwrap();
        archive.store_segment("TOI 700", "TESS", "QLP", "s01", &segment(1.0)).unwrap();

        let products = archive.search("TOI 700", "TESS").await.unwrap();
        let labels: Vec<&str> = products.iter().map(|p| p.author.as_str()).collect();
        assert_eq!(labels, vec!["QLP", "SPOC", "SPOC"]);
        assert!(archive.search("TOI 700", "Kepler").await.unwrap().is_empty());
        assert!(archive.search("unknown", "TESS").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_reads_time_format() {
        let (_dir, archive) = archive();
        archive.store_segment("K2-18", "K2", "K2", "c05", &segment(3.0)).unwrap();
        let products = archive.search("K2-18", "K2").await.unwrap();
        let segments = archive.download(&products).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].time_format, TimeFormat::Btjd);
        assert_eq!(segments[0].len(), 3);
        assert!(segments[0].flux[2].is_nan());
    }

    #[tokio::test]
    async fn test_download_without_tag_and_errors() {
        let (_dir, archive) = archive();
        let dir = archive.root().join("Kepler-10").join("Kepler").join("Kepler");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("q1.csv"), "time,flux,flux_err\n100.0,1.0,\n100.1,0.98,\n").unwrap();

        let products = archive.search("Kepler-10", "Kepler").await.unwrap();
        let segments = archive.download(&products).await.unwrap();
        assert_eq!(segments[0].time_format, TimeFormat::Unrecognized);
        assert!(segments[0].flux_err.iter().all(|e| e.is_nan()));
    }

    #[tokio::test]
    async fn test_download_corrupt_segment_fails() {
        let (_dir, archive) = archive();
        let dir = archive.root().join("X").join("TESS").join("SPOC");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.csv"), "time,flux\nabc,def\n").unwrap();

        let products = archive.search("X", "TESS").await.unwrap();
        assert!(matches!(
            archive.download(&products).await,
            Err(ExofoldError::DownloadFailed(_))
        ));
    }
}
