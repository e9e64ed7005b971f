//! # Light-curve archives
//!
//! Observation products are located and downloaded through the [`ObservationArchive`]
//! trait, an external collaborator with two calls:
//!
//! * [`ObservationArchive::search`] – every product of a host observed by a mission, each
//!   labelled with the processing author that produced it,
//! * [`ObservationArchive::download`] – the light-curve segments of a set of products.
//!
//! Both calls may return nothing or fail; the [`acquirer::CurveAcquirer`] turns these
//! answers into a single usable light curve through a prioritized fallback cascade.
//!
//! Modules
//! -----------------
//! * [`local_archive`] – [`LocalArchive`](crate::archive::local_archive::LocalArchive), an
//!   on-disk product cache.
//! * [`acquirer`] – mission × author preference cascade.
use async_trait::async_trait;
use camino::Utf8PathBuf;

use crate::exofold_errors::ExofoldError;
use crate::lightcurve::LightCurve;

pub mod acquirer;
pub mod local_archive;

/// One downloadable observation product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationProduct {
    pub host: String,
    pub mission: String,
    /// Processing pipeline that produced the product (e.g. `SPOC`, `QLP`)
    pub author: String,
    /// Where the product lives (file path or URL, archive specific)
    pub location: Utf8PathBuf,
}

#[async_trait]
pub trait ObservationArchive: Send + Sync {
    /// Products of `host` observed by `mission`, in a stable order.
    async fn search(
        &self,
        host: &str,
        mission: &str,
    ) -> Result<Vec<ObservationProduct>, ExofoldError>;

    /// Light-curve segments of the given products, one per product that holds data.
    async fn download(
        &self,
        products: &[ObservationProduct],
    ) -> Result<Vec<LightCurve>, ExofoldError>;
}
