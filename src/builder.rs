//! Builder for assembling a [`ZoneService`] from configuration.

use crate::config::DatasetConfig;
use crate::crs::Crs;
use crate::lifecycle::ZoneService;
use std::path::PathBuf;

/// Builder for a [`ZoneService`] with optional startup ingestion.
///
/// `build()` never fails: if the configured dataset cannot be loaded,
/// the service comes up unready with the error recorded, so the
/// surrounding process can still start and serve degraded responses.
/// Callers that want load failures to be fatal can build without a
/// dataset path and call
/// [`load_from_path`](ZoneService::load_from_path) themselves.
///
/// # Examples
///
/// ```no_run
/// use hydrozone::{Crs, ZoneService};
///
/// let service = ZoneService::builder()
///     .dataset_path("zones.geojson")
///     .source_crs(Crs::NationalGrid)
///     .target_crs(Crs::Wgs84)
///     .build();
/// assert!(service.is_ready() || service.load_error().is_some());
/// ```
#[derive(Debug, Default)]
pub struct ZoneServiceBuilder {
    config: DatasetConfig,
}

impl ZoneServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: DatasetConfig::default(),
        }
    }

    /// Set the dataset file to ingest during `build()`.
    pub fn dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dataset_path = Some(path.into());
        self
    }

    /// Reference system the dataset file is expressed in.
    pub fn source_crs(mut self, crs: Crs) -> Self {
        self.config.source_crs = crs;
        self
    }

    /// Canonical reference system for the built store.
    pub fn target_crs(mut self, crs: Crs) -> Self {
        self.config.target_crs = crs;
        self
    }

    /// Cap for radius queries, `None` to disable.
    pub fn max_radius_meters(mut self, cap: Option<f64>) -> Self {
        self.config.max_radius_meters = cap;
        self
    }

    /// Replace the whole configuration at once.
    pub fn config(mut self, config: DatasetConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the service, attempting startup ingestion when a
    /// dataset path is configured. A failed load is recorded on the
    /// returned service rather than propagated.
    pub fn build(self) -> ZoneService {
        let mut service = ZoneService::new();
        service.set_max_radius(self.config.max_radius_meters);

        if let Some(path) = &self.config.dataset_path {
            // Degraded start: the error stays inspectable on the service.
            let _ = service.load_from_path(path, self.config.source_crs, self.config.target_crs);
        }
        service
    }
}
