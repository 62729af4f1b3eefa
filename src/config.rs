//! Dataset configuration.
//!
//! Serializable settings for the load lifecycle, loadable from JSON or
//! any other serde format the embedding process uses.
//!
//! # Example
//!
//! ```
//! use hydrozone::{Crs, DatasetConfig};
//!
//! let json = r#"{
//!     "dataset_path": "zones.geojson",
//!     "source_crs": "national_grid",
//!     "target_crs": "wgs84"
//! }"#;
//! let config: DatasetConfig = serde_json::from_str(json).unwrap();
//! assert_eq!(config.source_crs, Crs::NationalGrid);
//! ```

use crate::crs::Crs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for dataset ingestion and query limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Path of the serialized feature collection to load at startup.
    /// `None` leaves the service unready until a load is requested
    /// explicitly.
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,

    /// Reference system the dataset file is expressed in.
    #[serde(default = "DatasetConfig::default_source_crs")]
    pub source_crs: Crs,

    /// Canonical reference system of the store; geometries are
    /// reprojected into it once at load time.
    #[serde(default = "DatasetConfig::default_target_crs")]
    pub target_crs: Crs,

    /// Upper bound for radius queries in meters (None disables the cap).
    #[serde(default = "DatasetConfig::default_max_radius")]
    pub max_radius_meters: Option<f64>,
}

impl DatasetConfig {
    const fn default_source_crs() -> Crs {
        Crs::NationalGrid
    }

    const fn default_target_crs() -> Crs {
        Crs::Wgs84
    }

    const fn default_max_radius() -> Option<f64> {
        Some(100_000.0)
    }

    pub fn with_dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = Some(path.into());
        self
    }

    pub fn with_source_crs(mut self, crs: Crs) -> Self {
        self.source_crs = crs;
        self
    }

    pub fn with_target_crs(mut self, crs: Crs) -> Self {
        self.target_crs = crs;
        self
    }

    pub fn with_max_radius(mut self, meters: Option<f64>) -> Self {
        self.max_radius_meters = meters;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(cap) = self.max_radius_meters {
            if !cap.is_finite() {
                return Err("max radius must be finite".to_string());
            }
            if cap <= 0.0 {
                return Err("max radius must be positive".to_string());
            }
        }
        if let Some(path) = &self.dataset_path
            && path.as_os_str().is_empty()
        {
            return Err("dataset path must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            source_crs: Self::default_source_crs(),
            target_crs: Self::default_target_crs(),
            max_radius_meters: Self::default_max_radius(),
        }
    }
}
