//! Error types for hydrozone.
//!
//! The engine keeps three failure channels distinct so callers can react
//! to each one differently: a dataset that never became available
//! ([`HydrozoneError::DataUnavailable`]), a coordinate that cannot be
//! reprojected ([`ProjectionDomainError`]), and a dataset build that
//! failed ([`DatasetLoadError`]). A containment query that finds nothing
//! is `Ok(None)`, never an error.

use crate::crs::Crs;
use std::sync::Arc;
use thiserror::Error;

/// Convenience result type using [`HydrozoneError`].
pub type Result<T> = std::result::Result<T, HydrozoneError>;

/// Top-level error type for hydrozone operations.
#[derive(Debug, Error)]
pub enum HydrozoneError {
    /// The zone dataset could not be parsed or built.
    ///
    /// Shared because the lifecycle also records the same error for
    /// later inspection while the service runs degraded.
    #[error("dataset load failed: {0}")]
    DatasetLoad(Arc<DatasetLoadError>),

    /// A coordinate fell outside the valid domain of a projection.
    #[error(transparent)]
    ProjectionDomain(#[from] ProjectionDomainError),

    /// A query was attempted before a dataset was successfully loaded.
    #[error("zone dataset is not available")]
    DataUnavailable,

    /// A caller-supplied parameter was rejected before any spatial work.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<DatasetLoadError> for HydrozoneError {
    fn from(err: DatasetLoadError) -> Self {
        HydrozoneError::DatasetLoad(Arc::new(err))
    }
}

/// A coordinate outside the valid domain of a projection.
///
/// Reprojection never produces NaN or silently wrapped coordinates; a
/// point the transform cannot represent is reported through this error
/// instead. The failure is local to the one operation and does not
/// affect shared state.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("coordinate ({x}, {y}) is outside the valid domain of {crs}: {reason}")]
pub struct ProjectionDomainError {
    /// Reference system the coordinate was expressed in.
    pub crs: Crs,
    /// Easting or longitude of the offending coordinate.
    pub x: f64,
    /// Northing or latitude of the offending coordinate.
    pub y: f64,
    /// Short description of the domain violation.
    pub reason: &'static str,
}

impl ProjectionDomainError {
    pub(crate) fn new(crs: Crs, x: f64, y: f64, reason: &'static str) -> Self {
        Self { crs, x, y, reason }
    }
}

/// Failure while building a [`ZoneStore`](crate::ZoneStore) from a
/// serialized feature collection.
///
/// A build fails atomically: any variant here means no store was
/// produced and no partial state escaped.
#[derive(Debug, Error)]
pub enum DatasetLoadError {
    /// The dataset source could not be read.
    #[error("failed to read dataset source: {0}")]
    Io(#[from] std::io::Error),

    /// The source bytes are not valid GeoJSON.
    #[error("malformed feature collection: {0}")]
    Parse(#[from] serde_json::Error),

    /// The source parsed as GeoJSON but the root is not a FeatureCollection.
    #[error("dataset root is not a FeatureCollection")]
    NotAFeatureCollection,

    /// A feature carried a geometry the loader could not decode.
    #[error("invalid geometry in feature {id}: {reason}")]
    Geometry { id: String, reason: String },

    /// Reprojecting a feature into the target system failed.
    #[error("failed to reproject feature {id}")]
    Reprojection {
        id: String,
        #[source]
        source: ProjectionDomainError,
    },
}
