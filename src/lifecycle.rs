//! Dataset load lifecycle and shared read access.
//!
//! A [`ZoneService`] owns the store's two-state lifecycle: `Unloaded`
//! (possibly with a recorded load error) and `Ready`. The store itself
//! is immutable once built, so the only synchronized state is the slot
//! holding it: loads build the new store entirely off to the side and
//! swap it in as a single reference replacement under a short write
//! lock. In-flight readers hold an `Arc` snapshot and always observe a
//! fully consistent store, either entirely old or entirely new.
//!
//! A query against an unready service fails with
//! [`HydrozoneError::DataUnavailable`] so the surrounding process can
//! keep running degraded and report service-unavailable upstream.

use crate::crs::Crs;
use crate::error::{DatasetLoadError, HydrozoneError, Result};
use crate::query;
use crate::store::{Zone, ZoneStore};
use bytes::Bytes;
use geo::{Point, Rect};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
enum LoadState {
    Unloaded { error: Option<Arc<DatasetLoadError>> },
    Ready(Arc<ZoneStore>),
}

/// Owns dataset ingestion and hands out read-only store snapshots.
#[derive(Debug)]
pub struct ZoneService {
    state: RwLock<LoadState>,
    max_radius_meters: Option<f64>,
}

impl ZoneService {
    /// Create an unready service with no dataset loaded.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LoadState::Unloaded { error: None }),
            max_radius_meters: None,
        }
    }

    /// Entry point for the builder API.
    pub fn builder() -> crate::builder::ZoneServiceBuilder {
        crate::builder::ZoneServiceBuilder::new()
    }

    pub(crate) fn set_max_radius(&mut self, cap: Option<f64>) {
        self.max_radius_meters = cap;
    }

    /// Load (or reload) the dataset from a file.
    ///
    /// Returns the number of zones loaded. See
    /// [`load_from_bytes`](ZoneService::load_from_bytes) for the swap
    /// semantics.
    pub fn load_from_path(
        &self,
        path: impl AsRef<Path>,
        source_crs: Crs,
        target_crs: Crs,
    ) -> Result<usize> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => return Err(self.record_failure(DatasetLoadError::Io(err))),
        };
        log::info!("loading zone dataset from {} ({} bytes)", path.display(), bytes.len());
        self.load_from_bytes(&bytes, source_crs, target_crs)
    }

    /// Load (or reload) the dataset from raw bytes.
    ///
    /// The store is built completely before the service state changes;
    /// on success it replaces the previous store atomically. On failure
    /// an unready service records the error and stays unready, while a
    /// ready service keeps serving the previous dataset; either way the
    /// error is returned to the caller and nothing partial is published.
    pub fn load_from_bytes(
        &self,
        bytes: &[u8],
        source_crs: Crs,
        target_crs: Crs,
    ) -> Result<usize> {
        match ZoneStore::from_geojson(bytes, source_crs, target_crs) {
            Ok(store) => {
                let count = store.len();
                log::info!("zone dataset ready: {count} features in {target_crs}");
                *self.state.write() = LoadState::Ready(Arc::new(store));
                Ok(count)
            }
            Err(err) => Err(self.record_failure(err)),
        }
    }

    fn record_failure(&self, err: DatasetLoadError) -> HydrozoneError {
        log::error!("zone dataset load failed: {err}");
        let err = Arc::new(err);
        let mut state = self.state.write();
        match &*state {
            LoadState::Unloaded { .. } => {
                *state = LoadState::Unloaded {
                    error: Some(Arc::clone(&err)),
                };
            }
            LoadState::Ready(_) => {
                log::warn!("keeping the previously loaded dataset after a failed reload");
            }
        }
        HydrozoneError::DatasetLoad(err)
    }

    /// Whether a dataset is currently loaded.
    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.read(), LoadState::Ready(_))
    }

    /// The error recorded by the last failed load, if the service never
    /// reached `Ready`.
    pub fn load_error(&self) -> Option<Arc<DatasetLoadError>> {
        match &*self.state.read() {
            LoadState::Unloaded { error } => error.clone(),
            LoadState::Ready(_) => None,
        }
    }

    /// Snapshot of the current store for a batch of queries.
    ///
    /// The snapshot stays valid even if the dataset is reloaded while
    /// it is held.
    pub fn store(&self) -> Result<Arc<ZoneStore>> {
        match &*self.state.read() {
            LoadState::Ready(store) => Ok(Arc::clone(store)),
            LoadState::Unloaded { .. } => Err(HydrozoneError::DataUnavailable),
        }
    }

    /// First zone containing the point, as an owned record.
    pub fn find_containing(&self, point: Point<f64>, point_crs: Crs) -> Result<Option<Zone>> {
        let store = self.store()?;
        Ok(store.find_containing(point, point_crs)?.cloned())
    }

    /// All zones containing the point, in source order.
    pub fn find_all_containing(&self, point: Point<f64>, point_crs: Crs) -> Result<Vec<Zone>> {
        let store = self.store()?;
        let zones = store.find_all_containing(point, point_crs)?;
        Ok(zones.into_iter().cloned().collect())
    }

    /// Bounding box for a radius search, in the dataset's own system.
    ///
    /// The box is handed to the upstream feature-search call; see
    /// [`query::bounding_box_for_radius`] for the conversion contract.
    pub fn bounding_box_for_radius(
        &self,
        center: Point<f64>,
        radius_meters: f64,
    ) -> Result<Rect<f64>> {
        if let Some(cap) = self.max_radius_meters
            && radius_meters > cap
        {
            return Err(HydrozoneError::InvalidInput(format!(
                "radius {radius_meters}m exceeds the configured cap of {cap}m"
            )));
        }
        let store = self.store()?;
        query::bounding_box_for_radius(center, radius_meters, store.crs())
    }
}

impl Default for ZoneService {
    fn default() -> Self {
        Self::new()
    }
}
