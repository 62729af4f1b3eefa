//! Embedded geospatial zone-resolution engine.
//!
//! `hydrozone` loads a polygon dataset (a GeoJSON feature collection of
//! resource-availability zones) once at startup, reprojects it between
//! the British National Grid and geographic WGS84, and answers
//! point-containment and radius-box queries against it.
//!
//! ```rust
//! use hydrozone::{Crs, Point, ZoneService};
//!
//! let dataset = r#"{
//!     "type": "FeatureCollection",
//!     "features": [{
//!         "type": "Feature",
//!         "properties": {"zone": "A"},
//!         "geometry": {
//!             "type": "Polygon",
//!             "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]
//!         }
//!     }]
//! }"#;
//!
//! let service = ZoneService::new();
//! service.load_from_bytes(dataset.as_bytes(), Crs::Wgs84, Crs::Wgs84)?;
//!
//! let zone = service.find_containing(Point::new(5.0, 5.0), Crs::Wgs84)?.unwrap();
//! assert_eq!(zone.attribute("zone").unwrap(), "A");
//! # Ok::<(), hydrozone::HydrozoneError>(())
//! ```
//!
//! The store built by a successful load is immutable and shared
//! read-only across concurrent callers; reloads swap it atomically.

pub mod builder;
pub mod config;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod query;
pub mod store;

pub use builder::ZoneServiceBuilder;
pub use config::DatasetConfig;
pub use crs::{Crs, reproject_coord, reproject_point};
pub use error::{DatasetLoadError, HydrozoneError, ProjectionDomainError, Result};
pub use geometry::ZoneGeometry;
pub use lifecycle::ZoneService;
pub use query::{METERS_PER_DEGREE, bbox_query_param, bounding_box_for_radius};
pub use store::{Zone, ZoneStore};

pub use geo::{MultiPolygon, Point, Polygon, Rect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Crs, HydrozoneError, Result, ZoneService, ZoneServiceBuilder, ZoneStore};

    pub use crate::{Zone, ZoneGeometry};

    pub use crate::{bbox_query_param, bounding_box_for_radius, reproject_point};

    pub use geo::{Point, Polygon, Rect};
}
