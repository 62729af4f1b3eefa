//! Coordinate reference systems and point reprojection.
//!
//! Two systems are supported and the set is fixed at build time: the
//! British National Grid (a transverse Mercator projection of the OSGB36
//! datum, EPSG:27700) and geographic WGS84 longitude/latitude
//! (EPSG:4326). Every coordinate handled by the engine is tagged with
//! exactly one of them; the only way to move a coordinate between
//! systems is [`reproject_point`] or [`reproject_coord`].
//!
//! Reprojection is pure and deterministic. Reprojecting into the same
//! system is the identity. A coordinate the projection cannot represent
//! is a [`ProjectionDomainError`], never NaN.

mod osgb;

use crate::error::{HydrozoneError, ProjectionDomainError};
use geo::{Coord, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// Geographic WGS84 longitude/latitude in degrees (EPSG:4326).
    Wgs84,
    /// British National Grid easting/northing in meters (EPSG:27700).
    NationalGrid,
}

impl Crs {
    /// EPSG code identifying this system.
    pub fn epsg_code(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::NationalGrid => 27700,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Wgs84 => write!(f, "WGS 84"),
            Crs::NationalGrid => write!(f, "British National Grid"),
        }
    }
}

impl FromStr for Crs {
    type Err = HydrozoneError;

    /// Parse a system name as it appears in configuration or query
    /// parameters. Accepts EPSG codes and common aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wgs84" | "wgs_84" | "epsg:4326" | "4326" | "crs84" => Ok(Crs::Wgs84),
            "national_grid" | "bng" | "osgb36" | "osgb" | "epsg:27700" | "27700" => {
                Ok(Crs::NationalGrid)
            }
            other => Err(HydrozoneError::InvalidInput(format!(
                "unknown reference system: {other}"
            ))),
        }
    }
}

/// Reproject a single coordinate pair between reference systems.
///
/// Identity when `from == to`. Otherwise runs the grid projection and
/// datum shift in the required direction.
pub fn reproject_coord(coord: Coord<f64>, from: Crs, to: Crs) -> Result<Coord<f64>, ProjectionDomainError> {
    match (from, to) {
        (Crs::Wgs84, Crs::Wgs84) | (Crs::NationalGrid, Crs::NationalGrid) => Ok(coord),
        (Crs::NationalGrid, Crs::Wgs84) => {
            let (lon, lat) = osgb::grid_to_wgs84(coord.x, coord.y)?;
            Ok(Coord { x: lon, y: lat })
        }
        (Crs::Wgs84, Crs::NationalGrid) => {
            let (easting, northing) = osgb::wgs84_to_grid(coord.x, coord.y)?;
            Ok(Coord {
                x: easting,
                y: northing,
            })
        }
    }
}

/// Reproject a point between reference systems.
///
/// # Examples
///
/// ```
/// use hydrozone::{Crs, Point, reproject_point};
///
/// let grid = reproject_point(Point::new(-0.1281, 51.5080), Crs::Wgs84, Crs::NationalGrid)?;
/// assert!((grid.x() - 530_000.0).abs() < 1_000.0);
/// # Ok::<(), hydrozone::ProjectionDomainError>(())
/// ```
pub fn reproject_point(point: Point<f64>, from: Crs, to: Crs) -> Result<Point<f64>, ProjectionDomainError> {
    reproject_coord(point.0, from, to).map(Point)
}
