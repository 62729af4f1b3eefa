//! Zone geometry: the subset of GeoJSON geometry the engine interprets.

use crate::crs::{Crs, reproject_coord};
use crate::error::ProjectionDomainError;
use geo::{BoundingRect, Contains, MapCoords, MultiPolygon, Point, Polygon, Rect};

/// Geometry attached to a zone.
///
/// Containment is only defined for polygonal geometry; anything else a
/// dataset carries is kept as [`ZoneGeometry::Other`] with its GeoJSON
/// type name, skipped by the query engine, and passed through
/// reprojection unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    Other { kind: String },
}

impl ZoneGeometry {
    /// GeoJSON type name of this geometry.
    pub fn kind(&self) -> &str {
        match self {
            ZoneGeometry::Polygon(_) => "Polygon",
            ZoneGeometry::MultiPolygon(_) => "MultiPolygon",
            ZoneGeometry::Other { kind } => kind,
        }
    }

    /// Whether the query engine can test containment against this geometry.
    pub fn is_polygonal(&self) -> bool {
        matches!(self, ZoneGeometry::Polygon(_) | ZoneGeometry::MultiPolygon(_))
    }

    /// Point-in-polygon containment. Holes exclude their interior;
    /// non-polygonal geometry contains nothing.
    pub fn contains(&self, point: &Point<f64>) -> bool {
        match self {
            ZoneGeometry::Polygon(polygon) => polygon.contains(point),
            ZoneGeometry::MultiPolygon(multi) => multi.contains(point),
            ZoneGeometry::Other { .. } => false,
        }
    }

    /// Axis-aligned bounding rectangle, `None` for non-polygonal geometry.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            ZoneGeometry::Polygon(polygon) => polygon.bounding_rect(),
            ZoneGeometry::MultiPolygon(multi) => multi.bounding_rect(),
            ZoneGeometry::Other { .. } => None,
        }
    }

    /// Reproject every coordinate of this geometry from `from` to `to`.
    ///
    /// A structural map: ring closure, ring order (exterior first, then
    /// holes) and polygon count are preserved. Identity when the systems
    /// match. Fails with [`ProjectionDomainError`] if any coordinate is
    /// outside the target projection's domain; a partially reprojected
    /// geometry is never produced.
    pub fn reproject(&self, from: Crs, to: Crs) -> Result<Self, ProjectionDomainError> {
        if from == to {
            return Ok(self.clone());
        }
        match self {
            ZoneGeometry::Polygon(polygon) => polygon
                .try_map_coords(|coord| reproject_coord(coord, from, to))
                .map(ZoneGeometry::Polygon),
            ZoneGeometry::MultiPolygon(multi) => multi
                .try_map_coords(|coord| reproject_coord(coord, from, to))
                .map(ZoneGeometry::MultiPolygon),
            ZoneGeometry::Other { .. } => Ok(self.clone()),
        }
    }
}
