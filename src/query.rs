//! Radius queries: bounding-box construction for upstream feature search.
//!
//! Radius search is delegated to an external feature service; this
//! module only builds the axis-aligned box the caller embeds into that
//! request. The box is a deliberately loose filter, not a precise
//! circle. In grid units it spans the circle exactly; in geographic
//! coordinates the radius is converted with the equatorial
//! approximation (one degree is taken as 111km on both axes), so
//! callers needing exact radius membership post-filter the results.

use crate::crs::Crs;
use crate::error::{HydrozoneError, Result};
use geo::{Point, Rect, coord};

/// Meters per degree at the equator, the small-radius approximation
/// applied to both axes in geographic coordinates.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Axis-aligned bounding box spanning a radius around a center point.
///
/// The center and the returned box are both expressed in `crs`. The
/// extent is `radius_meters` converted to the system's units: meters
/// as-is on the grid, `radius / 111_000` degrees for WGS84.
///
/// # Errors
///
/// [`HydrozoneError::InvalidInput`] for a non-finite center or a
/// radius that is not finite and positive.
///
/// # Examples
///
/// ```
/// use hydrozone::{Crs, Point, bounding_box_for_radius};
///
/// let rect = bounding_box_for_radius(Point::new(0.0, 0.0), 1000.0, Crs::Wgs84)?;
/// assert!((rect.max().x - 0.009).abs() < 1e-4);
/// # Ok::<(), hydrozone::HydrozoneError>(())
/// ```
pub fn bounding_box_for_radius(
    center: Point<f64>,
    radius_meters: f64,
    crs: Crs,
) -> Result<Rect<f64>> {
    if !center.x().is_finite() || !center.y().is_finite() {
        return Err(HydrozoneError::InvalidInput(format!(
            "center ({}, {}) is not finite",
            center.x(),
            center.y()
        )));
    }
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(HydrozoneError::InvalidInput(format!(
            "radius must be a positive number of meters, got {radius_meters}"
        )));
    }

    let extent = match crs {
        Crs::Wgs84 => radius_meters / METERS_PER_DEGREE,
        Crs::NationalGrid => radius_meters,
    };

    Ok(Rect::new(
        coord! { x: center.x() - extent, y: center.y() - extent },
        coord! { x: center.x() + extent, y: center.y() + extent },
    ))
}

/// Render a bounding box as a WFS `BBOX` filter value:
/// `minx,miny,maxx,maxy,EPSG:code`.
///
/// This is the narrow contract consumed by the upstream feature-search
/// call; the engine itself never issues the request.
pub fn bbox_query_param(rect: &Rect<f64>, crs: Crs) -> String {
    format!(
        "{},{},{},{},EPSG:{}",
        rect.min().x,
        rect.min().y,
        rect.max().x,
        rect.max().y,
        crs.epsg_code()
    )
}
