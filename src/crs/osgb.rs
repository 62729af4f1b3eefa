//! OSGB36 <-> WGS84 transformation primitives.
//!
//! The National Grid is a transverse Mercator projection of the OSGB36
//! datum (Airy 1830 ellipsoid). Converting a grid coordinate to WGS84
//! longitude/latitude therefore takes three steps: inverse-project to
//! OSGB36 geodetic coordinates, convert to geocentric cartesian, apply a
//! 7-parameter Helmert shift to the WGS84 frame, and convert back to
//! geodetic. The reverse direction runs the same pipeline with the
//! negated Helmert parameters and the forward projection.
//!
//! The projection series and the meridional-arc expansion follow the
//! Ordnance Survey's published formulas. The Helmert shift is the small-
//! angle position-vector form; against the national transformation model
//! it is accurate to a couple of meters, which is well inside the
//! sub-meter round-trip tolerance this crate promises for its own
//! forward/inverse pair.

use crate::crs::Crs;
use crate::error::ProjectionDomainError;
use std::f64::consts::PI;

/// Reference ellipsoid, semi-major and semi-minor axes in meters.
#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    /// First eccentricity squared.
    fn e2(&self) -> f64 {
        (self.a * self.a - self.b * self.b) / (self.a * self.a)
    }
}

const AIRY_1830: Ellipsoid = Ellipsoid {
    a: 6_377_563.396,
    b: 6_356_256.909,
};

const WGS84_ELLIPSOID: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    b: 6_356_752.314_245,
};

// National Grid transverse Mercator parameters.
const SCALE_F0: f64 = 0.999_601_271_7;
const LAT0: f64 = 49.0 * PI / 180.0;
const LON0: f64 = -2.0 * PI / 180.0;
const FALSE_EASTING: f64 = 400_000.0;
const FALSE_NORTHING: f64 = -100_000.0;

const ARCSEC_TO_RAD: f64 = PI / (180.0 * 3600.0);

/// 7-parameter Helmert transform, position-vector rotation convention.
#[derive(Debug, Clone, Copy)]
struct Helmert {
    tx: f64,
    ty: f64,
    tz: f64,
    /// Scale correction, unitless (ppm already applied).
    s: f64,
    /// Rotations in radians.
    rx: f64,
    ry: f64,
    rz: f64,
}

/// OSGB36 -> WGS84. The reverse direction negates every parameter.
const OSGB36_TO_WGS84: Helmert = Helmert {
    tx: 446.448,
    ty: -125.157,
    tz: 542.060,
    s: -20.4894e-6,
    rx: 0.1502 * ARCSEC_TO_RAD,
    ry: 0.2470 * ARCSEC_TO_RAD,
    rz: 0.8421 * ARCSEC_TO_RAD,
};

impl Helmert {
    fn inverse(self) -> Self {
        Self {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            s: -self.s,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
        }
    }

    fn apply(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        let scale = 1.0 + self.s;
        [
            self.tx + scale * x - self.rz * y + self.ry * z,
            self.ty + self.rz * x + scale * y - self.rx * z,
            self.tz - self.ry * x + self.rx * y + scale * z,
        ]
    }
}

// Domain accepted by the grid projection, generous margins around the
// published extent (0..700km E, 0..1300km N; ~49.8°N-60.9°N, 9°W-2°E).
const GRID_MIN_EASTING: f64 = -250_000.0;
const GRID_MAX_EASTING: f64 = 950_000.0;
const GRID_MIN_NORTHING: f64 = -350_000.0;
const GRID_MAX_NORTHING: f64 = 1_600_000.0;
const TM_MIN_LAT_DEG: f64 = 44.0;
const TM_MAX_LAT_DEG: f64 = 66.0;
const TM_MAX_LON_OFFSET_DEG: f64 = 10.0;

const MAX_ITERATIONS: usize = 32;

/// Meridional arc from `LAT0` to `phi` on the Airy ellipsoid, scaled by `F0`.
fn meridional_arc(phi: f64) -> f64 {
    let Ellipsoid { a, b } = AIRY_1830;
    let n = (a - b) / (a + b);
    let n2 = n * n;
    let n3 = n2 * n;
    let dphi = phi - LAT0;
    let sphi = phi + LAT0;

    b * SCALE_F0
        * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dphi
            - (3.0 * n + 3.0 * n2 + 2.625 * n3) * dphi.sin() * sphi.cos()
            + (1.875 * n2 + 1.875 * n3) * (2.0 * dphi).sin() * (2.0 * sphi).cos()
            - (35.0 / 24.0) * n3 * (3.0 * dphi).sin() * (3.0 * sphi).cos())
}

/// Forward transverse Mercator: OSGB36 geodetic (radians) to grid meters.
fn tm_forward(phi: f64, lambda: f64) -> (f64, f64) {
    let Ellipsoid { a, .. } = AIRY_1830;
    let e2 = AIRY_1830.e2();

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();
    let tan2 = tan_phi * tan_phi;
    let tan4 = tan2 * tan2;

    let nu = a * SCALE_F0 / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let rho = a * SCALE_F0 * (1.0 - e2) / (1.0 - e2 * sin_phi * sin_phi).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let m = meridional_arc(phi);

    let i = m + FALSE_NORTHING;
    let ii = (nu / 2.0) * sin_phi * cos_phi;
    let iii = (nu / 24.0) * sin_phi * cos_phi.powi(3) * (5.0 - tan2 + 9.0 * eta2);
    let iiia = (nu / 720.0) * sin_phi * cos_phi.powi(5) * (61.0 - 58.0 * tan2 + tan4);
    let iv = nu * cos_phi;
    let v = (nu / 6.0) * cos_phi.powi(3) * (nu / rho - tan2);
    let vi = (nu / 120.0)
        * cos_phi.powi(5)
        * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta2 - 58.0 * tan2 * eta2);

    let dl = lambda - LON0;
    let northing = i + ii * dl.powi(2) + iii * dl.powi(4) + iiia * dl.powi(6);
    let easting = FALSE_EASTING + iv * dl + v * dl.powi(3) + vi * dl.powi(5);

    (easting, northing)
}

/// Inverse transverse Mercator: grid meters to OSGB36 geodetic (radians).
fn tm_inverse(easting: f64, northing: f64) -> Option<(f64, f64)> {
    let Ellipsoid { a, .. } = AIRY_1830;
    let e2 = AIRY_1830.e2();

    // Iterate the footpoint latitude until the meridional arc matches
    // the northing to within 0.01mm.
    let mut phi = (northing - FALSE_NORTHING) / (a * SCALE_F0) + LAT0;
    let mut m = meridional_arc(phi);
    let mut iterations = 0;
    while (northing - FALSE_NORTHING - m).abs() >= 1e-5 {
        phi += (northing - FALSE_NORTHING - m) / (a * SCALE_F0);
        m = meridional_arc(phi);
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return None;
        }
    }

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let sec_phi = 1.0 / cos_phi;
    let tan_phi = phi.tan();
    let tan2 = tan_phi * tan_phi;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;

    let nu = a * SCALE_F0 / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let rho = a * SCALE_F0 * (1.0 - e2) / (1.0 - e2 * sin_phi * sin_phi).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let vii = tan_phi / (2.0 * rho * nu);
    let viii = tan_phi / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan_phi / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = sec_phi / nu;
    let xi = sec_phi / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
    let xii = sec_phi / (120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia = sec_phi / (5040.0 * nu.powi(7)) * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

    let de = easting - FALSE_EASTING;
    let lat = phi - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let lon = LON0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);

    Some((lat, lon))
}

/// Geodetic (radians, zero height) to geocentric cartesian meters.
fn geodetic_to_cartesian(phi: f64, lambda: f64, ell: Ellipsoid) -> [f64; 3] {
    let e2 = ell.e2();
    let sin_phi = phi.sin();
    let nu = ell.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();

    [
        nu * phi.cos() * lambda.cos(),
        nu * phi.cos() * lambda.sin(),
        nu * (1.0 - e2) * sin_phi,
    ]
}

/// Geocentric cartesian meters to geodetic (radians), iterative.
fn cartesian_to_geodetic([x, y, z]: [f64; 3], ell: Ellipsoid) -> Option<(f64, f64)> {
    let e2 = ell.e2();
    let p = (x * x + y * y).sqrt();

    let mut phi = z.atan2(p * (1.0 - e2));
    let mut iterations = 0;
    loop {
        let sin_phi = phi.sin();
        let nu = ell.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let next = (z + e2 * nu * sin_phi).atan2(p);
        let done = (next - phi).abs() < 1e-12;
        phi = next;
        if done {
            break;
        }
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return None;
        }
    }

    Some((phi, y.atan2(x)))
}

/// National Grid easting/northing to WGS84 (longitude, latitude) degrees.
pub(crate) fn grid_to_wgs84(
    easting: f64,
    northing: f64,
) -> Result<(f64, f64), ProjectionDomainError> {
    let domain_err =
        |reason| ProjectionDomainError::new(Crs::NationalGrid, easting, northing, reason);

    if !easting.is_finite() || !northing.is_finite() {
        return Err(domain_err("coordinate is not finite"));
    }
    if !(GRID_MIN_EASTING..=GRID_MAX_EASTING).contains(&easting)
        || !(GRID_MIN_NORTHING..=GRID_MAX_NORTHING).contains(&northing)
    {
        return Err(domain_err("coordinate is outside the grid extent"));
    }

    let (phi, lambda) =
        tm_inverse(easting, northing).ok_or_else(|| domain_err("inverse projection diverged"))?;

    let cartesian = geodetic_to_cartesian(phi, lambda, AIRY_1830);
    let shifted = OSGB36_TO_WGS84.apply(cartesian);
    let (lat, lon) = cartesian_to_geodetic(shifted, WGS84_ELLIPSOID)
        .ok_or_else(|| domain_err("datum conversion diverged"))?;

    Ok((lon.to_degrees(), lat.to_degrees()))
}

/// WGS84 (longitude, latitude) degrees to National Grid easting/northing.
pub(crate) fn wgs84_to_grid(lon: f64, lat: f64) -> Result<(f64, f64), ProjectionDomainError> {
    let domain_err = |reason| ProjectionDomainError::new(Crs::Wgs84, lon, lat, reason);

    if !lon.is_finite() || !lat.is_finite() {
        return Err(domain_err("coordinate is not finite"));
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(domain_err("longitude/latitude out of range"));
    }
    if !(TM_MIN_LAT_DEG..=TM_MAX_LAT_DEG).contains(&lat) {
        return Err(domain_err("latitude is outside the projection's band"));
    }
    if (lon - LON0.to_degrees()).abs() > TM_MAX_LON_OFFSET_DEG {
        return Err(domain_err("longitude is too far from the central meridian"));
    }

    let cartesian = geodetic_to_cartesian(lat.to_radians(), lon.to_radians(), WGS84_ELLIPSOID);
    let shifted = OSGB36_TO_WGS84.inverse().apply(cartesian);
    let (phi, lambda) = cartesian_to_geodetic(shifted, AIRY_1830)
        .ok_or_else(|| domain_err("datum conversion diverged"))?;

    Ok(tm_forward(phi, lambda))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dms(d: f64, m: f64, s: f64) -> f64 {
        d + m / 60.0 + s / 3600.0
    }

    #[test]
    fn test_tm_forward_matches_os_worked_example() {
        // Ordnance Survey worked example: OSGB36 geodetic coordinates of
        // a point near Caister-on-Sea and its published grid position.
        let phi = dms(52.0, 39.0, 27.2531).to_radians();
        let lambda = dms(1.0, 43.0, 4.5177).to_radians();

        let (easting, northing) = tm_forward(phi, lambda);
        assert!((easting - 651_409.903).abs() < 0.01, "easting {easting}");
        assert!((northing - 313_177.270).abs() < 0.01, "northing {northing}");
    }

    #[test]
    fn test_tm_round_trip() {
        let phi = dms(52.0, 39.0, 27.2531).to_radians();
        let lambda = dms(1.0, 43.0, 4.5177).to_radians();

        let (easting, northing) = tm_forward(phi, lambda);
        let (phi2, lambda2) = tm_inverse(easting, northing).unwrap();
        assert!((phi - phi2).abs() < 1e-10);
        assert!((lambda - lambda2).abs() < 1e-10);
    }

    #[test]
    fn test_tm_forward_true_origin() {
        // The true origin projects onto the false origin by construction.
        let (easting, northing) = tm_forward(LAT0, LON0);
        assert!((easting - FALSE_EASTING).abs() < 1e-6);
        assert!((northing - FALSE_NORTHING).abs() < 1e-6);
    }

    #[test]
    fn test_helmert_inverse_round_trip() {
        let p = geodetic_to_cartesian(52.0_f64.to_radians(), -1.5_f64.to_radians(), AIRY_1830);
        let shifted = OSGB36_TO_WGS84.apply(p);
        let back = OSGB36_TO_WGS84.inverse().apply(shifted);

        // Negating the parameters inverts the transform up to cross
        // terms like s*t, a centimeter or two at earth radius.
        for (a, b) in p.iter().zip(back.iter()) {
            assert!((a - b).abs() < 0.05, "{a} vs {b}");
        }
    }

    #[test]
    fn test_cartesian_round_trip() {
        let phi = 54.5_f64.to_radians();
        let lambda = (-3.0_f64).to_radians();
        let cartesian = geodetic_to_cartesian(phi, lambda, WGS84_ELLIPSOID);
        let (phi2, lambda2) = cartesian_to_geodetic(cartesian, WGS84_ELLIPSOID).unwrap();
        assert!((phi - phi2).abs() < 1e-11);
        assert!((lambda - lambda2).abs() < 1e-11);
    }

    #[test]
    fn test_full_chain_round_trip_is_centimeter_level() {
        let (lon, lat) = grid_to_wgs84(530_000.0, 180_000.0).unwrap();
        let (easting, northing) = wgs84_to_grid(lon, lat).unwrap();
        assert!((easting - 530_000.0).abs() < 0.05, "easting {easting}");
        assert!((northing - 180_000.0).abs() < 0.05, "northing {northing}");
    }

    #[test]
    fn test_london_lands_in_the_right_square() {
        // Trafalgar Square, WGS84. The grid reference is around
        // E 530000 N 180400; a kilometer box is ample for the Helmert
        // shift's accuracy.
        let (easting, northing) = wgs84_to_grid(-0.1281, 51.5080).unwrap();
        assert!((529_000.0..=531_000.0).contains(&easting), "{easting}");
        assert!((179_400.0..=181_400.0).contains(&northing), "{northing}");
    }

    #[test]
    fn test_grid_domain_is_enforced() {
        assert!(grid_to_wgs84(5_000_000.0, 0.0).is_err());
        assert!(grid_to_wgs84(0.0, -2_000_000.0).is_err());
        assert!(grid_to_wgs84(f64::NAN, 0.0).is_err());
        assert!(grid_to_wgs84(400_000.0, 300_000.0).is_ok());
    }

    #[test]
    fn test_geographic_domain_is_enforced() {
        // Too far from the central meridian.
        assert!(wgs84_to_grid(100.0, 52.0).is_err());
        // Outside the projection's latitude band.
        assert!(wgs84_to_grid(-2.0, 10.0).is_err());
        assert!(wgs84_to_grid(f64::INFINITY, 52.0).is_err());
        assert!(wgs84_to_grid(-0.1, 51.5).is_ok());
    }
}
