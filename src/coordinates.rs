//! # Ellipsoidal coordinate conversions
//!
//! This module implements the rectangular ⇄ planetographic conversions on a biaxial
//! reference ellipsoid, the latitudinal (`r`, `lon`, `lat`) decomposition of a
//! Cartesian vector, and the longitude normalization shared by the geometry engine.
//!
//! ## Conventions
//!
//! - Rectangular coordinates: kilometers, body-fixed, +x through the prime meridian,
//!   +z through the north pole.
//! - Planetographic coordinates: latitude/longitude in **degrees** (east positive),
//!   altitude above the ellipsoid in **meters**.
//! - Longitudes are wrapped into `[-180, 180]` by repeated ±360° adjustment rather
//!   than a single modulo, so values already in range (including ±180 exactly)
//!   pass through untouched.
//!
//! The forward and inverse conversions are pure, stateless, and inverse of each
//! other to within 1e-6 relative tolerance over the valid ellipsoid domain.

use nalgebra::Vector3;

use crate::constants::{
    Degree, Et, Kilometer, Meter, Radian, EARTH_EQUATORIAL_RADIUS, EARTH_POLAR_RADIUS,
    MOON_EQUATORIAL_RADIUS, MOON_POLAR_RADIUS,
};
use crate::ephemeris::EphemerisService;
use crate::frames;
use crate::selene_errors::SeleneError;

/// Convergence threshold of the iterative geodetic latitude refinement, in radians.
const LATITUDE_EPS: Radian = 1e-14;

/// Biaxial reference ellipsoid of a body.
///
/// Immutable per body; the flattening is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub equatorial_radius: Kilometer,
    pub polar_radius: Kilometer,
}

impl Ellipsoid {
    pub fn new(equatorial_radius: Kilometer, polar_radius: Kilometer) -> Self {
        Ellipsoid {
            equatorial_radius,
            polar_radius,
        }
    }

    /// Default lunar ellipsoid (1738.1 / 1736.0 km).
    pub fn moon() -> Self {
        Ellipsoid::new(MOON_EQUATORIAL_RADIUS, MOON_POLAR_RADIUS)
    }

    /// Earth reference ellipsoid (IERS 2003 radii).
    pub fn earth() -> Self {
        Ellipsoid::new(EARTH_EQUATORIAL_RADIUS, EARTH_POLAR_RADIUS)
    }

    /// Flattening `(eq - pol) / eq`.
    pub fn flattening(&self) -> f64 {
        (self.equatorial_radius - self.polar_radius) / self.equatorial_radius
    }

    /// First eccentricity squared, `f (2 - f)`.
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }
}

/// Wrap a longitude into `[-180, 180]` degrees by repeated ±360° adjustment.
///
/// The loop form converges in a bounded number of steps for any finite input and
/// leaves values already in range untouched, including -180 and 180 themselves.
pub fn normalize_longitude(mut lon: Degree) -> Degree {
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

/// Decompose a Cartesian vector into range, longitude, and latitude.
///
/// Equivalent of the classical `reclat` routine: `lon = atan2(y, x)`,
/// `lat = atan2(z, √(x² + y²))`.
///
/// Arguments
/// -----------------
/// * `v`: the vector to decompose, any length unit.
///
/// Return
/// ----------
/// * `(range, lon_rad, lat_rad)` with `lon ∈ [-π, π]`, `lat ∈ [-π/2, π/2]`.
///
/// Errors
/// ----------
/// * [`SeleneError::DegenerateVector`] if `v` has zero length: the angles would be
///   undefined and must not silently become NaN.
pub fn latitudinal(v: &Vector3<f64>) -> Result<(f64, Radian, Radian), SeleneError> {
    let range = v.norm();
    if range == 0.0 {
        return Err(SeleneError::DegenerateVector("latitudinal"));
    }
    let lon = v.y.atan2(v.x);
    let lat = v.z.atan2(v.x.hypot(v.y));
    Ok((range, lon, lat))
}

/// Convert planetographic coordinates to a body-fixed rectangular vector.
///
/// Closed-form construction of the ellipsoid point from geodetic latitude,
/// longitude, and height, through the prime-vertical radius of curvature.
///
/// Arguments
/// -----------------
/// * `latitude`: geodetic latitude in degrees.
/// * `longitude`: longitude in degrees, east positive.
/// * `altitude`: height above the ellipsoid in **meters**.
/// * `ellipsoid`: the body's reference ellipsoid.
///
/// Return
/// ----------
/// * Body-fixed rectangular coordinates in **kilometers**.
///
/// See also
/// ------------
/// * [`rectangular_to_planetographic`] – the exact inverse.
pub fn planetographic_to_rectangular(
    latitude: Degree,
    longitude: Degree,
    altitude: Meter,
    ellipsoid: &Ellipsoid,
) -> Vector3<f64> {
    let lat = latitude.to_radians();
    let lon = longitude.to_radians();
    let alt_km = altitude / 1000.0;
    let e2 = ellipsoid.eccentricity_squared();

    // Prime-vertical radius of curvature at this latitude.
    let n = ellipsoid.equatorial_radius / (1.0 - e2 * lat.sin() * lat.sin()).sqrt();

    Vector3::new(
        (n + alt_km) * lat.cos() * lon.cos(),
        (n + alt_km) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + alt_km) * lat.sin(),
    )
}

/// Convert a body-fixed rectangular vector to planetographic coordinates.
///
/// Standard biaxial-ellipsoid geodetic inversion: the latitude is refined by
/// fixed-point iteration on `lat = atan2(z + e²·N·sin(lat), √(x²+y²))`, which
/// converges in a handful of steps everywhere off the polar axis. On the polar
/// axis the latitude is ±90° and the altitude is measured against the polar
/// radius directly.
///
/// Arguments
/// -----------------
/// * `xyz`: body-fixed rectangular coordinates in **kilometers**.
/// * `ellipsoid`: the body's reference ellipsoid.
///
/// Return
/// ----------
/// * `(lon_deg, lat_deg, alt_m)`, longitude wrapped into `[-180, 180]`.
///
/// See also
/// ------------
/// * [`planetographic_to_rectangular`] – the exact inverse.
pub fn rectangular_to_planetographic(
    xyz: &Vector3<f64>,
    ellipsoid: &Ellipsoid,
) -> (Degree, Degree, Meter) {
    let e2 = ellipsoid.eccentricity_squared();
    let r = xyz.x.hypot(xyz.y);

    // Polar axis: longitude is conventionally zero, altitude against the polar radius.
    if r == 0.0 {
        let lat = if xyz.z >= 0.0 { 90.0 } else { -90.0 };
        return (0.0, lat, (xyz.z.abs() - ellipsoid.polar_radius) * 1000.0);
    }

    let lon = xyz.y.atan2(xyz.x);

    let mut lat = xyz.z.atan2(r * (1.0 - e2));
    let mut n = ellipsoid.equatorial_radius;
    for _ in 0..10 {
        n = ellipsoid.equatorial_radius / (1.0 - e2 * lat.sin() * lat.sin()).sqrt();
        let next = (xyz.z + e2 * n * lat.sin()).atan2(r);
        let converged = (next - lat).abs() < LATITUDE_EPS;
        lat = next;
        if converged {
            break;
        }
    }

    let alt_km = r / lat.cos() - n;

    (
        normalize_longitude(lon.to_degrees()),
        lat.to_degrees(),
        alt_km * 1000.0,
    )
}

/// Convert surface coordinates to rectangular vectors in a target frame, one epoch each.
///
/// For every `(lat, lon, alt)` triple the point is built on the ellipsoid in the
/// body-fixed `source` frame, then pushed through [`frames::transform`] at the
/// matching epoch. Input altitudes and output coordinates are in **meters**.
///
/// Arguments
/// -----------------
/// * `service`: the ephemeris and frame provider.
/// * `points`: `(lat_deg, lon_deg, alt_m)` triples.
/// * `epochs`: one epoch per point, TDB seconds past J2000.
/// * `ellipsoid`: ellipsoid of the body the points sit on.
/// * `source`: body-fixed frame the points are constructed in.
/// * `target`: frame of the returned vectors.
pub fn rectangular_in_frame<S: EphemerisService>(
    service: &S,
    points: &[(Degree, Degree, Meter)],
    epochs: &[Et],
    ellipsoid: &Ellipsoid,
    source: &str,
    target: &str,
) -> Result<Vec<Vector3<f64>>, SeleneError> {
    points
        .iter()
        .zip(epochs)
        .map(|(&(lat, lon, alt), &et)| {
            let pos = planetographic_to_rectangular(lat, lon, alt, ellipsoid);
            let out = frames::transform(service, &pos, source, target, et)?;
            Ok(out * 1000.0)
        })
        .collect()
}

/// Convert rectangular vectors in a source frame to surface coordinates, one epoch each.
///
/// Inverse companion of [`rectangular_in_frame`]: each vector (in **meters**) is
/// pushed through [`frames::transform`] into the body-fixed `target` frame at its
/// epoch, then inverted on the ellipsoid. Longitudes come out wrapped into
/// `[-180, 180]`, altitudes in meters.
pub fn planetographic_in_frame<S: EphemerisService>(
    service: &S,
    positions: &[Vector3<f64>],
    epochs: &[Et],
    ellipsoid: &Ellipsoid,
    source: &str,
    target: &str,
) -> Result<Vec<(Degree, Degree, Meter)>, SeleneError> {
    positions
        .iter()
        .zip(epochs)
        .map(|(xyz, &et)| {
            let pos_km = xyz / 1000.0;
            let fixed = frames::transform(service, &pos_km, source, target, et)?;
            let (lon, lat, alt) = rectangular_to_planetographic(&fixed, ellipsoid);
            Ok((lat, lon, alt))
        })
        .collect()
}

#[cfg(test)]
mod coordinates_test {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} != {b} (tol {tol})");
    }

    #[test]
    fn round_trip_earth_site() {
        let ellipsoid = Ellipsoid::earth();
        let (lat, lon, alt) = (28.309283, -16.499143, 2400.0);
        let xyz = planetographic_to_rectangular(lat, lon, alt, &ellipsoid);
        let (lon_out, lat_out, alt_out) = rectangular_to_planetographic(&xyz, &ellipsoid);
        assert_close(lat_out, lat, 1e-9);
        assert_close(lon_out, lon, 1e-9);
        assert_close(alt_out, alt, 1e-3);
    }

    #[test]
    fn round_trip_moon_site() {
        let ellipsoid = Ellipsoid::moon();
        let (lat, lon, alt) = (-43.3, 171.9, 350.0);
        let xyz = planetographic_to_rectangular(lat, lon, alt, &ellipsoid);
        let (lon_out, lat_out, alt_out) = rectangular_to_planetographic(&xyz, &ellipsoid);
        assert_close(lat_out, lat, 1e-9);
        assert_close(lon_out, lon, 1e-9);
        assert_close(alt_out, alt, 1e-3);
    }

    #[test]
    fn equator_point_is_equatorial_radius() {
        let ellipsoid = Ellipsoid::moon();
        let xyz = planetographic_to_rectangular(0.0, 0.0, 0.0, &ellipsoid);
        assert_close(xyz.x, ellipsoid.equatorial_radius, 1e-9);
        assert_close(xyz.y, 0.0, 1e-9);
        assert_close(xyz.z, 0.0, 1e-9);
    }

    #[test]
    fn polar_axis_inversion() {
        let ellipsoid = Ellipsoid::moon();
        let xyz = Vector3::new(0.0, 0.0, -(ellipsoid.polar_radius + 1.0));
        let (lon, lat, alt) = rectangular_to_planetographic(&xyz, &ellipsoid);
        assert_eq!(lon, 0.0);
        assert_eq!(lat, -90.0);
        assert_close(alt, 1000.0, 1e-6);
    }

    #[test]
    fn longitude_wrap_converges() {
        assert_close(normalize_longitude(725.0), 5.0, 1e-12);
        assert_close(normalize_longitude(-545.0), 175.0, 1e-12);
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), -180.0);
    }

    #[test]
    fn latitudinal_rejects_zero_vector() {
        let err = latitudinal(&Vector3::zeros()).unwrap_err();
        assert_eq!(err, SeleneError::DegenerateVector("latitudinal"));
    }

    #[test]
    fn latitudinal_matches_spherical_angles() {
        let (r, lon, lat) = latitudinal(&Vector3::new(1.0, 1.0, 2.0_f64.sqrt())).unwrap();
        assert_close(r, 2.0, 1e-12);
        assert_close(lon, std::f64::consts::FRAC_PI_4, 1e-12);
        assert_close(lat, std::f64::consts::FRAC_PI_4, 1e-12);
    }
}
