//! # Reference-frame transformations
//!
//! This module applies the rotation matrices supplied by the ephemeris service to
//! move vectors between reference frames at a given epoch, including the
//! **re-centering translation** needed when the target frame is body-fixed to the
//! Moon while the source vector is expressed about an Earth-centered origin.
//!
//! A rotation matrix alone only changes orientation, never the origin. Crossing
//! from an Earth-centered frame family into a Moon-centered one therefore needs
//! the Moon's position subtracted from the vector *before* the rotation is
//! applied; [`transform`] owns that branch so no caller ever re-centers by hand.
//!
//! The module also provides the principal-axis rotation constructor [`rotmt`] and
//! the local topocentric rotation used for the zenith/azimuth correction.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{Degree, Et};
use crate::ephemeris::EphemerisService;
use crate::selene_errors::SeleneError;

/// Whether a frame name denotes a Moon-body-fixed frame (e.g. `MOON_ME`, `MOON_PA`).
pub fn is_moon_fixed(frame: &str) -> bool {
    frame.contains("MOON")
}

/// Transform a vector between two frames at a given epoch.
///
/// Two cases:
/// 1. The target frame is **not** Moon-body-fixed: the source→target rotation
///    matrix is applied directly, `R·v`.
/// 2. The target frame **is** Moon-body-fixed: the Moon's position in the source
///    frame at `epoch` is subtracted first, moving the origin to the Moon's
///    center, and the rotation is applied to the re-centered vector, `R·(v − m)`.
///    The Moon offset is queried relative to Earth, except when the source frame
///    is itself Moon-body-fixed (the vector is then already Moon-centered and the
///    Moon-relative-to-Moon offset is zero).
///
/// Arguments
/// -----------------
/// * `service`: the ephemeris and frame provider.
/// * `v`: the vector to transform, expressed in `source` (km when re-centering
///   applies, since the Moon position query is in km).
/// * `source`: name of the frame `v` is expressed in.
/// * `target`: name of the destination frame.
/// * `epoch`: TDB seconds past J2000 at which the rotation is evaluated.
///
/// Return
/// ----------
/// * The vector expressed in `target`, about the Moon's center in case 2.
pub fn transform<S: EphemerisService>(
    service: &S,
    v: &Vector3<f64>,
    source: &str,
    target: &str,
    epoch: Et,
) -> Result<Vector3<f64>, SeleneError> {
    let rotation = service.rotation(source, target, epoch)?;
    if !is_moon_fixed(target) {
        return Ok(rotation * v);
    }
    let center = if is_moon_fixed(source) { "MOON" } else { "EARTH" };
    let (moon_pos, _) = service.position("MOON", epoch, source, center)?;
    Ok(rotation * (v - moon_pos))
}

/// Construct a right-handed 3×3 rotation matrix around one of the principal axes.
///
/// Builds an **active rotation** by an angle `alpha` around the chosen axis, in the
/// direct (trigonometric) sense: the rotated vector is `x' = R · x`.
///
/// Arguments
/// -----------------
/// * `alpha`: rotation angle in **radians**.
/// * `k`: axis index, `0` → X, `1` → Y, `2` → Z.
///
/// Panics
/// -------
/// * If `k > 2`, as only axes 0–2 are valid.
pub fn rotmt(alpha: f64, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        2 => Vector3::z_axis(),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Build the body-fixed → local-topocentric rotation for a surface point.
///
/// The matrix corresponds to the Euler sequence `(-(lon+180°), -colat, 0)` about
/// axes `(3, 2, 3)` in the SPICE `eul2m` passive convention, i.e.
/// `R3(lon+180°) · R2(colat)` in active form. Callers apply the **transpose** of
/// this matrix to position vectors (the `mtxv` pattern) before decomposing them
/// into zenith and azimuth.
///
/// Arguments
/// -----------------
/// * `longitude`: geographic longitude of the surface point, in degrees.
/// * `colatitude`: geographic colatitude of the surface point, in degrees.
///
/// See also
/// ------------
/// * [`crate::geometry::zenith_azimuth`] – applies this correction when configured.
pub fn topocentric_rotation(longitude: Degree, colatitude: Degree) -> Matrix3<f64> {
    let lon_rad = (longitude + 180.0).to_radians();
    let colat_rad = colatitude.to_radians();
    rotmt(lon_rad, 2) * rotmt(colat_rad, 1)
}

#[cfg(test)]
mod frames_test {
    use super::*;
    use crate::ephemeris::StateSeries;

    /// Minimal stub: identity-like rotation tilted about z, Moon parked on the +x axis.
    struct StubService {
        rotation: Matrix3<f64>,
        moon_pos: Vector3<f64>,
    }

    impl EphemerisService for StubService {
        fn load_data(&mut self, _path: &str) -> Result<(), SeleneError> {
            Ok(())
        }

        fn unload_all(&mut self) {}

        fn position(
            &self,
            body: &str,
            _epoch: Et,
            _frame: &str,
            center: &str,
        ) -> Result<(Vector3<f64>, f64), SeleneError> {
            match (body, center) {
                ("MOON", "EARTH") => Ok((self.moon_pos, 0.0)),
                ("MOON", "MOON") => Ok((Vector3::zeros(), 0.0)),
                _ => Err(SeleneError::UnknownBody(body.to_string())),
            }
        }

        fn rotation(
            &self,
            _source: &str,
            _target: &str,
            _epoch: Et,
        ) -> Result<Matrix3<f64>, SeleneError> {
            Ok(self.rotation)
        }

        fn body_radii(&self, body: &str) -> Result<(f64, f64), SeleneError> {
            Err(SeleneError::UnknownBody(body.to_string()))
        }

        fn register_synthetic_body(
            &mut self,
            _label: &str,
            _id: i32,
            _center: &str,
            _frame: &str,
            _series: StateSeries,
            _degree: usize,
        ) -> Result<(), SeleneError> {
            Ok(())
        }

        fn time_to_epoch(&self, utc: &str) -> Result<Et, SeleneError> {
            Err(SeleneError::InvalidTimeFormat(utc.to_string()))
        }

        fn epoch_to_time(&self, epoch: Et) -> Result<String, SeleneError> {
            Err(SeleneError::EpochNotCovered(epoch))
        }
    }

    fn stub() -> StubService {
        StubService {
            rotation: rotmt(0.3, 2),
            moon_pos: Vector3::new(384_400.0, 0.0, 0.0),
        }
    }

    #[test]
    fn non_moon_target_is_pure_rotation() {
        let service = stub();
        let v = Vector3::new(1000.0, -2000.0, 500.0);
        let out = transform(&service, &v, "J2000", "ITRF93", 0.0).unwrap();
        assert_eq!(out, service.rotation * v);
    }

    #[test]
    fn moon_target_recenters_before_rotating() {
        let service = stub();
        let v = Vector3::new(1000.0, -2000.0, 500.0);
        let out = transform(&service, &v, "J2000", "MOON_ME", 0.0).unwrap();
        assert_eq!(out, service.rotation * (v - service.moon_pos));
    }

    #[test]
    fn moon_to_moon_frames_skip_recentering() {
        // A vector already Moon-centered must not be translated again.
        let service = stub();
        let v = Vector3::new(1000.0, -2000.0, 500.0);
        let out = transform(&service, &v, "MOON_ME", "MOON_PA", 0.0).unwrap();
        assert_eq!(out, service.rotation * v);
    }

    #[test]
    fn rotmt_z_quarter_turn() {
        let r = rotmt(std::f64::consts::FRAC_PI_2, 2);
        let v = r * Vector3::x();
        assert!((v - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn topocentric_rotation_is_orthonormal() {
        let m = topocentric_rotation(-16.499143, 61.690717);
        let should_be_identity = m * m.transpose();
        assert!((should_be_identity - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn topocentric_rotation_sends_site_direction_to_local_vertical() {
        // Correction angles as the engine derives them: lon mod 180, 90 - (lat mod 90),
        // Euclidean remainders. For this western site the transposed matrix must map
        // the geocentric site direction onto the topocentric +z axis.
        let (lat, lon): (f64, f64) = (28.309283, -16.499143);
        let corr_lon = lon.rem_euclid(180.0);
        let corr_colat = 90.0 - lat.rem_euclid(90.0);
        let up = Vector3::new(
            lat.to_radians().cos() * lon.to_radians().cos(),
            lat.to_radians().cos() * lon.to_radians().sin(),
            lat.to_radians().sin(),
        );
        let m = topocentric_rotation(corr_lon, corr_colat);
        let local = m.transpose() * up;
        assert!(local.z > 0.999_999);
        assert!(local.x.abs() < 1e-6 && local.y.abs() < 1e-6);
    }
}
