//! # Ephemeris & frame service contract
//!
//! This module defines [`EphemerisService`], the trait through which the library
//! consumes an external ephemeris and orientation provider, together with the
//! [`StateSeries`] container used to hand a synthetic observer trajectory to that
//! provider.
//!
//! The service is a **shared, process-wide, non-reentrant resource**: data must be
//! loaded before any query and explicitly released afterward. The
//! [`Selene`](crate::selene::Selene) session owns one service instance and scopes
//! the load/unload lifecycle around each batch; concurrent sessions require one
//! service instance per worker, never shared.
//!
//! The crate never computes ephemerides from first principles. Positions, rotation
//! matrices, body radii, and the UTC ↔ epoch conversions all come from the service;
//! the library only derives angles and distances from them.

use itertools::Itertools;
use nalgebra::{Matrix3, Vector3, Vector6};

use crate::constants::{Et, Kilometer};
use crate::selene_errors::SeleneError;

/// One time-tagged state of the synthetic observer: position (km) and
/// velocity (km/s) relative to the center body, expressed in the registration frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSample {
    /// TDB seconds past J2000.
    pub epoch: Et,
    /// `[x, y, z, vx, vy, vz]` in km and km/s.
    pub state: Vector6<f64>,
}

impl StateSample {
    pub fn new(epoch: Et, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        let mut state = Vector6::zeros();
        state.fixed_rows_mut::<3>(0).copy_from(&position);
        state.fixed_rows_mut::<3>(3).copy_from(&velocity);
        StateSample { epoch, state }
    }

    pub fn position(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(0).into_owned()
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(3).into_owned()
    }
}

/// Ordered sequence of time-tagged observer states, suitable for registration as a
/// discrete-trajectory body queryable by Lagrange interpolation.
///
/// Invariants (checked by [`StateSeries::validate`]):
/// - epochs strictly increasing, no duplicates;
/// - length at least `degree + 1`.
///
/// The series may contain disjoint clusters when the requested epochs are far
/// apart; sample spacing is constant within each cluster.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateSeries {
    samples: Vec<StateSample>,
}

impl StateSeries {
    pub fn new(samples: Vec<StateSample>) -> Self {
        StateSeries { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[StateSample] {
        &self.samples
    }

    /// First covered epoch. Empty series yields `None`.
    pub fn first_epoch(&self) -> Option<Et> {
        self.samples.first().map(|s| s.epoch)
    }

    /// Last covered epoch. Empty series yields `None`.
    pub fn last_epoch(&self) -> Option<Et> {
        self.samples.last().map(|s| s.epoch)
    }

    /// Check the series invariants for a given interpolation degree.
    ///
    /// Arguments
    /// -----------------
    /// * `degree`: Lagrange polynomial degree the consumer will interpolate with.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` if the series is usable, [`SeleneError::InvalidStateSeries`] otherwise.
    pub fn validate(&self, degree: usize) -> Result<(), SeleneError> {
        if self.samples.len() < degree + 1 {
            return Err(SeleneError::InvalidStateSeries(format!(
                "{} states, need at least {} for degree {}",
                self.samples.len(),
                degree + 1,
                degree
            )));
        }
        let monotonic = self
            .samples
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.epoch < b.epoch);
        if !monotonic {
            return Err(SeleneError::InvalidStateSeries(
                "epochs must be strictly increasing and unique".to_string(),
            ));
        }
        Ok(())
    }
}

/// Contract offered by the external ephemeris and orientation provider.
///
/// Implementations wrap an actual kernel-backed toolkit; the in-tree tests use an
/// analytic mock. All operations are blocking; no suspension points exist.
pub trait EphemerisService {
    /// Idempotent append of a data file to the process-wide loaded set.
    ///
    /// May fail transiently; the [`Selene`](crate::selene::Selene) session applies
    /// the retry-once policy on top of this call.
    fn load_data(&mut self, path: &str) -> Result<(), SeleneError>;

    /// Clear the process-wide loaded set, including synthetic trajectories.
    fn unload_all(&mut self);

    /// Position of `body` relative to `center` in `frame` at `epoch`.
    ///
    /// Return
    /// ----------
    /// * `(position_km, light_time_s)`.
    fn position(
        &self,
        body: &str,
        epoch: Et,
        frame: &str,
        center: &str,
    ) -> Result<(Vector3<f64>, f64), SeleneError>;

    /// Rotation matrix taking vectors from `source` to `target` at `epoch`.
    fn rotation(&self, source: &str, target: &str, epoch: Et) -> Result<Matrix3<f64>, SeleneError>;

    /// Equatorial and polar radii of a body, in kilometers.
    fn body_radii(&self, body: &str) -> Result<(Kilometer, Kilometer), SeleneError>;

    /// Make a synthetic trajectory queryable through [`EphemerisService::position`].
    ///
    /// Arguments
    /// -----------------
    /// * `label`: body name under which the trajectory will be queried.
    /// * `id`: numeric body id for SPK-style backends.
    /// * `center`: name of the body the states are relative to.
    /// * `frame`: frame the states are expressed in.
    /// * `series`: the time-tagged states (validated against `degree`).
    /// * `degree`: Lagrange interpolation degree the backend must apply.
    fn register_synthetic_body(
        &mut self,
        label: &str,
        id: i32,
        center: &str,
        frame: &str,
        series: StateSeries,
        degree: usize,
    ) -> Result<(), SeleneError>;

    /// Convert a UTC time string to TDB seconds past J2000.
    fn time_to_epoch(&self, utc: &str) -> Result<Et, SeleneError>;

    /// Convert TDB seconds past J2000 back to a UTC time string.
    fn epoch_to_time(&self, epoch: Et) -> Result<String, SeleneError>;
}

#[cfg(test)]
mod state_series_test {
    use super::*;

    fn sample(epoch: f64) -> StateSample {
        StateSample::new(epoch, Vector3::new(1.0, 2.0, 3.0), Vector3::zeros())
    }

    #[test]
    fn validate_accepts_minimum_length() {
        let series = StateSeries::new((0..6).map(|i| sample(i as f64)).collect());
        assert!(series.validate(5).is_ok());
    }

    #[test]
    fn validate_rejects_short_series() {
        let series = StateSeries::new((0..5).map(|i| sample(i as f64)).collect());
        assert!(matches!(
            series.validate(5),
            Err(SeleneError::InvalidStateSeries(_))
        ));
    }

    #[test]
    fn validate_rejects_duplicate_epochs() {
        let mut samples: Vec<_> = (0..6).map(|i| sample(i as f64)).collect();
        samples[3] = sample(2.0);
        let series = StateSeries::new(samples);
        assert!(matches!(
            series.validate(5),
            Err(SeleneError::InvalidStateSeries(_))
        ));
    }

    #[test]
    fn sample_accessors_split_state() {
        let s = StateSample::new(0.0, Vector3::new(1.0, 2.0, 3.0), Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(s.position(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(s.velocity(), Vector3::new(4.0, 5.0, 6.0));
    }
}
