//! # Observer surface points and synthetic trajectories
//!
//! A fixed point on the surface of the Earth or the Moon cannot be queried through
//! a position API that only knows tracked bodies. This module closes that gap:
//!
//! - [`SurfacePoint`] stores the observer's planetographic coordinates, guarded by
//!   `NotNan` so NaN can never enter the geometry pipeline.
//! - [`ObserverStateBuilder`] samples the point around every requested epoch,
//!   rotates it into the requested frame, and differentiates the positions into a
//!   [`StateSeries`](crate::ephemeris::StateSeries) a generic ephemeris service can
//!   register as the trajectory of a synthetic body.
//!
//! Once registered, the surface point is indistinguishable from a real tracked
//! body: the geometry engine queries it through ordinary `position()` calls, and
//! the service interpolates between the Δt-spaced samples with a Lagrange
//! polynomial of the configured degree.

use nalgebra::Vector3;
use ordered_float::NotNan;

use crate::constants::{
    Degree, Et, Meter, EARTH_FIXED_FRAME, EARTH_OBSERVER_ID, INTERPOLATION_DEGREE,
    MOON_FIXED_FRAME, MOON_OBSERVER_ID, STATE_DELTA_T,
};
use crate::coordinates::{planetographic_to_rectangular, Ellipsoid};
use crate::ephemeris::{EphemerisService, StateSample, StateSeries};
use crate::selene_errors::SeleneError;

/// Body an observer is fixed to, with its synthetic-body identity and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverBody {
    Earth,
    Moon,
}

impl ObserverBody {
    /// Body name understood by the ephemeris service.
    pub fn name(&self) -> &'static str {
        match self {
            ObserverBody::Earth => "EARTH",
            ObserverBody::Moon => "MOON",
        }
    }

    /// Numeric id under which the synthetic observer is registered.
    pub fn synthetic_id(&self) -> i32 {
        match self {
            ObserverBody::Earth => EARTH_OBSERVER_ID,
            ObserverBody::Moon => MOON_OBSERVER_ID,
        }
    }

    /// Body label under which the synthetic observer is queried.
    pub fn synthetic_label(&self) -> &'static str {
        match self {
            ObserverBody::Earth => "EARTH-OBSERVER",
            ObserverBody::Moon => "MOON-OBSERVER",
        }
    }

    /// Default body-fixed frame of this body.
    pub fn fixed_frame(&self) -> &'static str {
        match self {
            ObserverBody::Earth => EARTH_FIXED_FRAME,
            ObserverBody::Moon => MOON_FIXED_FRAME,
        }
    }

    /// Reference ellipsoid with the fixed default radii.
    pub fn default_ellipsoid(&self) -> Ellipsoid {
        match self {
            ObserverBody::Earth => Ellipsoid::earth(),
            ObserverBody::Moon => Ellipsoid::moon(),
        }
    }
}

/// A fixed observer location on a body's surface.
///
/// Latitude and longitude are planetographic degrees, altitude is meters above
/// the reference ellipsoid. Fields are `NotNan` so a NaN input is rejected at
/// construction instead of corrupting downstream trigonometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacePoint {
    pub latitude: NotNan<Degree>,
    pub longitude: NotNan<Degree>,
    pub altitude: NotNan<Meter>,
    pub body: ObserverBody,
}

impl SurfacePoint {
    /// Create a surface point from planetographic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `latitude`: planetographic latitude in degrees.
    /// * `longitude`: longitude in degrees, east positive.
    /// * `altitude`: height above the ellipsoid in **meters**.
    /// * `body`: the body the point is fixed to.
    ///
    /// Errors
    /// ----------
    /// * [`SeleneError::NanInput`] if any coordinate is NaN.
    pub fn new(
        latitude: Degree,
        longitude: Degree,
        altitude: Meter,
        body: ObserverBody,
    ) -> Result<SurfacePoint, SeleneError> {
        Ok(SurfacePoint {
            latitude: NotNan::new(latitude)?,
            longitude: NotNan::new(longitude)?,
            altitude: NotNan::new(altitude)?,
            body,
        })
    }

    /// Body-fixed rectangular coordinates of the point, in kilometers.
    pub fn body_fixed_coord(&self, ellipsoid: &Ellipsoid) -> Vector3<f64> {
        planetographic_to_rectangular(
            self.latitude.into_inner(),
            self.longitude.into_inner(),
            self.altitude.into_inner(),
            ellipsoid,
        )
    }
}

/// Builder of the synthetic position/velocity time series for a fixed surface point.
///
/// For every requested epoch `e` the builder emits `(degree+1)/2` samples before
/// `e` and the remainder from `e` onward, spaced `delta_t` apart, so the service
/// can center a Lagrange window of `degree + 1` states on any queried epoch in the
/// neighborhood of `e` (including the `e + 1 s` probe used for the phase sign).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverStateBuilder {
    /// Seconds between consecutive samples of a cluster.
    pub delta_t: f64,
    /// Lagrange polynomial degree the consumer will interpolate with.
    pub degree: usize,
}

impl Default for ObserverStateBuilder {
    fn default() -> Self {
        ObserverStateBuilder {
            delta_t: STATE_DELTA_T,
            degree: INTERPOLATION_DEGREE,
        }
    }
}

impl ObserverStateBuilder {
    pub fn new(delta_t: f64, degree: usize) -> Self {
        ObserverStateBuilder { delta_t, degree }
    }

    /// Union of the sampling windows of all requested epochs, sorted and unique.
    ///
    /// Each epoch contributes the window `[e - left·Δt, e + right·Δt)` with
    /// `left = (degree+1)/2` and `right = left + (degree+1) mod 2`. Insertion uses
    /// binary search; duplicates (exact epoch equality) are dropped, so
    /// overlapping windows merge and distant epochs form disjoint clusters.
    pub fn sample_epochs(&self, requested: &[Et]) -> Vec<Et> {
        let min_states = self.degree + 1;
        let left = min_states / 2;
        let right = left + min_states % 2;

        let mut epochs: Vec<Et> = Vec::with_capacity(requested.len() * min_states);
        for &e in requested {
            for k in 0..(left + right) {
                let t = e + (k as f64 - left as f64) * self.delta_t;
                if let Err(index) = epochs.binary_search_by(|probe| probe.total_cmp(&t)) {
                    epochs.insert(index, t);
                }
            }
        }
        epochs
    }

    /// Build the synthetic state series of a surface point.
    ///
    /// Positions come from rotating the body-fixed point into `target_frame` at
    /// each sample epoch. The rotation is applied **without re-centering**: the
    /// states stay relative to the observer's body center, which is declared
    /// separately at registration. Velocities are forward differences
    /// `(p[i+1] − p[i]) / Δt`; the last sample differences against one extra
    /// extrapolated position at `last + Δt`, so **every** emitted state has a
    /// defined velocity.
    ///
    /// Arguments
    /// -----------------
    /// * `service`: the ephemeris and frame provider.
    /// * `point`: the fixed surface location.
    /// * `ellipsoid`: ellipsoid of the observer's body.
    /// * `requested`: the caller's epochs, TDB seconds past J2000.
    /// * `source_frame`: body-fixed frame the point is constructed in.
    /// * `target_frame`: frame the series states are expressed in.
    ///
    /// Return
    /// ----------
    /// * A validated [`StateSeries`] ready for registration.
    pub fn build<S: EphemerisService>(
        &self,
        service: &S,
        point: &SurfacePoint,
        ellipsoid: &Ellipsoid,
        requested: &[Et],
        source_frame: &str,
        target_frame: &str,
    ) -> Result<StateSeries, SeleneError> {
        let epochs = self.sample_epochs(requested);
        let pos_fixed = point.body_fixed_coord(ellipsoid);

        let rotate = |et: Et| -> Result<Vector3<f64>, SeleneError> {
            Ok(service.rotation(source_frame, target_frame, et)? * pos_fixed)
        };

        let positions: Vec<Vector3<f64>> = epochs
            .iter()
            .map(|&et| rotate(et))
            .collect::<Result<_, _>>()?;

        let mut samples = Vec::with_capacity(epochs.len());
        for (i, (&et, pos)) in epochs.iter().zip(&positions).enumerate() {
            let next = match positions.get(i + 1) {
                Some(p) => *p,
                // Last state: difference against one extrapolated position past the series.
                None => rotate(et + self.delta_t)?,
            };
            let velocity = (next - pos) / self.delta_t;
            samples.push(StateSample::new(et, *pos, velocity));
        }

        let series = StateSeries::new(samples);
        series.validate(self.degree)?;
        Ok(series)
    }
}
