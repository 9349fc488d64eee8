//! Analytic in-memory ephemeris service used by the integration tests.
//!
//! Coplanar circular model, Earth-centered: the Moon orbits at its mean distance
//! with its sidereal period, the Sun at 1 au with the year. Body-fixed frames are
//! plain z-spins at each body's rotation rate. Registered synthetic trajectories
//! are interpolated with a Lagrange polynomial of the registered degree, like a
//! discrete-states kernel segment would be.

use std::collections::HashMap;
use std::str::FromStr;

use hifitime::{Duration, Epoch};
use nalgebra::{Matrix3, Vector3};

use selene::constants::Et;
use selene::ephemeris::{EphemerisService, StateSeries};
use selene::frames::rotmt;
use selene::selene_errors::SeleneError;

const MOON_ORBIT_RADIUS_KM: f64 = 384_400.0;
const MOON_SIDEREAL_PERIOD_S: f64 = 27.321_661 * 86_400.0;
const SUN_ORBIT_RADIUS_KM: f64 = 149_597_870.7;
const YEAR_S: f64 = 365.25 * 86_400.0;
const EARTH_SPIN_PERIOD_S: f64 = 86_164.0905;
const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

struct SyntheticBody {
    center: String,
    frame: String,
    series: StateSeries,
    degree: usize,
}

#[derive(Default)]
pub struct AnalyticService {
    loaded: bool,
    pub load_calls: u32,
    pub unload_calls: u32,
    /// Number of upcoming `load_data` calls that fail transiently.
    pub fail_next_loads: u32,
    synthetic: HashMap<String, SyntheticBody>,
}

impl AnalyticService {
    pub fn new() -> Self {
        AnalyticService::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn synthetic_count(&self) -> usize {
        self.synthetic.len()
    }

    /// Spin angle of a body-fixed frame at an epoch.
    fn frame_angle(frame: &str, et: Et) -> Result<f64, SeleneError> {
        match frame {
            "J2000" => Ok(0.0),
            "ITRF93" => Ok(std::f64::consts::TAU * et / EARTH_SPIN_PERIOD_S),
            "MOON_ME" => Ok(std::f64::consts::TAU * et / MOON_SIDEREAL_PERIOD_S),
            other => Err(SeleneError::UnknownFrame(other.to_string())),
        }
    }

    /// Matrix taking J2000 vectors into `frame` at `et`.
    fn from_j2000(frame: &str, et: Et) -> Result<Matrix3<f64>, SeleneError> {
        Ok(rotmt(-Self::frame_angle(frame, et)?, 2))
    }

    /// Earth-centered J2000 position of a body, in km.
    fn body_position_j2000(&self, body: &str, et: Et) -> Result<Vector3<f64>, SeleneError> {
        match body {
            "EARTH" => Ok(Vector3::zeros()),
            "MOON" => {
                let angle = std::f64::consts::TAU * et / MOON_SIDEREAL_PERIOD_S;
                Ok(Vector3::new(
                    MOON_ORBIT_RADIUS_KM * angle.cos(),
                    MOON_ORBIT_RADIUS_KM * angle.sin(),
                    0.0,
                ))
            }
            "SUN" => {
                let angle = std::f64::consts::FRAC_PI_3 + std::f64::consts::TAU * et / YEAR_S;
                Ok(Vector3::new(
                    SUN_ORBIT_RADIUS_KM * angle.cos(),
                    SUN_ORBIT_RADIUS_KM * angle.sin(),
                    0.0,
                ))
            }
            label => {
                let body = self
                    .synthetic
                    .get(label)
                    .ok_or_else(|| SeleneError::UnknownBody(label.to_string()))?;
                let local = Self::interpolate(&body.series, body.degree, et)?;
                let center = self.body_position_j2000(&body.center, et)?;
                Ok(Self::from_j2000(&body.frame, et)?.transpose() * local + center)
            }
        }
    }

    /// Lagrange interpolation of a series position over the `degree + 1` samples
    /// nearest `et`.
    fn interpolate(series: &StateSeries, degree: usize, et: Et) -> Result<Vector3<f64>, SeleneError> {
        let samples = series.samples();
        let n = degree + 1;
        let first = series.first_epoch().ok_or(SeleneError::EpochNotCovered(et))?;
        let last = series.last_epoch().ok_or(SeleneError::EpochNotCovered(et))?;
        if samples.len() < n || et < first || et > last {
            return Err(SeleneError::EpochNotCovered(et));
        }

        let upper = samples.partition_point(|s| s.epoch < et);
        let start = upper.saturating_sub(n / 2).min(samples.len() - n);
        let window = &samples[start..start + n];

        let mut pos = Vector3::zeros();
        for (i, si) in window.iter().enumerate() {
            let mut weight = 1.0;
            for (j, sj) in window.iter().enumerate() {
                if i != j {
                    weight *= (et - sj.epoch) / (si.epoch - sj.epoch);
                }
            }
            pos += si.position() * weight;
        }
        Ok(pos)
    }
}

impl EphemerisService for AnalyticService {
    fn load_data(&mut self, path: &str) -> Result<(), SeleneError> {
        self.load_calls += 1;
        if self.fail_next_loads > 0 {
            self.fail_next_loads -= 1;
            return Err(SeleneError::KernelLoad {
                path: path.to_string(),
                reason: "simulated transient failure".to_string(),
            });
        }
        self.loaded = true;
        Ok(())
    }

    fn unload_all(&mut self) {
        self.unload_calls += 1;
        self.loaded = false;
        self.synthetic.clear();
    }

    fn position(
        &self,
        body: &str,
        epoch: Et,
        frame: &str,
        center: &str,
    ) -> Result<(Vector3<f64>, f64), SeleneError> {
        let relative =
            self.body_position_j2000(body, epoch)? - self.body_position_j2000(center, epoch)?;
        let rotated = Self::from_j2000(frame, epoch)? * relative;
        Ok((rotated, rotated.norm() / SPEED_OF_LIGHT_KM_S))
    }

    fn rotation(&self, source: &str, target: &str, epoch: Et) -> Result<Matrix3<f64>, SeleneError> {
        Ok(Self::from_j2000(target, epoch)? * Self::from_j2000(source, epoch)?.transpose())
    }

    fn body_radii(&self, body: &str) -> Result<(f64, f64), SeleneError> {
        match body {
            "MOON" => Ok((1737.4, 1737.4)),
            "EARTH" => Ok((6378.1366, 6356.7519)),
            other => Err(SeleneError::UnknownBody(other.to_string())),
        }
    }

    fn register_synthetic_body(
        &mut self,
        label: &str,
        _id: i32,
        center: &str,
        frame: &str,
        series: StateSeries,
        degree: usize,
    ) -> Result<(), SeleneError> {
        series.validate(degree)?;
        self.synthetic.insert(
            label.to_string(),
            SyntheticBody {
                center: center.to_string(),
                frame: frame.to_string(),
                series,
                degree,
            },
        );
        Ok(())
    }

    fn time_to_epoch(&self, utc: &str) -> Result<Et, SeleneError> {
        let iso = utc.trim().replacen(' ', "T", 1);
        Epoch::from_str(&iso)
            .map(|e| e.to_et_seconds())
            .map_err(|_| SeleneError::InvalidTimeFormat(utc.to_string()))
    }

    fn epoch_to_time(&self, epoch: Et) -> Result<String, SeleneError> {
        // Round to the nearest second: the f64 ET representation carries
        // sub-microsecond noise that would otherwise truncate the wrong way.
        let mut epoch = Epoch::from_et_seconds(epoch);
        let (_, _, _, _, _, _, nanos) = epoch.to_gregorian_utc();
        if nanos >= 500_000_000 {
            epoch += Duration::from_seconds(1.0);
        }
        let (year, month, day, hour, minute, second, _nanos) = epoch.to_gregorian_utc();
        Ok(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
        ))
    }
}
