//! # Session façade
//!
//! [`Selene`] is the entry point of the crate. It owns one instance of the
//! ephemeris service and the list of data files to feed it, and exposes the
//! batch operations:
//!
//! - [`Selene::moon_geometry`]: geometry of the Moon as seen from a fixed
//!   surface point, via a synthetic observer trajectory.
//! - [`Selene::moon_geometry_of_body`]: geometry from a body the service
//!   already tracks (a spacecraft, a station with its own kernel).
//! - [`Selene::moon_geometry_from_positions`]: geometry from caller-supplied
//!   observer coordinates fixed in a source frame, one per epoch.
//! - [`Selene::sun_moon_geometry`]: selenographic Sun angles and Sun–Moon
//!   distances only.
//!
//! ## Batch lifecycle
//!
//! Every batch is **all-or-nothing**: data files are loaded up front (with one
//! retry after a fixed delay on transient failures), all epochs are computed,
//! and the service's loaded set is cleared before returning, on success and on
//! error alike. An empty epoch list short-circuits to an empty result before
//! any file is touched.
//!
//! The session is not reentrant and not `Sync`; concurrent batches need one
//! [`Selene`] (and one service instance) per worker.

use std::time::Duration;

use nalgebra::Vector3;
use once_cell::sync::OnceCell;

use crate::constants::Kilometer;
use crate::coordinates::Ellipsoid;
use crate::ephemeris::EphemerisService;
use crate::geometry::{
    CorrectionAngles, GeometryConfig, GeometryEngine, MoonGeometry, RadiiSource, SunMoonGeometry,
};
use crate::observers::{ObserverBody, ObserverStateBuilder, SurfacePoint};
use crate::selene_errors::SeleneError;
use crate::time::{normalize_times, Time};

/// Delay before the single retry of a failed data load.
const LOAD_RETRY_DELAY: Duration = Duration::from_secs(2);

/// A lunar-geometry session around one ephemeris service instance.
///
/// The service-reported lunar radii are fetched at most once per session and
/// cached; the fixed default radii never touch the service at all.
pub struct Selene<S: EphemerisService> {
    service: S,
    kernel_paths: Vec<String>,
    moon_radii: OnceCell<(Kilometer, Kilometer)>,
}

impl<S: EphemerisService> Selene<S> {
    /// Create a session.
    ///
    /// Arguments
    /// -----------------
    /// * `service`: the ephemeris and orientation provider.
    /// * `kernel_paths`: data files to load at the start of every batch, in order.
    pub fn new(service: S, kernel_paths: Vec<String>) -> Self {
        Selene {
            service,
            kernel_paths,
            moon_radii: OnceCell::new(),
        }
    }

    /// Read access to the underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Geometry of the Moon from a fixed surface point, one record per time.
    ///
    /// The point is turned into a synthetic trajectory covering every requested
    /// epoch (plus the `+1 s` phase probe), registered with the service, and then
    /// queried like any tracked body.
    ///
    /// Arguments
    /// -----------------
    /// * `point`: the observer's location on the Earth or the Moon.
    /// * `times`: requested epochs; records come back in the same order.
    /// * `config`: frame and algorithm selection, typically
    ///   [`GeometryConfig::for_body`]`(point.body)`.
    ///
    /// Return
    /// ----------
    /// * One [`MoonGeometry`] per requested time, or the first error encountered.
    ///   The loaded data set is cleared in every case.
    pub fn moon_geometry(
        &mut self,
        point: &SurfacePoint,
        times: &[Time],
        config: &GeometryConfig,
    ) -> Result<Vec<MoonGeometry>, SeleneError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        let utc_times = normalize_times(times);
        self.load_with_retry()?;
        let result = self.surface_batch(point, &utc_times, config);
        self.service.unload_all();
        result
    }

    /// Geometry of the Moon from a body the service already tracks.
    ///
    /// No synthetic trajectory is built: `observer` is queried directly. When
    /// `config.correct_zenith_azimuth` is set the caller must supply the
    /// correction angles, since no surface coordinates exist to derive them from.
    pub fn moon_geometry_of_body(
        &mut self,
        observer: &str,
        times: &[Time],
        config: &GeometryConfig,
        correction: Option<CorrectionAngles>,
    ) -> Result<Vec<MoonGeometry>, SeleneError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        let utc_times = normalize_times(times);
        self.load_with_retry()?;
        let result = self.body_batch(observer, &utc_times, config, correction);
        self.service.unload_all();
        result
    }

    /// Geometry of the Moon from explicit observer positions.
    ///
    /// Arguments
    /// -----------------
    /// * `positions`: observer coordinates in km, fixed in `config.source_frame`
    ///   (Earth-centered unless that frame is Moon-body-fixed), one per time.
    ///   Each is re-centered on the Moon and rotated into `config.moon_frame` at
    ///   its epoch, and again at the `+1 s` phase probe.
    /// * `times`: requested epochs, same length as `positions`.
    ///
    /// Zenith and azimuth are `None` in every record; without a surface point
    /// there is no local vertical to measure against.
    pub fn moon_geometry_from_positions(
        &mut self,
        positions: &[Vector3<f64>],
        times: &[Time],
        config: &GeometryConfig,
    ) -> Result<Vec<MoonGeometry>, SeleneError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        if positions.len() != times.len() {
            return Err(SeleneError::PositionCountMismatch {
                expected: times.len(),
                got: positions.len(),
            });
        }
        let utc_times = normalize_times(times);
        self.load_with_retry()?;
        let result = self.position_batch(positions, &utc_times, config);
        self.service.unload_all();
        result
    }

    /// Selenographic Sun angles and Sun–Moon distances, one record per time.
    pub fn sun_moon_geometry(
        &mut self,
        times: &[Time],
    ) -> Result<Vec<SunMoonGeometry>, SeleneError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        let utc_times = normalize_times(times);
        self.load_with_retry()?;
        let result = self.sun_batch(&utc_times);
        self.service.unload_all();
        result
    }

    /// Lunar ellipsoid per the configured radii source.
    ///
    /// The service lookup is cached for the lifetime of the session; data must be
    /// loaded when the first `Service` resolution happens.
    pub fn moon_ellipsoid(&self, source: RadiiSource) -> Result<Ellipsoid, SeleneError> {
        match source {
            RadiiSource::Fixed => Ok(Ellipsoid::moon()),
            RadiiSource::Service => {
                let (eq, pol) = self
                    .moon_radii
                    .get_or_try_init(|| self.service.body_radii("MOON"))?;
                Ok(Ellipsoid::new(*eq, *pol))
            }
        }
    }

    /// Load every configured data file, retrying each transient failure once.
    fn load_with_retry(&mut self) -> Result<(), SeleneError> {
        for path in &self.kernel_paths {
            if let Err(err) = self.service.load_data(path) {
                if !err.is_transient() {
                    return Err(err);
                }
                std::thread::sleep(LOAD_RETRY_DELAY);
                self.service.load_data(path)?;
            }
        }
        Ok(())
    }

    fn surface_batch(
        &mut self,
        point: &SurfacePoint,
        utc_times: &[String],
        config: &GeometryConfig,
    ) -> Result<Vec<MoonGeometry>, SeleneError> {
        let epochs: Vec<f64> = utc_times
            .iter()
            .map(|t| self.service.time_to_epoch(t))
            .collect::<Result<_, _>>()?;

        let body = point.body;
        let ellipsoid = body.default_ellipsoid();
        let builder = ObserverStateBuilder::default();
        let series = builder.build(
            &self.service,
            point,
            &ellipsoid,
            &epochs,
            &config.source_frame,
            &config.target_frame,
        )?;
        self.service.register_synthetic_body(
            body.synthetic_label(),
            body.synthetic_id(),
            body.name(),
            &config.target_frame,
            series,
            builder.degree,
        )?;

        let moon_ellipsoid = self.moon_ellipsoid(config.radii_source)?;
        let correction = config.correct_zenith_azimuth.then(|| {
            CorrectionAngles::from_geodetic(
                point.latitude.into_inner(),
                point.longitude.into_inner(),
            )
        });
        let engine = GeometryEngine::new(
            &self.service,
            config,
            moon_ellipsoid,
            body.synthetic_label(),
            correction,
        )?;
        utc_times.iter().map(|t| engine.geometry_at(t)).collect()
    }

    fn body_batch(
        &mut self,
        observer: &str,
        utc_times: &[String],
        config: &GeometryConfig,
        correction: Option<CorrectionAngles>,
    ) -> Result<Vec<MoonGeometry>, SeleneError> {
        let moon_ellipsoid = self.moon_ellipsoid(config.radii_source)?;
        let engine =
            GeometryEngine::new(&self.service, config, moon_ellipsoid, observer, correction)?;
        utc_times.iter().map(|t| engine.geometry_at(t)).collect()
    }

    fn position_batch(
        &mut self,
        positions: &[Vector3<f64>],
        utc_times: &[String],
        config: &GeometryConfig,
    ) -> Result<Vec<MoonGeometry>, SeleneError> {
        // No surface point exists on this path, so neither does the correction.
        let config = GeometryConfig {
            correct_zenith_azimuth: false,
            with_zenith_azimuth: false,
            ..config.clone()
        };
        let moon_ellipsoid = self.moon_ellipsoid(config.radii_source)?;
        let engine = GeometryEngine::new(&self.service, &config, moon_ellipsoid, "MOON", None)?;
        utc_times
            .iter()
            .zip(positions)
            .map(|(t, pos)| engine.geometry_from_position(t, pos))
            .collect()
    }

    fn sun_batch(&mut self, utc_times: &[String]) -> Result<Vec<SunMoonGeometry>, SeleneError> {
        let config = GeometryConfig {
            correct_zenith_azimuth: false,
            with_zenith_azimuth: false,
            ..GeometryConfig::for_body(ObserverBody::Earth)
        };
        let engine = GeometryEngine::new(&self.service, &config, Ellipsoid::moon(), "MOON", None)?;
        utc_times
            .iter()
            .map(|t| {
                let et = self.service.time_to_epoch(t)?;
                engine.sun_geometry_at(et)
            })
            .collect()
    }
}
