//! # Observer–Moon geometry engine
//!
//! This module turns raw position vectors from the ephemeris service into the
//! per-epoch angular and distance quantities of a [`MoonGeometry`] record:
//!
//! 1. Topocentric **zenith/azimuth** of the Moon, with an optional local
//!    rotation correction for observer frames that are not true topocentric
//!    frames.
//! 2. The signed **phase angle** (Sun–Moon–observer angle at the Moon), negated
//!    when the Moon is waning.
//! 3. **Selenographic coordinates** of the observer's sub-point (ellipsoid
//!    intercept or plain angular direction, selected by [`SubPointMode`]) and of
//!    the Sun (angular direction only, the Sun being effectively at infinity).
//! 4. Observer–Moon and Sun–Moon **distances**.
//!
//! The engine holds no state across epochs: each call resolves the epoch, runs
//! the queries, applies the branch corrections, and emits one record.
//!
//! ## Branch corrections
//!
//! Sub-observer latitudes can overshoot ±90° from numerical or model artifacts
//! near the poles. [`correct_latitude_branch`] reflects them back with
//! `lat' = 180° − lat` (mirrored for the south) and shifts the longitude by
//! 180°, keeping its exact behavior under large overshoot as well.

use nalgebra::Vector3;

use crate::constants::{AstronomicalUnit, Degree, Et, Kilometer, Radian, AU, MOON_FIXED_FRAME};
use crate::coordinates::{
    latitudinal, normalize_longitude, rectangular_to_planetographic, Ellipsoid,
};
use crate::ephemeris::EphemerisService;
use crate::frames::{self, topocentric_rotation};
use crate::observers::ObserverBody;
use crate::selene_errors::SeleneError;

/// How the selenographic sub-observer point is computed.
///
/// Both modes agree in the limit of negligible observer altitude; the intercept
/// mode is the default for surface observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubPointMode {
    /// Intersect the observer→Moon-center ray with the lunar ellipsoid, then
    /// convert the surface intercept to planetographic coordinates.
    #[default]
    EllipsoidIntercept,
    /// Read longitude/latitude directly off the spherical angles of the
    /// observer's position vector, without touching the surface.
    AngularDirection,
}

/// Which body anchors the zenith/azimuth query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZenithObserver {
    /// The synthetic (or preexisting) observer body itself.
    #[default]
    Observer,
    /// The Earth's center, for pipelines that want geocentric zenith angles.
    Earth,
}

/// Where the lunar ellipsoid radii come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadiiSource {
    /// The fixed 1738.1 / 1736.0 km constants (default; the service-provided
    /// values are known to be less accurate).
    #[default]
    Fixed,
    /// Ask the ephemeris service (`body_radii("MOON")`), cached per session.
    Service,
}

/// Per-call configuration of the geometry engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryConfig {
    /// Frame of the zenith/azimuth position query.
    pub observer_frame: String,
    /// Moon-body-fixed frame for selenographic quantities.
    pub moon_frame: String,
    /// Body-fixed frame the surface point is constructed in.
    pub source_frame: String,
    /// Frame the synthetic state series is expressed in.
    pub target_frame: String,
    /// Rotate the zenith/azimuth vector into the local topocentric orientation.
    /// Needed when `observer_frame` is a body-fixed frame rather than a true
    /// observer-fixed one.
    pub correct_zenith_azimuth: bool,
    /// Anchor of the zenith/azimuth query.
    pub zenith_observer: ZenithObserver,
    /// Sub-observer point algorithm.
    pub sub_point_mode: SubPointMode,
    /// Source of the lunar radii.
    pub radii_source: RadiiSource,
    /// Compute zenith/azimuth at all; when `false` the output fields stay `None`.
    pub with_zenith_azimuth: bool,
}

impl GeometryConfig {
    /// Default configuration for an observer fixed to `body`: body-fixed source,
    /// target, and observer frames, rotation correction enabled.
    pub fn for_body(body: ObserverBody) -> Self {
        GeometryConfig {
            observer_frame: body.fixed_frame().to_string(),
            moon_frame: MOON_FIXED_FRAME.to_string(),
            source_frame: body.fixed_frame().to_string(),
            target_frame: body.fixed_frame().to_string(),
            correct_zenith_azimuth: true,
            zenith_observer: ZenithObserver::default(),
            sub_point_mode: SubPointMode::default(),
            radii_source: RadiiSource::default(),
            with_zenith_azimuth: true,
        }
    }
}

/// Longitude/colatitude pair feeding the topocentric rotation correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionAngles {
    pub longitude: Degree,
    pub colatitude: Degree,
}

impl CorrectionAngles {
    /// Derive the correction angles from a surface point's coordinates as
    /// `lon mod 180` and `90 − (lat mod 90)`, with Euclidean remainders so that
    /// western and southern coordinates reduce into the expected quadrant.
    pub fn from_geodetic(latitude: Degree, longitude: Degree) -> Self {
        CorrectionAngles {
            longitude: longitude.rem_euclid(180.0),
            colatitude: 90.0 - latitude.rem_euclid(90.0),
        }
    }
}

/// Per-epoch Sun–Moon geometry: selenographic solar angles and distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunMoonGeometry {
    pub dist_sun_moon_au: AstronomicalUnit,
    pub dist_sun_moon_km: Kilometer,
    pub lon_sun_rad: Radian,
    pub lat_sun_rad: Radian,
}

/// Per-epoch observer–Moon geometry record.
///
/// Invariants on emission: `lon_obs_deg ∈ [-180, 180]`, `lat_obs_deg ∈ [-90, 90]`,
/// `phase_deg ∈ [-180, 180]` (negative while waning). Zenith and azimuth are
/// `None` when the configuration did not request them.
#[derive(Debug, Clone, PartialEq)]
pub struct MoonGeometry {
    pub dist_sun_moon_au: AstronomicalUnit,
    pub dist_sun_moon_km: Kilometer,
    pub dist_obs_moon_km: Kilometer,
    pub lon_sun_rad: Radian,
    pub lat_sun_rad: Radian,
    pub lat_obs_deg: Degree,
    pub lon_obs_deg: Degree,
    pub phase_deg: Degree,
    pub azimuth_deg: Option<Degree>,
    pub zenith_deg: Option<Degree>,
}

/// Compute zenith and azimuth of a target from its position vector.
///
/// Decomposes the (optionally rotated) vector latitudinally and maps
/// `zenith = 90° − lat`, `azimuth = 180° − lon`.
///
/// Arguments
/// -----------------
/// * `position`: target position relative to the observing body.
/// * `correction`: when present, the vector is first rotated into the local
///   topocentric orientation built from these angles (transpose application,
///   the `mtxv` pattern).
///
/// Return
/// ----------
/// * `(zenith_deg, azimuth_deg)`.
///
/// Errors
/// ----------
/// * [`SeleneError::DegenerateVector`] on a zero-length position.
pub fn zenith_azimuth(
    position: &Vector3<f64>,
    correction: Option<&CorrectionAngles>,
) -> Result<(Degree, Degree), SeleneError> {
    let pos = match correction {
        Some(angles) => {
            let bf2tp = topocentric_rotation(angles.longitude, angles.colatitude);
            bf2tp.transpose() * position
        }
        None => *position,
    };
    let (_, lon, lat) = latitudinal(&pos)?;
    Ok((90.0 - lat.to_degrees(), 180.0 - lon.to_degrees()))
}

/// Resolve the sign of a phase angle from its value one second later.
///
/// A decreasing unsigned phase means the Moon is waning; the convention makes
/// waning phases negative.
pub fn apply_phase_sign(phase: Degree, one_second_later: Degree) -> Degree {
    if one_second_later < phase {
        -phase
    } else {
        phase
    }
}

/// Reflect an out-of-range sub-observer latitude back into `[-90, 90]`.
///
/// `lat > 90 ⇒ (90 + (90 − lat), lon − 180)` and
/// `lat < −90 ⇒ (−90 − (90 + lat), lon + 180)`. The triggering condition is a
/// rare numerical artifact near the poles. The longitude is wrapped into
/// `[-180, 180]` afterwards.
pub fn correct_latitude_branch(mut lat: Degree, mut lon: Degree) -> (Degree, Degree) {
    if lat > 90.0 {
        lat = 90.0 + (90.0 - lat);
        lon -= 180.0;
    } else if lat < -90.0 {
        lat = -90.0 - (90.0 + lat);
        lon += 180.0;
    }
    (lat, normalize_longitude(lon))
}

/// Stateless per-epoch orchestrator of the geometry queries.
///
/// Borrows the service for the duration of one batch; construction fails fast on
/// inconsistent configuration (rotation correction requested without angles).
pub struct GeometryEngine<'a, S: EphemerisService> {
    service: &'a S,
    config: &'a GeometryConfig,
    moon_ellipsoid: Ellipsoid,
    observer: String,
    zenith_observer: String,
    correction: Option<CorrectionAngles>,
}

impl<'a, S: EphemerisService> GeometryEngine<'a, S> {
    /// Create an engine for one batch.
    ///
    /// Arguments
    /// -----------------
    /// * `service`: the ephemeris and frame provider, with all data loaded.
    /// * `config`: the per-call configuration.
    /// * `moon_ellipsoid`: lunar ellipsoid resolved from `config.radii_source`.
    /// * `observer`: body label of the observer (synthetic or preexisting).
    /// * `correction`: topocentric correction angles, mandatory when
    ///   `config.correct_zenith_azimuth` is set.
    ///
    /// Errors
    /// ----------
    /// * [`SeleneError::MissingCorrectionAngles`] if the correction is requested
    ///   without angles. Configuration errors are never retried.
    pub fn new(
        service: &'a S,
        config: &'a GeometryConfig,
        moon_ellipsoid: Ellipsoid,
        observer: &str,
        correction: Option<CorrectionAngles>,
    ) -> Result<Self, SeleneError> {
        if config.correct_zenith_azimuth && correction.is_none() {
            return Err(SeleneError::MissingCorrectionAngles);
        }
        let zenith_observer = match config.zenith_observer {
            ZenithObserver::Observer => observer.to_string(),
            ZenithObserver::Earth => "EARTH".to_string(),
        };
        Ok(GeometryEngine {
            service,
            config,
            moon_ellipsoid,
            observer: observer.to_string(),
            zenith_observer,
            correction: if config.correct_zenith_azimuth {
                correction
            } else {
                None
            },
        })
    }

    /// Compute the full geometry record for one UTC time.
    pub fn geometry_at(&self, utc: &str) -> Result<MoonGeometry, SeleneError> {
        let et = self.service.time_to_epoch(utc)?;

        let (zenith_deg, azimuth_deg) = if self.config.with_zenith_azimuth {
            let (pos, _) = self.service.position(
                "MOON",
                et,
                &self.config.observer_frame,
                &self.zenith_observer,
            )?;
            let (zenith, azimuth) = zenith_azimuth(&pos, self.correction.as_ref())?;
            (Some(zenith), Some(azimuth))
        } else {
            (None, None)
        };

        let obs_pos_moon = self.observer_position_moon_fixed(et)?;
        let dist_obs_moon_km = obs_pos_moon.norm();

        let phase_now = self.unsigned_phase(et)?;
        let phase_later = self.unsigned_phase(et + 1.0)?;
        let phase_deg = apply_phase_sign(phase_now, phase_later);

        let (lon_raw, lat_raw) = self.sub_observer_point(&obs_pos_moon)?;
        let (lat_obs_deg, lon_obs_deg) = correct_latitude_branch(lat_raw, lon_raw);

        let sun = self.sun_geometry_at(et)?;

        Ok(MoonGeometry {
            dist_sun_moon_au: sun.dist_sun_moon_au,
            dist_sun_moon_km: sun.dist_sun_moon_km,
            dist_obs_moon_km,
            lon_sun_rad: sun.lon_sun_rad,
            lat_sun_rad: sun.lat_sun_rad,
            lat_obs_deg,
            lon_obs_deg,
            phase_deg,
            azimuth_deg,
            zenith_deg,
        })
    }

    /// Compute a geometry record from an explicit observer position.
    ///
    /// Used when the caller already has the observer's coordinates (km, fixed in
    /// `config.source_frame`, Earth-centered unless that frame is itself
    /// Moon-body-fixed) and no synthetic body exists. The position is re-centered
    /// on the Moon and rotated into `config.moon_frame` at **every** queried
    /// epoch, the `+1 s` phase probe included, so a rotating source frame feeds
    /// the sign decision correctly. Zenith and azimuth are always `None` here:
    /// without a surface point there is no local vertical.
    pub fn geometry_from_position(
        &self,
        utc: &str,
        position: &Vector3<f64>,
    ) -> Result<MoonGeometry, SeleneError> {
        let et = self.service.time_to_epoch(utc)?;
        let obs_pos_moon = self.moon_centered(position, et)?;
        let dist_obs_moon_km = obs_pos_moon.norm();

        let phase_now = self.phase_with_observer(et, &obs_pos_moon)?;
        let obs_later = self.moon_centered(position, et + 1.0)?;
        let phase_later = self.phase_with_observer(et + 1.0, &obs_later)?;
        let phase_deg = apply_phase_sign(phase_now, phase_later);

        let (lon_raw, lat_raw) = self.sub_observer_point(&obs_pos_moon)?;
        let (lat_obs_deg, lon_obs_deg) = correct_latitude_branch(lat_raw, lon_raw);

        let sun = self.sun_geometry_at(et)?;

        Ok(MoonGeometry {
            dist_sun_moon_au: sun.dist_sun_moon_au,
            dist_sun_moon_km: sun.dist_sun_moon_km,
            dist_obs_moon_km,
            lon_sun_rad: sun.lon_sun_rad,
            lat_sun_rad: sun.lat_sun_rad,
            lat_obs_deg,
            lon_obs_deg,
            phase_deg,
            azimuth_deg: None,
            zenith_deg: None,
        })
    }

    /// Selenographic Sun direction and Sun–Moon distances at an epoch.
    ///
    /// Angular direction only: no ellipsoid intercept, the Sun being effectively
    /// at infinity for selenographic purposes.
    pub fn sun_geometry_at(&self, et: Et) -> Result<SunMoonGeometry, SeleneError> {
        let (sun_pos, _) = self
            .service
            .position("SUN", et, &self.config.moon_frame, "MOON")?;
        let (dist_km, lon, lat) = latitudinal(&sun_pos)?;
        Ok(SunMoonGeometry {
            dist_sun_moon_au: dist_km / AU,
            dist_sun_moon_km: dist_km,
            lon_sun_rad: lon,
            lat_sun_rad: lat,
        })
    }

    /// Re-center a source-frame position on the Moon and rotate it into the
    /// Moon-body-fixed frame at `et`.
    fn moon_centered(&self, position: &Vector3<f64>, et: Et) -> Result<Vector3<f64>, SeleneError> {
        frames::transform(
            self.service,
            position,
            &self.config.source_frame,
            &self.config.moon_frame,
            et,
        )
    }

    /// Observer position relative to the Moon's center, Moon-body-fixed frame.
    fn observer_position_moon_fixed(&self, et: Et) -> Result<Vector3<f64>, SeleneError> {
        let (moon_from_obs, _) =
            self.service
                .position("MOON", et, &self.config.moon_frame, &self.observer)?;
        Ok(-moon_from_obs)
    }

    /// Unsigned Sun–Moon–observer angle at the Moon, in degrees.
    fn unsigned_phase(&self, et: Et) -> Result<Degree, SeleneError> {
        let obs_pos = self.observer_position_moon_fixed(et)?;
        self.phase_with_observer(et, &obs_pos)
    }

    /// Unsigned phase angle against a caller-supplied observer position.
    fn phase_with_observer(
        &self,
        et: Et,
        obs_pos: &Vector3<f64>,
    ) -> Result<Degree, SeleneError> {
        let (sun_pos, _) = self
            .service
            .position("SUN", et, &self.config.moon_frame, "MOON")?;

        let sun_norm = sun_pos.norm();
        let obs_norm = obs_pos.norm();
        if sun_norm == 0.0 || obs_norm == 0.0 {
            return Err(SeleneError::DegenerateVector("phase angle"));
        }
        let cos_phase = (sun_pos.dot(obs_pos) / (sun_norm * obs_norm)).clamp(-1.0, 1.0);
        Ok(cos_phase.acos().to_degrees())
    }

    /// Sub-observer selenographic longitude/latitude, mode-dependent, uncorrected.
    fn sub_observer_point(&self, obs_pos_moon: &Vector3<f64>) -> Result<(Degree, Degree), SeleneError> {
        match self.config.sub_point_mode {
            SubPointMode::EllipsoidIntercept => {
                let eq = self.moon_ellipsoid.equatorial_radius;
                let pol = self.moon_ellipsoid.polar_radius;
                let quad = (obs_pos_moon.x * obs_pos_moon.x + obs_pos_moon.y * obs_pos_moon.y)
                    / (eq * eq)
                    + obs_pos_moon.z * obs_pos_moon.z / (pol * pol);
                if quad == 0.0 {
                    return Err(SeleneError::DegenerateVector("ellipsoid intercept"));
                }
                // Surface intercept of the observer->Moon-center ray.
                let intercept = obs_pos_moon / quad.sqrt();
                let (lon, lat, _alt) =
                    rectangular_to_planetographic(&intercept, &self.moon_ellipsoid);
                Ok((lon, lat))
            }
            SubPointMode::AngularDirection => {
                let (_, lon, lat) = latitudinal(obs_pos_moon)?;
                Ok((lon.to_degrees(), lat.to_degrees()))
            }
        }
    }
}
