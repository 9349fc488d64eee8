//! # Constants and type definitions for Selene
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! definitions** used throughout the `selene` library.
//!
//! ## Overview
//!
//! - Reference ellipsoid radii for the Earth and the Moon
//! - Unit conversions (AU ↔ km)
//! - Core type aliases used across the crate
//! - Synthetic-body identifiers and default frame names
//!
//! These definitions are used by all main modules, including the coordinate converters,
//! the observer state builder, and the geometry engine.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// Moon equatorial radius in kilometers.
///
/// Default value used unless the ephemeris service is explicitly asked for radii
/// ([`RadiiSource::Service`](crate::geometry::RadiiSource)); the service-provided
/// lunar radii are known to be less accurate for photometric work.
pub const MOON_EQUATORIAL_RADIUS: f64 = 1738.1;

/// Moon polar radius in kilometers (same caveat as [`MOON_EQUATORIAL_RADIUS`]).
pub const MOON_POLAR_RADIUS: f64 = 1736.0;

/// Earth equatorial radius in kilometers (IERS 2003)
pub const EARTH_EQUATORIAL_RADIUS: f64 = 6378.1366;

/// Earth polar radius in kilometers (IERS 2003)
pub const EARTH_POLAR_RADIUS: f64 = 6356.7519;

// -------------------------------------------------------------------------------------------------
// Synthetic-body identifiers and default frames
// -------------------------------------------------------------------------------------------------

/// Numeric id registered for a synthetic observer on the Earth's surface.
pub const EARTH_OBSERVER_ID: i32 = 399_100;

/// Numeric id registered for a synthetic observer on the Moon's surface.
pub const MOON_OBSERVER_ID: i32 = 301_100;

/// Body-fixed frame of the Earth used by default for surface points.
pub const EARTH_FIXED_FRAME: &str = "ITRF93";

/// Body-fixed frame of the Moon (mean-Earth/polar-axis) used by default.
pub const MOON_FIXED_FRAME: &str = "MOON_ME";

/// Lagrange interpolation degree of the synthetic observer trajectory.
pub const INTERPOLATION_DEGREE: usize = 5;

/// Seconds between synthetic observer states. Arbitrary, but small enough
/// that forward differences give a usable surface-point velocity.
pub const STATE_DELTA_T: f64 = 1.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Distance in astronomical units
pub type AstronomicalUnit = f64;
/// Ephemeris time: TDB seconds past J2000, the continuous timescale used
/// for numerical differencing and all service queries.
pub type Et = f64;
