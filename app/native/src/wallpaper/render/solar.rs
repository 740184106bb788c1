//! Sun and moon positions.
//!
//! Low-precision almanac formulas, accurate to a fraction of a degree, which
//! is far below what a wallpaper terminator can show.

use std::f64::consts::TAU;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SECS_PER_DAY: f64 = 86_400.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const J2000_JD: f64 = 2_451_545.0;

/// Julian day of a known new moon (2000-01-06 14:24 UTC).
const NEW_MOON_JD: f64 = 2_451_550.1;
/// Mean length of the synodic month in days.
const SYNODIC_MONTH: f64 = 29.530_588_853;

/// Point on Earth where the sun is at the zenith, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsolarPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Julian day number of `time`.
#[must_use]
pub fn julian_day(time: SystemTime) -> f64 {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    };
    secs / SECS_PER_DAY + UNIX_EPOCH_JD
}

/// Drops seconds and sub-seconds so renders within a minute are identical.
#[must_use]
pub fn quantize_to_minute(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map_or(time, |elapsed| UNIX_EPOCH + Duration::from_secs(elapsed.as_secs() / 60 * 60))
}

/// Subsolar point at `time`, including the equation of time.
#[must_use]
pub fn subsolar_point(time: SystemTime) -> SubsolarPoint {
    let jd = julian_day(time);
    let n = jd - J2000_JD;

    let mean_longitude = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .to_radians();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin();
    let right_ascension = (obliquity.cos() * ecliptic_longitude.sin())
        .atan2(ecliptic_longitude.cos())
        .to_degrees()
        .rem_euclid(360.0);

    let equation_of_time = wrap_degrees(mean_longitude - right_ascension);
    let utc_hours = (jd + 0.5).rem_euclid(1.0) * 24.0;

    SubsolarPoint {
        latitude: declination.to_degrees(),
        longitude: wrap_degrees(15.0 * (12.0 - utc_hours) - equation_of_time),
    }
}

/// Lunar phase in `[0, 1)`: 0 is new moon, 0.5 is full moon.
#[must_use]
pub fn moon_phase(time: SystemTime) -> f64 {
    ((julian_day(time) - NEW_MOON_JD) / SYNODIC_MONTH).rem_euclid(1.0)
}

/// Direction towards the sun as seen from the moon's near side.
///
/// The viewer looks along `-z`; at new moon the sun is straight behind the
/// moon and at full moon straight behind the viewer.
#[must_use]
pub fn moon_sun_direction(phase: f64) -> [f64; 3] {
    let angle = phase * TAU;
    [angle.sin(), 0.0, -angle.cos()]
}

/// Unit vector of a point on the sphere, in degrees.
#[must_use]
pub fn unit_vector(latitude: f64, longitude: f64) -> [f64; 3] {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn wrap_degrees(value: f64) -> f64 { (value + 180.0).rem_euclid(360.0) - 180.0 }
