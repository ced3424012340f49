use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// A "part" of a location
pub type LocationComponent = f64;

/// Value reported for a coordinate when no fix is available, outside of any valid
/// latitude or longitude.
pub const INVALID_COORDINATE: LocationComponent = 1000.0;

const TWO_POW_31: f64 = 2147483648.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A single fix as reported by a location provider. Carries no timestamp, any fix is
/// treated as current.
pub struct LocationSample {
    /// Latitude in degrees
    pub lat: LocationComponent,
    /// Longitude in degrees
    pub long: LocationComponent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// Web Mercator position, longitude [-180; 180) and latitude are mapped onto the full
/// range of an [i32]
pub struct MercatorPoint {
    pub x: i32,
    pub y: i32,
}

impl LocationSample {
    pub fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self { lat, long }
    }

    /// Whether both components are within the range of real coordinates
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.long)
    }

    /// Project this sample for placing it on a Web Mercator map
    pub fn to_mercator(&self) -> MercatorPoint {
        let x = (TWO_POW_31 / 180.0) * self.long;
        let y = (TWO_POW_31 / PI) * (PI * 0.25 + self.lat.to_radians() * 0.5).tan().ln();
        // `as` saturates, which pins the poles and the antimeridian to the edges
        MercatorPoint {
            x: x as i32,
            y: y as i32,
        }
    }
}
