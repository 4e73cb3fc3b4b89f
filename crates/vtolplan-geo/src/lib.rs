use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all great-circle math (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_007.2;

/// Geographic position. Altitude is carried alongside lat/lon but never
/// takes part in distance or azimuth math.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self { latitude, longitude, altitude }
    }

    pub fn with_altitude(self, altitude: f64) -> Self {
        Self { altitude, ..self }
    }

    /// Same horizontal position as `other`, keeping our own altitude.
    pub fn with_lat_lon_of(self, other: &Coordinate) -> Self {
        Self { latitude: other.latitude, longitude: other.longitude, altitude: self.altitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }

    /// Vehicles report an unset home as 0/0.
    pub fn has_zero_lat_lon(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    /// Great-circle (haversine) distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos() * other.latitude.to_radians().cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial bearing towards `other`, degrees in [0, 360).
    pub fn azimuth_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let x = dlon.sin() * lat2.cos();
        let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        normalize_heading(x.atan2(y).to_degrees())
    }

    /// Destination point after travelling `distance_m` along `azimuth_deg`.
    pub fn at_distance_and_azimuth(&self, distance_m: f64, azimuth_deg: f64) -> Coordinate {
        let delta = distance_m / EARTH_RADIUS_M;
        let theta = azimuth_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        Coordinate {
            latitude: lat2.to_degrees(),
            longitude: normalize_longitude(lon2.to_degrees()),
            altitude: self.altitude,
        }
    }
}

/// Wraps any angle into [0, 360).
pub fn normalize_heading(deg: f64) -> f64 {
    let h = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negatives
    if h >= 360.0 { 0.0 } else { h }
}

fn normalize_longitude(deg: f64) -> f64 {
    let l = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if l == -180.0 && deg > 0.0 { 180.0 } else { l }
}

/// Smallest absolute difference between two headings, degrees.
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}
