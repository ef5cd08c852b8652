//! Geodesy and client fingerprint helpers for check-ins.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Validated WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Raised for coordinates outside the valid range.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("coordinates out of range: lat={lat}, lng={lng}")]
pub struct InvalidCoordinates {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidCoordinates> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if valid {
            Ok(Self { lat, lng })
        } else {
            Err(InvalidCoordinates { lat, lng })
        }
    }

    /// Great-circle distance in metres.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::checkins::GeoPoint;
    ///
    /// let a = GeoPoint::new(55.7558, 37.6173).expect("valid");
    /// assert!(a.distance_m(&a) < 0.001);
    /// ```
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}

/// First 16 hex characters of SHA-256 over the trimmed User-Agent.
#[must_use]
pub fn user_agent_hash(user_agent: &str) -> Option<String> {
    let trimmed = user_agent.trim();
    if trimmed.is_empty() {
        return None;
    }
    let digest = hex::encode(Sha256::digest(trimmed.as_bytes()));
    Some(digest.chars().take(16).collect())
}

/// Coarse network prefix: /24 for IPv4, /64 for IPv6.
///
/// # Examples
/// ```
/// use backend::domain::checkins::ip_prefix;
///
/// let ip = "203.0.113.77".parse().expect("ipv4");
/// assert_eq!(ip_prefix(ip), "203.0.113.0/24");
/// ```
#[must_use]
pub fn ip_prefix(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            format!("{a}.{b}.{c}.0/24")
        }
        IpAddr::V6(v6) => {
            let [s0, s1, s2, s3, ..] = v6.segments();
            format!("{s0:x}:{s1:x}:{s2:x}:{s3:x}::/64")
        }
    }
}
