//! Geographic and temporal value types shared across the crate.

use std::fmt;
use std::fmt::{Display, Formatter};

/// Represents a geographical coordinate using latitude and longitude, in degrees.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use nsrdb::LatLon;
///
/// let golden = LatLon(39.7555, -105.2211);
/// assert_eq!(golden.0, 39.7555); // Latitude
/// assert_eq!(golden.1, -105.2211); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    /// Latitude in decimal degrees.
    pub fn latitude(self) -> f64 {
        self.0
    }
    /// Longitude in decimal degrees.
    pub fn longitude(self) -> f64 {
        self.1
    }
}

/// A dataset year. Each NSRDB year lives in its own file.
///
/// ```
/// use nsrdb::Year;
///
/// assert_eq!(Year(2020).to_string(), "2020");
/// assert_eq!(Year::from(1998).get(), 1998);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Year(pub i32);

impl Year {
    /// The calendar year as a number.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for Year {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}
