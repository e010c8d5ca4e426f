use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::RecordKey;
use crate::utils::constants::TEMPERATURE_DECIMALS;
use crate::utils::units::{celsius_to_fahrenheit, round_to};

/// A single normalized temperature observation, prior to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    timestamp: DateTime<FixedOffset>,
    temperature: f64,
}

impl Reading {
    /// Build a reading from a temperature already expressed in °F.
    pub fn new(timestamp: DateTime<FixedOffset>, temperature: f64) -> Self {
        Self {
            timestamp,
            temperature,
        }
    }

    /// Build a reading from a Celsius value, converting to °F and rounding to
    /// four decimal places.
    pub fn from_celsius(timestamp: DateTime<FixedOffset>, celsius: f64) -> Self {
        let fahrenheit = round_to(celsius_to_fahrenheit(celsius), TEMPERATURE_DECIMALS);
        Self::new(timestamp, fahrenheit)
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Temperature in °F.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn key(&self, station_id: &str) -> RecordKey {
        RecordKey::new(self.timestamp, station_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_from_celsius_rounds_to_four_places() {
        let reading = Reading::from_celsius(ts("2024-03-01T12:51:00+00:00"), 21.123456);
        // 21.123456 * 1.8 + 32 = 70.0222208
        assert_eq!(reading.temperature(), 70.0222);
    }

    #[test]
    fn test_key_is_offset_independent() {
        let utc = Reading::new(ts("2024-03-01T17:51:00+00:00"), 40.0);
        let eastern = Reading::new(ts("2024-03-01T12:51:00-05:00"), 40.0);

        assert_eq!(utc.key("KBOS"), eastern.key("KBOS"));
        assert_ne!(utc.key("KBOS"), utc.key("KJFK"));
    }
}
