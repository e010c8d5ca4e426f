use chrono::{DateTime, FixedOffset};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{HistoryError, Result};
use crate::models::Reading;
use crate::utils::constants::{CELSIUS_UNIT_CODE, GEO_JSON_MEDIA_TYPE, NWS_TIMESTAMP_FORMAT};

/// A feature that could not be turned into a [`Reading`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedFeature {
    /// Position of the feature in the response.
    pub index: usize,
    pub reason: String,
}

/// The outcome of one fetch: the readings that parsed, in source order, and
/// the features that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedBatch {
    pub readings: Vec<Reading>,
    pub rejected: Vec<RejectedFeature>,
}

impl FetchedBatch {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Option<ObservationProperties>,
}

#[derive(Debug, Deserialize)]
struct ObservationProperties {
    timestamp: Option<String>,
    temperature: Option<QuantitativeValue>,
}

#[derive(Debug, Deserialize)]
struct QuantitativeValue {
    #[serde(rename = "unitCode")]
    unit_code: Option<String>,
    value: Option<f64>,
}

/// Client for the per-station observations endpoint of api.weather.gov.
pub struct ObservationFetcher {
    client: Client,
    base_url: String,
    limit: u32,
}

impl ObservationFetcher {
    pub fn new(client: Client, base_url: &str, limit: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        }
    }

    pub fn observations_url(&self, station_id: &str) -> String {
        format!(
            "{}/stations/{}/observations?limit={}",
            self.base_url, station_id, self.limit
        )
    }

    /// Fetch the most recent observations for a station.
    ///
    /// Transport failures and non-success statuses are errors. Individual
    /// features that fail to parse are returned in [`FetchedBatch::rejected`].
    pub async fn fetch(&self, station_id: &str) -> Result<FetchedBatch> {
        validate_station_id(station_id)?;

        let url = self.observations_url(station_id);
        info!("Fetching up to {} observations from {}", self.limit, url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, GEO_JSON_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| HistoryError::network(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Observation request to {} failed with status {}", url, status);
            return Err(HistoryError::HttpStatus { url, status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| HistoryError::network(&url, e))?;
        let batch = parse_observations(&body)?;

        for rejected in &batch.rejected {
            warn!(
                "Skipping observation feature {}: {}",
                rejected.index, rejected.reason
            );
        }
        info!(
            "Parsed {} readings for station {} ({} rejected)",
            batch.readings.len(),
            station_id,
            batch.rejected.len()
        );

        Ok(batch)
    }
}

/// Station identifiers are interpolated into the request path, so only
/// non-empty ASCII alphanumeric ids (`KBOS`, `0113W`) pass.
pub fn validate_station_id(station_id: &str) -> Result<()> {
    if station_id.is_empty() || !station_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(HistoryError::Config(format!(
            "Invalid station identifier '{}'",
            station_id
        )));
    }
    Ok(())
}

/// Parse an observations response body.
///
/// A body without a `features` array is rejected as a whole; otherwise every
/// feature is parsed independently and failures are collected, not raised.
pub fn parse_observations(body: &str) -> Result<FetchedBatch> {
    let document: Value = serde_json::from_str(body)?;
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            HistoryError::InvalidFormat("Observation response has no features array".to_string())
        })?;

    let mut batch = FetchedBatch::default();
    for (index, feature) in features.iter().enumerate() {
        match parse_feature(feature) {
            Ok(reading) => batch.readings.push(reading),
            Err(e) => batch.rejected.push(RejectedFeature {
                index,
                reason: e.to_string(),
            }),
        }
    }

    Ok(batch)
}

fn parse_feature(feature: &Value) -> Result<Reading> {
    let feature = Feature::deserialize(feature)?;
    let properties = feature
        .properties
        .ok_or_else(|| HistoryError::InvalidFormat("missing properties".to_string()))?;

    let raw_timestamp = properties
        .timestamp
        .ok_or_else(|| HistoryError::InvalidFormat("missing timestamp".to_string()))?;
    let timestamp = parse_timestamp(&raw_timestamp)?;

    let temperature = properties
        .temperature
        .ok_or_else(|| HistoryError::InvalidFormat("missing temperature".to_string()))?;
    if let Some(unit) = temperature.unit_code.as_deref() {
        if unit != CELSIUS_UNIT_CODE {
            return Err(HistoryError::InvalidFormat(format!(
                "unexpected temperature unit '{}'",
                unit
            )));
        }
    }
    let celsius = temperature
        .value
        .ok_or_else(|| HistoryError::InvalidFormat("temperature has no value".to_string()))?;

    let reading = Reading::from_celsius(timestamp, celsius);
    debug!(
        "Parsed reading {} -> {:.4}°F",
        raw_timestamp,
        reading.temperature()
    );
    Ok(reading)
}

/// Parse an observation timestamp such as `2024-01-15T10:51:00+0000`.
/// Offsets written with a colon (`+00:00`) are accepted as well.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw, NWS_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map_err(HistoryError::from)
}
