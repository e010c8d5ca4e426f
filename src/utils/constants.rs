/// Observation source defaults
pub const DEFAULT_API_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_OBSERVATION_LIMIT: u32 = 48;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Observation payload format
pub const NWS_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
pub const CELSIUS_UNIT_CODE: &str = "wmoUnit:degC";
pub const GEO_JSON_MEDIA_TYPE: &str = "application/geo+json";

/// Store layout
pub const DEFAULT_COLLECTION: &str = "observations";
pub const COLLECTION_CATALOG: &str = "time_series_collections";
pub const TIME_FIELD: &str = "timestamp";
pub const META_FIELD: &str = "station_id";
pub const TEMPERATURE_FIELD: &str = "temperature";

/// Temperature handling
pub const TEMPERATURE_DECIMALS: u32 = 4;

/// Config defaults
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const ENV_PREFIX: &str = "NWS_HISTORY";
