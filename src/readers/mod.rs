pub mod observation_fetcher;

pub use observation_fetcher::{
    parse_observations, parse_timestamp, validate_station_id, FetchedBatch, ObservationFetcher,
    RejectedFeature,
};
