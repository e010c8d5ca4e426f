pub mod constants;
pub mod http;
pub mod logging;
pub mod progress;
pub mod units;

pub use constants::*;
pub use http::build_client;
pub use logging::init_logging;
pub use progress::ProgressReporter;
pub use units::{celsius_to_fahrenheit, round_to};
