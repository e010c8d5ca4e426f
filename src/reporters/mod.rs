pub mod healthcheck;

pub use healthcheck::HealthcheckReporter;
