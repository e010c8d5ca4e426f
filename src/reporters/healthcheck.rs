use reqwest::Client;
use tracing::{info, warn};

use crate::error::{HistoryError, Result};

/// Signals a completed run to an external healthcheck endpoint.
pub struct HealthcheckReporter {
    client: Client,
}

impl HealthcheckReporter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Issue a single GET to the healthcheck URL. Any transport failure or
    /// non-2xx response is an error.
    pub async fn report_alive(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HistoryError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Healthcheck ping to {} returned {}", url, status);
            return Err(HistoryError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        info!("Pinged healthcheck");
        Ok(())
    }
}
