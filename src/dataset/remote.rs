use crate::dataset::parse::parse_records;
use crate::dataset::RawRecord;
use crate::error::{AppError, Result};
use reqwest::Client;
use tracing::debug;

/// One remote CSV dataset
#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: Client,
    url: String,
}

impl RemoteSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download and parse the dataset. Non-success statuses are errors.
    pub async fn fetch(&self) -> Result<Vec<RawRecord>> {
        debug!(url = %self.url, "Fetching dataset");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::DataAcquisition(format!("{}: {}", self.url, e)))?;

        let body = response.text().await?;
        parse_records(&body)
    }
}
