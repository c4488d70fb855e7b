use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::error::FactoryError;

pub const DEFAULT_BASE_URL: &str = "https://opendata.cern.ch";

pub trait OpenDataClient: Send + Sync {
    /// Returns the `metadata` object of the record.
    fn fetch_record(&self, recid: &str) -> Result<Value, FactoryError>;
    fn download_index(
        &self,
        recid: &str,
        index_key: &str,
        destination: &Path,
    ) -> Result<(), FactoryError>;
}

#[derive(Clone)]
pub struct OpenDataHttpClient {
    client: Client,
    base_url: String,
}

impl OpenDataHttpClient {
    pub fn with_base_url(base_url: &str) -> Result<Self, FactoryError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cms-reco/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FactoryError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| FactoryError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn record_url(&self, recid: &str) -> String {
        format!("{}/api/records/{recid}", self.base_url)
    }

    pub fn index_url(&self, recid: &str, index_key: &str) -> String {
        format!("{}/record/{recid}/file_index/{index_key}", self.base_url)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, FactoryError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "open data request failed".to_string());
        Err(FactoryError::HttpStatus { status, message })
    }
}

impl OpenDataClient for OpenDataHttpClient {
    fn fetch_record(&self, recid: &str) -> Result<Value, FactoryError> {
        let url = self.record_url(recid);
        debug!("fetching record metadata from {url}");
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| FactoryError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let mut body: Value = response
            .json()
            .map_err(|err| FactoryError::Http(err.to_string()))?;
        match body.get_mut("metadata") {
            Some(metadata) => Ok(metadata.take()),
            None => Err(FactoryError::MissingField(".metadata".to_string())),
        }
    }

    fn download_index(
        &self,
        recid: &str,
        index_key: &str,
        destination: &Path,
    ) -> Result<(), FactoryError> {
        let url = self.index_url(recid, index_key);
        debug!("index file URL: {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| FactoryError::Http(err.to_string()))?;
        let mut response = Self::handle_status(response)?;
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        }
        let mut file =
            File::create(destination).map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| FactoryError::Filesystem(err.to_string()))?;
        Ok(())
    }
}
