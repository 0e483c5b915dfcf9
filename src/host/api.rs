//! Platform REST API client using a service key
//!
//! Stats, leaderboards, structured data storage and world storage all go
//! through this client. The service key bypasses player-scoped access checks,
//! so this client never leaves the server process.

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;

#[derive(Clone)]
pub struct HostApiClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl HostApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.host_api_url.clone(),
            service_key: config.host_api_key.clone(),
        }
    }

    /// Get the REST API URL for a resource
    fn rest_url(&self, resource: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, resource)
    }

    /// Make an authenticated GET request expecting a single row
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &str,
    ) -> Result<Option<T>, HostApiError> {
        let url = format!("{}?{}", self.rest_url(resource), query);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(HostApiError::Request)?;

        if response.status() == reqwest::StatusCode::NOT_ACCEPTABLE {
            // No rows found
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HostApiError::Api { status: status.as_u16(), body });
        }

        response.json().await.map(Some).map_err(HostApiError::Parse)
    }

    /// Upsert (insert or update on conflict)
    pub async fn upsert<T: Serialize>(
        &self,
        resource: &str,
        data: &T,
        on_conflict: &str,
    ) -> Result<(), HostApiError> {
        let url = self.rest_url(resource);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .header("On-Conflict", on_conflict)
            .json(data)
            .send()
            .await
            .map_err(HostApiError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HostApiError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, resource: &str, query: &str) -> Result<(), HostApiError> {
        let url = format!("{}?{}", self.rest_url(resource), query);

        let response = self
            .client
            .delete(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()
            .await
            .map_err(HostApiError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HostApiError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }

    /// Call a stored procedure (RPC endpoint)
    pub async fn rpc<T: Serialize>(&self, name: &str, args: &T) -> Result<(), HostApiError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, name);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .json(args)
            .send()
            .await
            .map_err(HostApiError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HostApiError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }

    /// Download an object from a storage bucket
    pub async fn download_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, HostApiError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()
            .await
            .map_err(HostApiError::Request)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(HostApiError::NotFound);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HostApiError::Api { status: status.as_u16(), body });
        }

        let bytes = response.bytes().await.map_err(HostApiError::Parse)?;
        Ok(bytes.to_vec())
    }

    /// Delete an object from a storage bucket
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), HostApiError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key);

        let response = self
            .client
            .delete(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()
            .await
            .map_err(HostApiError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HostApiError::Api { status: status.as_u16(), body });
        }

        Ok(())
    }
}

/// Platform API errors
#[derive(Debug, thiserror::Error)]
pub enum HostApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("Object not found")]
    NotFound,
}
