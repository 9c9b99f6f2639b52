//! Client for the HTTP custody endpoint.
//!
//! Uploads are `POST <url>` with a JSON body `{ "shardid": <hex>, "data": <base64> }`
//! answered by a JSON string holding the object locator. Downloads are
//! `GET <url>?id=<locator>` answered by `{ "data": <base64> }`.

use base64::Engine;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ObjectStoreError, Result};

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    shardid: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    data: String,
}

#[derive(Debug, Clone)]
pub(crate) struct HttpEndpoint {
    client: reqwest::Client,
    url: Url,
}

impl HttpEndpoint {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub async fn upload(&self, shard_id: &str, data: &[u8]) -> Result<String> {
        let request = UploadRequest {
            shardid: shard_id,
            data: base64::engine::general_purpose::STANDARD.encode(data),
        };

        let locator: String = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if locator.is_empty() {
            return Err(ObjectStoreError::InvalidPayload(
                "endpoint returned an empty locator".to_string(),
            ));
        }
        Ok(locator)
    }

    pub async fn download(&self, locator: &str) -> Result<Option<Bytes>> {
        let response = self
            .client
            .get(self.url.clone())
            .query(&[("id", locator)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: DownloadResponse = response.error_for_status()?.json().await?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(body.data.as_bytes())
            .map_err(|e| ObjectStoreError::InvalidPayload(e.to_string()))?;
        Ok(Some(Bytes::from(data)))
    }
}
