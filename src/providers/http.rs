//! Thin JSON-over-HTTP transport for provider integrations.
//!
//! Keeps the vendor-specific shape out of the core: an integration
//! implements a provider trait by serializing its request, calling
//! `post_json`/`get_json`, and mapping the decoded body.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ProviderError;

/// Reqwest-backed client with a per-call timeout.
#[derive(Debug, Clone)]
pub struct HttpProviderClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProviderClient {
    /// Build a client for one provider base URL.
    ///
    /// Every call carries `timeout` caller-side, so a stuck provider
    /// surfaces as `ProviderError::Timeout` instead of hanging a dispatch
    /// pass.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to `path` and decode a JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self.client.post(&url).json(body).send().await?;
        Self::decode(resp).await
    }

    /// GET `path` with query pairs and decode a JSON response.
    pub async fn get_json<R>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, ProviderError>
    where
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self.client.get(&url).query(query).send().await?;
        Self::decode(resp).await
    }

    async fn decode<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ProviderError> {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| ProviderError::Decode(format!("{e}: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let client =
            HttpProviderClient::new("https://api.example.com///", Duration::from_secs(10)).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }
}
