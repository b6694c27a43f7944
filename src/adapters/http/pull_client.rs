//! reqwest-backed pull edge for the client reconciler.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::domain::foundation::UserId;
use crate::ports::{PullError, PullSource};

use super::identity::USER_ID_HEADER;

/// Fetches one collection endpoint as `Vec<T>`.
pub struct HttpPullSource<T> {
    client: reqwest::Client,
    url: String,
    user_id: UserId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HttpPullSource<T> {
    /// `path` is appended to `base_url` verbatim, query string included.
    pub fn new(
        base_url: &str,
        path: &str,
        user_id: UserId,
        timeout: Duration,
    ) -> Result<Self, PullError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PullError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url, path, user_id))
    }

    /// Shares an existing client between streams.
    pub fn with_client(client: reqwest::Client, base_url: &str, path: &str, user_id: UserId) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            user_id,
            _marker: PhantomData,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn transport_error(error: reqwest::Error) -> PullError {
    if error.is_timeout() {
        PullError::Timeout
    } else {
        PullError::Transport(error.to_string())
    }
}

#[async_trait]
impl<T> PullSource<T> for HttpPullSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self) -> Result<Vec<T>, PullError> {
        let response = self
            .client
            .get(&self.url)
            .header(USER_ID_HEADER, self.user_id.as_str())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PullError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| PullError::Decode(e.to_string()))
    }
}
