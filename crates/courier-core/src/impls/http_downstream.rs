//! HTTP implementation of the downstream client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::domain::DownstreamError;
use crate::ports::DownstreamClient;

/// Calls `GET <base>/api.php?main_url=..&meme_url=..` on the downstream
/// host.
///
/// # Deadline
/// With `deadline: None` the request has no timeout at all and may block
/// for as long as the downstream takes; the worker drains tasks
/// sequentially, so a hung call stalls everything queued behind it. The
/// default configuration therefore sets a deadline, and expiry surfaces as
/// a transport error (the task fails instead of wedging the worker).
pub struct HttpDownstreamClient {
    http: reqwest::Client,
    endpoint: Url,
    deadline: Option<Duration>,
}

impl HttpDownstreamClient {
    /// Build a client against `base` (the downstream host root; `api.php`
    /// is resolved relative to it).
    pub fn new(base: &str, deadline: Option<Duration>) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse(base)?.join("api.php")?;
        Ok(Self {
            // No client-wide timeout; the per-request deadline is the only
            // bound, and only when configured.
            http: reqwest::Client::new(),
            endpoint,
            deadline,
        })
    }

    fn request_url(&self, main_url: &str, meme_url: &str) -> Url {
        let mut url = self.endpoint.clone();
        // query_pairs_mut percent-encodes both values.
        url.query_pairs_mut()
            .append_pair("main_url", main_url)
            .append_pair("meme_url", meme_url);
        url
    }
}

#[async_trait]
impl DownstreamClient for HttpDownstreamClient {
    async fn invoke(&self, main_url: &str, meme_url: &str) -> Result<Value, DownstreamError> {
        let mut request = self.http.get(self.request_url(main_url, meme_url));
        if let Some(deadline) = self.deadline {
            request = request.timeout(deadline);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownstreamError::Status(status.as_u16()));
        }

        // Read the body as text first: a 2xx with an unparseable body is
        // "invalid response", never a partially-parsed value.
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|_| DownstreamError::InvalidBody)
    }
}
