use std::time::Duration;

use reqwest::{header, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    retry::{self, AttemptError, RetryPolicy},
    AttemptFailure, BoatRecord, BoatsError, ClientOptions, Result,
};

/// HTTP client for the third-party boats API.
///
/// Every operation is retried on transient failures (network errors,
/// per-attempt timeouts, 5xx) according to the configured [`RetryPolicy`].
/// The client keeps no state between calls and can be cloned freely.
#[derive(Clone, Debug)]
pub struct BoatsClient {
    http: reqwest::Client,
    base_url: String,
    options: ClientOptions,
    policy: RetryPolicy,
}

impl BoatsClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// Requests go to `<base_url>/boats` and `<base_url>/boats/<id>`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let options = ClientOptions::default();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            policy: RetryPolicy::from(&options),
            options,
        }
    }

    /// Creates a client from the `BOATS_API_URL` environment variable.
    ///
    /// Returns an error if the variable is missing, empty, or not a URL
    /// that can carry a path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use riverport_boats::BoatsClient;
    ///
    /// let boats = BoatsClient::from_env().expect("missing BOATS_API_URL");
    /// ```
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("BOATS_API_URL").map_err(|_| {
            BoatsError::Config("missing BOATS_API_URL environment variable".to_owned())
        })?;
        if url.trim().is_empty() {
            return Err(BoatsError::Config(
                "BOATS_API_URL is set but empty".to_owned(),
            ));
        }
        let client = Self::new(url.trim());
        client.endpoint(None)?;
        Ok(client)
    }

    /// Applies client options such as timeout and retry behavior.
    ///
    /// A predicate installed with [`BoatsClient::with_retry_predicate`] is kept.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.policy = RetryPolicy {
            retryable_status: self.policy.retryable_status,
            ..RetryPolicy::from(&opts)
        };
        self.options = opts;
        self
    }

    /// Replaces the predicate deciding which HTTP statuses are retried.
    ///
    /// 404 is always reported as [`BoatsError::NotFound`] on id routes.
    pub fn with_retry_predicate(mut self, predicate: fn(StatusCode) -> bool) -> Self {
        self.policy.retryable_status = predicate;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches every boat, in upstream order.
    pub async fn list_boats(&self) -> Result<Vec<BoatRecord>> {
        let url = self.endpoint(None)?;
        self.send_with_retry(Method::GET, url, None, None).await
    }

    /// Fetches a single boat.
    pub async fn get_boat(&self, id: &str) -> Result<BoatRecord> {
        validate_id(id)?;
        let url = self.endpoint(Some(id))?;
        self.send_with_retry(Method::GET, url, None, Some(id)).await
    }

    /// Merges `fields` into the boat upstream and returns the updated record.
    ///
    /// The update is retried like a read. An attempt that times out may
    /// still be applied upstream; a later [`BoatsClient::get_boat`] shows
    /// the actual state.
    pub async fn update_boat(&self, id: &str, fields: &Map<String, Value>) -> Result<BoatRecord> {
        validate_id(id)?;
        let url = self.endpoint(Some(id))?;
        self.send_with_retry(Method::PUT, url, Some(fields), Some(id))
            .await
    }

    async fn send_with_retry<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Map<String, Value>>,
        id: Option<&str>,
    ) -> Result<T> {
        let method = &method;
        let url = &url;
        retry::execute(&self.policy, move |attempt| {
            self.send_once(method.clone(), url.clone(), body, id, attempt)
        })
        .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Map<String, Value>>,
        id: Option<&str>,
        attempt: u32,
    ) -> std::result::Result<T, AttemptError> {
        tracing::debug!(attempt, %method, %url, "sending boats request");

        let mut request = self
            .http
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .timeout(Duration::from_millis(self.options.timeout_ms));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        if status.is_success() {
            return serde_json::from_str::<T>(&body).map_err(|err| {
                AttemptError::Terminal(BoatsError::InvalidResponse(format!(
                    "invalid boats response JSON: {err}; body: {body}"
                )))
            });
        }

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(AttemptError::Terminal(BoatsError::NotFound {
                    id: id.to_owned(),
                }));
            }
        }

        if self.policy.is_retryable_status(status) {
            return Err(AttemptError::Retryable(AttemptFailure::Status {
                status: status.as_u16(),
                body,
            }));
        }

        Err(AttemptError::Terminal(BoatsError::Rejected {
            status: status.as_u16(),
            body,
        }))
    }

    fn endpoint(&self, id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|err| {
            BoatsError::Config(format!("invalid base url '{}': {err}", self.base_url))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                BoatsError::Config(format!("base url '{}' cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty().push("boats");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(BoatsError::InvalidId);
    }
    Ok(())
}

fn classify_transport(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Retryable(AttemptFailure::Timeout)
    } else if err.is_connect() || err.is_request() || err.is_body() {
        AttemptError::Retryable(AttemptFailure::Network(err.to_string()))
    } else if err.is_decode() {
        AttemptError::Terminal(BoatsError::InvalidResponse(err.to_string()))
    } else {
        AttemptError::Terminal(BoatsError::Transport(err))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::BoatsClient;
    use crate::{BoatsError, ClientOptions};

    fn never_retry(_: StatusCode) -> bool {
        false
    }

    #[test]
    fn endpoint_appends_boats_collection() {
        let client = BoatsClient::new("http://localhost:3000/third-party/");
        let url = client.endpoint(None).expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:3000/third-party/boats");

        let client = BoatsClient::new("http://localhost:3000");
        let url = client.endpoint(Some("7")).expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:3000/boats/7");
    }

    #[test]
    fn endpoint_escapes_id_as_single_segment() {
        let client = BoatsClient::new("http://localhost:3000");
        let url = client.endpoint(Some("a/b c")).expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:3000/boats/a%2Fb%20c");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let client = BoatsClient::new("not a url");
        assert!(matches!(client.endpoint(None), Err(BoatsError::Config(_))));
    }

    #[tokio::test]
    async fn blank_id_is_rejected_without_network() {
        let client = BoatsClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.get_boat("  ").await,
            Err(BoatsError::InvalidId)
        ));
        assert!(matches!(
            client.update_boat("", &serde_json::Map::new()).await,
            Err(BoatsError::InvalidId)
        ));
    }

    #[test]
    fn with_options_keeps_custom_predicate() {
        let client = BoatsClient::new("http://localhost:3000")
            .with_retry_predicate(never_retry)
            .with_options(ClientOptions {
                max_attempts: 7,
                ..ClientOptions::default()
            });

        assert_eq!(client.retry_policy().attempt_budget(), 7);
        assert!(!client
            .retry_policy()
            .is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
