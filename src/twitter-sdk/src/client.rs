use std::time::Duration;

use serde::Deserialize;

use crate::SdkError;

/// HTTP client for the Twitter v1.1 REST API
#[derive(Clone, Debug)]
pub struct TwitterClient {
    base_url: String,
    access_token: String,
    http: reqwest::Client,
}

/// Error payload returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: i64,
    message: String,
}

impl TwitterClient {
    /// Create a new client pointing at the given base URL with a bearer token
    pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self, SdkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a GET request with query parameters and deserialize the response
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SdkError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("GET {url}");
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        handle_response(resp).await
    }

    /// Send a POST request with query parameters and deserialize the response
    pub(crate) async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SdkError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!("POST {url}");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        handle_response(resp).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, SdkError> {
    if resp.status().is_success() {
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        Err(SdkError::Api {
            status,
            message: error_message(&text),
        })
    }
}

/// Flatten an error body into one line, falling back to the raw text.
fn error_message(text: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) if !body.errors.is_empty() => body
            .errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; "),
        _ => text.to_string(),
    }
}
