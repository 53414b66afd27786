//! # Transport
//!
//! A thin wrapper around `reqwest` that knows how to reach a Nuxeo server: it resolves paths
//! against the base URL, authenticates every request and applies the configured default headers.
//!
//! The transport never interprets a successful body, it hands it over as a [`RawResponse`]
//! for the converter. Error statuses are turned into a [`RemoteError`] right here, so the
//! converter only ever sees successful responses.
use super::{
    auth,
    config::{Authentication, ClientConfig},
};
use crate::{error::RemoteError, marshal::converter::RawResponse};
use bytes::Bytes;
use reqwest::{
    Method,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use std::io::Cursor;
use tracing::debug;

/// Header listing the document schemas the server should return.
pub const PROPERTIES_HEADER: &str = "properties";
/// Header carrying a Nuxeo authentication token.
pub const AUTHENTICATION_TOKEN_HEADER: &str = "X-Authentication-Token";

const ACCEPT_VALUE: &str = "application/json, */*";

/// Errors that can occur when building the transport.
#[derive(Debug, thiserror::Error)]
pub enum HttpBuildError {
    #[error("Invalid header key '{key}': '{source}'")]
    InvalidHeaderKey {
        key: String,
        source: http::header::InvalidHeaderName,
    },
    #[error("Invalid header value for key '{key}': '{source}'")]
    InvalidHeaderValue {
        key: String,
        source: http::header::InvalidHeaderValue,
    },
    #[error("Failed to build HTTP client: '{0}'")]
    Client(#[source] reqwest::Error),
}

/// Errors that can occur while sending a request, before any response status is known.
#[derive(Debug, thiserror::Error)]
pub enum HttpRequestError {
    #[error("Invalid header key '{key}': '{source}'")]
    InvalidHeaderKey {
        key: String,
        source: http::header::InvalidHeaderName,
    },
    #[error("Invalid header value for key '{key}': '{source}'")]
    InvalidHeaderValue {
        key: String,
        source: http::header::InvalidHeaderValue,
    },
    #[error("Request to '{url}' failed: '{source}'")]
    Send { url: String, source: reqwest::Error },
    #[error("Failed to read response body from '{url}': '{source}'")]
    ReadBody { url: String, source: reqwest::Error },
}

/// The payload of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// Pre-encoded bytes, sent with their own content type.
    Raw { content_type: String, content: Bytes },
}

/// A request relative to the server base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn raw_body(mut self, content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Raw {
            content_type: content_type.into(),
            content: content.into(),
        });
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}

/// The client side of the wire.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    authentication: Authentication,
}

impl HttpClient {
    /// Builds a transport from a configuration. No request is sent.
    pub fn new(config: &ClientConfig) -> Result<Self, HttpBuildError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        if !config.schemas.is_empty() {
            insert_default(&mut headers, PROPERTIES_HEADER, &config.schemas.join(","))?;
        }
        if let Authentication::Token { token } = &config.authentication {
            insert_default(&mut headers, AUTHENTICATION_TOKEN_HEADER, token)?;
        }
        for (key, value) in &config.headers {
            insert_default(&mut headers, key, value)?;
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout_duration())
            .build()
            .map_err(HttpBuildError::Client)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            authentication: config.authentication.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and buffers the response body.
    ///
    /// # Returns
    ///
    /// * `Ok(Ok(RawResponse))` - The server answered with a success status.
    /// * `Ok(Err(RemoteError))` - The server answered with an error status.
    /// * `Err(HttpRequestError)` - The request could not be sent or the body could not be read.
    pub async fn send(
        &self,
        request: ApiRequest,
    ) -> Result<Result<RawResponse<Cursor<Bytes>>, RemoteError>, HttpRequestError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.client.request(request.method, &url);
        builder = match &self.authentication {
            Authentication::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
            Authentication::Bearer { token } => builder.bearer_auth(token),
            Authentication::PortalSso { username, secret } => {
                auth::portal_sso_headers(username, secret)
                    .into_iter()
                    .fold(builder, |builder, (name, value)| builder.header(name, value))
            }
            Authentication::None | Authentication::Token { .. } => builder,
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|source| HttpRequestError::InvalidHeaderKey {
                    key: key.clone(),
                    source,
                })?;
            let value = HeaderValue::from_str(&value)
                .map_err(|source| HttpRequestError::InvalidHeaderValue { key, source })?;
            builder = builder.header(name, value);
        }
        builder = match request.body {
            Some(RequestBody::Json(body)) => builder.json(&body),
            Some(RequestBody::Raw {
                content_type,
                content,
            }) => builder.header(CONTENT_TYPE, content_type).body(content),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|source| HttpRequestError::Send {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| HttpRequestError::ReadBody {
                url: url.clone(),
                source,
            })?;

        debug!(status = status.as_u16(), url = %url, length = body.len(), "Received response");

        if !status.is_success() {
            return Ok(Err(RemoteError::from_response(status.as_u16(), &body)));
        }

        Ok(Ok(RawResponse::new(headers, Cursor::new(body))))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn insert_default(headers: &mut HeaderMap, key: &str, value: &str) -> Result<(), HttpBuildError> {
    let name = HeaderName::from_bytes(key.as_bytes()).map_err(|source| {
        HttpBuildError::InvalidHeaderKey {
            key: key.to_string(),
            source,
        }
    })?;
    let value =
        HeaderValue::from_str(value).map_err(|source| HttpBuildError::InvalidHeaderValue {
            key: key.to_string(),
            source,
        })?;
    headers.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let client = HttpClient::new(&ClientConfig::new("http://localhost:8080/nuxeo/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/nuxeo");
        assert_eq!(
            client.url("/api/v1/me"),
            "http://localhost:8080/nuxeo/api/v1/me"
        );
        assert_eq!(
            client.url("api/v1/path/"),
            "http://localhost:8080/nuxeo/api/v1/path/"
        );
    }

    #[test]
    fn test_invalid_default_header() {
        let config = ClientConfig::new("http://localhost").header("bad header", "x");
        assert!(matches!(
            HttpClient::new(&config),
            Err(HttpBuildError::InvalidHeaderKey { key, .. }) if key == "bad header"
        ));
    }
}
