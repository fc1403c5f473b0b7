//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. Paths from the
//! application layer are resolved against the portal's base URL; the
//! status code is passed through untouched so the pipeline can react to 401.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use portal_application::ports::{HttpTransport, OutboundRequest, TransportError};
use portal_domain::{ApiResponse, HttpMethod};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use tracing::trace;
use url::Url;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("portal/", env!("CARGO_PKG_VERSION"));

/// HTTP transport talking to one portal backend.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport for the API rooted at `base_url`.
    ///
    /// Default configuration:
    /// - Follow redirects: up to 10
    /// - TLS verification: enabled
    /// - User-Agent: [`USER_AGENT`]
    ///
    /// Timeouts are set per request by the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL or the
    /// client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Self::with_client(client, base_url)
    }

    /// Creates a transport with a custom reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{e}: {base_url}")))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(format!(
                "not an http(s) base URL: {base_url}"
            )));
        }

        Ok(Self { client, base_url })
    }

    /// The API root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` below the base URL and appends `query`.
    ///
    /// The base URL's own path is kept: `https://host/api` + `/events`
    /// gives `https://host/api/events`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not start with `/`.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, TransportError> {
        if !path.starts_with('/') {
            return Err(TransportError::InvalidUrl(format!(
                "path must start with '/': {path}"
            )));
        }

        let mut url = self.base_url.clone();
        let joined = format!("{}{path}", self.base_url.path().trim_end_matches('/'));
        url.set_path(&joined);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Maps reqwest errors to `TransportError`.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout { timeout_ms };
        }

        let host = || {
            error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string()
        };

        if error.is_connect() {
            let message = format!("{error:?}").to_lowercase();
            if message.contains("dns") || message.contains("resolve") {
                return TransportError::DnsError {
                    host: host(),
                    message: error.to_string(),
                };
            }
            if message.contains("refused") {
                return TransportError::ConnectionRefused {
                    host: host(),
                    port: error
                        .url()
                        .and_then(Url::port_or_known_default)
                        .unwrap_or(80),
                };
            }
            return TransportError::ConnectionFailed(error.to_string());
        }

        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn dispatch(&self, request: &OutboundRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path, &request.query)?;
        let timeout_ms = u64::try_from(request.timeout.as_millis()).unwrap_or(u64::MAX);

        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(request.timeout)
            .header(ACCEPT, "application/json");
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?
            .to_vec();

        let duration = start.elapsed();
        trace!(status, bytes = body.len(), ?duration, "exchange complete");
        Ok(ApiResponse::new(status, headers, body, duration))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use portal_domain::ApiRequest;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn outbound(request: &ApiRequest, bearer: Option<&str>) -> OutboundRequest {
        OutboundRequest::from_request(
            request,
            bearer.map(ToString::to_string),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Get),
            Method::GET
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Put),
            Method::PUT
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Delete),
            Method::DELETE
        );
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let transport = ReqwestTransport::new("https://portal.example.com/api/").unwrap();

        let url = transport
            .url_for(
                "/events",
                &[
                    ("page".to_string(), "2".to_string()),
                    ("search".to_string(), "jazz night".to_string()),
                ],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://portal.example.com/api/events?page=2&search=jazz+night"
        );
        assert_eq!(
            transport.url_for("/events/4", &[]).unwrap().as_str(),
            "https://portal.example.com/api/events/4"
        );
    }

    #[test]
    fn test_rejects_unusable_urls() {
        assert!(matches!(
            ReqwestTransport::new("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            ReqwestTransport::new("mailto:admin@example.com"),
            Err(TransportError::InvalidUrl(_))
        ));

        let transport = ReqwestTransport::new("http://localhost:8000").unwrap();
        assert!(transport.url_for("events", &[]).is_err());
    }

    #[tokio::test]
    async fn test_sends_bearer_query_and_collects_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("page", "1"))
            .and(header("authorization", "Bearer token-abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-total-count", "3")
                    .set_body_json(json!({"count": 3, "results": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&format!("{}/api", server.uri())).unwrap();
        let request = ApiRequest::get("/events").with_query("page", 1);

        let response = transport
            .dispatch(&outbound(&request, Some("token-abc")))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("x-total-count").map(String::as_str), Some("3"));
        assert_eq!(response.json::<serde_json::Value>().unwrap()["count"], 3);
    }

    #[tokio::test]
    async fn test_posts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/events"))
            .and(body_json(json!({"title": "Gala"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5, "title": "Gala"})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&server.uri()).unwrap();
        let request = ApiRequest::post("/events", json!({"title": "Gala"}));

        let response = transport.dispatch(&outbound(&request, None)).await.unwrap();

        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn test_unauthorized_is_a_response_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&server.uri()).unwrap();
        let response = transport
            .dispatch(&outbound(&ApiRequest::get("/events"), Some("stale")))
            .await
            .unwrap();

        assert!(response.is_unauthorized());
        assert!(response.text().contains("expired"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(&server.uri()).unwrap();
        let request = ApiRequest::get("/slow");
        let outbound =
            OutboundRequest::from_request(&request, None, Duration::from_millis(100));

        let err = transport.dispatch(&outbound).await.unwrap_err();

        assert_eq!(err, TransportError::Timeout { timeout_ms: 100 });
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_connection_error() {
        let transport = ReqwestTransport::new("http://127.0.0.1:9").unwrap();

        let err = transport
            .dispatch(&outbound(&ApiRequest::get("/events"), None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransportError::ConnectionRefused { .. } | TransportError::ConnectionFailed(_)
        ));
    }
}
