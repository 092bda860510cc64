use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderName, ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::VisibilityError;
use crate::platform::Platform;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

// Upstream chat APIs can take a while on long answers; keep it bounded anyway.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
const ERROR_BODY_MAX_CHARS: usize = 800;

fn build_http_client() -> HttpsClient {
  let roots = match hyper_rustls::HttpsConnectorBuilder::new().with_native_roots() {
    Ok(builder) => builder,
    Err(err) => {
      debug!(error = %err, "native root store unavailable, using bundled webpki roots");
      hyper_rustls::HttpsConnectorBuilder::new().with_webpki_roots()
    }
  };
  let connector = roots.https_or_http().enable_http1().build();
  Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector)
}

/// The per-request bound firing. Retryable, unlike the orchestrator's platform deadline.
pub(crate) fn request_timed_out(platform: Platform, after: Duration) -> VisibilityError {
  VisibilityError::transport(platform, format!("request timed out after {after:?}"))
}

pub fn truncate_string(value: &str, max_chars: usize) -> String {
  value.chars().take(max_chars).collect()
}

/// POSTs `payload` as JSON and returns the parsed JSON body of a 2xx response.
pub async fn post_json(
  platform: Platform,
  url: &str,
  headers: &[(HeaderName, String)],
  payload: &Value,
) -> Result<Value, VisibilityError> {
  post_json_within(platform, url, headers, payload, REQUEST_TIMEOUT).await
}

/// Like `post_json` with an explicit bound. Hitting the bound is a transport
/// failure, so the adapter moves on to its next prompt template.
pub(crate) async fn post_json_within(
  platform: Platform,
  url: &str,
  headers: &[(HeaderName, String)],
  payload: &Value,
  request_timeout: Duration,
) -> Result<Value, VisibilityError> {
  let body = serde_json::to_vec(payload).map_err(|e| VisibilityError::transport(platform, e))?;

  let mut builder = Request::builder()
    .method(Method::POST)
    .uri(url)
    .header(CONTENT_TYPE, "application/json")
    .header(ACCEPT, "application/json");
  for (name, value) in headers {
    builder = builder.header(name, value.as_str());
  }
  let req = builder
    .body(Full::new(Bytes::from(body)))
    .map_err(|e| VisibilityError::transport(platform, e))?;

  // One client per call: the pool must not outlive the runtime that spawned its tasks.
  let client = build_http_client();
  let resp = tokio::time::timeout(request_timeout, client.request(req))
    .await
    .map_err(|_| request_timed_out(platform, request_timeout))?
    .map_err(|e| VisibilityError::transport(platform, e))?;

  let status = resp.status();
  let body_bytes = resp
    .into_body()
    .collect()
    .await
    .map_err(|e| VisibilityError::transport(platform, e))?
    .to_bytes();

  if !status.is_success() {
    let snippet = String::from_utf8_lossy(&body_bytes);
    return Err(VisibilityError::Status {
      platform,
      status: status.as_u16(),
      body: truncate_string(&snippet, ERROR_BODY_MAX_CHARS),
    });
  }

  serde_json::from_slice::<Value>(&body_bytes)
    .map_err(|e| VisibilityError::malformed(platform, format!("invalid json response: {e}")))
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn post_json_returns_body_and_sends_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/echo"))
      .and(header("x-test", "1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
      .mount(&server)
      .await;

    let url = format!("{}/echo", server.uri());
    let headers = vec![(HeaderName::from_static("x-test"), "1".to_string())];
    let out = post_json(Platform::Claude, &url, &headers, &serde_json::json!({}))
      .await
      .unwrap();
    assert_eq!(out["ok"], true);
  }

  #[tokio::test]
  async fn post_json_maps_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
      .mount(&server)
      .await;

    let err = post_json(Platform::Gemini, &server.uri(), &[], &serde_json::json!({}))
      .await
      .unwrap_err();
    match err {
      VisibilityError::Status { status, body, .. } => {
        assert_eq!(status, 429);
        assert_eq!(body, "slow down");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn post_json_flags_non_json_body_as_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
      .mount(&server)
      .await;

    let err = post_json(Platform::Perplexity, &server.uri(), &[], &serde_json::json!({}))
      .await
      .unwrap_err();
    assert!(matches!(err, VisibilityError::MalformedResponse { .. }));
  }

  #[tokio::test]
  async fn slow_upstream_is_a_retryable_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
      .mount(&server)
      .await;

    let err = post_json_within(
      Platform::ChatGpt,
      &server.uri(),
      &[],
      &serde_json::json!({}),
      Duration::from_millis(100),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, VisibilityError::Transport { .. }));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("timed out"));
  }

  #[test]
  fn truncate_string_counts_chars() {
    assert_eq!(truncate_string("héllo", 2), "hé");
  }
}
