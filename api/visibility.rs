use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, StatusCode};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use ai_visibility_rust::config::VisibilityConfig;
use ai_visibility_rust::http::{bad_request, error_response, json_response, method_not_allowed, preflight_response};
use ai_visibility_rust::telemetry::init_tracing;
use ai_visibility_rust::{VisibilityOrchestrator, VisibilityRequest};

async fn handle_visibility(
  method: &Method,
  body: Bytes,
  orchestrator: &VisibilityOrchestrator,
) -> Result<Response<ResponseBody>, Error> {
  if method == Method::OPTIONS {
    return preflight_response();
  }
  if method != Method::POST {
    return method_not_allowed();
  }

  let request: VisibilityRequest = match serde_json::from_slice(&body) {
    Ok(request) => request,
    Err(e) => return bad_request(format!("invalid json body: {e}")),
  };

  match orchestrator.analyze_visibility(request).await {
    Ok(result) => json_response(StatusCode::OK, serde_json::to_value(&result)?),
    Err(err) => error_response(&err),
  }
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let method = req.method().clone();
  let bytes = req.into_body().collect().await?.to_bytes();

  let cfg = match VisibilityConfig::from_env() {
    Ok(cfg) => cfg,
    Err(err) => return error_response(&err),
  };
  let orchestrator = VisibilityOrchestrator::from_config(&cfg);
  handle_visibility(&method, bytes, &orchestrator).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing("info");
  run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use ai_visibility_rust::aliases::AliasTable;
  use ai_visibility_rust::orchestrator::OrchestratorSettings;

  fn empty_orchestrator() -> VisibilityOrchestrator {
    VisibilityOrchestrator::new(Vec::new(), OrchestratorSettings::default(), AliasTable::new())
  }

  #[tokio::test]
  async fn preflight_and_wrong_method() {
    let orchestrator = empty_orchestrator();
    let preflight = handle_visibility(&Method::OPTIONS, Bytes::new(), &orchestrator)
      .await
      .unwrap();
    assert_eq!(preflight.status(), StatusCode::OK);
    assert_eq!(preflight.headers()["access-control-allow-origin"], "*");

    let get = handle_visibility(&Method::GET, Bytes::new(), &orchestrator)
      .await
      .unwrap();
    assert_eq!(get.status(), StatusCode::METHOD_NOT_ALLOWED);
  }

  #[tokio::test]
  async fn rejects_bad_json_and_missing_keywords() {
    let orchestrator = empty_orchestrator();
    let garbage = handle_visibility(&Method::POST, Bytes::from("{not json"), &orchestrator)
      .await
      .unwrap();
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);

    let body = Bytes::from(r#"{"website":"acme.com","keywords":[]}"#);
    let empty = handle_visibility(&Method::POST, body, &orchestrator).await.unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn analysis_without_platforms_is_still_ok() {
    let orchestrator = empty_orchestrator();
    let body = Bytes::from(r#"{"website":"https://acme.com","keywords":["crm"]}"#);
    let response = handle_visibility(&Method::POST, body, &orchestrator).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
  }
}
