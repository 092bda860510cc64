use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, StatusCode};
use tracing::warn;
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use ai_visibility_rust::config::VisibilityConfig;
use ai_visibility_rust::db::MySqlLeadStore;
use ai_visibility_rust::http::{bad_request, error_response, json_response, method_not_allowed, preflight_response};
use ai_visibility_rust::leads::{process_lead, LeadStore, LeadSubmission, TracingLeadNotifier};
use ai_visibility_rust::telemetry::init_tracing;
use ai_visibility_rust::VisibilityOrchestrator;

async fn handle_leads(
  method: &Method,
  body: Bytes,
  orchestrator: &VisibilityOrchestrator,
  store: Option<&dyn LeadStore>,
) -> Result<Response<ResponseBody>, Error> {
  if method == Method::OPTIONS {
    return preflight_response();
  }
  if method != Method::POST {
    return method_not_allowed();
  }

  let submission: LeadSubmission = match serde_json::from_slice(&body) {
    Ok(submission) => submission,
    Err(e) => return bad_request(format!("invalid json body: {e}")),
  };

  match process_lead(submission, store, &TracingLeadNotifier, orchestrator).await {
    Ok(outcome) => json_response(
      StatusCode::OK,
      serde_json::json!({
        "ok": true,
        "lead_id": outcome.lead_id,
        "persisted": outcome.persisted,
        "analysis": outcome.analysis,
        "analysis_error": outcome.analysis_error,
      }),
    ),
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

  let store = match MySqlLeadStore::connect().await {
    Ok(store) => store,
    Err(err) => {
      warn!(error = %err, "lead store unavailable");
      None
    }
  };
  let store = store.as_ref().map(|s| s as &dyn LeadStore);

  handle_leads(&method, bytes, &orchestrator, store).await
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
  async fn rejects_wrong_method() {
    let response = handle_leads(&Method::PUT, Bytes::new(), &empty_orchestrator(), None)
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
  }

  #[tokio::test]
  async fn rejects_invalid_email() {
    let body = Bytes::from(r#"{"name":"Ada","email":"ada","website":"acme.com"}"#);
    let response = handle_leads(&Method::POST, body, &empty_orchestrator(), None)
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn accepts_lead_without_store() {
    let body = Bytes::from(r#"{"name":"Ada","email":"ada@acme.com","website":"acme.com","keywords":["crm"]}"#);
    let response = handle_leads(&Method::POST, body, &empty_orchestrator(), None)
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
  }
}
