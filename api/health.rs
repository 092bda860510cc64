use std::collections::BTreeMap;

use hyper::{Method, StatusCode};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use ai_visibility_rust::config::{has_database_url, VisibilityConfig};
use ai_visibility_rust::http::{error_response, json_response, method_not_allowed, preflight_response};
use ai_visibility_rust::platform::Platform;
use ai_visibility_rust::telemetry::init_tracing;

fn handle_health(method: &Method, cfg: &VisibilityConfig, database: bool) -> Result<Response<ResponseBody>, Error> {
  if method == Method::OPTIONS {
    return preflight_response();
  }
  if method != Method::GET {
    return method_not_allowed();
  }

  let platforms: BTreeMap<Platform, bool> = Platform::ALL
    .into_iter()
    .map(|p| (p, cfg.provider(p).is_configured()))
    .collect();

  json_response(
    StatusCode::OK,
    serde_json::json!({"ok": true, "platforms": platforms, "database": database}),
  )
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let cfg = match VisibilityConfig::from_env() {
    Ok(cfg) => cfg,
    Err(err) => return error_response(&err),
  };
  handle_health(req.method(), &cfg, has_database_url())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing("info");
  run(service_fn(handler)).await
}
