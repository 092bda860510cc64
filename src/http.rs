use hyper::StatusCode;
use vercel_runtime::{Error, Response, ResponseBody};

use crate::error::VisibilityError;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "content-type, authorization";

pub fn json_response(status: StatusCode, value: serde_json::Value) -> Result<Response<ResponseBody>, Error> {
  Ok(
    Response::builder()
      .status(status)
      .header("content-type", "application/json; charset=utf-8")
      .header("access-control-allow-origin", ALLOW_ORIGIN)
      .body(ResponseBody::from(value))?,
  )
}

/// CORS preflight answer.
pub fn preflight_response() -> Result<Response<ResponseBody>, Error> {
  Ok(
    Response::builder()
      .status(StatusCode::OK)
      .header("content-type", "application/json; charset=utf-8")
      .header("access-control-allow-origin", ALLOW_ORIGIN)
      .header("access-control-allow-methods", ALLOW_METHODS)
      .header("access-control-allow-headers", ALLOW_HEADERS)
      .body(ResponseBody::from(serde_json::json!({"ok": true})))?,
  )
}

pub fn method_not_allowed() -> Result<Response<ResponseBody>, Error> {
  json_response(
    StatusCode::METHOD_NOT_ALLOWED,
    serde_json::json!({"ok": false, "error": "method_not_allowed"}),
  )
}

pub fn bad_request(message: impl std::fmt::Display) -> Result<Response<ResponseBody>, Error> {
  json_response(
    StatusCode::BAD_REQUEST,
    serde_json::json!({"ok": false, "error": "bad_request", "message": message.to_string()}),
  )
}

pub fn error_response(err: &VisibilityError) -> Result<Response<ResponseBody>, Error> {
  match err {
    VisibilityError::InvalidRequest(message) => bad_request(message),
    other => json_response(
      StatusCode::INTERNAL_SERVER_ERROR,
      serde_json::json!({"ok": false, "error": "internal_error", "message": other.to_string()}),
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_response_allows_any_origin() {
    let ok = json_response(StatusCode::OK, serde_json::json!({"ok": true})).unwrap();
    assert_eq!(ok.headers()["access-control-allow-origin"], "*");

    let preflight = preflight_response().unwrap();
    assert_eq!(preflight.status(), StatusCode::OK);
    assert_eq!(preflight.headers()["access-control-allow-origin"], "*");
    assert!(preflight.headers()["access-control-allow-methods"]
      .to_str()
      .unwrap()
      .contains("POST"));
  }

  #[test]
  fn invalid_request_maps_to_400_and_others_to_500() {
    let bad = error_response(&VisibilityError::InvalidRequest("website is required".to_string())).unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let internal = error_response(&VisibilityError::Config("boom".to_string())).unwrap();
    assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
