use std::time::Duration;

use thiserror::Error;

use crate::platform::Platform;

/// Failures raised while probing platforms or handling leads.
///
/// Everything platform-scoped is captured inline in the analysis result by the
/// orchestrator; only request validation errors reach callers of
/// `analyze_visibility`.
#[derive(Debug, Error)]
pub enum VisibilityError {
  #[error("{platform} credential not configured (set {env_var})")]
  MissingCredential {
    platform: Platform,
    env_var: &'static str,
  },

  #[error("{platform} transport error: {message}")]
  Transport { platform: Platform, message: String },

  #[error("{platform} returned HTTP {status}: {body}")]
  Status {
    platform: Platform,
    status: u16,
    body: String,
  },

  #[error("{platform} returned a malformed response: {message}")]
  MalformedResponse { platform: Platform, message: String },

  #[error("{platform} timed out after {duration:?}")]
  Timeout { platform: Platform, duration: Duration },

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("configuration error: {0}")]
  Config(String),

  #[error("storage error: {0}")]
  Storage(#[from] sqlx::Error),
}

impl VisibilityError {
  pub fn transport(platform: Platform, err: impl std::fmt::Display) -> Self {
    Self::Transport {
      platform,
      message: err.to_string(),
    }
  }

  pub fn malformed(platform: Platform, message: impl Into<String>) -> Self {
    Self::MalformedResponse {
      platform,
      message: message.into(),
    }
  }

  /// Transport, status and envelope failures move on to the next prompt template.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      Self::Transport { .. } | Self::Status { .. } | Self::MalformedResponse { .. }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_credential_names_the_env_var() {
    let err = VisibilityError::MissingCredential {
      platform: Platform::Gemini,
      env_var: "GEMINI_API_KEY",
    };
    assert_eq!(
      err.to_string(),
      "gemini credential not configured (set GEMINI_API_KEY)"
    );
    assert!(!err.is_retryable());
  }

  #[test]
  fn status_errors_are_retryable() {
    let err = VisibilityError::Status {
      platform: Platform::Claude,
      status: 529,
      body: "overloaded".to_string(),
    };
    assert!(err.is_retryable());
  }
}
