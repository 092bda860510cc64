use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::VisibilityError;
use crate::orchestrator::VisibilityOrchestrator;
use crate::types::{AnalysisResult, VisibilityRequest, MAX_HISTORY_DAYS, MIN_HISTORY_DAYS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadSubmission {
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
  pub website: String,
  #[serde(default)]
  pub company: Option<String>,
  #[serde(default)]
  pub competitors: Vec<String>,
  #[serde(default)]
  pub keywords: Vec<String>,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub historical: bool,
  #[serde(default = "crate::types::default_days")]
  pub days: u32,
}

fn trimmed_opt(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn trimmed_list(values: Vec<String>) -> Vec<String> {
  values
    .into_iter()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .collect()
}

fn is_plausible_email(email: &str) -> bool {
  match email.split_once('@') {
    Some((local, host)) => !local.is_empty() && !host.is_empty(),
    None => false,
  }
}

impl LeadSubmission {
  pub fn validated(mut self) -> Result<Self, VisibilityError> {
    self.name = self.name.trim().to_string();
    self.email = self.email.trim().to_string();
    self.website = self.website.trim().to_string();
    self.phone = trimmed_opt(self.phone);
    self.company = trimmed_opt(self.company);
    self.message = trimmed_opt(self.message);
    self.competitors = trimmed_list(self.competitors);
    self.keywords = trimmed_list(self.keywords);

    if self.name.is_empty() {
      return Err(VisibilityError::InvalidRequest("name is required".to_string()));
    }
    if !is_plausible_email(&self.email) {
      return Err(VisibilityError::InvalidRequest("a valid email is required".to_string()));
    }
    if self.website.is_empty() {
      return Err(VisibilityError::InvalidRequest("website is required".to_string()));
    }
    if self.historical && !(MIN_HISTORY_DAYS..=MAX_HISTORY_DAYS).contains(&self.days) {
      return Err(VisibilityError::InvalidRequest(format!(
        "days must be between {MIN_HISTORY_DAYS} and {MAX_HISTORY_DAYS}"
      )));
    }
    Ok(self)
  }

  /// The visibility probe this lead asks for, if it named any keywords.
  pub fn visibility_request(&self) -> Option<VisibilityRequest> {
    if self.keywords.is_empty() {
      return None;
    }
    Some(VisibilityRequest {
      website: self.website.clone(),
      company: self.company.clone(),
      competitors: self.competitors.clone(),
      keywords: self.keywords.clone(),
      historical: self.historical,
      days: self.days,
    })
  }
}

#[async_trait]
pub trait LeadStore: Send + Sync {
  async fn save_lead(&self, lead: &LeadSubmission) -> Result<u64, VisibilityError>;
  async fn save_analysis(&self, lead_id: u64, analysis: &AnalysisResult) -> Result<u64, VisibilityError>;
}

#[async_trait]
pub trait LeadNotifier: Send + Sync {
  async fn notify(&self, lead: &LeadSubmission, lead_id: Option<u64>) -> Result<(), VisibilityError>;
}

/// Writes new leads to the log stream.
pub struct TracingLeadNotifier;

#[async_trait]
impl LeadNotifier for TracingLeadNotifier {
  async fn notify(&self, lead: &LeadSubmission, lead_id: Option<u64>) -> Result<(), VisibilityError> {
    info!(
      lead_id = ?lead_id,
      name = %lead.name,
      email = %lead.email,
      website = %lead.website,
      keywords = lead.keywords.len(),
      "new lead received"
    );
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadOutcome {
  pub lead_id: Option<u64>,
  pub persisted: bool,
  pub analysis: Option<AnalysisResult>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub analysis_error: Option<String>,
}

/// Validates, stores, announces and (when keywords were given) analyses one lead.
///
/// Only validation fails the call. Storage and notification problems are
/// logged and reflected in the outcome.
pub async fn process_lead(
  submission: LeadSubmission,
  store: Option<&dyn LeadStore>,
  notifier: &dyn LeadNotifier,
  orchestrator: &VisibilityOrchestrator,
) -> Result<LeadOutcome, VisibilityError> {
  let lead = submission.validated()?;

  let lead_id = match store {
    Some(store) => match store.save_lead(&lead).await {
      Ok(id) => {
        info!(lead_id = id, website = %lead.website, "lead persisted");
        Some(id)
      }
      Err(err) => {
        warn!(error = %err, website = %lead.website, "lead not persisted");
        None
      }
    },
    None => None,
  };

  if let Err(err) = notifier.notify(&lead, lead_id).await {
    warn!(error = %err, "lead notification failed");
  }

  let mut analysis = None;
  let mut analysis_error = None;
  if let Some(request) = lead.visibility_request() {
    match orchestrator.analyze_visibility(request).await {
      Ok(result) => analysis = Some(result),
      Err(err) => {
        warn!(error = %err, "lead visibility analysis rejected");
        analysis_error = Some(err.to_string());
      }
    }
  }

  if let (Some(store), Some(id), Some(result)) = (store, lead_id, analysis.as_ref()) {
    if let Err(err) = store.save_analysis(id, result).await {
      warn!(lead_id = id, error = %err, "visibility run not persisted");
    }
  }

  Ok(LeadOutcome {
    lead_id,
    persisted: lead_id.is_some(),
    analysis,
    analysis_error,
  })
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  use super::*;
  use crate::adapter::test_support::ScriptedBackend;
  use crate::adapter::PlatformAdapter;
  use crate::aliases::AliasTable;
  use crate::orchestrator::OrchestratorSettings;
  use crate::platform::{Platform, PlatformProfile};
  use crate::providers::ChatBackend;

  #[derive(Default)]
  struct MemoryStore {
    leads: Mutex<Vec<LeadSubmission>>,
    runs: Mutex<Vec<(u64, u32)>>,
    fail: bool,
  }

  #[async_trait]
  impl LeadStore for MemoryStore {
    async fn save_lead(&self, lead: &LeadSubmission) -> Result<u64, VisibilityError> {
      if self.fail {
        return Err(VisibilityError::Config("database offline".to_string()));
      }
      let mut leads = self.leads.lock().unwrap();
      leads.push(lead.clone());
      Ok(leads.len() as u64)
    }

    async fn save_analysis(&self, lead_id: u64, analysis: &AnalysisResult) -> Result<u64, VisibilityError> {
      let mut runs = self.runs.lock().unwrap();
      runs.push((lead_id, analysis.summary.overall_score));
      Ok(runs.len() as u64)
    }
  }

  struct FailingNotifier;

  #[async_trait]
  impl LeadNotifier for FailingNotifier {
    async fn notify(&self, _lead: &LeadSubmission, _lead_id: Option<u64>) -> Result<(), VisibilityError> {
      Err(VisibilityError::Config("smtp unreachable".to_string()))
    }
  }

  fn lead(keywords: &[&str]) -> LeadSubmission {
    serde_json::from_value(serde_json::json!({
      "name": " Ada ",
      "email": "ada@acme.com",
      "website": "acme.com",
      "keywords": keywords,
    }))
    .unwrap()
  }

  fn orchestrator(reply: &str) -> (VisibilityOrchestrator, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new(Platform::Claude, vec![Ok(reply)]));
    let dyn_backend: Arc<dyn ChatBackend> = backend.clone();
    let adapter = PlatformAdapter::new(
      PlatformProfile::for_platform(Platform::Claude).with_attempt_delay(Duration::ZERO),
      Some(dyn_backend),
    );
    let settings = OrchestratorSettings {
      platform_timeout: Duration::from_secs(5),
      day_delay: Duration::ZERO,
      competitor_smoothing: false,
      competitor_seed: None,
    };
    (
      VisibilityOrchestrator::new(vec![adapter], settings, AliasTable::new()),
      backend,
    )
  }

  #[test]
  fn validation_rejects_missing_fields() {
    let mut bad_email = lead(&[]);
    bad_email.email = "ada@".to_string();
    assert!(bad_email.validated().is_err());

    let mut no_name = lead(&[]);
    no_name.name = "   ".to_string();
    assert!(no_name.validated().is_err());

    let mut no_site = lead(&[]);
    no_site.website = String::new();
    assert!(no_site.validated().is_err());

    let ok = lead(&["seo", " "]).validated().unwrap();
    assert_eq!(ok.name, "Ada");
    assert_eq!(ok.keywords, vec!["seo".to_string()]);
    assert_eq!(ok.days, 7);
  }

  #[tokio::test]
  async fn lead_with_keywords_is_stored_and_analysed() {
    let store = MemoryStore::default();
    let (orchestrator, _) = orchestrator("1. acme.com");

    let outcome = process_lead(lead(&["seo"]), Some(&store), &TracingLeadNotifier, &orchestrator)
      .await
      .unwrap();

    assert_eq!(outcome.lead_id, Some(1));
    assert!(outcome.persisted);
    let analysis = outcome.analysis.unwrap();
    assert_eq!(analysis.summary.total_mentions, 1);
    assert_eq!(*store.runs.lock().unwrap(), vec![(1, analysis.summary.overall_score)]);
  }

  #[tokio::test]
  async fn lead_without_keywords_skips_analysis() {
    let store = MemoryStore::default();
    let (orchestrator, backend) = orchestrator("1. acme.com");

    let outcome = process_lead(lead(&[]), Some(&store), &TracingLeadNotifier, &orchestrator)
      .await
      .unwrap();

    assert!(outcome.analysis.is_none());
    assert_eq!(backend.prompt_count(), 0);
    assert_eq!(store.leads.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn storage_and_notifier_failures_do_not_fail_intake() {
    let store = MemoryStore {
      fail: true,
      ..MemoryStore::default()
    };
    let (orchestrator, _) = orchestrator("no brands here");

    let outcome = process_lead(lead(&["seo"]), Some(&store), &FailingNotifier, &orchestrator)
      .await
      .unwrap();

    assert_eq!(outcome.lead_id, None);
    assert!(!outcome.persisted);
    assert!(outcome.analysis.is_some());
    assert!(store.runs.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn invalid_lead_fails_before_any_side_effect() {
    let store = MemoryStore::default();
    let (orchestrator, backend) = orchestrator("1. acme.com");
    let mut bad = lead(&["seo"]);
    bad.email = "nobody".to_string();

    let err = process_lead(bad, Some(&store), &TracingLeadNotifier, &orchestrator)
      .await
      .unwrap_err();

    assert!(matches!(err, VisibilityError::InvalidRequest(_)));
    assert!(store.leads.lock().unwrap().is_empty());
    assert_eq!(backend.prompt_count(), 0);
  }
}
