use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::MentionAnalysis;
use crate::error::VisibilityError;
use crate::platform::Platform;

pub const MIN_HISTORY_DAYS: u32 = 1;
pub const MAX_HISTORY_DAYS: u32 = 30;
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

pub(crate) fn default_days() -> u32 {
  DEFAULT_HISTORY_DAYS
}

/// Trimmed, non-blank values in first-seen order, each once.
fn trimmed_unique(values: &[String]) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(values.len());
  for value in values {
    let value = value.trim();
    if !value.is_empty() && !out.iter().any(|seen| seen == value) {
      out.push(value.to_string());
    }
  }
  out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRequest {
  pub website: String,
  #[serde(default)]
  pub company: Option<String>,
  #[serde(default)]
  pub competitors: Vec<String>,
  pub keywords: Vec<String>,
  #[serde(default)]
  pub historical: bool,
  #[serde(default = "default_days")]
  pub days: u32,
}

impl VisibilityRequest {
  pub fn new(website: &str, keywords: &[&str]) -> Self {
    Self {
      website: website.to_string(),
      company: None,
      competitors: Vec::new(),
      keywords: keywords.iter().map(|k| k.to_string()).collect(),
      historical: false,
      days: default_days(),
    }
  }

  /// Trims keywords and competitors, dropping blanks and repeats, then checks invariants.
  pub fn validated(mut self) -> Result<Self, VisibilityError> {
    self.website = self.website.trim().to_string();
    if self.website.is_empty() {
      return Err(VisibilityError::InvalidRequest("website is required".to_string()));
    }
    self.company = self
      .company
      .map(|c| c.trim().to_string())
      .filter(|c| !c.is_empty());
    self.keywords = trimmed_unique(&self.keywords);
    if self.keywords.is_empty() {
      return Err(VisibilityError::InvalidRequest(
        "at least one keyword is required".to_string(),
      ));
    }
    self.competitors = trimmed_unique(&self.competitors);
    if self.historical && !(MIN_HISTORY_DAYS..=MAX_HISTORY_DAYS).contains(&self.days) {
      return Err(VisibilityError::InvalidRequest(format!(
        "days must be between {MIN_HISTORY_DAYS} and {MAX_HISTORY_DAYS}"
      )));
    }
    Ok(self)
  }
}

/// One prompt sent to one platform. Only lives for the duration of the attempt.
#[derive(Debug)]
pub struct PromptAttempt {
  pub platform: Platform,
  pub keyword: String,
  pub prompt: String,
  pub attempt: usize,
  pub response: Result<String, VisibilityError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum KeywordOutcome {
  Analyzed(MentionAnalysis),
  Failed { error: String },
}

impl KeywordOutcome {
  pub fn analysis(&self) -> Option<&MentionAnalysis> {
    match self {
      KeywordOutcome::Analyzed(a) => Some(a),
      KeywordOutcome::Failed { .. } => None,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformResult {
  pub platform: Platform,
  pub mentions: u32,
  pub ranking: Option<u32>,
  pub score: u32,
  pub keywords: BTreeMap<String, KeywordOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl PlatformResult {
  pub fn failed(platform: Platform, err: &VisibilityError) -> Self {
    Self {
      platform,
      mentions: 0,
      ranking: None,
      score: 0,
      keywords: BTreeMap::new(),
      error: Some(err.to_string()),
    }
  }

  pub fn is_failed(&self) -> bool {
    self.error.is_some()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalDayResult {
  pub date: NaiveDate,
  pub day_offset: u32,
  pub keyword_variant: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub analysis: Option<MentionAnalysis>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalStats {
  pub total_queries: u32,
  pub successful_queries: u32,
  pub mentions: u32,
  pub mention_rate: f64,
  pub average_position: Option<f64>,
  pub best_position: Option<u32>,
  pub score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalPlatformResult {
  pub platform: Platform,
  pub days: Vec<HistoricalDayResult>,
  pub stats: HistoricalStats,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl HistoricalPlatformResult {
  pub fn is_failed(&self) -> bool {
    self.error.is_some() || self.stats.successful_queries == 0
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorEstimate {
  pub domain: String,
  pub mentions: u32,
  pub estimated_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilitySummary {
  pub overall_score: u32,
  pub total_mentions: u32,
  pub average_ranking: Option<f64>,
  pub platform_count: usize,
  pub competitors: Vec<CompetitorEstimate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AnalysisMode {
  Standard {
    platforms: BTreeMap<Platform, PlatformResult>,
  },
  Historical {
    days: u32,
    platforms: BTreeMap<Platform, HistoricalPlatformResult>,
  },
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
  pub timestamp: DateTime<Utc>,
  pub website: String,
  pub company: Option<String>,
  pub competitors: Vec<String>,
  pub keywords: Vec<String>,
  #[serde(flatten)]
  pub mode: AnalysisMode,
  pub summary: VisibilitySummary,
}

impl AnalysisResult {
  pub fn platform(&self, platform: Platform) -> Option<&PlatformResult> {
    match &self.mode {
      AnalysisMode::Standard { platforms } => platforms.get(&platform),
      AnalysisMode::Historical { .. } => None,
    }
  }

  pub fn historical_platform(&self, platform: Platform) -> Option<&HistoricalPlatformResult> {
    match &self.mode {
      AnalysisMode::Historical { platforms, .. } => platforms.get(&platform),
      AnalysisMode::Standard { .. } => None,
    }
  }
}
