use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::adapter::PlatformAdapter;
use crate::aliases::AliasTable;
use crate::analyzer::TargetIdentity;
use crate::config::{VisibilityConfig, DEFAULT_DAY_DELAY, DEFAULT_PLATFORM_TIMEOUT};
use crate::error::VisibilityError;
use crate::platform::{Platform, PlatformProfile};
use crate::providers::backend_for;
use crate::scoring::{historical_stats, summarize_history, summarize_platforms};
use crate::types::{
  AnalysisMode, AnalysisResult, HistoricalDayResult, HistoricalPlatformResult, PlatformResult,
  VisibilityRequest,
};

/// Phrasings cycled over simulated days in historical mode.
pub const HISTORICAL_VARIANTS: [&str; 7] = [
  "{keyword}",
  "best {keyword}",
  "top {keyword} companies",
  "recommended {keyword} providers",
  "{keyword} services",
  "affordable {keyword}",
  "{keyword} experts",
];

pub fn historical_variant(day_offset: u32, keyword: &str) -> String {
  let template = HISTORICAL_VARIANTS[day_offset as usize % HISTORICAL_VARIANTS.len()];
  template.replace("{keyword}", keyword)
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
  pub platform_timeout: Duration,
  pub day_delay: Duration,
  pub competitor_smoothing: bool,
  /// Fixed seed for the competitor smoothing term; `None` seeds from entropy.
  pub competitor_seed: Option<u64>,
}

impl Default for OrchestratorSettings {
  fn default() -> Self {
    Self {
      platform_timeout: DEFAULT_PLATFORM_TIMEOUT,
      day_delay: DEFAULT_DAY_DELAY,
      competitor_smoothing: true,
      competitor_seed: None,
    }
  }
}

/// Fans a request out over every platform adapter and folds the results into one report.
pub struct VisibilityOrchestrator {
  adapters: Vec<PlatformAdapter>,
  settings: OrchestratorSettings,
  aliases: AliasTable,
}

impl VisibilityOrchestrator {
  pub fn new(adapters: Vec<PlatformAdapter>, settings: OrchestratorSettings, aliases: AliasTable) -> Self {
    Self {
      adapters,
      settings,
      aliases,
    }
  }

  /// One adapter per known platform; platforms without credentials stay in the
  /// set and report a configuration error.
  pub fn from_config(cfg: &VisibilityConfig) -> Self {
    let adapters = Platform::ALL
      .into_iter()
      .map(|platform| {
        let mut profile = PlatformProfile::for_platform(platform);
        if let Some(delay) = cfg.attempt_delay_override {
          profile = profile.with_attempt_delay(delay);
        }
        PlatformAdapter::new(profile, backend_for(platform, cfg.provider(platform)))
      })
      .collect();

    let settings = OrchestratorSettings {
      platform_timeout: cfg.platform_timeout,
      day_delay: cfg.historical_day_delay,
      competitor_smoothing: cfg.competitor_smoothing,
      competitor_seed: None,
    };
    Self::new(adapters, settings, cfg.aliases.clone())
  }

  pub fn adapters(&self) -> &[PlatformAdapter] {
    &self.adapters
  }

  fn rng(&self) -> StdRng {
    match self.settings.competitor_seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    }
  }

  /// Runs the visibility probe. Only an invalid request is an error; every
  /// platform failure is recorded inside the returned result.
  pub async fn analyze_visibility(&self, request: VisibilityRequest) -> Result<AnalysisResult, VisibilityError> {
    let request = request.validated()?;
    let target = TargetIdentity::new(
      &request.website,
      request.company.as_deref(),
      &request.competitors,
      &self.aliases,
    );

    info!(
      domain = %target.domain,
      keywords = request.keywords.len(),
      historical = request.historical,
      days = request.days,
      "visibility analysis started"
    );

    let (mode, summary) = if request.historical {
      let platforms = self.run_history(&target, &request.keywords, request.days).await;
      let summary = summarize_history(
        platforms.values(),
        &target.competitor_domains,
        self.settings.competitor_smoothing,
        &mut self.rng(),
      );
      (
        AnalysisMode::Historical {
          days: request.days,
          platforms,
        },
        summary,
      )
    } else {
      let platforms = self.run_standard(&target, &request.keywords).await;
      let summary = summarize_platforms(
        platforms.values(),
        &target.competitor_domains,
        self.settings.competitor_smoothing,
        &mut self.rng(),
      );
      (AnalysisMode::Standard { platforms }, summary)
    };

    info!(
      overall_score = summary.overall_score,
      total_mentions = summary.total_mentions,
      platform_count = summary.platform_count,
      "visibility analysis complete"
    );

    Ok(AnalysisResult {
      timestamp: Utc::now(),
      website: request.website,
      company: request.company,
      competitors: request.competitors,
      keywords: request.keywords,
      mode,
      summary,
    })
  }

  async fn run_standard(&self, target: &TargetIdentity, keywords: &[String]) -> BTreeMap<Platform, PlatformResult> {
    let timeout = self.settings.platform_timeout;
    let runs = self.adapters.iter().map(|adapter| async move {
      let platform = adapter.platform();
      match tokio::time::timeout(timeout, adapter.run(target, keywords)).await {
        Ok(result) => result,
        Err(_) => {
          warn!(platform = %platform, timeout_ms = timeout.as_millis() as u64, "platform timed out");
          PlatformResult::failed(
            platform,
            &VisibilityError::Timeout {
              platform,
              duration: timeout,
            },
          )
        }
      }
    });

    join_all(runs)
      .await
      .into_iter()
      .map(|r| (r.platform, r))
      .collect()
  }

  async fn run_history(
    &self,
    target: &TargetIdentity,
    keywords: &[String],
    days: u32,
  ) -> BTreeMap<Platform, HistoricalPlatformResult> {
    let runs = self
      .adapters
      .iter()
      .map(|adapter| self.run_platform_history(adapter, target, keywords, days));

    join_all(runs)
      .await
      .into_iter()
      .map(|r| (r.platform, r))
      .collect()
  }

  /// Re-queries one platform once per simulated day.
  ///
  /// The dates are labels only: every query runs live now, with the phrasing
  /// rotated per day. There is no per-call deadline in this mode.
  async fn run_platform_history(
    &self,
    adapter: &PlatformAdapter,
    target: &TargetIdentity,
    keywords: &[String],
    days: u32,
  ) -> HistoricalPlatformResult {
    let platform = adapter.platform();
    if !adapter.is_configured() {
      let err = VisibilityError::MissingCredential {
        platform,
        env_var: platform.credential_env_var(),
      };
      warn!(platform = %platform, error = %err, "platform skipped");
      return HistoricalPlatformResult {
        platform,
        days: Vec::new(),
        stats: historical_stats(&[]),
        error: Some(err.to_string()),
      };
    }

    let today = Utc::now().date_naive();
    let mut results: Vec<HistoricalDayResult> = Vec::with_capacity(days as usize);
    let mut last_error: Option<String> = None;

    for day_offset in 0..days {
      if day_offset > 0 && !self.settings.day_delay.is_zero() {
        tokio::time::sleep(self.settings.day_delay).await;
      }

      let keyword = &keywords[day_offset as usize % keywords.len()];
      let keyword_variant = historical_variant(day_offset, keyword);
      let date = today - chrono::Duration::days(i64::from(day_offset));

      let day = match adapter.query_keyword(target, &keyword_variant).await {
        Ok(analysis) => HistoricalDayResult {
          date,
          day_offset,
          keyword_variant,
          analysis: Some(analysis),
          error: None,
          success: true,
        },
        Err(err) => {
          warn!(platform = %platform, day_offset, error = %err, "historical query failed");
          let error = err.to_string();
          last_error = Some(error.clone());
          HistoricalDayResult {
            date,
            day_offset,
            keyword_variant,
            analysis: None,
            error: Some(error),
            success: false,
          }
        }
      };
      results.push(day);
    }

    let stats = historical_stats(&results);
    let error = if stats.successful_queries == 0 {
      last_error.map(|e| format!("all historical queries failed: {e}"))
    } else {
      None
    };

    info!(
      platform = %platform,
      mentions = stats.mentions,
      total_queries = stats.total_queries,
      score = stats.score,
      "historical analysis complete"
    );

    HistoricalPlatformResult {
      platform,
      days: results,
      stats,
      error,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::adapter::test_support::ScriptedBackend;
  use crate::providers::ChatBackend;
  use crate::types::KeywordOutcome;

  fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
      platform_timeout: Duration::from_secs(5),
      day_delay: Duration::ZERO,
      competitor_smoothing: false,
      competitor_seed: Some(11),
    }
  }

  fn scripted(platform: Platform, backend: Arc<ScriptedBackend>) -> PlatformAdapter {
    let backend: Arc<dyn ChatBackend> = backend;
    PlatformAdapter::new(
      PlatformProfile::for_platform(platform).with_attempt_delay(Duration::ZERO),
      Some(backend),
    )
  }

  fn unconfigured(platform: Platform) -> PlatformAdapter {
    PlatformAdapter::new(PlatformProfile::for_platform(platform), None)
  }

  fn request(keywords: &[&str]) -> VisibilityRequest {
    let mut req = VisibilityRequest::new("https://www.acme.com", keywords);
    req.company = Some("Acme Corp".to_string());
    req.competitors = vec!["rival.io".to_string()];
    req
  }

  #[tokio::test]
  async fn standard_run_isolates_platform_failures() {
    let chatgpt = Arc::new(ScriptedBackend::new(
      Platform::ChatGpt,
      vec![Ok("1. Rival (rival.io)\n2. Acme Corp (acme.com)")],
    ));
    let orchestrator = VisibilityOrchestrator::new(
      vec![scripted(Platform::ChatGpt, chatgpt), unconfigured(Platform::Claude)],
      settings(),
      AliasTable::new(),
    );

    let result = orchestrator.analyze_visibility(request(&["seo agency"])).await.unwrap();

    let chatgpt = result.platform(Platform::ChatGpt).unwrap();
    assert_eq!(chatgpt.mentions, 1);
    assert_eq!(chatgpt.ranking, Some(2));
    assert_eq!(chatgpt.score, 92);

    let claude = result.platform(Platform::Claude).unwrap();
    assert!(claude.error.as_deref().unwrap().contains("ANTHROPIC_API_KEY"));

    assert_eq!(result.summary.overall_score, 92);
    assert_eq!(result.summary.platform_count, 1);
    assert_eq!(result.summary.competitors[0].domain, "rival.io");
    assert_eq!(result.summary.competitors[0].mentions, 1);
    assert_eq!(result.summary.competitors[0].estimated_score, 60);
  }

  #[tokio::test]
  async fn slow_platform_times_out_without_blocking_others() {
    let slow = Arc::new(
      ScriptedBackend::new(Platform::Gemini, vec![Ok("acme.com")]).with_delay(Duration::from_secs(10)),
    );
    let fast = Arc::new(ScriptedBackend::new(Platform::Perplexity, vec![Ok("| 1 | acme.com |")]));
    let mut s = settings();
    s.platform_timeout = Duration::from_millis(100);
    let orchestrator = VisibilityOrchestrator::new(
      vec![scripted(Platform::Gemini, slow), scripted(Platform::Perplexity, fast)],
      s,
      AliasTable::new(),
    );

    let result = orchestrator.analyze_visibility(request(&["seo"])).await.unwrap();
    let gemini = result.platform(Platform::Gemini).unwrap();
    assert!(gemini.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(gemini.score, 0);
    assert_eq!(result.platform(Platform::Perplexity).unwrap().ranking, Some(1));
    assert_eq!(result.summary.platform_count, 1);
  }

  #[tokio::test]
  async fn all_platforms_failing_still_returns_zero_summary() {
    let orchestrator = VisibilityOrchestrator::new(
      vec![unconfigured(Platform::ChatGpt), unconfigured(Platform::Gemini)],
      settings(),
      AliasTable::new(),
    );
    let result = orchestrator.analyze_visibility(request(&["seo"])).await.unwrap();
    assert_eq!(result.summary.overall_score, 0);
    assert_eq!(result.summary.total_mentions, 0);
    assert_eq!(result.summary.average_ranking, None);
    assert_eq!(result.summary.platform_count, 0);
  }

  #[tokio::test]
  async fn invalid_request_is_rejected() {
    let orchestrator = VisibilityOrchestrator::new(Vec::new(), settings(), AliasTable::new());
    let err = orchestrator.analyze_visibility(request(&[])).await.unwrap_err();
    assert!(matches!(err, VisibilityError::InvalidRequest(_)));
  }

  #[tokio::test]
  async fn historical_run_rotates_variants_and_aggregates() {
    let gemini = Arc::new(ScriptedBackend::new(
      Platform::Gemini,
      vec![
        Ok("1. acme.com"),
        Err(500),
        Err(500),
        Ok("nothing here"),
        Ok("| 3 | acme.com |"),
      ],
    ));
    let orchestrator = VisibilityOrchestrator::new(
      vec![scripted(Platform::Gemini, gemini.clone()), unconfigured(Platform::Claude)],
      settings(),
      AliasTable::new(),
    );

    let mut req = request(&["seo"]);
    req.historical = true;
    req.days = 3;
    let result = orchestrator.analyze_visibility(req).await.unwrap();

    let history = result.historical_platform(Platform::Gemini).unwrap();
    assert_eq!(history.days.len(), 3);
    assert_eq!(history.days[0].keyword_variant, "seo");
    assert_eq!(history.days[1].keyword_variant, "best seo");
    assert!(!history.days[1].success);
    assert_eq!(history.days[0].date - history.days[2].date, chrono::Duration::days(2));
    assert_eq!(history.stats.successful_queries, 2);
    assert_eq!(history.stats.mentions, 2);
    assert_eq!(history.stats.best_position, Some(1));
    assert_eq!(history.stats.average_position, Some(2.0));
    assert_eq!(history.stats.score, 73);
    assert!(gemini.prompts.lock().unwrap()[3].contains("top seo companies"));

    let claude = result.historical_platform(Platform::Claude).unwrap();
    assert!(claude.error.is_some());
    assert!(claude.days.is_empty());

    assert_eq!(result.summary.overall_score, 73);
    assert_eq!(result.summary.platform_count, 1);
  }

  #[tokio::test(start_paused = true)]
  async fn historical_days_are_spaced_by_the_day_delay() {
    let gemini = Arc::new(ScriptedBackend::new(
      Platform::Gemini,
      vec![Ok("1. acme.com"), Ok("1. acme.com"), Ok("1. acme.com")],
    ));
    let mut s = settings();
    s.day_delay = DEFAULT_DAY_DELAY;
    let orchestrator = VisibilityOrchestrator::new(vec![scripted(Platform::Gemini, gemini)], s, AliasTable::new());

    let mut req = request(&["seo"]);
    req.historical = true;
    req.days = 3;

    let started = tokio::time::Instant::now();
    let result = orchestrator.analyze_visibility(req).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.historical_platform(Platform::Gemini).unwrap().stats.mentions, 3);
    // Two gaps of 2 s between three days; none before the first or after the last.
    assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(4500), "elapsed {elapsed:?}");
  }

  #[test]
  fn historical_variants_cycle_after_a_week() {
    assert_eq!(historical_variant(0, "seo"), historical_variant(7, "seo"));
    assert_eq!(historical_variant(8, "seo"), "best seo");
  }

  #[test]
  fn from_config_registers_every_platform() {
    let mut cfg = VisibilityConfig::default();
    cfg.gemini = cfg.gemini.clone().with_api_key("g");
    cfg.attempt_delay_override = Some(Duration::ZERO);
    let orchestrator = VisibilityOrchestrator::from_config(&cfg);
    let configured: Vec<Platform> = orchestrator
      .adapters()
      .iter()
      .filter(|a| a.is_configured())
      .map(|a| a.platform())
      .collect();
    assert_eq!(orchestrator.adapters().len(), 4);
    assert_eq!(configured, vec![Platform::Gemini]);
    assert!(orchestrator.adapters().iter().all(|a| a.profile().attempt_delay.is_zero()));
  }

  #[tokio::test]
  async fn end_to_end_against_mocked_platform_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content":
          "| Rank | Company | Website |\n|---|---|---|\n| 1 | Foo Digital | foo.com |\n| 2 | Acme | acme.com |\n"
        }}]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let mut cfg = VisibilityConfig::default();
    cfg.perplexity = cfg
      .perplexity
      .clone()
      .with_api_key("pplx-test")
      .with_base_url(&server.uri());
    cfg.attempt_delay_override = Some(Duration::ZERO);
    cfg.competitor_smoothing = false;

    let orchestrator = VisibilityOrchestrator::from_config(&cfg);
    let result = orchestrator
      .analyze_visibility(VisibilityRequest::new("acme.com", &["crm software"]))
      .await
      .unwrap();

    let perplexity = result.platform(Platform::Perplexity).unwrap();
    assert_eq!(perplexity.mentions, 1);
    assert_eq!(perplexity.ranking, Some(2));
    assert!(matches!(
      perplexity.keywords["crm software"],
      KeywordOutcome::Analyzed(_)
    ));
    assert!(result.summary.overall_score > 0);
    assert_eq!(result.summary.platform_count, 1);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["mode"], "standard");
    assert_eq!(json["platforms"]["perplexity"]["ranking"], 2);
    assert!(json["platforms"]["chatgpt"]["error"].is_string());
  }
}
