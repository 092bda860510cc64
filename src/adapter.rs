use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::analyzer::{analyze_response, MentionAnalysis, TargetIdentity};
use crate::error::VisibilityError;
use crate::platform::{render_prompt, Platform, PlatformProfile, TieBreak};
use crate::providers::ChatBackend;
use crate::scoring::platform_score;
use crate::types::{KeywordOutcome, PlatformResult, PromptAttempt};

/// One platform's prompt variants bound to its chat backend.
///
/// `backend` is `None` when the platform's credential is missing; every query
/// then fails with `MissingCredential` without touching the network.
#[derive(Clone)]
pub struct PlatformAdapter {
  profile: PlatformProfile,
  backend: Option<Arc<dyn ChatBackend>>,
}

impl TieBreak {
  /// Whether `candidate` should replace `incumbent` as the kept attempt.
  pub fn prefers(self, candidate: &MentionAnalysis, incumbent: &MentionAnalysis) -> bool {
    match self {
      TieBreak::Confidence => candidate.confidence > incumbent.confidence,
      TieBreak::ResponseLength => candidate.response_length > incumbent.response_length,
    }
  }
}

impl PlatformAdapter {
  pub fn new(profile: PlatformProfile, backend: Option<Arc<dyn ChatBackend>>) -> Self {
    Self { profile, backend }
  }

  pub fn platform(&self) -> Platform {
    self.profile.platform
  }

  pub fn profile(&self) -> &PlatformProfile {
    &self.profile
  }

  pub fn is_configured(&self) -> bool {
    self.backend.is_some()
  }

  fn backend(&self) -> Result<&Arc<dyn ChatBackend>, VisibilityError> {
    self.backend.as_ref().ok_or(VisibilityError::MissingCredential {
      platform: self.platform(),
      env_var: self.platform().credential_env_var(),
    })
  }

  async fn attempt(&self, backend: &dyn ChatBackend, keyword: &str, prompt: String, attempt: usize) -> PromptAttempt {
    let response = backend.complete(&prompt).await;
    PromptAttempt {
      platform: self.platform(),
      keyword: keyword.to_string(),
      prompt,
      attempt,
      response,
    }
  }

  /// Runs prompt variants for one keyword until one mentions the target.
  ///
  /// Without a mention the attempt preferred by the platform's tie-break is kept.
  /// Fails only when no attempt produced an answer at all.
  pub async fn query_keyword(
    &self,
    target: &TargetIdentity,
    keyword: &str,
  ) -> Result<MentionAnalysis, VisibilityError> {
    let backend = self.backend()?;
    let platform = self.platform();

    let mut best: Option<MentionAnalysis> = None;
    let mut last_error: Option<VisibilityError> = None;

    for (idx, template) in self.profile.attempt_templates().enumerate() {
      if idx > 0 && !self.profile.attempt_delay.is_zero() {
        tokio::time::sleep(self.profile.attempt_delay).await;
      }

      let prompt = render_prompt(template, keyword, &target.company, &target.domain);
      let attempt = self.attempt(backend.as_ref(), keyword, prompt, idx + 1).await;

      let text = match attempt.response {
        Ok(text) => text,
        Err(err) if err.is_retryable() => {
          warn!(
            platform = %platform,
            keyword = %attempt.keyword,
            attempt = attempt.attempt,
            error = %err,
            "prompt attempt failed"
          );
          last_error = Some(err);
          continue;
        }
        Err(err) => return Err(err),
      };

      let analysis = analyze_response(&text, target);
      debug!(
        platform = %platform,
        keyword = %attempt.keyword,
        attempt = attempt.attempt,
        mentioned = analysis.mentioned,
        position = ?analysis.position,
        response_length = analysis.response_length,
        "prompt attempt analysed"
      );

      if analysis.mentioned {
        return Ok(analysis);
      }

      let replace = match &best {
        Some(incumbent) => self.profile.tie_break.prefers(&analysis, incumbent),
        None => true,
      };
      if replace {
        best = Some(analysis);
      }
    }

    match (best, last_error) {
      (Some(analysis), _) => Ok(analysis),
      (None, Some(err)) => Err(err),
      (None, None) => Err(VisibilityError::malformed(platform, "no prompt templates configured")),
    }
  }

  /// Queries every keyword in order and scores the platform.
  ///
  /// Adapter-level failures (missing credential, every keyword failing) come
  /// back as a zero-score result carrying the error.
  pub async fn run(&self, target: &TargetIdentity, keywords: &[String]) -> PlatformResult {
    let platform = self.platform();
    if let Err(err) = self.backend() {
      warn!(platform = %platform, error = %err, "platform skipped");
      return PlatformResult::failed(platform, &err);
    }

    let mut outcomes: BTreeMap<String, KeywordOutcome> = BTreeMap::new();
    let mut mentions: u32 = 0;
    let mut ranking: Option<u32> = None;
    let mut last_error: Option<String> = None;

    for keyword in keywords {
      if outcomes.contains_key(keyword) {
        continue;
      }
      let outcome = match self.query_keyword(target, keyword).await {
        Ok(analysis) => {
          if analysis.mentioned {
            mentions += 1;
            if let Some(pos) = analysis.position {
              ranking = Some(ranking.map_or(pos, |r| r.min(pos)));
            }
          }
          KeywordOutcome::Analyzed(analysis)
        }
        Err(err) => {
          let error = err.to_string();
          last_error = Some(error.clone());
          KeywordOutcome::Failed { error }
        }
      };
      outcomes.insert(keyword.clone(), outcome);
    }

    let any_analyzed = outcomes.values().any(|o| o.analysis().is_some());
    let error = match (any_analyzed, last_error) {
      (false, Some(err)) => Some(format!("all keyword queries failed: {err}")),
      _ => None,
    };
    let score = if error.is_some() {
      0
    } else {
      platform_score(mentions, outcomes.len(), ranking)
    };

    info!(
      platform = %platform,
      mentions,
      ranking = ?ranking,
      score,
      failed = error.is_some(),
      "platform analysis complete"
    );

    PlatformResult {
      platform,
      mentions,
      ranking,
      score,
      keywords: outcomes,
      error,
    }
  }
}
