use std::time::Duration;

use crate::aliases::AliasTable;
use crate::error::VisibilityError;
use crate::platform::Platform;

pub const DEFAULT_PLATFORM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DAY_DELAY: Duration = Duration::from_secs(2);

/// Credentials and endpoint for one chat API. `api_key` is `None` when unset.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
  pub api_key: Option<String>,
  pub model: String,
  pub api_base_url: String,
}

impl ProviderConfig {
  pub fn unconfigured(model: &str, api_base_url: &str) -> Self {
    Self {
      api_key: None,
      model: model.to_string(),
      api_base_url: api_base_url.to_string(),
    }
  }

  pub fn with_api_key(mut self, api_key: &str) -> Self {
    self.api_key = Some(api_key.to_string());
    self
  }

  pub fn with_base_url(mut self, api_base_url: &str) -> Self {
    self.api_base_url = api_base_url.to_string();
    self
  }

  fn from_env(key_var: &str, model_var: &str, default_model: &str, base_var: &str, default_base: &str) -> Self {
    Self {
      api_key: env_trimmed(key_var),
      model: env_trimmed(model_var).unwrap_or_else(|| default_model.to_string()),
      api_base_url: env_trimmed(base_var).unwrap_or_else(|| default_base.to_string()),
    }
  }

  pub fn is_configured(&self) -> bool {
    self.api_key.is_some()
  }
}

fn defaults_for(platform: Platform) -> (&'static str, &'static str) {
  match platform {
    Platform::ChatGpt => ("gpt-4o-mini", "https://api.openai.com/v1"),
    Platform::Claude => ("claude-3-5-haiku-latest", "https://api.anthropic.com"),
    Platform::Gemini => ("gemini-1.5-flash", "https://generativelanguage.googleapis.com/v1"),
    Platform::Perplexity => ("sonar", "https://api.perplexity.ai"),
  }
}

/// Process configuration, read once and then shared read-only.
#[derive(Debug, Clone)]
pub struct VisibilityConfig {
  pub chatgpt: ProviderConfig,
  pub claude: ProviderConfig,
  pub gemini: ProviderConfig,
  pub perplexity: ProviderConfig,
  pub platform_timeout: Duration,
  /// Replaces every platform's own inter-attempt delay when set.
  pub attempt_delay_override: Option<Duration>,
  pub historical_day_delay: Duration,
  pub aliases: AliasTable,
  pub competitor_smoothing: bool,
}

impl Default for VisibilityConfig {
  fn default() -> Self {
    let provider = |p: Platform| {
      let (model, base) = defaults_for(p);
      ProviderConfig::unconfigured(model, base)
    };
    Self {
      chatgpt: provider(Platform::ChatGpt),
      claude: provider(Platform::Claude),
      gemini: provider(Platform::Gemini),
      perplexity: provider(Platform::Perplexity),
      platform_timeout: DEFAULT_PLATFORM_TIMEOUT,
      attempt_delay_override: None,
      historical_day_delay: DEFAULT_DAY_DELAY,
      aliases: AliasTable::new(),
      competitor_smoothing: true,
    }
  }
}

fn env_trimmed(name: &str) -> Option<String> {
  std::env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

fn env_millis(name: &str) -> Result<Option<Duration>, VisibilityError> {
  match env_trimmed(name) {
    None => Ok(None),
    Some(raw) => raw
      .parse::<u64>()
      .map(|ms| Some(Duration::from_millis(ms)))
      .map_err(|_| VisibilityError::Config(format!("{name} must be a whole number of milliseconds"))),
  }
}

fn env_flag(name: &str, default: bool) -> bool {
  match env_trimmed(name) {
    Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("no")),
    None => default,
  }
}

pub fn has_database_url() -> bool {
  database_url().is_some()
}

pub fn database_url() -> Option<String> {
  env_trimmed("TIDB_DATABASE_URL").or_else(|| env_trimmed("DATABASE_URL"))
}

impl VisibilityConfig {
  pub fn from_env() -> Result<Self, VisibilityError> {
    let provider = |p: Platform, prefix: &str| {
      let (model, base) = defaults_for(p);
      ProviderConfig::from_env(
        p.credential_env_var(),
        &format!("{prefix}_MODEL"),
        model,
        &format!("{prefix}_API_BASE_URL"),
        base,
      )
    };

    Ok(Self {
      chatgpt: provider(Platform::ChatGpt, "OPENAI"),
      claude: provider(Platform::Claude, "ANTHROPIC"),
      gemini: provider(Platform::Gemini, "GEMINI"),
      perplexity: provider(Platform::Perplexity, "PERPLEXITY"),
      platform_timeout: env_millis("VISIBILITY_PLATFORM_TIMEOUT_MS")?.unwrap_or(DEFAULT_PLATFORM_TIMEOUT),
      attempt_delay_override: env_millis("VISIBILITY_ATTEMPT_DELAY_MS")?,
      historical_day_delay: env_millis("VISIBILITY_DAY_DELAY_MS")?.unwrap_or(DEFAULT_DAY_DELAY),
      aliases: AliasTable::from_json(env_trimmed("VISIBILITY_BRAND_ALIASES").as_deref())?,
      competitor_smoothing: env_flag("VISIBILITY_COMPETITOR_SMOOTHING", true),
    })
  }

  pub fn provider(&self, platform: Platform) -> &ProviderConfig {
    match platform {
      Platform::ChatGpt => &self.chatgpt,
      Platform::Claude => &self.claude,
      Platform::Gemini => &self.gemini,
      Platform::Perplexity => &self.perplexity,
    }
  }

  pub fn provider_mut(&mut self, platform: Platform) -> &mut ProviderConfig {
    match platform {
      Platform::ChatGpt => &mut self.chatgpt,
      Platform::Claude => &mut self.claude,
      Platform::Gemini => &mut self.gemini,
      Platform::Perplexity => &mut self.perplexity,
    }
  }

  pub fn configured_platforms(&self) -> Vec<Platform> {
    Platform::ALL
      .into_iter()
      .filter(|p| self.provider(*p).is_configured())
      .collect()
  }
}
