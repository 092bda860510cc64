use std::fmt;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  ChatGpt,
  Claude,
  Gemini,
  Perplexity,
}

impl Platform {
  pub const ALL: [Platform; 4] = [
    Platform::ChatGpt,
    Platform::Claude,
    Platform::Gemini,
    Platform::Perplexity,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Platform::ChatGpt => "chatgpt",
      Platform::Claude => "claude",
      Platform::Gemini => "gemini",
      Platform::Perplexity => "perplexity",
    }
  }

  pub fn credential_env_var(self) -> &'static str {
    match self {
      Platform::ChatGpt => "OPENAI_API_KEY",
      Platform::Claude => "ANTHROPIC_API_KEY",
      Platform::Gemini => "GEMINI_API_KEY",
      Platform::Perplexity => "PERPLEXITY_API_KEY",
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How the best attempt is chosen when no prompt variant mentions the target.
///
/// ChatGPT and Gemini keep the most confident analysis; Claude and Perplexity
/// keep the longest answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
  Confidence,
  ResponseLength,
}

#[derive(Debug, Clone)]
pub struct PlatformProfile {
  pub platform: Platform,
  pub templates: &'static [&'static str],
  pub max_attempts: usize,
  pub attempt_delay: Duration,
  pub tie_break: TieBreak,
}

const CHATGPT_TEMPLATES: &[&str] = &[
  "What are the best {keyword} companies? Please list the top 10 with their websites.",
  "I'm looking for {keyword}. Which companies or agencies would you recommend? Include their website URLs.",
  "Have you heard of {company} ({website})? How does it compare to other {keyword} providers?",
  "Who are the leading providers of {keyword}? Rank them and explain why.",
];

const CLAUDE_TEMPLATES: &[&str] = &[
  "Can you recommend the top {keyword} companies? Please provide a ranked list with websites.",
  "Which businesses offer the best {keyword}? List your top recommendations.",
  "Is {company} ({website}) a good choice for {keyword}? What alternatives would you suggest?",
  "Create a comparison table of the best {keyword} providers with rank, name and website.",
];

const GEMINI_TEMPLATES: &[&str] = &[
  "List the best {keyword} companies with their websites, ranked from best to worst.",
  "What do you know about {company} ({website}) and other {keyword} providers?",
  "Recommend five {keyword} services and include their websites.",
];

const PERPLEXITY_TEMPLATES: &[&str] = &[
  "What are the top rated {keyword} companies? Include websites and a short reason for each.",
  "Who should I hire for {keyword}? Give me a ranked shortlist.",
  "Compare {company} ({website}) with other {keyword} providers.",
];

impl PlatformProfile {
  pub fn for_platform(platform: Platform) -> Self {
    match platform {
      Platform::ChatGpt => Self {
        platform,
        templates: CHATGPT_TEMPLATES,
        max_attempts: 3,
        attempt_delay: Duration::from_millis(1000),
        tie_break: TieBreak::Confidence,
      },
      Platform::Claude => Self {
        platform,
        templates: CLAUDE_TEMPLATES,
        max_attempts: 3,
        attempt_delay: Duration::from_millis(1000),
        tie_break: TieBreak::ResponseLength,
      },
      Platform::Gemini => Self {
        platform,
        templates: GEMINI_TEMPLATES,
        max_attempts: 2,
        attempt_delay: Duration::from_millis(800),
        tie_break: TieBreak::Confidence,
      },
      Platform::Perplexity => Self {
        platform,
        templates: PERPLEXITY_TEMPLATES,
        max_attempts: 2,
        attempt_delay: Duration::from_millis(800),
        tie_break: TieBreak::ResponseLength,
      },
    }
  }

  pub fn with_attempt_delay(mut self, delay: Duration) -> Self {
    self.attempt_delay = delay;
    self
  }

  /// Templates actually issued, in order.
  pub fn attempt_templates(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.templates.iter().copied().take(self.max_attempts)
  }
}

pub fn render_prompt(template: &str, keyword: &str, company: &str, website: &str) -> String {
  template
    .replace("{keyword}", keyword)
    .replace("{company}", company)
    .replace("{website}", website)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn profiles_respect_attempt_caps() {
    for platform in Platform::ALL {
      let profile = PlatformProfile::for_platform(platform);
      assert!((3..=5).contains(&profile.templates.len()));
      assert!((2..=3).contains(&profile.max_attempts));
      assert_eq!(profile.attempt_templates().count(), profile.max_attempts);
      let delay_ms = profile.attempt_delay.as_millis();
      assert!((800..=1000).contains(&delay_ms));
    }
  }

  #[test]
  fn tie_break_differs_per_platform() {
    assert_eq!(
      PlatformProfile::for_platform(Platform::ChatGpt).tie_break,
      TieBreak::Confidence
    );
    assert_eq!(
      PlatformProfile::for_platform(Platform::Claude).tie_break,
      TieBreak::ResponseLength
    );
  }

  #[test]
  fn render_prompt_fills_placeholders() {
    let out = render_prompt(
      "Is {company} ({website}) good for {keyword}?",
      "local seo",
      "Acme",
      "acme.com",
    );
    assert_eq!(out, "Is Acme (acme.com) good for local seo?");
  }

  #[test]
  fn platform_serializes_lowercase() {
    assert_eq!(
      serde_json::to_string(&Platform::ChatGpt).unwrap(),
      "\"chatgpt\""
    );
  }
}
