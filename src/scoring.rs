use rand::Rng;

use crate::analyzer::MentionAnalysis;
use crate::types::{
  CompetitorEstimate, HistoricalDayResult, HistoricalPlatformResult, HistoricalStats, PlatformResult,
  VisibilitySummary,
};

const MENTION_WEIGHT: f64 = 60.0;
const RANK_WEIGHT: f64 = 40.0;
const HISTORICAL_MENTION_WEIGHT: f64 = 50.0;
const HISTORICAL_POSITION_PENALTY: f64 = 5.0;

/// Share of the competitor estimate that comes from observed mentions.
const COMPETITOR_OBSERVED_WEIGHT: f64 = 60.0;
/// Inclusive range of the random smoothing term added to every competitor estimate.
pub const COMPETITOR_SMOOTHING_RANGE: std::ops::RangeInclusive<u32> = 10..=30;

/// `round(60 * mentions/keywords + 40 * max(0, (6 - ranking) / 5))`; no ranking, no bonus.
pub fn platform_score(mentions: u32, total_keywords: usize, best_ranking: Option<u32>) -> u32 {
  if total_keywords == 0 {
    return 0;
  }
  let mention_part = MENTION_WEIGHT * (mentions as f64 / total_keywords as f64);
  let rank_part = best_ranking
    .map(|r| RANK_WEIGHT * ((6.0 - r as f64) / 5.0).max(0.0))
    .unwrap_or(0.0);
  (mention_part + rank_part).round() as u32
}

/// `round(50 * mentions/queries + max(0, 50 - 5 * avg_position))`.
pub fn historical_score(mentions: u32, total_queries: u32, average_position: Option<f64>) -> u32 {
  if total_queries == 0 {
    return 0;
  }
  let mention_part = HISTORICAL_MENTION_WEIGHT * (mentions as f64 / total_queries as f64);
  let position_part = average_position
    .map(|p| (HISTORICAL_MENTION_WEIGHT - HISTORICAL_POSITION_PENALTY * p).max(0.0))
    .unwrap_or(0.0);
  (mention_part + position_part).round() as u32
}

fn mean(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    None
  } else {
    Some(values.iter().sum::<f64>() / values.len() as f64)
  }
}

pub fn historical_stats(days: &[HistoricalDayResult]) -> HistoricalStats {
  let total_queries = days.len() as u32;
  let analyses: Vec<&MentionAnalysis> = days.iter().filter_map(|d| d.analysis.as_ref()).collect();
  let mentioned: Vec<&MentionAnalysis> = analyses.iter().copied().filter(|a| a.mentioned).collect();
  let positions: Vec<u32> = mentioned.iter().filter_map(|a| a.position).collect();

  let mentions = mentioned.len() as u32;
  let average_position = mean(&positions.iter().map(|p| *p as f64).collect::<Vec<_>>());

  HistoricalStats {
    total_queries,
    successful_queries: analyses.len() as u32,
    mentions,
    mention_rate: if total_queries > 0 {
      mentions as f64 / total_queries as f64
    } else {
      0.0
    },
    average_position,
    best_position: positions.iter().copied().min(),
    score: historical_score(mentions, total_queries, average_position),
  }
}

/// Observed competitor mentions plus a random smoothing term.
///
/// The smoothing term makes this non-deterministic: pass a seeded RNG (or
/// `smoothing = false`) wherever output must be reproducible.
pub fn estimate_competitors<R: Rng>(
  competitor_domains: &[String],
  analyses: &[&MentionAnalysis],
  smoothing: bool,
  rng: &mut R,
) -> Vec<CompetitorEstimate> {
  competitor_domains
    .iter()
    .map(|domain| {
      let mentions = analyses
        .iter()
        .filter(|a| {
          a.competitor_mentions
            .iter()
            .any(|c| &c.domain == domain && c.mentioned)
        })
        .count() as u32;
      let observed = if analyses.is_empty() {
        0.0
      } else {
        COMPETITOR_OBSERVED_WEIGHT * (mentions as f64 / analyses.len() as f64)
      };
      let jitter = if smoothing {
        rng.gen_range(COMPETITOR_SMOOTHING_RANGE) as f64
      } else {
        0.0
      };
      CompetitorEstimate {
        domain: domain.clone(),
        mentions,
        estimated_score: (observed + jitter).round().min(100.0) as u32,
      }
    })
    .collect()
}

/// Summary over standard-mode results. Platforms that failed outright are left out of the averages.
pub fn summarize_platforms<'a, I, R>(
  results: I,
  competitor_domains: &[String],
  smoothing: bool,
  rng: &mut R,
) -> VisibilitySummary
where
  I: IntoIterator<Item = &'a PlatformResult>,
  R: Rng,
{
  let included: Vec<&PlatformResult> = results.into_iter().filter(|r| !r.is_failed()).collect();

  let scores: Vec<f64> = included.iter().map(|r| r.score as f64).collect();
  let rankings: Vec<f64> = included.iter().filter_map(|r| r.ranking).map(|r| r as f64).collect();
  let analyses: Vec<&MentionAnalysis> = included
    .iter()
    .flat_map(|r| r.keywords.values())
    .filter_map(|k| k.analysis())
    .collect();

  VisibilitySummary {
    overall_score: mean(&scores).map(|m| m.round() as u32).unwrap_or(0),
    total_mentions: included.iter().map(|r| r.mentions).sum(),
    average_ranking: mean(&rankings),
    platform_count: included.len(),
    competitors: estimate_competitors(competitor_domains, &analyses, smoothing, rng),
  }
}

/// Summary over historical results, using each platform's historical score.
pub fn summarize_history<'a, I, R>(
  results: I,
  competitor_domains: &[String],
  smoothing: bool,
  rng: &mut R,
) -> VisibilitySummary
where
  I: IntoIterator<Item = &'a HistoricalPlatformResult>,
  R: Rng,
{
  let included: Vec<&HistoricalPlatformResult> = results.into_iter().filter(|r| !r.is_failed()).collect();

  let scores: Vec<f64> = included.iter().map(|r| r.stats.score as f64).collect();
  let positions: Vec<f64> = included.iter().filter_map(|r| r.stats.average_position).collect();
  let analyses: Vec<&MentionAnalysis> = included
    .iter()
    .flat_map(|r| r.days.iter())
    .filter_map(|d| d.analysis.as_ref())
    .collect();

  VisibilitySummary {
    overall_score: mean(&scores).map(|m| m.round() as u32).unwrap_or(0),
    total_mentions: included.iter().map(|r| r.stats.mentions).sum(),
    average_ranking: mean(&positions),
    platform_count: included.len(),
    competitors: estimate_competitors(competitor_domains, &analyses, smoothing, rng),
  }
}
