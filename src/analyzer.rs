use serde::Serialize;

use crate::aliases::AliasTable;
use crate::domain::{extract_company_name, extract_domain};

/// Position reported when the brand is present but no line structure gives a rank.
pub const UNCLEAR_POSITION: u32 = 5;
/// Bullet-list ranks are capped here.
pub const MAX_LIST_POSITION: u32 = 10;

pub const MENTIONED_CONFIDENCE: f64 = 0.8;
pub const UNMENTIONED_CONFIDENCE: f64 = 0.2;

const MIN_PATTERN_CHARS: usize = 4;

const TABLE_LABELS: &[&str] = &[
  "#", "rank", "ranking", "position", "no", "no.", "company", "name", "website", "brand",
  "provider", "agency",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorMention {
  pub domain: String,
  pub mentioned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MentionAnalysis {
  pub mentioned: bool,
  pub position: Option<u32>,
  pub competitor_mentions: Vec<CompetitorMention>,
  pub response_length: usize,
  pub confidence: f64,
}

/// Who we are looking for, resolved once per request.
#[derive(Debug, Clone)]
pub struct TargetIdentity {
  pub website: String,
  pub domain: String,
  pub company: String,
  pub competitor_domains: Vec<String>,
  patterns: Vec<String>,
}

fn collapse_spaces(value: &str) -> String {
  value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_pattern(out: &mut Vec<String>, candidate: &str) {
  let p = candidate.trim().to_lowercase();
  if p.chars().count() < MIN_PATTERN_CHARS {
    return;
  }
  if out.iter().any(|existing| existing == &p) {
    return;
  }
  out.push(p);
}

fn push_name_forms(out: &mut Vec<String>, name: &str) {
  push_pattern(out, name);
  push_pattern(out, &name.split_whitespace().collect::<String>());
  push_pattern(out, &collapse_spaces(name));
}

impl TargetIdentity {
  pub fn new(
    website: &str,
    company: Option<&str>,
    competitors: &[String],
    aliases: &AliasTable,
  ) -> Self {
    let domain = extract_domain(website);
    let derived = extract_company_name(&domain);
    let company_raw = company.map(str::trim).filter(|c| !c.is_empty());

    let mut patterns = Vec::new();
    push_pattern(&mut patterns, &domain);
    push_pattern(&mut patterns, website);
    if let Some(c) = company_raw {
      push_name_forms(&mut patterns, c);
    }
    push_name_forms(&mut patterns, &derived);

    let company_key = company_raw.map(|c| c.to_lowercase()).unwrap_or_default();
    let derived_key = derived.to_lowercase();
    for alias in aliases.lookup([domain.as_str(), company_key.as_str(), derived_key.as_str()]) {
      push_pattern(&mut patterns, &alias);
    }

    let competitor_domains = competitors
      .iter()
      .map(|c| c.trim())
      .filter(|c| !c.is_empty())
      .map(extract_domain)
      .filter(|d| !d.is_empty())
      .collect();

    Self {
      website: website.trim().to_string(),
      domain,
      company: company_raw.map(str::to_string).unwrap_or(derived),
      competitor_domains,
      patterns,
    }
  }

  /// Lowercase match strings, deduplicated, none shorter than four characters.
  pub fn patterns(&self) -> &[String] {
    &self.patterns
  }
}

pub fn contains_any_case_insensitive(haystack: &str, needles: &[String]) -> bool {
  if haystack.is_empty() || needles.is_empty() {
    return false;
  }

  let hay = haystack.to_lowercase();
  needles.iter().any(|n| {
    let needle = n.trim();
    if needle.is_empty() {
      return false;
    }
    hay.contains(&needle.to_lowercase())
  })
}

/// Decides whether `text` mentions `target` and where. Pure.
pub fn analyze_response(text: &str, target: &TargetIdentity) -> MentionAnalysis {
  let mentioned = contains_any_case_insensitive(text, target.patterns());
  let position = if mentioned {
    Some(estimate_position(text, target.patterns()).unwrap_or(UNCLEAR_POSITION))
  } else {
    None
  };

  let lowered = text.to_lowercase();
  let competitor_mentions = target
    .competitor_domains
    .iter()
    .map(|domain| CompetitorMention {
      domain: domain.clone(),
      mentioned: lowered.contains(domain.as_str()),
    })
    .collect();

  MentionAnalysis {
    mentioned,
    position,
    competitor_mentions,
    response_length: text.chars().count(),
    confidence: if mentioned {
      MENTIONED_CONFIDENCE
    } else {
      UNMENTIONED_CONFIDENCE
    },
  }
}

fn estimate_position(text: &str, patterns: &[String]) -> Option<u32> {
  let lines: Vec<&str> = text.lines().collect();
  let (idx, line) = lines
    .iter()
    .enumerate()
    .find(|(_, l)| contains_any_case_insensitive(l, patterns))?;

  if let Some(n) = leading_numeral(line) {
    return Some(n);
  }
  if let Some(n) = table_row_rank(line) {
    return Some(n);
  }
  if line.contains('|') {
    let rows = count_table_rows(&lines, idx, patterns);
    if rows > 0 {
      return Some(rows);
    }
  }
  if is_bullet_item(line.trim()) {
    let rank = extract_rank_from_markdown_list(&lines[..=idx].join("\n"), patterns)?;
    return Some(rank.min(MAX_LIST_POSITION));
  }
  None
}

/// `3. Foo` / `3) Foo`, tolerating leading markdown emphasis and headings.
fn leading_numeral(line: &str) -> Option<u32> {
  let rest = line.trim_start_matches(|c: char| c.is_whitespace() || c == '#' || c == '*');
  let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
  if digits.is_empty() {
    return None;
  }
  let mut after = rest[digits.len()..].chars();
  match after.next() {
    Some('.') | Some(')') => {}
    _ => return None,
  }
  if after.next().is_some_and(|c| c.is_ascii_digit()) {
    return None;
  }
  digits.parse::<u32>().ok().filter(|n| *n > 0)
}

fn table_cells(line: &str) -> Vec<String> {
  line
    .trim()
    .trim_matches('|')
    .split('|')
    .map(|c| c.trim().trim_matches('*').trim().to_lowercase())
    .collect()
}

/// `| 5 | acme.com | ... |`
fn table_row_rank(line: &str) -> Option<u32> {
  if !line.trim_start().starts_with('|') {
    return None;
  }
  let cells = table_cells(line);
  let first = cells.first()?;
  first
    .trim_start_matches('#')
    .trim_end_matches('.')
    .parse::<u32>()
    .ok()
    .filter(|n| *n > 0)
}

fn is_table_separator(line: &str) -> bool {
  let t = line.trim();
  t.contains('|')
    && t.contains('-')
    && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// A header-like row: most cells are column labels and none names the target.
fn is_label_row(line: &str, patterns: &[String]) -> bool {
  if contains_any_case_insensitive(line, patterns) {
    return false;
  }
  let cells: Vec<String> = table_cells(line).into_iter().filter(|c| !c.is_empty()).collect();
  let labels = cells
    .iter()
    .filter(|cell| TABLE_LABELS.contains(&cell.as_str()))
    .count();
  labels > 0 && labels * 2 > cells.len()
}

/// Data rows of pipe tables in `lines[..=upto]`, skipping separators, headers and label rows.
fn count_table_rows(lines: &[&str], upto: usize, patterns: &[String]) -> u32 {
  let mut rows = 0;
  for (i, line) in lines.iter().enumerate().take(upto + 1) {
    if !line.contains('|') || is_table_separator(line) {
      continue;
    }
    let is_header = lines.get(i + 1).is_some_and(|next| is_table_separator(next));
    if is_header || is_label_row(line, patterns) {
      continue;
    }
    rows += 1;
  }
  rows
}

fn is_bullet_item(line: &str) -> bool {
  line.starts_with("- ") || line.starts_with("* ") || line.starts_with("• ")
}

fn is_numbered_list_item(line: &str) -> bool {
  let mut seen_digit = false;
  let mut chars = line.chars().peekable();

  while let Some(ch) = chars.peek().copied() {
    if ch.is_ascii_digit() {
      seen_digit = true;
      chars.next();
      continue;
    }
    break;
  }

  if !seen_digit {
    return false;
  }

  let sep = chars.next().unwrap_or('\0');
  matches!(sep, '.' | ')' | ':')
}

/// 1-based index of the first list item mentioning any needle.
pub fn extract_rank_from_markdown_list(haystack: &str, needles: &[String]) -> Option<u32> {
  if haystack.is_empty() || needles.is_empty() {
    return None;
  }

  let mut rank: u32 = 0;

  for raw_line in haystack.lines() {
    let line = raw_line.trim();
    if line.is_empty() {
      continue;
    }

    if !(is_bullet_item(line) || is_numbered_list_item(line)) {
      continue;
    }

    rank += 1;
    if contains_any_case_insensitive(line, needles) {
      return Some(rank);
    }
  }

  None
}
