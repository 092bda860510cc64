use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::VisibilityError;

/// Literal match strings keyed by a lowercase identity (a domain or company name).
///
/// Used for brands whose name the models spell in several ways
/// (`Green Banana SEO`, `GreenBanana`, `green-banana`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
  entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, identity: &str, aliases: &[String]) {
    let key = identity.trim().to_lowercase();
    if key.is_empty() {
      return;
    }
    let slot = self.entries.entry(key).or_default();
    for a in aliases.iter() {
      let a = a.trim();
      if a.is_empty() {
        continue;
      }
      if slot.iter().any(|existing| existing.eq_ignore_ascii_case(a)) {
        continue;
      }
      slot.push(a.to_string());
    }
  }

  /// Parses `{"identity": ["alias", ...]}`. Blank input is an empty table.
  pub fn from_json(raw: Option<&str>) -> Result<Self, VisibilityError> {
    let input = raw.unwrap_or("").trim();
    if input.is_empty() {
      return Ok(Self::new());
    }

    let parsed: Value = serde_json::from_str(input)
      .map_err(|e| VisibilityError::Config(format!("invalid brand alias JSON: {e}")))?;
    let obj = parsed
      .as_object()
      .ok_or_else(|| VisibilityError::Config("brand aliases must be a JSON object".to_string()))?;

    let mut table = Self::new();
    for (identity, list) in obj.iter() {
      let aliases: Vec<String> = list
        .as_array()
        .map(|arr| {
          arr
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect()
        })
        .unwrap_or_default();
      table.insert(identity, aliases.as_slice());
    }
    Ok(table)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Aliases registered under any of `keys`, first-seen order, deduplicated.
  pub fn lookup<'a, I>(&self, keys: I) -> Vec<String>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let mut out: Vec<String> = Vec::new();
    for key in keys {
      let key = key.trim().to_lowercase();
      if let Some(list) = self.entries.get(&key) {
        for alias in list {
          if !out.iter().any(|o| o.eq_ignore_ascii_case(alias)) {
            out.push(alias.clone());
          }
        }
      }
    }
    out
  }
}
