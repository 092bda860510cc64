use std::sync::OnceLock;

use regex::Regex;

const KNOWN_TLD_SUFFIXES: &[&str] = &[
  ".co.uk", ".com.au", ".co.nz", ".com", ".net", ".org", ".io", ".co", ".ai", ".biz", ".info",
  ".us", ".uk", ".ca", ".de", ".app", ".dev", ".agency",
];

/// Vocabulary split out of run-together domain labels, applied in this order.
const SERVICE_WORDS: &[&str] = &[
  "green",
  "banana",
  "seo",
  "marketing",
  "digital",
  "agency",
  "media",
  "design",
  "solutions",
  "consulting",
  "studio",
  "group",
  "labs",
];

/// Hostname of `url` without a leading `www.`, lowercased.
///
/// Accepts bare hosts (`example.com/path`) as well as full URLs; anything the
/// URL parser rejects is cut down by hand instead, so this never fails.
pub fn extract_domain(url: &str) -> String {
  let input = url.trim();
  let with_scheme = if input.contains("://") {
    input.to_string()
  } else {
    format!("https://{input}")
  };

  let host = match url::Url::parse(&with_scheme) {
    Ok(parsed) => parsed.host_str().map(|h| h.to_lowercase()),
    Err(_) => None,
  };

  let host = host.unwrap_or_else(|| fallback_host(input));
  strip_www(&host).to_string()
}

fn fallback_host(input: &str) -> String {
  let without_scheme = input
    .split_once("://")
    .map(|(_, rest)| rest)
    .unwrap_or(input);
  without_scheme
    .split(['/', '?', '#'])
    .next()
    .unwrap_or("")
    .trim()
    .to_lowercase()
}

fn strip_www(host: &str) -> &str {
  host.strip_prefix("www.").unwrap_or(host)
}

fn strip_tld(domain: &str) -> &str {
  for suffix in KNOWN_TLD_SUFFIXES {
    if let Some(stem) = domain.strip_suffix(suffix) {
      if !stem.is_empty() {
        return stem;
      }
    }
  }
  domain
}

fn camel_boundary() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex"))
}

fn whitespace_run() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn service_word_patterns() -> &'static [(Regex, &'static str)] {
  static RES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
  RES.get_or_init(|| {
    SERVICE_WORDS
      .iter()
      .map(|w| {
        let re = Regex::new(&format!("(?i){}", regex::escape(w))).expect("static regex");
        (re, *w)
      })
      .collect()
  })
}

fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Human-readable company name guessed from a domain.
///
/// Rules run in a fixed order, each on the previous rule's output:
/// 1. strip a known TLD suffix,
/// 2. turn `-`, `_` and `.` into spaces,
/// 3. split camel-case boundaries,
/// 4. pad every service-vocabulary word with spaces (`greenbananaseo` → `green banana seo`),
/// 5. collapse whitespace and capitalise each word.
pub fn extract_company_name(domain: &str) -> String {
  let stem = strip_tld(domain.trim());
  let mut name = stem.replace(['-', '_', '.'], " ");
  name = camel_boundary().replace_all(&name, "$1 $2").into_owned();

  for (re, word) in service_word_patterns() {
    name = re.replace_all(&name, format!(" {word} ")).into_owned();
  }

  let collapsed = whitespace_run().replace_all(name.trim(), " ");
  collapsed
    .split(' ')
    .filter(|w| !w.is_empty())
    .map(capitalize)
    .collect::<Vec<_>>()
    .join(" ")
}
