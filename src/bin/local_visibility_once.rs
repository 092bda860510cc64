use vercel_runtime::Error;

use ai_visibility_rust::config::VisibilityConfig;
use ai_visibility_rust::telemetry::init_tracing;
use ai_visibility_rust::{VisibilityOrchestrator, VisibilityRequest};

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
  args
    .iter()
    .position(|a| a == flag)
    .and_then(|idx| args.get(idx + 1))
    .cloned()
}

fn parse_flag_values(args: &[String], flag: &str) -> Vec<String> {
  args
    .windows(2)
    .filter(|pair| pair[0] == flag)
    .flat_map(|pair| pair[1].split(','))
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .collect()
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing("debug");
  let args: Vec<String> = std::env::args().collect();

  let website = parse_flag_value(&args, "--website").unwrap_or_default();
  let keywords = parse_flag_values(&args, "--keyword");
  if website.trim().is_empty() || keywords.is_empty() {
    eprintln!("Missing required --website and --keyword");
    eprintln!(
      "Example: cargo run --bin local_visibility_once -- --website acme.com --keyword \"crm software\" --competitor rival.io"
    );
    return Ok(());
  }

  let days = match parse_flag_value(&args, "--days") {
    Some(raw) => Some(raw.trim().parse::<u32>().map_err(|e| -> Error {
      Box::new(std::io::Error::other(format!("invalid --days: {e}")))
    })?),
    None => None,
  };

  let mut request = VisibilityRequest::new(&website, &[]);
  request.keywords = keywords;
  request.competitors = parse_flag_values(&args, "--competitor");
  request.company = parse_flag_value(&args, "--company");
  if let Some(days) = days {
    request.historical = true;
    request.days = days;
  }

  let cfg = VisibilityConfig::from_env()?;
  let configured = cfg.configured_platforms();
  if configured.is_empty() {
    eprintln!("No platform credentials set (OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, PERPLEXITY_API_KEY)");
  }

  let orchestrator = VisibilityOrchestrator::from_config(&cfg);
  let result = orchestrator.analyze_visibility(request).await?;
  println!("{}", serde_json::to_string_pretty(&result)?);
  Ok(())
}
