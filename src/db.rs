use async_trait::async_trait;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use tokio::sync::OnceCell;

use crate::config::database_url;
use crate::error::VisibilityError;
use crate::leads::{LeadStore, LeadSubmission};
use crate::types::{AnalysisMode, AnalysisResult};

static POOL: OnceCell<MySqlPool> = OnceCell::const_new();

async fn ensure_schema(pool: &MySqlPool) -> Result<(), VisibilityError> {
  // Idempotent; runs once per warm instance.
  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS leads (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        name VARCHAR(256) NOT NULL,
        email VARCHAR(320) NOT NULL,
        phone VARCHAR(64) NULL,
        website VARCHAR(512) NOT NULL,
        company VARCHAR(256) NULL,
        competitors_json TEXT NOT NULL,
        keywords_json TEXT NOT NULL,
        message TEXT NULL,
        created_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
        KEY idx_leads_created (created_at),
        KEY idx_leads_email (email)
      );
    "#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"
      CREATE TABLE IF NOT EXISTS visibility_runs (
        id BIGINT PRIMARY KEY AUTO_INCREMENT,
        lead_id BIGINT NULL,
        website VARCHAR(512) NOT NULL,
        mode VARCHAR(16) NOT NULL,
        overall_score INT NOT NULL,
        total_mentions INT NOT NULL,
        result_json MEDIUMTEXT NOT NULL,
        created_at TIMESTAMP(3) NOT NULL DEFAULT CURRENT_TIMESTAMP(3),
        KEY idx_visibility_runs_lead (lead_id),
        KEY idx_visibility_runs_website (website, created_at)
      );
    "#,
  )
  .execute(pool)
  .await?;

  Ok(())
}

pub async fn get_pool() -> Result<&'static MySqlPool, VisibilityError> {
  POOL
    .get_or_try_init(|| async {
      let url = database_url()
        .ok_or_else(|| VisibilityError::Config("Missing TIDB_DATABASE_URL (or DATABASE_URL)".to_string()))?;

      let pool = MySqlPoolOptions::new().max_connections(5).connect(&url).await?;

      ensure_schema(&pool).await?;
      Ok::<_, VisibilityError>(pool)
    })
    .await
}

fn json_list(values: &[String]) -> String {
  serde_json::Value::from(values.to_vec()).to_string()
}

fn mode_label(mode: &AnalysisMode) -> &'static str {
  match mode {
    AnalysisMode::Standard { .. } => "standard",
    AnalysisMode::Historical { .. } => "historical",
  }
}

pub async fn insert_lead(pool: &MySqlPool, lead: &LeadSubmission) -> Result<u64, VisibilityError> {
  let result = sqlx::query(
    r#"
      INSERT INTO leads
        (name, email, phone, website, company, competitors_json, keywords_json, message)
      VALUES
        (?, ?, ?, ?, ?, ?, ?, ?);
    "#,
  )
  .bind(&lead.name)
  .bind(&lead.email)
  .bind(lead.phone.as_deref())
  .bind(&lead.website)
  .bind(lead.company.as_deref())
  .bind(json_list(&lead.competitors))
  .bind(json_list(&lead.keywords))
  .bind(lead.message.as_deref())
  .execute(pool)
  .await?;

  Ok(result.last_insert_id())
}

pub async fn insert_visibility_run(
  pool: &MySqlPool,
  lead_id: Option<u64>,
  analysis: &AnalysisResult,
) -> Result<u64, VisibilityError> {
  let result_json = serde_json::to_string(analysis).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

  let result = sqlx::query(
    r#"
      INSERT INTO visibility_runs
        (lead_id, website, mode, overall_score, total_mentions, result_json)
      VALUES
        (?, ?, ?, ?, ?, ?);
    "#,
  )
  .bind(lead_id)
  .bind(&analysis.website)
  .bind(mode_label(&analysis.mode))
  .bind(analysis.summary.overall_score)
  .bind(analysis.summary.total_mentions)
  .bind(result_json)
  .execute(pool)
  .await?;

  Ok(result.last_insert_id())
}

/// `LeadStore` over the shared TiDB/MySQL pool.
pub struct MySqlLeadStore {
  pool: &'static MySqlPool,
}

impl MySqlLeadStore {
  pub fn new(pool: &'static MySqlPool) -> Self {
    Self { pool }
  }

  /// `None` when no database URL is configured.
  pub async fn connect() -> Result<Option<Self>, VisibilityError> {
    if database_url().is_none() {
      return Ok(None);
    }
    Ok(Some(Self::new(get_pool().await?)))
  }
}

#[async_trait]
impl LeadStore for MySqlLeadStore {
  async fn save_lead(&self, lead: &LeadSubmission) -> Result<u64, VisibilityError> {
    insert_lead(self.pool, lead).await
  }

  async fn save_analysis(&self, lead_id: u64, analysis: &AnalysisResult) -> Result<u64, VisibilityError> {
    insert_visibility_run(self.pool, Some(lead_id), analysis).await
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;

  #[test]
  fn json_list_encodes_strings() {
    let values = vec!["seo".to_string(), "ppc \"ads\"".to_string()];
    assert_eq!(json_list(&values), r#"["seo","ppc \"ads\""]"#);
    assert_eq!(json_list(&[]), "[]");
  }

  #[test]
  fn mode_label_matches_serialized_tag() {
    let standard = AnalysisMode::Standard {
      platforms: BTreeMap::new(),
    };
    let historical = AnalysisMode::Historical {
      days: 3,
      platforms: BTreeMap::new(),
    };
    assert_eq!(mode_label(&standard), "standard");
    assert_eq!(mode_label(&historical), "historical");
    assert_eq!(serde_json::to_value(&historical).unwrap()["mode"], "historical");
  }

  #[tokio::test]
  async fn connect_without_database_url_is_none() {
    std::env::remove_var("TIDB_DATABASE_URL");
    std::env::remove_var("DATABASE_URL");
    assert!(MySqlLeadStore::connect().await.unwrap().is_none());
  }
}
