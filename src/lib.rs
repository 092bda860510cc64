pub mod adapter;
pub mod aliases;
pub mod analyzer;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod http;
pub mod http_client;
pub mod leads;
pub mod orchestrator;
pub mod platform;
pub mod providers;
pub mod scoring;
pub mod telemetry;
pub mod types;

pub use error::VisibilityError;
pub use orchestrator::VisibilityOrchestrator;
pub use types::{AnalysisResult, VisibilityRequest};
