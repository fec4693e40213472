//! Loading service configuration (paths, tuning constants, test defaults, prompts) from TOML.
//!
//! See `AppConfig` and `Prompts` for the expected schema. Every section is optional.

use serde::Deserialize;
use tracing::{error, info};

use crate::aggregate::WEAK_THRESHOLD;
use crate::domain::BandDistribution;
use crate::selection::MatchWeights;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Catalogue source; `.yaml`/`.yml` parse as YAML, anything else as TOML.
  pub objectives_path: String,
  /// Root of the append-only result store.
  pub data_dir: String,
  pub selection: MatchWeights,
  pub scoring: ScoringConfig,
  pub test: TestDefaults,
  pub prompts: Prompts,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      objectives_path: "data/objectives.yaml".into(),
      data_dir: ".data".into(),
      selection: MatchWeights::default(),
      scoring: ScoringConfig::default(),
      test: TestDefaults::default(),
      prompts: Prompts::default(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
  pub weak_threshold: f64,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self { weak_threshold: WEAK_THRESHOLD }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TestDefaults {
  pub total: u32,
  /// Upper bound on a requested test length.
  pub max_total: u32,
  pub distribution: BandDistribution,
}

impl Default for TestDefaults {
  fn default() -> Self {
    Self { total: 20, max_total: 200, distribution: BandDistribution::new(8, 8, 4) }
  }
}

/// Prompts used by the question writer / marker. Placeholders in `{braces}`
/// are filled per request.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub mark_system: String,
  pub mark_user_template: String,
  /// Used when no model is configured or the model call fails.
  pub fallback_question_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You are an expert UK primary question writer for {subject}, topic: {skill}.\nLearner: Year {year} (age ~{age}).\nDifficulty: {difficulty}.\nWrite ONE short, age-appropriate question that directly assesses: \"{objective}\". Plain text only, no diagrams.\nIMPORTANT: Output JSON ONLY with { \"question\": string }.".into(),
      question_user_template: "Create the question now.\nPreviously asked (avoid repeating patterns): {asked_before}\nRespond ONLY as JSON { \"question\": \"...\" }".into(),
      mark_system: "You are a strict but kind UK primary test marker for {subject}, topic: {skill}.\nLearner: Year {year} (age ~{age}).\nMark the answer as correct/incorrect. Keep rationale short. IMPORTANT: JSON ONLY.".into(),
      mark_user_template: "Question: {question}\nLearner's answer: {answer}\nRespond ONLY as JSON with fields: correct (boolean), correctAnswer (string), rationale (string).".into(),
      fallback_question_template: "Answer a short question on: {objective}.".into(),
    }
  }
}

impl AppConfig {
  /// Apply env overrides for deployment-specific paths.
  fn with_env_overrides(mut self) -> Self {
    if let Ok(p) = std::env::var("OBJECTIVES_PATH") {
      self.objectives_path = p;
    }
    if let Ok(d) = std::env::var("DATA_DIR") {
      self.data_dir = d;
    }
    self
  }
}

pub fn parse_config(src: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(src)
}

/// Load `AppConfig` from SKILLPLAN_CONFIG_PATH. Any IO/parse error is logged and
/// defaults are used instead.
pub fn load_app_config_from_env() -> AppConfig {
  let cfg = match std::env::var("SKILLPLAN_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match parse_config(&s) {
        Ok(cfg) => {
          info!(target: "skillplan_backend", %path, "Loaded service config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "skillplan_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
          AppConfig::default()
        }
      },
      Err(e) => {
        error!(target: "skillplan_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
        AppConfig::default()
      }
    },
    Err(_) => AppConfig::default(),
  };
  cfg.with_env_overrides()
}
