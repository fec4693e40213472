//! Public protocol structs for the HTTP endpoints (serde ready).
//! Request bodies are mode-tagged enums so malformed payloads are rejected
//! before they reach selection or aggregation.

use serde::{Deserialize, Serialize};

use crate::aggregate::{RunSummary, SavedAnswer};
use crate::domain::{BandDistribution, Objective, PlanEntry, PracticeDifficulty};

//
// Practice
//

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSettings {
  pub total: u32,
  pub difficulty: PracticeDifficulty,
  #[serde(default)]
  pub focus_weaknesses: bool,
  /// Display name, e.g. "Maths".
  pub subject: String,
  pub subject_slug: String,
  pub skill_slug: String,
  pub skill_title: String,
  pub level: String,
  pub age: u32,
  /// Weak objective ids carried over from earlier runs.
  #[serde(default)]
  pub weaknesses: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeHistoryItem {
  pub question: String,
  pub user_answer: String,
  pub correct: bool,
  #[serde(default)]
  pub correct_answer: String,
  #[serde(default)]
  pub objective_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeLast {
  pub question: String,
  pub user_answer: String,
  #[serde(default)]
  pub objective_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PracticeRequest {
  Init {
    settings: PracticeSettings,
    #[serde(default)]
    history: Vec<PracticeHistoryItem>,
  },
  Grade {
    settings: PracticeSettings,
    last: PracticeLast,
    #[serde(default)]
    history: Vec<PracticeHistoryItem>,
  },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PracticeResponse {
  Init(PracticeInitOut),
  Grade(PracticeGradeOut),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeInitOut {
  pub question: String,
  pub objective_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeGradeOut {
  pub correct: bool,
  pub correct_answer: String,
  pub rationale: String,
  pub finish: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub question: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub objective_id: Option<String>,
}

//
// Test
//

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestLast {
  pub question: String,
  pub user_answer: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestHistoryItem {
  /// Index into the plan.
  pub i: usize,
  pub question: String,
  pub user_answer: String,
  pub correct: bool,
  #[serde(default)]
  pub correct_answer: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TestRequest {
  Init {
    level: String,
    subject: String,
    skill: String,
    #[serde(default = "default_age")]
    age: u32,
    #[serde(default)]
    total: Option<u32>,
    #[serde(default)]
    distribution: Option<BandDistribution>,
  },
  Grade {
    plan: Vec<PlanEntry>,
    index: usize,
    last: TestLast,
    #[serde(default)]
    history: Vec<TestHistoryItem>,
    level: String,
    subject: String,
    skill: String,
    #[serde(default = "default_age")]
    age: u32,
  },
}

fn default_age() -> u32 {
  10
}

#[derive(Debug, Serialize)]
pub struct IndexedQuestion {
  pub index: usize,
  pub question: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TestResponse {
  Init(TestInitOut),
  Grade(TestGradeOut),
}

#[derive(Debug, Serialize)]
pub struct TestInitOut {
  pub plan: Vec<PlanEntry>,
  pub first: IndexedQuestion,
  pub total: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestGradeOut {
  pub correct: bool,
  pub correct_answer: String,
  pub rationale: String,
  pub finish: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next: Option<IndexedQuestion>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub summary: Option<RunSummary>,
}

//
// Results
//

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSubmission {
  pub user_id: String,
  pub age: u32,
  pub year: String,
  pub subject: String,
  pub skill: String,
  pub plan: Vec<PlanEntry>,
  pub answers: Vec<SavedAnswer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSaved {
  pub ok: bool,
  pub run_id: String,
  pub summary: RunSummary,
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
  pub year: String,
  pub subject: String,
  pub skill: String,
  pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
  pub subject: Option<String>,
  pub skill: Option<String>,
  pub objective: Option<String>,
  pub since: Option<chrono::DateTime<chrono::Utc>>,
  pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectivesQuery {
  pub level: String,
  pub subject: String,
  pub skill: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectivesOut {
  pub skill_title: Option<String>,
  pub objectives: Vec<Objective>,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
