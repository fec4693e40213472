//! Minimal OpenAI-compatible client for question writing and answer marking.
//!
//! We only call chat.completions with a strict JSON object response format.
//! Calls are instrumented and log model names, latencies, and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::util::{fill_template, trunc_for_log};

/// What the question writer and marker need to know about the current turn.
#[derive(Clone, Debug)]
pub struct TurnContext {
  pub subject: String,
  pub skill: String,
  pub level: String,
  pub age: u32,
  pub difficulty: String,
  pub objective: String,
}

impl TurnContext {
  /// "y6" → "6"; anything else is passed through.
  fn year(&self) -> &str {
    self.level.strip_prefix(['y', 'Y']).unwrap_or(&self.level)
  }

  fn fill(&self, tpl: &str, extra: &[(&str, &str)]) -> String {
    let age = self.age.to_string();
    let mut pairs: Vec<(&str, &str)> = vec![
      ("subject", self.subject.as_str()),
      ("skill", self.skill.as_str()),
      ("year", self.year()),
      ("age", age.as_str()),
      ("difficulty", self.difficulty.as_str()),
      ("objective", self.objective.as_str()),
    ];
    pairs.extend_from_slice(extra);
    fill_template(tpl, &pairs)
  }
}

/// Marker verdict for one answer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Marking {
  pub correct: bool,
  pub correct_answer: String,
  pub rationale: String,
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "skillplan-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(elapsed = ?start.elapsed(), prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| format!("JSON parse error: {}", e))
  }

  /// Write one question for the turn's objective.
  #[instrument(level = "info", skip(self, prompts, ctx, asked_before), fields(objective = %ctx.objective, asked = asked_before.len()))]
  pub async fn generate_question(
    &self,
    prompts: &Prompts,
    ctx: &TurnContext,
    asked_before: &[String],
  ) -> Result<String, String> {
    #[derive(Deserialize)]
    struct Gen { question: String }

    let asked = serde_json::to_string(asked_before).unwrap_or_else(|_| "[]".into());
    let system = ctx.fill(&prompts.question_system, &[]);
    let user = ctx.fill(&prompts.question_user_template, &[("asked_before", asked.as_str())]);

    let g: Gen = self.chat_json(&system, &user, 0.4).await?;
    let q = g.question.trim();
    if q.is_empty() {
      error!(objective = %ctx.objective, "Model returned an empty question");
      return Err("empty question".into());
    }
    Ok(q.to_string())
  }

  /// Mark one learner answer.
  #[instrument(level = "info", skip(self, prompts, ctx, question, answer), fields(objective = %ctx.objective, question_len = question.len(), answer_len = answer.len()))]
  pub async fn mark_answer(
    &self,
    prompts: &Prompts,
    ctx: &TurnContext,
    question: &str,
    answer: &str,
  ) -> Result<Marking, String> {
    let system = ctx.fill(&prompts.mark_system, &[]);
    let user = ctx.fill(&prompts.mark_user_template, &[("question", question), ("answer", answer)]);
    self.chat_json(&system, &user, 0.2).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
