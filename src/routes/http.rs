//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::aggregate::{RunRecord, TrendRow};
use crate::error::ApiError;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(%q.level, %q.subject, %q.skill))]
pub async fn http_get_objectives(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ObjectivesQuery>,
) -> Result<Json<ObjectivesOut>, ApiError> {
  let out = logic::objectives(&state, q).await?;
  info!(target: "skillplan_backend", count = out.objectives.len(), "HTTP objectives served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_practice_next(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PracticeRequest>,
) -> Result<Json<PracticeResponse>, ApiError> {
  Ok(Json(logic::practice_next(&state, body).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_test_next(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TestRequest>,
) -> Result<Json<TestResponse>, ApiError> {
  Ok(Json(logic::test_next(&state, body).await?))
}

#[instrument(level = "info", skip(state, body), fields(answers = body.answers.len(), plan_len = body.plan.len()))]
pub async fn http_post_results(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RunSubmission>,
) -> Result<Json<RunSaved>, ApiError> {
  Ok(Json(logic::submit_run(&state, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_results(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ResultsQuery>,
) -> Result<Json<Vec<RunRecord>>, ApiError> {
  let runs = logic::recent_runs(&state, q).await?;
  info!(target: "results", count = runs.len(), "HTTP recent runs served");
  Ok(Json(runs))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_trends(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TrendsQuery>,
) -> Result<Json<Vec<TrendRow>>, ApiError> {
  let rows = logic::trends(&state, q).await?;
  info!(target: "results", count = rows.len(), "HTTP trend rows served");
  Ok(Json(rows))
}
