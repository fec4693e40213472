//! SkillPlan · Objective Practice & Test Backend
//!
//! - Axum HTTP API for practice sessions, fixed-length tests and result history
//! - Optional OpenAI integration for question writing and marking (via environment variables)
//! - Append-only JSON-lines result store on the local filesystem
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   OPENAI_API_KEY        : enables OpenAI integration if present
//!   OPENAI_BASE_URL       : default "https://api.openai.com/v1"
//!   OPENAI_MODEL          : default "gpt-4o-mini"
//!   SKILLPLAN_CONFIG_PATH : path to TOML config (paths, tuning, test defaults, prompts)
//!   OBJECTIVES_PATH       : objective catalogue (YAML or TOML), overrides config
//!   DATA_DIR              : result store root, overrides config
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod catalogue;
mod selection;
mod plan;
mod aggregate;
mod store;
mod state;
mod protocol;
mod logic;
mod openai;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (config, catalogue cache, result store, OpenAI client).
  let state = Arc::new(AppState::new());

  // A service without its catalogue cannot answer anything; fail fast.
  if let Err(e) = state.catalogue.get().await {
    error!(target: "skillplan_backend", error = %e, "Objective catalogue failed to load");
    return Err(e.into());
  }

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "skillplan_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
