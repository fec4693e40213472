//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,selection=debug,plan=debug,skillplan_backend=debug,tower_http=info").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Targets in use: "selection" (practice picks), "plan" (test plans),
//! "results" (run aggregation and the store), "skillplan_backend" (everything else).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str =
    "info,selection=debug,plan=debug,results=info,skillplan_backend=debug,tower_http=info,axum=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // JSON for log shippers, pretty otherwise.
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => {
            builder.json().init();
        }
        _ => {
            builder.init();
        }
    }
}
