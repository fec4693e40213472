//! Append-only result store: JSON-lines files under a data directory.
//!
//! Layout:
//!   <data>/tests/<year>__<subject>__<skill>.jsonl   one RunRecord per line
//!   <data>/trends/all.jsonl                         one TrendRow per line

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{info, instrument, warn};

use crate::aggregate::{RunRecord, TrendRow};
use crate::error::StoreError;
use crate::util::sanitize_segment;

/// Optional filters for trend queries. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct TrendFilter {
  pub subject: Option<String>,
  pub skill: Option<String>,
  pub objective: Option<String>,
  pub since: Option<DateTime<Utc>>,
  pub limit: Option<usize>,
}

pub struct ResultStore {
  root: PathBuf,
  write_lock: Mutex<()>,
}

impl ResultStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into(), write_lock: Mutex::new(()) }
  }

  fn runs_file(&self, year: &str, subject: &str, skill: &str) -> PathBuf {
    let key = format!(
      "{}__{}__{}.jsonl",
      sanitize_segment(year),
      sanitize_segment(subject),
      sanitize_segment(skill)
    );
    self.root.join("tests").join(key)
  }

  fn trends_file(&self) -> PathBuf {
    self.root.join("trends").join("all.jsonl")
  }

  async fn append_lines(&self, path: &Path, payload: String) -> Result<(), StoreError> {
    let _guard = self.write_lock.lock().await;
    if let Some(dir) = path.parent() {
      fs::create_dir_all(dir).await?;
    }
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(payload.as_bytes()).await?;
    file.flush().await?;
    Ok(())
  }

  #[instrument(level = "info", skip(self, record), fields(run_id = %record.run_id, year = %record.year, subject = %record.subject, skill = %record.skill))]
  pub async fn append_run_record(&self, record: &RunRecord) -> Result<(), StoreError> {
    let path = self.runs_file(&record.year, &record.subject, &record.skill);
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    self.append_lines(&path, line).await?;
    info!(target: "results", path = %path.display(), "Run record saved");
    Ok(())
  }

  #[instrument(level = "info", skip(self, rows), fields(rows = rows.len()))]
  pub async fn append_trend_rows(&self, rows: &[TrendRow]) -> Result<(), StoreError> {
    if rows.is_empty() {
      return Ok(());
    }
    let mut payload = String::new();
    for r in rows {
      payload.push_str(&serde_json::to_string(r)?);
      payload.push('\n');
    }
    let path = self.trends_file();
    self.append_lines(&path, payload).await?;
    info!(target: "results", path = %path.display(), rows = rows.len(), "Trend rows saved");
    Ok(())
  }

  /// Most recent runs for a skill, newest first.
  #[instrument(level = "info", skip(self))]
  pub async fn query_recent_runs(
    &self,
    year: &str,
    subject: &str,
    skill: &str,
    limit: usize,
  ) -> Result<Vec<RunRecord>, StoreError> {
    let mut runs: Vec<RunRecord> = read_jsonl(&self.runs_file(year, subject, skill)).await?;
    runs.sort_by(|a, b| b.date.cmp(&a.date));
    runs.truncate(limit);
    Ok(runs)
  }

  #[instrument(level = "info", skip(self))]
  pub async fn query_trend_rows(&self, filter: &TrendFilter) -> Result<Vec<TrendRow>, StoreError> {
    let rows: Vec<TrendRow> = read_jsonl(&self.trends_file()).await?;
    let mut rows: Vec<TrendRow> = rows
      .into_iter()
      .filter(|r| filter.subject.as_ref().map_or(true, |s| &r.subject == s))
      .filter(|r| filter.skill.as_ref().map_or(true, |s| &r.skill == s))
      .filter(|r| filter.objective.as_ref().map_or(true, |o| &r.objective == o))
      .filter(|r| filter.since.map_or(true, |since| r.date >= since))
      .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = filter.limit {
      rows.truncate(limit);
    }
    Ok(rows)
  }
}

/// Read every parseable line of a JSON-lines file; a missing file is empty.
async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
  let raw = match fs::read_to_string(path).await {
    Ok(s) => s,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(e.into()),
  };
  let mut out = Vec::new();
  for (lineno, line) in raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
    match serde_json::from_str::<T>(line) {
      Ok(v) => out.push(v),
      Err(e) => warn!(target: "results", path = %path.display(), line = lineno + 1, error = %e, "Skipping unreadable line"),
    }
  }
  Ok(out)
}
