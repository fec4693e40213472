//! Run aggregation: fold a completed run's answers into per-objective accuracy,
//! weakness flags and an overall score, plus the persisted record shapes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::domain::{Band, PlanEntry};

/// Accuracy strictly below this marks an objective as weak.
pub const WEAK_THRESHOLD: f64 = 0.8;

/// Trend row objective key for the whole-run row.
pub const OVERALL_KEY: &str = "__overall__";

/// One answered question, pointing back into the plan.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredRecord {
  pub plan_index: usize,
  pub correct: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveWeakness {
  pub objective_id: String,
  pub title: String,
  pub difficulty: Band,
  pub attempts: u32,
  pub correct: u32,
  pub accuracy: f64,
  pub considered_weak: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunScore {
  pub score: u32,
  pub total: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
  pub per_objective: Vec<ObjectiveWeakness>,
  pub overall: RunScore,
}

fn round3(x: f64) -> f64 {
  (x * 1000.0).round() / 1000.0
}

/// Aggregate a run. Records whose plan index has no plan entry are skipped
/// for the per-objective list but still count towards the overall score.
#[instrument(level = "debug", skip_all, fields(plan = plan.len(), answers = answers.len()))]
pub fn aggregate(plan: &[PlanEntry], answers: &[AnsweredRecord], weak_threshold: f64) -> RunSummary {
  let mut order: Vec<ObjectiveWeakness> = Vec::new();
  let mut slot: HashMap<&str, usize> = HashMap::new();
  let mut skipped = 0usize;

  for rec in answers {
    let Some(entry) = plan.get(rec.plan_index) else {
      skipped += 1;
      continue;
    };
    let i = *slot.entry(entry.id.as_str()).or_insert_with(|| {
      order.push(ObjectiveWeakness {
        objective_id: entry.id.clone(),
        title: entry.title.clone(),
        difficulty: entry.difficulty,
        attempts: 0,
        correct: 0,
        accuracy: 0.0,
        considered_weak: false,
      });
      order.len() - 1
    });
    let w = &mut order[i];
    w.attempts += 1;
    if rec.correct {
      w.correct += 1;
    }
  }

  if skipped > 0 {
    warn!(target: "results", skipped, plan = plan.len(), "Answers reference plan indices that do not exist; skipped");
  }

  for w in &mut order {
    w.accuracy = if w.attempts > 0 { round3(f64::from(w.correct) / f64::from(w.attempts)) } else { 0.0 };
    w.considered_weak = w.attempts > 0 && w.accuracy < weak_threshold;
  }
  order.sort_by(|a, b| {
    b.considered_weak
      .cmp(&a.considered_weak)
      .then(a.accuracy.total_cmp(&b.accuracy))
  });

  let score = answers.iter().filter(|r| r.correct).count() as u32;
  RunSummary {
    per_objective: order,
    overall: RunScore { score, total: plan.len() as u32 },
  }
}

/// One answered question as kept in the run log.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnswer {
  pub index: usize,
  pub objective_id: String,
  pub question: String,
  pub user_answer: String,
  pub correct: bool,
  pub correct_answer: String,
}

/// Full-fidelity record of a completed test run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
  pub run_id: String,
  pub user_id: String,
  #[serde(rename = "dateISO")]
  pub date: DateTime<Utc>,
  pub age: u32,
  pub year: String,
  pub subject: String,
  pub skill: String,
  pub score: u32,
  pub total: u32,
  pub plan: Vec<PlanEntry>,
  pub answers: Vec<SavedAnswer>,
  pub weaknesses: Vec<ObjectiveWeakness>,
}

/// Chart-friendly summary row; one overall row plus one per objective per run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendRow {
  pub run_id: String,
  #[serde(rename = "dateISO")]
  pub date: DateTime<Utc>,
  pub year: String,
  pub subject: String,
  pub skill: String,
  pub objective: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub objective_title: Option<String>,
  pub questions: u32,
  pub score: u32,
  pub accuracy: f64,
}

impl RunRecord {
  pub fn trend_rows(&self) -> Vec<TrendRow> {
    let row = |objective: String, title: Option<String>, questions: u32, score: u32, accuracy: f64| TrendRow {
      run_id: self.run_id.clone(),
      date: self.date,
      year: self.year.clone(),
      subject: self.subject.clone(),
      skill: self.skill.clone(),
      objective,
      objective_title: title,
      questions,
      score,
      accuracy,
    };

    let overall_acc = if self.total > 0 { round3(f64::from(self.score) / f64::from(self.total)) } else { 0.0 };
    let mut rows = vec![row(OVERALL_KEY.to_string(), None, self.total, self.score, overall_acc)];
    rows.extend(self.weaknesses.iter().map(|w| {
      row(w.objective_id.clone(), Some(w.title.clone()), w.attempts, w.correct, w.accuracy)
    }));
    rows
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn plan() -> Vec<PlanEntry> {
    vec![
      PlanEntry { id: "A".into(), title: "Alpha".into(), difficulty: Band::Basic },
      PlanEntry { id: "B".into(), title: "Beta".into(), difficulty: Band::Intermediate },
      PlanEntry { id: "A".into(), title: "Alpha".into(), difficulty: Band::Basic },
      PlanEntry { id: "C".into(), title: "Gamma".into(), difficulty: Band::Stretch },
    ]
  }

  fn rec(plan_index: usize, correct: bool) -> AnsweredRecord {
    AnsweredRecord { plan_index, correct }
  }

  fn repeated(id: &str, n: usize) -> Vec<PlanEntry> {
    (0..n)
      .map(|_| PlanEntry { id: id.into(), title: id.into(), difficulty: Band::Intermediate })
      .collect()
  }

  #[test]
  fn groups_by_objective_and_counts() {
    let answers = vec![rec(0, true), rec(1, false), rec(2, false), rec(3, true)];
    let out = aggregate(&plan(), &answers, WEAK_THRESHOLD);

    assert_eq!(out.overall, RunScore { score: 2, total: 4 });
    assert_eq!(out.per_objective.len(), 3);
    let total_attempts: u32 = out.per_objective.iter().map(|w| w.attempts).sum();
    assert_eq!(total_attempts, 4);

    // Weak first, lowest accuracy first among them.
    assert_eq!(out.per_objective[0].objective_id, "B");
    assert_eq!(out.per_objective[0].accuracy, 0.0);
    assert_eq!(out.per_objective[1].objective_id, "A");
    assert_eq!(out.per_objective[1].attempts, 2);
    assert_eq!(out.per_objective[1].accuracy, 0.5);
    assert!(out.per_objective[1].considered_weak);
    assert_eq!(out.per_objective[2].objective_id, "C");
    assert!(!out.per_objective[2].considered_weak);
  }

  #[test]
  fn threshold_is_strict() {
    let p = repeated("X", 5);
    let four_of_five: Vec<_> = (0..5).map(|i| rec(i, i != 0)).collect();
    let out = aggregate(&p, &four_of_five, WEAK_THRESHOLD);
    assert_eq!(out.per_objective[0].accuracy, 0.8);
    assert!(!out.per_objective[0].considered_weak);

    let three_of_five: Vec<_> = (0..5).map(|i| rec(i, i >= 2)).collect();
    let out = aggregate(&p, &three_of_five, WEAK_THRESHOLD);
    assert_eq!(out.per_objective[0].accuracy, 0.6);
    assert!(out.per_objective[0].considered_weak);
  }

  #[test]
  fn accuracy_is_rounded_to_three_places() {
    let p = repeated("X", 3);
    let out = aggregate(&p, &[rec(0, true), rec(1, false), rec(2, false)], WEAK_THRESHOLD);
    assert_eq!(out.per_objective[0].accuracy, 0.333);
  }

  #[test]
  fn unknown_plan_indices_are_skipped() {
    let answers = vec![rec(0, true), rec(17, true), rec(1, false)];
    let out = aggregate(&plan(), &answers, WEAK_THRESHOLD);
    let attempts: u32 = out.per_objective.iter().map(|w| w.attempts).sum();
    assert_eq!(attempts, 2);
    assert_eq!(out.overall.score, 2);
    assert_eq!(out.overall.total, 4);
  }

  #[test]
  fn empty_run_has_no_objectives() {
    let out = aggregate(&plan(), &[], WEAK_THRESHOLD);
    assert!(out.per_objective.is_empty());
    assert_eq!(out.overall, RunScore { score: 0, total: 4 });
  }

  #[test]
  fn trend_rows_have_overall_then_objectives() {
    let summary = aggregate(&plan(), &[rec(0, true), rec(1, false)], WEAK_THRESHOLD);
    let record = RunRecord {
      run_id: "r1".into(),
      user_id: "u1".into(),
      date: Utc::now(),
      age: 9,
      year: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      score: summary.overall.score,
      total: summary.overall.total,
      plan: plan(),
      answers: vec![],
      weaknesses: summary.per_objective,
    };
    let rows = record.trend_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].objective, OVERALL_KEY);
    assert_eq!(rows[0].questions, 4);
    assert_eq!(rows[0].accuracy, 0.25);
    assert_eq!(rows[1].objective, "B");
    assert_eq!(rows[1].objective_title.as_deref(), Some("Beta"));
  }

  #[test]
  fn weakness_serializes_camel_case() {
    let w = ObjectiveWeakness {
      objective_id: "A".into(),
      title: "Alpha".into(),
      difficulty: Band::Basic,
      attempts: 1,
      correct: 1,
      accuracy: 1.0,
      considered_weak: false,
    };
    let v = serde_json::to_value(&w).unwrap();
    assert_eq!(v["objectiveId"], "A");
    assert_eq!(v["consideredWeak"], false);
  }
}
