//! Session operations behind the HTTP handlers.
//!
//! This includes:
//!   - Practice: pick the next objective (weakness-biased, avoiding repeats), mark answers
//!   - Test: size and build a plan, mark answers turn by turn, summarise at the end
//!   - Results: aggregate a submitted run and append it to the result store
//!
//! Sessions are stateless on the server: every call carries the caller's history.

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::aggregate::{aggregate, AnsweredRecord, RunRecord, TrendRow};
use crate::config::Prompts;
use crate::domain::{Band, Objective};
use crate::error::ApiError;
use crate::openai::{Marking, TurnContext};
use crate::plan::{choose_for_test, size_distribution, to_plan};
use crate::protocol::*;
use crate::selection::{choose_for_practice, MatchWeights};
use crate::state::AppState;
use crate::store::TrendFilter;
use crate::util::fill_template;

/// How many earlier questions are shown to the question writer.
const ASKED_BEFORE_WINDOW: usize = 6;

/// Weakness terms for practice biasing: ids and tags of the caller's weak
/// objectives, first-seen order, no duplicates. Empty unless `focus` is on.
pub fn weakness_terms(objectives: &[Objective], weak_ids: &[String], focus: bool) -> Vec<String> {
  if !focus {
    return Vec::new();
  }
  let mut out: Vec<String> = Vec::new();
  for o in objectives.iter().filter(|o| weak_ids.contains(&o.id)) {
    for t in std::iter::once(&o.id).chain(o.tags.iter()) {
      if !out.contains(t) {
        out.push(t.clone());
      }
    }
  }
  out
}

/// Objective ids already used in this practice run.
fn used_objective_ids(history: &[PracticeHistoryItem], last: Option<&PracticeLast>) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  let ids = history
    .iter()
    .filter_map(|h| h.objective_id.as_ref())
    .chain(last.and_then(|l| l.objective_id.as_ref()));
  for id in ids {
    if !id.is_empty() && !out.contains(id) {
      out.push(id.clone());
    }
  }
  out
}

/// Practice selection with the caller-side fallback: the first unused
/// objective, then the first objective overall.
fn pick_practice_objective(
  objectives: &[Objective],
  target: Band,
  terms: &[String],
  avoid: &[String],
  weights: &MatchWeights,
) -> Option<Objective> {
  let mut rng = rand::thread_rng();
  choose_for_practice(objectives, target, terms, avoid, weights, &mut rng)
    .or_else(|| objectives.iter().find(|o| !avoid.contains(&o.id)))
    .or_else(|| objectives.first())
    .cloned()
}

fn fallback_question(prompts: &Prompts, objective: &str) -> String {
  fill_template(&prompts.fallback_question_template, &[("objective", objective)])
}

fn unmarked() -> Marking {
  Marking {
    correct: false,
    correct_answer: String::new(),
    rationale: "Couldn't mark this one.".into(),
  }
}

/// Question for the turn; falls back to a templated question without a model.
async fn write_question(state: &AppState, ctx: &TurnContext, asked_before: &[String]) -> String {
  if let Some(oa) = &state.openai {
    match oa.generate_question(&state.config.prompts, ctx, asked_before).await {
      Ok(q) => return q,
      Err(e) => error!(target: "skillplan_backend", objective = %ctx.objective, error = %e, "Question generation failed; using fallback question"),
    }
  }
  fallback_question(&state.config.prompts, &ctx.objective)
}

/// Verdict for one answer; unmarked without a model or on failure.
async fn mark(state: &AppState, ctx: &TurnContext, question: &str, answer: &str) -> Marking {
  if let Some(oa) = &state.openai {
    match oa.mark_answer(&state.config.prompts, ctx, question, answer).await {
      Ok(m) => return m,
      Err(e) => error!(target: "skillplan_backend", objective = %ctx.objective, error = %e, "Marking failed; answer left unmarked"),
    }
  }
  unmarked()
}

#[instrument(level = "info", skip_all)]
pub async fn practice_next(state: &AppState, req: PracticeRequest) -> Result<PracticeResponse, ApiError> {
  let (settings, last, history) = match req {
    PracticeRequest::Init { settings, history } => (settings, None, history),
    PracticeRequest::Grade { settings, last, history } => (settings, Some(last), history),
  };
  let grading = last.is_some();

  let objectives = state
    .catalogue
    .objectives_for_skill(&settings.level, &settings.subject_slug, &settings.skill_slug)
    .await?;

  let remaining = i64::from(settings.total) - history.len() as i64 - i64::from(grading);
  let target = settings.difficulty.band();
  let terms = weakness_terms(&objectives, &settings.weaknesses, settings.focus_weaknesses);
  let avoid = used_objective_ids(&history, last.as_ref());

  let next = if !grading || remaining > 0 {
    pick_practice_objective(&objectives, target, &terms, &avoid, &state.config.selection)
  } else {
    None
  };

  info!(
    target: "selection",
    level = %settings.level,
    subject = %settings.subject_slug,
    skill = %settings.skill_slug,
    pool = objectives.len(),
    band = %target,
    weakness_terms = terms.len(),
    avoid = avoid.len(),
    remaining,
    chosen = ?next.as_ref().map(|o| o.id.as_str()),
    "Practice objective selected"
  );

  let difficulty = format!("{} ({})", settings.difficulty.as_str(), settings.difficulty.describe());
  let ctx_for = |objective: &str| TurnContext {
    subject: settings.subject.clone(),
    skill: settings.skill_title.clone(),
    level: settings.level.clone(),
    age: settings.age,
    difficulty: difficulty.clone(),
    objective: objective.to_string(),
  };
  let asked_before: Vec<String> = history
    .iter()
    .rev()
    .take(ASKED_BEFORE_WINDOW)
    .rev()
    .map(|h| h.question.clone())
    .collect();
  let next_title = next.as_ref().map(|o| o.title.as_str()).unwrap_or(settings.skill_title.as_str());

  let Some(last) = last else {
    let question = write_question(state, &ctx_for(next_title), &asked_before).await;
    return Ok(PracticeResponse::Init(PracticeInitOut {
      question,
      objective_id: next.map(|o| o.id),
    }));
  };

  let last_title = last
    .objective_id
    .as_ref()
    .and_then(|id| objectives.iter().find(|o| &o.id == id))
    .map(|o| o.title.as_str())
    .unwrap_or(settings.skill_title.as_str());
  let marking = mark(state, &ctx_for(last_title), &last.question, &last.user_answer).await;

  let finish = remaining <= 0 || next.is_none();
  let question = if finish {
    None
  } else {
    Some(write_question(state, &ctx_for(next_title), &asked_before).await)
  };

  Ok(PracticeResponse::Grade(PracticeGradeOut {
    correct: marking.correct,
    correct_answer: marking.correct_answer,
    rationale: marking.rationale,
    finish,
    question,
    objective_id: if finish { None } else { next.map(|o| o.id) },
  }))
}

#[instrument(level = "info", skip_all)]
pub async fn test_next(state: &AppState, req: TestRequest) -> Result<TestResponse, ApiError> {
  match req {
    TestRequest::Init { level, subject, skill, age, total, distribution } => {
      let requested = total.unwrap_or(state.config.test.total);
      let max_total = state.config.test.max_total.max(1);
      if requested > max_total {
        warn!(target: "plan", requested, max_total, "Requested test length too large; clamping");
      }
      let total = requested.clamp(1, max_total);
      let ratio = distribution.unwrap_or(state.config.test.distribution);

      let catalogue = state.catalogue.get().await?;
      let objectives = catalogue.lookup(&level, &subject, &skill);
      if objectives.is_empty() {
        return Err(ApiError::NotFound("No objectives for this skill".into()));
      }
      let skill_title = catalogue.skill_title(&level, &subject, &skill).unwrap_or(skill.as_str()).to_string();

      let sized = size_distribution(ratio, total);
      let chosen = {
        let mut rng = rand::thread_rng();
        choose_for_test(objectives, sized, &mut rng)
      };
      let plan = to_plan(&chosen);
      info!(
        target: "plan",
        %level, %subject, %skill, total,
        basic = sized.basic, intermediate = sized.intermediate, stretch = sized.stretch,
        plan_len = plan.len(),
        "Test plan built"
      );

      let first = &plan[0];
      let ctx = TurnContext {
        subject: subject.clone(),
        skill: skill_title,
        level,
        age,
        difficulty: first.difficulty.to_string(),
        objective: first.title.clone(),
      };
      let question = write_question(state, &ctx, &[]).await;
      Ok(TestResponse::Init(TestInitOut {
        plan,
        first: IndexedQuestion { index: 0, question },
        total,
      }))
    }

    TestRequest::Grade { plan, index, last, history, level, subject, skill, age } => {
      let total = plan.len();
      let entry = plan.get(index);
      if entry.is_none() {
        warn!(target: "plan", index, total, "Graded index is outside the plan");
      }
      let ctx_for = |title: &str, difficulty: Band| TurnContext {
        subject: subject.clone(),
        skill: skill.clone(),
        level: level.clone(),
        age,
        difficulty: difficulty.to_string(),
        objective: title.to_string(),
      };
      let ctx = ctx_for(
        entry.map(|e| e.title.as_str()).unwrap_or("(unknown)"),
        entry.map(|e| e.difficulty).unwrap_or_default(),
      );
      let marking = mark(state, &ctx, &last.question, &last.user_answer).await;

      let mut so_far = history;
      so_far.push(TestHistoryItem {
        i: index,
        question: last.question,
        user_answer: last.user_answer,
        correct: marking.correct,
        correct_answer: marking.correct_answer.clone(),
      });

      // Any index at or past the last slot ends the run.
      if index >= total.saturating_sub(1) {
        let answers: Vec<AnsweredRecord> = so_far
          .iter()
          .map(|h| AnsweredRecord { plan_index: h.i, correct: h.correct })
          .collect();
        let summary = aggregate(&plan, &answers, state.config.scoring.weak_threshold);
        info!(target: "results", %level, %subject, %skill, score = summary.overall.score, total = summary.overall.total, "Test finished");
        return Ok(TestResponse::Grade(TestGradeOut {
          correct: marking.correct,
          correct_answer: marking.correct_answer,
          rationale: marking.rationale,
          finish: true,
          next: None,
          score: Some(summary.overall.score),
          total: Some(summary.overall.total),
          summary: Some(summary),
        }));
      }

      let next_index = index + 1;
      let next_obj = &plan[next_index];
      let asked_before: Vec<String> = so_far
        .iter()
        .rev()
        .take(ASKED_BEFORE_WINDOW)
        .rev()
        .map(|h| h.question.clone())
        .collect();
      let question = write_question(state, &ctx_for(&next_obj.title, next_obj.difficulty), &asked_before).await;
      Ok(TestResponse::Grade(TestGradeOut {
        correct: marking.correct,
        correct_answer: marking.correct_answer,
        rationale: marking.rationale,
        finish: false,
        next: Some(IndexedQuestion { index: next_index, question }),
        score: None,
        total: None,
        summary: None,
      }))
    }
  }
}

/// Aggregate a finished run and append it, plus its trend rows, to the store.
#[instrument(level = "info", skip_all, fields(user = %sub.user_id, year = %sub.year, subject = %sub.subject, skill = %sub.skill))]
pub async fn submit_run(state: &AppState, sub: RunSubmission) -> Result<RunSaved, ApiError> {
  let required = [&sub.user_id, &sub.year, &sub.subject, &sub.skill];
  if required.iter().any(|s| s.trim().is_empty()) {
    return Err(ApiError::BadRequest("Invalid payload".into()));
  }

  let records: Vec<AnsweredRecord> = sub
    .answers
    .iter()
    .map(|a| AnsweredRecord { plan_index: a.index, correct: a.correct })
    .collect();
  let summary = aggregate(&sub.plan, &records, state.config.scoring.weak_threshold);

  let record = RunRecord {
    run_id: Uuid::new_v4().to_string(),
    user_id: sub.user_id,
    date: Utc::now(),
    age: sub.age,
    year: sub.year,
    subject: sub.subject,
    skill: sub.skill,
    score: summary.overall.score,
    total: summary.overall.total,
    plan: sub.plan,
    answers: sub.answers,
    weaknesses: summary.per_objective.clone(),
  };
  state.store.append_run_record(&record).await?;
  state.store.append_trend_rows(&record.trend_rows()).await?;

  info!(
    target: "results",
    run_id = %record.run_id,
    score = record.score,
    total = record.total,
    weak = record.weaknesses.iter().filter(|w| w.considered_weak).count(),
    "Run saved"
  );
  Ok(RunSaved { ok: true, run_id: record.run_id, summary })
}

#[instrument(level = "info", skip(state))]
pub async fn recent_runs(state: &AppState, q: ResultsQuery) -> Result<Vec<RunRecord>, ApiError> {
  if q.year.is_empty() || q.subject.is_empty() || q.skill.is_empty() {
    return Err(ApiError::BadRequest("Missing year/subject/skill".into()));
  }
  Ok(state.store.query_recent_runs(&q.year, &q.subject, &q.skill, q.limit.unwrap_or(5)).await?)
}

#[instrument(level = "info", skip(state))]
pub async fn trends(state: &AppState, q: TrendsQuery) -> Result<Vec<TrendRow>, ApiError> {
  let filter = TrendFilter {
    subject: q.subject,
    skill: q.skill,
    objective: q.objective,
    since: q.since,
    limit: q.limit,
  };
  Ok(state.store.query_trend_rows(&filter).await?)
}

#[instrument(level = "info", skip(state))]
pub async fn objectives(state: &AppState, q: ObjectivesQuery) -> Result<ObjectivesOut, ApiError> {
  let catalogue = state.catalogue.get().await?;
  Ok(ObjectivesOut {
    skill_title: catalogue.skill_title(&q.level, &q.subject, &q.skill).map(str::to_string),
    objectives: catalogue.lookup(&q.level, &q.subject, &q.skill).to_vec(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::aggregate::SavedAnswer;
  use crate::catalogue::Catalogue;
  use crate::domain::{BandDistribution, PracticeDifficulty};

  const CATALOGUE: &str = r#"
levels:
  y4:
    maths:
      fractions:
        title: Fractions
        objectives:
          - { id: F1, label: Recognise unit fractions, difficulty: foundation, tags: [unit] }
          - { id: F2, label: Compare fractions, difficulty: core, tags: [compare] }
          - { id: F3, label: Equivalent fractions, difficulty: core, tags: [equivalence] }
          - { id: F4, label: Add fractions, difficulty: core }
          - { id: F5, label: Fraction word problems, difficulty: extension }
"#;

  fn state(dir: &std::path::Path) -> AppState {
    AppState::for_tests(Catalogue::from_yaml_str(CATALOGUE).unwrap(), dir)
  }

  fn settings(total: u32, difficulty: PracticeDifficulty) -> PracticeSettings {
    PracticeSettings {
      total,
      difficulty,
      focus_weaknesses: false,
      subject: "Maths".into(),
      subject_slug: "maths".into(),
      skill_slug: "fractions".into(),
      skill_title: "Fractions".into(),
      level: "y4".into(),
      age: 9,
      weaknesses: vec![],
    }
  }

  fn history_item(objective_id: &str) -> PracticeHistoryItem {
    PracticeHistoryItem {
      question: format!("Q about {objective_id}"),
      user_answer: "a".into(),
      correct: true,
      correct_answer: "a".into(),
      objective_id: Some(objective_id.into()),
    }
  }

  fn objs() -> Vec<Objective> {
    Catalogue::from_yaml_str(CATALOGUE).unwrap().lookup("y4", "maths", "fractions").to_vec()
  }

  #[test]
  fn weakness_terms_expand_ids_and_tags_when_focused() {
    let o = objs();
    let weak = vec!["F2".to_string(), "F3".to_string(), "F2".to_string()];
    assert_eq!(weakness_terms(&o, &weak, true), vec!["F2", "compare", "F3", "equivalence"]);
    assert!(weakness_terms(&o, &weak, false).is_empty());
  }

  #[test]
  fn used_ids_include_last_and_dedupe() {
    let h = vec![history_item("F1"), history_item("F1"), history_item("F2")];
    let last = PracticeLast { question: "q".into(), user_answer: "a".into(), objective_id: Some("F3".into()) };
    assert_eq!(used_objective_ids(&h, Some(&last)), vec!["F1", "F2", "F3"]);
  }

  #[test]
  fn caller_fallback_when_everything_is_avoided() {
    let o = objs();
    let avoid: Vec<String> = o.iter().map(|x| x.id.clone()).collect();
    let picked = pick_practice_objective(&o, Band::Basic, &[], &avoid, &MatchWeights::default()).unwrap();
    assert_eq!(picked.id, "F1");
    assert!(pick_practice_objective(&[], Band::Basic, &[], &[], &MatchWeights::default()).is_none());
  }

  #[tokio::test]
  async fn practice_init_targets_band_and_uses_fallback_question() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = PracticeRequest::Init { settings: settings(5, PracticeDifficulty::Challenge), history: vec![] };
    match practice_next(&st, req).await.unwrap() {
      PracticeResponse::Init(out) => {
        assert_eq!(out.objective_id.as_deref(), Some("F5"));
        assert_eq!(out.question, "Answer a short question on: Fraction word problems.");
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn practice_focus_prefers_weak_objectives() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let mut s = settings(5, PracticeDifficulty::Standard);
    s.focus_weaknesses = true;
    s.weaknesses = vec!["F3".into()];
    for _ in 0..20 {
      let req = PracticeRequest::Init { settings: s.clone(), history: vec![] };
      match practice_next(&st, req).await.unwrap() {
        PracticeResponse::Init(out) => assert_eq!(out.objective_id.as_deref(), Some("F3")),
        other => panic!("unexpected {:?}", other),
      }
    }
  }

  #[tokio::test]
  async fn practice_grade_avoids_used_objectives() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = PracticeRequest::Grade {
      settings: settings(5, PracticeDifficulty::Standard),
      last: PracticeLast { question: "q".into(), user_answer: "a".into(), objective_id: Some("F4".into()) },
      history: vec![history_item("F2")],
    };
    match practice_next(&st, req).await.unwrap() {
      PracticeResponse::Grade(out) => {
        assert!(!out.finish);
        assert!(!out.correct);
        assert_eq!(out.rationale, "Couldn't mark this one.");
        assert_eq!(out.objective_id.as_deref(), Some("F3"));
        assert!(out.question.is_some());
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn practice_grade_finishes_when_nothing_remains() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = PracticeRequest::Grade {
      settings: settings(2, PracticeDifficulty::Warmup),
      last: PracticeLast { question: "q".into(), user_answer: "a".into(), objective_id: Some("F2".into()) },
      history: vec![history_item("F1")],
    };
    match practice_next(&st, req).await.unwrap() {
      PracticeResponse::Grade(out) => {
        assert!(out.finish);
        assert!(out.question.is_none());
        assert!(out.objective_id.is_none());
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_init_builds_exact_size_plan() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = TestRequest::Init {
      level: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      age: 9,
      total: Some(8),
      distribution: None,
    };
    match test_next(&st, req).await.unwrap() {
      TestResponse::Init(out) => {
        assert_eq!(out.total, 8);
        assert_eq!(out.plan.len(), 8);
        assert_eq!(out.first.index, 0);
        assert_eq!(out.plan[0].difficulty, Band::Basic);
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_init_zero_total_is_clamped_to_one() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = TestRequest::Init {
      level: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      age: 9,
      total: Some(0),
      distribution: None,
    };
    match test_next(&st, req).await.unwrap() {
      TestResponse::Init(out) => assert_eq!(out.plan.len(), 1),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_init_oversized_total_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = TestRequest::Init {
      level: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      age: 9,
      total: Some(4_000_000_000),
      distribution: Some(BandDistribution::new(u32::MAX, 1, 0)),
    };
    match test_next(&st, req).await.unwrap() {
      TestResponse::Init(out) => {
        assert_eq!(out.total, 200);
        assert_eq!(out.plan.len(), 200);
        assert_eq!(out.plan[0].difficulty, Band::Basic);
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_grade_index_past_the_plan_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = TestRequest::Grade {
      plan: to_plan(&objs()[..1]),
      index: usize::MAX,
      last: TestLast { question: "q".into(), user_answer: "a".into() },
      history: vec![],
      level: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      age: 9,
    };
    match test_next(&st, req).await.unwrap() {
      TestResponse::Grade(out) => {
        assert!(out.finish);
        assert!(out.next.is_none());
        assert_eq!(out.total, Some(1));
        assert_eq!(out.score, Some(0));
        assert!(out.summary.unwrap().per_objective.is_empty());
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_init_unknown_skill_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let req = TestRequest::Init {
      level: "y4".into(),
      subject: "maths".into(),
      skill: "geometry".into(),
      age: 9,
      total: None,
      distribution: None,
    };
    assert!(matches!(test_next(&st, req).await, Err(ApiError::NotFound(_))));
  }

  #[tokio::test]
  async fn test_grade_last_turn_returns_summary() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let plan = to_plan(&objs()[..2]);
    let req = TestRequest::Grade {
      plan,
      index: 1,
      last: TestLast { question: "q2".into(), user_answer: "a".into() },
      history: vec![TestHistoryItem {
        i: 0,
        question: "q1".into(),
        user_answer: "a".into(),
        correct: true,
        correct_answer: "a".into(),
      }],
      level: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      age: 9,
    };
    match test_next(&st, req).await.unwrap() {
      TestResponse::Grade(out) => {
        assert!(out.finish);
        assert_eq!(out.score, Some(1));
        assert_eq!(out.total, Some(2));
        let summary = out.summary.unwrap();
        assert_eq!(summary.per_objective.len(), 2);
        assert_eq!(summary.per_objective[0].objective_id, "F2");
        assert!(summary.per_objective[0].considered_weak);
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_grade_mid_run_asks_next_question() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let plan = to_plan(&objs()[..3]);
    let req = TestRequest::Grade {
      plan,
      index: 0,
      last: TestLast { question: "q1".into(), user_answer: "a".into() },
      history: vec![],
      level: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      age: 9,
    };
    match test_next(&st, req).await.unwrap() {
      TestResponse::Grade(out) => {
        assert!(!out.finish);
        let next = out.next.unwrap();
        assert_eq!(next.index, 1);
        assert_eq!(next.question, "Answer a short question on: Compare fractions.");
        assert!(out.summary.is_none());
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn submitted_runs_are_persisted_and_queryable() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let plan = to_plan(&objs()[..2]);
    let answer = |index: usize, id: &str, correct: bool| SavedAnswer {
      index,
      objective_id: id.into(),
      question: "q".into(),
      user_answer: "a".into(),
      correct,
      correct_answer: "a".into(),
    };
    let sub = RunSubmission {
      user_id: "learner-1".into(),
      age: 9,
      year: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      plan,
      answers: vec![answer(0, "F1", true), answer(1, "F2", false), answer(9, "??", true)],
    };
    let saved = submit_run(&st, sub).await.unwrap();
    assert!(saved.ok);
    assert_eq!(saved.summary.overall.score, 2);
    assert_eq!(saved.summary.per_objective.len(), 2);

    let runs = recent_runs(
      &st,
      ResultsQuery { year: "y4".into(), subject: "maths".into(), skill: "fractions".into(), limit: None },
    )
    .await
    .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, saved.run_id);

    let rows = trends(
      &st,
      TrendsQuery { subject: Some("maths".into()), skill: None, objective: None, since: None, limit: None },
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 3);
  }

  #[tokio::test]
  async fn submission_without_user_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let st = state(dir.path());
    let sub = RunSubmission {
      user_id: " ".into(),
      age: 9,
      year: "y4".into(),
      subject: "maths".into(),
      skill: "fractions".into(),
      plan: vec![],
      answers: vec![],
    };
    assert!(matches!(submit_run(&st, sub).await, Err(ApiError::BadRequest(_))));
  }
}
