//! Practice selection: pick one objective for the next practice question.
//!
//! Narrowing order: drop avoided ids, prefer the target band (soft), rank by
//! weakness-tag match score, break ties uniformly at random.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{Band, Objective};
use crate::util::fold_text;

/// Weights for matching weakness terms against an objective's title and tags.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchWeights {
  pub whole_word: u32,
  pub substring: u32,
  pub prefix: u32,
  /// Terms shorter than this never earn the prefix weight.
  pub prefix_min_len: usize,
  /// How many leading characters of a term are tried as a prefix.
  pub prefix_len: usize,
}

impl Default for MatchWeights {
  fn default() -> Self {
    Self { whole_word: 3, substring: 2, prefix: 1, prefix_min_len: 4, prefix_len: 6 }
  }
}

fn is_word_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

fn contains_whole_word(hay: &str, needle: &str) -> bool {
  hay.match_indices(needle).any(|(i, m)| {
    let before = hay[..i].chars().next_back();
    let after = hay[i + m.len()..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
  })
}

/// Additive match score of `weakness_terms` over the objective's title and tags.
pub fn score_objective_match(o: &Objective, weakness_terms: &[String], w: &MatchWeights) -> u32 {
  if weakness_terms.is_empty() {
    return 0;
  }
  let mut hay_parts = Vec::with_capacity(o.tags.len() + 1);
  hay_parts.push(o.title.as_str());
  hay_parts.extend(o.tags.iter().map(String::as_str));
  let hay = fold_text(&hay_parts.join(" "));

  let mut score = 0;
  for term in weakness_terms {
    let needle = fold_text(term);
    if needle.is_empty() {
      continue;
    }
    if contains_whole_word(&hay, &needle) {
      score += w.whole_word;
    } else if hay.contains(&needle) {
      score += w.substring;
    } else if needle.chars().count() >= w.prefix_min_len {
      let prefix: String = needle.chars().take(w.prefix_len).collect();
      if hay.contains(&prefix) {
        score += w.prefix;
      }
    }
  }
  score
}

/// Choose one objective for practice, or `None` when every objective is avoided.
#[instrument(
  level = "debug",
  skip_all,
  fields(pool = objectives.len(), band = %target, tags = weakness_tags.len(), avoid = avoid_ids.len())
)]
pub fn choose_for_practice<'a, R: Rng + ?Sized>(
  objectives: &'a [Objective],
  target: Band,
  weakness_tags: &[String],
  avoid_ids: &[String],
  weights: &MatchWeights,
  rng: &mut R,
) -> Option<&'a Objective> {
  let avoid: HashSet<&str> = avoid_ids.iter().map(String::as_str).filter(|s| !s.is_empty()).collect();
  let pool: Vec<&Objective> = objectives.iter().filter(|o| !avoid.contains(o.id.as_str())).collect();
  if pool.is_empty() {
    return None;
  }

  let in_band: Vec<&Objective> = pool.iter().copied().filter(|o| o.difficulty == target).collect();
  let bucket = if in_band.is_empty() { pool } else { in_band };

  let scored: Vec<(&Objective, u32)> = bucket
    .into_iter()
    .map(|o| (o, score_objective_match(o, weakness_tags, weights)))
    .collect();
  let best = scored.iter().map(|(_, s)| *s).max()?;
  let ties: Vec<&Objective> = scored.iter().filter(|(_, s)| *s == best).map(|(o, _)| *o).collect();

  let chosen = ties.choose(rng).copied();
  debug!(target: "selection", best_score = best, ties = ties.len(), chosen = ?chosen.map(|o| o.id.as_str()), "Practice objective chosen");
  chosen
}
