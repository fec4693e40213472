//! Domain models: difficulty bands, objectives, band distributions and plan entries.

use serde::{Deserialize, Serialize};

/// The three-level difficulty taxonomy every objective is normalised into.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Band {
  Basic,
  Intermediate,
  Stretch,
}

impl Default for Band {
  fn default() -> Self { Band::Intermediate }
}

impl Band {
  /// Sampling order for test plans.
  pub const ALL: [Band; 3] = [Band::Basic, Band::Intermediate, Band::Stretch];

  /// Map a free-form difficulty label from a catalogue source onto a band.
  /// Unknown and missing labels (including "core") land on `Intermediate`.
  pub fn normalize(raw: Option<&str>) -> Band {
    let v = raw.unwrap_or_default().trim().to_lowercase();
    match v.as_str() {
      "basic" | "foundation" => Band::Basic,
      "stretch" | "challenge" | "extension" => Band::Stretch,
      _ => Band::Intermediate,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Band::Basic => "basic",
      Band::Intermediate => "intermediate",
      Band::Stretch => "stretch",
    }
  }
}

impl std::fmt::Display for Band {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Learner-facing practice difficulty.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PracticeDifficulty {
  Warmup,
  Standard,
  Challenge,
}

impl PracticeDifficulty {
  pub fn band(self) -> Band {
    match self {
      PracticeDifficulty::Warmup => Band::Basic,
      PracticeDifficulty::Standard => Band::Intermediate,
      PracticeDifficulty::Challenge => Band::Stretch,
    }
  }

  /// Short description handed to the question writer.
  pub fn describe(self) -> &'static str {
    match self {
      PracticeDifficulty::Warmup => "simple numbers and direct steps",
      PracticeDifficulty::Standard => "typical classroom problems",
      PracticeDifficulty::Challenge => "trickier numbers or multi-step",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      PracticeDifficulty::Warmup => "warmup",
      PracticeDifficulty::Standard => "standard",
      PracticeDifficulty::Challenge => "challenge",
    }
  }
}

/// An atomic learning goal, read-only once loaded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Objective {
  pub id: String,
  pub title: String,
  pub difficulty: Band,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

/// Per-band counts. Used both as an input ratio and as exact sized counts.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BandDistribution {
  pub basic: u32,
  pub intermediate: u32,
  pub stretch: u32,
}

impl BandDistribution {
  pub const fn new(basic: u32, intermediate: u32, stretch: u32) -> Self {
    Self { basic, intermediate, stretch }
  }

  /// Sum of all bands; widened so caller-supplied ratios cannot overflow.
  pub fn total(&self) -> u64 {
    u64::from(self.basic) + u64::from(self.intermediate) + u64::from(self.stretch)
  }

  pub fn get(&self, band: Band) -> u32 {
    match band {
      Band::Basic => self.basic,
      Band::Intermediate => self.intermediate,
      Band::Stretch => self.stretch,
    }
  }
}

/// One slot of a test plan; index `i` of the plan is question turn `i`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
  pub id: String,
  pub title: String,
  pub difficulty: Band,
}

impl From<&Objective> for PlanEntry {
  fn from(o: &Objective) -> Self {
    PlanEntry { id: o.id.clone(), title: o.title.clone(), difficulty: o.difficulty }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_known_labels() {
    assert_eq!(Band::normalize(Some("foundation")), Band::Basic);
    assert_eq!(Band::normalize(Some("  BASIC ")), Band::Basic);
    assert_eq!(Band::normalize(Some("extension")), Band::Stretch);
    assert_eq!(Band::normalize(Some("Challenge")), Band::Stretch);
    assert_eq!(Band::normalize(Some("stretch")), Band::Stretch);
    assert_eq!(Band::normalize(Some("core")), Band::Intermediate);
  }

  #[test]
  fn unknown_or_missing_labels_are_intermediate() {
    assert_eq!(Band::normalize(None), Band::Intermediate);
    assert_eq!(Band::normalize(Some("")), Band::Intermediate);
    assert_eq!(Band::normalize(Some("expert")), Band::Intermediate);
  }

  #[test]
  fn practice_difficulty_maps_to_bands() {
    assert_eq!(PracticeDifficulty::Warmup.band(), Band::Basic);
    assert_eq!(PracticeDifficulty::Standard.band(), Band::Intermediate);
    assert_eq!(PracticeDifficulty::Challenge.band(), Band::Stretch);
  }

  #[test]
  fn band_serializes_lowercase() {
    let s = serde_json::to_string(&Band::Stretch).unwrap();
    assert_eq!(s, "\"stretch\"");
  }
}
