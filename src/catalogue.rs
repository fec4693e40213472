//! Objective catalogue: parsing the level → subject → skill → objectives source,
//! normalising labels into bands, and caching the result for the process lifetime.
//!
//! Source shape (YAML shown, TOML accepted with the same keys):
//!
//! ```yaml
//! levels:
//!   y1:
//!     maths:
//!       number-to-100:
//!         title: Number to 100
//!         objectives:
//!           - { id: MTH.Y1.N100.COUNT, label: Count to 100, difficulty: core }
//! ```

use std::{
  collections::{BTreeMap, HashSet},
  path::{Path, PathBuf},
  sync::Arc,
};

use serde::{Deserialize, Deserializer};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Band, Objective};
use crate::error::CatalogueError;

#[derive(Debug, Deserialize, Default)]
struct RawDocument {
  #[serde(default)]
  levels: BTreeMap<String, BTreeMap<String, BTreeMap<String, Option<RawSkill>>>>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSkill {
  #[serde(default)] title: Option<String>,
  #[serde(default)] objectives: Option<Vec<RawObjective>>,
}

#[derive(Debug, Deserialize)]
struct RawObjective {
  #[serde(deserialize_with = "scalar_string")]
  id: String,
  #[serde(deserialize_with = "scalar_string")]
  label: String,
  #[serde(default)] difficulty: Option<String>,
  #[serde(default)] tags: Option<Vec<String>>,
}

/// Ids and labels are sometimes written as bare numbers (`id: 101`).
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
  Text(String),
  Int(i64),
  Float(f64),
  Bool(bool),
}

fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(match Scalar::deserialize(d)? {
    Scalar::Text(s) => s,
    Scalar::Int(n) => n.to_string(),
    Scalar::Float(f) => f.to_string(),
    Scalar::Bool(b) => b.to_string(),
  })
}

/// A single skill's objectives plus its optional display title.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkillEntry {
  pub title: Option<String>,
  pub objectives: Vec<Objective>,
}

/// Read-only four-level index of objectives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalogue {
  levels: BTreeMap<String, BTreeMap<String, BTreeMap<String, SkillEntry>>>,
}

impl Catalogue {
  pub fn from_yaml_str(src: &str) -> Result<Self, CatalogueError> {
    let raw: RawDocument = serde_yaml::from_str(src).map_err(|e| CatalogueError::Parse(e.to_string()))?;
    Ok(Self::from_raw(raw))
  }

  pub fn from_toml_str(src: &str) -> Result<Self, CatalogueError> {
    let raw: RawDocument = toml::from_str(src).map_err(|e| CatalogueError::Parse(e.to_string()))?;
    Ok(Self::from_raw(raw))
  }

  fn from_raw(raw: RawDocument) -> Self {
    let mut levels = BTreeMap::new();
    for (level, subjects) in raw.levels {
      let mut subj_out = BTreeMap::new();
      for (subject, skills) in subjects {
        let mut skill_out = BTreeMap::new();
        for (skill, payload) in skills {
          let payload = payload.unwrap_or_default();
          let raw_objectives = payload.objectives.unwrap_or_default();
          let mut seen = HashSet::new();
          let mut objectives = Vec::with_capacity(raw_objectives.len());
          for o in raw_objectives {
            if !seen.insert(o.id.clone()) {
              warn!(target: "skillplan_backend", %level, %subject, %skill, id = %o.id, "Duplicate objective id; keeping first");
              continue;
            }
            objectives.push(Objective {
              id: o.id,
              title: o.label,
              difficulty: Band::normalize(o.difficulty.as_deref()),
              tags: o.tags.unwrap_or_default(),
            });
          }
          skill_out.insert(skill, SkillEntry { title: payload.title, objectives });
        }
        subj_out.insert(subject, skill_out);
      }
      levels.insert(level, subj_out);
    }
    Catalogue { levels }
  }

  /// Objectives for one skill path; empty when any segment is missing.
  pub fn lookup(&self, level: &str, subject: &str, skill: &str) -> &[Objective] {
    self.skill(level, subject, skill)
      .map(|s| s.objectives.as_slice())
      .unwrap_or(&[])
  }

  pub fn skill_title(&self, level: &str, subject: &str, skill: &str) -> Option<&str> {
    self.skill(level, subject, skill).and_then(|s| s.title.as_deref())
  }

  fn skill(&self, level: &str, subject: &str, skill: &str) -> Option<&SkillEntry> {
    self.levels.get(level)?.get(subject)?.get(skill)
  }

  pub fn level_count(&self) -> usize {
    self.levels.len()
  }

  pub fn objective_count(&self) -> usize {
    self.levels
      .values()
      .flat_map(|s| s.values())
      .flat_map(|k| k.values())
      .map(|e| e.objectives.len())
      .sum()
  }
}

/// Parse a catalogue file, picking the format from its extension.
pub async fn load_catalogue_file(path: &Path) -> Result<Catalogue, CatalogueError> {
  let src = tokio::fs::read_to_string(path)
    .await
    .map_err(|source| CatalogueError::Io { path: path.to_path_buf(), source })?;

  let is_yaml = matches!(
    path.extension().and_then(|e| e.to_str()),
    Some("yaml") | Some("yml")
  );
  if is_yaml { Catalogue::from_yaml_str(&src) } else { Catalogue::from_toml_str(&src) }
}

/// Load-once holder for the catalogue. Concurrent first callers share one
/// in-flight load; a failed load leaves the cell empty.
pub struct CatalogueCache {
  path: PathBuf,
  cell: OnceCell<Arc<Catalogue>>,
}

impl CatalogueCache {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), cell: OnceCell::new() }
  }

  /// Pre-populated cache, for fixtures.
  #[cfg(test)]
  pub fn with_catalogue(catalogue: Catalogue) -> Self {
    Self { path: PathBuf::new(), cell: OnceCell::new_with(Some(Arc::new(catalogue))) }
  }

  #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
  pub async fn get(&self) -> Result<Arc<Catalogue>, CatalogueError> {
    self.cell
      .get_or_try_init(|| async {
        let cat = load_catalogue_file(&self.path).await?;
        info!(
          target: "skillplan_backend",
          path = %self.path.display(),
          levels = cat.level_count(),
          objectives = cat.objective_count(),
          "Loaded objective catalogue"
        );
        Ok::<_, CatalogueError>(Arc::new(cat))
      })
      .await
      .cloned()
  }

  /// Catalogue lookup that owns its result, for callers that do not hold the catalogue.
  #[instrument(level = "debug", skip(self))]
  pub async fn objectives_for_skill(
    &self,
    level: &str,
    subject: &str,
    skill: &str,
  ) -> Result<Vec<Objective>, CatalogueError> {
    let cat = self.get().await?;
    let found = cat.lookup(level, subject, skill).to_vec();
    debug!(target: "skillplan_backend", %level, %subject, %skill, found = found.len(), "Objectives for skill");
    Ok(found)
  }
}
