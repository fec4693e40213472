//! Test plan construction: size a band ratio to an exact total, then sample
//! objectives per band without replacement.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, instrument, warn};

use crate::domain::{Band, BandDistribution, Objective, PlanEntry};

/// Split objectives into their difficulty bands, keeping source order.
pub fn split_by_band(objs: &[Objective]) -> [Vec<&Objective>; 3] {
  let mut out: [Vec<&Objective>; 3] = [Vec::new(), Vec::new(), Vec::new()];
  for o in objs {
    let slot = match o.difficulty {
      Band::Basic => 0,
      Band::Intermediate => 1,
      Band::Stretch => 2,
    };
    out[slot].push(o);
  }
  out
}

/// Scale `ratio` so its bands sum to exactly `total`.
///
/// Each band is scaled by `total / sum(ratio)` and rounded; any rounding drift
/// is absorbed by `intermediate` when short, or removed from
/// `intermediate`, `basic`, `stretch` (in that order) when over.
#[instrument(level = "debug", skip(ratio), fields(basic = ratio.basic, intermediate = ratio.intermediate, stretch = ratio.stretch))]
pub fn size_distribution(ratio: BandDistribution, total: u32) -> BandDistribution {
  let sum = ratio.total();
  let mut sized = if sum == 0 {
    warn!(target: "plan", total, "Band ratio sums to zero; sizing everything into intermediate");
    BandDistribution::new(0, total, 0)
  } else {
    let scale = f64::from(total) / sum as f64;
    let scaled = |n: u32| (f64::from(n) * scale).round().max(0.0) as u32;
    BandDistribution::new(scaled(ratio.basic), scaled(ratio.intermediate), scaled(ratio.stretch))
  };

  loop {
    let current = sized.total();
    if current == u64::from(total) {
      break;
    }
    if current < u64::from(total) {
      sized.intermediate += 1;
    } else if sized.intermediate > 0 {
      sized.intermediate -= 1;
    } else if sized.basic > 0 {
      sized.basic -= 1;
    } else if sized.stretch > 0 {
      sized.stretch -= 1;
    } else {
      warn!(target: "plan", total, current, "Cannot correct rounding drift; keeping best effort");
      break;
    }
  }

  debug!(target: "plan", total, basic = sized.basic, intermediate = sized.intermediate, stretch = sized.stretch, "Distribution sized");
  sized
}

/// Shuffle `arr` and take up to `n` objectives whose ids are not yet used.
fn pick_from<'a, R: Rng + ?Sized>(
  arr: &[&'a Objective],
  n: usize,
  used: &mut HashSet<&'a str>,
  rng: &mut R,
) -> Vec<&'a Objective> {
  let mut shuffled = arr.to_vec();
  shuffled.shuffle(rng);
  let mut out = Vec::with_capacity(n);
  for o in shuffled {
    if out.len() >= n {
      break;
    }
    if used.insert(o.id.as_str()) {
      out.push(o);
    }
  }
  out
}

/// Build a test plan of exactly `sized.total()` objectives.
///
/// Order is basic, intermediate, stretch, then top-ups from any band, then a
/// cyclic pad over `objectives`. The pad repeats objectives when the catalogue
/// is smaller than the requested total. Only an empty `objectives` yields a
/// short (empty) plan.
#[instrument(level = "debug", skip_all, fields(pool = objectives.len(), total = sized.total()))]
pub fn choose_for_test<R: Rng + ?Sized>(
  objectives: &[Objective],
  sized: BandDistribution,
  rng: &mut R,
) -> Vec<Objective> {
  let target = sized.total() as usize;
  let bands = split_by_band(objectives);
  let mut used: HashSet<&str> = HashSet::new();
  let mut result: Vec<&Objective> = Vec::with_capacity(target.min(objectives.len()));

  for (band, pool) in Band::ALL.iter().zip(bands.iter()) {
    let want = sized.get(*band) as usize;
    let got = pick_from(pool, want, &mut used, rng);
    if got.len() < want {
      debug!(target: "plan", %band, want, got = got.len(), "Band shortfall");
    }
    result.extend(got);
  }

  if result.len() < target {
    let mut left: Vec<&Objective> = bands
      .iter()
      .flatten()
      .copied()
      .filter(|o| !used.contains(o.id.as_str()))
      .collect();
    left.shuffle(rng);
    for o in left {
      if result.len() >= target {
        break;
      }
      used.insert(o.id.as_str());
      result.push(o);
    }
  }

  if result.len() < target && !objectives.is_empty() {
    warn!(target: "plan", have = result.len(), target, pool = objectives.len(), "Catalogue smaller than plan; repeating objectives");
    while result.len() < target {
      result.push(&objectives[result.len() % objectives.len()]);
    }
  }

  result.truncate(target);
  result.into_iter().cloned().collect()
}

pub fn to_plan(objs: &[Objective]) -> Vec<PlanEntry> {
  objs.iter().map(PlanEntry::from).collect()
}
