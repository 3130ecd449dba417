//! Stage timing and index scheduling for the generation pipeline

use std::fmt;
use std::time::{Duration, Instant};

/// Log target for stage timings, so they can be filtered on their own
pub(crate) const TIMING_TARGET: &str = "icosphere_planet::timing";

/// A step of planet generation that gets timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Stage {
    Planet,
    Mesh,
    Relaxation,
    Topology,
    Terrain,
    Plates,
    Elevation,
    Currents,
    Heat,
    Moisture,
}

impl Stage {
    /// Whole pipeline phases report at INFO, their sub-steps at DEBUG
    fn level(self) -> log::Level {
        match self {
            Stage::Planet | Stage::Mesh | Stage::Terrain => log::Level::Info,
            _ => log::Level::Debug,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Planet => "planet",
            Stage::Mesh => "mesh",
            Stage::Relaxation => "mesh relaxation",
            Stage::Topology => "topology",
            Stage::Terrain => "terrain",
            Stage::Plates => "plates",
            Stage::Elevation => "elevation",
            Stage::Currents => "currents",
            Stage::Heat => "heat",
            Stage::Moisture => "moisture",
        };
        f.write_str(name)
    }
}

/// Logs how long a [`Stage`] took when dropped
///
/// ```ignore
/// let _timer = StageTimer::start(Stage::Elevation);
/// // logs "elevation done in 12.3ms" under `icosphere_planet::timing`
/// ```
pub(crate) struct StageTimer {
    stage: Stage,
    started: Instant,
}

impl StageTimer {
    pub(crate) fn start(stage: Stage) -> Self {
        log::trace!(target: TIMING_TARGET, "{} started", stage);
        Self {
            stage,
            started: Instant::now(),
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        log::log!(
            target: TIMING_TARGET,
            self.stage.level(),
            "{} done in {:.3?}",
            self.stage,
            self.elapsed()
        );
    }
}

/// How per-index work is run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Schedule {
    Sequential,
    /// On the rayon pool
    #[cfg(feature = "parallel")]
    Parallel,
}

impl Default for Schedule {
    #[cfg(feature = "parallel")]
    fn default() -> Self {
        Schedule::Parallel
    }

    #[cfg(not(feature = "parallel"))]
    fn default() -> Self {
        Schedule::Sequential
    }
}

/// Evaluate `f` for every index in `0..len`, collecting results in index order
///
/// The output order is fixed whatever the schedule, so callers stay
/// deterministic as long as `f` is pure.
pub(crate) fn map_indices<T, F>(schedule: Schedule, len: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    match schedule {
        Schedule::Sequential => (0..len).map(f).collect(),
        #[cfg(feature = "parallel")]
        Schedule::Parallel => {
            use rayon::prelude::*;
            (0..len).into_par_iter().map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_indices_keeps_order() {
        let squares = map_indices(Schedule::default(), 100, |i| i * i);
        assert_eq!(squares.len(), 100);
        for (i, &sq) in squares.iter().enumerate() {
            assert_eq!(sq, i * i);
        }
        assert!(map_indices(Schedule::default(), 0, |i| i).is_empty());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let f = |i: usize| {
            let x = i as f32 * 0.37;
            (x.sin() * 1e3 + x.sqrt(), i)
        };
        let sequential = map_indices(Schedule::Sequential, 10_000, f);
        let parallel = map_indices(Schedule::Parallel, 10_000, f);
        assert_eq!(sequential, parallel);
        assert_eq!(Schedule::default(), Schedule::Parallel);
    }

    #[test]
    fn test_stage_levels_and_names() {
        assert_eq!(Stage::Planet.level(), log::Level::Info);
        assert_eq!(Stage::Mesh.level(), log::Level::Info);
        assert_eq!(Stage::Heat.level(), log::Level::Debug);
        assert_eq!(Stage::Relaxation.to_string(), "mesh relaxation");
        assert_eq!(Stage::Moisture.to_string(), "moisture");
    }

    #[test]
    fn test_stage_timer_measures() {
        let timer = StageTimer::start(Stage::Plates);
        assert_eq!(timer.stage, Stage::Plates);
        let first = timer.elapsed();
        assert!(timer.elapsed() >= first);
        drop(timer);
    }
}
