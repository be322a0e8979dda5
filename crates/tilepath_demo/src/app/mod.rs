pub(crate) mod bootstrap;
mod chase;
pub(crate) mod loop_runner;
mod stress;

use tilepath::{CellCoord, GridModel, Pathfinder};

/// A headless scenario driven by the fixed-timestep loop.
pub(crate) trait DemoScene {
    fn name(&self) -> &'static str;
    /// Runs once per simulation tick, after the pathfinder delivered results.
    fn tick(&mut self, pathfinder: &mut Pathfinder, fixed_dt_seconds: f32);
    fn is_finished(&self) -> bool {
        false
    }
    fn report(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DemoMode {
    Chase,
    Stress,
}

impl DemoMode {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "chase" => Some(Self::Chase),
            "stress" => Some(Self::Stress),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Chase => "chase",
            Self::Stress => "stress",
        }
    }

    pub(crate) fn build_scene(self, grid: &GridModel, seed: u64) -> Box<dyn DemoScene> {
        match self {
            Self::Chase => Box::new(chase::ChaseScene::new(grid, seed)),
            Self::Stress => Box::new(stress::StressScene::new(
                grid,
                seed,
                stress::DEFAULT_TEST_PATH_COUNT,
                stress::DEFAULT_MAX_PER_TICK,
            )),
        }
    }
}

fn walkable_cells(grid: &GridModel) -> Vec<CellCoord> {
    grid.bounds()
        .cells()
        .filter(|cell| grid.is_walkable(*cell))
        .collect()
}
