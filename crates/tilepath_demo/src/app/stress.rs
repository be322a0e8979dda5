use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilepath::{CellBounds, GridModel, Path, Pathfinder, RequesterId, Vec2};
use tracing::{debug, info};

use super::DemoScene;

pub(crate) const DEFAULT_TEST_PATH_COUNT: u32 = 1_000;
pub(crate) const DEFAULT_MAX_PER_TICK: u32 = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct StressTally {
    found: u32,
    failed: u32,
    waypoints: u64,
    longest: usize,
}

impl StressTally {
    fn record(&mut self, path: Option<Path>) {
        match path {
            Some(path) => {
                self.found += 1;
                self.waypoints += path.len() as u64;
                self.longest = self.longest.max(path.len());
            }
            None => {
                self.failed += 1;
                debug!("stress_path_failed");
            }
        }
    }

    fn delivered(&self) -> u32 {
        self.found + self.failed
    }
}

/// Fires random requests anywhere inside the grid bounds, a few per tick,
/// each from a throwaway requester.
pub(crate) struct StressScene {
    rng: StdRng,
    bounds: CellBounds,
    test_path_count: u32,
    max_per_tick: u32,
    fired: u32,
    tally: Rc<RefCell<StressTally>>,
}

impl StressScene {
    pub(crate) fn new(grid: &GridModel, seed: u64, test_path_count: u32, max_per_tick: u32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            bounds: grid.bounds(),
            test_path_count,
            max_per_tick: max_per_tick.max(1),
            fired: 0,
            tally: Rc::default(),
        }
    }

    fn random_position(&mut self) -> Vec2 {
        let bounds = self.bounds;
        Vec2::new(
            self.rng.gen_range(bounds.min.x as f32..bounds.max.x as f32),
            self.rng.gen_range(bounds.min.y as f32..bounds.max.y as f32),
        )
    }
}

impl DemoScene for StressScene {
    fn name(&self) -> &'static str {
        "stress"
    }

    fn tick(&mut self, pathfinder: &mut Pathfinder, _fixed_dt_seconds: f32) {
        let batch = self
            .max_per_tick
            .min(self.test_path_count.saturating_sub(self.fired));
        for _ in 0..batch {
            let start = self.random_position();
            let end = self.random_position();
            let tally = Rc::clone(&self.tally);
            pathfinder.find_path(start, end, RequesterId(u64::from(self.fired)), move |path| {
                tally.borrow_mut().record(path);
            });
            self.fired += 1;
        }
    }

    fn is_finished(&self) -> bool {
        self.fired >= self.test_path_count
            && self.tally.borrow().delivered() >= self.test_path_count
    }

    fn report(&self) {
        let tally = self.tally.borrow();
        let average_waypoints = if tally.found == 0 {
            0.0
        } else {
            tally.waypoints as f64 / f64::from(tally.found)
        };
        info!(
            fired = self.fired,
            found = tally.found,
            failed = tally.failed,
            outstanding = self.fired.saturating_sub(tally.delivered()),
            average_waypoints,
            longest_path = tally.longest,
            "stress_summary"
        );
    }
}
