use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tilepath::{CellCoord, GridModel, Path, PathFollower, Pathfinder, RequesterId, Vec2};
use tracing::{debug, info};

use super::{walkable_cells, DemoScene};

const CHASER_COUNT: usize = 4;
const CHASER_SPEED: f32 = 3.0;
const TARGET_SPEED: f32 = 2.0;
const ARRIVAL_THRESHOLD: f32 = 0.05;
const REPATH_INTERVAL_TICKS: u64 = 15;

type Inbox = Rc<RefCell<Option<Option<Path>>>>;

#[derive(Debug)]
struct Agent {
    requester: RequesterId,
    position: Vec2,
    speed: f32,
    follower: Option<PathFollower>,
    requested_goal: Option<Vec2>,
    inbox: Inbox,
    in_contact: bool,
}

impl Agent {
    fn new(requester: RequesterId, cell: CellCoord, speed: f32) -> Self {
        Self {
            requester,
            position: cell.center_world(),
            speed,
            follower: None,
            requested_goal: None,
            inbox: Inbox::default(),
            in_contact: false,
        }
    }

    fn cell(&self) -> CellCoord {
        CellCoord::from_world(self.position)
    }

    fn request_path(&mut self, pathfinder: &mut Pathfinder, goal: Vec2) {
        // Cache hits answer synchronously, so a stale queued request must not
        // be able to overwrite the inbox afterwards.
        pathfinder.cancel_object(self.requester);
        self.requested_goal = Some(goal);
        let inbox = Rc::clone(&self.inbox);
        pathfinder.find_path(self.position, goal, self.requester, move |path| {
            *inbox.borrow_mut() = Some(path);
        });
    }

    /// `Some(found)` when a requested path arrived since the last call.
    fn collect(&mut self) -> Option<bool> {
        let delivered = self.inbox.borrow_mut().take()?;
        let goal = self.requested_goal.take().unwrap_or(self.position);
        let Some(path) = delivered else {
            return Some(false);
        };
        match &mut self.follower {
            Some(follower) => follower.splice(path, goal),
            None => self.follower = Some(PathFollower::new(path, goal)),
        }
        Some(true)
    }

    fn walk(&mut self, fixed_dt_seconds: f32) {
        let Some(follower) = &mut self.follower else {
            return;
        };
        if let Some(goal) = follower.current_goal() {
            let (next, arrived) = step_toward(
                self.position,
                goal,
                self.speed,
                fixed_dt_seconds,
                ARRIVAL_THRESHOLD,
            );
            self.position = next;
            if arrived {
                follower.advance();
            }
        }
        if follower.is_finished() {
            self.follower = None;
        }
    }

    fn is_idle(&self) -> bool {
        self.follower.is_none() && self.requested_goal.is_none()
    }

    /// The chaser's route is stale when neither its queued request nor the
    /// path it is walking ends in `target_cell`.
    fn needs_repath(&self, pathfinder: &Pathfinder, target_cell: CellCoord) -> bool {
        match pathfinder.try_get_request(self.requester) {
            Some((_, end)) => end != target_cell,
            None => match &self.follower {
                Some(follower) => CellCoord::from_world(follower.end_goal()) != target_cell,
                None => true,
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ChaseTally {
    repaths: u64,
    paths_found: u64,
    paths_missing: u64,
    catches: u64,
}

/// Chasers repath towards a target that wanders between random floor cells.
pub(crate) struct ChaseScene {
    rng: StdRng,
    walkable: Vec<CellCoord>,
    target: Agent,
    chasers: Vec<Agent>,
    tick: u64,
    tally: ChaseTally,
}

impl ChaseScene {
    pub(crate) fn new(grid: &GridModel, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let walkable = walkable_cells(grid);
        let mut spawns: Vec<CellCoord> = walkable
            .choose_multiple(&mut rng, CHASER_COUNT + 1)
            .copied()
            .collect();
        let target_spawn = spawns.pop().unwrap_or_default();

        let chasers = spawns
            .into_iter()
            .enumerate()
            .map(|(index, cell)| Agent::new(RequesterId(index as u64 + 1), cell, CHASER_SPEED))
            .collect();

        Self {
            rng,
            walkable,
            target: Agent::new(RequesterId(0), target_spawn, TARGET_SPEED),
            chasers,
            tick: 0,
            tally: ChaseTally::default(),
        }
    }

    fn move_target(&mut self, pathfinder: &mut Pathfinder, fixed_dt_seconds: f32) {
        self.target.collect();
        if self.target.is_idle() {
            if let Some(goal) = self.walkable.choose(&mut self.rng) {
                self.target.request_path(pathfinder, goal.center_world());
            }
        }
        self.target.walk(fixed_dt_seconds);
    }
}

impl DemoScene for ChaseScene {
    fn name(&self) -> &'static str {
        "chase"
    }

    fn tick(&mut self, pathfinder: &mut Pathfinder, fixed_dt_seconds: f32) {
        self.tick += 1;
        self.move_target(pathfinder, fixed_dt_seconds);

        let target_cell = self.target.cell();
        let target_position = self.target.position;
        let repath_due = self.tick % REPATH_INTERVAL_TICKS == 0;

        for chaser in &mut self.chasers {
            match chaser.collect() {
                Some(true) => self.tally.paths_found += 1,
                Some(false) => self.tally.paths_missing += 1,
                None => {}
            }

            let touching = chaser.cell() == target_cell;
            if touching && !chaser.in_contact {
                self.tally.catches += 1;
                debug!(chaser = chaser.requester.0, tick = self.tick, "target_caught");
            }
            chaser.in_contact = touching;
            if touching {
                continue;
            }

            if repath_due && chaser.needs_repath(pathfinder, target_cell) {
                chaser.request_path(pathfinder, target_position);
                self.tally.repaths += 1;
            }
            chaser.walk(fixed_dt_seconds);
        }
    }

    fn report(&self) {
        info!(
            ticks = self.tick,
            chasers = self.chasers.len(),
            repaths = self.tally.repaths,
            paths_found = self.tally.paths_found,
            paths_missing = self.tally.paths_missing,
            catches = self.tally.catches,
            "chase_summary"
        );
    }
}

fn step_toward(
    current: Vec2,
    target: Vec2,
    speed: f32,
    fixed_dt_seconds: f32,
    arrival_threshold: f32,
) -> (Vec2, bool) {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    let distance_sq = dx * dx + dy * dy;
    if distance_sq <= arrival_threshold * arrival_threshold {
        return (target, true);
    }

    let distance = distance_sq.sqrt();
    let max_step = speed * fixed_dt_seconds;
    if max_step >= distance {
        return (target, true);
    }

    let scale = max_step / distance;
    (
        Vec2::new(current.x + dx * scale, current.y + dy * scale),
        false,
    )
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use tilepath::{PathfinderConfig, TileDescriptor, TileLayer, TilePalette};

    use super::*;

    fn open_pathfinder(size: u32) -> Pathfinder {
        let palette = TilePalette::new().with_tile(1, TileDescriptor::default());
        let layer = TileLayer::filled(size, size, 1, palette);
        let config = PathfinderConfig {
            idle_sleep_ms: 1,
            ..PathfinderConfig::default()
        };
        Pathfinder::from_source(&layer, config).expect("pathfinder")
    }

    #[test]
    fn step_toward_moves_by_speed_times_dt_without_overshoot() {
        let (next, arrived) = step_toward(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 2.0, 0.5, 0.1);
        assert!(!arrived);
        assert!((next.x - 1.0).abs() < 0.0001);
        assert!(next.y.abs() < 0.0001);

        let (next, arrived) = step_toward(Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.0), 2.0, 0.5, 0.1);
        assert!(arrived);
        assert_eq!(next, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn agent_walks_delivered_path_to_its_end() {
        let mut pathfinder = open_pathfinder(6);
        let mut agent = Agent::new(RequesterId(1), CellCoord::new(0, 0), 5.0);
        let goal = CellCoord::new(4, 2).center_world();
        agent.request_path(&mut pathfinder, goal);

        let deadline = Instant::now() + Duration::from_secs(5);
        while agent.collect().is_none() {
            assert!(Instant::now() < deadline, "no path delivered");
            pathfinder.update();
            thread::sleep(Duration::from_millis(1));
        }
        for _ in 0..200 {
            agent.walk(1.0 / 60.0);
        }

        assert!(agent.is_idle());
        assert_eq!(agent.cell(), CellCoord::new(4, 2));
    }

    #[test]
    fn chaser_repaths_only_when_target_cell_changes() {
        let mut pathfinder = open_pathfinder(6);
        let mut chaser = Agent::new(RequesterId(1), CellCoord::new(0, 0), 3.0);
        let target = CellCoord::new(5, 5);
        assert!(chaser.needs_repath(&pathfinder, target));

        chaser.request_path(&mut pathfinder, target.center_world());
        assert!(!chaser.needs_repath(&pathfinder, target));
        assert!(chaser.needs_repath(&pathfinder, CellCoord::new(5, 4)));
    }

    #[test]
    fn chase_scene_finds_paths_on_open_grid() {
        let mut pathfinder = open_pathfinder(10);
        let mut scene = ChaseScene::new(pathfinder.grid(), 7);
        assert_eq!(scene.chasers.len(), CHASER_COUNT);

        for _ in 0..240 {
            pathfinder.update();
            scene.tick(&mut pathfinder, 1.0 / 60.0);
            thread::sleep(Duration::from_millis(1));
        }

        assert!(scene.tally.repaths > 0);
        assert!(scene.tally.paths_found > 0);
    }
}
