use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tilepath::{ConfigError, LevelError, Pathfinder, PathfinderConfig, PathfinderError};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;
use super::DemoScene;

#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    pub(crate) max_frame_delta: Duration,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) stats_log_interval: Duration,
    pub(crate) max_ticks: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            stats_log_interval: Duration::from_secs(1),
            max_ticks: 600,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum DemoError {
    #[error("failed to load pathfinder config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load level: {0}")]
    Level(#[from] LevelError),
    #[error("failed to start pathfinder: {0}")]
    Pathfinder(#[from] PathfinderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_demo(app) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_demo(app: AppWiring) -> Result<(), DemoError> {
    let config = match &app.config_path {
        Some(path) => PathfinderConfig::load(path)?,
        None => PathfinderConfig::default(),
    };
    let layer = app.level.load()?.to_tile_layer()?;
    let mut pathfinder = Pathfinder::from_source(&layer, config)?;
    let mut scene = app.mode.build_scene(pathfinder.grid(), app.seed);

    info!(
        mode = app.mode.as_str(),
        scene = scene.name(),
        seed = app.seed,
        width = layer.width(),
        height = layer.height(),
        max_ticks = app.loop_config.max_ticks,
        "demo_started"
    );

    let ticks = run_loop(&app.loop_config, &mut pathfinder, scene.as_mut());
    pathfinder.shutdown();

    scene.report();
    log_stats(&pathfinder, ticks);
    Ok(())
}

fn run_loop(config: &LoopConfig, pathfinder: &mut Pathfinder, scene: &mut dyn DemoScene) -> u64 {
    let fixed_dt = Duration::from_secs_f64(1.0 / f64::from(config.target_tps.max(1)));
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let stats_interval =
        normalize_non_zero_duration(config.stats_log_interval, Duration::from_secs(1));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);

    let mut accumulator = Duration::ZERO;
    let mut previous = Instant::now();
    let mut last_stats = previous;
    let mut ticks = 0u64;

    while ticks < config.max_ticks && !scene.is_finished() {
        let frame_start = Instant::now();
        let frame_dt = clamp_frame_delta(
            frame_start.saturating_duration_since(previous),
            max_frame_delta,
        );
        previous = frame_start;
        accumulator = accumulator.saturating_add(frame_dt);

        let plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        accumulator = plan.remaining_accumulator;
        if !plan.dropped_backlog.is_zero() {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                "sim_backlog_dropped"
            );
        }

        for _ in 0..plan.ticks_to_run {
            pathfinder.update();
            scene.tick(pathfinder, fixed_dt_seconds);
            ticks += 1;
            if ticks >= config.max_ticks || scene.is_finished() {
                break;
            }
        }

        if frame_start.saturating_duration_since(last_stats) >= stats_interval {
            log_stats(pathfinder, ticks);
            last_stats = frame_start;
        }

        thread::sleep(fixed_dt.saturating_sub(frame_start.elapsed()));
    }

    pathfinder.update();
    ticks
}

fn log_stats(pathfinder: &Pathfinder, ticks: u64) {
    let stats = pathfinder.stats();
    info!(
        ticks,
        requests = stats.requests_submitted,
        trivial = stats.trivial_requests,
        cache_hits = stats.cache_hits,
        cancelled = stats.requests_cancelled,
        searches_started = stats.searches_started,
        found = stats.searches_found,
        no_path = stats.searches_no_path,
        timed_out = stats.searches_timed_out,
        delivered = stats.results_delivered,
        discarded = stats.results_discarded,
        cached_paths = pathfinder.cached_paths(),
        "pathfinder_stats"
    );
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };

    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use tilepath::{GridModel, TileDescriptor, TileLayer, TilePalette};

    use super::*;

    struct CountingScene {
        ticks: u32,
        finish_after: u32,
    }

    impl DemoScene for CountingScene {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn tick(&mut self, _pathfinder: &mut Pathfinder, _fixed_dt_seconds: f32) {
            self.ticks += 1;
        }

        fn is_finished(&self) -> bool {
            self.ticks >= self.finish_after
        }

        fn report(&self) {}
    }

    fn tiny_pathfinder() -> Pathfinder {
        let palette = TilePalette::new().with_tile(1, TileDescriptor::default());
        let grid = GridModel::from_source(&TileLayer::filled(2, 2, 1, palette)).expect("grid");
        Pathfinder::new(grid, PathfinderConfig::default()).expect("pathfinder")
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(10), max_frame_delta),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_durations_fall_back() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn run_loop_stops_at_tick_limit() {
        let config = LoopConfig {
            target_tps: 500,
            max_ticks: 12,
            ..LoopConfig::default()
        };
        let mut pathfinder = tiny_pathfinder();
        let mut scene = CountingScene {
            ticks: 0,
            finish_after: u32::MAX,
        };

        assert_eq!(run_loop(&config, &mut pathfinder, &mut scene), 12);
        assert_eq!(scene.ticks, 12);
    }

    #[test]
    fn run_loop_stops_when_scene_finishes() {
        let config = LoopConfig {
            target_tps: 500,
            max_ticks: 10_000,
            ..LoopConfig::default()
        };
        let mut pathfinder = tiny_pathfinder();
        let mut scene = CountingScene {
            ticks: 0,
            finish_after: 4,
        };

        assert_eq!(run_loop(&config, &mut pathfinder, &mut scene), 4);
    }
}
