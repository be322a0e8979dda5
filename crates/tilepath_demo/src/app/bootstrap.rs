use std::path::PathBuf;

use tilepath::{LevelError, LevelFile};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::loop_runner::LoopConfig;
use super::DemoMode;

pub(crate) const CONFIG_ENV_VAR: &str = "TILEPATH_CONFIG";
pub(crate) const LEVEL_ENV_VAR: &str = "TILEPATH_LEVEL";
pub(crate) const MODE_ENV_VAR: &str = "TILEPATH_DEMO_MODE";
pub(crate) const TICKS_ENV_VAR: &str = "TILEPATH_TICKS";
pub(crate) const SEED_ENV_VAR: &str = "TILEPATH_SEED";

const DEFAULT_LEVEL_JSON: &str = include_str!("../../assets/default_level.json");
const DEFAULT_SEED: u64 = 0x7115_9a7e;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LevelSource {
    Embedded,
    File(PathBuf),
}

impl LevelSource {
    pub(crate) fn load(&self) -> Result<LevelFile, LevelError> {
        match self {
            Self::Embedded => LevelFile::parse(DEFAULT_LEVEL_JSON),
            Self::File(path) => LevelFile::load(path),
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) level: LevelSource,
    pub(crate) mode: DemoMode,
    pub(crate) seed: u64,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== tilepath demo startup ===");

    let mode = parse_mode(env_value(MODE_ENV_VAR).as_deref());
    let defaults = LoopConfig::default();
    let loop_config = LoopConfig {
        max_ticks: parse_u64_or(
            env_value(TICKS_ENV_VAR).as_deref(),
            TICKS_ENV_VAR,
            defaults.max_ticks,
        ),
        ..defaults
    };
    let level = env_value(LEVEL_ENV_VAR)
        .map(|raw| LevelSource::File(PathBuf::from(raw)))
        .unwrap_or(LevelSource::Embedded);

    AppWiring {
        loop_config,
        config_path: env_value(CONFIG_ENV_VAR).map(PathBuf::from),
        level,
        mode,
        seed: parse_u64_or(env_value(SEED_ENV_VAR).as_deref(), SEED_ENV_VAR, DEFAULT_SEED),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_value(var: &'static str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_mode(raw: Option<&str>) -> DemoMode {
    let Some(raw) = raw else {
        return DemoMode::Chase;
    };
    DemoMode::parse(raw).unwrap_or_else(|| {
        warn!(
            var = MODE_ENV_VAR,
            value = raw,
            fallback = DemoMode::Chase.as_str(),
            "unknown_demo_mode"
        );
        DemoMode::Chase
    })
}

fn parse_u64_or(raw: Option<&str>, var: &'static str, fallback: u64) -> u64 {
    let Some(raw) = raw else {
        return fallback;
    };
    raw.parse().unwrap_or_else(|_| {
        warn!(var, value = raw, fallback, "invalid_numeric_env_var");
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_level_loads() {
        let level = LevelSource::Embedded.load().expect("embedded level");
        let layer = level.to_tile_layer().expect("layer");
        assert_eq!(layer.width(), 24);
        assert_eq!(layer.height(), 14);
    }

    #[test]
    fn missing_level_file_reports_read_error() {
        let source = LevelSource::File(PathBuf::from("/definitely/not/a/level.json"));
        assert!(matches!(source.load(), Err(LevelError::ReadFile { .. })));
    }

    #[test]
    fn mode_defaults_to_chase() {
        assert_eq!(parse_mode(None), DemoMode::Chase);
        assert_eq!(parse_mode(Some("stress")), DemoMode::Stress);
        assert_eq!(parse_mode(Some("fly")), DemoMode::Chase);
    }

    #[test]
    fn numeric_env_values_fall_back_when_invalid() {
        assert_eq!(parse_u64_or(None, TICKS_ENV_VAR, 600), 600);
        assert_eq!(parse_u64_or(Some("120"), TICKS_ENV_VAR, 600), 120);
        assert_eq!(parse_u64_or(Some("-3"), TICKS_ENV_VAR, 600), 600);
    }
}
