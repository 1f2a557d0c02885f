//! Tunables for one run of the game, loaded from JSON.
//!
//! Every field has a default so an empty object (or no file at all) gives the
//! stock game. Values are checked after parsing; a config that parses but
//! cannot drive a session is rejected as a whole.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerConfig;
use crate::grounding::DEFAULT_WIN_ALTITUDE;
use crate::lethality::DEFAULT_LETHAL_IMPULSE;
use crate::level::DebrisConfig;
use crate::physics::PhysicsSettings;
use crate::player::PlayerConfig;
use crate::viewport::CameraConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec2,
    /// Simulation ticks per second.
    pub hz: f32,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -30.0),
            hz: 60.0,
            velocity_iterations: 8,
            position_iterations: 3,
        }
    }
}

impl PhysicsConfig {
    pub fn settings(&self) -> PhysicsSettings {
        PhysicsSettings {
            gravity: self.gravity,
        }
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.hz
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub win_altitude: f32,
    /// Strictly greater impulses kill.
    pub lethality_impulse: f32,
    /// Physics step divisor while slow motion is toggled on.
    pub slowdown_factor: f32,
    pub invincibility_decay_per_tick: f32,
    pub blink_interval_ticks: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            win_altitude: DEFAULT_WIN_ALTITUDE,
            lethality_impulse: DEFAULT_LETHAL_IMPULSE,
            slowdown_factor: 50.0,
            invincibility_decay_per_tick: 0.2,
            blink_interval_ticks: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub script_root: PathBuf,
    pub menu_script: String,
    pub settings_script: String,
    /// Level loaded whenever the session returns to the main menu.
    pub default_level: String,
    pub menu_music: String,
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,
    pub camera: CameraConfig,
    pub player: PlayerConfig,
    pub controller: ControllerConfig,
    pub debris: DebrisConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            script_root: PathBuf::from("assets/scripts"),
            menu_script: "Menu.lua".to_string(),
            settings_script: "Settings.lua".to_string(),
            default_level: "TrainingLevel.lua".to_string(),
            menu_music: "title/music.mp3".to_string(),
            physics: PhysicsConfig::default(),
            rules: RulesConfig::default(),
            camera: CameraConfig::default(),
            player: PlayerConfig::default(),
            controller: ControllerConfig::default(),
            debris: DebrisConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn menu_script_path(&self) -> PathBuf {
        self.script_root.join(&self.menu_script)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: GameConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &GameConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

    if !(config.physics.hz > 0.0) {
        return invalid("physics.hz must be > 0");
    }
    if config.physics.velocity_iterations == 0 {
        return invalid("physics.velocity_iterations must be > 0");
    }
    if !(config.rules.slowdown_factor >= 1.0) {
        return invalid("rules.slowdown_factor must be >= 1");
    }
    if config.rules.lethality_impulse < 0.0 {
        return invalid("rules.lethality_impulse must be >= 0");
    }
    if config.rules.invincibility_decay_per_tick < 0.0 {
        return invalid("rules.invincibility_decay_per_tick must be >= 0");
    }
    if !(config.camera.damping > 0.0 && config.camera.damping <= 1.0) {
        return invalid("camera.damping must be in (0, 1]");
    }
    if config.camera.viewport_width <= 0.0 {
        return invalid("camera.viewport_width must be > 0");
    }
    if config.player.half_extents.x <= 0.0
        || config.player.half_extents.y <= 0.0
        || config.player.feet_half_height <= 0.0
    {
        return invalid("player extents must be > 0");
    }
    if config.controller.max_run_speed <= 0.0 {
        return invalid("controller.max_run_speed must be > 0");
    }
    if config.menu_script.is_empty() || config.default_level.is_empty() {
        return invalid("menu_script and default_level must be set");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stone_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn empty_object_gives_stock_game() {
        let path = temp_file_path("empty");
        fs::write(&path, "{}").expect("write config");
        let config = load_config_from_path(&path).expect("config should load");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.rules.win_altitude, 60.0);
        assert_eq!(config.rules.lethality_impulse, 40.0);
        assert_eq!(config.camera.damping, 0.2);
        assert_eq!(config.default_level, "TrainingLevel.lua");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let path = temp_file_path("partial");
        fs::write(
            &path,
            r#"{
              "script_root": "levels",
              "physics": { "hz": 120 },
              "rules": { "win_altitude": 80.5 },
              "debris": { "seed": 42 }
            }"#,
        )
        .expect("write config");
        let config = load_config_from_path(&path).expect("config should load");
        assert_eq!(config.script_root, PathBuf::from("levels"));
        assert_eq!(config.physics.hz, 120.0);
        assert_eq!(config.physics.velocity_iterations, 8);
        assert_eq!(config.rules.win_altitude, 80.5);
        assert_eq!(config.rules.lethality_impulse, 40.0);
        assert_eq!(config.debris.seed, 42);
        assert_eq!(config.debris.spawn_height, 30.0);
        assert_eq!(config.menu_script_path(), PathBuf::from("levels/Menu.lua"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_zero_hz() {
        let path = temp_file_path("zero_hz");
        fs::write(&path, r#"{ "physics": { "hz": 0 } }"#).expect("write config");
        let err = load_config_from_path(&path).expect_err("zero hz must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("physics.hz"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_bad_json_and_missing_files() {
        let path = temp_file_path("bad_json");
        fs::write(&path, "{ not json").expect("write config");
        assert!(matches!(
            load_config_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
        let _ = fs::remove_file(&path);

        assert!(matches!(
            load_config_from_path(&path),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn validation_catches_out_of_range_values() {
        let mut config = GameConfig::default();
        config.camera.damping = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = GameConfig::default();
        config.rules.slowdown_factor = 0.5;
        assert!(validate_config(&config).is_err());

        let mut config = GameConfig::default();
        config.player.feet_half_height = 0.0;
        assert!(validate_config(&config).is_err());

        assert!(validate_config(&GameConfig::default()).is_ok());
    }

    #[test]
    fn tick_length_follows_hz() {
        let physics = PhysicsConfig::default();
        assert!((physics.tick_seconds() - 1.0 / 60.0).abs() < 1e-7);
        assert_eq!(physics.settings().gravity, Vec2::new(0.0, -30.0));
    }
}
