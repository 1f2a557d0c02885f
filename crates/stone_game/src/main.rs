//! Stepstone headless runner.
//!
//! Builds a rapier-backed session, starts the configured level and feeds a
//! replay of input events through the fixed-timestep accumulator:
//!
//!   1. apply the frame's key and mouse events
//!   2. `begin_frame()` with the replay's frame length
//!   3. `while should_step()` advance the session one tick
//!
//! Transitions, level loads and teardown are logged; set `RUST_LOG=debug`
//! for per-tick detail and audio cues.

use std::path::PathBuf;

use stone_core::time::TimeState;
use stone_game::config::{load_config_from_path, GameConfig};
use stone_game::physics::{PhysicsSettings, RapierWorld};
use stone_game::replay::{load_replay_from_path, run_replay, ReplaySequence};
use stone_game::session::{Session, SessionState};

const USAGE: &str = "usage: stepstone [--config <path>] [--replay <path>]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    replay: Option<PathBuf>,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => &mut parsed.config,
            "--replay" => &mut parsed.replay,
            other => return Err(format!("unknown argument '{other}'")),
        };
        let value = args
            .next()
            .ok_or_else(|| format!("{arg} needs a path"))?;
        *slot = Some(PathBuf::from(value));
    }
    Ok(parsed)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Stepstone starting...");

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => match load_config_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => GameConfig::default(),
    };

    let replay = match &args.replay {
        Some(path) => match load_replay_from_path(path) {
            Ok(replay) => replay,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => {
            log::info!("No replay given; running the built-in demo");
            ReplaySequence::demo()
        }
    };

    let mut time = TimeState::new(f64::from(config.physics.hz));
    let mut session = Session::with_menu_script(
        config,
        Box::new(|settings: &PhysicsSettings| RapierWorld::new(settings)),
    );
    session.transition(SessionState::Intro);

    let summary = run_replay(&mut session, &replay, &mut time);
    log::info!(
        "Replay finished: {} frames, {} ticks, final state {}{}",
        summary.frames,
        summary.ticks,
        summary.final_state,
        if summary.exited { " (exit requested)" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_is_fine() {
        assert_eq!(args(&[]), Ok(Args::default()));
    }

    #[test]
    fn both_paths_parse() {
        let parsed = args(&["--replay", "r.json", "--config", "c.json"]).expect("parse");
        assert_eq!(parsed.config, Some(PathBuf::from("c.json")));
        assert_eq!(parsed.replay, Some(PathBuf::from("r.json")));
    }

    #[test]
    fn missing_value_and_unknown_flags_fail() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--fullscreen"]).is_err());
    }
}
