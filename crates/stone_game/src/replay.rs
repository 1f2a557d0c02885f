use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::Deserialize;
use stone_core::time::TimeState;

use crate::physics::PhysicsWorld;
use crate::session::{Session, SessionState};

/// A recorded stream of input events, one entry per host frame.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReplayFrame {
    #[serde(default)]
    pub keys_down: Vec<char>,
    #[serde(default)]
    pub keys_up: Vec<char>,
    #[serde(default)]
    pub mouse_down: Option<Vec2>,
    #[serde(default)]
    pub mouse_move: Option<Vec2>,
    /// Extra frames with no new events that follow this one.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayEvent {
    KeyDown(char),
    KeyUp(char),
    MouseDown(Vec2),
    MouseMove(Vec2),
}

impl ReplayFrame {
    fn events(&self) -> Vec<ReplayEvent> {
        let mut out = Vec::new();
        if let Some(p) = self.mouse_move {
            out.push(ReplayEvent::MouseMove(p));
        }
        out.extend(self.keys_down.iter().map(|&c| ReplayEvent::KeyDown(c)));
        out.extend(self.keys_up.iter().map(|&c| ReplayEvent::KeyUp(c)));
        if let Some(p) = self.mouse_down {
            out.push(ReplayEvent::MouseDown(p));
        }
        out
    }
}

impl ReplaySequence {
    /// Events per host frame, repeats unrolled. Events fire on the first
    /// frame of a repeated group only.
    pub fn expanded_events(&self) -> Vec<Vec<ReplayEvent>> {
        let mut out = Vec::new();
        for frame in &self.frames {
            out.push(frame.events());
            for _ in 1..frame.repeat.max(1) {
                out.push(Vec::new());
            }
        }
        out
    }

    /// Start the default level, run right for two seconds with a jump in
    /// the middle, then let go.
    pub fn demo() -> Self {
        Self {
            fixed_dt: default_dt(),
            frames: vec![
                ReplayFrame {
                    keys_down: vec![' '],
                    ..Default::default()
                },
                ReplayFrame {
                    keys_up: vec![' '],
                    keys_down: vec!['d'],
                    repeat: 60,
                    ..Default::default()
                },
                ReplayFrame {
                    keys_down: vec![' '],
                    repeat: 20,
                    ..Default::default()
                },
                ReplayFrame {
                    keys_up: vec![' '],
                    repeat: 40,
                    ..Default::default()
                },
                ReplayFrame {
                    keys_up: vec!['d'],
                    repeat: 30,
                    ..Default::default()
                },
            ],
        }
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

pub fn apply_event<W: PhysicsWorld>(session: &mut Session<W>, event: ReplayEvent) {
    match event {
        ReplayEvent::KeyDown(c) => session.key_down(c),
        ReplayEvent::KeyUp(c) => session.key_up(c),
        ReplayEvent::MouseDown(p) => session.mouse_down(p),
        ReplayEvent::MouseMove(p) => session.mouse_move(p),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub ticks: u64,
    pub final_state: SessionState,
    pub exited: bool,
}

/// Feed `replay` through `session`, one host frame of `fixed_dt` at a time,
/// stepping the simulation through `time`'s accumulator.
pub fn run_replay<W: PhysicsWorld>(
    session: &mut Session<W>,
    replay: &ReplaySequence,
    time: &mut TimeState,
) -> ReplaySummary {
    let mut frames = 0;
    for events in replay.expanded_events() {
        if session.exit_requested() {
            break;
        }
        frames += 1;
        for event in events {
            apply_event(session, event);
        }

        time.begin_frame(f64::from(replay.fixed_dt));
        while time.should_step() {
            session.tick(time.fixed_dt as f32);
        }
        time.end_frame();

        for cue in session.drain_audio() {
            log::debug!("Audio: {cue:?}");
        }
    }

    ReplaySummary {
        frames,
        ticks: time.fixed_step_count,
        final_state: session.state(),
        exited: session.exit_requested(),
    }
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}
