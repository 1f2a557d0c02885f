//! Character animation clips and the player's animation playback.

use stone_core::animation::{AnimationClip, AnimationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnimationKind {
    #[default]
    Idle,
    Run,
    Jump,
}

impl AnimationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Jump => "jump",
        }
    }
}

impl std::fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The three looping clips every character ships with.
#[derive(Debug, Clone)]
pub struct CharacterClips {
    pub character: String,
    idle: AnimationClip,
    run: AnimationClip,
    jump: AnimationClip,
}

impl CharacterClips {
    /// Frame images live under `<character>/<clip>/<n>.png`.
    pub fn for_character(character: &str) -> Self {
        let frame = |clip: &str, n: u32| format!("{character}/{clip}/{n}.png");

        // Idle reuses its first image between the two blink frames.
        let idle = AnimationClip::from_tick_counts(
            [
                (frame("idle", 1), 8),
                (frame("idle", 2), 30),
                (frame("idle", 1), 8),
                (frame("idle", 3), 30),
            ],
            true,
        );
        let run = AnimationClip::from_tick_counts(
            (1..=8).map(|n| (frame("run", n), if n % 4 == 0 { 7 } else { 5 })),
            true,
        );
        let jump = AnimationClip::from_tick_counts((1..=5).map(|n| (frame("jump", n), 10)), true);

        Self {
            character: character.to_string(),
            idle,
            run,
            jump,
        }
    }

    pub fn clip(&self, kind: AnimationKind) -> &AnimationClip {
        match kind {
            AnimationKind::Idle => &self.idle,
            AnimationKind::Run => &self.run,
            AnimationKind::Jump => &self.jump,
        }
    }
}

fn seconds_to_us(dt: f32) -> u64 {
    (f64::from(dt.max(0.0)) * 1_000_000.0).round() as u64
}

/// Plays whichever clip the controller selected, restarting on a switch.
#[derive(Debug, Clone)]
pub struct PlayerAnimator {
    clips: CharacterClips,
    active: AnimationKind,
    state: AnimationState,
}

impl PlayerAnimator {
    pub fn new(clips: CharacterClips) -> Self {
        Self {
            clips,
            active: AnimationKind::Idle,
            state: AnimationState::new(),
        }
    }

    /// Advance one simulation tick of `dt` seconds with `kind` as the
    /// desired clip.
    pub fn tick(&mut self, kind: AnimationKind, dt: f32) {
        if kind != self.active {
            self.active = kind;
            self.state.reset();
        }
        self.state.tick(seconds_to_us(dt), self.clips.clip(kind));
    }

    pub fn active(&self) -> AnimationKind {
        self.active
    }

    pub fn sprite(&self) -> &str {
        self.state.current_sprite(self.clips.clip(self.active))
    }

    /// Normalized playback position of the active clip.
    pub fn progress(&self) -> f32 {
        self.state.progress(self.clips.clip(self.active))
    }
}
