//! Frame-based sprite animation types and deterministic tick logic.
//!
//! Animation clips are sequences of sprite frames with per-frame durations.
//! All timing uses integer microseconds (`u64`) so advancement under the
//! fixed-timestep model never drifts.
//!
//! Character art is authored as "hold this image for N ticks"; clips built
//! with [`AnimationClip::from_tick_counts`] convert those counts into
//! microseconds once, at construction.

/// Duration of one 60 Hz tick in microseconds.
pub const TICK_US: u64 = 16_667;

/// A single frame in an animation clip.
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    pub sprite_id: String,
    pub duration_us: u64,
}

/// A named sequence of frames that can loop or play once.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub frames: Vec<AnimationFrame>,
    pub looping: bool,
}

impl AnimationClip {
    /// Build a clip from `(sprite_id, ticks)` pairs.
    pub fn from_tick_counts<S: Into<String>>(
        frames: impl IntoIterator<Item = (S, u32)>,
        looping: bool,
    ) -> Self {
        Self {
            frames: frames
                .into_iter()
                .map(|(sprite_id, ticks)| AnimationFrame {
                    sprite_id: sprite_id.into(),
                    duration_us: u64::from(ticks.max(1)) * TICK_US,
                })
                .collect(),
            looping,
        }
    }

    /// Total duration of one full cycle in microseconds.
    pub fn total_duration_us(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_us).sum()
    }
}

/// Runtime state for one active animation instance.
#[derive(Debug, Clone, Default)]
pub struct AnimationState {
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub finished: bool,
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the animation by `dt_us` microseconds. Returns the current frame's
    /// `sprite_id`. Uses integer arithmetic only for determinism.
    pub fn tick<'a>(&mut self, dt_us: u64, clip: &'a AnimationClip) -> &'a str {
        if clip.frames.is_empty() || self.finished {
            return self.current_sprite(clip);
        }

        self.elapsed_us += dt_us;

        loop {
            let current_frame = &clip.frames[self.frame_index];
            if self.elapsed_us < current_frame.duration_us {
                break;
            }

            self.elapsed_us -= current_frame.duration_us;
            self.frame_index += 1;

            if self.frame_index >= clip.frames.len() {
                if clip.looping {
                    self.frame_index = 0;
                } else {
                    self.frame_index = clip.frames.len() - 1;
                    self.elapsed_us = 0;
                    self.finished = true;
                    break;
                }
            }
        }

        &clip.frames[self.frame_index].sprite_id
    }

    pub fn current_sprite<'a>(&self, clip: &'a AnimationClip) -> &'a str {
        if let Some(frame) = clip.frames.get(self.frame_index) {
            &frame.sprite_id
        } else if let Some(frame) = clip.frames.last() {
            &frame.sprite_id
        } else {
            ""
        }
    }

    /// Normalized playback position within one cycle, in `[0, 1]`.
    pub fn progress(&self, clip: &AnimationClip) -> f32 {
        let total = clip.total_duration_us();
        if total == 0 {
            return 0.0;
        }
        if self.finished {
            return 1.0;
        }
        let played: u64 = clip
            .frames
            .iter()
            .take(self.frame_index)
            .map(|f| f.duration_us)
            .sum::<u64>()
            + self.elapsed_us;
        (played as f64 / total as f64).clamp(0.0, 1.0) as f32
    }
}
