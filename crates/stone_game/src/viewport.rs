use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Fraction of the remaining distance covered each tick.
    pub damping: f32,
    /// Where the player sits relative to the camera's lower-left corner.
    pub offset: Vec2,
    pub viewport_width: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            damping: 0.2,
            offset: Vec2::new(10.0, 10.0),
            viewport_width: 30.0,
        }
    }
}

/// Lower-left corner of the visible window, in world units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    pub position: Vec2,
}

impl Viewport {
    /// Ease toward `target`, keeping the window inside `[0, viewport_max_x]`.
    pub fn follow(&mut self, target: Vec2, viewport_max_x: f32, config: &CameraConfig) {
        let goal = target - config.offset;
        let eased = self.position - (self.position - goal) * config.damping;

        self.position.y = eased.y.max(0.0);
        self.position.x = eased
            .x
            .min(viewport_max_x - config.viewport_width)
            .max(0.0);
    }
}
