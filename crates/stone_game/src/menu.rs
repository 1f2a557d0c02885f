//! Script-declared UI buttons and their hit testing.

use glam::Vec2;

use crate::session::SessionState;

/// Script id of the exit sentinel.
pub const EXIT_ID: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTarget {
    State(SessionState),
    Exit,
}

impl ButtonTarget {
    pub fn from_id(id: i64) -> Option<Self> {
        if id == EXIT_ID {
            Some(Self::Exit)
        } else {
            SessionState::from_id(id).map(Self::State)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    /// Lower-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub standard_image: String,
    pub hover_image: String,
    pub target: ButtonTarget,
    pub visible_in: Vec<SessionState>,
}

impl Button {
    pub fn is_visible_in(&self, state: SessionState) -> bool {
        self.visible_in.contains(&state)
    }

    /// Strict containment: a click on the border misses.
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.position + self.size;
        point.x > self.position.x && point.x < max.x && point.y > self.position.y && point.y < max.y
    }

    /// Image to draw given the current pointer position.
    pub fn image_for(&self, pointer: Vec2) -> &str {
        if self.contains(pointer) {
            &self.hover_image
        } else {
            &self.standard_image
        }
    }
}

/// First visible button under `point`, in declaration order.
pub fn hit_test(buttons: &[Button], state: SessionState, point: Vec2) -> Option<ButtonTarget> {
    buttons
        .iter()
        .find(|b| b.is_visible_in(state) && b.contains(point))
        .map(|b| b.target)
}
