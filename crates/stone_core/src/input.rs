//! Input state tracking with both edge-triggered and level-triggered queries.
//!
//! Keys are identified by a single character, matching the input contract the
//! gameplay layer consumes: whatever produces events (a window, a replay file,
//! a test) maps its physical keys onto characters before calling in.
//!
//! - **Level-triggered (held):** `is_held(key)` returns true every tick the key
//!   is down. Movement and jump intent read this.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only until the next
//!   `end_frame()`. The owner calls `end_frame()` after a simulation tick has
//!   consumed them, so a press is never lost on a frame with zero ticks.

use std::collections::HashSet;

use glam::Vec2;

/// A key identified by the character it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(pub char);

impl Key {
    pub const ESCAPE: Key = Key('\u{1b}');
    pub const SPACE: Key = Key(' ');
    pub const RESTART: Key = Key('r');

    pub fn as_char(self) -> char {
        self.0
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Key(c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
    Right,
    Middle,
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,

    mouse_held: HashSet<MouseBtn>,
    mouse_just_pressed: HashSet<MouseBtn>,
    mouse_just_released: HashSet<MouseBtn>,

    /// Last reported mouse position in world coordinates.
    pub mouse_position: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
            mouse_held: HashSet::new(),
            mouse_just_pressed: HashSet::new(),
            mouse_just_released: HashSet::new(),
            mouse_position: Vec2::ZERO,
        }
    }

    /// Returns true if this was a fresh press (the key was not already held).
    pub fn key_down(&mut self, key: Key) -> bool {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
            true
        } else {
            false
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn mouse_down(&mut self, btn: MouseBtn, position: Vec2) {
        self.mouse_position = position;
        if self.mouse_held.insert(btn) {
            self.mouse_just_pressed.insert(btn);
        }
    }

    pub fn mouse_up(&mut self, btn: MouseBtn, position: Vec2) {
        self.mouse_position = position;
        if self.mouse_held.remove(&btn) {
            self.mouse_just_released.insert(btn);
        }
    }

    pub fn mouse_move(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    pub fn is_mouse_held(&self, btn: MouseBtn) -> bool {
        self.mouse_held.contains(&btn)
    }

    pub fn is_mouse_just_pressed(&self, btn: MouseBtn) -> bool {
        self.mouse_just_pressed.contains(&btn)
    }

    pub fn is_mouse_just_released(&self, btn: MouseBtn) -> bool {
        self.mouse_just_released.contains(&btn)
    }

    /// Drop every held key. Used when gameplay input bindings are torn down so
    /// a key held across a state change does not leak into the next session.
    pub fn release_all(&mut self) {
        self.held.clear();
        self.mouse_held.clear();
        self.end_frame();
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
        self.mouse_just_pressed.clear();
        self.mouse_just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
