//! Typed level description filled in by the script host, and the geometry
//! commands scripts emit.
//!
//! Scripts never touch the physics world. Factory calls are recorded as
//! [`GeometryCommand`]s and applied by the session, either when the world
//! is built or right after the per-tick step callback.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::collision::CategoryBits;
use crate::physics::{BodyDef, BodyId, FixtureDef, PhysicsWorld, Shape};
use crate::session::SessionState;

pub const DEFAULT_CHARACTER: &str = "Alex";
pub const DEFAULT_VIEWPORT_MAXIMUM_X: f32 = 30.0;

/// Single-character key bindings a level may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlBindings {
    pub jump: char,
    pub right: char,
    pub left: char,
    pub invincibility: char,
    pub uncollidable: char,
    /// No default: only active when a level or settings script binds it.
    pub slow_down: Option<char>,
}

impl Default for ControlBindings {
    fn default() -> Self {
        Self {
            jump: ' ',
            right: 'd',
            left: 'a',
            invincibility: 's',
            uncollidable: 'e',
            slow_down: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicTrack {
    pub path: String,
    pub looping: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub path: String,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// Flat list of `x, y, w, h` groups telling the renderer where to stamp a
/// tile image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub values: Vec<f32>,
    /// Length was not a multiple of four. The list is kept anyway.
    pub malformed: bool,
}

impl DrawList {
    pub fn new(values: Vec<f32>) -> Self {
        let malformed = values.len() % 4 != 0;
        Self { values, malformed }
    }

    /// Complete `[x, y, w, h]` groups; a trailing partial group is ignored.
    pub fn quads(&self) -> impl Iterator<Item = [f32; 4]> + '_ {
        self.values
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub image: ImageRef,
    pub draw_list: Option<DrawList>,
}

/// Where the session goes after the player reaches the win altitude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostWinTarget {
    State(SessionState),
    /// Load this level file and show its intro.
    Level(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryCommand {
    Edge { a: Vec2, b: Vec2, frictionless: bool },
    /// Axis-aligned box anchored at its lower-left corner.
    Box { origin: Vec2, size: Vec2 },
    /// `half_extents` is taken as given; the requested y is ignored and the
    /// piece is dropped from above the player.
    Debris { x: f32, half_extents: Vec2 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelDescription {
    /// Script file the level was loaded from.
    pub name: String,
    pub bindings: ControlBindings,
    pub character: String,
    pub viewport_maximum_x: f32,
    pub music: Option<MusicTrack>,
    pub background: Option<ImageRef>,
    pub intro_image: Option<String>,
    pub tiles: Vec<TileLayer>,
    /// Factory calls made while the scripts ran.
    pub geometry: Vec<GeometryCommand>,
    pub post_win: Option<PostWinTarget>,
}

impl LevelDescription {
    /// Everything at its documented default.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: ControlBindings::default(),
            character: DEFAULT_CHARACTER.to_string(),
            viewport_maximum_x: DEFAULT_VIEWPORT_MAXIMUM_X,
            music: None,
            background: None,
            intro_image: None,
            tiles: Vec::new(),
            geometry: Vec::new(),
            post_win: None,
        }
    }

    pub fn death_sound_path(&self) -> String {
        format!("common/{}death.mp3", self.character)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebrisConfig {
    /// Height above the player at which debris appears.
    pub spawn_height: f32,
    pub density: f32,
    pub friction: f32,
    /// Seed for the rotation of spawned debris.
    pub seed: u64,
    /// Debris that falls below this altitude is removed from the world.
    pub cull_below: f32,
}

impl Default for DebrisConfig {
    fn default() -> Self {
        Self {
            spawn_height: 30.0,
            density: 1.0,
            friction: 0.4,
            seed: 0x5EED,
            cull_below: -20.0,
        }
    }
}

/// Apply one factory call. Boundary geometry is attached to `ground`;
/// debris gets a body of its own, which is returned.
pub fn apply_geometry<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    ground: BodyId,
    command: GeometryCommand,
    player_y: f32,
    rng: &mut Pcg32,
    debris: &DebrisConfig,
) -> Option<BodyId> {
    match command {
        GeometryCommand::Edge { a, b, frictionless } => {
            let mut def = FixtureDef::new(Shape::Edge { a, b }, CategoryBits::BOUNDARY);
            if frictionless {
                def.friction = 0.0;
            }
            if world.create_fixture(ground, def).is_none() {
                log::warn!("Ground body missing; dropped edge {a} -> {b}");
            }
            None
        }
        GeometryCommand::Box { origin, size } => {
            let half = size * 0.5;
            let def = FixtureDef::new(
                Shape::Box {
                    half_extents: half,
                    center: origin + half,
                },
                CategoryBits::BOUNDARY,
            );
            if world.create_fixture(ground, def).is_none() {
                log::warn!("Ground body missing; dropped box at {origin}");
            }
            None
        }
        GeometryCommand::Debris { x, half_extents } => {
            let angle = rng.random::<f32>() * std::f32::consts::TAU;
            let body = world.create_body(BodyDef {
                angle,
                ..BodyDef::dynamic(Vec2::new(x, player_y + debris.spawn_height))
            });
            world.create_fixture(
                body,
                FixtureDef::new(
                    Shape::Box {
                        half_extents,
                        center: Vec2::ZERO,
                    },
                    CategoryBits::DEBRIS,
                )
                .with_density(debris.density)
                .with_friction(debris.friction),
            )?;
            log::debug!("Debris spawned at x={x:.2}");
            Some(body)
        }
    }
}

/// Destroy debris bodies that fell below `cull_below` (or vanished) and
/// drop them from `debris`. Returns how many were removed.
pub fn cull_fallen_debris<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    debris: &mut Vec<BodyId>,
    cull_below: f32,
) -> usize {
    let before = debris.len();
    debris.retain(|&body| match world.position(body) {
        Some(pos) if pos.y >= cull_below => true,
        _ => {
            world.destroy_body(body);
            false
        }
    });
    let removed = before - debris.len();
    if removed > 0 {
        log::debug!("Culled {removed} fallen debris");
    }
    removed
}
