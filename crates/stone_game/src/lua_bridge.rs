//! Lua host for level, settings and menu scripts.
//!
//! Design contract: scripts *declare* a level, they never own it. Loading
//! runs in two phases against a fresh Lua state:
//!
//! 1. Declare defaults: control keys, character, viewport width, nil
//!    placeholders for every optional asset, the session state constants and
//!    the `box2DFactory` object. The level script and then the settings
//!    script run against this namespace.
//! 2. Harvest: globals are read back through type-checked accessors into a
//!    [`LevelDescription`]. Anything missing or of the wrong type keeps its
//!    default. A global `step` function is retained for per-tick calls.
//!
//! Factory calls (`box2DFactory:createEdge(...)` and friends) only record
//! [`GeometryCommand`]s in the state's app data; the session applies them to
//! the physics world it owns.
//!
//! Script failures are never fatal: they are logged, the status is set to
//! [`ScriptStatus::Error`] and whatever defaults survived are used.

use std::path::{Path, PathBuf};

use glam::Vec2;
use mlua::prelude::*;

use crate::level::{
    DrawList, GeometryCommand, ImageRef, LevelDescription, MusicTrack, PostWinTarget, TileLayer,
    DEFAULT_CHARACTER, DEFAULT_VIEWPORT_MAXIMUM_X,
};
use crate::menu::{Button, ButtonTarget, EXIT_ID};
use crate::session::SessionState;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lua error in {path}: {source}")]
    Lua {
        path: PathBuf,
        #[source]
        source: LuaError,
    },
}

/// Outcome of the last load, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    Loaded,
    Error,
    Missing,
}

impl ScriptStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Loaded => "Lua: loaded",
            Self::Error => "Lua: ERROR",
            Self::Missing => "Lua: missing",
        }
    }
}

impl std::fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Globals nulled out before a level script runs.
const NIL_PLACEHOLDERS: &[&str] = &[
    "music",
    "musicLoop",
    "tile1ImageFile",
    "tile1ImageWidth",
    "tile1ImageHeight",
    "tile1ImageDrawList",
    "tile2ImageFile",
    "tile2ImageWidth",
    "tile2ImageHeight",
    "tile2ImageDrawList",
    "backgroundImageFile",
    "step",
    "afterWin",
];

/// Geometry recorded by factory calls since the last drain.
#[derive(Debug, Default)]
struct GeometryQueue(Vec<GeometryCommand>);

#[derive(Debug, Default)]
struct ButtonQueue(Vec<Button>);

fn push_geometry(lua: &Lua, command: GeometryCommand) -> LuaResult<()> {
    let mut queue = lua.app_data_mut::<GeometryQueue>().ok_or_else(|| {
        LuaError::RuntimeError("box2DFactory used outside a level load".to_string())
    })?;
    queue.0.push(command);
    Ok(())
}

/// The `box2DFactory` global. Stateless; everything goes to the queue.
struct GeometryFactory;

impl LuaUserData for GeometryFactory {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method(
            "createEdge",
            |lua, _, (x1, y1, x2, y2): (f32, f32, f32, f32)| {
                push_geometry(
                    lua,
                    GeometryCommand::Edge {
                        a: Vec2::new(x1, y1),
                        b: Vec2::new(x2, y2),
                        frictionless: false,
                    },
                )
            },
        );
        methods.add_method(
            "createFrictionlessEdge",
            |lua, _, (x1, y1, x2, y2): (f32, f32, f32, f32)| {
                push_geometry(
                    lua,
                    GeometryCommand::Edge {
                        a: Vec2::new(x1, y1),
                        b: Vec2::new(x2, y2),
                        frictionless: true,
                    },
                )
            },
        );
        methods.add_method("createBox", |lua, _, (x, y, w, h): (f32, f32, f32, f32)| {
            push_geometry(
                lua,
                GeometryCommand::Box {
                    origin: Vec2::new(x, y),
                    size: Vec2::new(w, h),
                },
            )
        });
        methods.add_method(
            "createDebris",
            |lua, _, (x, _y, w, h): (f32, f32, f32, f32)| {
                push_geometry(
                    lua,
                    GeometryCommand::Debris {
                        x,
                        half_extents: Vec2::new(w, h),
                    },
                )
            },
        );
    }
}

fn publish_state_constants(lua: &Lua) -> LuaResult<()> {
    let globals = lua.globals();
    for state in SessionState::ALL {
        globals.set(state.script_name(), state.id())?;
    }
    globals.set("EXIT", EXIT_ID)?;
    Ok(())
}

/// Phase one: populate the namespace a level script runs against.
fn declare_defaults(lua: &Lua) -> LuaResult<()> {
    lua.set_app_data(GeometryQueue::default());
    publish_state_constants(lua)?;

    let globals = lua.globals();
    globals.set("box2DFactory", GeometryFactory)?;

    globals.set("controlKeyJump", " ")?;
    globals.set("controlKeyRight", "d")?;
    globals.set("controlKeyLeft", "a")?;
    globals.set("controlKeyInvincibility", "s")?;
    globals.set("controlKeyUncollidable", "e")?;
    globals.set("character", DEFAULT_CHARACTER)?;
    globals.set("viewportMaximumX", DEFAULT_VIEWPORT_MAXIMUM_X)?;

    for name in NIL_PLACEHOLDERS {
        globals.set(*name, LuaValue::Nil)?;
    }
    Ok(())
}

/// Execute one script file in `lua`.
pub fn run_script(lua: &Lua, path: &Path) -> Result<(), ScriptError> {
    if !path.exists() {
        return Err(ScriptError::Missing(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    lua.load(source.as_str())
        .set_name(path.to_string_lossy())
        .exec()
        .map_err(|source| ScriptError::Lua {
            path: path.to_path_buf(),
            source,
        })
}

fn global_value(globals: &LuaTable, name: &str) -> LuaValue {
    globals.get::<LuaValue>(name).unwrap_or(LuaValue::Nil)
}

fn global_string(globals: &LuaTable, name: &str) -> Option<String> {
    match global_value(globals, name) {
        LuaValue::String(s) => Some(s.to_string_lossy().to_string()),
        _ => None,
    }
}

/// First character of a string global. Empty strings count as unset.
fn global_char(globals: &LuaTable, name: &str) -> Option<char> {
    global_string(globals, name).and_then(|s| s.chars().next())
}

fn global_number(globals: &LuaTable, name: &str) -> Option<f32> {
    match global_value(globals, name) {
        LuaValue::Number(n) => Some(n as f32),
        LuaValue::Integer(i) => Some(i as f32),
        _ => None,
    }
}

fn global_bool(globals: &LuaTable, name: &str) -> Option<bool> {
    match global_value(globals, name) {
        LuaValue::Boolean(b) => Some(b),
        _ => None,
    }
}

fn global_draw_list(globals: &LuaTable, name: &str) -> Option<DrawList> {
    let LuaValue::Table(table) = global_value(globals, name) else {
        return None;
    };
    match table.sequence_values::<f32>().collect::<LuaResult<Vec<f32>>>() {
        Ok(values) => {
            let list = DrawList::new(values);
            if list.malformed {
                log::warn!(
                    "{name} has {} entries, not a multiple of 4; trailing values are not drawn",
                    list.values.len()
                );
            }
            Some(list)
        }
        Err(err) => {
            log::warn!("{name} is not a list of numbers: {err}");
            None
        }
    }
}

fn global_image(globals: &LuaTable, prefix: &str) -> Option<ImageRef> {
    let path = global_string(globals, &format!("{prefix}File"))?;
    Some(ImageRef {
        path,
        width: global_number(globals, &format!("{prefix}Width")),
        height: global_number(globals, &format!("{prefix}Height")),
    })
}

fn global_post_win(globals: &LuaTable) -> Option<PostWinTarget> {
    let state_from = |id: i64| {
        let state = SessionState::from_id(id);
        if state.is_none() {
            log::warn!("afterWin names unknown state {id}");
        }
        state.map(PostWinTarget::State)
    };
    match global_value(globals, "afterWin") {
        LuaValue::Integer(id) => state_from(id),
        LuaValue::Number(n) if n.fract() == 0.0 => state_from(n as i64),
        LuaValue::String(s) => Some(PostWinTarget::Level(s.to_string_lossy().to_string())),
        LuaValue::Nil => None,
        other => {
            log::warn!("afterWin has unsupported type {}", other.type_name());
            None
        }
    }
}

/// Phase two: read the namespace back into a typed description.
fn harvest(lua: &Lua, name: &str) -> (LevelDescription, Option<LuaFunction>) {
    let globals = lua.globals();
    let mut level = LevelDescription::with_defaults(name);

    let bindings = &mut level.bindings;
    if let Some(c) = global_char(&globals, "controlKeyLeft") {
        bindings.left = c;
    }
    if let Some(c) = global_char(&globals, "controlKeyRight") {
        bindings.right = c;
    }
    if let Some(c) = global_char(&globals, "controlKeyJump") {
        bindings.jump = c;
    }
    if let Some(c) = global_char(&globals, "controlKeyInvincibility") {
        bindings.invincibility = c;
    }
    if let Some(c) = global_char(&globals, "controlKeyUncollidable") {
        bindings.uncollidable = c;
    }
    bindings.slow_down = global_char(&globals, "controlKeySlowDown");

    if let Some(character) = global_string(&globals, "character") {
        level.character = character;
    }
    if let Some(max_x) = global_number(&globals, "viewportMaximumX") {
        level.viewport_maximum_x = max_x;
    }

    level.music = global_string(&globals, "music").map(|path| MusicTrack {
        path,
        looping: global_bool(&globals, "musicLoop").unwrap_or(true),
    });
    level.background = global_image(&globals, "backgroundImage");
    level.intro_image = global_string(&globals, "introImageFile");

    for n in 1..=2 {
        let prefix = format!("tile{n}Image");
        if let Some(image) = global_image(&globals, &prefix) {
            level.tiles.push(TileLayer {
                image,
                draw_list: global_draw_list(&globals, &format!("{prefix}DrawList")),
            });
        }
    }

    level.post_win = global_post_win(&globals);

    let step = match global_value(&globals, "step") {
        LuaValue::Function(f) => Some(f),
        _ => None,
    };
    (level, step)
}

/// A loaded level's Lua state, kept alive for the step callback.
pub struct LevelScript {
    lua: Lua,
    step: Option<LuaFunction>,
    status: ScriptStatus,
    last_error: Option<String>,
}

impl LevelScript {
    pub fn status(&self) -> ScriptStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_step(&self) -> bool {
        self.step.is_some()
    }

    /// Call the level's `step(dt)` if it has one, then hand back any
    /// geometry it asked for.
    pub fn call_step(&self, dt: f32) -> Vec<GeometryCommand> {
        if let Some(step) = &self.step {
            if let Err(err) = step.call::<()>(dt) {
                log::error!("Lua step error: {err}");
            }
        }
        self.drain_geometry()
    }

    pub fn drain_geometry(&self) -> Vec<GeometryCommand> {
        self.lua
            .app_data_mut::<GeometryQueue>()
            .map(|mut queue| std::mem::take(&mut queue.0))
            .unwrap_or_default()
    }
}

impl Drop for LevelScript {
    fn drop(&mut self) {
        // The callback handle must go before the state that owns it.
        self.step = None;
    }
}

/// Load `level_file` then `settings_file` from `script_root` into a fresh
/// Lua state. Always returns a usable description.
pub fn load_level(
    script_root: &Path,
    level_file: &str,
    settings_file: &str,
) -> (LevelDescription, LevelScript) {
    let lua = Lua::new();
    let mut status = ScriptStatus::Loaded;
    let mut last_error = None;

    if let Err(err) = declare_defaults(&lua) {
        log::error!("Failed to set up level globals: {err}");
        status = ScriptStatus::Error;
        last_error = Some(err.to_string());
    }

    match run_script(&lua, &script_root.join(level_file)) {
        Ok(()) => log::info!("Level script loaded: {level_file}"),
        Err(err @ ScriptError::Missing(_)) => {
            log::warn!("{err}. Using defaults.");
            status = ScriptStatus::Missing;
            last_error = Some(err.to_string());
        }
        Err(err) => {
            log::error!("{err}");
            status = ScriptStatus::Error;
            last_error = Some(err.to_string());
        }
    }

    match run_script(&lua, &script_root.join(settings_file)) {
        Ok(()) => {}
        Err(err @ ScriptError::Missing(_)) => log::warn!("{err}"),
        Err(err) => log::error!("{err}"),
    }

    let (mut level, step) = harvest(&lua, level_file);
    let script = LevelScript {
        lua,
        step,
        status,
        last_error,
    };
    level.geometry = script.drain_geometry();
    log::debug!(
        "Level {level_file}: {} geometry commands, step callback: {}",
        level.geometry.len(),
        script.has_step()
    );
    (level, script)
}

fn register_create_button(lua: &Lua) -> LuaResult<()> {
    let create_button = lua.create_function(
        |lua,
         (x, y, w, h, standard, hover, target, states): (
            f32,
            f32,
            f32,
            f32,
            String,
            String,
            i64,
            Option<LuaTable>,
        )| {
            let Some(target) = ButtonTarget::from_id(target) else {
                log::warn!("createButton: unknown target state {target}; button skipped");
                return Ok(());
            };
            let mut visible_in = Vec::new();
            if let Some(states) = states {
                for id in states.sequence_values::<i64>() {
                    match SessionState::from_id(id?) {
                        Some(state) => visible_in.push(state),
                        None => log::warn!("createButton: ignoring unknown state in statesToShow"),
                    }
                }
            }
            let mut queue = lua.app_data_mut::<ButtonQueue>().ok_or_else(|| {
                LuaError::RuntimeError("createButton used outside the menu script".to_string())
            })?;
            queue.0.push(Button {
                position: Vec2::new(x, y),
                size: Vec2::new(w, h),
                standard_image: standard,
                hover_image: hover,
                target,
                visible_in,
            });
            Ok(())
        },
    )?;
    lua.globals().set("createButton", create_button)
}

/// Run the menu script once and collect the buttons it declares.
pub fn load_menu(path: &Path) -> (Vec<Button>, ScriptStatus) {
    let lua = Lua::new();
    lua.set_app_data(ButtonQueue::default());

    if let Err(err) = publish_state_constants(&lua).and_then(|()| register_create_button(&lua)) {
        log::error!("Failed to set up menu globals: {err}");
        return (Vec::new(), ScriptStatus::Error);
    }

    let status = match run_script(&lua, path) {
        Ok(()) => ScriptStatus::Loaded,
        Err(err @ ScriptError::Missing(_)) => {
            log::warn!("{err}. Menu has no buttons.");
            ScriptStatus::Missing
        }
        Err(err) => {
            log::error!("{err}");
            ScriptStatus::Error
        }
    };

    let buttons = lua
        .remove_app_data::<ButtonQueue>()
        .map(|queue| queue.0)
        .unwrap_or_default();
    log::info!("Menu declared {} buttons", buttons.len());
    (buttons, status)
}
