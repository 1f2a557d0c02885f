//! The session state machine and the per-tick gameplay pipeline.
//!
//! A [`Session`] owns everything that outlives a single level: the menu
//! buttons, cheat flags, input, and the music currently requested from the
//! host. Everything that belongs to one level lives in a `PlayingScope`,
//! which exists exactly while the session is [`SessionState::Playing`].
//! Dropping the scope releases the physics world, the level's Lua state and
//! its step callback on every exit path.
//!
//! One playing tick runs these phases in order:
//!
//! 1. level `step(dt)` callback, then any geometry it created
//! 2. physics step, collecting solved contacts
//! 3. lethality over the solved contacts
//! 4. win / out-of-bounds check (a win ends the tick)
//! 5. kill signal consumed
//! 6. grounding over the player's touching contacts
//! 7. player motion and camera follow, acting on the next step
//! 8. invincibility decay and sprite blink, animation playback

use std::fmt;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use stone_core::input::{InputState, Key, MouseBtn};

use crate::animation::{AnimationKind, CharacterClips, PlayerAnimator};
use crate::config::GameConfig;
use crate::controller::{self, MotionIntent, PlayerKinematicState};
use crate::grounding::{self, BoundsCheck};
use crate::lethality::LethalityState;
use crate::level::{self, ControlBindings, LevelDescription, MusicTrack, PostWinTarget};
use crate::lua_bridge::{self, LevelScript, ScriptStatus};
use crate::menu::{self, Button, ButtonTarget};
use crate::physics::{BodyDef, BodyId, PhysicsWorld, WorldFactory};
use crate::player::PlayerRig;
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Menu,
    MenuAbout,
    MenuHelp,
    Intro,
    Playing,
    Win,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        SessionState::Menu,
        SessionState::MenuAbout,
        SessionState::MenuHelp,
        SessionState::Intro,
        SessionState::Playing,
        SessionState::Win,
    ];

    /// Numeric id scripts use for this state.
    pub fn id(self) -> i64 {
        match self {
            Self::Menu => 0,
            Self::MenuAbout => 1,
            Self::MenuHelp => 2,
            Self::Intro => 3,
            Self::Playing => 4,
            Self::Win => 5,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Global name under which scripts see [`Self::id`].
    pub fn script_name(self) -> &'static str {
        match self {
            Self::Menu => "MENU",
            Self::MenuAbout => "MENU_ABOUT",
            Self::MenuHelp => "MENU_HELP",
            Self::Intro => "GAME_INTRO",
            Self::Playing => "GAME",
            Self::Win => "GAME_WIN",
        }
    }

    pub fn is_menu_family(self) -> bool {
        matches!(self, Self::Menu | Self::MenuAbout | Self::MenuHelp)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Menu => "Menu",
            Self::MenuAbout => "MenuAbout",
            Self::MenuHelp => "MenuHelp",
            Self::Intro => "Intro",
            Self::Playing => "Playing",
            Self::Win => "Win",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Requests for the audio host, drained once per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCue {
    PlayMusic(MusicTrack),
    StopMusic,
    PlaySound(String),
}

/// A level loaded at `Intro`, waiting for the player to start it.
struct StagedLevel {
    description: LevelDescription,
    script: LevelScript,
}

/// Everything that lives exactly as long as one `Playing` stretch.
struct PlayingScope<W: PhysicsWorld> {
    world: W,
    ground: BodyId,
    rig: PlayerRig,
    level: LevelDescription,
    script: LevelScript,
    kinematics: PlayerKinematicState,
    animator: PlayerAnimator,
    viewport: Viewport,
    rng: Pcg32,
    debris: Vec<BodyId>,
}

impl<W: PhysicsWorld> Drop for PlayingScope<W> {
    fn drop(&mut self) {
        log::info!(
            "Tearing down {}: {} bodies ({} debris)",
            self.level.name,
            self.world.body_count(),
            self.debris.len()
        );
    }
}

/// How a playing tick ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickEnd {
    Won,
    FellOut,
    Killed,
}

/// Player data the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView<'a> {
    pub position: Vec2,
    pub facing_right: bool,
    pub animation: AnimationKind,
    pub sprite: &'a str,
    pub progress: f32,
    /// False on the hidden half of the invincibility blink.
    pub visible: bool,
    /// Drawn half transparent while uncollidable.
    pub translucent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonView<'a> {
    pub button: &'a Button,
    pub image: &'a str,
}

/// Read-only snapshot for the rendering side.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView<'a> {
    pub state: SessionState,
    pub camera: Vec2,
    pub level: Option<&'a LevelDescription>,
    pub player: Option<PlayerView<'a>>,
    pub buttons: Vec<ButtonView<'a>>,
}

pub struct Session<W: PhysicsWorld> {
    config: GameConfig,
    make_world: WorldFactory<W>,
    state: SessionState,
    buttons: Vec<Button>,
    level_file: String,
    bindings: ControlBindings,
    death_sound: String,
    script_status: Option<ScriptStatus>,
    staged: Option<StagedLevel>,
    playing: Option<PlayingScope<W>>,
    input: InputState,
    lethality: LethalityState,
    slow_motion: bool,
    current_music: Option<MusicTrack>,
    audio: Vec<AudioCue>,
    exit_requested: bool,
}

impl<W: PhysicsWorld> Session<W> {
    /// Start at the main menu.
    pub fn new(config: GameConfig, buttons: Vec<Button>, make_world: WorldFactory<W>) -> Self {
        let default_level = LevelDescription::with_defaults(config.default_level.clone());
        let mut session = Self {
            level_file: config.default_level.clone(),
            bindings: default_level.bindings,
            death_sound: default_level.death_sound_path(),
            config,
            make_world,
            state: SessionState::Menu,
            buttons,
            script_status: None,
            staged: None,
            playing: None,
            input: InputState::new(),
            lethality: LethalityState::default(),
            slow_motion: false,
            current_music: None,
            audio: Vec::new(),
            exit_requested: false,
        };
        session.transition(SessionState::Menu);
        session
    }

    /// Like [`Self::new`], with buttons declared by the configured menu script.
    pub fn with_menu_script(config: GameConfig, make_world: WorldFactory<W>) -> Self {
        let (buttons, status) = lua_bridge::load_menu(&config.menu_script_path());
        log::info!("Menu script: {status}");
        Self::new(config, buttons, make_world)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn level_file(&self) -> &str {
        &self.level_file
    }

    pub fn bindings(&self) -> ControlBindings {
        self.bindings
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Status of the most recent level load, if any.
    pub fn script_status(&self) -> Option<ScriptStatus> {
        self.script_status
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn lethality(&self) -> &LethalityState {
        &self.lethality
    }

    pub fn slow_motion(&self) -> bool {
        self.slow_motion
    }

    pub fn drain_audio(&mut self) -> Vec<AudioCue> {
        std::mem::take(&mut self.audio)
    }

    pub fn level(&self) -> Option<&LevelDescription> {
        match (&self.playing, &self.staged) {
            (Some(scope), _) => Some(&scope.level),
            (None, Some(staged)) => Some(&staged.description),
            (None, None) => None,
        }
    }

    pub fn kinematics(&self) -> Option<&PlayerKinematicState> {
        self.playing.as_ref().map(|scope| &scope.kinematics)
    }

    pub fn player_rig(&self) -> Option<PlayerRig> {
        self.playing.as_ref().map(|scope| scope.rig)
    }

    pub fn player_position(&self) -> Option<Vec2> {
        let scope = self.playing.as_ref()?;
        scope.world.position(scope.rig.body)
    }

    pub fn world(&self) -> Option<&W> {
        self.playing.as_ref().map(|scope| &scope.world)
    }

    pub fn world_mut(&mut self) -> Option<&mut W> {
        self.playing.as_mut().map(|scope| &mut scope.world)
    }

    /// Move to `next`, releasing and acquiring per-state resources.
    pub fn transition(&mut self, next: SessionState) {
        let previous = self.state;
        if previous == SessionState::Playing && next != SessionState::Playing {
            self.playing = None;
            self.input.release_all();
        }
        self.state = next;
        log::info!("Session {previous} -> {next}");

        match next {
            SessionState::Playing if previous != SessionState::Playing => {
                self.playing = self.enter_playing();
                if self.playing.is_none() {
                    log::error!("Could not build the level world; back to the menu");
                    self.transition(SessionState::Menu);
                    return;
                }
            }
            SessionState::Intro => {
                self.staged = Some(self.load_level());
            }
            SessionState::Menu => {
                self.level_file = self.config.default_level.clone();
            }
            _ => {}
        }
        self.update_music();
    }

    fn load_level(&mut self) -> StagedLevel {
        let (description, script) = lua_bridge::load_level(
            &self.config.script_root,
            &self.level_file,
            &self.config.settings_script,
        );
        self.bindings = description.bindings;
        self.death_sound = description.death_sound_path();
        self.script_status = Some(script.status());
        log::info!(
            "Loaded level {} ({}, {} geometry commands)",
            description.name,
            script.status(),
            description.geometry.len()
        );
        StagedLevel {
            description,
            script,
        }
    }

    fn enter_playing(&mut self) -> Option<PlayingScope<W>> {
        let staged = match self.staged.take() {
            Some(staged) => staged,
            None => self.load_level(),
        };
        let StagedLevel {
            description: level,
            script,
        } = staged;

        let mut world = (self.make_world)(&self.config.physics.settings());
        let ground = world.create_body(BodyDef::fixed(Vec2::ZERO));
        let rig = PlayerRig::spawn(&mut world, &self.config.player)?;
        if self.lethality.uncollidable {
            rig.set_uncollidable(&mut world, true);
        }

        let mut rng = Pcg32::seed_from_u64(self.config.debris.seed);
        let mut debris = Vec::new();
        for command in &level.geometry {
            if let Some(body) = level::apply_geometry(
                &mut world,
                ground,
                *command,
                self.config.player.spawn.y,
                &mut rng,
                &self.config.debris,
            ) {
                debris.push(body);
            }
        }

        let animator = PlayerAnimator::new(CharacterClips::for_character(&level.character));
        log::info!(
            "World built for {}: {} bodies",
            level.name,
            world.body_count()
        );
        Some(PlayingScope {
            world,
            ground,
            rig,
            level,
            script,
            kinematics: PlayerKinematicState::default(),
            animator,
            viewport: Viewport::default(),
            rng,
            debris,
        })
    }

    fn desired_music(&self) -> Option<MusicTrack> {
        match self.state {
            SessionState::Menu | SessionState::MenuAbout | SessionState::MenuHelp => {
                Some(MusicTrack {
                    path: self.config.menu_music.clone(),
                    looping: true,
                })
            }
            SessionState::Playing => self
                .playing
                .as_ref()
                .and_then(|scope| scope.level.music.clone()),
            SessionState::Intro | SessionState::Win => None,
        }
    }

    fn update_music(&mut self) {
        let desired = self.desired_music();
        if desired == self.current_music {
            return;
        }
        match &desired {
            Some(track) => {
                log::debug!("Music: {}", track.path);
                self.audio.push(AudioCue::PlayMusic(track.clone()));
            }
            None => self.audio.push(AudioCue::StopMusic),
        }
        self.current_music = desired;
    }

    fn play_death_sound(&mut self) {
        self.audio.push(AudioCue::PlaySound(self.death_sound.clone()));
    }

    pub fn key_down(&mut self, c: char) {
        let key = Key(c);
        match self.state {
            SessionState::Intro => {
                self.transition(SessionState::Playing);
                return;
            }
            SessionState::Win if key == Key::ESCAPE => {
                self.transition(SessionState::Menu);
                return;
            }
            _ => {}
        }

        if key == Key::ESCAPE {
            if self.state == SessionState::Menu {
                log::info!("Exit requested");
                self.exit_requested = true;
            } else {
                self.transition(SessionState::Menu);
            }
            return;
        }
        if key == Key::RESTART {
            self.play_death_sound();
            self.transition(SessionState::Intro);
            return;
        }

        if !self.input.key_down(key) {
            return;
        }
        let b = self.bindings;
        if c == b.left || c == b.right || c == b.jump {
            return;
        }
        if b.slow_down == Some(c) {
            self.slow_motion = !self.slow_motion;
            log::info!("Slow motion {}", if self.slow_motion { "on" } else { "off" });
        } else if c == b.invincibility {
            self.lethality.toggle_invincibility();
        } else if c == b.uncollidable {
            let on = self.lethality.toggle_uncollidable();
            if let Some(scope) = &mut self.playing {
                scope.rig.set_uncollidable(&mut scope.world, on);
            }
        }
    }

    pub fn key_up(&mut self, c: char) {
        self.input.key_up(Key(c));
    }

    pub fn mouse_down(&mut self, point: Vec2) {
        self.input.mouse_down(MouseBtn::Left, point);
        match menu::hit_test(&self.buttons, self.state, point) {
            Some(ButtonTarget::State(next)) => self.transition(next),
            Some(ButtonTarget::Exit) => {
                log::info!("Exit requested");
                self.exit_requested = true;
            }
            None if self.state == SessionState::Intro => {
                self.transition(SessionState::Playing);
            }
            None => {}
        }
    }

    pub fn mouse_up(&mut self, point: Vec2) {
        self.input.mouse_up(MouseBtn::Left, point);
    }

    pub fn mouse_move(&mut self, point: Vec2) {
        self.input.mouse_move(point);
    }

    fn intent(&self) -> MotionIntent {
        MotionIntent {
            move_left: self.input.is_held(Key(self.bindings.left)),
            move_right: self.input.is_held(Key(self.bindings.right)),
            jump_held: self.input.is_held(Key(self.bindings.jump)),
        }
    }

    /// Advance one fixed tick of `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if self.state == SessionState::Playing {
            if let Some(end) = self.tick_playing(dt) {
                self.finish_level(end);
            }
        }
        self.input.end_frame();
    }

    fn tick_playing(&mut self, dt: f32) -> Option<TickEnd> {
        let intent = self.intent();
        let Session {
            config,
            lethality,
            slow_motion,
            playing,
            ..
        } = self;
        let scope = playing.as_mut()?;
        let world_dt = if *slow_motion {
            dt / config.rules.slowdown_factor
        } else {
            dt
        };

        for command in scope.script.call_step(world_dt) {
            let player_y = scope
                .world
                .position(scope.rig.body)
                .map_or(config.player.spawn.y, |p| p.y);
            if let Some(body) = level::apply_geometry(
                &mut scope.world,
                scope.ground,
                command,
                player_y,
                &mut scope.rng,
                &config.debris,
            ) {
                scope.debris.push(body);
            }
        }

        let solved = scope.world.step(
            world_dt,
            config.physics.velocity_iterations,
            config.physics.position_iterations,
        );
        level::cull_fallen_debris(&mut scope.world, &mut scope.debris, config.debris.cull_below);
        let pos = scope.world.position(scope.rig.body)?;
        let kill = lethality.evaluate_step(&solved, pos, config.rules.lethality_impulse);

        match grounding::check_bounds(pos, scope.level.viewport_maximum_x, config.rules.win_altitude) {
            BoundsCheck::Won => return Some(TickEnd::Won),
            BoundsCheck::FellOut => return Some(TickEnd::FellOut),
            BoundsCheck::InBounds => {}
        }
        if kill.is_some() {
            return Some(TickEnd::Killed);
        }

        let contacts = scope.world.contacts(scope.rig.body);
        let report = grounding::resolve(&contacts, pos, config.player.half_extents);
        grounding::apply(report, &mut scope.kinematics);

        let motion = controller::drive(
            &mut scope.world,
            &scope.rig,
            &mut scope.kinematics,
            intent,
            dt,
            &config.controller,
        );
        if motion.jumped {
            log::debug!("Jump at {pos}");
        } else if motion.kicked_off {
            log::debug!("Kick-off at {pos}");
        }
        scope
            .viewport
            .follow(pos, scope.level.viewport_maximum_x, &config.camera);

        lethality.end_tick(
            config.rules.invincibility_decay_per_tick,
            config.rules.blink_interval_ticks,
        );
        scope.animator.tick(scope.kinematics.current_animation, dt);
        None
    }

    fn finish_level(&mut self, end: TickEnd) {
        match end {
            TickEnd::Won => {
                let target = self
                    .playing
                    .as_ref()
                    .and_then(|scope| scope.level.post_win.clone());
                log::info!("Level {} won", self.level_file);
                self.transition(SessionState::Win);
                match target {
                    Some(PostWinTarget::State(next)) => self.transition(next),
                    Some(PostWinTarget::Level(file)) => {
                        self.level_file = file;
                        self.transition(SessionState::Intro);
                    }
                    None => {}
                }
            }
            TickEnd::FellOut | TickEnd::Killed => {
                log::info!("Player died ({end:?})");
                self.play_death_sound();
                self.transition(SessionState::Intro);
            }
        }
    }

    pub fn frame(&self) -> FrameView<'_> {
        let pointer = self.input.mouse_position;
        let buttons = self
            .buttons
            .iter()
            .filter(|b| b.is_visible_in(self.state))
            .map(|button| ButtonView {
                button,
                image: button.image_for(pointer),
            })
            .collect();

        let player = self.playing.as_ref().and_then(|scope| {
            Some(PlayerView {
                position: scope.world.position(scope.rig.body)?,
                facing_right: scope.kinematics.facing_right,
                animation: scope.animator.active(),
                sprite: scope.animator.sprite(),
                progress: scope.animator.progress(),
                visible: self.lethality.visible(),
                translucent: self.lethality.uncollidable,
            })
        });

        FrameView {
            state: self.state,
            camera: self
                .playing
                .as_ref()
                .map_or(Vec2::ZERO, |scope| scope.viewport.position),
            level: self.level(),
            player,
            buttons,
        }
    }
}
