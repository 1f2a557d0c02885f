//! Stepstone gameplay core.
//!
//! Per-tick decisions for a 2D physics platformer: collision classification,
//! impulse lethality, grounding, player motion, level ingestion from Lua and
//! the session state machine that ties them together. Rendering, audio and
//! windowing stay outside; the physics engine sits behind
//! [`physics::PhysicsWorld`].

pub mod animation;
pub mod collision;
pub mod config;
pub mod controller;
pub mod grounding;
pub mod lethality;
pub mod level;
pub mod lua_bridge;
pub mod menu;
pub mod physics;
pub mod player;
pub mod replay;
pub mod session;
pub mod viewport;
