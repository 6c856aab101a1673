//! Real-time map simulation core.
//!
//! Drives mob movement physics, AI state machines, the skill/combat
//! pipeline, transient effect animation, and cross-map state persistence.
//! The host owns the window and renderer and calls [`simulation::Simulation::update`]
//! once per frame with a millisecond tick and a float delta; everything the
//! renderer needs (current frames, positions, active effects) is exposed as
//! plain data, and host-facing side effects arrive as [`events::GameEvent`]s.

pub mod animation;
pub mod boundary;
pub mod components;
pub mod constants;
pub mod events;
pub mod foothold;
pub mod geometry;
pub mod map_state;
pub mod physics;
pub mod player;
pub mod simulation;
pub mod skills;
pub mod spawning;
pub mod systems;
pub mod time;
