//! This is a plugin for Bevy game engine to compile hierarchical navigation
//! overlays across transformable polygon terrain sectors and find routes for
//! agents of any radius
//!

pub mod geometry;
pub mod overlay;
pub mod pathfinding;
pub mod plugin;
pub mod statistics;
pub mod terrain;

pub mod prelude;
