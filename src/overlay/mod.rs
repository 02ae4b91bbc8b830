//! Per agent radius navigation structures compiled from a [TerrainSnapshot].
//!
//! The land of every sector is eroded by the agent radius, crossover points
//! are placed where neighbouring sectors share walkable boundary, and each
//! sector caches the shortest local paths between its crossover points.
//!

pub mod crossover;
pub mod local_geometry;
pub mod network;

/// World distance within which two sector sides are considered to touch
pub const ADJACENCY_EPSILON: f64 = 0.5;
/// World distance within which the crossover points two neighbouring sectors
/// derive for the same interval are considered the same point
pub const CROSSOVER_MATCH_EPSILON: f64 = 2.0;
