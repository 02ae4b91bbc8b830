//! `use bevy_terrain_overlay_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::geometry::{bvh::*, polygon::*, polygon_operations::*, *};

#[doc(hidden)]
pub use crate::terrain::{holes::*, sector::*, snapshot::*, *};

#[doc(hidden)]
pub use crate::overlay::{crossover::*, local_geometry::*, network::*, *};

#[doc(hidden)]
pub use crate::pathfinding::{roadmap::*, *};

#[doc(hidden)]
pub use crate::{
	plugin::{path_layer::*, terrain_layer::*, *},
	statistics::*,
};
