//! Defines the Bevy [Plugin] for the terrain overlay
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod path_layer;
pub mod terrain_layer;

/// Order in which the systems of the plugin run each frame
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Apply terrain changes
	Terrain,
	/// Answer path requests against the updated terrain
	Calculate,
}

/// Registers the [TerrainService] and [RoadmapCache] resources along with
/// the events and systems driving them
pub struct TerrainOverlayPlugin;

impl Plugin for TerrainOverlayPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<SectorId>()
			.register_type::<HoleId>()
			.register_type::<IntVector2>()
			.register_type::<IntRect>()
			.init_resource::<TerrainService>()
			.init_resource::<RoadmapCache>()
			.add_event::<terrain_layer::EventInsertTerrainHole>()
			.add_event::<terrain_layer::EventRemoveTerrainHole>()
			.add_event::<path_layer::EventPathRequest>()
			.configure_sets(Update, (OrderingSet::Terrain, OrderingSet::Calculate).chain())
			.add_systems(
				Update,
				(
					terrain_layer::process_terrain_hole_events.in_set(OrderingSet::Terrain),
					path_layer::process_path_requests.in_set(OrderingSet::Calculate),
				),
			);
	}
}
