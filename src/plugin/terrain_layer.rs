//! Logic relating to runtime changes of the terrain
//!

use std::collections::{BTreeMap, BTreeSet};

use crate::prelude::*;
use bevy::prelude::*;

/// Punch a [DynamicTerrainHole] into the terrain, replacing any hole already
/// using the id
#[derive(Event, Clone, Debug)]
pub struct EventInsertTerrainHole {
	/// Id of the hole
	id: HoleId,
	/// World space shape of the hole
	hole: DynamicTerrainHole,
}

impl EventInsertTerrainHole {
	/// Create a new instance of [EventInsertTerrainHole]
	pub fn new(id: HoleId, hole: DynamicTerrainHole) -> Self {
		EventInsertTerrainHole { id, hole }
	}
	/// Get the id of the hole
	pub fn get_id(&self) -> HoleId {
		self.id
	}
	/// Get the hole
	pub fn get_hole(&self) -> &DynamicTerrainHole {
		&self.hole
	}
}

/// Remove a [DynamicTerrainHole] from the terrain
#[derive(Event, Clone, Copy, Debug)]
pub struct EventRemoveTerrainHole(pub HoleId);

/// Version of every sector
pub fn sector_versions(terrain: &TerrainService) -> BTreeMap<SectorId, u64> {
	terrain
		.get_sectors()
		.iter()
		.map(|(id, sector)| (*id, sector.get_version()))
		.collect()
}

/// Sectors whose version differs between two readings, sectors that
/// appeared or disappeared included
pub fn changed_sectors(
	before: &BTreeMap<SectorId, u64>,
	after: &BTreeMap<SectorId, u64>,
) -> BTreeSet<SectorId> {
	let mut changed: BTreeSet<SectorId> = before
		.iter()
		.filter(|(id, version)| after.get(id) != Some(version))
		.map(|(id, _)| *id)
		.collect();
	changed.extend(after.keys().filter(|id| !before.contains_key(id)));
	changed
}

/// Apply hole events to the [TerrainService]
#[cfg(not(tarpaulin_include))]
pub fn process_terrain_hole_events(
	mut insert_events: EventReader<EventInsertTerrainHole>,
	mut remove_events: EventReader<EventRemoveTerrainHole>,
	mut terrain: ResMut<TerrainService>,
) {
	if insert_events.is_empty() && remove_events.is_empty() {
		return;
	}
	let before = sector_versions(&terrain);
	for event in insert_events.read() {
		terrain.insert_hole(event.get_id(), event.get_hole().clone());
	}
	for event in remove_events.read() {
		if let Err(e) = terrain.remove_hole(event.0) {
			error!("Cannot remove terrain hole: {}", e);
		}
	}
	let changed = changed_sectors(&before, &sector_versions(&terrain));
	debug!("Terrain holes changed {} sectors", changed.len());
}

/// Forget every cached roadmap walking through a sector which changed since
/// the cache last looked, whether through hole events or direct edits of the
/// [TerrainService]
#[cfg(not(tarpaulin_include))]
pub fn purge_stale_roadmaps(terrain: Res<TerrainService>, mut roadmaps: ResMut<RoadmapCache>) {
	if !terrain.is_changed() {
		return;
	}
	let purged = roadmaps.purge_changed_sectors(sector_versions(&terrain));
	if purged > 0 {
		debug!("Purged {} roadmaps through changed sectors", purged);
	}
}
