//! Logic relating to [MotionRoadmap] generation
//!

use std::collections::{BTreeMap, BTreeSet};

use bevy::math::DVec2;

use crate::prelude::*;
use bevy::prelude::*;

/// A request to find a [MotionRoadmap] for an agent of some radius between
/// two world points
#[derive(Event, Clone, Copy, Debug)]
pub struct EventPathRequest {
	/// Radius of the agent
	agent_radius: f64,
	/// World start
	source: DVec2,
	/// World goal
	destination: DVec2,
}

impl EventPathRequest {
	/// Create a new instance of [EventPathRequest]
	pub fn new(agent_radius: f64, source: DVec2, destination: DVec2) -> Self {
		EventPathRequest {
			agent_radius,
			source,
			destination,
		}
	}
	/// Get the agent radius
	pub fn get_agent_radius(&self) -> f64 {
		self.agent_radius
	}
	/// Get the world start
	pub fn get_source(&self) -> DVec2 {
		self.source
	}
	/// Get the world goal
	pub fn get_destination(&self) -> DVec2 {
		self.destination
	}
}

/// Key of a cached [MotionRoadmap], the request it answers compared by bits
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoadmapMetadata {
	/// Bits of the agent radius
	agent_radius: u64,
	/// Bits of the world start
	source: [u64; 2],
	/// Bits of the world goal
	destination: [u64; 2],
}

impl RoadmapMetadata {
	/// Create a new instance of [RoadmapMetadata]
	pub fn new(agent_radius: f64, source: DVec2, destination: DVec2) -> Self {
		RoadmapMetadata {
			agent_radius: agent_radius.to_bits(),
			source: [source.x.to_bits(), source.y.to_bits()],
			destination: [destination.x.to_bits(), destination.y.to_bits()],
		}
	}
	/// Get the agent radius
	pub fn get_agent_radius(&self) -> f64 {
		f64::from_bits(self.agent_radius)
	}
	/// Get the world start
	pub fn get_source(&self) -> DVec2 {
		DVec2::new(f64::from_bits(self.source[0]), f64::from_bits(self.source[1]))
	}
	/// Get the world goal
	pub fn get_destination(&self) -> DVec2 {
		DVec2::new(
			f64::from_bits(self.destination[0]),
			f64::from_bits(self.destination[1]),
		)
	}
}

impl From<&EventPathRequest> for RoadmapMetadata {
	fn from(event: &EventPathRequest) -> Self {
		RoadmapMetadata::new(event.agent_radius, event.source, event.destination)
	}
}

/// Roadmaps found for previous [EventPathRequest]s
#[derive(Resource, Clone, Debug, Default)]
pub struct RoadmapCache {
	/// Found roadmaps keyed by the request they answer
	roadmaps: BTreeMap<RoadmapMetadata, MotionRoadmap>,
	/// Sector versions the roadmaps were last checked against
	sector_versions: BTreeMap<SectorId, u64>,
}

impl RoadmapCache {
	/// Get the map of roadmaps
	pub fn get(&self) -> &BTreeMap<RoadmapMetadata, MotionRoadmap> {
		&self.roadmaps
	}
	/// Get a roadmap. Returns [None] if it doesn't exist
	pub fn get_roadmap(
		&self,
		agent_radius: f64,
		source: DVec2,
		destination: DVec2,
	) -> Option<&MotionRoadmap> {
		let roadmap = self
			.roadmaps
			.get(&RoadmapMetadata::new(agent_radius, source, destination));
		trace!("Roadmap: {:?}", roadmap);
		roadmap
	}
	/// Insert a roadmap, replacing any answering the same request
	pub fn insert_roadmap(&mut self, metadata: RoadmapMetadata, roadmap: MotionRoadmap) {
		self.roadmaps.insert(metadata, roadmap);
	}
	/// Remove a roadmap
	pub fn remove_roadmap(&mut self, metadata: &RoadmapMetadata) -> Option<MotionRoadmap> {
		self.roadmaps.remove(metadata)
	}
	/// Number of roadmaps held
	pub fn len(&self) -> usize {
		self.roadmaps.len()
	}
	/// Whether no roadmaps are held
	pub fn is_empty(&self) -> bool {
		self.roadmaps.is_empty()
	}
	/// Drop every roadmap walking through any of `sectors`, returning how
	/// many were dropped
	pub fn purge_through_sectors(&mut self, sectors: &BTreeSet<SectorId>) -> usize {
		let before = self.roadmaps.len();
		self.roadmaps.retain(|_, roadmap| {
			!roadmap
				.sectors_visited()
				.iter()
				.any(|s| sectors.contains(s))
		});
		before - self.roadmaps.len()
	}
	/// Compare `current` sector versions with those last seen and drop every
	/// roadmap walking through a sector that changed, appeared or vanished.
	/// Returns how many were dropped
	pub fn purge_changed_sectors(&mut self, current: BTreeMap<SectorId, u64>) -> usize {
		let changed = changed_sectors(&self.sector_versions, &current);
		self.sector_versions = current;
		if changed.is_empty() {
			return 0;
		}
		self.purge_through_sectors(&changed)
	}
	/// Drop every roadmap
	pub fn clear(&mut self) {
		self.roadmaps.clear();
	}
}

/// Answer each [EventPathRequest] not already held by the [RoadmapCache]
#[cfg(not(tarpaulin_include))]
pub fn process_path_requests(
	mut events: EventReader<EventPathRequest>,
	terrain: Res<TerrainService>,
	mut cache: ResMut<RoadmapCache>,
) {
	// several agents may ask for the same thing in one frame
	let mut requests: BTreeSet<RoadmapMetadata> = BTreeSet::new();
	for event in events.read() {
		let metadata = RoadmapMetadata::from(event);
		if !cache.get().contains_key(&metadata) {
			requests.insert(metadata);
		}
	}
	if requests.is_empty() {
		return;
	}
	let pathfinder = PathfinderCalculator::new(&terrain);
	for metadata in requests {
		match pathfinder.try_find_path(
			metadata.get_agent_radius(),
			metadata.get_source(),
			metadata.get_destination(),
		) {
			Some(roadmap) => cache.insert_roadmap(metadata, roadmap),
			None => debug!(
				"No roadmap from {:?} to {:?}",
				metadata.get_source(),
				metadata.get_destination()
			),
		}
	}
}
