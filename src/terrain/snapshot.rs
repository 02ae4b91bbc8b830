//! Immutable compilations of the terrain.
//!
//! A [TerrainSnapshot] freezes the punched land of every sector (static
//! contours minus static and dynamic holes, before any agent erosion) at one
//! service version. Overlay networks for each agent radius are derived from,
//! and cached inside, the snapshot they were compiled from so a network can
//! never outlive the geometry it describes.
//!
//! The [SnapshotCompiler] keeps the last punched land of each sector keyed
//! by the sector's version and only re-punches sectors whose version moved.
//!

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::math::{DAffine2, DVec2};
use parking_lot::Mutex;

use crate::prelude::*;
use bevy::log::{debug, trace};

/// The punched land of one sector at one version
#[derive(Clone, Debug)]
pub struct SectorSnapshot {
	/// The sector compiled
	sector_id: SectorId,
	/// Version of the sector when compiled
	version: u64,
	/// Shared static geometry
	static_metadata: Arc<TerrainStaticMetadata>,
	/// Local to world transform
	world_transform: DAffine2,
	/// World to local transform
	world_transform_inv: DAffine2,
	/// Land remaining after every hole has been punched out
	punched_land: PolyTree,
}

impl SectorSnapshot {
	/// Get the [SectorId]
	pub fn get_sector_id(&self) -> SectorId {
		self.sector_id
	}
	/// Get the sector version the snapshot reflects
	pub fn get_version(&self) -> u64 {
		self.version
	}
	/// Get the static geometry
	pub fn get_static_metadata(&self) -> &Arc<TerrainStaticMetadata> {
		&self.static_metadata
	}
	/// Get the local boundary
	pub fn get_local_boundary(&self) -> &IntRect {
		self.static_metadata.get_local_boundary()
	}
	/// Get the local to world transform
	pub fn get_world_transform(&self) -> &DAffine2 {
		&self.world_transform
	}
	/// Get the world to local transform
	pub fn get_world_transform_inv(&self) -> &DAffine2 {
		&self.world_transform_inv
	}
	/// Get the punched land
	pub fn get_punched_land(&self) -> &PolyTree {
		&self.punched_land
	}
	/// Map a local point into the world
	pub fn local_to_world(&self, point: IntVector2) -> DVec2 {
		self.world_transform.transform_point2(point.as_dvec2())
	}
}

/// Punch the land of one sector
fn compile_sector(sector: &Sector, holes: &BTreeMap<HoleId, DynamicTerrainHole>) -> SectorSnapshot {
	let static_metadata = sector.get_static_metadata();
	let mut excluded: Vec<Polygon> = static_metadata.get_local_excluded_contours().to_vec();
	for hole_id in sector.get_instance_metadata().get_holes().iter() {
		if let Some(hole) = holes.get(hole_id) {
			excluded.extend(hole.project_onto(sector));
		}
	}
	let punched_land = punch()
		.include(static_metadata.land_contours())
		.exclude(excluded)
		.execute(0.0);
	trace!(
		"Punched sector {:?} at version {}",
		sector.get_id(),
		sector.get_version()
	);
	SectorSnapshot {
		sector_id: sector.get_id(),
		version: sector.get_version(),
		static_metadata: static_metadata.clone(),
		world_transform: *sector.get_world_transform(),
		world_transform_inv: *sector.get_world_transform_inv(),
		punched_land,
	}
}

/// The punched land of every sector at one version of the [TerrainService]
#[derive(Debug)]
pub struct TerrainSnapshot {
	/// Version of the service when compiled
	version: u64,
	/// One entry per sector in [SectorId] order
	sectors: Vec<Arc<SectorSnapshot>>,
	/// Overlay networks compiled from this snapshot, per agent radius
	overlay_network_manager: OverlayNetworkManager,
	/// Counters shared with the service
	statistics: Arc<TerrainStatistics>,
}

impl TerrainSnapshot {
	/// Get the service version the snapshot reflects
	pub fn get_version(&self) -> u64 {
		self.version
	}
	/// Get the sectors
	pub fn get_sectors(&self) -> &[Arc<SectorSnapshot>] {
		&self.sectors
	}
	/// Get a sector by id
	pub fn get_sector(&self, sector_id: SectorId) -> Option<&Arc<SectorSnapshot>> {
		self.sectors.iter().find(|s| s.get_sector_id() == sector_id)
	}
	/// Get the cache of overlay networks
	pub fn get_overlay_network_manager(&self) -> &OverlayNetworkManager {
		&self.overlay_network_manager
	}
	/// Compile, or fetch the already compiled, overlay network for an agent
	/// radius. A negative or non-finite radius is a caller bug and panics
	pub fn compile_overlay_network(&self, agent_radius: f64) -> Arc<TerrainOverlayNetwork> {
		self.overlay_network_manager.compile_terrain_overlay_network(
			self.version,
			&self.sectors,
			agent_radius,
			&self.statistics,
		)
	}
}

/// Cached state of the [SnapshotCompiler]
#[derive(Debug, Default)]
struct SnapshotCache {
	/// Last punched land of each sector
	sectors: BTreeMap<SectorId, Arc<SectorSnapshot>>,
	/// Last whole snapshot
	latest: Option<Arc<TerrainSnapshot>>,
}

/// Compiles [TerrainSnapshot]s, reusing every sector whose version has not
/// moved since it was last punched
#[derive(Debug, Default)]
pub struct SnapshotCompiler {
	/// Single writer cache
	cache: Mutex<SnapshotCache>,
}

impl SnapshotCompiler {
	/// Drop every cached snapshot
	pub fn invalidate(&self) {
		let mut cache = self.cache.lock();
		cache.sectors.clear();
		cache.latest = None;
	}
	/// Compile the snapshot of `version`, returning the cached one when the
	/// version is unchanged
	pub fn compile(
		&self,
		version: u64,
		sectors: &BTreeMap<SectorId, Sector>,
		holes: &BTreeMap<HoleId, DynamicTerrainHole>,
		statistics: &Arc<TerrainStatistics>,
	) -> Arc<TerrainSnapshot> {
		let mut cache = self.cache.lock();
		if let Some(latest) = &cache.latest {
			if latest.get_version() == version {
				return latest.clone();
			}
		}
		// forget sectors which no longer exist
		cache.sectors.retain(|id, _| sectors.contains_key(id));
		let mut compiled = Vec::with_capacity(sectors.len());
		for (sector_id, sector) in sectors.iter() {
			let reusable = cache
				.sectors
				.get(sector_id)
				.filter(|s| s.get_version() == sector.get_version())
				.cloned();
			let snapshot = match reusable {
				Some(snapshot) => snapshot,
				None => {
					statistics.increment(Counter::SectorSnapshotsCompiled);
					let snapshot = Arc::new(compile_sector(sector, holes));
					cache.sectors.insert(*sector_id, snapshot.clone());
					snapshot
				}
			};
			compiled.push(snapshot);
		}
		statistics.increment(Counter::SnapshotsCompiled);
		debug!(
			"Compiled terrain snapshot version {} over {} sectors",
			version,
			compiled.len()
		);
		let snapshot = Arc::new(TerrainSnapshot {
			version,
			sectors: compiled,
			overlay_network_manager: OverlayNetworkManager::default(),
			statistics: statistics.clone(),
		});
		cache.latest = Some(snapshot.clone());
		snapshot
	}
}
