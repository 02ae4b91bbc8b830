//! The [TerrainService] owns every sector and dynamic hole and compiles them
//! into immutable [TerrainSnapshot]s.
//!
//! Every mutation bumps the service version, and the version of each sector
//! it affects, so that compiled artifacts are invalidated by comparing
//! versions rather than by holding references back to their sources.
//!

pub mod holes;
pub mod sector;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bevy::math::DAffine2;

use crate::prelude::*;
use bevy::prelude::*;

/// Failures when mutating the terrain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerrainError {
	/// The world transform has a zero (or non-finite) determinant
	#[error("world transform of sector {0:?} is not invertible")]
	NonInvertibleTransform(SectorId),
	/// No sector with the id exists
	#[error("sector {0:?} does not exist")]
	UnknownSector(SectorId),
	/// No hole with the id exists
	#[error("hole {0:?} does not exist")]
	UnknownHole(HoleId),
}

/// Owner of the sectors and dynamic holes making up the world
#[derive(Resource, Debug)]
pub struct TerrainService {
	/// Every sector
	sectors: BTreeMap<SectorId, Sector>,
	/// Every dynamic hole, in world space
	holes: BTreeMap<HoleId, DynamicTerrainHole>,
	/// Id handed to the next sector added
	next_sector_id: u32,
	/// Id handed to the next hole added
	next_hole_id: u64,
	/// Bumped on every mutation
	version: u64,
	/// Cache of compiled snapshots
	snapshot_compiler: SnapshotCompiler,
	/// Work counters
	statistics: Arc<TerrainStatistics>,
}

impl Default for TerrainService {
	fn default() -> Self {
		TerrainService::with_statistics(Arc::new(TerrainStatistics::default()))
	}
}

impl TerrainService {
	/// Create a new instance of [TerrainService] with its own counters
	pub fn new() -> Self {
		TerrainService::default()
	}
	/// Create a new instance of [TerrainService] recording work into
	/// `statistics`
	pub fn with_statistics(statistics: Arc<TerrainStatistics>) -> Self {
		TerrainService {
			sectors: BTreeMap::new(),
			holes: BTreeMap::new(),
			next_sector_id: 0,
			next_hole_id: 0,
			version: 0,
			snapshot_compiler: SnapshotCompiler::default(),
			statistics,
		}
	}
	/// Get the counters
	pub fn get_statistics(&self) -> &Arc<TerrainStatistics> {
		&self.statistics
	}
	/// Get the current version
	pub fn get_version(&self) -> u64 {
		self.version
	}
	/// Get every sector
	pub fn get_sectors(&self) -> &BTreeMap<SectorId, Sector> {
		&self.sectors
	}
	/// Get a sector
	pub fn get_sector(&self, sector_id: SectorId) -> Option<&Sector> {
		self.sectors.get(&sector_id)
	}
	/// Get every dynamic hole
	pub fn get_holes(&self) -> &BTreeMap<HoleId, DynamicTerrainHole> {
		&self.holes
	}
	/// Get a dynamic hole
	pub fn get_hole(&self, hole_id: HoleId) -> Option<&DynamicTerrainHole> {
		self.holes.get(&hole_id)
	}
	/// Add a sector placed by `world_transform`
	pub fn add_sector(
		&mut self,
		static_metadata: Arc<TerrainStaticMetadata>,
		world_transform: DAffine2,
	) -> Result<SectorId, TerrainError> {
		let sector_id = SectorId::new(self.next_sector_id);
		let mut sector = Sector::new(sector_id, static_metadata, world_transform)?;
		self.next_sector_id += 1;
		sector.set_holes(self.holes_touching(&sector));
		self.sectors.insert(sector_id, sector);
		self.version += 1;
		debug!("Added sector {:?}", sector_id);
		Ok(sector_id)
	}
	/// Remove a sector
	pub fn remove_sector(&mut self, sector_id: SectorId) -> Result<Sector, TerrainError> {
		let sector = self
			.sectors
			.remove(&sector_id)
			.ok_or(TerrainError::UnknownSector(sector_id))?;
		self.version += 1;
		debug!("Removed sector {:?}", sector_id);
		Ok(sector)
	}
	/// Move a sector, recomputing which holes touch it. Setting the current
	/// transform again changes nothing
	pub fn set_sector_world_transform(
		&mut self,
		sector_id: SectorId,
		world_transform: DAffine2,
	) -> Result<(), TerrainError> {
		let sector = self
			.sectors
			.get_mut(&sector_id)
			.ok_or(TerrainError::UnknownSector(sector_id))?;
		if sector.set_world_transform(world_transform)? {
			let bounds = sector.world_bounds();
			sector.set_holes(touching_holes(&self.holes, &bounds));
			self.version += 1;
		}
		Ok(())
	}
	/// Add a dynamic hole, returning its new id
	pub fn add_hole(&mut self, hole: DynamicTerrainHole) -> HoleId {
		while self.holes.contains_key(&HoleId::new(self.next_hole_id)) {
			self.next_hole_id += 1;
		}
		let hole_id = HoleId::new(self.next_hole_id);
		self.next_hole_id += 1;
		self.insert_hole(hole_id, hole);
		hole_id
	}
	/// Add a dynamic hole under a chosen id, replacing and returning any hole
	/// already using it
	pub fn insert_hole(
		&mut self,
		hole_id: HoleId,
		hole: DynamicTerrainHole,
	) -> Option<DynamicTerrainHole> {
		let bounds = hole.world_bounds();
		let previous = self.holes.insert(hole_id, hole);
		for sector in self.sectors.values_mut() {
			let was_touching = sector.get_instance_metadata().get_holes().contains(&hole_id);
			let touching = bounds.is_some_and(|b| b.intersects(&sector.world_bounds()));
			if was_touching || touching {
				sector.touch_hole(hole_id, touching);
			}
		}
		self.version += 1;
		debug!("Inserted hole {:?}", hole_id);
		previous
	}
	/// Remove a dynamic hole
	pub fn remove_hole(&mut self, hole_id: HoleId) -> Result<DynamicTerrainHole, TerrainError> {
		let hole = self
			.holes
			.remove(&hole_id)
			.ok_or(TerrainError::UnknownHole(hole_id))?;
		for sector in self.sectors.values_mut() {
			if sector.get_instance_metadata().get_holes().contains(&hole_id) {
				sector.touch_hole(hole_id, false);
			}
		}
		self.version += 1;
		debug!("Removed hole {:?}", hole_id);
		Ok(hole)
	}
	/// Holes whose bounds overlap a sector
	fn holes_touching(&self, sector: &Sector) -> BTreeSet<HoleId> {
		touching_holes(&self.holes, &sector.world_bounds())
	}
	/// Compile the punched land of every sector, reusing whatever has not
	/// changed since the last compile
	pub fn compile_snapshot(&self) -> Arc<TerrainSnapshot> {
		self.snapshot_compiler
			.compile(self.version, &self.sectors, &self.holes, &self.statistics)
	}
	/// Drop every cached snapshot and with them every overlay network
	pub fn invalidate_caches(&self) {
		debug!("Invalidating terrain caches");
		self.snapshot_compiler.invalidate();
	}
}

/// Ids of the holes whose bounds overlap `bounds`
fn touching_holes(
	holes: &BTreeMap<HoleId, DynamicTerrainHole>,
	bounds: &WorldBounds,
) -> BTreeSet<HoleId> {
	holes
		.iter()
		.filter(|(_, hole)| hole.world_bounds().is_some_and(|b| b.intersects(bounds)))
		.map(|(id, _)| *id)
		.collect()
}
