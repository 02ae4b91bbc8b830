//! The output of a path search, a plan of straight line actions an agent
//! follows one after another
//!

use bevy::math::DVec2;

use crate::prelude::*;

/// Walk in a straight line inside one sector
#[derive(Clone, Debug, PartialEq)]
pub struct WalkAction {
	/// Sector walked through
	sector_id: SectorId,
	/// Index of the overlay node walked through
	node: usize,
	/// Local start
	source: IntVector2,
	/// Local end
	destination: IntVector2,
	/// World start
	source_world: DVec2,
	/// World end
	destination_world: DVec2,
}

impl WalkAction {
	/// Create a new instance of [WalkAction]
	pub fn new(
		sector_id: SectorId,
		node: usize,
		source: IntVector2,
		destination: IntVector2,
		source_world: DVec2,
		destination_world: DVec2,
	) -> Self {
		WalkAction {
			sector_id,
			node,
			source,
			destination,
			source_world,
			destination_world,
		}
	}
	/// Get the [SectorId] walked through
	pub fn get_sector_id(&self) -> SectorId {
		self.sector_id
	}
	/// Get the index of the overlay node walked through
	pub fn get_node(&self) -> usize {
		self.node
	}
	/// Get the local start
	pub fn get_source(&self) -> IntVector2 {
		self.source
	}
	/// Get the local end
	pub fn get_destination(&self) -> IntVector2 {
		self.destination
	}
	/// Get the world start
	pub fn get_source_world(&self) -> DVec2 {
		self.source_world
	}
	/// Get the world end
	pub fn get_destination_world(&self) -> DVec2 {
		self.destination_world
	}
	/// World length of the walk
	pub fn world_length(&self) -> f64 {
		self.source_world.distance(self.destination_world)
	}
}

/// A single step of a [MotionRoadmap]
#[derive(Clone, Debug, PartialEq)]
pub enum MotionRoadmapAction {
	/// Straight segment inside one sector
	Walk(WalkAction),
}

impl MotionRoadmapAction {
	/// World position the action starts from
	pub fn get_source_world(&self) -> DVec2 {
		match self {
			MotionRoadmapAction::Walk(walk) => walk.get_source_world(),
		}
	}
	/// World position the action ends at
	pub fn get_destination_world(&self) -> DVec2 {
		match self {
			MotionRoadmapAction::Walk(walk) => walk.get_destination_world(),
		}
	}
	/// World distance covered
	pub fn world_length(&self) -> f64 {
		match self {
			MotionRoadmapAction::Walk(walk) => walk.world_length(),
		}
	}
}

/// Ordered actions taking an agent from its source to its destination
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotionRoadmap {
	/// Actions in the order they are carried out
	plan: Vec<MotionRoadmapAction>,
}

impl MotionRoadmap {
	/// Create a new instance of [MotionRoadmap]
	pub fn new(plan: Vec<MotionRoadmapAction>) -> Self {
		MotionRoadmap { plan }
	}
	/// Get the actions
	pub fn plan(&self) -> &[MotionRoadmapAction] {
		&self.plan
	}
	/// Take the actions
	pub fn into_plan(self) -> Vec<MotionRoadmapAction> {
		self.plan
	}
	/// Whether there is nothing to do, the source already is the destination
	pub fn is_empty(&self) -> bool {
		self.plan.is_empty()
	}
	/// Total world distance of the plan
	pub fn world_length(&self) -> f64 {
		self.plan.iter().map(|a| a.world_length()).sum()
	}
	/// The world positions visited, starting with the source
	pub fn world_points(&self) -> Vec<DVec2> {
		let mut points = Vec::with_capacity(self.plan.len() + 1);
		if let Some(first) = self.plan.first() {
			points.push(first.get_source_world());
		}
		points.extend(self.plan.iter().map(|a| a.get_destination_world()));
		points
	}
	/// Sectors the plan walks through, in order and without repeats in a row
	pub fn sectors_visited(&self) -> Vec<SectorId> {
		let mut sectors: Vec<SectorId> = self
			.plan
			.iter()
			.map(|a| match a {
				MotionRoadmapAction::Walk(walk) => walk.get_sector_id(),
			})
			.collect();
		sectors.dedup();
		sectors
	}
}
