//! Counters describing the work done while compiling terrain and searching
//! for paths.
//!
//! A [TerrainStatistics] is handed to a [TerrainService] when it is created
//! and shared with everything compiled from it, so separate services (and
//! separate tests) never share counts.
//!

use std::sync::atomic::{AtomicU64, Ordering};

/// The kinds of work that are counted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
	/// Whole terrain snapshots assembled
	SnapshotsCompiled,
	/// Individual sector land polygons punched
	SectorSnapshotsCompiled,
	/// Overlay networks built for an agent radius
	OverlayNetworksCompiled,
	/// Crossover points accepted by a crossover point manager
	CrossoverPointsAdded,
	/// Single source shortest path runs from a crossover point
	OptimalLinkComputations,
	/// Segment visibility tests between waypoints
	VisibilityChecks,
	/// Optimal links resolved as a straight line
	DirectLinks,
	/// Optimal links resolved through intermediate waypoints
	IndirectLinks,
	/// Global path searches run
	Searches,
}

/// Thread safe counters, see [Counter]
#[derive(Debug, Default)]
pub struct TerrainStatistics {
	/// [Counter::SnapshotsCompiled]
	snapshots_compiled: AtomicU64,
	/// [Counter::SectorSnapshotsCompiled]
	sector_snapshots_compiled: AtomicU64,
	/// [Counter::OverlayNetworksCompiled]
	overlay_networks_compiled: AtomicU64,
	/// [Counter::CrossoverPointsAdded]
	crossover_points_added: AtomicU64,
	/// [Counter::OptimalLinkComputations]
	optimal_link_computations: AtomicU64,
	/// [Counter::VisibilityChecks]
	visibility_checks: AtomicU64,
	/// [Counter::DirectLinks]
	direct_links: AtomicU64,
	/// [Counter::IndirectLinks]
	indirect_links: AtomicU64,
	/// [Counter::Searches]
	searches: AtomicU64,
}

/// A plain copy of the counters at one point in time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerrainStatisticsReport {
	/// Whole terrain snapshots assembled
	pub snapshots_compiled: u64,
	/// Sector land polygons punched
	pub sector_snapshots_compiled: u64,
	/// Overlay networks built
	pub overlay_networks_compiled: u64,
	/// Crossover points accepted
	pub crossover_points_added: u64,
	/// Shortest path runs from crossover points
	pub optimal_link_computations: u64,
	/// Waypoint visibility tests
	pub visibility_checks: u64,
	/// Straight line optimal links
	pub direct_links: u64,
	/// Optimal links through waypoints
	pub indirect_links: u64,
	/// Global path searches
	pub searches: u64,
}

impl TerrainStatistics {
	/// Get the atomic behind a [Counter]
	fn counter(&self, counter: Counter) -> &AtomicU64 {
		match counter {
			Counter::SnapshotsCompiled => &self.snapshots_compiled,
			Counter::SectorSnapshotsCompiled => &self.sector_snapshots_compiled,
			Counter::OverlayNetworksCompiled => &self.overlay_networks_compiled,
			Counter::CrossoverPointsAdded => &self.crossover_points_added,
			Counter::OptimalLinkComputations => &self.optimal_link_computations,
			Counter::VisibilityChecks => &self.visibility_checks,
			Counter::DirectLinks => &self.direct_links,
			Counter::IndirectLinks => &self.indirect_links,
			Counter::Searches => &self.searches,
		}
	}
	/// Increase a counter by `amount`
	pub fn add(&self, counter: Counter, amount: u64) {
		self.counter(counter).fetch_add(amount, Ordering::Relaxed);
	}
	/// Increase a counter by one
	pub fn increment(&self, counter: Counter) {
		self.add(counter, 1);
	}
	/// Read a single counter
	pub fn get(&self, counter: Counter) -> u64 {
		self.counter(counter).load(Ordering::Relaxed)
	}
	/// Copy out every counter
	pub fn report(&self) -> TerrainStatisticsReport {
		TerrainStatisticsReport {
			snapshots_compiled: self.get(Counter::SnapshotsCompiled),
			sector_snapshots_compiled: self.get(Counter::SectorSnapshotsCompiled),
			overlay_networks_compiled: self.get(Counter::OverlayNetworksCompiled),
			crossover_points_added: self.get(Counter::CrossoverPointsAdded),
			optimal_link_computations: self.get(Counter::OptimalLinkComputations),
			visibility_checks: self.get(Counter::VisibilityChecks),
			direct_links: self.get(Counter::DirectLinks),
			indirect_links: self.get(Counter::IndirectLinks),
			searches: self.get(Counter::Searches),
		}
	}
}
