//! Per sector, per agent radius cache of the cheapest local paths between the
//! points where agents may cross into neighbouring sectors.
//!
//! Crossover points are registered first, then
//! [PolyNodeCrossoverPointManager::compute_optimal_links] builds a visibility
//! graph over the crossover points and the reflex vertices of the land (the
//! only places a shortest path bends) and runs Dijkstra from every crossover
//! point. The result is a table of [PathLink]s describing a shortest path
//! tree rooted at each crossover point:
//!
//! ```text
//!    crossover i ──────────► waypoint w    links[i][w] = { cost, DIRECT_PATH_INDEX }
//!    crossover i ─► a ─► b ► waypoint w    links[i][w] = { cost, b }, links[i][b] = { .., a }
//! ```
//!
//! Pairs that cannot reach each other keep [PathLink::UNREACHABLE].
//!

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::prelude::*;

/// Sentinel predecessor meaning the waypoint is reached in a straight line
/// from the root of the tree
pub const DIRECT_PATH_INDEX: usize = usize::MAX;
/// Sentinel predecessor of a waypoint that cannot be reached
pub const UNREACHABLE_INDEX: usize = usize::MAX - 1;

/// Best known predecessor step of a shortest path tree
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathLink {
	/// Length of the whole path from the root
	pub cost: f64,
	/// Waypoint visited immediately before, or one of the sentinels
	pub prior_index: usize,
}

impl PathLink {
	/// Marker of a waypoint which cannot be reached
	pub const UNREACHABLE: PathLink = PathLink {
		cost: f64::INFINITY,
		prior_index: UNREACHABLE_INDEX,
	};
	/// A straight line from the root
	pub fn direct(cost: f64) -> Self {
		PathLink {
			cost,
			prior_index: DIRECT_PATH_INDEX,
		}
	}
	/// Whether a path exists
	pub fn is_reachable(&self) -> bool {
		self.prior_index != UNREACHABLE_INDEX
	}
	/// Whether the path is a straight line
	pub fn is_direct(&self) -> bool {
		self.prior_index == DIRECT_PATH_INDEX
	}
}

/// Entry of the Dijkstra frontier, cheapest first then lowest index
#[derive(Clone, Copy, Debug)]
struct QueueEntry {
	/// Cost from the roots
	cost: f64,
	/// Waypoint index
	index: usize,
}

impl Ord for QueueEntry {
	fn cmp(&self, other: &Self) -> Ordering {
		// reversed so the max-heap pops the cheapest
		other
			.cost
			.total_cmp(&self.cost)
			.then_with(|| other.index.cmp(&self.index))
	}
}

impl PartialOrd for QueueEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for QueueEntry {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for QueueEntry {}

/// Result of a Dijkstra run: cost and predecessor of every waypoint, a
/// predecessor of `None` marks a root
struct ShortestPaths {
	/// Cost of every waypoint
	costs: Vec<f64>,
	/// Predecessor of every waypoint
	priors: Vec<Option<usize>>,
}

/// Crossover points and local shortest paths of one overlay node
#[derive(Clone, Debug)]
pub struct PolyNodeCrossoverPointManager {
	/// Eroded land of the sector
	local_geometry_view: LocalGeometryView,
	/// Crossover points in registration order
	crossover_points: Vec<IntVector2>,
	/// Lookup from position to crossover index
	crossover_point_indices: BTreeMap<IntVector2, usize>,
	/// Crossover points followed by reflex vertices of the land
	waypoints: Vec<IntVector2>,
	/// Undirected visibility graph over the waypoints
	visibility: Vec<Vec<(usize, f64)>>,
	/// `[crossover][waypoint]` shortest path trees
	optimal_links_by_crossover: Vec<Vec<PathLink>>,
}

impl PolyNodeCrossoverPointManager {
	/// Create a new instance of [PolyNodeCrossoverPointManager]
	pub fn new(local_geometry_view: LocalGeometryView) -> Self {
		PolyNodeCrossoverPointManager {
			local_geometry_view,
			crossover_points: Vec::new(),
			crossover_point_indices: BTreeMap::new(),
			waypoints: Vec::new(),
			visibility: Vec::new(),
			optimal_links_by_crossover: Vec::new(),
		}
	}
	/// Get the eroded land view
	pub fn get_local_geometry_view(&self) -> &LocalGeometryView {
		&self.local_geometry_view
	}
	/// Get the crossover points
	pub fn get_crossover_points(&self) -> &[IntVector2] {
		&self.crossover_points
	}
	/// Get the waypoints, crossover points first
	pub fn get_waypoints(&self) -> &[IntVector2] {
		&self.waypoints
	}
	/// Get the visibility graph as adjacency lists of `(waypoint, distance)`
	pub fn get_visibility_graph(&self) -> &[Vec<(usize, f64)>] {
		&self.visibility
	}
	/// Get the shortest path trees of every crossover point
	pub fn get_optimal_links_by_crossover(&self) -> &[Vec<PathLink>] {
		&self.optimal_links_by_crossover
	}
	/// Get the link reaching `waypoint` on the tree rooted at `crossover`
	pub fn get_optimal_link(&self, crossover: usize, waypoint: usize) -> PathLink {
		self.optimal_links_by_crossover
			.get(crossover)
			.and_then(|row| row.get(waypoint))
			.copied()
			.unwrap_or(PathLink::UNREACHABLE)
	}
	/// Register a crossover point, returning its index. Points off land are
	/// refused
	pub fn add_crossover_point(&mut self, point: IntVector2) -> Option<usize> {
		debug_assert!(
			self.optimal_links_by_crossover.is_empty(),
			"Crossover points must be registered before computing links"
		);
		if let Some(index) = self.crossover_point_indices.get(&point) {
			return Some(*index);
		}
		if !self.local_geometry_view.point_in_land(point) {
			return None;
		}
		let index = self.crossover_points.len();
		self.crossover_points.push(point);
		self.crossover_point_indices.insert(point, index);
		Some(index)
	}
	/// Register the crossover points of a shared boundary interval: its two
	/// endpoints and its midpoint. Returns the indices as
	/// `[first, midpoint, second]`
	pub fn add_crossover_segment(
		&mut self,
		first: IntVector2,
		second: IntVector2,
	) -> [Option<usize>; 3] {
		let midpoint = IntVector2::new(
			((first.x as i64 + second.x as i64).div_euclid(2)) as i32,
			((first.y as i64 + second.y as i64).div_euclid(2)) as i32,
		);
		[
			self.add_crossover_point(first),
			self.add_crossover_point(midpoint),
			self.add_crossover_point(second),
		]
	}
	/// Build the visibility graph and the shortest path tree of every
	/// crossover point
	pub fn compute_optimal_links(&mut self, statistics: &TerrainStatistics) {
		let view = &self.local_geometry_view;
		let mut waypoints = self.crossover_points.clone();
		for vertex in view.get_land_poly_tree().reflex_vertices() {
			if !self.crossover_point_indices.contains_key(&vertex) {
				waypoints.push(vertex);
			}
		}
		let mut visibility = vec![Vec::new(); waypoints.len()];
		for i in 0..waypoints.len() {
			for j in (i + 1)..waypoints.len() {
				statistics.increment(Counter::VisibilityChecks);
				if view.segment_in_land(waypoints[i], waypoints[j]) {
					let distance = waypoints[i].distance(waypoints[j]);
					visibility[i].push((j, distance));
					visibility[j].push((i, distance));
				}
			}
		}
		self.waypoints = waypoints;
		self.visibility = visibility;
		let mut rows = Vec::with_capacity(self.crossover_points.len());
		for root in 0..self.crossover_points.len() {
			statistics.increment(Counter::OptimalLinkComputations);
			let paths = self.shortest_paths(&[(root, 0.0)]);
			let mut row: Vec<PathLink> = (0..self.waypoints.len())
				.map(|w| {
					if paths.costs[w].is_infinite() {
						PathLink::UNREACHABLE
					} else {
						match paths.priors[w] {
							None => PathLink::direct(paths.costs[w]),
							Some(p) if p == root => PathLink::direct(paths.costs[w]),
							Some(p) => PathLink {
								cost: paths.costs[w],
								prior_index: p,
							},
						}
					}
				})
				.collect();
			// anything visible from the root is reached in a straight line
			for (w, distance) in self.visibility[root].iter() {
				row[*w] = PathLink::direct(*distance);
			}
			let direct = row.iter().filter(|l| l.is_direct()).count() as u64;
			let indirect = row
				.iter()
				.filter(|l| l.is_reachable() && !l.is_direct())
				.count() as u64;
			statistics.add(Counter::DirectLinks, direct);
			statistics.add(Counter::IndirectLinks, indirect);
			rows.push(row);
		}
		self.optimal_links_by_crossover = rows;
	}
	/// Dijkstra over the visibility graph from several roots at once
	fn shortest_paths(&self, roots: &[(usize, f64)]) -> ShortestPaths {
		let n = self.waypoints.len();
		let mut costs = vec![f64::INFINITY; n];
		let mut priors: Vec<Option<usize>> = vec![None; n];
		let mut settled = vec![false; n];
		let mut queue = BinaryHeap::new();
		for (index, cost) in roots.iter() {
			if *cost < costs[*index] {
				costs[*index] = *cost;
				queue.push(QueueEntry {
					cost: *cost,
					index: *index,
				});
			}
		}
		while let Some(QueueEntry { cost, index }) = queue.pop() {
			if settled[index] || cost > costs[index] {
				continue;
			}
			settled[index] = true;
			for (next, distance) in self.visibility[index].iter() {
				if settled[*next] {
					continue;
				}
				let next_cost = cost + distance;
				let better = next_cost < costs[*next]
					|| (next_cost == costs[*next] && priors[*next].is_some_and(|p| index < p));
				if better {
					costs[*next] = next_cost;
					priors[*next] = Some(index);
					queue.push(QueueEntry {
						cost: next_cost,
						index: *next,
					});
				}
			}
		}
		ShortestPaths { costs, priors }
	}
	/// Waypoints visible from an arbitrary land point, with their distance
	pub fn visible_waypoints(
		&self,
		point: IntVector2,
		statistics: &TerrainStatistics,
	) -> Vec<(usize, f64)> {
		let mut visible = Vec::new();
		for (index, waypoint) in self.waypoints.iter().enumerate() {
			statistics.increment(Counter::VisibilityChecks);
			if self.local_geometry_view.segment_in_land(point, *waypoint) {
				visible.push((index, point.distance(*waypoint)));
			}
		}
		visible
	}
	/// Expand the path from `crossover` to `waypoint` into the points visited,
	/// both ends included
	pub fn path_points(&self, crossover: usize, waypoint: usize) -> Option<Vec<IntVector2>> {
		let row = self.optimal_links_by_crossover.get(crossover)?;
		if !row.get(waypoint)?.is_reachable() {
			return None;
		}
		let mut points = vec![self.waypoints[waypoint]];
		let mut current = waypoint;
		// a chain can never be longer than the waypoint count
		for _ in 0..self.waypoints.len() {
			let link = row[current];
			if link.is_direct() {
				break;
			}
			current = link.prior_index;
			points.push(self.waypoints[current]);
		}
		if current != crossover || waypoint != crossover {
			points.push(self.crossover_points[crossover]);
		}
		points.reverse();
		points.dedup();
		Some(points)
	}
	/// Shortest path between two arbitrary land points of this sector,
	/// returned as its length and the points visited
	pub fn find_local_path(
		&self,
		source: IntVector2,
		destination: IntVector2,
		statistics: &TerrainStatistics,
	) -> Option<(f64, Vec<IntVector2>)> {
		let view = &self.local_geometry_view;
		if !view.point_in_land(source) || !view.point_in_land(destination) {
			return None;
		}
		statistics.increment(Counter::VisibilityChecks);
		if view.segment_in_land(source, destination) {
			return Some((source.distance(destination), vec![source, destination]));
		}
		let roots = self.visible_waypoints(source, statistics);
		if roots.is_empty() {
			return None;
		}
		let paths = self.shortest_paths(&roots);
		let mut best: Option<(f64, usize)> = None;
		for (waypoint, distance) in self.visible_waypoints(destination, statistics) {
			let cost = paths.costs[waypoint] + distance;
			if cost.is_finite() && best.is_none_or(|(c, _)| cost < c) {
				best = Some((cost, waypoint));
			}
		}
		let (cost, last) = best?;
		let mut points = vec![destination, self.waypoints[last]];
		let mut current = last;
		while let Some(prior) = paths.priors[current] {
			current = prior;
			points.push(self.waypoints[current]);
		}
		points.push(source);
		points.reverse();
		points.dedup();
		Some((cost, points))
	}
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// 1000x1000 land with a 200x200 hole in the middle
	fn manager() -> PolyNodeCrossoverPointManager {
		let land = punch()
			.include(vec![Polygon::from_rect(&IntRect::from_coords(0, 0, 1000, 1000))])
			.exclude(vec![Polygon::from_rect(&IntRect::from_coords(400, 400, 600, 600))])
			.execute(0.0);
		PolyNodeCrossoverPointManager::new(LocalGeometryView::new(land, 0.0))
	}
	#[test]
	fn crossover_segment_points_deduplicated() {
		let mut manager = manager();
		let first = manager.add_crossover_segment(IntVector2::new(0, 0), IntVector2::new(0, 1000));
		let actual = [Some(0), Some(1), Some(2)];
		assert_eq!(actual, first);
		assert_eq!(IntVector2::new(0, 500), manager.get_crossover_points()[1]);
		let again = manager.add_crossover_segment(IntVector2::new(0, 1000), IntVector2::new(1000, 1000));
		assert_eq!([Some(2), Some(3), Some(4)], again);
		assert_eq!(5, manager.get_crossover_points().len());
	}
	#[test]
	fn crossover_off_land_refused() {
		let mut manager = manager();
		assert_eq!(None, manager.add_crossover_point(IntVector2::new(500, 500)));
		assert_eq!(None, manager.add_crossover_point(IntVector2::new(-1, 0)));
	}
	#[test]
	fn opposite_sides_route_around_hole() {
		let mut manager = manager();
		manager.add_crossover_point(IntVector2::new(0, 500));
		manager.add_crossover_point(IntVector2::new(1000, 500));
		manager.compute_optimal_links(&TerrainStatistics::default());
		let link = manager.get_optimal_link(0, 1);
		assert!(link.is_reachable());
		assert!(!link.is_direct());
		let actual = 2.0 * (400.0_f64.powi(2) + 100.0_f64.powi(2)).sqrt() + 200.0;
		assert!((link.cost - actual).abs() < 1e-9);
		let points = manager.path_points(0, 1).unwrap();
		assert_eq!(4, points.len());
		assert_eq!(IntVector2::new(0, 500), points[0]);
		assert_eq!(IntVector2::new(1000, 500), points[3]);
	}
	#[test]
	fn visible_crossovers_linked_directly() {
		let mut manager = manager();
		manager.add_crossover_point(IntVector2::new(0, 100));
		manager.add_crossover_point(IntVector2::new(1000, 100));
		manager.compute_optimal_links(&TerrainStatistics::default());
		let link = manager.get_optimal_link(0, 1);
		assert!(link.is_direct());
		assert_eq!(1000.0, link.cost);
		assert_eq!(vec![IntVector2::new(0, 100), IntVector2::new(1000, 100)], manager.path_points(0, 1).unwrap());
		assert_eq!(vec![IntVector2::new(0, 100)], manager.path_points(0, 0).unwrap());
	}
	#[test]
	fn links_are_symmetric() {
		let mut manager = manager();
		for p in [(0, 500), (1000, 500), (500, 0), (500, 1000), (0, 0), (1000, 1000), (0, 900)] {
			manager.add_crossover_point(IntVector2::new(p.0, p.1));
		}
		manager.compute_optimal_links(&TerrainStatistics::default());
		let n = manager.get_crossover_points().len();
		for i in 0..n {
			for j in 0..n {
				let a = manager.get_optimal_link(i, j).cost;
				let b = manager.get_optimal_link(j, i).cost;
				assert!((a - b).abs() < 1e-6, "{} {} {} {}", i, j, a, b);
			}
		}
	}
	#[test]
	fn disconnected_crossovers_unreachable() {
		// a wall splitting the sector in two
		let land = punch()
			.include(vec![Polygon::from_rect(&IntRect::from_coords(0, 0, 1000, 1000))])
			.exclude(vec![Polygon::from_rect(&IntRect::from_coords(450, -10, 550, 1010))])
			.execute(0.0);
		let mut manager = PolyNodeCrossoverPointManager::new(LocalGeometryView::new(land, 0.0));
		manager.add_crossover_point(IntVector2::new(0, 500));
		manager.add_crossover_point(IntVector2::new(1000, 500));
		manager.compute_optimal_links(&TerrainStatistics::default());
		assert_eq!(PathLink::UNREACHABLE, manager.get_optimal_link(0, 1));
		assert!(manager.path_points(0, 1).is_none());
	}
	#[test]
	fn local_path_around_one_corner() {
		let mut manager = manager();
		manager.compute_optimal_links(&TerrainStatistics::default());
		let (cost, points) = manager
			.find_local_path(IntVector2::new(300, 550), IntVector2::new(550, 300), &TerrainStatistics::default())
			.unwrap();
		let actual = vec![IntVector2::new(300, 550), IntVector2::new(400, 400), IntVector2::new(550, 300)];
		assert_eq!(actual, points);
		let leg = (100.0_f64.powi(2) + 150.0_f64.powi(2)).sqrt();
		assert!((cost - 2.0 * leg).abs() < 1e-9);
	}
	#[test]
	fn local_path_direct() {
		let mut manager = manager();
		manager.compute_optimal_links(&TerrainStatistics::default());
		let (cost, points) = manager
			.find_local_path(IntVector2::new(100, 100), IntVector2::new(900, 100), &TerrainStatistics::default())
			.unwrap();
		assert_eq!(800.0, cost);
		assert_eq!(2, points.len());
	}
	#[test]
	fn statistics_recorded() {
		let stats = TerrainStatistics::default();
		let mut manager = manager();
		manager.add_crossover_point(IntVector2::new(0, 500));
		manager.compute_optimal_links(&stats);
		assert_eq!(1, stats.get(Counter::OptimalLinkComputations));
		// one crossover and four reflex corners
		assert_eq!(10, stats.get(Counter::VisibilityChecks));
	}
}
