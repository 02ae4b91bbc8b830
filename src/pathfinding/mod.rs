//! Global path search across the overlay network.
//!
//! The search graph is made of the source, one node per crossover point of
//! every sector and one node per destination:
//!
//! ```text
//!  Source ──► Crossover{A,0} ──local──► Crossover{A,2} ══► Crossover{B,1} ──► Destination(0)
//!     │                                       (transition)                         ▲
//!     └──────────────────── direct when both lie in one sector ────────────────────┘
//! ```
//!
//! Edges inside a sector read the shortest local paths cached by the
//! [PolyNodeCrossoverPointManager], edges between sectors are the
//! [CrossoverEdge]s of the network. A uniform cost search (Dijkstra) over this
//! graph is expanded into a [MotionRoadmap] by following back pointers.
//!

pub mod roadmap;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::sync::Arc;

use bevy::math::DVec2;

use crate::prelude::*;
use bevy::log::{debug, trace};

/// A vertex of the global search graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchNode {
	/// Where the agent starts
	Source,
	/// A crossover point of an overlay node
	Crossover {
		/// Index of the overlay node
		node: usize,
		/// Crossover index within the node
		point: usize,
	},
	/// One of the requested destinations
	Destination(usize),
}

/// How a [SearchNode] was reached from its predecessor
#[derive(Clone, Debug, PartialEq)]
pub enum Hop {
	/// The source itself
	Start,
	/// From the source to a crossover point by way of a waypoint visible from
	/// the source
	FromSource {
		/// Index of the overlay node
		node: usize,
		/// Crossover reached
		crossover: usize,
		/// Waypoint first walked to
		via: usize,
	},
	/// Between two crossover points of one node
	Local {
		/// Index of the overlay node
		node: usize,
		/// Crossover left
		from: usize,
		/// Crossover reached
		to: usize,
	},
	/// Across the boundary between two nodes, no walking needed
	Transition,
	/// From a crossover point to a destination by way of a waypoint visible
	/// from the destination
	ToDestination {
		/// Index of the overlay node
		node: usize,
		/// Crossover left
		crossover: usize,
		/// Waypoint last walked through
		via: usize,
		/// Destination reached
		destination: usize,
	},
	/// From the source straight to a destination in the same node
	Direct {
		/// Index of the overlay node
		node: usize,
		/// Local points visited, both ends included
		points: Vec<IntVector2>,
	},
}

/// Best known way of reaching a [SearchNode]
#[derive(Clone, Debug)]
pub struct Visit {
	/// World cost from the source
	pub cost: f64,
	/// Predecessor, `None` for the source
	pub prior: Option<SearchNode>,
	/// How the node is reached from the predecessor
	pub hop: Hop,
}

/// Entry of the search frontier, cheapest first then lowest node
#[derive(Clone, Copy, Debug)]
struct Frontier {
	/// World cost from the source
	cost: f64,
	/// Node to expand
	node: SearchNode,
}

impl Ord for Frontier {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.cost
			.total_cmp(&self.cost)
			.then_with(|| other.node.cmp(&self.node))
	}
}

impl PartialOrd for Frontier {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Frontier {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for Frontier {}

/// A point of the search pinned onto the node holding it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocatedPoint {
	/// Index of the overlay node
	pub node: usize,
	/// Local lattice point
	pub local: IntVector2,
}

/// Outcome of [PathfinderCalculator::uniform_cost_search]
#[derive(Clone, Debug)]
pub struct UniformCostSearchResult {
	/// The network searched
	network: Arc<TerrainOverlayNetwork>,
	/// Where the source lies, `None` when off land
	source: Option<LocatedPoint>,
	/// Where each destination lies, `None` when off land
	destinations: Vec<Option<LocatedPoint>>,
	/// Best visit of every node settled or seen
	visits: BTreeMap<SearchNode, Visit>,
}

impl UniformCostSearchResult {
	/// Get the network searched
	pub fn get_network(&self) -> &Arc<TerrainOverlayNetwork> {
		&self.network
	}
	/// Get where the source lies
	pub fn get_source(&self) -> Option<LocatedPoint> {
		self.source
	}
	/// Get where the destinations lie
	pub fn get_destinations(&self) -> &[Option<LocatedPoint>] {
		&self.destinations
	}
	/// Get the visits
	pub fn get_visits(&self) -> &BTreeMap<SearchNode, Visit> {
		&self.visits
	}
	/// World cost of reaching a destination, `None` when unreachable
	pub fn get_cost(&self, destination: usize) -> Option<f64> {
		self.visits
			.get(&SearchNode::Destination(destination))
			.map(|v| v.cost)
	}
	/// Whether a destination was reached
	pub fn is_reachable(&self, destination: usize) -> bool {
		self.get_cost(destination).is_some()
	}
	/// Expand the route to a destination into walk actions, `None` when it
	/// is unreachable
	pub fn compute_roadmap(&self, destination: usize) -> Option<MotionRoadmap> {
		let mut hops = Vec::new();
		let mut current = SearchNode::Destination(destination);
		// a route never visits a search node twice
		for _ in 0..=self.visits.len() {
			let visit = self.visits.get(&current)?;
			hops.push(visit.hop.clone());
			match visit.prior {
				Some(prior) => current = prior,
				None => break,
			}
		}
		if current != SearchNode::Source {
			return None;
		}
		hops.reverse();
		let mut plan = Vec::new();
		for hop in hops.iter() {
			let Some((node, points)) = self.hop_points(hop) else {
				continue;
			};
			let overlay_node = self.network.get_node(node)?;
			for pair in points.windows(2) {
				if pair[0] == pair[1] {
					continue;
				}
				plan.push(MotionRoadmapAction::Walk(WalkAction::new(
					overlay_node.get_sector_id(),
					node,
					pair[0],
					pair[1],
					overlay_node.local_to_world(pair[0]),
					overlay_node.local_to_world(pair[1]),
				)));
			}
		}
		Some(MotionRoadmap::new(plan))
	}
	/// Local points walked by a hop and the node they belong to
	fn hop_points(&self, hop: &Hop) -> Option<(usize, Vec<IntVector2>)> {
		match hop {
			Hop::Start | Hop::Transition => None,
			Hop::FromSource {
				node,
				crossover,
				via,
			} => {
				let manager = self.network.get_node(*node)?.get_crossover_point_manager();
				let source = self.source?.local;
				let mut tail = manager.path_points(*crossover, *via)?;
				tail.reverse();
				let mut points = vec![source];
				points.extend(tail);
				Some((*node, points))
			}
			Hop::Local { node, from, to } => {
				let manager = self.network.get_node(*node)?.get_crossover_point_manager();
				Some((*node, manager.path_points(*from, *to)?))
			}
			Hop::ToDestination {
				node,
				crossover,
				via,
				destination,
			} => {
				let manager = self.network.get_node(*node)?.get_crossover_point_manager();
				let target = self.destinations.get(*destination).copied().flatten()?.local;
				let mut points = manager.path_points(*crossover, *via)?;
				points.push(target);
				Some((*node, points))
			}
			Hop::Direct { node, points } => Some((*node, points.clone())),
		}
	}
}

/// Finds routes across the terrain of a [TerrainService]
pub struct PathfinderCalculator<'a> {
	/// Terrain searched
	terrain_service: &'a TerrainService,
}

impl<'a> PathfinderCalculator<'a> {
	/// Create a new instance of [PathfinderCalculator]
	pub fn new(terrain_service: &'a TerrainService) -> Self {
		PathfinderCalculator { terrain_service }
	}
	/// Find the shortest route for an agent of `agent_radius` between two
	/// world points. `None` when either point is off the eroded land or no
	/// route exists
	pub fn try_find_path(
		&self,
		agent_radius: f64,
		source: DVec2,
		destination: DVec2,
	) -> Option<MotionRoadmap> {
		let result = self.uniform_cost_search(agent_radius, source, &[destination], true);
		let roadmap = result.compute_roadmap(0);
		match &roadmap {
			Some(r) => debug!(
				"Path found from {:?} to {:?} with {} actions",
				source,
				destination,
				r.plan().len()
			),
			None => debug!("No path from {:?} to {:?}", source, destination),
		}
		roadmap
	}
	/// Search outwards from `source` until every destination is settled, or
	/// the first one is when `stop_at_first_find` is set
	pub fn uniform_cost_search(
		&self,
		agent_radius: f64,
		source: DVec2,
		destinations: &[DVec2],
		stop_at_first_find: bool,
	) -> UniformCostSearchResult {
		let statistics = self.terrain_service.get_statistics();
		statistics.increment(Counter::Searches);
		let snapshot = self.terrain_service.compile_snapshot();
		let network = snapshot.compile_overlay_network(agent_radius);
		let locate = |world: DVec2| {
			network.find_node_containing(world).and_then(|node| {
				let local = network.get_node(node)?.world_to_local(world);
				Some(LocatedPoint { node, local })
			})
		};
		let located_source = locate(source);
		let located_destinations: Vec<Option<LocatedPoint>> =
			destinations.iter().map(|d| locate(*d)).collect();
		let mut result = UniformCostSearchResult {
			network: network.clone(),
			source: located_source,
			destinations: located_destinations,
			visits: BTreeMap::new(),
		};
		let Some(located_source) = located_source else {
			return result;
		};
		if result.destinations.iter().all(|d| d.is_none()) {
			return result;
		}
		let search = Search::new(&network, located_source, &result.destinations, statistics);
		result.visits = search.run(stop_at_first_find);
		result
	}
}

/// State of one uniform cost search
struct Search<'n> {
	/// Network searched
	network: &'n TerrainOverlayNetwork,
	/// Located source
	source: LocatedPoint,
	/// Located destinations
	destinations: &'n [Option<LocatedPoint>],
	/// `(waypoint, local distance)` visible from the source
	source_visible: Vec<(usize, f64)>,
	/// `(waypoint, local distance)` visible from each destination
	destination_visible: Vec<Vec<(usize, f64)>>,
	/// Work counters
	statistics: &'n TerrainStatistics,
}

impl<'n> Search<'n> {
	/// Precompute the waypoints visible from the source and destinations
	fn new(
		network: &'n TerrainOverlayNetwork,
		source: LocatedPoint,
		destinations: &'n [Option<LocatedPoint>],
		statistics: &'n TerrainStatistics,
	) -> Self {
		let visible_from = |p: LocatedPoint| {
			network
				.get_node(p.node)
				.map(|n| {
					n.get_crossover_point_manager()
						.visible_waypoints(p.local, statistics)
				})
				.unwrap_or_default()
		};
		let source_visible = visible_from(source);
		let destination_visible = destinations
			.iter()
			.map(|d| d.map(&visible_from).unwrap_or_default())
			.collect();
		Search {
			network,
			source,
			destinations,
			source_visible,
			destination_visible,
			statistics,
		}
	}
	/// Dijkstra from the source
	fn run(&self, stop_at_first_find: bool) -> BTreeMap<SearchNode, Visit> {
		let mut visits: BTreeMap<SearchNode, Visit> = BTreeMap::new();
		let mut settled: BTreeSet<SearchNode> = BTreeSet::new();
		let mut frontier = BinaryHeap::new();
		visits.insert(SearchNode::Source, Visit {
			cost: 0.0,
			prior: None,
			hop: Hop::Start,
		});
		frontier.push(Frontier {
			cost: 0.0,
			node: SearchNode::Source,
		});
		let remaining_total = self.destinations.iter().filter(|d| d.is_some()).count();
		let mut found = 0;
		while let Some(Frontier { cost, node }) = frontier.pop() {
			if settled.contains(&node) {
				continue;
			}
			if visits.get(&node).is_some_and(|v| cost > v.cost) {
				continue;
			}
			settled.insert(node);
			let mut relax = |next: SearchNode, next_cost: f64, hop: Hop| {
				if settled.contains(&next) || !next_cost.is_finite() {
					return;
				}
				let better = visits.get(&next).is_none_or(|v| next_cost < v.cost);
				if better {
					visits.insert(next, Visit {
						cost: next_cost,
						prior: Some(node),
						hop,
					});
					frontier.push(Frontier {
						cost: next_cost,
						node: next,
					});
				}
			};
			match node {
				SearchNode::Source => self.expand_source(&mut relax),
				SearchNode::Crossover { node, point } => {
					self.expand_crossover(node, point, cost, &mut relax)
				}
				SearchNode::Destination(_) => {
					found += 1;
					if stop_at_first_find || found >= remaining_total {
						break;
					}
				}
			}
		}
		// unsettled destinations could still improve
		visits.retain(|node, _| {
			!matches!(node, SearchNode::Destination(_)) || settled.contains(node)
		});
		trace!("Search settled {} nodes", settled.len());
		visits
	}
	/// Edges leaving the source
	fn expand_source(&self, relax: &mut impl FnMut(SearchNode, f64, Hop)) {
		let node_index = self.source.node;
		let Some(node) = self.network.get_node(node_index) else {
			return;
		};
		let manager = node.get_crossover_point_manager();
		let scale = node.get_local_scale();
		for crossover in 0..manager.get_crossover_points().len() {
			let mut best: Option<(f64, usize)> = None;
			for (waypoint, distance) in self.source_visible.iter() {
				let link = manager.get_optimal_link(crossover, *waypoint);
				if !link.is_reachable() {
					continue;
				}
				let cost = distance + link.cost;
				if best.is_none_or(|(c, _)| cost < c) {
					best = Some((cost, *waypoint));
				}
			}
			if let Some((cost, via)) = best {
				relax(
					SearchNode::Crossover {
						node: node_index,
						point: crossover,
					},
					cost * scale,
					Hop::FromSource {
						node: node_index,
						crossover,
						via,
					},
				);
			}
		}
		for (index, destination) in self.destinations.iter().enumerate() {
			let Some(destination) = destination else {
				continue;
			};
			if destination.node != node_index {
				continue;
			}
			if let Some((cost, points)) =
				manager.find_local_path(self.source.local, destination.local, self.statistics)
			{
				relax(SearchNode::Destination(index), cost * scale, Hop::Direct {
					node: node_index,
					points,
				});
			}
		}
	}
	/// Edges leaving a crossover point
	fn expand_crossover(
		&self,
		node_index: usize,
		point: usize,
		cost: f64,
		relax: &mut impl FnMut(SearchNode, f64, Hop),
	) {
		let Some(node) = self.network.get_node(node_index) else {
			return;
		};
		let manager = node.get_crossover_point_manager();
		let scale = node.get_local_scale();
		for other in 0..manager.get_crossover_points().len() {
			if other == point {
				continue;
			}
			let link = manager.get_optimal_link(point, other);
			if link.is_reachable() {
				relax(
					SearchNode::Crossover {
						node: node_index,
						point: other,
					},
					cost + link.cost * scale,
					Hop::Local {
						node: node_index,
						from: point,
						to: other,
					},
				);
			}
		}
		for edge in node.edges_from(point) {
			relax(
				SearchNode::Crossover {
					node: edge.destination_node,
					point: edge.destination_point,
				},
				cost + edge.cost,
				Hop::Transition,
			);
		}
		for (index, destination) in self.destinations.iter().enumerate() {
			let Some(destination) = destination else {
				continue;
			};
			if destination.node != node_index {
				continue;
			}
			let mut best: Option<(f64, usize)> = None;
			for (waypoint, distance) in self.destination_visible[index].iter() {
				let link = manager.get_optimal_link(point, *waypoint);
				if !link.is_reachable() {
					continue;
				}
				let local = link.cost + distance;
				if best.is_none_or(|(c, _)| local < c) {
					best = Some((local, *waypoint));
				}
			}
			if let Some((local, via)) = best {
				relax(
					SearchNode::Destination(index),
					cost + local * scale,
					Hop::ToDestination {
						node: node_index,
						crossover: point,
						via,
						destination: index,
					},
				);
			}
		}
	}
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use bevy::math::DAffine2;

	use super::*;
	/// One 1000x1000 sector with a 200x200 hole in the middle
	fn service() -> TerrainService {
		let mut service = TerrainService::new();
		let metadata = TerrainStaticMetadata::new(
			IntRect::from_coords(0, 0, 1000, 1000),
			vec![],
			vec![Polygon::from_rect(&IntRect::from_coords(400, 400, 600, 600))],
		);
		service.add_sector(Arc::new(metadata), DAffine2::IDENTITY).unwrap();
		service
	}
	#[test]
	fn route_around_hole() {
		let service = service();
		let pathfinder = PathfinderCalculator::new(&service);
		let roadmap = pathfinder.try_find_path(0.0, DVec2::new(100.0, 500.0), DVec2::new(900.0, 500.0)).unwrap();
		assert_eq!(3, roadmap.plan().len());
		let actual = 2.0 * (300.0_f64.powi(2) + 100.0_f64.powi(2)).sqrt() + 200.0;
		assert!((roadmap.world_length() - actual).abs() < 1e-6);
		let points = roadmap.world_points();
		assert_eq!(DVec2::new(100.0, 500.0), points[0]);
		assert_eq!(DVec2::new(900.0, 500.0), points[3]);
	}
	#[test]
	fn route_around_one_corner() {
		let service = service();
		let pathfinder = PathfinderCalculator::new(&service);
		let roadmap = pathfinder.try_find_path(0.0, DVec2::new(300.0, 550.0), DVec2::new(550.0, 300.0)).unwrap();
		assert_eq!(2, roadmap.plan().len());
		assert_eq!(DVec2::new(400.0, 400.0), roadmap.plan()[0].get_destination_world());
	}
	#[test]
	fn straight_route() {
		let service = service();
		let pathfinder = PathfinderCalculator::new(&service);
		let roadmap = pathfinder.try_find_path(0.0, DVec2::new(100.0, 100.0), DVec2::new(900.0, 150.0)).unwrap();
		assert_eq!(1, roadmap.plan().len());
	}
	#[test]
	fn source_in_hole() {
		let service = service();
		let pathfinder = PathfinderCalculator::new(&service);
		assert!(pathfinder.try_find_path(0.0, DVec2::new(500.0, 500.0), DVec2::new(900.0, 500.0)).is_none());
		assert!(pathfinder.try_find_path(0.0, DVec2::new(100.0, 500.0), DVec2::new(2000.0, 500.0)).is_none());
	}
	#[test]
	fn same_point_is_empty_roadmap() {
		let service = service();
		let pathfinder = PathfinderCalculator::new(&service);
		let roadmap = pathfinder.try_find_path(0.0, DVec2::new(100.0, 100.0), DVec2::new(100.0, 100.0)).unwrap();
		assert!(roadmap.is_empty());
	}
	#[test]
	fn several_destinations() {
		let service = service();
		let pathfinder = PathfinderCalculator::new(&service);
		let destinations = [DVec2::new(900.0, 500.0), DVec2::new(500.0, 500.0), DVec2::new(100.0, 900.0)];
		let result = pathfinder.uniform_cost_search(0.0, DVec2::new(100.0, 500.0), &destinations, false);
		assert!(result.is_reachable(0));
		assert!(!result.is_reachable(1));
		assert!(result.compute_roadmap(1).is_none());
		assert_eq!(Some(400.0), result.get_cost(2));
		assert_eq!(1, result.compute_roadmap(2).unwrap().plan().len());
	}
	#[test]
	fn searches_counted() {
		let service = service();
		let pathfinder = PathfinderCalculator::new(&service);
		pathfinder.try_find_path(0.0, DVec2::new(100.0, 100.0), DVec2::new(900.0, 900.0));
		pathfinder.try_find_path(0.0, DVec2::new(100.0, 100.0), DVec2::new(900.0, 900.0));
		assert_eq!(2, service.get_statistics().get(Counter::Searches));
		assert_eq!(1, service.get_statistics().get(Counter::OverlayNetworksCompiled));
	}
}
