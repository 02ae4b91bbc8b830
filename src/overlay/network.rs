//! The overlay network stitches the eroded land of every sector together for
//! one agent radius.
//!
//! Each sector becomes a [TerrainOverlayNode]. Sectors whose boundary sides
//! meet in world space are adjacent, and wherever both have land along the
//! shared side the interval is handed to the [PolyNodeCrossoverPointManager]
//! of each. The points the two managers derive are matched up in world space
//! and joined by [CrossoverEdge]s.
//!
//! ```text
//!  ┌──────────────┐┌──────────────┐
//!  │      A       ││      B       │
//!  │         a0 ●═══● b0          │
//!  │  ▓▓▓▓▓       ││              │
//!  │  ▓▓▓▓▓  a1 ●═══● b1    ▓▓▓   │
//!  │              ││        ▓▓▓   │
//!  │         a2 ●═══● b2          │
//!  └──────────────┘└──────────────┘
//! ```
//!
//! Networks are compiled at most once per radius per [TerrainSnapshot] by the
//! [OverlayNetworkManager].
//!

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::math::{DAffine2, DVec2};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::prelude::*;
use bevy::log::{debug, trace, warn};

/// A directed edge from a crossover point of one node onto the matching
/// crossover point of a neighbouring node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrossoverEdge {
	/// Crossover index in the node owning the edge
	pub source_point: usize,
	/// Index of the neighbouring node
	pub destination_node: usize,
	/// Crossover index in the neighbouring node
	pub destination_point: usize,
	/// World distance between the two points
	pub cost: f64,
}

/// One sector of a [TerrainOverlayNetwork]
#[derive(Clone, Debug)]
pub struct TerrainOverlayNode {
	/// The punched land the node was eroded from
	sector: Arc<SectorSnapshot>,
	/// Crossover points and the shortest paths between them
	crossover_point_manager: PolyNodeCrossoverPointManager,
	/// Outbound edges keyed by the index of the neighbouring node
	edge_groups: BTreeMap<usize, Vec<CrossoverEdge>>,
	/// Factor converting local distances into world distances
	local_scale: f64,
}

impl TerrainOverlayNode {
	/// Get the sector snapshot
	pub fn get_sector_snapshot(&self) -> &Arc<SectorSnapshot> {
		&self.sector
	}
	/// Get the [SectorId]
	pub fn get_sector_id(&self) -> SectorId {
		self.sector.get_sector_id()
	}
	/// Get the eroded land
	pub fn get_land_poly_tree(&self) -> &PolyTree {
		self.crossover_point_manager
			.get_local_geometry_view()
			.get_land_poly_tree()
	}
	/// Get the eroded land view
	pub fn get_local_geometry_view(&self) -> &LocalGeometryView {
		self.crossover_point_manager.get_local_geometry_view()
	}
	/// Get the crossover point manager
	pub fn get_crossover_point_manager(&self) -> &PolyNodeCrossoverPointManager {
		&self.crossover_point_manager
	}
	/// Get the outbound edges keyed by neighbouring node
	pub fn get_edge_groups(&self) -> &BTreeMap<usize, Vec<CrossoverEdge>> {
		&self.edge_groups
	}
	/// Outbound edges leaving from one crossover point
	pub fn edges_from(&self, crossover: usize) -> impl Iterator<Item = &CrossoverEdge> + '_ {
		self.edge_groups
			.values()
			.flatten()
			.filter(move |e| e.source_point == crossover)
	}
	/// Get the factor converting local distances into world distances
	pub fn get_local_scale(&self) -> f64 {
		self.local_scale
	}
	/// Map a local point into the world
	pub fn local_to_world(&self, point: IntVector2) -> DVec2 {
		self.sector.local_to_world(point)
	}
	/// Map a world point onto the nearest local lattice point
	pub fn world_to_local(&self, point: DVec2) -> IntVector2 {
		IntVector2::from_dvec2_rounded(
			self.sector
				.get_world_transform_inv()
				.transform_point2(point),
		)
	}
	/// Whether a world point lies on the eroded land of this node.
	///
	/// Searches start and end on the nearest lattice point, so both it and
	/// the point itself, to the nearest half unit, must be on land. A point
	/// whose rounding would carry it out of a hole is refused
	pub fn contains_world_point(&self, point: DVec2) -> bool {
		let exact = self
			.sector
			.get_world_transform_inv()
			.transform_point2(point);
		let local = IntVector2::from_dvec2_rounded(exact);
		let (qx, qy) = ((exact.x * 2.0).round() as i64, (exact.y * 2.0).round() as i64);
		self.sector.get_local_boundary().contains(local)
			&& self.get_local_geometry_view().point_in_land(local)
			&& self.get_land_poly_tree().classify_point_doubled(qx, qy) != PointContainment::Outside
	}
}

/// Every sector eroded for one agent radius and linked to its neighbours
#[derive(Clone, Debug)]
pub struct TerrainOverlayNetwork {
	/// Version of the snapshot compiled from
	version: u64,
	/// Agent radius the land is eroded by
	agent_radius: f64,
	/// One node per sector in [SectorId] order
	nodes: Vec<TerrainOverlayNode>,
}

impl TerrainOverlayNetwork {
	/// Get the snapshot version the network was compiled from
	pub fn get_version(&self) -> u64 {
		self.version
	}
	/// Get the agent radius
	pub fn get_agent_radius(&self) -> f64 {
		self.agent_radius
	}
	/// Get the nodes
	pub fn get_nodes(&self) -> &[TerrainOverlayNode] {
		&self.nodes
	}
	/// Get a node
	pub fn get_node(&self, index: usize) -> Option<&TerrainOverlayNode> {
		self.nodes.get(index)
	}
	/// Index of the node of a sector
	pub fn node_of_sector(&self, sector_id: SectorId) -> Option<usize> {
		self.nodes.iter().position(|n| n.get_sector_id() == sector_id)
	}
	/// Index of the first node whose eroded land holds a world point
	pub fn find_node_containing(&self, point: DVec2) -> Option<usize> {
		self.nodes.iter().position(|n| n.contains_world_point(point))
	}
	/// Total number of directed crossover edges
	pub fn edge_count(&self) -> usize {
		self.nodes
			.iter()
			.flat_map(|n| n.edge_groups.values())
			.map(|group| group.len())
			.sum()
	}
}

/// Compute-once cells of overlay networks keyed by agent radius
#[derive(Debug, Default)]
pub struct OverlayNetworkManager {
	/// Keyed by the bits of the radius
	networks: Mutex<BTreeMap<u64, Arc<OnceCell<Arc<TerrainOverlayNetwork>>>>>,
}

impl OverlayNetworkManager {
	/// Radii with a compiled network
	pub fn get_compiled_radii(&self) -> Vec<f64> {
		self.networks
			.lock()
			.iter()
			.filter(|(_, cell)| cell.get().is_some())
			.map(|(bits, _)| f64::from_bits(*bits))
			.collect()
	}
	/// Return the network for `agent_radius`, compiling it on first request.
	/// Concurrent requests for the same radius wait on a single compile
	pub fn compile_terrain_overlay_network(
		&self,
		version: u64,
		sectors: &[Arc<SectorSnapshot>],
		agent_radius: f64,
		statistics: &Arc<TerrainStatistics>,
	) -> Arc<TerrainOverlayNetwork> {
		if !agent_radius.is_finite() || agent_radius < 0.0 {
			panic!(
				"Agent radius must be finite and non-negative, found {}",
				agent_radius
			);
		}
		// folds -0.0 onto 0.0
		let agent_radius = agent_radius + 0.0;
		let cell = self
			.networks
			.lock()
			.entry(agent_radius.to_bits())
			.or_default()
			.clone();
		let network = cell.get_or_init(|| {
			statistics.increment(Counter::OverlayNetworksCompiled);
			Arc::new(compile_network(version, sectors, agent_radius, statistics))
		});
		network.clone()
	}
}

/// Two sectors whose boundary sides meet in world space
#[derive(Clone, Copy, Debug)]
struct SectorAdjacency {
	/// Index of the first sector
	a: usize,
	/// Side of the first sector
	a_side: RectSide,
	/// Index of the second sector
	b: usize,
	/// Side of the second sector
	b_side: RectSide,
	/// World start of the first sector's side
	origin: DVec2,
	/// Unit world direction of the first sector's side
	direction: DVec2,
	/// Overlap of the two sides along `direction`
	overlap: (f64, f64),
}

/// World space endpoints of a side
fn world_side(sector: &SectorSnapshot, side: RectSide) -> (DVec2, DVec2) {
	let (first, second) = sector.get_local_boundary().side(side);
	(sector.local_to_world(first), sector.local_to_world(second))
}

/// World space centre of a sector
fn world_centre(sector: &SectorSnapshot) -> DVec2 {
	let boundary = sector.get_local_boundary();
	let centre = (boundary.min.as_dvec2() + boundary.max.as_dvec2()) / 2.0;
	sector.get_world_transform().transform_point2(centre)
}

/// Every pair of sector sides which are collinear, face each other and
/// overlap by more than [ADJACENCY_EPSILON]
fn find_adjacencies(sectors: &[Arc<SectorSnapshot>]) -> Vec<SectorAdjacency> {
	let mut adjacencies = Vec::new();
	for a in 0..sectors.len() {
		for b in (a + 1)..sectors.len() {
			let centre_a = world_centre(&sectors[a]);
			let centre_b = world_centre(&sectors[b]);
			for a_side in RectSide::ALL {
				let (a0, a1) = world_side(&sectors[a], a_side);
				let length = a0.distance(a1);
				if length <= ADJACENCY_EPSILON {
					continue;
				}
				let direction = (a1 - a0) / length;
				let normal = direction.perp();
				for b_side in RectSide::ALL {
					let (b0, b1) = world_side(&sectors[b], b_side);
					let collinear = normal.dot(b0 - a0).abs() <= ADJACENCY_EPSILON
						&& normal.dot(b1 - a0).abs() <= ADJACENCY_EPSILON;
					if !collinear {
						continue;
					}
					let facing = normal.dot(centre_a - a0) * normal.dot(centre_b - a0) < 0.0;
					if !facing {
						continue;
					}
					let (u0, u1) = (direction.dot(b0 - a0), direction.dot(b1 - a0));
					let low = u0.min(u1).max(0.0);
					let high = u0.max(u1).min(length);
					if high - low > ADJACENCY_EPSILON {
						adjacencies.push(SectorAdjacency {
							a,
							a_side,
							b,
							b_side,
							origin: a0,
							direction,
							overlap: (low, high),
						});
					}
				}
			}
		}
	}
	adjacencies
}

/// Erode the punched land of a sector by the agent radius. The skirt strips
/// lie beyond the parts of the boundary a neighbour covers, so erosion does
/// not pull the land away from them
fn erode_sector_land(sector: &SectorSnapshot, skirt: &[Polygon], agent_radius: f64) -> PolyTree {
	let punched = sector.get_punched_land();
	if agent_radius == 0.0 || punched.is_empty() {
		return punched.clone();
	}
	let boundary = *sector.get_local_boundary();
	let mut polygons = punched.flatten_to_polygons(true);
	polygons.extend(skirt.iter().cloned());
	let eroded = offset().include(polygons).erode(agent_radius).execute();
	crop(&eroded.flatten_to_polygons(true), &boundary)
}

/// Strip `margin` deep beyond one side of a sector, spanning the part of the
/// side between the world points `covered`. An end reaching a corner runs on
/// past it when another sector covers the diagonal beyond that corner
fn skirt_strip(
	sectors: &[Arc<SectorSnapshot>],
	index: usize,
	side: RectSide,
	covered: (DVec2, DVec2),
	margin: i32,
) -> Option<Polygon> {
	let sector = &sectors[index];
	let boundary = *sector.get_local_boundary();
	let first = to_local(sector, covered.0);
	let second = to_local(sector, covered.1);
	let (u0, u1, side_min, side_max) = match side {
		RectSide::Left | RectSide::Right => (first.y, second.y, boundary.min.y, boundary.max.y),
		RectSide::Bottom | RectSide::Top => (first.x, second.x, boundary.min.x, boundary.max.x),
	};
	let mut low = u0.min(u1).max(side_min);
	let mut high = u0.max(u1).min(side_max);
	if high <= low {
		return None;
	}
	if low == side_min && corner_covered(sectors, index, side, false) {
		low -= margin;
	}
	if high == side_max && corner_covered(sectors, index, side, true) {
		high += margin;
	}
	let rect = match side {
		RectSide::Bottom => IntRect::from_coords(low, boundary.min.y - margin, high, boundary.min.y),
		RectSide::Right => IntRect::from_coords(boundary.max.x, low, boundary.max.x + margin, high),
		RectSide::Top => IntRect::from_coords(low, boundary.max.y, high, boundary.max.y + margin),
		RectSide::Left => IntRect::from_coords(boundary.min.x - margin, low, boundary.min.x, high),
	};
	Some(Polygon::from_rect(&rect))
}

/// Whether a sector other than `index` covers the world just diagonally
/// beyond the low or high end of a side
fn corner_covered(sectors: &[Arc<SectorSnapshot>], index: usize, side: RectSide, at_max: bool) -> bool {
	let sector = &sectors[index];
	let boundary = sector.get_local_boundary();
	let (min, max) = (boundary.min.as_dvec2(), boundary.max.as_dvec2());
	let along = if at_max { 0.5 } else { -0.5 };
	let local = match side {
		RectSide::Bottom => DVec2::new(if at_max { max.x } else { min.x } + along, min.y - 0.5),
		RectSide::Right => DVec2::new(max.x + 0.5, if at_max { max.y } else { min.y } + along),
		RectSide::Top => DVec2::new(if at_max { max.x } else { min.x } + along, max.y + 0.5),
		RectSide::Left => DVec2::new(min.x - 0.5, if at_max { max.y } else { min.y } + along),
	};
	let world = sector.get_world_transform().transform_point2(local);
	sectors.iter().enumerate().any(|(other, snapshot)| {
		if other == index {
			return false;
		}
		let point = snapshot.get_world_transform_inv().transform_point2(world);
		let bounds = snapshot.get_local_boundary();
		point.x > bounds.min.x as f64
			&& point.x < bounds.max.x as f64
			&& point.y > bounds.min.y as f64
			&& point.y < bounds.max.y as f64
	})
}

/// Merged intervals, along an adjacency's world line, where a node has land
/// on the given side
fn land_intervals(
	sector: &SectorSnapshot,
	land: &PolyTree,
	side: RectSide,
	adjacency: &SectorAdjacency,
) -> Vec<(f64, f64)> {
	let boundary = sector.get_local_boundary();
	let mut intervals: Vec<(f64, f64)> = Vec::new();
	for index in land.land_indices() {
		for segment in contour_segments(land.get_node(index).get_contour()) {
			if !boundary.side_contains_segment(side, &segment) {
				continue;
			}
			let u0 = adjacency
				.direction
				.dot(sector.local_to_world(segment.first) - adjacency.origin);
			let u1 = adjacency
				.direction
				.dot(sector.local_to_world(segment.second) - adjacency.origin);
			intervals.push((u0.min(u1), u0.max(u1)));
		}
	}
	intervals.sort_by(|x, y| x.0.total_cmp(&y.0));
	let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
	for interval in intervals {
		match merged.last_mut() {
			Some(last) if interval.0 <= last.1 + ADJACENCY_EPSILON => {
				last.1 = last.1.max(interval.1);
			}
			_ => merged.push(interval),
		}
	}
	merged
}

/// Pieces of the overlap where both sectors have land
fn crossover_intervals(
	a: &[(f64, f64)],
	b: &[(f64, f64)],
	overlap: (f64, f64),
) -> Vec<(f64, f64)> {
	let mut intervals = Vec::new();
	for x in a.iter() {
		for y in b.iter() {
			let low = x.0.max(y.0).max(overlap.0);
			let high = x.1.min(y.1).min(overlap.1);
			if high - low > ADJACENCY_EPSILON {
				intervals.push((low, high));
			}
		}
	}
	intervals
}

/// Map a world point onto the lattice of a sector
fn to_local(sector: &SectorSnapshot, world: DVec2) -> IntVector2 {
	IntVector2::from_dvec2_rounded(sector.get_world_transform_inv().transform_point2(world))
}

/// Square root of the absolute determinant, the uniform scale of a transform
fn local_scale(transform: &DAffine2) -> f64 {
	transform.matrix2.determinant().abs().sqrt()
}

/// Build the network of one agent radius
fn compile_network(
	version: u64,
	sectors: &[Arc<SectorSnapshot>],
	agent_radius: f64,
	statistics: &TerrainStatistics,
) -> TerrainOverlayNetwork {
	let adjacencies = find_adjacencies(sectors);
	let mut skirts: Vec<Vec<Polygon>> = vec![Vec::new(); sectors.len()];
	if agent_radius > 0.0 {
		let margin = agent_radius.ceil() as i32 + 1;
		for adjacency in adjacencies.iter() {
			let covered = (
				adjacency.origin + adjacency.direction * adjacency.overlap.0,
				adjacency.origin + adjacency.direction * adjacency.overlap.1,
			);
			skirts[adjacency.a].extend(skirt_strip(sectors, adjacency.a, adjacency.a_side, covered, margin));
			skirts[adjacency.b].extend(skirt_strip(sectors, adjacency.b, adjacency.b_side, covered, margin));
		}
	}
	let mut managers: Vec<PolyNodeCrossoverPointManager> = sectors
		.iter()
		.zip(skirts.iter())
		.map(|(sector, skirt)| {
			trace!(
				"Eroding sector {:?} by {}",
				sector.get_sector_id(),
				agent_radius
			);
			let land = erode_sector_land(sector, skirt, agent_radius);
			PolyNodeCrossoverPointManager::new(LocalGeometryView::new(land, agent_radius))
		})
		.collect();
	let mut edge_groups: Vec<BTreeMap<usize, Vec<CrossoverEdge>>> =
		vec![BTreeMap::new(); sectors.len()];
	for adjacency in adjacencies.iter() {
		let (a, b) = (adjacency.a, adjacency.b);
		let intervals_a = land_intervals(
			&sectors[a],
			managers[a].get_local_geometry_view().get_land_poly_tree(),
			adjacency.a_side,
			adjacency,
		);
		let intervals_b = land_intervals(
			&sectors[b],
			managers[b].get_local_geometry_view().get_land_poly_tree(),
			adjacency.b_side,
			adjacency,
		);
		for (low, high) in crossover_intervals(&intervals_a, &intervals_b, adjacency.overlap) {
			let first = adjacency.origin + adjacency.direction * low;
			let second = adjacency.origin + adjacency.direction * high;
			let points_a = managers[a].add_crossover_segment(
				to_local(&sectors[a], first),
				to_local(&sectors[a], second),
			);
			let points_b = managers[b].add_crossover_segment(
				to_local(&sectors[b], first),
				to_local(&sectors[b], second),
			);
			for (point_a, point_b) in points_a.into_iter().zip(points_b) {
				let (Some(point_a), Some(point_b)) = (point_a, point_b) else {
					warn!(
						"Crossover point between sectors {:?} and {:?} is off land",
						sectors[a].get_sector_id(),
						sectors[b].get_sector_id()
					);
					continue;
				};
				let world_a = sectors[a].local_to_world(managers[a].get_crossover_points()[point_a]);
				let world_b = sectors[b].local_to_world(managers[b].get_crossover_points()[point_b]);
				let cost = world_a.distance(world_b);
				if cost > CROSSOVER_MATCH_EPSILON {
					warn!(
						"Crossover points of sectors {:?} and {:?} are {} apart",
						sectors[a].get_sector_id(),
						sectors[b].get_sector_id(),
						cost
					);
					continue;
				}
				push_edge(&mut edge_groups[a], CrossoverEdge {
					source_point: point_a,
					destination_node: b,
					destination_point: point_b,
					cost,
				});
				push_edge(&mut edge_groups[b], CrossoverEdge {
					source_point: point_b,
					destination_node: a,
					destination_point: point_a,
					cost,
				});
			}
		}
	}
	for manager in managers.iter() {
		statistics.add(
			Counter::CrossoverPointsAdded,
			manager.get_crossover_points().len() as u64,
		);
	}
	compute_all_optimal_links(&mut managers, statistics);
	let nodes: Vec<TerrainOverlayNode> = sectors
		.iter()
		.zip(managers)
		.zip(edge_groups)
		.map(|((sector, crossover_point_manager), edge_groups)| TerrainOverlayNode {
			local_scale: local_scale(sector.get_world_transform()),
			sector: sector.clone(),
			crossover_point_manager,
			edge_groups,
		})
		.collect();
	let network = TerrainOverlayNetwork {
		version,
		agent_radius,
		nodes,
	};
	debug!(
		"Compiled overlay network for radius {} at version {} with {} nodes and {} crossover edges",
		agent_radius,
		version,
		network.nodes.len(),
		network.edge_count()
	);
	network
}

/// Add an edge unless an identical one exists
fn push_edge(groups: &mut BTreeMap<usize, Vec<CrossoverEdge>>, edge: CrossoverEdge) {
	let group = groups.entry(edge.destination_node).or_default();
	let exists = group.iter().any(|e| {
		e.source_point == edge.source_point && e.destination_point == edge.destination_point
	});
	if !exists {
		group.push(edge);
	}
}

/// Compute the optimal links of every node, one node per thread
#[cfg(feature = "multithread")]
fn compute_all_optimal_links(
	managers: &mut [PolyNodeCrossoverPointManager],
	statistics: &TerrainStatistics,
) {
	use rayon::prelude::*;
	managers
		.par_iter_mut()
		.for_each(|manager| manager.compute_optimal_links(statistics));
}

/// Compute the optimal links of every node
#[cfg(not(feature = "multithread"))]
fn compute_all_optimal_links(
	managers: &mut [PolyNodeCrossoverPointManager],
	statistics: &TerrainStatistics,
) {
	for manager in managers.iter_mut() {
		manager.compute_optimal_links(statistics);
	}
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Punch a sector snapshot through a throwaway service
	fn snapshot(transforms: &[DAffine2], hole: Option<IntRect>) -> Arc<TerrainSnapshot> {
		let mut service = TerrainService::new();
		let metadata = Arc::new(TerrainStaticMetadata::from_rect(IntRect::from_coords(0, 0, 1000, 1000)));
		for t in transforms {
			service.add_sector(metadata.clone(), *t).unwrap();
		}
		if let Some(hole) = hole {
			service.add_hole(DynamicTerrainHole::from_rect(&hole));
		}
		service.compile_snapshot()
	}
	/// Translation along x
	fn shift(x: f64) -> DAffine2 {
		DAffine2::from_translation(DVec2::new(x, 0.0))
	}
	#[test]
	fn single_sector_has_no_edges() {
		let snapshot = snapshot(&[DAffine2::IDENTITY], Some(IntRect::from_coords(400, 400, 600, 600)));
		let network = snapshot.compile_overlay_network(0.0);
		assert_eq!(1, network.get_nodes().len());
		assert_eq!(0, network.edge_count());
		assert!(network.get_nodes()[0].get_crossover_point_manager().get_crossover_points().is_empty());
	}
	#[test]
	fn side_by_side_sectors_linked() {
		let snapshot = snapshot(&[DAffine2::IDENTITY, shift(1000.0)], None);
		let network = snapshot.compile_overlay_network(0.0);
		let a = &network.get_nodes()[0];
		let actual = vec![IntVector2::new(1000, 0), IntVector2::new(1000, 500), IntVector2::new(1000, 1000)];
		assert_eq!(actual, a.get_crossover_point_manager().get_crossover_points());
		let b = &network.get_nodes()[1];
		let actual = vec![IntVector2::new(0, 0), IntVector2::new(0, 500), IntVector2::new(0, 1000)];
		assert_eq!(actual, b.get_crossover_point_manager().get_crossover_points());
		assert_eq!(6, network.edge_count());
		for edge in a.get_edge_groups()[&1].iter() {
			assert_eq!(1, edge.destination_node);
			assert_eq!(edge.source_point, edge.destination_point);
			assert_eq!(0.0, edge.cost);
		}
	}
	#[test]
	fn shared_side_survives_erosion() {
		let snapshot = snapshot(&[DAffine2::IDENTITY, shift(1000.0)], None);
		let network = snapshot.compile_overlay_network(10.0);
		let a = network.get_nodes()[0].get_local_geometry_view();
		// the shared side stays, the others are pulled in
		assert!(a.point_in_land(IntVector2::new(1000, 500)));
		assert!(!a.point_in_land(IntVector2::new(0, 500)));
		assert!(!a.point_in_land(IntVector2::new(500, 1000)));
		let points = network.get_nodes()[0].get_crossover_point_manager().get_crossover_points();
		assert_eq!(3, points.len());
		assert!(points.iter().all(|p| p.x == 1000 && p.y >= 9 && p.y <= 991));
		assert_eq!(6, network.edge_count());
	}
	#[test]
	fn separated_sectors_not_linked() {
		let snapshot = snapshot(&[DAffine2::IDENTITY, shift(1010.0)], None);
		let network = snapshot.compile_overlay_network(0.0);
		assert_eq!(0, network.edge_count());
	}
	#[test]
	fn rotated_neighbour_linked() {
		// local top side of the second sector lands on x = 1000
		let rotated = DAffine2::from_translation(DVec2::new(2000.0, 0.0)) * DAffine2::from_angle(std::f64::consts::FRAC_PI_2);
		let snapshot = snapshot(&[DAffine2::IDENTITY, rotated], None);
		let network = snapshot.compile_overlay_network(0.0);
		assert_eq!(6, network.edge_count());
		let b = &network.get_nodes()[1];
		assert!(b.get_crossover_point_manager().get_crossover_points().iter().all(|p| p.y == 1000));
	}
	#[test]
	fn hole_on_shared_side_splits_crossovers() {
		let snapshot = snapshot(&[DAffine2::IDENTITY, shift(1000.0)], Some(IntRect::from_coords(900, 400, 1100, 600)));
		let network = snapshot.compile_overlay_network(0.0);
		let points = network.get_nodes()[0].get_crossover_point_manager().get_crossover_points();
		// two intervals, each with two ends and a midpoint
		assert_eq!(6, points.len());
		assert!(points.iter().all(|p| p.y <= 400 || p.y >= 600));
	}
	#[test]
	fn network_compiled_once_per_radius() {
		let snapshot = snapshot(&[DAffine2::IDENTITY], None);
		let a = snapshot.compile_overlay_network(5.0);
		let b = snapshot.compile_overlay_network(5.0);
		assert!(Arc::ptr_eq(&a, &b));
		let c = snapshot.compile_overlay_network(0.0);
		let d = snapshot.compile_overlay_network(-0.0);
		assert!(Arc::ptr_eq(&c, &d));
		assert!(!Arc::ptr_eq(&a, &c));
		assert_eq!(vec![0.0, 5.0], {
			let mut radii = snapshot.get_overlay_network_manager().get_compiled_radii();
			radii.sort_by(|x, y| x.total_cmp(y));
			radii
		});
	}
	#[test]
	fn point_rounding_out_of_hole_refused() {
		let snapshot = snapshot(&[DAffine2::IDENTITY], Some(IntRect::from_coords(400, 400, 600, 600)));
		let network = snapshot.compile_overlay_network(0.0);
		let node = &network.get_nodes()[0];
		// 0.4 inside the hole rounds onto its boundary
		assert_eq!(IntVector2::new(400, 500), node.world_to_local(DVec2::new(400.4, 500.0)));
		assert!(!node.contains_world_point(DVec2::new(400.4, 500.0)));
		assert!(node.contains_world_point(DVec2::new(400.2, 500.0)));
		assert!(node.contains_world_point(DVec2::new(399.6, 500.0)));
	}
	#[test]
	fn concurrent_requests_compile_once() {
		let mut service = TerrainService::new();
		let metadata = Arc::new(TerrainStaticMetadata::from_rect(IntRect::from_coords(0, 0, 1000, 1000)));
		for i in 0..3 {
			service.add_sector(metadata.clone(), shift(1000.0 * i as f64)).unwrap();
		}
		service.add_hole(DynamicTerrainHole::from_rect(&IntRect::from_coords(1400, 400, 1600, 600)));
		let snapshot = service.compile_snapshot();
		let networks: Vec<Arc<TerrainOverlayNetwork>> = std::thread::scope(|scope| {
			let handles: Vec<_> = (0..8)
				.map(|_| scope.spawn(|| snapshot.compile_overlay_network(5.0)))
				.collect();
			handles.into_iter().map(|h| h.join().unwrap()).collect()
		});
		for network in networks.iter() {
			assert!(Arc::ptr_eq(&networks[0], network));
		}
		assert_eq!(1, service.get_statistics().get(Counter::OverlayNetworksCompiled));
	}
	#[test]
	#[should_panic]
	fn negative_radius_panics() {
		let snapshot = snapshot(&[DAffine2::IDENTITY], None);
		snapshot.compile_overlay_network(-1.0);
	}
	#[test]
	#[should_panic]
	fn nan_radius_panics() {
		let snapshot = snapshot(&[DAffine2::IDENTITY], None);
		snapshot.compile_overlay_network(f64::NAN);
	}
	#[test]
	fn find_node_containing_world_point() {
		let snapshot = snapshot(&[DAffine2::IDENTITY, shift(1000.0)], Some(IntRect::from_coords(1400, 400, 1600, 600)));
		let network = snapshot.compile_overlay_network(0.0);
		assert_eq!(Some(0), network.find_node_containing(DVec2::new(500.0, 500.0)));
		assert_eq!(Some(1), network.find_node_containing(DVec2::new(1200.0, 500.0)));
		assert_eq!(None, network.find_node_containing(DVec2::new(1500.0, 500.0)));
		assert_eq!(None, network.find_node_containing(DVec2::new(-50.0, 500.0)));
		// the shared side belongs to the first node in order
		assert_eq!(Some(0), network.find_node_containing(DVec2::new(1000.0, 500.0)));
	}
}
