//! Polygons and the [PolyTree] that nests them into land, holes and islands.
//!
//! A [PolyTree] is an arena: every [PolyNode] is addressed by its index and
//! records the indices of its children. Index `0` is a synthetic root which
//! represents the void outside of all land. Its children are land contours
//! (depth `1`), their children are holes (depth `2`), the children of holes
//! are islands of land (depth `3`) and so on.
//!
//! ```text
//! root (void)
//!  └─ land      counter-clockwise
//!      ├─ hole  clockwise
//!      │   └─ island  counter-clockwise
//!      └─ hole  clockwise
//! ```
//!

use crate::prelude::*;

/// Where a point sits relative to a contour or a region
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointContainment {
	/// Strictly within
	Inside,
	/// On an edge or vertex
	OnBoundary,
	/// Strictly outside
	Outside,
}

/// An ordered, implicitly closed sequence of lattice points tagged with
/// whether it bounds land or a hole
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polygon {
	/// Vertices, the last connects back to the first
	points: Vec<IntVector2>,
	/// Whether the polygon bounds a hole rather than land
	is_hole: bool,
}

impl Polygon {
	/// Create a new instance of [Polygon], consecutive duplicate points and a
	/// repeated closing point are dropped
	pub fn new(points: Vec<IntVector2>, is_hole: bool) -> Self {
		Polygon {
			points: dedupe_closed(points),
			is_hole,
		}
	}
	/// A counter-clockwise land polygon covering `rect`
	pub fn from_rect(rect: &IntRect) -> Self {
		Polygon::new(rect.corners().to_vec(), false)
	}
	/// Get the vertices
	pub fn get_points(&self) -> &[IntVector2] {
		&self.points
	}
	/// Whether the polygon bounds a hole
	pub fn is_hole(&self) -> bool {
		self.is_hole
	}
	/// Twice the signed area, positive when counter-clockwise
	pub fn signed_area_doubled(&self) -> i64 {
		signed_area_doubled(&self.points)
	}
	/// Unsigned area
	pub fn area(&self) -> f64 {
		self.signed_area_doubled().abs() as f64 / 2.0
	}
	/// Orient land counter-clockwise and holes clockwise
	pub fn normalized(mut self) -> Self {
		let ccw = self.signed_area_doubled() > 0;
		if ccw == self.is_hole {
			self.points.reverse();
		}
		self
	}
	/// The same contour tagged as land, oriented counter-clockwise
	pub fn into_land(mut self) -> Self {
		self.is_hole = false;
		self.normalized()
	}
	/// Edges of the polygon, including the closing edge
	pub fn segments(&self) -> impl Iterator<Item = IntLineSegment2> + '_ {
		contour_segments(&self.points)
	}
	/// Axis aligned bounds, `None` for an empty polygon
	pub fn bounds(&self) -> Option<IntRect> {
		contour_bounds(&self.points)
	}
	/// Classify `point` against the area enclosed by the contour
	pub fn classify_point(&self, point: IntVector2) -> PointContainment {
		classify_point_doubled(&self.points, point.x as i64 * 2, point.y as i64 * 2)
	}
	/// Whether `point` is inside or on the contour
	pub fn contains_point(&self, point: IntVector2) -> bool {
		self.classify_point(point) != PointContainment::Outside
	}
}

/// Strip consecutive duplicates, treating the sequence as closed
fn dedupe_closed(mut points: Vec<IntVector2>) -> Vec<IntVector2> {
	points.dedup();
	while points.len() > 1 && points.first() == points.last() {
		points.pop();
	}
	points
}

/// Twice the signed area of a closed contour
pub fn signed_area_doubled(points: &[IntVector2]) -> i64 {
	let n = points.len();
	let mut sum = 0;
	for i in 0..n {
		sum += points[i].cross(points[(i + 1) % n]);
	}
	sum
}

/// Iterate over the edges of a closed contour
pub fn contour_segments(points: &[IntVector2]) -> impl Iterator<Item = IntLineSegment2> + '_ {
	let n = points.len();
	(0..n).filter_map(move |i| {
		let a = points[i];
		let b = points[(i + 1) % n];
		if a != b {
			Some(IntLineSegment2::new(a, b))
		} else {
			None
		}
	})
}

/// Bounds of a contour
fn contour_bounds(points: &[IntVector2]) -> Option<IntRect> {
	let first = points.first()?;
	let mut min = *first;
	let mut max = *first;
	for p in points.iter() {
		min.x = min.x.min(p.x);
		min.y = min.y.min(p.y);
		max.x = max.x.max(p.x);
		max.y = max.y.max(p.y);
	}
	Some(IntRect::new(min, max))
}

/// Classify a query point given in doubled coordinates against a contour
/// given in plain coordinates. Doubling lets callers ask about midpoints of
/// lattice segments without leaving integer arithmetic
pub fn classify_point_doubled(points: &[IntVector2], qx: i64, qy: i64) -> PointContainment {
	let n = points.len();
	if n < 3 {
		return PointContainment::Outside;
	}
	let mut winding = 0;
	for i in 0..n {
		let (ax, ay) = (points[i].x as i64 * 2, points[i].y as i64 * 2);
		let j = (i + 1) % n;
		let (bx, by) = (points[j].x as i64 * 2, points[j].y as i64 * 2);
		let cross = (bx - ax) * (qy - ay) - (by - ay) * (qx - ax);
		if cross == 0
			&& qx >= ax.min(bx)
			&& qx <= ax.max(bx)
			&& qy >= ay.min(by)
			&& qy <= ay.max(by)
		{
			return PointContainment::OnBoundary;
		}
		if ay <= qy {
			if by > qy && cross > 0 {
				winding += 1;
			}
		} else if by <= qy && cross < 0 {
			winding -= 1;
		}
	}
	if winding != 0 {
		PointContainment::Inside
	} else {
		PointContainment::Outside
	}
}

/// A single contour within a [PolyTree]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolyNode {
	/// Vertices, empty for the root
	contour: Vec<IntVector2>,
	/// Whether the node bounds a hole, the root counts as one since it is void
	is_hole: bool,
	/// Index of the enclosing node
	parent: Option<usize>,
	/// Indices of directly nested contours
	children: Vec<usize>,
	/// Nesting depth, `0` for the root
	depth: usize,
}

impl PolyNode {
	/// Get the vertices of the contour
	pub fn get_contour(&self) -> &[IntVector2] {
		&self.contour
	}
	/// Whether the node bounds a hole (or is the root)
	pub fn is_hole(&self) -> bool {
		self.is_hole
	}
	/// Whether the node bounds land
	pub fn is_land(&self) -> bool {
		!self.is_hole
	}
	/// Get the index of the parent node
	pub fn get_parent(&self) -> Option<usize> {
		self.parent
	}
	/// Get the indices of the children
	pub fn get_children(&self) -> &[usize] {
		&self.children
	}
	/// Get the nesting depth
	pub fn get_depth(&self) -> usize {
		self.depth
	}
	/// Copy the contour out as a [Polygon]
	pub fn to_polygon(&self) -> Polygon {
		Polygon::new(self.contour.clone(), self.is_hole)
	}
	/// Classify a point against this node's contour alone
	pub fn classify_point(&self, point: IntVector2) -> PointContainment {
		classify_point_doubled(&self.contour, point.x as i64 * 2, point.y as i64 * 2)
	}
}

/// Arena of nested contours describing walkable land
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolyTree {
	/// Every node, the root at index `0`
	nodes: Vec<PolyNode>,
}

impl Default for PolyTree {
	fn default() -> Self {
		PolyTree::new()
	}
}

impl PolyTree {
	/// Index of the synthetic root node
	pub const ROOT: usize = 0;
	/// Create an empty tree containing only the root
	pub fn new() -> Self {
		PolyTree {
			nodes: vec![PolyNode {
				contour: Vec::new(),
				is_hole: true,
				parent: None,
				children: Vec::new(),
				depth: 0,
			}],
		}
	}
	/// A tree with a single land rectangle
	pub fn from_rect(rect: &IntRect) -> Self {
		let mut tree = PolyTree::new();
		tree.add_node(PolyTree::ROOT, rect.corners().to_vec());
		tree
	}
	/// Append a contour beneath `parent`, the node's hole/land kind is the
	/// opposite of its parent. Returns the new node's index
	pub fn add_node(&mut self, parent: usize, contour: Vec<IntVector2>) -> usize {
		let index = self.nodes.len();
		let is_hole = !self.nodes[parent].is_hole;
		let depth = self.nodes[parent].depth + 1;
		self.nodes.push(PolyNode {
			contour,
			is_hole,
			parent: Some(parent),
			children: Vec::new(),
			depth,
		});
		self.nodes[parent].children.push(index);
		index
	}
	/// Get a node by index
	pub fn get_node(&self, index: usize) -> &PolyNode {
		&self.nodes[index]
	}
	/// Get every node, root included
	pub fn get_nodes(&self) -> &[PolyNode] {
		&self.nodes
	}
	/// Whether the tree contains no land at all
	pub fn is_empty(&self) -> bool {
		self.nodes.len() <= 1
	}
	/// Indices of every land node
	pub fn land_indices(&self) -> impl Iterator<Item = usize> + '_ {
		self.nodes
			.iter()
			.enumerate()
			.filter(|(_, node)| node.is_land())
			.map(|(i, _)| i)
	}
	/// Every contour edge, of land and holes alike
	pub fn contour_segments(&self) -> Vec<IntLineSegment2> {
		self.nodes
			.iter()
			.flat_map(|node| contour_segments(&node.contour))
			.collect()
	}
	/// Net area of land, holes subtracted
	pub fn land_area(&self) -> f64 {
		let mut doubled = 0;
		for node in self.nodes.iter().skip(1) {
			let area = signed_area_doubled(&node.contour).abs();
			if node.is_land() {
				doubled += area;
			} else {
				doubled -= area;
			}
		}
		doubled as f64 / 2.0
	}
	/// Flatten the tree into polygons in depth first order, parents before
	/// their children. With `include_outer_polygon` false the outermost land
	/// contours are skipped, leaving the holes and anything nested in them
	pub fn flatten_to_polygons(&self, include_outer_polygon: bool) -> Vec<Polygon> {
		let mut polygons = Vec::new();
		let mut stack: Vec<usize> = self.nodes[PolyTree::ROOT]
			.children
			.iter()
			.rev()
			.copied()
			.collect();
		while let Some(index) = stack.pop() {
			let node = &self.nodes[index];
			if include_outer_polygon || node.depth != 1 {
				polygons.push(node.to_polygon());
			}
			stack.extend(node.children.iter().rev());
		}
		polygons
	}
	/// Classify a point against the land region. Walks down the nesting
	/// without recursion
	pub fn classify_point(&self, point: IntVector2) -> PointContainment {
		let (_, containment) = self.locate(point);
		containment
	}
	/// Whether the point lies on land, land boundaries count as land
	pub fn point_in_land(&self, point: IntVector2) -> bool {
		self.classify_point(point) != PointContainment::Outside
	}
	/// Classify a point given in doubled coordinates against the land region
	pub fn classify_point_doubled(&self, qx: i64, qy: i64) -> PointContainment {
		let mut current = PolyTree::ROOT;
		'descend: loop {
			for &child in self.nodes[current].children.iter() {
				match classify_point_doubled(&self.nodes[child].contour, qx, qy) {
					PointContainment::Outside => continue,
					PointContainment::OnBoundary => return PointContainment::OnBoundary,
					PointContainment::Inside => {
						current = child;
						continue 'descend;
					}
				}
			}
			return if self.nodes[current].is_land() {
				PointContainment::Inside
			} else {
				PointContainment::Outside
			};
		}
	}
	/// Find the innermost node whose contour encloses or touches `point`,
	/// with the classification of the point against the land region
	pub fn locate(&self, point: IntVector2) -> (usize, PointContainment) {
		let (qx, qy) = (point.x as i64 * 2, point.y as i64 * 2);
		let mut current = PolyTree::ROOT;
		'descend: loop {
			for &child in self.nodes[current].children.iter() {
				match classify_point_doubled(&self.nodes[child].contour, qx, qy) {
					PointContainment::Outside => continue,
					PointContainment::OnBoundary => {
						return (child, PointContainment::OnBoundary);
					}
					PointContainment::Inside => {
						current = child;
						continue 'descend;
					}
				}
			}
			let containment = if self.nodes[current].is_land() {
				PointContainment::Inside
			} else {
				PointContainment::Outside
			};
			return (current, containment);
		}
	}
	/// Vertices where the land is locally concave, these are the only
	/// places a shortest path can bend. Requires normalised orientation
	pub fn reflex_vertices(&self) -> Vec<IntVector2> {
		let mut reflex = Vec::new();
		for node in self.nodes.iter().skip(1) {
			let contour = &node.contour;
			let n = contour.len();
			if n < 3 {
				continue;
			}
			for i in 0..n {
				let prev = contour[(i + n - 1) % n];
				let current = contour[i];
				let next = contour[(i + 1) % n];
				if Clockness::of(prev, current, next) == Clockness::Clockwise {
					reflex.push(current);
				}
			}
		}
		reflex
	}
	/// Build a tree from regions, each an outer land contour with the holes
	/// directly inside it. Regions sitting inside another region's hole are
	/// nested beneath that hole
	pub fn from_regions(mut regions: Vec<(Vec<IntVector2>, Vec<Vec<IntVector2>>)>) -> Self {
		// largest first so that enclosing holes exist before their islands
		regions.sort_by_key(|(outer, _)| std::cmp::Reverse(signed_area_doubled(outer).abs()));
		let mut tree = PolyTree::new();
		// (node index, doubled area) of every hole added so far
		let mut holes: Vec<(usize, i64)> = Vec::new();
		for (outer, inner) in regions {
			let parent = tree.enclosing_hole(&outer, &holes);
			let land = tree.add_node(parent, outer);
			for hole in inner {
				let area = signed_area_doubled(&hole).abs();
				let index = tree.add_node(land, hole);
				holes.push((index, area));
			}
		}
		tree
	}
	/// The smallest known hole that encloses `contour`, or the root
	fn enclosing_hole(&self, contour: &[IntVector2], holes: &[(usize, i64)]) -> usize {
		let mut best: Option<(usize, i64)> = None;
		for &(index, area) in holes.iter() {
			let hole = &self.nodes[index].contour;
			let mut inside = false;
			let mut touching = false;
			for p in contour.iter() {
				match classify_point_doubled(hole, p.x as i64 * 2, p.y as i64 * 2) {
					PointContainment::Inside => {
						inside = true;
						break;
					}
					PointContainment::OnBoundary => touching = true,
					PointContainment::Outside => {
						touching = false;
						break;
					}
				}
			}
			if (inside || touching) && best.is_none_or(|(_, a)| area < a) {
				best = Some((index, area));
			}
		}
		best.map(|(index, _)| index).unwrap_or(PolyTree::ROOT)
	}
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Square land with a square hole and an island within the hole
	fn nested_tree() -> PolyTree {
		let mut tree = PolyTree::new();
		let land = tree.add_node(PolyTree::ROOT, IntRect::from_coords(0, 0, 100, 100).corners().to_vec());
		let mut hole = IntRect::from_coords(20, 20, 80, 80).corners().to_vec();
		hole.reverse();
		let hole = tree.add_node(land, hole);
		tree.add_node(hole, IntRect::from_coords(40, 40, 60, 60).corners().to_vec());
		tree
	}
	#[test]
	fn polygon_strips_duplicates() {
		let points = vec![
			IntVector2::new(0, 0),
			IntVector2::new(0, 0),
			IntVector2::new(10, 0),
			IntVector2::new(10, 10),
			IntVector2::new(0, 0),
		];
		let poly = Polygon::new(points, false);
		assert_eq!(3, poly.get_points().len());
	}
	#[test]
	fn polygon_normalized_orientation() {
		let mut points = IntRect::from_coords(0, 0, 10, 10).corners().to_vec();
		points.reverse();
		let land = Polygon::new(points.clone(), false).normalized();
		assert!(land.signed_area_doubled() > 0);
		let hole = Polygon::new(IntRect::from_coords(0, 0, 10, 10).corners().to_vec(), true).normalized();
		assert!(hole.signed_area_doubled() < 0);
		assert_eq!(100.0, hole.area());
	}
	#[test]
	fn polygon_classify() {
		let poly = Polygon::from_rect(&IntRect::from_coords(0, 0, 10, 10));
		assert_eq!(PointContainment::Inside, poly.classify_point(IntVector2::new(5, 5)));
		assert_eq!(PointContainment::OnBoundary, poly.classify_point(IntVector2::new(10, 5)));
		assert_eq!(PointContainment::OnBoundary, poly.classify_point(IntVector2::new(0, 0)));
		assert_eq!(PointContainment::Outside, poly.classify_point(IntVector2::new(11, 5)));
	}
	#[test]
	fn concave_classify() {
		// U shape open at the top
		let points = vec![
			IntVector2::new(0, 0),
			IntVector2::new(30, 0),
			IntVector2::new(30, 30),
			IntVector2::new(20, 30),
			IntVector2::new(20, 10),
			IntVector2::new(10, 10),
			IntVector2::new(10, 30),
			IntVector2::new(0, 30),
		];
		let poly = Polygon::new(points, false);
		assert_eq!(PointContainment::Outside, poly.classify_point(IntVector2::new(15, 20)));
		assert_eq!(PointContainment::Inside, poly.classify_point(IntVector2::new(5, 20)));
		assert_eq!(PointContainment::Inside, poly.classify_point(IntVector2::new(25, 20)));
		assert_eq!(PointContainment::OnBoundary, poly.classify_point(IntVector2::new(15, 10)));
	}
	#[test]
	fn tree_point_in_land() {
		let tree = nested_tree();
		assert!(tree.point_in_land(IntVector2::new(10, 10)));
		assert!(!tree.point_in_land(IntVector2::new(30, 30)));
		assert!(tree.point_in_land(IntVector2::new(50, 50)));
		assert!(tree.point_in_land(IntVector2::new(20, 50)));
		assert!(!tree.point_in_land(IntVector2::new(150, 50)));
	}
	#[test]
	fn tree_depths_alternate() {
		let tree = nested_tree();
		let kinds: Vec<(usize, bool)> = tree.get_nodes().iter().map(|n| (n.get_depth(), n.is_hole())).collect();
		let actual = vec![(0, true), (1, false), (2, true), (3, false)];
		assert_eq!(actual, kinds);
	}
	#[test]
	fn tree_flatten_order() {
		let tree = nested_tree();
		let all = tree.flatten_to_polygons(true);
		assert_eq!(3, all.len());
		assert!(!all[0].is_hole());
		assert!(all[1].is_hole());
		assert!(!all[2].is_hole());
		let inner = tree.flatten_to_polygons(false);
		assert_eq!(2, inner.len());
		assert!(inner[0].is_hole());
	}
	#[test]
	fn tree_land_area() {
		let tree = nested_tree();
		let actual = 100.0 * 100.0 - 60.0 * 60.0 + 20.0 * 20.0;
		assert_eq!(actual, tree.land_area());
	}
	#[test]
	fn tree_reflex_vertices_are_hole_corners() {
		let tree = nested_tree();
		let mut result = tree.reflex_vertices();
		result.sort();
		let mut actual = vec![
			IntVector2::new(20, 20),
			IntVector2::new(80, 20),
			IntVector2::new(80, 80),
			IntVector2::new(20, 80),
		];
		actual.sort();
		assert_eq!(actual, result);
	}
	#[test]
	fn tree_from_regions_nests_islands() {
		let mut hole = IntRect::from_coords(20, 20, 80, 80).corners().to_vec();
		hole.reverse();
		let regions = vec![
			(IntRect::from_coords(40, 40, 60, 60).corners().to_vec(), vec![]),
			(IntRect::from_coords(0, 0, 100, 100).corners().to_vec(), vec![hole]),
		];
		let tree = PolyTree::from_regions(regions);
		assert_eq!(4, tree.get_nodes().len());
		let island = tree.get_nodes().iter().position(|n| n.get_depth() == 3);
		assert!(island.is_some());
		assert!(tree.point_in_land(IntVector2::new(50, 50)));
	}
	#[test]
	fn doubled_midpoint_classification() {
		let tree = PolyTree::from_rect(&IntRect::from_coords(0, 0, 1, 1));
		// (0.5, 0.5) doubled
		assert_eq!(PointContainment::Inside, tree.classify_point_doubled(1, 1));
		// (1.5, 0.5) doubled
		assert_eq!(PointContainment::Outside, tree.classify_point_doubled(3, 1));
	}
}
