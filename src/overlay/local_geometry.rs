//! Exact point and segment tests against the eroded land of one sector
//!

use crate::prelude::*;

/// Eroded land of a sector together with a [BvhTreeAABB] over its contour
/// edges, answering whether points and straight segments stay on land
#[derive(Clone, Debug)]
pub struct LocalGeometryView {
	/// Agent radius the land was eroded by
	agent_radius: f64,
	/// Eroded land
	land: PolyTree,
	/// Every contour edge of the land, as barriers
	barriers: BvhTreeAABB,
}

impl LocalGeometryView {
	/// Create a new instance of [LocalGeometryView]
	pub fn new(land: PolyTree, agent_radius: f64) -> Self {
		let barriers = BvhTreeAABB::new(&land.contour_segments());
		LocalGeometryView {
			agent_radius,
			land,
			barriers,
		}
	}
	/// Get the agent radius the land was eroded by
	pub fn get_agent_radius(&self) -> f64 {
		self.agent_radius
	}
	/// Get the eroded land
	pub fn get_land_poly_tree(&self) -> &PolyTree {
		&self.land
	}
	/// Get the barrier hierarchy
	pub fn get_barrier_bvh(&self) -> &BvhTreeAABB {
		&self.barriers
	}
	/// Whether a point is on land, boundaries included
	pub fn point_in_land(&self, point: IntVector2) -> bool {
		self.land.point_in_land(point)
	}
	/// Whether the straight segment `a -> b` stays on land for its whole
	/// length. Running along a boundary or touching a corner is allowed,
	/// passing through a hole or outside the land is not
	pub fn segment_in_land(&self, a: IntVector2, b: IntVector2) -> bool {
		if a == b {
			return self.point_in_land(a);
		}
		if !self.point_in_land(a) || !self.point_in_land(b) {
			return false;
		}
		let segment = IntLineSegment2::new(a, b);
		if self.barriers.try_intersect(&segment).is_some() {
			return false;
		}
		// contour vertices touching the segment split it into pieces that
		// are each either wholly on land or wholly off it
		let mut splits = vec![a, b];
		self.barriers
			.for_each_overlapping(&segment.bounds(), |barrier| {
				for vertex in [barrier.first, barrier.second] {
					if segment.contains(vertex) {
						splits.push(vertex);
					}
				}
			});
		let direction = a.to(b);
		splits.sort_by_key(|p| a.to(*p).dot(direction));
		splits.dedup();
		splits.windows(2).all(|pair| {
			let qx = pair[0].x as i64 + pair[1].x as i64;
			let qy = pair[0].y as i64 + pair[1].y as i64;
			self.land.classify_point_doubled(qx, qy) != PointContainment::Outside
		})
	}
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// 1000x1000 land with a 200x200 hole in the middle
	fn view() -> LocalGeometryView {
		let land = punch()
			.include(vec![Polygon::from_rect(&IntRect::from_coords(0, 0, 1000, 1000))])
			.exclude(vec![Polygon::from_rect(&IntRect::from_coords(400, 400, 600, 600))])
			.execute(0.0);
		LocalGeometryView::new(land, 0.0)
	}
	#[test]
	fn segment_across_hole_blocked() {
		let view = view();
		assert!(!view.segment_in_land(IntVector2::new(100, 500), IntVector2::new(900, 500)));
	}
	#[test]
	fn segment_beside_hole_clear() {
		let view = view();
		assert!(view.segment_in_land(IntVector2::new(100, 300), IntVector2::new(900, 300)));
	}
	#[test]
	fn segment_to_corner_clear() {
		let view = view();
		assert!(view.segment_in_land(IntVector2::new(100, 500), IntVector2::new(400, 400)));
	}
	#[test]
	fn segment_along_hole_edge_clear() {
		let view = view();
		assert!(view.segment_in_land(IntVector2::new(400, 300), IntVector2::new(400, 700)));
	}
	#[test]
	fn diagonal_through_hole_corners_blocked() {
		let view = view();
		// touches the hole only at its corners but the middle is inside it
		assert!(!view.segment_in_land(IntVector2::new(400, 400), IntVector2::new(600, 600)));
		assert!(!view.segment_in_land(IntVector2::new(300, 300), IntVector2::new(700, 700)));
	}
	#[test]
	fn segment_leaving_sector_blocked() {
		let view = view();
		assert!(!view.segment_in_land(IntVector2::new(100, 100), IntVector2::new(1100, 100)));
	}
	#[test]
	fn segment_along_outer_edge_clear() {
		let view = view();
		assert!(view.segment_in_land(IntVector2::new(0, 0), IntVector2::new(1000, 0)));
	}
	#[test]
	fn degenerate_segment_is_point_test() {
		let view = view();
		assert!(view.segment_in_land(IntVector2::new(10, 10), IntVector2::new(10, 10)));
		assert!(!view.segment_in_land(IntVector2::new(500, 500), IntVector2::new(500, 500)));
	}
}
