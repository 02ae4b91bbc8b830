//! Boolean algebra over [Polygon] sets: union, punch (difference) and offset
//! (erosion and dilation).
//!
//! The clipping itself is delegated to [geo::BooleanOps]. Inputs are read in
//! order, land polygons are added to the running region and hole polygons are
//! subtracted from it, so feeding the output of
//! [PolyTree::flatten_to_polygons] back in rebuilds the same region. Offsets
//! are expressed with the same primitive: the band swept by a disk of the
//! offset radius along every edge is added (dilation) or subtracted
//! (erosion). Every result is snapped back to the integer lattice.
//!

use geo::{BooleanOps, ConvexHull, Coord, LineString, MultiPoint, MultiPolygon, Point};

use crate::prelude::*;

/// Erode then dilate every punch result by this distance so that slivers
/// thinner than twice of it vanish
pub const CLEANUP_EPSILON: f64 = 0.05;
/// Number of sides of the polygon approximating a disk when offsetting
pub const OFFSET_DISK_SEGMENTS: usize = 16;

/// Floating point region used between clipping passes
type Region = MultiPolygon<f64>;

/// Begin a [UnionOperation]
pub fn union() -> UnionOperation {
	UnionOperation::default()
}

/// Begin a [PunchOperation]
pub fn punch() -> PunchOperation {
	PunchOperation::default()
}

/// Begin an [OffsetOperation]
pub fn offset() -> OffsetOperation {
	OffsetOperation::default()
}

/// Merge possibly overlapping polygons
#[derive(Clone, Debug, Default)]
pub struct UnionOperation {
	/// Polygons to merge
	polygons: Vec<Polygon>,
}

impl UnionOperation {
	/// Add polygons to the union
	pub fn include(mut self, polygons: impl IntoIterator<Item = Polygon>) -> Self {
		self.polygons.extend(polygons);
		self
	}
	/// Compute the union
	pub fn execute(self) -> PolyTree {
		to_poly_tree(&accumulate(&self.polygons))
	}
}

/// Subtract clip polygons from subject polygons and clean up the result
#[derive(Clone, Debug, Default)]
pub struct PunchOperation {
	/// Subject polygons
	included: Vec<Polygon>,
	/// Clip polygons, each treated as a filled region to remove
	excluded: Vec<Polygon>,
}

impl PunchOperation {
	/// Add subject polygons
	pub fn include(mut self, polygons: impl IntoIterator<Item = Polygon>) -> Self {
		self.included.extend(polygons);
		self
	}
	/// Add polygons to cut away
	pub fn exclude(mut self, polygons: impl IntoIterator<Item = Polygon>) -> Self {
		self.excluded.extend(polygons);
		self
	}
	/// Compute `included - excluded`, remove slivers and finally offset by
	/// `additional_erosion_dilation` (negative erodes)
	pub fn execute(self, additional_erosion_dilation: f64) -> PolyTree {
		let subject = accumulate(&self.included);
		let clip = accumulate(&self.excluded);
		let mut region = if clip.0.is_empty() {
			subject
		} else {
			subject.difference(&clip)
		};
		region = clean_region(&region);
		region = offset_region(&region, additional_erosion_dilation);
		to_poly_tree(&region)
	}
}

/// Sequential signed offsets of a polygon set
#[derive(Clone, Debug, Default)]
pub struct OffsetOperation {
	/// Polygons to offset
	included: Vec<Polygon>,
	/// Signed offsets applied in order, negative erodes
	offsets: Vec<f64>,
}

impl OffsetOperation {
	/// Add polygons to offset
	pub fn include(mut self, polygons: impl IntoIterator<Item = Polygon>) -> Self {
		self.included.extend(polygons);
		self
	}
	/// Shrink the land by `distance`
	pub fn erode(mut self, distance: f64) -> Self {
		if distance < 0.0 {
			panic!(
				"Erosion distance cannot be negative ({}), use erode_or_dilate",
				distance
			);
		}
		self.offsets.push(-distance);
		self
	}
	/// Grow the land by `distance`
	pub fn dilate(mut self, distance: f64) -> Self {
		if distance < 0.0 {
			panic!(
				"Dilation distance cannot be negative ({}), use erode_or_dilate",
				distance
			);
		}
		self.offsets.push(distance);
		self
	}
	/// Grow the land by `delta`, or shrink it when `delta` is negative
	pub fn erode_or_dilate(mut self, delta: f64) -> Self {
		self.offsets.push(delta);
		self
	}
	/// Apply each offset in turn
	pub fn execute(self) -> PolyTree {
		let mut region = accumulate(&self.included);
		for delta in self.offsets.iter() {
			region = offset_region(&region, *delta);
		}
		to_poly_tree(&region)
	}
}

/// Clip a polygon set to a rectangle
pub fn crop(polygons: &[Polygon], rect: &IntRect) -> PolyTree {
	let region = accumulate(polygons);
	let bounds = MultiPolygon::new(vec![to_geo_polygon(rect.corners().as_slice())]);
	to_poly_tree(&region.intersection(&bounds))
}

/// Remove slivers thinner than twice [CLEANUP_EPSILON] from a polygon set
pub fn clean_polygons(polygons: &[Polygon]) -> PolyTree {
	to_poly_tree(&clean_region(&accumulate(polygons)))
}

/// Erode then dilate by [CLEANUP_EPSILON]
fn clean_region(region: &Region) -> Region {
	offset_region(&offset_region(region, -CLEANUP_EPSILON), CLEANUP_EPSILON)
}

/// Remove consecutive duplicates and collinear vertices from each polygon,
/// dropping any that degenerate to no area, and normalise orientation
pub fn simplify_polygons(polygons: Vec<Polygon>) -> Vec<Polygon> {
	polygons
		.into_iter()
		.filter_map(|polygon| {
			let is_hole = polygon.is_hole();
			let points = clean_contour(polygon.get_points().to_vec())?;
			Some(Polygon::new(points, is_hole).normalized())
		})
		.collect()
}

/// Remove duplicate and collinear vertices (spikes included) until stable,
/// `None` when nothing with area is left
fn clean_contour(mut points: Vec<IntVector2>) -> Option<Vec<IntVector2>> {
	let mut changed = true;
	while changed && points.len() >= 3 {
		changed = false;
		let n = points.len();
		let mut kept = Vec::with_capacity(n);
		for i in 0..n {
			let prev = match kept.last() {
				Some(p) => *p,
				None => points[(i + n - 1) % n],
			};
			let current = points[i];
			let next = points[(i + 1) % n];
			if current == prev || Clockness::of(prev, current, next) == Clockness::Neither {
				changed = true;
				continue;
			}
			kept.push(current);
		}
		points = kept;
	}
	if points.len() < 3 || signed_area_doubled(&points) == 0 {
		None
	} else {
		Some(points)
	}
}

/// Convert a contour onto a closed [geo] ring
fn to_geo_polygon(points: &[IntVector2]) -> geo::Polygon<f64> {
	let coords: Vec<Coord<f64>> = points
		.iter()
		.map(|p| Coord {
			x: p.x as f64,
			y: p.y as f64,
		})
		.collect();
	geo::Polygon::new(LineString::new(coords), vec![])
}

/// Combine polygons in order, land adds and holes subtract
fn accumulate(polygons: &[Polygon]) -> Region {
	let mut region = MultiPolygon::new(vec![]);
	for polygon in polygons.iter() {
		if polygon.get_points().len() < 3 {
			continue;
		}
		let shape = MultiPolygon::new(vec![to_geo_polygon(polygon.get_points())]);
		if polygon.is_hole() {
			if !region.0.is_empty() {
				region = region.difference(&shape);
			}
		} else if region.0.is_empty() {
			region = shape;
		} else {
			region = region.union(&shape);
		}
	}
	region
}

/// Offset a region by a signed distance
fn offset_region(region: &Region, delta: f64) -> Region {
	if delta.abs() < f64::EPSILON || region.0.is_empty() {
		return region.clone();
	}
	let band = edge_band(region, delta.abs());
	if band.0.is_empty() {
		return region.clone();
	}
	if delta > 0.0 {
		region.union(&band)
	} else {
		region.difference(&band)
	}
}

/// Union of the capsules swept along every edge of a region
fn edge_band(region: &Region, radius: f64) -> Region {
	let mut capsules = Vec::new();
	for polygon in region.0.iter() {
		let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter());
		for ring in rings {
			for line in ring.lines() {
				if line.start == line.end {
					continue;
				}
				capsules.push(MultiPolygon::new(vec![capsule(line.start, line.end, radius)]));
			}
		}
	}
	union_all(capsules)
}

/// Pairwise union so that the intermediate regions stay balanced
fn union_all(mut parts: Vec<Region>) -> Region {
	while parts.len() > 1 {
		let mut merged = Vec::with_capacity(parts.len() / 2 + 1);
		let mut iter = parts.into_iter();
		while let Some(a) = iter.next() {
			match iter.next() {
				Some(b) => merged.push(a.union(&b)),
				None => merged.push(a),
			}
		}
		parts = merged;
	}
	parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// Convex hull of the two disks of `radius` centred on `a` and `b`. The disks
/// are circumscribed polygons turned so that a flat faces the edge normal,
/// which keeps the long sides of the capsule exactly `radius` from the edge
fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64) -> geo::Polygon<f64> {
	let n = OFFSET_DISK_SEGMENTS;
	let step = std::f64::consts::TAU / n as f64;
	let circumradius = radius / (step / 2.0).cos();
	let normal_angle = (b.y - a.y).atan2(b.x - a.x) + std::f64::consts::FRAC_PI_2;
	let mut points: Vec<Point<f64>> = Vec::with_capacity(n * 2);
	for centre in [a, b] {
		for k in 0..n {
			let angle = normal_angle + step / 2.0 + step * k as f64;
			points.push(Point::from(Coord {
				x: centre.x + circumradius * angle.cos(),
				y: centre.y + circumradius * angle.sin(),
			}));
		}
	}
	MultiPoint::from(points).convex_hull()
}

/// Snap a [geo] ring onto the lattice and clean it up
fn snap_ring(ring: &LineString<f64>) -> Option<Vec<IntVector2>> {
	let points: Vec<IntVector2> = ring
		.0
		.iter()
		.map(|c| IntVector2::new(c.x.round() as i32, c.y.round() as i32))
		.collect();
	clean_contour(Polygon::new(points, false).get_points().to_vec())
}

/// Convert a clipping result into a normalised [PolyTree]
fn to_poly_tree(region: &Region) -> PolyTree {
	let mut regions = Vec::new();
	for polygon in region.0.iter() {
		let Some(outer) = snap_ring(polygon.exterior()) else {
			continue;
		};
		let outer = Polygon::new(outer, false).normalized();
		let holes = polygon
			.interiors()
			.iter()
			.filter_map(snap_ring)
			.map(|hole| Polygon::new(hole, true).normalized().get_points().to_vec())
			.collect();
		regions.push((outer.get_points().to_vec(), holes));
	}
	PolyTree::from_regions(regions)
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// A land rectangle
	fn rect(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Polygon {
		Polygon::from_rect(&IntRect::from_coords(min_x, min_y, max_x, max_y))
	}
	#[test]
	fn union_of_overlapping_rects() {
		let tree = union().include(vec![rect(0, 0, 10, 10), rect(5, 0, 15, 10)]).execute();
		assert_eq!(150.0, tree.land_area());
		let land: Vec<usize> = tree.land_indices().collect();
		assert_eq!(1, land.len());
		assert_eq!(4, tree.get_node(land[0]).get_contour().len());
	}
	#[test]
	fn union_of_disjoint_rects() {
		let tree = union().include(vec![rect(0, 0, 10, 10), rect(20, 0, 30, 10)]).execute();
		assert_eq!(2, tree.land_indices().count());
		assert_eq!(200.0, tree.land_area());
	}
	#[test]
	fn punch_creates_hole() {
		let tree = punch()
			.include(vec![rect(0, 0, 1000, 1000)])
			.exclude(vec![rect(400, 400, 600, 600)])
			.execute(0.0);
		assert_eq!(3, tree.get_nodes().len());
		assert_eq!(1000.0 * 1000.0 - 200.0 * 200.0, tree.land_area());
		assert!(!tree.point_in_land(IntVector2::new(500, 500)));
		assert!(tree.point_in_land(IntVector2::new(400, 500)));
		let mut corners = tree.reflex_vertices();
		corners.sort();
		let mut actual = IntRect::from_coords(400, 400, 600, 600).corners().to_vec();
		actual.sort();
		assert_eq!(actual, corners);
	}
	#[test]
	fn punch_removes_sliver() {
		// leaves a strip of zero width between the two clip rectangles
		let tree = punch()
			.include(vec![rect(0, 0, 100, 100)])
			.exclude(vec![rect(0, 0, 50, 100), rect(50, 0, 100, 100)])
			.execute(0.0);
		assert!(tree.is_empty());
	}
	#[test]
	fn punch_then_flatten_then_union_keeps_area() {
		let tree = punch()
			.include(vec![rect(0, 0, 100, 100)])
			.exclude(vec![rect(30, 30, 60, 60)])
			.execute(0.0);
		let polygons = tree.flatten_to_polygons(true);
		let result = union().include(polygons).execute();
		assert!((tree.land_area() - result.land_area()).abs() <= 1.0);
		assert_eq!(100.0 * 100.0 - 30.0 * 30.0, result.land_area());
	}
	#[test]
	fn offset_erode_shrinks_rect() {
		let tree = offset().include(vec![rect(0, 0, 100, 100)]).erode(10.0).execute();
		assert!(tree.point_in_land(IntVector2::new(50, 50)));
		assert!(tree.point_in_land(IntVector2::new(10, 50)));
		assert!(!tree.point_in_land(IntVector2::new(9, 50)));
		assert!(!tree.point_in_land(IntVector2::new(50, 91)));
	}
	#[test]
	fn offset_dilate_grows_rect() {
		let tree = offset().include(vec![rect(0, 0, 100, 100)]).dilate(10.0).execute();
		assert!(tree.point_in_land(IntVector2::new(-10, 50)));
		assert!(!tree.point_in_land(IntVector2::new(-11, 50)));
		// the corner is rounded
		assert!(!tree.point_in_land(IntVector2::new(-9, -9)));
	}
	#[test]
	fn offset_erode_closes_narrow_gap() {
		// two rooms joined by a corridor 10 units wide
		let tree = union().include(vec![rect(0, 0, 40, 40), rect(60, 0, 100, 40), rect(40, 15, 60, 25)]).execute();
		assert_eq!(1, tree.land_indices().count());
		let eroded = offset().include(tree.flatten_to_polygons(true)).erode(6.0).execute();
		assert_eq!(2, eroded.land_indices().count());
	}
	#[test]
	fn offset_signed_sequence() {
		let tree = offset()
			.include(vec![rect(0, 0, 100, 100)])
			.erode_or_dilate(-5.0)
			.erode_or_dilate(5.0)
			.execute();
		assert!(tree.point_in_land(IntVector2::new(0, 50)));
		assert!(tree.point_in_land(IntVector2::new(50, 100)));
	}
	#[test]
	#[should_panic]
	fn offset_negative_erode() {
		offset().erode(-1.0);
	}
	#[test]
	#[should_panic]
	fn offset_negative_dilate() {
		offset().dilate(-1.0);
	}
	#[test]
	fn crop_to_rect() {
		let tree = crop(&[rect(-50, -50, 50, 50)], &IntRect::from_coords(0, 0, 100, 100));
		assert_eq!(2500.0, tree.land_area());
	}
	#[test]
	fn simplify_polygons_drops_collinear_and_degenerate() {
		let polygons = vec![
			Polygon::new(vec![
				IntVector2::new(0, 0),
				IntVector2::new(5, 0),
				IntVector2::new(10, 0),
				IntVector2::new(10, 10),
				IntVector2::new(0, 10),
			], false),
			Polygon::new(vec![
				IntVector2::new(0, 0),
				IntVector2::new(5, 5),
				IntVector2::new(10, 10),
			], false),
		];
		let result = simplify_polygons(polygons);
		assert_eq!(1, result.len());
		assert_eq!(4, result[0].get_points().len());
	}
	#[test]
	fn clean_polygons_keeps_land_and_holes() {
		let hole = Polygon::new(IntRect::from_coords(40, 40, 60, 60).corners().to_vec(), true);
		let tree = clean_polygons(&[rect(0, 0, 100, 100), hole]);
		assert_eq!(9600.0, tree.land_area());
		assert!(tree.point_in_land(IntVector2::new(10, 10)));
		assert!(!tree.point_in_land(IntVector2::new(50, 50)));
	}
	#[test]
	fn capsule_hugs_its_edge() {
		let hull = capsule(Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }, 10.0);
		let ring = &hull.exterior().0;
		// closed ring, no more than both disks' vertices
		assert_eq!(ring.first(), ring.last());
		assert!(ring.len() <= 2 * OFFSET_DISK_SEGMENTS + 1);
		let circumradius = 10.0 / (std::f64::consts::PI / OFFSET_DISK_SEGMENTS as f64).cos();
		for c in ring.iter() {
			let nearest_x = c.x.clamp(0.0, 100.0);
			let distance = ((c.x - nearest_x).powi(2) + c.y.powi(2)).sqrt();
			assert!(distance <= circumradius + 1e-9);
		}
		// flats face the normal so the long sides sit at the radius
		let top = ring.iter().map(|c| c.y).fold(f64::MIN, f64::max);
		assert!((top - 10.0).abs() < 1e-9);
	}
}
