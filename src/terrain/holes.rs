//! Holes punched out of the terrain at runtime, described in world space
//!

use bevy::math::DVec2;

use crate::prelude::*;
use bevy::reflect::Reflect;

/// Unique ID of a [DynamicTerrainHole]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct HoleId(u64);

impl HoleId {
	/// Create a new instance of [HoleId]
	pub fn new(id: u64) -> Self {
		HoleId(id)
	}
	/// Get the raw id
	pub fn get(&self) -> u64 {
		self.0
	}
}

/// Polygons in world coordinates removed from every sector they overlap
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicTerrainHole {
	/// World space contours, each describing an area to remove
	polygons: Vec<Polygon>,
}

impl DynamicTerrainHole {
	/// Create a new instance of [DynamicTerrainHole]
	pub fn new(polygons: Vec<Polygon>) -> Self {
		DynamicTerrainHole {
			polygons: simplify_polygons(polygons.into_iter().map(|p| p.into_land()).collect()),
		}
	}
	/// A rectangular hole
	pub fn from_rect(rect: &IntRect) -> Self {
		DynamicTerrainHole::new(vec![Polygon::from_rect(rect)])
	}
	/// Get the world space polygons
	pub fn get_polygons(&self) -> &[Polygon] {
		&self.polygons
	}
	/// World space bounds, `None` when the hole has no polygons
	pub fn world_bounds(&self) -> Option<WorldBounds> {
		WorldBounds::from_points(
			self.polygons
				.iter()
				.flat_map(|p| p.get_points().iter().map(|v| v.as_dvec2())),
		)
	}
	/// Whether a disk of `agent_radius` centred on `world` overlaps the hole
	pub fn contains_point(&self, world: DVec2, agent_radius: f64) -> bool {
		for polygon in self.polygons.iter() {
			let points: Vec<DVec2> = polygon.get_points().iter().map(|p| p.as_dvec2()).collect();
			if point_in_contour(&points, world) {
				return true;
			}
			let n = points.len();
			for i in 0..n {
				let a = points[i];
				let b = points[(i + 1) % n];
				if distance_to_segment(world, a, b) <= agent_radius {
					return true;
				}
			}
		}
		false
	}
	/// Map the hole into a sector's local lattice. The result is oriented as
	/// land, ready to be subtracted
	pub fn project_onto(&self, sector: &Sector) -> Vec<Polygon> {
		let projected = self
			.polygons
			.iter()
			.map(|polygon| {
				let points = polygon
					.get_points()
					.iter()
					.map(|p| IntVector2::from_dvec2_rounded(sector.world_to_local(p.as_dvec2())))
					.collect();
				Polygon::new(points, false)
			})
			.collect();
		simplify_polygons(projected)
	}
}

/// Even-odd test of a point against a floating point contour
fn point_in_contour(points: &[DVec2], p: DVec2) -> bool {
	let n = points.len();
	let mut inside = false;
	let mut j = n.wrapping_sub(1);
	for i in 0..n {
		let a = points[i];
		let b = points[j];
		if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
			inside = !inside;
		}
		j = i;
	}
	inside
}

/// Shortest distance from `p` to the segment `a -> b`
fn distance_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
	let ab = b - a;
	let len_sq = ab.length_squared();
	if len_sq == 0.0 {
		return p.distance(a);
	}
	let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
	p.distance(a + ab * t)
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use bevy::math::DAffine2;

	use super::*;
	#[test]
	fn contains_point_with_radius() {
		let hole = DynamicTerrainHole::from_rect(&IntRect::from_coords(0, 0, 10, 10));
		assert!(hole.contains_point(DVec2::new(5.0, 5.0), 0.0));
		assert!(!hole.contains_point(DVec2::new(12.0, 5.0), 0.0));
		assert!(hole.contains_point(DVec2::new(12.0, 5.0), 2.0));
		assert!(!hole.contains_point(DVec2::new(12.0, 12.0), 2.0));
	}
	#[test]
	fn bounds() {
		let hole = DynamicTerrainHole::from_rect(&IntRect::from_coords(-5, 3, 10, 20));
		let bounds = hole.world_bounds().unwrap();
		assert_eq!(DVec2::new(-5.0, 3.0), bounds.min);
		assert_eq!(DVec2::new(10.0, 20.0), bounds.max);
	}
	#[test]
	fn projection_into_translated_sector() {
		let metadata = Arc::new(TerrainStaticMetadata::from_rect(IntRect::from_coords(0, 0, 100, 100)));
		let t = DAffine2::from_translation(DVec2::new(1000.0, 0.0));
		let sector = Sector::new(SectorId::new(1), metadata, t).unwrap();
		let hole = DynamicTerrainHole::from_rect(&IntRect::from_coords(1010, 10, 1020, 20));
		let projected = hole.project_onto(&sector);
		assert_eq!(1, projected.len());
		assert_eq!(Some(IntRect::from_coords(10, 10, 20, 20)), projected[0].bounds());
		assert!(projected[0].signed_area_doubled() > 0);
	}
}
