//! A sector is a tile of terrain with its own local integer coordinate space,
//! placed into the world by an affine transform.
//!
//! The static description of a sector (its boundary and contours) never
//! changes once created and may be shared between many sector instances.
//! Everything that can change, the placement and the dynamic holes touching
//! it, lives in [SectorInstanceMetadata] and bumps the sector's version.
//!

use std::collections::BTreeSet;
use std::sync::Arc;

use bevy::math::{DAffine2, DVec2};

use crate::prelude::*;
use bevy::log::trace;
use bevy::reflect::Reflect;

/// Unique ID of a sector
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct SectorId(u32);

impl SectorId {
	/// Create a new instance of [SectorId]
	pub fn new(id: u32) -> Self {
		SectorId(id)
	}
	/// Get the raw id
	pub fn get(&self) -> u32 {
		self.0
	}
}

/// The immutable geometry of a sector in local coordinates
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerrainStaticMetadata {
	/// Extent of the sector, land never leaves it
	local_boundary: IntRect,
	/// Land contours, when empty the whole boundary is land
	local_included_contours: Vec<Polygon>,
	/// Contours permanently cut out of the land
	local_excluded_contours: Vec<Polygon>,
}

impl TerrainStaticMetadata {
	/// Create a new instance of [TerrainStaticMetadata], contours are cleaned
	/// of duplicate and collinear vertices
	pub fn new(
		local_boundary: IntRect,
		local_included_contours: Vec<Polygon>,
		local_excluded_contours: Vec<Polygon>,
	) -> Self {
		TerrainStaticMetadata {
			local_boundary,
			local_included_contours: simplify_polygons(local_included_contours),
			local_excluded_contours: simplify_polygons(
				local_excluded_contours
					.into_iter()
					.map(|p| p.into_land())
					.collect(),
			),
		}
	}
	/// A sector that is land everywhere within `local_boundary`
	pub fn from_rect(local_boundary: IntRect) -> Self {
		TerrainStaticMetadata::new(local_boundary, Vec::new(), Vec::new())
	}
	/// Load from a `.ron` file
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Self {
		let file = std::fs::File::open(path).expect("Failed opening TerrainStaticMetadata file");
		let metadata: TerrainStaticMetadata = match ron::de::from_reader(file) {
			Ok(metadata) => metadata,
			Err(e) => panic!("Failed deserializing TerrainStaticMetadata: {}", e),
		};
		TerrainStaticMetadata::new(
			metadata.local_boundary,
			metadata.local_included_contours,
			metadata.local_excluded_contours,
		)
	}
	/// Get the local boundary
	pub fn get_local_boundary(&self) -> &IntRect {
		&self.local_boundary
	}
	/// Get the included contours
	pub fn get_local_included_contours(&self) -> &[Polygon] {
		&self.local_included_contours
	}
	/// Get the excluded contours
	pub fn get_local_excluded_contours(&self) -> &[Polygon] {
		&self.local_excluded_contours
	}
	/// The contours land is punched from: the included contours, or the
	/// boundary when there are none
	pub fn land_contours(&self) -> Vec<Polygon> {
		if self.local_included_contours.is_empty() {
			vec![Polygon::from_rect(&self.local_boundary)]
		} else {
			self.local_included_contours.clone()
		}
	}
}

/// An axis aligned rectangle in world space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBounds {
	/// Minimum corner
	pub min: DVec2,
	/// Maximum corner
	pub max: DVec2,
}

impl WorldBounds {
	/// Bounds of a set of points, `None` when there are none
	pub fn from_points(points: impl IntoIterator<Item = DVec2>) -> Option<Self> {
		let mut iter = points.into_iter();
		let first = iter.next()?;
		let mut bounds = WorldBounds {
			min: first,
			max: first,
		};
		for p in iter {
			bounds.min = bounds.min.min(p);
			bounds.max = bounds.max.max(p);
		}
		Some(bounds)
	}
	/// Whether the two bounds share any point
	pub fn intersects(&self, other: &WorldBounds) -> bool {
		self.min.x <= other.max.x
			&& other.min.x <= self.max.x
			&& self.min.y <= other.max.y
			&& other.min.y <= self.max.y
	}
}

/// Placement of a sector and the dynamic holes currently touching it
#[derive(Clone, Debug, PartialEq)]
pub struct SectorInstanceMetadata {
	/// Local to world transform
	world_transform: DAffine2,
	/// World to local transform
	world_transform_inv: DAffine2,
	/// Dynamic holes whose bounds overlap this sector
	holes: BTreeSet<HoleId>,
}

impl SectorInstanceMetadata {
	/// Get the local to world transform
	pub fn get_world_transform(&self) -> &DAffine2 {
		&self.world_transform
	}
	/// Get the world to local transform
	pub fn get_world_transform_inv(&self) -> &DAffine2 {
		&self.world_transform_inv
	}
	/// Get the dynamic holes touching the sector
	pub fn get_holes(&self) -> &BTreeSet<HoleId> {
		&self.holes
	}
}

/// Inverse of `transform`, `None` when it cannot be inverted
pub fn try_invert(transform: &DAffine2) -> Option<DAffine2> {
	let determinant = transform.matrix2.determinant();
	if !transform.is_finite() || !determinant.is_finite() || determinant.abs() < f64::EPSILON {
		return None;
	}
	let inverse = transform.inverse();
	if inverse.is_finite() {
		Some(inverse)
	} else {
		None
	}
}

/// A tile of terrain placed in the world
#[derive(Clone, Debug)]
pub struct Sector {
	/// Unique ID
	id: SectorId,
	/// Shared immutable geometry
	static_metadata: Arc<TerrainStaticMetadata>,
	/// Placement and holes
	instance_metadata: SectorInstanceMetadata,
	/// Bumped whenever the placement or the hole set changes
	version: u64,
}

impl Sector {
	/// Create a new instance of [Sector]
	pub fn new(
		id: SectorId,
		static_metadata: Arc<TerrainStaticMetadata>,
		world_transform: DAffine2,
	) -> Result<Self, TerrainError> {
		let world_transform_inv =
			try_invert(&world_transform).ok_or(TerrainError::NonInvertibleTransform(id))?;
		Ok(Sector {
			id,
			static_metadata,
			instance_metadata: SectorInstanceMetadata {
				world_transform,
				world_transform_inv,
				holes: BTreeSet::new(),
			},
			version: 0,
		})
	}
	/// Get the [SectorId]
	pub fn get_id(&self) -> SectorId {
		self.id
	}
	/// Get the static geometry
	pub fn get_static_metadata(&self) -> &Arc<TerrainStaticMetadata> {
		&self.static_metadata
	}
	/// Get the placement and holes
	pub fn get_instance_metadata(&self) -> &SectorInstanceMetadata {
		&self.instance_metadata
	}
	/// Get the current version
	pub fn get_version(&self) -> u64 {
		self.version
	}
	/// Get the local to world transform
	pub fn get_world_transform(&self) -> &DAffine2 {
		&self.instance_metadata.world_transform
	}
	/// Get the world to local transform
	pub fn get_world_transform_inv(&self) -> &DAffine2 {
		&self.instance_metadata.world_transform_inv
	}
	/// Move the sector. Setting the current transform again does nothing and
	/// returns `false`, a transform which cannot be inverted is rejected
	/// leaving the sector untouched
	pub fn set_world_transform(&mut self, world_transform: DAffine2) -> Result<bool, TerrainError> {
		if self.instance_metadata.world_transform == world_transform {
			return Ok(false);
		}
		let world_transform_inv =
			try_invert(&world_transform).ok_or(TerrainError::NonInvertibleTransform(self.id))?;
		self.instance_metadata.world_transform = world_transform;
		self.instance_metadata.world_transform_inv = world_transform_inv;
		self.version += 1;
		trace!("Sector {:?} moved, now version {}", self.id, self.version);
		Ok(true)
	}
	/// Record that a dynamic hole touches, or has stopped touching, the
	/// sector. The version is bumped either way since the hole may have
	/// changed shape
	pub(crate) fn touch_hole(&mut self, hole: HoleId, touching: bool) {
		if touching {
			self.instance_metadata.holes.insert(hole);
		} else {
			self.instance_metadata.holes.remove(&hole);
		}
		self.version += 1;
	}
	/// Replace the whole set of touching holes, bumping the version only when
	/// it changes
	pub(crate) fn set_holes(&mut self, holes: BTreeSet<HoleId>) {
		if self.instance_metadata.holes != holes {
			self.instance_metadata.holes = holes;
			self.version += 1;
		}
	}
	/// Map a local point into the world
	pub fn local_to_world(&self, point: IntVector2) -> DVec2 {
		self.get_world_transform().transform_point2(point.as_dvec2())
	}
	/// Map a world point into local space
	pub fn world_to_local(&self, point: DVec2) -> DVec2 {
		self.get_world_transform_inv().transform_point2(point)
	}
	/// World space bounds of the local boundary
	pub fn world_bounds(&self) -> WorldBounds {
		let corners = self.static_metadata.get_local_boundary().corners();
		// a rectangle always has corners so the bounds exist
		WorldBounds::from_points(corners.iter().map(|c| self.local_to_world(*c))).unwrap_or(
			WorldBounds {
				min: DVec2::ZERO,
				max: DVec2::ZERO,
			},
		)
	}
}

#[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	/// Plain 100x100 sector at the origin
	fn sector() -> Sector {
		let metadata = Arc::new(TerrainStaticMetadata::from_rect(IntRect::from_coords(0, 0, 100, 100)));
		Sector::new(SectorId::new(0), metadata, DAffine2::IDENTITY).unwrap()
	}
	#[test]
	fn same_transform_is_noop() {
		let mut sector = sector();
		let result = sector.set_world_transform(DAffine2::IDENTITY).unwrap();
		assert!(!result);
		assert_eq!(0, sector.get_version());
	}
	#[test]
	fn moving_bumps_version() {
		let mut sector = sector();
		let t = DAffine2::from_translation(DVec2::new(100.0, 0.0));
		assert!(sector.set_world_transform(t).unwrap());
		assert_eq!(1, sector.get_version());
		let world = sector.local_to_world(IntVector2::new(10, 10));
		assert_eq!(DVec2::new(110.0, 10.0), world);
		assert_eq!(DVec2::new(10.0, 10.0), sector.world_to_local(world));
	}
	#[test]
	fn singular_transform_rejected() {
		let mut sector = sector();
		let t = DAffine2::from_scale(DVec2::new(1.0, 0.0));
		let result = sector.set_world_transform(t);
		assert_eq!(Err(TerrainError::NonInvertibleTransform(SectorId::new(0))), result);
		assert_eq!(0, sector.get_version());
		assert_eq!(DAffine2::IDENTITY, *sector.get_world_transform());
	}
	#[test]
	fn non_finite_transform_rejected() {
		let t = DAffine2::from_translation(DVec2::new(f64::NAN, 0.0));
		assert!(try_invert(&t).is_none());
	}
	#[test]
	fn rotated_world_bounds() {
		let mut sector = sector();
		sector.set_world_transform(DAffine2::from_angle(std::f64::consts::FRAC_PI_2)).unwrap();
		let bounds = sector.world_bounds();
		assert!((bounds.min.x + 100.0).abs() < 1e-9);
		assert!((bounds.max.y - 100.0).abs() < 1e-9);
	}
	#[test]
	fn hole_membership_bumps_version() {
		let mut sector = sector();
		sector.touch_hole(HoleId::new(3), true);
		assert_eq!(1, sector.get_version());
		assert!(sector.get_instance_metadata().get_holes().contains(&HoleId::new(3)));
		let mut holes = BTreeSet::new();
		holes.insert(HoleId::new(3));
		sector.set_holes(holes);
		assert_eq!(1, sector.get_version());
	}
	#[test]
	fn excluded_contours_become_land_oriented() {
		let mut points = IntRect::from_coords(10, 10, 20, 20).corners().to_vec();
		points.reverse();
		let metadata = TerrainStaticMetadata::new(
			IntRect::from_coords(0, 0, 100, 100),
			vec![],
			vec![Polygon::new(points, true)],
		);
		let excluded = &metadata.get_local_excluded_contours()[0];
		assert!(!excluded.is_hole());
		assert!(excluded.signed_area_doubled() > 0);
	}
	#[test]
	#[cfg(feature = "ron")]
	fn static_metadata_from_ron() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/sector_static_metadata.ron";
		let metadata = TerrainStaticMetadata::from_ron(path);
		assert_eq!(IntRect::from_coords(0, 0, 1000, 1000), *metadata.get_local_boundary());
		assert_eq!(1, metadata.get_local_excluded_contours().len());
	}
}
