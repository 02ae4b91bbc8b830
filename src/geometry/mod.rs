//! Exact integer 2d primitives used to describe the land of a sector.
//!
//! All orientation and containment tests are evaluated with `i64` products of
//! `i32` coordinates so that they never suffer from floating point error. The
//! y-axis points up, a positive cross product is a counter-clockwise turn.
//!

pub mod bvh;
pub mod polygon;
pub mod polygon_operations;

use bevy::math::DVec2;
use bevy::prelude::*;

/// A point or vector on the integer lattice of a sector's local space
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVector2 {
	/// Horizontal coordinate
	pub x: i32,
	/// Vertical coordinate
	pub y: i32,
}

impl IntVector2 {
	/// The origin
	pub const ZERO: IntVector2 = IntVector2 { x: 0, y: 0 };
	/// Create a new instance of [IntVector2]
	pub const fn new(x: i32, y: i32) -> Self {
		IntVector2 { x, y }
	}
	/// Dot product, widened so it cannot overflow
	pub fn dot(&self, other: IntVector2) -> i64 {
		self.x as i64 * other.x as i64 + self.y as i64 * other.y as i64
	}
	/// 2d cross product (z component of the 3d one), widened so it cannot overflow
	pub fn cross(&self, other: IntVector2) -> i64 {
		self.x as i64 * other.y as i64 - self.y as i64 * other.x as i64
	}
	/// Squared length
	pub fn squared_norm(&self) -> i64 {
		self.dot(*self)
	}
	/// Euclidean length
	pub fn norm(&self) -> f64 {
		(self.squared_norm() as f64).sqrt()
	}
	/// Vector from `self` to `other`
	pub fn to(&self, other: IntVector2) -> IntVector2 {
		other - *self
	}
	/// Euclidean distance to `other`
	pub fn distance(&self, other: IntVector2) -> f64 {
		self.to(other).norm()
	}
	/// Convert into a floating point vector
	pub fn as_dvec2(&self) -> DVec2 {
		DVec2::new(self.x as f64, self.y as f64)
	}
	/// Snap a floating point position onto the nearest lattice point
	pub fn from_dvec2_rounded(v: DVec2) -> Self {
		IntVector2::new(v.x.round() as i32, v.y.round() as i32)
	}
}

impl std::ops::Add for IntVector2 {
	type Output = IntVector2;
	fn add(self, rhs: IntVector2) -> IntVector2 {
		IntVector2::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl std::ops::Sub for IntVector2 {
	type Output = IntVector2;
	fn sub(self, rhs: IntVector2) -> IntVector2 {
		IntVector2::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl std::ops::Neg for IntVector2 {
	type Output = IntVector2;
	fn neg(self) -> IntVector2 {
		IntVector2::new(-self.x, -self.y)
	}
}

/// Direction of the turn made when walking `a -> b -> c`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clockness {
	/// Right hand turn
	Clockwise,
	/// Left hand turn
	CounterClockwise,
	/// The three points are collinear
	Neither,
}

impl Clockness {
	/// Evaluate the turn `a -> b -> c`
	pub fn of(a: IntVector2, b: IntVector2, c: IntVector2) -> Self {
		match a.to(b).cross(b.to(c)).signum() {
			1 => Clockness::CounterClockwise,
			-1 => Clockness::Clockwise,
			_ => Clockness::Neither,
		}
	}
	/// The sign of the turn as `-1`, `0` or `1`
	fn sign(&self) -> i32 {
		match self {
			Clockness::Clockwise => -1,
			Clockness::CounterClockwise => 1,
			Clockness::Neither => 0,
		}
	}
}

/// A segment between two distinct lattice points
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntLineSegment2 {
	/// Start of the segment
	pub first: IntVector2,
	/// End of the segment
	pub second: IntVector2,
}

impl IntLineSegment2 {
	/// Create a new instance of [IntLineSegment2]. A zero length segment is a
	/// programming error
	pub fn new(first: IntVector2, second: IntVector2) -> Self {
		debug_assert!(
			first != second,
			"Cannot create a zero length segment at {:?}",
			first
		);
		IntLineSegment2 { first, second }
	}
	/// Whether `point` lies on the segment, endpoints included
	pub fn contains(&self, point: IntVector2) -> bool {
		let a = self.first;
		let b = self.second;
		if a.to(b).cross(a.to(point)) != 0 {
			return false;
		}
		// collinear, check the projection falls within the segment
		let along = a.to(point).dot(a.to(b));
		along >= 0 && along <= a.to(b).squared_norm()
	}
	/// Whether the two segments share at least one point, touching counts
	pub fn intersects(&self, other: &IntLineSegment2) -> bool {
		let o1 = Clockness::of(self.first, self.second, other.first);
		let o2 = Clockness::of(self.first, self.second, other.second);
		let o3 = Clockness::of(other.first, other.second, self.first);
		let o4 = Clockness::of(other.first, other.second, self.second);
		if o1 != o2 && o3 != o4 {
			return true;
		}
		(o1 == Clockness::Neither && self.contains(other.first))
			|| (o2 == Clockness::Neither && self.contains(other.second))
			|| (o3 == Clockness::Neither && other.contains(self.first))
			|| (o4 == Clockness::Neither && other.contains(self.second))
	}
	/// Whether the segments cross at a single point interior to both of
	/// them. Touching, sharing an endpoint or overlapping collinearly are not
	/// crossings
	pub fn crosses(&self, other: &IntLineSegment2) -> bool {
		let o1 = Clockness::of(self.first, self.second, other.first).sign();
		let o2 = Clockness::of(self.first, self.second, other.second).sign();
		let o3 = Clockness::of(other.first, other.second, self.first).sign();
		let o4 = Clockness::of(other.first, other.second, self.second).sign();
		o1 * o2 < 0 && o3 * o4 < 0
	}
	/// Euclidean length
	pub fn length(&self) -> f64 {
		self.first.distance(self.second)
	}
	/// Axis aligned bounds of the segment
	pub fn bounds(&self) -> IntRect {
		IntRect::new(
			IntVector2::new(
				self.first.x.min(self.second.x),
				self.first.y.min(self.second.y),
			),
			IntVector2::new(
				self.first.x.max(self.second.x),
				self.first.y.max(self.second.y),
			),
		)
	}
}

/// An inclusive axis aligned rectangle on the integer lattice
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
	/// Bottom left corner
	pub min: IntVector2,
	/// Top right corner
	pub max: IntVector2,
}

/// The four sides of an [IntRect], in counter-clockwise order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RectSide {
	/// `y == min.y`
	Bottom,
	/// `x == max.x`
	Right,
	/// `y == max.y`
	Top,
	/// `x == min.x`
	Left,
}

impl RectSide {
	/// Every side in counter-clockwise order
	pub const ALL: [RectSide; 4] = [
		RectSide::Bottom,
		RectSide::Right,
		RectSide::Top,
		RectSide::Left,
	];
}

impl IntRect {
	/// Create a new instance of [IntRect]
	pub fn new(min: IntVector2, max: IntVector2) -> Self {
		if min.x > max.x || min.y > max.y {
			panic!("Rectangle min {:?} must not exceed max {:?}", min, max);
		}
		IntRect { min, max }
	}
	/// Create a rectangle from its corner coordinates
	pub fn from_coords(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
		IntRect::new(IntVector2::new(min_x, min_y), IntVector2::new(max_x, max_y))
	}
	/// Width along x
	pub fn width(&self) -> i32 {
		self.max.x - self.min.x
	}
	/// Height along y
	pub fn height(&self) -> i32 {
		self.max.y - self.min.y
	}
	/// Whether `point` is inside or on the edge of the rectangle
	pub fn contains(&self, point: IntVector2) -> bool {
		point.x >= self.min.x
			&& point.x <= self.max.x
			&& point.y >= self.min.y
			&& point.y <= self.max.y
	}
	/// Whether the two rectangles share any point
	pub fn intersects(&self, other: &IntRect) -> bool {
		self.min.x <= other.max.x
			&& other.min.x <= self.max.x
			&& self.min.y <= other.max.y
			&& other.min.y <= self.max.y
	}
	/// Smallest rectangle containing both
	pub fn union(&self, other: &IntRect) -> IntRect {
		IntRect::new(
			IntVector2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
			IntVector2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
		)
	}
	/// Corners in counter-clockwise order starting from `min`
	pub fn corners(&self) -> [IntVector2; 4] {
		[
			self.min,
			IntVector2::new(self.max.x, self.min.y),
			self.max,
			IntVector2::new(self.min.x, self.max.y),
		]
	}
	/// The segment of one side, directed counter-clockwise
	pub fn side(&self, side: RectSide) -> (IntVector2, IntVector2) {
		let c = self.corners();
		match side {
			RectSide::Bottom => (c[0], c[1]),
			RectSide::Right => (c[1], c[2]),
			RectSide::Top => (c[2], c[3]),
			RectSide::Left => (c[3], c[0]),
		}
	}
	/// Whether `segment` lies along `side`
	pub fn side_contains_segment(&self, side: RectSide, segment: &IntLineSegment2) -> bool {
		match side {
			RectSide::Bottom => segment.first.y == self.min.y && segment.second.y == self.min.y,
			RectSide::Right => segment.first.x == self.max.x && segment.second.x == self.max.x,
			RectSide::Top => segment.first.y == self.max.y && segment.second.y == self.max.y,
			RectSide::Left => segment.first.x == self.min.x && segment.second.x == self.min.x,
		}
	}
}
