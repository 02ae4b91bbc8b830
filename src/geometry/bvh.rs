//! Bounding volume hierarchy over line segments.
//!
//! Built once over the contour edges of a land polygon and used to reject
//! most edges cheaply when testing whether a segment crosses a barrier.
//! Nodes live in a flat arena and leaves reference a contiguous range of the
//! tree's own (reordered) copy of the segments, so no leaf allocates.
//!

use crate::prelude::*;

/// Ranges of at most this many segments become leaves
pub const BVH_LEAF_THRESHOLD: usize = 4;

/// A node of [BvhTreeAABB]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BvhNode {
	/// Bounds of the segments in `start..end`
	Leaf {
		/// Bounds of every segment in the range
		bounds: IntRect,
		/// First segment index
		start: usize,
		/// One past the last segment index
		end: usize,
	},
	/// Bounds of both children
	Internal {
		/// Bounds of both children
		bounds: IntRect,
		/// Arena index of the first child
		left: usize,
		/// Arena index of the second child
		right: usize,
	},
}

impl BvhNode {
	/// Get the bounds of the node
	pub fn get_bounds(&self) -> &IntRect {
		match self {
			BvhNode::Leaf { bounds, .. } => bounds,
			BvhNode::Internal { bounds, .. } => bounds,
		}
	}
}

/// Bounding volume hierarchy of axis aligned boxes around segments
#[derive(Clone, Debug, Default)]
pub struct BvhTreeAABB {
	/// Segments reordered so that every leaf covers a contiguous range
	segments: Vec<IntLineSegment2>,
	/// Node arena, the root is the first entry when not empty
	nodes: Vec<BvhNode>,
}

impl BvhTreeAABB {
	/// Build a tree over the segments
	pub fn new(segments: &[IntLineSegment2]) -> Self {
		let mut tree = BvhTreeAABB {
			segments: segments.to_vec(),
			nodes: Vec::with_capacity(segments.len().div_ceil(BVH_LEAF_THRESHOLD) * 2),
		};
		if !tree.segments.is_empty() {
			let len = tree.segments.len();
			tree.build_node(0, len);
		}
		tree
	}
	/// Recursively split `start..end` along the longer axis at the median,
	/// returns the arena index of the node created
	fn build_node(&mut self, start: usize, end: usize) -> usize {
		let bounds = self.segments[start..end]
			.iter()
			.map(|s| s.bounds())
			.reduce(|a, b| a.union(&b))
			.unwrap_or_default();
		let index = self.nodes.len();
		if end - start <= BVH_LEAF_THRESHOLD {
			self.nodes.push(BvhNode::Leaf { bounds, start, end });
			return index;
		}
		// reserve the slot so the parent precedes its children
		self.nodes.push(BvhNode::Leaf { bounds, start, end });
		let split_on_x = bounds.width() >= bounds.height();
		self.segments[start..end].sort_by_key(|s| {
			if split_on_x {
				s.first.x as i64 + s.second.x as i64
			} else {
				s.first.y as i64 + s.second.y as i64
			}
		});
		let mid = start + (end - start) / 2;
		let left = self.build_node(start, mid);
		let right = self.build_node(mid, end);
		self.nodes[index] = BvhNode::Internal {
			bounds,
			left,
			right,
		};
		index
	}
	/// Get the (reordered) segments
	pub fn get_segments(&self) -> &[IntLineSegment2] {
		&self.segments
	}
	/// Get the node arena for debug drawing
	pub fn get_nodes(&self) -> &[BvhNode] {
		&self.nodes
	}
	/// Bounds of everything in the tree
	pub fn get_bounds(&self) -> Option<&IntRect> {
		self.nodes.first().map(|n| n.get_bounds())
	}
	/// Visit every segment whose bounds overlap `query`
	pub fn for_each_overlapping(&self, query: &IntRect, mut f: impl FnMut(&IntLineSegment2)) {
		if self.nodes.is_empty() {
			return;
		}
		let mut stack = vec![0];
		while let Some(index) = stack.pop() {
			match &self.nodes[index] {
				BvhNode::Leaf { bounds, start, end } => {
					if !bounds.intersects(query) {
						continue;
					}
					for segment in self.segments[*start..*end].iter() {
						if segment.bounds().intersects(query) {
							f(segment);
						}
					}
				}
				BvhNode::Internal {
					bounds,
					left,
					right,
				} => {
					if bounds.intersects(query) {
						stack.push(*right);
						stack.push(*left);
					}
				}
			}
		}
	}
	/// Find the first indexed segment which properly crosses `query`,
	/// returning its position within [BvhTreeAABB::get_segments]
	pub fn try_intersect(&self, query: &IntLineSegment2) -> Option<usize> {
		if self.nodes.is_empty() {
			return None;
		}
		let query_bounds = query.bounds();
		let mut stack = vec![0];
		while let Some(index) = stack.pop() {
			match &self.nodes[index] {
				BvhNode::Leaf { bounds, start, end } => {
					if !bounds.intersects(&query_bounds) {
						continue;
					}
					for i in *start..*end {
						if self.segments[i].crosses(query) {
							return Some(i);
						}
					}
				}
				BvhNode::Internal {
					bounds,
					left,
					right,
				} => {
					if bounds.intersects(&query_bounds) {
						stack.push(*right);
						stack.push(*left);
					}
				}
			}
		}
		None
	}
}
