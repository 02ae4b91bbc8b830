//! Measure finding a path from one corner of the world to the other once the
//! overlay network is compiled
//!
//! World is 4 sectors by 4 sectors, each 1000x1000 with a hole in the middle
//!

use std::sync::Arc;

use bevy::math::{DAffine2, DVec2};
use bevy_terrain_overlay_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Create the sectors and warm the network cache before benchmarking
fn prepare_service(sectors_per_side: u32, agent_radius: f64) -> TerrainService {
	let metadata = Arc::new(TerrainStaticMetadata::new(
		IntRect::from_coords(0, 0, 1000, 1000),
		vec![],
		vec![Polygon::from_rect(&IntRect::from_coords(400, 400, 600, 600))],
	));
	let mut service = TerrainService::new();
	for column in 0..sectors_per_side {
		for row in 0..sectors_per_side {
			let offset = DVec2::new(column as f64 * 1000.0, row as f64 * 1000.0);
			service
				.add_sector(metadata.clone(), DAffine2::from_translation(offset))
				.unwrap();
		}
	}
	service.compile_snapshot().compile_overlay_network(agent_radius);
	service
}

/// Route from the bottom left to the top right
fn calc(service: &TerrainService, agent_radius: f64) {
	let pathfinder = PathfinderCalculator::new(service);
	let _roadmap = pathfinder.try_find_path(
		agent_radius,
		DVec2::new(100.0, 100.0),
		DVec2::new(3900.0, 3900.0),
	);
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(100);
	let service = prepare_service(4, 5.0);
	group.bench_function("find_path", |b| {
		b.iter(|| calc(black_box(&service), black_box(5.0)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
