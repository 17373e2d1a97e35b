//! Signed wavefunction fields: positive and negative lobes as a surface pair.

use std::thread;

use crate::density_grid::error::GridResult;
use crate::density_grid::grid::GridField;
use crate::density_grid::marching::{Enclosure, ExtractOptions, IsosurfaceExtractor};
use crate::density_grid::mesh::Mesh;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lobes {
	/// Surface at `+level` enclosing values above it.
	pub positive: Mesh,
	/// Surface at `-level` enclosing values below it.
	pub negative: Mesh,
	pub level: f64,
}

/// Extract both lobes at `|level|` with default options.
pub fn extract_lobes(field: &GridField, level: f64) -> GridResult<Lobes> {
	extract_lobes_with(field, level, ExtractOptions::default())
}

/// Extract both lobes concurrently. `options.enclose` is overridden per lobe.
pub fn extract_lobes_with(field: &GridField, level: f64, options: ExtractOptions) -> GridResult<Lobes> {
	let level = level.abs();
	let positive = IsosurfaceExtractor::new(ExtractOptions {
		enclose: Enclosure::Above,
		..options
	});
	let negative = IsosurfaceExtractor::new(ExtractOptions {
		enclose: Enclosure::Below,
		..options
	});

	let (pos, neg) = thread::scope(|scope| {
		let handle = scope.spawn(|| negative.extract(field, -level));
		let pos = positive.extract(field, level);
		let neg = handle
			.join()
			.unwrap_or_else(|panic| std::panic::resume_unwind(panic));
		(pos, neg)
	});

	let lobes = Lobes {
		positive: pos?,
		negative: neg?,
		level,
	};
	tracing::debug!(
		level,
		positive_triangles = lobes.positive.triangle_count(),
		negative_triangles = lobes.negative.triangle_count(),
		"extracted wavefunction lobes"
	);
	Ok(lobes)
}
