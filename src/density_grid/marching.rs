//! Marching-cubes isosurface extraction over a [`GridField`].
//!
//! Extraction is a pure function of the field and the isovalue: repeated calls at
//! different levels (an interactive level slider, or the two lobes of a wavefunction)
//! share nothing but the immutable field.

use std::thread;

use bitvec::vec::BitVec;
use nalgebra::{Point3, Vector3};

use crate::density_grid::error::{GridError, GridResult};
use crate::density_grid::grid::GridField;
use crate::density_grid::mesh::Mesh;
use crate::density_grid::orient;
use crate::density_grid::tables::{corner_offset, triangles, EDGES};
use crate::density_grid::utils::linear_index;

/// Requested isosurface level.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Isovalue {
	/// One tenth of the field maximum.
	#[default]
	Default,
	Absolute(f64),
	/// Fraction of the field maximum.
	FractionOfMax(f64),
}

impl Isovalue {
	pub fn resolve(&self, field: &GridField) -> f64 {
		match *self {
			Isovalue::Default => field.max_value() / 10.0,
			Isovalue::Absolute(level) => level,
			Isovalue::FractionOfMax(fraction) => fraction * field.max_value(),
		}
	}
}

/// Which side of the isovalue is the enclosed region the normals face away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enclosure {
	/// Values at or above the isovalue are inside (densities, positive lobes).
	#[default]
	Above,
	/// Values below the isovalue are inside (negative lobes).
	Below,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
	/// Share vertices between triangles cutting the same grid edge.
	pub weld: bool,
	/// Fail with `DegenerateIsovalue` instead of returning an empty mesh.
	pub strict_range: bool,
	pub enclose: Enclosure,
}

impl Default for ExtractOptions {
	fn default() -> Self {
		Self {
			weld: true,
			strict_range: false,
			enclose: Enclosure::Above,
		}
	}
}

/// Triangles straight out of the case table, in fractional grid coordinates.
#[derive(Debug, Default)]
pub(crate) struct RawSurface {
	pub points: Vec<Vector3<f64>>,
	pub triangles: Vec<[u32; 3]>,
	/// Minimum corner of the cube each triangle came from.
	pub cells: Vec<[usize; 3]>,
}

#[derive(Debug, Clone, Default)]
pub struct IsosurfaceExtractor {
	options: ExtractOptions,
}

impl IsosurfaceExtractor {
	pub fn new(options: ExtractOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &ExtractOptions {
		&self.options
	}

	/// Extract the isosurface at `level` as an outward-oriented world-space mesh.
	///
	/// A level outside the open interval (min, max) has no surface: the result is an
	/// empty mesh, or `DegenerateIsovalue` when `strict_range` is set.
	pub fn extract(&self, field: &GridField, level: f64) -> GridResult<Mesh> {
		let (min, max) = field.value_range();
		if !(level > min && level < max) {
			if self.options.strict_range {
				return Err(GridError::DegenerateIsovalue { level, min, max });
			}
			tracing::debug!(level, min, max, "isovalue outside field range, empty surface");
			return Ok(Mesh::default());
		}

		let raw = march(field, level);
		let vertices: Vec<Point3<f64>> = raw
			.points
			.iter()
			.map(|p| field.to_world(p.x, p.y, p.z))
			.collect();
		let mut mesh = Mesh::new(vertices, raw.triangles.clone());
		let report = orient::orient_outward(field, &raw, &mut mesh, self.options.enclose);
		tracing::debug!(
			level,
			vertices = mesh.vertex_count(),
			triangles = mesh.triangle_count(),
			components = report.components,
			propagated_flips = report.propagated_flips,
			flipped_components = report.flipped_components,
			"extracted isosurface"
		);

		if self.options.weld {
			Ok(mesh)
		} else {
			Ok(mesh.unwelded())
		}
	}

	/// Resolve `isovalue` against the field, then extract.
	pub fn extract_isovalue(&self, field: &GridField, isovalue: Isovalue) -> GridResult<Mesh> {
		self.extract(field, isovalue.resolve(field))
	}

	/// Extract several independent levels concurrently; results follow `levels` order.
	pub fn extract_levels(&self, field: &GridField, levels: &[f64]) -> GridResult<Vec<Mesh>> {
		if levels.is_empty() {
			return Ok(Vec::new());
		}
		let threads = thread::available_parallelism()
			.map(|n| n.get())
			.unwrap_or(1);
		let chunk = levels.len().div_ceil(threads).max(1);

		let results: Vec<GridResult<Vec<Mesh>>> = thread::scope(|scope| {
			let handles: Vec<_> = levels
				.chunks(chunk)
				.map(|batch| {
					scope.spawn(move || {
						batch
							.iter()
							.map(|&level| self.extract(field, level))
							.collect::<GridResult<Vec<Mesh>>>()
					})
				})
				.collect();
			handles
				.into_iter()
				.map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
				.collect()
		});

		let mut meshes = Vec::with_capacity(levels.len());
		for batch in results {
			meshes.extend(batch?);
		}
		Ok(meshes)
	}
}

/// Extract with default options.
pub fn extract(field: &GridField, level: f64) -> GridResult<Mesh> {
	IsosurfaceExtractor::default().extract(field, level)
}

/// Walk every cube of the grid and emit the table triangles for its configuration.
///
/// Edge crossings are interpolated linearly and stored once per grid edge, so
/// neighbouring cubes reference the same vertex.
pub(crate) fn march(field: &GridField, level: f64) -> RawSurface {
	let dims = field.dims();
	let [nx, ny, nz] = dims;
	let samples = field.samples();

	let below: BitVec = samples.iter().map(|&v| v < level).collect();
	// One slot per (sample, axis) for the vertex on the edge leaving that sample.
	let mut edge_vertex = vec![u32::MAX; samples.len() * 3];
	let mut surface = RawSurface::default();

	for i in 0..nx - 1 {
		for j in 0..ny - 1 {
			for k in 0..nz - 1 {
				let mut corners = [0usize; 8];
				let mut config = 0usize;
				for (c, slot) in corners.iter_mut().enumerate() {
					let [di, dj, dk] = corner_offset(c);
					*slot = linear_index(dims, i + di, j + dj, k + dk);
					if below[*slot] {
						config |= 1 << c;
					}
				}
				if config == 0 || config == 255 {
					continue;
				}

				for tri in triangles(config) {
					let mut ids = [0u32; 3];
					for (n, &edge) in tri.iter().enumerate() {
						let (start, axis) = EDGES[edge];
						let a = corners[start];
						let key = a * 3 + axis;
						if edge_vertex[key] == u32::MAX {
							let b = corners[start | (1 << axis)];
							let va = samples[a] - level;
							let vb = samples[b] - level;
							let [di, dj, dk] = corner_offset(start);
							let mut p = Vector3::new((i + di) as f64, (j + dj) as f64, (k + dk) as f64);
							p[axis] += va / (va - vb);
							edge_vertex[key] = surface.points.len() as u32;
							surface.points.push(p);
						}
						ids[n] = edge_vertex[key];
					}
					surface.triangles.push(ids);
					surface.cells.push([i, j, k]);
				}
			}
		}
	}
	surface
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn unit_axes() -> [Vector3<f64>; 3] {
		[Vector3::x(), Vector3::y(), Vector3::z()]
	}

	fn two_by_two(values: [f64; 8]) -> GridField {
		GridField::origin_axis([2, 2, 2], values.to_vec(), Point3::origin(), unit_axes()).unwrap()
	}

	#[test]
	fn isovalue_defaults_to_tenth_of_max() {
		let field = two_by_two([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0]);
		assert_abs_diff_eq!(Isovalue::Default.resolve(&field), 0.5);
		assert_abs_diff_eq!(Isovalue::FractionOfMax(0.2).resolve(&field), 1.0);
		assert_abs_diff_eq!(Isovalue::Absolute(-3.0).resolve(&field), -3.0);
	}

	#[test]
	fn single_high_corner_gives_one_triangle() {
		// Sample (1, 0, 0) is index 4 in x-major order.
		let field = two_by_two([0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
		let raw = march(&field, 0.5);
		assert_eq!(raw.triangles.len(), 1);
		let mut points = raw.points.clone();
		points.sort_by(|a, b| (a.x, a.y, a.z).partial_cmp(&(b.x, b.y, b.z)).unwrap());
		assert_eq!(points[0], Vector3::new(0.5, 0.0, 0.0));
		assert_eq!(points[1], Vector3::new(1.0, 0.0, 0.5));
		assert_eq!(points[2], Vector3::new(1.0, 0.5, 0.0));
	}

	#[test]
	fn neighbouring_cubes_share_edge_vertices() {
		// A plane crossing x between index 1 and 2 in a 4x2x2 grid.
		let samples: Vec<f64> = (0..16).map(|n| if n / 4 >= 2 { 1.0 } else { 0.0 }).collect();
		let field = GridField::origin_axis([4, 2, 2], samples, Point3::origin(), unit_axes()).unwrap();
		let raw = march(&field, 0.5);
		assert_eq!(raw.triangles.len(), 2);
		assert_eq!(raw.points.len(), 4);
		assert!(raw.points.iter().all(|p| p.x == 1.5));
	}

	#[test]
	fn out_of_range_level_policy() {
		let field = two_by_two([0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
		for level in [0.0, -1.0, 1.0, 2.0, f64::NAN] {
			assert!(extract(&field, level).unwrap().is_empty());
		}
		let strict = IsosurfaceExtractor::new(ExtractOptions {
			strict_range: true,
			..ExtractOptions::default()
		});
		assert_eq!(
			strict.extract(&field, 1.0).unwrap_err(),
			GridError::DegenerateIsovalue { level: 1.0, min: 0.0, max: 1.0 }
		);
	}

	#[test]
	fn unwelded_output_has_private_vertices() {
		let samples: Vec<f64> = (0..16).map(|n| if n / 4 >= 2 { 1.0 } else { 0.0 }).collect();
		let field = GridField::origin_axis([4, 2, 2], samples, Point3::origin(), unit_axes()).unwrap();
		let extractor = IsosurfaceExtractor::new(ExtractOptions {
			weld: false,
			..ExtractOptions::default()
		});
		let mesh = extractor.extract(&field, 0.5).unwrap();
		assert_eq!(mesh.triangle_count(), 2);
		assert_eq!(mesh.vertex_count(), 6);
	}

	#[test]
	fn levels_come_back_in_order() {
		let samples: Vec<f64> = (0..27).map(|n| (n / 9) as f64).collect();
		let field = GridField::origin_axis([3, 3, 3], samples, Point3::origin(), unit_axes()).unwrap();
		let extractor = IsosurfaceExtractor::default();
		let meshes = extractor.extract_levels(&field, &[0.25, 1.5, 5.0]).unwrap();
		assert_eq!(meshes.len(), 3);
		assert!(meshes[0].vertices.iter().all(|p| (p.x - 0.25).abs() < 1e-12));
		assert!(meshes[1].vertices.iter().all(|p| (p.x - 1.5).abs() < 1e-12));
		assert!(meshes[2].is_empty());
	}
}
