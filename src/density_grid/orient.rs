//! Orientation-consistency pass for freshly marched triangles.
//!
//! Winding is first made consistent inside each edge-connected component by
//! propagating across manifold edges, then each component as a whole is flipped
//! if its normals point into the enclosed region. The enclosed side is decided by
//! the field gradient, so the pass works for any lattice handedness.

use std::collections::{HashMap, VecDeque};

use bitvec::prelude::*;
use nalgebra::{Matrix3, Vector3};

use crate::density_grid::grid::GridField;
use crate::density_grid::marching::{Enclosure, RawSurface};
use crate::density_grid::mesh::Mesh;
use crate::density_grid::tables::corner_offset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrientationReport {
	pub components: usize,
	/// Components reversed as a whole to face away from the enclosed region.
	pub flipped_components: usize,
	/// Triangles reversed to agree with an already oriented neighbour.
	pub propagated_flips: usize,
}

/// Undirected edge key, smaller vertex first.
#[inline]
fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
	if a < b { (a, b) } else { (b, a) }
}

/// Edge to incident-triangle lookup.
#[derive(Debug, Clone, Default)]
pub struct EdgeAdjacency {
	edge_to_faces: HashMap<(u32, u32), Vec<usize>>,
}

impl EdgeAdjacency {
	pub fn build(triangles: &[[u32; 3]]) -> Self {
		let mut edge_to_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
		for (face, tri) in triangles.iter().enumerate() {
			for n in 0..3 {
				let edge = normalize_edge(tri[n], tri[(n + 1) % 3]);
				edge_to_faces.entry(edge).or_default().push(face);
			}
		}
		Self { edge_to_faces }
	}

	pub fn faces_for_edge(&self, a: u32, b: u32) -> &[usize] {
		self.edge_to_faces
			.get(&normalize_edge(a, b))
			.map_or(&[], Vec::as_slice)
	}

	/// Edges used by exactly one triangle.
	pub fn boundary_edge_count(&self) -> usize {
		self.edge_to_faces.values().filter(|f| f.len() == 1).count()
	}

	pub fn edge_count(&self) -> usize {
		self.edge_to_faces.len()
	}
}

/// True when triangle `tri` traverses the directed edge `a -> b`.
fn has_directed_edge(tri: &[u32; 3], a: u32, b: u32) -> bool {
	(0..3).any(|n| tri[n] == a && tri[(n + 1) % 3] == b)
}

/// Make `mesh` (built 1:1 from `raw`) consistently wound with outward normals.
pub(crate) fn orient_outward(
	field: &GridField,
	raw: &RawSurface,
	mesh: &mut Mesh,
	enclose: Enclosure,
) -> OrientationReport {
	let mut report = OrientationReport::default();
	let count = mesh.triangle_count();
	if count == 0 {
		return report;
	}

	let adjacency = EdgeAdjacency::build(&mesh.triangles);
	// World gradient = J^-T * index gradient.
	let gradient_map = field
		.index_jacobian()
		.try_inverse()
		.map(|inv| inv.transpose())
		.unwrap_or_else(Matrix3::identity);

	let mut visited = bitvec![0; count];
	let mut queue = VecDeque::new();
	let mut component = Vec::new();

	for seed in 0..count {
		if visited[seed] {
			continue;
		}
		visited.set(seed, true);
		queue.push_back(seed);
		component.clear();

		while let Some(t) = queue.pop_front() {
			component.push(t);
			let tri = mesh.triangles[t];
			for n in 0..3 {
				let (a, b) = (tri[n], tri[(n + 1) % 3]);
				let faces = adjacency.faces_for_edge(a, b);
				if faces.len() != 2 {
					continue;
				}
				let other = if faces[0] == t { faces[1] } else { faces[0] };
				if visited[other] {
					continue;
				}
				// A consistent neighbour runs the shared edge the other way.
				if has_directed_edge(&mesh.triangles[other], a, b) {
					mesh.flip_triangle(other);
					report.propagated_flips += 1;
				}
				visited.set(other, true);
				queue.push_back(other);
			}
		}

		let vote: f64 = component
			.iter()
			.map(|&t| {
				let gradient = gradient_map * index_gradient(field, raw, t);
				mesh.face_normal(t).dot(&gradient)
			})
			.sum();
		let inward = match enclose {
			Enclosure::Above => vote > 0.0,
			Enclosure::Below => vote < 0.0,
		};
		if inward {
			for &t in &component {
				mesh.flip_triangle(t);
			}
			report.flipped_components += 1;
		}
		report.components += 1;
	}
	report
}

/// Trilinear gradient (per index step) of the cube holding triangle `t`, at its centroid.
fn index_gradient(field: &GridField, raw: &RawSurface, t: usize) -> Vector3<f64> {
	let [i, j, k] = raw.cells[t];
	let centroid = raw.triangles[t]
		.iter()
		.map(|&v| raw.points[v as usize])
		.sum::<Vector3<f64>>()
		/ 3.0;
	let local = Vector3::new(
		(centroid.x - i as f64).clamp(0.0, 1.0),
		(centroid.y - j as f64).clamp(0.0, 1.0),
		(centroid.z - k as f64).clamp(0.0, 1.0),
	);

	let samples = field.samples();
	let mut gradient = Vector3::zeros();
	for c in 0..8 {
		let offset = corner_offset(c);
		let value = samples[field.ijk_to_index(i + offset[0], j + offset[1], k + offset[2])];
		let weight = |axis: usize| {
			if offset[axis] == 1 { local[axis] } else { 1.0 - local[axis] }
		};
		let sign = |axis: usize| if offset[axis] == 1 { 1.0 } else { -1.0 };
		gradient.x += value * sign(0) * weight(1) * weight(2);
		gradient.y += value * sign(1) * weight(0) * weight(2);
		gradient.z += value * sign(2) * weight(0) * weight(1);
	}
	gradient
}
