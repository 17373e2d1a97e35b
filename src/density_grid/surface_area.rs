use crate::density_grid::mesh::Mesh;
use crate::density_grid::orient::EdgeAdjacency;

/// Total triangle area of the mesh.
pub fn surface_area(mesh: &Mesh) -> f64 {
	(0..mesh.triangle_count())
		.map(|t| mesh.face_normal(t).norm() * 0.5)
		.sum()
}

/// Signed volume by the divergence theorem; positive for outward-wound closed meshes.
pub fn signed_volume(mesh: &Mesh) -> f64 {
	(0..mesh.triangle_count())
		.map(|t| {
			let [a, b, c] = mesh.triangle(t);
			a.coords.dot(&b.coords.cross(&c.coords))
		})
		.sum::<f64>()
		/ 6.0
}

/// Magnitude of the enclosed volume (meaningful for closed meshes).
pub fn enclosed_volume(mesh: &Mesh) -> f64 {
	signed_volume(mesh).abs()
}

/// Edges used by a single triangle; zero for a watertight mesh.
pub fn boundary_edge_count(mesh: &Mesh) -> usize {
	EdgeAdjacency::build(&mesh.triangles).boundary_edge_count()
}

pub fn is_closed(mesh: &Mesh) -> bool {
	!mesh.is_empty() && boundary_edge_count(mesh) == 0
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use nalgebra::Point3;

	/// Unit right tetrahedron, outward winding.
	fn tetrahedron() -> Mesh {
		Mesh::new(
			vec![
				Point3::new(0.0, 0.0, 0.0),
				Point3::new(1.0, 0.0, 0.0),
				Point3::new(0.0, 1.0, 0.0),
				Point3::new(0.0, 0.0, 1.0),
			],
			vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
		)
	}

	#[test]
	fn tetrahedron_measures() {
		let mesh = tetrahedron();
		assert_relative_eq!(signed_volume(&mesh), 1.0 / 6.0, epsilon = 1e-12);
		let area = 1.5 + 3.0_f64.sqrt() / 2.0;
		assert_relative_eq!(surface_area(&mesh), area, epsilon = 1e-12);
		assert!(is_closed(&mesh));
	}

	#[test]
	fn inverted_winding_gives_negative_volume() {
		let mut mesh = tetrahedron();
		for t in 0..mesh.triangle_count() {
			mesh.flip_triangle(t);
		}
		assert_relative_eq!(signed_volume(&mesh), -1.0 / 6.0, epsilon = 1e-12);
		assert_relative_eq!(enclosed_volume(&mesh), 1.0 / 6.0, epsilon = 1e-12);
	}

	#[test]
	fn open_mesh_has_boundary() {
		let mut mesh = tetrahedron();
		mesh.triangles.pop();
		assert_eq!(boundary_edge_count(&mesh), 3);
		assert!(!is_closed(&mesh));
		assert!(!is_closed(&Mesh::default()));
	}
}
