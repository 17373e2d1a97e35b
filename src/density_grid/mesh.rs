use nalgebra::{Point3, Vector3};

/// Indexed triangle mesh in world coordinates.
///
/// Triangles wind counter-clockwise seen from outside, so `face_normal`
/// (right-hand rule over the first two edges) points outward.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
	pub vertices: Vec<Point3<f64>>,
	pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
	pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Self {
		Self { vertices, triangles }
	}

	pub fn vertex_count(&self) -> usize {
		self.vertices.len()
	}

	pub fn triangle_count(&self) -> usize {
		self.triangles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.triangles.is_empty()
	}

	/// Corner positions of triangle `t`.
	pub fn triangle(&self, t: usize) -> [Point3<f64>; 3] {
		self.triangles[t].map(|v| self.vertices[v as usize])
	}

	/// Unnormalised normal `(b - a) x (c - a)`; its length is twice the triangle area.
	pub fn face_normal(&self, t: usize) -> Vector3<f64> {
		let [a, b, c] = self.triangle(t);
		(b - a).cross(&(c - a))
	}

	/// Reverse the winding of triangle `t`.
	pub fn flip_triangle(&mut self, t: usize) {
		self.triangles[t].swap(1, 2);
	}

	/// Axis-aligned bounds of the vertices, `None` for a mesh without vertices.
	pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
		let first = *self.vertices.first()?;
		Some(self.vertices.iter().fold((first, first), |(lo, hi), p| {
			(lo.inf(p), hi.sup(p))
		}))
	}

	/// Copy with three private vertices per triangle (no shared vertices).
	pub fn unwelded(&self) -> Mesh {
		let mut vertices = Vec::with_capacity(self.triangles.len() * 3);
		let mut triangles = Vec::with_capacity(self.triangles.len());
		for tri in &self.triangles {
			let base = vertices.len() as u32;
			vertices.extend(tri.iter().map(|&v| self.vertices[v as usize]));
			triangles.push([base, base + 1, base + 2]);
		}
		Mesh { vertices, triangles }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn quad() -> Mesh {
		Mesh::new(
			vec![
				Point3::new(0.0, 0.0, 0.0),
				Point3::new(1.0, 0.0, 0.0),
				Point3::new(1.0, 1.0, 0.0),
				Point3::new(0.0, 1.0, 0.0),
			],
			vec![[0, 1, 2], [0, 2, 3]],
		)
	}

	#[test]
	fn normal_follows_right_hand_rule() {
		let mut mesh = quad();
		assert_eq!(mesh.face_normal(0), Vector3::new(0.0, 0.0, 1.0));
		mesh.flip_triangle(0);
		assert_eq!(mesh.face_normal(0), Vector3::new(0.0, 0.0, -1.0));
	}

	#[test]
	fn bounds_cover_all_vertices() {
		let (lo, hi) = quad().bounds().unwrap();
		assert_eq!(lo, Point3::new(0.0, 0.0, 0.0));
		assert_eq!(hi, Point3::new(1.0, 1.0, 0.0));
		assert!(Mesh::default().bounds().is_none());
	}

	#[test]
	fn unwelding_keeps_geometry_and_winding() {
		let mesh = quad();
		let split = mesh.unwelded();
		assert_eq!(split.vertex_count(), 6);
		assert_eq!(split.triangle_count(), 2);
		for t in 0..2 {
			assert_eq!(split.triangle(t), mesh.triangle(t));
		}
	}
}
