use nalgebra::{Matrix3, Vector3};

/// One Bohr radius in Angstrom (CODATA 2018).
pub const BOHR_TO_ANGSTROM: f64 = 0.529177210903;

/// Relative tolerance below which a lattice is treated as flat.
const DEGENERATE_TOLERANCE: f64 = 1e-10;

/// Matrix whose columns are the three lattice axes.
pub fn axis_matrix(axes: &[Vector3<f64>; 3]) -> Matrix3<f64> {
	Matrix3::from_columns(axes)
}

/// Signed volume of the parallelepiped spanned by the axes.
pub fn lattice_determinant(axes: &[Vector3<f64>; 3]) -> f64 {
	axes[0].dot(&axes[1].cross(&axes[2]))
}

/// Describe why a set of axes cannot span 3D space, or `None` if it can.
///
/// The determinant is compared against the product of the axis lengths, so the test
/// is independent of the lattice scale (Bohr vs Angstrom, one step vs a full cell).
pub fn degeneracy(axes: &[Vector3<f64>; 3]) -> Option<String> {
	for (n, axis) in axes.iter().enumerate() {
		if !axis.iter().all(|c| c.is_finite()) {
			return Some(format!("axis {} has a non-finite component", n));
		}
		if axis.norm() == 0.0 {
			return Some(format!("axis {} has zero length", n));
		}
	}
	let scale = axes[0].norm() * axes[1].norm() * axes[2].norm();
	let det = lattice_determinant(axes);
	if det.abs() <= DEGENERATE_TOLERANCE * scale {
		return Some(format!("axes are coplanar (determinant {:e})", det));
	}
	None
}

/// Lengths |a|, |b|, |c| of the three axes.
pub fn cell_lengths(axes: &[Vector3<f64>; 3]) -> [f64; 3] {
	[axes[0].norm(), axes[1].norm(), axes[2].norm()]
}

/// Crystallographic angles (alpha, beta, gamma) in degrees: b^c, a^c, a^b.
pub fn cell_angles(axes: &[Vector3<f64>; 3]) -> [f64; 3] {
	let angle = |u: &Vector3<f64>, v: &Vector3<f64>| {
		let cos = (u.dot(v) / (u.norm() * v.norm())).clamp(-1.0, 1.0);
		cos.acos().to_degrees()
	};
	[
		angle(&axes[1], &axes[2]),
		angle(&axes[0], &axes[2]),
		angle(&axes[0], &axes[1]),
	]
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn unit_axes() -> [Vector3<f64>; 3] {
		[Vector3::x(), Vector3::y(), Vector3::z()]
	}

	#[test]
	fn orthogonal_axes_are_valid() {
		assert!(degeneracy(&unit_axes()).is_none());
		assert_abs_diff_eq!(lattice_determinant(&unit_axes()), 1.0);
	}

	#[test]
	fn coplanar_axes_are_rejected_at_any_scale() {
		let tiny = [
			Vector3::new(1e-6, 0.0, 0.0),
			Vector3::new(0.0, 1e-6, 0.0),
			Vector3::new(1e-6, 1e-6, 0.0),
		];
		assert!(degeneracy(&tiny).unwrap().contains("coplanar"));
		// A small but genuinely 3D lattice passes.
		let small = [
			Vector3::new(1e-6, 0.0, 0.0),
			Vector3::new(0.0, 1e-6, 0.0),
			Vector3::new(0.0, 0.0, 1e-6),
		];
		assert!(degeneracy(&small).is_none());
	}

	#[test]
	fn axis_matrix_columns_are_the_axes() {
		let axes = [Vector3::new(2.0, 0.0, 0.0), Vector3::new(1.0, 3.0, 0.0), Vector3::new(0.0, 1.0, 4.0)];
		let m = axis_matrix(&axes);
		assert_eq!(m * Vector3::y(), axes[1]);
		assert_abs_diff_eq!(m.determinant(), lattice_determinant(&axes), epsilon = 1e-12);
	}

	#[test]
	fn zero_axis_is_rejected() {
		let axes = [Vector3::zeros(), Vector3::y(), Vector3::z()];
		assert!(degeneracy(&axes).unwrap().contains("zero length"));
	}

	#[test]
	fn hexagonal_cell_angles() {
		let axes = [
			Vector3::new(2.0, 0.0, 0.0),
			Vector3::new(-1.0, 3f64.sqrt(), 0.0),
			Vector3::new(0.0, 0.0, 5.0),
		];
		let [alpha, beta, gamma] = cell_angles(&axes);
		assert_abs_diff_eq!(alpha, 90.0, epsilon = 1e-9);
		assert_abs_diff_eq!(beta, 90.0, epsilon = 1e-9);
		assert_abs_diff_eq!(gamma, 120.0, epsilon = 1e-9);
		assert_abs_diff_eq!(cell_lengths(&axes)[1], 2.0, epsilon = 1e-12);
	}
}
