use std::sync::OnceLock;

use nalgebra::{Matrix3, Point3, Vector3};

use crate::density_grid::error::{GridError, GridResult};
use crate::density_grid::geometry;

/// How grid indices map to world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateConvention {
	/// Grid spans one unit cell: `world = origin + (i-1)/nx*a0 + (j-1)/ny*a1 + (k-1)/nz*a2`.
	/// Index 1 sits on the cell origin, index 0 one step before it.
	CellNormalized,
	/// Explicit per-step axes: `world = origin + i*a0 + j*a1 + k*a2`.
	OriginAxis,
}

/// Scalar density samples on a regular 3D lattice
///
/// Samples are stored x-major: `(i, j, k)` lives at `(i * ny + j) * nz + k`.
/// The field is immutable once built; min/max are computed lazily and cached.
#[derive(Debug, Clone)]
pub struct GridField {
	dims: [usize; 3],
	samples: Vec<f64>,
	origin: Point3<f64>,
	axes: [Vector3<f64>; 3],
	convention: CoordinateConvention,
	range: OnceLock<(f64, f64)>,
}

impl GridField {
	/// Validate and build a field.
	///
	/// Fails with `InvalidGrid` when the sample count does not match the dimensions,
	/// any dimension is below 2, a sample is not finite, or the axes are degenerate.
	pub fn new(
		dims: [usize; 3],
		samples: Vec<f64>,
		origin: Point3<f64>,
		axes: [Vector3<f64>; 3],
		convention: CoordinateConvention,
	) -> GridResult<Self> {
		if let Some(axis) = dims.iter().position(|&n| n < 2) {
			return Err(GridError::InvalidGrid(format!(
				"dimension {} along axis {} is below 2",
				dims[axis], axis
			)));
		}
		let expected = dims
			.iter()
			.try_fold(1usize, |acc, &n| acc.checked_mul(n))
			.ok_or_else(|| GridError::InvalidGrid(format!("dimensions {:?} overflow", dims)))?;
		if samples.len() != expected {
			return Err(GridError::InvalidGrid(format!(
				"{} samples for dimensions {}x{}x{} (expected {})",
				samples.len(),
				dims[0],
				dims[1],
				dims[2],
				expected
			)));
		}
		if let Some(bad) = samples.iter().position(|v| !v.is_finite()) {
			return Err(GridError::InvalidGrid(format!("sample {} is not finite", bad)));
		}
		if !origin.coords.iter().all(|c| c.is_finite()) {
			return Err(GridError::InvalidGrid("origin is not finite".to_string()));
		}
		if let Some(reason) = geometry::degeneracy(&axes) {
			return Err(GridError::InvalidGrid(reason));
		}
		Ok(Self {
			dims,
			samples,
			origin,
			axes,
			convention,
			range: OnceLock::new(),
		})
	}

	/// Field with explicit per-step axes (Gaussian cube style).
	pub fn origin_axis(
		dims: [usize; 3],
		samples: Vec<f64>,
		origin: Point3<f64>,
		step_axes: [Vector3<f64>; 3],
	) -> GridResult<Self> {
		Self::new(dims, samples, origin, step_axes, CoordinateConvention::OriginAxis)
	}

	/// Field spanning one unit cell whose origin is the world origin (CHGCAR style).
	pub fn cell_normalized(
		dims: [usize; 3],
		samples: Vec<f64>,
		cell: [Vector3<f64>; 3],
	) -> GridResult<Self> {
		Self::new(dims, samples, Point3::origin(), cell, CoordinateConvention::CellNormalized)
	}

	pub fn dims(&self) -> [usize; 3] {
		self.dims
	}

	pub fn samples(&self) -> &[f64] {
		&self.samples
	}

	pub fn origin(&self) -> Point3<f64> {
		self.origin
	}

	pub fn axes(&self) -> &[Vector3<f64>; 3] {
		&self.axes
	}

	pub fn convention(&self) -> CoordinateConvention {
		self.convention
	}

	/// Scalar at integer index `(i, j, k)`.
	pub fn sample_at(&self, i: usize, j: usize, k: usize) -> GridResult<f64> {
		let [nx, ny, nz] = self.dims;
		if i >= nx || j >= ny || k >= nz {
			return Err(GridError::IndexOutOfRange {
				i,
				j,
				k,
				dims: self.dims,
			});
		}
		Ok(self.samples[self.ijk_to_index(i, j, k)])
	}

	/// Largest sample value.
	pub fn max_value(&self) -> f64 {
		self.value_range().1
	}

	/// Smallest sample value.
	pub fn min_value(&self) -> f64 {
		self.value_range().0
	}

	/// `(min, max)` over all samples, scanned once.
	pub fn value_range(&self) -> (f64, f64) {
		*self.range.get_or_init(|| crate::density_grid::utils::min_max(&self.samples))
	}

	/// Real-world coordinate of a (possibly fractional) grid position.
	pub fn to_world(&self, i: f64, j: f64, k: f64) -> Point3<f64> {
		self.origin + self.index_jacobian() * self.shifted_index(i, j, k)
	}

	/// Linear map from grid-index displacements to world displacements (columns = one index step).
	pub fn index_jacobian(&self) -> Matrix3<f64> {
		match self.convention {
			CoordinateConvention::OriginAxis => geometry::axis_matrix(&self.axes),
			CoordinateConvention::CellNormalized => {
				let [nx, ny, nz] = self.dims;
				let [a0, a1, a2] = self.axes;
				geometry::axis_matrix(&[a0 / nx as f64, a1 / ny as f64, a2 / nz as f64])
			}
		}
	}

	fn shifted_index(&self, i: f64, j: f64, k: f64) -> Vector3<f64> {
		match self.convention {
			CoordinateConvention::OriginAxis => Vector3::new(i, j, k),
			CoordinateConvention::CellNormalized => Vector3::new(i - 1.0, j - 1.0, k - 1.0),
		}
	}

	/// Rebuild with new samples/dims/axes, keeping origin and convention.
	pub(crate) fn with_lattice(
		&self,
		dims: [usize; 3],
		samples: Vec<f64>,
		axes: [Vector3<f64>; 3],
	) -> GridResult<Self> {
		Self::new(dims, samples, self.origin, axes, self.convention)
	}
}

impl PartialEq for GridField {
	fn eq(&self, other: &Self) -> bool {
		self.dims == other.dims
			&& self.convention == other.convention
			&& self.origin == other.origin
			&& self.axes == other.axes
			&& self.samples == other.samples
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn unit_axes() -> [Vector3<f64>; 3] {
		[Vector3::x(), Vector3::y(), Vector3::z()]
	}

	fn ramp(dims: [usize; 3]) -> Vec<f64> {
		(0..dims[0] * dims[1] * dims[2]).map(|n| n as f64).collect()
	}

	#[test]
	fn rejects_wrong_sample_count() {
		let err = GridField::origin_axis([2, 2, 2], vec![0.0; 7], Point3::origin(), unit_axes()).unwrap_err();
		assert!(matches!(err, GridError::InvalidGrid(msg) if msg.contains("7 samples")));
	}

	#[test]
	fn rejects_thin_dimension() {
		let err = GridField::origin_axis([2, 1, 2], vec![0.0; 4], Point3::origin(), unit_axes()).unwrap_err();
		assert!(matches!(err, GridError::InvalidGrid(_)));
	}

	#[test]
	fn rejects_coplanar_axes() {
		let axes = [Vector3::x(), Vector3::y(), Vector3::new(1.0, 1.0, 0.0)];
		let err = GridField::origin_axis([2, 2, 2], vec![0.0; 8], Point3::origin(), axes).unwrap_err();
		assert!(matches!(err, GridError::InvalidGrid(msg) if msg.contains("coplanar")));
	}

	#[test]
	fn rejects_non_finite_samples() {
		let mut samples = vec![0.0; 8];
		samples[3] = f64::NAN;
		assert!(GridField::origin_axis([2, 2, 2], samples, Point3::origin(), unit_axes()).is_err());
	}

	#[test]
	fn samples_are_x_major() {
		let field = GridField::origin_axis([2, 3, 4], ramp([2, 3, 4]), Point3::origin(), unit_axes()).unwrap();
		assert_eq!(field.sample_at(0, 0, 1).unwrap(), 1.0);
		assert_eq!(field.sample_at(0, 1, 0).unwrap(), 4.0);
		assert_eq!(field.sample_at(1, 0, 0).unwrap(), 12.0);
		assert_eq!(field.sample_at(1, 2, 3).unwrap(), 23.0);
	}

	#[test]
	fn out_of_range_access_fails() {
		let field = GridField::origin_axis([2, 3, 4], ramp([2, 3, 4]), Point3::origin(), unit_axes()).unwrap();
		let err = field.sample_at(0, 3, 0).unwrap_err();
		assert_eq!(err, GridError::IndexOutOfRange { i: 0, j: 3, k: 0, dims: [2, 3, 4] });
	}

	#[test]
	fn value_range_is_cached_scan() {
		let mut samples = ramp([3, 3, 3]);
		samples[5] = -4.5;
		let field = GridField::origin_axis([3, 3, 3], samples, Point3::origin(), unit_axes()).unwrap();
		assert_eq!(field.max_value(), 26.0);
		assert_eq!(field.min_value(), -4.5);
		assert_eq!(field.value_range(), (-4.5, 26.0));
	}

	#[test]
	fn origin_axis_maps_fractional_indices() {
		let axes = [Vector3::new(0.5, 0.0, 0.0), Vector3::new(0.0, 0.25, 0.0), Vector3::new(0.1, 0.0, 2.0)];
		let field = GridField::origin_axis([3, 3, 3], vec![0.0; 27], Point3::new(1.0, 2.0, 3.0), axes).unwrap();
		let p = field.to_world(2.0, 0.5, 1.5);
		assert_abs_diff_eq!(p.x, 1.0 + 1.0 + 0.15, epsilon = 1e-12);
		assert_abs_diff_eq!(p.y, 2.0 + 0.125, epsilon = 1e-12);
		assert_abs_diff_eq!(p.z, 3.0 + 3.0, epsilon = 1e-12);
	}

	#[test]
	fn cell_normalized_spans_one_cell_from_index_one() {
		let cell = [Vector3::new(4.0, 0.0, 0.0), Vector3::new(0.0, 4.0, 0.0), Vector3::new(0.0, 0.0, 4.0)];
		let field = GridField::cell_normalized([4, 4, 4], vec![0.0; 64], cell).unwrap();
		assert_eq!(field.to_world(1.0, 1.0, 1.0), Point3::origin());
		let p = field.to_world(0.0, 5.0, 3.0);
		assert_abs_diff_eq!(p.x, -1.0, epsilon = 1e-12);
		assert_abs_diff_eq!(p.y, 4.0, epsilon = 1e-12);
		assert_abs_diff_eq!(p.z, 2.0, epsilon = 1e-12);
	}

	#[test]
	fn equality_ignores_cached_range() {
		let a = GridField::origin_axis([2, 2, 2], ramp([2, 2, 2]), Point3::origin(), unit_axes()).unwrap();
		let b = a.clone();
		let _ = a.max_value();
		assert_eq!(a, b);
	}
}
