use std::mem::size_of;

use crate::density_grid::grid::GridField;

/// Format large numbers with KB, MB, GB, TB suffixes
pub fn format_bytes(bytes: usize) -> String {
	const KB: usize = 1024;
	const MB: usize = KB * 1024;
	const GB: usize = MB * 1024;
	const TB: usize = GB * 1024;

	if bytes >= TB {
		format!("{:.2} TB", bytes as f64 / TB as f64)
	} else if bytes >= GB {
		format!("{:.2} GB", bytes as f64 / GB as f64)
	} else if bytes >= MB {
		format!("{:.2} MB", bytes as f64 / MB as f64)
	} else if bytes >= KB {
		format!("{:.2} KB", bytes as f64 / KB as f64)
	} else {
		format!("{} bytes", bytes)
	}
}

/// `(min, max)` of a slice; `(inf, -inf)` when empty
pub fn min_max(values: &[f64]) -> (f64, f64) {
	values
		.iter()
		.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Linear index of `(i, j, k)` in an x-major grid of the given dimensions
#[inline]
pub fn linear_index(dims: [usize; 3], i: usize, j: usize, k: usize) -> usize {
	(i * dims[1] + j) * dims[2] + k
}

/// Number of samples in a grid of `dims`, or `None` when the `f64` buffer could not be addressed
pub fn checked_sample_count(dims: [usize; 3]) -> Option<usize> {
	let total = dims.iter().try_fold(1usize, |total, &n| total.checked_mul(n))?;
	let bytes = total.checked_mul(size_of::<f64>())?;
	(bytes <= isize::MAX as usize).then_some(total)
}

impl GridField {
	/// Log memory usage of the sample buffer
	pub fn report_memory(&self) {
		let struct_overhead = size_of::<Self>();
		let sample_bytes = self.samples().len() * size_of::<f64>();
		let [nx, ny, nz] = self.dims();
		tracing::info!(
			dims = %format!("{} x {} x {}", nx, ny, nz),
			samples = self.samples().len(),
			convention = ?self.convention(),
			overhead = %format_bytes(struct_overhead),
			storage = %format_bytes(sample_bytes),
			total = %format_bytes(struct_overhead + sample_bytes),
			"grid memory"
		);
	}

	/// Convert (i, j, k) to a linear index
	#[inline]
	pub fn ijk_to_index(&self, i: usize, j: usize, k: usize) -> usize {
		linear_index(self.dims(), i, j, k)
	}

	/// Convert a linear index back to (i, j, k)
	#[inline]
	pub fn index_to_ijk(&self, index: usize) -> (usize, usize, usize) {
		let [_, ny, nz] = self.dims();
		let i = index / (ny * nz);
		let j = (index / nz) % ny;
		let k = index % nz;
		(i, j, k)
	}

	/// Number of samples strictly above `level`
	pub fn count_above(&self, level: f64) -> usize {
		self.samples().iter().filter(|&&v| v > level).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nalgebra::{Point3, Vector3};

	#[test]
	fn bytes_are_humanised() {
		assert_eq!(format_bytes(512), "512 bytes");
		assert_eq!(format_bytes(2048), "2.00 KB");
		assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
	}

	#[test]
	fn index_round_trip() {
		let field = GridField::origin_axis(
			[3, 4, 5],
			vec![0.0; 60],
			Point3::origin(),
			[Vector3::x(), Vector3::y(), Vector3::z()],
		)
		.unwrap();
		for index in [0, 1, 7, 19, 20, 59] {
			let (i, j, k) = field.index_to_ijk(index);
			assert_eq!(field.ijk_to_index(i, j, k), index);
		}
		assert_eq!(field.index_to_ijk(21), (1, 0, 1));
	}

	#[test]
	fn min_max_of_empty_slice() {
		let (lo, hi) = min_max(&[]);
		assert!(lo > hi);
		assert_eq!(min_max(&[3.0, -1.0, 2.0]), (-1.0, 3.0));
	}
}
