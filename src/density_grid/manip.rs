use crate::density_grid::error::{GridError, GridResult};
use crate::density_grid::grid::{CoordinateConvention, GridField};
use crate::density_grid::utils::{checked_sample_count, linear_index};

impl GridField {
	/// Repeat the sample block `counts[a]` times along each axis (periodic supercell).
	///
	/// Cell-normalized lattices grow with the supercell; per-step origin+axis lattices
	/// keep their step vectors. A count of 1 leaves that axis unchanged.
	pub fn tile(&self, counts: [usize; 3]) -> GridResult<GridField> {
		if let Some(axis) = counts.iter().position(|&c| c == 0) {
			return Err(GridError::InvalidGrid(format!(
				"repetition count along axis {} must be at least 1",
				axis
			)));
		}
		if counts == [1, 1, 1] {
			return Ok(self.clone());
		}

		let dims = self.dims();
		let mut new_dims = dims;
		for axis in 0..3 {
			new_dims[axis] = dims[axis].checked_mul(counts[axis]).ok_or_else(|| {
				GridError::InvalidGrid(format!("{} repetitions of axis {} overflow", counts[axis], axis))
			})?;
		}
		let total = checked_sample_count(new_dims)
			.ok_or_else(|| GridError::InvalidGrid(format!("tiled dimensions {:?} are too large", new_dims)))?;
		let src = self.samples();
		let mut samples = Vec::with_capacity(total);
		for i in 0..new_dims[0] {
			for j in 0..new_dims[1] {
				// Rows along k are contiguous in both grids; copy whole rows.
				let start = linear_index(dims, i % dims[0], j % dims[1], 0);
				let row = &src[start..start + dims[2]];
				for _ in 0..counts[2] {
					samples.extend_from_slice(row);
				}
			}
		}

		let axes = match self.convention() {
			CoordinateConvention::CellNormalized => {
				let [a0, a1, a2] = *self.axes();
				[a0 * counts[0] as f64, a1 * counts[1] as f64, a2 * counts[2] as f64]
			}
			CoordinateConvention::OriginAxis => *self.axes(),
		};
		tracing::info!(?counts, ?new_dims, "tiled density grid");
		self.with_lattice(new_dims, samples, axes)
	}
}
