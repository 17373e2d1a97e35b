pub mod density_grid {
	pub mod error;
	pub mod info;
	pub mod geometry;
	pub mod grid;
	pub mod utils;
	pub mod manip;
	pub mod resample;
	pub mod tables;
	pub mod mesh;
	pub mod marching;
	pub mod orient;
	pub mod surface_area;
	pub mod wavefunction;
	pub mod atoms;
	pub mod format;
	pub mod cube;
	pub mod chgcar;
	pub mod mrc_output;
	pub mod obj_output;
}

pub use density_grid::error::{GridError, ReadError};
pub use density_grid::grid::{CoordinateConvention, GridField};
pub use density_grid::marching::{extract, Enclosure, ExtractOptions, IsosurfaceExtractor, Isovalue};
pub use density_grid::mesh::Mesh;
pub use density_grid::resample::resample;
pub use density_grid::wavefunction::extract_lobes;
