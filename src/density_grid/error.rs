//! Error types for grid construction, resampling, extraction and file reading.

use thiserror::Error;

/// Result type for grid and extraction operations.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised by the density grid core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
	/// Sample count, dimensions or lattice axes are unusable.
	#[error("invalid grid: {0}")]
	InvalidGrid(String),

	/// Integer grid access outside `[0, dim)` on some axis.
	#[error("index ({i}, {j}, {k}) out of range for grid dimensions {dims:?}")]
	IndexOutOfRange {
		i: usize,
		j: usize,
		k: usize,
		dims: [usize; 3],
	},

	/// The grid is too coarse along `axis` for quintic interpolation.
	#[error("axis {axis} has {len} samples, quintic interpolation needs at least {required}")]
	InsufficientSamples {
		axis: usize,
		len: usize,
		required: usize,
	},

	/// The isovalue does not lie strictly between the field's minimum and maximum.
	#[error("isovalue {level} outside the open field range ({min}, {max})")]
	DegenerateIsovalue { level: f64, min: f64, max: f64 },
}

/// Errors raised while reading a density file.
#[derive(Debug, Error)]
pub enum ReadError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Malformed content; `line` is 1-based, 0 when the position is unknown.
	#[error("line {line}: {message}")]
	Format { line: usize, message: String },

	#[error(transparent)]
	Grid(#[from] GridError),
}

impl ReadError {
	pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
		ReadError::Format {
			line,
			message: message.into(),
		}
	}
}
