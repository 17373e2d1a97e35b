//! Gaussian cube reader.
//!
//! Layout: two comment lines, `natoms ox oy oz [nval]`, three `n ax ay az` voxel-axis
//! lines, `|natoms|` atom lines `Z charge x y z`, an optional dataset-id record (when
//! `natoms` is negative), then the values with the first axis outermost and the
//! dataset index fastest. A negative voxel count means the axis is given in Ångström,
//! otherwise in Bohr.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use nalgebra::{Point3, Vector3};

use crate::density_grid::atoms::{element_symbol, AtomRegistry};
use crate::density_grid::error::ReadError;
use crate::density_grid::format::{checked_count, is_gzipped, parse_float, parse_token, DensityFile, LineReader};
use crate::density_grid::geometry::BOHR_TO_ANGSTROM;
use crate::density_grid::grid::GridField;

/// Read a cube file from disk, decompressing `.gz` files on the fly.
pub fn read_cube_path(path: &Path, dataset: usize) -> Result<DensityFile, ReadError> {
	let file = File::open(path)?;
	if is_gzipped(path) {
		read_cube(BufReader::new(GzDecoder::new(file)), dataset)
	} else {
		read_cube(BufReader::new(file), dataset)
	}
}

/// Parse a cube stream, keeping dataset `dataset` (0-based) of multi-valued files.
pub fn read_cube<R: BufRead>(reader: R, dataset: usize) -> Result<DensityFile, ReadError> {
	let mut lines = LineReader::new(reader);
	let title = lines.require_line("title line")?.trim().to_string();
	lines.require_line("comment line")?;

	let header = lines.require_line("atom count and origin")?;
	let line = lines.line();
	let mut tokens = header.split_whitespace();
	let natoms: i64 = parse_token(tokens.next(), line, "atom count")?;
	let mut origin = [0.0; 3];
	for value in origin.iter_mut() {
		*value = parse_float(tokens.next().unwrap_or(""), line, "origin")?;
	}
	let nval: usize = match tokens.next() {
		Some(token) => parse_token(Some(token), line, "value count")?,
		None => 1,
	};

	let mut dims = [0usize; 3];
	let mut axes = [Vector3::zeros(); 3];
	let mut units = [BOHR_TO_ANGSTROM; 3];
	for axis in 0..3 {
		let text = lines.require_line("voxel axis")?;
		let line = lines.line();
		let mut tokens = text.split_whitespace();
		let count: i64 = parse_token(tokens.next(), line, "voxel count")?;
		if count < 0 {
			units[axis] = 1.0;
		}
		dims[axis] = count.unsigned_abs() as usize;
		for c in 0..3 {
			axes[axis][c] = parse_float(tokens.next().unwrap_or(""), line, "voxel axis")? * units[axis];
		}
	}
	let length_unit = units[0];
	let origin = Point3::from(Vector3::from(origin) * length_unit);

	let mut atoms = AtomRegistry::new();
	for _ in 0..natoms.unsigned_abs() {
		let text = lines.require_line("atom record")?;
		let line = lines.line();
		let mut tokens = text.split_whitespace();
		let number: usize = parse_token(tokens.next(), line, "atomic number")?;
		tokens.next();
		let mut position = Vector3::zeros();
		for c in 0..3 {
			position[c] = parse_float(tokens.next().unwrap_or(""), line, "atom position")? * length_unit;
		}
		let symbol = element_symbol(number).unwrap_or("X");
		atoms.push(symbol, Point3::from(position));
	}

	let declared = if natoms < 0 {
		// Dataset record: `m id1 .. idm`, possibly wrapped over several lines.
		let text = lines.require_line("dataset ids")?;
		let mut tokens = text.split_whitespace();
		let count: usize = parse_token(tokens.next(), lines.line(), "dataset count")?;
		let mut seen = tokens.count();
		while seen < count {
			seen += lines.require_line("dataset ids")?.split_whitespace().count();
		}
		count
	} else {
		nval
	};
	let nval = declared.max(1);
	if dataset >= nval {
		return Err(ReadError::format(
			lines.line(),
			format!("dataset {} requested, file holds {}", dataset, nval),
		));
	}

	let total = checked_count(&[dims[0], dims[1], dims[2], nval], lines.line(), "grid size")?;
	let values = lines.read_values(total, "volumetric data")?;
	let samples: Vec<f64> = values.iter().skip(dataset).step_by(nval).copied().collect();

	let field = GridField::origin_axis(dims, samples, origin, axes)?;
	tracing::debug!(?dims, atoms = atoms.len(), nval, "read cube file");
	Ok(DensityFile { title, field, atoms })
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	fn cube_text(natoms: &str, counts: [i64; 3], values: &str) -> String {
		format!(
			"title\ncomment\n{natoms}  0.0 0.0 0.0\n{} 0.5 0.0 0.0\n{} 0.0 0.5 0.0\n{} 0.0 0.0 0.5\n 8 8.0 1.0 0.0 0.0\n{values}\n",
			counts[0], counts[1], counts[2]
		)
	}

	#[test]
	fn bohr_axes_are_converted() {
		let values = (0..8).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
		let file = read_cube(cube_text("1", [2, 2, 2], &values).as_bytes(), 0).unwrap();
		assert_eq!(file.title, "title");
		assert_eq!(file.field.dims(), [2, 2, 2]);
		assert_relative_eq!(file.field.axes()[0].x, 0.5 * BOHR_TO_ANGSTROM);
		assert_eq!(file.field.sample_at(1, 0, 1).unwrap(), 5.0);
		let oxygen = &file.atoms.atoms()[0];
		assert_eq!(oxygen.symbol, "O");
		assert_relative_eq!(oxygen.position.x, BOHR_TO_ANGSTROM);
	}

	#[test]
	fn negative_counts_mean_angstrom() {
		let values = vec!["1.0"; 8].join(" ");
		let file = read_cube(cube_text("1", [-2, -2, -2], &values).as_bytes(), 0).unwrap();
		assert_eq!(file.field.axes()[2].z, 0.5);
		assert_eq!(file.atoms.atoms()[0].position.x, 1.0);
	}

	#[test]
	fn dataset_ids_and_interleaved_values() {
		// Two orbitals, values interleaved per point.
		let values = (0..16).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
		let body = format!("2 10 11\n{values}");
		let text = cube_text("-1", [2, 2, 2], &body);
		let second = read_cube(text.as_bytes(), 1).unwrap();
		assert_eq!(second.field.samples(), &[1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0]);
		assert!(matches!(read_cube(text.as_bytes(), 2), Err(ReadError::Format { .. })));
	}

	#[test]
	fn truncated_data_is_an_error() {
		let err = read_cube(cube_text("1", [2, 2, 2], "1 2 3").as_bytes(), 0).unwrap_err();
		assert!(err.to_string().contains("volumetric data"));
	}

	#[test]
	fn oversized_header_is_a_format_error() {
		let huge = 3_000_000;
		let err = read_cube(cube_text("1", [huge, huge, huge], "1 2 3").as_bytes(), 0).unwrap_err();
		assert!(matches!(err, ReadError::Format { .. }), "{err}");
		assert!(err.to_string().contains("too large"));

		// Fits in memory arithmetic but not in the file.
		let err = read_cube(cube_text("1", [100_000, 100_000, 100], "1 2 3").as_bytes(), 0).unwrap_err();
		assert!(err.to_string().contains("volumetric data"));
	}
}
