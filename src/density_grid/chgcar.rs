//! VASP CHGCAR / PARCHG reader.
//!
//! The file starts with a POSCAR block (comment, scale, lattice, species, counts,
//! coordinates), then a blank line, the grid dimensions and `nx*ny*nz` values with
//! x running fastest. VASP stores density times cell volume; values are divided by
//! the volume on read. Augmentation and spin blocks after the first grid are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::density_grid::atoms::{atomic_number, AtomRegistry};
use crate::density_grid::error::ReadError;
use crate::density_grid::format::{checked_count, parse_float, parse_token, DensityFile, LineReader};
use crate::density_grid::geometry::lattice_determinant;
use crate::density_grid::grid::GridField;
use crate::density_grid::utils::linear_index;

pub fn read_chgcar_path(path: &Path) -> Result<DensityFile, ReadError> {
	let file = File::open(path)?;
	read_chgcar(BufReader::new(file))
}

pub fn read_chgcar<R: BufRead>(reader: R) -> Result<DensityFile, ReadError> {
	let mut lines = LineReader::new(reader);
	let title = lines.require_line("comment line")?.trim().to_string();

	let scale_line = lines.require_line("scale factor")?;
	let scale = parse_float(scale_line.split_whitespace().next().unwrap_or(""), lines.line(), "scale factor")?;

	let mut lattice = [Vector3::zeros(); 3];
	for row in lattice.iter_mut() {
		let text = lines.require_line("lattice vector")?;
		let line = lines.line();
		let mut tokens = text.split_whitespace();
		for c in 0..3 {
			row[c] = parse_float(tokens.next().unwrap_or(""), line, "lattice vector")?;
		}
	}
	// A negative scale is the target cell volume.
	let factor = if scale < 0.0 {
		let raw_volume = lattice_determinant(&lattice).abs();
		if raw_volume == 0.0 {
			return Err(ReadError::format(lines.line(), "lattice has zero volume"));
		}
		(-scale / raw_volume).cbrt()
	} else {
		scale
	};
	let lattice = lattice.map(|row| row * factor);

	let mut text = lines.require_line("species or counts")?;
	let mut symbols: Option<Vec<String>> = None;
	let first_is_count = text
		.split_whitespace()
		.next()
		.is_some_and(|t| t.parse::<usize>().is_ok());
	if !first_is_count {
		symbols = Some(text.split_whitespace().map(str::to_string).collect());
		text = lines.require_line("species counts")?;
	}
	let line = lines.line();
	let counts = text
		.split_whitespace()
		.map(|t| parse_token::<usize>(Some(t), line, "species count"))
		.collect::<Result<Vec<_>, _>>()?;
	let symbols = species_symbols(symbols, &title, counts.len());

	let mut mode = lines.require_line("coordinate mode")?;
	if mode.trim_start().starts_with(['S', 's']) {
		mode = lines.require_line("coordinate mode")?;
	}
	let cartesian = mode.trim_start().starts_with(['C', 'c', 'K', 'k']);

	let mut atoms = AtomRegistry::new();
	for (symbol, &count) in symbols.iter().zip(&counts) {
		for _ in 0..count {
			let text = lines.require_line("atom position")?;
			let line = lines.line();
			let mut tokens = text.split_whitespace();
			let mut v = Vector3::zeros();
			for c in 0..3 {
				v[c] = parse_float(tokens.next().unwrap_or(""), line, "atom position")?;
			}
			let position = if cartesian {
				v * factor
			} else {
				lattice[0] * v.x + lattice[1] * v.y + lattice[2] * v.z
			};
			atoms.push(symbol.as_str(), Point3::from(position));
		}
	}

	let grid_line = lines.require_content("grid dimensions")?;
	let line = lines.line();
	let mut tokens = grid_line.split_whitespace();
	let mut dims = [0usize; 3];
	for d in dims.iter_mut() {
		*d = parse_token(tokens.next(), line, "grid dimension")?;
	}
	let [nx, ny, nz] = dims;
	let total = checked_count(&dims, line, "grid size")?;
	let values = lines.read_values(total, "density value")?;

	let volume = lattice_determinant(&lattice).abs();
	if volume == 0.0 {
		return Err(ReadError::format(line, "lattice has zero volume"));
	}
	// File order is x fastest; reorder to x-major.
	let mut samples = vec![0.0; values.len()];
	for z in 0..nz {
		for y in 0..ny {
			for x in 0..nx {
				samples[linear_index(dims, x, y, z)] = values[x + nx * (y + ny * z)] / volume;
			}
		}
	}

	let field = GridField::cell_normalized(dims, samples, lattice)?;
	tracing::debug!(?dims, atoms = atoms.len(), volume, "read CHGCAR file");
	Ok(DensityFile { title, field, atoms })
}

/// Species names: the explicit symbol line, else element names on the comment line.
fn species_symbols(explicit: Option<Vec<String>>, title: &str, species: usize) -> Vec<String> {
	if let Some(symbols) = explicit {
		if symbols.len() == species {
			return symbols;
		}
		tracing::warn!(found = symbols.len(), species, "species line does not match counts");
	}
	let from_title: Vec<String> = title
		.split_whitespace()
		.take(species)
		.map(str::to_string)
		.collect();
	if from_title.len() == species && from_title.iter().all(|s| atomic_number(s).is_some()) {
		return from_title;
	}
	vec!["X".to_string(); species]
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	const HEADER: &str = "Si2 test\n1.0\n2.0 0.0 0.0\n0.0 2.0 0.0\n0.0 0.0 2.0\nSi\n2\nDirect\n0.0 0.0 0.0\n0.5 0.5 0.5\n\n";

	fn grid_values() -> String {
		// Value n at file position n: x fastest.
		let values: Vec<String> = (0..24).map(|n| format!("{:.1}", n as f64 * 8.0)).collect();
		format!("2 3 4\n{}\naugmentation occupancies 1 2\n0.1 0.2\n", values.join(" "))
	}

	#[test]
	fn reorders_and_normalises_by_volume() {
		let text = format!("{HEADER}{}", grid_values());
		let file = read_chgcar(text.as_bytes()).unwrap();
		let field = &file.field;
		assert_eq!(field.dims(), [2, 3, 4]);
		// File index x + 2 * (y + 3 * z) with value 8n over a volume of 8.
		assert_eq!(field.sample_at(1, 0, 0).unwrap(), 1.0);
		assert_eq!(field.sample_at(0, 1, 0).unwrap(), 2.0);
		assert_eq!(field.sample_at(0, 0, 1).unwrap(), 6.0);
		assert_eq!(field.sample_at(1, 2, 3).unwrap(), 23.0);
		assert_eq!(file.atoms.len(), 2);
		assert_eq!(file.atoms.atoms()[1].position, Point3::new(1.0, 1.0, 1.0));
		assert_eq!(file.atoms.atoms()[1].symbol, "Si");
	}

	#[test]
	fn negative_scale_is_target_volume() {
		let header = HEADER.replace("\n1.0\n", "\n-64.0\n");
		let text = format!("{header}{}", grid_values());
		let file = read_chgcar(text.as_bytes()).unwrap();
		assert_relative_eq!(file.field.axes()[0].x, 4.0, epsilon = 1e-12);
		assert_relative_eq!(file.atoms.atoms()[1].position.z, 2.0, epsilon = 1e-12);
	}

	#[test]
	fn vasp4_headers_take_symbols_from_the_comment() {
		let header = HEADER
			.replace("Si2 test", "Si bulk")
			.replace("Si\n2\nDirect", "2\nSelective dynamics\nCartesian");
		let text = format!("{header}{}", grid_values());
		let file = read_chgcar(text.as_bytes()).unwrap();
		assert_eq!(file.atoms.atoms()[0].symbol, "Si");
		assert_eq!(file.atoms.atoms()[1].position, Point3::new(0.5, 0.5, 0.5));
	}

	#[test]
	fn index_one_sits_on_the_cell_origin() {
		let text = format!("{HEADER}{}", grid_values());
		let field = read_chgcar(text.as_bytes()).unwrap().field;
		assert_eq!(field.to_world(1.0, 1.0, 1.0), Point3::origin());
	}

	#[test]
	fn oversized_grid_line_is_a_format_error() {
		let text = format!("{HEADER}3000000 3000000 3000000\n1.0 2.0\n");
		let err = read_chgcar(text.as_bytes()).unwrap_err();
		assert!(matches!(err, ReadError::Format { line: 12, .. }), "{err}");
	}
}
