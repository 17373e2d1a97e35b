use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::density_grid::mesh::Mesh;

/// Write named meshes as separate objects of one Wavefront OBJ stream.
pub fn write_obj_to<W: Write>(writer: &mut W, meshes: &[(&str, &Mesh)]) -> std::io::Result<()> {
	writeln!(writer, "# {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
	let mut offset = 1usize;
	for (name, mesh) in meshes {
		writeln!(writer, "o {}", name)?;
		for v in &mesh.vertices {
			writeln!(writer, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
		}
		for [a, b, c] in &mesh.triangles {
			writeln!(
				writer,
				"f {} {} {}",
				*a as usize + offset,
				*b as usize + offset,
				*c as usize + offset
			)?;
		}
		offset += mesh.vertex_count();
	}
	Ok(())
}

/// Save meshes to an OBJ file.
pub fn write_obj(path: &Path, meshes: &[(&str, &Mesh)]) -> std::io::Result<()> {
	let mut file = BufWriter::new(File::create(path)?);
	write_obj_to(&mut file, meshes)?;
	file.flush()
}
