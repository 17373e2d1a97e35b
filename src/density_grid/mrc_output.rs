use std::fs::File;
use std::io::{BufWriter, Result, Write};
use std::path::Path;
use std::time::Instant;

use nalgebra::Vector3;

use crate::density_grid::geometry::{cell_angles, cell_lengths};
use crate::density_grid::grid::GridField;

/// Size of the fixed MRC2014 header in bytes.
pub const HEADER_BYTES: usize = 1024;

/// MRC2014 header for a float32 (mode 2) map.
#[derive(Debug, Clone, PartialEq)]
pub struct MrcHeader {
	dims: [i32; 3],
	mode: i32,
	start: [i32; 3],
	sampling: [i32; 3],
	cell_lengths: [f32; 3],
	cell_angles: [f32; 3],
	axis_map: [i32; 3],
	amin: f32,
	amax: f32,
	amean: f32,
	ispg: i32,
	nsymbt: i32,
	extra: [i32; 25],
	origin: [f32; 3],
	map: [u8; 4],
	machine_stamp: [u8; 4],
	rms: f32,
	labels: Vec<String>,
}

impl MrcHeader {
	/// Header describing `field`, including its value statistics.
	pub fn for_field(field: &GridField) -> Self {
		let dims = field.dims();
		let jacobian = field.index_jacobian();
		let cell: [Vector3<f64>; 3] =
			[0, 1, 2].map(|a| jacobian.column(a).into_owned() * dims[a] as f64);
		let (amin, amax) = field.value_range();
		let count = field.samples().len() as f64;
		let mean = field.samples().iter().sum::<f64>() / count;
		let variance = field.samples().iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
		let origin = field.to_world(0.0, 0.0, 0.0);

		MrcHeader {
			dims: dims.map(|n| n as i32),
			mode: 2,
			start: [0; 3],
			sampling: dims.map(|n| n as i32),
			cell_lengths: cell_lengths(&cell).map(|l| l as f32),
			cell_angles: cell_angles(&cell).map(|a| a as f32),
			axis_map: [1, 2, 3],
			amin: amin as f32,
			amax: amax as f32,
			amean: mean as f32,
			ispg: 1,
			nsymbt: 0,
			extra: [0; 25],
			origin: [origin.x as f32, origin.y as f32, origin.z as f32],
			map: *b"MAP ",
			// Little-endian IEEE floats.
			machine_stamp: [0x44, 0x44, 0, 0],
			rms: variance.sqrt() as f32,
			labels: vec![format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))],
		}
	}

	/// Serialise to the 1024-byte little-endian layout.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(HEADER_BYTES);
		put_i32(&mut out, &self.dims);
		put_i32(&mut out, &[self.mode]);
		put_i32(&mut out, &self.start);
		put_i32(&mut out, &self.sampling);
		put_f32(&mut out, &self.cell_lengths);
		put_f32(&mut out, &self.cell_angles);
		put_i32(&mut out, &self.axis_map);
		put_f32(&mut out, &[self.amin, self.amax, self.amean]);
		put_i32(&mut out, &[self.ispg, self.nsymbt]);
		put_i32(&mut out, &self.extra);
		put_f32(&mut out, &self.origin);
		out.extend_from_slice(&self.map);
		out.extend_from_slice(&self.machine_stamp);
		put_f32(&mut out, &[self.rms]);
		put_i32(&mut out, &[self.labels.len().min(10) as i32]);
		for n in 0..10 {
			let mut label = [0u8; 80];
			if let Some(text) = self.labels.get(n) {
				label = [b' '; 80];
				let bytes = text.as_bytes();
				let len = bytes.len().min(80);
				label[..len].copy_from_slice(&bytes[..len]);
			}
			out.extend_from_slice(&label);
		}
		out
	}
}

fn put_i32(out: &mut Vec<u8>, values: &[i32]) {
	for v in values {
		out.extend_from_slice(&v.to_le_bytes());
	}
}

fn put_f32(out: &mut Vec<u8>, values: &[f32]) {
	for v in values {
		out.extend_from_slice(&v.to_le_bytes());
	}
}

/// Write header and float32 samples (x fastest) to any writer.
pub fn write_mrc_to<W: Write>(field: &GridField, writer: &mut W) -> Result<()> {
	writer.write_all(&MrcHeader::for_field(field).to_bytes())?;
	let [nx, ny, nz] = field.dims();
	let samples = field.samples();
	let mut row = Vec::with_capacity(nx * 4);
	for k in 0..nz {
		for j in 0..ny {
			row.clear();
			for i in 0..nx {
				let value = samples[field.ijk_to_index(i, j, k)] as f32;
				row.extend_from_slice(&value.to_le_bytes());
			}
			writer.write_all(&row)?;
		}
	}
	Ok(())
}

/// Save the density field as an MRC map.
pub fn write_mrc(field: &GridField, path: &Path) -> Result<()> {
	let start_time = Instant::now();
	let mut file = BufWriter::new(File::create(path)?);
	write_mrc_to(field, &mut file)?;
	file.flush()?;
	tracing::info!(
		path = %path.display(),
		seconds = start_time.elapsed().as_secs_f64(),
		"MRC file saved"
	);
	Ok(())
}
