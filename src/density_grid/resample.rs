//! Supersampling of a density grid with separable quintic B-spline interpolation.
//!
//! The input samples are treated as nodes of an interpolating degree-5 spline on a
//! normalised `[-1, 1]` span per axis (mirror boundary conditions). Coefficients are
//! obtained with the exact recursive prefilter, then the spline is evaluated on a
//! finer node set spanning the same interval. Because the output nodes form a tensor
//! grid, the 3D interpolation factors into three 1D passes, one per axis.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::density_grid::error::{GridError, GridResult};
use crate::density_grid::grid::{CoordinateConvention, GridField};
use crate::density_grid::utils::checked_sample_count;

/// Fewest samples per axis that still determine a quintic interpolant.
pub const QUINTIC_MIN_SAMPLES: usize = 6;

/// Poles of the degree-5 B-spline prefilter.
const POLES: [f64; 2] = [-0.430_575_347_099_973_7, -0.043_096_288_203_264_65];

/// Truncation tolerance for the causal initialisation sum.
const TOLERANCE: f64 = 1e-14;

/// Interpolate `field` onto a grid `floor(dim * scale)` samples long per axis.
///
/// `scale <= 1` returns the field unchanged. Any axis shorter than
/// [`QUINTIC_MIN_SAMPLES`] fails with `InsufficientSamples`; there is no lower-order
/// fallback. Per-step origin+axis lattices have their axes divided by `scale`;
/// cell-normalized lattices keep their cell vectors, which already span the grid.
pub fn resample(field: &GridField, scale: f64) -> GridResult<GridField> {
	if scale.is_nan() || scale.is_infinite() {
		return Err(GridError::InvalidGrid(format!("resample scale {} is not finite", scale)));
	}
	if scale <= 1.0 {
		return Ok(field.clone());
	}
	let dims = field.dims();
	if let Some(axis) = dims.iter().position(|&n| n < QUINTIC_MIN_SAMPLES) {
		return Err(GridError::InsufficientSamples {
			axis,
			len: dims[axis],
			required: QUINTIC_MIN_SAMPLES,
		});
	}
	let mut new_dims = dims;
	for axis in 0..3 {
		let len = (dims[axis] as f64 * scale).floor();
		if len >= usize::MAX as f64 {
			return Err(GridError::InvalidGrid(format!("scale {} overflows axis {}", scale, axis)));
		}
		new_dims[axis] = len as usize;
	}
	if checked_sample_count(new_dims).is_none() {
		return Err(GridError::InvalidGrid(format!(
			"resampled dimensions {:?} are too large",
			new_dims
		)));
	}

	let mut data = field.samples().to_vec();
	let mut current = dims;
	for axis in 0..3 {
		let (next, next_dims) = resample_axis(&data, current, axis, new_dims[axis]);
		data = next;
		current = next_dims;
	}

	let axes = match field.convention() {
		CoordinateConvention::OriginAxis => (*field.axes()).map(|a| a / scale),
		CoordinateConvention::CellNormalized => *field.axes(),
	};
	tracing::info!(?dims, ?new_dims, scale, "resampled density grid");
	field.with_lattice(new_dims, data, axes)
}

/// Resample every line along `axis` to `new_len` nodes.
fn resample_axis(data: &[f64], dims: [usize; 3], axis: usize, new_len: usize) -> (Vec<f64>, [usize; 3]) {
	let len = dims[axis];
	let outer: usize = dims[..axis].iter().product();
	let inner: usize = dims[axis + 1..].iter().product();
	let mut out_dims = dims;
	out_dims[axis] = new_len;

	let total_lines = outer * inner;
	let stencils = Arc::new(line_stencils(len, new_len));

	// Every output sample is written exactly once; f64 bits shared across workers.
	let backing: Arc<Vec<AtomicU64>> = Arc::new(
		(0..outer * new_len * inner)
			.map(|_| AtomicU64::new(0))
			.collect(),
	);

	let threads = thread::available_parallelism()
		.map(|n| n.get())
		.unwrap_or(1);
	let chunk = total_lines.div_ceil(threads).max(1);

	thread::scope(|scope| {
		for start in (0..total_lines).step_by(chunk) {
			let end = (start + chunk).min(total_lines);
			let out = Arc::clone(&backing);
			let stencils = Arc::clone(&stencils);
			scope.spawn(move || {
				let mut coeffs = vec![0.0f64; len];
				for line in start..end {
					let (o, n) = (line / inner, line % inner);
					let base_in = o * len * inner + n;
					for (p, c) in coeffs.iter_mut().enumerate() {
						*c = data[base_in + p * inner];
					}
					prefilter(&mut coeffs);

					let base_out = o * new_len * inner + n;
					for (q, stencil) in stencils.iter().enumerate() {
						let value = stencil.apply(&coeffs);
						out[base_out + q * inner].store(value.to_bits(), Ordering::Relaxed);
					}
				}
			});
		}
	});

	let resampled = backing
		.iter()
		.map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
		.collect();
	(resampled, out_dims)
}

/// Six coefficient indices and weights for one output node.
#[derive(Debug, Clone, Copy)]
struct Stencil {
	indices: [usize; 6],
	weights: [f64; 6],
}

impl Stencil {
	fn apply(&self, coeffs: &[f64]) -> f64 {
		self.indices
			.iter()
			.zip(self.weights.iter())
			.map(|(&i, &w)| coeffs[i] * w)
			.sum()
	}
}

/// Stencils for `new_len` nodes evenly spanning the same interval as `len` nodes.
fn line_stencils(len: usize, new_len: usize) -> Vec<Stencil> {
	(0..new_len)
		.map(|q| {
			let u = if new_len > 1 {
				q as f64 * (len - 1) as f64 / (new_len - 1) as f64
			} else {
				0.0
			};
			let first = u.floor() as isize - 2;
			let mut indices = [0usize; 6];
			let mut weights = [0.0f64; 6];
			for m in 0..6 {
				let node = first + m as isize;
				indices[m] = mirror_index(node, len);
				weights[m] = bspline5(u - node as f64);
			}
			Stencil { indices, weights }
		})
		.collect()
}

/// Fold an index into `[0, len)` by reflection about the end samples.
fn mirror_index(index: isize, len: usize) -> usize {
	if len == 1 {
		return 0;
	}
	let period = 2 * (len as isize - 1);
	let mut folded = index.rem_euclid(period);
	if folded >= len as isize {
		folded = period - folded;
	}
	folded as usize
}

/// Centred quintic B-spline basis function.
fn bspline5(x: f64) -> f64 {
	const BINOMIAL: [f64; 7] = [1.0, 6.0, 15.0, 20.0, 15.0, 6.0, 1.0];
	if x.abs() >= 3.0 {
		return 0.0;
	}
	let mut sum = 0.0;
	for (k, c) in BINOMIAL.iter().enumerate() {
		let t = x + 3.0 - k as f64;
		if t > 0.0 {
			let term = c * t.powi(5);
			if k % 2 == 0 {
				sum += term;
			} else {
				sum -= term;
			}
		}
	}
	sum / 120.0
}

/// Replace samples by interpolating B-spline coefficients, in place.
fn prefilter(c: &mut [f64]) {
	let n = c.len();
	if n < 2 {
		return;
	}
	let gain: f64 = POLES.iter().map(|&z| (1.0 - z) * (1.0 - 1.0 / z)).product();
	for v in c.iter_mut() {
		*v *= gain;
	}
	for &z in &POLES {
		c[0] = initial_causal(c, z);
		for k in 1..n {
			c[k] += z * c[k - 1];
		}
		c[n - 1] = initial_anticausal(c, z);
		for k in (0..n - 1).rev() {
			c[k] = z * (c[k + 1] - c[k]);
		}
	}
}

fn initial_causal(c: &[f64], z: f64) -> f64 {
	let n = c.len();
	let horizon = (TOLERANCE.ln() / z.abs().ln()).ceil() as usize;
	if horizon < n {
		let mut zn = z;
		let mut sum = c[0];
		for &v in &c[1..horizon] {
			sum += zn * v;
			zn *= z;
		}
		sum
	} else {
		let iz = 1.0 / z;
		let mut zn = z;
		let mut z2n = z.powi(n as i32 - 1);
		let mut sum = c[0] + z2n * c[n - 1];
		z2n *= z2n * iz;
		for &v in &c[1..n - 1] {
			sum += (zn + z2n) * v;
			zn *= z;
			z2n *= iz;
		}
		sum / (1.0 - zn * zn)
	}
}

fn initial_anticausal(c: &[f64], z: f64) -> f64 {
	let n = c.len();
	(z / (z * z - 1.0)) * (z * c[n - 2] + c[n - 1])
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	#[test]
	fn basis_partitions_unity() {
		for &x in &[0.0, 0.25, 0.5, 0.9] {
			let total: f64 = (-3..=3).map(|m| bspline5(x - m as f64)).sum();
			assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
		}
		assert_abs_diff_eq!(bspline5(0.0), 66.0 / 120.0, epsilon = 1e-15);
		assert_eq!(bspline5(3.0), 0.0);
	}

	#[test]
	fn mirror_reflects_about_end_samples() {
		assert_eq!(mirror_index(-1, 6), 1);
		assert_eq!(mirror_index(-2, 6), 2);
		assert_eq!(mirror_index(6, 6), 4);
		assert_eq!(mirror_index(7, 6), 3);
		assert_eq!(mirror_index(3, 6), 3);
	}

	#[test]
	fn prefilter_then_evaluate_reproduces_nodes() {
		for len in [6usize, 9, 40] {
			let samples: Vec<f64> = (0..len).map(|i| ((i * 7919) % 13) as f64 - 6.0).collect();
			let mut coeffs = samples.clone();
			prefilter(&mut coeffs);
			for (q, stencil) in line_stencils(len, len).iter().enumerate() {
				assert_abs_diff_eq!(stencil.apply(&coeffs), samples[q], epsilon = 1e-9);
			}
		}
	}

	#[test]
	fn line_resampling_tracks_smooth_function() {
		let len = 16;
		let f = |u: f64| (u * 0.4).sin() + 0.1 * u;
		let mut coeffs: Vec<f64> = (0..len).map(|i| f(i as f64)).collect();
		prefilter(&mut coeffs);
		let new_len = 31;
		for (q, stencil) in line_stencils(len, new_len).iter().enumerate().skip(8).take(15) {
			let u = q as f64 * (len - 1) as f64 / (new_len - 1) as f64;
			assert_abs_diff_eq!(stencil.apply(&coeffs), f(u), epsilon = 1e-2);
		}
	}
}
