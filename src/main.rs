use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use density_isosurface::density_grid::format::{detect_format, read_density, DensityFile, InputFormat};
use density_isosurface::density_grid::wavefunction::extract_lobes_with;
use density_isosurface::density_grid::{info, mrc_output, obj_output, surface_area};
use density_isosurface::{resample, ExtractOptions, IsosurfaceExtractor, Isovalue, Mesh};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
	Cube,
	Vasp,
}

impl From<FormatArg> for InputFormat {
	fn from(arg: FormatArg) -> Self {
		match arg {
			FormatArg::Cube => InputFormat::Cube,
			FormatArg::Vasp => InputFormat::Vasp,
		}
	}
}

#[derive(Parser, Debug)]
#[command(name = "density_isosurface", version)]
#[command(about = "Extract isosurface meshes from cube and CHGCAR density grids")]
struct Args {
	/// Density file (Gaussian cube, optionally gzipped, or VASP CHGCAR/PARCHG)
	input: PathBuf,

	/// Input format; guessed from the file name when omitted
	#[arg(long, value_enum)]
	format: Option<FormatArg>,

	/// Absolute isovalue
	#[arg(long, conflicts_with = "fraction")]
	level: Option<f64>,

	/// Isovalue as a fraction of the field maximum (default 0.1)
	#[arg(long)]
	fraction: Option<f64>,

	/// Supersampling factor for quintic interpolation before extraction
	#[arg(long, default_value_t = 1.0)]
	scale: f64,

	/// Periodic repetitions along the three axes, e.g. 2,2,1
	#[arg(long, value_delimiter = ',', num_args = 3)]
	repeat: Option<Vec<usize>>,

	/// Dataset of a multi-valued cube file (0-based)
	#[arg(long, default_value_t = 0)]
	dataset: usize,

	/// Extract the positive and negative lobes of a signed field
	#[arg(long)]
	lobes: bool,

	/// Give every triangle its own vertices
	#[arg(long)]
	unwelded: bool,

	/// Fail when the isovalue lies outside the field range
	#[arg(long)]
	strict: bool,

	/// Output OBJ path; defaults to the input name with an .obj extension
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Also write the (tiled, resampled) density as an MRC map
	#[arg(long)]
	mrc: Option<PathBuf>,

	/// Skip the banner and progress bar
	#[arg(short, long)]
	quiet: bool,
}

fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
	init_logging();
	let args = Args::parse();

	if !args.quiet {
		info::print_banner();
		info::print_compile_info();
	}

	let format = match args.format {
		Some(format) => InputFormat::from(format),
		None => match detect_format(&args.input) {
			Some(format) => format,
			None => bail!(
				"cannot tell the format of '{}', pass --format cube or --format vasp",
				args.input.display()
			),
		},
	};

	let pb = if args.quiet {
		ProgressBar::hidden()
	} else {
		ProgressBar::new(5)
	};
	pb.set_style(
		ProgressStyle::default_bar()
			.template("{msg:>12} [{bar:40.cyan/blue}] {pos}/{len}")?
			.progress_chars("#>-"),
	);

	pb.set_message("reading");
	let DensityFile { title, field, atoms } = read_density(&args.input, format, args.dataset)
		.with_context(|| format!("failed to read {} file '{}'", format, args.input.display()))?;
	tracing::info!("Read '{}' ({} atoms, species {:?})", title, atoms.len(), atoms.species());
	field.report_memory();
	pb.inc(1);

	pb.set_message("tiling");
	let field = match args.repeat.as_deref() {
		Some(&[a, b, c]) => field.tile([a, b, c]).context("invalid --repeat")?,
		Some(_) => bail!("--repeat takes exactly three counts"),
		None => field,
	};
	pb.inc(1);

	pb.set_message("resampling");
	let field = resample(&field, args.scale).context("resampling failed")?;
	if args.scale > 1.0 {
		field.report_memory();
	}
	if let Some(path) = &args.mrc {
		mrc_output::write_mrc(&field, path)
			.with_context(|| format!("failed to write '{}'", path.display()))?;
	}
	pb.inc(1);

	pb.set_message("extracting");
	let isovalue = match (args.level, args.fraction) {
		(Some(level), _) => Isovalue::Absolute(level),
		(None, Some(fraction)) => Isovalue::FractionOfMax(fraction),
		(None, None) => Isovalue::Default,
	};
	let level = isovalue.resolve(&field);
	let (min, max) = field.value_range();
	tracing::info!(
		"Isovalue {:.6e} (field range {:.6e} .. {:.6e}, {} samples above)",
		level,
		min,
		max,
		field.count_above(level)
	);

	let options = ExtractOptions {
		weld: !args.unwelded,
		strict_range: args.strict,
		..ExtractOptions::default()
	};
	let meshes: Vec<(&str, Mesh)> = if args.lobes {
		let lobes = extract_lobes_with(&field, level, options).context("lobe extraction failed")?;
		vec![("positive", lobes.positive), ("negative", lobes.negative)]
	} else {
		let mesh = IsosurfaceExtractor::new(options)
			.extract(&field, level)
			.context("isosurface extraction failed")?;
		vec![("isosurface", mesh)]
	};
	for (name, mesh) in &meshes {
		tracing::info!(
			"{}: {} vertices, {} triangles, area {:.4}, volume {:.4}, closed {}",
			name,
			mesh.vertex_count(),
			mesh.triangle_count(),
			surface_area::surface_area(mesh),
			surface_area::enclosed_volume(mesh),
			surface_area::is_closed(mesh)
		);
	}
	pb.inc(1);

	pb.set_message("writing");
	let output = args
		.output
		.clone()
		.unwrap_or_else(|| args.input.with_extension("obj"));
	let named: Vec<(&str, &Mesh)> = meshes.iter().map(|(name, mesh)| (*name, mesh)).collect();
	obj_output::write_obj(&output, &named)
		.with_context(|| format!("failed to write '{}'", output.display()))?;
	pb.inc(1);
	pb.finish_with_message("done");

	tracing::info!("Wrote {}", output.display());
	Ok(())
}
