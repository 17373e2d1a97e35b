use std::fmt;
use std::io::{BufRead, Lines};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::density_grid::atoms::AtomRegistry;
use crate::density_grid::error::ReadError;
use crate::density_grid::grid::GridField;
use crate::density_grid::{chgcar, cube};

/// Density file families understood by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
	/// Gaussian cube, origin+axis lattice.
	Cube,
	/// VASP CHGCAR/PARCHG family, cell-normalized lattice.
	Vasp,
}

impl fmt::Display for InputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InputFormat::Cube => write!(f, "cube"),
			InputFormat::Vasp => write!(f, "vasp"),
		}
	}
}

static CUBE_NAME: OnceLock<Option<Regex>> = OnceLock::new();
static VASP_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn cube_name() -> Option<&'static Regex> {
	CUBE_NAME.get_or_init(|| Regex::new(r"(?i)\.cube?(\.gz)?$").ok()).as_ref()
}

fn vasp_name() -> Option<&'static Regex> {
	VASP_NAME
		.get_or_init(|| Regex::new(r"(?i)^(CHGCAR|PARCHG|CHG|AECCAR[0-2]|ELFCAR|LOCPOT)([._-].*)?$").ok())
		.as_ref()
}

/// Guess the format from the file name alone.
pub fn detect_format(path: &Path) -> Option<InputFormat> {
	let name = path.file_name()?.to_str()?;
	if cube_name().is_some_and(|re| re.is_match(name)) {
		Some(InputFormat::Cube)
	} else if vasp_name().is_some_and(|re| re.is_match(name)) {
		Some(InputFormat::Vasp)
	} else {
		None
	}
}

/// True when the file name ends in `.gz`.
pub fn is_gzipped(path: &Path) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// A density grid together with the structure it was computed for.
#[derive(Debug, Clone)]
pub struct DensityFile {
	pub title: String,
	pub field: GridField,
	pub atoms: AtomRegistry,
}

/// Read `path` as `format`, keeping dataset `dataset` (0-based) of multi-valued cube files.
///
/// VASP files hold a single density grid, so only dataset 0 exists.
pub fn read_density(path: &Path, format: InputFormat, dataset: usize) -> Result<DensityFile, ReadError> {
	match format {
		InputFormat::Cube => cube::read_cube_path(path, dataset),
		InputFormat::Vasp if dataset > 0 => Err(ReadError::format(
			0,
			format!("dataset {} requested, VASP files hold one density grid", dataset),
		)),
		InputFormat::Vasp => chgcar::read_chgcar_path(path),
	}
}

const PREALLOCATE_VALUES: usize = 1 << 20;

/// Line source for the text readers, tracking 1-based line numbers for errors.
pub(crate) struct LineReader<R> {
	lines: Lines<R>,
	line: usize,
}

impl<R: BufRead> LineReader<R> {
	pub(crate) fn new(reader: R) -> Self {
		Self {
			lines: reader.lines(),
			line: 0,
		}
	}

	/// Number of the line returned last.
	pub(crate) fn line(&self) -> usize {
		self.line
	}

	pub(crate) fn next_line(&mut self) -> Result<Option<String>, ReadError> {
		match self.lines.next() {
			Some(line) => {
				self.line += 1;
				Ok(Some(line?))
			}
			None => Ok(None),
		}
	}

	/// Next line, failing at end of input with `what` was expected.
	pub(crate) fn require_line(&mut self, what: &str) -> Result<String, ReadError> {
		self.next_line()?
			.ok_or_else(|| ReadError::format(self.line + 1, format!("unexpected end of file, expected {}", what)))
	}

	/// Next non-blank line.
	pub(crate) fn require_content(&mut self, what: &str) -> Result<String, ReadError> {
		loop {
			let line = self.require_line(what)?;
			if !line.trim().is_empty() {
				return Ok(line);
			}
		}
	}

	/// Parse the next `count` whitespace-separated numbers, spanning lines as needed.
	///
	/// The rest of the line holding the last value is discarded.
	pub(crate) fn read_values(&mut self, count: usize, what: &str) -> Result<Vec<f64>, ReadError> {
		// A header can claim more values than the file holds; grow as they arrive.
		let mut values = Vec::with_capacity(count.min(PREALLOCATE_VALUES));
		while values.len() < count {
			let line = self.require_line(what)?;
			for token in line.split_whitespace() {
				if values.len() == count {
					break;
				}
				values.push(parse_float(token, self.line, what)?);
			}
		}
		Ok(values)
	}
}

/// Product of header sizes, failing on overflow instead of wrapping.
pub(crate) fn checked_count(factors: &[usize], line: usize, what: &str) -> Result<usize, ReadError> {
	factors
		.iter()
		.try_fold(1usize, |total, &n| total.checked_mul(n))
		.ok_or_else(|| ReadError::format(line, format!("{} {:?} is too large", what, factors)))
}

/// Parse a token, reporting `what` and the line on failure.
pub(crate) fn parse_token<T: FromStr>(token: Option<&str>, line: usize, what: &str) -> Result<T, ReadError> {
	let token = token.ok_or_else(|| ReadError::format(line, format!("missing {}", what)))?;
	token
		.parse()
		.map_err(|_| ReadError::format(line, format!("invalid {} '{}'", what, token)))
}

/// Parse a float, accepting Fortran `D` exponents.
pub(crate) fn parse_float(token: &str, line: usize, what: &str) -> Result<f64, ReadError> {
	let value = if token.contains(['D', 'd']) {
		token.replace(['D', 'd'], "E").parse::<f64>()
	} else {
		token.parse::<f64>()
	};
	value.map_err(|_| ReadError::format(line, format!("invalid {} '{}'", what, token)))
}
