use std::collections::BTreeMap;

use nalgebra::Point3;

/// Element symbols indexed by atomic number minus one.
const SYMBOLS: [&str; 118] = [
	"H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
	"Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
	"Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
	"Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
	"Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
	"Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
	"Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
	"Fl", "Mc", "Lv", "Ts", "Og",
];

/// Symbol for atomic number `z` (1-based).
pub fn element_symbol(z: usize) -> Option<&'static str> {
	z.checked_sub(1).and_then(|i| SYMBOLS.get(i)).copied()
}

/// Atomic number for a symbol, case-insensitive.
pub fn atomic_number(symbol: &str) -> Option<usize> {
	SYMBOLS
		.iter()
		.position(|s| s.eq_ignore_ascii_case(symbol))
		.map(|i| i + 1)
}

/// Atom position in Ångström, as carried alongside a density file.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
	pub symbol: String,
	pub position: Point3<f64>,
}

/// Atoms read with one density file; owned by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomRegistry {
	atoms: Vec<Atom>,
}

impl AtomRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, symbol: impl Into<String>, position: Point3<f64>) {
		self.atoms.push(Atom {
			symbol: symbol.into(),
			position,
		});
	}

	pub fn atoms(&self) -> &[Atom] {
		&self.atoms
	}

	pub fn len(&self) -> usize {
		self.atoms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.atoms.is_empty()
	}

	/// Atom count per element, sorted by symbol.
	pub fn species(&self) -> BTreeMap<&str, usize> {
		let mut counts = BTreeMap::new();
		for atom in &self.atoms {
			*counts.entry(atom.symbol.as_str()).or_insert(0) += 1;
		}
		counts
	}
}
