use std::env;
use std::sync::Once;

/// Print a short description of what the tool produces (only prints once)
pub fn print_banner() {
	static PRINT_BANNER_ONCE: Once = Once::new();
	PRINT_BANNER_ONCE.call_once(|| {
		eprintln!("Density isosurface extraction: marching cubes over cube/CHGCAR density grids.");
		eprintln!("Meshes are written in world coordinates (Angstrom) with outward-facing winding.\n");
	});
}

/// Print compilation information (only prints once)
pub fn print_compile_info() {
	static PRINT_COMPILE_ONCE: Once = Once::new();
	PRINT_COMPILE_ONCE.call_once(|| {
		eprintln!("Program: {}", program_name());
		eprintln!(
			"Compiled on: {} at {}",
			env!("COMPILE_DATE"),
			env!("COMPILE_TIME")
		);
		eprintln!("Version: {}", env!("CARGO_PKG_VERSION"));
	});
}

/// Name of the running executable, "Unknown Program" when it cannot be determined
pub fn program_name() -> String {
	env::current_exe()
		.ok()
		.as_ref()
		.and_then(|path| path.file_name())
		.and_then(|name| name.to_str())
		.unwrap_or("Unknown Program")
		.to_string()
}
