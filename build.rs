use std::process::Command;

/// Run `date` with the given format, falling back to "unknown" when it is unavailable.
fn stamp(format: &str) -> String {
	Command::new("date")
		.arg(format)
		.output()
		.ok()
		.map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
		.filter(|s| !s.is_empty())
		.unwrap_or_else(|| "unknown".to_string())
}

fn main() {
	println!("cargo:rustc-env=COMPILE_DATE={}", stamp("+%Y-%m-%d"));
	println!("cargo:rustc-env=COMPILE_TIME={}", stamp("+%H:%M:%S"));
	println!("cargo:rerun-if-changed=build.rs");
}
