use std::fs;

// Keeps the VERSION file and the crate version in lockstep.
fn main() {
    println!("cargo:rerun-if-changed=VERSION");

    let declared = fs::read_to_string("VERSION").expect("VERSION file missing at crate root");
    let declared = declared.trim();
    let crate_version = env!("CARGO_PKG_VERSION");

    assert_eq!(
        declared, crate_version,
        "VERSION file ({}) and Cargo.toml ({}) disagree; bump both together",
        declared, crate_version
    );
}
