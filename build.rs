//! Build script - copies the linker script into the output directory
//! and stamps the compile-time baseline timestamp.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to OUT_DIR
    fs::copy("memory.x", out_dir.join("memory.x")).unwrap();

    // Tell cargo to look for linker scripts in OUT_DIR
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Firmware link scripts (cortex-m-rt and defmt)
    if env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Oldest time the RTC is allowed to report at boot. Defaults to the
    // moment of the build; set UNIX_CLOCK_BASELINE for reproducible images.
    let baseline = match env::var("UNIX_CLOCK_BASELINE") {
        Ok(value) => value.trim().parse::<u32>().unwrap(),
        Err(_) => {
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs();
            u32::try_from(secs).unwrap_or(u32::MAX)
        }
    };
    println!("cargo:rustc-env=UNIX_CLOCK_BASELINE={baseline}");

    // Rebuild if the linker script or the baseline override changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=UNIX_CLOCK_BASELINE");
}
