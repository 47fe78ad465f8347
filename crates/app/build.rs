//! Compiles the GLSL sources in `<workspace>/shaders` to SPIR-V with `glslc`.
//!
//! `shader.vert` becomes `vert.spv` and `shader.frag` becomes `frag.spv`, next
//! to the sources, which is where the default config looks for them. Without
//! `glslc` on `PATH` the step is skipped with a warning and the modules must
//! be compiled by hand (see `shaders/README.md`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let shader_dir = manifest_dir.join("../../shaders");

    println!("cargo:rerun-if-changed={}", shader_dir.display());
    println!("cargo:rerun-if-changed=build.rs");

    for entry in WalkDir::new(&shader_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let source = entry.path();
        let Some(stage) = source.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        if stage != "vert" && stage != "frag" {
            continue;
        }

        let output = shader_dir.join(format!("{}.spv", stage));
        if !compile(source, &output) {
            return;
        }
    }
}

/// Runs `glslc`. Returns `false` when the compiler is not installed.
fn compile(source: &Path, output: &Path) -> bool {
    match Command::new("glslc").arg(source).arg("-o").arg(output).status() {
        Ok(status) if status.success() => true,
        Ok(status) => panic!(
            "glslc failed on {} with exit code {:?}",
            source.display(),
            status.code()
        ),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            println!(
                "cargo:warning=glslc not found, shaders in {} were not compiled",
                source.parent().unwrap_or(source).display()
            );
            false
        }
        Err(e) => panic!("failed to run glslc on {}: {}", source.display(), e),
    }
}
