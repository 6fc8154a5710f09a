// Compiles shaders/*.{vert,frag} to SPIR-V with glslc from the Vulkan SDK.
// Output lands in OUT_DIR/shaders, exported as FRAME_ENGINE_SHADER_DIR.
// Without an SDK nothing is compiled and the demo falls back to clearing.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

fn glslc_path() -> Option<PathBuf> {
    let sdk = env::var("VULKAN_SDK").ok()?;
    let glslc = if cfg!(target_os = "windows") {
        Path::new(&sdk).join("Bin").join("glslc.exe")
    } else {
        Path::new(&sdk).join("bin").join("glslc")
    };
    glslc.exists().then_some(glslc)
}

fn compile(glslc: &Path, source: &Path, target_dir: &Path) -> usize {
    let Some(file_name) = source.file_name() else { return 0 };
    let mut out_name = file_name.to_os_string();
    out_name.push(".spv");
    let out_file = target_dir.join(out_name);

    match Command::new(glslc).arg(source).arg("-o").arg(&out_file).status() {
        Ok(status) if status.success() => {
            eprintln!("info: Compiled {:?} -> {:?}", source, out_file);
            1
        }
        Ok(status) => {
            println!("cargo:warning=glslc failed for {:?} ({})", source, status);
            0
        }
        Err(err) => {
            println!("cargo:warning=failed to run glslc for {:?}: {}", source, err);
            0
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed=shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");

    let out_dir = env::var("OUT_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("target"));
    let target_dir = out_dir.join("shaders");
    println!("cargo:rustc-env=FRAME_ENGINE_SHADER_DIR={}", target_dir.display());

    let Some(glslc) = glslc_path() else {
        eprintln!("warning: VULKAN_SDK not set or glslc missing, shader compilation skipped");
        return;
    };
    if let Err(err) = std::fs::create_dir_all(&target_dir) {
        println!("cargo:warning=failed to create {:?}: {}", target_dir, err);
        return;
    }

    let Ok(entries) = std::fs::read_dir("shaders") else {
        eprintln!("info: No shader directory found");
        return;
    };

    let mut compiled = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_stage = path
            .extension()
            .map_or(false, |ext| ext == "vert" || ext == "frag");
        if is_stage {
            compiled += compile(&glslc, &path, &target_dir);
        }
    }
    eprintln!("info: Compiled {} shader(s)", compiled);
}
