//! Entry point for Lumisphere.
//! Logging + CLI flags, then hand over to the platform loop.

use std::path::{Path, PathBuf};

use anyhow::Result;
use asset::{FailurePolicy, Manifest};
use corelib::scene::{Color, SceneSettings};

const DEFAULT_MANIFEST: &str = "assets/manifest.json";

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    // Last occurrence wins.
    args.iter().rev().find_map(|a| a.strip_prefix(name))
}

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    match flag(args, "--gpu-backend=").map(str::to_ascii_lowercase).as_deref() {
        None | Some("auto") => wgpu::Backends::all(),
        Some("vulkan" | "vk") => wgpu::Backends::VULKAN,
        Some("dx12" | "d3d12") => wgpu::Backends::DX12,
        Some("metal" | "mtl") => wgpu::Backends::METAL,
        Some("gl" | "opengl" | "gles") => wgpu::Backends::GL,
        Some(other) => {
            log::warn!("Unknown backend '{other}', falling back to auto.");
            wgpu::Backends::all()
        }
    }
}

fn parse_policy_arg(args: &[String]) -> FailurePolicy {
    match flag(args, "--failure-policy=").map(str::to_ascii_lowercase).as_deref() {
        None | Some("settle") => FailurePolicy::Settle,
        Some("block") => FailurePolicy::Block,
        Some(other) => {
            log::warn!("Unknown failure policy '{other}', using settle.");
            FailurePolicy::Settle
        }
    }
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(1280).max(1);
    let hh = h.unwrap_or(720).max(1);
    (ww, hh)
}

/// Scene defaults with `--background=` and `--grid=` applied.
fn parse_scene_args(args: &[String]) -> SceneSettings {
    let mut scene = SceneSettings::default();
    if let Some(hex) = flag(args, "--background=") {
        match Color::from_hex(hex) {
            Ok(color) => scene.clear_color = color,
            Err(e) => log::warn!("{e}; keeping the default background."),
        }
    }
    if let Some(v) = flag(args, "--grid=") {
        match v.parse::<i32>() {
            Ok(n) => scene.sphere.grid_half_extent = n.max(0),
            Err(_) => log::warn!("Invalid --grid value '{v}', expected an integer."),
        }
    }
    scene
}

/// Manifest path and asset root; the root defaults to the manifest's folder.
fn parse_paths(args: &[String]) -> (PathBuf, PathBuf) {
    let manifest = PathBuf::from(flag(args, "--manifest=").unwrap_or(DEFAULT_MANIFEST));
    let root = match flag(args, "--asset-root=") {
        Some(dir) => PathBuf::from(dir),
        None => manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    (manifest, root)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let backends = parse_backend_arg(&args);
    let failure_policy = parse_policy_arg(&args);
    let (width, height) = parse_size_args(&args);
    let (manifest_path, asset_root) = parse_paths(&args);
    let scene = parse_scene_args(&args);

    let manifest = Manifest::from_path(&manifest_path)?;

    log::info!(
        "Starting Lumisphere. Backend: {:?}, policy={:?}, window_size={}x{}, manifest={} ({} assets)",
        backends,
        failure_policy,
        width,
        height,
        manifest_path.display(),
        manifest.len()
    );

    platform::run(platform::RunOptions {
        backends,
        width,
        height,
        manifest,
        asset_root,
        failure_policy,
        scene,
    })?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
