//! Build-time hints for locating the FFmpeg development libraries.
//!
//! `ffmpeg-sys-next` does the actual discovery. This script only explains
//! what to set when discovery is likely to fail on platforms without a
//! system `pkg-config` install of FFmpeg.

use std::{env, path::PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match env::var("CARGO_CFG_TARGET_OS").unwrap_or_default().as_str() {
        "windows" => windows_hints(),
        "macos" => macos_hints(),
        _ => {}
    }
}

fn warn(message: &str) {
    println!("cargo:warning={message}");
}

fn windows_hints() {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        warn("unspool needs FFmpeg development libraries: install them with vcpkg and set VCPKG_ROOT, or point FFMPEG_DIR at an FFmpeg build.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let installed = PathBuf::from(vcpkg_root).join("installed").join(triplet);

    if !installed.exists() {
        warn(&format!("no vcpkg FFmpeg install found at {}", installed.display()));
        return;
    }

    warn(&format!(
        "using vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to pin it",
        installed.display()
    ));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("set VCPKGRS_DYNAMIC=1 if the vcpkg FFmpeg build is dynamic");
    }
}

fn macos_hints() {
    let homebrew = ["/opt/homebrew/opt/ffmpeg", "/usr/local/opt/ffmpeg"]
        .into_iter()
        .map(PathBuf::from)
        .find(|prefix| prefix.exists());

    let Some(prefix) = homebrew else {
        return;
    };
    if env::var_os("PKG_CONFIG_PATH").is_none() {
        warn(&format!(
            "found Homebrew FFmpeg at {}; export PKG_CONFIG_PATH={}/lib/pkgconfig if discovery fails",
            prefix.display(),
            prefix.display()
        ));
    }
}
