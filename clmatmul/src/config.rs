//! Runtime configuration
//!
//! Configuration is read from `clmatmul/config.json` in XDG config directories.
//! Every field is optional, missing file or failed parse falls back to defaults.
//! `CLMM_DEBUG` environment variable overrides the `debug` field.

use nanoserde::DeJson;
use std::path::{Path, PathBuf};

/// Entry point every kernel source must expose.
pub const DEFAULT_KERNEL_NAME: &str = "matrixMultiplication";

#[derive(Debug, Default, Clone, DeJson)]
pub struct Config {
    /// Select which platforms will be enumerated.
    /// If set to None, uses all available platforms.
    /// default = None
    pub platform_ids: Option<Vec<usize>>,
    /// Paths to the OpenCL runtime tried before the built-in ones.
    pub opencl_paths: Option<Vec<String>>,
    /// Directory with kernel sources, default is current working directory.
    pub kernel_dir: Option<String>,
    /// Name of the kernel function.
    pub kernel_name: Option<String>,
    /// Debug bitmask, see [`Config::debug_dev`] and friends.
    pub debug: Option<u32>,
}

impl Config {
    /// Searches through config directories and finds clmatmul/config.json.
    /// If not found or failed to parse, uses defaults.
    #[must_use]
    pub fn load() -> Config {
        let mut config = xdg::BaseDirectories::new()
            .ok()
            .map(|bd| {
                let mut dirs = bd.get_config_dirs();
                dirs.push(bd.get_config_home());
                dirs
            })
            .and_then(|paths| {
                paths.into_iter().find_map(|mut path| {
                    path.push("clmatmul/config.json");
                    std::fs::read_to_string(&path).ok()
                })
            })
            .and_then(|file| Config::deserialize_json(&file).ok())
            .unwrap_or_default();
        if let Ok(x) = std::env::var("CLMM_DEBUG") {
            if let Ok(x) = x.parse::<u32>() {
                config.debug = Some(x);
            }
        }
        if config.debug_dev() {
            println!("Config: {config:?}");
        }
        config
    }

    fn debug(&self) -> u32 {
        self.debug.unwrap_or(0)
    }

    /// Print platforms, devices and their ranks
    #[must_use]
    pub fn debug_dev(&self) -> bool {
        self.debug() % 2 == 1
    }

    /// Print dimensions, aligned dimensions and launch geometry
    #[must_use]
    pub fn debug_perf(&self) -> bool {
        (self.debug() >> 1) % 2 == 1
    }

    /// Print build options and kernel source paths
    #[must_use]
    pub fn debug_asm(&self) -> bool {
        (self.debug() >> 2) % 2 == 1
    }

    #[must_use]
    pub fn kernel_name(&self) -> &str {
        self.kernel_name.as_deref().unwrap_or(DEFAULT_KERNEL_NAME)
    }

    /// Path of kernel source file
    #[must_use]
    pub fn kernel_path(&self, file_name: &str) -> PathBuf {
        match &self.kernel_dir {
            Some(dir) => Path::new(dir).join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// Is platform with this index configured in?
    #[must_use]
    pub fn uses_platform(&self, platform_id: usize) -> bool {
        self.platform_ids.as_ref().is_none_or(|ids| ids.contains(&platform_id))
    }
}
