//! Host platform utility functions

use std::path::PathBuf;

/// Environment variable which points at the root of the software tree.
pub const SW_ROOT_ENV_VAR: &str = "LFR_SW_ROOT";

/// Get the root directory of the software.
///
/// This is the value of `LFR_SW_ROOT` if it is set, otherwise the current
/// working directory.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match std::env::var_os(SW_ROOT_ENV_VAR) {
        Some(root) => Ok(PathBuf::from(root)),
        None => std::env::current_dir()
    }
}
