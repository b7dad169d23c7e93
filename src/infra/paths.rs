// src/infra/paths.rs — Config and data locations
//
// TWEETPURGE_HOME overrides everything (config and data live under it).
// Otherwise config is ~/.tweetpurge/config.toml and data follows XDG.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

pub const HOME_ENV: &str = "TWEETPURGE_HOME";

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV).map(PathBuf::from)
}

/// Home directory, falling back to the current directory when none is known.
fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home;
    }
    dirs_home().join(".tweetpurge")
}

pub fn data_dir() -> PathBuf {
    if let Some(home) = home_override() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "tweetpurge")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn db_path() -> PathBuf {
    data_dir().join("tweetpurge.db")
}
