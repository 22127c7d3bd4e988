use std::path::PathBuf;

pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "notegrid", "notegrid")
        .map(|dirs| dirs.config_dir().join("settings.json"))
}
