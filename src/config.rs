use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "PRTrack";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,prtrack=debug".to_string()
}

/// Get the application data directory (~/PRTrack/ on all platforms)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("PRTrack")
}

/// Path of the tracking database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("prtrack.db")
}
