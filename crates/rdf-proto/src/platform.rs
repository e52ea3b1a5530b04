use std::path::PathBuf;

const APP_DIR: &str = "rdf-bridge";

pub const DEFAULT_BACKEND_ADDRESS: &str = "127.0.0.1:49080";

fn portable_dir(marker: &str) -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;
    exe_dir.join(marker).exists().then(|| exe_dir.to_path_buf())
}

pub fn data_dir() -> PathBuf {
    // ~/.local/share/rdf-bridge on unix, even on macOS
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        if let Some(dir) = portable_dir("data") {
            return dir.join("data");
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_dir() -> PathBuf {
    // a config.toml beside the executable wins (portable installs)
    if let Some(dir) = portable_dir("config.toml") {
        return dir;
    }

    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn log_file() -> PathBuf {
    data_dir().join("rdf-bridge.log")
}
