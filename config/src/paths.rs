//! State directory layout. Everything kestrel writes lives under one root
//! directory: an environment override first, `dirs::home_dir` joined with
//! a dotdir second.

use std::path::PathBuf;

const HOME_ENV: &str = "KESTREL_HOME";
const DEFAULT_DIR_NAME: &str = ".kestrel";

/// Root directory for all kestrel state: settings, sessions, credentials,
/// cache, logs.
pub fn home_dir() -> PathBuf {
    if let Ok(custom) = std::env::var(HOME_ENV) {
        let path = PathBuf::from(&custom);
        if path.is_absolute() {
            return path;
        }
        return std::env::current_dir()
            .map(|cwd| cwd.join(&custom))
            .unwrap_or_else(|_| PathBuf::from(custom));
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn settings_path() -> PathBuf {
    home_dir().join("settings.toml")
}

pub fn auth_path() -> PathBuf {
    home_dir().join("auth.json")
}

pub fn sessions_dir() -> PathBuf {
    home_dir().join("sessions")
}

pub fn cache_dir() -> PathBuf {
    home_dir().join("cache")
}

pub fn log_dir() -> PathBuf {
    home_dir().join("log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins_over_default() {
        // SAFETY: single-threaded test; no other test reads KESTREL_HOME concurrently
        // in this process in a way that would race on this var.
        unsafe { std::env::set_var(HOME_ENV, "/tmp/kestrel-test-home") };
        assert_eq!(home_dir(), PathBuf::from("/tmp/kestrel-test-home"));
        unsafe { std::env::remove_var(HOME_ENV) };
    }

    #[test]
    fn derived_paths_nest_under_home() {
        unsafe { std::env::set_var(HOME_ENV, "/tmp/kestrel-test-home2") };
        assert_eq!(settings_path(), PathBuf::from("/tmp/kestrel-test-home2/settings.toml"));
        assert_eq!(sessions_dir(), PathBuf::from("/tmp/kestrel-test-home2/sessions"));
        unsafe { std::env::remove_var(HOME_ENV) };
    }
}
