use std::path::PathBuf;

const APP_DIR: &str = "model-scout";

/// Return the cache directory for model-scout data files.
/// Creates it if it doesn't exist.
pub fn cache_dir() -> Option<PathBuf> {
    ensure_dir(dirs::cache_dir()?.join(APP_DIR))
}

/// Return the path to a cached data file, if the cache directory is available.
pub fn cache_path(filename: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(filename))
}

/// Return the directory holding config.toml and profiles.toml.
/// Creates it if it doesn't exist.
pub fn config_dir() -> Option<PathBuf> {
    ensure_dir(dirs::config_dir()?.join(APP_DIR))
}

pub fn config_path(filename: &str) -> Option<PathBuf> {
    Some(config_dir()?.join(filename))
}

fn ensure_dir(dir: PathBuf) -> Option<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok()?;
    }
    Some(dir)
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_home("/tmp/out"), PathBuf::from("/tmp/out"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }
}
