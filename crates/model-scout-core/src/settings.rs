//! Persistence for config.toml and profiles.toml.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache;
use crate::config::{Config, ConfigKey, ConfigValue, Overrides, Profiles, DEFAULT_PROFILE};
use crate::error::{Result, ScoutError};
use crate::rank::DEFAULT_TOP_N;

pub const CONFIG_FILE: &str = "config.toml";
pub const PROFILES_FILE: &str = "profiles.toml";

#[derive(Deserialize)]
struct ProfilesIn {
    #[serde(default = "default_active")]
    active: String,
    #[serde(default)]
    profile: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

#[derive(Serialize)]
struct ProfilesOut<'a> {
    active: &'a str,
    profile: BTreeMap<&'a str, BTreeMap<&'static str, &'a ConfigValue>>,
}

fn default_active() -> String {
    DEFAULT_PROFILE.to_string()
}

/// The directory holding both settings files.
#[derive(Debug, Clone)]
pub struct Settings {
    dir: PathBuf,
}

impl Settings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_location() -> Option<Self> {
        cache::config_dir().map(Self::new)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.dir.join(PROFILES_FILE)
    }

    /// The saved base config, or defaults when the file is missing or bad.
    pub fn load_config(&self) -> Config {
        let Some(text) = read_optional(&self.config_path()) else {
            return Config::default();
        };
        let mut config = match toml::from_str::<Config>(&text) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %self.config_path().display(), error = %e, "ignoring malformed config");
                return Config::default();
            }
        };
        if config.default_top_n < 1 {
            tracing::warn!(value = config.default_top_n, "default_top_n must be positive, using {DEFAULT_TOP_N}");
            config.default_top_n = DEFAULT_TOP_N;
        }
        config
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        let text = toml::to_string_pretty(config)
            .map_err(|e| ScoutError::Toml(format!("failed to serialize config: {e}")))?;
        self.write(&self.config_path(), &text)
    }

    /// The saved profiles, or just `default` when the file is missing or bad.
    pub fn load_profiles(&self) -> Profiles {
        let path = self.profiles_path();
        let Some(text) = read_optional(&path) else {
            return Profiles::default();
        };
        match parse_profiles(&text) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed profiles");
                Profiles::default()
            }
        }
    }

    pub fn save_profiles(&self, profiles: &Profiles) -> Result<()> {
        let text = render_profiles(profiles)?;
        self.write(&self.profiles_path(), &text)
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ScoutError::Io(format!("failed to create {}: {e}", self.dir.display())))?;
        std::fs::write(path, text)
            .map_err(|e| ScoutError::Io(format!("failed to write {}: {e}", path.display())))
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read settings file");
            None
        }
    }
}

/// Parse profiles.toml. Unknown keys and ill-typed values are dropped
/// with a warning rather than failing the whole file.
pub fn parse_profiles(text: &str) -> Result<Profiles> {
    let raw: ProfilesIn =
        toml::from_str(text).map_err(|e| ScoutError::Toml(format!("bad {PROFILES_FILE}: {e}")))?;

    let mut profiles = BTreeMap::new();
    for (name, entries) in raw.profile {
        let mut overrides = Overrides::new();
        for (key_name, raw_value) in entries {
            let Ok(key) = key_name.parse::<ConfigKey>() else {
                tracing::warn!(profile = %name, key = %key_name, "skipping unknown config key");
                continue;
            };
            let value = match raw_value {
                toml::Value::Boolean(b) => ConfigValue::Bool(b),
                toml::Value::Integer(n) => ConfigValue::Int(n),
                toml::Value::String(s) => ConfigValue::Text(s),
                other => {
                    tracing::warn!(profile = %name, key = %key, value = %other, "skipping unsupported value");
                    continue;
                }
            };
            if !key.accepts(&value) {
                tracing::warn!(profile = %name, key = %key, value = %value, "skipping invalid value");
                continue;
            }
            overrides.insert(key, value);
        }
        profiles.insert(name, overrides);
    }
    Ok(Profiles::from_parts(raw.active, profiles))
}

pub fn render_profiles(profiles: &Profiles) -> Result<String> {
    let out = ProfilesOut {
        active: profiles.active(),
        profile: profiles
            .iter()
            .map(|(name, overrides)| {
                let entries = overrides.iter().map(|(k, v)| (k.name(), v)).collect();
                (name, entries)
            })
            .collect(),
    };
    toml::to_string_pretty(&out).map_err(|e| ScoutError::Toml(format!("failed to serialize profiles: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_unknown_and_invalid_keys() {
        let text = r#"
active = "gpu"

[profile.gpu]
default_top_n = 5
colour = "blue"
offline_mode = "sometimes"
default_use_case = "coding"
"#;
        let p = parse_profiles(text).unwrap();
        assert_eq!(p.active(), "gpu");
        let gpu = p.get("gpu").unwrap();
        assert_eq!(gpu.len(), 2);
        assert_eq!(gpu.get(&ConfigKey::DefaultTopN), Some(&ConfigValue::Int(5)));
        assert_eq!(
            gpu.get(&ConfigKey::DefaultUseCase),
            Some(&ConfigValue::Text("coding".into()))
        );
        assert!(p.contains(DEFAULT_PROFILE));
    }

    #[test]
    fn render_then_parse_keeps_profiles() {
        let mut p = Profiles::default();
        let mut overrides = Overrides::new();
        overrides.insert(ConfigKey::ShowBenchmark, ConfigValue::Bool(true));
        overrides.insert(ConfigKey::ExportDir, ConfigValue::Text("/tmp/out".into()));
        p.create("laptop", overrides).unwrap();
        p.switch("laptop").unwrap();

        let text = render_profiles(&p).unwrap();
        assert_eq!(parse_profiles(&text).unwrap(), p);
    }

    #[test]
    fn malformed_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new(dir.path());
        std::fs::write(settings.config_path(), "default_top_n = [").unwrap();
        std::fs::write(settings.profiles_path(), "active = 3").unwrap();
        assert_eq!(settings.load_config(), Config::default());
        assert_eq!(settings.load_profiles(), Profiles::default());
    }

    #[test]
    fn config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new(dir.path().join("nested"));
        assert_eq!(settings.load_config(), Config::default());

        let mut cfg = Config::default();
        cfg.set(ConfigKey::DefaultTopN, ConfigValue::Int(7)).unwrap();
        cfg.set(ConfigKey::DefaultUseCase, ConfigValue::Text("reasoning".into()))
            .unwrap();
        settings.save_config(&cfg).unwrap();
        assert_eq!(settings.load_config(), cfg);
    }

    #[test]
    fn non_positive_top_n_is_reset() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new(dir.path());
        std::fs::write(settings.config_path(), "default_top_n = 0\noffline_mode = true\n").unwrap();
        let cfg = settings.load_config();
        assert_eq!(cfg.default_top_n, DEFAULT_TOP_N);
        assert!(cfg.offline_mode);
    }
}
