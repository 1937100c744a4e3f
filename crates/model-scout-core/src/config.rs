use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};
use crate::model::UseCaseFilter;
use crate::rank::DEFAULT_TOP_N;

/// The profile every install has. It may carry no overrides but can never be
/// deleted.
pub const DEFAULT_PROFILE: &str = "default";

/// Every setting model-scout understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    DefaultUseCase,
    DefaultTopN,
    AutoExport,
    ExportDir,
    OfflineMode,
    ShowBenchmark,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::DefaultUseCase,
        ConfigKey::DefaultTopN,
        ConfigKey::AutoExport,
        ConfigKey::ExportDir,
        ConfigKey::OfflineMode,
        ConfigKey::ShowBenchmark,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::DefaultUseCase => "default_use_case",
            ConfigKey::DefaultTopN => "default_top_n",
            ConfigKey::AutoExport => "auto_export",
            ConfigKey::ExportDir => "export_dir",
            ConfigKey::OfflineMode => "offline_mode",
            ConfigKey::ShowBenchmark => "show_benchmark",
        }
    }

    /// Parse raw `key=value` input for this key.
    pub fn parse_value(self, raw: &str) -> Result<ConfigValue> {
        let raw = raw.trim();
        let invalid = || ScoutError::InvalidConfigValue {
            key: self.name().to_string(),
            value: raw.to_string(),
        };
        match self {
            ConfigKey::AutoExport | ConfigKey::OfflineMode | ConfigKey::ShowBenchmark => {
                match raw.to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Ok(ConfigValue::Bool(true)),
                    "false" | "0" | "no" | "off" => Ok(ConfigValue::Bool(false)),
                    _ => Err(invalid()),
                }
            }
            ConfigKey::DefaultTopN => match raw.parse::<i64>() {
                Ok(n) if n >= 1 => Ok(ConfigValue::Int(n)),
                _ => Err(invalid()),
            },
            ConfigKey::DefaultUseCase => raw
                .parse::<UseCaseFilter>()
                .map(|f| ConfigValue::Text(f.label().to_string()))
                .map_err(|_| invalid()),
            ConfigKey::ExportDir => Ok(ConfigValue::Text(raw.to_string())),
        }
    }

    /// Whether an already-typed value is acceptable for this key.
    pub fn accepts(self, value: &ConfigValue) -> bool {
        match (self, value) {
            (ConfigKey::AutoExport | ConfigKey::OfflineMode | ConfigKey::ShowBenchmark, ConfigValue::Bool(_)) => true,
            (ConfigKey::DefaultTopN, ConfigValue::Int(n)) => *n >= 1,
            (ConfigKey::DefaultUseCase, ConfigValue::Text(s)) => s.parse::<UseCaseFilter>().is_ok(),
            (ConfigKey::ExportDir, ConfigValue::Text(_)) => true,
            _ => false,
        }
    }

    fn valid_names() -> String {
        Self::ALL.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
    }
}

impl FromStr for ConfigKey {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ScoutError::UnknownConfigKey {
                key: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(n) => write!(f, "{n}"),
            ConfigValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// The base configuration, as persisted in config.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_use_case: UseCaseFilter,
    pub default_top_n: i64,
    pub auto_export: bool,
    pub export_dir: String,
    pub offline_mode: bool,
    pub show_benchmark: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_use_case: UseCaseFilter::All,
            default_top_n: DEFAULT_TOP_N,
            auto_export: false,
            export_dir: String::new(),
            offline_mode: false,
            show_benchmark: false,
        }
    }
}

impl Config {
    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        match key {
            ConfigKey::DefaultUseCase => ConfigValue::Text(self.default_use_case.label().to_string()),
            ConfigKey::DefaultTopN => ConfigValue::Int(self.default_top_n),
            ConfigKey::AutoExport => ConfigValue::Bool(self.auto_export),
            ConfigKey::ExportDir => ConfigValue::Text(self.export_dir.clone()),
            ConfigKey::OfflineMode => ConfigValue::Bool(self.offline_mode),
            ConfigKey::ShowBenchmark => ConfigValue::Bool(self.show_benchmark),
        }
    }

    /// Set one key. The value must already have the key's type; nothing
    /// changes on error.
    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<()> {
        if !key.accepts(&value) {
            return Err(ScoutError::InvalidConfigValue {
                key: key.name().to_string(),
                value: value.to_string(),
            });
        }
        match (key, value) {
            (ConfigKey::DefaultUseCase, ConfigValue::Text(s)) => {
                self.default_use_case = s.parse()?;
            }
            (ConfigKey::DefaultTopN, ConfigValue::Int(n)) => self.default_top_n = n,
            (ConfigKey::AutoExport, ConfigValue::Bool(b)) => self.auto_export = b,
            (ConfigKey::ExportDir, ConfigValue::Text(s)) => self.export_dir = s,
            (ConfigKey::OfflineMode, ConfigValue::Bool(b)) => self.offline_mode = b,
            (ConfigKey::ShowBenchmark, ConfigValue::Bool(b)) => self.show_benchmark = b,
            // accepts() has already rejected every other pairing
            _ => {}
        }
        Ok(())
    }
}

pub type Overrides = BTreeMap<ConfigKey, ConfigValue>;

/// Named override sets plus which one is active.
#[derive(Debug, Clone, PartialEq)]
pub struct Profiles {
    active: String,
    profiles: BTreeMap<String, Overrides>,
}

impl Default for Profiles {
    fn default() -> Self {
        Self {
            active: DEFAULT_PROFILE.to_string(),
            profiles: BTreeMap::from([(DEFAULT_PROFILE.to_string(), Overrides::new())]),
        }
    }
}

impl Profiles {
    /// Rebuild from persisted parts. The default profile is restored if
    /// missing, and an active name with no entry falls back to it.
    pub fn from_parts(active: String, mut profiles: BTreeMap<String, Overrides>) -> Self {
        profiles.entry(DEFAULT_PROFILE.to_string()).or_default();
        let active = if profiles.contains_key(&active) {
            active
        } else {
            DEFAULT_PROFILE.to_string()
        };
        Self { active, profiles }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn get(&self, name: &str) -> Option<&Overrides> {
        self.profiles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Profiles with `default` first, the rest by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Overrides)> {
        let default = self
            .profiles
            .get_key_value(DEFAULT_PROFILE)
            .map(|(k, v)| (k.as_str(), v));
        let rest = self
            .profiles
            .iter()
            .filter(|(k, _)| k.as_str() != DEFAULT_PROFILE)
            .map(|(k, v)| (k.as_str(), v));
        default.into_iter().chain(rest)
    }

    pub fn create(&mut self, name: &str, overrides: Overrides) -> Result<()> {
        let name = validate_profile_name(name)?;
        if self.profiles.contains_key(name) {
            return Err(ScoutError::ProfileExists(name.to_string()));
        }
        if let Some((key, value)) = overrides.iter().find(|(k, v)| !k.accepts(v)) {
            return Err(ScoutError::InvalidConfigValue {
                key: key.name().to_string(),
                value: value.to_string(),
            });
        }
        self.profiles.insert(name.to_string(), overrides);
        Ok(())
    }

    /// Remove a profile. Deleting the active profile makes `default` active.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name == DEFAULT_PROFILE {
            return Err(ScoutError::ProtectedProfile(name.to_string()));
        }
        if self.profiles.remove(name).is_none() {
            return Err(ScoutError::ProfileNotFound(name.to_string()));
        }
        if self.active == name {
            self.active = DEFAULT_PROFILE.to_string();
        }
        Ok(())
    }

    pub fn switch(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if !self.profiles.contains_key(name) {
            return Err(ScoutError::ProfileNotFound(name.to_string()));
        }
        self.active = name.to_string();
        Ok(())
    }

    pub fn set_value(&mut self, name: &str, key: ConfigKey, value: ConfigValue) -> Result<()> {
        if !key.accepts(&value) {
            return Err(ScoutError::InvalidConfigValue {
                key: key.name().to_string(),
                value: value.to_string(),
            });
        }
        let overrides = self
            .profiles
            .get_mut(name.trim())
            .ok_or_else(|| ScoutError::ProfileNotFound(name.trim().to_string()))?;
        overrides.insert(key, value);
        Ok(())
    }
}

fn validate_profile_name(name: &str) -> Result<&str> {
    let name = name.trim();
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(ScoutError::InvalidProfileName(name.to_string()))
    }
}

/// Base configuration with one profile's overrides layered on top.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub base: Config,
    pub profile: String,
    pub overrides: Overrides,
}

impl EffectiveConfig {
    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        self.overrides
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.base.get(key))
    }

    pub fn is_overridden(&self, key: ConfigKey) -> bool {
        self.overrides.contains_key(&key)
    }

    pub fn use_case(&self) -> UseCaseFilter {
        match self.get(ConfigKey::DefaultUseCase) {
            ConfigValue::Text(s) => s.parse().unwrap_or(self.base.default_use_case),
            _ => self.base.default_use_case,
        }
    }

    pub fn top_n(&self) -> i64 {
        match self.get(ConfigKey::DefaultTopN) {
            ConfigValue::Int(n) => n,
            _ => self.base.default_top_n,
        }
    }

    pub fn auto_export(&self) -> bool {
        self.bool_or(ConfigKey::AutoExport, self.base.auto_export)
    }

    pub fn export_dir(&self) -> String {
        match self.get(ConfigKey::ExportDir) {
            ConfigValue::Text(s) => s,
            _ => self.base.export_dir.clone(),
        }
    }

    pub fn offline_mode(&self) -> bool {
        self.bool_or(ConfigKey::OfflineMode, self.base.offline_mode)
    }

    pub fn show_benchmark(&self) -> bool {
        self.bool_or(ConfigKey::ShowBenchmark, self.base.show_benchmark)
    }

    fn bool_or(&self, key: ConfigKey, fallback: bool) -> bool {
        match self.get(key) {
            ConfigValue::Bool(b) => b,
            _ => fallback,
        }
    }
}

impl From<Config> for EffectiveConfig {
    fn from(base: Config) -> Self {
        Self {
            base,
            profile: DEFAULT_PROFILE.to_string(),
            overrides: Overrides::new(),
        }
    }
}

/// Layer a profile over the base config. `requested` picks a profile for
/// this run only; `None` uses the active one. `profiles` is never modified.
pub fn resolve_effective_config(
    base: &Config,
    profiles: &Profiles,
    requested: Option<&str>,
) -> Result<EffectiveConfig> {
    let name = requested.map(str::trim).unwrap_or(profiles.active());
    let overrides = profiles
        .get(name)
        .ok_or_else(|| ScoutError::ProfileNotFound(name.to_string()))?;
    Ok(EffectiveConfig {
        base: base.clone(),
        profile: name.to_string(),
        overrides: overrides.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_lists_valid_keys() {
        let err = "colour".parse::<ConfigKey>().unwrap_err();
        match err {
            ScoutError::UnknownConfigKey { key, valid } => {
                assert_eq!(key, "colour");
                assert!(valid.contains("default_top_n"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_value_is_typed() {
        assert_eq!(ConfigKey::OfflineMode.parse_value("yes").unwrap(), ConfigValue::Bool(true));
        assert_eq!(ConfigKey::DefaultTopN.parse_value(" 20 ").unwrap(), ConfigValue::Int(20));
        assert_eq!(
            ConfigKey::DefaultUseCase.parse_value("Coding").unwrap(),
            ConfigValue::Text("coding".into())
        );
        assert!(ConfigKey::DefaultTopN.parse_value("0").is_err());
        assert!(ConfigKey::DefaultTopN.parse_value("many").is_err());
        assert!(ConfigKey::ShowBenchmark.parse_value("maybe").is_err());
        assert!(ConfigKey::DefaultUseCase.parse_value("vision").is_err());
    }

    #[test]
    fn config_set_rejects_wrong_type_without_change() {
        let mut cfg = Config::default();
        assert!(cfg.set(ConfigKey::DefaultTopN, ConfigValue::Bool(true)).is_err());
        assert_eq!(cfg, Config::default());
        cfg.set(ConfigKey::DefaultTopN, ConfigValue::Int(5)).unwrap();
        assert_eq!(cfg.default_top_n, 5);
    }

    #[test]
    fn from_parts_restores_default_profile() {
        let p = Profiles::from_parts("gone".into(), BTreeMap::new());
        assert!(p.contains(DEFAULT_PROFILE));
        assert_eq!(p.active(), DEFAULT_PROFILE);
    }

    #[test]
    fn iter_lists_default_first() {
        let mut p = Profiles::default();
        p.create("alpha", Overrides::new()).unwrap();
        p.create("zeta", Overrides::new()).unwrap();
        let names: Vec<_> = p.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["default", "alpha", "zeta"]);
    }

    #[test]
    fn bad_profile_names_rejected() {
        let mut p = Profiles::default();
        assert!(matches!(p.create("", Overrides::new()), Err(ScoutError::InvalidProfileName(_))));
        assert!(matches!(
            p.create("has space", Overrides::new()),
            Err(ScoutError::InvalidProfileName(_))
        ));
        p.create("fast_gpu-2", Overrides::new()).unwrap();
    }

    #[test]
    fn deleting_active_profile_reactivates_default() {
        let mut p = Profiles::default();
        p.create("work", Overrides::new()).unwrap();
        p.switch("work").unwrap();
        p.delete("work").unwrap();
        assert_eq!(p.active(), DEFAULT_PROFILE);
    }
}
