use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache;
use crate::config::EffectiveConfig;
use crate::error::{Result, ScoutError};
use crate::model::{ModelVariant, GIB};

/// How long a fetched catalog is trusted before a refetch is attempted.
pub const CATALOG_TTL_HOURS: i64 = 24;

const CACHE_FILE: &str = "catalog.json";

pub fn catalog_ttl() -> Duration {
    Duration::hours(CATALOG_TTL_HOURS)
}

/// Where a catalog's variants came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogSource {
    Live,
    Cache,
    OfflineFallback,
}

impl CatalogSource {
    pub fn label(self) -> &'static str {
        match self {
            CatalogSource::Live => "live",
            CatalogSource::Cache => "cache",
            CatalogSource::OfflineFallback => "offline-fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub variants: Vec<ModelVariant>,
    pub fetched_at: DateTime<Utc>,
    pub source: CatalogSource,
}

/// `(base name, tag)` pairs already downloaded locally.
pub type PulledSet = BTreeSet<(String, String)>;

impl Catalog {
    /// The bundled model list.
    pub fn offline_fallback(now: DateTime<Utc>) -> Self {
        let variants = load_bundled_fallback().unwrap_or_else(|e| {
            tracing::error!(error = %e, "bundled fallback catalog is unreadable");
            Vec::new()
        });
        Self {
            variants,
            fetched_at: now,
            source: CatalogSource::OfflineFallback,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    /// A timestamp in the future counts as stale.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = self.age(now);
        age >= Duration::zero() && age < catalog_ttl()
    }

    /// Copies of the variants with `is_pulled` set from a local lookup.
    pub fn variants_with_pulled(&self, pulled: &PulledSet) -> Vec<ModelVariant> {
        self.variants
            .iter()
            .map(|v| {
                let key = (v.base_name.to_lowercase(), v.tag.to_lowercase());
                v.with_pulled(pulled.contains(&key))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct FallbackFile {
    model: Vec<FallbackEntry>,
}

#[derive(Debug, Deserialize)]
struct FallbackEntry {
    name: String,
    param_size: String,
    size_gb: f64,
    quant: String,
    description: String,
}

/// Parse a fallback model list from TOML.
pub fn parse_fallback(toml_str: &str) -> Result<Vec<ModelVariant>> {
    let file: FallbackFile = toml::from_str(toml_str)
        .map_err(|e| ScoutError::Toml(format!("bad fallback_models.toml: {e}")))?;
    Ok(file
        .model
        .into_iter()
        .map(|e| {
            let tag = format!("{}b", e.param_size.to_lowercase().trim_end_matches('b'));
            let size = (e.size_gb * GIB as f64).round() as u64;
            let mut v = ModelVariant::new(&e.name, &tag, &e.quant, Some(size));
            v.param_size = Some(e.param_size);
            v.description = Some(e.description);
            v
        })
        .collect())
}

/// Load the bundled fallback list from the data/ directory.
pub fn load_bundled_fallback() -> Result<Vec<ModelVariant>> {
    parse_fallback(include_str!("../../../data/fallback_models.toml"))
}

/// Source of live catalog data.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ModelVariant>>;
}

/// What `load` will do, decided before any I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPlan {
    Offline,
    UseCache(Catalog),
    Fetch,
}

pub fn plan(
    offline_mode: bool,
    cached: Option<Catalog>,
    force_refresh: bool,
    now: DateTime<Utc>,
) -> LoadPlan {
    if offline_mode {
        return LoadPlan::Offline;
    }
    match cached {
        Some(c) if !force_refresh && c.is_fresh(now) => LoadPlan::UseCache(Catalog {
            source: CatalogSource::Cache,
            ..c
        }),
        _ => LoadPlan::Fetch,
    }
}

/// Produce a catalog without touching the cache file. Fetch failures
/// degrade to the bundled list and are never returned as errors.
pub async fn load<F: CatalogFetcher + ?Sized>(
    offline_mode: bool,
    force_refresh: bool,
    cached: Option<Catalog>,
    fetcher: &F,
    now: DateTime<Utc>,
) -> Catalog {
    match plan(offline_mode, cached, force_refresh, now) {
        LoadPlan::Offline => {
            tracing::debug!("offline mode, using bundled model list");
            Catalog::offline_fallback(now)
        }
        LoadPlan::UseCache(c) => {
            tracing::debug!(age_min = c.age(now).num_minutes(), "using cached catalog");
            c
        }
        LoadPlan::Fetch => match fetcher.fetch().await {
            Ok(variants) => Catalog {
                variants,
                fetched_at: now,
                source: CatalogSource::Live,
            },
            Err(e) => {
                tracing::warn!(error = %e, "live catalog fetch failed, using bundled model list");
                Catalog::offline_fallback(now)
            }
        },
    }
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    fetched_at: DateTime<Utc>,
    variants: Vec<ModelVariant>,
}

/// The on-disk copy of the last live catalog.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    path: PathBuf,
}

impl CatalogCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `catalog.json` in the user cache directory.
    pub fn default_location() -> Option<Self> {
        cache::cache_path(CACHE_FILE).map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached catalog, or `None` if missing or unreadable.
    pub fn read(&self) -> Option<Catalog> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<CacheFile>(&content) {
            Ok(file) => Some(Catalog {
                variants: file.variants,
                fetched_at: file.fetched_at,
                source: CatalogSource::Cache,
            }),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable catalog cache");
                None
            }
        }
    }

    pub fn write(&self, catalog: &Catalog) -> Result<()> {
        let file = CacheFile {
            fetched_at: catalog.fetched_at,
            variants: catalog.variants.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, json)
            .map_err(|e| ScoutError::Io(format!("failed to write {}: {e}", self.path.display())))
    }
}

/// Catalog loading bound to a fetcher and an optional cache file.
pub struct CatalogStore<F> {
    fetcher: F,
    cache: Option<CatalogCache>,
}

impl<F: CatalogFetcher> CatalogStore<F> {
    pub fn new(fetcher: F, cache: Option<CatalogCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> Option<&CatalogCache> {
        self.cache.as_ref()
    }

    /// Load per the effective config. Reads the cache but never writes it;
    /// call [`CatalogStore::persist`] to keep a live result.
    pub async fn load(&self, config: &EffectiveConfig, force_refresh: bool) -> Catalog {
        self.load_at(config, force_refresh, Utc::now()).await
    }

    pub async fn load_at(
        &self,
        config: &EffectiveConfig,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Catalog {
        let offline = config.offline_mode();
        let cached = if offline {
            None
        } else {
            self.cache.as_ref().and_then(CatalogCache::read)
        };
        load(offline, force_refresh, cached, &self.fetcher, now).await
    }

    /// Write a live catalog to the cache. Cached and fallback catalogs are
    /// left alone; returns whether anything was written.
    pub fn persist(&self, catalog: &Catalog) -> Result<bool> {
        match (&self.cache, catalog.source) {
            (Some(cache), CatalogSource::Live) => {
                cache.write(catalog)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
