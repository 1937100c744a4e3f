pub mod api;
pub mod benchmark;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod fit;
pub mod hardware;
pub mod model;
pub mod ollama;
pub mod probe;
pub mod rank;
pub mod settings;

pub use catalog::{Catalog, CatalogSource, CatalogStore};
pub use config::{resolve_effective_config, Config, ConfigKey, ConfigValue, EffectiveConfig, Profiles};
pub use error::{Result, ScoutError};
pub use fit::{classify, Candidate, FitTier, RunMode};
pub use hardware::{GpuDevice, HardwareSnapshot};
pub use model::{LogicalModel, ModelVariant, UseCase, UseCaseFilter};
