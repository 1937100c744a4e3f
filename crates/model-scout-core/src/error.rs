#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("the model library returned an empty model list")]
    EmptyCatalog,

    #[error("result count must be at least 1, got {0}")]
    InvalidTopN(i64),

    #[error("unknown use case '{0}' (expected one of: all, coding, reasoning, chat)")]
    UnknownUseCase(String),

    #[error("unknown config key '{key}' (valid keys: {valid})")]
    UnknownConfigKey { key: String, valid: String },

    #[error("invalid value '{value}' for config key '{key}'")]
    InvalidConfigValue { key: String, value: String },

    #[error("profile name '{0}' must be alphanumeric (hyphens and underscores allowed)")]
    InvalidProfileName(String),

    #[error("profile '{0}' already exists")]
    ProfileExists(String),

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("the '{0}' profile cannot be deleted")]
    ProtectedProfile(String),

    #[error("ollama binary not found (is Ollama installed?)")]
    OllamaMissing,

    #[error("benchmark failed: {0}")]
    Benchmark(String),
}

pub type Result<T> = std::result::Result<T, ScoutError>;
