use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("No spec url configured, pass --url or set it in the config file")]
    MissingUrl,

    #[error("Fetching {url} returned status {status}")]
    Fetch { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported OpenAPI version {0:?}, only 3.x documents can be generated")]
    UnsupportedVersion(String),

    #[error("The document has no `paths` or `components` mapping to generate from")]
    MissingComponents,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to render generated code: {0}")]
    Render(#[from] std::fmt::Error),

    #[error("Target directory {0} is not empty, pass --force to write into it")]
    TargetNotEmpty(String),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
