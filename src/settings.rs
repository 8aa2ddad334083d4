use config::{ConfigError, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "trowel.json";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// Location of the OpenAPI document, an http(s) url or a file path.
    #[serde(default)]
    pub url: Option<String>,
    /// Directory the client package is written to.
    pub dirname: String,
}

impl Settings {
    /// Defaults, then the config file, then `TROWEL_*` environment variables, then the
    /// explicit overrides coming from the command line.
    pub fn load(
        config_file: Option<&Path>,
        url: Option<String>,
        dirname: Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Json).required(false),
        };

        config::Config::builder()
            .set_default("dirname", "client")?
            .add_source(file)
            // Eg.. `TROWEL_URL=https://... trowel` sets the `url` key
            .add_source(config::Environment::with_prefix("TROWEL"))
            .set_override_option("url", url)?
            .set_override_option("dirname", dirname)?
            .build()?
            .try_deserialize()
    }

    pub async fn save(&self, path: &Path) -> crate::errors::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, format!("{}\n", json)).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn file_values_are_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");

        Settings {
            url: Some("http://localhost/openapi.json".to_owned()),
            dirname: "api".to_owned(),
        }
        .save(&path)
        .await
        .unwrap();

        let loaded = Settings::load(Some(&path), None, None).unwrap();
        assert_eq!(loaded.url.as_deref(), Some("http://localhost/openapi.json"));
        assert_eq!(loaded.dirname, "api");

        let overridden = Settings::load(Some(&path), None, Some("sdk".to_owned())).unwrap();
        assert_eq!(overridden.dirname, "sdk");
        assert_eq!(overridden.url, loaded.url);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.json")), None, None).is_err());
    }
}
