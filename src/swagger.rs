use crate::errors::{GenerateError, Result};
use log::{debug, info};
use serde_json::Value;

/// An OpenAPI document as loaded, `$ref`s untouched.
#[derive(Debug, Clone)]
pub struct Swagger {
    pub document: Value,
    pub source: String,
}

impl Swagger {
    /// Parses JSON, falling back to YAML, and checks this is a 3.x document.
    pub fn parse(text: &str, source: &str) -> Result<Self> {
        let document = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(json_error) => {
                debug!("{} is not JSON ({}), trying YAML", source, json_error);
                serde_yaml::from_str::<Value>(text)?
            }
        };

        // YAML reads an unquoted `openapi: 3.0` as a number
        let version = match document.get("openapi") {
            Some(Value::String(v)) => v.clone(),
            Some(Value::Number(v)) => v.to_string(),
            _ => String::new(),
        };

        if !version.starts_with("3.") {
            return Err(GenerateError::UnsupportedVersion(version));
        }

        let has_paths = document.get("paths").is_some_and(|p| p.is_object());
        let has_components = document.get("components").is_some_and(|c| c.is_object());
        if !has_paths && !has_components {
            return Err(GenerateError::MissingComponents);
        }

        Ok(Self {
            document,
            source: source.to_owned(),
        })
    }
}

pub struct SwaggerApi {
    client: reqwest::Client,
}

impl SwaggerApi {
    pub fn new() -> Self {
        SwaggerApi {
            client: reqwest::Client::new(),
        }
    }

    /// Fetches `location` over http(s), or reads it from disk otherwise.
    pub async fn load(&self, location: &str) -> Result<Swagger> {
        let text = if location.starts_with("http://") || location.starts_with("https://") {
            self.fetch(location).await?
        } else {
            tokio::fs::read_to_string(location).await?
        };

        let swagger = Swagger::parse(&text, location)?;
        info!("Loaded OpenAPI document from {}", location);

        Ok(swagger)
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerateError::Fetch {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

impl Default for SwaggerApi {
    fn default() -> Self {
        Self::new()
    }
}
