use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_MEDIA_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_REPLICATE_API_BASE: &str = "https://api.replicate.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("Failed to read generation config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse generation config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Model version and fixed input parameters sent with every prediction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    pub version: String,
    #[serde(default)]
    pub input: Map<String, Value>,
}

impl GenerationConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: GenerationConfig = serde_yaml::from_str(yaml)?;
        if config.version.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "version",
                reason: "model version is empty".to_string(),
            });
        }
        Ok(config)
    }

    /// Prediction input for one image: the configured parameters plus `image`.
    pub fn input_for(&self, image_url: &str) -> Value {
        let mut input = self.input.clone();
        input.insert("image".to_string(), Value::String(image_url.to_string()));
        Value::Object(input)
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub upload_url: Url,
    pub upload_preset: String,
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_base: Url,
    pub api_token: String,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub frontend_dir: String,
    pub media: MediaConfig,
    pub replicate: ReplicateConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let generation_path = env::var("GENERATION_CONFIG").unwrap_or_else(|_| {
            match env::var("CARGO_MANIFEST_DIR") {
                Ok(manifest_dir) => format!("{}/../config/generation.yaml", manifest_dir),
                Err(_) => "config/generation.yaml".to_string(),
            }
        });
        log::info!("Loading generation config from {}", generation_path);
        let generation = GenerationConfig::load(&generation_path)?;

        Self::from_lookup(|name| env::var(name).ok(), generation)
    }

    pub fn from_lookup<F>(lookup: F, generation: GenerationConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{}' is not a port number", port),
            })?,
            None => DEFAULT_PORT,
        };

        let frontend_dir =
            lookup("FRONTEND_DIR").unwrap_or_else(|| match lookup("CARGO_MANIFEST_DIR") {
                Some(manifest_dir) => format!("{}/../frontend/dist", manifest_dir),
                None => "/usr/src/app/frontend/dist".to_string(),
            });

        let cloud_name = required("CLOUDINARY_CLOUD_NAME")?;
        let media_base = parse_url(
            "CLOUDINARY_API_BASE",
            &lookup("CLOUDINARY_API_BASE").unwrap_or_else(|| DEFAULT_MEDIA_API_BASE.to_string()),
        )?;
        let upload_url = media_base
            .join(&format!("v1_1/{}/image/upload", cloud_name))
            .map_err(|e| ConfigError::Invalid {
                name: "CLOUDINARY_CLOUD_NAME",
                reason: e.to_string(),
            })?;

        let media = MediaConfig {
            upload_url,
            upload_preset: required("CLOUDINARY_UPLOAD_PRESET")?,
        };

        let replicate = ReplicateConfig {
            api_base: parse_url(
                "REPLICATE_API_BASE",
                &lookup("REPLICATE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_REPLICATE_API_BASE.to_string()),
            )?,
            api_token: required("REPLICATE_API_TOKEN")?,
            generation,
        };

        Ok(Self {
            port,
            frontend_dir,
            media,
            replicate,
        })
    }
}

/// Parses an API base. The path always ends in `/` so relative joins extend a
/// proxy prefix instead of replacing its last segment.
fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
