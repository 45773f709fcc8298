//! Server configuration read from the process environment.

use std::path::PathBuf;

/// Trained classifier, relative to the working directory.
pub const MODEL_PATH: &str = "catboost_crop_disease_model.onnx";
/// Label decoder mapping class indices to disease names.
pub const DECODER_PATH: &str = "crop_disease_label_encoder.json";

/// Locations of the two artifacts loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub model: PathBuf,
    pub decoder: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from(MODEL_PATH),
            decoder: PathBuf::from(DECODER_PATH),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    /// Reads `HOST`, `PORT` and `WORKERS`, keeping defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let workers = lookup("WORKERS")
            .and_then(|w| w.parse().ok())
            .filter(|w: &usize| *w > 0)
            .unwrap_or(defaults.workers);

        Self {
            host,
            port,
            workers,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
