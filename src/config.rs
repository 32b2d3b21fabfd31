use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;
use crate::manifest::ModelManifest;

pub const DEFAULT_MODEL_BASE_URL: &str =
    "https://raw.githubusercontent.com/justadudewhohacks/face-api.js/master/weights";

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Server configuration, built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address.
    pub host: IpAddr,
    pub port: u16,
    /// Flat directory holding provisioned model files.
    pub models_dir: PathBuf,
    /// Pre-populated front-end assets.
    pub static_dir: PathBuf,
    /// Directory containing `index.html`.
    pub templates_dir: PathBuf,
    /// Remote location of the weight files, without a trailing slash.
    pub model_base_url: String,
    /// Timeout applied to each download request.
    pub download_timeout: Duration,
    pub manifest: ModelManifest,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match lookup("HOST") {
            Some(v) => v.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                key: "HOST",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match lookup("PORT") {
            Some(v) => v.parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                key: "PORT",
                value: v.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match lookup("DOWNLOAD_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "DOWNLOAD_TIMEOUT_SECS",
                        value: v,
                        reason: "timeout must be positive".to_string(),
                    })
                }
                Ok(secs) => secs,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: "DOWNLOAD_TIMEOUT_SECS",
                        value: v,
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        };

        let base_url = lookup("MODEL_BASE_URL").unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string());

        Ok(Self {
            host,
            port,
            models_dir: dir_var(&lookup, "MODELS_DIR", "models"),
            static_dir: dir_var(&lookup, "STATIC_DIR", "static"),
            templates_dir: dir_var(&lookup, "TEMPLATES_DIR", "templates"),
            model_base_url: normalize_base_url(&base_url)?,
            download_timeout: Duration::from_secs(timeout_secs),
            manifest: ModelManifest::face_api(),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn index_template(&self) -> PathBuf {
        self.templates_dir.join("index.html")
    }
}

fn dir_var<F>(lookup: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Check the URL is absolute http(s) and strip trailing slashes so that
/// `base + "/" + file` never produces `//`.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {other:?}"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert_eq!(config.index_template(), PathBuf::from("templates/index.html"));
        assert_eq!(config.model_base_url, DEFAULT_MODEL_BASE_URL);
        assert_eq!(config.download_timeout, Duration::from_secs(30));
        assert_eq!(config.manifest, ModelManifest::face_api());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("MODELS_DIR", "/var/lib/faces/models"),
            ("MODEL_BASE_URL", "http://mirror.local/weights/"),
            ("DOWNLOAD_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.models_dir, PathBuf::from("/var/lib/faces/models"));
        assert_eq!(config.model_base_url, "http://mirror.local/weights");
        assert_eq!(config.download_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "http")])),
            Err(ConfigError::InvalidValue { key: "PORT", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("DOWNLOAD_TIMEOUT_SECS", "0")])),
            Err(ConfigError::InvalidValue { key: "DOWNLOAD_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("MODEL_BASE_URL", "ftp://example.com/weights")])),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("MODEL_BASE_URL", "weights")])),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }
}
