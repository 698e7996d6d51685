//! Runtime configuration from `FACEGREP_*` environment variables with an
//! optional TOML file underneath. Environment wins over the file; the file
//! wins over built-in defaults. Only the API key is mandatory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use facegrep_core::gemini::GeminiConfig;
use serde::Deserialize;
use thiserror::Error;

pub const API_KEY_ENV: &str = "FACEGREP_API_KEY";
pub const API_KEY_FALLBACK_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_ENV: &str = "FACEGREP_MODEL";
pub const BASE_URL_ENV: &str = "FACEGREP_BASE_URL";
pub const TIMEOUT_ENV: &str = "FACEGREP_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "no API key configured; set {API_KEY_ENV} (or {API_KEY_FALLBACK_ENV}), \
         or put api_key in the facegrep config file"
    )]
    MissingApiKey,
    #[error("failed to read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid TOML: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Optional file at `<config dir>/facegrep/config.toml`.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolve the classifier configuration from the real environment and the
/// default config file location.
pub fn load() -> Result<GeminiConfig, ConfigError> {
    let file = read_config_file(default_config_path().as_deref())?;
    resolve(file, |key| std::env::var(key).ok())
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("facegrep").join("config.toml"))
}

fn read_config_file(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let Some(path) = path else {
        return Ok(ConfigFile::default());
    };
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ConfigFile::default());
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve(
    file: ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> Result<GeminiConfig, ConfigError> {
    let api_key = env(API_KEY_ENV)
        .or_else(|| env(API_KEY_FALLBACK_ENV))
        .or(file.api_key)
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingApiKey)?;

    let mut config = GeminiConfig::new(api_key);
    if let Some(model) = env(MODEL_ENV).or(file.model) {
        config.model = model;
    }
    if let Some(base_url) = env(BASE_URL_ENV).or(file.base_url) {
        config.base_url = base_url;
    }
    // An unparsable timeout env value falls through to the file, then the
    // default.
    if let Some(secs) = env(TIMEOUT_ENV)
        .and_then(|value| value.parse().ok())
        .or(file.timeout_secs)
    {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use facegrep_core::gemini;

    use super::*;

    fn env_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn test_missing_key_everywhere_is_fatal() {
        let error = resolve(ConfigFile::default(), env_from(&[])).unwrap_err();
        assert!(matches!(error, ConfigError::MissingApiKey));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let error = resolve(
            ConfigFile::default(),
            env_from(&[("FACEGREP_API_KEY", "   ")]),
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::MissingApiKey));
    }

    #[test]
    fn test_defaults_apply_when_only_key_is_set() {
        let config = resolve(
            ConfigFile::default(),
            env_from(&[("FACEGREP_API_KEY", "k1")]),
        )
        .unwrap();
        assert_eq!(config.api_key, "k1");
        assert_eq!(config.model, gemini::DEFAULT_MODEL);
        assert_eq!(config.base_url, gemini::DEFAULT_BASE_URL);
        assert_eq!(config.timeout, gemini::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_primary_env_beats_fallback_and_file() {
        let file = ConfigFile {
            api_key: Some("from-file".into()),
            ..ConfigFile::default()
        };
        let config = resolve(
            file,
            env_from(&[
                ("FACEGREP_API_KEY", "primary"),
                ("GEMINI_API_KEY", "fallback"),
            ]),
        )
        .unwrap();
        assert_eq!(config.api_key, "primary");
    }

    #[test]
    fn test_fallback_env_used_when_primary_absent() {
        let config = resolve(
            ConfigFile::default(),
            env_from(&[("GEMINI_API_KEY", "fallback")]),
        )
        .unwrap();
        assert_eq!(config.api_key, "fallback");
    }

    #[test]
    fn test_file_fills_what_env_leaves_unset() {
        let file = ConfigFile {
            api_key: Some("from-file".into()),
            model: Some("gemini-2.5-pro".into()),
            base_url: Some("http://localhost:9090".into()),
            timeout_secs: Some(5),
        };
        let config = resolve(file, env_from(&[])).unwrap();
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.base_url, "http://localhost:9090");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_overrides_file_settings() {
        let file = ConfigFile {
            api_key: Some("k".into()),
            model: Some("file-model".into()),
            timeout_secs: Some(5),
            ..ConfigFile::default()
        };
        let config = resolve(
            file,
            env_from(&[
                ("FACEGREP_MODEL", "env-model"),
                ("FACEGREP_TIMEOUT_SECS", "120"),
            ]),
        )
        .unwrap();
        assert_eq!(config.model, "env-model");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_garbled_timeout_env_falls_through() {
        let file = ConfigFile {
            api_key: Some("k".into()),
            timeout_secs: Some(5),
            ..ConfigFile::default()
        };
        let config = resolve(
            file,
            env_from(&[("FACEGREP_TIMEOUT_SECS", "soon")]),
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_file_missing_is_fine() {
        let file = read_config_file(Some(Path::new("/nonexistent/facegrep.toml"))).unwrap();
        assert!(file.api_key.is_none());
    }

    #[test]
    fn test_config_file_parses() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "api_key = \"k\"\ntimeout_secs = 30\n").unwrap();

        let file = read_config_file(Some(&path)).unwrap();
        assert_eq!(file.api_key.as_deref(), Some("k"));
        assert_eq!(file.timeout_secs, Some(30));
        assert!(file.model.is_none());
    }

    #[test]
    fn test_config_file_rejects_bad_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "api_key = [unclosed").unwrap();

        let error = read_config_file(Some(&path)).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { .. }));
    }
}
