use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STAGING_DIR: &str = "uploads";
const DEFAULT_OUTPUT_DIR: &str = "static/pdf";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_MB: usize = 25;

/// How Word documents are turned into PDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordEngine {
    /// Re-lay the paragraph text with the built-in PDF writer.
    #[default]
    Reflow,
    /// Hand the document to the configured renderer, falling back to reflow
    /// when none is configured.
    Renderer,
}

impl WordEngine {
    fn from_env_value(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reflow" => Ok(WordEngine::Reflow),
            "renderer" => Ok(WordEngine::Renderer),
            other => Err(anyhow!(
                "unknown word engine `{other}` (expected `reflow` or `renderer`)"
            )),
        }
    }
}

/// Startup configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    pub soffice_bin: Option<PathBuf>,
    pub render_timeout: Duration,
    pub word_engine: WordEngine,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            soffice_bin: None,
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            word_engine: WordEngine::Reflow,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("PORT must be a port number, got `{value}`"))?,
            None => defaults.port,
        };

        let render_timeout = match get("PDFDESK_RENDER_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value.parse().with_context(|| {
                    format!("PDFDESK_RENDER_TIMEOUT_SECS must be a number, got `{value}`")
                })?;
                if secs == 0 {
                    return Err(anyhow!("PDFDESK_RENDER_TIMEOUT_SECS must be greater than 0"));
                }
                Duration::from_secs(secs)
            }
            None => defaults.render_timeout,
        };

        let max_upload_bytes = match get("PDFDESK_MAX_UPLOAD_MB") {
            Some(value) => {
                let mb: usize = value.parse().with_context(|| {
                    format!("PDFDESK_MAX_UPLOAD_MB must be a number, got `{value}`")
                })?;
                mb.checked_mul(1024 * 1024).ok_or_else(|| {
                    anyhow!("PDFDESK_MAX_UPLOAD_MB is too large, got `{value}`")
                })?
            }
            None => defaults.max_upload_bytes,
        };

        let word_engine = match get("PDFDESK_WORD_ENGINE") {
            Some(value) => WordEngine::from_env_value(&value)?,
            None => defaults.word_engine,
        };

        Ok(Self {
            port,
            staging_dir: get("PDFDESK_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            output_dir: get("PDFDESK_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            soffice_bin: get("PDFDESK_SOFFICE_BIN").map(PathBuf::from),
            render_timeout,
            word_engine,
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.staging_dir, PathBuf::from("uploads"));
        assert_eq!(config.output_dir, PathBuf::from("static/pdf"));
        assert!(config.soffice_bin.is_none());
        assert_eq!(config.render_timeout, Duration::from_secs(120));
        assert_eq!(config.word_engine, WordEngine::Reflow);
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("PDFDESK_STAGING_DIR", "/tmp/in"),
            ("PDFDESK_OUTPUT_DIR", "/tmp/out"),
            ("PDFDESK_SOFFICE_BIN", "/usr/bin/soffice"),
            ("PDFDESK_RENDER_TIMEOUT_SECS", "15"),
            ("PDFDESK_WORD_ENGINE", "Renderer"),
            ("PDFDESK_MAX_UPLOAD_MB", "2"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/in"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.soffice_bin, Some(PathBuf::from("/usr/bin/soffice")));
        assert_eq!(config.render_timeout, Duration::from_secs(15));
        assert_eq!(config.word_engine, WordEngine::Renderer);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("PDFDESK_SOFFICE_BIN", "  "), ("PORT", "")]).unwrap();
        assert!(config.soffice_bin.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("PDFDESK_RENDER_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_from(&[("PDFDESK_WORD_ENGINE", "magic")]).is_err());
    }

    #[test]
    fn oversized_upload_cap_is_rejected() {
        let huge = (usize::MAX / 1024).to_string();
        let err = config_from(&[("PDFDESK_MAX_UPLOAD_MB", huge.as_str())]).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
