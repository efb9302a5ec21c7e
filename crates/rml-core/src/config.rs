use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RmlError};

pub const RMLSTREAMER_RELEASE: &str =
    "https://github.com/RMLio/RMLStreamer/releases/download/v2.4.2/RMLStreamer-2.4.2-standalone.jar";
pub const RMLMAPPER_RELEASE: &str =
    "https://github.com/RMLio/rmlmapper-java/releases/download/v6.1.3/rmlmapper-6.1.3-r367-all.jar";

/// Top-level runner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Program and leading arguments placed before the artifact path.
    #[serde(default = "default_launcher")]
    pub launcher: Vec<String>,
    /// Release used for one-shot pipeline runs.
    #[serde(default = "default_streamer_release")]
    pub streamer_release: String,
    /// Release used for continuous chunk mapping.
    #[serde(default = "default_mapper_release")]
    pub mapper_release: String,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    /// How much of the engine's stderr to keep for error reports.
    #[serde(default = "default_stderr_tail_bytes")]
    pub stderr_tail_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            launcher: default_launcher(),
            streamer_release: default_streamer_release(),
            mapper_release: default_mapper_release(),
            download_timeout_secs: default_download_timeout(),
            stderr_tail_bytes: default_stderr_tail_bytes(),
        }
    }
}

fn default_launcher() -> Vec<String> {
    vec!["java".to_string(), "-jar".to_string()]
}
fn default_streamer_release() -> String { RMLSTREAMER_RELEASE.to_string() }
fn default_mapper_release() -> String { RMLMAPPER_RELEASE.to_string() }
fn default_download_timeout() -> u64 { 600 }
fn default_stderr_tail_bytes() -> usize { 8192 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for mapping, staging, and downloaded artifact files.
    /// Default: the OS temp dir.
    #[serde(default)]
    pub temp_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "rml_runner=info,rml_engine=info,rml_mapping=info,warn".to_string()
}

impl RunnerConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| RmlError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| RmlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.launcher.is_empty() {
            return Err(RmlError::Config(
                "engine.launcher must name at least a program".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the scratch directory (expand ~).
    pub fn temp_dir(&self) -> PathBuf {
        match self.paths.temp_dir.as_deref() {
            Some(dir) => {
                if let Some(rest) = dir.strip_prefix("~/") {
                    if let Some(home) = dirs_home() {
                        return home.join(rest);
                    }
                }
                PathBuf::from(dir)
            }
            None => std::env::temp_dir(),
        }
    }
}

/// Substitute `${NAME}` and `${NAME:-fallback}` references from the process
/// environment.
///
/// An unset variable without a fallback, or an unterminated `${`, is left as
/// written so the TOML error points at it.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let reference = &after[..end];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        match (std::env::var(name), fallback) {
            (Ok(value), _) => out.push_str(&value),
            (Err(_), Some(fallback)) => out.push_str(fallback),
            (Err(_), None) => out.push_str(&rest[start..start + 3 + end]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_RML_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_RML_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_RML_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_RML_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_RML_VAR}\"");
    }

    #[test]
    fn test_expand_env_vars_fallback() {
        std::env::remove_var("RML_UNSET_WITH_FALLBACK");
        let result = expand_env_vars("dir = \"${RML_UNSET_WITH_FALLBACK:-/var/tmp}/rml\"");
        assert_eq!(result, "dir = \"/var/tmp/rml\"");

        std::env::set_var("RML_SET_WITH_FALLBACK", "/scratch");
        let result = expand_env_vars("dir = \"${RML_SET_WITH_FALLBACK:-/var/tmp}\"");
        assert_eq!(result, "dir = \"/scratch\"");
        std::env::remove_var("RML_SET_WITH_FALLBACK");
    }

    #[test]
    fn test_expand_env_vars_unterminated() {
        assert_eq!(expand_env_vars("a = \"${OOPS\""), "a = \"${OOPS\"");
        assert_eq!(expand_env_vars("cost = \"$5\""), "cost = \"$5\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.launcher, vec!["java", "-jar"]);
        assert_eq!(config.engine.streamer_release, RMLSTREAMER_RELEASE);
        assert_eq!(config.engine.mapper_release, RMLMAPPER_RELEASE);
        assert_eq!(config.engine.stderr_tail_bytes, 8192);
        assert_eq!(config.temp_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_temp_dir_expands_home() {
        let config = RunnerConfig {
            paths: PathsConfig {
                temp_dir: Some("~/scratch".into()),
            },
            ..Default::default()
        };
        if let Some(home) = dirs_home() {
            assert_eq!(config.temp_dir(), home.join("scratch"));
        }
    }

    #[test]
    fn test_empty_launcher_rejected() {
        let config: RunnerConfig = toml::from_str("[engine]\nlauncher = []\n").unwrap();
        assert!(matches!(config.validate(), Err(RmlError::Config(_))));
    }
}
