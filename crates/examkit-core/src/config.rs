//! examkit configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::driver::DriverConfig;

/// Top-level examkit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamkitConfig {
    /// Directory of TOML exam files.
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,
    /// Output directory for score reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Clock resolution of a running session in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Pause between accepting a submission and sealing it.
    #[serde(default)]
    pub submit_ack_delay_ms: u64,
    /// Remaining time at which the low-time warning fires.
    #[serde(default = "default_low_time_warning")]
    pub low_time_warning_secs: u64,
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("./exams")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./examkit-results")
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_low_time_warning() -> u64 {
    300
}

impl Default for ExamkitConfig {
    fn default() -> Self {
        Self {
            catalog_dir: default_catalog_dir(),
            output_dir: default_output_dir(),
            tick_interval_ms: default_tick_interval(),
            submit_ack_delay_ms: 0,
            low_time_warning_secs: default_low_time_warning(),
        }
    }
}

impl ExamkitConfig {
    /// Settings for a session driver.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            submit_ack_delay: Duration::from_millis(self.submit_ack_delay_ms),
            low_time_warning_secs: self.low_time_warning_secs,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are not scanned again, so a value containing `${...}`
/// is kept literally.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(p: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&p.to_string_lossy()))
}

/// Load config from an explicit path, or search the well-known paths.
///
/// Search order when no path is given:
/// 1. `examkit.toml` in the current directory
/// 2. `~/.config/examkit/config.toml`
///
/// Environment variable override: `EXAMKIT_CATALOG_DIR`.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamkitConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examkit.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamkitConfig::default(),
    };

    if let Ok(dir) = std::env::var("EXAMKIT_CATALOG_DIR") {
        config.catalog_dir = PathBuf::from(dir);
    }

    config.catalog_dir = resolve_path(&config.catalog_dir);
    config.output_dir = resolve_path(&config.output_dir);

    Ok(config)
}

/// Parse and check a config document.
pub fn parse_config(content: &str) -> Result<ExamkitConfig> {
    let config: ExamkitConfig = toml::from_str(content)?;
    anyhow::ensure!(config.tick_interval_ms > 0, "tick_interval_ms must be positive");
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examkit"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMKIT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAMKIT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_EXAMKIT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no vars"), "no vars");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_EXAMKIT_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_expand_values() {
        std::env::set_var("_EXAMKIT_SELF_REF", "${_EXAMKIT_SELF_REF}");
        assert_eq!(
            resolve_env_vars("${_EXAMKIT_SELF_REF}"),
            "${_EXAMKIT_SELF_REF}"
        );
        std::env::set_var("_EXAMKIT_NESTED", "${HOME}/exams");
        assert_eq!(
            resolve_env_vars("dir=${_EXAMKIT_NESTED}!"),
            "dir=${HOME}/exams!"
        );
        std::env::remove_var("_EXAMKIT_SELF_REF");
        std::env::remove_var("_EXAMKIT_NESTED");
    }

    #[test]
    fn default_config() {
        let config = ExamkitConfig::default();
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.low_time_warning_secs, 300);
        assert_eq!(config.catalog_dir, PathBuf::from("./exams"));

        let driver = config.driver_config();
        assert_eq!(driver.tick_interval, Duration::from_secs(1));
        assert_eq!(driver.submit_ack_delay, Duration::ZERO);
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
catalog_dir = "/srv/exams"
submit_ack_delay_ms = 2000
"#,
        )
        .unwrap();
        assert_eq!(config.catalog_dir, PathBuf::from("/srv/exams"));
        assert_eq!(config.submit_ack_delay_ms, 2000);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(
            config.driver_config().submit_ack_delay,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn parse_rejects_bad_values() {
        assert!(parse_config("low_time_warning_secs = -5").is_err());
        assert!(parse_config("tick_interval_ms = 0").is_err());
        assert!(parse_config("tick_interval_ms = \"fast\"").is_err());
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examkit.toml");
        std::fs::write(&path, "output_dir = \"${_EXAMKIT_OUT_DIR}/reports\"\n").unwrap();
        std::env::set_var("_EXAMKIT_OUT_DIR", "/tmp/examkit");

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/examkit/reports"));
        std::env::remove_var("_EXAMKIT_OUT_DIR");

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
