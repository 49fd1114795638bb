//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Project file used when `--project` is not given.
    pub project_path: Option<PathBuf>,
    /// Default grid step for `coda resample`.
    pub resample_step_ms: i64,
    /// Default onset/offset tolerance for `coda check-rel`.
    pub time_tolerance_ms: i64,
    /// Default minimum uncovered span for continuous reliability checks.
    pub continuous_threshold_ms: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: None,
            resample_step_ms: 1000,
            time_tolerance_ms: 0,
            continuous_threshold_ms: 500,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the user config file, `config_path`,
    /// then `CODA_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("CODA_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for coda.
///
/// On Linux: `~/.config/coda`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("coda"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use figment::Jail;

    #[test]
    fn test_defaults_apply_without_sources() {
        Jail::expect_with(|jail| {
            jail.set_env("HOME", jail.directory().display().to_string());
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("cfg").display().to_string());
            let config = Config::load()?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("cfg").display().to_string());
            jail.create_file(
                "coda.toml",
                r#"
                project_path = "study.coda"
                resample_step_ms = 250
                time_tolerance_ms = 33
                "#,
            )?;
            jail.set_env("CODA_TIME_TOLERANCE_MS", "50");

            let config = Config::load_from(Some(Path::new("coda.toml")))?;
            assert_eq!(config.project_path, Some(PathBuf::from("study.coda")));
            assert_eq!(config.resample_step_ms, 250);
            assert_eq!(config.time_tolerance_ms, 50);
            assert_eq!(config.continuous_threshold_ms, 500);
            Ok(())
        });
    }

    #[test]
    fn test_dirs_config_path_ends_with_coda() {
        if let Some(path) = dirs_config_path() {
            assert_eq!(path.file_name().unwrap(), "coda");
        }
    }
}
