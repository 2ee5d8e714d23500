//! Layered configuration for the seeding binary.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`FLOWSEED_*`, `__` separates nested keys, e.g.
//!    `FLOWSEED_DATABASE__PATH`).
//! 2. A TOML file (explicit path, or `flowseed.toml` in the working directory).
//! 3. Built-in defaults, including the default seed plan.

use crate::service::seed_plan::SeedPlan;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "flowseed.toml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "FLOWSEED_";

#[derive(Debug)]
pub enum ConfigError {
    /// Figment extraction or merge failure.
    Figment(Box<figment::Error>),
    /// Explicitly requested config file does not exist.
    MissingFile(PathBuf),
    /// A field has an unusable value.
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Figment(err) => write!(f, "configuration error: {err}"),
            Self::MissingFile(path) => {
                write!(f, "configuration file not found: {}", path.display())
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid configuration value for `{field}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Figment(err) => Some(&**err),
            Self::MissingFile(_) | Self::InvalidValue { .. } => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Figment(Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file backing the engine store.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("flowseed.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`.
    pub level: String,
    /// Directory for rolling log files; relative paths resolve against the
    /// working directory.
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourcesConfig {
    /// Root directory holding process definitions and seed attachments.
    pub dir: PathBuf,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("processes"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlowseedConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub seed: SeedPlan,
}

impl FlowseedConfig {
    /// Loads defaults, then `flowseed.toml` if present, then environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, using `config_file` instead of the default file.
    ///
    /// # Errors
    /// - `MissingFile` when `config_file` is given but does not exist.
    /// - `Figment` when a source cannot be parsed into the config shape.
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) if !path.exists() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()))
            }
            Some(path) => Some(path.to_path_buf()),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            }
        };

        let config: Self = Self::figment(file.as_deref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the provider chain; public so tests can layer extra sources.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path",
                reason: "must not be empty".to_string(),
            });
        }
        if let Err(err) = crate::logging::normalize_level(&self.logging.level) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                reason: err.to_string(),
            });
        }
        if self.seed.deployment.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "seed.deployment.name",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(user) = self
            .seed
            .users
            .iter()
            .find(|user| user.profile.len() % 2 != 0)
        {
            return Err(ConfigError::InvalidValue {
                field: "seed.users.profile",
                reason: format!(
                    "user `{}` has {} entries; expected key/value pairs",
                    user.id,
                    user.profile.len()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, FlowseedConfig};
    use crate::model::identity::GroupType;
    use figment::Jail;
    use std::path::{Path, PathBuf};

    #[test]
    fn defaults_carry_the_builtin_plan() {
        let config = FlowseedConfig::default();
        assert_eq!(config.database.path, PathBuf::from("flowseed.sqlite3"));
        assert_eq!(config.seed.groups.len(), 4);
        assert_eq!(config.seed.deployment.resources.len(), 16);
    }

    #[test]
    fn toml_file_overrides_defaults_and_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "flowseed.toml",
                r#"
                [database]
                path = "from-file.sqlite3"

                [logging]
                level = "warn"
                dir = "/var/log/flowseed"

                [[seed.groups]]
                id = "ops"
                type = "security-role"
                "#,
            )?;
            jail.set_env("FLOWSEED_DATABASE__PATH", "from-env.sqlite3");

            let config = FlowseedConfig::load().expect("config should load");
            assert_eq!(config.database.path, PathBuf::from("from-env.sqlite3"));
            assert_eq!(config.logging.level, "warn");
            assert_eq!(config.seed.groups.len(), 1);
            assert_eq!(config.seed.groups[0].kind, GroupType::SecurityRole);
            assert_eq!(config.seed.deployment.resources.len(), 16);
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = FlowseedConfig::load_from(Some(Path::new("/definitely/missing.toml")))
            .expect_err("missing explicit file must fail");
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn unknown_log_level_from_env_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("FLOWSEED_LOGGING__LEVEL", "verbose");
            let err = FlowseedConfig::load().expect_err("unknown level must fail");
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    field: "logging.level",
                    ..
                }
            ));
            Ok(())
        });
    }

    #[test]
    fn odd_profile_list_in_config_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "seed.toml",
                r#"
                [[seed.users]]
                id = "kermit"
                first_name = "Kermit"
                last_name = "The Frog"
                password = "kermit"
                email = "kermit@example.org"
                profile = ["jobTitle", "Muppet", "location"]
                "#,
            )?;

            let err = FlowseedConfig::load_from(Some(Path::new("seed.toml")))
                .expect_err("odd profile list must fail");
            assert!(matches!(
                err,
                ConfigError::InvalidValue {
                    field: "seed.users.profile",
                    ..
                }
            ));
            Ok(())
        });
    }
}
