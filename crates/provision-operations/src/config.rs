use std::fs;
use std::path::{Path, PathBuf};

use provision_pool::{IpPool, Ipv4Range, PoolError};
use provision_saga::RollbackOrder;
use serde::Deserialize;
use thiserror::Error;

use crate::operations::SetupSettings;
use crate::password::{DEFAULT_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

pub const DEFAULT_CONFIG_FILE: &str = "provision.toml";
pub const DEFAULT_DATA_DIR: &str = ".provision";
pub const DEFAULT_CONTAINER_PREFIX: &str = "provision";
pub const DEFAULT_NETWORK: &str = "virt";
pub const DEFAULT_PLAN_COMMAND: &str = "plan";
pub const DEFAULT_INTERFACE: &str = "eth0";
pub const DEFAULT_ENGINE: &str = "docker";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationOrder {
    /// Undo steps in the order they ran.
    #[default]
    Forward,
    /// Undo the most recent step first.
    Reverse,
}

impl From<CompensationOrder> for RollbackOrder {
    fn from(order: CompensationOrder) -> Self {
        match order {
            CompensationOrder::Forward => Self::Forward,
            CompensationOrder::Reverse => Self::Reverse,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    app_name: String,
    data_dir: Option<PathBuf>,
    pool: PoolSection,
    #[serde(default)]
    container: ContainerSection,
    #[serde(default)]
    network: NetworkSection,
    #[serde(default)]
    saga: SagaSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolSection {
    local: Ipv4Range,
    global: Ipv4Range,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContainerSection {
    engine: Option<String>,
    prefix: Option<String>,
    network: Option<String>,
    plan_command: Option<String>,
    password_length: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkSection {
    interface: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SagaSection {
    #[serde(default)]
    compensation_order: CompensationOrder,
}

/// Validated `provision.toml`.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    app_name: String,
    data_dir: PathBuf,
    local_range: Ipv4Range,
    global_range: Ipv4Range,
    engine: String,
    container_prefix: String,
    network: String,
    plan_command: String,
    password_length: usize,
    interface: String,
    compensation_order: CompensationOrder,
}

impl ProvisionConfig {
    /// Read and validate a config file. A relative `data_dir` is resolved
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base).map_err(|err| match err {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Config(err) => err,
        })
    }

    /// Parse config text, resolving a relative `data_dir` against `base`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the text is not a valid config.
    pub fn from_toml_str(content: &str, base: &Path) -> Result<Self, ConfigError> {
        Self::parse(content, base).map_err(|err| match err {
            ParseFailure::Toml(source) => ConfigError::Parse {
                path: base.join(DEFAULT_CONFIG_FILE),
                source,
            },
            ParseFailure::Config(err) => err,
        })
    }

    fn parse(content: &str, base: &Path) -> Result<Self, ParseFailure> {
        let file: ConfigFile = toml::from_str(content).map_err(ParseFailure::Toml)?;
        Self::from_file(file, base).map_err(ParseFailure::Config)
    }

    fn from_file(file: ConfigFile, base: &Path) -> Result<Self, ConfigError> {
        let app_name = file.app_name.trim().to_string();
        if app_name.is_empty() {
            return Err(invalid("app_name", "must not be empty"));
        }
        if !app_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid(
                "app_name",
                "may only contain ASCII letters, digits, '-' and '_'",
            ));
        }

        if file.pool.local.overlaps(&file.pool.global) {
            return Err(invalid(
                "pool",
                format!(
                    "local range {} overlaps global range {}",
                    file.pool.local, file.pool.global
                ),
            ));
        }

        let password_length = file
            .container
            .password_length
            .unwrap_or(DEFAULT_PASSWORD_LENGTH);
        if password_length < MIN_PASSWORD_LENGTH {
            return Err(invalid(
                "container.password_length",
                format!("must be at least {MIN_PASSWORD_LENGTH}"),
            ));
        }

        let plan_command = non_empty(
            "container.plan_command",
            file.container.plan_command,
            DEFAULT_PLAN_COMMAND,
        )?;

        let data_dir = file
            .data_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            base.join(data_dir)
        };

        Ok(Self {
            app_name,
            data_dir,
            local_range: file.pool.local,
            global_range: file.pool.global,
            engine: non_empty("container.engine", file.container.engine, DEFAULT_ENGINE)?,
            container_prefix: non_empty(
                "container.prefix",
                file.container.prefix,
                DEFAULT_CONTAINER_PREFIX,
            )?,
            network: non_empty("container.network", file.container.network, DEFAULT_NETWORK)?,
            plan_command,
            password_length,
            interface: non_empty("network.interface", file.network.interface, DEFAULT_INTERFACE)?,
            compensation_order: file.saga.compensation_order,
        })
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn local_range(&self) -> Ipv4Range {
        self.local_range
    }

    #[must_use]
    pub fn global_range(&self) -> Ipv4Range {
        self.global_range
    }

    /// Container engine executable.
    #[must_use]
    pub fn engine(&self) -> &str {
        &self.engine
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    #[must_use]
    pub fn compensation_order(&self) -> CompensationOrder {
        self.compensation_order
    }

    /// # Errors
    ///
    /// Returns `PoolError` if the configured ranges cannot form a pool.
    pub fn build_pool(&self) -> Result<IpPool, PoolError> {
        IpPool::new(self.local_range, self.global_range)
    }

    #[must_use]
    pub fn setup_settings(&self) -> SetupSettings {
        SetupSettings::new(&self.app_name)
            .with_container_prefix(&self.container_prefix)
            .with_network(&self.network)
            .with_plan_command(&self.plan_command)
            .with_password_length(self.password_length)
            .with_rollback_order(self.compensation_order.into())
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Config(ConfigError),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn non_empty(
    field: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<String, ConfigError> {
    match value {
        None => Ok(default.to_string()),
        Some(value) if value.trim().is_empty() => Err(invalid(field, "must not be empty")),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
app_name = "shop"

[pool]
local = "192.168.0.2-192.168.0.254"
global = "10.0.0.0/28"
"#;

    #[test]
    fn minimal_config_uses_defaults() -> anyhow::Result<()> {
        let config = ProvisionConfig::from_toml_str(MINIMAL, Path::new("/srv/shop"))?;

        assert_eq!(config.app_name(), "shop");
        assert_eq!(config.data_dir(), Path::new("/srv/shop/.provision"));
        assert_eq!(config.interface(), "eth0");
        assert_eq!(config.engine(), "docker");
        assert_eq!(config.compensation_order(), CompensationOrder::Forward);
        assert_eq!(config.local_range().len(), 253);
        assert_eq!(config.global_range().len(), 14);

        let settings = config.setup_settings();
        assert_eq!(settings.container_prefix(), "provision");
        assert_eq!(settings.network(), "virt");
        assert_eq!(settings.plan_command(), vec!["plan"]);
        assert_eq!(settings.password_length(), 10);
        assert_eq!(settings.rollback_order(), RollbackOrder::Forward);
        Ok(())
    }

    #[test]
    fn sections_override_defaults() -> anyhow::Result<()> {
        let content = format!(
            "{MINIMAL}
[container]
engine = \"podman\"
prefix = \"acme\"
network = \"backplane\"
plan_command = \"/opt/hooks/plan --json\"
password_length = 16

[network]
interface = \"ens3\"

[saga]
compensation_order = \"reverse\"
"
        );

        let config = ProvisionConfig::from_toml_str(&content, Path::new("/srv"))?;
        let settings = config.setup_settings();

        assert_eq!(settings.container_prefix(), "acme");
        assert_eq!(settings.network(), "backplane");
        assert_eq!(settings.plan_command(), vec!["/opt/hooks/plan", "--json"]);
        assert_eq!(settings.password_length(), 16);
        assert_eq!(settings.rollback_order(), RollbackOrder::Reverse);
        assert_eq!(config.interface(), "ens3");
        assert_eq!(config.engine(), "podman");
        Ok(())
    }

    #[test]
    fn overlapping_pools_are_rejected() {
        let content = r#"
app_name = "shop"

[pool]
local = "10.0.0.0/24"
global = "10.0.0.128/25"
"#;

        let err = ProvisionConfig::from_toml_str(content, Path::new("/srv"))
            .expect_err("should reject overlap");

        assert!(matches!(err, ConfigError::Invalid { field: "pool", .. }));
    }

    #[test]
    fn short_passwords_are_rejected() {
        let content = format!("{MINIMAL}\n[container]\npassword_length = 6\n");

        let err = ProvisionConfig::from_toml_str(&content, Path::new("/srv"))
            .expect_err("should reject short passwords");

        assert_eq!(
            err.to_string(),
            "invalid config value for 'container.password_length': must be at least 8"
        );
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let content = format!("{MINIMAL}\n[saga]\nretries = 3\n");

        let err = ProvisionConfig::from_toml_str(&content, Path::new("/srv"))
            .expect_err("should reject unknown key");

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn app_name_must_be_a_plain_identifier() {
        let content = MINIMAL.replace("\"shop\"", "\"my shop\"");

        let err = ProvisionConfig::from_toml_str(&content, Path::new("/srv"))
            .expect_err("should reject spaces");

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "app_name",
                ..
            }
        ));
    }

    #[test]
    fn load_reads_file_next_to_data_dir() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, MINIMAL)?;

        let config = ProvisionConfig::load(&path)?;

        assert_eq!(config.data_dir(), dir.path().join(".provision"));
        assert!(config.build_pool().is_ok());
        Ok(())
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ProvisionConfig::load(Path::new("/nonexistent/provision.toml"))
            .expect_err("should fail");

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
