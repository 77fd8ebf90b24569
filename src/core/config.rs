//! Configuration file management.
//!
//! Reads the `(project, environment) -> vault` mapping and store settings
//! from `config.toml` under the platform config directory. A missing file
//! is created on first run along with a README describing the schema.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::core::constants;
use crate::core::domain::{Scope, ScopeHandle};
use crate::core::store::fixture;
use crate::core::types::{EnvironmentName, ProjectName};
use crate::error::{ConfigError, Result};

const README: &str = r#"# kvt configuration

Edit `config.toml` in this directory to register your Azure Key Vault projects.

## Schema

```toml
[store]
backend = "azure"      # "azure" or "memory"
timeout_secs = 30      # per vault call
max_in_flight = 4      # parallel calls during commit

[projects.<service-name>.<environment-name>]
vault_name = "kv-myapp-prod"
subscription_id = "00000000-0000-0000-0000-000000000000"
tenant_id = "00000000-0000-0000-0000-000000000001"
```

## Example

```toml
[projects.frontend.production]
vault_name = "kv-frontend-prod"
subscription_id = "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"

[projects.frontend.staging]
vault_name = "kv-frontend-stg"
subscription_id = "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"
```

Tables whose name starts with `_` (e.g. `[projects._example]`) are ignored.
"#;

/// Which secret store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Live Azure Key Vault through the `az` CLI.
    #[default]
    Azure,
    /// In-process store seeded with demo data.
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Backend::Azure),
            "memory" | "mock" => Ok(Backend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Azure => write!(f, "azure"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: Backend,
    /// Upper bound on a single store call.
    pub timeout_secs: u64,
    /// Commit units allowed in flight at once.
    pub max_in_flight: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
            max_in_flight: constants::DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Where one `(project, environment)` pair lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultBinding {
    pub vault_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl VaultBinding {
    /// Store-facing handle for this vault.
    pub fn handle(&self) -> ScopeHandle {
        ScopeHandle::new(&self.vault_name, self.subscription_id.clone())
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<ProjectName, BTreeMap<EnvironmentName, VaultBinding>>,
}

impl Config {
    /// Path to the configuration file.
    ///
    /// `$KVT_CONFIG` wins over the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` if no config directory exists.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(constants::CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(constants::CONFIG_DIR).join(constants::CONFIG_FILE))
    }

    /// Load configuration from the default path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or
    /// parsed, or fails validation.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`, bootstrapping it if missing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or
    /// parsed, or fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            bootstrap(path)?;
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?;

        debug!(
            backend = %config.store.backend,
            contexts = config.contexts().len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Parse and validate TOML text, dropping reserved tables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML or a schema mismatch,
    /// `ConfigError::InvalidValue` on out-of-range settings.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut table: toml::Table = contents.parse().map_err(ConfigError::Parse)?;

        if let Some(toml::Value::Table(projects)) = table.get_mut("projects") {
            projects.retain(|name, _| !is_reserved(name));
            for (_, envs) in projects.iter_mut() {
                if let toml::Value::Table(envs) = envs {
                    envs.retain(|name, _| !is_reserved(name));
                }
            }
        }

        let config: Self = toml::Value::Table(table)
            .try_into()
            .map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "saving config");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Check settings and bindings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` on the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.store.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.timeout_secs",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.store.max_in_flight == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.max_in_flight",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        for (project, envs) in &self.projects {
            for (env, binding) in envs {
                if binding.vault_name.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "vault_name",
                        reason: format!("empty for {}/{}", project, env),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Override the configured backend.
    pub fn set_backend(&mut self, backend: Backend) {
        self.store.backend = backend;
    }

    /// Whether scopes come from the built-in demo data.
    ///
    /// The memory store only holds the demo vaults, so configured projects
    /// are not resolvable under it.
    pub fn uses_fixtures(&self) -> bool {
        self.store.backend == Backend::Memory
    }

    /// Resolve a `(project, environment)` pair to a scope.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownContext` if the pair is not configured,
    /// or has no demo vault under the memory backend.
    pub fn resolve(&self, project: &str, environment: &str) -> Result<Scope> {
        if self.uses_fixtures() {
            if !self.projects.is_empty() {
                debug!("memory backend ignores configured projects");
            }
            if fixture::contexts().any(|(p, e)| p == project && e == environment) {
                return Ok(Scope::new(
                    project,
                    environment,
                    fixture::handle(project, environment),
                ));
            }
        } else if let Some(binding) = self.projects.get(project).and_then(|e| e.get(environment)) {
            return Ok(Scope::new(project, environment, binding.handle()));
        }

        Err(ConfigError::UnknownContext {
            project: project.to_string(),
            environment: environment.to_string(),
        }
        .into())
    }

    /// Every resolvable `(project, environment)` pair, sorted.
    pub fn contexts(&self) -> Vec<(ProjectName, EnvironmentName)> {
        let mut pairs: Vec<_> = if self.uses_fixtures() {
            fixture::contexts()
                .map(|(p, e)| (p.to_string(), e.to_string()))
                .collect()
        } else {
            self.projects
                .iter()
                .flat_map(|(p, envs)| envs.keys().map(move |e| (p.clone(), e.clone())))
                .collect()
        };
        pairs.sort();
        pairs
    }
}

fn is_reserved(name: &str) -> bool {
    name.starts_with(constants::RESERVED_PREFIX)
}

/// Create the config directory, an empty config file, and a README.
fn bootstrap(path: &Path) -> Result<()> {
    debug!(path = %path.display(), "bootstrapping config");

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
        let readme = dir.join(constants::README_FILE);
        if !readme.exists() {
            std::fs::write(readme, README)?;
        }
    }
    std::fs::write(path, "")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[store]
backend = "azure"
max_in_flight = 2

[projects.frontend.production]
vault_name = "kv-frontend-prod"
subscription_id = "sub-1"

[projects.frontend.staging]
vault_name = "kv-frontend-stg"

[projects.frontend._draft]
vault_name = "kv-ignored"

[projects._example.production]
vault_name = "kv-example"
"#;

    #[test]
    fn test_missing_file_bootstraps() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kvt").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert!(tmp.path().join("kvt").join("README.md").exists());

        // second load reads the empty file
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_parse_drops_reserved_tables() {
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.store.backend, Backend::Azure);
        assert_eq!(config.store.max_in_flight, 2);
        assert_eq!(config.store.timeout_secs, constants::DEFAULT_TIMEOUT_SECS);
        assert_eq!(
            config.contexts(),
            [
                ("frontend".to_string(), "production".to_string()),
                ("frontend".to_string(), "staging".to_string()),
            ]
        );
    }

    #[test]
    fn test_resolve() {
        let config = Config::parse(SAMPLE).unwrap();

        let scope = config.resolve("frontend", "production").unwrap();
        assert_eq!(scope.to_string(), "frontend/production");
        assert_eq!(scope.handle(), &ScopeHandle::new("kv-frontend-prod", Some("sub-1".into())));

        let err = config.resolve("frontend", "_draft").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::UnknownContext { .. })
        ));
    }

    #[test]
    fn test_memory_backend_ignores_configured_projects() {
        let mut config = Config::parse(
            "[projects.billing.prod]\nvault_name = \"kv-billing-prod\"\n\n\
             [projects.frontend.production]\nvault_name = \"kv-frontend-prod\"\n",
        )
        .unwrap();
        config.set_backend(Backend::Memory);

        assert!(config.uses_fixtures());
        assert!(!config
            .contexts()
            .contains(&("billing".to_string(), "prod".to_string())));
        assert!(matches!(
            config.resolve("billing", "prod"),
            Err(Error::Config(ConfigError::UnknownContext { .. }))
        ));
        assert_eq!(
            config.resolve("frontend", "production").unwrap().handle(),
            &fixture::handle("frontend", "production")
        );
    }

    #[test]
    fn test_memory_without_projects_uses_fixtures() {
        let config = Config::parse("[store]\nbackend = \"memory\"\n").unwrap();

        assert!(config.uses_fixtures());
        assert!(config.contexts().contains(&("backend".to_string(), "staging".to_string())));
        assert_eq!(
            config.resolve("infra", "staging").unwrap().handle(),
            &fixture::handle("infra", "staging")
        );
    }

    #[test]
    fn test_azure_without_projects_has_no_contexts() {
        let config = Config::default();

        assert!(config.contexts().is_empty());
        assert!(config.resolve("frontend", "staging").is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::parse("[store]\nmax_in_flight = 0\n").is_err());
        assert!(Config::parse("[store]\ntimeout_secs = 0\n").is_err());
        assert!(Config::parse("[store]\nbackend = \"s3\"\n").is_err());
        assert!(Config::parse("[projects.a.b]\nvault_name = \"\"\n").is_err());
        assert!(Config::parse("not toml [").is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("azure".parse::<Backend>().unwrap(), Backend::Azure);
        assert_eq!("Memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert!("s3".parse::<Backend>().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let config = Config::parse(SAMPLE).unwrap();

        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
