//! Client configuration
//!
//! Two small JSON files hold the active context:
//!
//! - `<repository root>/.stackhub/config.json` when a repository is active
//! - `<global config dir>/config.json` as the fallback
//!
//! Each file stores `{ "active_project_id": ..., "active_stack_id": ... }`
//! and is rewritten in full on every change. Concurrent writers from several
//! processes are not coordinated: the last write wins.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Directory marking a repository root
pub const REPOSITORY_DIRECTORY_NAME: &str = ".stackhub";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_REPOSITORY_PATH: &str = "STACKHUB_REPOSITORY_PATH";
pub const ENV_CONFIG_PATH: &str = "STACKHUB_CONFIG_PATH";
pub const ENV_ENABLE_REPO_INIT_WARNINGS: &str = "STACKHUB_ENABLE_REPO_INIT_WARNINGS";

/// Configuration file and settings errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to {action} configuration file {path:?}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration file {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot determine home directory")]
    NoHomeDirectory,

    #[error("A repository already exists at {0:?}")]
    RepositoryExists(PathBuf),

    #[error("No repository found at {0:?}. Run `initialize` there first.")]
    RepositoryNotFound(PathBuf),

    #[error("Invalid client settings: {0}")]
    InvalidSettings(String),
}

impl ConfigError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Process-level settings, usually read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Repository to search from instead of the working directory
    pub repository_path: Option<PathBuf>,

    /// Global configuration directory (defaults to `~/.stackhub`)
    pub global_config_path: Option<PathBuf>,

    /// Warn when no repository is found while searching
    pub enable_repo_init_warnings: bool,
}

impl ClientSettings {
    /// Read settings from `STACKHUB_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        };
        Self {
            repository_path: path(ENV_REPOSITORY_PATH),
            global_config_path: path(ENV_CONFIG_PATH),
            enable_repo_init_warnings: lookup(ENV_ENABLE_REPO_INIT_WARNINGS)
                .map(|value| {
                    matches!(
                        value.trim().to_ascii_lowercase().as_str(),
                        "1" | "true" | "yes"
                    )
                })
                .unwrap_or(false),
        }
    }

    /// Directory holding the global configuration file
    pub fn global_config_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.global_config_path {
            return Ok(path.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(REPOSITORY_DIRECTORY_NAME))
            .ok_or(ConfigError::NoHomeDirectory)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.global_config_path {
            if path.is_file() {
                return Err(ConfigError::InvalidSettings(format!(
                    "global config path {:?} must be a directory",
                    path
                )));
            }
        }
        if let Some(path) = &self.repository_path {
            if path.is_file() {
                return Err(ConfigError::InvalidSettings(format!(
                    "repository path {:?} must be a directory",
                    path
                )));
            }
        }
        Ok(())
    }
}

/// Whether `root` contains a repository marker directory
pub fn is_repository_directory(root: &Path) -> bool {
    root.join(REPOSITORY_DIRECTORY_NAME).is_dir()
}

/// Search `start` and its parents for a repository root
///
/// Without `start`, the search begins at the configured repository path or
/// the working directory.
pub fn find_repository(start: Option<&Path>, settings: &ClientSettings) -> Option<PathBuf> {
    let start = match start {
        Some(path) => path.to_path_buf(),
        None => match &settings.repository_path {
            Some(path) => path.clone(),
            None => std::env::current_dir().ok()?,
        },
    };

    let found = start
        .ancestors()
        .find(|candidate| is_repository_directory(candidate))
        .map(Path::to_path_buf);

    if found.is_none() && settings.enable_repo_init_warnings {
        tracing::warn!(
            "Unable to find a repository in {:?} or any parent directory",
            start
        );
    }
    found
}

/// Active project and stack selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveContext {
    pub active_project_id: Option<Uuid>,
    pub active_stack_id: Option<Uuid>,
}

/// An [`ActiveContext`] bound to the file it is persisted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfiguration {
    path: PathBuf,
    context: ActiveContext,
}

impl ClientConfiguration {
    /// Load the configuration file in `directory`; a missing file is an empty context
    pub fn load(directory: &Path) -> Result<Self, ConfigError> {
        let path = directory.join(CONFIG_FILE_NAME);
        let context = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| {
                ConfigError::Malformed {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ActiveContext::default(),
            Err(e) => return Err(ConfigError::io("read", &path, e)),
        };
        Ok(Self { path, context })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> ActiveContext {
        self.context
    }

    pub fn active_project_id(&self) -> Option<Uuid> {
        self.context.active_project_id
    }

    pub fn active_stack_id(&self) -> Option<Uuid> {
        self.context.active_stack_id
    }

    pub fn set_active_project(&mut self, project_id: Option<Uuid>) -> Result<(), ConfigError> {
        self.context.active_project_id = project_id;
        self.save()
    }

    pub fn set_active_stack(&mut self, stack_id: Option<Uuid>) -> Result<(), ConfigError> {
        self.context.active_stack_id = stack_id;
        self.save()
    }

    pub fn set_context(&mut self, context: ActiveContext) -> Result<(), ConfigError> {
        self.context = context;
        self.save()
    }

    fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io("create", parent, e))?;
        }
        let contents = serde_json::to_string_pretty(&self.context).map_err(|source| {
            ConfigError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, contents).map_err(|e| ConfigError::io("write", &self.path, e))?;
        tracing::debug!("Wrote client configuration to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_REPOSITORY_PATH, "/work/repo"),
            (ENV_CONFIG_PATH, ""),
            (ENV_ENABLE_REPO_INIT_WARNINGS, "True"),
        ]
        .into_iter()
        .collect();
        let settings = ClientSettings::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.repository_path, Some(PathBuf::from("/work/repo")));
        assert_eq!(settings.global_config_path, None);
        assert!(settings.enable_repo_init_warnings);
    }

    #[test]
    fn test_missing_file_is_empty_context() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfiguration::load(dir.path()).unwrap();
        assert_eq!(config.context(), ActiveContext::default());
        assert!(!config.path().exists());
    }

    #[test]
    fn test_changes_are_persisted() {
        let dir = TempDir::new().unwrap();
        let project = Uuid::new_v4();
        let stack = Uuid::new_v4();

        let mut config = ClientConfiguration::load(dir.path()).unwrap();
        config.set_active_project(Some(project)).unwrap();
        config.set_active_stack(Some(stack)).unwrap();

        let reloaded = ClientConfiguration::load(dir.path()).unwrap();
        assert_eq!(reloaded.active_project_id(), Some(project));
        assert_eq!(reloaded.active_stack_id(), Some(stack));
    }

    #[test]
    fn test_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let mut first = ClientConfiguration::load(dir.path()).unwrap();
        let mut second = ClientConfiguration::load(dir.path()).unwrap();

        first.set_active_project(Some(Uuid::new_v4())).unwrap();
        let winner = Uuid::new_v4();
        second.set_active_stack(Some(winner)).unwrap();

        let reloaded = ClientConfiguration::load(dir.path()).unwrap();
        assert_eq!(reloaded.active_project_id(), None);
        assert_eq!(reloaded.active_stack_id(), Some(winner));
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{not json").unwrap();
        assert!(matches!(
            ClientConfiguration::load(dir.path()),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn test_find_repository_walks_parents() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(REPOSITORY_DIRECTORY_NAME)).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let settings = ClientSettings::default();
        assert_eq!(
            find_repository(Some(&nested), &settings),
            Some(dir.path().to_path_buf())
        );

        let elsewhere = TempDir::new().unwrap();
        assert_eq!(find_repository(Some(elsewhere.path()), &settings), None);
    }
}
