//! Configuration for the narrative workbench
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (narratives.toml)
//! - The platform config directory
//! - Environment variables (NARRATIVES__*)
//!
//! ## Example config file (narratives.toml):
//! ```toml
//! [server]
//! bind = "localhost:8000"
//! show_address = "http://localhost:8000"
//!
//! [projects]
//! paths = ["../agency-ssp", "@repos.conf"]
//! ```
//!
//! A `paths` entry starting with `@` names a listing file with one project
//! directory per line. Blank lines and lines starting with `#` are ignored.

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{ProjectRegistry, MANIFEST_FILE};
use crate::error::{OpenControlError, Result};

/// Main configuration, built once at startup and passed down explicitly
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    /// Address settings for a front end serving the projects
    #[serde(default)]
    pub server: ServerConfig,

    /// Which projects to serve
    #[serde(default)]
    pub projects: ProjectsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// host:port to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Address to print for users, when it differs from `bind`
    #[serde(default)]
    pub show_address: Option<String>,
}

/// Project list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Project directories and `@listing` files
    #[serde(default = "default_project_paths")]
    pub paths: Vec<String>,
}

fn default_bind() -> String {
    "localhost:8000".to_string()
}

fn default_project_paths() -> Vec<String> {
    vec!["@repos.conf".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            show_address: None,
        }
    }
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            paths: default_project_paths(),
        }
    }
}

impl WorkbenchConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, with `config_path` layered over the default
    /// locations when given
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["narratives.toml", ".narratives.toml", "config/narratives.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("org", "opencontrol", "narratives") {
            let platform_config = dirs.config_dir().join("narratives.toml");
            if platform_config.exists() {
                builder = builder.add_source(File::from(platform_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("NARRATIVES")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("projects.paths"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// The address to show users
    pub fn display_address(&self) -> String {
        self.server
            .show_address
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.server.bind))
    }

    /// Expand `@listing` entries and check that every project directory
    /// holds a manifest.
    ///
    /// Relative paths inside a listing file are taken relative to the
    /// listing file.
    pub fn resolve_project_paths(&self) -> Result<Vec<PathBuf>> {
        let mut resolved = Vec::new();
        for entry in &self.projects.paths {
            match entry.strip_prefix('@') {
                Some(listing) => resolved.extend(read_listing(Path::new(listing))?),
                None => resolved.push(PathBuf::from(entry)),
            }
        }

        for path in &resolved {
            if !path.join(MANIFEST_FILE).is_file() {
                return Err(OpenControlError::not_found(
                    "project",
                    path.display().to_string(),
                ));
            }
        }
        Ok(resolved)
    }

    /// Registry over the configured projects
    pub fn registry(&self) -> Result<ProjectRegistry> {
        Ok(ProjectRegistry::new(self.resolve_project_paths()?))
    }
}

fn read_listing(listing: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(listing).map_err(|_| {
        OpenControlError::not_found("project listing", listing.display().to_string())
    })?;
    let base = listing.parent().unwrap_or_else(|| Path::new(""));

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| base.join(line))
        .collect())
}
