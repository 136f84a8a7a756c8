//! Package-manager configuration.
//!
//! A TOML file describes the repositories a [`MemoryPm`](crate::MemoryPm)
//! serves, in the spirit of `repos.conf`:
//!
//! ```toml
//! [[repos]]
//! name = "gentoo"
//! location = "/var/db/repos/gentoo"
//! priority = -1000
//!
//! [[repos.packages]]
//! cpv = "dev-lang/python-3.12.1"
//! slot = "3.12"
//!
//! [repos.packages.metadata]
//! EAPI = "8"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration: the enabled repositories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PmConfig {
    /// Repository definitions, in file order.
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
}

/// One repository definition.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    /// Repository name.
    pub name: String,
    /// Repository location; must be an absolute path to be addressable
    /// through path lookups.
    pub location: PathBuf,
    /// Overlay priority, defaulting to 0.
    #[serde(default)]
    pub priority: i32,
    /// Package entries served by this repository.
    #[serde(default)]
    pub packages: Vec<PackageConfig>,
}

/// One package entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageConfig {
    /// Fully-qualified `category/name-version[-revision]`.
    pub cpv: String,
    /// Slot, possibly with sub-slot.
    #[serde(default)]
    pub slot: Option<String>,
    /// Further metadata, keyed by ebuild-variable name.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PmConfig {
    /// Parse a configuration document.
    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let input = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let cfg = PmConfig::from_toml(
            r#"
            [[repos]]
            name = "gentoo"
            location = "/var/db/repos/gentoo"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.repos.len(), 1);
        assert_eq!(cfg.repos[0].priority, 0);
        assert!(cfg.repos[0].packages.is_empty());
    }

    #[test]
    fn parse_full() {
        let cfg = PmConfig::from_toml(
            r#"
            [[repos]]
            name = "gentoo"
            location = "/var/db/repos/gentoo"
            priority = -1000

            [[repos.packages]]
            cpv = "dev-lang/python-3.12.1"
            slot = "3.12"

            [repos.packages.metadata]
            EAPI = "8"
            DESCRIPTION = "An interpreted, interactive, object-oriented programming language"
            "#,
        )
        .unwrap();
        let pkg = &cfg.repos[0].packages[0];
        assert_eq!(pkg.cpv, "dev-lang/python-3.12.1");
        assert_eq!(pkg.slot.as_deref(), Some("3.12"));
        assert_eq!(pkg.metadata["EAPI"], "8");
    }

    #[test]
    fn parse_empty_document() {
        let cfg = PmConfig::from_toml("").unwrap();
        assert!(cfg.repos.is_empty());
    }

    #[test]
    fn parse_garbage() {
        assert!(matches!(
            PmConfig::from_toml("repos = 3"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            PmConfig::from_path(Path::new("/nonexistent/pm.toml")),
            Err(Error::Config(_))
        ));
    }
}
