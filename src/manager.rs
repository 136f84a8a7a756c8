//! Package-manager handles.
//!
//! [`PackageManager`] is the construction entry point of the whole layer:
//! one handle per wrapped backend, exposing its repositories and a
//! reloadable configuration. [`MemoryPm`] is the shipped implementation,
//! serving a [`MemoryBackend`] built from a [`PmConfig`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use portage_atom::Cpv;
use tracing::debug;

use crate::backend::{MemoryBackend, PackageRecord};
use crate::config::PmConfig;
use crate::error::{Error, Result};
use crate::repository::{Repository, RepositoryDict};

/// A handle onto one package-manager backend.
pub trait PackageManager {
    /// Canonical, static name of the backend.
    fn name(&self) -> &'static str;

    /// (Re)load the backend's configuration, replacing all previously
    /// cached repository state. Safe to call any number of times.
    fn reload_config(&mut self) -> Result<()>;

    /// The currently enabled repositories.
    fn repositories(&self) -> &RepositoryDict;
}

/// Where a [`MemoryPm`] takes its configuration from.
#[derive(Debug, Clone)]
enum ConfigSource {
    Path(PathBuf),
    Inline(PmConfig),
}

/// Package manager serving an in-memory backend from a [`PmConfig`].
#[derive(Debug, Clone)]
pub struct MemoryPm {
    source: ConfigSource,
    repos: RepositoryDict,
}

impl MemoryPm {
    /// Build from a configuration file; reloading re-reads the file.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let mut pm = Self {
            source: ConfigSource::Path(path.into()),
            repos: RepositoryDict::new(),
        };
        pm.reload_config()?;
        Ok(pm)
    }

    /// Build from an already-parsed configuration.
    pub fn from_config(config: PmConfig) -> Result<Self> {
        let mut pm = Self {
            source: ConfigSource::Inline(config),
            repos: RepositoryDict::new(),
        };
        pm.reload_config()?;
        Ok(pm)
    }

    fn build(config: &PmConfig) -> Result<RepositoryDict> {
        let mut backend = MemoryBackend::new();
        for repo in &config.repos {
            for pkg in &repo.packages {
                let cpv = Cpv::parse(&pkg.cpv).map_err(|e| {
                    Error::Config(format!("repository {}: cpv {:?}: {e}", repo.name, pkg.cpv))
                })?;
                let mut record = PackageRecord {
                    cpv,
                    slot: pkg.slot.clone(),
                    path: None,
                    extra: pkg.metadata.clone(),
                };
                record.path = Some(recipe_path(&repo.location, &record));
                backend.add(&repo.name, record);
            }
        }
        let backend = Arc::new(backend);
        let mut dict = RepositoryDict::new();
        for repo in &config.repos {
            dict.insert(Repository::new(
                repo.name.clone(),
                repo.location.clone(),
                repo.priority,
                backend.clone(),
            ));
        }
        Ok(dict)
    }
}

/// Conventional ebuild location of a record inside its repository.
fn recipe_path(location: &Path, record: &PackageRecord) -> PathBuf {
    let cpn = &record.cpv.cpn;
    let pvr = record.cpv.version.to_string();
    location
        .join(cpn.category.as_str())
        .join(cpn.package.as_str())
        .join(format!("{}-{}.ebuild", cpn.package, pvr))
}

impl PackageManager for MemoryPm {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn reload_config(&mut self) -> Result<()> {
        let config = match &self.source {
            ConfigSource::Path(path) => PmConfig::from_path(path)?,
            ConfigSource::Inline(config) => config.clone(),
        };
        self.repos = Self::build(&config)?;
        debug!(repos = self.repos.repo_count(), "configuration loaded");
        Ok(())
    }

    fn repositories(&self) -> &RepositoryDict {
        &self.repos
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::package::MetadataKey;
    use crate::set::PackageSet;

    const CONFIG: &str = r#"
        [[repos]]
        name = "gentoo"
        location = "/var/db/repos/gentoo"
        priority = -1000

        [[repos.packages]]
        cpv = "dev-lang/python-3.12.1"
        slot = "3.12"

        [repos.packages.metadata]
        EAPI = "8"
    "#;

    #[test]
    fn from_inline_config() {
        let pm = MemoryPm::from_config(PmConfig::from_toml(CONFIG).unwrap()).unwrap();
        assert_eq!(pm.name(), "memory");
        let repo = pm.repositories().get("gentoo").unwrap();
        assert_eq!(repo.priority(), -1000);
        assert!(!repo.is_empty().unwrap());
    }

    #[test]
    fn from_config_file_and_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let mut pm = MemoryPm::from_path(file.path()).unwrap();
        assert_eq!(pm.repositories().repo_count(), 1);

        // Rewrite the file; reload must replace everything cached.
        let replacement = r#"
            [[repos]]
            name = "guru"
            location = "/var/db/repos/guru"
        "#;
        fs_overwrite(file.path(), replacement);
        pm.reload_config().unwrap();
        assert_eq!(pm.repositories().repo_count(), 1);
        assert!(pm.repositories().get("gentoo").is_err());
        assert!(pm.repositories().get("guru").is_ok());
    }

    fn fs_overwrite(path: &Path, contents: &str) {
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn bad_cpv_is_config_error() {
        let cfg = PmConfig::from_toml(
            r#"
            [[repos]]
            name = "gentoo"
            location = "/var/db/repos/gentoo"

            [[repos.packages]]
            cpv = "not-a-cpv"
            "#,
        )
        .unwrap();
        assert!(matches!(
            MemoryPm::from_config(cfg),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn records_get_recipe_paths() {
        let pm = MemoryPm::from_config(PmConfig::from_toml(CONFIG).unwrap()).unwrap();
        let repo = pm.repositories().get("gentoo").unwrap();
        let pkg = repo.iter().next().unwrap().unwrap();
        assert_eq!(
            pkg.path().unwrap().unwrap(),
            Path::new("/var/db/repos/gentoo/dev-lang/python/python-3.12.1.ebuild")
        );
        assert_eq!(pkg.metadata(&MetadataKey::Eapi).unwrap().unwrap(), "8");
    }
}
