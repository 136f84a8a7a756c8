//! Concrete package instances and their metadata.
//!
//! A [`PackageId`] names one package-version-repository triple yielded by a
//! backend. It is created on demand during iteration, never mutated, and
//! carries a handle back into its backend for lazy metadata lookups.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use portage_atom::{Cpn, Cpv};

use crate::backend::Backend;
use crate::error::{Error, Result};

/// Well-known metadata keys, plus the common ebuild variables backends are
/// expected to serve.
///
/// The `CATEGORY`/`PN`/`PV`/`PR`/`PVR`/`P`/`PF` family is derived from the
/// package identity itself; everything else is resolved through the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    /// Package category (`dev-lang`).
    Category,
    /// Package name (`python`).
    Pn,
    /// Version without revision (`3.12.1`).
    Pv,
    /// Revision (`r2`, or `r0` when unrevisioned).
    Pr,
    /// Version with revision (`3.12.1-r2`).
    Pvr,
    /// Name and version (`python-3.12.1`).
    P,
    /// Name, version, and revision (`python-3.12.1-r2`).
    Pf,
    /// Slot the package occupies.
    Slot,
    /// Name of the repository the package came from.
    Repository,
    /// EAPI the package was written against.
    Eapi,
    /// Short description.
    Description,
    /// Upstream homepage.
    Homepage,
    /// License token string.
    License,
    /// Accepted keywords.
    Keywords,
    /// Declared USE flags.
    Iuse,
    /// Build-time dependency string.
    Depend,
    /// Runtime dependency string.
    Rdepend,
}

impl MetadataKey {
    /// The ebuild-variable spelling of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Category => "CATEGORY",
            MetadataKey::Pn => "PN",
            MetadataKey::Pv => "PV",
            MetadataKey::Pr => "PR",
            MetadataKey::Pvr => "PVR",
            MetadataKey::P => "P",
            MetadataKey::Pf => "PF",
            MetadataKey::Slot => "SLOT",
            MetadataKey::Repository => "REPOSITORY",
            MetadataKey::Eapi => "EAPI",
            MetadataKey::Description => "DESCRIPTION",
            MetadataKey::Homepage => "HOMEPAGE",
            MetadataKey::License => "LICENSE",
            MetadataKey::Keywords => "KEYWORDS",
            MetadataKey::Iuse => "IUSE",
            MetadataKey::Depend => "DEPEND",
            MetadataKey::Rdepend => "RDEPEND",
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataKey {
    type Err = Error;

    /// Resolve an ebuild-variable name, failing eagerly on anything this
    /// layer does not recognize.
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "CATEGORY" => MetadataKey::Category,
            "PN" => MetadataKey::Pn,
            "PV" => MetadataKey::Pv,
            "PR" => MetadataKey::Pr,
            "PVR" => MetadataKey::Pvr,
            "P" => MetadataKey::P,
            "PF" => MetadataKey::Pf,
            "SLOT" => MetadataKey::Slot,
            "REPOSITORY" => MetadataKey::Repository,
            "EAPI" => MetadataKey::Eapi,
            "DESCRIPTION" => MetadataKey::Description,
            "HOMEPAGE" => MetadataKey::Homepage,
            "LICENSE" => MetadataKey::License,
            "KEYWORDS" => MetadataKey::Keywords,
            "IUSE" => MetadataKey::Iuse,
            "DEPEND" => MetadataKey::Depend,
            "RDEPEND" => MetadataKey::Rdepend,
            _ => return Err(Error::InvalidKey(s.to_string())),
        })
    }
}

/// Identity of the repository a package was yielded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTag {
    /// Repository name (`gentoo`).
    pub name: String,
    /// Repository location on disk.
    pub path: PathBuf,
    /// Overlay priority; higher overrides lower for the same package.
    pub priority: i32,
}

/// One concrete package-version-repository instance.
#[derive(Clone)]
pub struct PackageId {
    cpv: Cpv,
    repo: Option<RepoTag>,
    backend: Arc<dyn Backend>,
}

impl PackageId {
    /// Build an identifier for a backend record.
    pub fn new(cpv: Cpv, repo: Option<RepoTag>, backend: Arc<dyn Backend>) -> Self {
        Self { cpv, repo, backend }
    }

    /// The category/name pair — the "same package, different version" key.
    pub fn key(&self) -> &Cpn {
        &self.cpv.cpn
    }

    /// The fully-qualified `category/name-version[-revision]` identity.
    pub fn cpv(&self) -> &Cpv {
        &self.cpv
    }

    /// The identity as a string.
    pub fn id(&self) -> String {
        self.cpv.to_string()
    }

    /// The repository this package came from, if it was yielded by one.
    pub fn repo_name(&self) -> Option<&str> {
        self.repo.as_ref().map(|t| t.name.as_str())
    }

    /// The repository's overlay priority, if known.
    pub fn priority(&self) -> Option<i32> {
        self.repo.as_ref().map(|t| t.priority)
    }

    /// Filesystem location of the package's build recipe, when the backend
    /// knows one.
    pub fn path(&self) -> Result<Option<PathBuf>> {
        self.backend.path(self.repo_name(), &self.cpv)
    }

    /// Look up one metadata value.
    ///
    /// Identity-derived keys are answered locally; the rest are forwarded to
    /// the backend, which returns `None` for values it does not carry.
    pub fn metadata(&self, key: &MetadataKey) -> Result<Option<String>> {
        let value = match key {
            MetadataKey::Category => Some(self.cpv.cpn.category.to_string()),
            MetadataKey::Pn => Some(self.cpv.cpn.package.to_string()),
            MetadataKey::Pvr => Some(self.pvr()),
            MetadataKey::Pv => {
                let pvr = self.pvr();
                Some(split_revision(&pvr).0.to_string())
            }
            MetadataKey::Pr => {
                let pvr = self.pvr();
                Some(split_revision(&pvr).1.to_string())
            }
            MetadataKey::P => {
                let pvr = self.pvr();
                Some(format!(
                    "{}-{}",
                    self.cpv.cpn.package,
                    split_revision(&pvr).0
                ))
            }
            MetadataKey::Pf => Some(format!("{}-{}", self.cpv.cpn.package, self.pvr())),
            MetadataKey::Repository => self.repo.as_ref().map(|t| t.name.clone()),
            _ => return self.backend.metadata(self.repo_name(), &self.cpv, key),
        };
        Ok(value)
    }

    fn pvr(&self) -> String {
        self.cpv.version.to_string()
    }
}

/// Split a `version[-rN]` string into its version and revision parts.
/// The revision defaults to `r0`, matching how package managers report it.
fn split_revision(pvr: &str) -> (&str, &str) {
    if let Some(pos) = pvr.rfind("-r") {
        let rev = &pvr[pos + 2..];
        if !rev.is_empty() && rev.bytes().all(|b| b.is_ascii_digit()) {
            return (&pvr[..pos], &pvr[pos + 1..]);
        }
    }
    (pvr, "r0")
}

impl fmt::Debug for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageId")
            .field("cpv", &self.cpv.to_string())
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cpv)?;
        if let Some(tag) = &self.repo {
            write!(f, "::{}", tag.name)?;
        }
        Ok(())
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.cpv == other.cpv && self.repo_name() == other.repo_name()
    }
}

impl Eq for PackageId {}

impl PartialOrd for PackageId {
    /// Version ordering, defined only within the same package key.
    ///
    /// Comparing packages with different keys is meaningless and yields
    /// `None`; selection operations translate that into an ambiguity error.
    /// For identical versions the repository with the higher priority wins,
    /// which is what makes overlay entries shadow the main tree.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.cpv.cpn != other.cpv.cpn {
            return None;
        }
        Some(
            self.cpv
                .version
                .cmp(&other.cpv.version)
                .then_with(|| {
                    self.priority()
                        .unwrap_or_default()
                        .cmp(&other.priority().unwrap_or_default())
                })
                .then_with(|| self.repo_name().unwrap_or("").cmp(other.repo_name().unwrap_or(""))),
        )
    }
}

/// Deterministic total order used by sorting: lexical key order first, then
/// the version order of [`PartialOrd`]. The cross-key leg is an arbitrary
/// but stable tie-break, not a semantic ordering.
pub(crate) fn total_order(a: &PackageId, b: &PackageId) -> Ordering {
    a.key()
        .category
        .cmp(&b.key().category)
        .then_with(|| a.key().package.cmp(&b.key().package))
        .then_with(|| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}
