//! Uniform query layer over Gentoo-style package-manager backends.
//!
//! Client code queries *package sets* — lazy collections of concrete
//! package versions — without caring which backend produced them. A
//! backend only supplies enumeration, atom matching, and metadata lookup
//! (the [`Backend`] trait); filtering, sorting, best-version selection and
//! overlay-priority resolution are implemented once, on top of
//! [`PackageSet`].
//!
//! ```
//! use pkgset::{Atom, MemoryPm, PackageManager, PackageSet, PmConfig};
//!
//! let pm = MemoryPm::from_config(PmConfig::from_toml(
//!     r#"
//!     [[repos]]
//!     name = "gentoo"
//!     location = "/var/db/repos/gentoo"
//!
//!     [[repos.packages]]
//!     cpv = "dev-lang/python-3.12.1"
//!     slot = "3.12"
//!     "#,
//! )?)?;
//!
//! let atom = Atom::parse(">=dev-lang/python-3.12")?;
//! let best = pm.repositories().query(&atom).best()?;
//! assert_eq!(best.id(), "dev-lang/python-3.12.1");
//! # Ok::<(), pkgset::Error>(())
//! ```

mod atom;
mod backend;
mod config;
mod error;
mod manager;
mod package;
mod repository;
mod set;

pub use atom::{Atom, SlotConstraint, VersionReq};
pub use backend::{Backend, MatchOutcome, MemoryBackend, PackageRecord, RecordIter};
pub use config::{PackageConfig, PmConfig, RepoConfig};
pub use error::{Error, Result};
pub use manager::{MemoryPm, PackageManager};
pub use package::{MetadataKey, PackageId, RepoTag};
pub use portage_atom::{Cpn, Cpv, Operator, Version};
pub use repository::{AtomQuery, Repository, RepositoryDict};
pub use set::{Filter, Filtered, Matcher, PackageSet, PkgIter, Sorted};
