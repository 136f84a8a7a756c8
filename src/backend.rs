//! The collaborator contract every wrapped package manager fulfills, plus
//! an in-memory implementation.
//!
//! A backend only has to enumerate raw records, match an atom, and answer
//! metadata lookups — the full query semantics of
//! [`PackageSet`](crate::PackageSet) come for free on top. Ambiguity over
//! a partial atom's category is reported as data
//! ([`MatchOutcome::NeedsDisambiguation`]) rather than an error: callers
//! re-issue the match per candidate category and the condition never
//! reaches user code.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use portage_atom::{Cpn, Cpv};

use crate::atom::Atom;
use crate::error::{Error, Result};
use crate::package::MetadataKey;

/// Outcome of asking a backend to match an atom against one repository.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// The matching records, in ascending version order.
    Matched(Vec<Cpv>),
    /// The backend cannot resolve a partial atom's name to one category;
    /// the caller must re-issue the match once per candidate.
    NeedsDisambiguation(Vec<Cpn>),
}

/// Raw record stream produced by enumerating one repository.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Cpv>> + 'a>;

/// Read-only access to one package-manager database.
///
/// Implementations are assumed to be used from a single thread; any
/// blocking I/O they perform is surfaced as synchronous calls with no
/// timeout. Failures inside the backing library are reported as
/// [`Error::Backend`], unchanged.
pub trait Backend {
    /// Enumerate every package record in the named repository.
    fn enumerate<'a>(&'a self, repo: &str) -> RecordIter<'a>;

    /// Match an atom against the named repository.
    fn match_atom(&self, repo: &str, atom: &Atom) -> Result<MatchOutcome>;

    /// Look up one metadata value for a record. `Ok(None)` means the
    /// backend does not carry that key for this record.
    fn metadata(
        &self,
        repo: Option<&str>,
        cpv: &Cpv,
        key: &MetadataKey,
    ) -> Result<Option<String>>;

    /// Filesystem location of a record's build recipe, when known.
    fn path(&self, repo: Option<&str>, cpv: &Cpv) -> Result<Option<PathBuf>> {
        let _ = (repo, cpv);
        Ok(None)
    }
}

/// One package entry held by [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct PackageRecord {
    /// Fully-qualified identity.
    pub cpv: Cpv,
    /// Slot, possibly with a sub-slot (`0/3.2`).
    pub slot: Option<String>,
    /// Location of the build recipe, if the record models one on disk.
    pub path: Option<PathBuf>,
    /// Backend-specific metadata, keyed by ebuild-variable name.
    pub extra: HashMap<String, String>,
}

impl PackageRecord {
    /// Build a record from a CPV string. Panics on malformed input, which
    /// keeps fixture construction terse; use [`PackageRecord::try_new`] when
    /// the input is untrusted.
    pub fn new(cpv: &str) -> Self {
        Self::try_new(cpv).expect("valid cpv")
    }

    /// Build a record from a CPV string, reporting malformed input as
    /// [`Error::Backend`].
    pub fn try_new(cpv: &str) -> Result<Self> {
        let cpv = Cpv::parse(cpv).map_err(|e| Error::Backend(format!("cpv {cpv:?}: {e}")))?;
        Ok(Self {
            cpv,
            slot: None,
            path: None,
            extra: HashMap::new(),
        })
    }

    /// Set the slot.
    pub fn slot(mut self, slot: &str) -> Self {
        self.slot = Some(slot.to_string());
        self
    }

    /// Set the build-recipe path.
    pub fn path_on_disk(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach one metadata value.
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }
}

/// In-memory backend backed by per-repository record lists.
///
/// Serves as the test fixture throughout the crate and as the storage for
/// the configuration-driven package manager. Its `match_atom` faithfully
/// emulates the "ambiguous package name" behavior of ebuild databases: a
/// partial atom whose name exists in several categories yields
/// [`MatchOutcome::NeedsDisambiguation`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    repos: HashMap<String, Vec<PackageRecord>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the named repository.
    pub fn add(&mut self, repo: &str, record: PackageRecord) {
        self.repos.entry(repo.to_string()).or_default().push(record);
    }

    fn records(&self, repo: &str) -> &[PackageRecord] {
        self.repos.get(repo).map(Vec::as_slice).unwrap_or_default()
    }

    fn find(&self, repo: Option<&str>, cpv: &Cpv) -> Option<&PackageRecord> {
        match repo {
            Some(name) => self.records(name).iter().find(|r| r.cpv == *cpv),
            None => self
                .repos
                .values()
                .flatten()
                .find(|r| r.cpv == *cpv),
        }
    }
}

impl Backend for MemoryBackend {
    fn enumerate<'a>(&'a self, repo: &str) -> RecordIter<'a> {
        Box::new(self.records(repo).iter().map(|r| Ok(r.cpv.clone())))
    }

    fn match_atom(&self, repo: &str, atom: &Atom) -> Result<MatchOutcome> {
        let records = self.records(repo);

        let atom = if atom.is_complete() {
            atom.clone()
        } else {
            // Resolve the category the way ebuild databases do: a unique
            // candidate completes the atom, several candidates bounce the
            // decision back to the caller.
            let categories: BTreeMap<&str, Cpn> = records
                .iter()
                .filter(|r| r.cpv.cpn.package == atom.name())
                .map(|r| (r.cpv.cpn.category.as_str(), r.cpv.cpn.clone()))
                .collect();
            match categories.len() {
                0 => return Ok(MatchOutcome::Matched(Vec::new())),
                1 => {
                    let category = categories.keys().next().copied().expect("one candidate");
                    atom.with_category(category)
                }
                _ => {
                    return Ok(MatchOutcome::NeedsDisambiguation(
                        categories.into_values().collect(),
                    ))
                }
            }
        };

        let mut matched: Vec<Cpv> = records
            .iter()
            .filter(|r| atom.matches_parts(&r.cpv, r.slot.as_deref(), Some(repo)))
            .map(|r| r.cpv.clone())
            .collect();
        matched.sort();
        Ok(MatchOutcome::Matched(matched))
    }

    fn metadata(
        &self,
        repo: Option<&str>,
        cpv: &Cpv,
        key: &MetadataKey,
    ) -> Result<Option<String>> {
        let Some(record) = self.find(repo, cpv) else {
            return Err(Error::Backend(format!("no record for {cpv}")));
        };
        if *key == MetadataKey::Slot {
            if let Some(slot) = &record.slot {
                return Ok(Some(slot.clone()));
            }
        }
        Ok(record.extra.get(key.as_str()).cloned())
    }

    fn path(&self, repo: Option<&str>, cpv: &Cpv) -> Result<Option<PathBuf>> {
        Ok(self.find(repo, cpv).and_then(|r| r.path.clone()))
    }
}
