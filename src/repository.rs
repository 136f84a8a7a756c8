//! Named, priority-ordered repository views.
//!
//! A [`Repository`] is a [`PackageSet`] over one backend repository,
//! tagging every package it yields with its own name, path, and overlay
//! priority. A [`RepositoryDict`] aggregates all configured repositories
//! in priority order, which is what makes higher-priority overlays win
//! when the same package exists in several trees.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use portage_atom::Cpv;
use tracing::debug;

use crate::atom::Atom;
use crate::backend::{Backend, MatchOutcome};
use crate::error::{Error, Result};
use crate::package::{PackageId, RepoTag};
use crate::set::{PackageSet, PkgIter};

/// One configured repository.
#[derive(Clone)]
pub struct Repository {
    name: String,
    path: PathBuf,
    priority: i32,
    backend: Arc<dyn Backend>,
}

impl Repository {
    /// Create a repository view over a backend.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        priority: i32,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            priority,
            backend,
        }
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Repository location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overlay priority; higher overrides lower.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Match an atom against this repository using the backend's matcher.
    ///
    /// The result is itself a lazy [`PackageSet`]; each iteration re-issues
    /// the backend query.
    pub fn query(&self, atom: &Atom) -> AtomQuery {
        AtomQuery {
            repos: vec![self.clone()],
            atom: atom.clone(),
        }
    }

    fn tag(&self) -> RepoTag {
        RepoTag {
            name: self.name.clone(),
            path: self.path.clone(),
            priority: self.priority,
        }
    }

    fn package(&self, cpv: Cpv) -> PackageId {
        PackageId::new(cpv, Some(self.tag()), Arc::clone(&self.backend))
    }

    /// Backend-side matching for one atom, recovering from ambiguous
    /// partial-atom categories by re-issuing the match per candidate.
    fn match_iter(&self, atom: &Atom) -> PkgIter<'_> {
        // An explicit ::repo restriction on a different repository matches
        // nothing here, without consulting the backend.
        if let Some(want) = atom.repository() {
            if want != self.name {
                return Box::new(std::iter::empty());
            }
        }
        match self.backend.match_atom(&self.name, atom) {
            Err(e) => Box::new(std::iter::once(Err(e))),
            Ok(MatchOutcome::Matched(cpvs)) => {
                Box::new(cpvs.into_iter().map(|cpv| Ok(self.package(cpv))))
            }
            Ok(MatchOutcome::NeedsDisambiguation(candidates)) => {
                debug!(
                    repo = %self.name,
                    %atom,
                    candidates = candidates.len(),
                    "ambiguous package name, re-issuing per category"
                );
                let mut out: Vec<Result<PackageId>> = Vec::new();
                for cpn in candidates {
                    let refined = atom.with_category(&cpn.category);
                    match self.backend.match_atom(&self.name, &refined) {
                        Ok(MatchOutcome::Matched(cpvs)) => {
                            out.extend(cpvs.into_iter().map(|cpv| Ok(self.package(cpv))));
                        }
                        Ok(MatchOutcome::NeedsDisambiguation(_)) => {
                            out.push(Err(Error::Backend(format!(
                                "backend failed to disambiguate {refined}"
                            ))));
                        }
                        Err(e) => out.push(Err(e)),
                    }
                }
                Box::new(out.into_iter())
            }
        }
    }
}

impl PackageSet for Repository {
    fn iter(&self) -> PkgIter<'_> {
        Box::new(
            self.backend
                .enumerate(&self.name)
                .map(move |record| record.map(|cpv| self.package(cpv))),
        )
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Repository {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.path == other.path
    }
}

impl Eq for Repository {}

impl PartialOrd for Repository {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Repository {
    /// Priority order, then name and path to keep it total.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// All configured repositories, indexed by name and by absolute path.
///
/// Iteration and aggregate matching walk the repositories from highest to
/// lowest priority.
#[derive(Debug, Clone, Default)]
pub struct RepositoryDict {
    // Kept sorted: highest priority first.
    repos: Vec<Repository>,
}

impl RepositoryDict {
    /// An empty dict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a repository, replacing any existing one with the same name
    /// or the same path (the mapping is injective in both).
    pub fn insert(&mut self, repo: Repository) {
        self.repos
            .retain(|r| r.name() != repo.name() && r.path() != repo.path());
        self.repos.push(repo);
        self.repos.sort_by(|a, b| b.cmp(a));
    }

    /// Look up a repository by name, or — when `key` is an absolute path —
    /// by exact path equality.
    pub fn get(&self, key: &str) -> Result<&Repository> {
        let by_path = Path::new(key).is_absolute();
        self.repos
            .iter()
            .find(|r| {
                if by_path {
                    r.path() == Path::new(key)
                } else {
                    r.name() == key
                }
            })
            .ok_or_else(|| Error::RepositoryNotFound(key.to_string()))
    }

    /// The repositories in priority order, highest first.
    pub fn iter_repos(&self) -> impl Iterator<Item = &Repository> {
        self.repos.iter()
    }

    /// Number of configured repositories.
    pub fn repo_count(&self) -> usize {
        self.repos.len()
    }

    /// Match an atom across all repositories.
    ///
    /// An atom with an explicit `::repo` restriction consults only that
    /// repository; otherwise every repository is queried in priority order
    /// and each match is tagged with the repository it came from.
    pub fn query(&self, atom: &Atom) -> AtomQuery {
        AtomQuery {
            repos: self.repos.clone(),
            atom: atom.clone(),
        }
    }
}

impl PackageSet for RepositoryDict {
    /// Flatten all repositories, in priority order.
    fn iter(&self) -> PkgIter<'_> {
        Box::new(self.repos.iter().flat_map(|repo| repo.iter()))
    }
}

/// Lazy result set of matching an atom against one or more repositories.
#[derive(Debug, Clone)]
pub struct AtomQuery {
    repos: Vec<Repository>,
    atom: Atom,
}

impl AtomQuery {
    /// The atom this query evaluates.
    pub fn atom(&self) -> &Atom {
        &self.atom
    }
}

impl PackageSet for AtomQuery {
    fn iter(&self) -> PkgIter<'_> {
        let atom = &self.atom;
        Box::new(
            self.repos
                .iter()
                .flat_map(move |repo| repo.match_iter(atom)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, PackageRecord};

    fn backend() -> Arc<MemoryBackend> {
        let mut b = MemoryBackend::new();
        b.add("gentoo", PackageRecord::new("dev-lang/python-3.11.9").slot("3.11"));
        b.add("gentoo", PackageRecord::new("dev-lang/python-3.12.1").slot("3.12"));
        b.add("gentoo", PackageRecord::new("app-misc/foo-1.0"));
        b.add("guru", PackageRecord::new("dev-lang/foo-2.0"));
        b.add("guru", PackageRecord::new("dev-lang/python-3.12.1").slot("3.12"));
        Arc::new(b)
    }

    fn dict() -> RepositoryDict {
        let backend = backend();
        let mut d = RepositoryDict::new();
        d.insert(Repository::new(
            "gentoo",
            "/var/db/repos/gentoo",
            -1000,
            backend.clone(),
        ));
        d.insert(Repository::new("guru", "/var/db/repos/guru", 0, backend));
        d
    }

    fn atom(s: &str) -> Atom {
        Atom::parse(s).unwrap()
    }

    fn ids(set: &impl PackageSet) -> Vec<String> {
        set.iter().map(|p| p.unwrap().to_string()).collect()
    }

    #[test]
    fn get_by_name_and_path() {
        let d = dict();
        assert_eq!(d.get("gentoo").unwrap().name(), "gentoo");
        assert_eq!(d.get("/var/db/repos/guru").unwrap().name(), "guru");
    }

    #[test]
    fn get_unknown_key() {
        let d = dict();
        assert!(matches!(d.get("nowhere"), Err(Error::RepositoryNotFound(_))));
        // Exact-match only; a sibling path does not resolve.
        assert!(matches!(
            d.get("/var/db/repos/gentoo/dev-lang"),
            Err(Error::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn insert_is_injective() {
        let mut d = dict();
        d.insert(Repository::new(
            "gentoo",
            "/srv/gentoo-mirror",
            100,
            backend(),
        ));
        assert_eq!(d.repo_count(), 2);
        assert_eq!(d.get("gentoo").unwrap().priority(), 100);
    }

    #[test]
    fn priority_order_highest_first() {
        let d = dict();
        let names: Vec<&str> = d.iter_repos().map(Repository::name).collect();
        assert_eq!(names, vec!["guru", "gentoo"]);
    }

    #[test]
    fn repository_iteration_tags_packages() {
        let d = dict();
        let repo = d.get("guru").unwrap();
        let mut got = ids(repo);
        got.sort();
        assert_eq!(
            got,
            vec!["dev-lang/foo-2.0::guru", "dev-lang/python-3.12.1::guru"]
        );
    }

    #[test]
    fn dict_flattens_in_priority_order() {
        let d = dict();
        let got = ids(&d);
        assert_eq!(got.len(), 5);
        // guru (priority 0) precedes gentoo (priority -1000).
        assert!(got[0].ends_with("::guru"));
        assert!(got.last().unwrap().ends_with("::gentoo"));
    }

    #[test]
    fn query_respects_repo_restriction() {
        let d = dict();
        let got = ids(&d.query(&atom("dev-lang/python::gentoo")));
        assert_eq!(
            got,
            vec![
                "dev-lang/python-3.11.9::gentoo",
                "dev-lang/python-3.12.1::gentoo"
            ]
        );
    }

    #[test]
    fn query_aggregates_all_repos() {
        let d = dict();
        let got = ids(&d.query(&atom("dev-lang/python")));
        // guru first (higher priority), then gentoo.
        assert_eq!(
            got,
            vec![
                "dev-lang/python-3.12.1::guru",
                "dev-lang/python-3.11.9::gentoo",
                "dev-lang/python-3.12.1::gentoo",
            ]
        );
    }

    #[test]
    fn query_partial_atom_spans_categories() {
        let d = dict();
        let mut got = ids(&d.query(&atom("foo")));
        got.sort();
        // app-misc/foo from gentoo and dev-lang/foo from guru: the partial
        // atom must yield the union, not an error.
        assert_eq!(
            got,
            vec!["app-misc/foo-1.0::gentoo", "dev-lang/foo-2.0::guru"]
        );
    }

    #[test]
    fn ambiguity_recovery_within_one_repo() {
        let mut b = MemoryBackend::new();
        b.add("gentoo", PackageRecord::new("app-editors/vim-9.1.0"));
        b.add("gentoo", PackageRecord::new("app-misc/vim-0.1"));
        let repo = Repository::new("gentoo", "/var/db/repos/gentoo", 0, Arc::new(b));
        let mut got = ids(&repo.query(&atom("vim")));
        got.sort();
        assert_eq!(
            got,
            vec!["app-editors/vim-9.1.0::gentoo", "app-misc/vim-0.1::gentoo"]
        );
    }

    #[test]
    fn best_prefers_higher_priority_for_same_version() {
        let d = dict();
        let best = d.query(&atom("=dev-lang/python-3.12.1")).best().unwrap();
        assert_eq!(best.repo_name(), Some("guru"));
    }

    #[test]
    fn query_on_single_repo_ignores_foreign_restriction() {
        let d = dict();
        let repo = d.get("gentoo").unwrap();
        assert!(repo
            .query(&atom("dev-lang/python::guru"))
            .is_empty()
            .unwrap());
    }

    #[test]
    fn set_operations_compose_over_repositories() {
        let d = dict();
        let slotted = d
            .query(&atom("dev-lang/python"))
            .filter(atom("dev-lang/python:3.11"));
        assert_eq!(ids(&slotted), vec!["dev-lang/python-3.11.9::gentoo"]);
    }
}
