//! Lazy package sets and their filter/sort/select operations.
//!
//! [`PackageSet`] is the abstraction every repository view implements: one
//! required method, [`PackageSet::iter`], and a family of derived
//! operations built purely on top of it. Laziness is the point —
//! repositories hold tens of thousands of entries and most queries stop
//! after the first match or a narrow filter, so nothing is materialized
//! until a terminal operation forces it.

use std::cmp::Ordering;
use std::fmt;

use crate::atom::Atom;
use crate::error::{Error, Result};
use crate::package::{total_order, MetadataKey, PackageId};

/// The element stream produced by iterating a set.
///
/// Each call to [`PackageSet::iter`] restarts from the beginning; the boxed
/// iterator is a fresh cursor, not a shared one.
pub type PkgIter<'a> = Box<dyn Iterator<Item = Result<PackageId>> + 'a>;

/// Predicate over a package.
pub type Matcher = Box<dyn Fn(&PackageId) -> bool>;

/// Captured filter arguments: at most one atom, any number of predicates,
/// and metadata equality constraints. All parts are AND-ed together.
///
/// Passing a second atom replaces the first; backends cannot evaluate two
/// atoms in one query, so chain `.filter()` calls instead.
#[derive(Default)]
pub struct Filter {
    atom: Option<Atom>,
    matchers: Vec<Matcher>,
    meta: Vec<(MetadataKey, String)>,
}

impl Filter {
    /// An empty filter; matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to packages matching an atom.
    pub fn atom(mut self, atom: Atom) -> Self {
        self.atom = Some(atom);
        self
    }

    /// Restrict with an arbitrary predicate.
    pub fn matcher(mut self, f: impl Fn(&PackageId) -> bool + 'static) -> Self {
        self.matchers.push(Box::new(f));
        self
    }

    /// Require a metadata value to equal `value` exactly.
    pub fn meta(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.meta.push((key, value.into()));
        self
    }

    /// The captured atom, if one was set.
    pub fn atom_ref(&self) -> Option<&Atom> {
        self.atom.as_ref()
    }

    /// Evaluate the whole conjunction against one package.
    pub fn matches(&self, pkg: &PackageId) -> Result<bool> {
        if let Some(atom) = &self.atom {
            if !atom.matches(pkg)? {
                return Ok(false);
            }
        }
        for matcher in &self.matchers {
            if !matcher(pkg) {
                return Ok(false);
            }
        }
        for (key, want) in &self.meta {
            if pkg.metadata(key)?.as_deref() != Some(want.as_str()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl From<Atom> for Filter {
    fn from(atom: Atom) -> Self {
        Filter::new().atom(atom)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("atom", &self.atom)
            .field("matchers", &self.matchers.len())
            .field("meta", &self.meta)
            .finish()
    }
}

/// An abstract lazy collection of packages.
pub trait PackageSet {
    /// Produce a fresh iteration over the set.
    ///
    /// Implementers re-query their upstream source on every call; two
    /// iterations yield equivalent results unless the underlying repository
    /// state changed in between.
    fn iter(&self) -> PkgIter<'_>;

    /// Wrap the set in a lazy filter. Repeated calls AND together.
    fn filter(self, filter: impl Into<Filter>) -> Filtered<Self>
    where
        Self: Sized,
    {
        Filtered {
            src: self,
            filter: filter.into(),
        }
    }

    /// Wrap the set in a sorted view.
    ///
    /// Sorting is inherently eager: each iteration of the result drains the
    /// upstream completely and sorts it, an O(n log n) cost on every pass.
    fn sorted(self) -> Sorted<Self>
    where
        Self: Sized,
    {
        Sorted { src: self }
    }

    /// The newest package in the set.
    ///
    /// Iterates the set once to the end. Fails with [`Error::EmptySet`] on
    /// an empty set and with [`Error::AmbiguousSet`] as soon as two
    /// differently-keyed packages are seen — "newest" is only meaningful
    /// among versions of one package.
    fn best(&self) -> Result<PackageId> {
        let mut best: Option<PackageId> = None;
        for pkg in self.iter() {
            let pkg = pkg?;
            match &best {
                None => best = Some(pkg),
                Some(current) => match current.partial_cmp(&pkg) {
                    None => {
                        return Err(Error::AmbiguousSet(
                            ".best called on a set of differently-named packages".to_string(),
                        ))
                    }
                    Some(Ordering::Less) => best = Some(pkg),
                    Some(_) => {}
                },
            }
        }
        best.ok_or_else(|| Error::EmptySet(".best called on an empty set".to_string()))
    }

    /// Select the single best package matching a filter.
    ///
    /// Equivalent to `filter(...).best()` with clearer wording on failure;
    /// the error kinds are the same.
    fn select(&self, filter: impl Into<Filter>) -> Result<PackageId> {
        let filter = filter.into();
        let mut best: Option<PackageId> = None;
        for pkg in self.iter() {
            let pkg = pkg?;
            if !filter.matches(&pkg)? {
                continue;
            }
            match &best {
                None => best = Some(pkg),
                Some(current) => match current.partial_cmp(&pkg) {
                    None => {
                        return Err(Error::AmbiguousSet(
                            "Ambiguous filter (matches more than a single package name)."
                                .to_string(),
                        ))
                    }
                    Some(Ordering::Less) => best = Some(pkg),
                    Some(_) => {}
                },
            }
        }
        best.ok_or_else(|| Error::EmptySet("No packages match the filters.".to_string()))
    }

    /// Select the single package matching a filter exactly.
    ///
    /// Unlike [`select`](PackageSet::select) this does not collapse
    /// multiple versions of one package: any second match at all is
    /// ambiguous.
    fn lookup(&self, filter: impl Into<Filter>) -> Result<PackageId> {
        let filter = filter.into();
        let mut found: Option<PackageId> = None;
        for pkg in self.iter() {
            let pkg = pkg?;
            if !filter.matches(&pkg)? {
                continue;
            }
            if found.is_some() {
                return Err(Error::AmbiguousSet(
                    "Filter matches more than one package.".to_string(),
                ));
            }
            found = Some(pkg);
        }
        found.ok_or_else(|| Error::EmptySet("No packages match the filter.".to_string()))
    }

    /// Whether at least one package matches the filter. Stops at the first
    /// match.
    fn contains(&self, filter: impl Into<Filter>) -> Result<bool> {
        let filter = filter.into();
        for pkg in self.iter() {
            if filter.matches(&pkg?)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the set yields no packages at all. Stops after the first
    /// element.
    fn is_empty(&self) -> Result<bool> {
        match self.iter().next() {
            None => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(e)) => Err(e),
        }
    }
}

impl<S: PackageSet + ?Sized> PackageSet for &S {
    fn iter(&self) -> PkgIter<'_> {
        (**self).iter()
    }
}

/// A set that yields only the upstream packages accepted by a [`Filter`].
///
/// Holds the upstream by value and re-iterates it on every pass; nothing is
/// buffered.
#[derive(Debug)]
pub struct Filtered<S> {
    src: S,
    filter: Filter,
}

impl<S: PackageSet> PackageSet for Filtered<S> {
    fn iter(&self) -> PkgIter<'_> {
        let filter = &self.filter;
        Box::new(self.src.iter().filter_map(move |item| match item {
            Ok(pkg) => match filter.matches(&pkg) {
                Ok(true) => Some(Ok(pkg)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        }))
    }
}

/// A set that yields the upstream packages in ascending version order.
///
/// Cross-key order is the stable lexical tie-break of
/// [`total_order`](crate::package); within one key it is the PMS version
/// order with repository priority breaking exact-version ties.
#[derive(Debug)]
pub struct Sorted<S> {
    src: S,
}

impl<S: PackageSet> PackageSet for Sorted<S> {
    fn iter(&self) -> PkgIter<'_> {
        let drained: Result<Vec<PackageId>> = self.src.iter().collect();
        match drained {
            Ok(mut packages) => {
                packages.sort_by(total_order);
                Box::new(packages.into_iter().map(Ok))
            }
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }
}
