//! Package-matching expressions.
//!
//! An [`Atom`] is the parsed form of a dependency-atom string such as
//! `>=dev-lang/python-3.12:3.12::gentoo`. Parsing is delegated to
//! [`portage_atom`]; this module decomposes the result into the fields the
//! query layer works with and adds the *partial atom* notion: an atom
//! without a category (`foo`, `>=foo-1.2`) that backends may need to
//! disambiguate against multiple categories.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use portage_atom::{Cpv, Dep, Operator, SlotDep, SlotOperator, Version};

use crate::error::{Error, Result};
use crate::package::{MetadataKey, PackageId};

/// Category used internally to make a category-less atom parseable.
///
/// Same trick the Portage bindings use: `foo` becomes `null/foo` for the
/// grammar, and the `null` category is stripped again on display.
const NULL_CATEGORY: &str = "null";

/// A version restriction attached to an atom: a PMS comparison operator
/// plus the constraint version (operator stripped, glob flag preserved).
#[derive(Debug, Clone)]
pub struct VersionReq {
    /// PMS comparison operator (`<`, `<=`, `=`, `>=`, `>`, `~`).
    pub op: Operator,
    /// The constraint version. `glob` is set for the `=cat/pkg-1.2*` form.
    pub version: Version,
}

/// A slot restriction attached to an atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotConstraint {
    /// `:SLOT`, `:SLOT/SUBSLOT` or `:SLOT=` — candidates must occupy the
    /// named slot.
    Named {
        /// Required slot name.
        slot: String,
        /// Required sub-slot, when given.
        subslot: Option<String>,
        /// Whether the `=` rebuild operator was present (`:SLOT=`).
        rebuild: bool,
    },
    /// `:*` — any slot is acceptable.
    Any,
    /// `:=` — any slot, recorded as a rebuild trigger by dep resolvers.
    Rebuild,
}

/// An immutable package-matching expression.
///
/// A *complete* atom carries a category and can be handed to a backend
/// matcher directly; a *partial* one has no category and is resolved during
/// matching (see [`Repository::query`](crate::Repository::query)).
#[derive(Debug, Clone)]
pub struct Atom {
    category: Option<String>,
    name: String,
    version: Option<VersionReq>,
    slot: Option<SlotConstraint>,
    repo: Option<String>,
}

impl Atom {
    /// Parse an atom string.
    ///
    /// Accepts both complete (`dev-lang/python`) and partial (`python`)
    /// forms with any combination of version operator, slot, and `::repo`
    /// restrictions. Blockers and USE-dep bracket constraints are not
    /// package-set filters and are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let op_len = s
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '~'))
            .unwrap_or(s.len());
        let body = &s[op_len..];
        let head = &body[..body.find([':', '[']).unwrap_or(body.len())];
        let partial = !head.contains('/');

        let patched;
        let input = if partial {
            patched = format!("{}{}/{}", &s[..op_len], NULL_CATEGORY, body);
            patched.as_str()
        } else {
            s
        };

        let dep = Dep::parse(input).map_err(|e| Error::ParseAtom {
            atom: s.to_string(),
            reason: e.to_string(),
        })?;

        if dep.blocker.is_some() || dep.use_deps.is_some() {
            return Err(Error::ParseAtom {
                atom: s.to_string(),
                reason: "blocker and USE constraints are not supported in package-set filters"
                    .to_string(),
            });
        }

        let version = dep.version.as_ref().map(|v| VersionReq {
            op: v.op.unwrap_or(Operator::Equal),
            version: Version {
                op: None,
                ..v.clone()
            },
        });

        let slot = match &dep.slot_dep {
            Some(SlotDep::Slot { slot: Some(s), op }) => Some(SlotConstraint::Named {
                slot: s.slot.clone(),
                subslot: s.subslot.clone(),
                rebuild: matches!(op, Some(SlotOperator::Equal)),
            }),
            Some(SlotDep::Operator(SlotOperator::Star)) => Some(SlotConstraint::Any),
            Some(SlotDep::Operator(SlotOperator::Equal)) => Some(SlotConstraint::Rebuild),
            _ => None,
        };

        Ok(Self {
            category: (!partial).then(|| dep.cpn.category.to_string()),
            name: dep.cpn.package.to_string(),
            version,
            slot,
            repo: dep.repo.clone(),
        })
    }

    /// The category restriction, `None` for a partial atom.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// The package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version restriction, if any.
    pub fn version(&self) -> Option<&VersionReq> {
        self.version.as_ref()
    }

    /// The slot restriction, if any.
    pub fn slot(&self) -> Option<&SlotConstraint> {
        self.slot.as_ref()
    }

    /// The `::repo` restriction, if any.
    pub fn repository(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    /// Whether the atom carries a category.
    pub fn is_complete(&self) -> bool {
        self.category.is_some()
    }

    /// Return a copy of this atom with the category filled in.
    ///
    /// Used to turn one ambiguous partial-atom query into fully-qualified
    /// per-category sub-queries.
    pub fn with_category(&self, category: &str) -> Self {
        let mut atom = self.clone();
        atom.category = Some(category.to_string());
        atom
    }

    /// Test the atom against a concrete package.
    ///
    /// Fallible because the slot restriction compares against the package's
    /// `SLOT` metadata, which may require a backend lookup.
    pub fn matches(&self, pkg: &PackageId) -> Result<bool> {
        let slot = if self.needs_slot() {
            pkg.metadata(&MetadataKey::Slot)?
        } else {
            None
        };
        Ok(self.matches_parts(pkg.cpv(), slot.as_deref(), pkg.repo_name()))
    }

    /// Whether matching requires the candidate's slot.
    fn needs_slot(&self) -> bool {
        matches!(self.slot, Some(SlotConstraint::Named { .. }))
    }

    /// Match against the raw parts of a package record. Used by backends
    /// that match during enumeration, where no [`PackageId`] exists yet.
    pub fn matches_parts(&self, cpv: &Cpv, slot: Option<&str>, repo: Option<&str>) -> bool {
        if self.name != cpv.cpn.package.as_str() {
            return false;
        }
        if let Some(category) = &self.category {
            if category.as_str() != cpv.cpn.category.as_str() {
                return false;
            }
        }
        if let Some(req) = &self.version {
            if !version_matches(&cpv.version, &req.op, &req.version) {
                return false;
            }
        }
        if let Some(required) = &self.repo {
            if repo != Some(required.as_str()) {
                return false;
            }
        }
        if let Some(SlotConstraint::Named {
            slot: required,
            subslot,
            ..
        }) = &self.slot
        {
            // SLOT metadata may carry a sub-slot (`0/3.2`).
            let Some(value) = slot else { return false };
            let (main, sub) = match value.split_once('/') {
                Some((m, s)) => (m, Some(s)),
                None => (value, None),
            };
            if main != required {
                return false;
            }
            if let Some(subslot) = subslot {
                if sub != Some(subslot.as_str()) {
                    return false;
                }
            }
        }
        true
    }
}

impl FromStr for Atom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Atom::parse(s)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(req) = &self.version {
            write!(f, "{}", req.op)?;
        }
        if let Some(category) = &self.category {
            write!(f, "{}/", category)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(req) = &self.version {
            let bare = Version {
                glob: false,
                ..req.version.clone()
            };
            write!(f, "-{}", bare)?;
            if req.version.glob {
                write!(f, "*")?;
            }
        }
        match &self.slot {
            Some(SlotConstraint::Named {
                slot,
                subslot,
                rebuild,
            }) => {
                write!(f, ":{}", slot)?;
                if let Some(subslot) = subslot {
                    write!(f, "/{}", subslot)?;
                }
                if *rebuild {
                    write!(f, "=")?;
                }
            }
            Some(SlotConstraint::Any) => write!(f, ":*")?,
            Some(SlotConstraint::Rebuild) => write!(f, ":=")?,
            None => {}
        }
        if let Some(repo) = &self.repo {
            write!(f, "::{}", repo)?;
        }
        Ok(())
    }
}

/// Test whether `candidate` satisfies the constraint `op constraint`
/// per PMS 8.3: `<`, `<=`, `=` (including the `=…*` glob form, handled by
/// [`Version`]'s ordering), `>=`, `>`, and `~` (same base, any revision).
pub(crate) fn version_matches(candidate: &Version, op: &Operator, constraint: &Version) -> bool {
    match op {
        Operator::Less => candidate < constraint,
        Operator::LessOrEqual => candidate <= constraint,
        Operator::Equal => candidate.cmp(constraint) == Ordering::Equal,
        Operator::GreaterOrEqual => candidate >= constraint,
        Operator::Greater => candidate > constraint,
        Operator::Approximate => candidate.base() == constraint.base(),
    }
}
