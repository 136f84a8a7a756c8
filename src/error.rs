//! Error taxonomy for package-set queries.
//!
//! Every fallible operation in this crate returns [`Error`]. Selection
//! operations (`best`, `select`, `lookup`) distinguish empty results from
//! ambiguous ones so callers can tell "nothing matched" apart from "the
//! filter was not specific enough".

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures surfaced by the query layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The atom string could not be parsed.
    #[error("malformed atom {atom:?}: {reason}")]
    ParseAtom {
        /// The offending input, verbatim.
        atom: String,
        /// Parser diagnostic from the atom grammar.
        reason: String,
    },

    /// A keyword filter referenced a metadata key this layer does not know.
    #[error("invalid metadata key {0:?}")]
    InvalidKey(String),

    /// A selection operation found no matching packages.
    #[error("{0}")]
    EmptySet(String),

    /// A selection operation matched more packages than it can meaningfully
    /// reduce to one.
    #[error("{0}")]
    AmbiguousSet(String),

    /// Repository lookup by name or path found nothing.
    #[error("no repository matched key {0:?}")]
    RepositoryNotFound(String),

    /// The package-manager configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// A failure inside the backing package-manager library, passed through
    /// unchanged.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl Error {
    /// True for [`Error::EmptySet`].
    pub fn is_empty_set(&self) -> bool {
        matches!(self, Error::EmptySet(_))
    }

    /// True for [`Error::AmbiguousSet`].
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Error::AmbiguousSet(_))
    }
}
