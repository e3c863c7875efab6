//! Storage of analyzed definitions keyed by identity.

mod dir;
mod memory;

use std::{io, path::PathBuf};

use miette::Diagnostic;
use splice_model::Definition;
use thiserror::Error;

pub use dir::DirStore;
pub use memory::MemoryStore;

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error("io error on `{}`: {source}", path.display())]
    #[diagnostic(code(store::io_error))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid stored definition `{}`: {source}", path.display())]
    #[diagnostic(code(store::invalid_record))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("identity `{0}` cannot be used as a storage key")]
    #[diagnostic(
        code(store::invalid_identity),
        help("Identities may not be empty or contain path separators or `..`.")
    )]
    InvalidIdentity(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] splice_model::Error),
}

/// Key to list-of-definitions storage for analyzed definitions.
///
/// `lookup` distinguishes "nothing stored" (an empty list) from a read failure (an error).
/// Loaded definitions are analyzed-locked and carry no linked dependencies. `store` replaces
/// whatever was stored for the definition's identity.
pub trait ModelStore: Send + Sync {
    fn lookup(&self, identity: &str) -> Result<Vec<Definition>, Error>;

    fn store(&self, definition: &Definition) -> Result<(), Error>;
}

impl<S: ModelStore + ?Sized> ModelStore for &S {
    fn lookup(&self, identity: &str) -> Result<Vec<Definition>, Error> {
        (**self).lookup(identity)
    }

    fn store(&self, definition: &Definition) -> Result<(), Error> {
        (**self).store(definition)
    }
}
