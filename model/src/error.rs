use miette::Diagnostic;
use thiserror::Error;

use crate::{ErrorKind, Phase};

#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    /// A field was written after the phase that owns it was locked.
    #[error("attempting to modify {phase} content of `{identity}` after {phase} is locked")]
    #[diagnostic(
        code(model::lock_violation),
        help("Phases lock in the order `source read`, `definition merge`, `analyzed`.")
    )]
    LockViolation { identity: String, phase: Phase },

    #[error("invalid content hash `{0}`")]
    #[diagnostic(code(model::invalid_content_hash))]
    InvalidContentHash(String),

    #[error("record schema mismatch: expected `{expected}`, found `{actual}`")]
    #[diagnostic(code(model::record_schema_mismatch))]
    SchemaMismatch {
        expected: &'static str,
        actual: String,
    },

    #[error("record version mismatch: expected {expected}, found {actual}")]
    #[diagnostic(code(model::record_version_mismatch))]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("no message template for {}", join_kinds(.0))]
    #[diagnostic(code(model::missing_templates))]
    MissingTemplates(Vec<ErrorKind>),

    #[error("invalid type expression `{input}`: {message}")]
    #[diagnostic(code(model::invalid_type))]
    InvalidType { input: String, message: &'static str },
}

fn join_kinds(kinds: &[ErrorKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
