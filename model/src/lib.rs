//! Graph model of splice: definitions, instances, expectations and the diagnostics raised
//! against them.

mod definition;
mod diagnostic;
mod error;
mod graph;
mod hash;
mod instance;
mod messages;
mod phase;
mod record;
pub mod types;

pub use definition::Definition;
pub use diagnostic::{Diagnostic, Entity, ErrorKind};
pub use error::Error;
pub use graph::{DefId, DefinitionGraph};
pub use hash::ContentHash;
pub use instance::{DependencyEdge, Expected, Instance};
pub use messages::{MessageTemplates, MessageTemplatesBuilder};
pub use phase::{Phase, PhaseLock};
pub use record::{DEFINITION_RECORD_SCHEMA, DEFINITION_RECORD_VERSION, DefinitionRecord};
pub use types::{TypeExpr, TypeOracle, TypeTable};
