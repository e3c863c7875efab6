use std::{fmt, sync::Arc};

use crate::{Definition, Expected, Instance, MessageTemplates};

/// Kinds of data errors reported by a verification run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    CycleInDefinitionSources,
    CycleInObjectDefinitions,
    DuplicateDefinitions,
    DuplicateDependencies,
    DuplicateObjectDefinitions,
    MissingImport,
    MissingBeanDefinitions,
    UnusedExpected,
    UnmatchedTypes,
    RootNodeImported,
    DependencyShaMismatch,
    CouldNotRead,
    CouldNotStore,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::CycleInDefinitionSources,
        ErrorKind::CycleInObjectDefinitions,
        ErrorKind::DuplicateDefinitions,
        ErrorKind::DuplicateDependencies,
        ErrorKind::DuplicateObjectDefinitions,
        ErrorKind::MissingImport,
        ErrorKind::MissingBeanDefinitions,
        ErrorKind::UnusedExpected,
        ErrorKind::UnmatchedTypes,
        ErrorKind::RootNodeImported,
        ErrorKind::DependencyShaMismatch,
        ErrorKind::CouldNotRead,
        ErrorKind::CouldNotStore,
    ];

    /// Cycle-class diagnostics carry the cycle itself as both causes and involved entities.
    pub fn is_cycle(self) -> bool {
        matches!(
            self,
            ErrorKind::CycleInDefinitionSources | ErrorKind::CycleInObjectDefinitions
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::CycleInDefinitionSources => "cycle_in_definition_sources",
            ErrorKind::CycleInObjectDefinitions => "cycle_in_object_definitions",
            ErrorKind::DuplicateDefinitions => "duplicate_definitions",
            ErrorKind::DuplicateDependencies => "duplicate_dependencies",
            ErrorKind::DuplicateObjectDefinitions => "duplicate_object_definitions",
            ErrorKind::MissingImport => "missing_import",
            ErrorKind::MissingBeanDefinitions => "missing_bean_definitions",
            ErrorKind::UnusedExpected => "unused_expected",
            ErrorKind::UnmatchedTypes => "unmatched_types",
            ErrorKind::RootNodeImported => "root_node_imported",
            ErrorKind::DependencyShaMismatch => "dependency_sha_mismatch",
            ErrorKind::CouldNotRead => "could_not_read",
            ErrorKind::CouldNotStore => "could_not_store",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any graph entity a diagnostic can point at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Definition { identity: String, location: String },
    Instance(Arc<Instance>),
    Expected(Arc<Expected>),
}

impl Entity {
    pub fn definition(definition: &Definition) -> Self {
        Entity::Definition {
            identity: definition.identity().to_string(),
            location: definition.location().to_string(),
        }
    }

    /// A definition that could not be resolved, named by the identity that was asked for.
    pub fn unresolved(identity: impl Into<String>, location: impl Into<String>) -> Self {
        Entity::Definition {
            identity: identity.into(),
            location: location.into(),
        }
    }

    pub fn identity(&self) -> &str {
        match self {
            Entity::Definition { identity, .. } => identity,
            Entity::Instance(instance) => &instance.name,
            Entity::Expected(expected) => &expected.name,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            Entity::Definition { location, .. } => location,
            Entity::Instance(instance) => &instance.location,
            Entity::Expected(expected) => &expected.owner,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identity())
    }
}

impl From<Arc<Instance>> for Entity {
    fn from(instance: Arc<Instance>) -> Self {
        Entity::Instance(instance)
    }
}

impl From<Expected> for Entity {
    fn from(expected: Expected) -> Self {
        Entity::Expected(Arc::new(expected))
    }
}

/// One detected problem: what went wrong, which entities caused it and which entities it
/// should be reported on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    kind: ErrorKind,
    causes: Vec<Entity>,
    involved: Vec<Entity>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, causes: Vec<Entity>, involved: Vec<Entity>) -> Self {
        debug_assert!(
            !kind.is_cycle() || causes == involved,
            "cycle diagnostics must involve exactly their causes"
        );
        Self {
            kind,
            causes,
            involved,
        }
    }

    /// A cycle-class diagnostic over `members`, in traversal order.
    pub fn cycle(kind: ErrorKind, members: Vec<Entity>) -> Self {
        debug_assert!(kind.is_cycle());
        Self {
            kind,
            causes: members.clone(),
            involved: members,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn causes(&self) -> &[Entity] {
        &self.causes
    }

    pub fn involved(&self) -> &[Entity] {
        &self.involved
    }

    pub fn is_cyclic(&self) -> bool {
        self.kind.is_cycle()
    }

    /// Render the message as seen from one involved entity.
    ///
    /// Cycles are printed starting at `on`. Other diagnostics name their causes, leaving out
    /// `on` itself when there is more than one cause.
    pub fn message_on(&self, on: &Entity, templates: &MessageTemplates) -> String {
        let template = templates.template(self.kind);
        if !self.is_cyclic() {
            let subject = if self.causes.len() == 1 {
                self.causes[0].to_string()
            } else {
                self.causes
                    .iter()
                    .filter(|cause| *cause != on)
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return template.replace("{0}", &subject);
        }

        let path = match self.involved.iter().position(|entity| entity == on) {
            Some(start) => self.involved[start..]
                .iter()
                .chain(&self.involved[..start])
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> "),
            None => String::new(),
        };
        template.replace("{0}", &path)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |entities: &[Entity]| {
            entities
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "{} on [{}] caused by [{}]",
            self.kind,
            join(&self.involved),
            join(&self.causes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(identity: &str) -> Entity {
        Entity::unresolved(identity, format!("{identity}.json5"))
    }

    #[test]
    fn cycle_message_rotates_to_entity() {
        let (a, b, c) = (definition("A"), definition("B"), definition("C"));
        let cycle = Diagnostic::cycle(
            ErrorKind::CycleInDefinitionSources,
            vec![a.clone(), b.clone(), c.clone()],
        );
        let templates = MessageTemplates::default();

        assert_eq!(cycle.causes(), cycle.involved());
        assert_eq!(
            cycle.message_on(&a, &templates),
            "cycle in definition imports A -> B -> C"
        );
        assert_eq!(
            cycle.message_on(&b, &templates),
            "cycle in definition imports B -> C -> A"
        );
        assert_eq!(
            cycle.message_on(&c, &templates),
            "cycle in definition imports C -> A -> B"
        );
    }

    #[test]
    fn multi_cause_message_skips_entity() {
        let (a, b, c) = (definition("A"), definition("B"), definition("C"));
        let diagnostic = Diagnostic::new(
            ErrorKind::DuplicateObjectDefinitions,
            vec![a.clone(), b.clone(), c.clone()],
            vec![a.clone()],
        );
        let templates = MessageTemplates::default();
        assert_eq!(
            diagnostic.message_on(&a, &templates),
            "duplicate instance definitions B, C"
        );
    }

    #[test]
    fn single_cause_message_keeps_cause() {
        let a = definition("A");
        let diagnostic =
            Diagnostic::new(ErrorKind::UnusedExpected, vec![a.clone()], vec![a.clone()]);
        assert_eq!(
            diagnostic.message_on(&a, &MessageTemplates::default()),
            "expected instance name is unnecessary A"
        );
    }

    #[test]
    fn kind_codes_are_unique() {
        let mut codes: Vec<_> = ErrorKind::ALL.iter().map(|kind| kind.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }
}
