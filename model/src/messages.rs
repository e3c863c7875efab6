use std::collections::BTreeMap;

use crate::{Error, ErrorKind};

/// Message template per [`ErrorKind`]. Each template has one `{0}` placeholder that receives
/// the causes (or the rotated cycle path) of a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageTemplates {
    templates: BTreeMap<ErrorKind, String>,
}

impl MessageTemplates {
    pub fn builder() -> MessageTemplatesBuilder {
        MessageTemplatesBuilder::default()
    }

    pub fn template(&self, kind: ErrorKind) -> &str {
        self.templates.get(&kind).map(String::as_str).unwrap_or("{0}")
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        let templates = ErrorKind::ALL
            .into_iter()
            .map(|kind| (kind, default_template(kind).to_string()))
            .collect();
        Self { templates }
    }
}

fn default_template(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::CycleInDefinitionSources => "cycle in definition imports {0}",
        ErrorKind::CycleInObjectDefinitions => "cycle in instance dependencies {0}",
        ErrorKind::DuplicateDefinitions => "duplicated matching definitions {0}",
        ErrorKind::DuplicateDependencies => "duplicated matching dependencies {0}",
        ErrorKind::DuplicateObjectDefinitions => "duplicate instance definitions {0}",
        ErrorKind::MissingImport => "no matching definition {0}",
        ErrorKind::MissingBeanDefinitions => {
            "missing instance definitions {0}, create definitions or list them as expected"
        }
        ErrorKind::UnusedExpected => "expected instance name is unnecessary {0}",
        ErrorKind::UnmatchedTypes => "unmatched types {0}",
        ErrorKind::RootNodeImported => "root definitions may not be imported by other definitions: {0}",
        ErrorKind::DependencyShaMismatch => {
            "sha256 mismatch of dependency model of prior analyzed definition {0}"
        }
        ErrorKind::CouldNotRead => "could not read stored definition for {0}",
        ErrorKind::CouldNotStore => "could not store verified definition for {0}",
    }
}

/// Collects one template per kind; building fails while any kind is unset.
#[derive(Clone, Debug, Default)]
pub struct MessageTemplatesBuilder {
    templates: BTreeMap<ErrorKind, String>,
}

impl MessageTemplatesBuilder {
    pub fn template(mut self, kind: ErrorKind, template: impl Into<String>) -> Self {
        self.templates.insert(kind, template.into());
        self
    }

    /// Fill every kind not set so far with the built-in English template.
    pub fn with_defaults(mut self) -> Self {
        for kind in ErrorKind::ALL {
            self.templates
                .entry(kind)
                .or_insert_with(|| default_template(kind).to_string());
        }
        self
    }

    pub fn build(self) -> Result<MessageTemplates, Error> {
        let missing: Vec<ErrorKind> = ErrorKind::ALL
            .into_iter()
            .filter(|kind| !self.templates.contains_key(kind))
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingTemplates(missing));
        }
        Ok(MessageTemplates {
            templates: self.templates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_every_kind() {
        let err = MessageTemplates::builder()
            .template(ErrorKind::UnusedExpected, "unused {0}")
            .build()
            .unwrap_err();
        let Error::MissingTemplates(missing) = err else {
            panic!("unexpected error");
        };
        assert_eq!(missing.len(), ErrorKind::ALL.len() - 1);
        assert!(!missing.contains(&ErrorKind::UnusedExpected));
    }

    #[test]
    fn overrides_survive_defaults() {
        let templates = MessageTemplates::builder()
            .template(ErrorKind::UnusedExpected, "unused {0}")
            .with_defaults()
            .build()
            .unwrap();
        assert_eq!(templates.template(ErrorKind::UnusedExpected), "unused {0}");
        assert_eq!(
            templates.template(ErrorKind::UnmatchedTypes),
            MessageTemplates::default().template(ErrorKind::UnmatchedTypes)
        );
    }
}
