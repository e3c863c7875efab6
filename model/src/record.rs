use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{ContentHash, Error, Expected, Instance};

pub const DEFINITION_RECORD_SCHEMA: &str = "splice.definition";
pub const DEFINITION_RECORD_VERSION: u32 = 1;

/// Persisted form of an analyzed definition.
///
/// Holds every durable field. The content hash and the source location are never stored;
/// both are recomputed or reattached on load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    pub schema: String,
    pub version: u32,
    pub identity: String,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub instances: Vec<Arc<Instance>>,
    #[serde(default)]
    pub expected: Vec<Expected>,
    #[serde(default)]
    pub provided: Vec<Arc<Instance>>,
    #[serde(default)]
    pub computed_expected: Vec<Expected>,
    #[serde(default)]
    pub dependency_hashes: BTreeMap<String, ContentHash>,
}

impl DefinitionRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        identity: String,
        root: bool,
        imports: Vec<String>,
        instances: Vec<Arc<Instance>>,
        expected: Vec<Expected>,
        provided: Vec<Arc<Instance>>,
        computed_expected: Vec<Expected>,
        dependency_hashes: BTreeMap<String, ContentHash>,
    ) -> Self {
        Self {
            schema: DEFINITION_RECORD_SCHEMA.to_string(),
            version: DEFINITION_RECORD_VERSION,
            identity,
            root,
            imports,
            instances,
            expected,
            provided,
            computed_expected,
            dependency_hashes,
        }
    }

    pub fn validate(self) -> Result<Self, Error> {
        if self.schema != DEFINITION_RECORD_SCHEMA {
            return Err(Error::SchemaMismatch {
                expected: DEFINITION_RECORD_SCHEMA,
                actual: self.schema,
            });
        }
        if self.version != DEFINITION_RECORD_VERSION {
            return Err(Error::VersionMismatch {
                expected: DEFINITION_RECORD_VERSION,
                actual: self.version,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Definition;

    #[test]
    fn record_never_carries_hash_or_location() {
        let definition = Definition::new("a", "src/a.json5", true);
        let json = serde_json::to_value(definition.to_record()).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("location"));
        assert!(!object.contains_key("hash"));
        assert_eq!(object["schema"], DEFINITION_RECORD_SCHEMA);
        assert_eq!(object["root"], true);
    }

    #[test]
    fn rejects_foreign_schema_and_version() {
        let mut record = Definition::new("a", "a", false).to_record();
        record.version = 9;
        assert!(matches!(
            record.clone().validate(),
            Err(Error::VersionMismatch { actual: 9, .. })
        ));
        record.schema = "other".to_string();
        assert!(matches!(
            Definition::from_record(record, "a"),
            Err(Error::SchemaMismatch { .. })
        ));
    }
}
