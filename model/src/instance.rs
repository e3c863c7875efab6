use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named, producible value declared by a definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[builder(on(String, into))]
pub struct Instance {
    pub name: String,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Identity of the definition declaring this instance.
    pub owner: String,
    pub location: String,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyEdge>,
    /// Set for instances built from source in the current run; never persisted.
    #[builder(default)]
    #[serde(skip)]
    pub live: bool,
}

impl Instance {
    /// The primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// A directed edge from an instance to the name it requires.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub target: String,
    pub required_type: String,
}

impl DependencyEdge {
    pub fn new(target: impl Into<String>, required_type: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            required_type: required_type.into(),
        }
    }
}

/// A placeholder for an instance that a definition requires but does not produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expected {
    pub name: String,
    /// Identity of the definition declaring (or needing) the placeholder.
    pub owner: String,
    /// Consuming instance name to the type it requires.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub usage_sites: BTreeMap<String, String>,
}

impl Expected {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            usage_sites: BTreeMap::new(),
        }
    }

    pub fn with_usage(mut self, consumer: impl Into<String>, required_type: impl Into<String>) -> Self {
        self.usage_sites.insert(consumer.into(), required_type.into());
        self
    }
}
