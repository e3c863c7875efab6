use std::{
    collections::HashMap,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

use crate::Definition;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefId(pub usize);

/// Arena of every definition touched by one verification run.
///
/// Dependency references are [`DefId`]s into this arena, so cyclic imports are representable
/// and can be detected rather than prevented.
///
/// Two kinds of nodes exist:
/// - batch definitions, freshly built from source in this run;
/// - loaded definitions, fetched from storage and cached per identity so that a stored
///   definition reached through several imports is a single node.
#[derive(Debug, Default)]
pub struct DefinitionGraph {
    definitions: Vec<Definition>,
    in_batch: Vec<bool>,
    batch: Vec<DefId>,
    loaded: HashMap<String, Vec<DefId>>,
}

impl DefinitionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Register a definition built from source in this run.
    pub fn add(&mut self, definition: Definition) -> DefId {
        let id = self.push(definition, true);
        self.batch.push(id);
        id
    }

    /// Register the result of a storage lookup for `identity`.
    pub fn insert_loaded(
        &mut self,
        identity: impl Into<String>,
        definitions: Vec<Definition>,
    ) -> Vec<DefId> {
        let ids: Vec<DefId> = definitions
            .into_iter()
            .map(|definition| self.push(definition, false))
            .collect();
        self.loaded.insert(identity.into(), ids.clone());
        ids
    }

    /// Cached lookup result for `identity`, if storage was already consulted.
    pub fn loaded(&self, identity: &str) -> Option<&[DefId]> {
        self.loaded.get(identity).map(Vec::as_slice)
    }

    pub fn batch(&self) -> &[DefId] {
        &self.batch
    }

    pub fn is_batch(&self, id: DefId) -> bool {
        self.in_batch[id.0]
    }

    pub fn batch_named(&self, identity: &str) -> Vec<DefId> {
        self.batch
            .iter()
            .copied()
            .filter(|id| self[*id].identity() == identity)
            .collect()
    }

    /// Definitions already known for `identity`: the batch ones if any, else the cached
    /// lookup result. `None` means storage was never consulted for it.
    pub fn find(&self, identity: &str) -> Option<Vec<DefId>> {
        let batch = self.batch_named(identity);
        if !batch.is_empty() {
            return Some(batch);
        }
        self.loaded(identity).map(<[DefId]>::to_vec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DefId, &Definition)> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(idx, definition)| (DefId(idx), definition))
    }

    fn push(&mut self, definition: Definition, batch: bool) -> DefId {
        let id = DefId(self.definitions.len());
        self.definitions.push(definition);
        self.in_batch.push(batch);
        id
    }
}

impl Index<DefId> for DefinitionGraph {
    type Output = Definition;

    fn index(&self, id: DefId) -> &Definition {
        &self.definitions[id.0]
    }
}

impl IndexMut<DefId> for DefinitionGraph {
    fn index_mut(&mut self, id: DefId) -> &mut Definition {
        &mut self.definitions[id.0]
    }
}
