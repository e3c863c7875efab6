use std::{collections::BTreeMap, sync::Arc};

use crate::{
    ContentHash, DefId, DefinitionRecord, Error, Expected, Instance, Phase, PhaseLock,
};

/// A unit of configuration: a node of the module-level graph.
///
/// Fields are grouped by the [`Phase`] that owns them. Accessors lock their phase on read and
/// mutators fail with [`Error::LockViolation`] once their phase is locked.
#[derive(Debug)]
pub struct Definition {
    identity: String,
    root: bool,
    location: String,

    // source read
    imports: Vec<String>,
    instances: Vec<Arc<Instance>>,
    expected: Vec<Expected>,

    // definition merge
    dependencies: Vec<DefId>,

    // analyzed
    provided: Vec<Arc<Instance>>,
    computed_expected: BTreeMap<String, Expected>,
    dependency_hashes: BTreeMap<String, ContentHash>,

    lock: PhaseLock,
}

impl Definition {
    pub fn new(identity: impl Into<String>, location: impl Into<String>, root: bool) -> Self {
        Self {
            identity: identity.into(),
            root,
            location: location.into(),
            imports: Vec::new(),
            instances: Vec::new(),
            expected: Vec::new(),
            dependencies: Vec::new(),
            provided: Vec::new(),
            computed_expected: BTreeMap::new(),
            dependency_hashes: BTreeMap::new(),
            lock: PhaseLock::new(),
        }
    }

    /// Rebuild an analyzed definition from storage, reattaching its source location.
    pub fn from_record(record: DefinitionRecord, location: impl Into<String>) -> Result<Self, Error> {
        let record = record.validate()?;
        let definition = Self {
            identity: record.identity,
            root: record.root,
            location: location.into(),
            imports: record.imports,
            instances: record.instances,
            expected: record.expected,
            dependencies: Vec::new(),
            provided: record.provided,
            computed_expected: record
                .computed_expected
                .into_iter()
                .map(|expected| (expected.name.clone(), expected))
                .collect(),
            dependency_hashes: record.dependency_hashes,
            lock: PhaseLock::new(),
        };
        definition.lock.lock(Phase::Analyzed);
        Ok(definition)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn phase(&self) -> Option<Phase> {
        self.lock.locked()
    }

    pub fn is_analyzed(&self) -> bool {
        self.lock.is_locked(Phase::Analyzed)
    }

    /// True when the definition declares no expectations.
    pub fn is_complete(&self) -> bool {
        self.expected.is_empty()
    }

    pub fn add_import(&mut self, name: impl Into<String>) -> Result<(), Error> {
        self.lock.check_write(Phase::SourceRead, &self.identity)?;
        self.imports.push(name.into());
        Ok(())
    }

    pub fn add_instance(&mut self, instance: Instance) -> Result<(), Error> {
        self.lock.check_write(Phase::SourceRead, &self.identity)?;
        self.instances.push(Arc::new(instance));
        Ok(())
    }

    pub fn add_expected(&mut self, expected: Expected) -> Result<(), Error> {
        self.lock.check_write(Phase::SourceRead, &self.identity)?;
        self.expected.push(expected);
        Ok(())
    }

    pub fn imports(&self) -> &[String] {
        self.lock.lock(Phase::SourceRead);
        &self.imports
    }

    pub fn instances(&self) -> &[Arc<Instance>] {
        self.lock.lock(Phase::SourceRead);
        &self.instances
    }

    pub fn expected(&self) -> &[Expected] {
        self.lock.lock(Phase::SourceRead);
        &self.expected
    }

    pub fn add_dependency(&mut self, dependency: DefId) -> Result<(), Error> {
        self.lock.check_write(Phase::Merged, &self.identity)?;
        self.dependencies.push(dependency);
        Ok(())
    }

    pub fn dependencies(&self) -> &[DefId] {
        self.lock.lock(Phase::Merged);
        &self.dependencies
    }

    pub fn add_provided(&mut self, instance: Arc<Instance>) -> Result<(), Error> {
        self.lock.check_write(Phase::Analyzed, &self.identity)?;
        self.provided.push(instance);
        Ok(())
    }

    pub fn add_computed_expected(&mut self, expected: Expected) -> Result<(), Error> {
        self.lock.check_write(Phase::Analyzed, &self.identity)?;
        self.computed_expected.insert(expected.name.clone(), expected);
        Ok(())
    }

    pub fn add_dependency_hash(
        &mut self,
        identity: impl Into<String>,
        hash: ContentHash,
    ) -> Result<(), Error> {
        self.lock.check_write(Phase::Analyzed, &self.identity)?;
        self.dependency_hashes.insert(identity.into(), hash);
        Ok(())
    }

    pub fn provided(&self) -> &[Arc<Instance>] {
        self.lock.lock(Phase::Analyzed);
        &self.provided
    }

    pub fn computed_expected(&self) -> &BTreeMap<String, Expected> {
        self.lock.lock(Phase::Analyzed);
        &self.computed_expected
    }

    pub fn dependency_hashes(&self) -> &BTreeMap<String, ContentHash> {
        self.lock.lock(Phase::Analyzed);
        &self.dependency_hashes
    }

    /// Finish analysis. Further writes to any phase fail.
    pub fn lock_analyzed(&self) {
        self.lock.lock(Phase::Analyzed);
    }

    /// The persisted form. Reads analyzed data, so this locks the definition.
    pub fn to_record(&self) -> DefinitionRecord {
        self.lock.lock(Phase::Analyzed);
        self.snapshot()
    }

    /// Digest over the persisted form. Does not touch the phase lock.
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of(&self.snapshot())
    }

    fn snapshot(&self) -> DefinitionRecord {
        DefinitionRecord::new(
            self.identity.clone(),
            self.root,
            self.imports.clone(),
            self.instances.clone(),
            self.expected.clone(),
            self.provided.clone(),
            self.computed_expected.values().cloned().collect(),
            self.dependency_hashes.clone(),
        )
    }
}
