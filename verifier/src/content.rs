use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use splice_model::{
    ContentHash, DefId, DefinitionGraph, Diagnostic, Entity, ErrorKind, Expected, Instance,
    TypeOracle,
};
use splice_store::ModelStore;

use crate::{Error, VerifyOptions, cycles::simple_cycles, lookup, sink::Reporter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Committed,
    Errored,
}

/// Name to the single instance providing it.
type InstanceTable = BTreeMap<String, Arc<Instance>>;

/// A name referenced by some instance but provided by none.
#[derive(Debug, Default)]
struct Need {
    node: usize,
    usage_sites: BTreeMap<String, String>,
    consumers: Vec<Arc<Instance>>,
}

enum Node {
    Instance(Arc<Instance>),
    Expected(String),
}

/// Instance-level dependency graph of one definition.
struct InstanceGraph {
    nodes: Vec<Node>,
    out: Vec<Vec<usize>>,
    needs: BTreeMap<String, Need>,
}

impl InstanceGraph {
    /// Nodes are the distinct instances of `table` ordered by location, followed by one
    /// placeholder per unresolved name.
    fn build(table: &InstanceTable) -> Self {
        let distinct: BTreeMap<&str, &Arc<Instance>> = table
            .values()
            .map(|instance| (instance.location.as_str(), instance))
            .collect();
        let index: HashMap<&str, usize> = distinct
            .keys()
            .enumerate()
            .map(|(idx, location)| (*location, idx))
            .collect();

        let mut nodes: Vec<Node> = distinct
            .values()
            .map(|instance| Node::Instance(Arc::clone(instance)))
            .collect();
        let mut out = vec![Vec::new(); nodes.len()];
        let mut needs: BTreeMap<String, Need> = BTreeMap::new();

        for (idx, instance) in distinct.values().enumerate() {
            for edge in &instance.dependencies {
                let target = match table.get(&edge.target) {
                    Some(supplier) => index[supplier.location.as_str()],
                    None => {
                        let need = needs.entry(edge.target.clone()).or_insert_with(|| {
                            nodes.push(Node::Expected(edge.target.clone()));
                            out.push(Vec::new());
                            Need {
                                node: nodes.len() - 1,
                                ..Need::default()
                            }
                        });
                        need.usage_sites
                            .insert(instance.name.clone(), edge.required_type.clone());
                        need.consumers.push(Arc::clone(instance));
                        need.node
                    }
                };
                out[idx].push(target);
            }
        }

        for targets in &mut out {
            targets.sort_unstable();
            targets.dedup();
        }

        Self { nodes, out, needs }
    }

    fn provided(&self) -> Vec<Arc<Instance>> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Instance(instance) => Some(Arc::clone(instance)),
                Node::Expected(_) => None,
            })
            .collect()
    }

    fn entity(&self, node: usize, owner: &str) -> Entity {
        match &self.nodes[node] {
            Node::Instance(instance) => Entity::Instance(Arc::clone(instance)),
            Node::Expected(name) => Entity::from(Expected::new(name, owner)),
        }
    }
}

/// Depth-first content verification from the head definitions towards the leaves.
///
/// Each definition is inspected at most once per run. Definitions that pass every check are
/// committed: their analyzed data is written, they are locked and handed to the store.
pub(crate) struct ContentInspector<'a, 'r, S: ?Sized, O: ?Sized> {
    graph: &'a mut DefinitionGraph,
    store: &'a S,
    oracle: &'a O,
    options: &'a VerifyOptions,
    report: &'a mut Reporter<'r>,
    outcomes: HashMap<DefId, Outcome>,
    hash_checks: HashMap<DefId, bool>,
}

impl<'a, 'r, S, O> ContentInspector<'a, 'r, S, O>
where
    S: ModelStore + ?Sized,
    O: TypeOracle + ?Sized,
{
    pub(crate) fn new(
        graph: &'a mut DefinitionGraph,
        store: &'a S,
        oracle: &'a O,
        options: &'a VerifyOptions,
        report: &'a mut Reporter<'r>,
    ) -> Self {
        Self {
            graph,
            store,
            oracle,
            options,
            report,
            outcomes: HashMap::new(),
            hash_checks: HashMap::new(),
        }
    }

    /// Inspect every head; returns how many definitions were committed.
    pub(crate) fn inspect(mut self, heads: &[DefId]) -> Result<usize, Error> {
        for &head in heads {
            self.analyze(head)?;
        }
        Ok(self
            .outcomes
            .values()
            .filter(|outcome| **outcome == Outcome::Committed)
            .count())
    }

    fn analyze(&mut self, id: DefId) -> Result<Outcome, Error> {
        if let Some(outcome) = self.outcomes.get(&id) {
            return Ok(*outcome);
        }
        if self.graph[id].is_analyzed() {
            return Ok(Outcome::Committed);
        }

        let dependencies = self.graph[id].dependencies().to_vec();
        let mut dependency_failed = false;
        for &dependency in &dependencies {
            if self.analyze(dependency)? == Outcome::Errored {
                dependency_failed = true;
            }
        }
        if dependency_failed {
            tracing::debug!(
                identity = self.graph[id].identity(),
                "not committed: a dependency failed verification"
            );
            return Ok(self.finish(id, Outcome::Errored));
        }

        tracing::trace!(identity = self.graph[id].identity(), "inspecting content");
        if !self.verify_hashes(&dependencies)? {
            return Ok(self.finish(id, Outcome::Errored));
        }

        let before = self.report.pushed();
        let Some(table) = self.instance_table(id, &dependencies)? else {
            return Ok(self.finish(id, Outcome::Errored));
        };

        let instances = InstanceGraph::build(&table);
        if self.report_instance_cycles(id, &instances)? {
            return Ok(self.finish(id, Outcome::Errored));
        }

        let computed = self.reconcile_expected(id, &instances)?;
        self.check_local_types(id, &table)?;
        self.check_inherited_types(id, &dependencies, &table)?;
        if self.report.pushed() > before {
            return Ok(self.finish(id, Outcome::Errored));
        }

        let outcome = self.commit(id, &dependencies, instances.provided(), computed)?;
        Ok(self.finish(id, outcome))
    }

    fn finish(&mut self, id: DefId, outcome: Outcome) -> Outcome {
        self.outcomes.insert(id, outcome);
        outcome
    }

    fn definition_entity(&self, id: DefId) -> Entity {
        Entity::definition(&self.graph[id])
    }

    /// Compare the hashes recorded by already analyzed dependencies with what they point at now.
    fn verify_hashes(&mut self, dependencies: &[DefId]) -> Result<bool, Error> {
        let mut consistent = true;
        for &dependency in dependencies {
            // Analyzed in this run; its hashes were just recorded.
            if self.outcomes.get(&dependency) == Some(&Outcome::Committed) {
                continue;
            }
            if !self.verify_dependency_hashes(dependency)? {
                consistent = false;
            }
        }
        Ok(consistent)
    }

    fn verify_dependency_hashes(&mut self, dependency: DefId) -> Result<bool, Error> {
        if let Some(consistent) = self.hash_checks.get(&dependency) {
            return Ok(*consistent);
        }

        let recorded: Vec<(String, ContentHash)> = self.graph[dependency]
            .dependency_hashes()
            .iter()
            .map(|(identity, hash)| (identity.clone(), *hash))
            .collect();
        let stale = self.definition_entity(dependency);
        let mut consistent = true;

        for (identity, hash) in recorded {
            // Re-verified in this run; its new hash only matters on the next pass.
            if !self.graph.batch_named(&identity).is_empty() {
                continue;
            }
            let candidates = match lookup::resolve_stored(self.graph, self.store, &identity) {
                Ok(candidates) => candidates,
                Err(err) => {
                    tracing::warn!(identity = %identity, error = %err, "failed to read definition");
                    self.report.push(Diagnostic::new(
                        ErrorKind::CouldNotRead,
                        vec![Entity::unresolved(&identity, stale.location())],
                        vec![stale.clone()],
                    ))?;
                    consistent = false;
                    continue;
                }
            };
            if candidates
                .iter()
                .any(|candidate| self.graph[*candidate].content_hash() == hash)
            {
                continue;
            }

            let changed = match candidates.first() {
                Some(candidate) => self.definition_entity(*candidate),
                None => Entity::unresolved(&identity, stale.location()),
            };
            tracing::debug!(
                dependency = stale.identity(),
                changed = %identity,
                "recorded dependency hash is stale"
            );
            self.report.push(Diagnostic::new(
                ErrorKind::DependencyShaMismatch,
                vec![stale.clone(), changed],
                vec![stale.clone()],
            ))?;
            consistent = false;
        }

        self.hash_checks.insert(dependency, consistent);
        Ok(consistent)
    }

    /// Merge local instances with everything the dependencies provide.
    ///
    /// A name reached through several import paths is fine as long as every path ends at the same
    /// source location. Returns `None` when some name is ambiguous.
    fn instance_table(
        &mut self,
        id: DefId,
        dependencies: &[DefId],
    ) -> Result<Option<InstanceTable>, Error> {
        let candidates: Vec<Arc<Instance>> = self.graph[id]
            .instances()
            .iter()
            .chain(
                dependencies
                    .iter()
                    .flat_map(|dependency| self.graph[*dependency].provided()),
            )
            .cloned()
            .collect();

        let mut by_name: BTreeMap<String, BTreeMap<String, Arc<Instance>>> = BTreeMap::new();
        for instance in &candidates {
            for name in instance.names() {
                let sources = by_name.entry(name.to_string()).or_default();
                match sources.get(&instance.location) {
                    Some(existing) if existing.live || !instance.live => {}
                    _ => {
                        sources.insert(instance.location.clone(), Arc::clone(instance));
                    }
                }
            }
        }

        let owner = self.definition_entity(id);
        let mut table = InstanceTable::new();
        let mut reported: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut ambiguous = false;
        for (name, mut sources) in by_name {
            if sources.len() == 1 {
                if let Some((_, instance)) = sources.pop_first() {
                    table.insert(name, instance);
                }
                continue;
            }

            ambiguous = true;
            if !reported.insert(sources.keys().cloned().collect()) {
                continue;
            }
            let causes: Vec<Entity> = sources.values().cloned().map(Entity::from).collect();
            let mut involved = vec![owner.clone()];
            involved.extend(
                sources
                    .values()
                    .filter(|instance| instance.live)
                    .cloned()
                    .map(Entity::from),
            );
            self.report.push(Diagnostic::new(
                ErrorKind::DuplicateObjectDefinitions,
                causes,
                involved,
            ))?;
        }

        Ok((!ambiguous).then_some(table))
    }

    fn report_instance_cycles(
        &mut self,
        id: DefId,
        instances: &InstanceGraph,
    ) -> Result<bool, Error> {
        let owner = self.graph[id].identity().to_string();
        let cycles = simple_cycles(&instances.out, self.options.cycle_limit);
        for cycle in &cycles {
            let members = cycle
                .iter()
                .map(|node| instances.entity(*node, &owner))
                .collect();
            self.report
                .push(Diagnostic::cycle(ErrorKind::CycleInObjectDefinitions, members))?;
        }
        Ok(!cycles.is_empty())
    }

    /// Match unresolved names against the declared expectations.
    ///
    /// Returns the expectations that are both declared and actually needed.
    fn reconcile_expected(
        &mut self,
        id: DefId,
        instances: &InstanceGraph,
    ) -> Result<Vec<Expected>, Error> {
        let owner = self.definition_entity(id);
        let identity = owner.identity().to_string();
        let declared = self.graph[id].expected().to_vec();
        let declared_names: BTreeSet<&str> = declared.iter().map(|e| e.name.as_str()).collect();

        let mut computed = Vec::new();
        for (name, need) in &instances.needs {
            let expected = Expected {
                name: name.clone(),
                owner: identity.clone(),
                usage_sites: need.usage_sites.clone(),
            };
            if declared_names.contains(name.as_str()) {
                computed.push(expected);
                continue;
            }

            let mut involved = vec![owner.clone()];
            for consumer in need.consumers.iter().filter(|consumer| consumer.live) {
                let entity = Entity::Instance(Arc::clone(consumer));
                if !involved.contains(&entity) {
                    involved.push(entity);
                }
            }
            self.report.push(Diagnostic::new(
                ErrorKind::MissingBeanDefinitions,
                vec![Entity::from(expected)],
                involved,
            ))?;
        }

        for expected in declared {
            if instances.needs.contains_key(&expected.name) {
                continue;
            }
            self.report.push(Diagnostic::new(
                ErrorKind::UnusedExpected,
                vec![Entity::from(expected)],
                vec![owner.clone()],
            ))?;
        }

        Ok(computed)
    }

    /// Type-check every resolved dependency edge of the local instances.
    fn check_local_types(&mut self, id: DefId, table: &InstanceTable) -> Result<(), Error> {
        let locals = self.graph[id].instances().to_vec();
        for consumer in &locals {
            for (slot, edge) in consumer.dependencies.iter().enumerate() {
                let Some(supplier) = table.get(&edge.target) else {
                    continue;
                };
                if self.oracle.is_assignable(supplier, consumer, slot) {
                    continue;
                }
                let members = vec![
                    Entity::Instance(Arc::clone(consumer)),
                    Entity::Instance(Arc::clone(supplier)),
                ];
                self.report.push(Diagnostic::new(
                    ErrorKind::UnmatchedTypes,
                    members.clone(),
                    members,
                ))?;
            }
        }
        Ok(())
    }

    /// Type-check instances now supplied for the expectations of the dependencies.
    fn check_inherited_types(
        &mut self,
        id: DefId,
        dependencies: &[DefId],
        table: &InstanceTable,
    ) -> Result<(), Error> {
        let declared: BTreeSet<String> = self.graph[id]
            .expected()
            .iter()
            .map(|expected| expected.name.clone())
            .collect();

        let mut inherited: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for dependency in dependencies {
            for (name, expected) in self.graph[*dependency].computed_expected() {
                if declared.contains(name) {
                    continue;
                }
                inherited
                    .entry(name.clone())
                    .or_default()
                    .extend(expected.usage_sites.keys().cloned());
            }
        }

        let owner = self.definition_entity(id);
        for (name, consumers) in inherited {
            let Some(supplier) = table.get(&name) else {
                continue;
            };
            let mut mismatched = Vec::new();
            for consumer_name in consumers {
                let Some(consumer) = table.get(&consumer_name) else {
                    continue;
                };
                let Some(slot) = consumer
                    .dependencies
                    .iter()
                    .position(|edge| edge.target == name)
                else {
                    continue;
                };
                if !self.oracle.is_assignable(supplier, consumer, slot) {
                    mismatched.push(Entity::Instance(Arc::clone(consumer)));
                }
            }
            if mismatched.is_empty() {
                continue;
            }

            let supplier = Entity::Instance(Arc::clone(supplier));
            let mut causes = vec![supplier.clone()];
            causes.extend(mismatched);
            self.report.push(Diagnostic::new(
                ErrorKind::UnmatchedTypes,
                causes,
                vec![owner.clone(), supplier],
            ))?;
        }
        Ok(())
    }

    /// Record the analyzed data, lock the definition and persist it.
    fn commit(
        &mut self,
        id: DefId,
        dependencies: &[DefId],
        provided: Vec<Arc<Instance>>,
        computed: Vec<Expected>,
    ) -> Result<Outcome, Error> {
        let hashes: Vec<(String, ContentHash)> = dependencies
            .iter()
            .map(|dependency| {
                let dependency = &self.graph[*dependency];
                (dependency.identity().to_string(), dependency.content_hash())
            })
            .collect();

        let definition = &mut self.graph[id];
        for instance in provided {
            definition.add_provided(instance)?;
        }
        for (identity, hash) in hashes {
            definition.add_dependency_hash(identity, hash)?;
        }
        for expected in computed {
            definition.add_computed_expected(expected)?;
        }
        definition.lock_analyzed();

        let definition = &self.graph[id];
        if let Err(err) = self.store.store(definition) {
            tracing::warn!(
                identity = definition.identity(),
                error = %err,
                "failed to store definition"
            );
            let entity = Entity::definition(definition);
            self.report.push(Diagnostic::new(
                ErrorKind::CouldNotStore,
                vec![entity.clone()],
                vec![entity],
            ))?;
            return Ok(Outcome::Errored);
        }

        tracing::debug!(
            identity = definition.identity(),
            hash = %definition.content_hash(),
            "committed"
        );
        Ok(Outcome::Committed)
    }
}
