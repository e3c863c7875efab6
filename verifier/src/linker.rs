use std::collections::HashSet;

use splice_model::{DefId, DefinitionGraph, Diagnostic, Entity, ErrorKind};
use splice_store::ModelStore;

use crate::{Error, lookup, sink::Reporter};

/// Resolve the import names of every batch definition into dependency references.
///
/// Every definition is attempted; problems are reported as diagnostics. Only a lock violation
/// aborts the pass.
pub(crate) fn link<S: ModelStore + ?Sized>(
    graph: &mut DefinitionGraph,
    store: &S,
    report: &mut Reporter<'_>,
) -> Result<(), Error> {
    let mut duplicated = HashSet::new();
    for id in graph.batch().to_vec() {
        check_identity(graph, store, report, id, &mut duplicated)?;
        link_imports(graph, store, report, id)?;
    }
    Ok(())
}

fn check_identity<S: ModelStore + ?Sized>(
    graph: &mut DefinitionGraph,
    store: &S,
    report: &mut Reporter<'_>,
    id: DefId,
    duplicated: &mut HashSet<String>,
) -> Result<(), Error> {
    let identity = graph[id].identity().to_string();
    match lookup::resolve(graph, store, &identity) {
        Err(err) => {
            tracing::warn!(identity = %identity, error = %err, "failed to read definition");
            let entity = Entity::definition(&graph[id]);
            report.push(Diagnostic::new(
                ErrorKind::CouldNotRead,
                vec![entity.clone()],
                vec![entity],
            ))?;
        }
        Ok(hits) if hits.len() > 1 && duplicated.insert(identity.clone()) => {
            let entities: Vec<Entity> = hits
                .iter()
                .map(|hit| Entity::definition(&graph[*hit]))
                .collect();
            report.push(Diagnostic::new(
                ErrorKind::DuplicateDefinitions,
                entities.clone(),
                entities,
            ))?;
        }
        Ok(_) => {}
    }
    Ok(())
}

fn link_imports<S: ModelStore + ?Sized>(
    graph: &mut DefinitionGraph,
    store: &S,
    report: &mut Reporter<'_>,
    id: DefId,
) -> Result<(), Error> {
    let imports = graph[id].imports().to_vec();
    let mut missing = Vec::new();

    for name in &imports {
        let hits = match lookup::resolve(graph, store, name) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(identity = %name, error = %err, "failed to read import");
                report.push(Diagnostic::new(
                    ErrorKind::CouldNotRead,
                    vec![Entity::unresolved(name, graph[id].location())],
                    vec![Entity::definition(&graph[id])],
                ))?;
                continue;
            }
        };

        match hits.as_slice() {
            [] => missing.push(Entity::unresolved(name, graph[id].location())),
            [hit] => {
                let hit = *hit;
                graph[id].add_dependency(hit)?;
                if graph[hit].is_root() {
                    report.push(Diagnostic::new(
                        ErrorKind::RootNodeImported,
                        vec![Entity::definition(&graph[hit])],
                        vec![Entity::definition(&graph[id])],
                    ))?;
                }
            }
            _ => {
                report.push(Diagnostic::new(
                    ErrorKind::DuplicateDependencies,
                    hits.iter().map(|hit| Entity::definition(&graph[*hit])).collect(),
                    vec![Entity::definition(&graph[id])],
                ))?;
            }
        }
    }

    if !missing.is_empty() {
        report.push(Diagnostic::new(
            ErrorKind::MissingImport,
            missing,
            vec![Entity::definition(&graph[id])],
        ))?;
    }

    tracing::trace!(identity = graph[id].identity(), imports = imports.len(), "linked");
    Ok(())
}
