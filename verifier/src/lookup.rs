use splice_model::{DefId, DefinitionGraph};
use splice_store::ModelStore;

/// Resolve `identity`, preferring definitions of the current batch over stored ones.
pub(crate) fn resolve<S: ModelStore + ?Sized>(
    graph: &mut DefinitionGraph,
    store: &S,
    identity: &str,
) -> Result<Vec<DefId>, splice_store::Error> {
    match graph.find(identity) {
        Some(ids) => Ok(ids),
        None => resolve_stored(graph, store, identity),
    }
}

/// Resolve `identity` from storage, loading each identity at most once per run.
pub(crate) fn resolve_stored<S: ModelStore + ?Sized>(
    graph: &mut DefinitionGraph,
    store: &S,
    identity: &str,
) -> Result<Vec<DefId>, splice_store::Error> {
    if let Some(ids) = graph.loaded(identity) {
        return Ok(ids.to_vec());
    }
    let definitions = store.lookup(identity)?;
    tracing::trace!(identity, found = definitions.len(), "store lookup");
    Ok(graph.insert_loaded(identity, definitions))
}
