use splice_model::{DefId, DefinitionGraph, Diagnostic, Entity, ErrorKind};

use crate::{Error, VerifyOptions, cycles::simple_cycles, sink::Reporter};

/// Report every import cycle and return the batch definitions nothing else depends on.
///
/// Heads are only meaningful when no cycle was reported.
pub(crate) fn inspect(
    graph: &DefinitionGraph,
    report: &mut Reporter<'_>,
    options: &VerifyOptions,
) -> Result<Vec<DefId>, Error> {
    let out = adjacency(graph);

    let cycles = simple_cycles(&out, options.cycle_limit);
    for cycle in &cycles {
        let members = cycle
            .iter()
            .map(|idx| Entity::definition(&graph[DefId(*idx)]))
            .collect();
        report.push(Diagnostic::cycle(ErrorKind::CycleInDefinitionSources, members))?;
    }

    let mut indeg = vec![0usize; out.len()];
    for targets in &out {
        for &v in targets {
            indeg[v] += 1;
        }
    }
    let heads: Vec<DefId> = graph
        .batch()
        .iter()
        .copied()
        .filter(|id| indeg[id.0] == 0)
        .collect();

    tracing::debug!(
        definitions = out.len(),
        cycles = cycles.len(),
        heads = heads.len(),
        "module graph inspected"
    );
    Ok(heads)
}

/// "Depends on" edges for every definition in the arena, deduplicated.
pub(crate) fn adjacency(graph: &DefinitionGraph) -> Vec<Vec<usize>> {
    graph
        .iter()
        .map(|(_, definition)| {
            let mut targets: Vec<usize> = definition.dependencies().iter().map(|id| id.0).collect();
            targets.sort_unstable();
            targets.dedup();
            targets
        })
        .collect()
}
