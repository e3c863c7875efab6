//! Verification pipeline for splice definition graphs.
//!
//! A run links the batch definitions, rejects import cycles, then inspects the content of each
//! definition depth-first from the heads. Every data problem is collected as a
//! [`Diagnostic`]; only misuse of the model (a lock violation) or of the sink aborts a run.

mod content;
mod cycles;
mod linker;
mod lookup;
mod module_graph;
mod sink;

use miette::Diagnostic as MietteDiagnostic;
use splice_model::{DefinitionGraph, Diagnostic, TypeOracle};
use splice_store::ModelStore;
use thiserror::Error;

pub use sink::DiagnosticSink;

use crate::{content::ContentInspector, sink::Reporter};

#[derive(Debug, Error, MietteDiagnostic)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] splice_model::Error),

    #[error("diagnostic sink is sealed")]
    #[diagnostic(
        code(verifier::sink_sealed),
        help("A sink is read once; diagnostics pushed after sealing would be lost.")
    )]
    SinkSealed,
}

#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct VerifyOptions {
    /// Maximum number of cycles reported per inspected graph. Unlimited when unset.
    pub cycle_limit: Option<usize>,
}

impl VerifyOptions {
    pub fn with_cycle_limit(mut self, limit: usize) -> Self {
        self.cycle_limit = Some(limit);
        self
    }
}

/// Runs the verification stages against one store and type oracle.
#[derive(Debug)]
pub struct Verifier<S, O> {
    store: S,
    oracle: O,
    options: VerifyOptions,
}

impl<S: ModelStore, O: TypeOracle> Verifier<S, O> {
    pub fn new(store: S, oracle: O) -> Self {
        Self::with_options(store, oracle, VerifyOptions::default())
    }

    pub fn with_options(store: S, oracle: O, options: VerifyOptions) -> Self {
        Self {
            store,
            oracle,
            options,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Verify every batch definition of `graph` and return the sealed diagnostics.
    pub fn verify(&self, graph: &mut DefinitionGraph) -> Result<Vec<Diagnostic>, Error> {
        let sink = DiagnosticSink::new();
        self.verify_into(graph, &sink)?;
        sink.seal()
    }

    /// Verify into a caller-owned sink. Stages stop at the first one that reports anything.
    pub fn verify_into(
        &self,
        graph: &mut DefinitionGraph,
        sink: &DiagnosticSink,
    ) -> Result<(), Error> {
        let mut report = Reporter::new(sink);

        linker::link(graph, &self.store, &mut report)?;
        tracing::debug!(
            batch = graph.batch().len(),
            definitions = graph.len(),
            diagnostics = report.pushed(),
            "linked"
        );
        if report.pushed() > 0 {
            return Ok(());
        }

        let heads = module_graph::inspect(graph, &mut report, &self.options)?;
        if report.pushed() > 0 {
            return Ok(());
        }

        let committed = ContentInspector::new(
            graph,
            &self.store,
            &self.oracle,
            &self.options,
            &mut report,
        )
        .inspect(&heads)?;
        tracing::debug!(committed, diagnostics = report.pushed(), "content inspected");
        Ok(())
    }
}
