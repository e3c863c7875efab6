use std::sync::{Mutex, MutexGuard, PoisonError};

use splice_model::Diagnostic;

use crate::Error;

/// Append-only diagnostic queue shared by every stage of one verification run.
///
/// Producers may push from several threads. Once sealed the queue has been handed out and any
/// further push is an error.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    state: Mutex<SinkState>,
}

#[derive(Debug, Default)]
struct SinkState {
    diagnostics: Vec<Diagnostic>,
    sealed: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) -> Result<(), Error> {
        let mut state = self.state();
        if state.sealed {
            return Err(Error::SinkSealed);
        }
        tracing::trace!(%diagnostic, "diagnostic");
        state.diagnostics.push(diagnostic);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state().diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sealed(&self) -> bool {
        self.state().sealed
    }

    /// Hand out every collected diagnostic. Can only be done once.
    pub fn seal(&self) -> Result<Vec<Diagnostic>, Error> {
        let mut state = self.state();
        if state.sealed {
            return Err(Error::SinkSealed);
        }
        state.sealed = true;
        Ok(std::mem::take(&mut state.diagnostics))
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One producer's handle on a shared sink, counting what it pushed.
#[derive(Debug)]
pub(crate) struct Reporter<'a> {
    sink: &'a DiagnosticSink,
    pushed: usize,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a DiagnosticSink) -> Self {
        Self { sink, pushed: 0 }
    }

    pub(crate) fn push(&mut self, diagnostic: Diagnostic) -> Result<(), Error> {
        self.sink.push(diagnostic)?;
        self.pushed += 1;
        Ok(())
    }

    pub(crate) fn pushed(&self) -> usize {
        self.pushed
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use splice_model::{Entity, ErrorKind};

    use super::*;

    fn diagnostic(identity: &str) -> Diagnostic {
        let entity = Entity::unresolved(identity, identity);
        Diagnostic::new(ErrorKind::MissingImport, vec![entity.clone()], vec![entity])
    }

    #[test]
    fn seal_is_read_once() {
        let sink = DiagnosticSink::new();
        sink.push(diagnostic("a")).unwrap();
        assert_eq!(sink.len(), 1);

        let diagnostics = sink.seal().unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(sink.is_sealed());
        assert!(matches!(sink.seal(), Err(Error::SinkSealed)));
        assert!(matches!(sink.push(diagnostic("b")), Err(Error::SinkSealed)));
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let sink = Arc::new(DiagnosticSink::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..25 {
                        sink.push(diagnostic(&format!("{t}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.seal().unwrap().len(), 100);
    }
}
