//! Out-of-band reporting for failures that must not stop the grid: failed render writes,
//! failing handlers and events for coordinates the grid doesn't have.

use crate::Error;

/// Receives every steady-state error of a running grid.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, error: Error);
}

/// Writes diagnostics to the [`log`] facade. This is the default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, error: Error) {
        match &error {
            Error::UnknownCoordinate { .. } => log::warn!("{}", error),
            _ => match std::error::Error::source(&error) {
                Some(source) => log::error!("{}: {}", error, source),
                None => log::error!("{}", error),
            },
        }
    }
}

/// Forward diagnostics into a channel, e.g. to show them in a UI or to assert on them in tests.
/// Diagnostics are dropped silently once the receiver is gone.
impl DiagnosticSink for crossbeam_channel::Sender<Error> {
    fn report(&self, error: Error) {
        let _ = self.send(error);
    }
}
