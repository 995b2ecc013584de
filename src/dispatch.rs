use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{select, Receiver};

use crate::cell::{Cell, CellSlot};
use crate::diagnostics::DiagnosticSink;
use crate::grid::GridShared;
use crate::{Error, HandlerError, Tap};

/// Taps waiting for a cell's handler, and whether a worker is currently draining them.
#[derive(Default)]
pub(crate) struct TapQueue {
    pending: VecDeque<Tap>,
    draining: bool,
}

/// Routes taps to their cell's handlers until `stop` fires.
///
/// Each cell gets at most one worker thread at a time, which runs the queued taps in arrival
/// order. Different cells run in parallel.
pub(crate) fn dispatch_loop(shared: Arc<GridShared>, taps: Receiver<Tap>, stop: Receiver<()>) {
    log::debug!("dispatcher started");
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(taps) -> tap => match tap {
                Ok(tap) => dispatch(&shared, tap),
                Err(_) => break,
            },
        }
    }
    log::debug!("dispatcher stopped");
}

fn dispatch(shared: &Arc<GridShared>, tap: Tap) {
    let slot = match shared.slot(tap.coordinate) {
        Some(slot) => Arc::clone(slot),
        // the intake filters these, so only a tap from outside the intake lands here
        None => {
            shared.sink.report(Error::UnknownCoordinate {
                index: tap.coordinate.index(),
            });
            return;
        }
    };

    {
        let mut queue = slot.queue.lock();
        queue.pending.push_back(tap);
        if queue.draining {
            return;
        }
        queue.draining = true;
    }

    let sink = Arc::clone(&shared.sink);
    let worker_slot = Arc::clone(&slot);
    let spawned = std::thread::Builder::new()
        .name(format!("launchgrid-cell-{}", tap.coordinate.index()))
        .spawn(move || drain(&worker_slot, sink.as_ref()));

    if let Err(e) = spawned {
        log::error!("couldn't spawn handler thread for {}: {}", tap.coordinate, e);
        drain(&slot, shared.sink.as_ref());
    }
}

fn drain(slot: &Arc<CellSlot>, sink: &dyn DiagnosticSink) {
    loop {
        let tap = {
            let mut queue = slot.queue.lock();
            match queue.pending.pop_front() {
                Some(tap) => tap,
                None => {
                    queue.draining = false;
                    return;
                }
            }
        };
        if let Err(e) = invoke(slot, tap) {
            sink.report(e);
        }
    }
}

/// Run the handler matching `tap.kind` while holding the cell's execution lock. The lock is
/// released on every exit path, panics included.
pub(crate) fn invoke(slot: &Arc<CellSlot>, tap: Tap) -> Result<(), Error> {
    let handler = slot.handler(tap.kind);
    let _running = slot.exec.lock();

    let mut cell = Cell::new(Arc::clone(slot));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.apply(&mut cell)));

    let source: HandlerError = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => e,
        Err(payload) => panic_message(payload).into(),
    };
    Err(Error::HandlerFailed {
        coordinate: slot.coordinate(),
        kind: tap.kind,
        source,
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, LightEffect, TapKind};
    use std::time::{Duration, Instant};

    fn tap(coordinate: Coordinate, kind: TapKind) -> Tap {
        let now = Instant::now();
        Tap {
            coordinate,
            observed_time: now,
            decision_time: now,
            kind,
            hold_duration: Duration::ZERO,
            hits: 1,
        }
    }

    fn slot() -> Arc<CellSlot> {
        Arc::new(CellSlot::new(Coordinate::new(1, 1).unwrap()))
    }

    #[test]
    fn taps_for_missing_cells_are_reported() {
        let (sender, diagnostics) = crossbeam_channel::unbounded();
        let grid = crate::Grid::new(
            crate::GridConfig::default()
                .with_dimensions(8, 8)
                .with_sink(sender),
        )
        .unwrap();

        dispatch(grid.shared(), tap(Coordinate::new(9, 9).unwrap(), TapKind::Single));

        assert!(matches!(
            diagnostics.try_recv(),
            Ok(Error::UnknownCoordinate { index: 99 })
        ));
        assert!(diagnostics.try_recv().is_err());
    }

    #[test]
    fn invokes_handler_matching_kind() {
        let slot = slot();
        let mut cell = Cell::new(Arc::clone(&slot));
        cell.on_single_tap(|cell| {
            cell.set_effect(LightEffect::Flash);
            Ok(())
        });
        cell.on_double_tap(|cell| {
            cell.set_effect(LightEffect::Pulse);
            Ok(())
        });

        invoke(&slot, tap(slot.coordinate(), TapKind::Double)).unwrap();
        assert_eq!(cell.light().effect, LightEffect::Pulse);
        invoke(&slot, tap(slot.coordinate(), TapKind::Single)).unwrap();
        assert_eq!(cell.light().effect, LightEffect::Flash);
    }

    #[test]
    fn handler_errors_keep_their_light_changes() {
        let slot = slot();
        let mut cell = Cell::new(Arc::clone(&slot));
        cell.on_single_tap(|cell| {
            cell.set_rgb(1, 2, 3);
            Err("boom".into())
        });

        let error = invoke(&slot, tap(slot.coordinate(), TapKind::Single)).unwrap_err();
        assert!(matches!(
            error,
            Error::HandlerFailed {
                kind: TapKind::Single,
                ..
            }
        ));
        assert_eq!(cell.light().rgb(), crate::RgbColor::new(1, 2, 3));
        // lock was released
        assert!(slot.exec.try_lock().is_some());
    }

    #[test]
    fn panicking_handler_is_reported_and_unlocks() {
        let slot = slot();
        let mut cell = Cell::new(Arc::clone(&slot));
        cell.on_double_tap(|_| panic!("handler blew up"));

        let error = invoke(&slot, tap(slot.coordinate(), TapKind::Double)).unwrap_err();
        let source = std::error::Error::source(&error).unwrap().to_string();
        assert!(source.contains("handler blew up"));
        assert!(slot.exec.try_lock().is_some());
    }
}
