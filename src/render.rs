use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};

use crate::grid::GridShared;
use crate::{Coordinate, Error, Light, Result};

/// Below this render delay the Launchpad starts to show visible distortion.
pub const MIN_RENDER_DELAY: Duration = Duration::from_millis(25);

pub const DEFAULT_RENDER_DELAY: Duration = Duration::from_millis(50);

/// Every cell's light in coordinate order, without the display-locked ones.
///
/// Each light is read under its own cell lock only, so a handler that is busy with another cell
/// never holds this up. The result may mix old and new state of cells being changed right now;
/// the next cycle picks up the rest.
pub(crate) fn snapshot(shared: &GridShared) -> Vec<(Coordinate, Light)> {
    shared
        .slots()
        .map(|slot| (slot.coordinate(), slot.light()))
        .filter(|(_, light)| !light.display_locked)
        .collect()
}

/// One full render cycle. Holding the transport lock across snapshot and write keeps cycles
/// from overlapping, even when [`Grid::render_once`](crate::Grid::render_once) races the loop.
pub(crate) fn render_cycle(shared: &GridShared) -> Result<usize> {
    let mut guard = shared.transport.lock();
    let transport = guard.as_mut().ok_or(Error::TransportClosed)?;

    let batch = snapshot(shared);
    transport.write_lights(&batch).map_err(|e| match e {
        e @ Error::TransportWriteFailed { .. } => e,
        other => Error::write_failed(other),
    })?;
    Ok(batch.len())
}

pub(crate) fn render_loop(shared: Arc<GridShared>, stop: Receiver<()>) {
    log::debug!("render loop started, delay {:?}", shared.render_delay);
    let mut failures = 0usize;
    loop {
        match render_cycle(&shared) {
            Ok(count) => {
                if failures > 0 {
                    log::info!("rendering recovered after {} failed cycles", failures);
                    failures = 0;
                }
                log::trace!("rendered {} lights", count);
            }
            Err(e) => {
                failures += 1;
                shared.sink.report(e);
            }
        }

        select! {
            recv(stop) -> _ => break,
            default(shared.render_delay) => {}
        }
    }
    log::debug!("render loop stopped");
}
