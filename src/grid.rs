use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::broadcast::TapBroadcast;
use crate::cell::{Cell, CellSlot};
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::render::{DEFAULT_RENDER_DELAY, MIN_RENDER_DELAY};
use crate::{Coordinate, Error, RawEvent, Result, Tap, Transport};

/// Lifecycle of a [`Grid`]. There is no way back from `Closed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GridState {
    Constructed,
    Running,
    Closed,
}

/// Settings for a [`Grid`].
///
/// ```rust
/// # use std::time::Duration;
/// # use launchgrid::GridConfig;
/// let config = GridConfig::default()
///     .with_dimensions(8, 8)
///     .with_render_delay(Duration::from_millis(80));
/// assert_eq!(config.render_delay(), Duration::from_millis(80));
/// ```
#[derive(Clone)]
pub struct GridConfig {
    /// Number of columns, starting at x = 1
    pub width: u8,
    /// Number of rows, starting at y = 1
    pub height: u8,
    render_delay: Duration,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for GridConfig {
    /// The full Launchpad X surface: 8x8 pads plus the top row and the right column.
    fn default() -> Self {
        Self {
            width: 9,
            height: 9,
            render_delay: DEFAULT_RENDER_DELAY,
            sink: Arc::new(LogSink),
        }
    }
}

impl GridConfig {
    pub fn with_dimensions(mut self, width: u8, height: u8) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the pause between two render cycles. Values below [`MIN_RENDER_DELAY`] are raised to
    /// it.
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        if delay < MIN_RENDER_DELAY {
            log::warn!(
                "render delay {:?} is below the minimum of {:?}, using the minimum",
                delay,
                MIN_RENDER_DELAY
            );
        }
        self.render_delay = delay.max(MIN_RENDER_DELAY);
        self
    }

    /// Where steady-state errors go. Defaults to [`LogSink`].
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn render_delay(&self) -> Duration {
        self.render_delay
    }
}

impl std::fmt::Debug for GridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridConfig")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("render_delay", &self.render_delay)
            .finish_non_exhaustive()
    }
}

struct Lifecycle {
    state: GridState,
    /// Dropping this sender tells every background process to stop
    stop: Option<Sender<()>>,
    stop_signal: Option<Receiver<()>>,
    /// Transport events, until the intake process takes them
    events: Option<Receiver<RawEvent>>,
    workers: Vec<JoinHandle<()>>,
}

impl Lifecycle {
    fn spawn(&mut self, name: &str, f: impl FnOnce() + Send + 'static) -> Result<()> {
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(f)
            .map_err(Error::Spawn)?;
        self.workers.push(handle);
        Ok(())
    }

    fn stop_signal(&self) -> Receiver<()> {
        match &self.stop_signal {
            Some(signal) => signal.clone(),
            // already stopping: a receiver whose sender is gone fires right away
            None => crossbeam_channel::bounded(0).1,
        }
    }
}

/// State shared between the [`Grid`] handle and its background processes.
pub(crate) struct GridShared {
    cells: BTreeMap<Coordinate, Arc<CellSlot>>,
    width: u8,
    height: u8,
    pub(crate) render_delay: Duration,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
    pub(crate) broadcast: TapBroadcast,
    pub(crate) transport: Mutex<Option<Box<dyn Transport>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl GridShared {
    pub(crate) fn contains(&self, coordinate: Coordinate) -> bool {
        self.cells.contains_key(&coordinate)
    }

    pub(crate) fn slot(&self, coordinate: Coordinate) -> Option<&Arc<CellSlot>> {
        self.cells.get(&coordinate)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = &Arc<CellSlot>> + '_ {
        self.cells.values()
    }

    /// Start the intake and classification processes, unless they already run.
    fn start_intake(self: &Arc<Self>, lifecycle: &mut Lifecycle) -> Result<()> {
        let events = match lifecycle.events.take() {
            Some(events) => events,
            None => return Ok(()),
        };
        let (sender, receiver) = crossbeam_channel::unbounded();

        let shared = Arc::clone(self);
        let stop = lifecycle.stop_signal();
        lifecycle.spawn("launchgrid-intake", move || {
            crate::classifier::intake_loop(shared, events, sender, stop)
        })?;

        let shared = Arc::clone(self);
        let stop = lifecycle.stop_signal();
        lifecycle.spawn("launchgrid-classifier", move || {
            crate::classifier::decision_loop(shared, receiver, stop)
        })
    }
}

/// The desired state of a grid of lit buttons, kept in sync with a device.
///
/// A grid starts out [`Constructed`](GridState::Constructed). [`start`](Grid::start) binds it
/// to a [`Transport`] and launches the background processes:
///
/// - intake and classification, turning raw presses into [`Tap`]s
/// - the dispatcher, running the tapped cell's handler
/// - the render loop, writing every unlocked cell's light to the device each
///   [`render_delay`](GridConfig::with_render_delay)
///
/// [`close`](Grid::close) stops all of them and clears the device. Dropping the grid closes it
/// too.
///
/// ```rust
/// # use launchgrid::{Grid, GridConfig, LightEffect, MockTransport};
/// let grid = Grid::open(GridConfig::default().with_dimensions(8, 8), MockTransport::new())?;
///
/// let mut cell = grid.cell(1, 1).unwrap();
/// cell.set_rgb(127, 0, 0);
/// cell.on_double_tap(|cell| {
///     cell.update_light(|light| light.toggle_pulse());
///     Ok(())
/// });
///
/// grid.close()?;
/// # Ok::<(), launchgrid::Error>(())
/// ```
pub struct Grid {
    shared: Arc<GridShared>,
}

impl Grid {
    /// Allocate all cells. Nothing runs until [`start`](Self::start).
    pub fn new(config: GridConfig) -> Result<Self> {
        let GridConfig {
            width,
            height,
            render_delay,
            sink,
        } = config;

        let limit = Coordinate::AXIS_LIMIT - 1;
        if width == 0 || height == 0 || width > limit || height > limit {
            return Err(Error::InvalidDimensions { width, height });
        }

        let mut cells = BTreeMap::new();
        for y in 1..=height {
            for x in 1..=width {
                let coordinate =
                    Coordinate::new(x, y).ok_or(Error::InvalidDimensions { width, height })?;
                cells.insert(coordinate, Arc::new(CellSlot::new(coordinate)));
            }
        }

        let shared = GridShared {
            cells,
            width,
            height,
            render_delay: render_delay.max(MIN_RENDER_DELAY),
            sink,
            broadcast: TapBroadcast::default(),
            transport: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle {
                state: GridState::Constructed,
                stop: None,
                stop_signal: None,
                events: None,
                workers: Vec::new(),
            }),
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<GridShared> {
        &self.shared
    }

    /// [`Grid::new`] followed by [`Grid::start`]
    pub fn open(config: GridConfig, transport: impl Transport) -> Result<Self> {
        let grid = Self::new(config)?;
        grid.start(transport)?;
        Ok(grid)
    }

    /// Bind the grid to `transport` and start the background processes.
    pub fn start(&self, transport: impl Transport) -> Result<()> {
        let mut lifecycle = self.shared.lifecycle.lock();
        if lifecycle.state != GridState::Constructed {
            return Err(Error::InvalidState {
                state: lifecycle.state,
            });
        }

        let mut transport: Box<dyn Transport> = Box::new(transport);
        let events = match transport.listen() {
            Ok(events) => events,
            Err(e) => {
                // the device may already be configured, hand it back to its default state
                if let Err(close_error) = transport.close() {
                    log::warn!("closing transport after failed listen: {}", close_error);
                }
                return Err(e);
            }
        };
        *self.shared.transport.lock() = Some(transport);

        let (stop, stop_signal) = crossbeam_channel::bounded(0);
        lifecycle.stop = Some(stop);
        lifecycle.stop_signal = Some(stop_signal);
        lifecycle.events = Some(events);
        lifecycle.state = GridState::Running;

        if let Err(e) = self.spawn_processes(&mut lifecycle) {
            drop(lifecycle);
            if let Err(close_error) = self.close() {
                log::warn!("closing after failed start: {}", close_error);
            }
            return Err(e);
        }

        log::info!(
            "grid of {}x{} cells running, render delay {:?}",
            self.shared.width,
            self.shared.height,
            self.shared.render_delay
        );
        Ok(())
    }

    fn spawn_processes(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let stop = lifecycle.stop_signal();
        lifecycle.spawn("launchgrid-render", move || {
            crate::render::render_loop(shared, stop)
        })?;

        // the dispatcher is the first subscriber, so this is what starts the intake
        let taps = self.subscribe(lifecycle)?;
        let shared = Arc::clone(&self.shared);
        let stop = lifecycle.stop_signal();
        lifecycle.spawn("launchgrid-dispatch", move || {
            crate::dispatch::dispatch_loop(shared, taps, stop)
        })
    }

    fn subscribe(&self, lifecycle: &mut Lifecycle) -> Result<Receiver<Tap>> {
        if lifecycle.state == GridState::Closed {
            return Ok(crossbeam_channel::never());
        }
        let taps = self.shared.broadcast.subscribe();
        if lifecycle.state == GridState::Running {
            self.shared.start_intake(lifecycle)?;
        }
        Ok(taps)
    }

    /// A new stream of every classified tap, independent of all other subscribers and of the
    /// cell handlers. The stream ends when the grid is closed.
    pub fn taps(&self) -> Receiver<Tap> {
        let mut lifecycle = self.shared.lifecycle.lock();
        if lifecycle.state == GridState::Closed {
            // sender dropped right away, so the stream is already over
            return crossbeam_channel::unbounded().1;
        }
        match self.subscribe(&mut lifecycle) {
            Ok(taps) => {
                log::debug!(
                    "new tap subscriber, {} in total",
                    self.shared.broadcast.subscriber_count()
                );
                taps
            }
            Err(e) => {
                self.shared.sink.report(e);
                crossbeam_channel::unbounded().1
            }
        }
    }

    pub fn state(&self) -> GridState {
        self.shared.lifecycle.lock().state
    }

    pub fn width(&self) -> u8 {
        self.shared.width
    }

    pub fn height(&self) -> u8 {
        self.shared.height
    }

    pub fn render_delay(&self) -> Duration {
        self.shared.render_delay
    }

    /// The cell at `(x, y)`, or `None` if that position isn't part of this grid
    pub fn cell(&self, x: u8, y: u8) -> Option<Cell> {
        self.cell_at(Coordinate::new(x, y)?)
    }

    pub fn cell_at(&self, coordinate: Coordinate) -> Option<Cell> {
        self.shared
            .slot(coordinate)
            .map(|slot| Cell::new(Arc::clone(slot)))
    }

    /// All cells, row by row starting at the bottom left
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.shared
            .slots()
            .map(|slot| Cell::new(Arc::clone(slot)))
    }

    /// Reset every cell's light to static black and lift all display locks. Handlers stay.
    pub fn clear(&self) {
        for mut cell in self.cells() {
            cell.reset_light();
        }
    }

    /// Run one render cycle right now, independently of the render loop's schedule. Returns the
    /// number of lights written.
    pub fn render_once(&self) -> Result<usize> {
        let state = self.state();
        if state != GridState::Running {
            return Err(Error::InvalidState { state });
        }
        crate::render::render_cycle(&self.shared)
    }

    /// Stop all background processes, then clear and release the device.
    ///
    /// Only the first call does anything; later calls return `Ok(())`. Handlers that are still
    /// running finish on their own, but nothing is written to the device anymore.
    pub fn close(&self) -> Result<()> {
        let workers = {
            let mut lifecycle = self.shared.lifecycle.lock();
            let previous = std::mem::replace(&mut lifecycle.state, GridState::Closed);
            if previous != GridState::Running {
                return Ok(());
            }
            lifecycle.stop = None;
            lifecycle.stop_signal = None;
            lifecycle.events = None;
            std::mem::take(&mut lifecycle.workers)
        };

        for worker in workers {
            if worker.join().is_err() {
                log::error!("a grid background process panicked");
            }
        }
        self.shared.broadcast.close();

        let transport = self.shared.transport.lock().take();
        if let Some(mut transport) = transport {
            let cleared = transport.clear();
            let closed = transport.close();
            cleared?;
            closed?;
        }
        log::info!("grid closed");
        Ok(())
    }
}

impl Drop for Grid {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("error while closing grid: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Light, LightEffect, MockTransport};

    #[test]
    fn rejects_unaddressable_dimensions() {
        for (w, h) in [(0, 8), (8, 0), (10, 8), (8, 10)] {
            let result = Grid::new(GridConfig::default().with_dimensions(w, h));
            assert!(matches!(result, Err(Error::InvalidDimensions { .. })));
        }
        assert!(Grid::new(GridConfig::default().with_dimensions(9, 9)).is_ok());
    }

    #[test]
    fn cells_cover_exactly_the_configured_area() {
        let grid = Grid::new(GridConfig::default().with_dimensions(8, 8)).unwrap();
        assert_eq!(grid.cells().count(), 64);
        assert!(grid.cell(1, 1).is_some());
        assert!(grid.cell(8, 8).is_some());
        assert!(grid.cell(0, 1).is_none());
        assert!(grid.cell(9, 1).is_none());
        assert!(grid.cell(1, 9).is_none());
    }

    #[test]
    fn render_delay_has_a_floor() {
        let config = GridConfig::default().with_render_delay(Duration::from_millis(1));
        assert_eq!(config.render_delay(), MIN_RENDER_DELAY);
        let config = GridConfig::default().with_render_delay(Duration::from_millis(100));
        assert_eq!(config.render_delay(), Duration::from_millis(100));
    }

    #[test]
    fn lifecycle_transitions() {
        let grid = Grid::new(GridConfig::default()).unwrap();
        assert_eq!(grid.state(), GridState::Constructed);
        assert!(matches!(
            grid.render_once(),
            Err(Error::InvalidState {
                state: GridState::Constructed
            })
        ));

        grid.start(MockTransport::new()).unwrap();
        assert_eq!(grid.state(), GridState::Running);
        assert!(matches!(
            grid.start(MockTransport::new()),
            Err(Error::InvalidState {
                state: GridState::Running
            })
        ));

        grid.close().unwrap();
        assert_eq!(grid.state(), GridState::Closed);
        assert!(matches!(
            grid.start(MockTransport::new()),
            Err(Error::InvalidState {
                state: GridState::Closed
            })
        ));
    }

    #[test]
    fn start_fails_when_transport_cannot_listen() {
        let mut device = MockTransport::new();
        // hand out the event stream before the grid gets to
        let _events = crate::Transport::listen(&mut device).unwrap();

        let grid = Grid::new(GridConfig::default()).unwrap();
        assert!(matches!(grid.start(device.clone()), Err(Error::TransportClosed)));
        assert_eq!(grid.state(), GridState::Constructed);
        assert_eq!(device.close_count(), 1);
        assert_eq!(device.clear_count(), 0);
    }

    #[test]
    fn clear_resets_lights() {
        let grid = Grid::new(GridConfig::default()).unwrap();
        let mut cell = grid.cell(2, 2).unwrap();
        cell.set_rgb(50, 50, 50);
        cell.set_effect(LightEffect::Flash);
        cell.toggle_display_lock();

        grid.clear();
        assert_eq!(grid.cell(2, 2).unwrap().light(), Light::default());
    }

    #[test]
    fn taps_after_close_end_immediately() {
        let grid = Grid::open(GridConfig::default(), MockTransport::new()).unwrap();
        grid.close().unwrap();
        assert!(grid.taps().recv().is_err());
    }
}
