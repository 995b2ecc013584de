use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::{Coordinate, Error, Light, RawEvent, Result};

#[derive(Default)]
struct MockState {
    batches: Vec<Vec<(Coordinate, Light)>>,
    clears: usize,
    closes: usize,
    failing_writes: usize,
    listening: bool,
    closed: bool,
}

/// An in-memory device. Records everything written to it and lets you inject button events.
///
/// Clones share the same device, so keep one clone around to inspect what a
/// [`Grid`](crate::Grid) did with the other:
///
/// ```rust
/// # use launchgrid::{Grid, GridConfig, MockTransport};
/// let device = MockTransport::new();
/// let grid = Grid::open(GridConfig::default(), device.clone())?;
/// grid.render_once()?;
/// assert!(device.last_batch().is_some());
/// grid.close()?;
/// assert_eq!(device.clear_count(), 1);
/// # Ok::<(), launchgrid::Error>(())
/// ```
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    sender: Sender<RawEvent>,
    receiver: Receiver<RawEvent>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            sender,
            receiver,
        }
    }

    /// Inject a raw event as if it came from the hardware
    pub fn send(&self, event: RawEvent) {
        // the receiver lives in self, so this can't fail
        let _ = self.sender.send(event);
    }

    pub fn press(&self, coordinate: Coordinate) {
        self.send(RawEvent::press(coordinate, Instant::now()));
    }

    pub fn release(&self, coordinate: Coordinate) {
        self.send(RawEvent::release(coordinate, Instant::now()));
    }

    /// A press immediately followed by a release, `hold` apart in event time
    pub fn tap(&self, coordinate: Coordinate, hold: Duration) {
        let now = Instant::now();
        self.send(RawEvent::press(coordinate, now));
        self.send(RawEvent::release(coordinate, now + hold));
    }

    /// Make the next `count` light writes fail
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().failing_writes = count;
    }

    pub fn batches(&self) -> Vec<Vec<(Coordinate, Light)>> {
        self.state.lock().batches.clone()
    }

    pub fn batch_count(&self) -> usize {
        self.state.lock().batches.len()
    }

    pub fn last_batch(&self) -> Option<Vec<(Coordinate, Light)>> {
        self.state.lock().batches.last().cloned()
    }

    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl crate::Transport for MockTransport {
    fn listen(&mut self) -> Result<Receiver<RawEvent>> {
        let mut state = self.state.lock();
        if state.listening || state.closed {
            return Err(Error::TransportClosed);
        }
        state.listening = true;
        Ok(self.receiver.clone())
    }

    fn write_lights(&mut self, batch: &[(Coordinate, Light)]) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::TransportClosed);
        }
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(Error::write_failed("simulated write failure"));
        }
        state.batches.push(batch.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::TransportClosed);
        }
        state.clears += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.closes += 1;
        state.closed = true;
        Ok(())
    }
}
