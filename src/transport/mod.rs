//! The device boundary. A [`Transport`] delivers raw button events and accepts light batches;
//! the grid never talks to hardware in any other way.

mod mock;
pub use mock::*;

use crossbeam_channel::Receiver;

use crate::{Coordinate, Light, RawEvent, Result};

/// Exclusive access to one physical (or simulated) device.
///
/// Obtaining a transport is the implementor's business, e.g.
/// [`LaunchpadX::guess`](crate::launchpad_x::LaunchpadX::guess); a device that can't be opened
/// should be reported as [`Error::TransportUnavailable`](crate::Error::TransportUnavailable).
pub trait Transport: Send + 'static {
    /// Hand out the stream of raw button events. The stream is infinite for as long as the
    /// device is open and can only be taken once; later calls fail with
    /// [`Error::TransportClosed`](crate::Error::TransportClosed).
    fn listen(&mut self) -> Result<Receiver<RawEvent>>;

    /// Push the given lights to the device, in order. Cells missing from the batch keep whatever
    /// they currently show.
    fn write_lights(&mut self, batch: &[(Coordinate, Light)]) -> Result<()>;

    /// Turn every light off.
    fn clear(&mut self) -> Result<()>;

    /// Release the device, leaving it in a usable default state.
    fn close(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn listen(&mut self) -> Result<Receiver<RawEvent>> {
        (**self).listen()
    }

    fn write_lights(&mut self, batch: &[(Coordinate, Light)]) -> Result<()> {
        (**self).write_lights(batch)
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
