use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use super::{DawOutput, Input, Layout, Output, Session};
use crate::{
    Coordinate, Error, InputDevice, InputDeviceHandler, Light, OutputDevice, PaletteColor,
    RawEvent, Result,
};

/// The device needs a moment to digest a configuration message before the next one
const SYSEX_PAUSE: Duration = Duration::from_millis(5);

/// A connected Launchpad X, usable as a grid [`Transport`](crate::Transport).
///
/// ```no_run
/// use launchgrid::{Grid, GridConfig};
/// use launchgrid::launchpad_x::LaunchpadX;
///
/// let grid = Grid::open(GridConfig::default(), LaunchpadX::guess()?)?;
/// # Ok::<(), launchgrid::Error>(())
/// ```
pub struct LaunchpadX {
    output: Output,
    daw: DawOutput,
    session: Session,
    input: Option<InputDeviceHandler>,
    listened: bool,
    closed: bool,
}

impl LaunchpadX {
    /// Connect to the first Launchpad X found and put it into Programmer mode.
    pub fn guess() -> Result<Self> {
        let output = Output::guess()?;
        let daw = DawOutput::guess()?;
        let mut device = Self {
            output,
            daw,
            session: Session::default(),
            input: None,
            listened: false,
            closed: false,
        };

        let opening = device.session.open();
        device.configure(opening)?;
        log::info!("Launchpad X connected, {:?}", device.session);
        Ok(device)
    }

    fn configure(&mut self, messages: Vec<Vec<u8>>) -> Result<()> {
        for message in messages {
            self.daw.send(&message)?;
            std::thread::sleep(SYSEX_PAUSE);
        }
        Ok(())
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn select_layout(&mut self, layout: Layout) -> Result<()> {
        let message = self.session.select_layout(layout)?;
        self.configure(vec![message])
    }

    /// Light one button right away with a short message, bypassing the grid.
    pub fn light(&mut self, coordinate: Coordinate, light: &Light) -> Result<()> {
        self.output.light(coordinate, light)
    }

    pub fn daw_output(&mut self) -> &mut DawOutput {
        &mut self.daw
    }
}

impl crate::Transport for LaunchpadX {
    fn listen(&mut self) -> Result<Receiver<RawEvent>> {
        if self.closed || self.listened {
            return Err(Error::TransportClosed);
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        let handler = Input::guess(move |message: super::Message| {
            if let Some(event) = message.into_raw_event(Instant::now()) {
                // nobody listening anymore; the connection goes away with the device
                let _ = sender.send(event);
            }
        })?;

        self.input = Some(handler);
        self.listened = true;
        Ok(receiver)
    }

    fn write_lights(&mut self, batch: &[(Coordinate, Light)]) -> Result<()> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.daw.light_multiple(batch)
    }

    fn clear(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::TransportClosed);
        }
        self.daw.light_all(PaletteColor::BLACK)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // dropping the handler ends the event stream
        self.input = None;
        let closing = self.session.close();
        self.configure(closing)?;
        log::info!("Launchpad X released");
        Ok(())
    }
}
