use midir::{MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection};

use crate::{Error, Result};

fn guess_port<T: midir::MidiIO>(midi_io: &T, keyword: &str) -> Option<T::Port> {
    for port in midi_io.ports() {
        let name = match midi_io.port_name(&port) {
            Ok(name) => name,
            Err(_) => continue,
        };

        if name.contains(keyword) {
            log::debug!("using MIDI port '{}' for '{}'", name, keyword);
            return Some(port);
        }
    }

    None
}

pub trait OutputDevice
where
    Self: Sized,
{
    const MIDI_CONNECTION_NAME: &'static str;
    const MIDI_DEVICE_KEYWORD: &'static str;

    /// Initiate from an existing midir connection.
    fn from_connection(connection: MidiOutputConnection) -> Result<Self>;

    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Connect to the first output port whose name contains [`Self::MIDI_DEVICE_KEYWORD`].
    fn guess() -> Result<Self> {
        let midi_output = MidiOutput::new(crate::APPLICATION_NAME)?;

        let port = guess_port(&midi_output, Self::MIDI_DEVICE_KEYWORD).ok_or_else(|| {
            Error::unavailable(format!(
                "no '{}' output device found",
                Self::MIDI_DEVICE_KEYWORD
            ))
        })?;

        let connection = midi_output
            .connect(&port, Self::MIDI_CONNECTION_NAME)
            .map_err(|e| Error::unavailable(format!("failed to connect to output port: {}", e)))?;

        Self::from_connection(connection)
    }
}

/// Keeps an input connection alive. Dropping it closes the connection.
pub struct InputDeviceHandler {
    _connection: MidiInputConnection<()>,
}

pub trait InputDevice {
    const MIDI_CONNECTION_NAME: &'static str;
    const MIDI_DEVICE_KEYWORD: &'static str;
    type Message;

    fn decode_message(timestamp: u64, data: &[u8]) -> Self::Message;

    #[must_use = "If not saved, the connection will be immediately dropped"]
    fn from_port<F>(
        midi_input: MidiInput,
        port: &MidiInputPort,
        mut user_callback: F,
    ) -> Result<InputDeviceHandler>
    where
        F: FnMut(Self::Message) + Send + 'static,
    {
        let midir_callback = move |timestamp: u64, data: &[u8], _: &mut ()| {
            let msg = Self::decode_message(timestamp, data);
            (user_callback)(msg);
        };

        let connection = midi_input
            .connect(port, Self::MIDI_CONNECTION_NAME, midir_callback, ())
            .map_err(|e| Error::unavailable(format!("failed to connect to input port: {}", e)))?;

        Ok(InputDeviceHandler {
            _connection: connection,
        })
    }

    /// Search the midi devices and connect to the first one matching
    /// [`Self::MIDI_DEVICE_KEYWORD`], calling `user_callback` with every decoded message.
    #[must_use = "If not saved, the connection will be immediately dropped"]
    fn guess<F>(user_callback: F) -> Result<InputDeviceHandler>
    where
        F: FnMut(Self::Message) + Send + 'static,
    {
        let midi_input = MidiInput::new(crate::APPLICATION_NAME)?;

        let port = guess_port(&midi_input, Self::MIDI_DEVICE_KEYWORD).ok_or_else(|| {
            Error::unavailable(format!(
                "no '{}' input device found",
                Self::MIDI_DEVICE_KEYWORD
            ))
        })?;

        Self::from_port(midi_input, &port, user_callback)
    }
}
