/*!
# Launchpad X device layer

The Launchpad X has a 9x9 grid of 81 buttons. The top row and the right-hand column are control
buttons, the remaining 8x8 are pads. Every button is addressed by the same note number
`y * 10 + x`, which is exactly a [`Coordinate`](crate::Coordinate) index: the bottom left pad is
`11`, the top right control button (the logo) is `99`.

The device exposes two MIDI interfaces:

- **LPX MIDI** delivers button presses and accepts short lighting messages
- **LPX DAW** accepts the SysEx configuration and bulk lighting messages

The byte-level encoders and decoders in this module are always available. The actual MIDI
connections need the `midi` cargo feature.
*/

mod input;
pub use input::*;

mod output;
pub use output::*;

use crate::{Error, Result};

/// Every Launchpad X SysEx message starts with these bytes
pub const SYSEX_PREFIX: [u8; 6] = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C];
pub const SYSEX_SUFFIX: u8 = 0xF7;

/// The SysEx commands used by this crate
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum Function {
    Layout = 0x00,
    Rgb = 0x03,
    LedFeedback = 0x0A,
    Aftertouch = 0x0B,
    ProgramMode = 0x0E,
    Mode = 0x10,
}

/// Standalone and DAW mode are mutually exclusive.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum DeviceMode {
    Standalone = 0x00,
    Daw = 0x01,
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum Layout {
    /// Only selectable in DAW mode
    Session = 0x00,
    Note = 0x01,
    /// Drum rack by factory default
    Custom1 = 0x04,
    /// Keys by factory default
    Custom2 = 0x05,
    /// Lighting mode in drum rack layout by factory default
    Custom3 = 0x06,
    /// Lighting mode in session layout by factory default
    Custom4 = 0x07,
    /// Only selectable in DAW mode
    DawFaders = 0x0D,
    Programmer = 0x7F,
}

impl Layout {
    pub fn requires_daw_mode(self) -> bool {
        matches!(self, Self::Session | Self::DawFaders)
    }
}

/// Selecting Programmer mode disables the setup menu (holding Session). Switch back to Live mode
/// to give the device back to the user.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum ProgramMode {
    Live = 0x00,
    Programmer = 0x01,
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum AftertouchType {
    /// Key pressure events, `A0h`-`AFh`
    Polyphonic = 0x00,
    /// Channel pressure events, `D0h`-`DFh`
    Channel = 0x01,
    Off = 0x02,
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum AftertouchThreshold {
    Low = 0x00,
    Medium = 0x01,
    High = 0x02,
}

/// Frame a command as a Launchpad X SysEx message.
///
/// ```rust
/// # use launchgrid::launchpad_x::{sysex, Function};
/// assert_eq!(
///     sysex(Function::ProgramMode, &[1]),
///     [0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C, 0x0E, 0x01, 0xF7],
/// );
/// ```
pub fn sysex(function: Function, args: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(SYSEX_PREFIX.len() + args.len() + 2);
    bytes.extend_from_slice(&SYSEX_PREFIX);
    bytes.push(function as u8);
    bytes.extend_from_slice(args);
    bytes.push(SYSEX_SUFFIX);
    bytes
}

/// Tracks which mode, program mode and layout the device is in, and produces the SysEx messages
/// for each transition.
///
/// The device is assumed to start out the way it powers up: Standalone, Live, Note layout.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct Session {
    mode: DeviceMode,
    program_mode: ProgramMode,
    layout: Layout,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            mode: DeviceMode::Standalone,
            program_mode: ProgramMode::Live,
            layout: Layout::Note,
        }
    }
}

impl Session {
    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn program_mode(&self) -> ProgramMode {
        self.program_mode
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    fn live_layout(&self) -> Layout {
        match self.mode {
            DeviceMode::Daw => Layout::Session,
            DeviceMode::Standalone => Layout::Note,
        }
    }

    pub fn select_mode(&mut self, mode: DeviceMode) -> Vec<u8> {
        self.mode = mode;
        if self.layout.requires_daw_mode() && mode == DeviceMode::Standalone {
            self.layout = Layout::Note;
        }
        sysex(Function::Mode, &[mode as u8])
    }

    /// Live mode lands on the Session layout in DAW mode and on the Note layout otherwise.
    pub fn select_program_mode(&mut self, program_mode: ProgramMode) -> Vec<u8> {
        self.program_mode = program_mode;
        self.layout = match program_mode {
            ProgramMode::Programmer => Layout::Programmer,
            ProgramMode::Live => self.live_layout(),
        };
        sysex(Function::ProgramMode, &[program_mode as u8])
    }

    pub fn select_layout(&mut self, layout: Layout) -> Result<Vec<u8>> {
        if layout.requires_daw_mode() && self.mode != DeviceMode::Daw {
            return Err(Error::WrongMode { layout });
        }
        self.layout = layout;
        self.program_mode = match layout {
            Layout::Programmer => ProgramMode::Programmer,
            _ => ProgramMode::Live,
        };
        Ok(sysex(Function::Layout, &[layout as u8]))
    }

    /// Messages that take the device over: Standalone mode, then Programmer mode.
    pub fn open(&mut self) -> Vec<Vec<u8>> {
        vec![
            self.select_mode(DeviceMode::Standalone),
            self.select_program_mode(ProgramMode::Programmer),
        ]
    }

    /// Messages that hand the device back in a usable state: Live mode, then Standalone mode.
    pub fn close(&mut self) -> Vec<Vec<u8>> {
        vec![
            self.select_program_mode(ProgramMode::Live),
            self.select_mode(DeviceMode::Standalone),
        ]
    }
}

#[cfg(feature = "midi")]
mod device;
#[cfg(feature = "midi")]
pub use device::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_close_sequences() {
        let mut session = Session::default();

        let opening = session.open();
        assert_eq!(
            opening,
            [
                vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C, 0x10, 0x00, 0xF7],
                vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C, 0x0E, 0x01, 0xF7],
            ]
        );
        assert_eq!(session.layout(), Layout::Programmer);
        assert_eq!(session.program_mode(), ProgramMode::Programmer);

        let closing = session.close();
        assert_eq!(
            closing,
            [
                vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C, 0x0E, 0x00, 0xF7],
                vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C, 0x10, 0x00, 0xF7],
            ]
        );
        assert_eq!(session, Session::default());
    }

    #[test]
    fn daw_only_layouts_need_daw_mode() {
        let mut session = Session::default();
        assert!(matches!(
            session.select_layout(Layout::Session),
            Err(Error::WrongMode {
                layout: Layout::Session
            })
        ));

        session.select_mode(DeviceMode::Daw);
        let message = session.select_layout(Layout::DawFaders).unwrap();
        assert_eq!(message[6..], [0x00, 0x0D, 0xF7]);

        // leaving DAW mode drops the DAW-only layout
        session.select_mode(DeviceMode::Standalone);
        assert_eq!(session.layout(), Layout::Note);
    }

    #[test]
    fn live_mode_layout_depends_on_device_mode() {
        let mut session = Session::default();
        session.select_mode(DeviceMode::Daw);
        session.select_program_mode(ProgramMode::Programmer);
        session.select_program_mode(ProgramMode::Live);
        assert_eq!(session.layout(), Layout::Session);
    }
}
