use super::{sysex, AftertouchThreshold, AftertouchType, Function};
use crate::{Coordinate, Light, LightEffect, PaletteColor};

/// Lighting types of the RGB SysEx command
const STATIC_PALETTE: u8 = 0;
const FLASH: u8 = 1;
const PULSE: u8 = 2;
const RGB: u8 = 3;

/// Append the colourspec for one light: a lighting type, the LED index, then 1-3 data bytes.
///
/// | effect   | bytes                           |
/// |----------|---------------------------------|
/// | `Static` | `3 <index> <r> <g> <b>`         |
/// | `Pulse`  | `2 <index> <palette>`           |
/// | `Flash`  | `1 <index> <black> <palette>`   |
/// | `Off`    | `0 <index> 0`                   |
pub fn push_colorspec(bytes: &mut Vec<u8>, coordinate: Coordinate, light: &Light) {
    let index = coordinate.index();
    match light.effect {
        LightEffect::Static => {
            let rgb = light.rgb();
            bytes.extend([RGB, index, rgb.red(), rgb.green(), rgb.blue()]);
        }
        LightEffect::Pulse => bytes.extend([PULSE, index, light.palette_color().id()]),
        // color B first, so this flashes between the color and black like a short-message flash
        LightEffect::Flash => bytes.extend([
            FLASH,
            index,
            PaletteColor::BLACK.id(),
            light.palette_color().id(),
        ]),
        LightEffect::Off => bytes.extend([STATIC_PALETTE, index, PaletteColor::BLACK.id()]),
    }
}

/// One RGB SysEx message lighting every entry of `batch`.
///
/// ```rust
/// # use launchgrid::{Coordinate, Light, LightEffect, RgbColor};
/// # use launchgrid::launchpad_x::lights_message;
/// let light = Light::new(LightEffect::Static, RgbColor::new(127, 0, 10));
/// let message = lights_message(&[(Coordinate::new(1, 1).unwrap(), light)]);
/// assert_eq!(message, [0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C, 0x03, 3, 11, 127, 0, 10, 0xF7]);
/// ```
pub fn lights_message(batch: &[(Coordinate, Light)]) -> Vec<u8> {
    let mut colorspecs = Vec::with_capacity(5 * batch.len());
    for (coordinate, light) in batch {
        push_colorspec(&mut colorspecs, *coordinate, light);
    }
    sysex(Function::Rgb, &colorspecs)
}

/// Light all 81 buttons with one palette color
pub fn light_all_message(color: PaletteColor) -> Vec<u8> {
    let mut colorspecs = Vec::with_capacity(3 * 81);
    for y in 1..Coordinate::AXIS_LIMIT {
        for x in 1..Coordinate::AXIS_LIMIT {
            colorspecs.extend([STATIC_PALETTE, y * Coordinate::AXIS_LIMIT + x, color.id()]);
        }
    }
    sysex(Function::Rgb, &colorspecs)
}

pub fn clear_message() -> Vec<u8> {
    light_all_message(PaletteColor::BLACK)
}

/// The short MIDI message for a single light: the effect's status byte, the note number and the
/// palette color as velocity. Short messages can't carry RGB values.
pub fn short_light_message(coordinate: Coordinate, light: &Light) -> [u8; 3] {
    let velocity = match light.effect {
        LightEffect::Off => 0,
        _ => light.palette_color().id(),
    };
    [light.effect.status_byte(), coordinate.index(), velocity]
}

pub fn led_feedback_message(internal: bool, external: bool) -> Vec<u8> {
    sysex(Function::LedFeedback, &[internal as u8, external as u8])
}

pub fn aftertouch_message(kind: AftertouchType, threshold: AftertouchThreshold) -> Vec<u8> {
    sysex(Function::Aftertouch, &[kind as u8, threshold as u8])
}

/// The LPX MIDI output, used for short lighting messages.
#[cfg(feature = "midi")]
pub struct Output {
    connection: midir::MidiOutputConnection,
}

#[cfg(feature = "midi")]
impl crate::OutputDevice for Output {
    const MIDI_CONNECTION_NAME: &'static str = "Launchgrid LPX output";
    const MIDI_DEVICE_KEYWORD: &'static str = "LPX MIDI";

    fn from_connection(connection: midir::MidiOutputConnection) -> crate::Result<Self> {
        Ok(Self { connection })
    }

    fn send(&mut self, bytes: &[u8]) -> crate::Result<()> {
        self.connection.send(bytes)?;
        Ok(())
    }
}

#[cfg(feature = "midi")]
impl Output {
    /// Light a single button without going through SysEx.
    pub fn light(&mut self, coordinate: Coordinate, light: &Light) -> crate::Result<()> {
        use crate::OutputDevice as _;
        self.send(&short_light_message(coordinate, light))
    }
}

/// The LPX DAW output, which takes all the SysEx traffic.
#[cfg(feature = "midi")]
pub struct DawOutput {
    connection: midir::MidiOutputConnection,
}

#[cfg(feature = "midi")]
impl crate::OutputDevice for DawOutput {
    const MIDI_CONNECTION_NAME: &'static str = "Launchgrid LPX DAW output";
    const MIDI_DEVICE_KEYWORD: &'static str = "LPX DAW";

    fn from_connection(connection: midir::MidiOutputConnection) -> crate::Result<Self> {
        Ok(Self { connection })
    }

    fn send(&mut self, bytes: &[u8]) -> crate::Result<()> {
        self.connection.send(bytes)?;
        Ok(())
    }
}

#[cfg(feature = "midi")]
impl DawOutput {
    pub fn light_multiple(&mut self, batch: &[(Coordinate, Light)]) -> crate::Result<()> {
        use crate::OutputDevice as _;
        self.send(&lights_message(batch))
    }

    pub fn light_all(&mut self, color: PaletteColor) -> crate::Result<()> {
        use crate::OutputDevice as _;
        self.send(&light_all_message(color))
    }

    /// Whether the device lights pads itself when they are pressed (`internal`) and when it
    /// receives notes (`external`).
    pub fn set_led_feedback(&mut self, internal: bool, external: bool) -> crate::Result<()> {
        use crate::OutputDevice as _;
        self.send(&led_feedback_message(internal, external))
    }

    pub fn set_aftertouch(
        &mut self,
        kind: AftertouchType,
        threshold: AftertouchThreshold,
    ) -> crate::Result<()> {
        use crate::OutputDevice as _;
        self.send(&aftertouch_message(kind, threshold))
    }
}
