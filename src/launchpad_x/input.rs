use std::time::Instant;

use crate::{Coordinate, RawEvent};

/// A Launchpad X input message, as far as the grid cares
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum Message {
    /// A button went down
    Press { coordinate: Coordinate },
    /// A button came back up
    Release { coordinate: Coordinate },
    /// Anything else: pressure, SysEx replies, clock, or a note outside the addressable range
    Unknown,
}

impl Message {
    /// Stamp the message with its arrival time. `Unknown` messages yield nothing.
    pub fn into_raw_event(self, time: Instant) -> Option<RawEvent> {
        match self {
            Self::Press { coordinate } => Some(RawEvent::press(coordinate, time)),
            Self::Release { coordinate } => Some(RawEvent::release(coordinate, time)),
            Self::Unknown => None,
        }
    }
}

fn button(number: u8, pressed: bool) -> Message {
    match Coordinate::from_index(number) {
        Some(coordinate) if pressed => Message::Press { coordinate },
        Some(coordinate) => Message::Release { coordinate },
        None => Message::Unknown,
    }
}

/// Decode one MIDI message from the LPX MIDI interface (Programmer mode).
///
/// Pads send notes, the top row and the right-hand column send control changes. Nothing in here
/// panics on unexpected input.
///
/// ```rust
/// # use launchgrid::Coordinate;
/// # use launchgrid::launchpad_x::{decode_message, Message};
/// let coordinate = Coordinate::new(1, 1).unwrap();
/// assert_eq!(decode_message(&[0x90, 11, 100]), Message::Press { coordinate });
/// assert_eq!(decode_message(&[0x90, 11, 0]), Message::Release { coordinate });
/// assert_eq!(decode_message(&[0xA0, 11, 42]), Message::Unknown);
/// ```
pub fn decode_message(data: &[u8]) -> Message {
    match *data {
        [0x90, number, 0] => button(number, false),
        [0x90, number, _velocity] => button(number, true),
        [0x80, number, _] => button(number, false),
        [0xB0, number, 127] => button(number, true),
        [0xB0, number, 0] => button(number, false),
        _ => Message::Unknown,
    }
}

/// The Launchpad X button input connection creator.
#[cfg(feature = "midi")]
pub struct Input;

#[cfg(feature = "midi")]
impl crate::InputDevice for Input {
    const MIDI_DEVICE_KEYWORD: &'static str = "LPX MIDI";
    const MIDI_CONNECTION_NAME: &'static str = "Launchgrid LPX input";
    type Message = Message;

    fn decode_message(_timestamp: u64, data: &[u8]) -> Message {
        decode_message(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: u8, y: u8) -> Coordinate {
        Coordinate::new(x, y).unwrap()
    }

    #[test]
    fn pads_and_control_buttons() {
        assert_eq!(
            decode_message(&[0x90, 88, 127]),
            Message::Press {
                coordinate: at(8, 8)
            }
        );
        assert_eq!(
            decode_message(&[0x80, 88, 64]),
            Message::Release {
                coordinate: at(8, 8)
            }
        );
        // top row
        assert_eq!(
            decode_message(&[0xB0, 91, 127]),
            Message::Press {
                coordinate: at(1, 9)
            }
        );
        // right column
        assert_eq!(
            decode_message(&[0xB0, 19, 0]),
            Message::Release {
                coordinate: at(9, 1)
            }
        );
    }

    #[test]
    fn junk_is_unknown() {
        assert_eq!(decode_message(&[]), Message::Unknown);
        assert_eq!(decode_message(&[0x90]), Message::Unknown);
        assert_eq!(decode_message(&[0x90, 120, 127]), Message::Unknown);
        assert_eq!(decode_message(&[0xB0, 91, 64]), Message::Unknown);
        assert_eq!(decode_message(&[0xF8]), Message::Unknown);
        assert_eq!(
            decode_message(&[0xF0, 0x00, 0x20, 0x29, 0x02, 0x0C, 0x0E, 0x01, 0xF7]),
            Message::Unknown
        );
    }

    #[test]
    fn raw_events_carry_kind_and_time() {
        let now = Instant::now();
        let event = decode_message(&[0x90, 11, 127]).into_raw_event(now).unwrap();
        assert!(event.is_press());
        assert_eq!(event.time, now);
        assert!(Message::Unknown.into_raw_event(now).is_none());
    }
}
