use crate::{Coordinate, TapKind};

/// The error type returned by handlers. Anything that implements [`std::error::Error`] converts
/// into it with `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device could not be found or opened
    #[error("transport unavailable: {reason}")]
    TransportUnavailable { reason: String },

    /// A light batch could not be written. Only ever fatal to a single render cycle
    #[error("writing lights to the transport failed")]
    TransportWriteFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The transport was already closed, or its event stream was already handed out
    #[error("transport is closed")]
    TransportClosed,

    #[error("{kind:?} tap handler for {coordinate} failed")]
    HandlerFailed {
        coordinate: Coordinate,
        kind: TapKind,
        #[source]
        source: HandlerError,
    },

    /// An event referenced a coordinate that isn't part of the grid
    #[error("coordinate index {index} is not part of the grid")]
    UnknownCoordinate { index: u8 },

    #[error("a grid of {width}x{height} cells cannot be addressed (1..=9 per axis)")]
    InvalidDimensions { width: u8, height: u8 },

    #[error("operation not allowed while the grid is {state:?}")]
    InvalidState { state: crate::GridState },

    /// The requested Launchpad X layout can't be selected in the current device mode
    #[error("layout {layout:?} is only available in DAW mode")]
    WrongMode {
        layout: crate::launchpad_x::Layout,
    },

    #[error("couldn't spawn a background thread")]
    Spawn(#[source] std::io::Error),

    #[cfg(feature = "midi")]
    #[error("MIDI context initialization failed")]
    InitError(#[from] midir::InitError),

    #[cfg(feature = "midi")]
    #[error("MIDI port retrieval failed")]
    PortInfoError(#[from] midir::PortInfoError),

    #[cfg(feature = "midi")]
    #[error("sending MIDI message failed")]
    SendError(#[from] midir::SendError),
}

impl Error {
    /// Wrap any error as a failed render write.
    pub fn write_failed(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::TransportWriteFailed {
            source: source.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            reason: reason.into(),
        }
    }

    /// Errors that only affect the cycle or invocation they came from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransportWriteFailed { .. }
                | Self::HandlerFailed { .. }
                | Self::UnknownCoordinate { .. }
        )
    }
}
