//! Top-level error type for the binaries

use thiserror::Error;

use crate::audio::{DeviceError, PlaybackError, RecordError, StreamLost};
use crate::settings::ConfigError;

/// Anything that ends a session.
///
/// Binaries print these as a single `<TypeName>: <message>` line.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("{} tap stream lost: {}", .0.tap, .0.message)]
    StreamLost(StreamLost),

    #[error("Failed to install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Display failed: {0}")]
    Display(#[from] eframe::Error),
}

impl ScopeError {
    /// Short type name shown in front of the message.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScopeError::Config(_) => "ConfigError",
            ScopeError::Device(DeviceError::StreamLost(_))
            | ScopeError::Record(RecordError::StreamLost(_))
            | ScopeError::Record(RecordError::Device(DeviceError::StreamLost(_)))
            | ScopeError::Playback(PlaybackError::StreamLost(_))
            | ScopeError::Playback(PlaybackError::Device(DeviceError::StreamLost(_)))
            | ScopeError::StreamLost(_) => "StreamLost",
            ScopeError::Device(_) => "DeviceError",
            ScopeError::Record(RecordError::Device(_)) => "DeviceError",
            ScopeError::Record(_) => "RecordError",
            ScopeError::Playback(PlaybackError::Device(_)) => "DeviceError",
            ScopeError::Playback(_) => "PlaybackError",
            ScopeError::Signal(_) => "SignalError",
            ScopeError::Display(_) => "DisplayError",
        }
    }

    /// The single line printed on exit.
    pub fn exit_message(&self) -> String {
        format!("{}: {}", self.type_name(), self)
    }

    /// Settings problems that are reported as command line usage errors.
    pub fn usage_error(&self) -> Option<&ConfigError> {
        match self {
            ScopeError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StreamLost> for ScopeError {
    fn from(lost: StreamLost) -> Self {
        ScopeError::StreamLost(lost)
    }
}
