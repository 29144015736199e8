//! scope-taps - audio I/O debugging tools
//!
//! Shared code for the live two-tap scope, the recorder, the loopback
//! latency meter and the player.

pub mod audio;
pub mod cli;
pub mod error;
pub mod logging;
pub mod render;
pub mod scope;
pub mod settings;

pub use error::ScopeError;
