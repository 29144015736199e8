//! Render module - UI components for visualization

mod oscilloscope;

pub use oscilloscope::{LineSet, Oscilloscope, OscilloscopeSettings};
