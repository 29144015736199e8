//! Audio module - device access, block hand-off and rolling windows
//!
//! This module provides:
//! - Block queues between audio callbacks and the redraw loop
//! - Rolling display windows and the tap pair that drains into them
//! - Tap capture streams
//! - Fixed-length recording, loopback timing and file playback

mod buffer;
mod device;
mod file;
mod input;
mod latency;
mod recorder;
mod stream;
mod taps;
mod window;

pub use buffer::{block_queue, Block, BlockConsumer, BlockProducer, ChannelMap, GapDetector, StreamStatus};
pub use device::{
    default_sample_rate, find_device, list_devices, print_devices, DeviceError, DeviceInfo, DeviceSelector,
    Direction,
};
pub use file::{decode_file, play, DecodedAudio, PlaybackError};
pub use input::{StreamLost, StreamSettings, TapStream};
pub use latency::{collect_callbacks, measure_latency, CallbackClock, LatencyReport};
pub use recorder::{
    record, Capture, RecordError, RECORD_CHANNELS, RECORD_FILE, RECORD_SAMPLE_RATE, RECORD_SECONDS,
};
pub use taps::{Tap, TapPair};
pub use window::{window_length, RollingWindow};
