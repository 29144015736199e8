//! Block hand-off between audio callbacks and the redraw loop
//!
//! Each tap owns one queue. The audio thread is the single producer: it
//! selects the configured channels, keeps every Nth frame and sends the copy
//! as a [`Block`]. The redraw loop is the single consumer and only ever polls.
//!
//! The queue is an unbounded `crossbeam_channel`, so a push never waits on the
//! consumer. Sending to a queue whose consumer is gone is silently ignored.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::{FromSample, Sample};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::device::DeviceError;

/// One callback's worth of frames, stored row-major (frame by frame).
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    frames: usize,
    channels: usize,
    samples: Vec<f32>,
}

impl Block {
    /// Build a block from interleaved samples.
    ///
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn from_interleaved(channels: usize, mut samples: Vec<f32>) -> Self {
        let frames = if channels == 0 { 0 } else { samples.len() / channels };
        samples.truncate(frames * channels);
        Self {
            frames,
            channels,
            samples,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Samples of one frame, one per channel.
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.channels;
        &self.samples[start..start + self.channels]
    }
}

/// Zero-based device channel indices, in display order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMap(Vec<usize>);

impl ChannelMap {
    /// Build a map from one-based channel numbers as typed by the user.
    ///
    /// Returns the offending number if any of them is zero.
    pub fn from_one_based(channels: &[usize]) -> Result<Self, usize> {
        channels
            .iter()
            .map(|&c| c.checked_sub(1).ok_or(c))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check every selected channel exists on a device with `available` channels.
    pub fn check_against(&self, available: usize) -> Result<(), DeviceError> {
        match self.0.iter().find(|&&c| c >= available) {
            Some(&c) => Err(DeviceError::ChannelOutOfRange {
                channel: c + 1,
                available,
            }),
            None => Ok(()),
        }
    }
}

/// Status flags reported alongside a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStatus {
    pub input_overflow: bool,
}

impl StreamStatus {
    pub fn is_clean(&self) -> bool {
        !self.input_overflow
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.input_overflow {
            write!(f, "input overflow")?;
        }
        Ok(())
    }
}

/// Derives an overflow flag from capture timestamps.
///
/// cpal does not hand out per-block status flags, so a capture time that jumps
/// further than 1.5 blocks past the previous one is treated as dropped input.
pub struct GapDetector {
    sample_rate: f64,
    previous: Option<(Duration, usize)>,
}

impl GapDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: f64::from(sample_rate),
            previous: None,
        }
    }

    /// Record a block captured at `at` holding `frames` frames.
    pub fn observe(&mut self, at: Duration, frames: usize) -> StreamStatus {
        let mut status = StreamStatus::default();
        if let Some((prev_at, prev_frames)) = self.previous {
            let expected = prev_frames as f64 / self.sample_rate;
            if let Some(elapsed) = at.checked_sub(prev_at) {
                status.input_overflow = expected > 0.0 && elapsed.as_secs_f64() > expected * 1.5;
            }
        }
        self.previous = Some((at, frames));
        status
    }
}

/// Producer half of a tap queue (owned by the audio callback)
pub struct BlockProducer {
    tap: &'static str,
    tx: Sender<Block>,
    map: ChannelMap,
    downsample: usize,
    blocks_written: Arc<AtomicU64>,
}

impl BlockProducer {
    /// Handle one interleaved callback buffer with `device_channels` channels.
    ///
    /// Never blocks. Status flags are logged and otherwise ignored.
    pub fn on_block<T>(&mut self, data: &[T], device_channels: usize, status: StreamStatus)
    where
        T: Sample,
        f32: FromSample<T>,
    {
        if !status.is_clean() {
            log::warn!("{} stream: {}", self.tap, status);
        }
        let block = self.select(data, device_channels);
        if self.tx.send(block).is_ok() {
            self.blocks_written.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy the selected channels of every Nth frame, starting at frame 0.
    pub fn select<T>(&self, data: &[T], device_channels: usize) -> Block
    where
        T: Sample,
        f32: FromSample<T>,
    {
        let channels = self.map.len();
        if device_channels == 0 {
            return Block::from_interleaved(channels, Vec::new());
        }
        let mut samples = Vec::with_capacity(data.len() / device_channels / self.downsample * channels + channels);
        for frame in data.chunks_exact(device_channels).step_by(self.downsample) {
            samples.extend(self.map.indices().iter().map(|&c| f32::from_sample(frame[c])));
        }
        Block::from_interleaved(channels, samples)
    }
}

/// Consumer half of a tap queue (owned by the redraw loop)
pub struct BlockConsumer {
    rx: Receiver<Block>,
    blocks_written: Arc<AtomicU64>,
}

impl BlockConsumer {
    /// Poll for the next block without waiting.
    pub fn try_next(&self) -> Option<Block> {
        match self.rx.try_recv() {
            Ok(block) => Some(block),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Number of blocks queued so far (for statistics)
    pub fn blocks_written(&self) -> u64 {
        self.blocks_written.load(Ordering::Relaxed)
    }
}

/// Create the queue for one tap.
///
/// `downsample` is clamped to at least 1.
pub fn block_queue(tap: &'static str, map: ChannelMap, downsample: usize) -> (BlockProducer, BlockConsumer) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let blocks_written = Arc::new(AtomicU64::new(0));

    let producer = BlockProducer {
        tap,
        tx,
        map,
        downsample: downsample.max(1),
        blocks_written: Arc::clone(&blocks_written),
    };
    let consumer = BlockConsumer { rx, blocks_written };

    (producer, consumer)
}
