//! Fixed-length capture to a WAV file

use std::path::Path;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::RecvTimeoutError;
use thiserror::Error;

use super::device::DeviceError;
use super::stream;

pub const RECORD_SAMPLE_RATE: u32 = 48_000;
pub const RECORD_SECONDS: u32 = 3;
pub const RECORD_CHANNELS: u16 = 2;
pub const RECORD_FILE: &str = "output.wav";

/// How long the capture may go without a block before giving up
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that can occur while recording
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Failed to write WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error("Capture stream failed: {0}")]
    StreamLost(String),

    #[error("Capture stalled after {captured} of {wanted} frames")]
    Stalled { captured: usize, wanted: usize },
}

/// Interleaved samples accumulated up to a fixed frame count
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    channels: u16,
    sample_rate: u32,
    wanted: usize,
    samples: Vec<f32>,
}

impl Capture {
    pub fn new(channels: u16, sample_rate: u32, seconds: u32) -> Self {
        let wanted = sample_rate as usize * seconds as usize;
        Self {
            channels,
            sample_rate,
            wanted,
            samples: Vec::with_capacity(wanted * usize::from(channels)),
        }
    }

    /// Append interleaved samples, ignoring anything past the wanted length.
    pub fn push(&mut self, data: &[f32]) {
        let limit = self.wanted * usize::from(self.channels);
        let room = limit.saturating_sub(self.samples.len());
        self.samples.extend_from_slice(&data[..data.len().min(room)]);
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / usize::from(self.channels)
        }
    }

    pub fn wanted_frames(&self) -> usize {
        self.wanted
    }

    pub fn is_complete(&self) -> bool {
        self.frames() >= self.wanted
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Write the capture as 32-bit float WAV.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Capture `seconds` of audio from `device`, blocking until done.
pub fn record(
    device: &cpal::Device,
    channels: u16,
    sample_rate: u32,
    seconds: u32,
) -> Result<Capture, RecordError> {
    let format = device.default_input_config().map_err(DeviceError::from)?.sample_format();
    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let (block_tx, block_rx) = crossbeam_channel::unbounded::<Vec<f32>>();
    let (lost_tx, lost_rx) = crossbeam_channel::bounded::<String>(1);

    let stream = stream::build_input(
        device,
        &config,
        format,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let _ = block_tx.send(data.to_vec());
        },
        stream::forward_lost("record", lost_tx),
    )?;
    stream.play().map_err(DeviceError::from)?;
    log::info!("Recording {} s at {} Hz, {} channel(s)", seconds, sample_rate, channels);

    let mut capture = Capture::new(channels, sample_rate, seconds);
    while !capture.is_complete() {
        if let Ok(message) = lost_rx.try_recv() {
            return Err(RecordError::StreamLost(message));
        }
        match block_rx.recv_timeout(STALL_TIMEOUT) {
            Ok(block) => capture.push(&block),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return Err(match lost_rx.try_recv() {
                    Ok(message) => RecordError::StreamLost(message),
                    Err(_) => RecordError::Stalled {
                        captured: capture.frames(),
                        wanted: capture.wanted_frames(),
                    },
                });
            }
        }
    }

    drop(stream);
    log::info!("Captured {} frames", capture.frames());
    Ok(capture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_stops_at_wanted_length() {
        let mut capture = Capture::new(2, 4, 1);
        capture.push(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert!(!capture.is_complete());
        capture.push(&[0.7, 0.8, 0.9, 1.0, 1.1, 1.2]);
        assert!(capture.is_complete());
        assert_eq!(capture.frames(), 4);
        assert_eq!(capture.samples().len(), 8);
        assert_eq!(capture.samples()[7], 0.8);
    }

    #[test]
    fn test_record_constants() {
        let capture = Capture::new(RECORD_CHANNELS, RECORD_SAMPLE_RATE, RECORD_SECONDS);
        assert_eq!(capture.wanted_frames(), 144_000);
    }

    #[test]
    fn test_write_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RECORD_FILE);

        let mut capture = Capture::new(2, 8_000, 1);
        let samples: Vec<f32> = (0..16_000).map(|i| (i % 100) as f32 / 100.0 - 0.5).collect();
        capture.push(&samples);
        capture.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);

        let read: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }
}
