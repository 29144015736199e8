//! Tap capture streams
//!
//! A tap stream is a cpal input stream whose callback feeds a
//! [`BlockProducer`]. The stream stays open for as long as the
//! [`TapStream`] value lives; dropping it closes the device stream.

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::Sender;

use super::buffer::{BlockProducer, ChannelMap, GapDetector};
use super::device::DeviceError;
use super::stream::{self, StreamClock};

/// Device-level stream parameters shared by both taps
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamSettings {
    pub sample_rate: u32,
    pub blocksize: Option<u32>,
}

/// A tap stream reported a fatal error (device gone)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamLost {
    pub tap: &'static str,
    pub message: String,
}

/// An open capture stream bound to one tap
pub struct TapStream {
    tap: &'static str,
    device_name: String,
    channels: u16,
    _stream: cpal::Stream,
}

impl TapStream {
    /// Open and start a capture stream on `device`.
    ///
    /// Every selected channel in `map` must exist on the device. Fatal stream
    /// errors are forwarded on `lost`.
    pub fn open(
        tap: &'static str,
        device: &cpal::Device,
        settings: StreamSettings,
        map: &ChannelMap,
        mut producer: BlockProducer,
        lost: Sender<StreamLost>,
    ) -> Result<Self, DeviceError> {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let default_config = device.default_input_config()?;
        let channels = default_config.channels();
        map.check_against(usize::from(channels))?;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(settings.sample_rate),
            buffer_size: settings
                .blocksize
                .map(cpal::BufferSize::Fixed)
                .unwrap_or(cpal::BufferSize::Default),
        };

        log::info!(
            "{} tap: {} ({:?}, {} channel(s), {} Hz, {:?})",
            tap,
            device_name,
            default_config.sample_format(),
            channels,
            settings.sample_rate,
            config.buffer_size
        );

        let device_channels = usize::from(channels);
        let mut gaps = GapDetector::new(settings.sample_rate);
        let mut clock = StreamClock::default();

        let stream = stream::build_input(
            device,
            &config,
            default_config.sample_format(),
            move |data: &[f32], info: &cpal::InputCallbackInfo| {
                let at = clock.elapsed(info.timestamp().capture);
                let status = gaps.observe(at, data.len() / device_channels);
                producer.on_block(data, device_channels, status);
            },
            stream::status_handler(tap, move |message| {
                let _ = lost.try_send(StreamLost { tap, message });
            }),
        )?;

        stream.play()?;
        log::info!("{} tap capture started", tap);

        Ok(Self {
            tap,
            device_name,
            channels,
            _stream: stream,
        })
    }

    pub fn tap(&self) -> &'static str {
        self.tap
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl Drop for TapStream {
    fn drop(&mut self) {
        log::info!("{} tap capture stopped", self.tap);
    }
}
