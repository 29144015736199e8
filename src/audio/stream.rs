//! cpal stream construction with f32 callbacks
//!
//! Devices run in whatever sample format they prefer. These helpers open the
//! stream in the device format and convert at the callback boundary, so the
//! rest of the crate only ever sees `f32`.

use std::time::Duration;

use cpal::traits::DeviceTrait;
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::Sender;

use super::device::DeviceError;

/// Open an input stream whose data callback receives interleaved `f32`.
pub fn build_input<D, E>(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    on_data: D,
    on_error: E,
) -> Result<cpal::Stream, DeviceError>
where
    D: FnMut(&[f32], &cpal::InputCallbackInfo) + Send + 'static,
    E: FnMut(cpal::StreamError) + Send + 'static,
{
    let stream = match format {
        SampleFormat::F32 => device.build_input_stream::<f32, _, _>(config, on_data, on_error, None)?,
        SampleFormat::I16 => converting_input::<i16, _, _>(device, config, on_data, on_error)?,
        SampleFormat::I32 => converting_input::<i32, _, _>(device, config, on_data, on_error)?,
        SampleFormat::U16 => converting_input::<u16, _, _>(device, config, on_data, on_error)?,
        SampleFormat::F64 => converting_input::<f64, _, _>(device, config, on_data, on_error)?,
        other => return Err(DeviceError::UnsupportedFormat(other)),
    };
    Ok(stream)
}

fn converting_input<T, D, E>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut on_data: D,
    on_error: E,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
    D: FnMut(&[f32], &cpal::InputCallbackInfo) + Send + 'static,
    E: FnMut(cpal::StreamError) + Send + 'static,
{
    let mut scratch: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], info: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|&s| f32::from_sample(s)));
            on_data(&scratch, info);
        },
        on_error,
        None,
    )
}

/// Open an output stream whose data callback fills interleaved `f32`.
pub fn build_output<D, E>(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    on_data: D,
    on_error: E,
) -> Result<cpal::Stream, DeviceError>
where
    D: FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static,
    E: FnMut(cpal::StreamError) + Send + 'static,
{
    let stream = match format {
        SampleFormat::F32 => device.build_output_stream::<f32, _, _>(config, on_data, on_error, None)?,
        SampleFormat::I16 => converting_output::<i16, _, _>(device, config, on_data, on_error)?,
        SampleFormat::I32 => converting_output::<i32, _, _>(device, config, on_data, on_error)?,
        SampleFormat::U16 => converting_output::<u16, _, _>(device, config, on_data, on_error)?,
        SampleFormat::F64 => converting_output::<f64, _, _>(device, config, on_data, on_error)?,
        other => return Err(DeviceError::UnsupportedFormat(other)),
    };
    Ok(stream)
}

fn converting_output<T, D, E>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut on_data: D,
    on_error: E,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
    D: FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static,
    E: FnMut(cpal::StreamError) + Send + 'static,
{
    let mut scratch: Vec<f32> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
            scratch.clear();
            scratch.resize(data.len(), 0.0);
            on_data(&mut scratch, info);
            for (out, &s) in data.iter_mut().zip(scratch.iter()) {
                *out = T::from_sample(s);
            }
        },
        on_error,
        None,
    )
}

/// Error callback policy shared by all streams.
///
/// A lost device is reported through `on_fatal`; anything else the backend
/// reports is logged as a stream status warning and otherwise ignored.
pub fn status_handler<F>(label: &'static str, mut on_fatal: F) -> impl FnMut(cpal::StreamError) + Send + 'static
where
    F: FnMut(String) + Send + 'static,
{
    move |err: cpal::StreamError| match err {
        cpal::StreamError::DeviceNotAvailable => {
            log::error!("{} stream error: {}", label, err);
            on_fatal(err.to_string());
        }
        other => log::warn!("{} stream status: {}", label, other),
    }
}

/// [`status_handler`] that sends a lost device's message to `lost`.
///
/// Only the first message is kept when `lost` is bounded; later ones are dropped.
pub fn forward_lost(label: &'static str, lost: Sender<String>) -> impl FnMut(cpal::StreamError) + Send + 'static {
    status_handler(label, move |message| {
        let _ = lost.try_send(message);
    })
}

/// Time since the first capture timestamp seen by a stream.
#[derive(Default)]
pub struct StreamClock {
    origin: Option<cpal::StreamInstant>,
}

impl StreamClock {
    pub fn elapsed(&mut self, at: cpal::StreamInstant) -> Duration {
        let origin = *self.origin.get_or_insert(at);
        at.duration_since(&origin).unwrap_or_default()
    }
}
