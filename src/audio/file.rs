//! Audio file playback
//!
//! This module decodes a captured file with symphonia and plays it on an
//! output device.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::Receiver;
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use super::device::DeviceError;
use super::stream;

/// Errors that can occur during audio file operations
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to probe audio format: {0}")]
    ProbeError(String),

    #[error("No audio tracks found")]
    NoTracks,

    #[error("Failed to create decoder: {0}")]
    DecoderError(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("Playback stalled at frame {played} of {total}")]
    Stalled { played: usize, total: usize },

    #[error("Playback stream failed: {0}")]
    StreamLost(String),
}

/// Fully decoded file, interleaved
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / usize::from(self.channels)
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }
}

/// Decode a whole audio file into memory.
pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedAudio, PlaybackError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::ProbeError(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(PlaybackError::NoTracks)?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::DecoderError(e.to_string()))?;

    let mut samples = Vec::new();
    let mut scratch: Option<DecodeBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                log::warn!("Stopped reading at packet error: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let needs_new = scratch
                    .as_ref()
                    .map(|b| b.capacity() < decoded.capacity() * spec.channels.count())
                    .unwrap_or(true);
                if needs_new {
                    scratch = Some(DecodeBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = scratch.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(PlaybackError::DecoderError(e.to_string())),
        }
    }

    log::info!(
        "Decoded {:?}: {} Hz, {} channel(s), {} samples",
        path,
        sample_rate,
        channels,
        samples.len()
    );

    Ok(DecodedAudio {
        sample_rate,
        channels,
        samples,
    })
}

/// Play decoded audio on `device` and block until it has been consumed.
pub fn play(device: &cpal::Device, audio: &DecodedAudio) -> Result<(), PlaybackError> {
    let format = device
        .default_output_config()
        .map_err(DeviceError::from)?
        .sample_format();
    let config = cpal::StreamConfig {
        channels: audio.channels,
        sample_rate: cpal::SampleRate(audio.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    // ~1 second of audio between the feeder and the output callback
    let rb = HeapRb::<f32>::new((audio.sample_rate as usize * usize::from(audio.channels)).max(1));
    let (mut prod, mut cons) = rb.split();

    let played = Arc::new(AtomicUsize::new(0));
    let played_cb = Arc::clone(&played);
    let (lost_tx, lost_rx) = crossbeam_channel::bounded::<String>(1);

    let stream = stream::build_output(
        device,
        &config,
        format,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let filled = cons.pop_slice(data);
            data[filled..].fill(0.0);
            played_cb.fetch_add(filled, Ordering::Relaxed);
        },
        stream::forward_lost("playback", lost_tx),
    )?;
    stream.play().map_err(DeviceError::from)?;
    log::info!("Playing {:.2} s", audio.duration().as_secs_f64());

    let result = feed(&mut prod, audio, &played, &lost_rx);

    drop(stream);
    result?;
    log::info!("Playback finished");
    Ok(())
}

/// Push `audio` into `prod` until the output callback has counted every
/// sample in `played`.
///
/// Fails when a lost device is reported on `lost` or when `played` stops
/// moving for two seconds.
fn feed<P>(prod: &mut P, audio: &DecodedAudio, played: &AtomicUsize, lost: &Receiver<String>) -> Result<(), PlaybackError>
where
    P: Producer<Item = f32>,
{
    let total = audio.samples.len();
    let mut fed = 0;
    let mut last_progress = (0, Instant::now());
    let feed_sleep = Duration::from_millis(5);

    while played.load(Ordering::Relaxed) < total {
        if let Ok(message) = lost.try_recv() {
            return Err(PlaybackError::StreamLost(message));
        }

        if fed < total && !prod.is_full() {
            fed += prod.push_slice(&audio.samples[fed..]);
            continue;
        }

        let now_played = played.load(Ordering::Relaxed);
        if now_played != last_progress.0 {
            last_progress = (now_played, Instant::now());
        } else if last_progress.1.elapsed() > Duration::from_secs(2) {
            let channels = usize::from(audio.channels.max(1));
            return Err(PlaybackError::Stalled {
                played: now_played / channels,
                total: total / channels,
            });
        }
        thread::sleep(feed_sleep);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let samples: Vec<f32> = (0..9_600).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in &samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let audio = decode_file(&path).unwrap();
        assert_eq!(audio.sample_rate, 48_000);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frames(), 4_800);
        assert_eq!(audio.duration(), Duration::from_millis(100));
        assert_eq!(audio.samples, samples);
    }

    fn tone(frames: usize) -> DecodedAudio {
        DecodedAudio {
            sample_rate: 1_000,
            channels: 2,
            samples: (0..frames * 2).map(|i| i as f32).collect(),
        }
    }

    #[test]
    fn test_feed_until_played() {
        let audio = tone(500);
        let (mut prod, mut cons) = HeapRb::<f32>::new(64).split();
        let played = Arc::new(AtomicUsize::new(0));
        let (_lost_tx, lost_rx) = crossbeam_channel::bounded::<String>(1);

        let played_cb = Arc::clone(&played);
        let total = audio.samples.len();
        let output = thread::spawn(move || {
            let mut out = Vec::new();
            let mut chunk = [0.0f32; 16];
            while out.len() < total {
                let filled = cons.pop_slice(&mut chunk);
                out.extend_from_slice(&chunk[..filled]);
                played_cb.fetch_add(filled, Ordering::Relaxed);
                thread::sleep(Duration::from_micros(100));
            }
            out
        });

        feed(&mut prod, &audio, &played, &lost_rx).unwrap();
        assert_eq!(output.join().unwrap(), audio.samples);
    }

    #[test]
    fn test_feed_stops_on_lost_device() {
        let audio = tone(500);
        let (mut prod, _cons) = HeapRb::<f32>::new(64).split();
        let played = AtomicUsize::new(0);
        let (lost_tx, lost_rx) = crossbeam_channel::bounded(1);
        lost_tx.send("device gone".to_string()).unwrap();

        let started = Instant::now();
        match feed(&mut prod, &audio, &played, &lost_rx) {
            Err(PlaybackError::StreamLost(message)) => assert_eq!(message, "device gone"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        match decode_file(dir.path().join("missing.wav")) {
            Err(PlaybackError::IoError(_)) => {}
            other => panic!("unexpected result: {:?}", other.map(|a| a.frames())),
        }
    }
}
