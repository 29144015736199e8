//! Loopback callback timing
//!
//! Input is forwarded to the output device through a ring buffer while the
//! callback timestamp of every input block is recorded. The spacing between
//! callbacks shows how the driver schedules the loop.

use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::Receiver;
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};

use super::device::DeviceError;
use super::stream::{self, StreamClock};

/// Tracks first/last callback times and the spacing between them
#[derive(Debug, Default)]
pub struct CallbackClock {
    first: Option<Duration>,
    last: Option<Duration>,
    callbacks: usize,
}

impl CallbackClock {
    /// Record a callback at `at`; returns the time since the previous one.
    pub fn observe(&mut self, at: Duration) -> Option<Duration> {
        self.callbacks += 1;
        self.first.get_or_insert(at);
        let delta = self.last.map(|last| at.saturating_sub(last));
        self.last = Some(at);
        delta
    }

    pub fn callbacks(&self) -> usize {
        self.callbacks
    }

    /// Time between the first and the last callback.
    pub fn span(&self) -> Option<Duration> {
        match (self.first, self.last) {
            (Some(first), Some(last)) => Some(last.saturating_sub(first)),
            _ => None,
        }
    }
}

/// Result of a loopback timing run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatencyReport {
    pub callbacks: usize,
    pub span: Option<Duration>,
    pub sample_rate: u32,
}

/// Run the loopback for `duration`, calling `on_delta` for every
/// inter-callback interval as it arrives.
pub fn measure_latency(
    input: &cpal::Device,
    output: &cpal::Device,
    channels: u16,
    duration: Duration,
    on_delta: impl FnMut(Duration),
) -> Result<LatencyReport, DeviceError> {
    let input_config = input.default_input_config()?;
    let output_format = output.default_output_config()?.sample_format();
    let sample_rate = input_config.sample_rate().0;

    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    // Half a second of headroom between capture and playback
    let rb = HeapRb::<f32>::new((sample_rate as usize / 2).max(1) * usize::from(channels));
    let (mut loop_in, mut loop_out) = rb.split();

    let (time_tx, time_rx) = crossbeam_channel::unbounded::<Duration>();
    let (lost_tx, lost_rx) = crossbeam_channel::bounded::<String>(1);
    let mut clock = StreamClock::default();

    let input_stream = stream::build_input(
        input,
        &config,
        input_config.sample_format(),
        move |data: &[f32], info: &cpal::InputCallbackInfo| {
            let _ = time_tx.send(clock.elapsed(info.timestamp().callback));
            loop_in.push_slice(data);
        },
        stream::forward_lost("latency input", lost_tx.clone()),
    )?;

    let output_stream = stream::build_output(
        output,
        &config,
        output_format,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let filled = loop_out.pop_slice(data);
            data[filled..].fill(0.0);
        },
        stream::forward_lost("latency output", lost_tx),
    )?;

    output_stream.play()?;
    input_stream.play()?;
    log::info!("Loopback running at {} Hz for {:?}", sample_rate, duration);

    let callbacks = collect_callbacks(&time_rx, &lost_rx, duration, on_delta);

    drop(input_stream);
    drop(output_stream);
    let callbacks = callbacks?;

    Ok(LatencyReport {
        callbacks: callbacks.callbacks(),
        span: callbacks.span(),
        sample_rate,
    })
}

/// Feed callback timestamps into a [`CallbackClock`] until `duration` has
/// passed or the timestamp sender goes away.
///
/// A message on `lost` ends the run with [`DeviceError::StreamLost`].
pub fn collect_callbacks(
    times: &Receiver<Duration>,
    lost: &Receiver<String>,
    duration: Duration,
    mut on_delta: impl FnMut(Duration),
) -> Result<CallbackClock, DeviceError> {
    let never = crossbeam_channel::never::<String>();
    let mut lost_open = true;
    let mut clock = CallbackClock::default();
    let deadline = Instant::now() + duration;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let lost_rx = if lost_open { lost } else { &never };
        crossbeam_channel::select! {
            recv(lost_rx) -> message => match message {
                Ok(message) => return Err(DeviceError::StreamLost(message)),
                Err(_) => lost_open = false,
            },
            recv(times) -> at => match at {
                Ok(at) => {
                    if let Some(delta) = clock.observe(at) {
                        on_delta(delta);
                    }
                }
                Err(_) => break,
            },
            default(remaining) => break,
        }
    }

    Ok(clock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_clock() {
        let mut clock = CallbackClock::default();
        assert_eq!(clock.span(), None);

        assert_eq!(clock.observe(Duration::from_millis(5)), None);
        assert_eq!(
            clock.observe(Duration::from_millis(15)),
            Some(Duration::from_millis(10))
        );
        assert_eq!(
            clock.observe(Duration::from_millis(26)),
            Some(Duration::from_millis(11))
        );

        assert_eq!(clock.callbacks(), 3);
        assert_eq!(clock.span(), Some(Duration::from_millis(21)));
    }

    #[test]
    fn test_single_callback_has_zero_span() {
        let mut clock = CallbackClock::default();
        clock.observe(Duration::from_millis(3));
        assert_eq!(clock.span(), Some(Duration::ZERO));
    }

    #[test]
    fn test_collect_until_deadline() {
        let (time_tx, time_rx) = crossbeam_channel::unbounded();
        let (_lost_tx, lost_rx) = crossbeam_channel::bounded::<String>(1);
        for ms in [0, 10, 25] {
            time_tx.send(Duration::from_millis(ms)).unwrap();
        }

        let mut deltas = Vec::new();
        let clock = collect_callbacks(&time_rx, &lost_rx, Duration::from_millis(50), |d| deltas.push(d)).unwrap();

        assert_eq!(clock.callbacks(), 3);
        assert_eq!(clock.span(), Some(Duration::from_millis(25)));
        assert_eq!(deltas, vec![Duration::from_millis(10), Duration::from_millis(15)]);
    }

    #[test]
    fn test_lost_device_ends_run() {
        let (_time_tx, time_rx) = crossbeam_channel::unbounded::<Duration>();
        let (lost_tx, lost_rx) = crossbeam_channel::bounded(1);
        lost_tx.send("device gone".to_string()).unwrap();

        let started = Instant::now();
        match collect_callbacks(&time_rx, &lost_rx, Duration::from_secs(30), |_| {}) {
            Err(DeviceError::StreamLost(message)) => assert_eq!(message, "device gone"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_closed_lost_channel_keeps_collecting() {
        let (time_tx, time_rx) = crossbeam_channel::unbounded();
        let (lost_tx, lost_rx) = crossbeam_channel::bounded::<String>(1);
        drop(lost_tx);
        time_tx.send(Duration::from_millis(1)).unwrap();
        time_tx.send(Duration::from_millis(4)).unwrap();

        let clock = collect_callbacks(&time_rx, &lost_rx, Duration::from_millis(30), |_| {}).unwrap();
        assert_eq!(clock.callbacks(), 2);
    }
}
