use std::time::Duration;

use thiserror::Error;

use crate::audio::{window_length, ChannelMap, DeviceSelector};
use crate::cli::ScopeArgs;

/// Invalid scope arguments, reported as usage errors
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("argument CHANNEL: must be >= 1 (got {0})")]
    ChannelNumber(usize),

    #[error("argument -n/--downsample: must be >= 1")]
    Downsample,

    #[error("argument -i/--interval: must be a positive number of ms")]
    Interval,

    #[error("argument -w/--window: {window_ms} ms at {sample_rate} Hz / {downsample} leaves no samples to plot")]
    EmptyWindow {
        window_ms: f64,
        sample_rate: f64,
        downsample: usize,
    },
}

/// Where the scope sampling rate comes from
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleRateChoice {
    Fixed(f64),
    DeviceDefault,
}

/// Validated live scope settings.
///
/// Built once from the command line; nothing is persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeSettings {
    pub channel_numbers: Vec<usize>,
    pub channels: ChannelMap,
    pub input_device: Option<DeviceSelector>,
    pub output_device: Option<DeviceSelector>,
    pub window_ms: f64,
    pub interval: Duration,
    pub blocksize: Option<u32>,
    pub sample_rate: SampleRateChoice,
    pub downsample: usize,
}

impl ScopeSettings {
    pub fn from_args(args: &ScopeArgs) -> Result<Self, ConfigError> {
        let channels = ChannelMap::from_one_based(&args.channels).map_err(ConfigError::ChannelNumber)?;
        if args.downsample == 0 {
            return Err(ConfigError::Downsample);
        }
        if !(args.interval.is_finite() && args.interval > 0.0) {
            return Err(ConfigError::Interval);
        }

        Ok(Self {
            channel_numbers: args.channels.clone(),
            channels,
            input_device: args.device.clone(),
            output_device: args.output_device.clone().or_else(|| args.device.clone()),
            window_ms: args.window,
            interval: Duration::from_micros((args.interval * 1000.0).round() as u64),
            blocksize: args.blocksize,
            sample_rate: if args.device_rate {
                SampleRateChoice::DeviceDefault
            } else {
                SampleRateChoice::Fixed(args.samplerate)
            },
            downsample: args.downsample,
        })
    }

    /// Rolling window length at the resolved sample rate.
    pub fn window_length(&self, sample_rate: f64) -> Result<usize, ConfigError> {
        match window_length(self.window_ms, sample_rate, self.downsample) {
            0 => Err(ConfigError::EmptyWindow {
                window_ms: self.window_ms,
                sample_rate,
                downsample: self.downsample,
            }),
            len => Ok(len),
        }
    }

    /// Spacing of the major grid lines, in displayed samples.
    pub fn major_tick_spacing(&self, length: usize) -> f32 {
        length as f32 / self.downsample as f32 / 5.0
    }

    pub fn legend(&self) -> Vec<String> {
        self.channel_numbers
            .iter()
            .map(|c| format!("channel {}", c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> Result<ScopeSettings, ConfigError> {
        let args = ScopeArgs::try_parse_from(std::iter::once("scope-taps").chain(argv.iter().copied())).unwrap();
        ScopeSettings::from_args(&args)
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.channels.indices(), &[0]);
        assert_eq!(settings.interval, Duration::from_millis(60));
        assert_eq!(settings.sample_rate, SampleRateChoice::Fixed(48_000.0));
        assert_eq!(settings.window_length(48_000.0), Ok(2400));
        assert_eq!(settings.legend(), vec!["channel 1".to_string()]);
    }

    #[test]
    fn test_zero_channel_rejected() {
        assert_eq!(parse(&["1", "0"]), Err(ConfigError::ChannelNumber(0)));
    }

    #[test]
    fn test_zero_downsample_rejected() {
        assert_eq!(parse(&["-n", "0"]), Err(ConfigError::Downsample));
    }

    #[test]
    fn test_output_device_falls_back_to_input() {
        let settings = parse(&["-d", "2"]).unwrap();
        assert_eq!(settings.output_device, Some(DeviceSelector::Index(2)));

        let settings = parse(&["-d", "2", "-o", "loop"]).unwrap();
        assert_eq!(settings.input_device, Some(DeviceSelector::Index(2)));
        assert_eq!(settings.output_device, Some(DeviceSelector::Name("loop".to_string())));
    }

    #[test]
    fn test_device_rate() {
        let settings = parse(&["--device-rate"]).unwrap();
        assert_eq!(settings.sample_rate, SampleRateChoice::DeviceDefault);
    }

    #[test]
    fn test_empty_window_rejected() {
        let settings = parse(&["-w", "0.1"]).unwrap();
        assert!(matches!(
            settings.window_length(48_000.0),
            Err(ConfigError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_major_ticks() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.major_tick_spacing(2400), 48.0);
    }
}
