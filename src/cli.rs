//! Command line arguments for the binaries

use std::path::PathBuf;

use clap::Parser;

use crate::audio::DeviceSelector;

/// Plot two live input streams ("input" and "output" taps) as scrolling waveforms
#[derive(Parser, Debug)]
#[command(name = "scope-taps")]
pub struct ScopeArgs {
    /// input channels to plot (default: the first)
    #[arg(value_name = "CHANNEL", default_values_t = [1usize])]
    pub channels: Vec<usize>,

    /// show list of audio devices and exit
    #[arg(short, long)]
    pub list_devices: bool,

    /// input tap device (numeric ID or substring)
    #[arg(short, long)]
    pub device: Option<DeviceSelector>,

    /// output tap device (numeric ID or substring; default: same as --device)
    #[arg(short, long)]
    pub output_device: Option<DeviceSelector>,

    /// visible time slot in ms
    #[arg(short, long, value_name = "DURATION", default_value_t = 500.0)]
    pub window: f64,

    /// minimum time between plot updates in ms
    #[arg(short, long, default_value_t = 60.0)]
    pub interval: f64,

    /// block size (in samples)
    #[arg(short, long)]
    pub blocksize: Option<u32>,

    /// sampling rate of audio device
    #[arg(short = 'r', long, default_value_t = 48_000.0)]
    pub samplerate: f64,

    /// use the input device's default sampling rate instead of --samplerate
    #[arg(long)]
    pub device_rate: bool,

    /// display every Nth sample
    #[arg(short = 'n', long, value_name = "N", default_value_t = 10)]
    pub downsample: usize,
}

/// Record a few seconds of stereo audio to output.wav
#[derive(Parser, Debug)]
#[command(name = "scope-record")]
pub struct RecordArgs {
    /// show list of audio devices and exit
    #[arg(short, long)]
    pub list_devices: bool,

    /// input device (numeric ID or substring)
    #[arg(short, long)]
    pub device: Option<DeviceSelector>,
}

/// Measure the spacing of audio callbacks on a loopback stream
#[derive(Parser, Debug)]
#[command(name = "scope-latency")]
pub struct LatencyArgs {
    /// show list of audio devices and exit
    #[arg(short, long)]
    pub list_devices: bool,

    /// input device (numeric ID or substring)
    #[arg(short, long)]
    pub device: Option<DeviceSelector>,

    /// output device (numeric ID or substring)
    #[arg(short, long)]
    pub output_device: Option<DeviceSelector>,

    /// how long to run the loopback, in seconds
    #[arg(short = 't', long, default_value_t = 2.0)]
    pub duration: f64,
}

/// Play a recorded file on the default output device
#[derive(Parser, Debug)]
#[command(name = "scope-play")]
pub struct PlayArgs {
    /// file to play
    #[arg(default_value = crate::audio::RECORD_FILE)]
    pub file: PathBuf,

    /// output device (numeric ID or substring)
    #[arg(short, long)]
    pub device: Option<DeviceSelector>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_defaults() {
        let args = ScopeArgs::try_parse_from(["scope-taps"]).unwrap();
        assert_eq!(args.channels, vec![1]);
        assert!(!args.list_devices);
        assert_eq!(args.window, 500.0);
        assert_eq!(args.interval, 60.0);
        assert_eq!(args.samplerate, 48_000.0);
        assert_eq!(args.downsample, 10);
        assert_eq!(args.blocksize, None);
        assert_eq!(args.device, None);
    }

    #[test]
    fn test_scope_flags() {
        let args = ScopeArgs::try_parse_from([
            "scope-taps", "1", "2", "-d", "USB", "-o", "3", "-w", "250", "-i", "30", "-b", "256",
            "-r", "44100", "-n", "4",
        ])
        .unwrap();
        assert_eq!(args.channels, vec![1, 2]);
        assert_eq!(args.device, Some(DeviceSelector::Name("USB".to_string())));
        assert_eq!(args.output_device, Some(DeviceSelector::Index(3)));
        assert_eq!(args.window, 250.0);
        assert_eq!(args.interval, 30.0);
        assert_eq!(args.blocksize, Some(256));
        assert_eq!(args.samplerate, 44_100.0);
        assert_eq!(args.downsample, 4);
    }

    #[test]
    fn test_list_devices_flag() {
        let args = ScopeArgs::try_parse_from(["scope-taps", "--list-devices"]).unwrap();
        assert!(args.list_devices);
    }

    #[test]
    fn test_play_default_file() {
        let args = PlayArgs::try_parse_from(["scope-play"]).unwrap();
        assert_eq!(args.file, PathBuf::from("output.wav"));
    }

    #[test]
    fn test_latency_args() {
        let args = LatencyArgs::try_parse_from(["scope-latency", "-t", "0.5"]).unwrap();
        assert_eq!(args.duration, 0.5);
    }
}
