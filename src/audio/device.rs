//! Device enumeration and selection

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use cpal::traits::{DeviceTrait, HostTrait};
use thiserror::Error;

/// Errors raised while resolving devices or opening streams
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No {direction} device matching {selector}")]
    NotFound {
        selector: DeviceSelector,
        direction: Direction,
    },

    #[error("No default {0} device")]
    NoDefault(Direction),

    #[error("Channel {channel} not available: device has {available} channel(s)")]
    ChannelOutOfRange { channel: usize, available: usize },

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Failed to query device config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to open stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Stream lost: {0}")]
    StreamLost(String),
}

/// Stream direction a device is opened for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Numeric device index or a case-insensitive name substring
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSelector {
    Index(usize),
    Name(String),
}

impl DeviceSelector {
    pub fn matches(&self, index: usize, name: &str) -> bool {
        match self {
            DeviceSelector::Index(i) => *i == index,
            DeviceSelector::Name(s) => name.to_lowercase().contains(&s.to_lowercase()),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<usize>() {
            Ok(index) => DeviceSelector::Index(index),
            Err(_) => DeviceSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Index(i) => write!(f, "#{}", i),
            DeviceSelector::Name(s) => write!(f, "'{}'", s),
        }
    }
}

/// One row of the device listing
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub input_channels: u16,
    pub output_channels: u16,
    pub default_sample_rate: Option<u32>,
    pub default_input: bool,
    pub default_output: bool,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match (self.default_input, self.default_output) {
            (true, true) => '*',
            (true, false) => '>',
            (false, true) => '<',
            (false, false) => ' ',
        };
        write!(
            f,
            "{} {:>3} {}, ({} in, {} out)",
            marker, self.index, self.name, self.input_channels, self.output_channels
        )?;
        if let Some(rate) = self.default_sample_rate {
            write!(f, " {} Hz", rate)?;
        }
        Ok(())
    }
}

fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "Unknown".to_string())
}

fn supports(device: &cpal::Device, direction: Direction) -> bool {
    match direction {
        Direction::Input => device.default_input_config().is_ok(),
        Direction::Output => device.default_output_config().is_ok(),
    }
}

/// Enumerate all devices of a host.
pub fn list_devices(host: &cpal::Host) -> Result<Vec<DeviceInfo>, DeviceError> {
    let default_input = host.default_input_device().map(|d| device_name(&d));
    let default_output = host.default_output_device().map(|d| device_name(&d));

    let infos = host
        .devices()?
        .enumerate()
        .map(|(index, device)| {
            let name = device_name(&device);
            let input = device.default_input_config().ok();
            let output = device.default_output_config().ok();
            let default_sample_rate = input
                .as_ref()
                .or(output.as_ref())
                .map(|c| c.sample_rate().0);
            DeviceInfo {
                index,
                input_channels: input.map(|c| c.channels()).unwrap_or(0),
                output_channels: output.map(|c| c.channels()).unwrap_or(0),
                default_sample_rate,
                default_input: default_input.as_deref() == Some(name.as_str()),
                default_output: default_output.as_deref() == Some(name.as_str()),
                name,
            }
        })
        .collect();

    Ok(infos)
}

/// Print the device listing to stdout.
pub fn print_devices(host: &cpal::Host) -> Result<(), DeviceError> {
    for info in list_devices(host)? {
        println!("{}", info);
    }
    Ok(())
}

/// Resolve a selector, or the host default when none is given.
pub fn find_device(
    host: &cpal::Host,
    selector: Option<&DeviceSelector>,
    direction: Direction,
) -> Result<cpal::Device, DeviceError> {
    let device = match selector {
        None => {
            let default = match direction {
                Direction::Input => host.default_input_device(),
                Direction::Output => host.default_output_device(),
            };
            default.ok_or(DeviceError::NoDefault(direction))?
        }
        Some(selector) => host
            .devices()?
            .enumerate()
            .find(|(index, device)| {
                selector.matches(*index, &device_name(device)) && supports(device, direction)
            })
            .map(|(_, device)| device)
            .ok_or_else(|| DeviceError::NotFound {
                selector: selector.clone(),
                direction,
            })?,
    };

    log::info!("Using {} device: {}", direction, device_name(&device));
    Ok(device)
}

/// Default sample rate of a device in the given direction.
pub fn default_sample_rate(device: &cpal::Device, direction: Direction) -> Result<u32, DeviceError> {
    let config = match direction {
        Direction::Input => device.default_input_config()?,
        Direction::Output => device.default_output_config()?,
    };
    Ok(config.sample_rate().0)
}
