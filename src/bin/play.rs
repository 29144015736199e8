//! Play a recorded file on an output device

use std::process::ExitCode;

use clap::Parser;

use scope_taps::audio::{decode_file, find_device, play, Direction};
use scope_taps::cli::PlayArgs;
use scope_taps::ScopeError;

fn main() -> ExitCode {
    scope_taps::logging::init();

    let args = PlayArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:?}", e);
            eprintln!("{}", e.exit_message());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &PlayArgs) -> Result<(), ScopeError> {
    let audio = decode_file(&args.file)?;
    println!("{}", audio.sample_rate);

    let device = find_device(&cpal::default_host(), args.device.as_ref(), Direction::Output)?;
    play(&device, &audio)?;
    Ok(())
}
