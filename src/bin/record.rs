//! Record three seconds of stereo audio to output.wav

use std::process::ExitCode;

use clap::Parser;

use scope_taps::audio::{
    find_device, print_devices, record, Direction, RECORD_CHANNELS, RECORD_FILE, RECORD_SAMPLE_RATE,
    RECORD_SECONDS,
};
use scope_taps::cli::RecordArgs;
use scope_taps::ScopeError;

fn main() -> ExitCode {
    scope_taps::logging::init();

    let args = RecordArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:?}", e);
            eprintln!("{}", e.exit_message());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &RecordArgs) -> Result<(), ScopeError> {
    let host = cpal::default_host();
    if args.list_devices {
        print_devices(&host)?;
        return Ok(());
    }

    let device = find_device(&host, args.device.as_ref(), Direction::Input)?;

    println!("Recording");
    let capture = record(&device, RECORD_CHANNELS, RECORD_SAMPLE_RATE, RECORD_SECONDS)?;
    println!("Finished");

    capture.write_wav(RECORD_FILE)?;
    log::info!("Wrote {} frames to {}", capture.frames(), RECORD_FILE);
    Ok(())
}
