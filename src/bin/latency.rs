//! Print the spacing between audio callbacks on a loopback stream

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use scope_taps::audio::{find_device, measure_latency, print_devices, Direction};
use scope_taps::cli::LatencyArgs;
use scope_taps::ScopeError;

fn main() -> ExitCode {
    scope_taps::logging::init();

    let args = LatencyArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:?}", e);
            eprintln!("{}", e.exit_message());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &LatencyArgs) -> Result<(), ScopeError> {
    let host = cpal::default_host();
    if args.list_devices {
        print_devices(&host)?;
        return Ok(());
    }

    let input = find_device(&host, args.device.as_ref(), Direction::Input)?;
    let output = find_device(&host, args.output_device.as_ref(), Direction::Output)?;
    let duration = Duration::from_secs_f64(args.duration.max(0.0));

    println!("recording");
    let report = measure_latency(&input, &output, 1, duration, |delta| {
        println!("{:.6}", delta.as_secs_f64());
    })?;

    log::info!("{} callbacks at {} Hz", report.callbacks, report.sample_rate);
    match report.span {
        Some(span) => println!("{:.6}", span.as_secs_f64()),
        None => println!("no callbacks received"),
    }
    Ok(())
}
