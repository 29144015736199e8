//! scope-taps - live two-tap audio scope
//!
//! Plots two capture streams, the "input" and "output" taps of an audio
//! path, as scrolling waveforms stacked in one window. Each tap keeps a
//! fixed-length rolling window of downsampled frames that is refreshed on a
//! timer from the blocks queued by the audio callbacks.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use scope_taps::audio::{
    default_sample_rate, find_device, print_devices, Direction, StreamLost, StreamSettings, TapStream,
};
use scope_taps::cli::ScopeArgs;
use scope_taps::render::{Oscilloscope, OscilloscopeSettings};
use scope_taps::scope::{ScopePipeline, ScopeState};
use scope_taps::settings::{ConfigError, SampleRateChoice, ScopeSettings};
use scope_taps::ScopeError;

fn main() -> ExitCode {
    scope_taps::logging::init();
    log::info!("Starting scope-taps");

    let args = ScopeArgs::parse();

    if args.list_devices {
        return match print_devices(&cpal::default_host()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(e.into()),
        };
    }

    let settings = match ScopeSettings::from_args(&args) {
        Ok(settings) => settings,
        Err(e) => usage_error(&e),
    };

    match run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.usage_error() {
            Some(config) => usage_error(config),
            None => fail(e),
        },
    }
}

fn usage_error(e: &ConfigError) -> ! {
    ScopeArgs::command()
        .error(clap::error::ErrorKind::ValueValidation, e)
        .exit()
}

fn fail(e: ScopeError) -> ExitCode {
    log::error!("{:?}", e);
    eprintln!("{}", e.exit_message());
    ExitCode::FAILURE
}

fn run(settings: ScopeSettings) -> Result<(), ScopeError> {
    let mut state = ScopeState::Init;

    let host = cpal::default_host();
    let input_device = find_device(&host, settings.input_device.as_ref(), Direction::Input)?;
    let output_device = find_device(&host, settings.output_device.as_ref(), Direction::Input)?;

    let sample_rate = match settings.sample_rate {
        SampleRateChoice::Fixed(rate) => rate,
        SampleRateChoice::DeviceDefault => {
            let rate = f64::from(default_sample_rate(&input_device, Direction::Input)?);
            println!("Samplerate: {}", rate);
            rate
        }
    };

    let length = settings.window_length(sample_rate)?;
    println!("{}", length);
    state.advance(ScopeState::Configured);

    let (pipeline, input_producer, output_producer) =
        ScopePipeline::new(&settings.channels, length, settings.downsample);

    let stream_settings = StreamSettings {
        sample_rate: sample_rate.round() as u32,
        blocksize: settings.blocksize,
    };
    let (lost_tx, lost_rx) = crossbeam_channel::bounded::<StreamLost>(2);

    let input = TapStream::open(
        "input",
        &input_device,
        stream_settings,
        &settings.channels,
        input_producer,
        lost_tx.clone(),
    )
    .map_err(|e| {
        state.advance(ScopeState::Failed);
        e
    })?;
    let output = TapStream::open(
        "output",
        &output_device,
        stream_settings,
        &settings.channels,
        output_producer,
        lost_tx,
    )
    .map_err(|e| {
        state.advance(ScopeState::Failed);
        e
    })?;
    let streams = [input, output];
    state.advance(ScopeState::Streaming);

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let (outcome_tx, outcome_rx) = crossbeam_channel::bounded::<StreamLost>(1);

    let plot = Oscilloscope::with_settings(OscilloscopeSettings {
        major_tick_spacing: settings.major_tick_spacing(length),
        ..Default::default()
    });

    let app = ScopeApp {
        pipeline,
        streams,
        plot,
        legend: settings.legend(),
        interval: settings.interval,
        last_refresh: None,
        lost: lost_rx,
        outcome: outcome_tx,
        interrupted,
        state,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_title("scope-taps"),
        ..Default::default()
    };

    eframe::run_native("scope-taps", options, Box::new(|_cc| Ok(Box::new(app))))?;

    // The app, and with it both streams, has been dropped by now.
    match outcome_rx.try_recv() {
        Ok(lost) => Err(lost.into()),
        Err(_) => Ok(()),
    }
}

struct ScopeApp {
    pipeline: ScopePipeline,
    streams: [TapStream; 2],
    plot: Oscilloscope,
    legend: Vec<String>,
    interval: Duration,
    last_refresh: Option<Instant>,
    lost: Receiver<StreamLost>,
    outcome: Sender<StreamLost>,
    interrupted: Arc<AtomicBool>,
    state: ScopeState,
}

impl ScopeApp {
    fn close(&mut self, ctx: &egui::Context, next: ScopeState) {
        if !self.state.is_finished() {
            self.state.advance(next);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn refresh_due(&self) -> bool {
        self.last_refresh
            .map(|at| at.elapsed() >= self.interval)
            .unwrap_or(true)
    }
}

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.interrupted.load(Ordering::SeqCst) {
            log::info!("Interrupted, closing");
            self.close(ctx, ScopeState::Closed);
        }

        if let Ok(lost) = self.lost.try_recv() {
            if !self.state.is_finished() {
                let _ = self.outcome.try_send(lost);
            }
            self.close(ctx, ScopeState::Failed);
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.close(ctx, ScopeState::Closed);
        }

        if self.refresh_due() {
            self.pipeline.refresh();
            self.last_refresh = Some(Instant::now());
        }
        ctx.request_repaint_after(self.interval);

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for stream in &self.streams {
                    ui.small(format!(
                        "{}: {} ({} ch)",
                        stream.tap(),
                        stream.device_name(),
                        stream.channels()
                    ));
                    ui.separator();
                }
                let taps = self.pipeline.taps();
                ui.small(format!(
                    "Blocks: {} in / {} out",
                    taps.input().blocks_written(),
                    taps.output().blocks_written()
                ));
                ui.separator();
                ui.small(format!("Window: {} samples", taps.input().window().len()));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let size = egui::vec2(
                available.x,
                ((available.y - ui.spacing().item_spacing.y) / 2.0).max(1.0),
            );
            let _ = self
                .plot
                .show(ui, self.pipeline.input_lines(), &self.legend, size);
            let _ = self
                .plot
                .show(ui, self.pipeline.output_lines(), &self.legend, size);
        });
    }
}

impl Drop for ScopeApp {
    fn drop(&mut self) {
        if !self.state.is_finished() {
            self.state.advance(ScopeState::Closed);
        }
        log::info!("Closing streams ({:?})", self.state);
    }
}
