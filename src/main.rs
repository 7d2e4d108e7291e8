//! Angle tracker - replays accelerometer samples through the tracker
//!
//! Reads a recording (JSON lines, or an HDF5 session with the `recording`
//! feature), paces it at the configured tick interval and shows face, angle and
//! calibration state live on the console.
//!
//! Usage:
//!   angle-tracker --input demos/rotation.jsonl
//!   angle-tracker --input demos/rotation.jsonl --config demos/tracker.json --symmetric
//!   angle-tracker --input session.jsonl --fast --record out.h5

use accel_angle_tracker::{
    create_bar, format_angle, PeakAngleReporter, ReplaySource, StreamControl, TickOutcome,
    TickReport, TimeKeeper, Tracker, TrackerConfig, TracingSink, WrapMode,
};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "angle-tracker")]
#[command(about = "Track rotation angle from accelerometer samples", long_about = None)]
struct Args {
    /// Input recording (.jsonl, or .h5 with the recording feature)
    #[arg(short, long)]
    input: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tick rate in Hz, 1-1000 (default: from update interval)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    rate: Option<u64>,

    /// Samples kept per axis for median smoothing
    #[arg(long)]
    capacity: Option<usize>,

    /// Ticks before the reference is captured
    #[arg(long)]
    threshold: Option<u64>,

    /// Fold angles above 90 degrees as well as below -90
    #[arg(long)]
    symmetric: bool,

    /// Process as fast as possible without the live display
    #[arg(long)]
    fast: bool,

    /// Record the session to an HDF5 file
    #[cfg(feature = "recording")]
    #[arg(long)]
    record: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn tracker_config(&self) -> TrackerConfig {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::load_from_file(path),
            None => TrackerConfig::default(),
        };
        if let Some(capacity) = self.capacity {
            config.stream_capacity = capacity;
        }
        if let Some(threshold) = self.threshold {
            config.calibration_threshold = threshold;
        }
        if self.symmetric {
            config.wrap = WrapMode::Symmetric;
        }
        config
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = args.tracker_config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    let interval = match args.rate {
        Some(hz) => Duration::from_micros(1_000_000 / hz),
        None => config.update_interval(),
    };

    let mut source = match open_source(&args.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", args.input.display(), e);
            eprintln!("Please check:");
            eprintln!("  1. The file exists and is readable");
            eprintln!("  2. JSON lines look like {{\"x\": 0.0, \"y\": 0.0, \"z\": 1.0}}");
            return Err(Box::new(e));
        }
    };

    println!("Angle Tracker");
    println!("=============");
    println!("Input: {} ({} records)", args.input.display(), source.len());
    println!("Started: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!(
        "Smoothing: {} samples | Calibration after {} ticks | Wrap: {:?}",
        config.stream_capacity, config.calibration_threshold, config.wrap
    );
    if args.fast {
        println!("Mode: fast replay");
    } else {
        println!("Mode: one tick every {:?} (Ctrl+C to stop)", interval);
    }
    println!();

    let mut tracker = Tracker::new(&config)?;
    tracker.add_sink(TracingSink);
    tracker.add_sink(PeakAngleReporter::new(
        config.peak.dead_band_deg,
        config.peak_interval_ticks(),
        |peak: f32| tracing::info!("peak angle {:.2}", peak),
    ));

    #[cfg(feature = "recording")]
    let mut writer = match &args.record {
        Some(path) => Some(accel_angle_tracker::SessionWriter::create(path, &config)?),
        None => None,
    };

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let timer = TimeKeeper::new();
    let mut aborted = 0u64;
    let mut peak_abs = 0.0f32;
    #[cfg(feature = "recording")]
    let mut batch = Vec::with_capacity(100);

    if !args.fast {
        print!("\x1B[2J\x1B[H");
        io::stdout().flush()?;
    }

    let callback = |report: &TickReport| {
        if !running.load(Ordering::SeqCst) {
            return StreamControl::Break;
        }

        match report.outcome {
            TickOutcome::Aborted => aborted += 1,
            TickOutcome::Angle(a) if a.is_finite() => peak_abs = peak_abs.max(a.abs()),
            _ => {}
        }

        #[cfg(feature = "recording")]
        if let Some(writer) = writer.as_mut() {
            let locked = matches!(report.outcome, TickOutcome::Calibrated(_) | TickOutcome::Angle(_));
            batch.push(accel_angle_tracker::SessionRecord::from_report(
                timer.elapsed_secs(),
                report,
                locked,
            ));
            if batch.len() >= 100 {
                if let Err(e) = writer.append_batch(&batch) {
                    eprintln!("Write error: {}", e);
                    return StreamControl::Break;
                }
                batch.clear();
            }
        }

        if !args.fast {
            if let Err(e) = draw(report, &timer) {
                eprintln!("Display error: {}", e);
                return StreamControl::Break;
            }
        }

        StreamControl::Continue
    };

    let ticks = if args.fast {
        tracker.drain(&mut source, callback)?
    } else {
        tracker.stream(&mut source, interval, callback)?
    };

    #[cfg(feature = "recording")]
    if let Some(writer) = writer.as_mut() {
        writer.append_batch(&batch)?;
        writer.flush()?;
        println!("\nRecorded {} ticks", writer.record_count());
    }

    println!("\nReplay complete!");
    println!("Ticks: {} ({} aborted)", ticks, aborted);
    println!("Elapsed time: {:.2} seconds", timer.elapsed_secs());
    match tracker.reference() {
        Some(r) => println!("Reference: x={:.3}g y={:.3}g z={:.3}g", r.x, r.y, r.z),
        None => println!("Reference: not calibrated"),
    }
    println!("Final face: {}", tracker.face());
    println!("Final angle: {}", format_angle(tracker.angle()).trim());
    println!("Peak |angle|: {:.2}°", peak_abs);

    Ok(())
}

/// Open a recording by extension
fn open_source(path: &Path) -> accel_angle_tracker::Result<ReplaySource> {
    #[cfg(feature = "recording")]
    if path.extension().is_some_and(|ext| ext == "h5") {
        return accel_angle_tracker::SessionReader::open(path)?.to_replay();
    }

    ReplaySource::from_jsonl(path)
}

/// Redraw the live display in place
fn draw(report: &TickReport, timer: &TimeKeeper) -> io::Result<()> {
    // Move cursor to top without clearing (reduces flicker)
    print!("\x1B[H");

    println!("Angle Tracker - Live                                           ");
    println!("====================                                           ");
    println!(
        "Time: {:.2}s | Ticks: {} | Rate: {:.1} Hz                    ",
        timer.elapsed_secs(),
        report.tick,
        timer.rate(report.tick)
    );
    println!();

    let state = match report.outcome {
        TickOutcome::Aborted => "read failed, tick skipped",
        TickOutcome::Collecting => "calibrating...           ",
        TickOutcome::Calibrated(_) => "calibrated               ",
        TickOutcome::Angle(_) => "tracking                 ",
    };
    println!("State: {}", state);
    println!("Face:  {:<8}", report.face.to_string());
    println!();

    if let Some(s) = report.smoothed {
        println!("SMOOTHED (g)                       -2g ◄─────────┼─────────► +2g");
        println!("  X: {:7.3}g  [{}]", s.x, create_bar(s.x, 2.0, 40));
        println!("  Y: {:7.3}g  [{}]", s.y, create_bar(s.y, 2.0, 40));
        println!("  Z: {:7.3}g  [{}]", s.z, create_bar(s.z, 2.0, 40));
        println!();
    }

    if let TickOutcome::Angle(angle) = report.outcome {
        println!("ANGLE                            -180° ◄─────────┼─────────► +180°");
        println!("  {} [{}]", format_angle(Some(angle)), create_bar(angle, 180.0, 40));
    }

    println!();
    println!("Press Ctrl+C to exit                                           ");
    io::stdout().flush()
}
