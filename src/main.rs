//! Scanlens demo CLI
//!
//! Drives the scanner through a full lifecycle against the mock camera
//! platform, the way a host application would.

use clap::Parser;
use scanlens::camera::mock::{back_camera, front_camera, MockPlatform};
use scanlens::camera::CameraId;
use scanlens::capture::MockFrameFeed;
use scanlens::config::FileConfig;
use scanlens::geometry::DisplayRotation;
use scanlens::logging::{self, LogConfig};
use scanlens::metrics::{MetricsRegistry, MetricsSnapshot};
use scanlens::platform::FixedDisplay;
use scanlens::processor::{MockDetectorFactory, RawBarcode};
use scanlens::{
    dispatch, Barcode, BarcodeFormat, BarcodeValueType, CameraError, LensFacing, LifecycleEvent,
    ScanObserver, Scanner, ScannerControl,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "scanlens", version, about = "Barcode scanner demo on a mock camera")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to push through the pipeline.
    #[arg(short, long, default_value_t = 40)]
    frames: u32,

    /// Camera facing: front, back or external.
    #[arg(long, value_parser = parse_facing)]
    facing: Option<LensFacing>,

    /// Run until interrupted instead of stopping after `--frames`.
    #[arg(long)]
    continuous: bool,

    /// Verbose library logging.
    #[arg(short, long)]
    debug: bool,

    /// Print the Prometheus metrics text on exit.
    #[arg(long)]
    print_metrics: bool,

    /// Serve metrics on this port; overrides the config file.
    #[cfg(feature = "metrics")]
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn parse_facing(value: &str) -> Result<LensFacing, String> {
    match value.to_ascii_lowercase().as_str() {
        "front" => Ok(LensFacing::Front),
        "back" => Ok(LensFacing::Back),
        "external" => Ok(LensFacing::External),
        other => Err(format!("unknown facing '{other}'")),
    }
}

struct PrintObserver;

impl ScanObserver for PrintObserver {
    fn on_barcode(&mut self, barcode: &Barcode) {
        println!("Barcode: {} ({:?})", barcode, barcode.format);
    }

    fn on_camera_error(&mut self, error: &CameraError) {
        warn!(%error, "Camera failed");
    }
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {e}");
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    let log_config = LogConfig {
        debug: true,
        filter: config
            .logging
            .filter
            .clone()
            .or_else(|| args.debug.then(|| "scanlens=debug".to_string())),
    };
    if let Err(e) = logging::init(&log_config) {
        eprintln!("Failed to initialise logging: {e}");
    }

    info!("Scanlens v{}", scanlens::VERSION);
    info!("This is a demonstration using a mock camera platform");

    let mut options = match config.scanner.to_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Invalid scanner options: {e}");
            std::process::exit(1);
        }
    };
    if let Some(facing) = args.facing {
        options.camera_facing = facing;
    }

    let running = Arc::new(AtomicBool::new(true));
    if args.continuous {
        let flag = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
            warn!(error = %e, "Could not install Ctrl-C handler");
        }
    }

    // Mock platform wired to the owner-thread queue.
    let (sender, queue) = dispatch::channel();
    let platform = MockPlatform::with_responder(sender.clone());
    let feed = MockFrameFeed::with_responder(sender.clone());
    let detectors = MockDetectorFactory::with_responder(sender);
    let display = FixedDisplay::new(DisplayRotation::Rotation0);

    let mut scanner = Scanner::new(
        Box::new(platform.manager(vec![
            (CameraId::new("0"), back_camera()),
            (CameraId::new("1"), front_camera()),
        ])),
        Box::new(feed.factory()),
        Box::new(detectors.clone()),
        Box::new(display.clone()),
    );
    scanner.add_observer(Box::new(PrintObserver));
    scanner.set_options(options);

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {e}");
            std::process::exit(1);
        }
    };

    #[cfg(feature = "metrics")]
    let metrics_state = {
        let port = args.metrics_port.unwrap_or(config.metrics.port);
        (port != 0).then(|| spawn_metrics_server(port)).flatten()
    };

    scanner.handle_lifecycle(LifecycleEvent::Start);
    scanner.handle_lifecycle(LifecycleEvent::Resume);
    scanner.wait_and_pump(&queue, Duration::from_millis(50));
    info!(
        output_size = ?scanner.output_size(),
        min_width = scanner.min_width_for_barcodes(),
        "Scanner started"
    );

    let mut frame: u64 = 0;
    while running.load(Ordering::SeqCst) && (args.continuous || frame < u64::from(args.frames)) {
        frame += 1;

        // Every seventh frame carries a code.
        if frame % 7 == 0 {
            detectors.push_result(Ok(vec![demo_barcode(frame)]));
        }

        // Briefly background the host a quarter of the way in.
        if frame % 40 == 10 {
            scanner.handle_lifecycle(LifecycleEvent::Pause);
        } else if frame % 40 == 13 {
            scanner.handle_lifecycle(LifecycleEvent::Resume);
        }

        if frame % 20 == 5 {
            display.set_rotation(DisplayRotation::ALL[(frame / 20) as usize % 4]);
            scanner.request_camera_focus(1080, 1920, 540.0, 960.0);
        }

        if !feed.push_synthetic() {
            warn!(frame, "No active reader, frame not delivered");
        }
        scanner.wait_and_pump(&queue, Duration::from_millis(20));

        let snapshot = MetricsSnapshot::from_scanner(&scanner);
        registry.update(&snapshot);
        #[cfg(feature = "metrics")]
        if let Some(state) = &metrics_state {
            state.blocking_read().update(&snapshot);
        }
    }

    scanner.handle_lifecycle(LifecycleEvent::Pause);
    scanner.handle_lifecycle(LifecycleEvent::Stop);
    scanner.pump(&queue);

    let stats = scanner.stats();
    info!(
        received = stats.frames_received,
        submitted = stats.frames_submitted,
        dropped_busy = stats.frames_dropped_busy,
        dropped_paused = stats.frames_dropped_paused,
        dropped_failed = stats.frames_dropped_failed,
        published = stats.detections_published,
        "Processed {} frames",
        frame
    );

    if let Some(result) = scanner.latest_result() {
        info!(
            completed_at = %result.completed_at,
            "Last result: {}",
            result.barcodes.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
        );
    }

    if args.print_metrics {
        match registry.encode() {
            Ok(text) => println!("{text}"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
    }

    info!(
        leaked_frames = feed.outstanding(),
        readers_closed = feed.readers_closed(),
        "Done"
    );
}

fn demo_barcode(frame: u64) -> RawBarcode {
    let value = format!("https://example.com/item/{frame}");
    RawBarcode {
        bounding_box: Some(scanlens::geometry::Rect::new(600, 300, 1000, 700)),
        display_value: Some(value.clone()),
        raw_value: Some(value),
        format: BarcodeFormat::QrCode,
        value_type: BarcodeValueType::Url,
        ..Default::default()
    }
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(
    port: u16,
) -> Option<Arc<tokio::sync::RwLock<scanlens::metrics::MetricsState>>> {
    use scanlens::metrics::{MetricsServer, MetricsServerConfig};

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!(error = %e, "Metrics server disabled");
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    std::thread::spawn(move || match tokio::runtime::Runtime::new() {
        Ok(runtime) => {
            if let Err(e) = runtime.block_on(server.run()) {
                warn!(error = %e, "Metrics server stopped");
            }
        }
        Err(e) => warn!(error = %e, "Failed to start metrics runtime"),
    });
    Some(state)
}
