//! Print tracking snapshots from the simulated runtime as a text overlay.
//!
//! Acts as the rendering layer: projects positions to a 1000x720 canvas at
//! 100 px per meter, scales controller arrows to 0.30 m and formats the HMD
//! height.
//!
//! Usage: cargo run --example stream
//! Press Ctrl+C to stop.

use std::time::{Duration, Instant};
use vrtrack::{DeviceClass, DeviceRecord, Snapshot};

const METERS_TO_PIXELS: f64 = 100.0;
const ARROW_LENGTH_M: f64 = 0.30;
const CANVAS: (f64, f64) = (1000.0, 720.0);

fn format_height(y_m: f64) -> String {
    let cm = y_m * 100.0;
    let total_inches = (y_m * 39.3701).round() as i64;
    format!(
        "{:.1} cm / {} ft {} in",
        cm,
        total_inches.div_euclid(12),
        total_inches.rem_euclid(12)
    )
}

fn project(dev: &DeviceRecord) -> (f64, f64) {
    (
        CANVAS.0 / 2.0 + dev.position[0] * METERS_TO_PIXELS,
        CANVAS.1 / 2.0 - dev.position[2] * METERS_TO_PIXELS,
    )
}

fn arrow_delta(forward: [f64; 3]) -> (f64, f64) {
    (
        forward[0] * ARROW_LENGTH_M * METERS_TO_PIXELS,
        -forward[2] * ARROW_LENGTH_M * METERS_TO_PIXELS,
    )
}

fn label(dev: &DeviceRecord) -> String {
    match dev.class {
        DeviceClass::Hmd => format!("HMD | {}", format_height(dev.position[1])),
        DeviceClass::Controller => format!("Controller ({})", dev.role.as_str()),
        DeviceClass::GenericTracker => "Tracker".to_string(),
        DeviceClass::TrackingReference => "Base Station".to_string(),
        DeviceClass::Other => "Device".to_string(),
    }
}

fn render(snap: &Snapshot) {
    let mut devices: Vec<_> = snap.devices.values().collect();
    devices.sort_by_key(|d| d.index);

    for dev in devices {
        let (sx, sy) = project(dev);
        let mut line = format!("[{:>2}] {:<28} at ({:>6.1}, {:>6.1})", dev.index, label(dev), sx, sy);
        if dev.class == DeviceClass::Controller {
            let (dx, dy) = arrow_delta(dev.forward);
            line.push_str(&format!("  arrow ({:+.1}, {:+.1})", dx, dy));
        }
        println!("{}", line);
    }
    println!("Left Controller:  {}", snap.left_fingers);
    println!("Right Controller: {}", snap.right_fingers);

    let mut states: Vec<_> = snap.raw_states.iter().collect();
    states.sort_by_key(|(index, _)| **index);
    for (index, state) in states {
        let axes: Vec<String> = state.axes.iter().map(|a| format!("{:.2}", a.x)).collect();
        println!(
            "  device {}: axes[{}] pressed={} touched={}",
            index,
            axes.join(", "),
            state.pressed.bits(),
            state.touched.bits()
        );
    }
    println!();
}

fn main() {
    env_logger::init();

    let config = vrtrack::TrackerConfig::from_env();
    let mut tracker = match vrtrack::Tracker::new(vrtrack::SimulatedRuntime::new(), config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to start tracking runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = tracker.start() {
        eprintln!("Failed to start polling: {}", e);
        std::process::exit(1);
    }

    println!("Streaming snapshots (Ctrl+C to stop)...");

    let start = Instant::now();
    let mut frames: u64 = 0;
    let mut last_report = Instant::now();

    loop {
        std::thread::sleep(config.poll_interval);
        let snap = tracker.read();
        frames += 1;

        // Print every ~30th frame to avoid flooding the terminal
        if frames % 30 == 1 {
            render(&snap);
        }

        let now = Instant::now();
        if now.duration_since(last_report) >= Duration::from_secs(3) {
            let elapsed = start.elapsed().as_secs_f64();
            println!(
                "--- {} reads / {} cycles in {:.1}s ---",
                frames,
                tracker.cycles(),
                elapsed
            );
            last_report = now;
        }
    }
}
