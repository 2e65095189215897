//! Stream tracking snapshots as JSON lines.
//!
//! One object per snapshot:
//!
//! {"devices":[{"i":0,"class":"hmd","role":"??","x":0.012,"y":1.701,"z":0.198,"fx":-0.10,"fy":-0.00,"fz":-0.99}],"left":"Thumb","right":"None"}
//!
//! Usage: cargo run --release --example stream_json

use std::io::{self, Write};

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

    eprintln!("Streaming JSON (Ctrl+C to stop)...");

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut last_cycle = 0;

    loop {
        std::thread::sleep(config.poll_interval);
        let cycle = tracker.cycles();
        if cycle == last_cycle {
            continue;
        }
        last_cycle = cycle;

        let snap = tracker.read();
        let mut devices: Vec<_> = snap.devices.values().collect();
        devices.sort_by_key(|d| d.index);

        let entries: Vec<String> = devices
            .iter()
            .map(|d| {
                format!(
                    "{{\"i\":{},\"class\":\"{}\",\"role\":\"{}\",\"x\":{:.3},\"y\":{:.3},\"z\":{:.3},\"fx\":{:.2},\"fy\":{:.2},\"fz\":{:.2}}}",
                    d.index,
                    d.class.as_str(),
                    d.role.as_str(),
                    d.position[0],
                    d.position[1],
                    d.position[2],
                    d.forward[0],
                    d.forward[1],
                    d.forward[2],
                )
            })
            .collect();

        let written = writeln!(
            out,
            "{{\"devices\":[{}],\"left\":\"{}\",\"right\":\"{}\"}}",
            entries.join(","),
            snap.left_fingers,
            snap.right_fingers,
        )
        .and_then(|_| out.flush());

        if let Err(e) = written {
            eprintln!("Output closed: {}", e);
            break;
        }
    }

    tracker.stop();
}
