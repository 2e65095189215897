//! # vrtrack - background VR tracking engine
//!
//! Samples a tracking runtime on a dedicated thread and publishes a
//! consistent [`Snapshot`] per cycle. Provides:
//! - Device poses normalized into [`DeviceRecord`]s (position, class, role, forward)
//! - Raw controller axes and button masks with primary/fallback queries
//! - A fixed-threshold finger contact heuristic per hand
//! - C FFI so a host in another language can plug in its runtime
//!
//! ## Quick Start
//! ```no_run
//! use vrtrack::{SimulatedRuntime, Tracker, TrackerConfig};
//! use std::time::Duration;
//!
//! let mut tracker = Tracker::new(SimulatedRuntime::new(), TrackerConfig::default()).unwrap();
//! tracker.start().unwrap();
//! for _ in 0..10 {
//!     std::thread::sleep(Duration::from_millis(30));
//!     let snap = tracker.read();
//!     println!("{} devices, left: {}", snap.devices.len(), snap.left_fingers);
//! }
//! tracker.stop();
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod geometry;
pub mod runtime;
pub mod pose;
pub mod controller;
pub mod fingers;
pub mod store;
pub mod engine;
pub mod sim;
pub mod ffi;

pub use error::VrTrackError;
pub use types::*;
pub use config::{Thresholds, TrackerConfig};
pub use runtime::{Capabilities, RawAxis, RawInputState, RawPose, TrackingRuntime};
pub use fingers::FingerHeuristic;
pub use store::{SnapshotReader, SnapshotStore};
pub use engine::Tracker;
pub use sim::SimulatedRuntime;

/// Result type alias for vrtrack operations.
pub type Result<T> = std::result::Result<T, VrTrackError>;
