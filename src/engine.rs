use crate::config::{Thresholds, TrackerConfig};
use crate::controller::ControllerStateSampler;
use crate::fingers::FingerHeuristic;
use crate::pose::PoseSampler;
use crate::runtime::{Capabilities, RawPose, RuntimeGuard, TrackingRuntime};
use crate::store::{SnapshotReader, SnapshotStore};
use crate::types::{
    ControllerRole, DeviceClass, DeviceRecord, FingerReading, Snapshot, MAX_TRACKED_DEVICE_COUNT,
};
use crate::{Result, VrTrackError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pose query method, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoseSource {
    Standing,
    Compositor,
}

impl PoseSource {
    fn name(&self) -> &'static str {
        match self {
            Self::Standing => "device_poses",
            Self::Compositor => "wait_poses",
        }
    }

    fn query(&self, runtime: &mut dyn TrackingRuntime) -> Result<Vec<Option<RawPose>>> {
        match self {
            Self::Standing => runtime.device_poses(),
            Self::Compositor => runtime.wait_poses(),
        }
    }
}

/// Producer-side state for one tracker: resolved query plan, samplers and
/// the finger readings carried between cycles.
pub(crate) struct Poller {
    pose_sources: Vec<PoseSource>,
    role_query: bool,
    pose: PoseSampler,
    controller: ControllerStateSampler,
    heuristic: FingerHeuristic,
    left_fingers: FingerReading,
    right_fingers: FingerReading,
    present: HashSet<u32>,
    pose_failing: bool,
}

impl Poller {
    pub(crate) fn new(capabilities: Capabilities, thresholds: &Thresholds) -> Self {
        let mut pose_sources = Vec::with_capacity(2);
        if capabilities.contains(Capabilities::DEVICE_POSES) {
            pose_sources.push(PoseSource::Standing);
        }
        if capabilities.contains(Capabilities::COMPOSITOR_POSES) {
            pose_sources.push(PoseSource::Compositor);
        }

        Self {
            pose_sources,
            role_query: capabilities.contains(Capabilities::CONTROLLER_ROLE),
            pose: PoseSampler::new(thresholds),
            controller: ControllerStateSampler::new(capabilities),
            heuristic: FingerHeuristic::new(*thresholds),
            left_fingers: FingerReading::NoFingers,
            right_fingers: FingerReading::NoFingers,
            present: HashSet::new(),
            pose_failing: false,
        }
    }

    /// Run one sampling cycle and return the complete result.
    ///
    /// Never fails: query errors turn into missing devices or reset fingers.
    pub(crate) fn cycle(&mut self, runtime: &mut dyn TrackingRuntime) -> Snapshot {
        let poses = self.query_poses(runtime);
        let mut snapshot = Snapshot::default();

        for (slot, pose) in poses.iter().enumerate().take(MAX_TRACKED_DEVICE_COUNT) {
            let index = slot as u32;
            let Some(pose) = pose else {
                continue;
            };
            if !pose.is_connected() {
                continue;
            }

            let record = match self.sample_device(runtime, index, pose) {
                Ok(record) => record,
                Err(e) => {
                    log::trace!("Dropping device {} this cycle: {}", index, e);
                    continue;
                }
            };

            if record.class == DeviceClass::Controller {
                self.sample_controller(runtime, &record, &mut snapshot);
            }
            snapshot.devices.insert(index, record);
        }

        snapshot.left_fingers = self.left_fingers.clone();
        snapshot.right_fingers = self.right_fingers.clone();
        self.log_presence_changes(&snapshot);
        snapshot
    }

    fn query_poses(&mut self, runtime: &mut dyn TrackingRuntime) -> Vec<Option<RawPose>> {
        let mut last_err: Option<VrTrackError> = None;
        for source in &self.pose_sources {
            match source.query(runtime) {
                Ok(poses) => {
                    if self.pose_failing {
                        log::info!("Pose query recovered via {}", source.name());
                        self.pose_failing = false;
                    }
                    return poses;
                }
                Err(e) => {
                    log::trace!("{} failed: {}", source.name(), e);
                    last_err = Some(e);
                }
            }
        }

        let err = VrTrackError::PoseQuery(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no pose query available".into()),
        );
        if self.pose_failing {
            log::trace!("{}", err);
        } else {
            log::warn!("{}; reporting no devices until it recovers", err);
            self.pose_failing = true;
        }
        Vec::new()
    }

    fn sample_device(
        &self,
        runtime: &mut dyn TrackingRuntime,
        index: u32,
        pose: &RawPose,
    ) -> Result<DeviceRecord> {
        let class = DeviceClass::from(runtime.device_class(index)?);
        let role = if class == DeviceClass::Controller {
            self.resolve_role(runtime, index)
        } else {
            ControllerRole::Unknown
        };
        self.pose.sample(index, pose, class, role)
    }

    fn resolve_role(&self, runtime: &mut dyn TrackingRuntime, index: u32) -> ControllerRole {
        if !self.role_query {
            return ControllerRole::Unknown;
        }
        match runtime.controller_role(index) {
            Ok(raw) => ControllerRole::from(raw),
            Err(e) => {
                log::trace!("Role query failed for device {}: {}", index, e);
                ControllerRole::Unknown
            }
        }
    }

    fn sample_controller(
        &mut self,
        runtime: &mut dyn TrackingRuntime,
        record: &DeviceRecord,
        snapshot: &mut Snapshot,
    ) {
        let reading = match self.controller.sample(runtime, record.index) {
            Ok(state) => {
                let reading = self.heuristic.classify(Some(&state));
                snapshot.raw_states.insert(record.index, state);
                reading
            }
            Err(e) => {
                log::trace!("{}", e);
                FingerReading::NoFingers
            }
        };

        // Anything not bound to the left hand drives the right hand.
        match record.role {
            ControllerRole::Left => self.left_fingers = reading,
            ControllerRole::Right | ControllerRole::Unknown => self.right_fingers = reading,
        }
    }

    fn log_presence_changes(&mut self, snapshot: &Snapshot) {
        let now: HashSet<u32> = snapshot.devices.keys().copied().collect();
        for index in now.difference(&self.present) {
            if let Some(rec) = snapshot.devices.get(index) {
                log::debug!(
                    "Device {} connected: {} {}",
                    index,
                    rec.class.as_str(),
                    rec.role.as_str()
                );
            }
        }
        for index in self.present.difference(&now) {
            log::debug!("Device {} gone", index);
        }
        self.present = now;
    }
}

/// The polling thread's completion report and handle.
struct Worker {
    thread: std::thread::JoinHandle<()>,
    done: Receiver<()>,
}

/// Background tracking engine.
///
/// Owns the runtime and a polling thread that writes a fresh [`Snapshot`]
/// every cycle. Readers call [`read`](Self::read) or hold a
/// [`SnapshotReader`] on their own cadence.
pub struct Tracker {
    runtime: Option<RuntimeGuard>,
    capabilities: Capabilities,
    config: TrackerConfig,
    store: Arc<SnapshotStore>,
    stop_flag: Arc<AtomicBool>,
    cycles: Arc<AtomicU64>,
    worker: Option<Worker>,
}

impl Tracker {
    /// Initialize the runtime. Fails with [`VrTrackError::RuntimeUnavailable`]
    /// before any background work starts.
    pub fn new<R>(runtime: R, config: TrackerConfig) -> Result<Tracker>
    where
        R: TrackingRuntime + 'static,
    {
        let guard = RuntimeGuard::acquire(Box::new(runtime))?;
        Ok(Tracker {
            capabilities: guard.capabilities(),
            runtime: Some(guard),
            config,
            store: Arc::new(SnapshotStore::new()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            cycles: Arc::new(AtomicU64::new(0)),
            worker: None,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Spawn the polling thread. Does nothing if it is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let runtime = self.runtime.take().ok_or(VrTrackError::RuntimeReleased)?;
        let poller = Poller::new(self.capabilities, &self.config.thresholds);

        self.stop_flag.store(false, Ordering::Relaxed);
        let (done_tx, done) = crossbeam_channel::bounded(1);
        let loop_ctx = PollLoop {
            runtime,
            poller,
            store: self.store.clone(),
            stop_flag: self.stop_flag.clone(),
            cycles: self.cycles.clone(),
            interval: self.config.poll_interval,
            done: done_tx,
        };

        let thread = std::thread::Builder::new()
            .name("vrtrack-poll".into())
            .spawn(move || loop_ctx.run())
            .map_err(|e| VrTrackError::ThreadSpawn(e.to_string()))?;

        self.worker = Some(Worker { thread, done });
        Ok(())
    }

    /// Signal the polling thread to stop and wait up to the join timeout.
    ///
    /// The runtime is shut down when the thread exits (or here, if it was
    /// never started). A tracker cannot be restarted afterwards.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);

        if let Some(worker) = self.worker.take() {
            match worker.done.recv_timeout(self.config.join_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.thread.join().is_err() {
                        log::error!("Polling thread panicked");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Polling thread did not stop within {}ms, detaching",
                        self.config.join_timeout.as_millis()
                    );
                }
            }
        }

        drop(self.runtime.take());
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some() && !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Number of completed poll cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Copy of the latest complete snapshot.
    pub fn read(&self) -> Snapshot {
        self.store.read()
    }

    /// Handle for reading snapshots from other threads.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader::new(self.store.clone())
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the polling thread owns.
struct PollLoop {
    runtime: RuntimeGuard,
    poller: Poller,
    store: Arc<SnapshotStore>,
    stop_flag: Arc<AtomicBool>,
    cycles: Arc<AtomicU64>,
    interval: Duration,
    done: Sender<()>,
}

impl PollLoop {
    fn run(self) {
        let PollLoop {
            mut runtime,
            mut poller,
            store,
            stop_flag,
            cycles,
            interval,
            done,
        } = self;

        log::info!("Poll loop started ({}ms interval)", interval.as_millis());

        loop {
            if stop_flag.load(Ordering::Relaxed) {
                log::info!("Poll loop stopping (stop flag set)");
                break;
            }

            let started = Instant::now();
            let snapshot = poller.cycle(&mut *runtime);
            store.write(snapshot);
            cycles.fetch_add(1, Ordering::Relaxed);

            match interval.checked_sub(started.elapsed()) {
                Some(remaining) => std::thread::sleep(remaining),
                None => log::trace!("Poll cycle overran {}ms", interval.as_millis()),
            }
        }

        drop(runtime);
        let _ = done.send(());
    }
}
