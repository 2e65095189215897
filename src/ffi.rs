//! C FFI layer for vrtrack.
//!
//! A C/C++ host supplies its tracking runtime as a table of callbacks and
//! reads snapshots through opaque handles. The generated C header is written
//! to `include/vrtrack.h` by cbindgen.
//!
//! Callbacks return 0 on success and non-zero on failure. Optional callbacks
//! may be NULL; the matching capability is then absent.

use crate::config::TrackerConfig;
use crate::engine::Tracker;
use crate::error::LastError;
use crate::runtime::{Capabilities, RawAxis, RawInputState, RawPose, TrackingRuntime};
use crate::types::{ControllerRole, Snapshot, MAX_AXIS_COUNT, MAX_TRACKED_DEVICE_COUNT};
use crate::{Result, VrTrackError};
use std::ffi::{c_char, c_int, c_void};
use std::time::Duration;

/// Thread-safe last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque tracker handle for C consumers.
pub struct VtTracker(Tracker);

/// Opaque snapshot handle for C consumers. Immutable once taken.
pub struct VtSnapshot(Snapshot);

/// One pose slot as filled in by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VtRawPose {
    /// False for an empty slot.
    pub present: bool,
    pub has_transform: bool,
    /// 3x4 row-major device-to-world transform.
    pub transform: [[f64; 4]; 3],
    pub device_is_connected: bool,
    pub pose_is_valid: bool,
}

/// Controller input as filled in by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VtRawInputState {
    /// Axes [x, y]; only the first `axis_count` slots are read.
    pub axes: [[f32; 2]; 5],
    pub axis_count: u32,
    pub pressed: u64,
    pub touched: u64,
}

/// Device record in C-compatible layout.
#[repr(C)]
pub struct VtDeviceRecord {
    pub index: u32,
    /// Position [x, y, z] in meters.
    pub position: [f64; 3],
    /// Sign-adjusted forward direction.
    pub forward: [f64; 3],
    /// 1 = HMD, 2 = controller, 3 = tracker, 4 = base station, 0 = other.
    pub device_class: u32,
    /// 1 = left, 2 = right, 0 = unknown.
    pub role: u32,
}

/// Controller state in C-compatible layout.
#[repr(C)]
pub struct VtControllerState {
    pub index: u32,
    pub axes: [[f32; 2]; 5],
    pub axis_count: u32,
    pub pressed: u64,
    pub touched: u64,
}

pub type VtLifecycleFn = Option<unsafe extern "C" fn(user_data: *mut c_void) -> c_int>;
pub type VtPosesFn =
    Option<unsafe extern "C" fn(user_data: *mut c_void, out: *mut VtRawPose, max: u32) -> c_int>;
pub type VtIndexQueryFn =
    Option<unsafe extern "C" fn(user_data: *mut c_void, index: u32, out: *mut u32) -> c_int>;
pub type VtStateFn = Option<
    unsafe extern "C" fn(user_data: *mut c_void, index: u32, out: *mut VtRawInputState) -> c_int,
>;

/// Runtime callbacks supplied by the host.
///
/// `device_class` and at least one of `device_poses`/`wait_poses` are
/// required. Pose callbacks return the number of slots written, or a
/// negative value on failure.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VtRuntimeCallbacks {
    pub user_data: *mut c_void,
    pub initialize: VtLifecycleFn,
    pub device_poses: VtPosesFn,
    pub wait_poses: VtPosesFn,
    pub device_class: VtIndexQueryFn,
    pub controller_role: VtIndexQueryFn,
    pub controller_state_and_pose: VtStateFn,
    pub controller_state: VtStateFn,
    pub shutdown: VtLifecycleFn,
}

/// [`TrackingRuntime`] backed by host callbacks.
struct CallbackRuntime {
    cb: VtRuntimeCallbacks,
}

// SAFETY: the host promises in `vt_tracker_new` that its callbacks and
// `user_data` may be used from the polling thread. Calls are never
// concurrent: the runtime is owned by one thread at a time.
unsafe impl Send for CallbackRuntime {}

impl CallbackRuntime {
    fn poses(&self, f: VtPosesFn, name: &'static str) -> Result<Vec<Option<RawPose>>> {
        let f = f.ok_or(VrTrackError::Unsupported(name))?;
        let empty = VtRawPose {
            present: false,
            has_transform: false,
            transform: [[0.0; 4]; 3],
            device_is_connected: false,
            pose_is_valid: false,
        };
        let mut buf = vec![empty; MAX_TRACKED_DEVICE_COUNT];
        let n = unsafe { f(self.cb.user_data, buf.as_mut_ptr(), buf.len() as u32) };
        if n < 0 {
            return Err(VrTrackError::PoseQuery(format!("{} returned {}", name, n)));
        }
        buf.truncate((n as usize).min(MAX_TRACKED_DEVICE_COUNT));
        Ok(buf
            .into_iter()
            .map(|p| {
                p.present.then(|| RawPose {
                    transform: p.has_transform.then_some(p.transform),
                    device_is_connected: p.device_is_connected,
                    pose_is_valid: p.pose_is_valid,
                })
            })
            .collect())
    }

    fn index_query(&self, f: VtIndexQueryFn, name: &'static str, index: u32) -> Result<u32> {
        let f = f.ok_or(VrTrackError::Unsupported(name))?;
        let mut out = 0u32;
        match unsafe { f(self.cb.user_data, index, &mut out) } {
            0 => Ok(out),
            code => Err(VrTrackError::DeviceQuery {
                index,
                reason: format!("{} returned {}", name, code),
            }),
        }
    }

    fn state(&self, f: VtStateFn, name: &'static str, index: u32) -> Result<RawInputState> {
        let f = f.ok_or(VrTrackError::Unsupported(name))?;
        let mut out = VtRawInputState {
            axes: [[0.0; 2]; 5],
            axis_count: 0,
            pressed: 0,
            touched: 0,
        };
        match unsafe { f(self.cb.user_data, index, &mut out) } {
            0 => {
                let count = (out.axis_count as usize).min(MAX_AXIS_COUNT);
                Ok(RawInputState {
                    axes: out.axes[..count]
                        .iter()
                        .map(|&[x, y]| RawAxis::Pair { x, y })
                        .collect(),
                    pressed: out.pressed,
                    touched: out.touched,
                })
            }
            code => Err(VrTrackError::ControllerState {
                index,
                reason: format!("{} returned {}", name, code),
            }),
        }
    }
}

impl TrackingRuntime for CallbackRuntime {
    fn initialize(&mut self) -> Result<()> {
        if self.cb.device_class.is_none() {
            return Err(VrTrackError::RuntimeUnavailable(
                "device_class callback is required".into(),
            ));
        }
        match self.cb.initialize {
            Some(f) => match unsafe { f(self.cb.user_data) } {
                0 => Ok(()),
                code => Err(VrTrackError::RuntimeUnavailable(format!(
                    "initialize returned {}",
                    code
                ))),
            },
            None => Ok(()),
        }
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::DEVICE_POSES, self.cb.device_poses.is_some());
        caps.set(Capabilities::COMPOSITOR_POSES, self.cb.wait_poses.is_some());
        caps.set(Capabilities::CONTROLLER_ROLE, self.cb.controller_role.is_some());
        caps.set(
            Capabilities::CONTROLLER_STATE_AND_POSE,
            self.cb.controller_state_and_pose.is_some(),
        );
        caps.set(Capabilities::CONTROLLER_STATE, self.cb.controller_state.is_some());
        caps
    }

    fn device_poses(&mut self) -> Result<Vec<Option<RawPose>>> {
        self.poses(self.cb.device_poses, "device_poses")
    }

    fn wait_poses(&mut self) -> Result<Vec<Option<RawPose>>> {
        self.poses(self.cb.wait_poses, "wait_poses")
    }

    fn device_class(&mut self, index: u32) -> Result<u32> {
        self.index_query(self.cb.device_class, "device_class", index)
    }

    fn controller_role(&mut self, index: u32) -> Result<u32> {
        self.index_query(self.cb.controller_role, "controller_role", index)
    }

    fn controller_state_and_pose(&mut self, index: u32) -> Result<RawInputState> {
        self.state(
            self.cb.controller_state_and_pose,
            "controller_state_and_pose",
            index,
        )
    }

    fn controller_state(&mut self, index: u32) -> Result<RawInputState> {
        self.state(self.cb.controller_state, "controller_state", index)
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.cb.shutdown {
            Some(f) => match unsafe { f(self.cb.user_data) } {
                0 => Ok(()),
                code => Err(VrTrackError::RuntimeUnavailable(format!(
                    "shutdown returned {}",
                    code
                ))),
            },
            None => Ok(()),
        }
    }
}

/// Create a tracker over host callbacks and initialize the runtime.
///
/// `poll_interval_ms` of 0 keeps the configured default (30 ms, or
/// `VRTRACK_POLL_INTERVAL_MS`). Returns NULL on error (check vt_last_error()).
///
/// # Safety
/// `callbacks` must point to a valid `VtRuntimeCallbacks`, or be null. The
/// callbacks and `user_data` must stay valid until `vt_tracker_free` and be
/// callable from a background thread.
#[no_mangle]
pub unsafe extern "C" fn vt_tracker_new(
    callbacks: *const VtRuntimeCallbacks,
    poll_interval_ms: u32,
) -> *mut VtTracker {
    if callbacks.is_null() {
        return std::ptr::null_mut();
    }
    let mut config = TrackerConfig::from_env();
    if poll_interval_ms > 0 {
        config.poll_interval = Duration::from_millis(poll_interval_ms as u64);
    }

    let runtime = CallbackRuntime { cb: *callbacks };
    match Tracker::new(runtime, config) {
        Ok(tracker) => Box::into_raw(Box::new(VtTracker(tracker))),
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Start the polling thread. Returns 0 on success, -1 on error.
///
/// # Safety
/// `tracker` must be a valid tracker pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vt_tracker_start(tracker: *mut VtTracker) -> c_int {
    if tracker.is_null() {
        return -1;
    }
    let tracker = &mut *tracker;
    match tracker.0.start() {
        Ok(()) => 0,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Stop the polling thread and release the runtime.
///
/// # Safety
/// `tracker` must be a valid tracker pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vt_tracker_stop(tracker: *mut VtTracker) {
    if !tracker.is_null() {
        (*tracker).0.stop();
    }
}

/// Stop (if needed) and free a tracker.
///
/// # Safety
/// `tracker` must be a pointer returned by `vt_tracker_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn vt_tracker_free(tracker: *mut VtTracker) {
    if !tracker.is_null() {
        drop(Box::from_raw(tracker));
    }
}

/// Take one consistent copy of the latest snapshot.
/// Free it with `vt_snapshot_free`.
///
/// # Safety
/// `tracker` must be a valid tracker pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vt_tracker_snapshot(tracker: *const VtTracker) -> *mut VtSnapshot {
    if tracker.is_null() {
        return std::ptr::null_mut();
    }
    let tracker = &*tracker;
    Box::into_raw(Box::new(VtSnapshot(tracker.0.read())))
}

/// Number of devices in the snapshot.
///
/// # Safety
/// `snap` must be a valid snapshot pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn vt_snapshot_device_count(snap: *const VtSnapshot) -> c_int {
    if snap.is_null() {
        return 0;
    }
    (*snap).0.devices.len() as c_int
}

/// Copy up to `max` device records, ordered by index. Returns the number
/// written, or -1 on invalid arguments.
///
/// # Safety
/// `snap` must be a valid snapshot pointer, or null. `out` must point to an
/// array of at least `max` `VtDeviceRecord` elements.
#[no_mangle]
pub unsafe extern "C" fn vt_snapshot_devices(
    snap: *const VtSnapshot,
    out: *mut VtDeviceRecord,
    max: c_int,
) -> c_int {
    if snap.is_null() || out.is_null() || max < 0 {
        return -1;
    }
    let snap = &(*snap).0;
    let mut devices: Vec<_> = snap.devices.values().collect();
    devices.sort_by_key(|d| d.index);

    let count = devices.len().min(max as usize);
    for (i, dev) in devices.iter().take(count).enumerate() {
        out.add(i).write(VtDeviceRecord {
            index: dev.index,
            position: dev.position,
            forward: dev.forward,
            device_class: dev.class as u32,
            role: dev.role as u32,
        });
    }
    count as c_int
}

/// Copy up to `max` controller states, ordered by index. Returns the number
/// written, or -1 on invalid arguments.
///
/// # Safety
/// `snap` must be a valid snapshot pointer, or null. `out` must point to an
/// array of at least `max` `VtControllerState` elements.
#[no_mangle]
pub unsafe extern "C" fn vt_snapshot_controller_states(
    snap: *const VtSnapshot,
    out: *mut VtControllerState,
    max: c_int,
) -> c_int {
    if snap.is_null() || out.is_null() || max < 0 {
        return -1;
    }
    let snap = &(*snap).0;
    let mut states: Vec<_> = snap.raw_states.iter().collect();
    states.sort_by_key(|(index, _)| **index);

    let count = states.len().min(max as usize);
    for (i, (index, state)) in states.iter().take(count).enumerate() {
        let mut axes = [[0.0f32; 2]; 5];
        for (slot, axis) in state.axes.iter().take(MAX_AXIS_COUNT).enumerate() {
            axes[slot] = [axis.x, axis.y];
        }
        out.add(i).write(VtControllerState {
            index: **index,
            axes,
            axis_count: state.axes.len().min(MAX_AXIS_COUNT) as u32,
            pressed: state.pressed.bits(),
            touched: state.touched.bits(),
        });
    }
    count as c_int
}

/// Write the finger reading for `role` (1 = left, 2 = right) as a
/// null-terminated string, e.g. "Index Finger, Thumb" or "None".
///
/// Returns the full string length excluding the terminator; the copy is
/// truncated if `len` is too small. Returns -1 on invalid arguments.
///
/// # Safety
/// `snap` must be a valid snapshot pointer, or null. `buf` must point to at
/// least `len` writable bytes, or be null (to query the length).
#[no_mangle]
pub unsafe extern "C" fn vt_snapshot_fingers(
    snap: *const VtSnapshot,
    role: c_int,
    buf: *mut c_char,
    len: usize,
) -> c_int {
    if snap.is_null() {
        return -1;
    }
    let role = match role {
        1 => ControllerRole::Left,
        2 => ControllerRole::Right,
        _ => return -1,
    };
    let text = (*snap).0.fingers(role).to_string();
    let bytes = text.as_bytes();

    if !buf.is_null() && len > 0 {
        let n = bytes.len().min(len - 1);
        std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buf, n);
        buf.add(n).write(0);
    }
    bytes.len() as c_int
}

/// Free a snapshot.
///
/// # Safety
/// `snap` must be a pointer returned by `vt_tracker_snapshot`, or null.
#[no_mangle]
pub unsafe extern "C" fn vt_snapshot_free(snap: *mut VtSnapshot) {
    if !snap.is_null() {
        drop(Box::from_raw(snap));
    }
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next vrtrack API call on any thread.
#[no_mangle]
pub extern "C" fn vt_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
