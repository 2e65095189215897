//! Boundary to the external tracking runtime.
//!
//! The runtime reports loosely shaped records ([`RawPose`], [`RawInputState`],
//! raw enum values). They are converted into the crate's typed model exactly
//! once, by the samplers; nothing past this module probes for optional fields.

use crate::geometry::Transform;
use crate::{Result, VrTrackError};
use std::ops::{Deref, DerefMut};

/// One slot of the pose array as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPose {
    /// Device-to-world transform, `None` when the runtime reported none.
    pub transform: Option<Transform>,
    pub device_is_connected: bool,
    pub pose_is_valid: bool,
}

impl RawPose {
    /// A device counts as connected if either flag is set.
    pub fn is_connected(&self) -> bool {
        self.device_is_connected || self.pose_is_valid
    }
}

/// One analog axis slot as reported by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAxis {
    Pair { x: f32, y: f32 },
    /// Axis delivered as a plain component list instead of an (x, y) pair.
    Components(Vec<f32>),
    Missing,
}

/// Controller input record as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawInputState {
    pub axes: Vec<RawAxis>,
    pub pressed: u64,
    pub touched: u64,
}

bitflags::bitflags! {
    /// Query methods a runtime implements. Probed once at startup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(C)]
    pub struct Capabilities: u32 {
        const DEVICE_POSES              = 1 << 0;
        const COMPOSITOR_POSES          = 1 << 1;
        const CONTROLLER_ROLE           = 1 << 2;
        const CONTROLLER_STATE_AND_POSE = 1 << 3;
        const CONTROLLER_STATE          = 1 << 4;
    }
}

impl Capabilities {
    pub fn has_pose_query(&self) -> bool {
        self.intersects(Capabilities::DEVICE_POSES | Capabilities::COMPOSITOR_POSES)
    }
}

/// The tracking runtime the engine samples from.
///
/// Only the methods advertised by [`capabilities`](Self::capabilities) are
/// called; the optional ones default to [`VrTrackError::Unsupported`].
pub trait TrackingRuntime: Send {
    /// Connect to the runtime. Called once, before any query.
    fn initialize(&mut self) -> Result<()>;

    fn capabilities(&self) -> Capabilities;

    /// Primary pose query (standing universe, no prediction).
    fn device_poses(&mut self) -> Result<Vec<Option<RawPose>>>;

    /// Secondary pose query through the compositor.
    fn wait_poses(&mut self) -> Result<Vec<Option<RawPose>>> {
        Err(VrTrackError::Unsupported("compositor wait-poses"))
    }

    /// Raw device class value for a slot.
    fn device_class(&mut self, index: u32) -> Result<u32>;

    /// Raw controller role value for a slot.
    fn controller_role(&mut self, _index: u32) -> Result<u32> {
        Err(VrTrackError::Unsupported("controller role"))
    }

    fn controller_state_and_pose(&mut self, _index: u32) -> Result<RawInputState> {
        Err(VrTrackError::Unsupported("controller state and pose"))
    }

    fn controller_state(&mut self, _index: u32) -> Result<RawInputState> {
        Err(VrTrackError::Unsupported("controller state"))
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// An initialized runtime, shut down when dropped.
pub struct RuntimeGuard {
    runtime: Box<dyn TrackingRuntime>,
    capabilities: Capabilities,
}

impl RuntimeGuard {
    /// Initialize the runtime and probe its capabilities.
    ///
    /// Fails with [`VrTrackError::RuntimeUnavailable`] if initialization fails
    /// or the runtime offers no pose query at all.
    pub fn acquire(mut runtime: Box<dyn TrackingRuntime>) -> Result<RuntimeGuard> {
        runtime.initialize().map_err(|e| match e {
            VrTrackError::RuntimeUnavailable(msg) => VrTrackError::RuntimeUnavailable(msg),
            other => VrTrackError::RuntimeUnavailable(other.to_string()),
        })?;

        let capabilities = runtime.capabilities();
        log::info!("Tracking runtime initialized: capabilities={:?}", capabilities);

        let guard = RuntimeGuard {
            runtime,
            capabilities,
        };
        if !capabilities.has_pose_query() {
            // guard drops here and releases the runtime
            return Err(VrTrackError::RuntimeUnavailable(
                "runtime offers no pose query".into(),
            ));
        }
        Ok(guard)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl Deref for RuntimeGuard {
    type Target = dyn TrackingRuntime;

    fn deref(&self) -> &Self::Target {
        self.runtime.as_ref()
    }
}

impl DerefMut for RuntimeGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.runtime.as_mut()
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        match self.runtime.shutdown() {
            Ok(()) => log::info!("Tracking runtime shut down"),
            Err(e) => log::warn!("Tracking runtime shutdown failed: {}", e),
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub fn identity_at(x: f64, y: f64, z: f64) -> Transform {
        [
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, y],
            [0.0, 0.0, 1.0, z],
        ]
    }

    pub fn connected_at(x: f64, y: f64, z: f64) -> Option<RawPose> {
        Some(RawPose {
            transform: Some(identity_at(x, y, z)),
            device_is_connected: true,
            pose_is_valid: true,
        })
    }

    pub fn disconnected() -> Option<RawPose> {
        Some(RawPose {
            transform: Some(identity_at(0.0, 0.0, 0.0)),
            device_is_connected: false,
            pose_is_valid: false,
        })
    }

    pub fn input(axes: &[f32], pressed: u64, touched: u64) -> RawInputState {
        RawInputState {
            axes: axes.iter().map(|&x| RawAxis::Pair { x, y: 0.0 }).collect(),
            pressed,
            touched,
        }
    }

    /// Runtime driven by scripted frames. `None` entries make a query fail.
    pub struct ScriptedRuntime {
        pub capabilities: Capabilities,
        pub init_error: Option<String>,
        /// Pose arrays for the primary query, one per call; the last repeats.
        pub device_poses: VecDeque<Option<Vec<Option<RawPose>>>>,
        pub wait_poses: VecDeque<Option<Vec<Option<RawPose>>>>,
        pub classes: HashMap<u32, u32>,
        pub roles: HashMap<u32, u32>,
        pub states: HashMap<u32, RawInputState>,
        pub fallback_states: HashMap<u32, RawInputState>,
        pub calls: Vec<&'static str>,
        pub shutdown_count: Arc<AtomicUsize>,
        pub shutdown_fails: bool,
        /// Blocks every primary pose query for this long.
        pub pose_delay: Option<std::time::Duration>,
    }

    impl Default for ScriptedRuntime {
        fn default() -> Self {
            Self {
                capabilities: Capabilities::all(),
                init_error: None,
                device_poses: VecDeque::new(),
                wait_poses: VecDeque::new(),
                classes: HashMap::new(),
                roles: HashMap::new(),
                states: HashMap::new(),
                fallback_states: HashMap::new(),
                calls: Vec::new(),
                shutdown_count: Arc::new(AtomicUsize::new(0)),
                shutdown_fails: false,
                pose_delay: None,
            }
        }
    }

    impl ScriptedRuntime {
        pub fn push_frame(&mut self, frame: Vec<Option<RawPose>>) {
            self.device_poses.push_back(Some(frame));
        }

        fn next(
            queue: &mut VecDeque<Option<Vec<Option<RawPose>>>>,
        ) -> Option<Vec<Option<RawPose>>> {
            if queue.len() > 1 {
                queue.pop_front().flatten()
            } else {
                queue.front().cloned().flatten()
            }
        }
    }

    impl TrackingRuntime for ScriptedRuntime {
        fn initialize(&mut self) -> Result<()> {
            match &self.init_error {
                Some(msg) => Err(VrTrackError::PoseQuery(msg.clone())),
                None => Ok(()),
            }
        }

        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }

        fn device_poses(&mut self) -> Result<Vec<Option<RawPose>>> {
            self.calls.push("device_poses");
            if let Some(delay) = self.pose_delay {
                std::thread::sleep(delay);
            }
            Self::next(&mut self.device_poses)
                .ok_or_else(|| VrTrackError::PoseQuery("scripted failure".into()))
        }

        fn wait_poses(&mut self) -> Result<Vec<Option<RawPose>>> {
            self.calls.push("wait_poses");
            Self::next(&mut self.wait_poses)
                .ok_or_else(|| VrTrackError::PoseQuery("scripted compositor failure".into()))
        }

        fn device_class(&mut self, index: u32) -> Result<u32> {
            self.classes.get(&index).copied().ok_or(VrTrackError::DeviceQuery {
                index,
                reason: "no class".into(),
            })
        }

        fn controller_role(&mut self, index: u32) -> Result<u32> {
            self.calls.push("controller_role");
            self.roles.get(&index).copied().ok_or(VrTrackError::DeviceQuery {
                index,
                reason: "no role".into(),
            })
        }

        fn controller_state_and_pose(&mut self, index: u32) -> Result<RawInputState> {
            self.calls.push("controller_state_and_pose");
            self.states
                .get(&index)
                .cloned()
                .ok_or(VrTrackError::ControllerState {
                    index,
                    reason: "scripted failure".into(),
                })
        }

        fn controller_state(&mut self, index: u32) -> Result<RawInputState> {
            self.calls.push("controller_state");
            self.fallback_states
                .get(&index)
                .cloned()
                .ok_or(VrTrackError::ControllerState {
                    index,
                    reason: "scripted fallback failure".into(),
                })
        }

        fn shutdown(&mut self) -> Result<()> {
            self.shutdown_count.fetch_add(1, Ordering::SeqCst);
            if self.shutdown_fails {
                Err(VrTrackError::RuntimeUnavailable("already gone".into()))
            } else {
                Ok(())
            }
        }
    }
}
