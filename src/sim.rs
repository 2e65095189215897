//! In-process runtime that animates a small room-scale setup.
//!
//! Slots: 0 HMD, 1 left controller, 2 right controller, 3 waist tracker,
//! 4 and 5 base stations. The tracker drops out for 50 of every 200 frames
//! so consumers see devices come and go. Motion is a pure function of the
//! frame counter, which advances once per pose query.

use crate::geometry::Transform;
use crate::runtime::{Capabilities, RawAxis, RawInputState, RawPose, TrackingRuntime};
use crate::types::{ButtonMask, MAX_TRACKED_DEVICE_COUNT};
use crate::{Result, VrTrackError};

/// Seconds of simulated time per frame.
const FRAME_STEP: f64 = 0.03;

const SLOT_CLASSES: [u32; 6] = [1, 2, 2, 3, 4, 4];

pub struct SimulatedRuntime {
    frame: u64,
    initialized: bool,
    slots: usize,
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self {
            frame: 0,
            initialized: false,
            slots: MAX_TRACKED_DEVICE_COUNT,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn time(&self) -> f64 {
        self.frame as f64 * FRAME_STEP
    }

    fn tracker_visible(&self) -> bool {
        self.frame % 200 < 150
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(VrTrackError::RuntimeUnavailable(
                "simulated runtime not initialized".into(),
            ))
        }
    }

    fn poses(&mut self) -> Result<Vec<Option<RawPose>>> {
        self.ensure_initialized()?;
        self.frame += 1;
        let t = self.time();

        let mut out = vec![None; self.slots];
        out[0] = Some(connected(yaw_transform(
            (t * 0.4).sin() * 0.8,
            [0.2 * (t * 0.3).sin(), 1.7 + 0.03 * (t * 1.3).sin(), 0.2 * (t * 0.3).cos()],
        )));
        for (slot, side) in [(1usize, -1.0), (2usize, 1.0)] {
            let phase = t * 0.9 + if side < 0.0 { 0.0 } else { std::f64::consts::PI };
            out[slot] = Some(connected(yaw_transform(
                phase,
                [side * 0.3 + 0.15 * phase.cos(), 1.1, 0.3 + 0.15 * phase.sin()],
            )));
        }
        out[3] = Some(RawPose {
            transform: Some(yaw_transform(0.0, [0.0, 0.95, 0.0])),
            device_is_connected: self.tracker_visible(),
            pose_is_valid: self.tracker_visible(),
        });
        out[4] = Some(connected(yaw_transform(
            std::f64::consts::FRAC_PI_4 * 5.0,
            [2.0, 2.2, 2.0],
        )));
        out[5] = Some(connected(yaw_transform(
            std::f64::consts::FRAC_PI_4,
            [-2.0, 2.2, -2.0],
        )));
        Ok(out)
    }

    fn input(&self, index: u32) -> Result<RawInputState> {
        self.ensure_initialized()?;
        if index != 1 && index != 2 {
            return Err(VrTrackError::ControllerState {
                index,
                reason: "not a controller".into(),
            });
        }
        let t = self.time() + if index == 2 { 1.5 } else { 0.0 };
        let wave = |speed: f64| ((t * speed).sin() * 0.5 + 0.5) as f32;

        let thumb = (t * 0.7).sin() as f32 * 0.6;
        let trigger = wave(1.1);
        let grip = wave(0.5);
        let axes = vec![
            RawAxis::Pair { x: thumb, y: 0.0 },
            RawAxis::Pair { x: trigger, y: 0.0 },
            RawAxis::Pair { x: grip, y: 0.0 },
            RawAxis::Pair { x: grip * 0.8, y: 0.0 },
            RawAxis::Pair { x: grip * 0.6, y: 0.0 },
        ];

        let mut pressed = ButtonMask::empty();
        if trigger > 0.9 {
            pressed |= ButtonMask::TRIGGER;
        }
        if grip > 0.8 {
            pressed |= ButtonMask::GRIP;
        }
        let mut touched = ButtonMask::empty();
        if thumb.abs() > 0.4 {
            touched |= ButtonMask::TOUCHPAD;
        }

        Ok(RawInputState {
            axes,
            pressed: pressed.bits(),
            touched: touched.bits(),
        })
    }
}

fn connected(transform: Transform) -> RawPose {
    RawPose {
        transform: Some(transform),
        device_is_connected: true,
        pose_is_valid: true,
    }
}

/// Rotation about +Y by `yaw` radians, translated to `at`.
fn yaw_transform(yaw: f64, at: [f64; 3]) -> Transform {
    let (s, c) = yaw.sin_cos();
    [
        [c, 0.0, s, at[0]],
        [0.0, 1.0, 0.0, at[1]],
        [-s, 0.0, c, at[2]],
    ]
}

impl TrackingRuntime for SimulatedRuntime {
    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        log::info!("Simulated runtime ready ({} device slots)", SLOT_CLASSES.len());
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn device_poses(&mut self) -> Result<Vec<Option<RawPose>>> {
        self.poses()
    }

    fn wait_poses(&mut self) -> Result<Vec<Option<RawPose>>> {
        self.poses()
    }

    fn device_class(&mut self, index: u32) -> Result<u32> {
        self.ensure_initialized()?;
        Ok(SLOT_CLASSES.get(index as usize).copied().unwrap_or(0))
    }

    fn controller_role(&mut self, index: u32) -> Result<u32> {
        self.ensure_initialized()?;
        match index {
            1 => Ok(1),
            2 => Ok(2),
            _ => Ok(0),
        }
    }

    fn controller_state_and_pose(&mut self, index: u32) -> Result<RawInputState> {
        self.input(index)
    }

    fn controller_state(&mut self, index: u32) -> Result<RawInputState> {
        self.input(index)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.initialized = false;
        Ok(())
    }
}
