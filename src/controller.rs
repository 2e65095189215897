use crate::runtime::{Capabilities, RawAxis, RawInputState, TrackingRuntime};
use crate::types::{ButtonMask, ControllerAxis, RawControllerState, MAX_AXIS_COUNT};
use crate::{Result, VrTrackError};

/// Controller input query method, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateSource {
    StateAndPose,
    State,
}

impl StateSource {
    fn name(&self) -> &'static str {
        match self {
            Self::StateAndPose => "controller_state_and_pose",
            Self::State => "controller_state",
        }
    }

    fn query(&self, runtime: &mut dyn TrackingRuntime, index: u32) -> Result<RawInputState> {
        match self {
            Self::StateAndPose => runtime.controller_state_and_pose(index),
            Self::State => runtime.controller_state(index),
        }
    }
}

/// Retrieves [`RawControllerState`] with a primary/fallback strategy.
///
/// Which methods exist is decided once from the runtime's capabilities.
#[derive(Debug, Clone)]
pub struct ControllerStateSampler {
    sources: Vec<StateSource>,
}

impl ControllerStateSampler {
    pub fn new(capabilities: Capabilities) -> Self {
        let mut sources = Vec::with_capacity(2);
        if capabilities.contains(Capabilities::CONTROLLER_STATE_AND_POSE) {
            sources.push(StateSource::StateAndPose);
        }
        if capabilities.contains(Capabilities::CONTROLLER_STATE) {
            sources.push(StateSource::State);
        }
        if sources.is_empty() {
            log::warn!("Runtime offers no controller state query; finger detection disabled");
        }
        Self { sources }
    }

    /// Query the controller at `index`, falling back to the secondary method.
    pub fn sample(
        &self,
        runtime: &mut dyn TrackingRuntime,
        index: u32,
    ) -> Result<RawControllerState> {
        let mut last_err: Option<VrTrackError> = None;
        for source in &self.sources {
            match source.query(runtime, index) {
                Ok(raw) => return Ok(normalize(raw)),
                Err(e) => {
                    log::trace!("{} failed for device {}: {}", source.name(), index, e);
                    last_err = Some(e);
                }
            }
        }
        Err(VrTrackError::ControllerState {
            index,
            reason: last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no controller state query available".into()),
        })
    }
}

/// Coerce one raw axis slot. Anything unusable reads as 0.0.
pub fn coerce_axis(axis: &RawAxis) -> ControllerAxis {
    let (x, y) = match axis {
        RawAxis::Pair { x, y } => (*x, *y),
        RawAxis::Components(c) => (
            c.first().copied().unwrap_or(0.0),
            c.get(1).copied().unwrap_or(0.0),
        ),
        RawAxis::Missing => (0.0, 0.0),
    };
    ControllerAxis {
        x: finite_or_zero(x),
        y: finite_or_zero(y),
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Convert a raw input record into the typed state, keeping at most
/// [`MAX_AXIS_COUNT`] axes.
pub fn normalize(raw: RawInputState) -> RawControllerState {
    RawControllerState {
        axes: raw.axes.iter().take(MAX_AXIS_COUNT).map(coerce_axis).collect(),
        pressed: ButtonMask::from_bits_retain(raw.pressed),
        touched: ButtonMask::from_bits_retain(raw.touched),
    }
}
