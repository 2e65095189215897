use std::collections::HashMap;
use std::fmt;

/// Number of device slots the runtime reports per pose query.
pub const MAX_TRACKED_DEVICE_COUNT: usize = 64;

/// Number of analog axis slots retained per controller.
pub const MAX_AXIS_COUNT: usize = 5;

/// Kind of tracked device, decoded from the runtime's raw class value.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Hmd = 1,
    Controller = 2,
    GenericTracker = 3,
    TrackingReference = 4,
    Other = 0,
}

impl From<u32> for DeviceClass {
    fn from(value: u32) -> Self {
        match value {
            1 => DeviceClass::Hmd,
            2 => DeviceClass::Controller,
            3 => DeviceClass::GenericTracker,
            4 => DeviceClass::TrackingReference,
            _ => DeviceClass::Other,
        }
    }
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hmd => "hmd",
            Self::Controller => "controller",
            Self::GenericTracker => "tracker",
            Self::TrackingReference => "base-station",
            Self::Other => "other",
        }
    }
}

/// Hand a controller is bound to. Only meaningful for [`DeviceClass::Controller`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControllerRole {
    Left = 1,
    Right = 2,
    #[default]
    Unknown = 0,
}

impl From<u32> for ControllerRole {
    fn from(value: u32) -> Self {
        match value {
            1 => ControllerRole::Left,
            2 => ControllerRole::Right,
            _ => ControllerRole::Unknown,
        }
    }
}

impl ControllerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Unknown => "??",
        }
    }
}

bitflags::bitflags! {
    /// Controller button bitmask in the runtime's layout (`1 << button_id`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(C)]
    pub struct ButtonMask: u64 {
        const SYSTEM           = 1 << 0;
        const APPLICATION_MENU = 1 << 1;
        const GRIP             = 1 << 2;
        const DPAD_LEFT        = 1 << 3;
        const DPAD_UP          = 1 << 4;
        const DPAD_RIGHT       = 1 << 5;
        const DPAD_DOWN        = 1 << 6;
        const A                = 1 << 7;
        /// Touchpad or thumbstick (axis 0).
        const TOUCHPAD         = 1 << 32;
        /// Analog trigger (axis 1).
        const TRIGGER          = 1 << 33;
        const AXIS2            = 1 << 34;
        const AXIS3            = 1 << 35;
        const AXIS4            = 1 << 36;
    }
}

impl Default for ButtonMask {
    fn default() -> Self {
        ButtonMask::empty()
    }
}

/// One analog axis reading. `x` is the primary value.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerAxis {
    pub x: f32,
    pub y: f32,
}

/// Analog axes and button masks sampled from one connected controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawControllerState {
    /// At most [`MAX_AXIS_COUNT`] slots, in runtime order.
    pub axes: Vec<ControllerAxis>,
    pub pressed: ButtonMask,
    pub touched: ButtonMask,
}

impl RawControllerState {
    /// Primary value of axis `slot`, or 0.0 when the slot is absent.
    pub fn axis(&self, slot: usize) -> f32 {
        self.axes.get(slot).map_or(0.0, |a| a.x)
    }
}

/// Normalized record for one connected device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub index: u32,
    /// World position in meters [x, y, z].
    pub position: [f64; 3],
    pub class: DeviceClass,
    pub role: ControllerRole,
    /// Unit-scale forward direction, already sign-adjusted.
    pub forward: [f64; 3],
}

/// A finger the heuristic can report as touching a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Index,
    Thumb,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Index => "Index Finger",
            Self::Thumb => "Thumb",
            Self::Middle => "Middle Finger",
            Self::Ring => "Ring Finger",
            Self::Pinky => "Pinky Finger",
        }
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of the finger heuristic for one hand.
///
/// An empty detection is always `NoFingers`, never `Touching(vec![])`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FingerReading {
    #[default]
    NoFingers,
    Touching(Vec<Finger>),
}

impl FingerReading {
    /// Build a reading, keeping the first occurrence of each finger.
    pub fn from_fingers<I: IntoIterator<Item = Finger>>(fingers: I) -> Self {
        let mut out: Vec<Finger> = Vec::new();
        for finger in fingers {
            if !out.contains(&finger) {
                out.push(finger);
            }
        }
        if out.is_empty() {
            FingerReading::NoFingers
        } else {
            FingerReading::Touching(out)
        }
    }

    pub fn fingers(&self) -> &[Finger] {
        match self {
            Self::NoFingers => &[],
            Self::Touching(fingers) => fingers,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::NoFingers)
    }
}

impl fmt::Display for FingerReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFingers => f.write_str("None"),
            Self::Touching(fingers) => {
                for (i, finger) in fingers.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(finger.name())?;
                }
                Ok(())
            }
        }
    }
}

static NO_FINGERS: FingerReading = FingerReading::NoFingers;

/// Consistent view of one completed poll cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub devices: HashMap<u32, DeviceRecord>,
    pub raw_states: HashMap<u32, RawControllerState>,
    pub left_fingers: FingerReading,
    pub right_fingers: FingerReading,
}

impl Snapshot {
    /// Finger reading for the given hand. `Unknown` has none.
    pub fn fingers(&self, role: ControllerRole) -> &FingerReading {
        match role {
            ControllerRole::Left => &self.left_fingers,
            ControllerRole::Right => &self.right_fingers,
            ControllerRole::Unknown => &NO_FINGERS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_from_raw() {
        assert_eq!(DeviceClass::from(1), DeviceClass::Hmd);
        assert_eq!(DeviceClass::from(2), DeviceClass::Controller);
        assert_eq!(DeviceClass::from(4), DeviceClass::TrackingReference);
        assert_eq!(DeviceClass::from(0), DeviceClass::Other);
        assert_eq!(DeviceClass::from(5), DeviceClass::Other);
    }

    #[test]
    fn test_controller_role_from_raw() {
        assert_eq!(ControllerRole::from(1), ControllerRole::Left);
        assert_eq!(ControllerRole::from(2), ControllerRole::Right);
        // Opt-out, treadmill and stylus roles are not hands.
        assert_eq!(ControllerRole::from(3), ControllerRole::Unknown);
        assert_eq!(ControllerRole::from(5), ControllerRole::Unknown);
    }

    #[test]
    fn test_finger_reading_dedup_and_display() {
        let reading = FingerReading::from_fingers([
            Finger::Index,
            Finger::Thumb,
            Finger::Index,
            Finger::Middle,
        ]);
        assert_eq!(
            reading.fingers(),
            &[Finger::Index, Finger::Thumb, Finger::Middle]
        );
        assert_eq!(reading.to_string(), "Index Finger, Thumb, Middle Finger");
    }

    #[test]
    fn test_finger_reading_empty_is_sentinel() {
        let reading = FingerReading::from_fingers(std::iter::empty());
        assert_eq!(reading, FingerReading::NoFingers);
        assert!(reading.is_none());
        assert_eq!(reading.to_string(), "None");
    }

    #[test]
    fn test_button_mask_bits() {
        assert_eq!(ButtonMask::TRIGGER.bits(), 1u64 << 33);
        assert_eq!(ButtonMask::TOUCHPAD.bits(), 1u64 << 32);
        assert_eq!(ButtonMask::GRIP.bits(), 4);
        let unknown = ButtonMask::from_bits_retain(1 << 60);
        assert!(!unknown.contains(ButtonMask::TRIGGER));
        assert_eq!(unknown.bits(), 1 << 60);
    }
}
