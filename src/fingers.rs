//! Fixed-threshold approximation of which fingers touch a controller.
//!
//! Controllers without capacitive finger tracking expose only a trigger
//! axis, a thumb axis, up to three grip axes and a handful of button bits.
//! The rules below map those signals to fingers, in this order:
//!
//! - index: axis 1 at or above the trigger threshold, or the trigger bit
//!   pressed or touched;
//! - thumb: touchpad/thumbstick touched, else |axis 0| above the thumbtouch
//!   threshold;
//! - middle/ring/pinky: axes 2/3/4 individually at or above the grip
//!   threshold. If none of them fired, all three are reported together when
//!   axis 2 reaches the grip threshold or the grip button is pressed.

use crate::config::Thresholds;
use crate::types::{ButtonMask, Finger, FingerReading, RawControllerState};

const GRIP_FINGERS: [(usize, Finger); 3] = [
    (2, Finger::Middle),
    (3, Finger::Ring),
    (4, Finger::Pinky),
];

#[derive(Debug, Clone, Copy)]
pub struct FingerHeuristic {
    thresholds: Thresholds,
}

impl FingerHeuristic {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Classify one controller sample. `None` reads as no fingers.
    pub fn classify(&self, state: Option<&RawControllerState>) -> FingerReading {
        let Some(state) = state else {
            return FingerReading::NoFingers;
        };
        let t = &self.thresholds;
        let mut fingers = Vec::with_capacity(5);

        let trigger_bit = state.pressed.contains(ButtonMask::TRIGGER)
            || state.touched.contains(ButtonMask::TRIGGER);
        if state.axis(1) >= t.trigger || trigger_bit {
            fingers.push(Finger::Index);
        }

        let thumb = state.touched.contains(ButtonMask::TOUCHPAD)
            || state.axis(0).abs() > t.thumbtouch;
        if thumb {
            fingers.push(Finger::Thumb);
        }

        let mut mapped = false;
        for (slot, finger) in GRIP_FINGERS {
            if state.axis(slot) >= t.grip {
                fingers.push(finger);
                mapped = true;
            }
        }
        if !mapped && (state.axis(2) >= t.grip || state.pressed.contains(ButtonMask::GRIP)) {
            fingers.extend(GRIP_FINGERS.iter().map(|(_, finger)| *finger));
        }

        FingerReading::from_fingers(fingers)
    }
}

impl Default for FingerHeuristic {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ControllerAxis;

    fn state(axes: &[f32], pressed: ButtonMask, touched: ButtonMask) -> RawControllerState {
        RawControllerState {
            axes: axes.iter().map(|&x| ControllerAxis { x, y: 0.0 }).collect(),
            pressed,
            touched,
        }
    }

    fn classify(s: &RawControllerState) -> FingerReading {
        FingerHeuristic::default().classify(Some(s))
    }

    #[test]
    fn test_trigger_axis_flags_index_first() {
        let s = state(&[0.0, 0.35, 0.0, 0.0, 0.0], ButtonMask::empty(), ButtonMask::empty());
        let reading = classify(&s);
        assert_eq!(reading.fingers().first(), Some(&Finger::Index));
        assert_eq!(reading.fingers(), &[Finger::Index]);
    }

    #[test]
    fn test_trigger_bits_flag_index() {
        let pressed = state(&[], ButtonMask::TRIGGER, ButtonMask::empty());
        assert_eq!(classify(&pressed).fingers(), &[Finger::Index]);
        let touched = state(&[], ButtonMask::empty(), ButtonMask::TRIGGER);
        assert_eq!(classify(&touched).fingers(), &[Finger::Index]);
    }

    #[test]
    fn test_thumb_from_axis() {
        let s = state(&[0.02, 0.0, 0.0, 0.0, 0.0], ButtonMask::empty(), ButtonMask::empty());
        assert!(classify(&s).fingers().contains(&Finger::Thumb));

        let negative = state(&[-0.5], ButtonMask::empty(), ButtonMask::empty());
        assert_eq!(classify(&negative).fingers(), &[Finger::Thumb]);

        // exactly at the threshold is not a touch
        let edge = state(&[0.01], ButtonMask::empty(), ButtonMask::empty());
        assert!(classify(&edge).is_none());
    }

    #[test]
    fn test_thumb_from_touch_bit() {
        let s = state(&[], ButtonMask::empty(), ButtonMask::TOUCHPAD);
        assert_eq!(classify(&s).fingers(), &[Finger::Thumb]);
    }

    #[test]
    fn test_grip_fallback_flags_all_three() {
        let s = state(&[0.0, 0.0, 0.10, 0.10, 0.10], ButtonMask::GRIP, ButtonMask::empty());
        assert_eq!(
            classify(&s).fingers(),
            &[Finger::Middle, Finger::Ring, Finger::Pinky]
        );
        assert_eq!(
            classify(&s).to_string(),
            "Middle Finger, Ring Finger, Pinky Finger"
        );
    }

    #[test]
    fn test_individual_grip_axis_preempts_fallback() {
        let s = state(&[0.0, 0.0, 0.50, 0.0, 0.0], ButtonMask::empty(), ButtonMask::empty());
        assert_eq!(classify(&s).fingers(), &[Finger::Middle]);

        let with_button = state(&[0.0, 0.0, 0.0, 0.0, 0.9], ButtonMask::GRIP, ButtonMask::empty());
        assert_eq!(classify(&with_button).fingers(), &[Finger::Pinky]);
    }

    #[test]
    fn test_full_hand() {
        let s = state(
            &[0.2, 1.0, 0.8, 0.7, 0.6],
            ButtonMask::TRIGGER | ButtonMask::GRIP,
            ButtonMask::TOUCHPAD,
        );
        assert_eq!(
            classify(&s).to_string(),
            "Index Finger, Thumb, Middle Finger, Ring Finger, Pinky Finger"
        );
    }

    #[test]
    fn test_missing_input_is_sentinel() {
        assert_eq!(FingerHeuristic::default().classify(None), FingerReading::NoFingers);
        let idle = state(&[0.0; 5], ButtonMask::empty(), ButtonMask::empty());
        assert_eq!(classify(&idle), FingerReading::NoFingers);
        assert_eq!(classify(&idle).to_string(), "None");
    }

    #[test]
    fn test_deterministic() {
        let s = state(&[0.3, 0.3, 0.3, 0.0, 0.0], ButtonMask::GRIP, ButtonMask::TRIGGER);
        let first = classify(&s);
        for _ in 0..10 {
            assert_eq!(classify(&s), first);
        }
    }

    #[test]
    fn test_overridden_thresholds() {
        let heuristic = FingerHeuristic::new(Thresholds {
            trigger: 0.9,
            grip: 0.05,
            ..Thresholds::default()
        });
        let s = state(&[0.0, 0.5, 0.1, 0.0, 0.0], ButtonMask::empty(), ButtonMask::empty());
        assert_eq!(heuristic.classify(Some(&s)).fingers(), &[Finger::Middle]);
    }
}
