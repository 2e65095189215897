use crate::config::Thresholds;
use crate::geometry;
use crate::runtime::RawPose;
use crate::types::{ControllerRole, DeviceClass, DeviceRecord};
use crate::{Result, VrTrackError};

/// Decodes one raw pose slot into a [`DeviceRecord`].
#[derive(Debug, Clone, Copy)]
pub struct PoseSampler {
    forward_sign: f64,
}

impl PoseSampler {
    pub fn new(thresholds: &Thresholds) -> Self {
        Self {
            forward_sign: thresholds.forward_sign,
        }
    }

    /// Build the record for a connected device whose class and role are
    /// already resolved.
    ///
    /// A missing, non-finite or zero transform fails with
    /// [`VrTrackError::MalformedTransform`]; the caller drops the device for
    /// this cycle.
    pub fn sample(
        &self,
        index: u32,
        pose: &RawPose,
        class: DeviceClass,
        role: ControllerRole,
    ) -> Result<DeviceRecord> {
        let transform = pose
            .transform
            .as_ref()
            .filter(|m| geometry::is_well_formed(m))
            .ok_or(VrTrackError::MalformedTransform { index })?;

        let role = if class == DeviceClass::Controller {
            role
        } else {
            ControllerRole::Unknown
        };

        Ok(DeviceRecord {
            index,
            position: geometry::position(transform),
            class,
            role,
            forward: geometry::forward_or_default(Some(transform), self.forward_sign),
        })
    }
}
