//! Conversions from a raw device-to-world transform.
//!
//! The runtime reports a 3x4 row-major matrix: the left 3x3 block is the
//! rotation, the last column is the translation in meters.

/// 3x4 row-major device-to-world transform.
pub type Transform = [[f64; 4]; 3];

/// Forward direction used when the transform cannot be decoded.
pub const DEFAULT_FORWARD: [f64; 3] = [0.0, 0.0, 1.0];

/// Whether the transform is usable: every element finite and a non-zero rotation block.
pub fn is_well_formed(m: &Transform) -> bool {
    let finite = m.iter().flatten().all(|v| v.is_finite());
    let rotation_nonzero = m.iter().any(|row| row[..3].iter().any(|&v| v != 0.0));
    finite && rotation_nonzero
}

/// World position (translation column) in meters.
pub fn position(m: &Transform) -> [f64; 3] {
    [m[0][3], m[1][3], m[2][3]]
}

/// Third row of the rotation block scaled by `sign`.
///
/// Returns `None` for a malformed transform.
pub fn forward(m: &Transform, sign: f64) -> Option<[f64; 3]> {
    if !is_well_formed(m) {
        return None;
    }
    Some([m[2][0] * sign, m[2][1] * sign, m[2][2] * sign])
}

/// Like [`forward`], falling back to [`DEFAULT_FORWARD`].
pub fn forward_or_default(m: Option<&Transform>, sign: f64) -> [f64; 3] {
    m.and_then(|m| forward(m, sign)).unwrap_or(DEFAULT_FORWARD)
}
