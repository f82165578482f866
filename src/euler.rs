//! Conversion of the filter quaternion into display-friendly rotation angles.
//!
//! The mapping treats `y` as the vertical axis: [`EulerAngles::heading`] is
//! the rotation about `y`, [`EulerAngles::attitude`] about `z` and
//! [`EulerAngles::bank`] about `x`.

use core::f32::consts::PI;

use nalgebra::Quaternion;

/// Fraction of the quaternion's squared norm above which the conversion is
/// considered to be at a gimbal-lock pole.
pub const GIMBAL_LOCK_THRESHOLD: f32 = 0.499;

/// Three rotation angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles {
    /// Rotation about the `y` axis.
    pub heading: f32,
    /// Rotation about the `z` axis.
    ///
    /// # Note
    ///
    /// At a gimbal-lock pole this is `±π`, not `±π/2`.
    pub attitude: f32,
    /// Rotation about the `x` axis. Always `0` at a pole.
    pub bank: f32,
}

impl EulerAngles {
    /// Converts `(w, x, y, z)` into rotation angles.
    ///
    /// The quaternion does not need to be normalized, its squared norm is used
    /// as a correction factor.
    ///
    /// # Example
    ///
    /// ```
    /// use core::f32::consts::FRAC_PI_2;
    /// use madgwick_ahrs::EulerAngles;
    /// use nalgebra::{UnitQuaternion, Vector3};
    ///
    /// let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
    /// let angles = EulerAngles::from_quaternion(q.quaternion());
    ///
    /// assert!((angles.heading - FRAC_PI_2).abs() < 1e-6);
    /// ```
    #[must_use]
    pub fn from_quaternion(quaternion: &Quaternion<f32>) -> Self {
        let (w, x, y, z) = (quaternion.w, quaternion.i, quaternion.j, quaternion.k);

        let sqw = w * w;
        let sqx = x * x;
        let sqy = y * y;
        let sqz = z * z;
        let unit = sqx + sqy + sqz + sqw;
        let test = x * y + z * w;

        if test > GIMBAL_LOCK_THRESHOLD * unit {
            // north pole
            return Self {
                heading: 2.0 * x.atan2(w),
                attitude: PI,
                bank: 0.0,
            };
        }

        if test < -GIMBAL_LOCK_THRESHOLD * unit {
            // south pole
            return Self {
                heading: -2.0 * x.atan2(w),
                attitude: -PI,
                bank: 0.0,
            };
        }

        Self {
            heading: (2.0 * y * w - 2.0 * x * z).atan2(sqx - sqy - sqz + sqw),
            attitude: (2.0 * test / unit).asin(),
            bank: (2.0 * x * w - 2.0 * y * z).atan2(-sqx + sqy - sqz + sqw),
        }
    }

    /// Returns the angles in the order `[bank, heading, attitude]`.
    #[must_use]
    pub fn to_array(self) -> [f32; 3] {
        [self.bank, self.heading, self.attitude]
    }
}

impl From<Quaternion<f32>> for EulerAngles {
    fn from(quaternion: Quaternion<f32>) -> Self {
        Self::from_quaternion(&quaternion)
    }
}
