//! An implementation of Madgwick's gradient-descent orientation filter for
//! attitude and heading estimation.
//!
//! The filter fuses gyroscope, accelerometer and (optionally) magnetometer
//! readings into a unit quaternion describing the orientation of the sensor
//! frame relative to the earth frame (gravity down, magnetic north). Each
//! update integrates the angular rate and pulls the estimate towards the
//! orientation that explains the measured reference vectors, weighted by a
//! single gain `beta`.
//!
//! # Example
//!
//! ```
//! use madgwick_ahrs::Madgwick;
//! use nalgebra::Vector3;
//!
//! // 100 Hz sensor stream, default gain
//! let mut filter = Madgwick::new(0.01);
//!
//! let gyro = Vector3::new(0.0, 0.0, 0.0);
//! let accel = Vector3::new(0.0, 0.0, 9.81);
//! let mag = Vector3::new(20.0, 0.0, 0.0);
//!
//! filter.update(gyro, accel, mag);
//! let angles = filter.euler_angles();
//! assert!(angles.bank.abs() < 1e-6);
//! ```
//!
//! # Concurrency
//!
//! Updates take `&mut self` and run to completion in constant time, so no
//! reader can observe a half-applied update. An embedding that shares a
//! filter between threads wraps it in its own lock, and must not change
//! `beta` or the sample period while another thread is updating.

pub mod error;
pub mod euler;

use core::time::Duration;

use log::{debug, trace};
use nalgebra::{Quaternion, UnitQuaternion, Vector2, Vector3, Vector4};

pub use error::ParameterError;
pub use euler::EulerAngles;

/// Gain used when none is given.
pub const DEFAULT_BETA: f32 = 1.0;

/// Parameters for the [`Madgwick`] filter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MadgwickParameters {
    /// Time between two successive updates, in seconds.
    ///
    /// The filter does not measure time. Calling an update at a different
    /// cadence than this period skews the integration.
    pub sample_period: f32,
    /// Convergence gain `beta`.
    ///
    /// Large values pull the estimate towards the accelerometer and
    /// magnetometer reference faster, at the cost of passing more of their
    /// noise into the orientation. Small values trust the gyroscope.
    pub beta: f32,
}

impl Default for MadgwickParameters {
    fn default() -> Self {
        Self {
            sample_period: 0.02,
            beta: DEFAULT_BETA,
        }
    }
}

impl MadgwickParameters {
    /// Parameters for the given sample period, in seconds, with
    /// [`DEFAULT_BETA`].
    #[must_use]
    pub fn new(sample_period: f32) -> Self {
        Self::with_beta(sample_period, DEFAULT_BETA)
    }

    /// Parameters for the given sample period and gain.
    #[must_use]
    pub fn with_beta(sample_period: f32, beta: f32) -> Self {
        Self { sample_period, beta }
    }

    /// Parameters for a sensor delivering a sample every `sample_period`,
    /// with [`DEFAULT_BETA`].
    #[must_use]
    pub fn from_sample_period(sample_period: Duration) -> Self {
        Self::new(sample_period.as_secs_f32())
    }

    /// Checks that the parameters cannot corrupt the orientation estimate.
    ///
    /// # Errors
    ///
    /// Returns a [`ParameterError`] if the sample period is not finite or not
    /// strictly positive, or if `beta` is not finite or negative.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !self.sample_period.is_finite() {
            return Err(ParameterError::NonFiniteSamplePeriod(self.sample_period));
        }
        if self.sample_period <= 0.0 {
            return Err(ParameterError::NonPositiveSamplePeriod(self.sample_period));
        }
        if !self.beta.is_finite() {
            return Err(ParameterError::NonFiniteBeta(self.beta));
        }
        if self.beta < 0.0 {
            return Err(ParameterError::NegativeBeta(self.beta));
        }
        Ok(())
    }
}

/// The Madgwick filter.
///
/// The only state is the orientation quaternion. Inputs are consumed by each
/// update and not retained.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Madgwick {
    /// The parameters of the filter.
    parameters: MadgwickParameters,
    /// Orientation `(w, x, y, z)` of the sensor frame relative to the earth
    /// frame.
    quaternion: Quaternion<f32>,
}

impl Default for Madgwick {
    fn default() -> Self {
        Self::from_parameters(MadgwickParameters::default())
    }
}

impl Madgwick {
    /// Create a new filter for the given sample period in seconds, using
    /// [`DEFAULT_BETA`].
    #[must_use]
    pub fn new(sample_period: f32) -> Self {
        Self::from_parameters(MadgwickParameters::new(sample_period))
    }

    /// Create a new filter with the given sample period and gain.
    #[must_use]
    pub fn with_beta(sample_period: f32, beta: f32) -> Self {
        Self::from_parameters(MadgwickParameters::with_beta(sample_period, beta))
    }

    /// Create a new filter with the given parameters, starting at the
    /// identity orientation.
    ///
    /// The parameters are not validated, see [`Self::try_from_parameters`].
    #[must_use]
    pub fn from_parameters(parameters: MadgwickParameters) -> Self {
        Self {
            parameters,
            quaternion: Quaternion::identity(),
        }
    }

    /// Create a new filter after checking the parameters with
    /// [`MadgwickParameters::validate`].
    ///
    /// # Errors
    ///
    /// Returns the [`ParameterError`] reported by the validation.
    pub fn try_from_parameters(parameters: MadgwickParameters) -> Result<Self, ParameterError> {
        parameters.validate()?;
        Ok(Self::from_parameters(parameters))
    }

    /// Create a new filter starting at a known orientation.
    #[must_use]
    pub fn new_with_orientation(
        parameters: MadgwickParameters,
        orientation: UnitQuaternion<f32>,
    ) -> Self {
        Self {
            parameters,
            quaternion: orientation.into_inner(),
        }
    }

    /// Returns the current orientation quaternion `(w, x, y, z)`.
    ///
    /// This is a copy; modifying it does not affect the filter.
    #[must_use]
    pub fn quaternion(&self) -> Quaternion<f32> {
        self.quaternion
    }

    /// Returns the current orientation as a rotation.
    #[must_use]
    pub fn orientation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::new_unchecked(self.quaternion)
    }

    /// Overwrite the current orientation estimate.
    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f32>) {
        self.quaternion = orientation.into_inner();
    }

    /// Reset the orientation estimate to identity, keeping the parameters.
    pub fn reset(&mut self) {
        self.quaternion = Quaternion::identity();
    }

    /// Returns the current orientation as rotation angles.
    #[must_use]
    pub fn euler_angles(&self) -> EulerAngles {
        EulerAngles::from_quaternion(&self.quaternion)
    }

    /// Returns the parameters of the filter.
    #[must_use]
    pub fn parameters(&self) -> MadgwickParameters {
        self.parameters
    }

    /// Returns the sample period in seconds.
    #[must_use]
    pub fn sample_period(&self) -> f32 {
        self.parameters.sample_period
    }

    /// Set the sample period in seconds. Takes effect on the next update.
    pub fn set_sample_period(&mut self, sample_period: f32) {
        debug!(
            "sample period changed from {} s to {sample_period} s",
            self.parameters.sample_period
        );
        self.parameters.sample_period = sample_period;
    }

    /// Returns the gain `beta`.
    #[must_use]
    pub fn beta(&self) -> f32 {
        self.parameters.beta
    }

    /// Set the gain `beta`. Takes effect on the next update.
    pub fn set_beta(&mut self, beta: f32) {
        debug!("beta changed from {} to {beta}", self.parameters.beta);
        self.parameters.beta = beta;
    }

    /// Update step of the filter, using gyroscope, accelerometer and
    /// magnetometer readings.
    ///
    /// The gyroscope is expected in rad/s. Accelerometer and magnetometer can
    /// be in any calibrated unit, only their direction is used.
    ///
    /// # Note
    ///
    /// If the accelerometer or the magnetometer reading is exactly zero the
    /// whole update is skipped and the previous orientation is kept.
    pub fn update(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
    ) {
        let Some(accel) = normalize_reference(accelerometer) else {
            trace!("zero accelerometer reading, update skipped");
            return;
        };
        let Some(mag) = normalize_reference(magnetometer) else {
            trace!("zero magnetometer reading, update skipped");
            return;
        };

        let q = self.quaternion;
        let (q1, q2, q3, q4) = (q.w, q.i, q.j, q.k);

        // reference direction of the earth's magnetic field
        let h = q * Quaternion::from_imag(mag) * q.conjugate();
        let two_bx = Vector2::new(h.i, h.j).norm();
        let two_bz = h.k;
        let four_bx = 2.0 * two_bx;
        let four_bz = 2.0 * two_bz;

        // residuals of the predicted gravity and magnetic field directions
        let f1 = 2.0 * (q2 * q4 - q1 * q3) - accel.x;
        let f2 = 2.0 * (q1 * q2 + q3 * q4) - accel.y;
        let f3 = 1.0 - 2.0 * q2 * q2 - 2.0 * q3 * q3 - accel.z;
        let f4 = two_bx * (0.5 - q3 * q3 - q4 * q4) + two_bz * (q2 * q4 - q1 * q3) - mag.x;
        let f5 = two_bx * (q2 * q3 - q1 * q4) + two_bz * (q1 * q2 + q3 * q4) - mag.y;
        let f6 = two_bx * (q1 * q3 + q2 * q4) + two_bz * (0.5 - q2 * q2 - q3 * q3) - mag.z;

        // gradient J^T f of the objective function
        let gradient = Vector4::new(
            -2.0 * q3 * f1 + 2.0 * q2 * f2 - two_bz * q3 * f4
                + (-two_bx * q4 + two_bz * q2) * f5
                + two_bx * q3 * f6,
            2.0 * q4 * f1 + 2.0 * q1 * f2 - 4.0 * q2 * f3
                + two_bz * q4 * f4
                + (two_bx * q3 + two_bz * q1) * f5
                + (two_bx * q4 - four_bz * q2) * f6,
            -2.0 * q1 * f1 + 2.0 * q4 * f2 - 4.0 * q3 * f3
                + (-four_bx * q3 - two_bz * q1) * f4
                + (two_bx * q2 + two_bz * q4) * f5
                + (two_bx * q1 - four_bz * q3) * f6,
            2.0 * q2 * f1
                + 2.0 * q3 * f2
                + (-four_bx * q4 + two_bz * q2) * f4
                + (-two_bx * q1 + two_bz * q3) * f5
                + two_bx * q2 * f6,
        );

        self.integrate(gyroscope, gradient);
    }

    /// Update step of the filter, using gyroscope and accelerometer readings
    /// only.
    ///
    /// Without a magnetometer the heading is not observable and drifts with
    /// the gyroscope integration error.
    ///
    /// # Note
    ///
    /// If the accelerometer reading is exactly zero the update is skipped and
    /// the previous orientation is kept.
    pub fn update_imu(&mut self, gyroscope: Vector3<f32>, accelerometer: Vector3<f32>) {
        let Some(accel) = normalize_reference(accelerometer) else {
            trace!("zero accelerometer reading, update skipped");
            return;
        };

        let q = self.quaternion;
        let (q1, q2, q3, q4) = (q.w, q.i, q.j, q.k);

        let q1q1 = q1 * q1;
        let q2q2 = q2 * q2;
        let q3q3 = q3 * q3;
        let q4q4 = q4 * q4;

        let gradient = Vector4::new(
            4.0 * q1 * q3q3 + 2.0 * q3 * accel.x + 4.0 * q1 * q2q2 - 2.0 * q2 * accel.y,
            4.0 * q2 * q4q4 - 2.0 * q4 * accel.x + 4.0 * q1q1 * q2 - 2.0 * q1 * accel.y - 4.0 * q2
                + 8.0 * q2 * q2q2
                + 8.0 * q2 * q3q3
                + 4.0 * q2 * accel.z,
            4.0 * q1q1 * q3 + 2.0 * q1 * accel.x + 4.0 * q3 * q4q4 - 2.0 * q4 * accel.y - 4.0 * q3
                + 8.0 * q3 * q2q2
                + 8.0 * q3 * q3q3
                + 4.0 * q3 * accel.z,
            4.0 * q2q2 * q4 - 2.0 * q2 * accel.x + 4.0 * q3q3 * q4 - 2.0 * q3 * accel.y,
        );

        self.integrate(gyroscope, gradient);
    }

    /// Integrate the rate of change of the quaternion over one sample period
    /// and renormalize.
    ///
    /// The rate is the gyroscope kinematics minus `beta` times the normalized
    /// gradient. A vanishing gradient means the reference vectors already
    /// agree with the estimate, in which case only the gyroscope is
    /// integrated.
    fn integrate(&mut self, gyroscope: Vector3<f32>, gradient: Vector4<f32>) {
        let q = self.quaternion;

        let rate = q * Quaternion::from_imag(gyroscope) * 0.5;
        let q_dot = if let Some(step) = gradient.try_normalize(f32::EPSILON) {
            rate - Quaternion::new(step.x, step.y, step.z, step.w) * self.parameters.beta
        } else {
            trace!("vanishing gradient, correction step dropped");
            rate
        };

        self.quaternion = (q + q_dot * self.parameters.sample_period).normalize();
    }
}

/// Scale a reference vector to unit length, or `None` if its magnitude is
/// exactly zero.
#[allow(clippy::float_cmp)]
fn normalize_reference(v: Vector3<f32>) -> Option<Vector3<f32>> {
    let norm = v.norm();
    if norm == 0.0 {
        return None;
    }
    Some(v * norm.recip())
}
