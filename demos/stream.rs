//! Drives the filter with a synthetic 50 Hz sensor stream.
//!
//! The device lies flat and slowly turns about its vertical axis while the
//! readings carry a little deterministic noise. Every 50 ticks the current
//! quaternion and angles are printed.

use core::f32::consts::PI;
use core::time::Duration;

use madgwick_ahrs::{Madgwick, MadgwickParameters};
use nalgebra::{UnitQuaternion, Vector3};

const TICK: Duration = Duration::from_millis(20);
const TICKS: u32 = 500;
const DISPLAY_EVERY: u32 = 50;
const YAW_RATE: f32 = 0.2;

fn main() {
    let params = MadgwickParameters::from_sample_period(TICK);
    let mut filter = match Madgwick::try_from_parameters(params) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("invalid parameters: {err}");
            return;
        }
    };

    // earth field: 50 µT, 60° dip
    let field = Vector3::new(25.0, 0.0, 43.3);
    let gravity = Vector3::new(0.0, 0.0, 9.81);
    let dt = TICK.as_secs_f32();

    for tick in 1..=TICKS {
        #[allow(clippy::cast_precision_loss)]
        let t = tick as f32 * dt;
        let truth = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), YAW_RATE * t);
        let jitter = 0.02 * (2.0 * PI * 3.0 * t).sin();

        let gyro = Vector3::new(jitter, -jitter, YAW_RATE);
        let accel = truth.inverse_transform_vector(&gravity) + Vector3::new(jitter, 0.0, 0.0);
        let mag = truth.inverse_transform_vector(&field);

        filter.update(gyro, accel, mag);

        if tick % DISPLAY_EVERY == 0 {
            let q = filter.quaternion();
            let [bank, heading, attitude] = filter.euler_angles().to_array();
            println!(
                "t = {t:5.2} s  q = ({:6.3}, {:6.3}, {:6.3}, {:6.3})  bank {bank:6.2}  heading {heading:6.2}  attitude {attitude:6.2}  error {:.3} rad",
                q.w,
                q.i,
                q.j,
                q.k,
                filter.orientation().angle_to(&truth),
            );
        }
    }
}
