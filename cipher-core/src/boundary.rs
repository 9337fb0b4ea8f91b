//! Grain boundary relations used to derive interface properties from misorientation.
//!
//! Angles are in degrees throughout.

use nalgebra::{Quaternion, UnitQuaternion};
use ndarray::ArrayView1;

/// Angle (degrees) of the rotation between two orientations given as `[w, x, y, z]`
/// quaternions. The quaternions need not be normalised.
pub fn misorientation_angle(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let to_unit = |q: ArrayView1<'_, f64>| {
        UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]))
    };
    to_unit(a).angle_to(&to_unit(b)).to_degrees()
}

/// Read-Shockley low-angle grain boundary energy.
///
/// Rises from zero at `theta = 0` to `e_max` at `theta = theta_max`, and is constant
/// at `e_max` beyond it.
pub fn read_shockley(theta: f64, e_max: f64, theta_max: f64) -> f64 {
    if theta <= 0.0 {
        return 0.0;
    }
    if theta >= theta_max {
        return e_max;
    }
    let ratio = theta / theta_max;
    e_max * ratio * (1.0 - ratio.ln())
}

/// Sigmoidal grain boundary mobility, `m_max * (1 - exp(-b * (theta / theta_max)^n))`.
pub fn grain_boundary_mobility(theta: f64, m_max: f64, theta_max: f64, n: f64, b: f64) -> f64 {
    m_max * (1.0 - (-b * (theta / theta_max).powf(n)).exp())
}
