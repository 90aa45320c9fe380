//! Crystallographic orientation as an active Bunge (Z-X-Z) rotation matrix.
//!
//! Angles are always radians in memory. Mic text files store degrees; the
//! conversion happens only in the grid readers and writers through
//! [`degrees_to_radians`] and [`radians_to_degrees`].

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// Below this |sin(Phi)| the first and third rotations share an axis.
const GIMBAL_EPSILON: f64 = 1e-12;

/// Convert an Euler triple read from a mic file into radians.
pub fn degrees_to_radians(degrees: DVec3) -> DVec3 {
    degrees * (std::f64::consts::PI / 180.0)
}

/// Convert an in-memory Euler triple back to degrees for writing.
pub fn radians_to_degrees(radians: DVec3) -> DVec3 {
    radians * (180.0 / std::f64::consts::PI)
}

/// Rotation matrix built from three Euler angles (phi1, Phi, phi2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    matrix: DMat3,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Orientation {
    pub const IDENTITY: Self = Self {
        matrix: DMat3::IDENTITY,
    };

    /// Build the active rotation `Rz(phi1) * Rx(Phi) * Rz(phi2)`.
    pub fn from_euler(phi1: f64, phi: f64, phi2: f64) -> Self {
        Self {
            matrix: DMat3::from_rotation_z(phi1)
                * DMat3::from_rotation_x(phi)
                * DMat3::from_rotation_z(phi2),
        }
    }

    /// Same as [`Orientation::from_euler`] with the angles packed in a vector.
    pub fn from_euler_vec(angles: DVec3) -> Self {
        Self::from_euler(angles.x, angles.y, angles.z)
    }

    pub fn from_matrix(matrix: DMat3) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &DMat3 {
        &self.matrix
    }

    /// Recover (phi1, Phi, phi2) in radians.
    ///
    /// Phi lies in [0, pi]. When Phi is 0 or pi only the combined in-plane
    /// rotation is defined, so it is reported entirely in phi1 with phi2 = 0.
    pub fn euler_angles(&self) -> DVec3 {
        let m = &self.matrix;
        // m.col(c)[r] is element (r, c)
        let r22 = m.z_axis.z.clamp(-1.0, 1.0);
        let phi = r22.acos();

        if phi.sin().abs() > GIMBAL_EPSILON {
            let phi1 = m.z_axis.x.atan2(-m.z_axis.y);
            let phi2 = m.x_axis.z.atan2(m.y_axis.z);
            DVec3::new(phi1, phi, phi2)
        } else {
            let phi1 = m.x_axis.y.atan2(m.x_axis.x);
            DVec3::new(phi1, phi, 0.0)
        }
    }

    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f64) -> bool {
        self.matrix.abs_diff_eq(other.matrix, max_abs_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_degree_conversion() {
        let rad = degrees_to_radians(DVec3::new(30.0, 60.0, 90.0));
        assert_eq!(rad.x, 30.0 * (PI / 180.0));
        assert_eq!(rad.y, 60.0 * (PI / 180.0));
        assert_eq!(rad.z, 90.0 * (PI / 180.0));

        let back = radians_to_degrees(rad);
        assert!(back.abs_diff_eq(DVec3::new(30.0, 60.0, 90.0), 1e-12));
    }

    #[test]
    fn test_identity_angles() {
        let angles = Orientation::IDENTITY.euler_angles();
        assert!(angles.abs_diff_eq(DVec3::ZERO, 1e-12));
    }

    #[test]
    fn test_euler_roundtrip_generic() {
        let input = DVec3::new(0.5, 1.2, -2.0);
        let o = Orientation::from_euler_vec(input);
        let out = o.euler_angles();
        assert!(
            out.abs_diff_eq(input, 1e-10),
            "expected {input:?}, got {out:?}"
        );
    }

    #[test]
    fn test_euler_gimbal_folds_into_phi1() {
        let o = Orientation::from_euler(0.3, 0.0, 0.4);
        let out = o.euler_angles();
        assert!((out.x - 0.7).abs() < 1e-10);
        assert_eq!(out.y, 0.0);
        assert_eq!(out.z, 0.0);

        let rebuilt = Orientation::from_euler_vec(out);
        assert!(rebuilt.abs_diff_eq(&o, 1e-10));
    }

    #[test]
    fn test_matrix_is_rotation() {
        let o = Orientation::from_euler(FRAC_PI_2, PI / 3.0, PI / 6.0);
        let m = *o.matrix();
        assert!((m.determinant() - 1.0).abs() < 1e-12);
        assert!((m * m.transpose()).abs_diff_eq(DMat3::IDENTITY, 1e-12));
    }

    #[test]
    fn test_active_rotation_about_z() {
        // phi1 alone rotates x onto y
        let o = Orientation::from_euler(FRAC_PI_2, 0.0, 0.0);
        let v = *o.matrix() * DVec3::X;
        assert!(v.abs_diff_eq(DVec3::Y, 1e-12));
    }
}
