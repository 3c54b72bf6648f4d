use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Rotation3, SMatrix, Unit, Vector3};
use num_traits::Float;
#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Contains a member of the lie algebra so(3), a representation of the tangent space
/// of 3d rotation. This is also known as the lie algebra of the 3d rotation group SO(3).
///
/// This is only intended to be used in optimization problems where it is desirable to
/// have unconstranied variables representing the degrees of freedom of the rotation.
/// In all other cases, a rotation matrix should be used to store rotations, since the
/// conversion to and from a rotation matrix is non-trivial.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Skew3(pub Vector3<f64>);

impl Skew3 {
    /// Converts the Skew3 to a Rotation3 matrix.
    pub fn rotation(self) -> Rotation3<f64> {
        self.into()
    }

    /// Converts the Skew3 into a Rotation3 matrix quickly, but only works when the rotation
    /// is very small.
    pub fn rotation_small(self) -> Rotation3<f64> {
        Rotation3::from_matrix(&(Matrix3::identity() + self.hat()))
    }

    /// This converts a matrix in skew-symmetric form into a Skew3.
    ///
    /// Warning: Does no check to ensure matrix is actually skew-symmetric.
    pub fn vee(mat: Matrix3<f64>) -> Self {
        Self(Vector3::new(mat.m32, mat.m13, mat.m21))
    }

    /// This converts the Skew3 into its skew-symmetric matrix form.
    pub fn hat(self) -> Matrix3<f64> {
        self.0.cross_matrix()
    }

    /// This converts the Skew3 into its squared skew-symmetric matrix form efficiently.
    #[rustfmt::skip]
    pub fn hat2(self) -> Matrix3<f64> {
        let w = self.0;
        let w11 = w.x * w.x;
        let w12 = w.x * w.y;
        let w13 = w.x * w.z;
        let w22 = w.y * w.y;
        let w23 = w.y * w.z;
        let w33 = w.z * w.z;
        Matrix3::new(
            -w22 - w33,     w12,           w13,
             w12,          -w11 - w33,     w23,
             w13,           w23,          -w11 - w22,
        )
    }
}

/// This is the exponential map.
impl From<Skew3> for Rotation3<f64> {
    fn from(w: Skew3) -> Self {
        // This check is done to avoid the degenerate case where the angle is near zero.
        let theta2 = w.0.norm_squared();
        if theta2 <= f64::epsilon() {
            w.rotation_small()
        } else {
            let theta = theta2.sqrt();
            let axis = Unit::new_unchecked(w.0 / theta);
            Self::from_axis_angle(&axis, theta)
        }
    }
}

/// This is the log map, see [`so3_log`].
impl From<Rotation3<f64>> for Skew3 {
    fn from(r: Rotation3<f64>) -> Self {
        Self(so3_log(r.matrix()))
    }
}

/// Above this value of `(trace(R) - 1) / 2` a rotation is treated as the identity by
/// [`so3_log`]. Below its negation the angle is treated as being close to `π`.
pub const LOG_NEAR_IDENTITY: f64 = 0.99999;

/// The vector of off-diagonal differences of a 3x3 matrix, `vee(R - Rᵀ)`.
///
/// For a rotation by `θ` about the unit axis `a` this is `2 sin(θ) a`.
pub fn vee_asym(r: &Matrix3<f64>) -> Vector3<f64> {
    Skew3::vee(r - r.transpose()).0
}

/// The logarithm of a rotation matrix, its scaled axis `ω`.
///
/// With `d = (trace(R) - 1) / 2` and `u = vee_asym(R)`:
///
/// * `d > LOG_NEAR_IDENTITY` - `ω = u / 2`, the limit of `θ / (2 sin θ) u`
/// * `d < -LOG_NEAR_IDENTITY` - the axis comes from the symmetric part of `R`
/// * otherwise `ω = θ / (2 sin θ) u` with `θ = acos(d)`
///
/// Rounding noise around the identity maps to rounding noise in `ω`.
pub fn so3_log(r: &Matrix3<f64>) -> Vector3<f64> {
    let d = ((r.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
    let u = vee_asym(r);
    if d > LOG_NEAR_IDENTITY {
        0.5 * u
    } else if d < -LOG_NEAR_IDENTITY {
        // sin θ vanishes, so the axis is recovered from the symmetric part instead.
        let theta = (0.5 * u.norm()).atan2(d);
        log::trace!("rotation logarithm close to pi (theta = {})", theta);
        theta * axis_near_pi(r, d, &u)
    } else {
        let theta = d.acos();
        theta / (2.0 * (1.0 - d * d).sqrt()) * u
    }
}

/// The unit rotation axis of a rotation by nearly `π`, with the sign of `u`.
fn axis_near_pi(r: &Matrix3<f64>, d: f64, u: &Vector3<f64>) -> Vector3<f64> {
    // (1 - d) a aᵀ
    let outer = (r + r.transpose()) * 0.5 - Matrix3::identity() * d;
    let column = outer.column(outer.diagonal().imax()).into_owned();
    let axis = column / column.norm();
    if axis.dot(u) < 0.0 {
        -axis
    } else {
        axis
    }
}

/// The Kronecker product `A ⊗ B`.
///
/// The output dimensions are inferred from the call site and must equal
/// `RA * RB` by `CA * CB`.
pub fn kron<
    const RA: usize,
    const CA: usize,
    const RB: usize,
    const CB: usize,
    const R: usize,
    const C: usize,
>(
    a: &SMatrix<f64, RA, CA>,
    b: &SMatrix<f64, RB, CB>,
) -> SMatrix<f64, R, C> {
    debug_assert_eq!(R, RA * RB);
    debug_assert_eq!(C, CA * CB);
    SMatrix::from_fn(|i, j| a[(i / RB, j / CB)] * b[(i % RB, j % CB)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Matrix2x3, Matrix3x1, Matrix4x6, RowVector3};

    #[test]
    fn hat2_is_hat_squared() {
        let w = Skew3(Vector3::new(0.3, -1.2, 0.7));
        assert_relative_eq!(w.hat2(), w.hat() * w.hat(), epsilon = 1e-12);
    }

    #[test]
    fn vee_inverts_hat() {
        let w = Skew3(Vector3::new(0.3, -1.2, 0.7));
        assert_eq!(Skew3::vee(w.hat()), w);
    }

    #[test]
    fn vee_asym_is_twice_sine_axis() {
        let axis = Vector3::new(1.0, 2.0, -2.0).normalize();
        let theta = 0.8;
        let r = Rotation3::from_scaled_axis(axis * theta);
        assert_relative_eq!(
            vee_asym(r.matrix()),
            2.0 * theta.sin() * axis,
            epsilon = 1e-12
        );
    }

    #[test]
    fn log_of_rounding_noise_is_rounding_noise() {
        let r = Rotation3::from_scaled_axis(Vector3::new(0.3, -0.8, 0.5));
        let almost_identity = r * r.inverse();
        assert!(so3_log(almost_identity.matrix()).norm() < 1e-15);
        let tiny = Vector3::new(1e-9, -2e-9, 3e-9);
        assert_relative_eq!(
            so3_log(Rotation3::from_scaled_axis(tiny).matrix()),
            tiny,
            epsilon = 1e-18
        );
    }

    #[test]
    fn log_close_to_pi_keeps_the_angle() {
        let axis = Vector3::new(2.0, -1.0, 0.5).normalize();
        for angle in [core::f64::consts::PI, core::f64::consts::PI - 1e-9, 3.0] {
            let r = Rotation3::from_scaled_axis(axis * angle);
            let omega = so3_log(r.matrix());
            assert_relative_eq!(omega.norm(), angle, epsilon = 1e-14);
            assert_relative_eq!(
                Rotation3::from_scaled_axis(omega).matrix(),
                r.matrix(),
                epsilon = 1e-14
            );
        }
    }

    #[test]
    fn exp_and_log_round_trip() {
        let w = Skew3(Vector3::new(0.1, 0.4, -0.9));
        let back: Skew3 = w.rotation().into();
        assert_relative_eq!(back.0, w.0, epsilon = 1e-12);
    }

    #[test]
    fn kron_block_layout() {
        let a = Matrix2::new(1.0, 2.0, 3.0, 4.0);
        let b = Matrix2x3::new(1.0, 0.0, -1.0, 0.5, 2.0, 0.0);
        let k: Matrix4x6<f64> = kron(&a, &b);
        assert_relative_eq!(k.fixed_slice::<2, 3>(0, 0).into_owned(), b);
        assert_relative_eq!(k.fixed_slice::<2, 3>(0, 3).into_owned(), 2.0 * b);
        assert_relative_eq!(k.fixed_slice::<2, 3>(2, 0).into_owned(), 3.0 * b);
        assert_relative_eq!(k.fixed_slice::<2, 3>(2, 3).into_owned(), 4.0 * b);
    }

    #[test]
    fn kron_row_by_column() {
        let row = RowVector3::new(1.0, -2.0, 3.0);
        let col = Matrix3x1::new(0.5, 1.0, 1.5);
        let k: Matrix3<f64> = kron(&row, &col);
        assert_relative_eq!(k, col * row);
    }
}
