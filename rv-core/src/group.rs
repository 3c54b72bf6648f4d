use crate::{so3_log, Error, Result, Skew3};
use core::ops::Mul;
use nalgebra::{
    IsometryMatrix2, IsometryMatrix3, Matrix2, Matrix3, Rotation2, Rotation3, SVector,
    SimilarityMatrix3, Translation2, Translation3, Vector2, Vector3,
};

/// Below this angle the closed-form coefficients of the exponential maps are
/// replaced by their Taylor expansions.
const SMALL_ANGLE: f64 = 1e-4;

/// Below this magnitude of log-scale the small-angle Sim(3) coefficients are
/// evaluated from their series in `sigma`.
const SMALL_SCALE: f64 = 1e-2;

/// This trait is implemented by every pose type a residual model can be parameterized over:
///
/// * [`Rotation3`] - SO(3), `[wx, wy, wz]`
/// * [`IsometryMatrix2`] - SE(2), `[ux, uy, theta]`
/// * [`IsometryMatrix3`] - SE(3), `[ux, uy, uz, wx, wy, wz]`
/// * [`SimilarityMatrix3`] - Sim(3), `[ux, uy, uz, wx, wy, wz, sigma]`
///
/// `DOF` is the dimension of the tangent space. Group composition is the
/// [`Mul`] implementation of the underlying [`nalgebra`] type.
pub trait LieGroup<const DOF: usize>: Copy + Mul<Output = Self> {
    /// Index of the first rotational component of the tangent vector.
    const FIRST_ROT_ID: usize;
    /// Number of rotational components of the tangent vector.
    const NUM_ROT_PARS: usize;
    /// Index of the first translational component of the tangent vector.
    const FIRST_TRANS_ID: usize;
    /// Number of translational components of the tangent vector.
    const NUM_TRANS_PARS: usize;

    /// The exponential map from the tangent space into the group.
    fn exp(tangent: &SVector<f64, DOF>) -> Self;

    /// The group identity.
    fn identity() -> Self;

    /// The group inverse.
    fn inverse(&self) -> Self;

    /// Applies a left perturbation: `exp(delta) * self`.
    #[must_use]
    fn perturb(&self, delta: &SVector<f64, DOF>) -> Self {
        Self::exp(delta) * *self
    }
}

impl LieGroup<3> for Rotation3<f64> {
    const FIRST_ROT_ID: usize = 0;
    const NUM_ROT_PARS: usize = 3;
    const FIRST_TRANS_ID: usize = 0;
    const NUM_TRANS_PARS: usize = 0;

    fn exp(tangent: &Vector3<f64>) -> Self {
        Skew3(*tangent).into()
    }

    fn identity() -> Self {
        Rotation3::identity()
    }

    fn inverse(&self) -> Self {
        Rotation3::inverse(self)
    }
}

impl LieGroup<3> for IsometryMatrix2<f64> {
    const FIRST_ROT_ID: usize = 2;
    const NUM_ROT_PARS: usize = 1;
    const FIRST_TRANS_ID: usize = 0;
    const NUM_TRANS_PARS: usize = 2;

    fn exp(tangent: &Vector3<f64>) -> Self {
        let theta = tangent.z;
        let (sin_ratio, cos_ratio) = if theta.abs() < SMALL_ANGLE {
            let theta2 = theta * theta;
            (1.0 - theta2 / 6.0, theta * (0.5 - theta2 / 24.0))
        } else {
            (theta.sin() / theta, (1.0 - theta.cos()) / theta)
        };
        let v = Matrix2::new(sin_ratio, -cos_ratio, cos_ratio, sin_ratio);
        IsometryMatrix2::from_parts(
            Translation2::from(v * tangent.xy()),
            Rotation2::new(theta),
        )
    }

    fn identity() -> Self {
        IsometryMatrix2::identity()
    }

    fn inverse(&self) -> Self {
        IsometryMatrix2::inverse(self)
    }
}

impl LieGroup<6> for IsometryMatrix3<f64> {
    const FIRST_ROT_ID: usize = 3;
    const NUM_ROT_PARS: usize = 3;
    const FIRST_TRANS_ID: usize = 0;
    const NUM_TRANS_PARS: usize = 3;

    fn exp(tangent: &SVector<f64, 6>) -> Self {
        let upsilon = tangent.fixed_rows::<3>(0).into_owned();
        let omega = Skew3(tangent.fixed_rows::<3>(3).into_owned());
        IsometryMatrix3::from_parts(
            Translation3::from(se3_v(omega) * upsilon),
            omega.rotation(),
        )
    }

    fn identity() -> Self {
        IsometryMatrix3::identity()
    }

    fn inverse(&self) -> Self {
        IsometryMatrix3::inverse(self)
    }
}

impl LieGroup<7> for SimilarityMatrix3<f64> {
    const FIRST_ROT_ID: usize = 3;
    const NUM_ROT_PARS: usize = 3;
    const FIRST_TRANS_ID: usize = 0;
    const NUM_TRANS_PARS: usize = 3;

    fn exp(tangent: &SVector<f64, 7>) -> Self {
        let upsilon = tangent.fixed_rows::<3>(0).into_owned();
        let omega = Skew3(tangent.fixed_rows::<3>(3).into_owned());
        let sigma = tangent[6];
        SimilarityMatrix3::from_parts(
            Translation3::from(sim3_w(omega, sigma) * upsilon),
            omega.rotation(),
            sigma.exp(),
        )
    }

    fn identity() -> Self {
        SimilarityMatrix3::identity()
    }

    fn inverse(&self) -> Self {
        SimilarityMatrix3::inverse(self)
    }
}

/// The left Jacobian of SO(3), which maps the translational tangent components
/// of SE(3) onto the translation: `t = V υ`.
///
/// `V = I + (1 - cos θ)/θ² Ω + (θ - sin θ)/θ³ Ω²`
pub fn se3_v(omega: Skew3) -> Matrix3<f64> {
    let theta2 = omega.norm_squared();
    let theta = theta2.sqrt();
    let (a, b) = if theta < SMALL_ANGLE {
        (0.5 - theta2 / 24.0, 1.0 / 6.0 - theta2 / 120.0)
    } else {
        (
            (1.0 - theta.cos()) / theta2,
            (theta - theta.sin()) / (theta2 * theta),
        )
    };
    Matrix3::identity() + a * omega.hat() + b * omega.hat2()
}

/// The matrix that maps the translational tangent components of Sim(3) onto
/// the translation: `t = W υ`, with `W = C I + A Ω + B Ω²`.
pub fn sim3_w(omega: Skew3, sigma: f64) -> Matrix3<f64> {
    let theta2 = omega.norm_squared();
    let theta = theta2.sqrt();
    let scale = sigma.exp();
    let sigma2 = sigma * sigma;
    let c = if sigma.abs() < f64::EPSILON {
        1.0 + 0.5 * sigma
    } else {
        sigma.exp_m1() / sigma
    };
    let (a, b) = if theta < SMALL_ANGLE {
        if sigma.abs() < SMALL_SCALE {
            (
                0.5 + sigma / 3.0 + sigma2 / 8.0,
                1.0 / 6.0 + sigma / 8.0 + sigma2 / 20.0,
            )
        } else {
            (
                ((sigma - 1.0) * scale + 1.0) / sigma2,
                (scale * 0.5 * sigma2 + scale - 1.0 - sigma * scale) / (sigma2 * sigma),
            )
        }
    } else {
        let sa = scale * theta.sin();
        let sb = scale * theta.cos();
        let denom = theta2 + sigma2;
        (
            (sa * sigma + (1.0 - sb) * theta) / (theta * denom),
            (c - ((sb - 1.0) * sigma + sa * theta) / denom) / theta2,
        )
    };
    c * Matrix3::identity() + a * omega.hat() + b * omega.hat2()
}

/// The logarithm of a similarity transform, `[υ; ω; σ]`.
///
/// The scale of `sim` must be strictly positive; use [`try_sim3_log`] when that
/// is not already guaranteed.
pub fn sim3_log(sim: &SimilarityMatrix3<f64>) -> SVector<f64, 7> {
    let omega = Skew3(so3_log(sim.isometry.rotation.matrix()));
    let sigma = sim.scaling().ln();
    let t = sim.isometry.translation.vector;
    // W only loses rank for non-finite inputs.
    let upsilon = sim3_w(omega, sigma).lu().solve(&t).unwrap_or(t);
    let mut tangent = SVector::<f64, 7>::zeros();
    tangent.fixed_rows_mut::<3>(0).copy_from(&upsilon);
    tangent.fixed_rows_mut::<3>(3).copy_from(&omega.0);
    tangent[6] = sigma;
    tangent
}

/// [`sim3_log`] that rejects similarities without a real logarithm.
pub fn try_sim3_log(sim: &SimilarityMatrix3<f64>) -> Result<SVector<f64, 7>> {
    let scale = sim.scaling();
    if scale > 0.0 && scale.is_finite() {
        Ok(sim3_log(sim))
    } else {
        log::debug!("rejecting similarity logarithm with scale {}", scale);
        Err(Error::NonPositiveScale(scale))
    }
}

/// Maps a point through a rigid transform: `R x + t`.
pub fn transform_se3(pose: &IsometryMatrix3<f64>, x: &Vector3<f64>) -> Vector3<f64> {
    pose.rotation * x + pose.translation.vector
}

/// Maps a point through a similarity transform: `s R x + t`.
pub fn transform_sim3(sim: &SimilarityMatrix3<f64>, x: &Vector3<f64>) -> Vector3<f64> {
    sim.scaling() * (sim.isometry.rotation * x) + sim.isometry.translation.vector
}

/// Maps a point through a planar rigid transform: `R x + t`.
pub fn transform_se2(pose: &IsometryMatrix2<f64>, x: &Vector2<f64>) -> Vector2<f64> {
    pose.rotation * x + pose.translation.vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector6};

    /// Matrix exponential by truncated power series, only meant for small test matrices.
    fn expm(a: Matrix4<f64>) -> Matrix4<f64> {
        let mut result = Matrix4::identity();
        let mut term = Matrix4::identity();
        for k in 1..40 {
            term = term * a / k as f64;
            result += term;
        }
        result
    }

    #[test]
    fn se3_exp_matches_matrix_exponential() {
        let tangent = Vector6::new(0.4, -0.3, 1.2, 0.5, -0.7, 0.2);
        let mut algebra = Matrix4::zeros();
        algebra
            .fixed_slice_mut::<3, 3>(0, 0)
            .copy_from(&tangent.fixed_rows::<3>(3).into_owned().cross_matrix());
        algebra
            .fixed_slice_mut::<3, 1>(0, 3)
            .copy_from(&tangent.fixed_rows::<3>(0));
        let expected = expm(algebra);
        let pose = IsometryMatrix3::exp(&tangent);
        assert_relative_eq!(pose.to_homogeneous(), expected, epsilon = 1e-12);
    }

    #[test]
    fn sim3_exp_matches_matrix_exponential() {
        for sigma in [0.0, 0.3, -0.6] {
            for omega in [Vector3::zeros(), Vector3::new(0.2, 0.9, -0.4)] {
                let mut tangent = SVector::<f64, 7>::zeros();
                tangent
                    .fixed_rows_mut::<3>(0)
                    .copy_from(&Vector3::new(1.0, -0.5, 0.25));
                tangent.fixed_rows_mut::<3>(3).copy_from(&omega);
                tangent[6] = sigma;

                let mut algebra = Matrix4::zeros();
                algebra
                    .fixed_slice_mut::<3, 3>(0, 0)
                    .copy_from(&(omega.cross_matrix() + sigma * Matrix3::identity()));
                algebra
                    .fixed_slice_mut::<3, 1>(0, 3)
                    .copy_from(&tangent.fixed_rows::<3>(0));
                let expected = expm(algebra);

                let sim = SimilarityMatrix3::exp(&tangent);
                assert_relative_eq!(sim.to_homogeneous(), expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn sim3_log_inverts_exp() {
        let tangent = SVector::<f64, 7>::from_column_slice(&[0.3, 1.1, -0.4, -0.6, 0.2, 0.8, 0.45]);
        let sim = SimilarityMatrix3::exp(&tangent);
        assert_relative_eq!(sim3_log(&sim), tangent, epsilon = 1e-10);
    }

    #[test]
    fn sim3_log_of_rounding_noise_vanishes() {
        let tangent = SVector::<f64, 7>::from_column_slice(&[0.7, -0.2, 1.5, 0.4, -0.9, 0.3, -0.3]);
        let sim = SimilarityMatrix3::exp(&tangent);
        let almost_identity = sim * sim.inverse();
        assert_relative_eq!(
            sim3_log(&almost_identity),
            SVector::<f64, 7>::zeros(),
            epsilon = 1e-14
        );
    }

    #[test]
    fn sim3_log_close_to_pi_round_trips() {
        let axis = Vector3::new(1.0, -2.0, 0.5).normalize();
        for angle in [core::f64::consts::PI - 1e-9, core::f64::consts::PI] {
            let mut tangent = SVector::<f64, 7>::zeros();
            tangent
                .fixed_rows_mut::<3>(0)
                .copy_from(&Vector3::new(0.3, 0.2, -0.4));
            tangent.fixed_rows_mut::<3>(3).copy_from(&(axis * angle));
            tangent[6] = 0.2;
            let sim = SimilarityMatrix3::exp(&tangent);
            let back = SimilarityMatrix3::exp(&sim3_log(&sim));
            assert_relative_eq!(back.to_homogeneous(), sim.to_homogeneous(), epsilon = 1e-12);
        }
    }

    #[test]
    fn transform_sim3_matches_homogeneous_matrix() {
        let tangent = SVector::<f64, 7>::from_column_slice(&[0.3, 1.1, -0.4, -0.6, 0.2, 0.8, 0.45]);
        let sim = SimilarityMatrix3::exp(&tangent);
        let x = Vector3::new(1.0, -2.0, 0.5);
        let expected = sim.to_homogeneous() * x.push(1.0);
        assert_relative_eq!(transform_sim3(&sim, &x), expected.xyz(), epsilon = 1e-12);
    }

    #[test]
    fn se2_exp_small_angle_is_continuous() {
        let a = IsometryMatrix2::exp(&Vector3::new(0.5, -0.2, 0.99 * SMALL_ANGLE));
        let b = IsometryMatrix2::exp(&Vector3::new(0.5, -0.2, 1.01 * SMALL_ANGLE));
        assert_relative_eq!(
            a.translation.vector,
            b.translation.vector,
            epsilon = 1e-6
        );
    }

    #[test]
    fn se2_exp_pure_rotation_about_origin() {
        let pose = IsometryMatrix2::exp(&Vector3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(pose.translation.vector, Vector2::zeros());
        assert_relative_eq!(pose.rotation.angle(), 1.0);
    }

    #[test]
    fn negative_scale_has_no_logarithm() {
        let sim = SimilarityMatrix3::from_scaling(-2.0);
        assert_eq!(try_sim3_log(&sim), Err(Error::NonPositiveScale(-2.0)));
    }

    #[test]
    fn perturb_is_left_multiplication() {
        let pose = IsometryMatrix3::exp(&Vector6::new(1.0, 2.0, 3.0, 0.1, 0.2, 0.3));
        let delta = Vector6::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.5);
        let perturbed = pose.perturb(&delta);
        assert_relative_eq!(
            perturbed.translation.vector,
            Rotation3::from_scaled_axis(Vector3::z() * 0.5) * pose.translation.vector,
            epsilon = 1e-12
        );
    }
}
