//! The logarithm of SO(3) and SE(3) and its derivative with respect to the group element.
//!
//! Rigid transforms are handled as the raw pair `(R, t)` so that the derivatives can be
//! taken with respect to the twelve entries of the transform. Matrices are flattened
//! column-major, so column `i + 3 j` of a `3×9` derivative belongs to `R[(i, j)]`, and the
//! translation follows the rotation in the `12` columns of [`dln_t_dt`].

use rv_core::nalgebra::{IsometryMatrix3, Matrix3, SMatrix, Vector3, Vector6};
use rv_core::{so3_log, vee_asym, Skew3, LOG_NEAR_IDENTITY};

/// Everything the logarithm of a rotation and its derivatives share.
///
/// With `d = (trace(R) - 1) / 2 = cos θ` and `u = vee(R - Rᵀ) = 2 sin θ a`:
///
/// ```text
/// ω    = f u,                    f = θ / (2 sin θ)
/// V⁻¹  = I - ½ Ω + c Ω²,         c = (1 - (θ/2) cot(θ/2)) / θ²
/// ```
#[derive(Debug, Clone, Copy)]
struct AngleTerms {
    u: Vector3<f64>,
    omega: Vector3<f64>,
    f: f64,
    /// `∂f/∂d`
    df: f64,
    c: f64,
    /// `∂c/∂d`
    dc: f64,
}

impl AngleTerms {
    fn new(r: &Matrix3<f64>) -> Self {
        let d = ((r.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
        let u = vee_asym(r);
        let omega = so3_log(r);

        if d > LOG_NEAR_IDENTITY {
            return Self {
                u,
                omega,
                f: 0.5,
                df: -1.0 / 6.0,
                c: 1.0 / 12.0,
                dc: -1.0 / 360.0,
            };
        }

        let s = (1.0 - d * d).sqrt();
        // The coefficients are functions of d alone, matching their derivatives.
        let theta = if d < -LOG_NEAR_IDENTITY {
            (0.5 * u.norm()).atan2(d)
        } else {
            d.acos()
        };
        let f = theta / (2.0 * s);
        let df = (d * theta - s) / (2.0 * s * s * s);

        let half_cot = 0.5 / (0.5 * theta).tan();
        let h = theta * half_cot;
        let c = (1.0 - h) / (theta * theta);
        let sin_half = (0.5 * theta).sin();
        let dh = half_cot - 0.25 * theta / (sin_half * sin_half);
        let dc_dtheta = -dh / (theta * theta) - 2.0 * (1.0 - h) / (theta * theta * theta);

        Self {
            u,
            omega,
            f,
            df,
            c,
            dc: -dc_dtheta / s,
        }
    }

    /// `c f²`, the coefficient of `u × (u × t)` in `V⁻¹ t`.
    fn g(&self) -> f64 {
        self.c * self.f * self.f
    }

    /// `∂g/∂d`
    fn dg(&self) -> f64 {
        self.dc * self.f * self.f + 2.0 * self.c * self.f * self.df
    }

    fn v_inv(&self) -> Matrix3<f64> {
        let omega = Skew3(self.omega);
        Matrix3::identity() - 0.5 * omega.hat() + self.c * omega.hat2()
    }
}

/// Spreads the derivative of a function of `(d, u)` over the entries of `R`.
///
/// `diag` is the derivative through `d` (already scaled by `∂d/∂R_ii = ½`) and `m`
/// is the derivative with respect to `u`.
fn chain(diag: &Vector3<f64>, m: &Matrix3<f64>) -> SMatrix<f64, 3, 9> {
    let mut jac = SMatrix::<f64, 3, 9>::zeros();
    for k in [0, 4, 8] {
        jac.set_column(k, diag);
    }
    jac.set_column(1, &m.column(2));
    jac.set_column(2, &(-m.column(1)));
    jac.set_column(3, &(-m.column(2)));
    jac.set_column(5, &m.column(0));
    jac.set_column(6, &m.column(1));
    jac.set_column(7, &(-m.column(0)));
    jac
}

fn dln_r_dr_terms(terms: &AngleTerms) -> SMatrix<f64, 3, 9> {
    chain(
        &(0.5 * terms.df * terms.u),
        &(Matrix3::identity() * terms.f),
    )
}

fn dvinv_t_dr_terms(terms: &AngleTerms, t: &Vector3<f64>) -> SMatrix<f64, 3, 9> {
    let u = &terms.u;
    let u_x_t = u.cross(t);
    let u_x_u_x_t = u.cross(&u_x_t);
    let g = terms.g();
    let diag = 0.5 * (-0.5 * terms.df * u_x_t + terms.dg() * u_x_u_x_t);
    let m = 0.5 * terms.f * t.cross_matrix()
        + g * (Matrix3::identity() * u.dot(t) + u * t.transpose() - 2.0 * t * u.transpose());
    chain(&diag, &m)
}

/// The logarithm of a rotation matrix, its scaled axis `ω`.
///
/// Rotations within `acos(0.99999)` of the identity use `θ / (2 sin θ) = ½`.
pub fn ln_so3(r: &Matrix3<f64>) -> Vector3<f64> {
    so3_log(r)
}

/// The pseudo-logarithm of a rigid transform that leaves the translation untouched: `[t; ln(R)]`.
pub fn ln_so3xr3(pose: &IsometryMatrix3<f64>) -> Vector6<f64> {
    let mut tangent = Vector6::zeros();
    tangent
        .fixed_rows_mut::<3>(0)
        .copy_from(&pose.translation.vector);
    tangent
        .fixed_rows_mut::<3>(3)
        .copy_from(&ln_so3(pose.rotation.matrix()));
    tangent
}

/// The logarithm of the rigid transform `(R, t)`: `[V⁻¹ t; ω]`.
///
/// This inverts [`LieGroup::exp`](rv_core::LieGroup::exp) for
/// [`IsometryMatrix3`] up to rotations of `π`.
pub fn ln(r: &Matrix3<f64>, t: &Vector3<f64>) -> Vector6<f64> {
    let terms = AngleTerms::new(r);
    let mut tangent = Vector6::zeros();
    tangent
        .fixed_rows_mut::<3>(0)
        .copy_from(&(terms.v_inv() * t));
    tangent.fixed_rows_mut::<3>(3).copy_from(&terms.omega);
    tangent
}

pub fn ln_se3(pose: &IsometryMatrix3<f64>) -> Vector6<f64> {
    ln(pose.rotation.matrix(), &pose.translation.vector)
}

/// `∂ln(R)/∂R`, a `3×9` matrix over the column-major entries of `R`.
pub fn dln_r_dr(r: &Matrix3<f64>) -> SMatrix<f64, 3, 9> {
    dln_r_dr_terms(&AngleTerms::new(r))
}

/// `∂(V⁻¹ t)/∂R` with `t` held fixed.
pub fn dvinv_t_dr(r: &Matrix3<f64>, t: &Vector3<f64>) -> SMatrix<f64, 3, 9> {
    dvinv_t_dr_terms(&AngleTerms::new(r), t)
}

/// `∂ln(T)/∂T`, the `6×12` derivative of [`ln`] with respect to `[vec(R); t]`.
///
/// The derivative does not exist for rotations of exactly `π`.
pub fn dln_t_dt(r: &Matrix3<f64>, t: &Vector3<f64>) -> SMatrix<f64, 6, 12> {
    let terms = AngleTerms::new(r);
    let mut jac = SMatrix::<f64, 6, 12>::zeros();
    jac.fixed_slice_mut::<3, 9>(0, 0)
        .copy_from(&dvinv_t_dr_terms(&terms, t));
    jac.fixed_slice_mut::<3, 3>(0, 9).copy_from(&terms.v_inv());
    jac.fixed_slice_mut::<3, 9>(3, 0)
        .copy_from(&dln_r_dr_terms(&terms));
    jac
}
