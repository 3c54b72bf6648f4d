//! Jacobians that carry the derivative of the logarithm, taken with respect to the entries
//! `[vec(R); t]` of a rigid transform, back onto the tangent space of its arguments.

use rv_core::kron;
use rv_core::nalgebra::{IsometryMatrix3, Matrix3, RowVector3, SMatrix, Vector3};

/// `∂(exp(δ) T)/∂δ` at `δ = 0`, flattened as `[vec(R); t]` against `δ = [υ; ω]`.
pub fn dexp_x_t_ddelta(pose: &IsometryMatrix3<f64>) -> SMatrix<f64, 12, 6> {
    let r = pose.rotation.matrix();
    let t = &pose.translation.vector;
    let mut jac = SMatrix::<f64, 12, 6>::zeros();
    for k in 0..3 {
        jac.fixed_slice_mut::<3, 3>(3 * k, 3)
            .copy_from(&(-r.column(k).cross_matrix()));
    }
    jac.fixed_slice_mut::<3, 3>(9, 3)
        .copy_from(&(-t.cross_matrix()));
    jac.fixed_slice_mut::<3, 3>(9, 0)
        .copy_from(&Matrix3::identity());
    jac
}

/// `∂D/∂T1` for `D = C T1 T2⁻¹`, both flattened as `[vec(R); t]`.
///
/// `D` is linear in `T1`, so this does not depend on it.
pub fn ddiff_dt1(c: &IsometryMatrix3<f64>, t2: &IsometryMatrix3<f64>) -> SMatrix<f64, 12, 12> {
    let rc = c.rotation.matrix();
    let r2 = t2.rotation.matrix();
    let t2_inv: RowVector3<f64> = -(r2.transpose() * t2.translation.vector).transpose();

    let mut jac = SMatrix::<f64, 12, 12>::zeros();
    jac.fixed_slice_mut::<9, 9>(0, 0)
        .copy_from(&kron::<3, 3, 3, 3, 9, 9>(r2, rc));
    jac.fixed_slice_mut::<3, 9>(9, 0)
        .copy_from(&kron::<1, 3, 3, 3, 3, 9>(&t2_inv, rc));
    jac.fixed_slice_mut::<3, 3>(9, 9).copy_from(rc);
    jac
}

/// `∂D/∂T2` for `D = C T1 T2⁻¹`, both flattened as `[vec(R); t]`.
pub fn ddiff_dt2(
    t1: &IsometryMatrix3<f64>,
    c: &IsometryMatrix3<f64>,
    t2: &IsometryMatrix3<f64>,
) -> SMatrix<f64, 12, 12> {
    let rc_r1 = c.rotation.matrix() * t1.rotation.matrix();
    let neg_t2: RowVector3<f64> = -t2.translation.vector.transpose();
    let identity = Matrix3::identity();

    let mut jac = SMatrix::<f64, 12, 12>::zeros();
    for k in 0..3 {
        let column: Vector3<f64> = rc_r1.column(k).into_owned();
        jac.fixed_slice_mut::<9, 3>(0, 3 * k)
            .copy_from(&kron::<3, 3, 3, 1, 9, 3>(&identity, &column));
        jac.fixed_slice_mut::<3, 3>(9, 3 * k)
            .copy_from(&kron::<1, 3, 3, 1, 3, 3>(&neg_t2, &column));
    }
    jac.fixed_slice_mut::<3, 3>(9, 9)
        .copy_from(&(-rc_r1 * t2.rotation.matrix().transpose()));
    jac
}

/// Flattens a rigid transform as `[vec(R); t]`.
pub fn flatten(pose: &IsometryMatrix3<f64>) -> SMatrix<f64, 12, 1> {
    let mut flat = SMatrix::<f64, 12, 1>::zeros();
    flat.fixed_rows_mut::<9>(0)
        .copy_from_slice(pose.rotation.matrix().as_slice());
    flat.fixed_rows_mut::<3>(9)
        .copy_from(&pose.translation.vector);
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rv_core::nalgebra::Vector6;
    use rv_core::LieGroup;

    fn poses() -> [IsometryMatrix3<f64>; 3] {
        [
            IsometryMatrix3::exp(&Vector6::new(0.3, -0.2, 1.0, 0.1, 0.5, -0.3)),
            IsometryMatrix3::exp(&Vector6::new(-1.0, 0.4, 0.2, -0.6, 0.2, 0.7)),
            IsometryMatrix3::exp(&Vector6::new(0.8, 0.0, -0.5, 0.3, -0.4, 0.1)),
        ]
    }

    fn relative(
        t1: &IsometryMatrix3<f64>,
        c: &IsometryMatrix3<f64>,
        t2: &IsometryMatrix3<f64>,
    ) -> SMatrix<f64, 12, 1> {
        flatten(&(c * t1 * t2.inverse()))
    }

    #[test]
    fn dexp_matches_central_difference() {
        let [pose, _, _] = poses();
        let h = 1e-6;
        let mut numeric = SMatrix::<f64, 12, 6>::zeros();
        for i in 0..6 {
            let mut delta = Vector6::zeros();
            delta[i] = h;
            numeric.set_column(
                i,
                &((flatten(&pose.perturb(&delta)) - flatten(&pose.perturb(&-delta))) / (2.0 * h)),
            );
        }
        assert_relative_eq!(dexp_x_t_ddelta(&pose), numeric, epsilon = 1e-8);
    }

    #[test]
    fn ddiff_is_linear_in_each_argument() {
        let [t1, c, t2] = poses();
        let delta = Vector6::new(0.01, -0.02, 0.03, 0.02, 0.01, -0.01);

        let t1p = t1.perturb(&delta);
        let predicted =
            relative(&t1, &c, &t2) + ddiff_dt1(&c, &t2) * (flatten(&t1p) - flatten(&t1));
        assert_relative_eq!(predicted, relative(&t1p, &c, &t2), epsilon = 1e-12);

        // T2 enters through its inverse, so only the first order agrees.
        let h = 1e-6;
        let dt2 = dexp_x_t_ddelta(&t2) * (h * delta);
        let t2p = t2.perturb(&(h * delta));
        let predicted = relative(&t1, &c, &t2) + ddiff_dt2(&t1, &c, &t2) * dt2;
        assert_relative_eq!(predicted, relative(&t1, &c, &t2p), epsilon = 1e-10);
    }
}
