use crate::logmap::{dln_t_dt, ln_se3, ln_so3xr3};
use crate::perturbation::{ddiff_dt1, ddiff_dt2, dexp_x_t_ddelta};
use crate::NumericDiff;
use rv_core::nalgebra::{
    IsometryMatrix3, Rotation3, SMatrix, SVector, SimilarityMatrix3, Translation3, Vector6,
};
use rv_core::{sim3_log, LieGroup, Skew3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A residual between two absolute poses `T1`, `T2` and a measured relative transform `C`.
///
/// The residual is a tangent vector of `C T1 T2⁻¹`, which is the identity exactly when
/// `C = T2 T1⁻¹`. The Jacobians are taken with respect to [`Constraint::add`] and
/// default to forward differences, which remain reachable through
/// [`Constraint::numeric_d_diff_dt1`] and [`Constraint::numeric_d_diff_dt2`].
pub trait Constraint<const DOF: usize> {
    type Transform: LieGroup<DOF>;

    fn diff(
        &self,
        t1: &Self::Transform,
        c: &Self::Transform,
        t2: &Self::Transform,
    ) -> SVector<f64, DOF>;

    /// Applies a local perturbation, `exp(delta) * t` unless overridden.
    fn add(&self, t: &Self::Transform, delta: &SVector<f64, DOF>) -> Self::Transform {
        t.perturb(delta)
    }

    /// The settings of the fallback Jacobians.
    fn numeric_diff(&self) -> NumericDiff {
        NumericDiff::default()
    }

    fn d_diff_dt1(
        &self,
        t1: &Self::Transform,
        c: &Self::Transform,
        t2: &Self::Transform,
    ) -> SMatrix<f64, DOF, DOF> {
        self.numeric_d_diff_dt1(t1, c, t2)
    }

    fn d_diff_dt2(
        &self,
        t1: &Self::Transform,
        c: &Self::Transform,
        t2: &Self::Transform,
    ) -> SMatrix<f64, DOF, DOF> {
        self.numeric_d_diff_dt2(t1, c, t2)
    }

    fn numeric_d_diff_dt1(
        &self,
        t1: &Self::Transform,
        c: &Self::Transform,
        t2: &Self::Transform,
    ) -> SMatrix<f64, DOF, DOF> {
        self.numeric_diff().jacobian(
            t1,
            |t1| self.diff(t1, c, t2),
            |t, delta| self.add(t, delta),
        )
    }

    fn numeric_d_diff_dt2(
        &self,
        t1: &Self::Transform,
        c: &Self::Transform,
        t2: &Self::Transform,
    ) -> SMatrix<f64, DOF, DOF> {
        self.numeric_diff().jacobian(
            t2,
            |t2| self.diff(t1, c, t2),
            |t, delta| self.add(t, delta),
        )
    }
}

macro_rules! constraint_settings {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            #[must_use]
            pub fn differentiation(self, differentiation: NumericDiff) -> Self {
                Self { differentiation }
            }
        }
    };
}

/// A rigid transform constraint with residual `ln(C T1 T2⁻¹)` and closed-form Jacobians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Se3Constraint {
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub differentiation: NumericDiff,
}

constraint_settings!(Se3Constraint);

impl Constraint<6> for Se3Constraint {
    type Transform = IsometryMatrix3<f64>;

    fn diff(
        &self,
        t1: &IsometryMatrix3<f64>,
        c: &IsometryMatrix3<f64>,
        t2: &IsometryMatrix3<f64>,
    ) -> Vector6<f64> {
        ln_se3(&(c * t1 * t2.inverse()))
    }

    fn numeric_diff(&self) -> NumericDiff {
        self.differentiation
    }

    fn d_diff_dt1(
        &self,
        t1: &IsometryMatrix3<f64>,
        c: &IsometryMatrix3<f64>,
        t2: &IsometryMatrix3<f64>,
    ) -> SMatrix<f64, 6, 6> {
        let d = c * t1 * t2.inverse();
        dln_t_dt(d.rotation.matrix(), &d.translation.vector)
            * ddiff_dt1(c, t2)
            * dexp_x_t_ddelta(t1)
    }

    fn d_diff_dt2(
        &self,
        t1: &IsometryMatrix3<f64>,
        c: &IsometryMatrix3<f64>,
        t2: &IsometryMatrix3<f64>,
    ) -> SMatrix<f64, 6, 6> {
        let d = c * t1 * t2.inverse();
        dln_t_dt(d.rotation.matrix(), &d.translation.vector)
            * ddiff_dt2(t1, c, t2)
            * dexp_x_t_ddelta(t2)
    }
}

/// A rigid transform constraint on the split parameterization SO(3) x R³.
///
/// The residual is `[t; ln(R)]` of `C T1 T2⁻¹` and poses are perturbed by
/// `R' = exp(ω) R`, `t' = t + υ`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct So3xR3Constraint {
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub differentiation: NumericDiff,
}

constraint_settings!(So3xR3Constraint);

impl Constraint<6> for So3xR3Constraint {
    type Transform = IsometryMatrix3<f64>;

    fn diff(
        &self,
        t1: &IsometryMatrix3<f64>,
        c: &IsometryMatrix3<f64>,
        t2: &IsometryMatrix3<f64>,
    ) -> Vector6<f64> {
        ln_so3xr3(&(c * t1 * t2.inverse()))
    }

    fn add(&self, t: &IsometryMatrix3<f64>, delta: &Vector6<f64>) -> IsometryMatrix3<f64> {
        let rotation: Rotation3<f64> = Skew3(delta.fixed_rows::<3>(3).into_owned()).into();
        IsometryMatrix3::from_parts(
            Translation3::from(t.translation.vector + delta.fixed_rows::<3>(0)),
            rotation * t.rotation,
        )
    }

    fn numeric_diff(&self) -> NumericDiff {
        self.differentiation
    }
}

/// A rigid transform constraint with the residual of [`So3xR3Constraint`] but poses
/// perturbed on SE(3), `exp(δ) T`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Se3So3xR3Constraint {
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub differentiation: NumericDiff,
}

constraint_settings!(Se3So3xR3Constraint);

impl Constraint<6> for Se3So3xR3Constraint {
    type Transform = IsometryMatrix3<f64>;

    fn diff(
        &self,
        t1: &IsometryMatrix3<f64>,
        c: &IsometryMatrix3<f64>,
        t2: &IsometryMatrix3<f64>,
    ) -> Vector6<f64> {
        ln_so3xr3(&(c * t1 * t2.inverse()))
    }

    fn numeric_diff(&self) -> NumericDiff {
        self.differentiation
    }
}

/// A similarity transform constraint with residual `ln(C T1 T2⁻¹)` in Sim(3).
///
/// All scales must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Sim3Constraint {
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub differentiation: NumericDiff,
}

constraint_settings!(Sim3Constraint);

impl Constraint<7> for Sim3Constraint {
    type Transform = SimilarityMatrix3<f64>;

    fn diff(
        &self,
        t1: &SimilarityMatrix3<f64>,
        c: &SimilarityMatrix3<f64>,
        t2: &SimilarityMatrix3<f64>,
    ) -> SVector<f64, 7> {
        sim3_log(&(c * t1 * t2.inverse()))
    }

    fn numeric_diff(&self) -> NumericDiff {
        self.differentiation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rv_core::nalgebra::{Matrix6, Vector3};

    fn poses() -> [IsometryMatrix3<f64>; 3] {
        [
            IsometryMatrix3::exp(&Vector6::new(0.3, -0.2, 1.0, 0.1, 0.5, -0.3)),
            IsometryMatrix3::exp(&Vector6::new(-1.0, 0.4, 0.2, -0.6, 0.2, 0.7)),
            IsometryMatrix3::exp(&Vector6::new(0.8, 0.0, -0.5, 0.3, -0.4, 0.1)),
        ]
    }

    #[test]
    fn se3_jacobians_match_numeric() {
        let [t1, c, t2] = poses();
        let constraint = Se3Constraint::new();
        assert_relative_eq!(
            constraint.d_diff_dt1(&t1, &c, &t2),
            constraint.numeric_d_diff_dt1(&t1, &c, &t2),
            epsilon = 1e-6
        );
        assert_relative_eq!(
            constraint.d_diff_dt2(&t1, &c, &t2),
            constraint.numeric_d_diff_dt2(&t1, &c, &t2),
            epsilon = 1e-6
        );
    }

    #[test]
    fn se3_jacobians_at_satisfied_constraint() {
        let [t1, _, t2] = poses();
        let c = t2 * t1.inverse();
        let constraint = Se3Constraint::new();
        assert_relative_eq!(constraint.diff(&t1, &c, &t2), Vector6::zeros(), epsilon = 1e-12);
        assert_relative_eq!(
            constraint.d_diff_dt1(&t1, &c, &t2),
            constraint.numeric_d_diff_dt1(&t1, &c, &t2),
            epsilon = 1e-6
        );
    }

    #[test]
    fn split_add_moves_translation_directly() {
        let [t, _, _] = poses();
        let delta = Vector6::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0);
        let moved = So3xR3Constraint::new().add(&t, &delta);
        assert_relative_eq!(
            moved.translation.vector,
            t.translation.vector + Vector3::new(1.0, 2.0, 3.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(moved.rotation, t.rotation, epsilon = 1e-12);
    }

    #[test]
    fn split_jacobians_at_satisfied_constraint() {
        let [t1, _, t2] = poses();
        let c = t2 * t1.inverse();
        let constraint = So3xR3Constraint::new();
        let rc = c.rotation.matrix();
        let t2_hat = t2.translation.vector.cross_matrix();

        let mut expected_dt1 = Matrix6::zeros();
        expected_dt1.fixed_slice_mut::<3, 3>(0, 0).copy_from(rc);
        expected_dt1
            .fixed_slice_mut::<3, 3>(0, 3)
            .copy_from(&(t2_hat * rc));
        expected_dt1.fixed_slice_mut::<3, 3>(3, 3).copy_from(rc);
        assert_relative_eq!(
            constraint.d_diff_dt1(&t1, &c, &t2),
            expected_dt1,
            epsilon = 1e-6
        );

        let mut expected_dt2 = -Matrix6::identity();
        expected_dt2.fixed_slice_mut::<3, 3>(0, 3).copy_from(&(-t2_hat));
        assert_relative_eq!(
            constraint.d_diff_dt2(&t1, &c, &t2),
            expected_dt2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn split_residual_is_relative_translation() {
        let t1 =
            IsometryMatrix3::from_parts(Translation3::new(1.0, 2.0, 3.0), Rotation3::identity());
        let t2 = IsometryMatrix3::identity();
        let c = IsometryMatrix3::identity();
        assert_relative_eq!(
            Se3So3xR3Constraint::new().diff(&t1, &c, &t2),
            Vector6::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn sim3_residual_vanishes_when_satisfied() {
        let tangent = |v: [f64; 7]| SVector::<f64, 7>::from_column_slice(&v);
        let t1 = SimilarityMatrix3::exp(&tangent([0.3, 0.1, -0.2, 0.2, 0.1, 0.0, 0.3]));
        let t2 = SimilarityMatrix3::exp(&tangent([-0.5, 0.4, 1.0, -0.1, 0.3, 0.2, -0.2]));
        let c = t2 * t1.inverse();
        assert_relative_eq!(
            Sim3Constraint::new().diff(&t1, &c, &t2),
            SVector::<f64, 7>::zeros(),
            epsilon = 1e-10
        );
    }
}
