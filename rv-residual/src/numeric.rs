use num_traits::Float;
use rv_core::nalgebra::{SMatrix, SVector};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Forward-difference Jacobian of `f` at `x` along the local perturbations of `add`.
///
/// Column `i` is `(f(add(x, step eᵢ)) - f(x)) / step`. This performs `DOF + 1`
/// evaluations of `f` and always terminates.
pub fn numerical_jacobian<X, const DOF: usize, const M: usize>(
    x: &X,
    step: f64,
    f: impl Fn(&X) -> SVector<f64, M>,
    add: impl Fn(&X, &SVector<f64, DOF>) -> X,
) -> SMatrix<f64, M, DOF> {
    let base = f(x);
    let mut jac = SMatrix::<f64, M, DOF>::zeros();
    for i in 0..DOF {
        let mut delta = SVector::<f64, DOF>::zeros();
        delta[i] = step;
        jac.set_column(i, &((f(&add(x, &delta)) - base) / step));
    }
    jac
}

fn default_step() -> f64 {
    Float::sqrt(f64::epsilon())
}

/// Settings of the numerical differentiation the residual models fall back on.
///
/// The default step is `√ε`, which balances truncation against rounding error for
/// forward differences in `f64`. Use [`NumericDiff::step`] to change it, for instance
/// to a larger value when the residual is evaluated with reduced precision.
///
/// ```
/// use rv_residual::NumericDiff;
/// let diff = NumericDiff::default().step(1e-12);
/// assert_eq!(diff.step, 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub struct NumericDiff {
    /// The length of the perturbation along each tangent axis.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_step"))]
    pub step: f64,
}

impl NumericDiff {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn step(self, step: f64) -> Self {
        Self { step }
    }

    /// See [`numerical_jacobian`].
    pub fn jacobian<X, const DOF: usize, const M: usize>(
        &self,
        x: &X,
        f: impl Fn(&X) -> SVector<f64, M>,
        add: impl Fn(&X, &SVector<f64, DOF>) -> X,
    ) -> SMatrix<f64, M, DOF> {
        log::trace!(
            "numerical {}x{} jacobian with step {:e}",
            M,
            DOF,
            self.step
        );
        numerical_jacobian(x, self.step, f, add)
    }
}

impl Default for NumericDiff {
    fn default() -> Self {
        Self {
            step: default_step(),
        }
    }
}
