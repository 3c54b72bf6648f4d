use crate::NumericDiff;
use rv_core::nalgebra::{
    IsometryMatrix2, IsometryMatrix3, Matrix2x3, SMatrix, SVector, Vector1, Vector2, Vector3,
};
use rv_core::{project, transform_se2, transform_se3, IdObsLambda, LieGroup, ProjectionModel};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A measurement function `map(frame, point) -> observation` of a point seen from a pose.
///
/// * `FRAME_DOF` - degrees of freedom of [`Prediction::Frame`]
/// * `POINT_PARS` - number of parameters of a point
/// * `POINT_DOF` - degrees of freedom of a point, the dimension of its perturbation
/// * `OBS_DIM` - dimension of an observation
///
/// Only [`Prediction::map`] and [`Prediction::add_point`] are required. The Jacobians
/// default to forward differences along [`Prediction::add_frame`] and
/// [`Prediction::add_point`] and should be overridden where a closed form exists.
/// The differentiated versions stay reachable through [`Prediction::numeric_frame_jacobian`]
/// and [`Prediction::numeric_point_jacobian`].
pub trait Prediction<
    const FRAME_DOF: usize,
    const POINT_PARS: usize,
    const POINT_DOF: usize,
    const OBS_DIM: usize,
>
{
    type Frame: LieGroup<FRAME_DOF>;

    /// Predicts the observation of `point` from `frame`.
    fn map(&self, frame: &Self::Frame, point: &SVector<f64, POINT_PARS>) -> SVector<f64, OBS_DIM>;

    /// Applies a local perturbation to a point.
    fn add_point(
        &self,
        point: &SVector<f64, POINT_PARS>,
        delta: &SVector<f64, POINT_DOF>,
    ) -> SVector<f64, POINT_PARS>;

    /// Applies a local perturbation to a frame, `exp(delta) * frame` unless overridden.
    fn add_frame(&self, frame: &Self::Frame, delta: &SVector<f64, FRAME_DOF>) -> Self::Frame {
        frame.perturb(delta)
    }

    /// The settings of the fallback Jacobians.
    fn numeric_diff(&self) -> NumericDiff {
        NumericDiff::default()
    }

    /// `∂map/∂frame` with respect to [`Prediction::add_frame`].
    fn frame_jacobian(
        &self,
        frame: &Self::Frame,
        point: &SVector<f64, POINT_PARS>,
    ) -> SMatrix<f64, OBS_DIM, FRAME_DOF> {
        self.numeric_frame_jacobian(frame, point)
    }

    /// `∂map/∂point` with respect to [`Prediction::add_point`].
    fn point_jacobian(
        &self,
        frame: &Self::Frame,
        point: &SVector<f64, POINT_PARS>,
    ) -> SMatrix<f64, OBS_DIM, POINT_DOF> {
        self.numeric_point_jacobian(frame, point)
    }

    fn numeric_frame_jacobian(
        &self,
        frame: &Self::Frame,
        point: &SVector<f64, POINT_PARS>,
    ) -> SMatrix<f64, OBS_DIM, FRAME_DOF> {
        self.numeric_diff().jacobian(
            frame,
            |frame| self.map(frame, point),
            |frame, delta| self.add_frame(frame, delta),
        )
    }

    fn numeric_point_jacobian(
        &self,
        frame: &Self::Frame,
        point: &SVector<f64, POINT_PARS>,
    ) -> SMatrix<f64, OBS_DIM, POINT_DOF> {
        self.numeric_diff().jacobian(
            point,
            |point| self.map(frame, point),
            |point, delta| self.add_point(point, delta),
        )
    }

    /// `obs - map(frame, point)`
    fn residual(
        &self,
        frame: &Self::Frame,
        point: &SVector<f64, POINT_PARS>,
        obs: &SVector<f64, OBS_DIM>,
    ) -> SVector<f64, OBS_DIM> {
        obs - self.map(frame, point)
    }

    /// The squared Mahalanobis norm of the residual of `obs` under its information matrix.
    fn chi2(
        &self,
        frame: &Self::Frame,
        point: &SVector<f64, POINT_PARS>,
        obs: &IdObsLambda<OBS_DIM>,
    ) -> f64 {
        obs.chi2(&self.residual(frame, point, &obs.obs))
    }

    fn first_rot_id() -> usize {
        <Self::Frame as LieGroup<FRAME_DOF>>::FIRST_ROT_ID
    }

    fn num_rot_pars() -> usize {
        <Self::Frame as LieGroup<FRAME_DOF>>::NUM_ROT_PARS
    }

    fn first_trans_id() -> usize {
        <Self::Frame as LieGroup<FRAME_DOF>>::FIRST_TRANS_ID
    }

    fn num_trans_pars() -> usize {
        <Self::Frame as LieGroup<FRAME_DOF>>::NUM_TRANS_PARS
    }
}

/// `∂project(exp(δ) x)/∂δ` at `δ = 0` for a point `x` already in the camera frame.
#[rustfmt::skip]
fn projection_frame_jacobian(x: &Vector3<f64>) -> SMatrix<f64, 2, 6> {
    let (x, y, z) = (x.x, x.y, x.z);
    let z_2 = z * z;
    SMatrix::<f64, 2, 6>::from_row_slice(&[
        1.0 / z, 0.0,     -x / z_2, -x * y / z_2,        1.0 + x * x / z_2, -y / z,
        0.0,     1.0 / z, -y / z_2, -(1.0 + y * y / z_2), x * y / z_2,        x / z,
    ])
}

/// `∂project(x)/∂x` without the leading `1 / z`.
#[rustfmt::skip]
fn projection_direction(x: &Vector3<f64>) -> Matrix2x3<f64> {
    Matrix2x3::new(
        1.0, 0.0, -x.x / x.z,
        0.0, 1.0, -x.y / x.z,
    )
}

/// A planar point observed by the ratio `x / y` of its coordinates in a 2d frame.
///
/// Both Jacobians are computed numerically.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Se2Xy {
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub differentiation: NumericDiff,
}

impl Se2Xy {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn differentiation(self, differentiation: NumericDiff) -> Self {
        Self { differentiation }
    }
}

impl Prediction<3, 2, 2, 1> for Se2Xy {
    type Frame = IsometryMatrix2<f64>;

    fn map(&self, frame: &IsometryMatrix2<f64>, point: &Vector2<f64>) -> Vector1<f64> {
        let x = transform_se2(frame, point);
        Vector1::new(x.x / x.y)
    }

    fn add_point(&self, point: &Vector2<f64>, delta: &Vector2<f64>) -> Vector2<f64> {
        point + delta
    }

    fn numeric_diff(&self) -> NumericDiff {
        self.differentiation
    }
}

/// A Euclidean 3d point observed through the camera `P`.
///
/// Points on the plane `z = 0` of the camera must be kept out by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Se3Xyz<P> {
    pub camera: P,
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub differentiation: NumericDiff,
}

impl<P> Se3Xyz<P> {
    pub fn new(camera: P) -> Self {
        Self {
            camera,
            differentiation: NumericDiff::default(),
        }
    }

    #[must_use]
    pub fn differentiation(self, differentiation: NumericDiff) -> Self {
        Self {
            differentiation,
            ..self
        }
    }
}

impl<P: ProjectionModel> Prediction<6, 3, 3, 2> for Se3Xyz<P> {
    type Frame = IsometryMatrix3<f64>;

    fn map(&self, frame: &IsometryMatrix3<f64>, point: &Vector3<f64>) -> Vector2<f64> {
        self.camera.map(&project(&transform_se3(frame, point)))
    }

    fn add_point(&self, point: &Vector3<f64>, delta: &Vector3<f64>) -> Vector3<f64> {
        point + delta
    }

    fn numeric_diff(&self) -> NumericDiff {
        self.differentiation
    }

    fn frame_jacobian(
        &self,
        frame: &IsometryMatrix3<f64>,
        point: &Vector3<f64>,
    ) -> SMatrix<f64, 2, 6> {
        let x = transform_se3(frame, point);
        self.camera.jacobian(&project(&x)) * projection_frame_jacobian(&x)
    }

    fn point_jacobian(
        &self,
        frame: &IsometryMatrix3<f64>,
        point: &Vector3<f64>,
    ) -> Matrix2x3<f64> {
        let x = transform_se3(frame, point);
        let jac = projection_direction(&x) * frame.rotation.matrix() / x.z;
        self.camera.jacobian(&project(&x)) * jac
    }
}

/// A 3d point in inverse depth coordinates `(u, v, q)`, the Euclidean point `(u, v, 1) / q`,
/// observed through the camera `P`.
///
/// The inverse depth `q` must not vanish.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Se3Uvq<P> {
    pub camera: P,
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub differentiation: NumericDiff,
}

impl<P> Se3Uvq<P> {
    pub fn new(camera: P) -> Self {
        Self {
            camera,
            differentiation: NumericDiff::default(),
        }
    }

    #[must_use]
    pub fn differentiation(self, differentiation: NumericDiff) -> Self {
        Self {
            differentiation,
            ..self
        }
    }

    /// The Euclidean point `(u, v, 1) / q`.
    pub fn euclidean(uvq: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(uvq.x, uvq.y, 1.0) / uvq.z
    }
}

impl<P: ProjectionModel> Prediction<6, 3, 3, 2> for Se3Uvq<P> {
    type Frame = IsometryMatrix3<f64>;

    fn map(&self, frame: &IsometryMatrix3<f64>, uvq: &Vector3<f64>) -> Vector2<f64> {
        let x = transform_se3(frame, &Self::euclidean(uvq));
        self.camera.map(&project(&x))
    }

    fn add_point(&self, uvq: &Vector3<f64>, delta: &Vector3<f64>) -> Vector3<f64> {
        uvq + delta
    }

    fn numeric_diff(&self) -> NumericDiff {
        self.differentiation
    }

    fn frame_jacobian(
        &self,
        frame: &IsometryMatrix3<f64>,
        uvq: &Vector3<f64>,
    ) -> SMatrix<f64, 2, 6> {
        let x = transform_se3(frame, &Self::euclidean(uvq));
        self.camera.jacobian(&project(&x)) * projection_frame_jacobian(&x)
    }

    fn point_jacobian(
        &self,
        frame: &IsometryMatrix3<f64>,
        uvq: &Vector3<f64>,
    ) -> Matrix2x3<f64> {
        let x = transform_se3(frame, &Self::euclidean(uvq));
        let r = frame.rotation.matrix();
        // project() ignores the scale 1/q, leaving R₀ u + R₁ v + t q.
        let mut r01t = *r;
        r01t.set_column(2, &frame.translation.vector);
        let jac = projection_direction(&x) * r01t / (x.z * uvq.z);
        self.camera.jacobian(&project(&x)) * jac
    }
}
