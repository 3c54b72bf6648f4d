//! This crate plugs into `rv-core` and provides linear pinhole camera models for the
//! projective observation models of `rv-residual`.
//!
//! A camera here only ever sees normalized image coordinates, the point `(x/z, y/z)`
//! on the virtual image plane at depth `1.0`. [`ProjectionModel::map`] takes those
//! into pixels and [`ProjectionModel::jacobian`] is its derivative, which the
//! observation models chain onto the derivative of the projection.

use rv_core::nalgebra::{Matrix2, Matrix3, Point2, Vector2};
use rv_core::{Error, ProjectionModel, Result};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// For a high quality camera, this may be sufficient to map normalized image coordinates
/// to pixels. Otherwise see [`CameraIntrinsicsK1Distortion`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::identity()
    }
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    /// This would imply that the pixel positions have an origin at `0,0`,
    /// the pixel distance unit is the focal length, pixels are square,
    /// and there is no skew.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    /// Creates camera intrinsics from calibration data, rejecting focal lengths that are
    /// not strictly positive and finite.
    ///
    /// ```
    /// use rv_pinhole::CameraIntrinsics;
    /// use rv_core::nalgebra::{Point2, Vector2};
    /// assert!(CameraIntrinsics::try_new(Vector2::new(500.0, 500.0), Point2::new(320.0, 240.0), 0.0).is_ok());
    /// assert!(CameraIntrinsics::try_new(Vector2::new(0.0, 500.0), Point2::new(320.0, 240.0), 0.0).is_err());
    /// ```
    pub fn try_new(focals: Vector2<f64>, principal_point: Point2<f64>, skew: f64) -> Result<Self> {
        let valid = |f: f64| f.is_finite() && f > 0.0;
        if !valid(focals.x) || !valid(focals.y) {
            log::debug!("rejecting camera intrinsics with focals {:?}", focals);
            return Err(Error::InvalidIntrinsics {
                fx: focals.x,
                fy: focals.y,
            });
        }
        Ok(Self {
            focals,
            principal_point,
            skew,
        })
    }

    #[must_use]
    pub fn focals(self, focals: Vector2<f64>) -> Self {
        Self { focals, ..self }
    }

    #[must_use]
    pub fn focal(self, focal: f64) -> Self {
        Self {
            focals: Vector2::new(focal, focal),
            ..self
        }
    }

    #[must_use]
    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    #[must_use]
    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focals.x,  self.skew,      self.principal_point.x,
            0.0,            self.focals.y,  self.principal_point.y,
            0.0,            0.0,            1.0,
        )
    }

    /// Takes in a point from an image in pixel coordinates and
    /// converts it to normalized image coordinates.
    ///
    /// ```
    /// use rv_core::ProjectionModel;
    /// use rv_pinhole::CameraIntrinsics;
    /// use rv_core::nalgebra::{Vector2, Point2};
    /// let intrinsics = CameraIntrinsics {
    ///     focals: Vector2::new(800.0, 900.0),
    ///     principal_point: Point2::new(500.0, 600.0),
    ///     skew: 1.7,
    /// };
    /// let pixel = Vector2::new(471.0, 322.0);
    /// let normalized = intrinsics.unmap(&pixel);
    /// assert!((intrinsics.map(&normalized) - pixel).norm() < 1e-6);
    /// ```
    pub fn unmap(&self, pixel: &Vector2<f64>) -> Vector2<f64> {
        let centered = pixel - self.principal_point.coords;
        let y = centered.y / self.focals.y;
        let x = (centered.x - self.skew * y) / self.focals.x;
        Vector2::new(x, y)
    }
}

impl ProjectionModel for CameraIntrinsics {
    fn map(&self, normalized: &Vector2<f64>) -> Vector2<f64> {
        let y = normalized.y * self.focals.y;
        let x = normalized.x * self.focals.x + self.skew * normalized.y;
        Vector2::new(x, y) + self.principal_point.coords
    }

    fn jacobian(&self, _: &Vector2<f64>) -> Matrix2<f64> {
        Matrix2::new(self.focals.x, self.skew, 0.0, self.focals.y)
    }
}

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// This also applies one radial distortion coefficient (K1) before the linear
/// intrinsics: `p' = p (1 + k1 |p|²)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsicsK1Distortion {
    pub simple_intrinsics: CameraIntrinsics,
    pub k1: f64,
}

impl CameraIntrinsicsK1Distortion {
    /// Creates the camera intrinsics using simple intrinsics with no distortion and a K1 distortion coefficient.
    pub fn new(simple_intrinsics: CameraIntrinsics, k1: f64) -> Self {
        Self {
            simple_intrinsics,
            k1,
        }
    }

    fn distort(&self, normalized: &Vector2<f64>) -> Vector2<f64> {
        normalized * (1.0 + self.k1 * normalized.norm_squared())
    }
}

impl ProjectionModel for CameraIntrinsicsK1Distortion {
    fn map(&self, normalized: &Vector2<f64>) -> Vector2<f64> {
        self.simple_intrinsics.map(&self.distort(normalized))
    }

    fn jacobian(&self, normalized: &Vector2<f64>) -> Matrix2<f64> {
        let r2 = normalized.norm_squared();
        let distortion = Matrix2::identity() * (1.0 + self.k1 * r2)
            + 2.0 * self.k1 * normalized * normalized.transpose();
        self.simple_intrinsics.jacobian(normalized) * distortion
    }
}
