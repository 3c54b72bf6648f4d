//! # Robot Vision Residuals
//!
//! This crate provides the residual functions of bundle adjustment and pose-graph
//! optimization together with their Jacobians, built on the groups of `rv-core`. It
//! contains no optimizer. An optimizer holds the frames and points and asks a model for
//! residuals and Jacobians edge by edge.
//!
//! * [`Prediction`] - `map(frame, point) -> observation`, implemented by [`Se2Xy`],
//!   [`Se3Xyz`] and [`Se3Uvq`]
//! * [`Constraint`] - `diff(T1, C, T2) -> tangent`, implemented by [`Se3Constraint`],
//!   [`So3xR3Constraint`], [`Se3So3xR3Constraint`] and [`Sim3Constraint`]
//!
//! Every Jacobian is taken with respect to the local perturbation of its argument, which
//! for poses is `T' = exp(delta) * T` unless a model says otherwise. Models without a closed
//! form fall back on forward differences configured by [`NumericDiff`].
//!
//! The SE(3) logarithm in [`logmap`] and the chain-rule pieces in [`perturbation`] are public
//! so that other residuals over rigid transforms can be differentiated the same way.
//!
//! ```
//! use rv_core::nalgebra::{IsometryMatrix3, Vector2, Vector3};
//! use rv_pinhole::CameraIntrinsics;
//! use rv_residual::{Prediction, Se3Xyz};
//!
//! let model = Se3Xyz::new(CameraIntrinsics::identity().focal(500.0));
//! let frame = IsometryMatrix3::identity();
//! let point = Vector3::new(0.0, 0.0, 5.0);
//! assert_eq!(model.map(&frame, &point), Vector2::zeros());
//! let jacobian = model.frame_jacobian(&frame, &point);
//! assert!((jacobian[(0, 0)] - 100.0).abs() < 1e-12);
//! ```

mod constraint;
pub mod logmap;
mod numeric;
pub mod perturbation;
mod prediction;

pub use constraint::*;
pub use numeric::*;
pub use prediction::*;
