//! # Robot Vision Core
//!
//! This library provides the common group, camera and measurement types that the
//! robot-vision estimation crates share. The crate is designed to be very small.
//! Anything that an optimizer backend needs to agree on with the residual models
//! (how a pose is perturbed, which slice of a tangent vector is rotational, what
//! an observation record looks like) lives here, while the residuals and their
//! Jacobians live in `rv-residual`.
//!
//! ## Groups and tangent vectors
//!
//! Poses are plain [`nalgebra`] values:
//!
//! * [`Rotation3`](nalgebra::Rotation3) - SO(3), 3 degrees of freedom
//! * [`IsometryMatrix2`](nalgebra::IsometryMatrix2) - SE(2), 3 degrees of freedom
//! * [`IsometryMatrix3`](nalgebra::IsometryMatrix3) - SE(3), 6 degrees of freedom
//! * [`SimilarityMatrix3`](nalgebra::SimilarityMatrix3) - Sim(3), 7 degrees of freedom
//!
//! [`LieGroup`] adds the exponential map to each of them. Every tangent vector in this
//! ecosystem is laid out with the translation components first, followed by the
//! rotation components and (for Sim(3)) the log of the scale:
//!
//! ```text
//! SE(2):  [ux, uy, theta]
//! SE(3):  [ux, uy, uz, wx, wy, wz]
//! Sim(3): [ux, uy, uz, wx, wy, wz, sigma]
//! ```
//!
//! A pose `T` is always perturbed on the left: `T' = exp(delta) * T`.

mod camera;
mod error;
mod group;
mod observation;
mod skew;

pub use camera::*;
pub use error::*;
pub use group::*;
pub use nalgebra;
pub use observation::*;
pub use skew::*;
