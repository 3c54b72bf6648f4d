//! # `rv`
//!
//! Batteries-included crate for the residuals of robot-vision least squares
//!
//! This crate gathers the robot-vision crates in one place for discoverability. It is
//! useful for tutorials and for quickly writing an optimizer against every model at once.
//! If you are making a production application, import the crates individually.
//! You can also disable default features on this crate and enable only the ones you want.
//!
//! All of the basic types (Lie groups, camera abstraction, observations) are included in
//! the root of the crate. The modules below come from optional crates.
//!
//! ## Modules
//! * [`camera`] - camera models that map normalized coordinates to pixels
//! * [`residual`] - observation models and pose constraints with their Jacobians
//!
//! ```
//! # #[cfg(all(feature = "rv-pinhole", feature = "rv-residual"))]
//! # {
//! use rv::camera::pinhole::CameraIntrinsics;
//! use rv::nalgebra::{IsometryMatrix3, Vector3};
//! use rv::residual::{Constraint, Prediction, Se3Constraint, Se3Xyz};
//!
//! let frame = IsometryMatrix3::identity();
//! let point = Vector3::new(0.5, -0.5, 4.0);
//! let model = Se3Xyz::new(CameraIntrinsics::identity().focal(400.0));
//! assert!(model.map(&frame, &point).norm() > 0.0);
//!
//! let constraint = Se3Constraint::new();
//! assert_eq!(constraint.diff(&frame, &frame, &frame).norm(), 0.0);
//! # }
//! ```

pub use rv_core::*;

/// Camera models
pub mod camera {
    /// The pinhole camera model
    #[cfg(feature = "rv-pinhole")]
    pub use rv_pinhole as pinhole;
}

/// Residuals and Jacobians for bundle adjustment and pose graphs
pub mod residual {
    #[cfg(feature = "rv-residual")]
    pub use rv_residual::*;
}
