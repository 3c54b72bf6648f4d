use crate::{Error, Result};
use nalgebra::{SMatrix, SVector};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A measurement of point `point_id` taken from frame `frame_id`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct IdObs<const D: usize> {
    pub point_id: usize,
    pub frame_id: usize,
    pub obs: SVector<f64, D>,
}

impl<const D: usize> IdObs<D> {
    pub fn new(point_id: usize, frame_id: usize, obs: SVector<f64, D>) -> Self {
        Self {
            point_id,
            frame_id,
            obs,
        }
    }
}

/// An [`IdObs`] with its inverse uncertainty (information matrix) `lambda`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct IdObsLambda<const D: usize> {
    pub point_id: usize,
    pub frame_id: usize,
    pub obs: SVector<f64, D>,
    pub lambda: SMatrix<f64, D, D>,
}

impl<const D: usize> IdObsLambda<D> {
    pub fn new(
        point_id: usize,
        frame_id: usize,
        obs: SVector<f64, D>,
        lambda: SMatrix<f64, D, D>,
    ) -> Self {
        Self {
            point_id,
            frame_id,
            obs,
            lambda,
        }
    }

    /// Builds the observation from a measurement covariance by inverting it.
    pub fn from_covariance(
        point_id: usize,
        frame_id: usize,
        obs: SVector<f64, D>,
        covariance: SMatrix<f64, D, D>,
    ) -> Result<Self> {
        let lambda = covariance.try_inverse().ok_or_else(|| {
            log::debug!(
                "covariance of observation (point {}, frame {}) is not invertible",
                point_id,
                frame_id
            );
            Error::SingularCovariance { dimension: D }
        })?;
        Ok(Self::new(point_id, frame_id, obs, lambda))
    }

    /// The squared Mahalanobis norm `rᵀ Λ r` of a residual of this observation.
    pub fn chi2(&self, residual: &SVector<f64, D>) -> f64 {
        residual.dot(&(self.lambda * residual))
    }

    /// Drops the uncertainty.
    pub fn id_obs(&self) -> IdObs<D> {
        IdObs::new(self.point_id, self.frame_id, self.obs)
    }
}

/// A measured relative transform between the absolute poses `frame_id1` and `frame_id2`
/// (a pose-graph edge).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct IdConstraint<T> {
    pub frame_id1: usize,
    pub frame_id2: usize,
    pub transform: T,
}

impl<T> IdConstraint<T> {
    pub fn new(frame_id1: usize, frame_id2: usize, transform: T) -> Self {
        Self {
            frame_id1,
            frame_id2,
            transform,
        }
    }
}
