use nalgebra::{Matrix2, Vector2, Vector3};

/// Maps normalized image coordinates (a ray projected onto the plane `z = 1`)
/// into pixel coordinates.
///
/// The projective observation models take one of these by value at construction.
/// Implementations are expected to be immutable calibration data so that
/// residuals can be evaluated from several threads at once.
pub trait ProjectionModel {
    /// Maps the normalized image coordinates `(x/z, y/z)` to a pixel.
    fn map(&self, normalized: &Vector2<f64>) -> Vector2<f64>;

    /// The Jacobian of [`ProjectionModel::map`] at `normalized`.
    ///
    /// For a linear camera this does not depend on `normalized`.
    fn jacobian(&self, normalized: &Vector2<f64>) -> Matrix2<f64>;
}

impl<P: ProjectionModel + ?Sized> ProjectionModel for &P {
    fn map(&self, normalized: &Vector2<f64>) -> Vector2<f64> {
        (**self).map(normalized)
    }

    fn jacobian(&self, normalized: &Vector2<f64>) -> Matrix2<f64> {
        (**self).jacobian(normalized)
    }
}

/// Divides by the last coordinate: `(x/z, y/z)`.
///
/// Points on the plane `z = 0` produce non-finite output; callers must keep
/// them away from the projection.
pub fn project(point: &Vector3<f64>) -> Vector2<f64> {
    point.xy() / point.z
}
