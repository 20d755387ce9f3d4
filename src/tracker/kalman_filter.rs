//! Constant-velocity Kalman filter over the puck center, using nalgebra fixed-size matrices.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

/// State mean `(x, y, vx, vy)`.
pub type StateMean = Vector4<f64>;
/// State covariance (4x4).
pub type StateCovariance = Matrix4<f64>;

/// Stateless filter: the tracker owns the mean and covariance and threads
/// them through `initiate`, `predict` and `update`.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Matrix4<f64>,
    update_mat: Matrix2x4<f64>,
    process_noise: Matrix4<f64>,
    measurement_noise: Matrix2<f64>,
    initial_covariance: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(10.0, 0.1, 1.0)
    }
}

impl KalmanFilter {
    /// `measurement_noise` and `process_noise` scale identity matrices (R and Q);
    /// `initial_covariance` scales the identity covariance assigned by `initiate`.
    pub fn new(measurement_noise: f64, process_noise: f64, initial_covariance: f64) -> Self {
        #[rustfmt::skip]
        let motion_mat = Matrix4::new(
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let update_mat = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            motion_mat,
            update_mat,
            process_noise: Matrix4::identity() * process_noise,
            measurement_noise: Matrix2::identity() * measurement_noise,
            initial_covariance,
        }
    }

    /// Start a track at `measurement` with zero velocity.
    pub fn initiate(&self, measurement: [f64; 2]) -> (StateMean, StateCovariance) {
        let mean = Vector4::new(measurement[0], measurement[1], 0.0, 0.0);
        let covariance = Matrix4::identity() * self.initial_covariance;
        (mean, covariance)
    }

    /// Advance one frame: `x = F x`, `P = F P Fᵀ + Q`.
    pub fn predict(
        &self,
        mean: &StateMean,
        covariance: &StateCovariance,
    ) -> (StateMean, StateCovariance) {
        let new_mean = self.motion_mat * mean;
        let new_covariance =
            self.motion_mat * covariance * self.motion_mat.transpose() + self.process_noise;
        (new_mean, new_covariance)
    }

    /// Project the state into measurement space: `(H x, H P Hᵀ + R)`.
    pub fn project(
        &self,
        mean: &StateMean,
        covariance: &StateCovariance,
    ) -> (Vector2<f64>, Matrix2<f64>) {
        let mean_proj = self.update_mat * mean;
        let covariance_proj =
            self.update_mat * covariance * self.update_mat.transpose() + self.measurement_noise;
        (mean_proj, covariance_proj)
    }

    /// Correct the state with a measured center.
    ///
    /// Returns the inputs unchanged if the innovation covariance is singular,
    /// which cannot happen while R is positive definite.
    pub fn update(
        &self,
        mean: &StateMean,
        covariance: &StateCovariance,
        measurement: [f64; 2],
    ) -> (StateMean, StateCovariance) {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let Some(s_inv) = projected_cov.try_inverse() else {
            return (*mean, *covariance);
        };

        let innovation = Vector2::new(measurement[0], measurement[1]) - projected_mean;

        // K = P Hᵀ S⁻¹
        let kalman_gain = covariance * self.update_mat.transpose() * s_inv;

        let new_mean = mean + kalman_gain * innovation;
        let new_covariance = covariance - kalman_gain * projected_cov * kalman_gain.transpose();

        (new_mean, new_covariance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::default();
        let (mean, cov) = kf.initiate([100.0, 200.0]);
        assert_eq!(mean, Vector4::new(100.0, 200.0, 0.0, 0.0));
        assert_eq!(cov, Matrix4::identity());
    }

    #[test]
    fn test_predict_moves_by_velocity() {
        let kf = KalmanFilter::default();
        let mean = Vector4::new(10.0, 20.0, 3.0, -1.0);
        let (predicted, cov) = kf.predict(&mean, &Matrix4::identity());
        assert_eq!(predicted, Vector4::new(13.0, 19.0, 3.0, -1.0));
        // Position variance grows by P_vv + Q
        assert_relative_eq!(cov[(0, 0)], 2.1, epsilon = 1e-12);
    }

    #[test]
    fn test_update_pulls_toward_measurement() {
        let kf = KalmanFilter::default();
        let (mean, cov) = kf.initiate([0.0, 0.0]);
        let (updated, updated_cov) = kf.update(&mean, &cov, [11.0, 0.0]);
        // gain = 1 / (1 + 10)
        assert_relative_eq!(updated[0], 1.0, epsilon = 1e-12);
        assert_eq!(updated[1], 0.0);
        assert!(updated_cov[(0, 0)] < cov[(0, 0)]);
    }
}
