//! Turns raw target locations into pan/tilt corrections.
//!
//! A constant-velocity Kalman filter smooths the published center point,
//! then the offset from the frame center is compared against a dead zone
//! so a well-centered target produces no movement at all.

use ndarray::{Array1, Array2, arr1, arr2};
use serde::{Deserialize, Serialize};

const STD_POSITION: f32 = 1.0;
const STD_VELOCITY: f32 = 0.5;
const STD_MEASUREMENT: f32 = 2.0;
const INITIAL_VELOCITY_VAR: f32 = 100.0;

/// Dead-zone half-extents in working-resolution pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GimbalConfig {
    pub dead_zone_x: f32,
    pub dead_zone_y: f32,
}

impl Default for GimbalConfig {
    fn default() -> Self {
        // A quarter of the default 640x360 working frame per axis.
        Self {
            dead_zone_x: 160.0,
            dead_zone_y: 90.0,
        }
    }
}

/// Constant-velocity filter over a single point, state `[x, y, vx, vy]`.
struct PointFilter {
    motion_mat: Array2<f32>,
    update_mat: Array2<f32>,
    mean: Array1<f32>,
    covariance: Array2<f32>,
}

impl PointFilter {
    fn new(point: (f32, f32)) -> Self {
        let mut motion_mat = Array2::eye(4);
        motion_mat[[0, 2]] = 1.0;
        motion_mat[[1, 3]] = 1.0;
        let mut update_mat = Array2::zeros((2, 4));
        update_mat[[0, 0]] = 1.0;
        update_mat[[1, 1]] = 1.0;

        let mean = arr1(&[point.0, point.1, 0.0, 0.0]);
        // Confident about the observed position, not about the velocity.
        let mut covariance = Array2::zeros((4, 4));
        covariance[[0, 0]] = (2.0 * STD_MEASUREMENT).powi(2);
        covariance[[1, 1]] = (2.0 * STD_MEASUREMENT).powi(2);
        covariance[[2, 2]] = INITIAL_VELOCITY_VAR;
        covariance[[3, 3]] = INITIAL_VELOCITY_VAR;

        Self {
            motion_mat,
            update_mat,
            mean,
            covariance,
        }
    }

    fn step(&mut self, observation: (f32, f32)) -> (f32, f32) {
        self.predict();
        self.update(observation)
    }

    fn predict(&mut self) {
        self.mean = self.motion_mat.dot(&self.mean);
        self.covariance =
            self.motion_mat.dot(&self.covariance).dot(&self.motion_mat.t()) + process_noise();
    }

    fn update(&mut self, observation: (f32, f32)) -> (f32, f32) {
        let innovation = arr1(&[observation.0, observation.1]) - self.update_mat.dot(&self.mean);
        let projected =
            self.update_mat.dot(&self.covariance).dot(&self.update_mat.t()) + measurement_noise();
        let gain = self
            .covariance
            .dot(&self.update_mat.t())
            .dot(&invert_2x2(&projected));
        self.mean = &self.mean + &gain.dot(&innovation);
        self.covariance = (Array2::eye(4) - gain.dot(&self.update_mat)).dot(&self.covariance);
        (self.mean[0], self.mean[1])
    }
}

fn process_noise() -> Array2<f32> {
    Array2::from_diag(&arr1(&[
        STD_POSITION.powi(2),
        STD_POSITION.powi(2),
        STD_VELOCITY.powi(2),
        STD_VELOCITY.powi(2),
    ]))
}

fn measurement_noise() -> Array2<f32> {
    Array2::from_diag(&arr1(&[STD_MEASUREMENT.powi(2), STD_MEASUREMENT.powi(2)]))
}

// The measurement noise keeps the projected covariance strictly positive
// definite, so this inverse always exists.
fn invert_2x2(matrix: &Array2<f32>) -> Array2<f32> {
    let inverse = nalgebra::Matrix2::new(
        matrix[[0, 0]],
        matrix[[0, 1]],
        matrix[[1, 0]],
        matrix[[1, 1]],
    )
    .try_inverse()
    .expect("projected covariance must be invertible");
    arr2(&[
        [inverse[(0, 0)], inverse[(0, 1)]],
        [inverse[(1, 0)], inverse[(1, 1)]],
    ])
}

/// Consumes published locations and yields gimbal corrections.
pub struct GimbalFilter {
    config: GimbalConfig,
    frame_center: (f32, f32),
    filter: Option<PointFilter>,
}

impl GimbalFilter {
    pub fn new(config: GimbalConfig, frame_width: u32, frame_height: u32) -> Self {
        Self {
            config,
            frame_center: (frame_width as f32 / 2.0, frame_height as f32 / 2.0),
            filter: None,
        }
    }

    /// Smooth the raw location and derive the offset from the frame
    /// center. Returns `None` while the target sits inside the dead zone.
    /// The first location after construction or [`reset`](Self::reset)
    /// passes through unfiltered.
    pub fn correction(&mut self, location: (f32, f32)) -> Option<(f32, f32)> {
        let smoothed = match self.filter.as_mut() {
            Some(filter) => filter.step(location),
            None => {
                self.filter = Some(PointFilter::new(location));
                location
            }
        };
        let dx = smoothed.0 - self.frame_center.0;
        let dy = smoothed.1 - self.frame_center.1;
        let dx = if dx.abs() <= self.config.dead_zone_x { 0.0 } else { dx };
        let dy = if dy.abs() <= self.config.dead_zone_y { 0.0 } else { dy };
        if dx == 0.0 && dy == 0.0 {
            None
        } else {
            Some((dx, dy))
        }
    }

    /// Drop the smoothing history so the next location starts a fresh
    /// estimate instead of inheriting a stale velocity.
    pub fn reset(&mut self) {
        self.filter = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_filter() -> GimbalFilter {
        let config = GimbalConfig {
            dead_zone_x: 10.0,
            dead_zone_y: 10.0,
        };
        GimbalFilter::new(config, 640, 360)
    }

    #[test]
    fn test_first_observation_passes_through() {
        let mut filter = tight_filter();
        let correction = filter.correction((400.0, 250.0)).unwrap();
        assert_eq!(correction, (80.0, 70.0));
    }

    #[test]
    fn test_dead_zone_suppresses_centered_target() {
        let mut filter = tight_filter();
        assert!(filter.correction((325.0, 182.0)).is_none());
    }

    #[test]
    fn test_dead_zone_applies_per_axis() {
        let mut filter = tight_filter();
        let correction = filter.correction((400.0, 181.0)).unwrap();
        assert_eq!(correction, (80.0, 0.0));
    }

    #[test]
    fn test_constant_target_converges() {
        let mut filter = tight_filter();
        let mut last = (0.0, 0.0);
        for _ in 0..30 {
            last = filter.correction((400.0, 250.0)).unwrap();
        }
        assert!((last.0 - 80.0).abs() < 1.0);
        assert!((last.1 - 70.0).abs() < 1.0);
    }

    #[test]
    fn test_jump_is_damped() {
        let mut filter = tight_filter();
        for _ in 0..30 {
            filter.correction((400.0, 250.0));
        }
        // A 100px jump should pull the estimate but not teleport it.
        let (dx, _) = filter.correction((500.0, 250.0)).unwrap();
        assert!(dx > 80.0);
        assert!(dx < 180.0);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut filter = tight_filter();
        for _ in 0..30 {
            filter.correction((400.0, 250.0));
        }
        filter.reset();
        // Fresh passthrough, no pull from the previous estimate.
        let correction = filter.correction((340.0, 250.0)).unwrap();
        assert_eq!(correction, (20.0, 70.0));
    }
}
