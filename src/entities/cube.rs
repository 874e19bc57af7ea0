extern crate nalgebra as na;

use super::Vertex;

use std::f32::consts::PI;
use std::time::{Duration, Instant};

/// One full revolution about Y takes this long.
const SPIN_PERIOD_SECONDS: f32 = 4.0;

/// Fixed tilt about X so the top face stays visible while spinning.
const TILT_RADIANS: f32 = 0.15 * PI;

/// The demo's single mesh: a unit cube with a distinct color per corner,
/// spinning in place.
pub struct Cube {
    created: Instant,
    spin: f32,
}

impl Cube {
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            spin: 0.0,
        }
    }

    /// Advance the spin from wall time. Called once per rendered frame.
    pub fn update(&mut self) {
        self.spin = spin_angle(self.created.elapsed());
    }

    /// Model matrix: spin about Y first, then the fixed tilt.
    pub fn transform(&self) -> na::Matrix4<f32> {
        let tilt = na::Rotation3::from_axis_angle(&na::Vector3::x_axis(), TILT_RADIANS);
        let spin = na::Rotation3::from_axis_angle(&na::Vector3::y_axis(), self.spin);
        (tilt * spin).to_homogeneous()
    }

    pub fn vertices(&self) -> Vec<Vertex> {
        vec![
            // Front face
            Vertex { pos: [ 0.5,  0.5,  0.5], color: [1.0, 0.4, 0.6] },
            Vertex { pos: [-0.5,  0.5,  0.5], color: [1.0, 0.9, 0.2] },
            Vertex { pos: [-0.5, -0.5,  0.5], color: [0.7, 0.3, 0.8] },
            Vertex { pos: [ 0.5, -0.5,  0.5], color: [0.5, 0.3, 1.0] },
            // Back face
            Vertex { pos: [ 0.5,  0.5, -0.5], color: [0.2, 0.6, 1.0] },
            Vertex { pos: [-0.5,  0.5, -0.5], color: [0.6, 1.0, 0.4] },
            Vertex { pos: [-0.5, -0.5, -0.5], color: [0.6, 0.8, 0.8] },
            Vertex { pos: [ 0.5, -0.5, -0.5], color: [0.4, 0.8, 0.8] },
        ]
    }

    pub fn indices(&self) -> Vec<u16> {
        vec![
            // Front
            0, 1, 2, 2, 3, 0,
            // Right
            0, 3, 7, 7, 4, 0,
            // Bottom
            2, 6, 7, 7, 3, 2,
            // Left
            1, 5, 6, 6, 2, 1,
            // Back
            4, 7, 6, 6, 5, 4,
            // Top
            5, 1, 0, 0, 4, 5,
        ]
    }
}

/// Phase of the spin animation for a given elapsed time, in radians.
fn spin_angle(elapsed: Duration) -> f32 {
    let phase = (elapsed.as_secs_f32() % SPIN_PERIOD_SECONDS) / SPIN_PERIOD_SECONDS;
    2.0 * PI * phase
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_is_a_closed_cube() {
        let cube = Cube::new();
        assert_eq!(cube.vertices().len(), 8);
        // 6 faces, 2 triangles each.
        assert_eq!(cube.indices().len(), 36);
        assert!(cube.indices().iter().all(|&i| (i as usize) < 8));
    }

    #[test]
    fn test_spin_wraps_every_period() {
        let quarter = spin_angle(Duration::from_secs(1));
        assert!((quarter - PI / 2.0).abs() < 1e-4);

        let wrapped = spin_angle(Duration::from_secs(5));
        assert!((wrapped - quarter).abs() < 1e-4);
    }

    #[test]
    fn test_fresh_cube_has_identity_spin() {
        let cube = Cube::new();
        let m = cube.transform();
        let tilt_only =
            na::Rotation3::from_axis_angle(&na::Vector3::x_axis(), TILT_RADIANS).to_homogeneous();
        assert_eq!(m, tilt_only);
    }
}
