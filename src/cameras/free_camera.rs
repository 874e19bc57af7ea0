extern crate nalgebra as na;

use super::{Camera, CameraEvent, Control, MovementControls, PointerMode};

/// Free-fly camera: yaw/pitch orientation driven by pointer deltas while
/// the look trigger is held, WASD-style translation along the view basis.
///
/// The basis is rebuilt from yaw/pitch on every orientation change, with
/// `right` always derived from the fixed world up axis. Deriving it from
/// the camera's own `up` instead would accumulate roll error over long
/// sessions.
pub struct FreeCamera {
    position: na::Point3<f32>,
    front: na::Vector3<f32>,
    up: na::Vector3<f32>,
    right: na::Vector3<f32>,

    /// Degrees. -90 faces -Z.
    yaw: f32,
    /// Degrees, clamped to [-89, 89] so the basis never degenerates at
    /// the poles.
    pitch: f32,

    speed: f32,
    sensitivity: f32,

    fov: f32,
    aspect_ratio: f32,
    near_plane: f32,
    far_plane: f32,

    look_enabled: bool,
}

impl FreeCamera {
    const PITCH_LIMIT: f32 = 89.0;
    const DEFAULT_SPEED: f32 = 2.5;
    const DEFAULT_SENSITIVITY: f32 = 0.1;

    /// `fov` is the vertical field of view in degrees. Callers are
    /// expected to pass `0 < fov < 180`, `aspect_ratio > 0` and
    /// `0 < near_plane < far_plane`; violating that yields an
    /// ill-conditioned projection, not an error.
    pub fn new(fov: f32, aspect_ratio: f32, near_plane: f32, far_plane: f32) -> Self {
        let mut camera = Self {
            position: na::Point3::new(0.0, 0.0, 3.0),
            front: -na::Vector3::z(),
            up: na::Vector3::y(),
            right: na::Vector3::x(),
            yaw: -90.0,
            pitch: 0.0,
            speed: Self::DEFAULT_SPEED,
            sensitivity: Self::DEFAULT_SENSITIVITY,
            fov,
            aspect_ratio,
            near_plane,
            far_plane,
            look_enabled: false,
        };
        camera.rebuild_basis();
        camera
    }

    pub fn position(&self) -> na::Point3<f32> {
        self.position
    }

    pub fn look_enabled(&self) -> bool {
        self.look_enabled
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Viewport resizes go through here so the camera keeps its pose.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Feed one input event. Returns the pointer-capture change the
    /// windowing layer should apply, if any. Never fails; events that
    /// don't concern the camera are ignored.
    pub fn handle_input(&mut self, event: &CameraEvent) -> Option<PointerMode> {
        match *event {
            CameraEvent::LookTriggerDown => {
                self.look_enabled = true;
                Some(PointerMode::Captured)
            }
            CameraEvent::LookTriggerUp => {
                self.look_enabled = false;
                Some(PointerMode::Released)
            }
            CameraEvent::PointerMoved { dx, dy } => {
                if self.look_enabled {
                    self.yaw -= dx * self.sensitivity;
                    self.pitch -= dy * self.sensitivity;
                    self.pitch = self.pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
                    self.rebuild_basis();
                }
                None
            }
        }
    }

    /// Force-clear the look state, e.g. when the window loses focus.
    /// Returns the release signal so the cursor is never left captured.
    pub fn cancel_look(&mut self) -> Option<PointerMode> {
        if self.look_enabled {
            self.look_enabled = false;
            Some(PointerMode::Released)
        } else {
            None
        }
    }

    /// Advance the position by one frame's worth of movement. Held
    /// controls compose by vector addition, so a forward+strafe diagonal
    /// is faster than either alone (deliberate demo behavior).
    pub fn update(&mut self, delta_seconds: f32, controls: &impl MovementControls) {
        let velocity = self.speed * delta_seconds;

        if controls.is_held(Control::Forward) {
            self.position += self.front * velocity;
        }
        if controls.is_held(Control::Back) {
            self.position -= self.front * velocity;
        }
        if controls.is_held(Control::StrafeLeft) {
            self.position -= self.right * velocity;
        }
        if controls.is_held(Control::StrafeRight) {
            self.position += self.right * velocity;
        }
    }

    /// Derive `front` from yaw/pitch, then `right` and `up` from it.
    /// Order matters: `right` comes from `front` and the world up axis,
    /// never from the previous `up`.
    fn rebuild_basis(&mut self) {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();

        self.front = na::Vector3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();

        self.right = self.front.cross(&na::Vector3::y()).normalize();
        self.up = self.right.cross(&self.front);
    }
}

impl Camera for FreeCamera {
    fn view_matrix(&self) -> na::Matrix4<f32> {
        na::Isometry3::look_at_rh(
            &self.position,
            &(self.position + self.front),
            &self.up,
        )
        .to_homogeneous()
    }

    fn projection_matrix(&self) -> na::Matrix4<f32> {
        na::Perspective3::new(
            self.aspect_ratio,
            self.fov.to_radians(),
            self.near_plane,
            self.far_plane,
        )
        .to_homogeneous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-5;

    struct Held(Vec<Control>);

    impl MovementControls for Held {
        fn is_held(&self, control: Control) -> bool {
            self.0.contains(&control)
        }
    }

    fn test_camera() -> FreeCamera {
        FreeCamera::new(45.0, 16.0 / 9.0, 0.1, 100.0)
    }

    fn assert_close(actual: f32, expected: f32, what: &str) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "{}: expected {}, got {}",
            what,
            expected,
            actual
        );
    }

    #[test]
    fn test_initial_orientation_faces_negative_z() {
        let camera = test_camera();
        assert_close(camera.front.x, 0.0, "front.x");
        assert_close(camera.front.y, 0.0, "front.y");
        assert_close(camera.front.z, -1.0, "front.z");
        assert_close(camera.right.x, 1.0, "right.x");
        assert_close(camera.up.y, 1.0, "up.y");
        assert!(!camera.look_enabled());
    }

    #[test]
    fn test_basis_stays_orthonormal_under_arbitrary_motion() {
        let mut camera = test_camera();
        camera.handle_input(&CameraEvent::LookTriggerDown);

        let deltas = [
            (13.7, -4.2),
            (-250.0, 91.3),
            (0.0, 4000.0),
            (777.7, -7777.7),
            (-0.01, 0.02),
            (359.0, 12.0),
        ];
        for (dx, dy) in deltas {
            camera.handle_input(&CameraEvent::PointerMoved { dx, dy });

            assert_close(camera.front.norm(), 1.0, "|front|");
            assert_close(camera.right.norm(), 1.0, "|right|");
            assert_close(camera.up.norm(), 1.0, "|up|");
            assert_close(camera.front.dot(&camera.right), 0.0, "front . right");
            assert_close(camera.front.dot(&camera.up), 0.0, "front . up");
            assert_close(camera.right.dot(&camera.up), 0.0, "right . up");
        }
    }

    #[test]
    fn test_pitch_never_leaves_clamp_range() {
        let mut camera = test_camera();
        camera.handle_input(&CameraEvent::LookTriggerDown);

        // Large alternating vertical swings, all of which overshoot the
        // clamp on their own.
        for sign in [-1.0f32, 1.0, -1.0, 1.0, -1.0] {
            camera.handle_input(&CameraEvent::PointerMoved {
                dx: 0.0,
                dy: sign * 10_000.0,
            });
            assert!(
                camera.pitch >= -89.0 && camera.pitch <= 89.0,
                "pitch {} escaped [-89, 89]",
                camera.pitch
            );
        }
    }

    #[test]
    fn test_pointer_motion_is_ignored_while_not_looking() {
        let mut camera = test_camera();
        let (yaw, pitch, front, right, up) =
            (camera.yaw, camera.pitch, camera.front, camera.right, camera.up);

        for _ in 0..10 {
            let signal = camera.handle_input(&CameraEvent::PointerMoved {
                dx: 123.0,
                dy: -456.0,
            });
            assert_eq!(signal, None);
        }

        assert_eq!(camera.yaw, yaw);
        assert_eq!(camera.pitch, pitch);
        assert_eq!(camera.front, front);
        assert_eq!(camera.right, right);
        assert_eq!(camera.up, up);
    }

    #[test]
    fn test_forward_movement_scales_with_speed_and_time() {
        let mut camera = test_camera();
        camera.speed = 2.0;
        let start = camera.position();

        camera.update(1.0, &Held(vec![Control::Forward]));

        let moved = camera.position() - start;
        assert_close(moved.x, 0.0, "dx");
        assert_close(moved.y, 0.0, "dy");
        assert_close(moved.z, -2.0, "dz");
    }

    #[test]
    fn test_diagonal_movement_is_unnormalized_vector_sum() {
        let mut camera = test_camera();
        camera.speed = 2.0;
        let start = camera.position();

        camera.update(1.0, &Held(vec![Control::Forward, Control::StrafeRight]));

        // front = (0,0,-1), right = (1,0,0): the diagonal is the plain
        // sum, sqrt(2) times faster than either axis alone.
        let moved = camera.position() - start;
        assert_close(moved.x, 2.0, "dx");
        assert_close(moved.y, 0.0, "dy");
        assert_close(moved.z, -2.0, "dz");
    }

    #[test]
    fn test_opposed_controls_cancel() {
        let mut camera = test_camera();
        let start = camera.position();

        camera.update(1.0, &Held(vec![Control::StrafeLeft, Control::StrafeRight]));

        assert_eq!(camera.position(), start);
    }

    #[test]
    fn test_zero_delta_time_never_moves() {
        let mut camera = test_camera();
        let start = camera.position();

        camera.update(0.0, &Held(vec![Control::Forward, Control::StrafeLeft]));

        assert_eq!(camera.position(), start);
    }

    #[test]
    fn test_view_matrix_maps_position_to_view_space_origin() {
        let mut camera = test_camera();
        camera.handle_input(&CameraEvent::LookTriggerDown);
        camera.handle_input(&CameraEvent::PointerMoved { dx: 310.0, dy: -42.0 });
        camera.update(0.25, &Held(vec![Control::Forward, Control::StrafeRight]));

        let eye = camera.view_matrix() * camera.position().to_homogeneous();
        assert_close(eye.x, 0.0, "eye.x");
        assert_close(eye.y, 0.0, "eye.y");
        assert_close(eye.z, 0.0, "eye.z");
    }

    #[test]
    fn test_projection_matrix_matches_reference_frustum() {
        let camera = FreeCamera::new(90.0, 1.0, 0.1, 100.0);
        let proj = camera.projection_matrix();

        // fov = 90 degrees: both diagonal scales are 1/tan(45) = 1.
        assert_close(proj[(0, 0)], 1.0, "m00");
        assert_close(proj[(1, 1)], 1.0, "m11");
        assert_close(proj[(2, 2)], -100.1 / 99.9, "m22");
        assert_close(proj[(3, 2)], -1.0, "m32");
    }

    #[test]
    fn test_quarter_turn_look_sequence() {
        let mut camera = test_camera();

        let down = camera.handle_input(&CameraEvent::LookTriggerDown);
        assert_eq!(down, Some(PointerMode::Captured));
        assert!(camera.look_enabled());

        // A positive dx of 90/sensitivity swings the yaw from -90 to -180.
        camera.handle_input(&CameraEvent::PointerMoved {
            dx: 90.0 / camera.sensitivity(),
            dy: 0.0,
        });

        let up = camera.handle_input(&CameraEvent::LookTriggerUp);
        assert_eq!(up, Some(PointerMode::Released));
        assert!(!camera.look_enabled());

        assert_close(camera.yaw, -180.0, "yaw");
        assert_close(camera.front.x, -1.0, "front.x");
        assert_close(camera.front.y, 0.0, "front.y");
        assert_close(camera.front.z, 0.0, "front.z");
    }

    #[test]
    fn test_cancel_look_releases_exactly_once() {
        let mut camera = test_camera();
        assert_eq!(camera.cancel_look(), None);

        camera.handle_input(&CameraEvent::LookTriggerDown);
        assert_eq!(camera.cancel_look(), Some(PointerMode::Released));
        assert_eq!(camera.cancel_look(), None);

        // Orientation is frozen again after the forced release.
        let front = camera.front;
        camera.handle_input(&CameraEvent::PointerMoved { dx: 50.0, dy: 50.0 });
        assert_eq!(camera.front, front);
    }

    #[test]
    fn test_aspect_ratio_change_preserves_pose() {
        let mut camera = test_camera();
        camera.handle_input(&CameraEvent::LookTriggerDown);
        camera.handle_input(&CameraEvent::PointerMoved { dx: 35.0, dy: 10.0 });
        camera.update(0.5, &Held(vec![Control::Back]));

        let (position, front) = (camera.position(), camera.front);
        camera.set_aspect_ratio(2.0);

        assert_eq!(camera.position(), position);
        assert_eq!(camera.front, front);
        // Only the horizontal scale of the projection changes.
        let proj = camera.projection_matrix();
        assert_close(proj[(0, 0)] * 2.0, proj[(1, 1)], "m00 vs m11");
    }
}
