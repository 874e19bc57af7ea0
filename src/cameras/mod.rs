mod free_camera;
pub use free_camera::FreeCamera;

extern crate nalgebra as na;

/// A discrete input event, already stripped of any windowing-library types.
/// The adapter in `crate::input` produces these; the camera consumes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraEvent {
    /// The look trigger (e.g. right mouse button) was pressed.
    LookTriggerDown,
    /// The look trigger was released.
    LookTriggerUp,
    /// Raw pointer motion, in device counts.
    PointerMoved { dx: f32, dy: f32 },
}

/// Pointer-capture side effect requested by the camera. The windowing
/// layer is responsible for actually grabbing or releasing the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMode {
    Captured,
    Released,
}

/// The four movement controls the camera samples every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
}

/// Queryable held-state of the movement controls, sampled once per
/// `update` call. Implemented by the platform input adapter.
pub trait MovementControls {
    fn is_held(&self, control: Control) -> bool;
}

pub trait Camera {
    fn view_matrix(&self) -> na::Matrix4<f32>;
    fn projection_matrix(&self) -> na::Matrix4<f32>;

    fn transform(&self) -> na::Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}
