use crate::cameras::{CameraEvent, Control, MovementControls};

use winit::event::{DeviceEvent, ElementState, Event, MouseButton, VirtualKeyCode, WindowEvent};

/// Translates winit events into the camera's platform-free vocabulary and
/// tracks which movement keys are currently held. This is the only module
/// that names winit input types; the camera never sees them.
pub struct WinitInput {
    forward: bool,
    back: bool,
    strafe_left: bool,
    strafe_right: bool,
}

impl WinitInput {
    pub fn new() -> Self {
        Self {
            forward: false,
            back: false,
            strafe_left: false,
            strafe_right: false,
        }
    }

    /// Digest one winit event. Key state is recorded as a side effect;
    /// events the camera cares about come back as a `CameraEvent`.
    pub fn process<T>(&mut self, event: &Event<T>) -> Option<CameraEvent> {
        match event {
            Event::WindowEvent { event: window_event, .. } => match window_event {
                WindowEvent::MouseInput {
                    button: MouseButton::Right,
                    state,
                    ..
                } => Some(match state {
                    ElementState::Pressed => CameraEvent::LookTriggerDown,
                    ElementState::Released => CameraEvent::LookTriggerUp,
                }),

                WindowEvent::KeyboardInput {
                    input:
                        winit::event::KeyboardInput {
                            virtual_keycode: Some(vkey),
                            state,
                            ..
                        },
                    ..
                } => {
                    let held = *state == ElementState::Pressed;
                    match vkey {
                        VirtualKeyCode::W => self.forward = held,
                        VirtualKeyCode::S => self.back = held,
                        VirtualKeyCode::A => self.strafe_left = held,
                        VirtualKeyCode::D => self.strafe_right = held,
                        _ => (),
                    }
                    None
                }

                _ => None,
            },

            // Raw motion deltas, not cursor positions, so look input keeps
            // arriving while the cursor is grabbed.
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => Some(CameraEvent::PointerMoved {
                dx: delta.0 as f32,
                dy: delta.1 as f32,
            }),

            _ => None,
        }
    }
}

impl MovementControls for WinitInput {
    fn is_held(&self, control: Control) -> bool {
        match control {
            Control::Forward => self.forward,
            Control::Back => self.back,
            Control::StrafeLeft => self.strafe_left,
            Control::StrafeRight => self.strafe_right,
        }
    }
}
