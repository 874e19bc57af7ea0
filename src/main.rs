#[cfg(feature = "dx11")]
extern crate gfx_backend_dx11 as back;
#[cfg(feature = "dx12")]
extern crate gfx_backend_dx12 as back;
#[cfg(not(any(
    feature = "vulkan",
    feature = "dx11",
    feature = "dx12",
    feature = "metal",
    feature = "gl",
)))]
extern crate gfx_backend_empty as back;
#[cfg(feature = "gl")]
extern crate gfx_backend_gl as back;
#[cfg(feature = "metal")]
extern crate gfx_backend_metal as back;
#[cfg(feature = "vulkan")]
extern crate gfx_backend_vulkan as back;

mod cameras;
mod entities;
mod fps_calculator;
mod input;
mod pipelines;
mod renderer;

use cameras::{Camera, FreeCamera, PointerMode};
use fps_calculator::FpsCalculator;
use input::WinitInput;
use renderer::Renderer;

use std::time::Instant;

use gfx_hal as hal;
use hal::{prelude::*, window};

#[cfg_attr(rustfmt, rustfmt_skip)]
pub const DIMS: window::Extent2D = window::Extent2D { width: 800, height: 800 };
pub const TITLE: &str = "Cube";

const FOV_DEGREES: f32 = 45.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

fn main() {
    env_logger::init();

    #[cfg(not(any(
        feature = "vulkan",
        feature = "dx11",
        feature = "dx12",
        feature = "metal",
        feature = "gl",
    )))]
    eprintln!(
        "You are running the example with the empty backend, no graphical output is to be expected"
    );

    let event_loop = winit::event_loop::EventLoop::new();

    let window_builder = winit::window::WindowBuilder::new()
        .with_min_inner_size(winit::dpi::Size::Logical(winit::dpi::LogicalSize::new(
            64.0, 64.0,
        )))
        .with_inner_size(winit::dpi::Size::Physical(winit::dpi::PhysicalSize::new(
            DIMS.width,
            DIMS.height,
        )))
        .with_title(TITLE.to_string());

    // instantiate backend
    let window = window_builder.build(&event_loop).unwrap();

    let instance = back::Instance::create(TITLE, 1).expect("Failed to create an instance!");

    let surface = unsafe {
        instance
            .create_surface(&window)
            .expect("Failed to create a surface!")
    };

    let adapter = {
        let mut adapters = instance.enumerate_adapters();
        for adapter in &adapters {
            log::info!("{:?}", adapter.info);
        }
        adapters.remove(0)
    };

    let mut renderer = Renderer::new(instance, surface, adapter);

    let mut camera = FreeCamera::new(
        FOV_DEGREES,
        DIMS.width as f32 / DIMS.height as f32,
        NEAR_PLANE,
        FAR_PLANE,
    );
    let mut controls = WinitInput::new();
    let mut fps_calculator = FpsCalculator::new(Instant::now());
    let mut last_frame = Instant::now();

    renderer.render(camera.transform());

    // It is important that the closure move captures the Renderer,
    // otherwise it will not be dropped when the event loop exits.
    event_loop.run(move |event, _, control_flow| {
        *control_flow = winit::event_loop::ControlFlow::Poll;

        if let Some(camera_event) = controls.process(&event) {
            if let Some(mode) = camera.handle_input(&camera_event) {
                apply_pointer_mode(&window, mode);
            }
        }

        match event {
            winit::event::Event::WindowEvent { event, .. } => match event {
                winit::event::WindowEvent::CloseRequested => {
                    *control_flow = winit::event_loop::ControlFlow::Exit
                }

                winit::event::WindowEvent::KeyboardInput {
                    input:
                        winit::event::KeyboardInput {
                            virtual_keycode: Some(winit::event::VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = winit::event_loop::ControlFlow::Exit,

                // Don't leave the cursor grabbed when focus goes away
                // mid-look.
                winit::event::WindowEvent::Focused(false) => {
                    if let Some(mode) = camera.cancel_look() {
                        apply_pointer_mode(&window, mode);
                    }
                }

                winit::event::WindowEvent::Resized(dims) => {
                    log::info!("resized to {:?}", dims);
                    renderer.dimensions_set(window::Extent2D {
                        width: dims.width,
                        height: dims.height,
                    });
                    renderer.recreate_swapchain();
                    camera.set_aspect_ratio(dims.width as f32 / dims.height as f32);
                }

                _ => {}
            },

            winit::event::Event::RedrawEventsCleared => {
                let now = Instant::now();
                let delta_seconds = (now - last_frame).as_secs_f32();
                last_frame = now;

                camera.update(delta_seconds, &controls);
                renderer.render(camera.transform());

                if let Some(fps) = fps_calculator.frame(Instant::now()) {
                    window.set_title(&format!("{} ({:.0} FPS)", TITLE, fps));
                }
            }
            _ => {}
        }
    });
}

fn apply_pointer_mode(window: &winit::window::Window, mode: PointerMode) {
    match mode {
        PointerMode::Captured => {
            window.set_cursor_visible(false);
            if let Err(error) = window.set_cursor_grab(true) {
                log::warn!("Failed to grab the cursor: {}", error);
            }
        }
        PointerMode::Released => {
            window.set_cursor_visible(true);
            if let Err(error) = window.set_cursor_grab(false) {
                log::warn!("Failed to release the cursor: {}", error);
            }
        }
    }
}
