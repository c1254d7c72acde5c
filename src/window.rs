//! Demo host: a winit window that owns a [`FieldEngine`] and forwards input.
//!
//! The engine itself never reads raw events. This app plays the part of the
//! host UI: it drives the frame cadence via `RedrawRequested`, forwards
//! cursor moves and button state as pointer writes, and (as a stand-in for
//! hovering a bookmark icon) marks the cursor position as a hover target
//! while the right mouse button is held.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::engine::{FieldConfig, FieldEngine};

pub struct App {
    window: Option<Arc<Window>>,
    engine: Option<FieldEngine>,
    config: FieldConfig,
    cursor: (f32, f32),
    left_down: bool,
    right_down: bool,
}

impl App {
    pub fn new(config: FieldConfig) -> Self {
        Self {
            window: None,
            engine: None,
            config,
            cursor: (0.0, 0.0),
            left_down: false,
            right_down: false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window_attrs = Window::default_attributes()
                .with_title("driftfield")
                .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

            let window = Arc::new(event_loop.create_window(window_attrs).unwrap());
            self.window = Some(window.clone());
            self.engine = Some(FieldEngine::new(window, self.config.clone()));
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                engine.dispose();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                engine.set_viewport(physical_size.width, physical_size.height);
            }
            WindowEvent::Focused(focused) => {
                engine.set_visibility(focused);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                engine.set_pointer(self.cursor.0, self.cursor.1, self.left_down);
                engine.set_hover_target(self.cursor.0, self.cursor.1, self.right_down);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => {
                        self.left_down = pressed;
                        engine.set_pointer(self.cursor.0, self.cursor.1, pressed);
                    }
                    MouseButton::Right => {
                        self.right_down = pressed;
                        engine.set_hover_target(self.cursor.0, self.cursor.1, pressed);
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                engine.frame();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
