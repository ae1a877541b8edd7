use std::sync::Arc;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{config::RoomConfig, gfx::RenderEngine, room::RoomState};

const WINDOW_TITLE: &str = "Techno Room";

pub struct TechnoRoomApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    room: RoomState,
    window_size: (u32, u32),
    /// Fatal error raised inside the event loop, reported by `run`
    error: Option<anyhow::Error>,
}

impl TechnoRoomApp {
    /// Creates the event loop and the room; the window opens on `run`
    pub fn new(config: RoomConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;

        let window_size = config.window_size;
        let aspect = window_size.0 as f32 / window_size.1.max(1) as f32;
        let room = RoomState::new(config, aspect);

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                window: None,
                render_engine: None,
                room,
                window_size,
                error: None,
            },
        })
    }

    /// Runs the event loop until the window closes
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self.event_loop.take().context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self.app_state).context("event loop failed")?;

        match self.app_state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state == ElementState::Pressed {
            match &event.logical_key {
                Key::Named(NamedKey::Escape) => {
                    event_loop.exit();
                    return;
                }
                Key::Named(NamedKey::Backspace) => self.room.backspace(),
                _ => {
                    if let Some(text) = event.text.as_ref() {
                        self.room.type_text(text);
                    }
                }
            }
        }
        // Shift for panning, Shift + C to reset the view
        self.room.scene.camera_manager.process_keyboard_event(event);
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.window_size;
        let attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(width, height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, anyhow::Error::new(e).context("failed to create window")),
        };
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        let renderer = pollster::block_on(RenderEngine::new(window.clone(), width, height));
        match renderer {
            Ok(renderer) => {
                self.room.scene.camera_manager.resize(width, height);
                self.render_engine = Some(renderer);
                log::info!("Rendering at {}x{}", width, height);
            }
            Err(e) => self.fail(event_loop, e.context("failed to initialise renderer")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.render_engine.is_none() {
            return;
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.room.scene.camera_manager.resize(width, height);
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.room.tick();
                let Some(render_engine) = self.render_engine.as_mut() else {
                    return;
                };
                if let Err(e) = render_engine.render_frame(&mut self.room.scene) {
                    self.fail(event_loop, anyhow::Error::new(e).context("failed to render frame"));
                }
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        self.room.scene.camera_manager.process_event(&event, window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
