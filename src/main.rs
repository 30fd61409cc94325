//! Bubble Scene
//!
//! Floating iridescent bubbles around extruded text, with orbit controls and
//! a material panel.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    error::EventLoopError,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use bubble_scene::assets::AssetLoader;
use bubble_scene::config::SceneConfig;
use bubble_scene::render::{DragMode, RenderPipeline, Viewport};
use bubble_scene::scene::{frame, FrameState};

/// Pixels of trackpad scroll that count as one wheel step
const PIXELS_PER_WHEEL_STEP: f64 = 50.0;

/// Floating bubbles and 3D text rendered with wgpu
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the asset paths are resolved against
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Seed for bubble placement
    #[arg(long)]
    seed: Option<u64>,
}

/// Application state
struct App {
    config: SceneConfig,
    window: Option<Arc<Window>>,
    pipeline: Option<RenderPipeline>,
    state: Option<FrameState>,
    loader: Option<AssetLoader>,
}

impl App {
    fn new(config: SceneConfig) -> Self {
        Self {
            config,
            window: None,
            pipeline: None,
            state: None,
            loader: None,
        }
    }

    fn viewport(window: &Window) -> Viewport {
        let size = window.inner_size();
        Viewport::from_physical(size.width, size.height, window.scale_factor())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(pipeline), Some(state)) =
            (&self.window, &mut self.pipeline, &mut self.state)
        else {
            return;
        };

        if let Some(loader) = &mut self.loader {
            for event in loader.poll() {
                state.scene.apply(event);
            }
        }

        let elapsed = state.clock.elapsed();
        frame::update(state, elapsed);

        match pipeline.render(window, state) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                pipeline.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }

        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let viewport = Self::viewport(&window);
        let pipeline = match pollster::block_on(RenderPipeline::new(
            window.clone(),
            viewport,
            &self.config.panel,
        )) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                log::error!("Failed to initialize rendering: {}", e);
                event_loop.exit();
                return;
            }
        };

        self.state = Some(FrameState::new(&self.config, viewport));
        self.loader = Some(AssetLoader::spawn_all(&self.config.assets));
        self.pipeline = Some(pipeline);
        window.request_redraw();
        self.window = Some(window);

        log::info!("Window created, rendering started");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        // Let egui see the event first
        let (egui_consumed, over_panel) = match (&mut self.pipeline, &self.window) {
            (Some(pipeline), Some(window)) => (
                pipeline.handle_event(window, &event),
                pipeline.wants_pointer_input(),
            ),
            _ => (false, false),
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let (Some(window), Some(pipeline), Some(state)) =
                    (&self.window, &mut self.pipeline, &mut self.state)
                {
                    let viewport = Self::viewport(window);
                    state.resize(viewport);
                    pipeline.resize(new_size, viewport);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let (Some(window), Some(pipeline), Some(state)) =
                    (&self.window, &mut self.pipeline, &mut self.state)
                {
                    let viewport = Self::viewport(window);
                    state.resize(viewport);
                    pipeline.resize(window.inner_size(), viewport);
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let Some(state) = &mut self.state else {
                    return;
                };
                match button_state {
                    ElementState::Pressed if !(egui_consumed || over_panel) => match button {
                        MouseButton::Left => state.controls.begin_drag(DragMode::Rotate),
                        MouseButton::Right => state.controls.begin_drag(DragMode::Pan),
                        _ => {}
                    },
                    ElementState::Released => state.controls.end_drag(),
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (Some(window), Some(state)) = (&self.window, &mut self.state) {
                    let height = window.inner_size().height as f32;
                    let FrameState {
                        controls, camera, ..
                    } = state;
                    controls.cursor_moved(
                        Vec2::new(position.x as f32, position.y as f32),
                        height,
                        camera,
                    );
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !(egui_consumed || over_panel) => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_WHEEL_STEP) as f32,
                };
                if let Some(state) = &mut self.state {
                    state.controls.zoom(steps);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape)
                {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

fn main() -> Result<(), EventLoopError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = if let Some(ref path) = args.config {
        match SceneConfig::from_file(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                SceneConfig::default()
            }
        }
    } else {
        SceneConfig::default()
    };

    if let Some(root) = args.assets {
        config.assets.root = root;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    log::info!("Loading assets from {}", config.assets.root.display());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)
}
