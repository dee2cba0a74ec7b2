use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{ModifiersState, PhysicalKey};
use winit::window::{Window, WindowId};

use orbit_viewer::input::{command_for_key, held_key_for};
use orbit_viewer::{
    AssetResolver, FrameComposer, InputEvent, InputQueue, KeyCode, NamedKey, PipelineSelector,
    RenderResourceCache, Renderer, SelectOutcome, SkyboxBuilder, ViewerConfig,
    WgpuPipelineFactory,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut config = match &options.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    config.assets.root = options.assets.clone();

    if options.summary_only {
        return run_headless(&config);
    }
    match run_interactive(config.clone()) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_headless(&config)
            } else {
                Err(err)
            }
        }
    }
}

/// Resolves the first model and the skybox without touching the GPU.
fn run_headless(config: &ViewerConfig) -> Result<()> {
    let resolver = AssetResolver::new(config.assets.clone());
    let mut cache = RenderResourceCache::new(resolver, config.models.clone());

    println!("Assets root: {}", config.assets.root.display());
    println!("Catalog: {} model(s)", cache.catalog().len());
    match cache.select(0) {
        SelectOutcome::Unchanged => println!("Model: none (empty catalog)"),
        SelectOutcome::Failed(err) => {
            let name = cache.active_asset().map_or("?", |asset| asset.name.as_str());
            println!("Model {name}: unavailable ({err})");
        }
        SelectOutcome::CacheHit | SelectOutcome::Loaded => print_active_model(&cache),
    }

    if config.skybox.enabled {
        let builder = SkyboxBuilder::new(config.assets.root.clone())
            .with_flip_vertical(config.skybox.flip_vertical);
        match builder.build_from_settings(&config.skybox) {
            Ok(faces) => println!("Skybox: 6 faces {}x{}", faces.width(), faces.height()),
            Err(err) => println!("Skybox: none ({err})"),
        }
    } else {
        println!("Skybox: disabled");
    }
    Ok(())
}

fn print_active_model(cache: &RenderResourceCache<AssetResolver>) {
    let (Some(asset), Some(active)) = (cache.active_asset(), cache.active()) else {
        return;
    };
    if let Some(mesh) = &active.mesh {
        println!(
            "Model {}: {} vertices, {} triangles",
            asset.name,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
    }
    if Arc::ptr_eq(&active.texture, cache.checkerboard()) {
        println!("Texture: checkerboard");
        if let Some(lookup) = cache.resolver().last_lookup() {
            println!("Lookup {}: {} path(s) searched", lookup.request, lookup.searched.len());
        }
    } else {
        println!("Texture: {}x{}", active.texture.width, active.texture.height);
    }
}

fn run_interactive(config: ViewerConfig) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config);
    event_loop.run_app(&mut app).context("event loop failed")?;

    if let Some(err) = app.last_error {
        return Err(err);
    }
    Ok(())
}

struct Viewer {
    renderer: Renderer,
    composer: FrameComposer<AssetResolver, WgpuPipelineFactory>,
    queue: InputQueue,
}

#[derive(Debug, Default)]
struct PointerState {
    position: Option<Vec2>,
    left: bool,
    middle: bool,
    right: bool,
}

struct ViewerApp {
    config: ViewerConfig,
    viewer: Option<Viewer>,
    pointer: PointerState,
    modifiers: ModifiersState,
    last_error: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            viewer: None,
            pointer: PointerState::default(),
            modifiers: ModifiersState::empty(),
            last_error: None,
        }
    }

    fn create_viewer(&self, event_loop: &ActiveEventLoop) -> Result<Viewer> {
        let settings = &self.config.window;
        let attributes = Window::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(settings.width),
                f64::from(settings.height),
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );

        let renderer = block_on(Renderer::new(Arc::clone(&window), settings.clear_color))?;
        let pipelines = PipelineSelector::new(
            renderer.pipeline_factory(),
            renderer.color_format(),
            renderer.depth_format(),
        );
        let cache = RenderResourceCache::new(
            AssetResolver::new(self.config.assets.clone()),
            self.config.models.clone(),
        );
        let skybox = SkyboxBuilder::new(self.config.assets.root.clone())
            .with_flip_vertical(self.config.skybox.flip_vertical);
        let composer = FrameComposer::new(
            self.config.camera,
            self.config.controls.clone(),
            self.config.lighting.clone(),
            cache,
            pipelines,
        )
        .with_skybox(skybox, self.config.skybox.clone());

        let queue = composer.queue();
        let size = renderer.size();
        queue.push(InputEvent::Resize {
            width: size.width,
            height: size.height,
        });
        info!("viewer ready ({}x{})", size.width, size.height);
        Ok(Viewer {
            renderer,
            composer,
            queue,
        })
    }

    fn handle_keyboard(&self, viewer: &Viewer, event: &KeyEvent) -> bool {
        let PhysicalKey::Code(code) = event.physical_key else {
            return false;
        };
        let Some(key) = map_keycode(code) else {
            return false;
        };
        let down = event.state == ElementState::Pressed;
        if down && key == KeyCode::Named(NamedKey::Escape) {
            return true;
        }
        if let Some(held) = held_key_for(key) {
            viewer.queue.push(InputEvent::Key { key: held, down });
        }
        if down && !event.repeat {
            if let Some(command) = command_for_key(key) {
                viewer.queue.push(command);
            }
        }
        false
    }

    fn handle_mouse_button(&mut self, state: ElementState, button: MouseButton) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.pointer.left = pressed,
            MouseButton::Middle => self.pointer.middle = pressed,
            MouseButton::Right => self.pointer.right = pressed,
            _ => {}
        }
    }

    fn handle_cursor(&mut self, viewer: &Viewer, position: Vec2) {
        let previous = self.pointer.position.replace(position);
        let Some(previous) = previous else {
            return;
        };
        let delta = position - previous;
        let controls = viewer.composer.controls();
        let event = if self.pointer.middle || (self.pointer.left && self.modifiers.alt_key()) {
            controls.drag_pan(delta)
        } else if self.pointer.left {
            controls.drag_orbit(delta)
        } else if self.pointer.right {
            controls.drag_zoom(delta.y)
        } else {
            return;
        };
        viewer.queue.push(event);
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(Viewer {
            renderer, composer, ..
        }) = self.viewer.as_mut()
        else {
            return Ok(());
        };
        let plan = composer.compose_frame(Instant::now());
        match renderer.render(&plan) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = renderer.size();
                renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(err) => warn!("surface error ({err}); retrying next frame"),
        }
        Ok(())
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match self.create_viewer(event_loop) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(err) => {
                self.last_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(viewer) = self.viewer.take() else {
            return;
        };
        if window_id != viewer.renderer.window_id() {
            self.viewer = Some(viewer);
            return;
        }
        let mut viewer = viewer;
        let mut exit = false;

        match event {
            WindowEvent::CloseRequested => exit = true,
            WindowEvent::Resized(size) => {
                viewer.renderer.resize(size);
                viewer.queue.push(InputEvent::Resize {
                    width: size.width,
                    height: size.height,
                });
                viewer.queue.push(InputEvent::OutputFormats {
                    color: viewer.renderer.color_format(),
                    depth: viewer.renderer.depth_format(),
                });
            }
            WindowEvent::Focused(false) => viewer.queue.push(InputEvent::ReleaseKeys),
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } => {
                exit = self.handle_keyboard(&viewer, &event);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_button(state, button);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(&viewer, Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.pointer.position = None,
            WindowEvent::MouseWheel { delta, .. } => {
                let controls = viewer.composer.controls();
                let zoom = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => controls.scroll_lines(lines),
                    MouseScrollDelta::PixelDelta(pixels) => controls.scroll(pixels.y as f32),
                };
                viewer.queue.push(zoom);
            }
            WindowEvent::PinchGesture { delta, .. } => {
                let zoom = viewer.composer.controls().pinch(delta as f32);
                viewer.queue.push(zoom);
            }
            WindowEvent::RedrawRequested => {
                self.viewer = Some(viewer);
                if let Err(err) = self.redraw() {
                    self.last_error = Some(err);
                    event_loop.exit();
                }
                return;
            }
            _ => {}
        }

        self.viewer = Some(viewer);
        if exit {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &self.viewer {
            viewer.renderer.window().request_redraw();
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn map_keycode(code: winit::keyboard::KeyCode) -> Option<KeyCode> {
    use winit::keyboard::KeyCode as Key;
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Enter => KeyCode::Named(NamedKey::Enter),
        Key::ArrowLeft => KeyCode::Named(NamedKey::Left),
        Key::ArrowRight => KeyCode::Named(NamedKey::Right),
        Key::ArrowUp => KeyCode::Named(NamedKey::Up),
        Key::ArrowDown => KeyCode::Named(NamedKey::Down),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        Key::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        Key::AltLeft => KeyCode::Named(NamedKey::LeftAlt),
        Key::AltRight => KeyCode::Named(NamedKey::RightAlt),
        Key::Digit0 => KeyCode::Digit(0),
        Key::Digit1 => KeyCode::Digit(1),
        Key::Digit2 => KeyCode::Digit(2),
        Key::Digit3 => KeyCode::Digit(3),
        Key::Digit4 => KeyCode::Digit(4),
        Key::Digit5 => KeyCode::Digit(5),
        Key::Digit6 => KeyCode::Digit(6),
        Key::Digit7 => KeyCode::Digit(7),
        Key::Digit8 => KeyCode::Digit(8),
        Key::Digit9 => KeyCode::Digit(9),
        Key::KeyA => KeyCode::Character('A'),
        Key::KeyB => KeyCode::Character('B'),
        Key::KeyC => KeyCode::Character('C'),
        Key::KeyD => KeyCode::Character('D'),
        Key::KeyE => KeyCode::Character('E'),
        Key::KeyJ => KeyCode::Character('J'),
        Key::KeyK => KeyCode::Character('K'),
        Key::KeyL => KeyCode::Character('L'),
        Key::KeyN => KeyCode::Character('N'),
        Key::KeyP => KeyCode::Character('P'),
        Key::KeyQ => KeyCode::Character('Q'),
        Key::KeyR => KeyCode::Character('R'),
        Key::KeyS => KeyCode::Character('S'),
        Key::KeyV => KeyCode::Character('V'),
        Key::KeyW => KeyCode::Character('W'),
        _ => return None,
    })
}

struct CliOptions {
    assets: PathBuf,
    config: Option<PathBuf>,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        const USAGE: &str = "Usage: orbit-viewer <assets-dir> [--config <file>] [--summary-only]";
        let mut args = env::args().skip(1);
        let Some(assets) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        if assets.starts_with("--") {
            return Err(anyhow!(USAGE));
        }
        let mut config = None;
        let mut summary_only = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--config" => {
                    let Some(path) = args.next() else {
                        return Err(anyhow!("--config expects a file path"));
                    };
                    config = Some(PathBuf::from(path));
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --config <file> or --summary-only"
                    ));
                }
            }
        }
        Ok(Self {
            assets: PathBuf::from(assets),
            config,
            summary_only,
        })
    }
}
