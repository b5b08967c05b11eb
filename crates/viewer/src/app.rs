use anyhow::{Context as _, anyhow};
use glow::*;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, WindowSurface};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasWindowHandle;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use renderer::renderer::save_framebuffer_to_file;
use renderer::{GpuResources, PhotonRenderer, Renderer, ShaderLibrary, TextureSliceRenderer};
use volume::ResourceSet;

use crate::camera::OrbitCamera;
use crate::config::ViewerConfig;

const THRESHOLD_STEP: f32 = 0.01;
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Save one frame after a fixed number of accumulation passes, then exit
#[derive(Debug, Clone)]
pub struct FrameCapture {
    pub path: PathBuf,
    pub after_frames: u32,
}

/// GL objects that live exactly as long as the context
struct GlScene {
    resources: GpuResources,
    photon: PhotonRenderer,
    slice: TextureSliceRenderer,
}

pub struct VolumeViewerApp {
    // Window and GL state
    window: Option<Window>,
    gl_context: Option<glutin::context::PossiblyCurrentContext>,
    gl_surface: Option<glutin::surface::Surface<WindowSurface>>,
    gl: Option<Arc<Context>>,

    // Rendering state
    scene: Option<GlScene>,
    resources: ResourceSet,
    camera: OrbitCamera,

    config: ViewerConfig,
    seed: u64,

    // Timing
    frame_count: u32,
    last_report: Instant,

    capture: Option<FrameCapture>,
}

impl VolumeViewerApp {
    pub fn new(
        config: ViewerConfig,
        resources: ResourceSet,
        seed: u64,
        capture: Option<FrameCapture>,
    ) -> Self {
        let camera = OrbitCamera::new(config.camera.distance, config.camera.fov_degrees);
        if let Some(capture) = &capture {
            info!(path = %capture.path.display(), frames = capture.after_frames, "will capture frame");
        }

        Self {
            window: None,
            gl_context: None,
            gl_surface: None,
            gl: None,
            scene: None,
            resources,
            camera,
            config,
            seed,
            frame_count: 0,
            last_report: Instant::now(),
            capture,
        }
    }

    fn init_gl(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_depth_size(24)
            .with_transparency(false);

        let display_builder = DisplayBuilder::new().with_window_attributes(Some(window_attributes));

        // glutin reports an error instead of an empty config list
        let (window, gl_config) = display_builder
            .build(event_loop, template, |configs| {
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() > accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    .expect("glutin yields at least one config")
            })
            .map_err(|e| anyhow!("failed to create window: {e}"))?;

        let window = window.context("display builder created no window")?;
        let window_handle = window.window_handle()?.as_raw();
        let gl_display = gl_config.display();

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(window_handle));

        let gl_context = unsafe { gl_display.create_context(&gl_config, &context_attributes)? };

        let size = window.inner_size();
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window_handle,
            NonZeroU32::new(size.width).context("window has zero width")?,
            NonZeroU32::new(size.height).context("window has zero height")?,
        );

        let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs)? };
        let gl_context = gl_context.make_current(&gl_surface)?;

        let gl = Arc::new(unsafe {
            Context::from_loader_function_cstr(|s| gl_display.get_proc_address(s))
        });
        info!("OpenGL context created");

        let shaders = Rc::new(ShaderLibrary::compile(&gl)?);
        let resources = GpuResources::upload(&gl, &self.resources)?;
        let photon = PhotonRenderer::new(
            &gl,
            Rc::clone(&shaders),
            self.config.photon,
            size.width,
            size.height,
            self.seed,
        )?;
        let mut slice = TextureSliceRenderer::new(&gl, shaders, self.config.slice.settings())?;
        slice.set_visible(self.config.slice.visible);

        info!("Volume viewer initialized");
        info!("Controls:");
        info!("  Left drag: orbit, scroll: zoom");
        info!("  B: toggle back-face culling, [ / ]: gradient threshold");
        info!("  P: toggle photon pass, L: toggle slice, R: restart accumulation");

        self.window = Some(window);
        self.gl_context = Some(gl_context);
        self.gl_surface = Some(gl_surface);
        self.gl = Some(gl);
        self.scene = Some(GlScene {
            resources,
            photon,
            slice,
        });
        Ok(())
    }

    /// Restart convergence at the current window size
    fn clear_accumulation(&mut self) {
        let (Some(window), Some(scene)) = (&self.window, &mut self.scene) else {
            return;
        };
        let size = window.inner_size();
        if let Err(e) = scene.photon.clear(size.width, size.height) {
            error!("Failed to clear photon accumulation: {}", e);
        }
        window.request_redraw();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        match key {
            KeyCode::Escape => {
                self.cleanup();
                event_loop.exit();
                return;
            }
            KeyCode::KeyB => {
                let enabled = !scene.photon.settings().back_face_culling;
                scene.photon.set_back_face_culling(enabled);
                info!(enabled, "back-face culling");
            }
            KeyCode::BracketLeft | KeyCode::BracketRight => {
                let current = scene.photon.settings().gradient_threshold;
                let threshold = if key == KeyCode::BracketLeft {
                    (current - THRESHOLD_STEP).max(0.0)
                } else {
                    current + THRESHOLD_STEP
                };
                if let Err(e) = scene.photon.set_gradient_threshold(threshold) {
                    warn!("{}", e);
                    return;
                }
                info!(threshold, "gradient threshold");
            }
            KeyCode::KeyP => {
                let visible = !scene.photon.is_visible();
                scene.photon.set_visible(visible);
                info!(visible, "photon pass");
            }
            KeyCode::KeyL => {
                let visible = !scene.slice.is_visible();
                scene.slice.set_visible(visible);
                info!(visible, "slice");
                // The slice does not accumulate
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
                return;
            }
            KeyCode::KeyR => {}
            _ => return,
        }

        self.clear_accumulation();
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        if self.camera.take_changed() {
            self.clear_accumulation();
        }

        let (Some(window), Some(gl), Some(gl_context), Some(gl_surface), Some(scene)) = (
            self.window.as_ref(),
            self.gl.as_ref(),
            self.gl_context.as_ref(),
            self.gl_surface.as_ref(),
            self.scene.as_mut(),
        ) else {
            return;
        };

        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.frame_count += 1;

        unsafe {
            gl.viewport(0, 0, size.width as i32, size.height as i32);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT);
        }

        let frame = self.camera.frame_matrices(size.width, size.height);
        if let Err(e) = scene.photon.render(&frame, &scene.resources) {
            error!("Photon pass failed: {}", e);
        }
        scene.slice.render(&frame, &scene.resources);

        if self.last_report.elapsed() >= REPORT_INTERVAL {
            self.last_report = Instant::now();
            debug!(
                frames = self.frame_count,
                samples = scene.photon.sample_count(),
                "progressive refinement"
            );
        }

        // Capture before swap so the back buffer still holds the frame
        let progress = if scene.photon.is_visible() {
            scene.photon.sample_count()
        } else {
            self.frame_count
        };
        let capture_due = self
            .capture
            .as_ref()
            .is_some_and(|c| progress >= c.after_frames.max(1));
        if capture_due {
            if let Some(capture) = self.capture.take() {
                match unsafe { save_framebuffer_to_file(gl, size.width, size.height, &capture.path) } {
                    Ok(()) => info!(path = %capture.path.display(), "Frame saved"),
                    Err(e) => error!("Failed to save frame: {}", e),
                }
            }
        }

        if let Err(e) = gl_surface.swap_buffers(gl_context) {
            error!("Failed to swap buffers: {}", e);
        }

        if capture_due {
            self.cleanup();
            event_loop.exit();
            return;
        }

        window.request_redraw();
    }

    fn cleanup(&mut self) {
        debug!("Cleaning up GL resources");

        // GL objects delete themselves and need the context alive
        self.scene = None;

        // Surface must be released before context
        self.gl = None;
        self.gl_surface = None;
        self.gl_context = None;

        self.window = None;
    }
}

impl ApplicationHandler for VolumeViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.init_gl(event_loop) {
            error!("Failed to initialize viewer: {:#}", e);
            self.cleanup();
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.cleanup();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let (Some(gl_surface), Some(gl_context), Some(width), Some(height)) = (
                    self.gl_surface.as_ref(),
                    self.gl_context.as_ref(),
                    NonZeroU32::new(size.width),
                    NonZeroU32::new(size.height),
                ) {
                    gl_surface.resize(gl_context, width, height);
                }
                self.clear_accumulation();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        self.handle_key(event_loop, key);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.camera.dragging = state == ElementState::Pressed;
                    if !self.camera.dragging {
                        self.camera.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.camera.dragging {
                    if let Some((last_x, last_y)) = self.camera.last_mouse_pos {
                        let delta_x = position.x as f32 - last_x;
                        let delta_y = position.y as f32 - last_y;
                        self.camera.handle_mouse_drag(delta_x, delta_y);
                    }
                    self.camera.last_mouse_pos = Some((position.x as f32, position.y as f32));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll_delta = match delta {
                    MouseScrollDelta::LineDelta(_x, y) => y * 2.0,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                };
                self.camera.handle_scroll(scroll_delta);
            }
            WindowEvent::RedrawRequested => {
                self.render(event_loop);
            }
            _ => {}
        }
    }
}
