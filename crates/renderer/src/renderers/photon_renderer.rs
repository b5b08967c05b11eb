//! GPU photon volume renderer
//!
//! Every call to [`PhotonRenderer::render`] adds one noisy radiance estimate
//! per pixel into a floating-point accumulation target (`ONE, ONE` blending),
//! then a display pass draws the target divided by the sample count into
//! whatever framebuffer was bound before the call.
//!
//! # Usage
//!
//! ```ignore
//! let shaders = Rc::new(ShaderLibrary::compile(&gl)?);
//! let mut photon = PhotonRenderer::new(&gl, shaders, PhotonSettings::default(), 800, 600, seed)?;
//!
//! // Whenever the camera, resources, or parameters change:
//! photon.clear(width, height)?;
//!
//! // Every frame:
//! photon.render(&frame, &gpu_resources)?;
//! ```

use crate::accumulation::{to_display_byte, Accumulation, AccumulationState};
use crate::error::{RenderError, Result};
use crate::gl_resources::{
    OwnedBuffer, OwnedFramebuffer, OwnedRenderbuffer, OwnedTexture, OwnedVertexArray,
};
use crate::photon::{CallRandomness, PhotonSettings, RANDOM_BLOCK_SIZE};
use crate::ray::FrameMatrices;
use crate::renderer::{flip_rows, Renderer};
use crate::shader_utils::ShaderLibrary;
use crate::textures::{GpuResources, ENVIRONMENT_UNIT, GRADIENT_UNIT, LUT_UNIT, VOLUME_UNIT};
use glow::*;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;
use std::sync::Arc;

/// Capability switches of a GL context
trait CapabilityState {
    fn is_enabled(&self, capability: u32) -> bool;
    fn set_enabled(&self, capability: u32, enabled: bool);
}

impl CapabilityState for Context {
    fn is_enabled(&self, capability: u32) -> bool {
        unsafe { HasContext::is_enabled(self, capability) }
    }

    fn set_enabled(&self, capability: u32, enabled: bool) {
        unsafe {
            if enabled {
                HasContext::enable(self, capability);
            } else {
                HasContext::disable(self, capability);
            }
        }
    }
}

/// Run `draw` with `capability` forced to `enabled`, then put the caller's state back
fn with_capability<C: CapabilityState + ?Sized, R>(
    gl: &C,
    capability: u32,
    enabled: bool,
    draw: impl FnOnce() -> R,
) -> R {
    let previous = gl.is_enabled(capability);
    if previous != enabled {
        gl.set_enabled(capability, enabled);
    }
    let result = draw();
    if previous != enabled {
        gl.set_enabled(capability, previous);
    }
    result
}

/// Uniform buffer binding point of `RandomBlock`
const RANDOM_BLOCK_BINDING: u32 = 0;

/// Positions in NDC space (-1 to 1), two triangles
#[rustfmt::skip]
const FULLSCREEN_QUAD: [f32; 12] = [
    -1.0, -1.0,
     1.0, -1.0,
     1.0,  1.0,
    -1.0, -1.0,
     1.0,  1.0,
    -1.0,  1.0,
];

struct FullscreenQuad {
    vao: OwnedVertexArray,
    _vbo: OwnedBuffer,
}

impl FullscreenQuad {
    fn new(gl: &Arc<Context>) -> Result<Self> {
        let vao = OwnedVertexArray::new(gl)?;
        let vbo = OwnedBuffer::new(gl)?;
        unsafe {
            gl.bind_vertex_array(Some(vao.raw()));
            gl.bind_buffer(ARRAY_BUFFER, Some(vbo.raw()));
            gl.buffer_data_u8_slice(
                ARRAY_BUFFER,
                bytemuck::cast_slice(&FULLSCREEN_QUAD),
                STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, FLOAT, false, 8, 0);
            gl.bind_vertex_array(None);
            gl.bind_buffer(ARRAY_BUFFER, None);
        }
        Ok(Self { vao, _vbo: vbo })
    }

    unsafe fn draw(&self, gl: &Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao.raw()));
            gl.draw_arrays(TRIANGLES, 0, 6);
            gl.bind_vertex_array(None);
        }
    }
}

/// Offscreen sum of estimates: RGB32F colour plus a 16-bit depth buffer
struct AccumulationTarget {
    framebuffer: OwnedFramebuffer,
    color: OwnedTexture,
    _depth: OwnedRenderbuffer,
    width: u32,
    height: u32,
}

impl AccumulationTarget {
    fn new(gl: &Arc<Context>, width: u32, height: u32) -> Result<Self> {
        let framebuffer = OwnedFramebuffer::new(gl)?;
        let color = OwnedTexture::new(gl)?;
        let depth = OwnedRenderbuffer::new(gl)?;

        let status = unsafe {
            gl.bind_texture(TEXTURE_2D, Some(color.raw()));
            gl.tex_image_2d(
                TEXTURE_2D,
                0,
                RGB32F as i32,
                width as i32,
                height as i32,
                0,
                RGB,
                FLOAT,
                PixelUnpackData::Slice(None),
            );
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MIN_FILTER, NEAREST as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MAG_FILTER, NEAREST as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_S, CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_T, CLAMP_TO_EDGE as i32);

            gl.bind_renderbuffer(RENDERBUFFER, Some(depth.raw()));
            gl.renderbuffer_storage(RENDERBUFFER, DEPTH_COMPONENT16, width as i32, height as i32);

            let previous = gl.get_parameter_framebuffer(FRAMEBUFFER_BINDING);
            gl.bind_framebuffer(FRAMEBUFFER, Some(framebuffer.raw()));
            gl.framebuffer_texture_2d(
                FRAMEBUFFER,
                COLOR_ATTACHMENT0,
                TEXTURE_2D,
                Some(color.raw()),
                0,
            );
            gl.framebuffer_renderbuffer(
                FRAMEBUFFER,
                DEPTH_ATTACHMENT,
                RENDERBUFFER,
                Some(depth.raw()),
            );
            let status = gl.check_framebuffer_status(FRAMEBUFFER);

            gl.bind_framebuffer(FRAMEBUFFER, previous);
            gl.bind_texture(TEXTURE_2D, None);
            gl.bind_renderbuffer(RENDERBUFFER, None);
            status
        };

        if status != FRAMEBUFFER_COMPLETE {
            tracing::error!(status, width, height, "accumulation framebuffer incomplete");
            return Err(RenderError::IncompleteFramebuffer {
                status,
                width,
                height,
            });
        }

        tracing::debug!(width, height, "allocated accumulation target");
        Ok(Self {
            framebuffer,
            color,
            _depth: depth,
            width,
            height,
        })
    }
}

struct PhotonUniforms {
    inv_projection: Option<UniformLocation>,
    inv_view_model: Option<UniformLocation>,
    resolution: Option<UniformLocation>,
    volume: Option<UniformLocation>,
    gradient: Option<UniformLocation>,
    lut: Option<UniformLocation>,
    environment: Option<UniformLocation>,
    tex_dim: Option<UniformLocation>,
    gradient_threshold: Option<UniformLocation>,
    back_face_culling: Option<UniformLocation>,
    max_bounce: Option<UniformLocation>,
    samples: Option<UniformLocation>,
    step_size: Option<UniformLocation>,
    march_budget: Option<UniformLocation>,
    jitter_seed: Option<UniformLocation>,
    random_float0: Option<UniformLocation>,
    random_float1: Option<UniformLocation>,
}

impl PhotonUniforms {
    unsafe fn locate(gl: &Context, program: Program) -> Self {
        unsafe {
            Self {
                inv_projection: gl.get_uniform_location(program, "u_inv_projection"),
                inv_view_model: gl.get_uniform_location(program, "u_inv_view_model"),
                resolution: gl.get_uniform_location(program, "u_resolution"),
                volume: gl.get_uniform_location(program, "u_volume"),
                gradient: gl.get_uniform_location(program, "u_gradient"),
                lut: gl.get_uniform_location(program, "u_lut"),
                environment: gl.get_uniform_location(program, "u_environment"),
                tex_dim: gl.get_uniform_location(program, "u_tex_dim"),
                gradient_threshold: gl.get_uniform_location(program, "u_gradient_threshold"),
                back_face_culling: gl.get_uniform_location(program, "u_back_face_culling"),
                max_bounce: gl.get_uniform_location(program, "u_max_bounce"),
                samples: gl.get_uniform_location(program, "u_samples"),
                step_size: gl.get_uniform_location(program, "u_step_size"),
                march_budget: gl.get_uniform_location(program, "u_march_budget"),
                jitter_seed: gl.get_uniform_location(program, "u_jitter_seed"),
                random_float0: gl.get_uniform_location(program, "u_random_float0"),
                random_float1: gl.get_uniform_location(program, "u_random_float1"),
            }
        }
    }
}

struct DisplayUniforms {
    accumulation: Option<UniformLocation>,
    sample_number: Option<UniformLocation>,
}

/// Progressive GPU photon renderer
pub struct PhotonRenderer {
    gl: Arc<Context>,
    shaders: Rc<ShaderLibrary>,
    settings: PhotonSettings,
    visible: bool,
    accumulation: Accumulation,
    rng: StdRng,
    quad: FullscreenQuad,
    random_block: OwnedBuffer,
    target: AccumulationTarget,
    photon_uniforms: PhotonUniforms,
    display_uniforms: DisplayUniforms,
}

impl PhotonRenderer {
    /// Create the renderer with an accumulation target of `width` x `height`
    ///
    /// `seed` drives the per-call host randomness.
    pub fn new(
        gl: &Arc<Context>,
        shaders: Rc<ShaderLibrary>,
        settings: PhotonSettings,
        width: u32,
        height: u32,
        seed: u64,
    ) -> Result<Self> {
        settings.validate()?;

        let quad = FullscreenQuad::new(gl)?;
        let target = AccumulationTarget::new(gl, width, height)?;

        let random_block = OwnedBuffer::new(gl)?;
        let photon = shaders.photon.raw();
        let display = shaders.display.raw();
        let (photon_uniforms, display_uniforms) = unsafe {
            gl.bind_buffer(UNIFORM_BUFFER, Some(random_block.raw()));
            gl.buffer_data_size(UNIFORM_BUFFER, RANDOM_BLOCK_SIZE as i32, DYNAMIC_DRAW);
            gl.bind_buffer(UNIFORM_BUFFER, None);

            match gl.get_uniform_block_index(photon, "RandomBlock") {
                Some(index) => gl.uniform_block_binding(photon, index, RANDOM_BLOCK_BINDING),
                None => tracing::warn!("photon program has no RandomBlock uniform block"),
            }

            (
                PhotonUniforms::locate(gl, photon),
                DisplayUniforms {
                    accumulation: gl.get_uniform_location(display, "u_accumulation"),
                    sample_number: gl.get_uniform_location(display, "u_sample_number"),
                },
            )
        };

        let mut accumulation = Accumulation::new();
        accumulation.initialize(width, height);

        tracing::info!(width, height, ?settings, "photon renderer initialized");
        Ok(Self {
            gl: Arc::clone(gl),
            shaders,
            settings,
            visible: true,
            accumulation,
            rng: StdRng::seed_from_u64(seed),
            quad,
            random_block,
            target,
            photon_uniforms,
            display_uniforms,
        })
    }

    pub fn settings(&self) -> &PhotonSettings {
        &self.settings
    }

    /// Replace all settings; takes effect on the next pass, callers clear
    pub fn set_settings(&mut self, settings: PhotonSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_gradient_threshold(&mut self, threshold: f32) -> Result<()> {
        self.set_settings(PhotonSettings {
            gradient_threshold: threshold,
            ..self.settings
        })
    }

    pub fn set_back_face_culling(&mut self, enabled: bool) {
        self.settings.back_face_culling = enabled;
    }

    pub fn set_max_bounce(&mut self, max_bounce: u32) -> Result<()> {
        self.set_settings(PhotonSettings {
            max_bounce,
            ..self.settings
        })
    }

    pub fn set_samples_per_call(&mut self, samples_per_call: u32) -> Result<()> {
        self.set_settings(PhotonSettings {
            samples_per_call,
            ..self.settings
        })
    }

    pub fn state(&self) -> AccumulationState {
        self.accumulation.state()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    /// Add one estimate per pixel, then display the running average
    ///
    /// The renderer's GL context must be current. Does nothing while hidden.
    pub fn render(&mut self, frame: &FrameMatrices, resources: &GpuResources) -> Result<()> {
        if !self.visible {
            return Ok(());
        }

        let randomness = CallRandomness::draw(&mut self.rng, &self.settings);
        let gl = Arc::clone(&self.gl);
        let (width, height) = self.size();

        unsafe {
            let previous_framebuffer = gl.get_parameter_framebuffer(FRAMEBUFFER_BINDING);
            let mut previous_viewport = [0i32; 4];
            gl.get_parameter_i32_slice(VIEWPORT, &mut previous_viewport);

            gl.bind_framebuffer(FRAMEBUFFER, Some(self.target.framebuffer.raw()));
            gl.viewport(0, 0, width as i32, height as i32);

            if self.accumulation.begin_pass() {
                gl.clear_color(0.0, 0.0, 0.0, 0.0);
                gl.clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT);
            }

            gl.blend_func(ONE, ONE);
            with_capability(&*gl, DEPTH_TEST, false, || {
                with_capability(&*gl, BLEND, true, || {
                    self.draw_photon_pass(&gl, frame, resources, &randomness)
                })
            });

            gl.bind_framebuffer(FRAMEBUFFER, previous_framebuffer);
            gl.viewport(
                previous_viewport[0],
                previous_viewport[1],
                previous_viewport[2],
                previous_viewport[3],
            );
        }

        self.accumulation.finish_pass();
        tracing::debug!(
            samples = self.accumulation.sample_count(),
            "photon pass accumulated"
        );

        self.display();
        Ok(())
    }

    unsafe fn draw_photon_pass(
        &self,
        gl: &Context,
        frame: &FrameMatrices,
        resources: &GpuResources,
        randomness: &CallRandomness,
    ) {
        let inverses = frame.inverses();
        let u = &self.photon_uniforms;
        let s = &self.settings;
        let tex_dim = resources.volume_dims();

        unsafe {
            let block = randomness.uniform_block();
            gl.bind_buffer(UNIFORM_BUFFER, Some(self.random_block.raw()));
            gl.buffer_sub_data_u8_slice(UNIFORM_BUFFER, 0, bytemuck::cast_slice(&block));
            gl.bind_buffer(UNIFORM_BUFFER, None);
            gl.bind_buffer_base(
                UNIFORM_BUFFER,
                RANDOM_BLOCK_BINDING,
                Some(self.random_block.raw()),
            );

            gl.use_program(Some(self.shaders.photon.raw()));

            if let Some(loc) = &u.inv_projection {
                gl.uniform_matrix_4_f32_slice(
                    Some(loc),
                    false,
                    &inverses.inv_projection.to_cols_array(),
                );
            }
            if let Some(loc) = &u.inv_view_model {
                gl.uniform_matrix_4_f32_slice(
                    Some(loc),
                    false,
                    &inverses.inv_view_model.to_cols_array(),
                );
            }
            if let Some(loc) = &u.resolution {
                gl.uniform_2_f32(
                    Some(loc),
                    self.target.width as f32,
                    self.target.height as f32,
                );
            }
            if let Some(loc) = &u.volume {
                gl.uniform_1_i32(Some(loc), VOLUME_UNIT as i32);
            }
            if let Some(loc) = &u.gradient {
                gl.uniform_1_i32(Some(loc), GRADIENT_UNIT as i32);
            }
            if let Some(loc) = &u.lut {
                gl.uniform_1_i32(Some(loc), LUT_UNIT as i32);
            }
            if let Some(loc) = &u.environment {
                gl.uniform_1_i32(Some(loc), ENVIRONMENT_UNIT as i32);
            }
            if let Some(loc) = &u.tex_dim {
                gl.uniform_3_f32(Some(loc), tex_dim.x, tex_dim.y, tex_dim.z);
            }
            if let Some(loc) = &u.gradient_threshold {
                gl.uniform_1_f32(Some(loc), s.gradient_threshold);
            }
            if let Some(loc) = &u.back_face_culling {
                gl.uniform_1_i32(Some(loc), s.back_face_culling as i32);
            }
            if let Some(loc) = &u.max_bounce {
                gl.uniform_1_i32(Some(loc), s.max_bounce as i32);
            }
            if let Some(loc) = &u.samples {
                gl.uniform_1_i32(Some(loc), s.samples_per_call as i32);
            }
            if let Some(loc) = &u.step_size {
                gl.uniform_1_f32(Some(loc), s.step_size);
            }
            if let Some(loc) = &u.march_budget {
                gl.uniform_1_i32(Some(loc), s.march_budget as i32);
            }
            if let Some(loc) = &u.jitter_seed {
                gl.uniform_1_f32(Some(loc), s.jitter_seed);
            }
            if let Some(loc) = &u.random_float0 {
                gl.uniform_1_f32(Some(loc), randomness.float0);
            }
            if let Some(loc) = &u.random_float1 {
                gl.uniform_1_f32(Some(loc), randomness.float1);
            }

            resources.bind_all(gl);
            self.quad.draw(gl);
            gl.use_program(None);
        }
    }

    /// Draw the running average into the current framebuffer
    ///
    /// The renderer's GL context must be current. Does nothing while hidden.
    pub fn display(&self) {
        if !self.visible {
            return;
        }
        let gl = &self.gl;
        let u = &self.display_uniforms;
        with_capability(&**gl, DEPTH_TEST, false, || unsafe {
            gl.use_program(Some(self.shaders.display.raw()));

            gl.active_texture(TEXTURE0);
            gl.bind_texture(TEXTURE_2D, Some(self.target.color.raw()));
            if let Some(loc) = &u.accumulation {
                gl.uniform_1_i32(Some(loc), 0);
            }
            if let Some(loc) = &u.sample_number {
                gl.uniform_1_i32(Some(loc), self.accumulation.sample_count() as i32);
            }

            self.quad.draw(gl);

            gl.bind_texture(TEXTURE_2D, None);
            gl.use_program(None);
        });
    }

    /// Read the accumulation target back as an averaged 8-bit image
    pub fn average_image(&self) -> Result<RgbImage> {
        let (width, height) = self.size();
        let mut sums = vec![0.0f32; self.accumulation.pixel_count() * 3];
        unsafe {
            let gl = &self.gl;
            let previous = gl.get_parameter_framebuffer(FRAMEBUFFER_BINDING);
            gl.bind_framebuffer(FRAMEBUFFER, Some(self.target.framebuffer.raw()));
            gl.pixel_store_i32(PACK_ALIGNMENT, 1);
            gl.read_pixels(
                0,
                0,
                width as i32,
                height as i32,
                RGB,
                FLOAT,
                PixelPackData::Slice(Some(bytemuck::cast_slice_mut(&mut sums))),
            );
            gl.bind_framebuffer(FRAMEBUFFER, previous);
        }

        let scale = self.accumulation.display_scale();
        let bytes: Vec<u8> = sums.iter().map(|&v| to_display_byte(v, scale)).collect();
        let flipped = flip_rows(&bytes, width, height, 3);
        RgbImage::from_raw(width, height, flipped).ok_or_else(|| RenderError::Allocation {
            what: "image buffer",
            reason: format!("{}x{} readback size mismatch", width, height),
        })
    }
}

impl Renderer for PhotonRenderer {
    fn name(&self) -> &str {
        "photon"
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Discard accumulated samples; ignored while hidden
    fn clear(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.visible {
            tracing::debug!("photon clear ignored while hidden");
            return Ok(());
        }
        if width == 0 || height == 0 {
            // Minimised window: restart convergence, keep the current target
            self.accumulation.restart();
            return Ok(());
        }
        if (width, height) != self.size() {
            self.target = AccumulationTarget::new(&self.gl, width, height)?;
        }
        self.accumulation.clear(width, height);
        Ok(())
    }

    fn sample_count(&self) -> u32 {
        self.accumulation.sample_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordedCapabilities {
        enabled: RefCell<Vec<u32>>,
        calls: RefCell<Vec<(u32, bool)>>,
    }

    impl CapabilityState for RecordedCapabilities {
        fn is_enabled(&self, capability: u32) -> bool {
            self.enabled.borrow().contains(&capability)
        }

        fn set_enabled(&self, capability: u32, enabled: bool) {
            self.calls.borrow_mut().push((capability, enabled));
            let mut list = self.enabled.borrow_mut();
            list.retain(|&c| c != capability);
            if enabled {
                list.push(capability);
            }
        }
    }

    #[test]
    fn test_disabled_depth_test_stays_disabled() {
        let gl = RecordedCapabilities::default();
        let seen = with_capability(&gl, DEPTH_TEST, false, || gl.is_enabled(DEPTH_TEST));
        assert!(!seen);
        assert!(!gl.is_enabled(DEPTH_TEST));
        assert!(gl.calls.borrow().is_empty());
    }

    #[test]
    fn test_enabled_depth_test_is_restored() {
        let gl = RecordedCapabilities::default();
        gl.enabled.borrow_mut().push(DEPTH_TEST);
        let seen = with_capability(&gl, DEPTH_TEST, false, || gl.is_enabled(DEPTH_TEST));
        assert!(!seen);
        assert!(gl.is_enabled(DEPTH_TEST));
        assert_eq!(
            *gl.calls.borrow(),
            vec![(DEPTH_TEST, false), (DEPTH_TEST, true)]
        );
    }

    #[test]
    fn test_nested_capabilities_unwind() {
        let gl = RecordedCapabilities::default();
        gl.enabled.borrow_mut().push(DEPTH_TEST);
        with_capability(&gl, DEPTH_TEST, false, || {
            with_capability(&gl, BLEND, true, || {
                assert!(gl.is_enabled(BLEND));
                assert!(!gl.is_enabled(DEPTH_TEST));
            })
        });
        assert!(gl.is_enabled(DEPTH_TEST));
        assert!(!gl.is_enabled(BLEND));
    }
}
