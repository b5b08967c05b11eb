//! Texture slice renderer
//!
//! Draws a single quad through the volume at the model transform. Fragments
//! sample the volume texture directly and are thresholded after the
//! contrast/brightness mapping; see [`crate::slice`] for the same function
//! on the CPU.

use crate::error::Result;
use crate::gl_resources::{OwnedBuffer, OwnedVertexArray};
use crate::ray::FrameMatrices;
use crate::renderer::Renderer;
use crate::shader_utils::ShaderLibrary;
use crate::slice::{SliceSettings, SLICE_INDICES, SLICE_VERTICES};
use crate::textures::{GpuResources, VOLUME_UNIT};
use glow::*;
use std::rc::Rc;
use std::sync::Arc;

struct SliceUniforms {
    model_view_projection: Option<UniformLocation>,
    volume: Option<UniformLocation>,
    tex_dim: Option<UniformLocation>,
    brightness: Option<UniformLocation>,
    contrast: Option<UniformLocation>,
    threshold: Option<UniformLocation>,
}

pub struct TextureSliceRenderer {
    gl: Arc<Context>,
    shaders: Rc<ShaderLibrary>,
    /// Mapping parameters, read every frame
    pub settings: SliceSettings,
    visible: bool,
    vao: OwnedVertexArray,
    _vbo: OwnedBuffer,
    _ebo: OwnedBuffer,
    uniforms: SliceUniforms,
}

impl TextureSliceRenderer {
    pub fn new(gl: &Arc<Context>, shaders: Rc<ShaderLibrary>, settings: SliceSettings) -> Result<Self> {
        let vao = OwnedVertexArray::new(gl)?;
        let vbo = OwnedBuffer::new(gl)?;
        let ebo = OwnedBuffer::new(gl)?;
        let program = shaders.slice.raw();

        let uniforms = unsafe {
            gl.bind_vertex_array(Some(vao.raw()));

            gl.bind_buffer(ARRAY_BUFFER, Some(vbo.raw()));
            gl.buffer_data_u8_slice(
                ARRAY_BUFFER,
                bytemuck::cast_slice(&SLICE_VERTICES),
                STATIC_DRAW,
            );
            gl.bind_buffer(ELEMENT_ARRAY_BUFFER, Some(ebo.raw()));
            gl.buffer_data_u8_slice(
                ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&SLICE_INDICES),
                STATIC_DRAW,
            );

            // Position attribute (location 0), vec4
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 4, FLOAT, false, 16, 0);

            gl.bind_vertex_array(None);
            gl.bind_buffer(ARRAY_BUFFER, None);
            gl.bind_buffer(ELEMENT_ARRAY_BUFFER, None);

            SliceUniforms {
                model_view_projection: gl.get_uniform_location(program, "u_model_view_projection"),
                volume: gl.get_uniform_location(program, "u_volume"),
                tex_dim: gl.get_uniform_location(program, "u_tex_dim"),
                brightness: gl.get_uniform_location(program, "u_brightness"),
                contrast: gl.get_uniform_location(program, "u_contrast"),
                threshold: gl.get_uniform_location(program, "u_threshold"),
            }
        };

        Ok(Self {
            gl: Arc::clone(gl),
            shaders,
            settings,
            visible: true,
            vao,
            _vbo: vbo,
            _ebo: ebo,
            uniforms,
        })
    }

    /// Draw the slice into the current framebuffer
    ///
    /// Nothing is drawn while hidden or when no volume is bound.
    pub fn render(&self, frame: &FrameMatrices, resources: &GpuResources) {
        if !self.visible || !resources.has_volume() {
            return;
        }

        let gl = &self.gl;
        let u = &self.uniforms;
        let mvp = frame.model_view_projection();
        let tex_dim = resources.volume_dims();

        unsafe {
            gl.enable(DEPTH_TEST);
            gl.depth_mask(false);
            gl.disable(CULL_FACE);
            gl.enable(BLEND);
            gl.blend_func_separate(SRC_ALPHA, ONE_MINUS_SRC_ALPHA, ONE, ONE_MINUS_SRC_ALPHA);

            gl.use_program(Some(self.shaders.slice.raw()));

            if let Some(loc) = &u.model_view_projection {
                gl.uniform_matrix_4_f32_slice(Some(loc), false, &mvp.to_cols_array());
            }
            if let Some(loc) = &u.tex_dim {
                gl.uniform_3_f32(Some(loc), tex_dim.x, tex_dim.y, tex_dim.z);
            }
            if let Some(loc) = &u.volume {
                gl.uniform_1_i32(Some(loc), VOLUME_UNIT as i32);
            }
            if let Some(loc) = &u.brightness {
                gl.uniform_1_f32(Some(loc), self.settings.brightness);
            }
            if let Some(loc) = &u.contrast {
                gl.uniform_1_f32(Some(loc), self.settings.contrast);
            }
            if let Some(loc) = &u.threshold {
                gl.uniform_1_f32(Some(loc), self.settings.threshold);
            }
            resources.bind_volume(gl, VOLUME_UNIT);
            gl.active_texture(TEXTURE0);

            gl.bind_vertex_array(Some(self.vao.raw()));
            gl.draw_elements(TRIANGLES, SLICE_INDICES.len() as i32, UNSIGNED_INT, 0);
            gl.bind_vertex_array(None);

            gl.use_program(None);
            gl.disable(BLEND);
            gl.depth_mask(true);
        }
    }
}

impl Renderer for TextureSliceRenderer {
    fn name(&self) -> &str {
        "texture slice"
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Stateless across frames, nothing to discard
    fn clear(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
}
