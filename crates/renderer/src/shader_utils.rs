//! Shader compilation and the shared program library

use crate::error::{RenderError, Result};
use crate::gl_resources::OwnedProgram;
use glow::*;
use std::sync::Arc;

pub const PHOTON_VERTEX_SOURCE: &str = include_str!("shaders/photon.vert");
pub const PHOTON_FRAGMENT_SOURCE: &str = include_str!("shaders/photon.frag");
pub const DISPLAY_VERTEX_SOURCE: &str = include_str!("shaders/display.vert");
pub const DISPLAY_FRAGMENT_SOURCE: &str = include_str!("shaders/display.frag");
pub const SLICE_VERTEX_SOURCE: &str = include_str!("shaders/slice.vert");
pub const SLICE_FRAGMENT_SOURCE: &str = include_str!("shaders/slice.frag");

fn stage_name(shader_type: u32) -> &'static str {
    match shader_type {
        VERTEX_SHADER => "vertex",
        FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

/// Compile a shader from source code
///
/// # Safety
/// Requires an active OpenGL context
pub unsafe fn compile_shader(gl: &Context, shader_type: u32, source: &str) -> Result<Shader> {
    unsafe {
        let shader = gl
            .create_shader(shader_type)
            .map_err(|reason| RenderError::Allocation {
                what: "shader",
                reason,
            })?;

        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            let stage = stage_name(shader_type);
            tracing::error!(stage, %log, "shader compilation failed");
            return Err(RenderError::ShaderCompile { stage, log });
        }

        Ok(shader)
    }
}

/// Create and link a shader program from vertex and fragment shader sources
///
/// On failure every intermediate object is deleted, so no invalid program
/// handle escapes.
///
/// # Safety
/// Requires an active OpenGL context
pub unsafe fn create_program(
    gl: &Context,
    name: &'static str,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<Program> {
    unsafe {
        let program = gl
            .create_program()
            .map_err(|reason| RenderError::Allocation {
                what: "program",
                reason,
            })?;

        let vertex_shader = match compile_shader(gl, VERTEX_SHADER, vertex_src) {
            Ok(shader) => shader,
            Err(e) => {
                gl.delete_program(program);
                return Err(e);
            }
        };
        let fragment_shader = match compile_shader(gl, FRAGMENT_SHADER, fragment_src) {
            Ok(shader) => shader,
            Err(e) => {
                gl.delete_shader(vertex_shader);
                gl.delete_program(program);
                return Err(e);
            }
        };

        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.link_program(program);

        gl.detach_shader(program, vertex_shader);
        gl.detach_shader(program, fragment_shader);
        gl.delete_shader(vertex_shader);
        gl.delete_shader(fragment_shader);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            tracing::error!(program = name, %log, "program link failed");
            return Err(RenderError::ProgramLink { name, log });
        }

        Ok(program)
    }
}

/// Compile-once owner of every program the renderers use
///
/// Build it once per GL context and hand an `Rc` to each renderer.
#[derive(Debug)]
pub struct ShaderLibrary {
    pub photon: OwnedProgram,
    pub display: OwnedProgram,
    pub slice: OwnedProgram,
}

impl ShaderLibrary {
    pub fn compile(gl: &Arc<Context>) -> Result<Self> {
        let build = |name: &'static str, vs: &str, fs: &str| -> Result<OwnedProgram> {
            let program = unsafe { create_program(gl, name, vs, fs)? };
            tracing::info!(program = name, "compiled shader program");
            Ok(OwnedProgram::from_raw(gl, program))
        };

        Ok(Self {
            photon: build("photon", PHOTON_VERTEX_SOURCE, PHOTON_FRAGMENT_SOURCE)?,
            display: build("display", DISPLAY_VERTEX_SOURCE, DISPLAY_FRAGMENT_SOURCE)?,
            slice: build("slice", SLICE_VERTEX_SOURCE, SLICE_FRAGMENT_SOURCE)?,
        })
    }
}
