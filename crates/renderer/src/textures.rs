//! GPU copies of the volume resource set
//!
//! Every slot always holds a texture: absent resources are replaced by 1x1
//! fallbacks that read as empty space (volume 0, gradient 0.5 which decodes
//! to zero, transparent LUT, black environment). Sampler state is fixed at
//! upload time.

use crate::error::Result;
use crate::gl_resources::OwnedTexture;
use glam::Vec3;
use glow::*;
use std::sync::Arc;
use volume::{CubeFace, EnvironmentMap, GradientVolume, ResourceSet, TransferFunction, Volume};

/// Texture unit assignments shared with the shaders
pub const VOLUME_UNIT: u32 = 0;
pub const GRADIENT_UNIT: u32 = 1;
pub const LUT_UNIT: u32 = 2;
pub const ENVIRONMENT_UNIT: u32 = 3;

const VOLUME_BORDER: [f32; 4] = [0.0; 4];
const GRADIENT_BORDER: [f32; 4] = [0.5, 0.5, 0.5, 0.0];

/// Uploaded resources plus bookkeeping about which ones are real
#[derive(Debug)]
pub struct GpuResources {
    volume: OwnedTexture,
    gradient: OwnedTexture,
    lut: OwnedTexture,
    environment: OwnedTexture,
    volume_dims: Vec3,
    has_volume: bool,
}

impl GpuResources {
    /// Upload every resource in `resources`, substituting fallbacks
    pub fn upload(gl: &Arc<Context>, resources: &ResourceSet) -> Result<Self> {
        let volume = match &resources.volume {
            Some(v) => upload_volume(gl, v)?,
            None => {
                tracing::warn!("no volume bound, photon march sees empty space");
                upload_r32f_3d(gl, 1, 1, 1, &[0.0])?
            }
        };
        let gradient = match &resources.gradient {
            Some(g) => upload_gradient(gl, g)?,
            None => upload_fallback_gradient(gl)?,
        };
        let lut = match &resources.lut {
            Some(l) => upload_lut(gl, l)?,
            None => {
                tracing::warn!("no transfer function bound, surfaces are black");
                upload_rgba32f_1d(gl, 1, &[0.0; 4])?
            }
        };
        let environment = match &resources.environment {
            Some(e) => upload_environment(gl, e)?,
            None => {
                tracing::warn!("no environment map bound, background is black");
                upload_environment(gl, &EnvironmentMap::uniform(Vec3::ZERO))?
            }
        };

        let volume_dims = resources
            .volume
            .as_ref()
            .map_or(Vec3::ONE, |v| v.dims().as_vec3());

        Ok(Self {
            volume,
            gradient,
            lut,
            environment,
            volume_dims,
            has_volume: resources.volume.is_some(),
        })
    }

    /// Voxel dimensions for the `u_tex_dim` uniform
    pub fn volume_dims(&self) -> Vec3 {
        self.volume_dims
    }

    pub fn has_volume(&self) -> bool {
        self.has_volume
    }

    /// # Safety
    /// Requires an active OpenGL context
    pub unsafe fn bind_volume(&self, gl: &Context, unit: u32) {
        unsafe { bind(gl, unit, TEXTURE_3D, &self.volume) }
    }

    /// # Safety
    /// Requires an active OpenGL context
    pub unsafe fn bind_gradient(&self, gl: &Context, unit: u32) {
        unsafe { bind(gl, unit, TEXTURE_3D, &self.gradient) }
    }

    /// # Safety
    /// Requires an active OpenGL context
    pub unsafe fn bind_lut(&self, gl: &Context, unit: u32) {
        unsafe { bind(gl, unit, TEXTURE_1D, &self.lut) }
    }

    /// # Safety
    /// Requires an active OpenGL context
    pub unsafe fn bind_environment(&self, gl: &Context, unit: u32) {
        unsafe { bind(gl, unit, TEXTURE_CUBE_MAP, &self.environment) }
    }

    /// Bind all four textures to their default units
    ///
    /// # Safety
    /// Requires an active OpenGL context
    pub unsafe fn bind_all(&self, gl: &Context) {
        unsafe {
            self.bind_volume(gl, VOLUME_UNIT);
            self.bind_gradient(gl, GRADIENT_UNIT);
            self.bind_lut(gl, LUT_UNIT);
            self.bind_environment(gl, ENVIRONMENT_UNIT);
            gl.active_texture(TEXTURE0);
        }
    }
}

unsafe fn bind(gl: &Context, unit: u32, target: u32, texture: &OwnedTexture) {
    unsafe {
        gl.active_texture(TEXTURE0 + unit);
        gl.bind_texture(target, Some(texture.raw()));
    }
}

unsafe fn set_linear(gl: &Context, target: u32) {
    unsafe {
        gl.tex_parameter_i32(target, TEXTURE_MIN_FILTER, LINEAR as i32);
        gl.tex_parameter_i32(target, TEXTURE_MAG_FILTER, LINEAR as i32);
    }
}

unsafe fn set_3d_border(gl: &Context, border: &[f32; 4]) {
    unsafe {
        set_linear(gl, TEXTURE_3D);
        gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_WRAP_S, CLAMP_TO_BORDER as i32);
        gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_WRAP_T, CLAMP_TO_BORDER as i32);
        gl.tex_parameter_i32(TEXTURE_3D, TEXTURE_WRAP_R, CLAMP_TO_BORDER as i32);
        gl.tex_parameter_f32_slice(TEXTURE_3D, TEXTURE_BORDER_COLOR, border);
    }
}

fn upload_volume(gl: &Arc<Context>, volume: &Volume) -> Result<OwnedTexture> {
    let dims = volume.dims();
    tracing::info!(
        width = dims.width,
        height = dims.height,
        depth = dims.depth,
        "uploading volume texture"
    );
    upload_r32f_3d(gl, dims.width, dims.height, dims.depth, volume.data())
}

fn upload_r32f_3d(
    gl: &Arc<Context>,
    width: u32,
    height: u32,
    depth: u32,
    data: &[f32],
) -> Result<OwnedTexture> {
    let texture = OwnedTexture::new(gl)?;
    unsafe {
        gl.bind_texture(TEXTURE_3D, Some(texture.raw()));
        gl.pixel_store_i32(UNPACK_ALIGNMENT, 1);
        gl.tex_image_3d(
            TEXTURE_3D,
            0,
            R32F as i32,
            width as i32,
            height as i32,
            depth as i32,
            0,
            RED,
            FLOAT,
            PixelUnpackData::Slice(Some(bytemuck::cast_slice(data))),
        );
        set_3d_border(gl, &VOLUME_BORDER);
        gl.bind_texture(TEXTURE_3D, None);
    }
    Ok(texture)
}

fn upload_gradient(gl: &Arc<Context>, gradient: &GradientVolume) -> Result<OwnedTexture> {
    let dims = gradient.dims();
    let bytes = gradient.to_rgb8();
    let texture = OwnedTexture::new(gl)?;
    unsafe {
        gl.bind_texture(TEXTURE_3D, Some(texture.raw()));
        gl.pixel_store_i32(UNPACK_ALIGNMENT, 1);
        gl.tex_image_3d(
            TEXTURE_3D,
            0,
            RGB8 as i32,
            dims.width as i32,
            dims.height as i32,
            dims.depth as i32,
            0,
            RGB,
            UNSIGNED_BYTE,
            PixelUnpackData::Slice(Some(&bytes)),
        );
        set_3d_border(gl, &GRADIENT_BORDER);
        gl.bind_texture(TEXTURE_3D, None);
    }
    Ok(texture)
}

/// Float texel so the bias decodes to exactly zero
fn upload_fallback_gradient(gl: &Arc<Context>) -> Result<OwnedTexture> {
    let texel = [0.5f32; 3];
    let texture = OwnedTexture::new(gl)?;
    unsafe {
        gl.bind_texture(TEXTURE_3D, Some(texture.raw()));
        gl.tex_image_3d(
            TEXTURE_3D,
            0,
            RGB32F as i32,
            1,
            1,
            1,
            0,
            RGB,
            FLOAT,
            PixelUnpackData::Slice(Some(bytemuck::cast_slice(&texel))),
        );
        set_3d_border(gl, &GRADIENT_BORDER);
        gl.bind_texture(TEXTURE_3D, None);
    }
    Ok(texture)
}

fn upload_lut(gl: &Arc<Context>, lut: &TransferFunction) -> Result<OwnedTexture> {
    upload_rgba32f_1d(gl, lut.len() as u32, &lut.to_rgba_f32())
}

fn upload_rgba32f_1d(gl: &Arc<Context>, width: u32, data: &[f32]) -> Result<OwnedTexture> {
    let texture = OwnedTexture::new(gl)?;
    unsafe {
        gl.bind_texture(TEXTURE_1D, Some(texture.raw()));
        gl.tex_image_1d(
            TEXTURE_1D,
            0,
            RGBA32F as i32,
            width as i32,
            0,
            RGBA,
            FLOAT,
            PixelUnpackData::Slice(Some(bytemuck::cast_slice(data))),
        );
        set_linear(gl, TEXTURE_1D);
        gl.tex_parameter_i32(TEXTURE_1D, TEXTURE_WRAP_S, CLAMP_TO_EDGE as i32);
        gl.bind_texture(TEXTURE_1D, None);
    }
    Ok(texture)
}

fn upload_environment(gl: &Arc<Context>, environment: &EnvironmentMap) -> Result<OwnedTexture> {
    let size = environment.size() as i32;
    let texture = OwnedTexture::new(gl)?;
    unsafe {
        gl.bind_texture(TEXTURE_CUBE_MAP, Some(texture.raw()));
        gl.pixel_store_i32(UNPACK_ALIGNMENT, 1);
        for face in CubeFace::ALL {
            let texels = environment.face_rgb_f32(face);
            gl.tex_image_2d(
                TEXTURE_CUBE_MAP_POSITIVE_X + face.index() as u32,
                0,
                RGB32F as i32,
                size,
                size,
                0,
                RGB,
                FLOAT,
                PixelUnpackData::Slice(Some(bytemuck::cast_slice(&texels))),
            );
        }
        set_linear(gl, TEXTURE_CUBE_MAP);
        gl.tex_parameter_i32(TEXTURE_CUBE_MAP, TEXTURE_WRAP_S, CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(TEXTURE_CUBE_MAP, TEXTURE_WRAP_T, CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(TEXTURE_CUBE_MAP, TEXTURE_WRAP_R, CLAMP_TO_EDGE as i32);
        gl.bind_texture(TEXTURE_CUBE_MAP, None);
    }
    Ok(texture)
}
