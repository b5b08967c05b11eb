//! Owned OpenGL object handles
//!
//! Each wrapper owns exactly one GL name and deletes it on drop. They keep
//! the context alive through an `Arc`, so the owning context must still be
//! current on this thread when a wrapper is dropped.

use crate::error::{RenderError, Result};
use glow::HasContext;
use std::sync::Arc;

macro_rules! owned_gl_object {
    ($(#[$meta:meta])* $name:ident, $raw:ty, $create:ident, $delete:ident, $what:literal) => {
        $(#[$meta])*
        pub struct $name {
            gl: Arc<glow::Context>,
            raw: $raw,
        }

        impl $name {
            pub fn new(gl: &Arc<glow::Context>) -> Result<Self> {
                let raw = unsafe { gl.$create() }.map_err(|reason| RenderError::Allocation {
                    what: $what,
                    reason,
                })?;
                Ok(Self {
                    gl: Arc::clone(gl),
                    raw,
                })
            }

            /// Take ownership of an existing handle
            pub fn from_raw(gl: &Arc<glow::Context>, raw: $raw) -> Self {
                Self {
                    gl: Arc::clone(gl),
                    raw,
                }
            }

            pub fn raw(&self) -> $raw {
                self.raw
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                unsafe { self.gl.$delete(self.raw) };
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.raw).finish()
            }
        }
    };
}

owned_gl_object!(
    /// Texture object of any target
    OwnedTexture,
    glow::Texture,
    create_texture,
    delete_texture,
    "texture"
);

owned_gl_object!(
    /// Vertex, index, or uniform buffer
    OwnedBuffer,
    glow::Buffer,
    create_buffer,
    delete_buffer,
    "buffer"
);

owned_gl_object!(
    OwnedFramebuffer,
    glow::Framebuffer,
    create_framebuffer,
    delete_framebuffer,
    "framebuffer"
);

owned_gl_object!(
    OwnedRenderbuffer,
    glow::Renderbuffer,
    create_renderbuffer,
    delete_renderbuffer,
    "renderbuffer"
);

owned_gl_object!(
    OwnedVertexArray,
    glow::VertexArray,
    create_vertex_array,
    delete_vertex_array,
    "vertex array"
);

owned_gl_object!(
    /// Linked shader program
    OwnedProgram,
    glow::Program,
    create_program,
    delete_program,
    "program"
);
