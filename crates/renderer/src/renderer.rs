use crate::error::Result;
use glow::HasContext;
use std::path::Path;

/// Shared lifecycle of the volume renderers
pub trait Renderer {
    /// Get the name of the renderer
    fn name(&self) -> &str;

    fn is_visible(&self) -> bool;

    /// Hidden renderers draw nothing and keep their accumulated state
    fn set_visible(&mut self, visible: bool);

    /// Discard accumulated samples, reallocating when the size changed
    fn clear(&mut self, width: u32, height: u32) -> Result<()>;

    /// Estimates currently summed in the accumulation target
    fn sample_count(&self) -> u32 {
        0
    }
}

/// Flip rows of a tightly packed image with `channels` bytes per pixel
///
/// GL reads rows bottom-up; images are stored top-down.
pub fn flip_rows(pixels: &[u8], width: u32, height: u32, channels: u32) -> Vec<u8> {
    let row = (width * channels) as usize;
    let mut flipped = vec![0u8; pixels.len()];
    for y in 0..height as usize {
        let src_row = &pixels[y * row..(y + 1) * row];
        let dst_y = height as usize - 1 - y;
        flipped[dst_y * row..(dst_y + 1) * row].copy_from_slice(src_row);
    }
    flipped
}

/// Save the currently bound read framebuffer to an image file
///
/// # Safety
///
/// Must be called with an active GL context on the current thread.
pub unsafe fn save_framebuffer_to_file(
    gl: &glow::Context,
    width: u32,
    height: u32,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut pixels = vec![0u8; (width * height * 4) as usize];
    unsafe {
        gl.read_pixels(
            0,
            0,
            width as i32,
            height as i32,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelPackData::Slice(Some(&mut pixels)),
        );
    }

    let rgb_pixels: Vec<u8> = pixels
        .chunks(4)
        .flat_map(|rgba| [rgba[0], rgba[1], rgba[2]])
        .collect();
    let flipped = flip_rows(&rgb_pixels, width, height, 3);

    image::save_buffer(path.as_ref(), &flipped, width, height, image::ColorType::Rgb8)?;
    tracing::info!(path = %path.as_ref().display(), "saved framebuffer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_rows() {
        let pixels = [1u8, 2, 3, 4, 5, 6];
        assert_eq!(flip_rows(&pixels, 1, 2, 3), vec![4, 5, 6, 1, 2, 3]);
    }
}
