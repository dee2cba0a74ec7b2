use std::path::Path;

use crate::error::ViewerError;

/// Default edge length of the fallback checkerboard, in pixels.
pub const CHECKER_SIZE: u32 = 128;
/// Default tile edge of the fallback checkerboard, in pixels.
pub const CHECKER_TILE: u32 = 16;

const CHECKER_LIGHT: u8 = 230;
const CHECKER_DARK: u8 = 30;

/// Decoded image in tightly packed RGBA8 rows, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decodes any supported image file into RGBA8.
    pub fn decode_file(path: &Path, flip_vertical: bool) -> Result<Self, ViewerError> {
        let decoded = image::open(path).map_err(|err| ViewerError::decode(path, err))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut texture = Self {
            width,
            height,
            pixels: rgba.into_raw(),
        };
        if flip_vertical {
            texture.flip_vertical();
        }
        Ok(texture)
    }

    /// Alternating light/dark square tiles, opaque gray scale.
    pub fn checkerboard(size: u32, tile: u32) -> Self {
        let size = size.max(1);
        let tile = tile.max(1);
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let on = ((x / tile) + (y / tile)) % 2 == 0;
                let c = if on { CHECKER_LIGHT } else { CHECKER_DARK };
                pixels.extend_from_slice(&[c, c, c, 255]);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn default_checkerboard() -> Self {
        Self::checkerboard(CHECKER_SIZE, CHECKER_TILE)
    }

    pub fn flip_vertical(&mut self) {
        let row = self.width as usize * 4;
        let height = self.height as usize;
        for y in 0..height / 2 {
            let (top, bottom) = self.pixels.split_at_mut((height - 1 - y) * row);
            top[y * row..(y + 1) * row].swap_with_slice(&mut bottom[..row]);
        }
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
