use crate::foundation::error::{CardError, CardResult};

pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8Premul {
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            (((u16::from(c) * u16::from(a)) + 127) / 255) as u8
        }
        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A painted canvas as tightly packed, row-major, premultiplied RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes.
    pub data: Vec<u8>,
}

impl Surface {
    /// Allocate a fully transparent surface.
    pub fn new(width: u32, height: u32) -> CardResult<Self> {
        let (w, h) = checked_surface_dims(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; (w as usize) * (h as usize) * 4],
        })
    }

    /// Read one premultiplied pixel; `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8Premul> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some(Rgba8Premul {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
    }
}

/// Validate surface dimensions against what the CPU rasterizer can address.
pub(crate) fn checked_surface_dims(width: u32, height: u32) -> CardResult<(u16, u16)> {
    if width == 0 || height == 0 {
        return Err(CardError::validation(format!(
            "surface must be non-empty, got {width}x{height}"
        )));
    }
    let w: u16 = width
        .try_into()
        .map_err(|_| CardError::validation("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| CardError::validation("surface height exceeds u16"))?;
    Ok((w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
