use crate::foundation::error::{SkyplotError, SkyplotResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Pixel dimensions of the plot canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> SkyplotResult<Self> {
        if width == 0 || height == 0 {
            return Err(SkyplotError::config(format!(
                "canvas size must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// A celestial position in degrees (ICRS-like equatorial frame).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SkyCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyCoord {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Unit vector on the celestial sphere.
    pub fn to_unit_vector(self) -> [f64; 3] {
        let (ra, dec) = (self.ra_deg.to_radians(), self.dec_deg.to_radians());
        [dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin()]
    }

    pub fn from_unit_vector(v: [f64; 3]) -> Self {
        let ra = v[1].atan2(v[0]).to_degrees();
        let ra = if ra < 0.0 { ra + 360.0 } else { ra };
        let dec = v[2].clamp(-1.0, 1.0).asin().to_degrees();
        Self { ra_deg: ra, dec_deg: dec }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
