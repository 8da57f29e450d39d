pub(crate) mod decode;

/// A decoded raster held for the duration of one plot invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Vec<u8>,
}

impl RasterImage {
    /// Wrap an existing premultiplied buffer, checking its length.
    pub fn from_premul(
        width: u32,
        height: u32,
        rgba8_premul: Vec<u8>,
    ) -> crate::SkyplotResult<Self> {
        if width == 0 || height == 0 {
            return Err(crate::SkyplotError::load(format!(
                "image has empty extent {width}x{height}"
            )));
        }
        if rgba8_premul.len() != width as usize * height as usize * 4 {
            return Err(crate::SkyplotError::load(
                "image byte length does not match its dimensions",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul,
        })
    }

    /// Solid-color image, mostly useful for tests and benchmarks.
    pub fn filled(width: u32, height: u32, premul: [u8; 4]) -> Self {
        let mut rgba8_premul = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            rgba8_premul.extend_from_slice(&premul);
        }
        Self {
            width,
            height,
            rgba8_premul,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.rgba8_premul[i..i + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}
