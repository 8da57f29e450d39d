//! Sky projections: the pixel <-> sky mappings consumed by the warp.

pub(crate) mod header;
pub(crate) mod tan;

use std::path::Path;

use anyhow::Context;

use crate::foundation::{
    core::{Point, SkyCoord},
    error::{SkyplotError, SkyplotResult},
};

/// A (possibly failing) mapping between pixel coordinates and the sky.
///
/// Both directions return `None` for points outside the projection's valid
/// domain. Callers treat that as data, not as an error.
pub trait SkyProjection: std::fmt::Debug {
    fn pixel_to_sky(&self, pixel: Point) -> Option<SkyCoord>;

    fn sky_to_pixel(&self, sky: SkyCoord) -> Option<Point>;
}

/// Read a TAN or TAN-SIP projection from a FITS header file or a text header.
pub fn load_projection(path: &Path) -> SkyplotResult<tan::TanWcs> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read WCS file '{}'", path.display()))
        .map_err(|e| SkyplotError::config(format!("Failed to read WCS file: {e:#}")))?;
    let header = if header::FitsHeader::is_fits(&bytes) {
        header::FitsHeader::read_fits(path).map_err(|e| {
            SkyplotError::config(format!(
                "Failed to read WCS file \"{}\": {e:#}",
                path.display()
            ))
        })?
    } else {
        header::FitsHeader::parse(&bytes)
    };
    tan::TanWcs::from_header(&header).map_err(|e| {
        SkyplotError::config(format!(
            "Failed to read WCS file \"{}\": {e}",
            path.display()
        ))
    })
}
