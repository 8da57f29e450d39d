//! Paints an image layer onto a [`RenderSurface`], either directly or warped
//! quad by quad through a [`Lattice`].

use crate::{
    assets::RasterImage,
    foundation::{
        core::{Affine, BezPath, Point, Rgba8},
        error::SkyplotResult,
    },
    render::surface::{ImageHandle, RenderSurface, SampleFilter},
    warp::{
        grid::{AA, AB, BA, BB, Lattice},
        quad::solve_quad,
    },
};

/// Which compositing path a plot took.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMode {
    Direct,
    Warp,
}

/// What a compositing call actually drew.
///
/// Quad counts describe the warp only; a direct blit reports all zeros.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompositeReport {
    pub mode: CompositeMode,
    pub quads_total: usize,
    pub quads_painted: usize,
    /// Quads with at least one node outside a projection's domain.
    pub quads_invalid: usize,
    /// Quads whose affine could not be inverted.
    pub quads_degenerate: usize,
    pub outlines_stroked: usize,
}

impl CompositeReport {
    fn direct() -> Self {
        Self {
            mode: CompositeMode::Direct,
            quads_total: 0,
            quads_painted: 0,
            quads_invalid: 0,
            quads_degenerate: 0,
            outlines_stroked: 0,
        }
    }
}

/// Outline style for the debug grid pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridStyle {
    pub color: Rgba8,
    pub width: f64,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            color: Rgba8::RED,
            width: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WarpOpts {
    /// Stroke every usable quad after painting; `None` disables the pass.
    pub debug_grid: Option<GridStyle>,
}

/// Closed outline `aa -> ab -> bb -> ba` in canvas coordinates.
pub fn quad_outline(corners: &[Point; 4]) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(corners[AA]);
    path.line_to(corners[AB]);
    path.line_to(corners[BB]);
    path.line_to(corners[BA]);
    path.close_path();
    path
}

/// Paint the whole image once, unscaled, at the canvas origin.
#[tracing::instrument(level = "debug", skip_all, fields(w = image.width, h = image.height))]
pub fn composite_direct<S: RenderSurface + ?Sized>(
    surface: &mut S,
    image: &RasterImage,
) -> SkyplotResult<CompositeReport> {
    let handle = surface.create_source(image, SampleFilter::Smooth)?;
    let painted = surface.paint(handle, None, Affine::IDENTITY);
    surface.release_source(handle);
    painted?;
    Ok(CompositeReport::direct())
}

/// Paint each usable quad of `lattice` through its own affine, then
/// optionally outline them.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(w = image.width, h = image.height, nx = lattice.nx(), ny = lattice.ny())
)]
pub fn composite_warped<S: RenderSurface + ?Sized>(
    surface: &mut S,
    image: &RasterImage,
    lattice: &Lattice,
    opts: &WarpOpts,
) -> SkyplotResult<CompositeReport> {
    let handle = surface.create_source(image, SampleFilter::Nearest)?;
    let result = paint_quads(surface, handle, lattice, opts);
    surface.release_source(handle);
    result
}

fn paint_quads<S: RenderSurface + ?Sized>(
    surface: &mut S,
    handle: ImageHandle,
    lattice: &Lattice,
    opts: &WarpOpts,
) -> SkyplotResult<CompositeReport> {
    let mut report = CompositeReport {
        mode: CompositeMode::Warp,
        quads_total: lattice.quad_count(),
        quads_painted: 0,
        quads_invalid: 0,
        quads_degenerate: 0,
        outlines_stroked: 0,
    };

    let mut outlines = Vec::new();
    for quad in lattice.quads() {
        let Some(target) = quad.target else {
            report.quads_invalid += 1;
            continue;
        };
        let outline = quad_outline(&target);
        match solve_quad(&quad.source, &target) {
            Ok(affine) => {
                surface.paint(handle, Some(&outline), affine.inverse)?;
                report.quads_painted += 1;
            }
            Err(err) => {
                tracing::debug!(i = quad.i, j = quad.j, %err, "skipping quad");
                report.quads_degenerate += 1;
            }
        }
        if opts.debug_grid.is_some() {
            outlines.push(outline);
        }
    }

    // Outlines go on top of every painted quad.
    if let Some(style) = opts.debug_grid {
        for outline in &outlines {
            surface.stroke(outline, style.color, style.width)?;
        }
        report.outlines_stroked = outlines.len();
    }

    tracing::debug!(
        painted = report.quads_painted,
        invalid = report.quads_invalid,
        degenerate = report.quads_degenerate,
        "warp composited"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
