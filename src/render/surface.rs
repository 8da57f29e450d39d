use crate::{
    assets::RasterImage,
    foundation::{
        core::{Affine, BezPath, Canvas, Rgba8},
        error::SkyplotResult,
    },
};

/// Opaque reference to an image registered with a [`RenderSurface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageHandle(pub u32);

/// How an image source is sampled when painted through a transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFilter {
    /// Nearest neighbour, no interpolation.
    Nearest,
    /// Whatever smoothing the surface does by default.
    Smooth,
}

/// The 2D drawing capability the compositor paints through.
pub trait RenderSurface {
    fn canvas(&self) -> Canvas;

    /// Register a pixel buffer as a paintable source.
    fn create_source(
        &mut self,
        image: &RasterImage,
        filter: SampleFilter,
    ) -> SkyplotResult<ImageHandle>;

    /// Paint `source`, sampling image pixel `sampling * p` at canvas point `p`.
    ///
    /// With a `clip` path (in canvas coordinates) only its interior is painted;
    /// without one the whole transformed image is. `sampling` must be
    /// invertible.
    fn paint(
        &mut self,
        source: ImageHandle,
        clip: Option<&BezPath>,
        sampling: Affine,
    ) -> SkyplotResult<()>;

    fn stroke(&mut self, path: &BezPath, color: Rgba8, width: f64) -> SkyplotResult<()>;

    fn release_source(&mut self, source: ImageHandle);
}
