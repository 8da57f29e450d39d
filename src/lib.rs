//! skyplot draws raster images as layers of a sky plot.
//!
//! When both the image and the plot canvas carry a world coordinate system
//! (WCS), the image is reprojected onto the canvas piecewise: a lattice of
//! sample points is pushed through `image pixel -> sky -> canvas pixel`, and
//! every lattice cell is painted through its own affine transform. Without a
//! WCS on either side the image is drawn unchanged at the canvas origin.
//!
//! - Drive a [`PlotSession`] with text commands (`image_file`, `plot image`, ...)
//! - Or call [`composite_warped`] / [`composite_direct`] on any [`RenderSurface`]
#![forbid(unsafe_code)]

mod assets;
mod foundation;

pub(crate) mod plot;
pub(crate) mod render;
pub(crate) mod warp;
pub(crate) mod wcs;

pub use crate::foundation::core::{Affine, BezPath, Canvas, Point, Rect, Rgba8, SkyCoord, Vec2};
pub use crate::foundation::error::{SkyplotError, SkyplotResult};

pub use crate::assets::RasterImage;
pub use crate::assets::decode::{FileImageSource, ImageFormat, ImageSource, decode_image};
pub use crate::plot::image_layer::{ImageLayer, ImageLayerOpts, LayerState};
pub use crate::plot::plotter::{PlotArgs, Plotter};
pub use crate::plot::session::{LayerReport, PlotSession};
pub use crate::render::FrameRGBA;
pub use crate::render::compositor::{
    CompositeMode, CompositeReport, GridStyle, WarpOpts, composite_direct, composite_warped,
    quad_outline,
};
pub use crate::render::cpu::{CpuSurface, CpuSurfaceOpts};
pub use crate::render::surface::{ImageHandle, RenderSurface, SampleFilter};
pub use crate::warp::grid::{DEFAULT_GRID_SPACING, GridSpacing, Lattice, Node, QuadCell};
pub use crate::warp::quad::{QuadAffine, QuadError, solve_quad};
pub use crate::wcs::header::{FitsHeader, HeaderValue};
pub use crate::wcs::tan::{Sip, SipPolynomial, TanWcs};
pub use crate::wcs::{SkyProjection, load_projection};
