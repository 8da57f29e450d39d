use std::path::{Path, PathBuf};

use crate::{
    assets::{
        RasterImage,
        decode::{FileImageSource, ImageFormat, ImageSource},
    },
    foundation::{
        core::{Canvas, Rgba8},
        error::{SkyplotError, SkyplotResult},
    },
    plot::plotter::{PlotArgs, Plotter},
    render::{
        compositor::{CompositeReport, GridStyle, WarpOpts, composite_direct, composite_warped},
        surface::RenderSurface,
    },
    warp::grid::{GridSpacing, Lattice},
    wcs::{SkyProjection, load_projection},
};

/// Defaults for a fresh [`ImageLayer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageLayerOpts {
    pub grid_spacing: GridSpacing,
    /// Outline each warped quad after painting.
    pub debug_grid: bool,
    pub grid_color: Rgba8,
    pub grid_line_width: f64,
}

impl Default for ImageLayerOpts {
    fn default() -> Self {
        Self {
            grid_spacing: GridSpacing::default(),
            debug_grid: true,
            grid_color: Rgba8::RED,
            grid_line_width: 1.0,
        }
    }
}

impl ImageLayerOpts {
    /// Defaults, overridden by `SKYPLOT_IMAGE_GRID` and `SKYPLOT_DEBUG_GRID`.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("SKYPLOT_IMAGE_GRID").ok().as_deref(),
            std::env::var("SKYPLOT_DEBUG_GRID").ok().as_deref(),
        )
    }

    fn from_vars(grid: Option<&str>, debug_grid: Option<&str>) -> Self {
        let mut opts = Self::default();
        if let Some(v) = grid {
            match GridSpacing::parse(v) {
                Ok(spacing) => opts.grid_spacing = spacing,
                Err(err) => tracing::warn!(value = v, %err, "ignoring SKYPLOT_IMAGE_GRID"),
            }
        }
        if let Some(v) = debug_grid {
            match parse_switch(v) {
                Ok(on) => opts.debug_grid = on,
                Err(err) => tracing::warn!(value = v, %err, "ignoring SKYPLOT_DEBUG_GRID"),
            }
        }
        opts
    }

    fn warp_opts(&self) -> WarpOpts {
        WarpOpts {
            debug_grid: self.debug_grid.then_some(GridStyle {
                color: self.grid_color,
                width: self.grid_line_width,
            }),
        }
    }
}

fn parse_switch(s: &str) -> SkyplotResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Ok(true),
        "0" | "off" | "false" | "no" => Ok(false),
        other => Err(SkyplotError::config(format!(
            "expected on or off, got \"{other}\""
        ))),
    }
}

/// Whether the layer currently holds decoded pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerState {
    Unloaded,
    Loaded,
}

/// Raster image overlay, reprojected onto the canvas when both carry a WCS.
///
/// The decoded buffer lives only until the next plot: plotting consumes it,
/// and a later plot decodes the file again.
pub struct ImageLayer {
    opts: ImageLayerOpts,
    path: Option<PathBuf>,
    format: Option<ImageFormat>,
    wcs: Option<Box<dyn SkyProjection>>,
    image: Option<RasterImage>,
    source: Box<dyn ImageSource>,
}

impl std::fmt::Debug for ImageLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLayer")
            .field("opts", &self.opts)
            .field("path", &self.path)
            .field("format", &self.format)
            .field("wcs", &self.wcs)
            .field("state", &self.state())
            .finish()
    }
}

impl ImageLayer {
    pub fn new(opts: ImageLayerOpts) -> Self {
        Self::with_source(opts, Box::new(FileImageSource))
    }

    pub fn with_source(opts: ImageLayerOpts, source: Box<dyn ImageSource>) -> Self {
        Self {
            opts,
            path: None,
            format: None,
            wcs: None,
            image: None,
            source,
        }
    }

    pub fn opts(&self) -> &ImageLayerOpts {
        &self.opts
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn has_wcs(&self) -> bool {
        self.wcs.is_some()
    }

    pub fn state(&self) -> LayerState {
        if self.image.is_some() {
            LayerState::Loaded
        } else {
            LayerState::Unloaded
        }
    }

    pub fn set_file(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
        self.image = None;
    }

    pub fn set_format(&mut self, format: ImageFormat) {
        self.format = Some(format);
    }

    pub fn set_wcs(&mut self, wcs: Option<Box<dyn SkyProjection>>) {
        self.wcs = wcs;
    }

    pub fn set_grid_spacing(&mut self, spacing: GridSpacing) {
        self.opts.grid_spacing = spacing;
    }

    pub fn set_debug_grid(&mut self, on: bool) {
        self.opts.debug_grid = on;
    }

    /// Resize the canvas to the image, loading it if needed.
    pub fn set_canvas_size(&mut self, plot: &mut PlotArgs) -> SkyplotResult<()> {
        let image = self.ensure_loaded()?;
        plot.canvas = Canvas::new(image.width, image.height)?;
        Ok(())
    }

    fn ensure_loaded(&mut self) -> SkyplotResult<&RasterImage> {
        if self.image.is_none() {
            self.image = Some(self.read()?);
        }
        self.image
            .as_ref()
            .ok_or_else(|| SkyplotError::load("image buffer missing after load"))
    }

    fn read(&self) -> SkyplotResult<RasterImage> {
        let path = self.path.as_deref().ok_or_else(|| {
            SkyplotError::config("You must set the image file with \"image_file <path>\"")
        })?;
        let format = self.format.ok_or_else(|| {
            SkyplotError::config("You must set the image format with \"image_format <png|jpg|ppm>\"")
        })?;
        let image = self.source.decode(path, format)?;
        tracing::debug!(
            path = %path.display(),
            w = image.width,
            h = image.height,
            "image loaded"
        );
        Ok(image)
    }
}

impl Plotter for ImageLayer {
    fn name(&self) -> &'static str {
        "image"
    }

    fn command(&mut self, cmd: &str, args: &str, plot: &mut PlotArgs) -> SkyplotResult<()> {
        let args = args.trim();
        match cmd {
            "image_file" => {
                if args.is_empty() {
                    return Err(SkyplotError::config("image_file expects a path"));
                }
                self.set_file(args);
            }
            "image_format" => self.set_format(ImageFormat::parse(args)?),
            "image_setsize" => self.set_canvas_size(plot)?,
            "image_wcs" => {
                self.wcs = None;
                if args != "none" {
                    if args.is_empty() {
                        return Err(SkyplotError::config("image_wcs expects a path or \"none\""));
                    }
                    self.wcs = Some(Box::new(load_projection(Path::new(args))?));
                }
            }
            "image_grid" => self.set_grid_spacing(GridSpacing::parse(args)?),
            "image_debug_grid" => self.set_debug_grid(parse_switch(args)?),
            _ => {
                return Err(SkyplotError::config(format!(
                    "Did not understand command \"{cmd}\""
                )));
            }
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn plot(
        &mut self,
        surface: &mut dyn RenderSurface,
        plot: &PlotArgs,
    ) -> SkyplotResult<CompositeReport> {
        // Taking the buffer out guarantees it is released on every exit path.
        let image = match self.image.take() {
            Some(image) => image,
            None => self.read()?,
        };

        let report = match (self.wcs.as_deref(), plot.wcs.as_deref()) {
            (Some(src), Some(dst)) => {
                let lattice = Lattice::build(
                    image.width,
                    image.height,
                    self.opts.grid_spacing,
                    src,
                    dst,
                );
                composite_warped(surface, &image, &lattice, &self.opts.warp_opts())?
            }
            _ => composite_direct(surface, &image)?,
        };

        tracing::info!(
            mode = ?report.mode,
            painted = report.quads_painted,
            skipped = report.quads_invalid + report.quads_degenerate,
            "image layer plotted"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/plot/image_layer.rs"]
mod tests;
