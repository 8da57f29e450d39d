use std::{cell::Cell, rc::Rc};

use super::*;
use crate::{
    foundation::core::{Affine, BezPath, Point, SkyCoord},
    render::{
        compositor::CompositeMode,
        surface::{ImageHandle, SampleFilter},
    },
};

#[derive(Clone)]
struct CountingSource {
    loads: Rc<Cell<usize>>,
    width: u32,
    height: u32,
}

impl ImageSource for CountingSource {
    fn decode(&self, _path: &Path, format: ImageFormat) -> SkyplotResult<RasterImage> {
        if format == ImageFormat::Pdf {
            return Err(SkyplotError::config("PDF format not supported"));
        }
        self.loads.set(self.loads.get() + 1);
        Ok(RasterImage::filled(self.width, self.height, [1, 2, 3, 255]))
    }
}

#[derive(Debug)]
struct Plane;

impl SkyProjection for Plane {
    fn pixel_to_sky(&self, pixel: Point) -> Option<SkyCoord> {
        Some(SkyCoord::new(pixel.x, pixel.y))
    }

    fn sky_to_pixel(&self, sky: SkyCoord) -> Option<Point> {
        Some(Point::new(sky.ra_deg, sky.dec_deg))
    }
}

#[derive(Default)]
struct Tally {
    creates: Vec<SampleFilter>,
    paints: usize,
    strokes: usize,
    releases: usize,
}

impl RenderSurface for Tally {
    fn canvas(&self) -> Canvas {
        Canvas {
            width: 100,
            height: 100,
        }
    }

    fn create_source(
        &mut self,
        _image: &RasterImage,
        filter: SampleFilter,
    ) -> SkyplotResult<ImageHandle> {
        self.creates.push(filter);
        Ok(ImageHandle(7))
    }

    fn paint(
        &mut self,
        _source: ImageHandle,
        _clip: Option<&BezPath>,
        _sampling: Affine,
    ) -> SkyplotResult<()> {
        self.paints += 1;
        Ok(())
    }

    fn stroke(&mut self, _path: &BezPath, _color: Rgba8, _width: f64) -> SkyplotResult<()> {
        self.strokes += 1;
        Ok(())
    }

    fn release_source(&mut self, _source: ImageHandle) {
        self.releases += 1;
    }
}

fn layer(width: u32, height: u32) -> (ImageLayer, Rc<Cell<usize>>) {
    let loads = Rc::new(Cell::new(0));
    let source = CountingSource {
        loads: Rc::clone(&loads),
        width,
        height,
    };
    (
        ImageLayer::with_source(ImageLayerOpts::default(), Box::new(source)),
        loads,
    )
}

fn plot_args() -> PlotArgs {
    PlotArgs::new(Canvas::new(100, 100).unwrap())
}

fn configured(width: u32, height: u32, plot: &mut PlotArgs) -> (ImageLayer, Rc<Cell<usize>>) {
    let (mut layer, loads) = layer(width, height);
    layer.command("image_file", "sky.png", plot).unwrap();
    layer.command("image_format", "png", plot).unwrap();
    (layer, loads)
}

#[test]
fn handles_only_its_own_prefix() {
    let (layer, _) = layer(1, 1);
    assert!(layer.handles("image_file"));
    assert!(layer.handles("image_anything"));
    assert!(!layer.handles("imagefile"));
    assert!(!layer.handles("plot_size"));
}

#[test]
fn unknown_command_is_a_config_error() {
    let mut plot = plot_args();
    let (mut layer, _) = layer(1, 1);
    let err = layer.command("image_rotate", "90", &mut plot).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("Did not understand command"));
}

#[test]
fn grid_spacing_must_parse_and_be_positive() {
    let mut plot = plot_args();
    let (mut layer, _) = layer(1, 1);
    assert!(layer.command("image_grid", "0", &mut plot).unwrap_err().is_config());
    assert!(layer.command("image_grid", "abc", &mut plot).unwrap_err().is_config());
    layer.command("image_grid", "25", &mut plot).unwrap();
    assert_eq!(layer.opts().grid_spacing.get(), 25);
}

#[test]
fn debug_grid_switch() {
    let mut plot = plot_args();
    let (mut layer, _) = layer(1, 1);
    assert!(layer.opts().debug_grid);
    layer.command("image_debug_grid", "off", &mut plot).unwrap();
    assert!(!layer.opts().debug_grid);
    assert!(layer.command("image_debug_grid", "maybe", &mut plot).is_err());
}

#[test]
fn format_names() {
    let mut plot = plot_args();
    let (mut layer, _) = layer(1, 1);
    layer.command("image_format", "JPEG", &mut plot).unwrap();
    assert_eq!(layer.format(), Some(ImageFormat::Jpg));
    assert!(layer.command("image_format", "tiff", &mut plot).unwrap_err().is_config());
    assert_eq!(layer.format(), Some(ImageFormat::Jpg));
}

#[test]
fn missing_format_fails_at_plot_time_with_a_hint() {
    let mut plot = plot_args();
    let (mut layer, loads) = layer(10, 10);
    layer.command("image_file", "sky.png", &mut plot).unwrap();
    let mut surface = Tally::default();
    let err = layer.plot(&mut surface, &plot).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("image_format"));
    assert_eq!(loads.get(), 0);
    assert_eq!(surface.paints, 0);
}

#[test]
fn pdf_is_recognised_but_fails_to_load() {
    let mut plot = plot_args();
    let (mut layer, _) = configured(10, 10, &mut plot);
    layer.command("image_format", "pdf", &mut plot).unwrap();
    let mut surface = Tally::default();
    assert!(layer.plot(&mut surface, &plot).is_err());
    assert!(surface.creates.is_empty());
}

#[test]
fn setsize_resizes_canvas_and_keeps_the_buffer_for_the_next_plot() {
    let mut plot = plot_args();
    let (mut layer, loads) = configured(64, 48, &mut plot);
    layer.command("image_setsize", "", &mut plot).unwrap();
    assert_eq!(plot.canvas, Canvas::new(64, 48).unwrap());
    assert_eq!(layer.state(), LayerState::Loaded);
    assert_eq!(loads.get(), 1);

    let mut surface = Tally::default();
    layer.plot(&mut surface, &plot).unwrap();
    assert_eq!(loads.get(), 1);
    assert_eq!(layer.state(), LayerState::Unloaded);
}

#[test]
fn setting_the_file_drops_a_loaded_buffer() {
    let mut plot = plot_args();
    let (mut layer, _) = configured(8, 8, &mut plot);
    layer.command("image_setsize", "", &mut plot).unwrap();
    assert_eq!(layer.state(), LayerState::Loaded);
    layer.command("image_file", "other.png", &mut plot).unwrap();
    assert_eq!(layer.state(), LayerState::Unloaded);
    assert_eq!(layer.path(), Some(Path::new("other.png")));
}

#[test]
fn next_plot_reloads_after_release() {
    let mut plot = plot_args();
    let (mut layer, loads) = configured(100, 100, &mut plot);
    let mut surface = Tally::default();
    layer.plot(&mut surface, &plot).unwrap();
    layer.plot(&mut surface, &plot).unwrap();
    assert_eq!(loads.get(), 2);
    assert_eq!(surface.releases, 2);
    assert_eq!(layer.state(), LayerState::Unloaded);
}

#[test]
fn without_projections_the_image_is_blitted_once() {
    let mut plot = plot_args();
    let (mut layer, _) = configured(100, 100, &mut plot);
    let mut surface = Tally::default();
    let report = layer.plot(&mut surface, &plot).unwrap();
    assert_eq!(report.mode, CompositeMode::Direct);
    assert_eq!(surface.creates, vec![SampleFilter::Smooth]);
    assert_eq!(surface.paints, 1);
    assert_eq!(surface.strokes, 0);
}

#[test]
fn one_sided_projection_still_blits_directly() {
    let mut plot = plot_args();
    plot.wcs = Some(Box::new(Plane));
    let (mut layer, _) = configured(100, 100, &mut plot);
    let mut surface = Tally::default();
    let report = layer.plot(&mut surface, &plot).unwrap();
    assert_eq!(report.mode, CompositeMode::Direct);
}

#[test]
fn both_projections_warp_a_single_quad() {
    let mut plot = plot_args();
    plot.wcs = Some(Box::new(Plane));
    let (mut layer, _) = configured(100, 100, &mut plot);
    layer.set_wcs(Some(Box::new(Plane)));

    let mut surface = Tally::default();
    let report = layer.plot(&mut surface, &plot).unwrap();
    assert_eq!(report.mode, CompositeMode::Warp);
    assert_eq!(report.quads_total, 1);
    assert_eq!(surface.creates, vec![SampleFilter::Nearest]);
    assert_eq!(surface.paints, 1);
    assert_eq!(surface.strokes, 1);
    assert_eq!(surface.releases, 1);
}

#[test]
fn debug_grid_off_skips_outlines() {
    let mut plot = plot_args();
    plot.wcs = Some(Box::new(Plane));
    let (mut layer, _) = configured(100, 100, &mut plot);
    layer.set_wcs(Some(Box::new(Plane)));
    layer.set_debug_grid(false);

    let mut surface = Tally::default();
    layer.plot(&mut surface, &plot).unwrap();
    assert_eq!(surface.paints, 1);
    assert_eq!(surface.strokes, 0);
}

#[test]
fn bad_wcs_file_clears_the_projection() {
    let mut plot = plot_args();
    let (mut layer, _) = layer(1, 1);
    layer.set_wcs(Some(Box::new(Plane)));
    let missing = std::env::temp_dir().join("skyplot_no_such_wcs.hdr");
    let err = layer
        .command("image_wcs", &missing.display().to_string(), &mut plot)
        .unwrap_err();
    assert!(err.is_config());
    assert!(!layer.has_wcs());
}

#[test]
fn wcs_none_clears_the_projection() {
    let mut plot = plot_args();
    let (mut layer, _) = layer(1, 1);
    layer.set_wcs(Some(Box::new(Plane)));
    layer.command("image_wcs", "none", &mut plot).unwrap();
    assert!(!layer.has_wcs());
}

#[test]
fn switch_parsing() {
    assert!(parse_switch("ON").unwrap());
    assert!(parse_switch("1").unwrap());
    assert!(!parse_switch("off").unwrap());
    assert!(!parse_switch("0").unwrap());
    assert!(parse_switch("").is_err());
}

#[test]
fn environment_overrides_apply_and_bad_values_fall_back() {
    let opts = ImageLayerOpts::from_vars(Some("20"), Some("off"));
    assert_eq!(opts.grid_spacing.get(), 20);
    assert!(!opts.debug_grid);

    let opts = ImageLayerOpts::from_vars(Some("0"), Some("sometimes"));
    assert_eq!(opts, ImageLayerOpts::default());

    assert_eq!(ImageLayerOpts::from_vars(None, None), ImageLayerOpts::default());
}
