use std::{collections::HashMap, sync::Arc};

use crate::{
    assets::RasterImage,
    foundation::{
        core::{Affine, BezPath, Canvas, Point, Rect, Rgba8},
        error::{SkyplotError, SkyplotResult},
    },
    render::{
        FrameRGBA,
        surface::{ImageHandle, RenderSurface, SampleFilter},
    },
};

/// Settings for [`CpuSurface`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CpuSurfaceOpts {
    pub canvas: Canvas,
    pub background: Rgba8,
}

/// A [`RenderSurface`] backed by `vello_cpu`.
pub struct CpuSurface {
    canvas: Canvas,
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    sources: HashMap<ImageHandle, CpuSource>,
    next_id: u32,
}

struct CpuSource {
    paint: vello_cpu::Image,
    width: f64,
    height: f64,
}

impl std::fmt::Debug for CpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSurface")
            .field("canvas", &self.canvas)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl CpuSurface {
    pub fn new(opts: CpuSurfaceOpts) -> SkyplotResult<Self> {
        let width: u16 = opts
            .canvas
            .width
            .try_into()
            .map_err(|_| SkyplotError::render("canvas width exceeds u16"))?;
        let height: u16 = opts
            .canvas
            .height
            .try_into()
            .map_err(|_| SkyplotError::render("canvas height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(width, height);
        if opts.background.a > 0 {
            let bg = opts.background;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
            ctx.fill_rect(&rect_to_cpu(opts.canvas.rect()));
        }

        Ok(Self {
            canvas: opts.canvas,
            width,
            height,
            ctx,
            sources: HashMap::new(),
            next_id: 0,
        })
    }

    /// Rasterize everything drawn so far.
    pub fn finish(mut self) -> FrameRGBA {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }

    fn reset_transforms(&mut self) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    }
}

impl RenderSurface for CpuSurface {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn create_source(
        &mut self,
        image: &RasterImage,
        filter: SampleFilter,
    ) -> SkyplotResult<ImageHandle> {
        let pixmap = image_premul_bytes_to_pixmap(&image.rgba8_premul, image.width, image.height)?;
        let quality = match filter {
            SampleFilter::Nearest => vello_cpu::peniko::ImageQuality::Low,
            SampleFilter::Smooth => vello_cpu::peniko::ImageQuality::Medium,
        };
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler {
                quality,
                ..vello_cpu::peniko::ImageSampler::default()
            },
        };

        let handle = ImageHandle(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| SkyplotError::render("image handle overflow"))?;
        self.sources.insert(
            handle,
            CpuSource {
                paint,
                width: f64::from(image.width),
                height: f64::from(image.height),
            },
        );
        Ok(handle)
    }

    fn paint(
        &mut self,
        source: ImageHandle,
        clip: Option<&BezPath>,
        sampling: Affine,
    ) -> SkyplotResult<()> {
        let src = self.sources.get(&source).ok_or_else(|| {
            SkyplotError::render(format!("image source {source:?} was not created"))
        })?;
        let (paint, w, h) = (src.paint.clone(), src.width, src.height);

        // vello places paints with the forward mapping and inverts it itself.
        let det = sampling.determinant();
        if !det.is_finite() || det == 0.0 {
            return Err(SkyplotError::render("sampling transform is not invertible"));
        }
        let image_to_canvas = sampling.inverse();

        self.reset_transforms();
        match clip {
            Some(path) => {
                // Geometry stays in canvas space; only the image is mapped.
                self.ctx.set_paint_transform(affine_to_cpu(image_to_canvas));
                self.ctx.set_paint(paint);
                self.ctx.fill_path(&bezpath_to_cpu(path));
            }
            None => {
                self.ctx.set_transform(affine_to_cpu(image_to_canvas));
                self.ctx.set_paint(paint);
                self.ctx
                    .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            }
        }
        Ok(())
    }

    fn stroke(&mut self, path: &BezPath, color: Rgba8, width: f64) -> SkyplotResult<()> {
        if !(width.is_finite() && width > 0.0) {
            return Err(SkyplotError::render(format!(
                "stroke width must be positive, got {width}"
            )));
        }
        self.reset_transforms();
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
        self.ctx.stroke_path(&bezpath_to_cpu(path));
        Ok(())
    }

    fn release_source(&mut self, source: ImageHandle) {
        self.sources.remove(&source);
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> SkyplotResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SkyplotError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SkyplotError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(SkyplotError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
