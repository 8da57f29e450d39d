//! Line-oriented command dispatch across the canvas and its plot layers.

use std::path::Path;

use crate::{
    foundation::{
        core::{Canvas, Rgba8},
        error::{SkyplotError, SkyplotResult},
    },
    plot::{
        image_layer::{ImageLayer, ImageLayerOpts},
        plotter::{PlotArgs, Plotter},
    },
    render::{
        FrameRGBA,
        compositor::CompositeReport,
        cpu::{CpuSurface, CpuSurfaceOpts},
    },
    wcs::load_projection,
};

/// What one `plot` command drew.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LayerReport {
    pub layer: String,
    #[serde(flatten)]
    pub composite: CompositeReport,
}

/// A canvas plus the layers that can be plotted onto it.
///
/// The drawing surface is created on the first `plot`; from then on the
/// canvas size and background are fixed.
#[derive(Debug)]
pub struct PlotSession {
    args: PlotArgs,
    plotters: Vec<Box<dyn Plotter>>,
    surface: Option<CpuSurface>,
    reports: Vec<LayerReport>,
}

impl PlotSession {
    /// Session with the image layer, configured from the environment.
    pub fn new(canvas: Canvas) -> Self {
        Self::with_plotters(
            canvas,
            vec![Box::new(ImageLayer::new(ImageLayerOpts::from_env()))],
        )
    }

    pub fn with_plotters(canvas: Canvas, plotters: Vec<Box<dyn Plotter>>) -> Self {
        Self {
            args: PlotArgs::new(canvas),
            plotters,
            surface: None,
            reports: Vec::new(),
        }
    }

    pub fn args(&self) -> &PlotArgs {
        &self.args
    }

    pub fn canvas(&self) -> Canvas {
        self.args.canvas
    }

    pub fn reports(&self) -> &[LayerReport] {
        &self.reports
    }

    /// Run every command in `script`, stopping at the first failure.
    ///
    /// Blank lines and lines starting with `#` are skipped. Errors keep their
    /// kind and gain the 1-based line number.
    pub fn run_script(&mut self, script: &str) -> SkyplotResult<()> {
        for (n, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.command(line).map_err(|e| at_line(e, n + 1))?;
        }
        Ok(())
    }

    /// Run one command line: `<name> [args...]`.
    pub fn command(&mut self, line: &str) -> SkyplotResult<()> {
        let line = line.trim();
        let (cmd, args) = line
            .split_once(char::is_whitespace)
            .map(|(c, a)| (c, a.trim()))
            .unwrap_or((line, ""));
        tracing::trace!(cmd, args, "command");

        match cmd {
            "plot" => self.plot(args).map(|_| ()),
            "plot_size" => {
                let canvas = parse_size(args)?;
                self.set_canvas(canvas)
            }
            "plot_bg" => {
                self.ensure_unlocked("plot_bg")?;
                self.args.background = parse_color(args)?;
                Ok(())
            }
            "plot_wcs" => {
                self.args.wcs = None;
                if args != "none" {
                    if args.is_empty() {
                        return Err(SkyplotError::config("plot_wcs expects a path or \"none\""));
                    }
                    self.args.wcs = Some(Box::new(load_projection(Path::new(args))?));
                }
                Ok(())
            }
            _ => self.plotter_command(cmd, args),
        }
    }

    fn plotter_command(&mut self, cmd: &str, args: &str) -> SkyplotResult<()> {
        let before = self.args.canvas;
        let plotter = self
            .plotters
            .iter_mut()
            .find(|p| p.handles(cmd))
            .ok_or_else(|| SkyplotError::config(format!("Did not understand command \"{cmd}\"")))?;
        plotter.command(cmd, args, &mut self.args)?;

        if self.surface.is_some() && self.args.canvas != before {
            self.args.canvas = before;
            return Err(SkyplotError::config(format!(
                "{cmd} cannot resize the canvas after the first plot"
            )));
        }
        Ok(())
    }

    fn set_canvas(&mut self, canvas: Canvas) -> SkyplotResult<()> {
        if canvas != self.args.canvas {
            self.ensure_unlocked("plot_size")?;
        }
        self.args.canvas = canvas;
        Ok(())
    }

    fn ensure_unlocked(&self, cmd: &str) -> SkyplotResult<()> {
        if self.surface.is_some() {
            return Err(SkyplotError::config(format!(
                "{cmd} must come before the first plot"
            )));
        }
        Ok(())
    }

    /// Draw the layer named `layer` onto the canvas.
    pub fn plot(&mut self, layer: &str) -> SkyplotResult<&LayerReport> {
        let plotter = self
            .plotters
            .iter_mut()
            .find(|p| p.name() == layer)
            .ok_or_else(|| SkyplotError::config(format!("no plot layer named \"{layer}\"")))?;

        let created = self.surface.is_none();
        if created {
            self.surface = Some(CpuSurface::new(surface_opts(&self.args))?);
        }
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| SkyplotError::render("drawing surface missing"))?;

        let composite = match plotter.plot(surface, &self.args) {
            Ok(composite) => composite,
            Err(err) => {
                // A first plot that failed leaves the canvas unlocked.
                if created {
                    self.surface = None;
                }
                return Err(err);
            }
        };
        self.reports.push(LayerReport {
            layer: plotter.name().to_owned(),
            composite,
        });
        self.reports
            .last()
            .ok_or_else(|| SkyplotError::render("layer report missing"))
    }

    /// Rasterize the canvas. A session that never plotted yields the background.
    pub fn finish(self) -> SkyplotResult<FrameRGBA> {
        let surface = match self.surface {
            Some(surface) => surface,
            None => CpuSurface::new(surface_opts(&self.args))?,
        };
        Ok(surface.finish())
    }
}

fn surface_opts(args: &PlotArgs) -> CpuSurfaceOpts {
    CpuSurfaceOpts {
        canvas: args.canvas,
        background: args.background,
    }
}

fn at_line(err: SkyplotError, line: usize) -> SkyplotError {
    match err {
        SkyplotError::Config(msg) => SkyplotError::Config(format!("line {line}: {msg}")),
        SkyplotError::Load(msg) => SkyplotError::Load(format!("line {line}: {msg}")),
        SkyplotError::Render(msg) => SkyplotError::Render(format!("line {line}: {msg}")),
        SkyplotError::Other(err) => SkyplotError::Other(err.context(format!("line {line}"))),
    }
}

fn parse_size(args: &str) -> SkyplotResult<Canvas> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [w, h] = parts.as_slice() else {
        return Err(SkyplotError::config("plot_size expects <width> <height>"));
    };
    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| SkyplotError::config(format!("invalid canvas dimension \"{s}\"")))
    };
    Canvas::new(parse(w)?, parse(h)?)
}

fn parse_color(args: &str) -> SkyplotResult<Rgba8> {
    let channels = args
        .split_whitespace()
        .map(|s| {
            s.parse::<u8>()
                .map_err(|_| SkyplotError::config(format!("invalid color channel \"{s}\"")))
        })
        .collect::<SkyplotResult<Vec<u8>>>()?;
    match channels.as_slice() {
        [r, g, b] => Ok(Rgba8::new(*r, *g, *b, 255)),
        [r, g, b, a] => Ok(Rgba8::new(*r, *g, *b, *a)),
        _ => Err(SkyplotError::config("plot_bg expects <r> <g> <b> [a]")),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/plot/session.rs"]
mod tests;
