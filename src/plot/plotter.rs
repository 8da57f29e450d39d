use crate::{
    foundation::{
        core::{Canvas, Rgba8},
        error::SkyplotResult,
    },
    render::{compositor::CompositeReport, surface::RenderSurface},
    wcs::SkyProjection,
};

/// Canvas-wide state shared by every layer of a plot.
#[derive(Debug)]
pub struct PlotArgs {
    pub canvas: Canvas,
    /// Sky projection of the canvas itself, if any.
    pub wcs: Option<Box<dyn SkyProjection>>,
    pub background: Rgba8,
}

impl PlotArgs {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            wcs: None,
            background: Rgba8::TRANSPARENT,
        }
    }
}

/// One kind of plot layer, driven by textual commands.
///
/// Commands addressed to a plotter are prefixed with its name and an
/// underscore (`image_file`, `image_grid`, ...).
pub trait Plotter: std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn handles(&self, cmd: &str) -> bool {
        cmd.strip_prefix(self.name())
            .is_some_and(|rest| rest.starts_with('_'))
    }

    /// Apply one configuration command. Errors abort only this command.
    fn command(&mut self, cmd: &str, args: &str, plot: &mut PlotArgs) -> SkyplotResult<()>;

    /// Draw the layer onto `surface`.
    fn plot(
        &mut self,
        surface: &mut dyn RenderSurface,
        plot: &PlotArgs,
    ) -> SkyplotResult<CompositeReport>;
}
