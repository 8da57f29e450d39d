use crate::{
    foundation::{
        core::Point,
        error::{SkyplotError, SkyplotResult},
    },
    wcs::SkyProjection,
};

/// Default lattice cell size, in source pixels.
pub const DEFAULT_GRID_SPACING: u32 = 50;

/// Lattice cell size in source pixels; always at least 1.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct GridSpacing(u32);

impl GridSpacing {
    pub fn new(px: u32) -> SkyplotResult<Self> {
        if px < 1 {
            return Err(SkyplotError::config(format!(
                "grid spacing must be >= 1, got {px}"
            )));
        }
        Ok(Self(px))
    }

    pub fn parse(s: &str) -> SkyplotResult<Self> {
        let px = s.trim().parse::<u32>().map_err(|_| {
            SkyplotError::config(format!("grid spacing must be a positive integer, got \"{s}\""))
        })?;
        Self::new(px)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for GridSpacing {
    fn default() -> Self {
        Self(DEFAULT_GRID_SPACING)
    }
}

impl TryFrom<u32> for GridSpacing {
    type Error = SkyplotError;

    fn try_from(px: u32) -> SkyplotResult<Self> {
        Self::new(px)
    }
}

impl From<GridSpacing> for u32 {
    fn from(s: GridSpacing) -> u32 {
        s.0
    }
}

/// One lattice sample point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    /// Position in the source image, in pixels.
    pub source: Point,
    /// Position on the target canvas; `None` when either projection step failed.
    pub target: Option<Point>,
}

impl Node {
    pub fn is_valid(&self) -> bool {
        self.target.is_some()
    }
}

/// Quad corner order: top-left, top-right, bottom-left, bottom-right.
pub const AA: usize = 0;
pub const AB: usize = 1;
pub const BA: usize = 2;
pub const BB: usize = 3;

/// One lattice cell, as yielded by [`Lattice::quads`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadCell {
    pub i: usize,
    pub j: usize,
    pub source: [Point; 4],
    /// All four target corners, or `None` if any node is invalid.
    pub target: Option<[Point; 4]>,
}

impl QuadCell {
    pub fn is_usable(&self) -> bool {
        self.target.is_some()
    }
}

/// Regular mesh of sample points over a source image, with each point's
/// position on the target canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice {
    nx: usize,
    ny: usize,
    /// Row-major, `j * nx + i`.
    nodes: Vec<Node>,
}

impl Lattice {
    /// Lattice dimensions for a `width` x `height` image.
    pub fn dims(width: u32, height: u32, spacing: GridSpacing) -> (usize, usize) {
        (
            width.div_ceil(spacing.get()) as usize,
            height.div_ceil(spacing.get()) as usize,
        )
    }

    /// Source coordinate of sample `index` out of `count` along an axis of
    /// length `extent`; the last sample sits exactly on the far edge.
    pub fn sample_coord(index: usize, count: usize, extent: u32, spacing: GridSpacing) -> f64 {
        if index + 1 >= count {
            return f64::from(extent);
        }
        (index as u64 * u64::from(spacing.get())).min(u64::from(extent)) as f64
    }

    /// Sample `source` over the image and push every node through
    /// `source.pixel_to_sky` then `target.sky_to_pixel`.
    #[tracing::instrument(level = "debug", skip(source, target))]
    pub fn build(
        width: u32,
        height: u32,
        spacing: GridSpacing,
        source: &dyn SkyProjection,
        target: &dyn SkyProjection,
    ) -> Self {
        Self::build_with(width, height, spacing, |p| {
            source
                .pixel_to_sky(p)
                .and_then(|sky| target.sky_to_pixel(sky))
        })
    }

    /// Like [`Lattice::build`], with the source -> target mapping given directly.
    pub fn build_with(
        width: u32,
        height: u32,
        spacing: GridSpacing,
        mut map: impl FnMut(Point) -> Option<Point>,
    ) -> Self {
        let (nx, ny) = Self::dims(width, height, spacing);
        let mut nodes = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            let y = Self::sample_coord(j, ny, height, spacing);
            for i in 0..nx {
                let x = Self::sample_coord(i, nx, width, spacing);
                let source = Point::new(x, y);
                let target = map(source).filter(|t| t.x.is_finite() && t.y.is_finite());
                nodes.push(Node { source, target });
            }
        }

        let lattice = Self { nx, ny, nodes };
        let invalid = lattice.nodes.len() - lattice.valid_count();
        if invalid > 0 {
            tracing::debug!(invalid, total = lattice.nodes.len(), "nodes outside projection domain");
        }
        if nx < 2 || ny < 2 {
            tracing::warn!(
                nx,
                ny,
                "image spans a single grid cell along one axis; no quads to warp"
            );
        }
        lattice
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, i: usize, j: usize) -> Option<&Node> {
        if i >= self.nx || j >= self.ny {
            return None;
        }
        self.nodes.get(j * self.nx + i)
    }

    pub fn valid_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_valid()).count()
    }

    pub fn quad_count(&self) -> usize {
        self.nx.saturating_sub(1) * self.ny.saturating_sub(1)
    }

    /// All cells in row-major `(j, i)` order, usable or not.
    pub fn quads(&self) -> impl Iterator<Item = QuadCell> + '_ {
        let (qx, qy) = (self.nx.saturating_sub(1), self.ny.saturating_sub(1));
        (0..qy).flat_map(move |j| {
            (0..qx).map(move |i| {
                let aa = j * self.nx + i;
                let idx = [aa, aa + 1, aa + self.nx, aa + self.nx + 1];
                let nodes = idx.map(|k| self.nodes[k]);
                let target = match nodes.map(|n| n.target) {
                    [Some(a), Some(b), Some(c), Some(d)] => Some([a, b, c, d]),
                    _ => None,
                };
                QuadCell {
                    i,
                    j,
                    source: nodes.map(|n| n.source),
                    target,
                }
            })
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/warp/grid.rs"]
mod tests;
