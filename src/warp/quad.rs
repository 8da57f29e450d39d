use crate::{
    foundation::core::{Affine, Point},
    warp::grid::{AA, AB, BA},
};

/// Smallest accepted `|sin|` of the angle between the two basis vectors.
const MIN_BASIS_SINE: f64 = 1e-9;

/// Why a quad cannot be warped. Callers skip the quad; it is never fatal.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum QuadError {
    #[error("quad source cell has zero extent ({dx} x {dy})")]
    EmptyCell { dx: f64, dy: f64 },

    #[error("quad basis vectors are collinear (cross product {cross:e})")]
    Degenerate { cross: f64 },
}

/// Affine approximation of one lattice cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadAffine {
    /// Unit square -> canvas.
    pub local: Affine,
    /// Source pixel -> canvas.
    pub forward: Affine,
    /// Canvas -> source pixel; drives resampling.
    pub inverse: Affine,
}

impl QuadAffine {
    /// Distance between where the affine puts the `bb` corner and where the
    /// projection actually put it.
    pub fn closing_error(&self, source_bb: Point, target_bb: Point) -> f64 {
        (self.forward * source_bb).distance(target_bb)
    }
}

/// Solve the affine for one quad from corners `aa`, `ab` and `ba`.
///
/// Corner order is `[aa, ab, ba, bb]` for both arrays. `bb` is not used: the
/// transform is a three-point fit, so neighbouring quads may not agree
/// exactly along shared edges.
pub fn solve_quad(source: &[Point; 4], target: &[Point; 4]) -> Result<QuadAffine, QuadError> {
    let dx = source[AB].x - source[AA].x;
    let dy = source[BA].y - source[AA].y;
    if !(dx.is_finite() && dy.is_finite()) || dx == 0.0 || dy == 0.0 {
        return Err(QuadError::EmptyCell { dx, dy });
    }

    let origin = target[AA];
    let u = target[AB] - origin;
    let v = target[BA] - origin;
    let cross = u.cross(v);
    let scale = u.hypot() * v.hypot();
    if !cross.is_finite() || !scale.is_finite() || cross.abs() <= MIN_BASIS_SINE * scale {
        return Err(QuadError::Degenerate { cross });
    }

    let local = Affine::new([u.x, u.y, v.x, v.y, origin.x, origin.y]);

    let (a, b) = (u.x / dx, u.y / dx);
    let (c, d) = (v.x / dy, v.y / dy);
    let s = source[AA];
    let forward = Affine::new([
        a,
        b,
        c,
        d,
        origin.x - a * s.x - c * s.y,
        origin.y - b * s.x - d * s.y,
    ]);

    Ok(QuadAffine {
        local,
        forward,
        inverse: forward.inverse(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/warp/quad.rs"]
mod tests;
