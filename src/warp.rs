//! Piecewise-affine approximation of a pixel -> sky -> pixel mapping.

pub(crate) mod grid;
pub(crate) mod quad;
