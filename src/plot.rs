//! Command-driven plot layers and the session that dispatches to them.

pub(crate) mod image_layer;
pub(crate) mod plotter;
pub(crate) mod session;
