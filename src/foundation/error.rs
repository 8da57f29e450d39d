/// Convenience result type used across skyplot.
pub type SkyplotResult<T> = Result<T, SkyplotError>;

/// Top-level error taxonomy used by the plotting APIs.
///
/// Projection-domain failures and degenerate quads are not errors at this
/// level; they are absorbed by the warp and only show up as gaps.
#[derive(thiserror::Error, Debug)]
pub enum SkyplotError {
    /// Invalid command, option value or coordinate-mapping description.
    #[error("configuration error: {0}")]
    Config(String),

    /// The source image could not be read or decoded.
    #[error("load error: {0}")]
    Load(String),

    /// The drawing surface rejected an operation.
    #[error("render error: {0}")]
    Render(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SkyplotError {
    /// Build a [`SkyplotError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`SkyplotError::Load`] value.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Build a [`SkyplotError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Whether this error aborts only the current command (as opposed to a plot).
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
