use std::path::PathBuf;

/// Failures reported at the canvas engine boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("canvas engine could not open {0}")]
    OpenFailed(PathBuf),

    #[error("canvas engine could not create {0}")]
    CreateFailed(PathBuf),

    #[error("path cannot be passed to the canvas engine: {0}")]
    InvalidPath(PathBuf),
}

/// Failures while preparing a surface for a frame. All of these mean the
/// current frame is skipped and the next paint request tries again.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no platform drawing context available")]
    ContextUnavailable,

    #[error("cannot allocate an empty surface ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },

    #[error("surface creation failed: {0}")]
    SurfaceCreation(#[source] anyhow::Error),

    #[error("paint context creation failed: {0}")]
    PaintContext(#[source] anyhow::Error),
}

/// Errors surfaced by [`CanvasView`](crate::view::CanvasView) operations that
/// have a caller to report to.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("no document is bound to the view")]
    NoDocument,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("page_width {0} must be a positive, finite number")]
    InvalidPageWidth(f64),

    #[error("stroke thickness {0} must be positive")]
    InvalidThickness(f32),

    #[error("color channel {channel} = {value} is outside 0..=1")]
    InvalidColor { channel: char, value: f32 },

    #[error("magnification {0} must not be negative")]
    InvalidMagnification(f64),

    #[error("scale_factor {0} must be positive")]
    InvalidScaleFactor(f64),

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
