pub mod config;
pub mod engine;
pub mod errors;
pub mod geometry;
pub mod logging;
pub mod notes;
pub mod palette;
pub mod render;
pub mod view;

pub use config::ViewConfig;
pub use engine::{CanvasEngine, CanvasHandle};
pub use errors::{ConfigError, EngineError, RenderError, ViewError};
pub use view::{CanvasView, FrameStatus, ViewEvent, ViewHost};
