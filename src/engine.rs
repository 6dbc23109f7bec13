//! Boundary to the external canvas engine.
//!
//! The engine owns stroke geometry, undo history and persistence. This crate
//! only talks to it through the narrow call table modelled by [`CanvasEngine`].
//! Implementations take `&self` everywhere: the engine may call back into the
//! view (through the invalidate callback) while one of its own calls is still
//! on the stack, and the view may in turn query the engine from that callback.
//!
//! - [`CanvasHandle`]: owned handle to an open document; destroys it on drop.
//! - [`recording::RecordingEngine`]: in-memory engine used by hosts without a
//!   native engine and by the tests.
//! - [`ffi::FfiEngine`]: adapter over a C function table.

mod handle;
mod types;

pub mod ffi;
pub mod recording;

pub use handle::CanvasHandle;
pub use types::*;

use crate::geometry::DocPoint;
use crate::render::backend::PaintContext;
use std::path::Path;

/// Call table of the canvas engine. Methods returning `Option` or `bool` report
/// failure the same way the engine does; nothing here panics or raises.
pub trait CanvasEngine {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Opens an existing document.
    fn open(&self, path: &Path) -> Option<CanvasId>;

    /// Creates a new document. Returns `None` when `path` already exists or cannot be created.
    fn create(&self, path: &Path) -> Option<CanvasId>;

    /// Releases every engine-side resource of the canvas, including its callback.
    fn destroy(&self, canvas: CanvasId);

    /// Installs the callback invoked whenever `canvas` changes, replacing any previous one.
    fn set_invalidate_callback(&self, canvas: CanvasId, callback: InvalidateCallback);

    /// Sets the style used for new strokes.
    fn set_stroke_style(&self, canvas: CanvasId, style: StrokeStyle);

    /// Returns the style used for new strokes.
    fn stroke_style(&self, canvas: CanvasId) -> StrokeStyle;

    /// Feeds one pointer sample in document space. May invalidate synchronously.
    fn input(&self, canvas: CanvasId, phase: InputPhase, tool: InputTool, point: DocPoint, pressure: f32);

    /// Paints the current content into `paint`. The paint context is already
    /// clipped and scaled so one document unit spans the page width.
    fn draw(&self, canvas: CanvasId, paint: &mut dyn PaintContext, magnification: f64);

    /// Current document height in page-width units.
    fn height(&self, canvas: CanvasId) -> f64;

    fn undo(&self, canvas: CanvasId) -> bool;

    fn redo(&self, canvas: CanvasId) -> bool;
}
