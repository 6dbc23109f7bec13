use crate::engine::{CanvasEngine, CanvasId, InputPhase, InputTool, InvalidateCallback, StrokeStyle};
use crate::errors::EngineError;
use crate::geometry::DocPoint;
use crate::render::backend::PaintContext;
use std::path::Path;
use std::rc::Rc;

/// Owned handle to one open document in the canvas engine.
///
/// The document is destroyed exactly once, when the handle is dropped. Moving
/// the handle moves ownership, so a view can never hold a handle the engine
/// has already released.
pub struct CanvasHandle {
    id: CanvasId,
    engine: Rc<dyn CanvasEngine>,
}

impl std::fmt::Debug for CanvasHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasHandle")
            .field("id", &self.id)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl CanvasHandle {
    /// Opens an existing document.
    pub fn open(engine: &Rc<dyn CanvasEngine>, path: &Path) -> Result<Self, EngineError> {
        let id = engine
            .open(path)
            .ok_or_else(|| EngineError::OpenFailed(path.to_path_buf()))?;
        log::debug!("opened {id} from {}", path.display());

        Ok(Self { id, engine: engine.clone() })
    }

    /// Creates a new, empty document at `path`. Fails when the file already exists.
    pub fn create(engine: &Rc<dyn CanvasEngine>, path: &Path) -> Result<Self, EngineError> {
        let id = engine
            .create(path)
            .ok_or_else(|| EngineError::CreateFailed(path.to_path_buf()))?;
        log::debug!("created {id} at {}", path.display());

        Ok(Self { id, engine: engine.clone() })
    }

    #[inline]
    pub fn id(&self) -> CanvasId {
        self.id
    }

    #[inline]
    pub fn engine(&self) -> &Rc<dyn CanvasEngine> {
        &self.engine
    }

    pub fn set_invalidate_callback(&self, callback: InvalidateCallback) {
        self.engine.set_invalidate_callback(self.id, callback);
    }

    pub fn set_stroke_style(&self, style: StrokeStyle) {
        self.engine.set_stroke_style(self.id, style);
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        self.engine.stroke_style(self.id)
    }

    pub fn input(&self, phase: InputPhase, tool: InputTool, point: DocPoint, pressure: f32) {
        self.engine.input(self.id, phase, tool, point, pressure);
    }

    pub fn draw(&self, paint: &mut dyn PaintContext, magnification: f64) {
        self.engine.draw(self.id, paint, magnification);
    }

    /// Document height in page-width units.
    pub fn height(&self) -> f64 {
        self.engine.height(self.id)
    }

    pub fn undo(&self) -> bool {
        self.engine.undo(self.id)
    }

    pub fn redo(&self) -> bool {
        self.engine.redo(self.id)
    }
}

impl Drop for CanvasHandle {
    fn drop(&mut self) {
        log::debug!("destroying {}", self.id);
        self.engine.destroy(self.id);
    }
}
