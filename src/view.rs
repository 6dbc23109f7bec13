//! The drawing surface view.
//!
//! [`CanvasView`] binds at most one engine document ([`CanvasHandle`]) at a
//! time, paints it through a [`SurfaceCache`] and feeds pointer input back
//! into the engine. It never talks to a window system directly: everything
//! it needs from its host goes through [`ViewHost`], and everything it draws
//! goes through a [`RenderBackend`].
//!
//! Three coordinate spaces meet here:
//!
//! - device pixels, the size of the backing surface (`frame × scale_factor`);
//! - view units, in which the host reports positions and dirty rectangles;
//! - document space, where the page is `1.0` wide.
//!
//! The paint context is pre-scaled by the scale factor, so the engine and the
//! host never deal with device pixels.

mod events;
mod invalidation;
mod tool;

pub use events::{PointingDevice, ViewEvent};
pub use invalidation::InvalidationBridge;
pub use tool::ToolState;

use crate::config::ViewConfig;
use crate::engine::{CanvasEngine, CanvasHandle, InputPhase, InputTool, StrokeStyle};
use crate::errors::ViewError;
use crate::geometry::{CoordinateMapper, DevicePoint, DeviceRect, DeviceSize};
use crate::render::backend::{PlatformContext, RenderBackend};
use crate::render::SurfaceCache;
use invalidation::ViewShared;
use std::fmt::Display;
use std::path::Path;
use std::rc::Rc;
use uuid::Uuid;

/// What the view needs from the window system hosting it. Calls occur on the
/// UI thread, possibly from inside an engine call.
pub trait ViewHost {
    /// Marks `rect` (view units) as needing a repaint.
    fn request_redraw(&self, rect: DeviceRect);

    /// Resizes the view's layout box, e.g. inside a scroll container.
    fn set_layout_size(&self, size: DeviceSize);
}

/// A unique identifier for a view, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ViewId(Uuid);

impl ViewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Outcome of one paint request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    /// The engine painted into the dirty rectangle.
    Drawn,
    /// No document is bound; the host shows empty content.
    NoDocument,
    /// No surface could be prepared for this frame. The next request retries.
    Skipped,
}

pub struct CanvasView {
    shared: Rc<ViewShared>,
    canvas: Option<CanvasHandle>,
    surfaces: SurfaceCache,
    tool: ToolState,
    default_stroke: StrokeStyle,
    magnification: f64,
    scale_factor: f64,
}

impl CanvasView {
    pub fn new(config: &ViewConfig, host: Rc<dyn ViewHost>, backend: Box<dyn RenderBackend>) -> Self {
        let id = ViewId::new();
        log::debug!("{id}: created with backend {}", backend.name());

        Self {
            shared: Rc::new(ViewShared::new(id, config.page_width, host)),
            canvas: None,
            surfaces: SurfaceCache::new(backend, config.cache_policy),
            tool: ToolState::default(),
            default_stroke: config.default_stroke,
            magnification: config.magnification.max(0.0),
            scale_factor: config.scale_factor,
        }
    }

    #[inline]
    pub fn id(&self) -> ViewId {
        self.shared.id()
    }

    #[inline]
    pub fn has_document(&self) -> bool {
        self.canvas.is_some()
    }

    #[inline]
    pub fn canvas(&self) -> Option<&CanvasHandle> {
        self.canvas.as_ref()
    }

    /// Current size in view units.
    #[inline]
    pub fn frame(&self) -> DeviceSize {
        self.shared.frame()
    }

    #[inline]
    pub fn tool(&self) -> InputTool {
        self.tool.current()
    }

    #[inline]
    pub fn magnification(&self) -> f64 {
        self.magnification
    }

    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    #[inline]
    pub fn surfaces(&self) -> &SurfaceCache {
        &self.surfaces
    }

    /// Binds `canvas`, destroying whatever was bound before. `None` unbinds
    /// and also releases the cached surface.
    pub fn set_canvas(&mut self, canvas: Option<CanvasHandle>) {
        if let Some(old) = self.canvas.take() {
            self.shared.bind(None);
            log::debug!("{}: unbinding {}", self.id(), old.id());
            drop(old);
        }

        let Some(handle) = canvas else {
            self.surfaces.invalidate();
            return;
        };

        log::debug!("{}: binding {}", self.id(), handle.id());
        self.shared.bind(Some(handle.id()));
        handle.set_invalidate_callback(InvalidationBridge::new(&self.shared, &handle).into_callback());
        handle.set_stroke_style(self.default_stroke);

        let height = handle.height();
        self.canvas = Some(handle);
        self.shared.relayout(height);
    }

    /// Opens `path` and binds it. On failure the view is left without a document.
    pub fn open(&mut self, engine: &Rc<dyn CanvasEngine>, path: &Path) -> Result<(), ViewError> {
        match CanvasHandle::open(engine, path) {
            Ok(handle) => {
                self.set_canvas(Some(handle));
                Ok(())
            }
            Err(e) => {
                log::warn!("{}: {e}", self.id());
                self.set_canvas(None);
                Err(e.into())
            }
        }
    }

    /// Host-driven resize. The surface follows on the next paint.
    pub fn resize(&mut self, size: DeviceSize) {
        self.shared.set_frame(size);
    }

    pub fn set_magnification(&mut self, magnification: f64) {
        self.magnification = if magnification.is_nan() { 0.0 } else { magnification.max(0.0) };
    }

    /// Ignores factors that are not positive and finite.
    pub fn set_scale_factor(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.scale_factor = factor;
        } else {
            log::warn!("{}: ignoring scale factor {factor}", self.id());
        }
    }

    /// Paints the dirty rectangle (view units) into `context`.
    pub fn draw(&mut self, context: Option<&dyn PlatformContext>, dirty: DeviceRect) -> FrameStatus {
        let Some(canvas) = self.canvas.as_ref() else {
            return FrameStatus::NoDocument;
        };
        let frame = self.shared.frame();
        let Some(mapper) = CoordinateMapper::new(frame.width) else {
            return FrameStatus::Skipped;
        };

        let entry = match self.surfaces.ensure(context, frame.scaled(self.scale_factor)) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("{}: skipping frame: {e}", self.shared.id());
                return FrameStatus::Skipped;
            }
        };

        let paint = entry.paint();
        if let Err(e) = paint.save() {
            log::warn!("{}: skipping frame: {e}", self.shared.id());
            return FrameStatus::Skipped;
        }
        paint.scale(self.scale_factor, self.scale_factor);
        paint.clip(dirty);
        paint.scale(mapper.width(), mapper.width());

        canvas.draw(paint, self.magnification);

        if let Err(e) = paint.restore() {
            log::warn!("{}: paint state lost, dropping surface: {e}", self.shared.id());
            self.surfaces.invalidate();
        }
        FrameStatus::Drawn
    }

    /// Forwards one pointer sample. Returns `false` when nothing was sent to
    /// the engine.
    pub fn pointer(&mut self, phase: InputPhase, position: DevicePoint, pressure: f32) -> bool {
        let Some(canvas) = self.canvas.as_ref() else {
            return false;
        };
        let Some(mapper) = CoordinateMapper::new(self.shared.frame().width) else {
            return false;
        };

        let pressure = if pressure.is_nan() { 0.0 } else { pressure.clamp(0.0, 1.0) };
        canvas.input(phase, self.tool.current(), mapper.to_document(position), pressure);
        true
    }

    pub fn proximity(&mut self, device: Option<PointingDevice>) -> InputTool {
        self.tool.on_proximity(device)
    }

    /// Dispatches a host event. Returns `true` when the event had an effect.
    pub fn handle_event(&mut self, event: ViewEvent) -> bool {
        log::trace!("{}: {event}", self.id());
        match event {
            ViewEvent::PointerDown { position, pressure } => self.pointer(InputPhase::Down, position, pressure),
            ViewEvent::PointerDrag { position, pressure } => self.pointer(InputPhase::Drag, position, pressure),
            ViewEvent::PointerUp { position, pressure } => self.pointer(InputPhase::Up, position, pressure),
            ViewEvent::Proximity { device } => {
                self.proximity(device);
                true
            }
            ViewEvent::Resize { size } => {
                self.resize(size);
                true
            }
            ViewEvent::Magnify { magnification } => {
                self.set_magnification(magnification);
                true
            }
            ViewEvent::ScaleFactor { factor } => {
                self.set_scale_factor(factor);
                true
            }
            ViewEvent::Undo => self.undo(),
            ViewEvent::Redo => self.redo(),
        }
    }

    pub fn set_stroke_style(&mut self, style: StrokeStyle) -> Result<(), ViewError> {
        let canvas = self.canvas.as_ref().ok_or(ViewError::NoDocument)?;
        canvas.set_stroke_style(style);
        Ok(())
    }

    pub fn stroke_style(&self) -> Option<StrokeStyle> {
        self.canvas.as_ref().map(|c| c.stroke_style())
    }

    pub fn undo(&mut self) -> bool {
        self.canvas.as_ref().is_some_and(|c| c.undo())
    }

    pub fn redo(&mut self) -> bool {
        self.canvas.as_ref().is_some_and(|c| c.redo())
    }
}

impl Drop for CanvasView {
    fn drop(&mut self) {
        self.set_canvas(None);
    }
}
