use crate::geometry::DeviceRect;
use crate::render::backend::{ContextId, ErasedSurface, PaintContext, PlatformContext, RenderBackend, SurfaceSize};
use anyhow::{anyhow, Result};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Drawing operation issued against a [`NullPaintContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    Save,
    Restore,
    Clip(DeviceRect),
    Scale(f64, f64),
}

/// Resource release observed by the null backend, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    PaintContext(u64),
    Surface(u64),
}

/// Counters shared between a [`NullBackend`] and everything it created.
#[derive(Debug, Default)]
pub struct NullStats {
    surfaces_created: Cell<u64>,
    paint_contexts_created: Cell<u64>,
    fail_surfaces: Cell<bool>,
    fail_paint_contexts: Cell<bool>,
    released: RefCell<Vec<Released>>,
    ops: RefCell<Vec<PaintOp>>,
}

impl NullStats {
    pub fn surfaces_created(&self) -> u64 {
        self.surfaces_created.get()
    }

    pub fn paint_contexts_created(&self) -> u64 {
        self.paint_contexts_created.get()
    }

    pub fn surfaces_released(&self) -> u64 {
        self.released.borrow().iter().filter(|r| matches!(r, Released::Surface(_))).count() as u64
    }

    pub fn paint_contexts_released(&self) -> u64 {
        self.released.borrow().iter().filter(|r| matches!(r, Released::PaintContext(_))).count() as u64
    }

    /// Every release so far, oldest first.
    pub fn released(&self) -> Vec<Released> {
        self.released.borrow().clone()
    }

    /// Drains the paint operations recorded so far.
    pub fn take_ops(&self) -> Vec<PaintOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    /// Makes surface creation fail until switched off again.
    pub fn fail_surfaces(&self, fail: bool) {
        self.fail_surfaces.set(fail);
    }

    /// Makes paint context creation fail until switched off again.
    pub fn fail_paint_contexts(&self, fail: bool) {
        self.fail_paint_contexts.set(fail);
    }
}

/// Backend that allocates nothing and only keeps count. Used by tests and by
/// hosts that want to drive a view headless.
pub struct NullBackend {
    stats: Rc<NullStats>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            stats: Rc::new(NullStats::default()),
        }
    }

    pub fn stats(&self) -> Rc<NullStats> {
        self.stats.clone()
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for NullBackend {
    fn name(&self) -> &str {
        "NullBackend"
    }

    fn create_surface(&self, context: &dyn PlatformContext, size: SurfaceSize) -> Result<Box<dyn ErasedSurface>> {
        if self.stats.fail_surfaces.get() {
            return Err(anyhow!("null surface creation disabled"));
        }

        let serial = self.stats.surfaces_created.get() + 1;
        self.stats.surfaces_created.set(serial);

        Ok(Box::new(NullSurface {
            serial,
            size,
            context: context.id(),
            stats: self.stats.clone(),
        }))
    }

    fn create_paint_context(&self, surface: &mut dyn ErasedSurface) -> Result<Box<dyn PaintContext>> {
        let s = surface
            .as_any_mut()
            .downcast_mut::<NullSurface>()
            .ok_or_else(|| anyhow!("NullBackend used with non-Null surface"))?;

        if self.stats.fail_paint_contexts.get() {
            return Err(anyhow!("null paint context creation disabled"));
        }

        self.stats
            .paint_contexts_created
            .set(self.stats.paint_contexts_created.get() + 1);

        Ok(Box::new(NullPaintContext {
            surface_serial: s.serial,
            depth: 0,
            stats: self.stats.clone(),
        }))
    }
}

pub struct NullSurface {
    /// Creation order, starting at 1.
    serial: u64,
    size: SurfaceSize,
    context: ContextId,
    stats: Rc<NullStats>,
}

impl NullSurface {
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl Drop for NullSurface {
    fn drop(&mut self) {
        self.stats.released.borrow_mut().push(Released::Surface(self.serial));
    }
}

impl ErasedSurface for NullSurface {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn size(&self) -> SurfaceSize {
        self.size
    }
    fn context_id(&self) -> ContextId {
        self.context
    }
}

pub struct NullPaintContext {
    surface_serial: u64,
    depth: usize,
    stats: Rc<NullStats>,
}

impl NullPaintContext {
    /// Serial of the surface this context draws into.
    pub fn surface_serial(&self) -> u64 {
        self.surface_serial
    }

    /// Number of unmatched `save` calls.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for NullPaintContext {
    fn drop(&mut self) {
        self.stats
            .released
            .borrow_mut()
            .push(Released::PaintContext(self.surface_serial));
    }
}

impl PaintContext for NullPaintContext {
    fn save(&mut self) -> Result<()> {
        self.depth += 1;
        self.stats.ops.borrow_mut().push(PaintOp::Save);
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(anyhow!("restore without matching save"));
        }
        self.depth -= 1;
        self.stats.ops.borrow_mut().push(PaintOp::Restore);
        Ok(())
    }

    fn clip(&mut self, rect: DeviceRect) {
        self.stats.ops.borrow_mut().push(PaintOp::Clip(rect));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.stats.ops.borrow_mut().push(PaintOp::Scale(sx, sy));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Platform context stand-in identified only by its id.
#[derive(Debug, Clone, Copy)]
pub struct NullContext {
    id: ContextId,
}

impl NullContext {
    pub fn new(raw: u64) -> Self {
        Self {
            id: ContextId::from_raw(raw),
        }
    }
}

impl PlatformContext for NullContext {
    fn id(&self) -> ContextId {
        self.id
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}
