use crate::geometry::DeviceRect;
use crate::render::backend::{ContextId, ErasedSurface, PaintContext, PlatformContext, RenderBackend, SurfaceSize};
use anyhow::{anyhow, Result};
use std::any::Any;
use std::ffi::c_void;

/// Cairo backend. Surfaces draw straight into the host's target surface.
pub struct CairoBackend;

impl CairoBackend {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for CairoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for CairoBackend {
    fn name(&self) -> &str {
        "CairoBackend"
    }

    /// Creates a sub-surface covering `size` pixels of the host target.
    fn create_surface(&self, context: &dyn PlatformContext, size: SurfaceSize) -> Result<Box<dyn ErasedSurface>> {
        let target = context
            .as_any()
            .downcast_ref::<CairoTarget>()
            .ok_or_else(|| anyhow!("CairoBackend used with non-Cairo platform context"))?;

        let surface = target.surface.create_for_rectangle(cairo::Rectangle::new(
            0.0,
            0.0,
            size.width as f64,
            size.height as f64,
        ))?;
        surface.status()?;

        Ok(Box::new(CairoSurface {
            surface,
            size,
            context: target.id(),
        }))
    }

    fn create_paint_context(&self, surface: &mut dyn ErasedSurface) -> Result<Box<dyn PaintContext>> {
        let s = surface
            .as_any_mut()
            .downcast_mut::<CairoSurface>()
            .ok_or_else(|| anyhow!("CairoBackend used with non-Cairo surface"))?;

        let cr = cairo::Context::new(&s.surface)?;
        cr.status()?;

        Ok(Box::new(CairoPaintContext { cr }))
    }
}

/// Host drawing target handed to the view for one paint request.
///
/// Identity is the address of the underlying `cairo_surface_t`, so a host that
/// hands out a different target (even one of the same size) forces the view
/// to rebuild its surface.
///
/// Surfaces are carved out of the target in its own units. Only a target
/// measured in device pixels should be paired with a view scale factor
/// other than 1; toolkit contexts that apply the monitor scale themselves
/// (GTK4 draw funcs) should leave it at 1.
#[derive(Clone, Debug)]
pub struct CairoTarget {
    surface: cairo::Surface,
}

impl CairoTarget {
    pub fn new(surface: cairo::Surface) -> Self {
        Self { surface }
    }

    /// Uses the current target of a host-provided context. The target keeps
    /// the context's units.
    pub fn from_context(cr: &cairo::Context) -> Self {
        Self { surface: cr.target() }
    }
}

impl PlatformContext for CairoTarget {
    fn id(&self) -> ContextId {
        ContextId::from_ptr(self.surface.to_raw_none().cast_const())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct CairoSurface {
    surface: cairo::Surface,
    size: SurfaceSize,
    context: ContextId,
}

impl Drop for CairoSurface {
    fn drop(&mut self) {
        self.surface.flush();
    }
}

impl ErasedSurface for CairoSurface {
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

/// Paint context backed by a `cairo::Context`. Engines drawing with cairo
/// downcast to this type and use [`CairoPaintContext::cairo`].
pub struct CairoPaintContext {
    cr: cairo::Context,
}

impl CairoPaintContext {
    #[inline]
    pub fn cairo(&self) -> &cairo::Context {
        &self.cr
    }
}

impl PaintContext for CairoPaintContext {
    fn save(&mut self) -> Result<()> {
        Ok(self.cr.save()?)
    }

    fn restore(&mut self) -> Result<()> {
        Ok(self.cr.restore()?)
    }

    fn clip(&mut self, rect: DeviceRect) {
        self.cr.rectangle(rect.x, rect.y, rect.width, rect.height);
        self.cr.clip();
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.cr.scale(sx, sy);
    }

    fn native_handle(&self) -> *mut c_void {
        self.cr.to_raw_none() as *mut c_void
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
