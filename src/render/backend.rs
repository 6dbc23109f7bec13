use crate::geometry::{DeviceRect, DeviceSize};
use std::any::Any;
use std::ffi::c_void;

/// Size of a surface in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rounds a fractional size up to whole pixels, so the surface always
    /// covers the full view. Negative or NaN dimensions become `0`.
    pub fn from_device(size: DeviceSize) -> Self {
        Self {
            width: ceil_px(size.width),
            height: ceil_px(size.height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn ceil_px(v: f64) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else {
        v.ceil().min(u32::MAX as f64) as u32
    }
}

/// Identity of a platform drawing context.
///
/// Hosts may swap the context they hand out between frames without warning.
/// Two contexts with different ids must be treated as unrelated, even when
/// everything else about them looks the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Identity derived from the address of a native context object.
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize as u64)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

/// The drawing context a host offers for the current paint request.
pub trait PlatformContext: Any {
    fn id(&self) -> ContextId;
    fn as_any(&self) -> &dyn Any;
}

/// Stateful drawing cursor bound to exactly one surface.
///
/// Only the operations the view itself needs are part of the trait. Engines
/// that paint through a specific backend downcast via [`PaintContext::as_any_mut`].
pub trait PaintContext: Any {
    /// Pushes the current clip and transform.
    fn save(&mut self) -> anyhow::Result<()>;

    /// Pops the state pushed by the matching [`PaintContext::save`].
    fn restore(&mut self) -> anyhow::Result<()>;

    /// Intersects the clip with `rect`, given in the current user space.
    fn clip(&mut self, rect: DeviceRect);

    fn scale(&mut self, sx: f64, sy: f64);

    /// Native context pointer handed to engines living behind a C boundary.
    /// Null when the backend has no native context.
    fn native_handle(&self) -> *mut c_void {
        std::ptr::null_mut()
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Type-erased surface so the cache can hold it without generics.
pub trait ErasedSurface: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn size(&self) -> SurfaceSize;

    /// The platform context this surface was created against.
    fn context_id(&self) -> ContextId;
}

/// Creates surfaces and paint contexts for one kind of platform context.
/// Calls occur on the UI thread.
pub trait RenderBackend {
    fn name(&self) -> &str;

    /// Creates a surface of `size` drawing into `context`.
    fn create_surface(&self, context: &dyn PlatformContext, size: SurfaceSize) -> anyhow::Result<Box<dyn ErasedSurface>>;

    /// Creates a paint context bound to `surface`.
    fn create_paint_context(&self, surface: &mut dyn ErasedSurface) -> anyhow::Result<Box<dyn PaintContext>>;
}
