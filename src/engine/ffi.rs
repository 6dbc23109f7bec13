//! Canvas engine living behind a C function table.
//!
//! Native engines hand over an [`EngineTable`] of `extern "C"` functions and
//! an opaque pointer per document. [`FfiEngine`] wraps the table in the
//! [`CanvasEngine`] trait. Invalidate callbacks are boxed on the Rust side and
//! passed to C as a token together with a trampoline; the box lives until the
//! callback is replaced or the document destroyed.

use crate::engine::{CanvasEngine, CanvasId, DirtyRegion, InputPhase, InputTool, InvalidateCallback, StrokeStyle};
use crate::errors::EngineError;
use crate::geometry::{DocPoint, DocRect};
use crate::render::backend::PaintContext;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CString};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::ptr::NonNull;

/// Opaque per-document pointer owned by the native engine.
pub type RawCanvas = *mut c_void;

/// Document-space rectangle as the native engine reports it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl From<&RawRect> for DocRect {
    fn from(r: &RawRect) -> Self {
        DocRect::new(r.x1 as f64, r.y1 as f64, r.x2 as f64, r.y2 as f64)
    }
}

/// Invalidate callback as seen from C. `rect` is null when the document
/// extent changed; `token` is the value registered with the callback.
pub type RawInvalidateFn = unsafe extern "C" fn(canvas: RawCanvas, rect: *const RawRect, token: *mut c_void);

/// Function table exported by a native canvas engine.
///
/// Paths are NUL-terminated UTF-8. `open` and `create` return null on failure.
/// `draw` receives the paint context's native handle (a `cairo_t*` for the
/// cairo backend).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct EngineTable {
    pub open: unsafe extern "C" fn(path: *const c_char) -> RawCanvas,
    pub create: unsafe extern "C" fn(path: *const c_char) -> RawCanvas,
    pub destroy: unsafe extern "C" fn(canvas: RawCanvas),
    pub set_invalidate_callback:
        unsafe extern "C" fn(canvas: RawCanvas, callback: Option<RawInvalidateFn>, token: *mut c_void),
    pub set_stroke_style: unsafe extern "C" fn(canvas: RawCanvas, style: StrokeStyle),
    pub get_stroke_style: unsafe extern "C" fn(canvas: RawCanvas) -> StrokeStyle,
    pub input: unsafe extern "C" fn(canvas: RawCanvas, phase: InputPhase, tool: InputTool, x: f32, y: f32, pressure: f32),
    pub draw: unsafe extern "C" fn(canvas: RawCanvas, context: *mut c_void, magnification: f32),
    pub get_height: unsafe extern "C" fn(canvas: RawCanvas) -> f32,
    pub undo: unsafe extern "C" fn(canvas: RawCanvas) -> bool,
    pub redo: unsafe extern "C" fn(canvas: RawCanvas) -> bool,
}

struct CallbackSlot {
    canvas: CanvasId,
    callback: InvalidateCallback,
}

struct Binding {
    raw: NonNull<c_void>,
    slot: Option<Box<CallbackSlot>>,
}

pub struct FfiEngine {
    name: String,
    table: EngineTable,
    canvases: RefCell<HashMap<CanvasId, Binding>>,
    next_id: Cell<u64>,
}

impl FfiEngine {
    /// Wraps a native function table.
    ///
    /// # Safety
    ///
    /// Every function in `table` must be sound to call, from the UI thread,
    /// with the arguments described on [`EngineTable`] for the whole lifetime
    /// of the returned engine.
    pub unsafe fn new(name: impl Into<String>, table: EngineTable) -> Self {
        Self {
            name: name.into(),
            table,
            canvases: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Number of documents currently open through this engine.
    pub fn open_count(&self) -> usize {
        self.canvases.borrow().len()
    }

    fn raw(&self, canvas: CanvasId) -> Option<RawCanvas> {
        let raw = self.canvases.borrow().get(&canvas).map(|b| b.raw.as_ptr());
        if raw.is_none() {
            log::warn!("{}: unknown {canvas}", self.name);
        }
        raw
    }

    fn adopt(&self, raw: RawCanvas) -> Option<CanvasId> {
        let raw = NonNull::new(raw)?;

        let id = CanvasId::from_raw(self.next_id.get() + 1);
        self.next_id.set(id.raw());
        self.canvases.borrow_mut().insert(id, Binding { raw, slot: None });
        Some(id)
    }

    fn release(&self, binding: Binding) {
        let raw = binding.raw.as_ptr();
        unsafe {
            (self.table.set_invalidate_callback)(raw, None, std::ptr::null_mut());
            (self.table.destroy)(raw);
        }
        drop(binding.slot);
    }
}

fn c_path(path: &Path) -> Result<CString, EngineError> {
    path.to_str()
        .and_then(|s| CString::new(s).ok())
        .ok_or_else(|| EngineError::InvalidPath(path.to_path_buf()))
}

unsafe extern "C" fn invalidate_trampoline(_canvas: RawCanvas, rect: *const RawRect, token: *mut c_void) {
    if token.is_null() {
        return;
    }

    // Clone out of the slot first: the callback may replace its own slot.
    let (canvas, callback) = {
        let slot = unsafe { &*(token as *const CallbackSlot) };
        (slot.canvas, slot.callback.clone())
    };
    let region: DirtyRegion = unsafe { rect.as_ref() }.map(DocRect::from).into();

    // Unwinding into C is undefined behaviour.
    if std::panic::catch_unwind(AssertUnwindSafe(|| callback(canvas, region))).is_err() {
        log::error!("invalidate callback for {canvas} panicked");
    }
}

impl CanvasEngine for FfiEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &Path) -> Option<CanvasId> {
        let path = c_path(path).map_err(|e| log::warn!("{}: {e}", self.name)).ok()?;
        let raw = unsafe { (self.table.open)(path.as_ptr()) };
        self.adopt(raw)
    }

    fn create(&self, path: &Path) -> Option<CanvasId> {
        let path = c_path(path).map_err(|e| log::warn!("{}: {e}", self.name)).ok()?;
        let raw = unsafe { (self.table.create)(path.as_ptr()) };
        self.adopt(raw)
    }

    fn destroy(&self, canvas: CanvasId) {
        let binding = self.canvases.borrow_mut().remove(&canvas);
        match binding {
            Some(binding) => self.release(binding),
            None => log::warn!("{}: destroy of unknown {canvas}", self.name),
        }
    }

    fn set_invalidate_callback(&self, canvas: CanvasId, callback: InvalidateCallback) {
        let Some(raw) = self.raw(canvas) else {
            return;
        };

        let slot = Box::new(CallbackSlot { canvas, callback });
        let token = &*slot as *const CallbackSlot as *mut c_void;
        unsafe { (self.table.set_invalidate_callback)(raw, Some(invalidate_trampoline), token) };

        let previous = self
            .canvases
            .borrow_mut()
            .get_mut(&canvas)
            .and_then(|b| b.slot.replace(slot));
        drop(previous);
    }

    fn set_stroke_style(&self, canvas: CanvasId, style: StrokeStyle) {
        if let Some(raw) = self.raw(canvas) {
            unsafe { (self.table.set_stroke_style)(raw, style) };
        }
    }

    fn stroke_style(&self, canvas: CanvasId) -> StrokeStyle {
        match self.raw(canvas) {
            Some(raw) => unsafe { (self.table.get_stroke_style)(raw) },
            None => StrokeStyle::black(0.0),
        }
    }

    fn input(&self, canvas: CanvasId, phase: InputPhase, tool: InputTool, point: DocPoint, pressure: f32) {
        if let Some(raw) = self.raw(canvas) {
            unsafe { (self.table.input)(raw, phase, tool, point.x as f32, point.y as f32, pressure) };
        }
    }

    fn draw(&self, canvas: CanvasId, paint: &mut dyn PaintContext, magnification: f64) {
        let Some(raw) = self.raw(canvas) else {
            return;
        };

        let context = paint.native_handle();
        if context.is_null() {
            log::warn!("{}: paint context has no native handle, not drawing {canvas}", self.name);
            return;
        }
        unsafe { (self.table.draw)(raw, context, magnification as f32) };
    }

    fn height(&self, canvas: CanvasId) -> f64 {
        match self.raw(canvas) {
            Some(raw) => unsafe { (self.table.get_height)(raw) as f64 },
            None => 0.0,
        }
    }

    fn undo(&self, canvas: CanvasId) -> bool {
        match self.raw(canvas) {
            Some(raw) => unsafe { (self.table.undo)(raw) },
            None => false,
        }
    }

    fn redo(&self, canvas: CanvasId) -> bool {
        match self.raw(canvas) {
            Some(raw) => unsafe { (self.table.redo)(raw) },
            None => false,
        }
    }
}

impl Drop for FfiEngine {
    fn drop(&mut self) {
        let leftover: Vec<_> = self.canvases.borrow_mut().drain().collect();
        for (id, binding) in leftover {
            log::warn!("{}: {id} still open at shutdown", self.name);
            self.release(binding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::ffi::CStr;
    use std::rc::Rc;

    struct FakeCanvas {
        height: Cell<f32>,
        style: Cell<StrokeStyle>,
        callback: Cell<Option<RawInvalidateFn>>,
        token: Cell<*mut c_void>,
    }

    thread_local! {
        static DESTROYED: Cell<u32> = const { Cell::new(0) };
        static LAST_DRAW: Cell<usize> = const { Cell::new(0) };
    }

    fn fake<'a>(canvas: RawCanvas) -> &'a FakeCanvas {
        unsafe { &*(canvas as *const FakeCanvas) }
    }

    fn new_fake(height: f32) -> RawCanvas {
        Box::into_raw(Box::new(FakeCanvas {
            height: Cell::new(height),
            style: Cell::new(StrokeStyle::black(0.0)),
            callback: Cell::new(None),
            token: Cell::new(std::ptr::null_mut()),
        })) as RawCanvas
    }

    fn fire(canvas: RawCanvas, rect: Option<RawRect>) {
        let f = fake(canvas);
        if let Some(cb) = f.callback.get() {
            let ptr = rect.as_ref().map_or(std::ptr::null(), |r| r as *const RawRect);
            unsafe { cb(canvas, ptr, f.token.get()) };
        }
    }

    unsafe extern "C" fn fake_open(path: *const c_char) -> RawCanvas {
        let path = unsafe { CStr::from_ptr(path) }.to_string_lossy();
        if path.ends_with("missing.note") {
            return std::ptr::null_mut();
        }
        new_fake(2.0)
    }

    unsafe extern "C" fn fake_create(_path: *const c_char) -> RawCanvas {
        new_fake(0.0)
    }

    unsafe extern "C" fn fake_destroy(canvas: RawCanvas) {
        drop(unsafe { Box::from_raw(canvas as *mut FakeCanvas) });
        DESTROYED.with(|d| d.set(d.get() + 1));
    }

    unsafe extern "C" fn fake_set_callback(canvas: RawCanvas, callback: Option<RawInvalidateFn>, token: *mut c_void) {
        let f = fake(canvas);
        f.callback.set(callback);
        f.token.set(token);
    }

    unsafe extern "C" fn fake_set_style(canvas: RawCanvas, style: StrokeStyle) {
        fake(canvas).style.set(style);
    }

    unsafe extern "C" fn fake_get_style(canvas: RawCanvas) -> StrokeStyle {
        fake(canvas).style.get()
    }

    unsafe extern "C" fn fake_input(canvas: RawCanvas, phase: InputPhase, _tool: InputTool, x: f32, y: f32, _p: f32) {
        let f = fake(canvas);
        if phase == InputPhase::Down && y > f.height.get() {
            f.height.set(y);
            fire(canvas, None);
        }
        if phase == InputPhase::Up {
            fire(
                canvas,
                Some(RawRect {
                    x1: x - 0.25,
                    y1: y - 0.25,
                    x2: x,
                    y2: y,
                }),
            );
        }
    }

    unsafe extern "C" fn fake_draw(_canvas: RawCanvas, context: *mut c_void, _magnification: f32) {
        LAST_DRAW.with(|d| d.set(context as usize));
    }

    unsafe extern "C" fn fake_height(canvas: RawCanvas) -> f32 {
        fake(canvas).height.get()
    }

    unsafe extern "C" fn fake_undo(_canvas: RawCanvas) -> bool {
        true
    }

    unsafe extern "C" fn fake_redo(_canvas: RawCanvas) -> bool {
        false
    }

    fn engine() -> Rc<FfiEngine> {
        let table = EngineTable {
            open: fake_open,
            create: fake_create,
            destroy: fake_destroy,
            set_invalidate_callback: fake_set_callback,
            set_stroke_style: fake_set_style,
            get_stroke_style: fake_get_style,
            input: fake_input,
            draw: fake_draw,
            get_height: fake_height,
            undo: fake_undo,
            redo: fake_redo,
        };
        Rc::new(unsafe { FfiEngine::new("fake", table) })
    }

    struct NativePaint(usize);

    impl PaintContext for NativePaint {
        fn save(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn restore(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn clip(&mut self, _rect: crate::geometry::DeviceRect) {}
        fn scale(&mut self, _sx: f64, _sy: f64) {}
        fn native_handle(&self) -> *mut c_void {
            self.0 as *mut c_void
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn open_maps_null_to_none() {
        let engine = engine();
        assert!(engine.open(Path::new("/notes/missing.note")).is_none());

        let id = engine.open(Path::new("/notes/a.note")).unwrap();
        assert_eq!(engine.height(id), 2.0);
        assert_eq!(engine.open_count(), 1);
    }

    #[test]
    fn interior_nul_in_path_is_rejected() {
        let engine = engine();
        assert!(engine.create(Path::new("bad\0name.note")).is_none());
        assert_eq!(engine.open_count(), 0);
    }

    #[test]
    fn callbacks_cross_the_boundary() {
        let engine = engine();
        let id = engine.create(Path::new("n.note")).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let weak = Rc::downgrade(&engine);
        engine.set_invalidate_callback(
            id,
            Rc::new(move |canvas, region| {
                // Re-entrant query while the native input call is on the stack.
                let height = weak.upgrade().map(|e| e.height(canvas)).unwrap_or(-1.0);
                sink.borrow_mut().push((region, height));
            }),
        );

        engine.input(id, InputPhase::Down, InputTool::Pen, DocPoint::new(0.5, 0.5), 1.0);
        engine.input(id, InputPhase::Up, InputTool::Pen, DocPoint::new(0.5, 0.5), 1.0);

        assert_eq!(
            *seen.borrow(),
            vec![
                (DirtyRegion::Layout, 0.5),
                (DirtyRegion::Rect(DocRect::new(0.25, 0.25, 0.5, 0.5)), 0.5),
            ]
        );
    }

    #[test]
    fn replacing_callback_routes_to_the_new_one() {
        let engine = engine();
        let id = engine.create(Path::new("n.note")).unwrap();

        let hits = Rc::new(Cell::new((0, 0)));
        let h = hits.clone();
        engine.set_invalidate_callback(id, Rc::new(move |_, _| h.set((h.get().0 + 1, h.get().1))));
        let h = hits.clone();
        engine.set_invalidate_callback(id, Rc::new(move |_, _| h.set((h.get().0, h.get().1 + 1))));

        engine.input(id, InputPhase::Up, InputTool::Pen, DocPoint::new(0.5, 0.5), 1.0);
        assert_eq!(hits.get(), (0, 1));
    }

    #[test]
    fn destroy_releases_native_canvas_once() {
        let engine = engine();
        let id = engine.create(Path::new("n.note")).unwrap();
        engine.set_invalidate_callback(id, Rc::new(|_, _| {}));

        engine.destroy(id);
        engine.destroy(id);

        assert_eq!(DESTROYED.with(|d| d.get()), 1);
        assert_eq!(engine.open_count(), 0);
        assert_eq!(engine.height(id), 0.0);
    }

    #[test]
    fn draw_passes_native_handle() {
        let engine = engine();
        let id = engine.create(Path::new("n.note")).unwrap();

        engine.draw(id, &mut NativePaint(0), 1.0);
        assert_eq!(LAST_DRAW.with(|d| d.get()), 0);

        engine.draw(id, &mut NativePaint(0x1000), 1.0);
        assert_eq!(LAST_DRAW.with(|d| d.get()), 0x1000);
    }

    #[test]
    fn style_and_history_forward() {
        let engine = engine();
        let id = engine.create(Path::new("n.note")).unwrap();

        let style = StrokeStyle::black(0.01).with_color(1.0, 0.5, 0.0);
        engine.set_stroke_style(id, style);
        assert_eq!(engine.stroke_style(id), style);
        assert!(engine.undo(id));
        assert!(!engine.redo(id));
    }

    #[test]
    fn dropping_engine_destroys_leftovers() {
        let engine = engine();
        engine.create(Path::new("a.note")).unwrap();
        engine.create(Path::new("b.note")).unwrap();
        drop(engine);

        assert_eq!(DESTROYED.with(|d| d.get()), 2);
    }
}
