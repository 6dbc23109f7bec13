//! Engine change notifications turned into host redraw requests.
//!
//! The engine may invoke the callback from inside any of its own calls,
//! including `input()` issued by the view a few frames up the stack. Every
//! piece of view state touched here is therefore a `Cell`, and the host and
//! engine are only reached through `&self` methods.

use crate::engine::{CanvasEngine, CanvasHandle, CanvasId, DirtyRegion, InvalidateCallback};
use crate::geometry::{CoordinateMapper, DeviceRect, DeviceSize, DocRect};
use crate::view::{ViewHost, ViewId};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// One bind of a canvas to a view. Canvas ids are only unique per engine,
/// so the generation tells apart two binds that share an id.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Binding {
    canvas: CanvasId,
    generation: u64,
}

/// View state reachable from engine callbacks.
pub(crate) struct ViewShared {
    id: ViewId,
    page_width: f64,
    frame: Cell<DeviceSize>,
    bound: Cell<Option<Binding>>,
    generation: Cell<u64>,
    host: Rc<dyn ViewHost>,
}

impl ViewShared {
    pub(crate) fn new(id: ViewId, page_width: f64, host: Rc<dyn ViewHost>) -> Self {
        Self {
            id,
            page_width,
            frame: Cell::new(DeviceSize::default()),
            bound: Cell::new(None),
            generation: Cell::new(0),
            host,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> ViewId {
        self.id
    }

    #[inline]
    pub(crate) fn frame(&self) -> DeviceSize {
        self.frame.get()
    }

    pub(crate) fn set_frame(&self, size: DeviceSize) {
        self.frame.set(size);
    }

    #[inline]
    pub(crate) fn bound(&self) -> Option<Binding> {
        self.bound.get()
    }

    /// Every call starts a new generation, even when `canvas` repeats an id
    /// seen before.
    pub(crate) fn bind(&self, canvas: Option<CanvasId>) {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.bound.set(canvas.map(|canvas| Binding { canvas, generation }));
    }

    /// Resizes the layout box to `height` pages and repaints all of it.
    pub(crate) fn relayout(&self, height: f64) {
        let height = if height.is_finite() && height > 0.0 { height } else { 0.0 };
        let size = DeviceSize::new(self.page_width, height * self.page_width);
        log::trace!("{}: relayout to {}x{}", self.id, size.width, size.height);

        self.frame.set(size);
        self.host.set_layout_size(size);
        self.host.request_redraw(DeviceRect::from_size(size));
    }

    /// Requests a repaint of `rect`, mapped with the current frame width.
    pub(crate) fn invalidate(&self, rect: DocRect) {
        let Some(mapper) = CoordinateMapper::new(self.frame.get().width) else {
            log::trace!("{}: zero-width view, dropping invalidation", self.id);
            return;
        };
        self.host.request_redraw(mapper.to_device_rect(rect));
    }
}

/// Callback target registered with the engine for one bound canvas.
///
/// Holds the view and engine weakly: a callback that outlives either, or
/// arrives after the view moved on to another canvas, does nothing. Must be
/// created after the view bound `handle`.
pub struct InvalidationBridge {
    view: Weak<ViewShared>,
    binding: Option<Binding>,
    engine: Weak<dyn CanvasEngine>,
}

impl InvalidationBridge {
    pub(crate) fn new(view: &Rc<ViewShared>, handle: &CanvasHandle) -> Self {
        let binding = view.bound().filter(|b| b.canvas == handle.id());
        if binding.is_none() {
            log::warn!("{}: bridge for unbound {}, callbacks will be discarded", view.id(), handle.id());
        }
        Self {
            view: Rc::downgrade(view),
            binding,
            engine: Rc::downgrade(handle.engine()),
        }
    }

    #[inline]
    pub fn canvas(&self) -> Option<CanvasId> {
        self.binding.map(|b| b.canvas)
    }

    pub fn on_invalidate(&self, canvas: CanvasId, region: DirtyRegion) {
        let Some(view) = self.view.upgrade() else {
            log::trace!("invalidation for {canvas} after view teardown, discarded");
            return;
        };
        let current = self.binding.filter(|b| b.canvas == canvas && view.bound() == Some(*b));
        if current.is_none() {
            log::debug!("{}: stale invalidation for {canvas}, discarded", view.id());
            return;
        }

        match region {
            DirtyRegion::Layout => {
                let Some(engine) = self.engine.upgrade() else {
                    return;
                };
                view.relayout(engine.height(canvas));
            }
            DirtyRegion::Rect(rect) => view.invalidate(rect),
        }
    }

    pub fn into_callback(self) -> InvalidateCallback {
        Rc::new(move |canvas, region| self.on_invalidate(canvas, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::{EngineCall, RecordingEngine};
    use crate::view::tests::RecordingHost;
    use std::path::Path;

    fn setup(height: f64) -> (Rc<RecordingEngine>, Rc<dyn CanvasEngine>, Rc<RecordingHost>, Rc<ViewShared>, CanvasHandle) {
        let recording = Rc::new(RecordingEngine::new());
        recording.add_document("doc.note", height);
        let engine: Rc<dyn CanvasEngine> = recording.clone();
        let host = Rc::new(RecordingHost::default());
        let shared = Rc::new(ViewShared::new(ViewId::new(), 500.0, host.clone()));
        let handle = CanvasHandle::open(&engine, Path::new("doc.note")).unwrap();
        shared.bind(Some(handle.id()));
        (recording, engine, host, shared, handle)
    }

    #[test]
    fn layout_uses_engine_height_times_page_width() {
        let (recording, _engine, host, shared, handle) = setup(3.0);
        let bridge = InvalidationBridge::new(&shared, &handle);

        bridge.on_invalidate(handle.id(), DirtyRegion::Layout);

        assert_eq!(host.layouts(), vec![DeviceSize::new(500.0, 1500.0)]);
        assert_eq!(host.redraws(), vec![DeviceRect::new(0.0, 0.0, 500.0, 1500.0)]);
        assert_eq!(shared.frame(), DeviceSize::new(500.0, 1500.0));
        assert!(recording.calls().contains(&EngineCall::Height(handle.id())));
    }

    #[test]
    fn rect_is_scaled_by_current_width() {
        let (_recording, _engine, host, shared, handle) = setup(1.0);
        shared.set_frame(DeviceSize::new(200.0, 200.0));
        let bridge = InvalidationBridge::new(&shared, &handle);

        bridge.on_invalidate(handle.id(), DirtyRegion::Rect(DocRect::new(0.25, 0.5, 0.75, 1.0)));

        assert_eq!(host.redraws(), vec![DeviceRect::new(50.0, 100.0, 100.0, 100.0)]);
        assert!(host.layouts().is_empty());
    }

    #[test]
    fn zero_width_drops_rect_invalidation() {
        let (_recording, _engine, host, shared, handle) = setup(1.0);
        let bridge = InvalidationBridge::new(&shared, &handle);

        bridge.on_invalidate(handle.id(), DirtyRegion::Rect(DocRect::new(0.0, 0.0, 1.0, 1.0)));
        assert!(host.redraws().is_empty());
    }

    #[test]
    fn unbound_canvas_is_ignored() {
        let (recording, _engine, host, shared, handle) = setup(1.0);
        let bridge = InvalidationBridge::new(&shared, &handle);
        shared.bind(None);

        bridge.on_invalidate(handle.id(), DirtyRegion::Layout);
        assert!(host.redraws().is_empty());
        assert!(!recording.calls().contains(&EngineCall::Height(handle.id())));
    }

    #[test]
    fn dead_view_is_ignored() {
        let (_recording, _engine, host, shared, handle) = setup(1.0);
        let callback = InvalidationBridge::new(&shared, &handle).into_callback();
        drop(shared);

        callback(handle.id(), DirtyRegion::Layout);
        assert!(host.redraws().is_empty());
    }

    #[test]
    fn rebinding_same_id_retires_old_bridge() {
        let (_recording, _engine, host, shared, handle) = setup(1.0);
        let old = InvalidationBridge::new(&shared, &handle);
        assert_eq!(old.canvas(), Some(handle.id()));

        shared.bind(None);
        shared.bind(Some(handle.id()));
        let new = InvalidationBridge::new(&shared, &handle);

        old.on_invalidate(handle.id(), DirtyRegion::Layout);
        assert!(host.layouts().is_empty());

        new.on_invalidate(handle.id(), DirtyRegion::Layout);
        assert_eq!(host.layouts(), vec![DeviceSize::new(500.0, 500.0)]);
    }

    #[test]
    fn bridge_for_unbound_handle_discards_everything() {
        let (_recording, _engine, host, shared, handle) = setup(1.0);
        shared.bind(None);
        let bridge = InvalidationBridge::new(&shared, &handle);
        assert_eq!(bridge.canvas(), None);

        shared.bind(Some(handle.id()));
        bridge.on_invalidate(handle.id(), DirtyRegion::Layout);
        assert!(host.layouts().is_empty());
    }

    #[test]
    fn foreign_canvas_id_is_ignored() {
        let (_recording, _engine, host, shared, handle) = setup(1.0);
        shared.set_frame(DeviceSize::new(100.0, 100.0));
        let bridge = InvalidationBridge::new(&shared, &handle);

        bridge.on_invalidate(CanvasId::from_raw(999), DirtyRegion::Rect(DocRect::new(0.0, 0.0, 1.0, 1.0)));
        assert!(host.redraws().is_empty());
    }
}
