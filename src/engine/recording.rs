//! In-memory canvas engine.
//!
//! `RecordingEngine` keeps strokes as point lists, logs every call made
//! through the [`CanvasEngine`] table and fires invalidation callbacks
//! synchronously from inside the call that caused them, the way a native
//! engine does. Hosts without a native engine can use it as a scratch pad;
//! the tests use the call log to check what the view forwarded.
//!
//! A stroke invalidates once, on `Up`, with the bounding rectangle of all its
//! points. The document height only changes through
//! [`RecordingEngine::set_height`] or, with [`RecordingEngine::grow_with_content`],
//! when a stroke reaches below the current height.

use crate::engine::{CanvasEngine, CanvasId, DirtyRegion, InputPhase, InputTool, InvalidateCallback, StrokeStyle};
use crate::geometry::{DocPoint, DocRect};
use crate::render::backend::PaintContext;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One call received through the engine table.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Open(PathBuf),
    Create(PathBuf),
    Destroy(CanvasId),
    SetInvalidateCallback(CanvasId),
    SetStrokeStyle(CanvasId, StrokeStyle),
    Input {
        canvas: CanvasId,
        phase: InputPhase,
        tool: InputTool,
        point: DocPoint,
        pressure: f32,
    },
    Draw { canvas: CanvasId, magnification: f64 },
    Height(CanvasId),
    Undo(CanvasId),
    Redo(CanvasId),
}

#[derive(Debug, Clone)]
pub struct Stroke {
    pub tool: InputTool,
    pub style: StrokeStyle,
    pub points: Vec<DocPoint>,
    pub bounds: DocRect,
}

struct Document {
    path: PathBuf,
    height: f64,
    style: StrokeStyle,
    callback: Option<InvalidateCallback>,
    current: Option<Stroke>,
    strokes: Vec<Stroke>,
    redo: Vec<Stroke>,
}

#[derive(Default)]
struct State {
    /// Documents that exist, with the height they open at.
    stored: HashMap<PathBuf, f64>,
    open: HashMap<CanvasId, Document>,
    calls: Vec<EngineCall>,
    destroyed: HashSet<CanvasId>,
}

#[derive(Default)]
pub struct RecordingEngine {
    state: RefCell<State>,
    next_id: Cell<u64>,
    grow: Cell<bool>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `path` openable, with the given height in page-width units.
    pub fn add_document(&self, path: impl Into<PathBuf>, height: f64) {
        self.state.borrow_mut().stored.insert(path.into(), height);
    }

    /// When enabled, a stroke reaching below the document grows it and
    /// reports a layout change before its own rectangle.
    pub fn grow_with_content(&self, grow: bool) {
        self.grow.set(grow);
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.borrow().calls.clone()
    }

    pub fn is_open(&self, canvas: CanvasId) -> bool {
        self.state.borrow().open.contains_key(&canvas)
    }

    pub fn open_count(&self) -> usize {
        self.state.borrow().open.len()
    }

    pub fn was_destroyed(&self, canvas: CanvasId) -> bool {
        self.state.borrow().destroyed.contains(&canvas)
    }

    /// Path the canvas was opened from or created at.
    pub fn path_of(&self, canvas: CanvasId) -> Option<PathBuf> {
        self.state.borrow().open.get(&canvas).map(|d| d.path.clone())
    }

    /// The callback currently installed for `canvas`.
    pub fn callback(&self, canvas: CanvasId) -> Option<InvalidateCallback> {
        self.state.borrow().open.get(&canvas).and_then(|d| d.callback.clone())
    }

    /// Finished strokes of `canvas`, oldest first.
    pub fn strokes(&self, canvas: CanvasId) -> Vec<Stroke> {
        self.state
            .borrow()
            .open
            .get(&canvas)
            .map(|d| d.strokes.clone())
            .unwrap_or_default()
    }

    /// Changes the document height and reports a layout change.
    pub fn set_height(&self, canvas: CanvasId, height: f64) {
        let changed = match self.state.borrow_mut().open.get_mut(&canvas) {
            Some(doc) => {
                doc.height = height;
                true
            }
            None => false,
        };
        if changed {
            self.fire(canvas, DirtyRegion::Layout);
        }
    }

    /// Reports an arbitrary change, as if the engine had made it.
    pub fn invalidate(&self, canvas: CanvasId, region: DirtyRegion) {
        self.fire(canvas, region);
    }

    fn record(&self, call: EngineCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn allocate(&self, path: &Path, height: f64, style: StrokeStyle) -> CanvasId {
        let id = CanvasId::from_raw(self.next_id.get() + 1);
        self.next_id.set(id.raw());

        self.state.borrow_mut().open.insert(
            id,
            Document {
                path: path.to_path_buf(),
                height,
                style,
                callback: None,
                current: None,
                strokes: Vec::new(),
                redo: Vec::new(),
            },
        );
        id
    }

    /// Invokes the callback with no engine state borrowed, so the callback may
    /// call straight back into the engine.
    fn fire(&self, canvas: CanvasId, region: DirtyRegion) {
        let callback = self.callback(canvas);
        if let Some(callback) = callback {
            callback(canvas, region);
        }
    }
}

impl CanvasEngine for RecordingEngine {
    fn name(&self) -> &str {
        "RecordingEngine"
    }

    fn open(&self, path: &Path) -> Option<CanvasId> {
        self.record(EngineCall::Open(path.to_path_buf()));

        let height = self.state.borrow().stored.get(path).copied()?;
        Some(self.allocate(path, height, StrokeStyle::black(0.0)))
    }

    fn create(&self, path: &Path) -> Option<CanvasId> {
        self.record(EngineCall::Create(path.to_path_buf()));

        if self.state.borrow().stored.contains_key(path) {
            return None;
        }
        self.state.borrow_mut().stored.insert(path.to_path_buf(), 0.0);
        Some(self.allocate(path, 0.0, StrokeStyle::black(0.0)))
    }

    fn destroy(&self, canvas: CanvasId) {
        self.record(EngineCall::Destroy(canvas));

        let mut state = self.state.borrow_mut();
        match state.open.remove(&canvas) {
            Some(doc) => {
                state.stored.insert(doc.path, doc.height);
                state.destroyed.insert(canvas);
            }
            None => log::warn!("destroy of unknown {canvas}"),
        }
    }

    fn set_invalidate_callback(&self, canvas: CanvasId, callback: InvalidateCallback) {
        self.record(EngineCall::SetInvalidateCallback(canvas));

        if let Some(doc) = self.state.borrow_mut().open.get_mut(&canvas) {
            doc.callback = Some(callback);
        }
    }

    fn set_stroke_style(&self, canvas: CanvasId, style: StrokeStyle) {
        self.record(EngineCall::SetStrokeStyle(canvas, style));

        if let Some(doc) = self.state.borrow_mut().open.get_mut(&canvas) {
            doc.style = style;
        }
    }

    fn stroke_style(&self, canvas: CanvasId) -> StrokeStyle {
        self.state
            .borrow()
            .open
            .get(&canvas)
            .map(|d| d.style)
            .unwrap_or_else(|| StrokeStyle::black(0.0))
    }

    fn input(&self, canvas: CanvasId, phase: InputPhase, tool: InputTool, point: DocPoint, pressure: f32) {
        self.record(EngineCall::Input {
            canvas,
            phase,
            tool,
            point,
            pressure,
        });

        let mut events = Vec::new();
        {
            let mut state = self.state.borrow_mut();
            let Some(doc) = state.open.get_mut(&canvas) else {
                return;
            };

            match phase {
                InputPhase::Down => {
                    doc.current = Some(Stroke {
                        tool,
                        style: doc.style,
                        points: vec![point],
                        bounds: DocRect::new(point.x, point.y, point.x, point.y),
                    });
                }
                InputPhase::Drag | InputPhase::Up => {
                    let stroke = doc.current.get_or_insert_with(|| Stroke {
                        tool,
                        style: doc.style,
                        points: Vec::new(),
                        bounds: DocRect::new(point.x, point.y, point.x, point.y),
                    });
                    stroke.points.push(point);
                    stroke.bounds.expand_to(point);
                }
            }

            if phase == InputPhase::Up {
                if let Some(stroke) = doc.current.take() {
                    if self.grow.get() && stroke.bounds.y2 > doc.height {
                        doc.height = stroke.bounds.y2;
                        events.push(DirtyRegion::Layout);
                    }
                    events.push(DirtyRegion::Rect(stroke.bounds));
                    if stroke.tool == InputTool::Pen {
                        doc.strokes.push(stroke);
                        doc.redo.clear();
                    }
                }
            }
        }

        for region in events {
            self.fire(canvas, region);
        }
    }

    fn draw(&self, canvas: CanvasId, paint: &mut dyn PaintContext, magnification: f64) {
        self.record(EngineCall::Draw { canvas, magnification });

        #[cfg(feature = "backend_cairo")]
        if let Some(cairo) = paint
            .as_any_mut()
            .downcast_mut::<crate::render::backends::cairo::CairoPaintContext>()
        {
            let strokes = self.strokes(canvas);
            paint_strokes(cairo.cairo(), &strokes);
        }

        #[cfg(not(feature = "backend_cairo"))]
        let _ = paint;
    }

    fn height(&self, canvas: CanvasId) -> f64 {
        self.record(EngineCall::Height(canvas));

        self.state.borrow().open.get(&canvas).map(|d| d.height).unwrap_or(0.0)
    }

    fn undo(&self, canvas: CanvasId) -> bool {
        self.record(EngineCall::Undo(canvas));

        let bounds = {
            let mut state = self.state.borrow_mut();
            let Some(doc) = state.open.get_mut(&canvas) else {
                return false;
            };
            let Some(stroke) = doc.strokes.pop() else {
                return false;
            };
            let bounds = stroke.bounds;
            doc.redo.push(stroke);
            bounds
        };

        self.fire(canvas, DirtyRegion::Rect(bounds));
        true
    }

    fn redo(&self, canvas: CanvasId) -> bool {
        self.record(EngineCall::Redo(canvas));

        let bounds = {
            let mut state = self.state.borrow_mut();
            let Some(doc) = state.open.get_mut(&canvas) else {
                return false;
            };
            let Some(stroke) = doc.redo.pop() else {
                return false;
            };
            let bounds = stroke.bounds;
            doc.strokes.push(stroke);
            bounds
        };

        self.fire(canvas, DirtyRegion::Rect(bounds));
        true
    }
}

#[cfg(feature = "backend_cairo")]
fn paint_strokes(cr: &cairo::Context, strokes: &[Stroke]) {
    for stroke in strokes {
        let Some(first) = stroke.points.first() else {
            continue;
        };
        let s = stroke.style;
        cr.set_source_rgba(s.r as f64, s.g as f64, s.b as f64, s.a as f64);
        cr.set_line_width(s.thickness as f64);
        cr.set_line_cap(cairo::LineCap::Round);
        cr.set_line_join(cairo::LineJoin::Round);
        cr.move_to(first.x, first.y);
        for p in &stroke.points[1..] {
            cr.line_to(p.x, p.y);
        }
        if let Err(e) = cr.stroke() {
            log::warn!("stroke paint failed: {e}");
        }
    }
}
