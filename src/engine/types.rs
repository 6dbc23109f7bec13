use crate::geometry::DocRect;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Identifier the canvas engine assigns to an open document.
///
/// Treat it as opaque. Code outside the engine module only ever sees it through
/// a [`CanvasHandle`](crate::engine::CanvasHandle), which owns the document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanvasId(u64);

impl CanvasId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl Display for CanvasId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "canvas#{}", self.0)
    }
}

/// Phase of a pointer stroke
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub enum InputPhase {
    Down,
    Up,
    Drag,
}

/// Tool applied by pointer input. Changed only by proximity events.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub enum InputTool {
    #[default]
    Pen,
    Eraser,
}

impl Display for InputTool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InputTool::Pen => write!(f, "Pen"),
            InputTool::Eraser => write!(f, "Eraser"),
        }
    }
}

/// Style applied to new strokes.
///
/// Color channels are in `0.0 ..= 1.0`, `thickness` is in document units
/// (a fraction of the page width).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct StrokeStyle {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
    pub thickness: f32,
}

impl StrokeStyle {
    /// Opaque black at the given thickness.
    pub fn black(thickness: f32) -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
            thickness,
        }
    }

    /// Same thickness, new color.
    pub fn with_color(self, r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0, ..self }
    }

    pub fn same_color(&self, r: f32, g: f32, b: f32) -> bool {
        self.r == r && self.g == g && self.b == b
    }
}

/// What the engine reports as changed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DirtyRegion {
    /// The document extent changed; the view has to re-query the height and
    /// relayout before repainting everything.
    Layout,
    /// Content inside this document-space rectangle changed.
    Rect(DocRect),
}

impl From<Option<DocRect>> for DirtyRegion {
    fn from(rect: Option<DocRect>) -> Self {
        match rect {
            Some(r) => DirtyRegion::Rect(r),
            None => DirtyRegion::Layout,
        }
    }
}

/// Callback the engine invokes whenever a canvas changes. It may run from
/// inside any engine call that mutates the canvas, so it must not assume it
/// runs at a quiet point.
pub type InvalidateCallback = Rc<dyn Fn(CanvasId, DirtyRegion)>;
