//! Input delivered to a [`CanvasView`](crate::view::CanvasView) by its host.
//!
//! Hosts translate their toolkit's events into [`ViewEvent`]s and pass them
//! to [`CanvasView::handle_event`](crate::view::CanvasView::handle_event).
//! Positions are in view units, relative to the view's top-left corner.

use crate::geometry::{DevicePoint, DeviceSize};
use std::fmt::Display;

/// Kind of device reported by a proximity (hover) event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointingDevice {
    /// Stylus tip
    Pen,
    /// Stylus eraser end
    Eraser,
    /// Puck or mouse-like tablet tool
    Cursor,
    /// Device the host could not classify
    Unknown,
}

impl Display for PointingDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointingDevice::Pen => write!(f, "Pen"),
            PointingDevice::Eraser => write!(f, "Eraser"),
            PointingDevice::Cursor => write!(f, "Cursor"),
            PointingDevice::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    // ****************************************
    // ** Pointer
    /// Stroke starts at position
    PointerDown { position: DevicePoint, pressure: f32 },
    /// Stroke continues to position
    PointerDrag { position: DevicePoint, pressure: f32 },
    /// Stroke ends at position
    PointerUp { position: DevicePoint, pressure: f32 },
    /// Tablet tool entered or left proximity. `None` when the host has no device information.
    Proximity { device: Option<PointingDevice> },

    // ****************************************
    // ** Geometry
    /// View was resized by the host
    Resize { size: DeviceSize },
    /// Zoom level changed
    Magnify { magnification: f64 },
    /// Backing store scale changed (e.g. window moved to another monitor)
    ScaleFactor { factor: f64 },

    // ****************************************
    // ** History
    Undo,
    Redo,
}

impl Display for ViewEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewEvent::PointerDown { position, pressure } => {
                write!(f, "PointerDown({}, {}, p={pressure})", position.x, position.y)
            }
            ViewEvent::PointerDrag { position, pressure } => {
                write!(f, "PointerDrag({}, {}, p={pressure})", position.x, position.y)
            }
            ViewEvent::PointerUp { position, pressure } => {
                write!(f, "PointerUp({}, {}, p={pressure})", position.x, position.y)
            }
            ViewEvent::Proximity { device: Some(d) } => write!(f, "Proximity({d})"),
            ViewEvent::Proximity { device: None } => write!(f, "Proximity(none)"),
            ViewEvent::Resize { size } => write!(f, "Resize({}x{})", size.width, size.height),
            ViewEvent::Magnify { magnification } => write!(f, "Magnify({magnification})"),
            ViewEvent::ScaleFactor { factor } => write!(f, "ScaleFactor({factor})"),
            ViewEvent::Undo => write!(f, "Undo"),
            ViewEvent::Redo => write!(f, "Redo"),
        }
    }
}
