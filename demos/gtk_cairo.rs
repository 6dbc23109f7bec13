//! GTK4 host for a canvas view, drawing through the cairo backend.
//!
//! Run with `cargo run --example gtk_cairo --features gtk4,backend_cairo [config.json]`.
//! Strokes live in the in-memory recording engine; a fresh note is created in
//! the system temp directory on every start.

use gtk4::gdk;
use gtk4::glib;
use gtk4::prelude::*;
use gtk4::{Application, ApplicationWindow, DrawingArea, EventControllerKey, GestureDrag, GestureStylus, ScrolledWindow};
use inkview::engine::recording::RecordingEngine;
use inkview::engine::CanvasEngine;
use inkview::geometry::{DevicePoint, DeviceRect, DeviceSize};
use inkview::notes::NoteLibrary;
use inkview::render::backends::cairo::{CairoBackend, CairoTarget};
use inkview::view::PointingDevice;
use inkview::{CanvasView, ViewConfig, ViewEvent, ViewHost};
use std::cell::RefCell;
use std::rc::Rc;

struct GtkHost {
    area: DrawingArea,
}

impl ViewHost for GtkHost {
    fn request_redraw(&self, _rect: DeviceRect) {
        // GTK4 has no partial invalidation; the clip extents narrow it down again.
        self.area.queue_draw();
    }

    fn set_layout_size(&self, size: DeviceSize) {
        self.area.set_content_width(size.width.ceil() as i32);
        self.area.set_content_height(size.height.ceil().max(1.0) as i32);
    }
}

fn load_config() -> ViewConfig {
    let Some(path) = std::env::args().nth(1) else {
        return ViewConfig::default();
    };
    match std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|json| ViewConfig::from_json_str(&json).map_err(|e| e.to_string()))
    {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default config, cannot load {path}: {e}");
            ViewConfig::default()
        }
    }
}

fn device_kind(tool: Option<gdk::DeviceTool>) -> Option<PointingDevice> {
    tool.map(|t| match t.tool_type() {
        gdk::DeviceToolType::Pen | gdk::DeviceToolType::Brush | gdk::DeviceToolType::Pencil => PointingDevice::Pen,
        gdk::DeviceToolType::Eraser => PointingDevice::Eraser,
        gdk::DeviceToolType::Mouse | gdk::DeviceToolType::Lens => PointingDevice::Cursor,
        _ => PointingDevice::Unknown,
    })
}

fn pressure(gesture: &GestureDrag) -> f32 {
    gesture
        .current_event()
        .and_then(|e| e.axis(gdk::AxisUse::Pressure))
        .map(|p| p as f32)
        .unwrap_or(1.0)
}

fn main() {
    let config = load_config();
    inkview::logging::init(config.log_level);

    let app = Application::builder().application_id("io.inkview.demo").build();

    app.connect_activate(move |app| {
        let engine: Rc<dyn CanvasEngine> = Rc::new(RecordingEngine::new());
        let library = NoteLibrary::new(engine.clone(), std::env::temp_dir());

        let area = DrawingArea::new();
        let host = Rc::new(GtkHost { area: area.clone() });
        let view = Rc::new(RefCell::new(CanvasView::new(&config, host, Box::new(CairoBackend::new()))));

        match library.create_new(library.root()) {
            Ok((record, handle)) => {
                log::info!("drawing into {}", record.path.display());
                view.borrow_mut().set_canvas(Some(handle));
            }
            Err(e) => log::error!("{e}"),
        }

        let v = view.clone();
        area.set_draw_func(move |_, cr, width, height| {
            let mut view = v.borrow_mut();
            // The context measures in widget units and GTK applies the
            // monitor scale itself, so the view keeps a scale factor of 1.
            view.resize(DeviceSize::new(width as f64, height as f64));

            let dirty = match cr.clip_extents() {
                Ok((x1, y1, x2, y2)) => DeviceRect::new(x1, y1, x2 - x1, y2 - y1),
                Err(_) => DeviceRect::from_size(view.frame()),
            };
            let target = CairoTarget::from_context(cr);
            view.draw(Some(&target), dirty);
        });

        let drag = GestureDrag::new();
        let v = view.clone();
        drag.connect_drag_begin(move |g, x, y| {
            v.borrow_mut().handle_event(ViewEvent::PointerDown {
                position: DevicePoint::new(x, y),
                pressure: pressure(g),
            });
        });
        let v = view.clone();
        drag.connect_drag_update(move |g, dx, dy| {
            if let Some((x, y)) = g.start_point() {
                v.borrow_mut().handle_event(ViewEvent::PointerDrag {
                    position: DevicePoint::new(x + dx, y + dy),
                    pressure: pressure(g),
                });
            }
        });
        let v = view.clone();
        drag.connect_drag_end(move |g, dx, dy| {
            if let Some((x, y)) = g.start_point() {
                v.borrow_mut().handle_event(ViewEvent::PointerUp {
                    position: DevicePoint::new(x + dx, y + dy),
                    pressure: pressure(g),
                });
            }
        });
        area.add_controller(drag);

        let stylus = GestureStylus::new();
        let v = view.clone();
        stylus.connect_proximity(move |g, _x, _y| {
            v.borrow_mut().handle_event(ViewEvent::Proximity {
                device: device_kind(g.device_tool()),
            });
        });
        area.add_controller(stylus);

        let keys = EventControllerKey::new();
        let v = view.clone();
        keys.connect_key_pressed(move |_, key, _, state| {
            if !state.contains(gdk::ModifierType::CONTROL_MASK) {
                return glib::Propagation::Proceed;
            }
            let key = key.to_lower();
            let event = if key == gdk::Key::z && state.contains(gdk::ModifierType::SHIFT_MASK) {
                ViewEvent::Redo
            } else if key == gdk::Key::z {
                ViewEvent::Undo
            } else if key == gdk::Key::y {
                ViewEvent::Redo
            } else {
                return glib::Propagation::Proceed;
            };
            v.borrow_mut().handle_event(event);
            glib::Propagation::Stop
        });

        let scroller = ScrolledWindow::builder().child(&area).build();
        let window = ApplicationWindow::builder()
            .application(app)
            .title("inkview")
            .default_width(config.page_width.ceil() as i32)
            .default_height(700)
            .child(&scroller)
            .build();
        window.add_controller(keys);

        window.present();
    });

    // GTK would otherwise try to parse the config path as a file to open.
    app.run_with_args::<&str>(&[]);
}
