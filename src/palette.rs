//! Color swatch palette.
//!
//! Lays out a fixed set of round swatches in a grid, finds the swatch under a
//! pointer and applies its color to the canvas bound to a view. Stroke
//! thickness is left alone. Painting the palette is up to the host.

use crate::engine::StrokeStyle;
use crate::geometry::DevicePoint;
use crate::view::CanvasView;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Swatch {
    pub name: &'static str,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

macro_rules! rgb {
    ($name:literal, $hex:literal) => {
        Swatch {
            name: $name,
            r: (($hex >> 16) & 0xFF) as f32 / 255.0,
            g: (($hex >> 8) & 0xFF) as f32 / 255.0,
            b: ($hex & 0xFF) as f32 / 255.0,
        }
    };
}

pub const SWATCHES: [Swatch; 8] = [
    rgb!("black", 0x000000),
    rgb!("white", 0xFFFFFF),
    rgb!("orange", 0xFFA500),
    rgb!("red", 0xFF0000),
    rgb!("purple", 0x800080),
    rgb!("blue", 0x0000FF),
    rgb!("green", 0x00FF00),
    rgb!("yellow", 0xFFFF00),
];

#[derive(Debug, Clone, Default)]
pub struct ColorPalette {
    width: f64,
    swatch_radius: f64,
    swatch_area: f64,
    selected: Option<usize>,
}

impl ColorPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays the swatches out for `width` and returns the height the palette
    /// needs. A width too narrow for a single swatch yields `0`.
    pub fn set_width(&mut self, width: f64, swatch_size: f64, spacing: f64) -> f64 {
        self.width = width;
        self.swatch_radius = swatch_size / 2.0;
        self.swatch_area = swatch_size + spacing;

        let columns = self.columns();
        if columns == 0 {
            return 0.0;
        }
        let rows = (SWATCHES.len() - 1) / columns + 1;
        self.padding() + rows as f64 * self.swatch_area
    }

    pub fn columns(&self) -> usize {
        if self.swatch_area > 0.0 && self.width.is_finite() && self.width > 0.0 {
            (self.width / self.swatch_area).floor() as usize
        } else {
            0
        }
    }

    #[inline]
    pub fn swatch_radius(&self) -> f64 {
        self.swatch_radius
    }

    /// Index of the swatch matching the bound canvas's color, if any.
    #[inline]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    fn padding(&self) -> f64 {
        (self.width - self.columns() as f64 * self.swatch_area) / 2.0
    }

    pub fn swatch_center(&self, index: usize) -> Option<DevicePoint> {
        let columns = self.columns();
        if columns == 0 || index >= SWATCHES.len() {
            return None;
        }

        let pad = self.padding();
        let (row, col) = (index / columns, index % columns);
        Some(DevicePoint::new(
            pad + col as f64 * self.swatch_area + self.swatch_radius,
            pad + row as f64 * self.swatch_area + self.swatch_radius,
        ))
    }

    /// Swatch strictly within one radius of `point`.
    pub fn hit_test(&self, point: DevicePoint) -> Option<usize> {
        (0..SWATCHES.len()).find(|&i| {
            self.swatch_center(i).is_some_and(|c| {
                let (dx, dy) = (c.x - point.x, c.y - point.y);
                (dx * dx + dy * dy).sqrt() < self.swatch_radius
            })
        })
    }

    /// Marks the swatch whose color equals `style`, or none.
    pub fn sync_with(&mut self, style: Option<StrokeStyle>) {
        self.selected = style.and_then(|s| SWATCHES.iter().position(|w| s.same_color(w.r, w.g, w.b)));
    }

    /// Applies the swatch under `point` to the view's canvas. Returns the
    /// selected index, or `None` when nothing was hit or no document is bound.
    pub fn select_at(&mut self, point: DevicePoint, view: &mut CanvasView) -> Option<usize> {
        let index = self.hit_test(point)?;
        let current = view.stroke_style()?;

        let swatch = SWATCHES[index];
        view.set_stroke_style(current.with_color(swatch.r, swatch.g, swatch.b))
            .ok()?;
        log::debug!("{}: stroke color set to {}", view.id(), swatch.name);

        self.selected = Some(index);
        Some(index)
    }
}
