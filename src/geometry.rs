//! Coordinate spaces and the mapping between them.
//!
//! A canvas view deals with three spaces:
//!
//! - **Device space**: the view's own units, in which the host reports pointer
//!   positions and accepts redraw requests. `(0, 0)` is the top-left corner.
//! - **Surface space**: device pixels of the backing surface. This is device
//!   space multiplied by the backing scale factor and is only used when
//!   allocating surfaces (see [`SurfaceSize`](crate::render::backend::SurfaceSize)).
//! - **Document space**: normalized space in which the page is exactly `1.0`
//!   wide and grows downwards without bound.
//!
//! [`CoordinateMapper`] converts between device and document space given the
//! view's current width `W`. Document space is scaled uniformly, so both axes
//! are divided (or multiplied) by `W`.
//!
//! ```
//! use inkview::geometry::{CoordinateMapper, DevicePoint, DocRect};
//!
//! let mapper = CoordinateMapper::new(500.0).unwrap();
//! let doc = mapper.to_document(DevicePoint::new(250.0, 1000.0));
//! assert_eq!((doc.x, doc.y), (0.5, 2.0));
//!
//! let rect = mapper.to_device_rect(DocRect::new(0.1, 0.1, 0.2, 0.2));
//! assert!((rect.width - 50.0).abs() < 1e-9);
//! ```

/// A point in device space (view units).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DevicePoint {
    pub x: f64,
    pub y: f64,
}

impl DevicePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a view in device space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceSize {
    pub width: f64,
    pub height: f64,
}

impl DeviceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` when either dimension cannot hold a single pixel.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Multiplies both dimensions by `factor`.
    pub fn scaled(&self, factor: f64) -> DeviceSize {
        DeviceSize {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// A rectangle in device space, stored as origin plus size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DeviceRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// The rectangle covering a whole view of the given size.
    pub fn from_size(size: DeviceSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
        }
    }
}

/// A point in normalized document space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rectangle in normalized document space, stored as two corners.
///
/// This is the shape the canvas engine reports dirty regions in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DocRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl DocRect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Grows the rectangle so it contains `p`.
    pub fn expand_to(&mut self, p: DocPoint) {
        self.x1 = self.x1.min(p.x);
        self.y1 = self.y1.min(p.y);
        self.x2 = self.x2.max(p.x);
        self.y2 = self.y2.max(p.y);
    }
}

/// Converts between device space and document space for a view `width` units wide.
///
/// The mapper is a plain value; build a new one whenever the view width changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    width: f64,
}

impl CoordinateMapper {
    /// Returns `None` for a view without positive width. Such a view maps
    /// nothing and callers skip whatever they were about to do.
    pub fn new(width: f64) -> Option<Self> {
        if width > 0.0 && width.is_finite() {
            Some(Self { width })
        } else {
            None
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn to_document(&self, p: DevicePoint) -> DocPoint {
        DocPoint {
            x: p.x / self.width,
            y: p.y / self.width,
        }
    }

    #[inline]
    pub fn to_device(&self, p: DocPoint) -> DevicePoint {
        DevicePoint {
            x: p.x * self.width,
            y: p.y * self.width,
        }
    }

    /// Scales origin and size of `rect` into device space.
    pub fn to_device_rect(&self, rect: DocRect) -> DeviceRect {
        DeviceRect {
            x: rect.x1 * self.width,
            y: rect.y1 * self.width,
            width: rect.width() * self.width,
            height: rect.height() * self.width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn zero_or_negative_width_maps_nothing() {
        assert!(CoordinateMapper::new(0.0).is_none());
        assert!(CoordinateMapper::new(-3.0).is_none());
        assert!(CoordinateMapper::new(f64::NAN).is_none());
    }

    #[test]
    fn document_device_round_trip() {
        for width in [1.0, 37.5, 500.0, 2880.0] {
            let mapper = CoordinateMapper::new(width).unwrap();
            for &(x, y) in &[(0.0, 0.0), (1.0, 1.0), (0.25, 0.75), (0.333, 0.999)] {
                let back = mapper.to_document(mapper.to_device(DocPoint::new(x, y)));
                assert!((back.x - x).abs() < EPS, "x drift at width {width}");
                assert!((back.y - y).abs() < EPS, "y drift at width {width}");
            }
        }
    }

    #[test]
    fn both_axes_use_the_width() {
        let mapper = CoordinateMapper::new(400.0).unwrap();
        let p = mapper.to_document(DevicePoint::new(100.0, 800.0));
        assert_eq!(p, DocPoint::new(0.25, 2.0));
    }

    #[test]
    fn device_rect_scales_origin_and_size() {
        let mapper = CoordinateMapper::new(500.0).unwrap();
        let r = mapper.to_device_rect(DocRect::new(0.1, 0.1, 0.2, 0.2));
        assert!((r.x - 50.0).abs() < EPS);
        assert!((r.y - 50.0).abs() < EPS);
        assert!((r.width - 50.0).abs() < EPS);
        assert!((r.height - 50.0).abs() < EPS);
    }

    #[test]
    fn expand_to_grows_bounds() {
        let mut r = DocRect::new(0.5, 0.5, 0.5, 0.5);
        r.expand_to(DocPoint::new(0.2, 0.9));
        r.expand_to(DocPoint::new(0.7, 0.4));
        assert_eq!(r, DocRect::new(0.2, 0.4, 0.7, 0.9));
    }

    #[test]
    fn empty_sizes() {
        assert!(DeviceSize::new(0.0, 10.0).is_empty());
        assert!(DeviceSize::new(10.0, 0.0).is_empty());
        assert!(!DeviceSize::new(1.0, 1.0).is_empty());
    }
}
