//! Surface cache for a single view.
//!
//! Keeps one surface and its paint context alive between frames. The pair is
//! keyed on both the pixel size and the identity of the platform context it
//! was built against: hosts can swap their context between frames, and a
//! surface built on the old one must not be drawn into again.
//!
//! Two policies are available. [`CachePolicy::Reuse`] keeps the pair for as
//! long as the key matches. [`CachePolicy::AlwaysRebuild`] builds a fresh pair
//! for every frame, for platforms where context identity cannot be trusted.

use crate::errors::RenderError;
use crate::geometry::DeviceSize;
use crate::render::backend::{ContextId, ErasedSurface, PaintContext, PlatformContext, RenderBackend, SurfaceSize};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// How the cache treats a surface that still matches the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Reuse the surface while size and context identity are unchanged.
    #[default]
    Reuse,
    /// Build a fresh surface for every frame.
    AlwaysRebuild,
}

/// Why the cache threw away (or never had) a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    FirstUse,
    SizeChanged { from: SurfaceSize, to: SurfaceSize },
    ContextChanged,
    Policy,
}

impl Display for RebuildReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RebuildReason::FirstUse => write!(f, "first use"),
            RebuildReason::SizeChanged { from, to } => write!(
                f,
                "size changed {}x{} -> {}x{}",
                from.width, from.height, to.width, to.height
            ),
            RebuildReason::ContextChanged => write!(f, "platform context changed"),
            RebuildReason::Policy => write!(f, "rebuild policy"),
        }
    }
}

/// A surface together with the paint context bound to it.
pub struct CachedSurface {
    // Declared first so that a plain drop also releases the paint context
    // before its surface.
    paint: Box<dyn PaintContext>,
    surface: Box<dyn ErasedSurface>,
}

impl CachedSurface {
    #[inline]
    pub fn size(&self) -> SurfaceSize {
        self.surface.size()
    }

    #[inline]
    pub fn context_id(&self) -> ContextId {
        self.surface.context_id()
    }

    #[inline]
    pub fn surface(&self) -> &dyn ErasedSurface {
        self.surface.as_ref()
    }

    #[inline]
    pub fn paint(&mut self) -> &mut dyn PaintContext {
        self.paint.as_mut()
    }

    /// Releases the paint context, then the surface.
    fn release(self) {
        let CachedSurface { paint, surface } = self;
        drop(paint);
        drop(surface);
    }
}

pub struct SurfaceCache {
    backend: Box<dyn RenderBackend>,
    policy: CachePolicy,
    entry: Option<CachedSurface>,
    rebuilds: u64,
}

impl SurfaceCache {
    pub fn new(backend: Box<dyn RenderBackend>, policy: CachePolicy) -> Self {
        Self {
            backend,
            policy,
            entry: None,
            rebuilds: 0,
        }
    }

    #[inline]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Number of surfaces built so far.
    #[inline]
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }

    /// Returns a surface and paint context fit for drawing a frame of `size`
    /// into `context`.
    ///
    /// On a cache hit the existing pair is returned untouched. Otherwise the
    /// old paint context and surface are released (in that order) and a new
    /// pair is built at `size` rounded up to whole pixels. On failure nothing
    /// is cached and the caller skips the frame.
    pub fn ensure(
        &mut self,
        context: Option<&dyn PlatformContext>,
        size: DeviceSize,
    ) -> Result<&mut CachedSurface, RenderError> {
        let context = context.ok_or(RenderError::ContextUnavailable)?;
        let size = SurfaceSize::from_device(size);

        let reason = match &self.entry {
            None => Some(RebuildReason::FirstUse),
            Some(_) if self.policy == CachePolicy::AlwaysRebuild => Some(RebuildReason::Policy),
            Some(e) if e.size() != size => Some(RebuildReason::SizeChanged { from: e.size(), to: size }),
            Some(e) if e.context_id() != context.id() => Some(RebuildReason::ContextChanged),
            Some(_) => None,
        };

        let entry = match (self.entry.take(), reason) {
            (Some(entry), None) => entry,
            (old, reason) => {
                if let Some(old) = old {
                    old.release();
                }
                let reason = reason.unwrap_or(RebuildReason::FirstUse);
                self.build(context, size, reason)?
            }
        };

        Ok(self.entry.insert(entry))
    }

    /// Drops the cached pair, if any.
    pub fn invalidate(&mut self) {
        if let Some(entry) = self.entry.take() {
            log::debug!("releasing cached {}x{} surface", entry.size().width, entry.size().height);
            entry.release();
        }
    }

    fn build(
        &mut self,
        context: &dyn PlatformContext,
        size: SurfaceSize,
        reason: RebuildReason,
    ) -> Result<CachedSurface, RenderError> {
        if size.is_empty() {
            return Err(RenderError::EmptySurface {
                width: size.width,
                height: size.height,
            });
        }

        log::debug!(
            "{}: building {}x{} surface ({reason})",
            self.backend.name(),
            size.width,
            size.height
        );

        let mut surface = self
            .backend
            .create_surface(context, size)
            .map_err(RenderError::SurfaceCreation)?;
        let paint = self
            .backend
            .create_paint_context(surface.as_mut())
            .map_err(RenderError::PaintContext)?;

        self.rebuilds += 1;
        Ok(CachedSurface { paint, surface })
    }
}

impl Drop for SurfaceCache {
    fn drop(&mut self) {
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::null::{NullBackend, NullContext, NullPaintContext, NullStats, Released};
    use std::rc::Rc;

    fn cache(policy: CachePolicy) -> (SurfaceCache, Rc<NullStats>) {
        let backend = NullBackend::new();
        let stats = backend.stats();
        (SurfaceCache::new(Box::new(backend), policy), stats)
    }

    fn serial(entry: &mut CachedSurface) -> u64 {
        entry
            .paint()
            .as_any()
            .downcast_ref::<NullPaintContext>()
            .unwrap()
            .surface_serial()
    }

    const SIZE: DeviceSize = DeviceSize { width: 500.0, height: 300.0 };

    #[test]
    fn same_context_and_size_is_a_hit() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        let ctx = NullContext::new(1);

        let first = serial(cache.ensure(Some(&ctx), SIZE).unwrap());
        let second = serial(cache.ensure(Some(&ctx), SIZE).unwrap());

        assert_eq!(first, second);
        assert_eq!(stats.surfaces_created(), 1);
        assert_eq!(stats.paint_contexts_created(), 1);
        assert!(stats.released().is_empty());
    }

    #[test]
    fn fractional_sizes_that_round_alike_still_hit() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        let ctx = NullContext::new(1);

        cache.ensure(Some(&ctx), DeviceSize::new(499.1, 300.0)).unwrap();
        let entry = cache.ensure(Some(&ctx), DeviceSize::new(499.9, 300.0)).unwrap();
        assert_eq!(entry.size(), SurfaceSize::new(500, 300));
        assert_eq!(stats.surfaces_created(), 1);
    }

    #[test]
    fn context_change_rebuilds_and_releases_once() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);

        let first = serial(cache.ensure(Some(&NullContext::new(1)), SIZE).unwrap());
        let second = serial(cache.ensure(Some(&NullContext::new(2)), SIZE).unwrap());

        assert_ne!(first, second);
        assert_eq!(stats.surfaces_created(), 2);
        assert_eq!(
            stats.released(),
            vec![Released::PaintContext(first), Released::Surface(first)]
        );

        drop(cache);
        assert_eq!(stats.surfaces_released(), 2);
        assert_eq!(stats.paint_contexts_released(), 2);
    }

    #[test]
    fn size_change_rebuilds() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        let ctx = NullContext::new(1);

        cache.ensure(Some(&ctx), SIZE).unwrap();
        let entry = cache.ensure(Some(&ctx), DeviceSize::new(500.0, 900.0)).unwrap();

        assert_eq!(entry.size(), SurfaceSize::new(500, 900));
        assert_eq!(stats.surfaces_created(), 2);
        assert_eq!(stats.surfaces_released(), 1);
    }

    #[test]
    fn always_rebuild_never_reuses() {
        let (mut cache, stats) = cache(CachePolicy::AlwaysRebuild);
        let ctx = NullContext::new(1);

        for _ in 0..3 {
            cache.ensure(Some(&ctx), SIZE).unwrap();
        }

        assert_eq!(stats.surfaces_created(), 3);
        assert_eq!(stats.surfaces_released(), 2);
        assert_eq!(cache.rebuilds(), 3);
    }

    #[test]
    fn missing_context_fails_without_touching_cache() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        cache.ensure(Some(&NullContext::new(1)), SIZE).unwrap();

        let err = cache.ensure(None, SIZE).err().unwrap();
        assert!(matches!(err, RenderError::ContextUnavailable));
        assert!(cache.is_cached());
        assert_eq!(stats.surfaces_created(), 1);
    }

    #[test]
    fn creation_failure_leaves_nothing_cached_and_retries() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        let ctx = NullContext::new(1);
        cache.ensure(Some(&ctx), SIZE).unwrap();

        stats.fail_surfaces(true);
        let err = cache.ensure(Some(&NullContext::new(2)), SIZE).err().unwrap();
        assert!(matches!(err, RenderError::SurfaceCreation(_)));
        let source = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("null surface creation disabled"));
        assert!(!cache.is_cached());
        assert_eq!(stats.surfaces_released(), 1);

        stats.fail_surfaces(false);
        assert!(cache.ensure(Some(&ctx), SIZE).is_ok());
        assert_eq!(stats.surfaces_created(), 2);
    }

    #[test]
    fn paint_context_failure_releases_fresh_surface() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        stats.fail_paint_contexts(true);

        let err = cache.ensure(Some(&NullContext::new(1)), SIZE).err().unwrap();
        assert!(matches!(err, RenderError::PaintContext(_)));
        assert!(!cache.is_cached());
        assert_eq!(stats.released(), vec![Released::Surface(1)]);
    }

    #[test]
    fn empty_size_is_rejected() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        let err = cache.ensure(Some(&NullContext::new(1)), DeviceSize::new(0.0, 10.0)).err().unwrap();
        assert!(matches!(err, RenderError::EmptySurface { width: 0, height: 10 }));
        assert_eq!(stats.surfaces_created(), 0);
    }

    #[test]
    fn invalidate_releases_paint_before_surface() {
        let (mut cache, stats) = cache(CachePolicy::Reuse);
        cache.ensure(Some(&NullContext::new(1)), SIZE).unwrap();
        cache.invalidate();
        cache.invalidate();

        assert_eq!(stats.released(), vec![Released::PaintContext(1), Released::Surface(1)]);
    }
}
