pub mod backend;

/// Rendering backends for the canvas view.
pub mod backends {
    /// Cairo rendering backend
    #[cfg(feature = "backend_cairo")]
    pub mod cairo;
    pub mod null;
}

mod surface_cache;
pub use surface_cache::*;
