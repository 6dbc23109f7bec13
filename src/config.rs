//! View configuration.
//!
//! `ViewConfig` holds everything a [`CanvasView`](crate::view::CanvasView)
//! needs before it is bound to a document: the layout width of a page, the
//! stroke style pushed into every newly bound canvas, the surface cache
//! policy and the initial zoom and backing scale.
//!
//! `ViewConfig` provides defaults via [`Default`], a fluent
//! [`ViewConfig::builder()`] with validation, and JSON loading through
//! [`ViewConfig::from_json_str`]. Missing JSON fields take their default.
//!
//! # Examples
//!
//! ```rust
//! use inkview::config::ViewConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ViewConfig::builder()
//!     .page_width(800.0)
//!     .magnification(2.0)
//!     .build()?;
//! assert_eq!(cfg.page_width, 800.0);
//!
//! let cfg = ViewConfig::from_json_str(r#"{ "cache_policy": "always_rebuild" }"#)?;
//! assert_eq!(cfg.page_width, 500.0);
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `page_width`: layout width of the view in view units (default: 500).
//! - `default_stroke`: style for new strokes (default: opaque black, 0.8 view units thick).
//! - `cache_policy`: see [`CachePolicy`] (default: `Reuse`).
//! - `magnification`: zoom passed to the engine's draw call (default: 1, must be >= 0).
//! - `scale_factor`: device pixels per view unit (default: 1, must be > 0).
//! - `log_level`: level used by [`crate::logging::init`] (default: `Warn`).

use crate::engine::StrokeStyle;
use crate::errors::ConfigError;
use crate::render::CachePolicy;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const DEFAULT_PAGE_WIDTH: f64 = 500.0;

/// Default pen thickness in view units at the default page width.
const DEFAULT_PEN_WIDTH: f64 = 0.8;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", log::LevelFilter::from(*self))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub page_width: f64,
    pub default_stroke: StrokeStyle,
    pub cache_policy: CachePolicy,
    pub magnification: f64,
    pub scale_factor: f64,
    pub log_level: LogLevel,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_width: DEFAULT_PAGE_WIDTH,
            default_stroke: StrokeStyle::black((DEFAULT_PEN_WIDTH / DEFAULT_PAGE_WIDTH) as f32),
            cache_policy: CachePolicy::default(),
            magnification: 1.0,
            scale_factor: 1.0,
            log_level: LogLevel::default(),
        }
    }
}

impl ViewConfig {
    pub fn builder() -> ViewConfigBuilder {
        ViewConfigBuilder::default()
    }

    /// Parses a JSON document and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ViewConfig = serde_json::from_str(json)?;
        validate(&config)?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewConfigBuilder {
    inner: ViewConfig,
}

impl ViewConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ViewConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn page_width(self, width: f64) -> Self { self.map(|c| c.page_width = width) }
    pub fn default_stroke(self, style: StrokeStyle) -> Self { self.map(|c| c.default_stroke = style) }
    pub fn cache_policy(self, policy: CachePolicy) -> Self { self.map(|c| c.cache_policy = policy) }
    pub fn magnification(self, m: f64) -> Self { self.map(|c| c.magnification = m) }
    pub fn scale_factor(self, factor: f64) -> Self { self.map(|c| c.scale_factor = factor) }
    pub fn log_level(self, level: LogLevel) -> Self { self.map(|c| c.log_level = level) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ViewConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<ViewConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

fn validate(c: &ViewConfig) -> Result<(), ConfigError> {
    if !(c.page_width.is_finite() && c.page_width > 0.0) {
        return Err(ConfigError::InvalidPageWidth(c.page_width));
    }

    let s = &c.default_stroke;
    if !(s.thickness.is_finite() && s.thickness > 0.0) {
        return Err(ConfigError::InvalidThickness(s.thickness));
    }
    for (channel, value) in [('r', s.r), ('g', s.g), ('b', s.b), ('a', s.a)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::InvalidColor { channel, value });
        }
    }

    if !(c.magnification.is_finite() && c.magnification >= 0.0) {
        return Err(ConfigError::InvalidMagnification(c.magnification));
    }
    if !(c.scale_factor.is_finite() && c.scale_factor > 0.0) {
        return Err(ConfigError::InvalidScaleFactor(c.scale_factor));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_500_unit_page() {
        let cfg = ViewConfig::default();
        assert_eq!(cfg.page_width, 500.0);
        assert_eq!(cfg.default_stroke, StrokeStyle::black((0.8 / 500.0) as f32));
        assert_eq!(cfg.cache_policy, CachePolicy::Reuse);
        assert!(ViewConfig::builder().build().is_ok());
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(matches!(
            ViewConfig::builder().page_width(0.0).build(),
            Err(ConfigError::InvalidPageWidth(_))
        ));
        assert!(matches!(
            ViewConfig::builder().magnification(-1.0).build(),
            Err(ConfigError::InvalidMagnification(_))
        ));
        assert!(matches!(
            ViewConfig::builder().scale_factor(f64::NAN).build(),
            Err(ConfigError::InvalidScaleFactor(_))
        ));
        assert!(matches!(
            ViewConfig::builder()
                .with(|c| c.default_stroke.g = 1.5)
                .build(),
            Err(ConfigError::InvalidColor { channel: 'g', .. })
        ));
        assert!(matches!(
            ViewConfig::builder().default_stroke(StrokeStyle::black(0.0)).build(),
            Err(ConfigError::InvalidThickness(_))
        ));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = ViewConfig::from_json_str(r#"{ "page_width": 320, "log_level": "debug" }"#).unwrap();
        assert_eq!(cfg.page_width, 320.0);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.magnification, 1.0);
    }

    #[test]
    fn json_is_validated() {
        assert!(matches!(
            ViewConfig::from_json_str(r#"{ "page_width": -3 }"#),
            Err(ConfigError::InvalidPageWidth(_))
        ));
        assert!(matches!(ViewConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn json_round_trips() {
        let cfg = ViewConfig::builder().cache_policy(CachePolicy::AlwaysRebuild).build().unwrap();
        let back = ViewConfig::from_json_str(&cfg.to_json_string().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }
}
