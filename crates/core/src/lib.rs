//! GeoSelect Core Library
//!
//! Interactive area selection and feature visibility control for 3D
//! geospatial scenes, plus dispatch of selected areas to an air-quality
//! analysis service.
//!
//! # Overview
//!
//! The host application owns the 3D scene and feeds pointer events and
//! operator commands into a [`SelectionEngine`]. The library handles:
//!
//! - **Projection**: screen pixels to latitude/longitude via [`projector`],
//!   falling back to the WGS84 [`ellipsoid`] when the depth pick misses
//! - **Selection**: drag gestures into ordered rectangles via [`selection`]
//! - **Visibility**: hiding and restoring features via [`registry`] and the
//!   grid sampling [`picker`]
//! - **Analysis**: posting committed selections to the service via [`analysis`]
//!
//! # Quick Start
//!
//! ```ignore
//! use geoselect_core::{Config, FixtureScene, PointerEvent, ScreenPoint};
//!
//! geoselect_core::init();
//! let config = Config::load()?;
//! let scene = FixtureScene::load("scene.json")?;
//! let mut engine = geoselect_core::live_engine(scene, config)?;
//!
//! engine.enter_interactive();
//! engine.handle_pointer(PointerEvent::Down(ScreenPoint::new(100.0, 100.0)));
//! engine.handle_pointer(PointerEvent::Up(ScreenPoint::new(300.0, 250.0)));
//! ```
//!
//! # Module Structure
//!
//! - [`analysis`]: Request/response types, HTTP client and background dispatcher
//! - [`config`]: Configuration loading and management
//! - [`ellipsoid`]: Reference ellipsoid math
//! - [`error`]: Error types and result aliases
//! - [`geo`]: Geographic and screen coordinate types
//! - [`scene`]: The scene engine seam and a deterministic fixture scene
//! - [`session`]: Mode/operation state machine

pub mod analysis;
pub mod config;
pub mod ellipsoid;
pub mod error;
pub mod geo;
pub mod picker;
pub mod projector;
pub mod registry;
pub mod scene;
pub mod selection;
pub mod session;

// Re-export primary types for convenience
pub use analysis::{AnalysisClient, AnalysisDispatcher, AnalysisRequest, AnalysisResult, AnalysisSink, AnalysisState};
pub use config::Config;
pub use error::{AppError, Result};
pub use geo::{GeoPoint, GeoRectangle, PixelRect, ScreenPoint};
pub use registry::DeletedFeatureRegistry;
pub use scene::{FeatureId, FixtureScene, SceneEngine};
pub use session::{Method, Mode, Operation, Outcome, PointerEvent, SelectionEngine, SessionState};

/// Engine wired to the background HTTP dispatcher.
pub type LiveEngine<S> = SelectionEngine<S, AnalysisDispatcher>;

/// Builds an engine whose committed selections are posted to `config.analysis_url`.
///
/// # Errors
///
/// Returns an error if the configuration is rejected by [`SelectionEngine::new`].
pub fn live_engine<S: SceneEngine>(scene: S, config: Config) -> Result<LiveEngine<S>> {
    let dispatcher = AnalysisDispatcher::new(config.clone());
    SelectionEngine::new(scene, dispatcher, config)
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup. Loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, leaving stdout to reports
/// - RUST_LOG environment variable support
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Unknown(format!("Failed to initialize logging: {e}")))
}
