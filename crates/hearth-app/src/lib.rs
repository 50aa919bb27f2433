//! Application framework for Hearth.
//!
//! This crate ties the platform and GPU layers together:
//! - Window creation and event translation
//! - Building the GPU resource chain in dependency order
//! - The per-frame update, record, submit and present cycle
//! - Swapchain rebuilds on resize or staleness
//! - Teardown in reverse order of initialization
//!
//! # Example
//!
//! ```no_run
//! use hearth_app::{run_app, AppConfig, Application, Environment, Residency};
//!
//! fn main() -> anyhow::Result<()> {
//!     let app = Application::new(Environment::new(), "demo", (0, 1, 0), Residency::Exclusive)
//!         .with_config(AppConfig::new("demo").with_vsync(false));
//!     run_app(app)
//! }
//! ```

mod application;
mod config;
mod frame;
mod phase;
mod renderer;
mod runner;
pub mod scene;

pub use application::Application;
pub use config::AppConfig;
pub use frame::{FpsStats, FrameTime, FrameTimer};
pub use phase::{Lifecycle, Phase};
pub use renderer::{FrameStatus, Renderer};
pub use runner::{init_logging, run_app};

// Re-export commonly used types for convenience
pub use hearth_gpu::BufferStrategy;
pub use hearth_platform::{Environment, Event, Residency};
