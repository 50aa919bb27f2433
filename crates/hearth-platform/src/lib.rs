//! Platform layer for the Hearth framework.
//!
//! Provides window creation via winit, translation of window events into
//! [`Event`]s, and the process-wide [`Environment`] registry.

mod environment;
mod event;
mod window;

use thiserror::Error;

pub use environment::{ApplicationRecord, Environment, Residency, WindowKey, WindowRecord};
pub use event::{Event, EventTranslator};
pub use window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Application {0} is already running")]
    AlreadyRunning(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Hearth".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_their_cause() {
        let errors = [
            PlatformError::WindowCreation("no display".into()),
            PlatformError::AlreadyRunning("sandbox".into()),
        ];
        for error in errors {
            let message = error.to_string();
            match error {
                PlatformError::WindowCreation(_) => assert!(message.contains("no display")),
                PlatformError::AlreadyRunning(_) => assert!(message.contains("sandbox")),
            }
        }
    }

    #[test]
    fn default_window_is_resizable_720p() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.resizable);
    }
}
