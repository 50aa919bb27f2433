//! Application configuration.

use std::path::PathBuf;

use hearth_gpu::BufferStrategy;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Enable vsync.
    pub vsync: bool,
    /// Number of swapchain images to rotate through.
    pub buffering: BufferStrategy,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Directory holding `vert.spv` and `frag.spv`.
    pub shader_dir: PathBuf,
    /// Target frames per second (None for unlimited).
    pub target_fps: Option<u32>,
    /// Color the frame is cleared to.
    pub clear_color: [f32; 4],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Hearth".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            buffering: BufferStrategy::Double,
            validation: cfg!(debug_assertions),
            shader_dir: PathBuf::from("./resources"),
            target_fps: None,
            clear_color: [0.05, 0.05, 0.08, 1.0],
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable vsync.
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    #[must_use]
    pub fn with_buffering(mut self, buffering: BufferStrategy) -> Self {
        self.buffering = buffering;
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    #[must_use]
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = dir.into();
        self
    }

    /// Set the target FPS.
    #[must_use]
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = Some(fps);
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub(crate) fn vertex_shader_path(&self) -> PathBuf {
        self.shader_dir.join("vert.spv")
    }

    pub(crate) fn fragment_shader_path(&self) -> PathBuf {
        self.shader_dir.join("frag.spv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults_match_the_sandbox() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.vsync);
        assert_eq!(config.buffering, BufferStrategy::Double);
        assert_eq!(config.target_fps, None);
        assert_eq!(config.vertex_shader_path(), Path::new("./resources/vert.spv"));
        assert_eq!(config.fragment_shader_path(), Path::new("./resources/frag.spv"));
    }

    #[test]
    fn builders_override_fields() {
        let config = AppConfig::new("demo")
            .with_size(640, 480)
            .with_vsync(false)
            .with_buffering(BufferStrategy::Triple)
            .with_shader_dir("/tmp/shaders")
            .with_target_fps(30);

        assert_eq!(config.title, "demo");
        assert_eq!((config.width, config.height), (640, 480));
        assert!(!config.vsync);
        assert_eq!(config.buffering, BufferStrategy::Triple);
        assert_eq!(config.target_fps, Some(30));
        assert_eq!(config.vertex_shader_path(), Path::new("/tmp/shaders/vert.spv"));
    }
}
