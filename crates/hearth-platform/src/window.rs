//! Native window wrapper.

use std::sync::Arc;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;

use crate::environment::{Environment, WindowKey};
use crate::{PlatformError, Result, WindowConfig};

/// A window registered with an [`Environment`].
///
/// Exposes raw display/window handles for surface creation.
pub struct Window {
    inner: Arc<winit::window::Window>,
    key: WindowKey,
}

impl Window {
    /// Open a window and register it with `env`.
    pub fn new(
        event_loop: &ActiveEventLoop,
        config: &WindowConfig,
        env: &mut Environment,
    ) -> Result<Self> {
        let attributes = winit::window::Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let inner = event_loop
            .create_window(attributes)
            .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;
        let key = env.register_window(&config.title);

        tracing::info!(title = %config.title, width = config.width, height = config.height, "Window created");

        Ok(Self {
            inner: Arc::new(inner),
            key,
        })
    }

    /// Unregister the window from `env`. The native window closes on drop.
    pub fn close(self, env: &mut Environment) {
        env.unregister_window(self.key);
    }

    pub fn key(&self) -> WindowKey {
        self.key
    }

    pub fn id(&self) -> WindowId {
        self.inner.id()
    }

    /// Current drawable size in physical pixels.
    pub fn inner_size(&self) -> (u32, u32) {
        let size = self.inner.inner_size();
        (size.width, size.height)
    }

    pub fn is_maximized(&self) -> bool {
        self.inner.is_maximized()
    }

    pub fn request_redraw(&self) {
        self.inner.request_redraw();
    }

    /// Underlying winit window.
    pub fn raw(&self) -> &Arc<winit::window::Window> {
        &self.inner
    }
}

impl HasWindowHandle for Window {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        self.inner.window_handle()
    }
}

impl HasDisplayHandle for Window {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        self.inner.display_handle()
    }
}
