//! The application object and its winit event handler.

use anyhow::Context;
use hearth_platform::{
    ApplicationRecord, Environment, Event, EventTranslator, Residency, Window, WindowConfig,
};
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::config::AppConfig;
use crate::frame::FrameTimer;
use crate::phase::{Lifecycle, Phase};
use crate::renderer::{FrameStatus, Renderer};
use crate::scene::Uniforms;

/// Live resources while the application runs.
///
/// The renderer holds the surface created from the window, so it is
/// declared (and dropped) first.
struct RunningState {
    renderer: Renderer,
    window: Window,
}

/// A windowed application driving the frame loop.
pub struct Application {
    name: String,
    version: (u32, u32, u32),
    residency: Residency,
    config: AppConfig,
    env: Environment,
    lifecycle: Lifecycle,
    translator: EventTranslator,
    timer: FrameTimer,
    state: Option<RunningState>,
    startup_error: Option<anyhow::Error>,
}

impl Application {
    /// Create an application registered into `env` when it starts.
    pub fn new(
        env: Environment,
        name: impl Into<String>,
        version: (u32, u32, u32),
        residency: Residency,
    ) -> Self {
        let name = name.into();
        let config = AppConfig::new(name.clone());
        Self {
            timer: FrameTimer::new(config.target_fps),
            name,
            version,
            residency,
            config,
            env,
            lifecycle: Lifecycle::new(),
            translator: EventTranslator::new(),
            state: None,
            startup_error: None,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.timer = FrameTimer::new(config.target_fps);
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> (u32, u32, u32) {
        self.version
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Give the environment back once the application is done with it.
    pub fn into_environment(self) -> Environment {
        self.env
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Request shutdown (or cancel a request). Takes effect at the next frame boundary.
    pub fn quit(&mut self, quitting: bool) {
        self.lifecycle.quit(quitting);
    }

    /// Run the event loop until the application quits.
    ///
    /// Errors raised while initializing are returned after the loop exits.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new().context("creating event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop.run_app(self).context("event loop")?;

        match self.startup_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// React to a window event.
    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::WindowClose => {
                info!("Close requested");
                self.quit(true);
            }
            Event::WindowResize { width, height } => {
                if let Some(state) = &mut self.state {
                    if let Err(e) = state.renderer.resize(width, height) {
                        error!("Resize error: {e:#}");
                        self.lifecycle.quit(true);
                    } else {
                        info!("Resized to {}x{}", width, height);
                    }
                }
            }
            Event::WindowFocus(focused) => debug!(focused, "Focus changed"),
            Event::WindowMinimize => info!("Minimized, rendering paused"),
            Event::WindowMaximize => info!("Maximized"),
        }
    }

    /// Poll while frames are drawn; sleep until the next event while minimized.
    fn control_flow(&self) -> ControlFlow {
        if self.translator.is_minimized() {
            ControlFlow::Wait
        } else {
            ControlFlow::Poll
        }
    }

    /// Build the window and GPU chain in dependency order.
    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        info!("{} starting...", self.name);

        self.env.register_application(ApplicationRecord {
            name: self.name.clone(),
            version: self.version,
            residency: self.residency,
        })?;

        let window_config = WindowConfig {
            title: self.config.title.clone(),
            width: self.config.width,
            height: self.config.height,
            ..Default::default()
        };
        let window = match Window::new(event_loop, &window_config, &mut self.env) {
            Ok(window) => window,
            Err(e) => {
                self.env.unregister_application(&self.name);
                return Err(e.into());
            }
        };

        let renderer = match Renderer::new(&window, &self.config, &self.name, self.version) {
            Ok(renderer) => renderer,
            Err(e) => {
                window.close(&mut self.env);
                self.env.unregister_application(&self.name);
                return Err(e);
            }
        };

        self.state = Some(RunningState { renderer, window });
        self.timer.reset();
        self.lifecycle.start();
        info!("Application ready!");
        Ok(())
    }

    /// Run one pass of the frame cycle.
    fn frame(&mut self) {
        if !self.lifecycle.should_continue() || self.translator.is_minimized() {
            return;
        }
        let Some(state) = &mut self.state else { return };

        self.lifecycle.advance(); // Simulation
        let time = self.timer.tick();

        self.lifecycle.advance(); // Updating
        let uniforms = Uniforms::spinning(time.elapsed, state.renderer.extent());

        self.lifecycle.advance(); // Rendering
        match state.renderer.render_frame(&uniforms) {
            Ok(FrameStatus::Presented) => {}
            Ok(FrameStatus::Dropped) => debug!(frame = time.frame_number, "Frame dropped"),
            Err(e) => {
                error!("Render error: {e:#}");
                self.lifecycle.quit(true);
            }
        }

        self.lifecycle.advance(); // EventPolling
        self.timer.pace();
    }

    /// Tear everything down in reverse order of initialization.
    fn terminate(&mut self) {
        if self.lifecycle.phase() == Phase::Termination {
            return;
        }
        self.lifecycle.terminate();

        let Some(state) = self.state.take() else { return };

        self.timer.stats().log_summary(self.timer.frame_count());

        info!("Starting cleanup...");
        let RunningState { renderer, window } = state;
        drop(renderer);
        window.close(&mut self.env);
        self.env.unregister_application(&self.name);
        info!("Cleanup complete");
    }
}

impl ApplicationHandler for Application {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.lifecycle.phase() != Phase::Initialization {
            return;
        }

        if let Err(e) = self.initialize(event_loop) {
            error!("Failed to initialize application: {e:#}");
            self.startup_error = Some(e);
            self.lifecycle.terminate();
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::RedrawRequested = event {
            self.frame();
        } else {
            let maximized = self
                .state
                .as_ref()
                .is_some_and(|state| state.window.is_maximized());
            for translated in self.translator.translate(&event, maximized) {
                self.on_event(translated);
            }
        }

        if self.lifecycle.is_running() && !self.lifecycle.should_continue() {
            self.terminate();
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.lifecycle.is_running() && !self.lifecycle.should_continue() {
            self.terminate();
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(self.control_flow());
        if self.translator.is_minimized() {
            return;
        }
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_application_waits_in_initialization() {
        let app = Application::new(Environment::new(), "sandbox", (1, 2, 3), Residency::Exclusive);
        assert_eq!(app.phase(), Phase::Initialization);
        assert!(!app.is_running());
        assert_eq!(app.config().title, "sandbox");
        assert_eq!(app.version(), (1, 2, 3));
        assert!(app.environment().applications().is_empty());
    }

    #[test]
    fn quit_only_sets_the_flag() {
        let mut app = Application::new(Environment::new(), "sandbox", (0, 1, 0), Residency::Shared);
        app.quit(true);
        assert_eq!(app.phase(), Phase::Initialization);
        assert!(app.lifecycle.is_quitting());
        app.quit(false);
        assert!(!app.lifecycle.is_quitting());
    }

    #[test]
    fn close_event_requests_quit() {
        let mut app = Application::new(Environment::new(), "sandbox", (0, 1, 0), Residency::Shared);
        app.on_event(Event::WindowClose);
        assert!(app.lifecycle.is_quitting());
    }

    #[test]
    fn resize_without_renderer_is_ignored() {
        let mut app = Application::new(Environment::new(), "sandbox", (0, 1, 0), Residency::Shared);
        app.on_event(Event::WindowResize {
            width: 800,
            height: 600,
        });
        assert!(!app.lifecycle.is_quitting());
    }

    #[test]
    fn minimized_window_stops_polling() {
        use winit::dpi::PhysicalSize;

        let mut app = Application::new(Environment::new(), "sandbox", (0, 1, 0), Residency::Shared);
        assert_eq!(app.control_flow(), ControlFlow::Poll);

        let minimize = WindowEvent::Resized(PhysicalSize::new(0, 0));
        assert_eq!(app.translator.translate(&minimize, false), vec![Event::WindowMinimize]);
        assert_eq!(app.control_flow(), ControlFlow::Wait);

        let restore = WindowEvent::Resized(PhysicalSize::new(800, 600));
        app.translator.translate(&restore, false);
        assert_eq!(app.control_flow(), ControlFlow::Poll);
    }

    #[test]
    fn terminate_without_start_keeps_environment_clean() {
        let mut env = Environment::new();
        env.register_window("other");
        let mut app = Application::new(env, "sandbox", (0, 1, 0), Residency::Exclusive);
        app.terminate();
        assert_eq!(app.phase(), Phase::Termination);
        assert_eq!(app.into_environment().windows().len(), 1);
    }
}
