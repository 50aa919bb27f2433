//! Window events delivered to applications.

use winit::event::WindowEvent;

/// Window lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    WindowClose,
    WindowResize { width: u32, height: u32 },
    WindowFocus(bool),
    WindowMinimize,
    WindowMaximize,
}

/// Turns raw winit window events into [`Event`]s.
///
/// Winit reports minimize and maximize only as size changes, so the
/// translator remembers the previous state to emit them once per transition.
#[derive(Debug, Default)]
pub struct EventTranslator {
    minimized: bool,
    maximized: bool,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate `event`. `maximized` is the window's current maximize state.
    pub fn translate(&mut self, event: &WindowEvent, maximized: bool) -> Vec<Event> {
        match event {
            WindowEvent::CloseRequested => vec![Event::WindowClose],
            WindowEvent::Focused(focused) => vec![Event::WindowFocus(*focused)],
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    self.maximized = false;
                    if self.minimized {
                        return Vec::new();
                    }
                    self.minimized = true;
                    return vec![Event::WindowMinimize];
                }

                self.minimized = false;
                let mut events = Vec::with_capacity(2);
                if maximized && !self.maximized {
                    events.push(Event::WindowMaximize);
                }
                self.maximized = maximized;
                events.push(Event::WindowResize {
                    width: size.width,
                    height: size.height,
                });
                events
            }
            _ => Vec::new(),
        }
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    fn resized(width: u32, height: u32) -> WindowEvent {
        WindowEvent::Resized(PhysicalSize::new(width, height))
    }

    #[test]
    fn close_and_focus_pass_through() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(&WindowEvent::CloseRequested, false),
            vec![Event::WindowClose]
        );
        assert_eq!(
            translator.translate(&WindowEvent::Focused(false), false),
            vec![Event::WindowFocus(false)]
        );
    }

    #[test]
    fn zero_size_minimizes_once() {
        let mut translator = EventTranslator::new();
        assert_eq!(translator.translate(&resized(0, 0), false), vec![Event::WindowMinimize]);
        assert!(translator.is_minimized());
        assert!(translator.translate(&resized(0, 0), false).is_empty());

        assert_eq!(
            translator.translate(&resized(800, 600), false),
            vec![Event::WindowResize {
                width: 800,
                height: 600
            }]
        );
        assert!(!translator.is_minimized());
    }

    #[test]
    fn maximize_is_reported_on_transition() {
        let mut translator = EventTranslator::new();
        assert_eq!(
            translator.translate(&resized(1920, 1080), true),
            vec![
                Event::WindowMaximize,
                Event::WindowResize {
                    width: 1920,
                    height: 1080
                }
            ]
        );
        assert_eq!(translator.translate(&resized(1920, 1080), true).len(), 1);
    }

    #[test]
    fn unrelated_events_are_dropped() {
        let mut translator = EventTranslator::new();
        assert!(translator
            .translate(&WindowEvent::RedrawRequested, false)
            .is_empty());
    }
}
