//! Process-wide registry of running applications and open windows.

use crate::{PlatformError, Result};

/// Whether more than one instance of an application may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Residency {
    /// Only one instance may be registered.
    #[default]
    Exclusive,
    /// Any number of instances may be registered.
    Shared,
}

/// A registered application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub name: String,
    pub version: (u32, u32, u32),
    pub residency: Residency,
}

/// Opaque key for a registered window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowKey(u64);

/// A registered window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    pub key: WindowKey,
    pub title: String,
}

/// Owned registry passed to applications and windows.
#[derive(Debug, Default)]
pub struct Environment {
    applications: Vec<ApplicationRecord>,
    windows: Vec<WindowRecord>,
    next_window: u64,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application.
    ///
    /// Fails if an instance with the same name is running and either side
    /// is [`Residency::Exclusive`].
    pub fn register_application(&mut self, record: ApplicationRecord) -> Result<()> {
        let conflict = self.applications.iter().any(|running| {
            running.name == record.name
                && (running.residency == Residency::Exclusive
                    || record.residency == Residency::Exclusive)
        });
        if conflict {
            return Err(PlatformError::AlreadyRunning(record.name));
        }

        tracing::debug!(name = %record.name, residency = ?record.residency, "Application registered");
        self.applications.push(record);
        Ok(())
    }

    /// Remove one instance of `name`. Returns whether one was registered.
    pub fn unregister_application(&mut self, name: &str) -> bool {
        match self.applications.iter().position(|a| a.name == name) {
            Some(index) => {
                self.applications.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.applications.iter().any(|a| a.name == name)
    }

    pub fn applications(&self) -> &[ApplicationRecord] {
        &self.applications
    }

    /// Record a new window and hand back its key.
    pub fn register_window(&mut self, title: impl Into<String>) -> WindowKey {
        let key = WindowKey(self.next_window);
        self.next_window += 1;
        self.windows.push(WindowRecord {
            key,
            title: title.into(),
        });
        key
    }

    /// Forget a window. Returns whether it was registered.
    pub fn unregister_window(&mut self, key: WindowKey) -> bool {
        let before = self.windows.len();
        self.windows.retain(|w| w.key != key);
        self.windows.len() != before
    }

    pub fn windows(&self) -> &[WindowRecord] {
        &self.windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, residency: Residency) -> ApplicationRecord {
        ApplicationRecord {
            name: name.to_string(),
            version: (1, 0, 0),
            residency,
        }
    }

    #[test]
    fn exclusive_application_registers_once() {
        let mut env = Environment::new();
        env.register_application(app("sandbox", Residency::Exclusive))
            .unwrap();

        let err = env
            .register_application(app("sandbox", Residency::Exclusive))
            .unwrap_err();
        assert!(matches!(err, PlatformError::AlreadyRunning(name) if name == "sandbox"));

        // A shared instance cannot join an exclusive one either.
        assert!(env
            .register_application(app("sandbox", Residency::Shared))
            .is_err());
        assert_eq!(env.applications().len(), 1);
    }

    #[test]
    fn shared_applications_stack() {
        let mut env = Environment::new();
        env.register_application(app("viewer", Residency::Shared))
            .unwrap();
        env.register_application(app("viewer", Residency::Shared))
            .unwrap();
        assert_eq!(env.applications().len(), 2);

        assert!(env.unregister_application("viewer"));
        assert!(env.is_running("viewer"));
        assert!(env.unregister_application("viewer"));
        assert!(!env.is_running("viewer"));
        assert!(!env.unregister_application("viewer"));
    }

    #[test]
    fn exclusive_can_register_again_after_leaving() {
        let mut env = Environment::new();
        env.register_application(app("sandbox", Residency::Exclusive))
            .unwrap();
        env.unregister_application("sandbox");
        assert!(env
            .register_application(app("sandbox", Residency::Exclusive))
            .is_ok());
    }

    #[test]
    fn window_keys_are_unique() {
        let mut env = Environment::new();
        let a = env.register_window("main");
        let b = env.register_window("tools");
        assert_ne!(a, b);
        assert_eq!(env.windows().len(), 2);

        assert!(env.unregister_window(a));
        assert!(!env.unregister_window(a));
        assert_eq!(env.windows()[0].key, b);

        let c = env.register_window("main");
        assert_ne!(c, a);
    }
}
