//! Alert handlers.

use std::sync::Arc;

use crate::ws::AlertEvent;

/// Handler receives every alert-worthy frame, in arrival order.
///
/// Called synchronously from the frame processing task, so it should return quickly.
/// It is never called while the manager's state is locked and may call back into
/// the manager.
pub trait AlertHandler: Send + Sync + 'static {
    /// callback executed for each alert
    fn on_alert(&self, alert: &AlertEvent);
}

impl<F> AlertHandler for F
where
    F: Fn(&AlertEvent) + Send + Sync + 'static,
{
    fn on_alert(&self, alert: &AlertEvent) {
        self(alert)
    }
}

/// Handler that ignores every alert.
#[derive(Debug, Copy, Clone, Default)]
pub struct Ignore;

impl AlertHandler for Ignore {
    fn on_alert(&self, _alert: &AlertEvent) {}
}

pub(crate) type SharedHandler = Arc<dyn AlertHandler>;
