/// Surface the session controller uses to leave the current view.
///
/// A hard navigation discards in-memory view state, which is what logout
/// wants after the credentials are gone.
pub trait Navigator: Send + Sync {
    fn hard_navigate(&self, route: &str);
}

/// Navigator for headless hosts that have no view to leave.
#[derive(Debug, Clone, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn hard_navigate(&self, route: &str) {
        tracing::debug!("[Navigator] hard navigation to {} ignored", route);
    }
}
