use tracing::info;

pub const ISSUE_LIST_ROUTE: &str = "/issues/list";

/// Client-side router seam used after a successful submission.
pub trait Navigator: Send + Sync {
    fn push(&self, route: &str);
    /// Drops cached view data so the next render refetches it.
    fn refresh(&self);
}

/// Navigator for headless front ends: records transitions in the log only.
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn push(&self, route: &str) {
        info!(route, "navigation: push");
    }

    fn refresh(&self) {
        info!("navigation: refresh");
    }
}
