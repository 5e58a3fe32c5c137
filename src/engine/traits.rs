/// Where live player counts come from.
#[async_trait::async_trait]
pub trait PlayerCountSource: Send + Sync {
    /// Current player count for `app_id`, or `None` if it could not be obtained.
    /// Implementations never fail; every error collapses to `None`.
    async fn fetch_current_count(&self, app_id: u64) -> Option<u64>;
}
