use async_trait::async_trait;

use jobscout_common::AcceptedJob;

/// Pluggable operator notification backend.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    /// Deliver one accepted-job notification. Returns whether delivery
    /// happened; errors and `false` are logged by the caller, never fatal.
    async fn notify(&self, job: &AcceptedJob) -> anyhow::Result<bool>;
}
