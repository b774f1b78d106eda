use async_trait::async_trait;

use jobscout_common::AcceptedJob;

use super::backend::NotifyBackend;

/// No-op backend for runs without a configured webhook.
pub struct NoopNotifier;

#[async_trait]
impl NotifyBackend for NoopNotifier {
    async fn notify(&self, _job: &AcceptedJob) -> anyhow::Result<bool> {
        Ok(false)
    }
}
