use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use jobscout_common::{AcceptedJob, OutreachAction};

use super::backend::NotifyBackend;

/// Incoming-webhook notification backend (Slack-compatible payload shape).
pub struct WebhookNotifier {
    webhook_url: String,
    http: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            http: reqwest::Client::new(),
        }
    }

    fn format_message(job: &AcceptedJob) -> String {
        let connects = job
            .outreach_records
            .iter()
            .filter(|r| r.action_taken == OutreachAction::ConnectSent)
            .count();
        let score = job
            .fit_score
            .map(|s| format!("{s:.1}"))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            ":tada: *Job match: {} @ {}*\n\
             *Location:* {}\n\
             *Fit score:* {}\n\
             *Applicants:* {}\n\
             *Connect requests sent:* {}\n\
             {}",
            job.detail.title,
            job.detail.company,
            job.detail.location,
            score,
            job.detail.applicant_count,
            connects,
            job.detail.canonical_url,
        )
    }
}

#[async_trait]
impl NotifyBackend for WebhookNotifier {
    async fn notify(&self, job: &AcceptedJob) -> anyhow::Result<bool> {
        let payload = json!({
            "text": Self::format_message(job),
            "unfurl_links": false,
        });

        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Notify webhook returned non-success");
            anyhow::bail!("Notify webhook returned {status}");
        }

        Ok(true)
    }
}
