//! Posting detail extraction with split retry policy.
//!
//! Stale-element faults retry immediately (the panel usually re-renders
//! within the same page state); timeouts back off linearly. Exhausting
//! either budget skips the posting, never the role.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use jobscout_common::{PostingDetail, RawPostingDetail, ScoutError};

use crate::session::BoardSession;

const REMOTE_KEYWORDS: [&str; 4] = ["remote", "work from home", "wfh", "hybrid"];

pub struct PostingDetailExtractor {
    session: Arc<dyn BoardSession>,
    max_fault_retries: u32,
    max_timeout_retries: u32,
    backoff_base: Duration,
}

impl PostingDetailExtractor {
    /// `backoff_base` is the linear-backoff unit for timeout retries; the
    /// runner wires it from the pacing config.
    pub fn new(session: Arc<dyn BoardSession>, backoff_base: Duration) -> Self {
        Self {
            session,
            max_fault_retries: 3,
            max_timeout_retries: 3,
            backoff_base,
        }
    }

    /// Fetch and normalize one posting's detail.
    pub async fn fetch(&self, posting_id: &str) -> Result<PostingDetail, ScoutError> {
        let mut fault_attempts = 0;
        let mut timeout_attempts = 0;

        loop {
            match self.session.posting_detail(posting_id).await {
                Ok(raw) => return Ok(normalize(raw)),
                Err(e) if e.is_session_lost() => return Err(e),
                Err(ScoutError::ExtractionFault(reason)) => {
                    fault_attempts += 1;
                    if fault_attempts > self.max_fault_retries {
                        return Err(ScoutError::PostingSkipped(format!(
                            "{posting_id}: {} stale-element faults, last: {reason}",
                            fault_attempts
                        )));
                    }
                    debug!(posting_id, attempt = fault_attempts, reason, "Detail fault, retrying");
                }
                Err(ScoutError::ExtractionTimeout(reason)) => {
                    timeout_attempts += 1;
                    if timeout_attempts > self.max_timeout_retries {
                        return Err(ScoutError::PostingSkipped(format!(
                            "{posting_id}: {} timeouts, last: {reason}",
                            timeout_attempts
                        )));
                    }
                    let backoff = self.backoff_base * timeout_attempts;
                    warn!(
                        posting_id,
                        attempt = timeout_attempts,
                        backoff_secs = backoff.as_secs(),
                        reason,
                        "Detail timeout, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    return Err(ScoutError::PostingSkipped(format!("{posting_id}: {e}")));
                }
            }
        }
    }
}

/// Normalize a raw extraction into the immutable detail record.
///
/// Remote eligibility resolves from two sources: the explicit workplace-type
/// field always wins when present; the description keyword scan is the
/// fallback only.
fn normalize(raw: RawPostingDetail) -> PostingDetail {
    let remote_flag = match raw.workplace_type.as_deref().map(str::trim) {
        Some(workplace) if !workplace.is_empty() => {
            let lowered = workplace.to_lowercase();
            lowered.contains("remote") || lowered.contains("hybrid")
        }
        _ => {
            let lowered = raw.description.to_lowercase();
            REMOTE_KEYWORDS.iter().any(|k| lowered.contains(k))
        }
    };

    PostingDetail {
        posting_id: raw.posting_id,
        title: raw.title,
        company: raw.company,
        location: raw.location,
        description: raw.description,
        seniority: non_empty_or_unknown(raw.seniority),
        remote_flag,
        posted_time: non_empty_or_unknown(raw.posted_time),
        applicant_count: raw.applicant_count.unwrap_or(0),
        canonical_url: raw.canonical_url,
    }
}

fn non_empty_or_unknown(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "Unknown".to_string(),
    }
}
