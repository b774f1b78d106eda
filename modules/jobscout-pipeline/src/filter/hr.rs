//! HR/staffing-firm detection.
//!
//! Fail-open: a lost or unparsable verdict accepts the posting. A false
//! rejection loses a legitimate job; a false accept only costs one pass
//! through a staffing firm's listing.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use jobscout_common::{Decision, PostingDetail, Stage};
use judge_client::Judge;

use crate::filter::verdict::{parse_verdict, Verdict};
use crate::util::{clip, short_reason};

const HR_SYSTEM_PROMPT: &str = "Determine if the company is a staffing, recruitment, HR, or temp \
agency firm rather than a direct employer. Return JSON only: \
{\"is_hr_company\": true|false, \"reason\": \"brief explanation\"}.";

#[derive(Debug, Deserialize)]
pub struct HrVerdict {
    pub is_hr_company: bool,
    #[serde(default)]
    pub reason: String,
}

pub struct HrDetector {
    judge: Arc<dyn Judge>,
    enabled: bool,
}

impl HrDetector {
    pub fn new(judge: Arc<dyn Judge>, enabled: bool) -> Self {
        Self { judge, enabled }
    }

    /// A reject from this stage means "staffing firm"; the chain appends the
    /// company to the blocklist so the next cycle short-circuits it without
    /// another judge call.
    pub async fn check(&self, detail: &PostingDetail) -> Decision {
        if !self.enabled {
            return Decision::accept(Stage::Hr, "HR filtering disabled");
        }

        let user_prompt = format!(
            "Company: {}\nContext: {}",
            detail.company,
            clip(&detail.description, 4_000)
        );

        let raw = match self.judge.invoke(HR_SYSTEM_PROMPT, &user_prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    company = detail.company.as_str(),
                    error = %e,
                    "HR judge unavailable, failing open"
                );
                return Decision::accept(Stage::Hr, "Judge unavailable (fail-open)");
            }
        };

        match parse_verdict::<HrVerdict>(&raw) {
            Verdict::Valid(v) if v.is_hr_company => {
                info!(
                    company = detail.company.as_str(),
                    reason = short_reason(&v.reason).as_str(),
                    "Company flagged as HR/staffing"
                );
                Decision::reject(Stage::Hr, short_reason(&v.reason))
            }
            Verdict::Valid(v) => Decision::accept(Stage::Hr, short_reason(&v.reason)),
            Verdict::Malformed { raw } => {
                warn!(
                    company = detail.company.as_str(),
                    raw = clip(&raw, 200),
                    "Unparsable HR verdict, failing open"
                );
                Decision::accept(Stage::Hr, "Unparsable verdict (fail-open)")
            }
        }
    }
}
