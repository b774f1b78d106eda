//! Two-pass fit scoring against the candidate profile.
//!
//! Pass 1 runs on the baseline model. A pass-1 score at or above the rerank
//! trigger re-invokes a stronger model on the same inputs, and the pass-2
//! score is authoritative whenever pass 2 runs. Fail-open on judge failure
//! or unparsable output at pass 1; a broken pass 2 keeps the pass-1 score.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use jobscout_common::{Decision, Outcome, PostingDetail, Stage};
use judge_client::Judge;

use crate::filter::verdict::{parse_verdict, Verdict};
use crate::util::{clip, short_reason};

const FIT_SYSTEM_PROMPT: &str = "You are a concise matcher. Score 0-10 (float) how well the \
candidate fits the job. Consider resume and preferences. Return JSON only: \
{\"score\": number, \"reason\": string}.";

#[derive(Debug, Deserialize)]
pub struct FitVerdict {
    pub score: f64,
    #[serde(default)]
    pub reason: String,
}

pub struct FitScorer {
    base_judge: Arc<dyn Judge>,
    rerank_judge: Arc<dyn Judge>,
    resume_text: String,
    preferences_text: String,
    match_threshold: f64,
    rerank_trigger: f64,
}

impl FitScorer {
    pub fn new(
        base_judge: Arc<dyn Judge>,
        rerank_judge: Arc<dyn Judge>,
        resume_text: String,
        preferences_text: String,
        match_threshold: f64,
        rerank_trigger: f64,
    ) -> Self {
        Self {
            base_judge,
            rerank_judge,
            resume_text,
            preferences_text,
            match_threshold,
            rerank_trigger,
        }
    }

    pub async fn score(&self, detail: &PostingDetail) -> Decision {
        let user_prompt = self.build_prompt(detail);

        let first = match self.invoke(&self.base_judge, &user_prompt).await {
            Ok(verdict) => verdict,
            Err(decision) => return decision,
        };

        let (final_score, reason, reranked) = if first.score >= self.rerank_trigger {
            match self.invoke(&self.rerank_judge, &user_prompt).await {
                Ok(second) => (second.score, second.reason, true),
                Err(_) => {
                    // Pass 2 broke; pass 1 stands rather than failing open
                    // with no score at all.
                    warn!(
                        posting_id = detail.posting_id.as_str(),
                        "Rerank pass failed, keeping pass-1 score"
                    );
                    (first.score, first.reason, false)
                }
            }
        } else {
            (first.score, first.reason, false)
        };

        if reranked {
            info!(
                posting_id = detail.posting_id.as_str(),
                first_score = first.score,
                final_score,
                threshold = self.match_threshold,
                "Fit score reranked"
            );
        } else {
            info!(
                posting_id = detail.posting_id.as_str(),
                score = final_score,
                threshold = self.match_threshold,
                "Fit score"
            );
        }

        let outcome = if final_score >= self.match_threshold {
            Outcome::Accept
        } else {
            Outcome::Reject
        };
        Decision {
            stage: Stage::Fit,
            outcome,
            reason: short_reason(&reason),
            score: Some(final_score),
        }
    }

    /// One judge pass. `Err` carries the ready-made fail-open decision.
    async fn invoke(
        &self,
        judge: &Arc<dyn Judge>,
        user_prompt: &str,
    ) -> Result<FitVerdict, Decision> {
        let raw = match judge.invoke(FIT_SYSTEM_PROMPT, user_prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(model = judge.model(), error = %e, "Fit judge unavailable, failing open");
                return Err(
                    Decision::accept(Stage::Fit, "Judge unavailable (fail-open)").with_score(None),
                );
            }
        };
        match parse_verdict::<FitVerdict>(&raw) {
            Verdict::Valid(v) => Ok(v),
            Verdict::Malformed { raw } => {
                warn!(
                    model = judge.model(),
                    raw = clip(&raw, 200),
                    "Unparsable fit verdict, failing open"
                );
                Err(Decision::accept(Stage::Fit, "Unparsable verdict (fail-open)").with_score(None))
            }
        }
    }

    fn build_prompt(&self, detail: &PostingDetail) -> String {
        format!(
            "Resume:\n{}\n\nPreferences:\n{}\n\n---\n\nJob Title: {}\nCompany: {}\nLocation: {}\nSeniority: {}\nDescription: {}",
            self.resume_text,
            self.preferences_text,
            detail.title,
            detail.company,
            detail.location,
            detail.seniority,
            clip(&detail.description, 4_000)
        )
    }
}
