//! The ordered accept/reject gates for one posting.
//!
//! Blocklist → HRDetector → SponsorshipGate → FitScorer. Evaluation stops at
//! the first reject, but every evaluated stage lands in the trail for audit.
//! Judge faults never escape this module: each stage resolves them with its
//! own fail-open default.

pub mod fit;
pub mod hr;
pub mod sponsorship;
pub mod verdict;

use std::sync::Arc;

use tracing::{info, warn};

use jobscout_common::{Decision, DecisionTrail, Outcome, PostingDetail, Stage};

use crate::blocklist::Blocklist;
use fit::FitScorer;
use hr::HrDetector;
use sponsorship::SponsorshipGate;

pub struct FilterChain {
    blocklist: Arc<Blocklist>,
    hr: HrDetector,
    sponsorship: SponsorshipGate,
    fit: FitScorer,
}

impl FilterChain {
    pub fn new(
        blocklist: Arc<Blocklist>,
        hr: HrDetector,
        sponsorship: SponsorshipGate,
        fit: FitScorer,
    ) -> Self {
        Self {
            blocklist,
            hr,
            sponsorship,
            fit,
        }
    }

    /// Evaluate one posting. Infallible by design: stage-local faults are
    /// already folded into decisions, and a failed blocklist persist only
    /// loses the shortcut, not the reject.
    pub async fn evaluate(
        &self,
        detail: &PostingDetail,
        requires_sponsorship: bool,
    ) -> DecisionTrail {
        let mut trail = DecisionTrail::default();

        if let Some(entry) = self.blocklist.is_blocked(&detail.company) {
            info!(
                posting_id = detail.posting_id.as_str(),
                company = detail.company.as_str(),
                entry = entry.as_str(),
                "Rejected via blocklist; no judges invoked"
            );
            trail.push(Decision::reject(
                Stage::Blocklist,
                format!("Matched blocklist entry \"{entry}\""),
            ));
            return trail;
        }
        trail.push(Decision::accept(Stage::Blocklist, "Not on blocklist"));

        let hr_decision = self.hr.check(detail).await;
        let hr_rejected = hr_decision.outcome == Outcome::Reject;
        trail.push(hr_decision);
        if hr_rejected {
            // Auto-growth: the next cycle rejects this company at stage 1.
            if let Err(e) = self.blocklist.add(&detail.company).await {
                warn!(
                    company = detail.company.as_str(),
                    error = %e,
                    "Failed to persist auto-blocklist entry"
                );
            }
            return trail;
        }

        let sponsorship_decision = self.sponsorship.check(detail, requires_sponsorship).await;
        let sponsorship_rejected = sponsorship_decision.outcome == Outcome::Reject;
        trail.push(sponsorship_decision);
        if sponsorship_rejected {
            return trail;
        }

        trail.push(self.fit.score(detail).await);
        trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JobStore;
    use crate::testing::{detail, MemoryStore, ScriptedJudge};

    /// Chain with independently scriptable judges per stage.
    struct Fixture {
        store: Arc<MemoryStore>,
        hr_judge: Arc<ScriptedJudge>,
        sponsor_judge: Arc<ScriptedJudge>,
        base_judge: Arc<ScriptedJudge>,
        rerank_judge: Arc<ScriptedJudge>,
        chain: FilterChain,
    }

    async fn fixture(blocked: &[&str], threshold: f64, trigger: f64) -> Fixture {
        let store = Arc::new(MemoryStore::with_blocklist(blocked));
        let blocklist = Arc::new(
            Blocklist::load(Arc::clone(&store) as Arc<dyn JobStore>)
                .await
                .unwrap(),
        );
        let hr_judge = Arc::new(ScriptedJudge::new());
        let sponsor_judge = Arc::new(ScriptedJudge::new());
        let base_judge = Arc::new(ScriptedJudge::new());
        let rerank_judge = Arc::new(ScriptedJudge::new());

        let chain = FilterChain::new(
            Arc::clone(&blocklist),
            HrDetector::new(Arc::clone(&hr_judge) as Arc<dyn judge_client::Judge>, true),
            SponsorshipGate::new(
                Arc::clone(&sponsor_judge) as Arc<dyn judge_client::Judge>,
                true,
                true,
                0,
                true,
            ),
            FitScorer::new(
                Arc::clone(&base_judge) as Arc<dyn judge_client::Judge>,
                Arc::clone(&rerank_judge) as Arc<dyn judge_client::Judge>,
                "resume text".to_string(),
                "preferences text".to_string(),
                threshold,
                trigger,
            ),
        );
        Fixture {
            store,
            hr_judge,
            sponsor_judge,
            base_judge,
            rerank_judge,
            chain,
        }
    }

    fn judge_calls(f: &Fixture) -> usize {
        f.hr_judge.call_count()
            + f.sponsor_judge.call_count()
            + f.base_judge.call_count()
            + f.rerank_judge.call_count()
    }

    #[tokio::test]
    async fn blocklisted_company_rejects_with_zero_judge_calls() {
        // Scenario B.
        let f = fixture(&["Lensa"], 8.0, 9.0).await;
        let trail = f
            .chain
            .evaluate(&detail("1", "Lensa", "anything"), true)
            .await;

        assert_eq!(trail.len(), 1);
        assert_eq!(trail.decisions[0].stage, Stage::Blocklist);
        assert_eq!(trail.decisions[0].outcome, Outcome::Reject);
        assert_eq!(judge_calls(&f), 0);
    }

    #[tokio::test]
    async fn hr_verdict_rejects_and_grows_blocklist() {
        // Scenario C.
        let f = fixture(&[], 8.0, 9.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": true, "reason": "Recruiting agency"}"#);

        let trail = f
            .chain
            .evaluate(&detail("2", "Staffing Inc", "great job"), true)
            .await;

        assert_eq!(trail.len(), 2);
        assert_eq!(trail.last().unwrap().stage, Stage::Hr);
        assert_eq!(trail.last().unwrap().outcome, Outcome::Reject);
        assert_eq!(f.store.blocklist_appends(), vec!["Staffing Inc".to_string()]);
        assert_eq!(f.sponsor_judge.call_count(), 0);
        assert_eq!(f.base_judge.call_count(), 0);

        // Next cycle: the blocklist stage short-circuits without a judge.
        let trail = f
            .chain
            .evaluate(&detail("3", "Staffing Inc", "great job"), true)
            .await;
        assert_eq!(trail.len(), 1);
        assert_eq!(f.hr_judge.call_count(), 1);
    }

    #[tokio::test]
    async fn malformed_hr_verdict_fails_open_and_leaves_blocklist_alone() {
        let f = fixture(&[], 8.0, 9.0).await;
        f.hr_judge.respond("total garbage, not json");
        // No sponsorship language in the description: the gate accepts
        // locally, proving the posting got past the HR stage.
        f.base_judge.respond(r#"{"score": 3.0, "reason": "Poor match"}"#);

        let trail = f
            .chain
            .evaluate(&detail("4", "Acme Corp", "a plain job description"), true)
            .await;

        assert!(trail.len() >= 3, "posting must reach the sponsorship stage");
        assert_eq!(trail.decisions[1].stage, Stage::Hr);
        assert_eq!(trail.decisions[1].outcome, Outcome::Accept);
        assert!(f.store.blocklist_appends().is_empty());
    }

    #[tokio::test]
    async fn scenario_a_no_rerank_below_trigger() {
        // Trigger 9: a pass-1 score of 8.5 stands on its own.
        let f = fixture(&[], 8.0, 9.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
        f.sponsor_judge
            .respond(r#"{"accepts_sponsorship": true, "reason": "Sponsorship offered"}"#);
        f.base_judge
            .respond(r#"{"score": 8.5, "reason": "Strong overlap"}"#);

        let trail = f
            .chain
            .evaluate(
                &detail("5", "Acme Corp", "visa sponsorship available"),
                true,
            )
            .await;

        assert!(trail.accepted());
        assert_eq!(trail.final_score(), Some(8.5));
        assert_eq!(f.rerank_judge.call_count(), 0);
    }

    #[tokio::test]
    async fn scenario_a_rerank_score_is_authoritative() {
        // Trigger 8: 8.5 trips the rerank and pass 2 decides.
        let f = fixture(&[], 8.0, 8.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
        f.sponsor_judge
            .respond(r#"{"accepts_sponsorship": true, "reason": "Sponsorship offered"}"#);
        f.base_judge
            .respond(r#"{"score": 8.5, "reason": "Strong overlap"}"#);
        f.rerank_judge
            .respond(r#"{"score": 7.0, "reason": "Weaker on a second look"}"#);

        let trail = f
            .chain
            .evaluate(
                &detail("6", "Acme Corp", "visa sponsorship available"),
                true,
            )
            .await;

        assert_eq!(f.rerank_judge.call_count(), 1);
        assert_eq!(trail.final_score(), Some(7.0));
        assert!(!trail.accepted(), "authoritative rerank score is below threshold");
    }

    #[tokio::test]
    async fn rerank_never_runs_below_trigger() {
        let f = fixture(&[], 8.0, 8.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
        f.base_judge
            .respond(r#"{"score": 7.9, "reason": "Close but short"}"#);

        let trail = f
            .chain
            .evaluate(&detail("7", "Acme Corp", "a plain job description"), true)
            .await;

        assert_eq!(f.rerank_judge.call_count(), 0);
        assert_eq!(trail.final_score(), Some(7.9));
        assert!(!trail.accepted());
    }

    #[tokio::test]
    async fn ambiguous_sponsorship_resolves_to_accept() {
        let f = fixture(&[], 8.0, 9.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
        f.sponsor_judge.respond(
            r#"{"accepts_sponsorship": false, "reason": "The posting does not mention sponsorship"}"#,
        );
        f.base_judge
            .respond(r#"{"score": 9.0, "reason": "Excellent match"}"#);
        f.rerank_judge
            .respond(r#"{"score": 9.0, "reason": "Confirmed"}"#);

        let trail = f
            .chain
            .evaluate(
                &detail("8", "Acme Corp", "visa questions welcome"),
                true,
            )
            .await;

        assert_eq!(trail.decisions[2].stage, Stage::Sponsorship);
        assert_eq!(trail.decisions[2].outcome, Outcome::Accept);
        assert!(trail.accepted());
    }

    #[tokio::test]
    async fn fit_judge_outage_fails_open_without_score() {
        let f = fixture(&[], 8.0, 9.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
        f.base_judge.fail();

        let trail = f
            .chain
            .evaluate(&detail("9", "Acme Corp", "a plain job description"), true)
            .await;

        assert!(trail.accepted());
        assert_eq!(trail.final_score(), None);
    }

    #[tokio::test]
    async fn evaluate_is_idempotent_for_fixed_judge_responses() {
        let posting = detail("10", "Acme Corp", "visa sponsorship available");
        let mut trails = Vec::new();
        for _ in 0..2 {
            let f = fixture(&[], 8.0, 9.0).await;
            f.hr_judge
                .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
            f.sponsor_judge
                .respond(r#"{"accepts_sponsorship": true, "reason": "Sponsorship offered"}"#);
            f.base_judge
                .respond(r#"{"score": 8.5, "reason": "Strong overlap"}"#);
            trails.push(f.chain.evaluate(&posting, true).await);
        }
        assert_eq!(trails[0], trails[1]);
    }

    #[tokio::test]
    async fn sponsorship_stage_skipped_when_role_does_not_require_it() {
        let f = fixture(&[], 8.0, 9.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
        f.base_judge
            .respond(r#"{"score": 9.5, "reason": "Excellent"}"#);
        f.rerank_judge
            .respond(r#"{"score": 9.5, "reason": "Confirmed"}"#);

        let trail = f
            .chain
            .evaluate(
                // A strong negative that would reject if the gate ran.
                &detail("11", "Acme Corp", "us citizens only"),
                false,
            )
            .await;

        assert_eq!(f.sponsor_judge.call_count(), 0);
        assert!(trail.accepted());
    }

    #[tokio::test]
    async fn strong_negative_rejects_without_judge_call() {
        let f = fixture(&[], 8.0, 9.0).await;
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);

        let trail = f
            .chain
            .evaluate(
                &detail("12", "Acme Corp", "We cannot sponsor visas for this role."),
                true,
            )
            .await;

        assert_eq!(f.sponsor_judge.call_count(), 0);
        assert_eq!(trail.last().unwrap().stage, Stage::Sponsorship);
        assert_eq!(trail.last().unwrap().outcome, Outcome::Reject);
        assert_eq!(f.base_judge.call_count(), 0);
    }
}
