//! The top-level cycle: roles → pages → postings → filter chain → outreach →
//! persistence → notification.
//!
//! Fault boundaries are nested: a posting failure never aborts its role, a
//! role failure never aborts the cycle, and only a lost session escapes to
//! the scheduler shell. The shutdown flag is observed between postings, not
//! mid-judge-call, so in-flight work always completes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use jobscout_common::{
    AcceptedJob, Config, Outcome, RolesFile, ScoutError, SearchQuery, Stage,
};

use crate::detail_extractor::PostingDetailExtractor;
use crate::filter::FilterChain;
use crate::list_extractor::PostingListExtractor;
use crate::notify::NotifyBackend;
use crate::outreach::OutreachCoordinator;
use crate::query::build_query;
use crate::session::BoardSession;
use crate::store::JobStore;

/// Stats from one cycle.
#[derive(Debug, Default)]
pub struct CycleStats {
    pub roles_processed: u32,
    pub pages_loaded: u32,
    pub postings_seen: u32,
    pub postings_already_viewed: u32,
    pub postings_over_applicant_cap: u32,
    pub postings_skipped: u32,
    pub rejected_by_stage: [u32; 4], // Blocklist, Hr, Sponsorship, Fit
    pub accepted: u32,
    pub connect_requests: u32,
    pub notifications_sent: u32,
}

impl CycleStats {
    fn record_reject(&mut self, stage: Stage) {
        let idx = match stage {
            Stage::Blocklist => 0,
            Stage::Hr => 1,
            Stage::Sponsorship => 2,
            Stage::Fit => 3,
        };
        self.rejected_by_stage[idx] += 1;
    }
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Cycle Complete ===")?;
        writeln!(f, "Roles processed:    {}", self.roles_processed)?;
        writeln!(f, "Pages loaded:       {}", self.pages_loaded)?;
        writeln!(f, "Postings seen:      {}", self.postings_seen)?;
        writeln!(f, "Already viewed:     {}", self.postings_already_viewed)?;
        writeln!(f, "Over applicant cap: {}", self.postings_over_applicant_cap)?;
        writeln!(f, "Skipped (faults):   {}", self.postings_skipped)?;
        writeln!(f, "\nRejected by stage:")?;
        writeln!(f, "  Blocklist:   {}", self.rejected_by_stage[0])?;
        writeln!(f, "  HR firm:     {}", self.rejected_by_stage[1])?;
        writeln!(f, "  Sponsorship: {}", self.rejected_by_stage[2])?;
        writeln!(f, "  Fit score:   {}", self.rejected_by_stage[3])?;
        writeln!(f, "\nAccepted:           {}", self.accepted)?;
        writeln!(f, "Connect requests:   {}", self.connect_requests)?;
        writeln!(f, "Notifications:      {}", self.notifications_sent)?;
        Ok(())
    }
}

pub struct CycleRunner {
    session: Arc<dyn BoardSession>,
    details: PostingDetailExtractor,
    chain: FilterChain,
    outreach: OutreachCoordinator,
    store: Arc<dyn JobStore>,
    notifier: Arc<dyn NotifyBackend>,
    roles: RolesFile,
    config: Config,
    shutdown: Arc<AtomicBool>,
}

impl CycleRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<dyn BoardSession>,
        chain: FilterChain,
        outreach: OutreachCoordinator,
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn NotifyBackend>,
        roles: RolesFile,
        config: Config,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            details: PostingDetailExtractor::new(
                Arc::clone(&session),
                std::time::Duration::from_millis(config.request_delay_max_ms),
            ),
            session,
            chain,
            outreach,
            store,
            notifier,
            roles,
            config,
            shutdown,
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// One full pass over the configured roles. The only externally-invoked
    /// entry point; the scheduler shell decides when to call it again.
    pub async fn run_one_cycle(&self) -> Result<CycleStats, ScoutError> {
        let run_id = Uuid::new_v4();
        let mut stats = CycleStats::default();

        let enabled = self.roles.enabled_roles();
        if enabled.is_empty() {
            warn!("No enabled roles configured; nothing to do");
            return Ok(stats);
        }
        info!(run_id = %run_id, roles = enabled.len(), "Cycle starting");

        let mut seen_titles = HashSet::new();
        for role in enabled {
            if self.shutdown_requested() {
                info!("Shutdown requested; ending cycle early");
                break;
            }
            if role.title.trim().is_empty()
                || !seen_titles.insert(role.title.trim().to_lowercase())
            {
                continue;
            }

            let query = build_query(role, &self.roles.search_settings, &self.config);
            info!(
                role = query.role.as_str(),
                location = query.location.as_str(),
                "Processing role"
            );

            match self.run_role(&query, &mut stats).await {
                Ok(()) => stats.roles_processed += 1,
                Err(e) if e.is_session_lost() => {
                    error!(role = query.role.as_str(), error = %e, "Session lost; aborting cycle");
                    return Err(e);
                }
                Err(e) => {
                    error!(
                        role = query.role.as_str(),
                        error = %e,
                        "Role processing failed; continuing with next role"
                    );
                }
            }
        }

        info!("{stats}");
        Ok(stats)
    }

    async fn run_role(&self, query: &SearchQuery, stats: &mut CycleStats) -> Result<(), ScoutError> {
        let mut lister = PostingListExtractor::new(
            Arc::clone(&self.session),
            query.clone(),
            (self.config.request_delay_min_ms, self.config.request_delay_max_ms),
        );

        loop {
            let page = lister.next_page().await?;
            stats.pages_loaded += 1;

            for summary in &page.postings {
                if self.shutdown_requested() {
                    info!("Shutdown requested; ending role early");
                    return Ok(());
                }
                stats.postings_seen += 1;

                if summary.previously_seen {
                    // The source already marked it; no detail fetch happens.
                    info!(
                        posting_id = summary.posting_id.as_str(),
                        "Skipped: already viewed"
                    );
                    stats.postings_already_viewed += 1;
                    continue;
                }

                match self.process_posting(query, &summary.posting_id, stats).await {
                    Ok(()) => {}
                    Err(e) if e.is_session_lost() => return Err(e),
                    Err(e) => {
                        warn!(
                            posting_id = summary.posting_id.as_str(),
                            error = %e,
                            "Posting skipped"
                        );
                        stats.postings_skipped += 1;
                    }
                }
            }

            if !page.has_more {
                break;
            }
        }

        Ok(())
    }

    async fn process_posting(
        &self,
        query: &SearchQuery,
        posting_id: &str,
        stats: &mut CycleStats,
    ) -> Result<(), ScoutError> {
        let detail = self.details.fetch(posting_id).await?;

        if detail.applicant_count > self.config.max_applicants {
            info!(
                posting_id,
                applicants = detail.applicant_count,
                cap = self.config.max_applicants,
                "Skipped: over applicant cap"
            );
            stats.postings_over_applicant_cap += 1;
            return Ok(());
        }

        let trail = self.chain.evaluate(&detail, query.requires_sponsorship).await;
        if !trail.accepted() {
            if let Some(last) = trail.last() {
                debug_assert_eq!(last.outcome, Outcome::Reject);
                info!(
                    posting_id,
                    company = detail.company.as_str(),
                    stage = last.stage.as_str(),
                    reason = last.reason.as_str(),
                    "Posting rejected"
                );
                stats.record_reject(last.stage);
            }
            return Ok(());
        }

        let outreach_records = self.outreach.run(&detail.title, &detail.company).await?;
        stats.connect_requests += outreach_records
            .iter()
            .filter(|r| r.action_taken == jobscout_common::OutreachAction::ConnectSent)
            .count() as u32;

        let job = AcceptedJob {
            fit_score: trail.final_score(),
            decision_trail: trail,
            outreach_records,
            accepted_at: Utc::now(),
            detail,
        };

        info!(
            posting_id,
            company = job.detail.company.as_str(),
            fit_score = job.fit_score,
            "Posting accepted"
        );
        stats.accepted += 1;

        self.persist(&job).await;

        match self.notifier.notify(&job).await {
            Ok(true) => stats.notifications_sent += 1,
            Ok(false) => {}
            Err(e) => warn!(posting_id, error = %e, "Notification failed; continuing"),
        }

        Ok(())
    }

    /// Best-effort persistence with one local retry. An accepted match is
    /// the worst thing to lose, so the failure is loud but never fatal.
    async fn persist(&self, job: &AcceptedJob) {
        let posting_id = job.detail.posting_id.as_str();

        let mut stored = false;
        for attempt in 0..2 {
            match self.store.append_accepted_job(job).await {
                Ok(()) => {
                    stored = true;
                    break;
                }
                Err(e) if attempt == 0 => {
                    warn!(posting_id, error = %e, "Accepted-job append failed; retrying once");
                }
                Err(e) => {
                    error!(
                        posting_id,
                        company = job.detail.company.as_str(),
                        fit_score = job.fit_score,
                        error = %e,
                        "PERSISTENCE FAILURE: accepted job could not be stored"
                    );
                }
            }
        }

        if stored && !job.outreach_records.is_empty() {
            if let Err(e) = self.store.append_outreach_records(&job.outreach_records).await {
                error!(posting_id, error = %e, "Failed to persist outreach records");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::Blocklist;
    use crate::filter::fit::FitScorer;
    use crate::filter::hr::HrDetector;
    use crate::filter::sponsorship::SponsorshipGate;
    use crate::testing::{
        card, person, raw_detail, test_config, MemoryStore, MockSession, RecordingNotifier,
        ScriptedJudge,
    };
    use jobscout_common::{RawSearchPage, RoleConfig};
    use judge_client::Judge;

    struct Fixture {
        session: Arc<MockSession>,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        hr_judge: Arc<ScriptedJudge>,
        base_judge: Arc<ScriptedJudge>,
        runner: CycleRunner,
        shutdown: Arc<AtomicBool>,
    }

    async fn fixture() -> Fixture {
        let session = Arc::new(MockSession::new());
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let hr_judge = Arc::new(ScriptedJudge::new());
        let sponsor_judge = Arc::new(ScriptedJudge::new());
        let base_judge = Arc::new(ScriptedJudge::new());
        let rerank_judge = Arc::new(ScriptedJudge::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let blocklist = Arc::new(
            Blocklist::load(Arc::clone(&store) as Arc<dyn JobStore>)
                .await
                .unwrap(),
        );
        let chain = FilterChain::new(
            blocklist,
            HrDetector::new(Arc::clone(&hr_judge) as Arc<dyn Judge>, true),
            SponsorshipGate::new(Arc::clone(&sponsor_judge) as Arc<dyn Judge>, true, true, 0, true),
            FitScorer::new(
                Arc::clone(&base_judge) as Arc<dyn Judge>,
                Arc::clone(&rerank_judge) as Arc<dyn Judge>,
                "resume".to_string(),
                "preferences".to_string(),
                8.0,
                9.0,
            ),
        );
        let outreach = OutreachCoordinator::new(
            Arc::clone(&session) as Arc<dyn BoardSession>,
            3,
            (0, 0),
        );

        let roles = RolesFile {
            roles: vec![RoleConfig {
                title: "Data Scientist".to_string(),
                location: None,
                experience_levels: None,
                remote: false,
                date_posted: None,
                enabled: true,
            }],
            search_settings: Default::default(),
        };

        let runner = CycleRunner::new(
            Arc::clone(&session) as Arc<dyn BoardSession>,
            chain,
            outreach,
            Arc::clone(&store) as Arc<dyn JobStore>,
            Arc::clone(&notifier) as Arc<dyn NotifyBackend>,
            roles,
            test_config(),
            Arc::clone(&shutdown),
        );

        Fixture {
            session,
            store,
            notifier,
            hr_judge,
            base_judge,
            runner,
            shutdown,
        }
    }

    /// Script the judges so one posting sails through every gate.
    fn accept_posting(f: &Fixture) {
        f.hr_judge
            .respond(r#"{"is_hr_company": false, "reason": "Direct employer"}"#);
        f.base_judge
            .respond(r#"{"score": 8.5, "reason": "Strong overlap"}"#);
    }

    #[tokio::test]
    async fn previously_seen_postings_never_fetch_detail() {
        let f = fixture().await;
        f.session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", true), card("2", true)],
            has_more: false,
        }));

        let stats = f.runner.run_one_cycle().await.unwrap();
        assert_eq!(stats.postings_already_viewed, 2);
        assert!(f.session.detail_calls().is_empty());
    }

    #[tokio::test]
    async fn accepted_posting_flows_to_store_and_notifier() {
        let f = fixture().await;
        f.session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", false)],
            has_more: false,
        }));
        f.session
            .push_detail("1", Ok(raw_detail("1", "Acme Corp", "a plain role")));
        f.session.push_people_page(Ok(vec![person(
            "Jordan Smith",
            "Senior Data Scientist",
            true,
            false,
        )]));
        accept_posting(&f);

        let stats = f.runner.run_one_cycle().await.unwrap();

        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.connect_requests, 1);
        assert_eq!(stats.notifications_sent, 1);

        let stored = f.store.accepted();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].detail.posting_id, "1");
        assert_eq!(stored[0].fit_score, Some(8.5));
        assert_eq!(stored[0].outreach_records.len(), 1);
        assert_eq!(f.store.outreach().len(), 1);
        assert_eq!(f.notifier.notified(), vec!["1".to_string()]);
        assert!(f.session.context_balanced());
    }

    #[tokio::test]
    async fn scenario_e_one_bad_posting_does_not_sink_the_rest() {
        let f = fixture().await;
        f.session.push_search_page(Ok(RawSearchPage {
            cards: (1..=5).map(|i| card(&i.to_string(), false)).collect(),
            has_more: false,
        }));
        for id in ["1", "2", "4", "5"] {
            f.session
                .push_detail(id, Ok(raw_detail(id, "Acme Corp", "a plain role")));
            accept_posting(&f);
        }
        // Posting 3 times out past the retry budget.
        for _ in 0..4 {
            f.session
                .push_detail("3", Err(ScoutError::ExtractionTimeout("panel hang".into())));
        }

        let stats = f.runner.run_one_cycle().await.unwrap();

        assert_eq!(stats.accepted, 4);
        assert_eq!(stats.postings_skipped, 1);
        let stored_ids: Vec<String> = f
            .store
            .accepted()
            .iter()
            .map(|j| j.detail.posting_id.clone())
            .collect();
        assert_eq!(stored_ids, vec!["1", "2", "4", "5"]);
    }

    #[tokio::test]
    async fn applicant_cap_skips_before_any_judge_call() {
        let f = fixture().await;
        f.session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", false)],
            has_more: false,
        }));
        let mut raw = raw_detail("1", "Acme Corp", "a plain role");
        raw.applicant_count = Some(450);
        f.session.push_detail("1", Ok(raw));

        let stats = f.runner.run_one_cycle().await.unwrap();
        assert_eq!(stats.postings_over_applicant_cap, 1);
        assert_eq!(f.hr_judge.call_count(), 0);
    }

    #[tokio::test]
    async fn session_lost_aborts_the_cycle() {
        let f = fixture().await;
        f.session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", false)],
            has_more: false,
        }));
        f.session
            .push_detail("1", Err(ScoutError::SessionLost("browser died".into())));

        let err = f.runner.run_one_cycle().await.unwrap_err();
        assert!(err.is_session_lost());
    }

    #[tokio::test]
    async fn persistence_retry_recovers_single_failure() {
        let f = fixture().await;
        f.session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", false)],
            has_more: false,
        }));
        f.session
            .push_detail("1", Ok(raw_detail("1", "Acme Corp", "a plain role")));
        accept_posting(&f);
        f.store.fail_next_appends(1);

        let stats = f.runner.run_one_cycle().await.unwrap();
        assert_eq!(stats.accepted, 1);
        assert_eq!(f.store.accepted().len(), 1);
    }

    #[tokio::test]
    async fn notifier_failure_is_never_fatal() {
        let f = fixture().await;
        f.session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", false)],
            has_more: false,
        }));
        f.session
            .push_detail("1", Ok(raw_detail("1", "Acme Corp", "a plain role")));
        accept_posting(&f);
        f.notifier.fail_next(1);

        let stats = f.runner.run_one_cycle().await.unwrap();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.notifications_sent, 0);
        assert_eq!(f.store.accepted().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_flag_ends_cycle_between_postings() {
        let f = fixture().await;
        f.shutdown.store(true, Ordering::Relaxed);
        f.session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", false)],
            has_more: false,
        }));

        let stats = f.runner.run_one_cycle().await.unwrap();
        assert_eq!(stats.postings_seen, 0);
        assert!(f.session.detail_calls().is_empty());
    }
}
