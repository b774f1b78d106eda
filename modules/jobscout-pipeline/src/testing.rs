//! Deterministic in-memory collaborators for tests: no browser, no network,
//! no judge endpoint. Scripted results drain in FIFO order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use jobscout_common::{
    AcceptedJob, Config, DateWindow, Decision, DecisionTrail, ExperienceLevel, OutreachRecord,
    PersonCard, PostingDetail, PostingSummary, RawPostingDetail, RawSearchPage, RemoteMode,
    ScoutError, SearchQuery, Stage,
};
use judge_client::{Judge, JudgeError};

use crate::notify::NotifyBackend;
use crate::session::BoardSession;
use crate::store::JobStore;

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSession {
    search_pages: Mutex<VecDeque<Result<RawSearchPage, ScoutError>>>,
    details: Mutex<HashMap<String, VecDeque<Result<RawPostingDetail, ScoutError>>>>,
    people_pages: Mutex<VecDeque<Result<Vec<PersonCard>, ScoutError>>>,
    detail_calls: Mutex<Vec<String>>,
    connects: Mutex<Vec<String>>,
    failing_connects: Mutex<HashSet<String>>,
    context_events: Mutex<Vec<&'static str>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_search_page(&self, page: Result<RawSearchPage, ScoutError>) {
        self.search_pages.lock().unwrap().push_back(page);
    }

    pub fn push_detail(&self, posting_id: &str, result: Result<RawPostingDetail, ScoutError>) {
        self.details
            .lock()
            .unwrap()
            .entry(posting_id.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn push_people_page(&self, page: Result<Vec<PersonCard>, ScoutError>) {
        self.people_pages.lock().unwrap().push_back(page);
    }

    pub fn fail_connect_for(&self, profile_url: &str) {
        self.failing_connects
            .lock()
            .unwrap()
            .insert(profile_url.to_string());
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }

    pub fn context_events(&self) -> Vec<&'static str> {
        self.context_events.lock().unwrap().clone()
    }

    /// Every opened people context was closed, in order.
    pub fn context_balanced(&self) -> bool {
        let events = self.context_events.lock().unwrap();
        let mut open = 0i32;
        for event in events.iter() {
            match *event {
                "open" => open += 1,
                "close" => open -= 1,
                _ => {}
            }
            if open > 1 || open < 0 {
                return false;
            }
        }
        open == 0
    }
}

#[async_trait]
impl BoardSession for MockSession {
    async fn search_page(
        &self,
        _query: &SearchQuery,
        _page: u32,
    ) -> Result<RawSearchPage, ScoutError> {
        self.search_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawSearchPage::default()))
    }

    async fn posting_detail(&self, posting_id: &str) -> Result<RawPostingDetail, ScoutError> {
        self.detail_calls.lock().unwrap().push(posting_id.to_string());
        self.details
            .lock()
            .unwrap()
            .get_mut(posting_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(ScoutError::ExtractionFault(format!(
                    "no scripted detail for {posting_id}"
                )))
            })
    }

    async fn people_page(&self, _query: &str, _page: u32) -> Result<Vec<PersonCard>, ScoutError> {
        self.people_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send_connect(&self, profile_url: &str) -> Result<(), ScoutError> {
        if self.failing_connects.lock().unwrap().contains(profile_url) {
            return Err(ScoutError::ExtractionFault(format!(
                "connect button went stale for {profile_url}"
            )));
        }
        self.connects.lock().unwrap().push(profile_url.to_string());
        Ok(())
    }

    async fn open_people_context(&self) -> Result<(), ScoutError> {
        self.context_events.lock().unwrap().push("open");
        Ok(())
    }

    async fn close_people_context(&self) -> Result<(), ScoutError> {
        self.context_events.lock().unwrap().push("close");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedJudge
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedJudge {
    responses: Mutex<VecDeque<Result<String, JudgeError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, raw: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(raw.to_string()));
    }

    pub fn fail(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(JudgeError::Unavailable("scripted outage".to_string())));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn invoke(&self, _system_prompt: &str, user_prompt: &str) -> Result<String, JudgeError> {
        self.calls.lock().unwrap().push(user_prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(JudgeError::Unavailable("no scripted response".to_string())))
    }

    fn model(&self) -> &str {
        "scripted-judge"
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    blocklist_seed: Mutex<Vec<String>>,
    blocklist_appends: Mutex<Vec<String>>,
    accepted: Mutex<Vec<AcceptedJob>>,
    outreach: Mutex<Vec<OutreachRecord>>,
    failing_appends: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocklist(entries: &[&str]) -> Self {
        let store = Self::default();
        *store.blocklist_seed.lock().unwrap() =
            entries.iter().map(|e| e.to_string()).collect();
        store
    }

    /// Make the next `n` accepted-job appends fail.
    pub fn fail_next_appends(&self, n: u32) {
        self.failing_appends.store(n, Ordering::SeqCst);
    }

    pub fn accepted(&self) -> Vec<AcceptedJob> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn outreach(&self) -> Vec<OutreachRecord> {
        self.outreach.lock().unwrap().clone()
    }

    pub fn blocklist_appends(&self) -> Vec<String> {
        self.blocklist_appends.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn append_accepted_job(&self, job: &AcceptedJob) -> Result<(), ScoutError> {
        let remaining = self.failing_appends.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_appends.store(remaining - 1, Ordering::SeqCst);
            return Err(ScoutError::PersistenceFault("scripted append failure".into()));
        }
        self.accepted.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn append_outreach_records(
        &self,
        records: &[OutreachRecord],
    ) -> Result<(), ScoutError> {
        self.outreach.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn load_blocklist(&self) -> Result<Vec<String>, ScoutError> {
        let mut entries = self.blocklist_seed.lock().unwrap().clone();
        entries.extend(self.blocklist_appends.lock().unwrap().iter().cloned());
        Ok(entries)
    }

    async fn append_blocklist_entry(
        &self,
        entry: &jobscout_common::BlocklistEntry,
    ) -> Result<(), ScoutError> {
        self.blocklist_appends
            .lock()
            .unwrap()
            .push(entry.pattern.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<String>>,
    failing: AtomicU32,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, n: u32) {
        self.failing.store(n, Ordering::SeqCst);
    }

    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifyBackend for RecordingNotifier {
    async fn notify(&self, job: &AcceptedJob) -> anyhow::Result<bool> {
        let remaining = self.failing.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("scripted notify failure");
        }
        self.notified
            .lock()
            .unwrap()
            .push(job.detail.posting_id.clone());
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

pub fn test_config() -> Config {
    Config {
        anthropic_api_key: "sk-ant-test".to_string(),
        judge_model: "claude-haiku-4-5-20251001".to_string(),
        rerank_model: "claude-sonnet-4-20250514".to_string(),
        match_threshold: 8.0,
        rerank_trigger: 8.0,
        max_applicants: 100,
        requires_sponsorship: true,
        reject_hr_companies: true,
        reject_unpaid_roles: true,
        reject_volunteer_roles: true,
        min_required_experience_years: 0,
        allow_phd_required: true,
        scrape_interval_minutes: 30,
        request_delay_min_ms: 0,
        request_delay_max_ms: 0,
        max_people_pages: 3,
        data_dir: PathBuf::from("data"),
        resume_path: PathBuf::from("data/resume.txt"),
        preferences_path: PathBuf::from("data/preferences.txt"),
        roles_path: PathBuf::from("data/roles.json"),
        blocklist_path: PathBuf::from("data/company_blocklist.json"),
        session_agent_url: "http://localhost:3333".to_string(),
        session_agent_token: None,
        notify_webhook_url: None,
        default_location: "United States".to_string(),
    }
}

pub fn query(role: &str) -> SearchQuery {
    SearchQuery {
        role: role.to_string(),
        location: "United States".to_string(),
        date_window: DateWindow::default(),
        experience_levels: vec![ExperienceLevel::EntryLevel, ExperienceLevel::Associate],
        remote_mode: RemoteMode::Any,
        requires_sponsorship: true,
    }
}

pub fn card(posting_id: &str, previously_seen: bool) -> PostingSummary {
    PostingSummary {
        posting_id: posting_id.to_string(),
        title: "Data Scientist".to_string(),
        company: "Acme Corp".to_string(),
        location: "United States".to_string(),
        previously_seen,
    }
}

pub fn raw_detail(posting_id: &str, company: &str, description: &str) -> RawPostingDetail {
    RawPostingDetail {
        posting_id: posting_id.to_string(),
        title: "Data Scientist".to_string(),
        company: company.to_string(),
        location: "United States".to_string(),
        description: description.to_string(),
        seniority: Some("Entry level".to_string()),
        workplace_type: None,
        posted_time: Some("2 hours ago".to_string()),
        applicant_count: Some(12),
        canonical_url: format!("https://www.linkedin.com/jobs/view/{posting_id}/"),
    }
}

pub fn detail(posting_id: &str, company: &str, description: &str) -> PostingDetail {
    PostingDetail {
        posting_id: posting_id.to_string(),
        title: "Data Scientist".to_string(),
        company: company.to_string(),
        location: "United States".to_string(),
        description: description.to_string(),
        seniority: "Entry level".to_string(),
        remote_flag: false,
        posted_time: "2 hours ago".to_string(),
        applicant_count: 12,
        canonical_url: format!("https://www.linkedin.com/jobs/view/{posting_id}/"),
    }
}

pub fn person(name: &str, title: &str, can_connect: bool, can_message: bool) -> PersonCard {
    PersonCard {
        name: name.to_string(),
        title: title.to_string(),
        profile_url: format!(
            "https://www.linkedin.com/in/{}/",
            name.to_lowercase().replace(' ', "-")
        ),
        can_connect,
        can_message,
    }
}

pub fn accepted_job(posting_id: &str, company: &str, score: f64) -> AcceptedJob {
    let mut trail = DecisionTrail::default();
    trail.push(Decision::accept(Stage::Blocklist, "Not on blocklist"));
    trail.push(Decision::accept(Stage::Hr, "Direct employer"));
    trail.push(Decision::accept(Stage::Sponsorship, "Sponsorship available"));
    trail.push(Decision::accept(Stage::Fit, "Strong match").with_score(Some(score)));
    AcceptedJob {
        detail: detail(posting_id, company, "visa sponsorship available"),
        fit_score: Some(score),
        decision_trail: trail,
        outreach_records: Vec::new(),
        accepted_at: Utc::now(),
    }
}
