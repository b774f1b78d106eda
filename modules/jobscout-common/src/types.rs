use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search queries
// ---------------------------------------------------------------------------

/// Posted-within window in seconds, clamped to the source-supported range
/// (1 hour to 24 hours). Accepts raw seconds or the `r<seconds>` token form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow(u32);

impl DateWindow {
    pub const MIN_SECONDS: u32 = 3_600;
    pub const MAX_SECONDS: u32 = 86_400;

    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds.clamp(Self::MIN_SECONDS, Self::MAX_SECONDS))
    }

    /// Parse `r86400`-style tokens; malformed tokens fall back to 24 hours.
    pub fn from_token(token: &str) -> Self {
        let digits = token.trim().trim_start_matches('r');
        match digits.parse::<u32>() {
            Ok(seconds) => Self::from_seconds(seconds),
            Err(_) => Self(Self::MAX_SECONDS),
        }
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }

    /// Wire token for the search descriptor.
    pub fn token(&self) -> String {
        format!("r{}", self.0)
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self(Self::MAX_SECONDS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Internship,
    EntryLevel,
    Associate,
    MidSenior,
    Director,
    Executive,
}

impl ExperienceLevel {
    /// Numeric filter code used by the source's search interface.
    pub fn wire_code(&self) -> &'static str {
        match self {
            ExperienceLevel::Internship => "1",
            ExperienceLevel::EntryLevel => "2",
            ExperienceLevel::Associate => "3",
            ExperienceLevel::MidSenior => "4",
            ExperienceLevel::Director => "5",
            ExperienceLevel::Executive => "6",
        }
    }

    /// Parse the display names used in roles.json. Unknown names are None.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "Internship" => Some(ExperienceLevel::Internship),
            "Entry level" => Some(ExperienceLevel::EntryLevel),
            "Associate" => Some(ExperienceLevel::Associate),
            "Mid-Senior level" => Some(ExperienceLevel::MidSenior),
            "Director" => Some(ExperienceLevel::Director),
            "Executive" => Some(ExperienceLevel::Executive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteMode {
    /// No workplace filter.
    #[default]
    Any,
    OnSite,
    Remote,
    Hybrid,
}

impl RemoteMode {
    pub fn wire_code(&self) -> Option<&'static str> {
        match self {
            RemoteMode::Any => None,
            RemoteMode::OnSite => Some("1"),
            RemoteMode::Remote => Some("2"),
            RemoteMode::Hybrid => Some("3"),
        }
    }
}

/// Normalized search descriptor. Immutable once built; one per configured role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub role: String,
    pub location: String,
    pub date_window: DateWindow,
    pub experience_levels: Vec<ExperienceLevel>,
    pub remote_mode: RemoteMode,
    pub requires_sponsorship: bool,
}

/// One configured search from roles.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub experience_levels: Option<Vec<String>>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub date_posted: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Postings
// ---------------------------------------------------------------------------

/// One card from a search results page. Ephemeral; previously-seen cards are
/// dropped before detail extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingSummary {
    pub posting_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    /// Source-provided marker. The pipeline keeps no seen-set of its own.
    pub previously_seen: bool,
}

/// Full posting detail. Never mutated after creation; gates attach decisions
/// externally via the trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingDetail {
    pub posting_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub seniority: String,
    pub remote_flag: bool,
    pub posted_time: String,
    pub applicant_count: u32,
    pub canonical_url: String,
}

// ---------------------------------------------------------------------------
// Session-boundary raw types
// ---------------------------------------------------------------------------

/// One search results page as the session delivers it, before dedup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSearchPage {
    #[serde(default)]
    pub cards: Vec<PostingSummary>,
    #[serde(default)]
    pub has_more: bool,
}

/// Posting detail as extracted from the page, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPostingDetail {
    pub posting_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub seniority: Option<String>,
    /// Explicit workplace-type field when the page exposes one.
    pub workplace_type: Option<String>,
    pub posted_time: Option<String>,
    pub applicant_count: Option<u32>,
    pub canonical_url: String,
}

/// One person card from a people-search results page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonCard {
    pub name: String,
    pub title: String,
    pub profile_url: String,
    pub can_connect: bool,
    pub can_message: bool,
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Blocklist,
    Hr,
    Sponsorship,
    Fit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Blocklist => "blocklist",
            Stage::Hr => "hr",
            Stage::Sponsorship => "sponsorship",
            Stage::Fit => "fit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Accept,
    Reject,
}

/// One gate's verdict on one posting. `score` is set by the fit stage only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub stage: Stage,
    pub outcome: Outcome,
    pub reason: String,
    pub score: Option<f64>,
}

impl Decision {
    pub fn accept(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            outcome: Outcome::Accept,
            reason: reason.into(),
            score: None,
        }
    }

    pub fn reject(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            outcome: Outcome::Reject,
            reason: reason.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }
}

/// Ordered decisions for one posting; evaluation stops at the first reject,
/// but every evaluated stage is recorded for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrail {
    pub decisions: Vec<Decision>,
}

impl DecisionTrail {
    pub fn push(&mut self, decision: Decision) {
        self.decisions.push(decision);
    }

    pub fn accepted(&self) -> bool {
        !self.decisions.is_empty()
            && self
                .decisions
                .iter()
                .all(|d| d.outcome == Outcome::Accept)
    }

    /// The fit stage's score, when that stage ran and parsed.
    pub fn final_score(&self) -> Option<f64> {
        self.decisions
            .iter()
            .rev()
            .find(|d| d.stage == Stage::Fit)
            .and_then(|d| d.score)
    }

    pub fn last(&self) -> Option<&Decision> {
        self.decisions.last()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Blocklist
// ---------------------------------------------------------------------------

/// Literal company name or `*`-wildcard pattern. Grows monotonically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocklistEntry {
    pub pattern: String,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Outreach
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachAction {
    ConnectSent,
    MessageAvailable,
    None,
}

impl OutreachAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutreachAction::ConnectSent => "connect_sent",
            OutreachAction::MessageAvailable => "message_available",
            OutreachAction::None => "none",
        }
    }
}

/// One contacted (or considered) person. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachRecord {
    pub person_name: String,
    pub person_title: String,
    pub profile_url: String,
    pub role_matched: bool,
    pub action_taken: OutreachAction,
    pub page_number: u32,
}

// ---------------------------------------------------------------------------
// Accepted jobs
// ---------------------------------------------------------------------------

/// The unit persisted and notified. Exists only when every gate accepted and
/// the fit stage cleared the threshold (or failed open, leaving no score).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedJob {
    pub detail: PostingDetail,
    pub fit_score: Option<f64>,
    pub decision_trail: DecisionTrail,
    pub outreach_records: Vec<OutreachRecord>,
    pub accepted_at: DateTime<Utc>,
}
