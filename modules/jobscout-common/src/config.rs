use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::info;

use crate::error::ScoutError;
use crate::types::RoleConfig;

/// Application configuration loaded from environment variables.
/// Search roles live in a separate JSON file (`roles_path`).
#[derive(Debug, Clone)]
pub struct Config {
    // Judge service
    pub anthropic_api_key: String,
    /// Small/fast model for first-pass scoring and the cheap judges.
    pub judge_model: String,
    /// Stronger model for the rerank pass.
    pub rerank_model: String,

    // Scoring
    pub match_threshold: f64,
    pub rerank_trigger: f64,

    // Filtering
    pub max_applicants: u32,
    pub requires_sponsorship: bool,
    pub reject_hr_companies: bool,
    pub reject_unpaid_roles: bool,
    pub reject_volunteer_roles: bool,
    pub min_required_experience_years: u32,
    pub allow_phd_required: bool,

    // Pacing
    pub scrape_interval_minutes: u64,
    pub request_delay_min_ms: u64,
    pub request_delay_max_ms: u64,

    // Outreach
    pub max_people_pages: u32,

    // Files
    pub data_dir: PathBuf,
    pub resume_path: PathBuf,
    pub preferences_path: PathBuf,
    pub roles_path: PathBuf,
    pub blocklist_path: PathBuf,

    // Session agent (authenticated browser driver service)
    pub session_agent_url: String,
    pub session_agent_token: Option<String>,

    // Notifications
    pub notify_webhook_url: Option<String>,

    // Search defaults
    pub default_location: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env_or("DATA_DIR", "data"));
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            judge_model: env_or("JUDGE_MODEL", "claude-haiku-4-5-20251001"),
            rerank_model: env_or("JUDGE_MODEL_RERANK", "claude-sonnet-4-20250514"),
            match_threshold: env_parse("JOB_MATCH_THRESHOLD", 8.0),
            rerank_trigger: env_parse("JOB_MATCH_RERANK_TRIGGER", 8.0),
            max_applicants: env_parse("MAX_APPLICANTS", 100),
            requires_sponsorship: env_bool("REQUIRES_SPONSORSHIP", true),
            reject_hr_companies: env_bool("REJECT_HR_COMPANIES", true),
            reject_unpaid_roles: env_bool("REJECT_UNPAID_ROLES", true),
            reject_volunteer_roles: env_bool("REJECT_VOLUNTEER_ROLES", true),
            min_required_experience_years: env_parse("MIN_REQUIRED_EXPERIENCE_YEARS", 0),
            allow_phd_required: env_bool("ALLOW_PHD_REQUIRED", true),
            scrape_interval_minutes: env_parse("SCRAPE_INTERVAL_MINUTES", 30),
            request_delay_min_ms: env_parse("REQUEST_DELAY_MIN_MS", 2_000),
            request_delay_max_ms: env_parse("REQUEST_DELAY_MAX_MS", 5_000),
            max_people_pages: env_parse("MAX_PEOPLE_SEARCH_PAGES", 3),
            resume_path: resolve_path("RESUME_PATH", &data_dir, "resume.txt"),
            preferences_path: resolve_path("PREFERENCES_PATH", &data_dir, "preferences.txt"),
            roles_path: resolve_path("ROLES_PATH", &data_dir, "roles.json"),
            blocklist_path: resolve_path("BLOCKLIST_PATH", &data_dir, "company_blocklist.json"),
            session_agent_url: required_env("SESSION_AGENT_URL"),
            session_agent_token: env::var("SESSION_AGENT_TOKEN").ok().filter(|v| !v.is_empty()),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            default_location: env_or("DEFAULT_LOCATION", "United States"),
            data_dir,
        }
    }

    /// Sanity-check values that env parsing alone cannot catch.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(0.0..=10.0).contains(&self.match_threshold) {
            errors.push("JOB_MATCH_THRESHOLD must be between 0 and 10".to_string());
        }
        if !(0.0..=10.0).contains(&self.rerank_trigger) {
            errors.push("JOB_MATCH_RERANK_TRIGGER must be between 0 and 10".to_string());
        }
        if self.request_delay_min_ms > self.request_delay_max_ms {
            errors.push("REQUEST_DELAY_MIN_MS must not exceed REQUEST_DELAY_MAX_MS".to_string());
        }
        if !self.resume_path.exists() {
            errors.push(format!("Resume file not found: {}", self.resume_path.display()));
        }
        errors
    }

    pub fn log_redacted(&self) {
        info!(
            judge_model = self.judge_model.as_str(),
            rerank_model = self.rerank_model.as_str(),
            match_threshold = self.match_threshold,
            rerank_trigger = self.rerank_trigger,
            max_applicants = self.max_applicants,
            requires_sponsorship = self.requires_sponsorship,
            interval_minutes = self.scrape_interval_minutes,
            data_dir = %self.data_dir.display(),
            webhook = self.notify_webhook_url.is_some(),
            "Config loaded"
        );
    }
}

/// Contents of roles.json: the configured searches plus shared settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolesFile {
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
    #[serde(default)]
    pub search_settings: SearchSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchSettings {
    /// `r<seconds>` token for the posted-within filter.
    #[serde(default)]
    pub date_posted: Option<String>,
}

impl RolesFile {
    pub fn load(path: &Path) -> Result<Self, ScoutError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScoutError::Config(format!("Failed to read roles file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ScoutError::Config(format!("Failed to parse roles file {}: {e}", path.display()))
        })
    }

    pub fn enabled_roles(&self) -> Vec<&RoleConfig> {
        self.roles.iter().filter(|r| r.enabled).collect()
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {raw:?}")),
        Err(_) => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => raw.eq_ignore_ascii_case("true") || raw == "1",
        Err(_) => default,
    }
}

fn resolve_path(key: &str, data_dir: &Path, default_name: &str) -> PathBuf {
    match env::var(key) {
        Ok(value) if !value.is_empty() => PathBuf::from(value),
        _ => data_dir.join(default_name),
    }
}
