//! Visa-sponsorship gate with deterministic pre-checks.
//!
//! Most descriptions never reach the judge: eligibility keywords and strong
//! negative phrases decide locally, and descriptions with no sponsorship
//! language at all accept outright. Only ambiguous sponsorship language gets
//! a judge call, and ambiguity in the judge's own answer resolves to accept.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use jobscout_common::{Decision, PostingDetail, Stage};
use judge_client::Judge;

use crate::util::{clip, short_reason};
use crate::filter::verdict::{parse_verdict, Verdict};

const SPONSORSHIP_SYSTEM_PROMPT: &str = "You are evaluating sponsorship for a candidate who will \
need continued work authorization (e.g., H-1B or similar). From the job description, decide if \
the employer supports work visas. Return JSON only: {\"accepts_sponsorship\": true|false, \
\"reason\": \"brief explanation\"}. Reject ONLY when the description explicitly denies \
sponsorship or requires unrestricted work authorization. Treat any of these as NOT sponsoring: \
no visa sponsorship, cannot hire international candidates, US citizens only, must have permanent \
work authorization, no OPT/CPT, must already be authorized without sponsorship. If the \
description is unclear or does not mention sponsorship, return accepts_sponsorship=true.";

const UNPAID_KEYWORDS: [&str; 6] = [
    "unpaid",
    "no pay",
    "without pay",
    "no compensation",
    "uncompensated",
    "stipend only",
];

const VOLUNTEER_KEYWORDS: [&str; 3] = ["volunteer", "voluntary position", "voluntary role"];

const PHD_KEYWORDS: [&str; 4] = ["phd", "ph.d", "doctorate", "doctoral"];

const SPONSORSHIP_SIGNALS: [&str; 20] = [
    "visa",
    "sponsor",
    "sponsorship",
    "work authorization",
    "authorisation",
    "h-1b",
    "h1b",
    "tn visa",
    "o-1",
    "green card",
    "permanent resident",
    "citizen",
    "usc",
    "e-verify",
    "opt",
    "cpt",
    "work permit",
    "authorized to work",
    "authorization to work",
    "non-citizen",
];

/// Phrases that clearly deny sponsorship; these reject without a judge call.
const STRONG_NEGATIVES: [&str; 18] = [
    "no visa sponsorship",
    "without sponsorship",
    "cannot sponsor",
    "will not sponsor",
    "not able to sponsor",
    "cannot hire international",
    "international candidates will not be considered",
    "us citizens only",
    "citizens only",
    "must be a us citizen",
    "usc only",
    "permanent resident only",
    "green card holders only",
    "must have permanent work authorization",
    "must have unrestricted work authorization",
    "no opt",
    "no cpt",
    "must be authorized to work without sponsorship",
];

/// Markers in a judge's reject reason that mean "I found nothing explicit".
const NO_INFO_MARKERS: [&str; 8] = [
    "does not mention",
    "no mention",
    "not mention",
    "unspecified",
    "unclear",
    "not specified",
    "no information",
    "unknown",
];

#[derive(Debug, Deserialize)]
pub struct SponsorshipVerdict {
    pub accepts_sponsorship: bool,
    #[serde(default)]
    pub reason: String,
}

pub struct SponsorshipGate {
    judge: Arc<dyn Judge>,
    reject_unpaid_roles: bool,
    reject_volunteer_roles: bool,
    min_required_experience_years: u32,
    allow_phd_required: bool,
}

impl SponsorshipGate {
    pub fn new(
        judge: Arc<dyn Judge>,
        reject_unpaid_roles: bool,
        reject_volunteer_roles: bool,
        min_required_experience_years: u32,
        allow_phd_required: bool,
    ) -> Self {
        Self {
            judge,
            reject_unpaid_roles,
            reject_volunteer_roles,
            min_required_experience_years,
            allow_phd_required,
        }
    }

    pub async fn check(&self, detail: &PostingDetail, requires_sponsorship: bool) -> Decision {
        if !requires_sponsorship {
            return Decision::accept(Stage::Sponsorship, "Sponsorship not required for this role");
        }

        if detail.description.trim().is_empty() {
            warn!(
                posting_id = detail.posting_id.as_str(),
                "No description available; assuming sponsorship accepted"
            );
            return Decision::accept(Stage::Sponsorship, "No description provided");
        }

        let lowered = detail.description.to_lowercase();

        if let Some(reason) = self.eligibility_reject(&lowered) {
            info!(
                posting_id = detail.posting_id.as_str(),
                reason = reason.as_str(),
                "Eligibility pre-check rejected posting"
            );
            return Decision::reject(Stage::Sponsorship, reason);
        }

        if let Some(phrase) = STRONG_NEGATIVES.iter().find(|p| lowered.contains(*p)) {
            info!(
                posting_id = detail.posting_id.as_str(),
                phrase = *phrase,
                "Strong negative sponsorship phrase found"
            );
            return Decision::reject(
                Stage::Sponsorship,
                format!("Explicit denial: \"{phrase}\""),
            );
        }

        if !SPONSORSHIP_SIGNALS.iter().any(|k| lowered.contains(k)) {
            return Decision::accept(
                Stage::Sponsorship,
                "No sponsorship language present; assumed accept",
            );
        }

        // Sponsorship language without an explicit denial: ask the judge.
        let raw = match self
            .judge
            .invoke(SPONSORSHIP_SYSTEM_PROMPT, clip(&detail.description, 8_000))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    posting_id = detail.posting_id.as_str(),
                    error = %e,
                    "Sponsorship judge unavailable, failing open"
                );
                return Decision::accept(Stage::Sponsorship, "Judge unavailable (fail-open)");
            }
        };

        match parse_verdict::<SponsorshipVerdict>(&raw) {
            Verdict::Valid(v) if v.accepts_sponsorship => {
                Decision::accept(Stage::Sponsorship, short_reason(&v.reason))
            }
            Verdict::Valid(v) => {
                let lowered_reason = v.reason.to_lowercase();
                if NO_INFO_MARKERS.iter().any(|m| lowered_reason.contains(m)) {
                    // The judge only failed to find a mention; that is
                    // ambiguity, and ambiguity resolves to accept.
                    return Decision::accept(
                        Stage::Sponsorship,
                        "Judge uncertain (no explicit denial); defaulting to accept",
                    );
                }
                info!(
                    posting_id = detail.posting_id.as_str(),
                    reason = short_reason(&v.reason).as_str(),
                    "Sponsorship rejected"
                );
                Decision::reject(Stage::Sponsorship, short_reason(&v.reason))
            }
            Verdict::Malformed { raw } => {
                warn!(
                    posting_id = detail.posting_id.as_str(),
                    raw = clip(&raw, 200),
                    "Unparsable sponsorship verdict, failing open"
                );
                Decision::accept(Stage::Sponsorship, "Unparsable verdict (fail-open)")
            }
        }
    }

    fn eligibility_reject(&self, lowered: &str) -> Option<String> {
        if self.reject_unpaid_roles && UNPAID_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Some("Unpaid role detected".to_string());
        }
        if self.reject_volunteer_roles && VOLUNTEER_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Some("Volunteer role detected".to_string());
        }
        if self.min_required_experience_years > 0 {
            static EXPERIENCE_RE: OnceLock<Regex> = OnceLock::new();
            let re = EXPERIENCE_RE.get_or_init(|| {
                Regex::new(r"(\d+)\s*\+?\s*(?:years|year|yrs|yr)[^\n]{0,20}experience")
                    .expect("static experience regex compiles")
            });
            for capture in re.captures_iter(lowered) {
                if let Ok(years) = capture[1].parse::<u32>() {
                    if years > self.min_required_experience_years {
                        return Some(format!(
                            "Experience requirement too high ({years}+ years > allowed {})",
                            self.min_required_experience_years
                        ));
                    }
                }
            }
        }
        if !self.allow_phd_required && PHD_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Some("PhD requirement detected".to_string());
        }
        None
    }
}
