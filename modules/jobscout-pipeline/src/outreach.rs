//! Bounded people-search-and-connect flow for accepted postings.
//!
//! The search runs in a dedicated browsing context that must be closed on
//! every exit path — success, early stop, or error — before the next posting
//! is processed. Scoped acquisition, not optional cleanup.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use jobscout_common::{OutreachAction, OutreachRecord, PersonCard, ScoutError};

use crate::session::BoardSession;
use crate::util::jitter_delay;

pub struct OutreachCoordinator {
    session: Arc<dyn BoardSession>,
    max_pages: u32,
    delay_ms: (u64, u64),
}

impl OutreachCoordinator {
    pub fn new(session: Arc<dyn BoardSession>, max_pages: u32, delay_ms: (u64, u64)) -> Self {
        Self {
            session,
            max_pages,
            delay_ms,
        }
    }

    /// Run the people search for one accepted posting. An empty result is a
    /// valid outcome; only `SessionLost` is an error.
    pub async fn run(&self, role: &str, company: &str) -> Result<Vec<OutreachRecord>, ScoutError> {
        let query = format!("{role} at {company}");
        info!(query = query.as_str(), "Starting people search");

        self.session.open_people_context().await?;
        let result = self.run_inner(&query, role).await;
        if let Err(e) = self.session.close_people_context().await {
            warn!(error = %e, "Failed to close people-search context");
        }
        result
    }

    async fn run_inner(&self, query: &str, role: &str) -> Result<Vec<OutreachRecord>, ScoutError> {
        let mut records = Vec::new();
        let mut seen_profiles: HashSet<String> = HashSet::new();

        for page in 1..=self.max_pages {
            let people = match self.session.people_page(query, page).await {
                Ok(people) => people,
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => {
                    warn!(page, error = %e, "People page failed; stopping search");
                    break;
                }
            };

            // Result pages repeat trailing cards; only genuinely new people
            // count toward the stop condition.
            let fresh: Vec<PersonCard> = people
                .into_iter()
                .filter(|p| seen_profiles.insert(p.profile_url.clone()))
                .collect();
            if fresh.is_empty() {
                info!(page, "No new people on page; stopping search");
                break;
            }

            for person in fresh {
                match self.process_person(&person, role, page).await {
                    Ok(record) => records.push(record),
                    Err(e) if e.is_session_lost() => return Err(e),
                    Err(e) => {
                        warn!(
                            person = person.name.as_str(),
                            page,
                            error = %e,
                            "Skipping person after failure"
                        );
                    }
                }
                jitter_delay(self.delay_ms.0, self.delay_ms.1).await;
            }
        }

        info!(records = records.len(), "People search complete");
        Ok(records)
    }

    async fn process_person(
        &self,
        person: &PersonCard,
        role: &str,
        page: u32,
    ) -> Result<OutreachRecord, ScoutError> {
        let role_matched = role_matches(role, &person.title);

        // Connect fires whether or not the role matched; messages are only
        // recorded as available, never sent from this flow.
        let action_taken = if person.can_connect {
            self.session.send_connect(&person.profile_url).await?;
            info!(
                person = person.name.as_str(),
                role_matched, "Connect request sent"
            );
            OutreachAction::ConnectSent
        } else if person.can_message {
            OutreachAction::MessageAvailable
        } else {
            OutreachAction::None
        };

        Ok(OutreachRecord {
            person_name: person.name.clone(),
            person_title: person.title.clone(),
            profile_url: person.profile_url.clone(),
            role_matched,
            action_taken,
            page_number: page,
        })
    }
}

/// Strict role match: the queried role phrase must appear in the title as a
/// case-insensitive substring. The single allowed variant turns "scientist"
/// into "science" so "Director of Data Science" matches a "data scientist"
/// query. No token or fuzzy matching; networking noise is worse than a
/// missed borderline title.
pub fn role_matches(role: &str, title: &str) -> bool {
    let role = role.trim().to_lowercase();
    let title = title.trim().to_lowercase();
    if role.is_empty() || title.is_empty() {
        return false;
    }

    if title.contains(&role) {
        return true;
    }
    if role.contains("scientist") {
        let variant = role.replace("scientist", "science");
        return title.contains(&variant);
    }
    false
}
