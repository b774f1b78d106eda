//! Paginated posting-list extraction with stale-page recovery.
//!
//! One extractor per query per cycle. Postings re-render after scroll
//! events, so dedup by posting_id spans the whole query, not just one page.
//! The previously-seen flag is the source's marker; the extractor keeps no
//! memory of earlier cycles.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use jobscout_common::{PostingSummary, ScoutError, SearchQuery};

use crate::session::BoardSession;
use crate::util::jitter_delay;

/// Retries of the current page before it is treated as exhausted.
const PAGE_RETRY_LIMIT: u32 = 3;

#[derive(Debug, Default)]
pub struct ListPage {
    pub postings: Vec<PostingSummary>,
    pub has_more: bool,
}

pub struct PostingListExtractor {
    session: Arc<dyn BoardSession>,
    query: SearchQuery,
    page: u32,
    seen_ids: HashSet<String>,
    delay_ms: (u64, u64),
    exhausted: bool,
}

impl PostingListExtractor {
    pub fn new(session: Arc<dyn BoardSession>, query: SearchQuery, delay_ms: (u64, u64)) -> Self {
        Self {
            session,
            query,
            page: 0,
            seen_ids: HashSet::new(),
            delay_ms,
            exhausted: false,
        }
    }

    /// Advance the cursor and return the next deduplicated page.
    ///
    /// Transient faults retry the current page up to `PAGE_RETRY_LIMIT`;
    /// after that the page is logged as degraded and the query ends early
    /// rather than aborting. Only `SessionLost` escapes.
    pub async fn next_page(&mut self) -> Result<ListPage, ScoutError> {
        if self.exhausted {
            return Ok(ListPage::default());
        }

        if self.page > 0 {
            jitter_delay(self.delay_ms.0, self.delay_ms.1).await;
        }

        let mut attempt = 0;
        loop {
            match self.session.search_page(&self.query, self.page).await {
                Ok(raw) => {
                    let postings: Vec<PostingSummary> = raw
                        .cards
                        .into_iter()
                        .filter(|card| self.seen_ids.insert(card.posting_id.clone()))
                        .collect();
                    debug!(
                        role = self.query.role.as_str(),
                        page = self.page,
                        postings = postings.len(),
                        has_more = raw.has_more,
                        "Results page extracted"
                    );
                    self.page += 1;
                    self.exhausted = !raw.has_more;
                    return Ok(ListPage {
                        postings,
                        has_more: raw.has_more,
                    });
                }
                Err(e) if e.is_session_lost() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= PAGE_RETRY_LIMIT {
                        warn!(
                            role = self.query.role.as_str(),
                            page = self.page,
                            error = %e,
                            "Results page degraded after retries; ending query early"
                        );
                        self.exhausted = true;
                        return Ok(ListPage::default());
                    }
                    debug!(
                        page = self.page,
                        attempt,
                        error = %e,
                        "Results page fault, retrying"
                    );
                }
            }
        }
    }

    /// Zero-based index of the next page to load.
    pub fn cursor(&self) -> u32 {
        self.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{card, query, MockSession};
    use jobscout_common::RawSearchPage;

    fn extractor(session: MockSession) -> PostingListExtractor {
        PostingListExtractor::new(Arc::new(session), query("data scientist"), (0, 0))
    }

    #[tokio::test]
    async fn dedups_within_and_across_pages() {
        let session = MockSession::new();
        session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("1", false), card("2", false), card("1", false)],
            has_more: true,
        }));
        session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("2", false), card("3", false)],
            has_more: false,
        }));

        let mut extractor = extractor(session);
        let first = extractor.next_page().await.unwrap();
        assert_eq!(
            first.postings.iter().map(|p| p.posting_id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert!(first.has_more);

        let second = extractor.next_page().await.unwrap();
        assert_eq!(
            second.postings.iter().map(|p| p.posting_id.as_str()).collect::<Vec<_>>(),
            vec!["3"]
        );
        assert!(!second.has_more);

        // Exhausted extractors keep returning empty pages.
        let third = extractor.next_page().await.unwrap();
        assert!(third.postings.is_empty());
        assert!(!third.has_more);
    }

    #[tokio::test]
    async fn stale_page_retries_then_degrades() {
        let session = MockSession::new();
        session.push_search_page(Err(ScoutError::ExtractionFault("stale card".into())));
        session.push_search_page(Err(ScoutError::ExtractionFault("stale card".into())));
        session.push_search_page(Err(ScoutError::ExtractionFault("stale card".into())));
        // Never consumed: the page degrades before a fourth attempt.
        session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("9", false)],
            has_more: false,
        }));

        let mut extractor = extractor(session);
        let page = extractor.next_page().await.unwrap();
        assert!(page.postings.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn recovers_when_retry_succeeds() {
        let session = MockSession::new();
        session.push_search_page(Err(ScoutError::ExtractionFault("stale card".into())));
        session.push_search_page(Ok(RawSearchPage {
            cards: vec![card("7", true)],
            has_more: false,
        }));

        let mut extractor = extractor(session);
        let page = extractor.next_page().await.unwrap();
        assert_eq!(page.postings.len(), 1);
        assert!(page.postings[0].previously_seen);
    }

    #[tokio::test]
    async fn session_lost_propagates() {
        let session = MockSession::new();
        session.push_search_page(Err(ScoutError::SessionLost("window gone".into())));

        let mut extractor = extractor(session);
        let err = extractor.next_page().await.unwrap_err();
        assert!(err.is_session_lost());
    }
}
