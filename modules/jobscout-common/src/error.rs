use thiserror::Error;

/// Fault taxonomy for the pipeline. Variants carry a short human-readable
/// context string; structured detail goes to the log at the absorption site.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Transient DOM/session hiccup (stale element). Retryable without delay.
    #[error("Extraction fault: {0}")]
    ExtractionFault(String),

    /// Page or element load timed out. Retryable with backoff.
    #[error("Extraction timed out: {0}")]
    ExtractionTimeout(String),

    /// One posting gave up after exhausting retries. Non-fatal to the cycle.
    /// Judge faults never appear here: the filter stages absorb them with
    /// their fail-open/fail-closed defaults.
    #[error("Posting skipped: {0}")]
    PostingSkipped(String),

    /// The browsing session is gone. Fatal to the current cycle only.
    #[error("Session lost: {0}")]
    SessionLost(String),

    /// A persistence append failed after local retry.
    #[error("Persistence fault: {0}")]
    PersistenceFault(String),

    /// Resume or preferences document missing.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScoutError {
    /// True when the fault must abort the whole cycle rather than one posting.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, ScoutError::SessionLost(_))
    }
}
