//! Company blocklist: exact and `*`-wildcard matching, append-only growth.
//!
//! Entries are loaded once per cycle through the store and grow when the HR
//! stage flags a staffing firm. There is no edit or delete path.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info};

use jobscout_common::{BlocklistEntry, ScoutError};

use crate::store::JobStore;

pub struct Blocklist {
    store: Arc<dyn JobStore>,
    exact: Mutex<Vec<String>>,
    /// (original glob text, compiled matcher)
    patterns: Mutex<Vec<(String, Regex)>>,
}

impl Blocklist {
    /// Load the persisted entries. Patterns containing `*` compile to
    /// anchored globs; everything else matches exactly, case-insensitive.
    pub async fn load(store: Arc<dyn JobStore>) -> Result<Self, ScoutError> {
        let entries = store.load_blocklist().await?;
        let mut exact = Vec::new();
        let mut patterns = Vec::new();
        for entry in entries {
            if entry.contains('*') {
                match compile_glob(&entry) {
                    Some(re) => patterns.push((entry, re)),
                    None => debug!(pattern = entry.as_str(), "Ignoring invalid blocklist pattern"),
                }
            } else {
                exact.push(entry);
            }
        }
        info!(
            exact = exact.len(),
            patterns = patterns.len(),
            "Blocklist loaded"
        );
        Ok(Self {
            store,
            exact: Mutex::new(exact),
            patterns: Mutex::new(patterns),
        })
    }

    /// Returns the matched entry when the company is blocked.
    pub fn is_blocked(&self, company: &str) -> Option<String> {
        let name = company.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(hit) = self
            .exact
            .lock()
            .expect("blocklist lock")
            .iter()
            .find(|e| e.eq_ignore_ascii_case(name))
        {
            return Some(hit.clone());
        }
        self.patterns
            .lock()
            .expect("blocklist lock")
            .iter()
            .find(|(_, re)| re.is_match(name))
            .map(|(glob, _)| glob.clone())
    }

    /// Append a company, in memory and through the store. Returns false when
    /// the name was already covered.
    pub async fn add(&self, company: &str) -> Result<bool, ScoutError> {
        let name = company.trim();
        if name.is_empty() || self.is_blocked(name).is_some() {
            return Ok(false);
        }
        self.exact
            .lock()
            .expect("blocklist lock")
            .push(name.to_string());
        let entry = BlocklistEntry {
            pattern: name.to_string(),
            added_at: Utc::now(),
        };
        self.store.append_blocklist_entry(&entry).await?;
        info!(company = name, "Company added to blocklist");
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.exact.lock().expect("blocklist lock").len()
            + self.patterns.lock().expect("blocklist lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `*` globs to an anchored, case-insensitive regex. Literal segments are
/// escaped, so entry text can never inject regex syntax.
fn compile_glob(pattern: &str) -> Option<Regex> {
    let body: String = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    regex::RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .build()
        .ok()
}
