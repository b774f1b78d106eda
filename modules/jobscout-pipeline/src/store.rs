//! Persistence sink: append-only CSV/JSON storage for accepted jobs,
//! outreach records and the company blocklist.
//!
//! The pipeline never edits or deletes persisted rows. A duplicate
//! posting_id append is logged and written anyway; history is cheap and the
//! operator-facing sheet is the source of truth for "what did we match".

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use jobscout_common::{AcceptedJob, BlocklistEntry, OutreachRecord, ScoutError};

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn append_accepted_job(&self, job: &AcceptedJob) -> Result<(), ScoutError>;

    async fn append_outreach_records(
        &self,
        records: &[OutreachRecord],
    ) -> Result<(), ScoutError>;

    /// Exact names and wildcard patterns, merged.
    async fn load_blocklist(&self) -> Result<Vec<String>, ScoutError>;

    async fn append_blocklist_entry(&self, entry: &BlocklistEntry) -> Result<(), ScoutError>;
}

const JOBS_HEADERS: [&str; 9] = [
    "ID",
    "Title",
    "Company",
    "Location",
    "Job URL",
    "Applicants",
    "Posted",
    "Accepted At",
    "Fit Score",
];

const CONNECTIONS_HEADERS: [&str; 7] = [
    "Date",
    "Name",
    "Title",
    "Profile URL",
    "Role Matched",
    "Action",
    "Page",
];

/// File-backed store: `jobs.csv` + `connections.csv` + a JSON blocklist.
pub struct CsvStore {
    jobs_file: PathBuf,
    connections_file: PathBuf,
    blocklist_file: PathBuf,
    /// Posting ids already written this process, for duplicate logging.
    seen_ids: Mutex<HashSet<String>>,
}

impl CsvStore {
    pub fn open(data_dir: &Path, blocklist_file: PathBuf) -> Result<Self, ScoutError> {
        fs::create_dir_all(data_dir)
            .map_err(|e| ScoutError::PersistenceFault(format!("Create data dir: {e}")))?;

        let jobs_file = data_dir.join("jobs.csv");
        let connections_file = data_dir.join("connections.csv");

        init_csv(&jobs_file, &JOBS_HEADERS)?;
        init_csv(&connections_file, &CONNECTIONS_HEADERS)?;

        let seen_ids = load_existing_ids(&jobs_file)?;
        info!(
            jobs = %jobs_file.display(),
            known_postings = seen_ids.len(),
            "CSV store opened"
        );

        Ok(Self {
            jobs_file,
            connections_file,
            blocklist_file,
            seen_ids: Mutex::new(seen_ids),
        })
    }

    fn append_rows(path: &Path, rows: &[Vec<String>]) -> Result<(), ScoutError> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| ScoutError::PersistenceFault(format!("Open {}: {e}", path.display())))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| ScoutError::PersistenceFault(format!("Write row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| ScoutError::PersistenceFault(format!("Flush {}: {e}", path.display())))
    }

    fn read_blocklist_file(&self) -> Result<BlocklistFile, ScoutError> {
        if !self.blocklist_file.exists() {
            return Ok(BlocklistFile::default());
        }
        let raw = fs::read_to_string(&self.blocklist_file).map_err(|e| {
            ScoutError::PersistenceFault(format!(
                "Read {}: {e}",
                self.blocklist_file.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ScoutError::PersistenceFault(format!(
                "Parse {}: {e}",
                self.blocklist_file.display()
            ))
        })
    }
}

/// On-disk blocklist shape: auto-grown exact entries keep their timestamp,
/// hand-curated wildcard patterns are bare strings.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct BlocklistFile {
    #[serde(default)]
    blocklist: Vec<BlocklistEntry>,
    #[serde(default)]
    patterns: Vec<String>,
}

#[async_trait]
impl JobStore for CsvStore {
    async fn append_accepted_job(&self, job: &AcceptedJob) -> Result<(), ScoutError> {
        {
            let mut seen = self.seen_ids.lock().expect("seen_ids lock");
            if !seen.insert(job.detail.posting_id.clone()) {
                warn!(
                    posting_id = job.detail.posting_id.as_str(),
                    "Duplicate posting_id appended to jobs.csv"
                );
            }
        }

        let row = vec![
            job.detail.posting_id.clone(),
            job.detail.title.clone(),
            job.detail.company.clone(),
            job.detail.location.clone(),
            job.detail.canonical_url.clone(),
            job.detail.applicant_count.to_string(),
            job.detail.posted_time.clone(),
            job.accepted_at.to_rfc3339(),
            job.fit_score.map(|s| format!("{s:.1}")).unwrap_or_default(),
        ];
        Self::append_rows(&self.jobs_file, &[row])?;
        debug!(
            posting_id = job.detail.posting_id.as_str(),
            company = job.detail.company.as_str(),
            "Accepted job persisted"
        );
        Ok(())
    }

    async fn append_outreach_records(
        &self,
        records: &[OutreachRecord],
    ) -> Result<(), ScoutError> {
        if records.is_empty() {
            return Ok(());
        }
        let now = Utc::now().to_rfc3339();
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|r| {
                vec![
                    now.clone(),
                    r.person_name.clone(),
                    r.person_title.clone(),
                    r.profile_url.clone(),
                    r.role_matched.to_string(),
                    r.action_taken.as_str().to_string(),
                    r.page_number.to_string(),
                ]
            })
            .collect();
        Self::append_rows(&self.connections_file, &rows)
    }

    async fn load_blocklist(&self) -> Result<Vec<String>, ScoutError> {
        let file = self.read_blocklist_file()?;
        let mut patterns: Vec<String> = file.blocklist.into_iter().map(|e| e.pattern).collect();
        patterns.extend(file.patterns);
        Ok(patterns)
    }

    async fn append_blocklist_entry(&self, entry: &BlocklistEntry) -> Result<(), ScoutError> {
        let mut file = self.read_blocklist_file()?;
        if file
            .blocklist
            .iter()
            .map(|e| e.pattern.as_str())
            .chain(file.patterns.iter().map(String::as_str))
            .any(|p| p.eq_ignore_ascii_case(&entry.pattern))
        {
            return Ok(());
        }
        file.blocklist.push(entry.clone());
        file.blocklist.sort_by_key(|e| e.pattern.to_lowercase());

        let raw = serde_json::to_string_pretty(&file)
            .map_err(|e| ScoutError::PersistenceFault(format!("Serialize blocklist: {e}")))?;
        if let Some(parent) = self.blocklist_file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ScoutError::PersistenceFault(format!("Create blocklist dir: {e}")))?;
        }
        fs::write(&self.blocklist_file, raw).map_err(|e| {
            ScoutError::PersistenceFault(format!(
                "Write {}: {e}",
                self.blocklist_file.display()
            ))
        })?;
        info!(pattern = entry.pattern.as_str(), "Blocklist entry persisted");
        Ok(())
    }
}

fn init_csv(path: &Path, headers: &[&str]) -> Result<(), ScoutError> {
    if path.exists() {
        return Ok(());
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .map_err(|e| ScoutError::PersistenceFault(format!("Create {}: {e}", path.display())))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(headers)
        .map_err(|e| ScoutError::PersistenceFault(format!("Write headers: {e}")))?;
    writer
        .flush()
        .map_err(|e| ScoutError::PersistenceFault(format!("Flush {}: {e}", path.display())))
}

fn load_existing_ids(path: &Path) -> Result<HashSet<String>, ScoutError> {
    let mut ids = HashSet::new();
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| ScoutError::PersistenceFault(format!("Read {}: {e}", path.display())))?;
    for record in reader.records() {
        let record =
            record.map_err(|e| ScoutError::PersistenceFault(format!("Read row: {e}")))?;
        if let Some(id) = record.get(0) {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::accepted_job;

    #[tokio::test]
    async fn accepted_jobs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path(), dir.path().join("blocklist.json")).unwrap();

        let job = accepted_job("4201", "Acme Corp", 8.5);
        store.append_accepted_job(&job).await.unwrap();

        let contents = fs::read_to_string(dir.path().join("jobs.csv")).unwrap();
        assert!(contents.contains("4201"));
        assert!(contents.contains("Acme Corp"));
        assert!(contents.contains("8.5"));
    }

    #[tokio::test]
    async fn duplicate_posting_id_is_appended_not_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path(), dir.path().join("blocklist.json")).unwrap();

        let job = accepted_job("4201", "Acme Corp", 8.5);
        store.append_accepted_job(&job).await.unwrap();
        store.append_accepted_job(&job).await.unwrap();

        let contents = fs::read_to_string(dir.path().join("jobs.csv")).unwrap();
        assert_eq!(contents.matches("4201").count(), 2);
    }

    #[tokio::test]
    async fn blocklist_appends_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path(), dir.path().join("blocklist.json")).unwrap();

        assert!(store.load_blocklist().await.unwrap().is_empty());

        store.append_blocklist_entry(&entry("Staffing Inc")).await.unwrap();
        store.append_blocklist_entry(&entry("Lensa")).await.unwrap();
        // Case-insensitive duplicate is a no-op.
        store.append_blocklist_entry(&entry("staffing inc")).await.unwrap();

        let patterns = store.load_blocklist().await.unwrap();
        assert_eq!(patterns, vec!["Lensa".to_string(), "Staffing Inc".to_string()]);
    }

    fn entry(pattern: &str) -> jobscout_common::BlocklistEntry {
        jobscout_common::BlocklistEntry {
            pattern: pattern.to_string(),
            added_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn outreach_records_written_with_action_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::open(dir.path(), dir.path().join("blocklist.json")).unwrap();

        let records = vec![jobscout_common::OutreachRecord {
            person_name: "Jordan Smith".to_string(),
            person_title: "Senior Data Scientist".to_string(),
            profile_url: "https://example.com/in/jordan".to_string(),
            role_matched: true,
            action_taken: jobscout_common::OutreachAction::ConnectSent,
            page_number: 1,
        }];
        store.append_outreach_records(&records).await.unwrap();

        let contents = fs::read_to_string(dir.path().join("connections.csv")).unwrap();
        assert!(contents.contains("Jordan Smith"));
        assert!(contents.contains("connect_sent"));
    }
}
