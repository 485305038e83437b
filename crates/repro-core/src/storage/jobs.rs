//! Job document store - one JSON file per job with atomic writes
//!
//! Writes go through a temp file and rename so a concurrent reader never sees
//! a torn document. A reader may still observe a `processing` status with
//! partial history mid-run; statuses are monotonic, so that race is accepted.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::JobRecord;

/// Filesystem-backed job store rooted at `<data_dir>/jobs`.
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs_dir: PathBuf,
}

impl JobStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            jobs_dir: data_dir.as_ref().join("jobs"),
        }
    }

    /// Atomically persist a job document.
    pub fn save(&self, record: &JobRecord) -> Result<()> {
        fs::create_dir_all(&self.jobs_dir)?;
        let target = self.path(&record.job_id);
        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Load a job by ID. Returns `None` if it was never persisted.
    pub fn load(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let path = self.path(job_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// All persisted jobs, in directory order.
    pub fn list(&self) -> Result<Vec<JobRecord>> {
        fs::create_dir_all(&self.jobs_dir)?;
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.jobs_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                let raw = fs::read_to_string(&path)?;
                records.push(serde_json::from_str(&raw)?);
            }
        }
        Ok(records)
    }

    fn path(&self, job_id: &str) -> PathBuf {
        self.jobs_dir.join(format!("{job_id}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path());

        let record = JobRecord::processing("job-1", "report", "http://example.com", 5);
        store.save(&record).unwrap();

        let loaded = store.load("job-1").unwrap().unwrap();
        assert_eq!(loaded.job_id, "job-1");
        assert_eq!(loaded.status, JobStatus::Processing);
        assert_eq!(loaded.max_attempts, 5);
    }

    #[test]
    fn test_load_missing_job_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path());
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path());

        let mut record = JobRecord::processing("job-1", "report", "http://example.com", 5);
        store.save(&record).unwrap();
        record.status = JobStatus::Done;
        record.success = true;
        store.save(&record).unwrap();

        let loaded = store.load("job-1").unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Done);
        assert!(loaded.success);
    }

    #[test]
    fn test_no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path());
        store
            .save(&JobRecord::processing("job-1", "r", "http://example.com", 3))
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("jobs"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_list_returns_all_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path());
        for id in ["a", "b", "c"] {
            store
                .save(&JobRecord::processing(id, "r", "http://example.com", 3))
                .unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 3);
    }
}
