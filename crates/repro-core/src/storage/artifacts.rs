//! Per-job artifact persistence - scripts and screenshots
//!
//! Layout: `<data_dir>/artifacts/<job_id>/attempt_<n>.py`, screenshots
//! written by the sandboxed script as `*.png`, and a single `final.py` once
//! the job reaches a terminal state.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Filesystem-backed artifact store rooted at `<data_dir>/artifacts`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    artifacts_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            artifacts_dir: data_dir.as_ref().join("artifacts"),
        }
    }

    /// The artifact directory for a job, created on first use. This is the
    /// directory mounted read-write into the sandbox.
    pub fn job_dir(&self, job_id: &str) -> Result<PathBuf> {
        let dir = self.artifacts_dir.join(job_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Persist the script text for one attempt; returns the written path.
    pub fn save_attempt_script(&self, job_id: &str, attempt: u32, script: &str) -> Result<PathBuf> {
        let path = self.job_dir(job_id)?.join(format!("attempt_{attempt}.py"));
        fs::write(&path, script)?;
        Ok(path)
    }

    /// Persist the final reproduction script, written once at terminal state.
    pub fn save_final_script(&self, job_id: &str, script: &str) -> Result<PathBuf> {
        let path = self.job_dir(job_id)?.join("final.py");
        fs::write(&path, script)?;
        Ok(path)
    }

    /// Path to the final script if it has been written.
    pub fn final_script_path(&self, job_id: &str) -> Option<PathBuf> {
        let path = self.artifacts_dir.join(job_id).join("final.py");
        path.exists().then_some(path)
    }

    /// Screenshot file names for a job, sorted. Empty if none were captured.
    pub fn list_screenshots(&self, job_id: &str) -> Result<Vec<String>> {
        let dir = self.artifacts_dir.join(job_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".png"))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Resolve a screenshot by file name, rejecting anything that could step
    /// outside the job directory.
    pub fn screenshot_path(&self, job_id: &str, filename: &str) -> Option<PathBuf> {
        if filename.contains('/') || filename.contains("..") || !filename.ends_with(".png") {
            return None;
        }
        let path = self.artifacts_dir.join(job_id).join(filename);
        path.exists().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_scripts_are_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let first = store
            .save_attempt_script("job-1", 1, "print('a')")
            .unwrap();
        let second = store
            .save_attempt_script("job-1", 2, "print('b')")
            .unwrap();

        assert!(first.ends_with("attempt_1.py"));
        assert!(second.ends_with("attempt_2.py"));
        assert_eq!(fs::read_to_string(second).unwrap(), "print('b')");
    }

    #[test]
    fn test_final_script_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert!(store.final_script_path("job-1").is_none());
        store.save_final_script("job-1", "print('done')").unwrap();
        let path = store.final_script_path("job-1").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "print('done')");
    }

    #[test]
    fn test_screenshots_listed_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let job_dir = store.job_dir("job-1").unwrap();
        fs::write(job_dir.join("step_2.png"), b"png").unwrap();
        fs::write(job_dir.join("step_1.png"), b"png").unwrap();
        fs::write(job_dir.join("attempt_1.py"), b"code").unwrap();

        assert_eq!(
            store.list_screenshots("job-1").unwrap(),
            vec!["step_1.png", "step_2.png"]
        );
    }

    #[test]
    fn test_screenshot_path_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.job_dir("job-1").unwrap();

        assert!(store.screenshot_path("job-1", "../secrets.png").is_none());
        assert!(store.screenshot_path("job-1", "etc/passwd").is_none());
        assert!(store.screenshot_path("job-1", "missing.png").is_none());
    }
}
