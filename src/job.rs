//! Jobs - one build attempt of a source for one platform
//!
//! A job is keyed by its source, job key, platform and builder. Its status
//! moves through `Queued` → `InProgress` → `Completed` / `Failed`, and the
//! log fields record where the first and latest failures were written.

use crate::entry::NO_ID;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Processing status of a job.
///
/// `Any` is never stored; it only appears in query filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Any,
    #[default]
    Queued,
    InProgress,
    Failed,
    FailedInvalidSourceNameExceedsMaxLimit,
    Completed,
    Missing,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Any => "any",
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Failed => "failed",
            JobStatus::FailedInvalidSourceNameExceedsMaxLimit => "failed_invalid_source_name",
            JobStatus::Completed => "completed",
            JobStatus::Missing => "missing",
        }
    }

    /// On-disk integer value
    pub fn as_i32(&self) -> i32 {
        match self {
            JobStatus::Any => -1,
            JobStatus::Queued => 0,
            JobStatus::InProgress => 1,
            JobStatus::Failed => 2,
            JobStatus::FailedInvalidSourceNameExceedsMaxLimit => 3,
            JobStatus::Completed => 4,
            JobStatus::Missing => 5,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.as_i32() == value)
    }

    /// Every status including the `Any` wildcard
    pub fn all() -> &'static [JobStatus] {
        &[
            JobStatus::Any,
            JobStatus::Queued,
            JobStatus::InProgress,
            JobStatus::Failed,
            JobStatus::FailedInvalidSourceNameExceedsMaxLimit,
            JobStatus::Completed,
            JobStatus::Missing,
        ]
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::FailedInvalidSourceNameExceedsMaxLimit)
    }
}

impl FromStr for JobStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" | "*" => Ok(JobStatus::Any),
            "queued" | "pending" => Ok(JobStatus::Queued),
            "in_progress" | "inprogress" | "running" => Ok(JobStatus::InProgress),
            "failed" | "fail" => Ok(JobStatus::Failed),
            "failed_invalid_source_name" => Ok(JobStatus::FailedInvalidSourceNameExceedsMaxLimit),
            "completed" | "complete" | "done" => Ok(JobStatus::Completed),
            "missing" => Ok(JobStatus::Missing),
            _ => Err(crate::Error::Parse(format!("Unknown job status: {}", s))),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the `Jobs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEntry {
    pub job_id: i64,
    pub source_pk: i64,
    /// Logical grouping name chosen by the builder
    pub job_key: String,
    /// Hash of the inputs, used to decide staleness
    pub fingerprint: u32,
    pub platform: String,
    pub builder_guid: Uuid,
    pub status: JobStatus,
    /// Groups the jobs created by one processing pass
    pub job_run_key: u64,
    pub first_fail_log_time: i64,
    pub first_fail_log_file: String,
    pub last_fail_log_time: i64,
    pub last_fail_log_file: String,
    pub last_log_time: i64,
    pub last_log_file: String,
}

impl JobEntry {
    /// Create a job for insertion (id is assigned by the database)
    pub fn new(
        source_pk: i64,
        job_key: impl Into<String>,
        fingerprint: u32,
        platform: impl Into<String>,
        builder_guid: Uuid,
        status: JobStatus,
        job_run_key: u64,
    ) -> Self {
        Self {
            job_id: NO_ID,
            source_pk,
            job_key: job_key.into(),
            fingerprint,
            platform: platform.into(),
            builder_guid,
            status,
            job_run_key,
            first_fail_log_time: 0,
            first_fail_log_file: String::new(),
            last_fail_log_time: 0,
            last_fail_log_file: String::new(),
            last_log_time: 0,
            last_log_file: String::new(),
        }
    }

    /// Record a failure log; the first one is kept, the last one is replaced
    pub fn with_fail_log(mut self, time: i64, file: impl Into<String>) -> Self {
        let file = file.into();
        if self.first_fail_log_time == 0 && self.first_fail_log_file.is_empty() {
            self.first_fail_log_time = time;
            self.first_fail_log_file = file.clone();
        }
        self.last_fail_log_time = time;
        self.last_fail_log_file = file;
        self
    }

    pub fn with_last_log(mut self, time: i64, file: impl Into<String>) -> Self {
        self.last_log_time = time;
        self.last_log_file = file.into();
        self
    }
}

// Identity is everything but the row id
impl PartialEq for JobEntry {
    fn eq(&self, other: &Self) -> bool {
        self.source_pk == other.source_pk
            && self.job_key == other.job_key
            && self.fingerprint == other.fingerprint
            && self.platform == other.platform
            && self.builder_guid == other.builder_guid
            && self.status == other.status
            && self.job_run_key == other.job_run_key
            && self.first_fail_log_time == other.first_fail_log_time
            && self.first_fail_log_file == other.first_fail_log_file
            && self.last_fail_log_time == other.last_fail_log_time
            && self.last_fail_log_file == other.last_fail_log_file
            && self.last_log_time == other.last_log_time
            && self.last_log_file == other.last_log_file
    }
}

impl Eq for JobEntry {}

impl std::fmt::Display for JobEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "job {} source:{} key:{} fingerprint:{} platform:{} builder:{} status:{}",
            self.job_id,
            self.source_pk,
            self.job_key,
            self.fingerprint,
            self.platform,
            self.builder_guid.braced(),
            self.status
        )
    }
}

/// Flattened source + job view handed to schedulers and editors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub job_id: i64,
    /// Source name relative to its scan folder
    pub source_file: String,
    /// Absolute path of the owning scan folder
    pub watch_folder: String,
    pub platform: String,
    pub builder_guid: Uuid,
    pub job_key: String,
    pub status: JobStatus,
    pub job_run_key: u64,
    pub first_fail_log_time: i64,
    pub first_fail_log_file: String,
    pub last_fail_log_time: i64,
    pub last_fail_log_file: String,
    pub last_log_time: i64,
    pub last_log_file: String,
}

impl JobInfo {
    pub fn from_job(job: JobEntry, source_file: String, watch_folder: String) -> Self {
        Self {
            job_id: job.job_id,
            source_file,
            watch_folder,
            platform: job.platform,
            builder_guid: job.builder_guid,
            job_key: job.job_key,
            status: job.status,
            job_run_key: job.job_run_key,
            first_fail_log_time: job.first_fail_log_time,
            first_fail_log_file: job.first_fail_log_file,
            last_fail_log_time: job.last_fail_log_time,
            last_fail_log_file: job.last_fail_log_file,
            last_log_time: job.last_log_time,
            last_log_file: job.last_log_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_roundtrip() {
        for status in JobStatus::all() {
            assert_eq!(JobStatus::from_i32(status.as_i32()), Some(*status));
            let parsed: JobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
        assert_eq!(JobStatus::from_i32(42), None);
    }

    #[test]
    fn test_job_status_aliases() {
        assert_eq!("pending".parse::<JobStatus>().unwrap(), JobStatus::Queued);
        assert_eq!("DONE".parse::<JobStatus>().unwrap(), JobStatus::Completed);
        assert!("exploded".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_equality_ignores_id() {
        let builder = Uuid::new_v4();
        let mut a = JobEntry::new(1, "compile", 1234, "pc", builder, JobStatus::Completed, 7);
        let b = a.clone();
        a.job_id = 99;
        assert_eq!(a, b);

        let c = b.clone().with_last_log(5, "log.txt");
        assert_ne!(b, c);
    }

    #[test]
    fn test_fail_log_keeps_first() {
        let job = JobEntry::new(1, "compile", 0, "pc", Uuid::nil(), JobStatus::Failed, 1)
            .with_fail_log(10, "first.log")
            .with_fail_log(20, "second.log");

        assert_eq!(job.first_fail_log_time, 10);
        assert_eq!(job.first_fail_log_file, "first.log");
        assert_eq!(job.last_fail_log_time, 20);
        assert_eq!(job.last_fail_log_file, "second.log");
    }
}
