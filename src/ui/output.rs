use crate::job::{JobInfo, JobStatus};
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::DATABASE, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

/// A job status colored by outcome
pub fn job_status(status: JobStatus) -> String {
    status.as_str().style(theme().for_status(status)).to_string()
}

/// One line naming a failed job and the log it last wrote
pub fn failed_job(job: &JobInfo) -> String {
    let label = format!("job {} ({}) failed", job.job_id, job.job_key);
    let log = if job.last_fail_log_file.is_empty() { "no log recorded" } else { job.last_fail_log_file.as_str() };
    format!("{} {} {}", Icons::CROSS, label.style(theme().error.clone()), dim(log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobEntry;
    use uuid::Uuid;

    fn failed(log: &str) -> JobInfo {
        let job = JobEntry::new(3, "Compile", 0, "pc", Uuid::nil(), JobStatus::Failed, 1);
        let mut info = JobInfo::from_job(job, "rock.png".into(), "/project".into());
        info.job_id = 7;
        info.last_fail_log_file = log.into();
        info
    }

    #[test]
    fn test_failed_job_names_the_log() {
        let line = failed_job(&failed("logs/compile-7.log"));
        assert!(line.starts_with(Icons::CROSS));
        assert!(line.contains("job 7 (Compile) failed"));
        assert!(line.contains("logs/compile-7.log"));

        assert!(failed_job(&failed("")).contains("no log recorded"));
    }
}
