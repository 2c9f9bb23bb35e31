//! Login audit trail.
//!
//! One line per attempt, `<YYYY-mm-dd HH:MM:SS>   <ip>   <success|failed>`,
//! in local time. Audit I/O never fails a login; errors are logged and
//! swallowed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeDelta};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginResult {
    Success,
    Failed,
}

impl LoginResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginResult::Success => "success",
            LoginResult::Failed => "failed",
        }
    }
}

/// Append-only login log file.
pub struct LoginLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LoginLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::error!(dir = %dir.display(), error = %e, "Failed to create login log directory");
            }
        }
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one attempt.
    pub async fn record(&self, ip: &str, result: LoginResult) {
        let line = format!(
            "{}   {}   {}\n",
            Local::now().format(TIMESTAMP_FORMAT),
            ip,
            result.as_str()
        );
        match self.append(&line).await {
            Ok(()) => tracing::info!(client_ip = ip, result = result.as_str(), "Login attempt logged"),
            Err(e) => tracing::error!(error = %e, "Failed to log login attempt"),
        }
    }

    async fn append(&self, line: &str) -> io::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    async fn read_lines(&self) -> Vec<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read login logs");
                Vec::new()
            }
        }
    }

    /// The most recent `limit` entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<String> {
        let lines = self.read_lines().await;
        let skip = lines.len().saturating_sub(limit);
        lines.into_iter().skip(skip).rev().collect()
    }

    /// Failed attempts in the last `hours`, optionally for one IP.
    pub async fn failed_attempts(&self, ip: Option<&str>, hours: i64) -> usize {
        self.failed_attempts_at(ip, hours, Local::now().naive_local()).await
    }

    async fn failed_attempts_at(&self, ip: Option<&str>, hours: i64, now: NaiveDateTime) -> usize {
        let cutoff = now - TimeDelta::hours(hours);
        self.read_lines()
            .await
            .iter()
            .filter_map(|line| parse_line(line))
            .filter(|entry| entry.at >= cutoff)
            .filter(|entry| ip.map_or(true, |wanted| entry.ip == wanted))
            .filter(|entry| entry.result == "failed")
            .count()
    }
}

struct ParsedEntry<'a> {
    at: NaiveDateTime,
    ip: &'a str,
    result: &'a str,
}

fn parse_line(line: &str) -> Option<ParsedEntry<'_>> {
    let mut parts = line.split_whitespace();
    let (date, time, ip, result) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    let at = NaiveDateTime::parse_from_str(&format!("{date} {time}"), TIMESTAMP_FORMAT).ok()?;
    Some(ParsedEntry { at, ip, result })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_in(dir: &tempfile::TempDir) -> LoginLog {
        LoginLog::new(dir.path().join("nested").join("login.txt"))
    }

    #[tokio::test]
    async fn records_are_returned_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        log.record("10.0.0.1", LoginResult::Failed).await;
        log.record("10.0.0.2", LoginResult::Success).await;
        log.record("10.0.0.3", LoginResult::Failed).await;

        let recent = log.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert!(recent[0].contains("10.0.0.3"));
        assert!(recent[1].ends_with("10.0.0.2   success"));
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        assert!(log.recent(10).await.is_empty());
        assert_eq!(log.failed_attempts(None, 24).await, 0);
    }

    #[tokio::test]
    async fn failed_attempts_respect_ip_and_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("login.txt");
        fs::write(
            &path,
            "2024-05-01 09:00:00   10.0.0.1   failed\n\
             2024-05-01 11:30:00   10.0.0.1   failed\n\
             2024-05-01 11:45:00   10.0.0.2   failed\n\
             2024-05-01 11:50:00   10.0.0.1   success\n\
             garbage line\n",
        )
        .unwrap();
        let log = LoginLog::new(&path);
        let now = NaiveDateTime::parse_from_str("2024-05-01 12:00:00", TIMESTAMP_FORMAT).unwrap();

        assert_eq!(log.failed_attempts_at(None, 1, now).await, 2);
        assert_eq!(log.failed_attempts_at(Some("10.0.0.1"), 1, now).await, 1);
        assert_eq!(log.failed_attempts_at(Some("10.0.0.1"), 24, now).await, 2);
    }
}
