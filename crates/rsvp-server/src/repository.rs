use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rsvp_core::domain::{RsvpSubmission, SubmitOutcome, SubmitterMetadata};
use rsvp_core::rules::RsvpCounts;
use rsvp_store::error::StoreError;
use rsvp_store::repo::RsvpSummary;
use rsvp_store::{Store, StoreOptions};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
    #[error("storage worker failed: {0}")]
    Worker(String),
}

/// Async handle over the database file. Each call opens its own connection
/// on the blocking pool, so readers never queue behind a writer; the unique
/// name index keeps concurrent submissions consistent. Callers stop waiting
/// once `timeout` elapses.
#[derive(Clone)]
pub struct RsvpRepository {
    db_path: Arc<PathBuf>,
    options: StoreOptions,
    timeout: Duration,
}

impl RsvpRepository {
    /// Lock waits inside SQLite share the caller's timeout.
    pub fn new(db_path: PathBuf, timeout: Duration) -> Self {
        Self::with_options(db_path, StoreOptions { busy_timeout: timeout }, timeout)
    }

    pub fn with_options(db_path: PathBuf, options: StoreOptions, timeout: Duration) -> Self {
        Self {
            db_path: Arc::new(db_path),
            options,
            timeout,
        }
    }

    pub async fn submit(
        &self,
        now_utc: DateTime<Utc>,
        submission: RsvpSubmission,
        metadata: SubmitterMetadata,
    ) -> Result<SubmitOutcome, RepositoryError> {
        self.run(move |store| store.rsvps().submit(now_utc, &submission, &metadata))
            .await
    }

    pub async fn list_all(&self) -> Result<RsvpSummary, RepositoryError> {
        self.run(|store| store.rsvps().summary()).await
    }

    pub async fn stats(&self) -> Result<RsvpCounts, RepositoryError> {
        self.run(|store| store.rsvps().counts()).await
    }

    async fn run<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = Arc::clone(&self.db_path);
        let options = self.options;
        let task = tokio::task::spawn_blocking(move || {
            let store = Store::open_with(&db_path, options)?;
            op(&store)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(RepositoryError::Store),
            Ok(Err(join_err)) => Err(RepositoryError::Worker(join_err.to_string())),
            Err(_) => Err(RepositoryError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RepositoryError, RsvpRepository};
    use rsvp_core::domain::{RsvpSubmission, SubmitterMetadata};
    use rsvp_core::time::now_utc;
    use rsvp_store::{Store, StoreOptions};
    use std::time::Duration;
    use tempfile::TempDir;

    fn migrated_file() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("rsvp.sqlite3");
        Store::open(&path).expect("open").migrate().expect("migrate");
        (dir, path)
    }

    #[tokio::test]
    async fn write_blocked_past_timeout_reports_timeout() {
        let (_dir, path) = migrated_file();
        let repo = RsvpRepository::with_options(
            path.clone(),
            StoreOptions {
                busy_timeout: Duration::from_secs(2),
            },
            Duration::from_millis(50),
        );
        let holder = Store::open(&path).expect("open holder");
        holder
            .connection()
            .execute_batch("BEGIN IMMEDIATE;")
            .expect("take write lock");

        let submission = RsvpSubmission::new("Ann", true, None).expect("valid");
        let err = repo
            .submit(now_utc(), submission, SubmitterMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Timeout(_)), "{err}");

        let counts = repo.stats().await.expect("stats while write lock held");
        assert_eq!(counts.total, 0);

        holder.connection().execute_batch("ROLLBACK;").expect("release");

        // The abandoned write still completes once the lock is free.
        for _ in 0..100 {
            if repo.stats().await.expect("stats").total == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("abandoned write never landed");
    }

    #[tokio::test]
    async fn writes_are_visible_to_later_calls() {
        let (_dir, path) = migrated_file();
        let repo = RsvpRepository::new(path, Duration::from_secs(5));
        let submission = RsvpSubmission::new("Ann", true, None).expect("valid");
        repo.submit(now_utc(), submission, SubmitterMetadata::default())
            .await
            .expect("submit");

        let summary = repo.list_all().await.expect("list");
        assert_eq!(summary.records.len(), 1);
        assert_eq!(repo.stats().await.expect("stats"), summary.counts);
    }
}
