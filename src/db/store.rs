use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Local;

use crate::error::{AppError, Result};
use crate::models::{filter_by_recency, Record};

use super::repository::Repository;

/// Where a [`LocalStore`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Unopened,
    Opening,
    Ready,
}

enum Slot {
    Unopened,
    Opening,
    Ready(Repository),
}

/// Named, versioned store living at `<dir>/<name>.db`.
///
/// Reads and writes are only accepted once [`open`](Self::open) has
/// completed; until then, and again after [`reset`](Self::reset), they fail
/// with [`AppError::StoreNotReady`].
pub struct LocalStore {
    name: String,
    dir: PathBuf,
    slot: Mutex<Slot>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            slot: Mutex::new(Slot::Unopened),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.db", self.name))
    }

    pub fn state(&self) -> StoreState {
        match *self.lock() {
            Slot::Unopened => StoreState::Unopened,
            Slot::Opening => StoreState::Opening,
            Slot::Ready(_) => StoreState::Ready,
        }
    }

    /// Version the store was opened at, once ready.
    pub fn version(&self) -> Option<u32> {
        match &*self.lock() {
            Slot::Ready(repo) => Some(repo.version()),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the store at `target_version`, upgrading it first if the file
    /// on disk is older. Opening a store that is already ready is a no-op.
    pub async fn open(&self, target_version: u32) -> Result<u32> {
        {
            let mut slot = self.lock();
            match &*slot {
                Slot::Ready(repo) => return Ok(repo.version()),
                Slot::Opening => return Err(AppError::StoreNotReady),
                Slot::Unopened => *slot = Slot::Opening,
            }
        }

        let opened = self.open_repository(target_version).await;

        let mut slot = self.lock();
        match opened {
            Ok(repo) => {
                let version = repo.version();
                *slot = Slot::Ready(repo);
                Ok(version)
            }
            Err(e) => {
                *slot = Slot::Unopened;
                Err(e)
            }
        }
    }

    async fn open_repository(&self, target_version: u32) -> Result<Repository> {
        if self.dir.exists() && !self.dir.is_dir() {
            return Err(anyhow::anyhow!(
                "Store location {} is not a directory",
                self.dir.display()
            )
            .into());
        }
        std::fs::create_dir_all(&self.dir)?;
        Repository::open(self.path(), target_version).await
    }

    fn repository(&self) -> Result<Repository> {
        match &*self.lock() {
            Slot::Ready(repo) => Ok(repo.clone()),
            _ => Err(AppError::StoreNotReady),
        }
    }

    pub async fn insert<R: Record>(&self, payload: impl Into<String>) -> Result<R> {
        let record = self.repository()?.insert::<R>(payload.into()).await?;
        tracing::debug!("Saved {} #{}", R::COLLECTION, record.id());
        Ok(record)
    }

    pub async fn read_all<R: Record>(&self) -> Result<Vec<R>> {
        self.repository()?.read_all().await
    }

    /// Records created `days_ago` days before today, compared by
    /// day-of-month only in local time.
    #[allow(dead_code)]
    pub async fn filter_by_recency<R: Record>(&self, days_ago: i64) -> Result<Vec<R>> {
        let records = self.read_all::<R>().await?;
        Ok(filter_by_recency(records, &Local::now(), days_ago))
    }

    /// Collections present on disk with their record counts.
    pub async fn summary(&self) -> Result<Vec<(String, i64)>> {
        let repo = self.repository()?;
        let present = repo.collection_names().await?;
        let mut summary = Vec::new();
        for collection in super::Collection::ALL {
            if present.iter().any(|name| name == collection.name()) {
                summary.push((collection.name().to_string(), repo.count(collection).await?));
            }
        }
        Ok(summary)
    }

    /// Secondary indexes present on disk.
    pub async fn index_names(&self) -> Result<Vec<String>> {
        self.repository()?.index_names().await
    }

    /// Deletes the whole store from disk and goes back to `Unopened`.
    pub async fn reset(&self) -> Result<()> {
        let previous = {
            let mut slot = self.lock();
            if matches!(*slot, Slot::Opening) {
                return Err(AppError::StoreNotReady);
            }
            std::mem::replace(&mut *slot, Slot::Unopened)
        };
        if let Slot::Ready(repo) = previous {
            repo.close().await?;
        }

        let path = self.path();
        for file in store_files(&path) {
            match std::fs::remove_file(&file) {
                Ok(()) => tracing::debug!("Removed {}", file.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!("Deleted store {}", path.display());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn ready_repository(&self) -> Result<Repository> {
        self.repository()
    }
}

/// The database file plus the companions SQLite may leave next to it.
fn store_files(path: &Path) -> Vec<PathBuf> {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}
