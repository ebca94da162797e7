use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row, Transaction, TransactionBehavior};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::Record;

use super::schema::{self, Collection};

/// Result of comparing the persisted version with the requested one.
enum OpenOutcome {
    Unchanged,
    Upgraded { from: u32 },
    Downgrade { current: u32 },
}

/// An open, fully upgraded store file.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
    version: u32,
}

impl Repository {
    /// Opens `path` at `target_version`, running the built-in migration table
    /// as the upgrade pass.
    pub async fn open(path: impl AsRef<Path>, target_version: u32) -> Result<Self> {
        if target_version == 0 || schema::migration_for(target_version).is_none() {
            return Err(AppError::UnknownSchemaVersion(target_version));
        }
        Self::open_with(path, target_version, schema::apply_migrations).await
    }

    /// Opens `path` at `target_version` with a caller-supplied upgrade pass.
    ///
    /// `upgrade(tx, current, target)` runs at most once, only when the
    /// persisted version is below `target_version`, inside the same
    /// transaction that records the new version.
    pub async fn open_with<F>(
        path: impl AsRef<Path>,
        target_version: u32,
        upgrade: F,
    ) -> Result<Self>
    where
        F: FnOnce(&Transaction<'_>, u32, u32) -> rusqlite::Result<()> + Send + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).await?;

        let outcome = conn
            .call(move |conn| {
                // Immediate takes the write lock before reading the version, so
                // two openers of the same file cannot both run the upgrade.
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let current = read_user_version(&tx)?;
                if current > target_version {
                    return Ok(OpenOutcome::Downgrade { current });
                }
                if current == target_version {
                    return Ok(OpenOutcome::Unchanged);
                }

                upgrade(&tx, current, target_version)?;
                tx.pragma_update(None, "user_version", target_version)?;
                tx.commit()?;
                Ok(OpenOutcome::Upgraded { from: current })
            })
            .await?;

        match outcome {
            OpenOutcome::Downgrade { current } => {
                conn.close().await?;
                return Err(AppError::VersionDowngrade {
                    requested: target_version,
                    current,
                });
            }
            OpenOutcome::Upgraded { from } => {
                tracing::info!(
                    "Upgraded store {} from version {} to {}",
                    path.display(),
                    from,
                    target_version
                );
            }
            OpenOutcome::Unchanged => {
                tracing::debug!("Store {} already at version {}", path.display(), target_version);
            }
        }

        Ok(Self {
            conn,
            version: target_version,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn ensure_collection(&self, collection: Collection) -> Result<()> {
        if self.version < collection.introduced_in() {
            return Err(AppError::CollectionMissing {
                collection: collection.name(),
                version: self.version,
            });
        }
        Ok(())
    }

    // Record operations

    pub async fn insert<R: Record>(&self, payload: String) -> Result<R> {
        self.insert_at(payload, Utc::now()).await
    }

    pub(crate) async fn insert_at<R: Record>(
        &self,
        payload: String,
        create_time: DateTime<Utc>,
    ) -> Result<R> {
        self.ensure_collection(R::COLLECTION)?;
        let sql = R::COLLECTION.insert_sql();
        let stored = payload.clone();

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(&sql, params![stored, create_time.to_rfc3339()])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(R::from_parts(id, payload, create_time))
    }

    pub async fn read_all<R: Record>(&self) -> Result<Vec<R>> {
        self.ensure_collection(R::COLLECTION)?;
        let sql = R::COLLECTION.select_all_sql();

        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let records = stmt
                    .query_map([], record_from_row::<R>)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    pub async fn count(&self, collection: Collection) -> Result<i64> {
        self.ensure_collection(collection)?;
        let sql = format!("SELECT COUNT(*) FROM {}", collection.name());

        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Schema inspection

    /// Names of the collections physically present, sorted.
    pub async fn collection_names(&self) -> Result<Vec<String>> {
        self.sqlite_objects("table").await
    }

    /// Names of the secondary indexes physically present, sorted.
    pub async fn index_names(&self) -> Result<Vec<String>> {
        self.sqlite_objects("index").await
    }

    async fn sqlite_objects(&self, kind: &'static str) -> Result<Vec<String>> {
        let names = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map(params![kind], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await?;
        Ok(names)
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn read_user_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 as written by insert (e.g., "2026-01-11T12:34:56.123+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn record_from_row<R: Record>(row: &Row) -> rusqlite::Result<R> {
    let raw: String = row.get(2)?;
    let create_time = parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("invalid create_time '{raw}'").into(),
        )
    })?;
    Ok(R::from_parts(row.get(0)?, row.get(1)?, create_time))
}
