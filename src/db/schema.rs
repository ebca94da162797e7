use std::fmt;

use rusqlite::Transaction;

/// Highest schema version this build knows how to create.
pub const CURRENT_VERSION: u32 = 2;

pub const DEFAULT_STORE_NAME: &str = "MyTestDatabase";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Jokes,
    Photos,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Jokes, Collection::Photos];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Jokes => "jokes",
            Collection::Photos => "photos",
        }
    }

    /// Column holding the record's text payload.
    pub fn payload_column(&self) -> &'static str {
        match self {
            Collection::Jokes => "quote",
            Collection::Photos => "img",
        }
    }

    /// Schema version whose migration creates this collection.
    pub fn introduced_in(&self) -> u32 {
        match self {
            Collection::Jokes => 1,
            Collection::Photos => 2,
        }
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}, create_time) VALUES (?1, ?2)",
            self.name(),
            self.payload_column()
        )
    }

    pub fn select_all_sql(&self) -> String {
        format!(
            "SELECT id, {}, create_time FROM {} ORDER BY id",
            self.payload_column(),
            self.name()
        )
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of the schema history. Applying a migration must be additive
/// and safe to replay on a store that already has its objects.
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: r#"
-- jokes collection
CREATE TABLE IF NOT EXISTS jokes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quote TEXT NOT NULL,
    create_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_time ON jokes(create_time);
"#,
    },
    Migration {
        version: 2,
        sql: r#"
-- photos collection (no secondary index)
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    img TEXT NOT NULL,
    create_time TEXT NOT NULL
);
"#,
    },
];

pub fn migration_for(version: u32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}

/// Default upgrade pass: applies every migration in `(current, target]`.
///
/// Runs inside the caller's transaction; the caller bumps `user_version`.
pub fn apply_migrations(tx: &Transaction<'_>, current: u32, target: u32) -> rusqlite::Result<()> {
    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current && m.version <= target)
    {
        tracing::debug!("Applying schema migration v{}", migration.version);
        tx.execute_batch(migration.sql)?;
    }
    Ok(())
}
