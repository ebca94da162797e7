use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Collection;

/// A row of one of the store's collections.
///
/// Every collection holds a single text payload next to its key and
/// creation time, so a record is rebuilt from those three parts.
pub trait Record: Sized + Send + 'static {
    const COLLECTION: Collection;

    fn from_parts(id: i64, payload: String, create_time: DateTime<Utc>) -> Self;

    fn id(&self) -> i64;

    fn create_time(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joke {
    pub id: i64,
    pub quote: String,
    pub create_time: DateTime<Utc>,
}

impl Record for Joke {
    const COLLECTION: Collection = Collection::Jokes;

    fn from_parts(id: i64, quote: String, create_time: DateTime<Utc>) -> Self {
        Self {
            id,
            quote,
            create_time,
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }
}

/// A captured image, stored as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub img: String,
    pub create_time: DateTime<Utc>,
}

impl Photo {
    /// MIME type declared by the data URI, if it has one.
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.img.strip_prefix("data:")?;
        let end = rest.find([';', ','])?;
        Some(&rest[..end]).filter(|m| !m.is_empty())
    }
}

impl Record for Photo {
    const COLLECTION: Collection = Collection::Photos;

    fn from_parts(id: i64, img: String, create_time: DateTime<Utc>) -> Self {
        Self {
            id,
            img,
            create_time,
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }
}
