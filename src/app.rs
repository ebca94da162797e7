use chrono::{DateTime, Local, Utc};

use crate::cli::AppAction;
use crate::config::{Capabilities, Config};
use crate::db::{LocalStore, StoreState};
use crate::error::{AppError, Capability, Result};
use crate::models::{filter_by_recency, Joke, Photo};
use crate::services::photo;

/// Everything one run of the app owns: the store, the platform
/// capabilities, and what is currently on screen.
pub struct Session {
    // Data
    pub joke: Option<String>,
    pub captured_photo: Option<String>,
    pub saved_jokes: Vec<Joke>,
    pub filtered_jokes: Option<Vec<Joke>>,
    pub saved_photos: Vec<Photo>,

    // Services
    store: LocalStore,
    capabilities: Capabilities,
}

impl Session {
    /// Builds the session and opens the store if the platform can persist.
    pub async fn start(config: &Config) -> Result<Self> {
        let store = LocalStore::new(&config.db_dir, config.store_name.clone());

        if config.capabilities.persistence {
            store.open(config.schema_version).await?;
        } else {
            tracing::warn!("Local storage unsupported; saving is disabled for this session");
        }

        Ok(Self {
            joke: None,
            captured_photo: None,
            saved_jokes: Vec::new(),
            filtered_jokes: None,
            saved_photos: Vec::new(),
            store,
            capabilities: config.capabilities,
        })
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(AppError::CapabilityUnsupported(capability))
        }
    }

    pub fn store_state(&self) -> StoreState {
        self.store.state()
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<Vec<String>> {
        match action {
            AppAction::SaveJoke(text) => {
                self.show_joke(text);
                let joke = self.save_joke().await?;
                Ok(vec![format!("Saved joke #{}", joke.id)])
            }

            AppAction::SavePhoto(path) => {
                self.require(Capability::Camera)?;
                let data_uri = photo::load_data_uri(&path)?;
                self.capture_photo(data_uri)?;
                let photo = self.save_photo().await?;
                Ok(vec![format!("Saved photo #{}", photo.id)])
            }

            AppAction::ListJokes { days_ago, json } => {
                let jokes = match days_ago {
                    Some(days) => {
                        self.show_jokes_from(days).await?;
                        self.filtered_jokes.as_deref().unwrap_or_default()
                    }
                    None => {
                        self.show_all_jokes().await?;
                        self.saved_jokes.as_slice()
                    }
                };
                if json {
                    return Ok(vec![serde_json::to_string_pretty(jokes)?]);
                }
                if jokes.is_empty() {
                    return Ok(vec!["No saved jokes".to_string()]);
                }
                Ok(jokes.iter().map(format_joke).collect())
            }

            AppAction::ListPhotos { json } => {
                self.show_all_photos().await?;
                if json {
                    return Ok(vec![serde_json::to_string_pretty(&self.saved_photos)?]);
                }
                if self.saved_photos.is_empty() {
                    return Ok(vec!["No saved photos".to_string()]);
                }
                Ok(self.saved_photos.iter().map(format_photo).collect())
            }

            AppAction::Status => self.status().await,
        }
    }

    pub fn show_joke(&mut self, text: impl Into<String>) {
        self.joke = Some(text.into());
    }

    pub async fn save_joke(&mut self) -> Result<Joke> {
        self.require(Capability::Persistence)?;
        let Some(text) = self.joke.clone() else {
            return Err(AppError::PreconditionFailed(
                "No joke to save yet".to_string(),
            ));
        };
        let joke = self.store.insert::<Joke>(text).await?;
        tracing::info!("Saved joke #{}", joke.id);
        Ok(joke)
    }

    pub fn capture_photo(&mut self, data_uri: String) -> Result<()> {
        self.require(Capability::Camera)?;
        self.captured_photo = Some(data_uri);
        Ok(())
    }

    pub async fn save_photo(&mut self) -> Result<Photo> {
        self.require(Capability::Persistence)?;
        let Some(img) = self.captured_photo.clone() else {
            return Err(AppError::PreconditionFailed(
                "Take a photo first".to_string(),
            ));
        };
        let photo = self.store.insert::<Photo>(img).await?;
        tracing::info!("Saved photo #{}", photo.id);
        Ok(photo)
    }

    pub async fn show_all_jokes(&mut self) -> Result<()> {
        self.require(Capability::Persistence)?;
        self.saved_jokes = self.store.read_all().await?;
        self.filtered_jokes = None;
        Ok(())
    }

    pub async fn show_jokes_from(&mut self, days_ago: i64) -> Result<()> {
        self.show_all_jokes().await?;
        self.filtered_jokes = Some(filter_by_recency(
            self.saved_jokes.clone(),
            &Local::now(),
            days_ago,
        ));
        Ok(())
    }

    pub async fn show_all_photos(&mut self) -> Result<()> {
        self.require(Capability::Persistence)?;
        self.saved_photos = self.store.read_all().await?;
        Ok(())
    }

    async fn status(&self) -> Result<Vec<String>> {
        let mut lines = vec![format!(
            "Store {} at {}",
            self.store.name(),
            self.store.path().display()
        )];

        match self.store.version() {
            Some(version) => {
                lines.push(format!("Schema version {version}"));
                for (collection, count) in self.store.summary().await? {
                    lines.push(format!("  {collection}: {count} records"));
                }
                let indexes = self.store.index_names().await?;
                lines.push(format!("  indexes: {}", indexes.join(", ")));
            }
            None => lines.push(format!("State {:?}", self.store_state())),
        }

        for capability in [
            Capability::Persistence,
            Capability::Camera,
            Capability::Geolocation,
        ] {
            let support = if self.capabilities.supports(capability) {
                "available"
            } else {
                "unsupported"
            };
            lines.push(format!("{capability}: {support}"));
        }
        Ok(lines)
    }

    /// Deletes the configured store without opening it first, so a store
    /// that cannot be opened (newer version, damaged file) can still be
    /// thrown away. Any running session is stale afterwards; start a new one.
    pub async fn discard_store(config: &Config) -> Result<()> {
        if !config.capabilities.persistence {
            return Err(AppError::CapabilityUnsupported(Capability::Persistence));
        }
        LocalStore::new(&config.db_dir, config.store_name.clone())
            .reset()
            .await
    }
}

fn local_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_joke(joke: &Joke) -> String {
    format!("#{:<4} {}  {}", joke.id, local_time(joke.create_time), joke.quote)
}

fn format_photo(photo: &Photo) -> String {
    format!(
        "#{:<4} {}  {}  {} bytes",
        photo.id,
        local_time(photo.create_time),
        photo.mime_type().unwrap_or("unknown"),
        photo.img.len()
    )
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn config(dir: &TempDir) -> Config {
        Config {
            db_dir: dir.path().to_string_lossy().to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn saving_without_a_joke_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(&config(&dir)).await.unwrap();

        assert!(matches!(
            session.save_joke().await,
            Err(AppError::PreconditionFailed(_))
        ));
        session.show_all_jokes().await.unwrap();
        assert!(session.saved_jokes.is_empty());
    }

    #[tokio::test]
    async fn saving_a_photo_needs_a_capture_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(&config(&dir)).await.unwrap();

        assert!(matches!(
            session.save_photo().await,
            Err(AppError::PreconditionFailed(_))
        ));

        session
            .capture_photo("data:image/png;base64,AAAA".to_string())
            .unwrap();
        let saved = session.save_photo().await.unwrap();
        session.show_all_photos().await.unwrap();
        assert_eq!(session.saved_photos, vec![saved]);
    }

    #[tokio::test]
    async fn listing_today_filters_saved_jokes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(&config(&dir)).await.unwrap();

        session.show_joke("first");
        session.save_joke().await.unwrap();
        session.show_joke("second");
        session.save_joke().await.unwrap();

        session.show_jokes_from(0).await.unwrap();
        assert_eq!(session.saved_jokes.len(), 2);
        assert_eq!(session.filtered_jokes.as_ref().map(Vec::len), Some(2));

        session.show_all_jokes().await.unwrap();
        assert!(session.filtered_jokes.is_none());
    }

    #[tokio::test]
    async fn handle_action_saves_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(&config(&dir)).await.unwrap();

        let out = session
            .handle_action(AppAction::SaveJoke("a pun".to_string()))
            .await
            .unwrap();
        assert_eq!(out, vec!["Saved joke #1"]);

        let image = dir.path().join("shot.png");
        std::fs::write(&image, b"png").unwrap();
        let out = session
            .handle_action(AppAction::SavePhoto(image))
            .await
            .unwrap();
        assert_eq!(out, vec!["Saved photo #1"]);

        let out = session
            .handle_action(AppAction::ListJokes {
                days_ago: None,
                json: false,
            })
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].ends_with("a pun"));

        let out = session
            .handle_action(AppAction::ListPhotos { json: true })
            .await
            .unwrap();
        let photos: Vec<Photo> = serde_json::from_str(&out[0]).unwrap();
        assert_eq!(photos[0].mime_type(), Some("image/png"));

        let out = session.handle_action(AppAction::Status).await.unwrap();
        assert!(out.contains(&"Schema version 2".to_string()));
        assert!(out.contains(&"  jokes: 1 records".to_string()));
        assert!(out.contains(&"  photos: 1 records".to_string()));
        assert!(out.contains(&"  indexes: idx_time".to_string()));
    }

    #[tokio::test]
    async fn missing_persistence_disables_store_actions() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.capabilities.persistence = false;

        let mut session = Session::start(&config).await.unwrap();
        assert_eq!(session.store_state(), StoreState::Unopened);

        session.show_joke("unsaved");
        assert!(matches!(
            session.save_joke().await,
            Err(AppError::CapabilityUnsupported(Capability::Persistence))
        ));
        assert!(matches!(
            session.show_all_jokes().await,
            Err(AppError::CapabilityUnsupported(Capability::Persistence))
        ));
    }

    #[tokio::test]
    async fn missing_camera_blocks_capture() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.capabilities.camera = false;

        let mut session = Session::start(&config).await.unwrap();
        assert!(matches!(
            session.capture_photo("data:image/png;base64,AAAA".to_string()),
            Err(AppError::CapabilityUnsupported(Capability::Camera))
        ));
        assert!(session.captured_photo.is_none());
    }

    #[tokio::test]
    async fn reset_then_new_session_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let mut session = Session::start(&config).await.unwrap();
        session.show_joke("doomed");
        session.save_joke().await.unwrap();
        drop(session);
        Session::discard_store(&config).await.unwrap();

        let mut session = Session::start(&config).await.unwrap();
        assert_eq!(session.store_state(), StoreState::Ready);
        session.show_all_jokes().await.unwrap();
        assert!(session.saved_jokes.is_empty());
    }

    #[tokio::test]
    async fn dated_listing_is_a_subset_of_saved_jokes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::start(&config(&dir)).await.unwrap();

        let repo = session.store.ready_repository().unwrap();
        let yesterday = Utc::now() - chrono::Duration::days(1);
        repo.insert_at::<Joke>("yesterday".to_string(), yesterday)
            .await
            .unwrap();
        session.show_joke("today");
        session.save_joke().await.unwrap();

        session.show_jokes_from(0).await.unwrap();
        let filtered = session.filtered_jokes.clone().unwrap();
        assert_eq!(session.saved_jokes.len(), 2);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].quote, "today");
        assert!(filtered.iter().all(|j| session.saved_jokes.contains(j)));
    }

    #[tokio::test]
    async fn newer_store_can_be_discarded_without_opening() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);

        let mut session = Session::start(&config).await.unwrap();
        session.show_joke("from v2");
        session.save_joke().await.unwrap();
        drop(session);

        config.schema_version = 1;
        assert!(matches!(
            Session::start(&config).await,
            Err(AppError::VersionDowngrade {
                requested: 1,
                current: 2
            })
        ));

        Session::discard_store(&config).await.unwrap();
        let store_file = dir.path().join(format!("{}.db", config.store_name));
        assert!(!store_file.exists());

        let mut session = Session::start(&config).await.unwrap();
        session.show_all_jokes().await.unwrap();
        assert!(session.saved_jokes.is_empty());
    }

    #[tokio::test]
    async fn damaged_store_can_be_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let store_file = dir.path().join(format!("{}.db", config.store_name));
        std::fs::write(&store_file, b"definitely not sqlite, just some bytes").unwrap();

        assert!(Session::start(&config).await.is_err());
        Session::discard_store(&config).await.unwrap();
        assert!(!store_file.exists());
        assert!(Session::start(&config).await.is_ok());
    }

    #[tokio::test]
    async fn discard_needs_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.capabilities.persistence = false;

        assert!(matches!(
            Session::discard_store(&config).await,
            Err(AppError::CapabilityUnsupported(Capability::Persistence))
        ));
    }

    #[tokio::test]
    async fn version_one_store_has_no_photos() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.schema_version = 1;

        let mut session = Session::start(&config).await.unwrap();
        session
            .capture_photo("data:image/png;base64,AAAA".to_string())
            .unwrap();
        assert!(matches!(
            session.save_photo().await,
            Err(AppError::CollectionMissing { .. })
        ));
    }
}
