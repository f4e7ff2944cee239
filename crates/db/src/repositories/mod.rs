use async_trait::async_trait;
use thiserror::Error;

use concierge_core::domain::preference::UserPreference;
use concierge_core::domain::request::PendingRequest;
use concierge_core::domain::restaurant::{BusinessId, RestaurantRecord, SearchIndexEntry};

pub mod preferences;
pub mod queue;
pub mod restaurants;
pub mod search_index;
pub mod tokens;

pub use preferences::SqlPreferenceRepository;
pub use queue::{ReceivedMessage, SqlRequestQueue};
pub use restaurants::SqlRestaurantRepository;
pub use search_index::SqlSearchIndexRepository;
pub use tokens::SqlTokenRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserPreference>, RepositoryError>;

    /// Upsert; the most recent write wins unconditionally.
    async fn save(&self, preference: UserPreference) -> Result<(), RepositoryError>;
}

/// Durable at-least-once queue of pending dining requests.
///
/// `receive_batch` is a zero-wait poll: it returns immediately, claiming up
/// to `max_messages` visible messages and hiding them for the visibility
/// timeout. A message that is never deleted becomes visible again once the
/// timeout lapses, with a fresh receipt handle; deletion with a stale handle
/// is a no-op.
#[async_trait]
pub trait RequestQueue: Send + Sync {
    async fn enqueue(&self, request: &PendingRequest) -> Result<String, RepositoryError>;

    async fn receive_batch(
        &self,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>, RepositoryError>;

    async fn delete(&self, receipt_handle: &str) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait SearchIndexRepository: Send + Sync {
    async fn insert(&self, entry: SearchIndexEntry) -> Result<(), RepositoryError>;

    async fn find_business_ids(
        &self,
        cuisine: &str,
        limit: u32,
    ) -> Result<Vec<BusinessId>, RepositoryError>;
}

#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn find_by_business_id(
        &self,
        business_id: &BusinessId,
    ) -> Result<Option<RestaurantRecord>, RepositoryError>;

    /// Paginated scan for the index builder: exact cuisine match plus a
    /// locality substring match on the address.
    async fn scan_by_cuisine(
        &self,
        cuisine: &str,
        locality: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<RestaurantRecord>, RepositoryError>;

    async fn save(&self, record: RestaurantRecord) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn save(&self, email: &str, token: &str) -> Result<(), RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<String>, RepositoryError>;
}
