use sqlx::Row;

use concierge_core::domain::restaurant::{BusinessId, SearchIndexEntry};

use super::{RepositoryError, SearchIndexRepository};
use crate::DbPool;

pub struct SqlSearchIndexRepository {
    pool: DbPool,
}

impl SqlSearchIndexRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SearchIndexRepository for SqlSearchIndexRepository {
    async fn insert(&self, entry: SearchIndexEntry) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO search_index_entry (business_id, cuisine) VALUES (?, ?)")
            .bind(&entry.business_id.0)
            .bind(&entry.cuisine)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_business_ids(
        &self,
        cuisine: &str,
        limit: u32,
    ) -> Result<Vec<BusinessId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT business_id
             FROM search_index_entry
             WHERE cuisine = ?
             ORDER BY id ASC
             LIMIT ?",
        )
        .bind(cuisine)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok(BusinessId(row.try_get("business_id")?)))
            .collect()
    }
}
