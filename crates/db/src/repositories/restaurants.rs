use sqlx::{sqlite::SqliteRow, Row};

use concierge_core::domain::restaurant::{BusinessId, RestaurantRecord};

use super::preferences::parse_timestamp;
use super::{RepositoryError, RestaurantRepository};
use crate::DbPool;

pub struct SqlRestaurantRepository {
    pool: DbPool,
}

impl SqlRestaurantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RestaurantRepository for SqlRestaurantRepository {
    async fn find_by_business_id(
        &self,
        business_id: &BusinessId,
    ) -> Result<Option<RestaurantRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT business_id, name, address, cuisine, rating, review_count, zip_code, inserted_at
             FROM restaurant
             WHERE business_id = ?",
        )
        .bind(&business_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(restaurant_from_row).transpose()
    }

    async fn scan_by_cuisine(
        &self,
        cuisine: &str,
        locality: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<RestaurantRecord>, RepositoryError> {
        let locality_pattern = format!("%{locality}%");
        let rows = sqlx::query(
            "SELECT business_id, name, address, cuisine, rating, review_count, zip_code, inserted_at
             FROM restaurant
             WHERE cuisine = ? AND address LIKE ?
             ORDER BY business_id ASC
             LIMIT ? OFFSET ?",
        )
        .bind(cuisine)
        .bind(&locality_pattern)
        .bind(i64::from(page_size))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(restaurant_from_row).collect()
    }

    async fn save(&self, record: RestaurantRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO restaurant (
                business_id, name, address, cuisine, rating, review_count, zip_code, inserted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(business_id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                cuisine = excluded.cuisine,
                rating = excluded.rating,
                review_count = excluded.review_count,
                zip_code = excluded.zip_code",
        )
        .bind(&record.business_id.0)
        .bind(&record.name)
        .bind(&record.address)
        .bind(&record.cuisine)
        .bind(record.rating)
        .bind(record.review_count)
        .bind(record.zip_code.as_deref())
        .bind(record.inserted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn restaurant_from_row(row: SqliteRow) -> Result<RestaurantRecord, RepositoryError> {
    Ok(RestaurantRecord {
        business_id: BusinessId(row.try_get("business_id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        cuisine: row.try_get("cuisine")?,
        rating: row.try_get("rating")?,
        review_count: row.try_get("review_count")?,
        zip_code: row.try_get("zip_code")?,
        inserted_at: parse_timestamp("inserted_at", row.try_get("inserted_at")?)?,
    })
}
