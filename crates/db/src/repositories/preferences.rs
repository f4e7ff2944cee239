use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use concierge_core::domain::preference::UserPreference;

use super::{PreferenceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPreferenceRepository {
    pool: DbPool,
}

impl SqlPreferenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PreferenceRepository for SqlPreferenceRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserPreference>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                email,
                location,
                cuisine,
                dining_time,
                number_of_people,
                restaurant_names_json,
                updated_at
             FROM user_preference
             WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(preference_from_row).transpose()
    }

    async fn save(&self, preference: UserPreference) -> Result<(), RepositoryError> {
        let restaurant_names_json = preference
            .restaurant_names
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO user_preference (
                email,
                location,
                cuisine,
                dining_time,
                number_of_people,
                restaurant_names_json,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET
                location = excluded.location,
                cuisine = excluded.cuisine,
                dining_time = excluded.dining_time,
                number_of_people = excluded.number_of_people,
                restaurant_names_json = excluded.restaurant_names_json,
                updated_at = excluded.updated_at",
        )
        .bind(&preference.email)
        .bind(&preference.location)
        .bind(&preference.cuisine)
        .bind(&preference.dining_time)
        .bind(&preference.number_of_people)
        .bind(restaurant_names_json.as_deref())
        .bind(preference.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn preference_from_row(row: SqliteRow) -> Result<UserPreference, RepositoryError> {
    let restaurant_names = row
        .try_get::<Option<String>, _>("restaurant_names_json")?
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()?;

    Ok(UserPreference {
        email: row.try_get("email")?,
        location: row.try_get("location")?,
        cuisine: row.try_get("cuisine")?,
        dining_time: row.try_get("dining_time")?,
        number_of_people: row.try_get("number_of_people")?,
        restaurant_names,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
