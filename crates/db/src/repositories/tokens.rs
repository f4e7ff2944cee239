use chrono::Utc;
use sqlx::Row;

use super::{RepositoryError, TokenRepository};
use crate::DbPool;

pub struct SqlTokenRepository {
    pool: DbPool,
}

impl SqlTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TokenRepository for SqlTokenRepository {
    async fn save(&self, email: &str, token: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_token (email, token, issued_at)
             VALUES (?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET
                token = excluded.token,
                issued_at = excluded.issued_at",
        )
        .bind(email)
        .bind(token)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT token FROM user_token WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Ok(row.try_get("token")?)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::SqlTokenRepository;
    use crate::migrations;
    use crate::repositories::TokenRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[tokio::test]
    async fn save_upserts_token_per_email() {
        let pool = setup_pool().await;
        let repo = SqlTokenRepository::new(pool.clone());

        repo.save("diner@example.com", "token-1").await.expect("first save");
        repo.save("diner@example.com", "token-2").await.expect("second save");

        let token = repo.find_by_email("diner@example.com").await.expect("lookup");
        assert_eq!(token, Some("token-2".to_string()));

        let missing = repo.find_by_email("other@example.com").await.expect("lookup");
        assert_eq!(missing, None);

        pool.close().await;
    }
}
