use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{PhoneNumber, UserId};

/// Identity - maps a normalized phone number to a stable user id
///
/// The id is generated by the sign-in flow before the first upsert, so a token
/// can reference it before the row exists.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub id: UserId,
    pub phone: PhoneNumber,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// In-memory record for a phone with no stored identity yet.
    pub fn new(phone: PhoneNumber) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            phone,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Identity {
    pub async fn find_by_phone(
        phone: &PhoneNumber,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Identity>(
            "SELECT id, phone, created_at, updated_at FROM users WHERE phone = $1",
        )
        .bind(phone)
        .fetch_optional(pool)
        .await
    }

    /// Insert, or on phone conflict keep the stored id and refresh `updated_at`.
    ///
    /// Returns the number of rows affected.
    pub async fn upsert(&self, pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (phone) DO UPDATE SET phone      = excluded.phone,
                                              updated_at = NOW()
            "#,
        )
        .bind(self.id)
        .bind(&self.phone)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
    }
}
