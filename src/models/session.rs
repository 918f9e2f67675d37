use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const SESSION_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub created_at: String,
    pub expires_at: String,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            created_at: now.to_rfc3339(),
            expires_at: (now + Duration::days(SESSION_LIFETIME_DAYS)).to_rfc3339(),
        }
    }

    /// Unparseable expiry timestamps count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|expires| expires.with_timezone(&Utc) <= now)
            .unwrap_or(true)
    }
}
