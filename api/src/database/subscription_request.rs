use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";

/// A manual-payment subscription request. Users file one after paying out of
/// band; an admin approving it activates the requested plan.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRequest {
    pub id: Uuid,
    pub email: String,
    pub plan: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionRequest {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }

    pub async fn find_by_id(db: &sqlx::PgPool, id: Uuid) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM subscription_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }
}
