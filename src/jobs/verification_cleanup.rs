// ==================== UNVERIFIED ACCOUNT CLEANUP ====================
// Removes accounts that never confirmed their email. Runs hourly; an account
// is removed once its verification link has been expired for a week.

use crate::database::{MongoDB, USERS};
use mongodb::bson::{doc, Document};
use tokio::time::{interval, Duration};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);
pub const GRACE_PERIOD_SECS: i64 = 7 * 24 * 3600;

/// Filter for unverified accounts whose token expired before `now - grace`
pub fn stale_unverified_filter(now: i64) -> Document {
    doc! {
        "is_verified": false,
        "verification_expires_at": { "$lt": now - GRACE_PERIOD_SECS }
    }
}

pub async fn cleanup_unverified_users(db: &MongoDB) -> Result<u64, mongodb::error::Error> {
    let filter = stale_unverified_filter(chrono::Utc::now().timestamp());
    let result = db.collection::<Document>(USERS).delete_many(filter).await?;
    Ok(result.deleted_count)
}

pub async fn start_verification_cleanup(db: MongoDB) {
    log::info!("🧹 Starting unverified account cleanup (runs every hour)");

    tokio::spawn(async move {
        let mut interval = interval(CLEANUP_INTERVAL);

        loop {
            // First tick completes immediately
            interval.tick().await;

            match cleanup_unverified_users(&db).await {
                Ok(0) => log::debug!("🧹 No stale unverified accounts"),
                Ok(count) => log::info!("🧹 Removed {} stale unverified accounts", count),
                Err(e) => log::error!("❌ Unverified account cleanup failed: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_filter_uses_grace_period() {
        let now = 1_700_000_000;
        let filter = stale_unverified_filter(now);
        assert!(!filter.get_bool("is_verified").unwrap());
        let cutoff = filter.get_document("verification_expires_at").unwrap().get_i64("$lt").unwrap();
        assert_eq!(cutoff, now - 7 * 24 * 3600);
    }
}
