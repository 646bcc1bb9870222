use std::sync::Mutex;

use futures_util::future::join_all;
use rusqlite::Connection;
use serde::Serialize;

use super::transport::PushTransport;
use super::types::{NotificationPayload, PushSubscription};
use super::PushError;
use crate::db::{self, DatabaseError};

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub role: String,
    pub attempted: usize,
    pub delivered: usize,
    /// Endpoints deleted because the push service reported them gone.
    pub removed: Vec<String>,
    /// Deliveries that failed for any other reason, plus rows whose keys
    /// could not be read. Both are kept for next time.
    pub failed: usize,
}

fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>, PushError> {
    conn.lock()
        .map_err(|_| DatabaseError::ConstraintViolation("database lock poisoned".into()).into())
}

/// Validate and store a subscription (replacing any row for the endpoint).
pub fn subscribe(conn: &Mutex<Connection>, subscription: &PushSubscription) -> Result<(), PushError> {
    subscription.validate()?;
    let guard = lock(conn)?;
    db::upsert_subscription(&guard, subscription)?;
    tracing::info!(role = %subscription.role, "Push subscription stored");
    Ok(())
}

/// Remove a subscription. Returns whether it existed.
pub fn unsubscribe(conn: &Mutex<Connection>, endpoint: &str) -> Result<bool, PushError> {
    let guard = lock(conn)?;
    let removed = db::delete_subscription(&guard, endpoint)?;
    tracing::info!(removed, "Push subscription removed");
    Ok(removed)
}

/// Deliver `payload` to every subscriber of `role`.
///
/// All deliveries run concurrently and are awaited together. A 404/410
/// from the push service deletes that subscription; every other failure
/// is logged and the subscription kept. No retries, no ordering.
pub async fn notify_role(
    conn: &Mutex<Connection>,
    transport: &dyn PushTransport,
    role: &str,
    payload: &NotificationPayload,
) -> Result<DispatchReport, PushError> {
    let (subscriptions, corrupt) = {
        let guard = lock(conn)?;
        db::scan_subscriptions_by_role(&guard, role)?
    };
    let body = payload.to_bytes()?;

    let mut report = DispatchReport {
        role: role.to_string(),
        attempted: subscriptions.len(),
        failed: corrupt.len(),
        ..Default::default()
    };
    for e in &corrupt {
        tracing::warn!(role, error = %e, "Skipping unreadable push subscription");
    }
    if subscriptions.is_empty() {
        tracing::debug!(role, "No subscribers for role");
        return Ok(report);
    }

    let results = join_all(
        subscriptions
            .iter()
            .map(|sub| transport.deliver(sub, &body)),
    )
    .await;

    let mut gone = Vec::new();
    for (sub, result) in subscriptions.iter().zip(results) {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) if e.is_gone() => gone.push(sub.endpoint.clone()),
            Err(e) => {
                report.failed += 1;
                tracing::warn!(role, endpoint = %sub.endpoint, error = %e, "Push delivery failed");
            }
        }
    }

    if !gone.is_empty() {
        let guard = lock(conn)?;
        for endpoint in gone {
            match db::delete_subscription(&guard, &endpoint) {
                Ok(_) => {
                    tracing::info!(role, %endpoint, "Removed stale push subscription");
                    report.removed.push(endpoint);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(role, %endpoint, error = %e, "Failed to remove stale subscription");
                }
            }
        }
    }

    tracing::info!(
        role,
        attempted = report.attempted,
        delivered = report.delivered,
        removed = report.removed.len(),
        failed = report.failed,
        "Push fan-out complete"
    );
    Ok(report)
}
