//! Repository functions for the `push_subscriptions` table.
//!
//! Function-based, one statement per call. The endpoint is the primary
//! key; subscribing again from the same browser replaces the row.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;
use crate::push::types::{PushSubscription, SubscriptionKeys};

const SELECT_COLUMNS: &str = "endpoint, expiration_time, keys, role";

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<(String, Option<i64>, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode(
    (endpoint, expiration_time, keys, role): (String, Option<i64>, String, String),
) -> Result<PushSubscription, DatabaseError> {
    let keys: SubscriptionKeys =
        serde_json::from_str(&keys).map_err(|e| DatabaseError::CorruptValue {
            field: format!("push_subscriptions.keys[{endpoint}]"),
            reason: e.to_string(),
        })?;
    Ok(PushSubscription {
        endpoint,
        expiration_time,
        keys,
        role,
    })
}

/// Insert or replace a subscription keyed by endpoint.
pub fn upsert_subscription(conn: &Connection, sub: &PushSubscription) -> Result<(), DatabaseError> {
    let keys = serde_json::to_string(&sub.keys)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Cannot encode keys: {e}")))?;
    conn.execute(
        "INSERT INTO push_subscriptions (endpoint, expiration_time, keys, role)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(endpoint) DO UPDATE SET
            expiration_time = excluded.expiration_time,
            keys = excluded.keys,
            role = excluded.role",
        params![sub.endpoint, sub.expiration_time, keys, sub.role],
    )?;
    Ok(())
}

/// Get a subscription by endpoint.
pub fn get_subscription(
    conn: &Connection,
    endpoint: &str,
) -> Result<Option<PushSubscription>, DatabaseError> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM push_subscriptions WHERE endpoint = ?1");
    let raw = conn
        .query_row(&sql, params![endpoint], subscription_from_row)
        .optional()?;
    raw.map(decode).transpose()
}

/// All subscriptions carrying `role`, oldest first.
pub fn list_subscriptions_by_role(
    conn: &Connection,
    role: &str,
) -> Result<Vec<PushSubscription>, DatabaseError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM push_subscriptions WHERE role = ?1 ORDER BY created_at, endpoint"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![role], subscription_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode).collect()
}

/// Like [`list_subscriptions_by_role`], but a row whose stored keys no
/// longer decode is returned as an error next to the good rows instead
/// of failing the whole listing.
pub fn scan_subscriptions_by_role(
    conn: &Connection,
    role: &str,
) -> Result<(Vec<PushSubscription>, Vec<DatabaseError>), DatabaseError> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM push_subscriptions WHERE role = ?1 ORDER BY created_at, endpoint"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![role], subscription_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut valid = Vec::with_capacity(rows.len());
    let mut corrupt = Vec::new();
    for row in rows {
        match decode(row) {
            Ok(sub) => valid.push(sub),
            Err(e) => corrupt.push(e),
        }
    }
    Ok((valid, corrupt))
}

/// Delete a subscription. Returns whether a row was removed.
pub fn delete_subscription(conn: &Connection, endpoint: &str) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM push_subscriptions WHERE endpoint = ?1",
        params![endpoint],
    )?;
    Ok(deleted > 0)
}

/// Count subscriptions, optionally restricted to one role.
pub fn count_subscriptions(conn: &Connection, role: Option<&str>) -> Result<i64, DatabaseError> {
    let count = match role {
        Some(role) => conn.query_row(
            "SELECT COUNT(*) FROM push_subscriptions WHERE role = ?1",
            params![role],
            |row| row.get(0),
        )?,
        None => conn.query_row("SELECT COUNT(*) FROM push_subscriptions", [], |row| row.get(0))?,
    };
    Ok(count)
}
