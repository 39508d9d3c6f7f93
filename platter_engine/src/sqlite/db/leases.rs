use chrono::{DateTime, Duration, Utc};
use log::trace;
use sqlx::SqliteConnection;

/// Takes the named lease for `holder` if it is free, has expired, or is already held by `holder`. Returns whether
/// `holder` owns the lease after the call.
///
/// The whole check happens in one conditional upsert, so two instances racing for an expired lease cannot both win.
pub async fn try_acquire(
    name: &str,
    holder: &str,
    ttl: Duration,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let expires_at = now + ttl;
    let result = sqlx::query(
        r#"
            INSERT INTO worker_leases (name, holder, expires_at) VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET holder = excluded.holder, expires_at = excluded.expires_at
            WHERE worker_leases.holder = excluded.holder OR worker_leases.expires_at <= $4
        "#,
    )
    .bind(name)
    .bind(holder)
    .bind(expires_at)
    .bind(now)
    .execute(conn)
    .await?;
    let acquired = result.rows_affected() == 1;
    trace!("🗃️ Lease '{name}' requested by {holder}. Acquired: {acquired}");
    Ok(acquired)
}
