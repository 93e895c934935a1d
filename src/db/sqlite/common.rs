use sqlx::{
    Sqlite, SqliteConnection, SqlitePool, pool::PoolConnection, query::Query,
    sqlite::SqliteArguments,
};

use crate::{
    db::error::{DbError, DbResult},
    scim::SqlFilter,
};

/// A transaction opened with `BEGIN IMMEDIATE`.
///
/// The write lock is taken before the first read, so concurrent writers wait
/// on `busy_timeout` instead of failing with `SQLITE_BUSY` when a deferred
/// reader tries to upgrade.
///
/// Run the unit of work against [`WriteTx::conn`] and hand its result to
/// [`WriteTx::finish`], which commits or rolls back. A guard dropped before
/// `finish` (cancelled request) detaches its connection from the pool;
/// closing it rolls the open transaction back.
pub struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| DbError::Internal("transaction already finished".to_string()))
    }

    /// Commit if `result` is `Ok`, roll back otherwise, and pass it through.
    pub async fn finish<T>(mut self, result: DbResult<T>) -> DbResult<T> {
        let Some(conn) = self.conn.as_deref_mut() else {
            return result;
        };

        match result {
            Ok(value) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                self.conn.take();
                Ok(value)
            }
            Err(e) => {
                match sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    Ok(_) => {
                        self.conn.take();
                    }
                    Err(rollback) => {
                        tracing::warn!(error = %rollback, "Rollback failed, discarding connection");
                    }
                }
                Err(e)
            }
        }
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

/// Map a unique-index violation to `DbError::Conflict`, passing every other
/// error through.
pub fn conflict_on_unique(e: sqlx::Error, message: impl FnOnce() -> String) -> DbError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::Conflict(message())
        }
        _ => DbError::from(e),
    }
}

/// Build the `WHERE` body for an org-scoped listing, optionally narrowed by a
/// translated SCIM filter.
pub fn scoped_where(org_column: &str, filter: Option<&SqlFilter>) -> String {
    match filter {
        Some(f) => format!("{org_column} = ? AND ({})", f.where_clause),
        None => format!("{org_column} = ?"),
    }
}

/// Bind the filter's values after whatever has already been bound.
pub fn bind_filter<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    filter: Option<&SqlFilter>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    if let Some(f) = filter {
        for value in &f.bindings {
            query = query.bind(value.clone());
        }
    }
    query
}
