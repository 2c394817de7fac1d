use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use core_types::{NewUser, User};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyPool, Row, Transaction};

use crate::DbError;

const POSTGRES_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age > 0),
    created_at TEXT NOT NULL
)";

const SQLITE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age > 0),
    created_at TEXT NOT NULL
)";

/// Queries for the `users` table.
///
/// Writes go through a caller-supplied transaction so they take part in
/// [`Database::with_transaction`](crate::Database::with_transaction); reads
/// use the pool.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: AnyPool,
}

impl UserRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Creates the `users` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        let ddl = if conn.backend_name() == "PostgreSQL" {
            POSTGRES_SCHEMA
        } else {
            SQLITE_SCHEMA
        };
        sqlx::query(ddl).execute(&mut *conn).await?;
        Ok(())
    }

    /// Validates and inserts a user, stamping `created_at` with the current
    /// time.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Any>,
        new_user: &NewUser,
    ) -> Result<User, DbError> {
        new_user.validate()?;

        let created_at = Utc::now();
        let row = sqlx::query(
            "INSERT INTO users (name, age, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(new_user.name.as_str())
        .bind(new_user.age)
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .fetch_one(&mut **tx)
        .await?;

        Ok(User {
            id: row.try_get::<i64, _>("id")?,
            name: new_user.name.clone(),
            age: new_user.age,
            created_at: truncate_to_micros(created_at),
        })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<User, DbError> {
        let row = sqlx::query(
            "SELECT id, name, age, created_at FROM users WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        user_from_row(&row)
    }

    pub async fn all(&self) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query("SELECT id, name, age, created_at FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(user_from_row).collect()
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("total")?)
    }
}

fn user_from_row(row: &AnyRow) -> Result<User, DbError> {
    let age = row.try_get::<i64, _>("age")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        age: i32::try_from(age).map_err(|_| DbError::Decode(format!("age {age} out of range")))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| DbError::Decode(format!("created_at {created_at:?}: {e}")))?
            .with_timezone(&Utc),
    })
}

/// Matches the precision `created_at` is stored with.
fn truncate_to_micros(at: DateTime<Utc>) -> DateTime<Utc> {
    let micros = at.timestamp_subsec_micros();
    at.with_nanosecond(micros * 1_000).unwrap_or(at)
}
