//! Durable, `sqlx::SqlitePool`-backed repositories, behind the `sqlite`
//! feature, with embedded migrations under `./migrations`. Every entity is
//! stored as its serialized JSON body alongside the handful of columns the
//! core actually filters/orders by (`session_id`, `sequence_number`,
//! `fingerprint`, `activity_id`) -- see `migrations/0001_init.sql`.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::domain::policy::Policy;
use crate::domain::risk::Risk;
use crate::domain::session::Session;
use crate::domain::trace::Trace;
use crate::domain::{PolicyId, SessionId};
use crate::error::{GatewayError, InternalError};
use crate::repo::{PolicyRepo, RiskRepo, SessionRepo, TraceRepo};

/// Opens the pool and, when the `sqlite-migrations` feature is enabled, runs
/// the embedded migrations before handing the pool back.
pub async fn connect(database_url: &str) -> Result<SqlitePool, GatewayError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| InternalError::new(format!("failed to open sqlite pool: {e}")))?;

    #[cfg(feature = "sqlite-migrations")]
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| InternalError::new(format!("migration failed: {e}")))?;

    Ok(pool)
}

fn to_internal(e: sqlx::Error) -> GatewayError {
    InternalError::new(format!("sqlite error: {e}")).into()
}

fn to_json_internal(e: serde_json::Error) -> GatewayError {
    InternalError::new(format!("serialization error: {e}")).into()
}

pub struct SqliteSessionRepo {
    pool: SqlitePool,
}

impl SqliteSessionRepo {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepo for SqliteSessionRepo {
    async fn insert(&self, session: Session) -> Result<(), GatewayError> {
        let body = serde_json::to_string(&session).map_err(to_json_internal)?;
        sqlx::query(
            "INSERT INTO sessions (id, student_id, activity_id, lifecycle, body) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(&session.student_id)
        .bind(&session.activity_id)
        .bind(session.lifecycle.encode())
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(to_internal)?;
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Session, GatewayError> {
        let row: (String,) = sqlx::query_as("SELECT body FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(to_internal)?
            .ok_or_else(|| GatewayError::SessionNotFound(id.to_string()))?;
        serde_json::from_str(&row.0).map_err(to_json_internal)
    }

    async fn update(&self, session: Session) -> Result<(), GatewayError> {
        let body = serde_json::to_string(&session).map_err(to_json_internal)?;
        let result = sqlx::query("UPDATE sessions SET lifecycle = ?, body = ? WHERE id = ?")
            .bind(session.lifecycle.encode())
            .bind(body)
            .bind(session.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(to_internal)?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::SessionNotFound(session.id.to_string()));
        }
        Ok(())
    }
}

pub struct SqliteTraceRepo {
    pool: SqlitePool,
}

impl SqliteTraceRepo {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TraceRepo for SqliteTraceRepo {
    async fn append(&self, trace: Trace) -> Result<(), GatewayError> {
        let body = serde_json::to_string(&trace).map_err(to_json_internal)?;
        sqlx::query("INSERT INTO traces (id, session_id, sequence_number, body) VALUES (?, ?, ?, ?)")
            .bind(trace.id.to_string())
            .bind(trace.session_id.to_string())
            .bind(i64::try_from(trace.sequence_number).unwrap_or(i64::MAX))
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(to_internal)?;
        Ok(())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Trace>, GatewayError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT body FROM traces WHERE session_id = ? ORDER BY sequence_number ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(to_internal)?;
        rows.into_iter()
            .map(|(body,)| serde_json::from_str(&body).map_err(to_json_internal))
            .collect()
    }

    async fn next_sequence_number(&self, session_id: SessionId) -> Result<u64, GatewayError> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(sequence_number) FROM traces WHERE session_id = ?")
                .bind(session_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(to_internal)?;
        Ok(row.0.map_or(1, |max| u64::try_from(max).unwrap_or(0) + 1))
    }
}

pub struct SqliteRiskRepo {
    pool: SqlitePool,
}

impl SqliteRiskRepo {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RiskRepo for SqliteRiskRepo {
    async fn insert(&self, risk: Risk) -> Result<(), GatewayError> {
        let body = serde_json::to_string(&risk).map_err(to_json_internal)?;
        sqlx::query("INSERT INTO risks (id, session_id, fingerprint, body) VALUES (?, ?, ?, ?)")
            .bind(risk.id.to_string())
            .bind(risk.session_id.to_string())
            .bind(&risk.fingerprint)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(to_internal)?;
        Ok(())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Risk>, GatewayError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT body FROM risks WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(to_internal)?;
        rows.into_iter()
            .map(|(body,)| serde_json::from_str(&body).map_err(to_json_internal))
            .collect()
    }

    async fn fingerprints_for_session(&self, session_id: SessionId) -> Result<HashSet<String>, GatewayError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT fingerprint FROM risks WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(to_internal)?;
        Ok(rows.into_iter().map(|(f,)| f).collect())
    }
}

pub struct SqlitePolicyRepo {
    pool: SqlitePool,
}

impl SqlitePolicyRepo {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepo for SqlitePolicyRepo {
    async fn get(&self, id: PolicyId) -> Result<Policy, GatewayError> {
        let row: (String,) = sqlx::query_as("SELECT body FROM policies WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(to_internal)?
            .ok_or_else(|| GatewayError::ResourceNotFound { kind: "policy", id: id.to_string() })?;
        serde_json::from_str(&row.0).map_err(to_json_internal)
    }

    async fn get_or_create_default(&self, activity_id: &str) -> Result<Policy, GatewayError> {
        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT body FROM policies WHERE activity_id = ? ORDER BY rowid ASC LIMIT 1",
        )
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_internal)?;

        if let Some((body,)) = existing {
            return serde_json::from_str(&body).map_err(to_json_internal);
        }

        let policy = Policy::default_for_activity(activity_id);
        let body = serde_json::to_string(&policy).map_err(to_json_internal)?;
        sqlx::query("INSERT INTO policies (id, activity_id, body) VALUES (?, ?, ?)")
            .bind(policy.id.to_string())
            .bind(activity_id)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(to_internal)?;
        Ok(policy)
    }
}
