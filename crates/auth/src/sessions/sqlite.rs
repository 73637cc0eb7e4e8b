//! SQLite session storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use oidping_core::auth::{
    AuthError, AuthFlowState, Result, Session, SessionId, SessionRepository, TokenSet,
    AUTH_FLOW_MAX_AGE_MINUTES,
};
use sqlx::SqlitePool;

type SessionRow = (String, String, String, String, String, Option<String>);
type FlowRow = (String, String, String, Option<String>);

/// SQLite-backed session storage.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                scheme TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                tokens TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);

            CREATE TABLE IF NOT EXISTS auth_flows (
                state TEXT PRIMARY KEY,
                pkce_verifier TEXT NOT NULL,
                nonce TEXT NOT NULL,
                created_at TEXT NOT NULL,
                return_to TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

fn storage(err: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(err.to_string())
}

/// Fixed-width UTC timestamps so the purge queries can compare text.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(storage)?
        .with_timezone(&Utc))
}

fn session_from_row(row: SessionRow) -> Result<Session> {
    let (id, user_id, scheme, created_at, expires_at, tokens) = row;
    let tokens = tokens
        .map(|raw| serde_json::from_str::<TokenSet>(&raw))
        .transpose()
        .map_err(storage)?;

    Ok(Session {
        id: SessionId::new(id),
        user_id,
        scheme,
        created_at: parse_time(&created_at)?,
        expires_at: parse_time(&expires_at)?,
        tokens,
    })
}

fn flow_from_row(row: FlowRow) -> Result<AuthFlowState> {
    let (pkce_verifier, nonce, created_at, return_to) = row;
    Ok(AuthFlowState {
        pkce_verifier,
        nonce,
        created_at: parse_time(&created_at)?,
        return_to,
    })
}

#[async_trait]
impl SessionRepository for SqliteSessionStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let tokens = session
            .tokens
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(storage)?;

        sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp(&Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        sqlx::query(
            "INSERT INTO sessions (id, user_id, scheme, created_at, expires_at, tokens) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(&session.user_id)
        .bind(&session.scheme)
        .bind(timestamp(&session.created_at))
        .bind(timestamp(&session.expires_at))
        .bind(tokens)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, scheme, created_at, expires_at, tokens FROM sessions WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(session_from_row).transpose()
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        Ok(())
    }

    async fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()> {
        let cutoff = Utc::now() - Duration::minutes(AUTH_FLOW_MAX_AGE_MINUTES);
        sqlx::query("DELETE FROM auth_flows WHERE created_at <= ?")
            .bind(timestamp(&cutoff))
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        sqlx::query(
            "INSERT OR REPLACE INTO auth_flows (state, pkce_verifier, nonce, created_at, return_to) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(state)
        .bind(&flow.pkce_verifier)
        .bind(&flow.nonce)
        .bind(timestamp(&flow.created_at))
        .bind(&flow.return_to)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>> {
        // SELECT and DELETE in one transaction so a state cannot be replayed
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query_as::<_, FlowRow>(
            "SELECT pkce_verifier, nonce, created_at, return_to FROM auth_flows WHERE state = ?",
        )
        .bind(state)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        if row.is_some() {
            sqlx::query("DELETE FROM auth_flows WHERE state = ?")
                .bind(state)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;

        row.map(flow_from_row).transpose()
    }
}
