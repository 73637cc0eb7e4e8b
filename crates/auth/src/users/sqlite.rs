//! SQLite user storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use oidping_core::storage::{LocalUser, RepositoryError, Result, UserRepository};

type UserRow = (String, String, String, String, String, String, bool, String);

const USER_COLUMNS: &str =
    "id, name, email, roles, provider, provider_subject, email_confirmed, created_at";

/// SQLite-backed user storage.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                roles TEXT NOT NULL,
                provider TEXT NOT NULL,
                provider_subject TEXT NOT NULL,
                email_confirmed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                UNIQUE (provider, provider_subject)
            );

            CREATE TABLE IF NOT EXISTS confirmation_codes (
                user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                code TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "LocalUser", "schema"))?;

        Ok(())
    }
}

/// Maps a sqlx error to a `RepositoryError`.
///
/// Unique violations become `AlreadyExists`; pool errors become
/// `ConnectionFailed`.
fn map_sqlx_error(err: sqlx::Error, entity_type: &'static str, id: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::AlreadyExists {
            entity_type,
            id: id.to_string(),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::ConnectionFailed(err.to_string())
        }
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

fn row_to_user(row: UserRow) -> Result<LocalUser> {
    let (id, name, email, roles, provider, provider_subject, email_confirmed, created_at) = row;

    Ok(LocalUser {
        id: Uuid::parse_str(&id).map_err(|e| RepositoryError::InvalidData(e.to_string()))?,
        name,
        email,
        roles: serde_json::from_str(&roles)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        provider,
        provider_subject,
        email_confirmed,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))?
            .with_timezone(&Utc),
    })
}

fn roles_json(user: &LocalUser) -> Result<String> {
    serde_json::to_string(&user.roles).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

#[async_trait]
impl UserRepository for SqliteUserStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<LocalUser>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "LocalUser", &id.to_string()))?;

        row.map(row_to_user).transpose()
    }

    async fn get_user_by_login(&self, provider: &str, subject: &str) -> Result<Option<LocalUser>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE provider = ? AND provider_subject = ?"
        ))
        .bind(provider)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "LocalUser", subject))?;

        row.map(row_to_user).transpose()
    }

    async fn create_user(&self, user: &LocalUser) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(roles_json(user)?)
        .bind(&user.provider)
        .bind(&user.provider_subject)
        .bind(user.email_confirmed)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "LocalUser", &user.id.to_string()))?;

        Ok(())
    }

    async fn update_user(&self, user: &LocalUser) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET name = ?, email = ?, roles = ?, email_confirmed = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(roles_json(user)?)
        .bind(user.email_confirmed)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "LocalUser", &user.id.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity_type: "LocalUser",
                id: user.id.to_string(),
            });
        }
        Ok(())
    }

    async fn store_confirmation_code(&self, user_id: Uuid, code: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO confirmation_codes (user_id, code) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "ConfirmationCode", &user_id.to_string()))?;

        Ok(())
    }

    async fn confirm_account(&self, user_id: Uuid, code: &str) -> Result<bool> {
        let id = user_id.to_string();
        let map = |e| map_sqlx_error(e, "ConfirmationCode", &id);

        let mut tx = self.pool.begin().await.map_err(map)?;

        let deleted = sqlx::query("DELETE FROM confirmation_codes WHERE user_id = ? AND code = ?")
            .bind(&id)
            .bind(code)
            .execute(&mut *tx)
            .await
            .map_err(map)?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(map)?;
            return Ok(false);
        }

        sqlx::query("UPDATE users SET email_confirmed = 1 WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(map)?;

        tx.commit().await.map_err(map)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteUserStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn ada() -> LocalUser {
        LocalUser::new("Ada", "ada@example.com")
            .with_login("oidc", "sub-1")
            .with_roles(vec!["admin".to_string(), "reader".to_string()])
    }

    #[tokio::test]
    async fn user_roundtrip_keeps_roles() {
        let store = store().await;
        let user = ada();
        store.create_user(&user).await.unwrap();

        let loaded = store.get_user_by_login("oidc", "sub-1").await.unwrap().unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.roles, vec!["admin", "reader"]);
        assert!(!loaded.email_confirmed);
    }

    #[tokio::test]
    async fn second_user_with_same_login_is_rejected() {
        let store = store().await;
        store.create_user(&ada()).await.unwrap();

        let err = store.create_user(&ada()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_changes_profile() {
        let store = store().await;
        let mut user = ada();
        store.create_user(&user).await.unwrap();

        user.name = "Ada Lovelace".to_string();
        user.roles = vec!["reader".to_string()];
        store.update_user(&user).await.unwrap();

        let loaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Ada Lovelace");
        assert_eq!(loaded.roles, vec!["reader"]);
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let store = store().await;
        let err = store.update_user(&ada()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn confirmation_code_confirms_once() {
        let store = store().await;
        let user = ada();
        store.create_user(&user).await.unwrap();
        store.store_confirmation_code(user.id, "code-1").await.unwrap();

        assert!(!store.confirm_account(user.id, "nope").await.unwrap());
        assert!(store.confirm_account(user.id, "code-1").await.unwrap());
        assert!(!store.confirm_account(user.id, "code-1").await.unwrap());

        let loaded = store.get_user(user.id).await.unwrap().unwrap();
        assert!(loaded.email_confirmed);
    }
}
