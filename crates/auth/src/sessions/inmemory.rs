//! In-memory session storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use oidping_core::auth::{
    is_flow_expired, is_session_expired, AuthFlowState, Result, Session, SessionId,
    SessionRepository,
};

/// In-memory session store for development and testing.
///
/// Data is not persisted and will be lost when the store is dropped. Clones
/// share the same maps. Expired sessions and abandoned logins are swept on
/// every write.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    auth_flows: Arc<RwLock<HashMap<String, AuthFlowState>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending logins. Used by tests to check single-use state.
    pub async fn pending_flows(&self) -> usize {
        self.auth_flows.read().await.len()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !is_session_expired(s, now));
        sessions.insert(session.id.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id.as_str()).cloned())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        self.sessions.write().await.remove(id.as_str());
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn store_auth_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()> {
        let now = Utc::now();
        let mut flows = self.auth_flows.write().await;
        flows.retain(|_, f| !is_flow_expired(f, now));
        flows.insert(state.to_string(), flow.clone());
        Ok(())
    }

    async fn take_auth_flow(&self, state: &str) -> Result<Option<AuthFlowState>> {
        let mut flows = self.auth_flows.write().await;
        Ok(flows.remove(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oidping_core::auth::{TokenSet, APPLICATION_SCHEME, AUTH_FLOW_MAX_AGE_MINUTES};

    fn test_session(id: &str, user_id: &str) -> Session {
        Session {
            id: SessionId::new(id.to_string()),
            user_id: user_id.to_string(),
            scheme: APPLICATION_SCHEME.to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(24),
            tokens: None,
        }
    }

    fn test_flow(verifier: &str) -> AuthFlowState {
        AuthFlowState {
            pkce_verifier: verifier.to_string(),
            nonce: "nonce".to_string(),
            created_at: Utc::now(),
            return_to: None,
        }
    }

    fn sid(id: &str) -> SessionId {
        SessionId::new(id.to_string())
    }

    #[tokio::test]
    async fn session_roundtrip_keeps_tokens() {
        let store = InMemorySessionStore::new();
        let mut session = test_session("session-1", "user-123");
        session.tokens = Some(TokenSet {
            id_token: "id".to_string(),
            access_token: "access".to_string(),
            refresh_token: None,
            expires_at: None,
        });

        store.create_session(&session).await.unwrap();

        let retrieved = store.get_session(&sid("session-1")).await.unwrap().unwrap();
        assert_eq!(retrieved.user_id, "user-123");
        assert_eq!(retrieved.scheme, APPLICATION_SCHEME);
        assert_eq!(retrieved.tokens.unwrap().access_token, "access");
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.get_session(&sid("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_session_is_idempotent() {
        let store = InMemorySessionStore::new();
        store
            .create_session(&test_session("session-1", "user-123"))
            .await
            .unwrap();

        store.delete_session(&sid("session-1")).await.unwrap();
        store.delete_session(&sid("session-1")).await.unwrap();

        assert!(store.get_session(&sid("session-1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_user_sessions_leaves_other_users() {
        let store = InMemorySessionStore::new();
        for (id, user) in [("s1", "u1"), ("s2", "u1"), ("s3", "u2")] {
            store.create_session(&test_session(id, user)).await.unwrap();
        }

        store.delete_user_sessions("u1").await.unwrap();

        assert!(store.get_session(&sid("s1")).await.unwrap().is_none());
        assert!(store.get_session(&sid("s2")).await.unwrap().is_none());
        assert!(store.get_session(&sid("s3")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn auth_flow_can_be_taken_once() {
        let store = InMemorySessionStore::new();
        store
            .store_auth_flow("state-abc", &test_flow("verifier"))
            .await
            .unwrap();
        assert_eq!(store.pending_flows().await, 1);

        let taken = store.take_auth_flow("state-abc").await.unwrap().unwrap();
        assert_eq!(taken.pkce_verifier, "verifier");

        assert!(store.take_auth_flow("state-abc").await.unwrap().is_none());
        assert_eq!(store.pending_flows().await, 0);
    }

    #[tokio::test]
    async fn storing_same_state_overwrites() {
        let store = InMemorySessionStore::new();
        store
            .store_auth_flow("same", &test_flow("verifier-1"))
            .await
            .unwrap();
        store
            .store_auth_flow("same", &test_flow("verifier-2"))
            .await
            .unwrap();

        let taken = store.take_auth_flow("same").await.unwrap().unwrap();
        assert_eq!(taken.pkce_verifier, "verifier-2");
    }

    #[tokio::test]
    async fn abandoned_logins_are_swept_on_next_challenge() {
        let store = InMemorySessionStore::new();
        for i in 0..500 {
            let mut flow = test_flow("old");
            flow.created_at =
                Utc::now() - chrono::Duration::minutes(AUTH_FLOW_MAX_AGE_MINUTES + 1);
            store
                .store_auth_flow(&format!("abandoned-{i}"), &flow)
                .await
                .unwrap();
        }
        store
            .store_auth_flow("live", &test_flow("fresh"))
            .await
            .unwrap();

        assert_eq!(store.pending_flows().await, 1);
        assert!(store.take_auth_flow("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_sessions_are_swept_when_a_session_is_created() {
        let store = InMemorySessionStore::new();
        let mut stale = test_session("stale", "u1");
        stale.expires_at = Utc::now() - chrono::Duration::minutes(1);
        store.create_session(&stale).await.unwrap();

        store
            .create_session(&test_session("fresh", "u1"))
            .await
            .unwrap();

        assert!(store.get_session(&sid("stale")).await.unwrap().is_none());
        assert!(store.get_session(&sid("fresh")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemorySessionStore::new();
        let clone = store.clone();

        store
            .create_session(&test_session("session-1", "user-123"))
            .await
            .unwrap();

        assert!(clone.get_session(&sid("session-1")).await.unwrap().is_some());
    }
}
