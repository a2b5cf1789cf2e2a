//! Registry of active sessions.

use crate::generator::{GeminiGenerator, TextGenerator};
use crate::session::Session;
use live_common::{Config, Error, Result, SummaryConfig};
use live_tools::{CloudFunctionExecutor, ToolExecutor};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Owns every active [`Session`], keyed by the id the transport assigned.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    summary_config: SummaryConfig,
    generator: Arc<dyn TextGenerator>,
    tools: Arc<dyn ToolExecutor>,
}

impl SessionRegistry {
    pub fn new(
        summary_config: SummaryConfig,
        generator: Arc<dyn TextGenerator>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            summary_config,
            generator,
            tools,
        }
    }

    /// Build a registry backed by Gemini and the configured cloud functions.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.summary.clone(),
            Arc::new(GeminiGenerator::new(config.api.clone())),
            Arc::new(CloudFunctionExecutor::from_config(&config.tools)),
        )
    }

    /// Create and register a session. An id that is already registered is
    /// rejected; the existing session is left untouched.
    pub async fn create(&self, id: &str) -> Result<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return Err(Error::AlreadyExists(format!("session {id}")));
        }

        let session = Arc::new(Session::new(
            id,
            self.summary_config.clone(),
            Arc::clone(&self.generator),
            Arc::clone(&self.tools),
        ));
        sessions.insert(id.to_string(), Arc::clone(&session));

        tracing::info!(session_id = %id, active = sessions.len(), "Created session");
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove and close a session. Returns false when the id is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Ids of all active sessions, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("generator", &self.generator.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EchoTools, RecordingLive, ScriptedGenerator};

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            SummaryConfig::default(),
            Arc::new(ScriptedGenerator::default()),
            Arc::new(EchoTools::default()),
        )
    }

    #[tokio::test]
    async fn create_and_get() {
        let registry = registry();
        assert!(registry.is_empty().await);

        let session = registry.create("conn-1").await.unwrap();
        assert_eq!(session.id(), "conn-1");

        let found = registry.get("conn-1").await.unwrap();
        assert!(Arc::ptr_eq(&session, &found));
        assert!(registry.get("conn-2").await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let registry = registry();
        let first = registry.create("conn-1").await.unwrap();
        first.summary().add_transcript("keep me");

        let err = registry.create("conn-1").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));

        let current = registry.get("conn-1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(current.summary().buffered_fragments(), vec!["keep me"]);
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_closes() {
        let registry = registry();
        let session = registry.create("conn-1").await.unwrap();
        session.attach_live(Arc::new(RecordingLive::default()));

        assert!(registry.remove("conn-1").await);
        assert!(!session.is_live_attached());
        assert!(!registry.remove("conn-1").await);
        assert!(!registry.remove("never-existed").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn clones_share_sessions() {
        let registry = registry();
        let clone = registry.clone();
        registry.create("b").await.unwrap();
        clone.create("a").await.unwrap();
        assert_eq!(registry.ids().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let registry = registry();
        let a = registry.create("a").await.unwrap();
        let b = registry.create("b").await.unwrap();
        a.summary().add_transcript("only in a");
        a.on_user_input().await;

        assert!(b.summary().buffered_fragments().is_empty());
        assert_eq!(b.snapshot().await.phase, crate::turn::TurnPhase::Idle);
    }

    #[test]
    fn from_config_uses_gemini() {
        let registry = SessionRegistry::from_config(&Config::default());
        assert!(format!("{registry:?}").contains("gemini"));
    }
}
