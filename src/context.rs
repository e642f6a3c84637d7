use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Settings;
use crate::db::models::graph::GraphSnapshot;
use crate::db::DbPool;
use crate::llm::stub::{StubChatProvider, StubEmbeddingProvider};
use crate::llm::{ChatProvider, EmbeddingProvider};

/// Every built-in graph snapshot for a focus group, guarded by one mutex.
/// §4.H describes a single writer building a snapshot while readers use the
/// last completed one; a `Mutex<HashMap>` gives exclusive access for a build
/// and blocks readers only for the (bounded, CPU-only) duration of a swap.
pub type GraphRegistry = Mutex<HashMap<String, Arc<GraphSnapshot>>>;

/// The one piece of shared, process-wide state every subsystem is threaded
/// through: database pool, provider handles, RNG, settings, and the graph
/// snapshot registry. Analogous to the Tauri app's managed state, minus the
/// window/event-emitter surface this crate doesn't have.
pub struct PlatformContext {
    pub db: DbPool,
    pub settings: Settings,
    pub chat: Arc<dyn ChatProvider>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub rng: Mutex<StdRng>,
    pub graphs: GraphRegistry,
}

impl PlatformContext {
    pub fn new(
        db: DbPool,
        settings: Settings,
        chat: Arc<dyn ChatProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let rng = StdRng::seed_from_u64(settings.random_seed);
        PlatformContext {
            db,
            settings,
            chat,
            embeddings,
            rng: Mutex::new(rng),
            graphs: Mutex::new(HashMap::new()),
        }
    }

    /// Build a context wired to real HTTP-backed providers, configured from
    /// the environment. Panics are avoided; missing provider configuration
    /// falls back to the stub providers so the engine always starts.
    pub fn from_env(db: DbPool) -> Self {
        let settings = Settings::from_env();
        let chat: Arc<dyn ChatProvider> = match (
            std::env::var("PANELIST_LLM_BASE_URL"),
            std::env::var("PANELIST_LLM_API_KEY"),
        ) {
            (Ok(base_url), Ok(api_key)) => {
                let model = std::env::var("PANELIST_LLM_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string());
                Arc::new(crate::llm::http::HttpChatProvider::new(base_url, api_key, model))
            }
            _ => Arc::new(StubChatProvider::new()),
        };
        let embeddings: Arc<dyn EmbeddingProvider> = match (
            std::env::var("PANELIST_EMBEDDING_BASE_URL"),
            std::env::var("PANELIST_EMBEDDING_API_KEY"),
        ) {
            (Ok(base_url), Ok(api_key)) => {
                let model = std::env::var("PANELIST_EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string());
                Arc::new(crate::llm::http::HttpEmbeddingProvider::new(base_url, api_key, model))
            }
            _ => Arc::new(StubEmbeddingProvider::new()),
        };
        PlatformContext::new(db, settings, chat, embeddings)
    }

    /// A context wired to deterministic stub providers and an isolated
    /// in-memory database, for tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let db = crate::db::init_test_db().expect("test db init");
        PlatformContext::new(
            db,
            Settings::default(),
            Arc::new(StubChatProvider::new()),
            Arc::new(StubEmbeddingProvider::new()),
        )
    }

    pub fn snapshot_for(&self, focus_group_id: &str) -> Option<Arc<GraphSnapshot>> {
        self.graphs.lock().unwrap().get(focus_group_id).cloned()
    }

    pub fn store_snapshot(&self, snapshot: GraphSnapshot) {
        self.graphs
            .lock()
            .unwrap()
            .insert(snapshot.focus_group_id.clone(), Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_roundtrip() {
        let ctx = PlatformContext::for_tests();
        assert!(ctx.snapshot_for("fg-1").is_none());
        ctx.store_snapshot(GraphSnapshot::new("fg-1"));
        assert!(ctx.snapshot_for("fg-1").is_some());
    }
}
