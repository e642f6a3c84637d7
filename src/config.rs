use std::collections::HashMap;

/// Process-wide configuration, loaded once from the environment at startup.
/// Every field here is named in §6 of the specification. Defaults match the
/// ones called out there.
#[derive(Debug, Clone)]
pub struct Settings {
    pub worker_parallelism: usize,
    pub llm_timeout_ms: u64,
    pub llm_temperature: f64,
    pub embedding_half_life_days: f64,
    pub random_seed: u64,
    pub slo_total_ms: u64,
    pub slo_avg_ms: u64,
    pub top_k_retrieval: usize,
    pub stopword_sets: HashMap<String, Vec<String>>,
    pub graph_backend: GraphBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphBackend {
    /// MERGE-style writes against an external graph store. Not wired up in
    /// this repository — none of the example crates this was grounded on
    /// ship a graph-database client, and choosing one is a deployment
    /// decision, not an engine one. `InMemory` is always used in practice.
    External,
    InMemory,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            worker_parallelism: 50,
            llm_timeout_ms: 15_000,
            llm_temperature: 0.8,
            embedding_half_life_days: 30.0,
            random_seed: 42,
            slo_total_ms: 30_000,
            slo_avg_ms: 3_000,
            top_k_retrieval: 5,
            stopword_sets: default_stopwords(),
            graph_backend: GraphBackend::InMemory,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let mut s = Settings::default();
        if let Ok(v) = std::env::var("PANELIST_WORKER_PARALLELISM") {
            if let Ok(n) = v.parse() {
                s.worker_parallelism = n;
            }
        }
        if let Ok(v) = std::env::var("PANELIST_LLM_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                s.llm_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("PANELIST_LLM_TEMPERATURE") {
            if let Ok(n) = v.parse() {
                s.llm_temperature = n;
            }
        }
        if let Ok(v) = std::env::var("PANELIST_RANDOM_SEED") {
            if let Ok(n) = v.parse() {
                s.random_seed = n;
            }
        }
        s
    }

    pub fn stopwords_for(&self, lang: &str) -> &[String] {
        self.stopword_sets
            .get(lang)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn default_stopwords() -> HashMap<String, Vec<String>> {
    let en = [
        "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being",
        "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "may",
        "might", "must", "can", "this", "that", "these", "those", "i", "you", "he", "she", "it",
        "we", "they", "them", "their", "what", "which", "who", "when", "where", "why", "how",
        "all", "each", "for", "with", "about", "against", "between", "into", "through", "during",
        "before", "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off",
        "over", "under", "again", "further", "then", "once", "here", "there", "not", "only",
        "own", "same", "so", "than", "too", "very", "just", "of", "at", "by", "as",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut m = HashMap::new();
    m.insert("en".to_string(), en);
    m
}
