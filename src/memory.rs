//! Event Store (§4.D) and Context Retriever (§4.E): an append-only,
//! per-persona event log with embedding-based relevance retrieval.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::Mutex as AsyncMutex;

use crate::context::PlatformContext;
use crate::db::models::{EventData, PersonaEvent, RetrievedContext};
use crate::db::repos::events;
use crate::error::Result;
use crate::llm::cosine_similarity;

const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// Serializes appends per persona at the Rust-task level, on top of the
/// storage-layer transaction in `db::repos::events::append` that computes
/// the next sequence number. Two tasks racing to append for the same
/// persona would otherwise both read the same `MAX(sequence_number)` before
/// either commits; SQLite's write lock prevents corruption but not the
/// wasted retry, so this mutex map avoids that in the common case.
pub struct EventStore {
    locks: Mutex<HashMap<String, std::sync::Arc<AsyncMutex<()>>>>,
}

impl EventStore {
    pub fn new() -> Self {
        EventStore { locks: Mutex::new(HashMap::new()) }
    }

    fn lock_for(&self, persona_id: &str) -> std::sync::Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(persona_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Append one event, embedding its rendered text first so the stored
    /// row always carries an embedding when the provider succeeds. If
    /// embedding fails, the event is still appended without one — losing
    /// retrievability for that single event is preferable to losing the
    /// record of it happening (§7 propagation policy: non-fatal by default).
    pub async fn append(
        &self,
        ctx: &PlatformContext,
        persona_id: &str,
        focus_group_id: Option<&str>,
        event_data: EventData,
    ) -> Result<PersonaEvent> {
        let permit = self.lock_for(persona_id);
        let _guard = permit.lock().await;

        let embedding = ctx.embeddings.embed(&event_data.to_embedding_text()).await.ok();
        let timestamp = chrono::Utc::now().to_rfc3339();

        events::append(
            &ctx.db,
            persona_id,
            focus_group_id,
            &event_data,
            embedding.as_deref(),
            &timestamp,
        )
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Score one event against a query embedding: cosine similarity decayed by
/// age, half-life `half_life_days` (§4.E, 30-day default).
fn relevance_score(similarity: f64, age_days: f64, half_life_days: f64) -> f64 {
    let half_life_seconds = half_life_days * SECONDS_PER_DAY;
    let age_seconds = age_days * SECONDS_PER_DAY;
    similarity * (-age_seconds / half_life_seconds).exp()
}

/// Retrieve the `top_k` most relevant prior events for a persona given a
/// query string, combining cosine similarity with exponential time decay.
/// When `time_decay` is false the decay factor is skipped and events are
/// ranked by raw similarity alone (§4.E property E7: order may differ when
/// time_decay=false). Ties break on the newer timestamp (§4.E ordering
/// guarantee).
pub async fn retrieve_context(
    ctx: &PlatformContext,
    persona_id: &str,
    query: &str,
    top_k: usize,
    time_decay: bool,
) -> Result<Vec<RetrievedContext>> {
    let query_embedding = ctx.embeddings.embed(query).await?;
    let all = events::all_for_persona(&ctx.db, persona_id)?;
    let now = chrono::Utc::now();

    let mut scored: Vec<RetrievedContext> = all
        .into_iter()
        .filter_map(|event| {
            let embedding = event.embedding.as_ref()?;
            let similarity = cosine_similarity(embedding, &query_embedding);
            let event_time = chrono::DateTime::parse_from_rfc3339(&event.timestamp).ok()?;
            let age_days = (now - event_time.with_timezone(&chrono::Utc)).num_seconds() as f64
                / SECONDS_PER_DAY;
            let age_days = age_days.max(0.0);
            let score = if time_decay {
                relevance_score(similarity, age_days, ctx.settings.embedding_half_life_days)
            } else {
                similarity
            };
            Some(RetrievedContext {
                event_id: event.id,
                event_data: event.event_data,
                timestamp: event.timestamp,
                similarity,
                relevance_score: score,
                age_days,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    scored.truncate(top_k);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::persona::CreatePersonaInput;
    use crate::db::models::project::CreateProjectInput;
    use crate::db::repos::{personas, projects};

    fn sample_persona_input(project_id: &str) -> CreatePersonaInput {
        CreatePersonaInput {
            project_id: project_id.to_string(),
            age: 30,
            gender: "female".into(),
            location: "Warsaw".into(),
            education: "Bachelor".into(),
            income_bracket: "50k-75k".into(),
            occupation: "Designer".into(),
            traits: Default::default(),
            dimensions: Default::default(),
            full_name: "Jane".into(),
            headline: "Pragmatic".into(),
            background_story: "N/A".into(),
            values: "honesty".into(),
            interests: "cycling".into(),
            synthesis_prompt: None,
        }
    }

    fn create_test_persona(ctx: &PlatformContext) -> String {
        let project = projects::create(
            &ctx.db,
            CreateProjectInput {
                owner_id: "u1".into(),
                name: "P".into(),
                target_distribution: Default::default(),
                target_sample_size: 1,
            },
        )
        .unwrap();
        personas::create(&ctx.db, sample_persona_input(&project.id)).unwrap().id
    }

    #[test]
    fn test_relevance_score_decays_with_age() {
        let fresh = relevance_score(0.9, 0.0, 30.0);
        let month_old = relevance_score(0.9, 30.0, 30.0);
        let year_old = relevance_score(0.9, 365.0, 30.0);
        assert!(fresh > month_old);
        assert!(month_old > year_old);
        assert!((fresh - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_append_and_retrieve_roundtrip() {
        let ctx = PlatformContext::for_tests();
        let store = EventStore::new();
        let persona_id = create_test_persona(&ctx);

        store
            .append(
                &ctx,
                &persona_id,
                None,
                EventData::QuestionAsked { question: "What do you think of electric cars?".into() },
            )
            .await
            .unwrap();
        store
            .append(
                &ctx,
                &persona_id,
                None,
                EventData::ResponseGiven {
                    question: "What do you think of electric cars?".into(),
                    response: "I think they're great for city driving.".into(),
                },
            )
            .await
            .unwrap();

        let results = retrieve_context(&ctx, &persona_id, "electric cars", 5, true).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].relevance_score >= results[1].relevance_score);
    }

    #[tokio::test]
    async fn test_retrieve_context_time_decay_toggle_changes_scores() {
        let ctx = PlatformContext::for_tests();
        let store = EventStore::new();
        let persona_id = create_test_persona(&ctx);

        store
            .append(
                &ctx,
                &persona_id,
                None,
                EventData::QuestionAsked { question: "What do you think of electric cars?".into() },
            )
            .await
            .unwrap();

        let decayed = retrieve_context(&ctx, &persona_id, "electric cars", 5, true).await.unwrap();
        let undecayed = retrieve_context(&ctx, &persona_id, "electric cars", 5, false).await.unwrap();

        assert_eq!(decayed.len(), 1);
        assert_eq!(undecayed.len(), 1);
        assert_eq!(undecayed[0].relevance_score, undecayed[0].similarity);
    }
}
