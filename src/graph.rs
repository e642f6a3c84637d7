//! Knowledge-Graph Builder (§4.H): extracts concepts/emotions per response
//! and materializes a persona-concept-emotion graph into the in-process
//! snapshot registry owned by `PlatformContext`.

use std::collections::HashMap;

use crate::context::PlatformContext;
use crate::db::models::graph::{
    normalize_label, ConceptAggregate, ConceptExtraction, EmotionAggregate, GraphBuildSummary,
    GraphLink, GraphNode, GraphSnapshot, LinkKind, NodeKind,
};
use crate::db::models::Persona;
use crate::db::repos::{personas, responses};
use crate::error::{AppError, Result};
use crate::llm::{parse_json_response, ChatMessage};
use crate::text;

const MAX_CONCEPTS_PER_RESPONSE: usize = 5;
const MAX_KEY_PHRASES: usize = 3;

async fn extract_with_llm(ctx: &PlatformContext, response_text: &str) -> Result<ConceptExtraction> {
    let prompt = vec![
        ChatMessage::system(
            "Extract structured insight from one focus-group response. Respond with JSON only: \
             {\"concepts\": [string, up to 5], \"emotions\": [string], \"sentiment\": number in [-1,1], \
             \"keyPhrases\": [string, up to 3]}.",
        ),
        ChatMessage::user(response_text.to_string()),
    ];

    let raw = tokio::time::timeout(
        std::time::Duration::from_millis(ctx.settings.llm_timeout_ms),
        ctx.chat.complete(&prompt, 0.0),
    )
    .await
    .map_err(|_| AppError::LLMTimeout(ctx.settings.llm_timeout_ms))??;

    parse_json_response(&raw).map_err(|e| AppError::ExtractionFailed(e.to_string()))
}

fn extract_fallback(ctx: &PlatformContext, response_text: &str) -> ConceptExtraction {
    let stopwords = ctx.settings.stopwords_for("en").to_vec();
    let concepts = text::fallback_concepts(response_text, &stopwords, MAX_CONCEPTS_PER_RESPONSE);
    let sentiment = text::score_sentiment(response_text);
    let emotions = text::detect_emotions(response_text, sentiment);
    let key_phrases = concepts.iter().take(MAX_KEY_PHRASES).cloned().collect();
    ConceptExtraction { concepts, emotions, sentiment, key_phrases }
}

/// Extract concepts/emotions/sentiment for one response, preferring the LLM
/// and falling back to the deterministic keyword pipeline on any failure.
async fn extract_concepts(ctx: &PlatformContext, response_text: &str) -> ConceptExtraction {
    match extract_with_llm(ctx, response_text).await {
        Ok(extraction) => extraction,
        Err(e) => {
            tracing::debug!(error = %e, "concept extraction fell back to keyword pipeline");
            extract_fallback(ctx, response_text)
        }
    }
}

fn persona_node(persona: &Persona) -> GraphNode {
    GraphNode {
        id: persona.id.clone(),
        kind: NodeKind::Persona,
        label: persona.full_name.clone(),
        size: 1.0,
        age: Some(persona.age),
        gender: Some(persona.gender.clone()),
        occupation: Some(persona.occupation.clone()),
        frequency: None,
    }
}

/// Running-blend update: first sighting takes `value` as-is, repeats average
/// with the previous value. Preserved exactly as the product invariant it
/// is, not replaced with a true running mean (§9).
fn blend(prev: Option<f64>, value: f64) -> f64 {
    match prev {
        Some(p) => (p + value) / 2.0,
        None => value,
    }
}

fn mean_sentiment_for(aggregate: &ConceptAggregate, persona_id: &str) -> Option<f64> {
    aggregate.per_persona_sentiment.get(persona_id).copied()
}

/// Rebuild the knowledge graph for one focus group from its persisted
/// responses and store it in the snapshot registry, replacing whatever was
/// there before. Idempotent: rebuilding twice from the same responses
/// produces the same aggregate values up to floating-point drift.
pub async fn build_graph(ctx: &PlatformContext, focus_group_id: &str) -> Result<GraphBuildSummary> {
    let all_responses = responses::get_by_focus_group(&ctx.db, focus_group_id)?;
    if all_responses.is_empty() {
        let snapshot = GraphSnapshot::new(focus_group_id);
        ctx.store_snapshot(snapshot);
        return Ok(GraphBuildSummary::default());
    }

    let mut persona_cache: HashMap<String, Persona> = HashMap::new();
    for persona_id in all_responses.iter().map(|r| r.persona_id.clone()).collect::<std::collections::HashSet<_>>() {
        if let Ok(p) = personas::get_by_id(&ctx.db, &persona_id) {
            persona_cache.insert(persona_id, p);
        }
    }

    let mut snapshot = GraphSnapshot::new(focus_group_id);
    for persona in persona_cache.values() {
        snapshot.persona_nodes.insert(persona.id.clone(), persona_node(persona));
    }

    for response in &all_responses {
        if response.is_error || response.response_text.trim().is_empty() {
            continue;
        }
        let extraction = extract_concepts(ctx, &response.response_text).await;

        for raw_concept in &extraction.concepts {
            let label = normalize_label(raw_concept);
            let entry = snapshot.concepts.entry(label.clone()).or_insert_with(|| ConceptAggregate {
                label: label.clone(),
                frequency: 0,
                per_persona_sentiment: HashMap::new(),
                per_persona_mentions: HashMap::new(),
            });
            entry.frequency += 1;
            let prev = entry.per_persona_sentiment.get(&response.persona_id).copied();
            entry
                .per_persona_sentiment
                .insert(response.persona_id.clone(), blend(prev, extraction.sentiment));
            *entry.per_persona_mentions.entry(response.persona_id.clone()).or_insert(0) += 1;
        }

        for raw_emotion in &extraction.emotions {
            let label = normalize_label(raw_emotion);
            let entry = snapshot.emotions.entry(label.clone()).or_insert_with(|| EmotionAggregate {
                label: label.clone(),
                count: 0,
                per_persona_intensity: HashMap::new(),
            });
            entry.count += 1;
            let intensity = extraction.sentiment.abs();
            let prev = entry.per_persona_intensity.get(&response.persona_id).copied();
            entry
                .per_persona_intensity
                .insert(response.persona_id.clone(), blend(prev, intensity));
        }
    }

    let persona_ids: Vec<String> = persona_cache.keys().cloned().collect();
    let mut links = Vec::new();
    for i in 0..persona_ids.len() {
        for j in (i + 1)..persona_ids.len() {
            let a = &persona_ids[i];
            let b = &persona_ids[j];

            let shared: Vec<&ConceptAggregate> = snapshot
                .concepts
                .values()
                .filter(|c| c.per_persona_mentions.contains_key(a) && c.per_persona_mentions.contains_key(b))
                .collect();
            if shared.is_empty() {
                continue;
            }

            let mean_abs_diff: f64 = shared
                .iter()
                .filter_map(|c| {
                    let sa = mean_sentiment_for(c, a)?;
                    let sb = mean_sentiment_for(c, b)?;
                    Some((sa - sb).abs())
                })
                .sum::<f64>()
                / shared.len() as f64;

            let similarity = ((shared.len() as f64 / 10.0) - mean_abs_diff).clamp(-1.0, 1.0);

            if similarity > 0.5 {
                links.push(GraphLink {
                    source: a.clone(),
                    target: b.clone(),
                    kind: LinkKind::Agrees,
                    value: similarity,
                    count: shared.len() as i64,
                });
            } else if similarity < -0.3 {
                links.push(GraphLink {
                    source: a.clone(),
                    target: b.clone(),
                    kind: LinkKind::Disagrees,
                    value: similarity.abs(),
                    count: shared.len() as i64,
                });
            }
        }
    }

    let summary = GraphBuildSummary {
        personas_added: snapshot.persona_nodes.len() as i64,
        concepts_extracted: snapshot.concepts.len() as i64,
        relationships_created: links.len() as i64,
        emotions_created: snapshot.emotions.len() as i64,
    };
    snapshot.persona_links = links;

    ctx.store_snapshot(snapshot);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        CreateFocusGroupInput, CreatePersonaInput, CreateProjectInput, CreateResponseInput,
    };
    use crate::db::repos::{focus_groups, projects, responses as response_repo};

    fn sample_persona_input(project_id: &str, name: &str) -> CreatePersonaInput {
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
            full_name: name.into(),
            headline: "Pragmatic".into(),
            background_story: "N/A".into(),
            values: "honesty".into(),
            interests: "cycling".into(),
            synthesis_prompt: None,
        }
    }

    #[tokio::test]
    async fn test_build_graph_extracts_controversial_concept() {
        let ctx = PlatformContext::for_tests();
        let project = projects::create(
            &ctx.db,
            CreateProjectInput {
                owner_id: "u1".into(),
                name: "P".into(),
                target_distribution: Default::default(),
                target_sample_size: 4,
            },
        )
        .unwrap();

        let p1 = personas::create(&ctx.db, sample_persona_input(&project.id, "A")).unwrap();
        let p2 = personas::create(&ctx.db, sample_persona_input(&project.id, "B")).unwrap();
        let p3 = personas::create(&ctx.db, sample_persona_input(&project.id, "C")).unwrap();
        let p4 = personas::create(&ctx.db, sample_persona_input(&project.id, "D")).unwrap();

        let fg = focus_groups::create(
            &ctx.db,
            CreateFocusGroupInput {
                project_id: project.id,
                name: "FG".into(),
                persona_ids: vec![p1.id.clone(), p2.id.clone(), p3.id.clone(), p4.id.clone()],
                questions: vec!["What do you think of the quality?".into()],
                mode: None,
            },
        )
        .unwrap();

        response_repo::create_batch(
            &ctx.db,
            vec![
                CreateResponseInput {
                    focus_group_id: fg.id.clone(),
                    persona_id: p1.id.clone(),
                    question_index: 0,
                    question: "Q".into(),
                    response_text: "The quality is great, I love it".into(),
                    is_error: false,
                    response_time_ms: 400,
                    consistency_score: None,
                },
                CreateResponseInput {
                    focus_group_id: fg.id.clone(),
                    persona_id: p2.id.clone(),
                    question_index: 0,
                    question: "Q".into(),
                    response_text: "The quality is amazing and great".into(),
                    is_error: false,
                    response_time_ms: 400,
                    consistency_score: None,
                },
                CreateResponseInput {
                    focus_group_id: fg.id.clone(),
                    persona_id: p3.id.clone(),
                    question_index: 0,
                    question: "Q".into(),
                    response_text: "The quality is terrible and awful".into(),
                    is_error: false,
                    response_time_ms: 400,
                    consistency_score: None,
                },
                CreateResponseInput {
                    focus_group_id: fg.id.clone(),
                    persona_id: p4.id.clone(),
                    question_index: 0,
                    question: "Q".into(),
                    response_text: "The quality is bad and disappointing".into(),
                    is_error: false,
                    response_time_ms: 400,
                    consistency_score: None,
                },
            ],
        )
        .unwrap();

        let summary = build_graph(&ctx, &fg.id).await.unwrap();
        assert_eq!(summary.personas_added, 4);
        assert!(summary.concepts_extracted >= 1);

        let snapshot = ctx.snapshot_for(&fg.id).unwrap();
        assert!(snapshot.concepts.contains_key("Quality"));
    }

    #[tokio::test]
    async fn test_build_graph_on_empty_responses_is_well_formed() {
        let ctx = PlatformContext::for_tests();
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
        let fg = focus_groups::create(
            &ctx.db,
            CreateFocusGroupInput {
                project_id: project.id,
                name: "FG".into(),
                persona_ids: vec!["nonexistent".into()],
                questions: vec!["Q".into()],
                mode: None,
            },
        )
        .unwrap();

        let summary = build_graph(&ctx, &fg.id).await.unwrap();
        assert_eq!(summary.personas_added, 0);
    }
}
