//! Query Layer (§4.I): a stateless read-only façade over one focus group's
//! `GraphSnapshot`. Nothing here mutates the snapshot or touches the database
//! beyond the persona history convenience wrapper.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::PlatformContext;
use crate::db::models::graph::{GraphLink, GraphNode, GraphSnapshot, LinkKind, NodeKind};
use crate::db::models::event::PersonaEvent;
use crate::db::repos::events;
use crate::error::{AppError, Result};

const TOP_N: usize = 10;
const SAMPLE_PERSONAS: usize = 5;
const CONTROVERSY_MIN_MENTIONS: i64 = 3;
const CONTROVERSY_STDEV_THRESHOLD: f64 = 0.4;
const INFLUENCE_MIN_EDGES: i64 = 3;
const POSITIVE_THRESHOLD: f64 = 0.6;
const NEGATIVE_THRESHOLD: f64 = -0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFilter {
    Positive,
    Negative,
    Influence,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDataView {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyConcept {
    pub concept: String,
    pub mention_count: i64,
    pub mean_sentiment: f64,
    pub sample_personas: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControversialConcept {
    pub concept: String,
    pub mention_count: i64,
    pub polarization: f64,
    pub supporters: Vec<String>,
    pub critics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluentialPersona {
    pub persona_id: String,
    pub label: String,
    pub connection_count: i64,
    pub mean_sentiment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionShare {
    pub emotion: String,
    pub participant_count: i64,
    pub mean_intensity: f64,
    pub share_of_participants: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnswer {
    pub answer: String,
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitOpinionBucket {
    pub age_decade: i64,
    pub mean_sentiment: f64,
    pub participant_count: i64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn persona_label(snapshot: &GraphSnapshot, persona_id: &str) -> String {
    snapshot
        .persona_nodes
        .get(persona_id)
        .map(|n| n.label.clone())
        .unwrap_or_else(|| persona_id.to_string())
}

/// A persona's mean sentiment across every concept they mentioned — the
/// value the `positive`/`negative`/`influential_personas` reads key off.
fn persona_mean_mentions_sentiment(snapshot: &GraphSnapshot, persona_id: &str) -> Option<f64> {
    let sentiments: Vec<f64> = snapshot
        .concepts
        .values()
        .filter_map(|c| c.per_persona_sentiment.get(persona_id).copied())
        .collect();
    if sentiments.is_empty() {
        None
    } else {
        Some(mean(&sentiments))
    }
}

fn mentions_links(snapshot: &GraphSnapshot) -> Vec<GraphLink> {
    let mut out = Vec::new();
    for concept in snapshot.concepts.values() {
        for (persona_id, sentiment) in &concept.per_persona_sentiment {
            let count = concept.per_persona_mentions.get(persona_id).copied().unwrap_or(1);
            out.push(GraphLink {
                source: persona_id.clone(),
                target: concept.label.clone(),
                kind: LinkKind::Mentions,
                value: *sentiment,
                count,
            });
        }
    }
    out
}

fn feels_links(snapshot: &GraphSnapshot) -> Vec<GraphLink> {
    let mut out = Vec::new();
    for emotion in snapshot.emotions.values() {
        for (persona_id, intensity) in &emotion.per_persona_intensity {
            out.push(GraphLink {
                source: persona_id.clone(),
                target: emotion.label.clone(),
                kind: LinkKind::Feels,
                value: *intensity,
                count: emotion.count,
            });
        }
    }
    out
}

fn concept_and_emotion_nodes(snapshot: &GraphSnapshot) -> Vec<GraphNode> {
    let mut nodes = Vec::new();
    for concept in snapshot.concepts.values() {
        nodes.push(GraphNode {
            id: concept.label.clone(),
            kind: NodeKind::Concept,
            label: concept.label.clone(),
            size: concept.frequency as f64,
            age: None,
            gender: None,
            occupation: None,
            frequency: Some(concept.frequency),
        });
    }
    for emotion in snapshot.emotions.values() {
        nodes.push(GraphNode {
            id: emotion.label.clone(),
            kind: NodeKind::Emotion,
            label: emotion.label.clone(),
            size: emotion.count as f64,
            age: None,
            gender: None,
            occupation: None,
            frequency: Some(emotion.count),
        });
    }
    nodes
}

/// Build the full, unfiltered node/link view with display size set
/// proportional to degree for persona nodes (§4.I).
fn full_view(snapshot: &GraphSnapshot) -> GraphDataView {
    let mut nodes: Vec<GraphNode> = snapshot
        .persona_nodes
        .values()
        .map(|n| GraphNode { size: snapshot.degree(&n.id) as f64, ..n.clone() })
        .collect();
    nodes.extend(concept_and_emotion_nodes(snapshot));

    let mut links = mentions_links(snapshot);
    links.extend(feels_links(snapshot));
    links.extend(snapshot.persona_links.iter().cloned());

    GraphDataView { nodes, links }
}

/// §4.I `graph_data`: the full view, or one narrowed to the personas that
/// satisfy `filter`. Concept and emotion nodes always pass through; only
/// persona nodes (and the links touching a dropped persona) are filtered.
pub fn graph_data(ctx: &PlatformContext, focus_group_id: &str, filter: GraphFilter) -> Result<GraphDataView> {
    let snapshot = ctx
        .snapshot_for(focus_group_id)
        .ok_or_else(|| AppError::NotFound(format!("no graph snapshot for focus group {focus_group_id}")))?;

    let view = full_view(&snapshot);
    if filter == GraphFilter::None {
        return Ok(view);
    }

    let keep_persona = |persona_id: &str| -> bool {
        match filter {
            GraphFilter::Positive => {
                persona_mean_mentions_sentiment(&snapshot, persona_id).map(|s| s >= POSITIVE_THRESHOLD).unwrap_or(false)
            }
            GraphFilter::Negative => {
                persona_mean_mentions_sentiment(&snapshot, persona_id).map(|s| s <= NEGATIVE_THRESHOLD).unwrap_or(false)
            }
            GraphFilter::Influence => snapshot.degree(persona_id) >= INFLUENCE_MIN_EDGES,
            GraphFilter::None => true,
        }
    };

    let dropped_personas: std::collections::HashSet<String> = snapshot
        .persona_nodes
        .keys()
        .filter(|id| !keep_persona(id))
        .cloned()
        .collect();

    let nodes = view
        .nodes
        .into_iter()
        .filter(|n| n.kind != NodeKind::Persona || !dropped_personas.contains(&n.id))
        .collect();
    let links = view
        .links
        .into_iter()
        .filter(|l| !dropped_personas.contains(&l.source) && !dropped_personas.contains(&l.target))
        .collect();

    Ok(GraphDataView { nodes, links })
}

/// §4.I `key_concepts`: top-10 by mention count.
pub fn key_concepts(ctx: &PlatformContext, focus_group_id: &str) -> Result<Vec<KeyConcept>> {
    let snapshot = ctx
        .snapshot_for(focus_group_id)
        .ok_or_else(|| AppError::NotFound(format!("no graph snapshot for focus group {focus_group_id}")))?;

    let mut concepts: Vec<KeyConcept> = snapshot
        .concepts
        .values()
        .map(|c| {
            let sentiments: Vec<f64> = c.per_persona_sentiment.values().copied().collect();
            let mut sample: Vec<String> = c.per_persona_mentions.keys().map(|id| persona_label(&snapshot, id)).collect();
            sample.sort();
            sample.truncate(SAMPLE_PERSONAS);
            KeyConcept {
                concept: c.label.clone(),
                mention_count: c.frequency,
                mean_sentiment: mean(&sentiments),
                sample_personas: sample,
            }
        })
        .collect();

    concepts.sort_by(|a, b| b.mention_count.cmp(&a.mention_count).then_with(|| a.concept.cmp(&b.concept)));
    concepts.truncate(TOP_N);
    Ok(concepts)
}

/// §4.I `controversial_concepts`: ≥3 mentions, sentiment stdev > 0.4.
pub fn controversial_concepts(ctx: &PlatformContext, focus_group_id: &str) -> Result<Vec<ControversialConcept>> {
    let snapshot = ctx
        .snapshot_for(focus_group_id)
        .ok_or_else(|| AppError::NotFound(format!("no graph snapshot for focus group {focus_group_id}")))?;

    let mut out = Vec::new();
    for c in snapshot.concepts.values() {
        if c.frequency < CONTROVERSY_MIN_MENTIONS {
            continue;
        }
        let sentiments: Vec<f64> = c.per_persona_sentiment.values().copied().collect();
        let polarization = stdev(&sentiments);
        if polarization <= CONTROVERSY_STDEV_THRESHOLD {
            continue;
        }

        let mut supporters: Vec<String> = Vec::new();
        let mut critics: Vec<String> = Vec::new();
        for (persona_id, sentiment) in &c.per_persona_sentiment {
            if *sentiment > 0.5 {
                supporters.push(persona_label(&snapshot, persona_id));
            } else if *sentiment < -0.3 {
                critics.push(persona_label(&snapshot, persona_id));
            }
        }
        supporters.sort();
        critics.sort();

        out.push(ControversialConcept {
            concept: c.label.clone(),
            mention_count: c.frequency,
            polarization,
            supporters,
            critics,
        });
    }

    out.sort_by(|a, b| b.polarization.partial_cmp(&a.polarization).unwrap_or(std::cmp::Ordering::Equal));
    Ok(out)
}

/// §4.I `influential_personas`: top-10 by connection count.
pub fn influential_personas(ctx: &PlatformContext, focus_group_id: &str) -> Result<Vec<InfluentialPersona>> {
    let snapshot = ctx
        .snapshot_for(focus_group_id)
        .ok_or_else(|| AppError::NotFound(format!("no graph snapshot for focus group {focus_group_id}")))?;

    let mut out: Vec<InfluentialPersona> = snapshot
        .persona_nodes
        .keys()
        .map(|id| InfluentialPersona {
            persona_id: id.clone(),
            label: persona_label(&snapshot, id),
            connection_count: snapshot.degree(id),
            mean_sentiment: persona_mean_mentions_sentiment(&snapshot, id).unwrap_or(0.0),
        })
        .collect();

    out.sort_by(|a, b| b.connection_count.cmp(&a.connection_count).then_with(|| a.label.cmp(&b.label)));
    out.truncate(TOP_N);
    Ok(out)
}

/// §4.I `emotion_distribution`: per emotion, participant count, mean
/// intensity, and share of the focus group's total participants.
pub fn emotion_distribution(ctx: &PlatformContext, focus_group_id: &str) -> Result<Vec<EmotionShare>> {
    let snapshot = ctx
        .snapshot_for(focus_group_id)
        .ok_or_else(|| AppError::NotFound(format!("no graph snapshot for focus group {focus_group_id}")))?;

    let total_participants = snapshot.persona_nodes.len().max(1) as f64;
    let mut out: Vec<EmotionShare> = snapshot
        .emotions
        .values()
        .map(|e| {
            let intensities: Vec<f64> = e.per_persona_intensity.values().copied().collect();
            let participant_count = e.per_persona_intensity.len() as i64;
            EmotionShare {
                emotion: e.label.clone(),
                participant_count,
                mean_intensity: mean(&intensities),
                share_of_participants: participant_count as f64 / total_participants,
            }
        })
        .collect();

    out.sort_by(|a, b| b.participant_count.cmp(&a.participant_count).then_with(|| a.emotion.cmp(&b.emotion)));
    Ok(out)
}

/// §11 supplemental: age-decade-bucketed mean `MENTIONS` sentiment toward one
/// concept, grounded in the original's `get_trait_opinion_correlations`.
pub fn trait_opinion_correlations(
    ctx: &PlatformContext,
    focus_group_id: &str,
    concept: &str,
) -> Result<Vec<TraitOpinionBucket>> {
    let snapshot = ctx
        .snapshot_for(focus_group_id)
        .ok_or_else(|| AppError::NotFound(format!("no graph snapshot for focus group {focus_group_id}")))?;

    let normalized = crate::db::models::graph::normalize_label(concept);
    let Some(aggregate) = snapshot.concepts.get(&normalized) else {
        return Ok(Vec::new());
    };

    let mut by_decade: HashMap<i64, Vec<f64>> = HashMap::new();
    for (persona_id, sentiment) in &aggregate.per_persona_sentiment {
        let Some(node) = snapshot.persona_nodes.get(persona_id) else { continue };
        let Some(age) = node.age else { continue };
        let decade = (age / 10) * 10;
        by_decade.entry(decade).or_default().push(*sentiment);
    }

    let mut out: Vec<TraitOpinionBucket> = by_decade
        .into_iter()
        .map(|(decade, sentiments)| TraitOpinionBucket {
            age_decade: decade,
            mean_sentiment: mean(&sentiments),
            participant_count: sentiments.len() as i64,
        })
        .collect();
    out.sort_by_key(|b| b.age_decade);
    Ok(out)
}

/// §11 supplemental: thin wrapper over the event store's history read,
/// exposed as a first-class dashboard-facing query.
pub fn persona_history(ctx: &PlatformContext, persona_id: &str, limit: i64) -> Result<Vec<PersonaEvent>> {
    events::history(&ctx.db, persona_id, limit)
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// §4.I `answer_question`: a rule-based keyword-family router over the
/// primitives above, with a synthesis default for unmatched queries.
pub fn answer_question(ctx: &PlatformContext, focus_group_id: &str, natural_language_query: &str) -> Result<QueryAnswer> {
    let q = natural_language_query.to_lowercase();

    if contains_any(&q, &["influence", "influential", "most connected", "sway"]) {
        let top = influential_personas(ctx, focus_group_id)?;
        let answer = match top.first() {
            Some(p) => format!("{} is the most influential participant, with {} connections.", p.label, p.connection_count),
            None => "No participants have recorded connections yet.".to_string(),
        };
        return Ok(QueryAnswer {
            answer,
            follow_up_questions: vec![
                "Who are the top 5 most influential participants?".to_string(),
                "What concepts does the most influential participant mention?".to_string(),
                "How does influence correlate with sentiment?".to_string(),
            ],
        });
    }

    if contains_any(&q, &["controvers", "divisive", "disagree", "polariz"]) {
        let controversial = controversial_concepts(ctx, focus_group_id)?;
        let answer = match controversial.first() {
            Some(c) => format!(
                "\"{}\" is the most controversial topic, with a polarization score of {:.2} ({} supporters, {} critics).",
                c.concept, c.polarization, c.supporters.len(), c.critics.len()
            ),
            None => "No concept shows enough disagreement to be called controversial yet.".to_string(),
        };
        return Ok(QueryAnswer {
            answer,
            follow_up_questions: vec![
                "Who supports and who opposes this topic?".to_string(),
                "How many times was this topic mentioned?".to_string(),
                "Are there other controversial topics?".to_string(),
            ],
        });
    }

    if contains_any(&q, &["emotion", "feel", "feeling", "mood"]) {
        let distribution = emotion_distribution(ctx, focus_group_id)?;
        let answer = match distribution.first() {
            Some(e) => format!(
                "\"{}\" is the most common feeling, expressed by {:.0}% of participants.",
                e.emotion, e.share_of_participants * 100.0
            ),
            None => "No emotions have been detected yet.".to_string(),
        };
        return Ok(QueryAnswer {
            answer,
            follow_up_questions: vec![
                "What is the full emotional breakdown?".to_string(),
                "Which concept triggers the strongest emotional response?".to_string(),
                "Does emotion correlate with sentiment?".to_string(),
            ],
        });
    }

    if contains_any(&q, &["sentiment", "positive", "negative", "happy", "unhappy"]) {
        let concepts = key_concepts(ctx, focus_group_id)?;
        let best = concepts.iter().max_by(|a, b| a.mean_sentiment.partial_cmp(&b.mean_sentiment).unwrap());
        let answer = match best {
            Some(c) => format!("The most positively received topic is \"{}\", with a mean sentiment of {:.2}.", c.concept, c.mean_sentiment),
            None => "No topics have recorded sentiment yet.".to_string(),
        };
        return Ok(QueryAnswer {
            answer,
            follow_up_questions: vec![
                "What is the least popular topic?".to_string(),
                "Which participants feel most positively overall?".to_string(),
                "How does sentiment break down by topic?".to_string(),
            ],
        });
    }

    if contains_any(&q, &["topic", "theme", "concept", "about"]) {
        let concepts = key_concepts(ctx, focus_group_id)?;
        let answer = if concepts.is_empty() {
            "No topics have been extracted yet.".to_string()
        } else {
            let names: Vec<&str> = concepts.iter().take(5).map(|c| c.concept.as_str()).collect();
            format!("The most discussed topics are: {}.", names.join(", "))
        };
        return Ok(QueryAnswer {
            answer,
            follow_up_questions: vec![
                "Which of these topics is controversial?".to_string(),
                "Who mentioned these topics most?".to_string(),
                "What sentiment do these topics carry?".to_string(),
            ],
        });
    }

    // Default: synthesize from the top concept, top influencer, worst concept.
    let concepts = key_concepts(ctx, focus_group_id)?;
    let influencers = influential_personas(ctx, focus_group_id)?;
    let top_concept = concepts.first();
    let worst_concept = concepts.iter().min_by(|a, b| a.mean_sentiment.partial_cmp(&b.mean_sentiment).unwrap());
    let top_influencer = influencers.first();

    let mut parts = Vec::new();
    if let Some(c) = top_concept {
        parts.push(format!("the discussion centers on \"{}\"", c.concept));
    }
    if let Some(p) = top_influencer {
        parts.push(format!("{} is the most influential voice", p.label));
    }
    if let Some(c) = worst_concept {
        parts.push(format!("\"{}\" is the most negatively received topic", c.concept));
    }

    let answer = if parts.is_empty() {
        "No data has been derived for this focus group yet.".to_string()
    } else {
        format!("Overall, {}.", parts.join(", "))
    };

    Ok(QueryAnswer {
        answer,
        follow_up_questions: vec![
            "Who is the most influential participant?".to_string(),
            "What is the most controversial topic?".to_string(),
            "What emotions dominate the discussion?".to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        CreateFocusGroupInput, CreatePersonaInput, CreateProjectInput, CreateResponseInput,
    };
    use crate::db::repos::{focus_groups, personas, projects, responses as response_repo};

    fn sample_persona_input(project_id: &str, name: &str, age: i64) -> CreatePersonaInput {
        CreatePersonaInput {
            project_id: project_id.to_string(),
            age,
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

    async fn setup_controversial_graph(ctx: &PlatformContext) -> String {
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

        let p1 = personas::create(&ctx.db, sample_persona_input(&project.id, "A", 25)).unwrap();
        let p2 = personas::create(&ctx.db, sample_persona_input(&project.id, "B", 28)).unwrap();
        let p3 = personas::create(&ctx.db, sample_persona_input(&project.id, "C", 55)).unwrap();
        let p4 = personas::create(&ctx.db, sample_persona_input(&project.id, "D", 58)).unwrap();

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

        crate::graph::build_graph(ctx, &fg.id).await.unwrap();
        fg.id
    }

    #[tokio::test]
    async fn test_controversial_concepts_surfaces_quality() {
        let ctx = PlatformContext::for_tests();
        let fg_id = setup_controversial_graph(&ctx).await;

        let controversial = controversial_concepts(&ctx, &fg_id).unwrap();
        let quality = controversial.iter().find(|c| c.concept == "Quality");
        assert!(quality.is_some(), "expected Quality to be controversial: {controversial:?}");
        let quality = quality.unwrap();
        assert!(quality.polarization > CONTROVERSY_STDEV_THRESHOLD);
        assert!(!quality.supporters.is_empty());
        assert!(!quality.critics.is_empty());
    }

    #[tokio::test]
    async fn test_graph_data_none_filter_includes_everything() {
        let ctx = PlatformContext::for_tests();
        let fg_id = setup_controversial_graph(&ctx).await;

        let view = graph_data(&ctx, &fg_id, GraphFilter::None).unwrap();
        assert_eq!(view.nodes.iter().filter(|n| n.kind == NodeKind::Persona).count(), 4);
        assert!(view.links.iter().any(|l| l.kind == LinkKind::Mentions));
    }

    #[tokio::test]
    async fn test_answer_question_routes_to_controversy() {
        let ctx = PlatformContext::for_tests();
        let fg_id = setup_controversial_graph(&ctx).await;

        let answer = answer_question(&ctx, &fg_id, "What is the most controversial topic?").unwrap();
        assert!(answer.answer.to_lowercase().contains("quality"));
        assert_eq!(answer.follow_up_questions.len(), 3);
    }

    #[tokio::test]
    async fn test_trait_opinion_correlations_buckets_by_decade() {
        let ctx = PlatformContext::for_tests();
        let fg_id = setup_controversial_graph(&ctx).await;

        let buckets = trait_opinion_correlations(&ctx, &fg_id, "quality").unwrap();
        assert!(buckets.iter().any(|b| b.age_decade == 20));
        assert!(buckets.iter().any(|b| b.age_decade == 50));
    }
}
