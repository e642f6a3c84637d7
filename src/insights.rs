//! Insight Aggregator (§4.G): a pure function of one focus group's
//! PersonaResponses — per-question sentiment/consensus/idea-score, overall
//! aggregates, key themes, and engagement metrics. Writes its output back
//! onto the FocusGroup row as a side effect.

use std::collections::HashMap;

use rand::Rng;

use crate::context::PlatformContext;
use crate::db::models::insight::{
    grade_for_score, EngagementMetrics, InsightBlob, OverallInsight, QuestionInsight, Quote, Theme,
};
use crate::db::models::{Persona, PersonaResponse};
use crate::db::repos::{focus_groups, personas, responses};
use crate::error::Result;
use crate::text;

const MAX_CLUSTER_K: usize = 5;
const KMEANS_ITERATIONS: usize = 20;
const TOP_QUOTES: usize = 5;
const TOP_THEMES: usize = 10;
const RATIO_THRESHOLD: f64 = 0.15;

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - crate::llm::cosine_similarity(a, b)
}

fn kmeans(vectors: &[Vec<f32>], k: usize, rng: &mut impl Rng) -> (Vec<usize>, f64) {
    let n = vectors.len();
    let k = k.min(n).max(1);

    let mut centroid_idx: Vec<usize> = Vec::with_capacity(k);
    while centroid_idx.len() < k {
        let candidate = rng.gen_range(0..n);
        if !centroid_idx.contains(&candidate) {
            centroid_idx.push(candidate);
        }
    }
    let mut centroids: Vec<Vec<f32>> = centroid_idx.iter().map(|&i| vectors[i].clone()).collect();
    let mut assignments = vec![0usize; n];

    for _ in 0..KMEANS_ITERATIONS {
        let mut changed = false;
        for (i, v) in vectors.iter().enumerate() {
            let mut best = 0usize;
            let mut best_dist = f64::MAX;
            for (c_idx, c) in centroids.iter().enumerate() {
                let d = cosine_distance(v, c);
                if d < best_dist {
                    best_dist = d;
                    best = c_idx;
                }
            }
            if assignments[i] != best {
                assignments[i] = best;
                changed = true;
            }
        }

        for c_idx in 0..k {
            let members: Vec<&Vec<f32>> = vectors
                .iter()
                .zip(assignments.iter())
                .filter(|(_, &a)| a == c_idx)
                .map(|(v, _)| v)
                .collect();
            if members.is_empty() {
                continue;
            }
            let dims = members[0].len();
            let mut mean = vec![0.0f32; dims];
            for m in &members {
                for (d, val) in m.iter().enumerate() {
                    mean[d] += val;
                }
            }
            for val in mean.iter_mut() {
                *val /= members.len() as f32;
            }
            centroids[c_idx] = mean;
        }

        if !changed {
            break;
        }
    }

    let inertia: f64 = vectors
        .iter()
        .zip(assignments.iter())
        .map(|(v, &a)| cosine_distance(v, &centroids[a]).powi(2))
        .sum();

    (assignments, inertia)
}

/// Pick `k` by the largest drop in marginal inertia improvement across
/// `k in [2, min(MAX_CLUSTER_K, n-1)]` — the elbow heuristic (§4.G).
fn choose_k_by_elbow(vectors: &[Vec<f32>], rng: &mut impl Rng) -> (usize, Vec<usize>) {
    let n = vectors.len();
    let max_k = MAX_CLUSTER_K.min(n.saturating_sub(1)).max(2);

    let mut by_k: HashMap<usize, (f64, Vec<usize>)> = HashMap::new();
    for k in 2..=max_k {
        let (assignments, inertia) = kmeans(vectors, k, rng);
        by_k.insert(k, (inertia, assignments));
    }

    if max_k == 2 {
        let (_, assignments) = by_k.remove(&2).unwrap();
        return (2, assignments);
    }

    let mut best_k = 2;
    let mut best_curvature = f64::MIN;
    for k in 3..max_k {
        let prev = by_k[&(k - 1)].0;
        let cur = by_k[&k].0;
        let next = by_k[&(k + 1)].0;
        let curvature = (prev - cur) - (cur - next);
        if curvature > best_curvature {
            best_curvature = curvature;
            best_k = k;
        }
    }

    let (_, assignments) = by_k.remove(&best_k).unwrap();
    (best_k, assignments)
}

/// Mean inter-cluster cosine distance divided by (mean inter + mean intra);
/// 0 when there's no meaningful spread to measure.
fn polarization_from_clusters(vectors: &[Vec<f32>], assignments: &[usize]) -> f64 {
    let mut inter_sum = 0.0;
    let mut inter_n = 0usize;
    let mut intra_sum = 0.0;
    let mut intra_n = 0usize;

    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            let d = cosine_distance(&vectors[i], &vectors[j]);
            if assignments[i] == assignments[j] {
                intra_sum += d;
                intra_n += 1;
            } else {
                inter_sum += d;
                inter_n += 1;
            }
        }
    }

    let mean_inter = if inter_n > 0 { inter_sum / inter_n as f64 } else { 0.0 };
    let mean_intra = if intra_n > 0 { intra_sum / intra_n as f64 } else { 0.0 };
    if mean_inter + mean_intra == 0.0 {
        0.0
    } else {
        mean_inter / (mean_inter + mean_intra)
    }
}

async fn compute_consensus(ctx: &PlatformContext, responses: &[&PersonaResponse]) -> f64 {
    if responses.len() < 2 {
        return 1.0;
    }

    let mut vectors = Vec::with_capacity(responses.len());
    for r in responses {
        match ctx.embeddings.embed(&r.response_text).await {
            Ok(v) => vectors.push(v),
            Err(_) => return 0.6,
        }
    }

    let mut rng = ctx.rng.lock().unwrap();
    let (k, assignments) = if responses.len() <= 3 {
        let (assignments, _) = kmeans(&vectors, 2, &mut *rng);
        (2, assignments)
    } else {
        choose_k_by_elbow(&vectors, &mut *rng)
    };
    drop(rng);

    let polarization = polarization_from_clusters(&vectors, &assignments);
    (1.0 - polarization * (1.0 / (1.0 + (k as f64).ln()))).clamp(0.0, 1.0)
}

fn idea_score(avg_sentiment: f64, consensus: f64) -> f64 {
    (100.0 * (0.6 * ((avg_sentiment + 1.0) / 2.0) + 0.4 * consensus)).clamp(0.0, 100.0)
}

async fn compute_question_insight(
    ctx: &PlatformContext,
    question_index: i64,
    question: &str,
    question_responses: &[PersonaResponse],
    persona_lookup: &HashMap<String, Persona>,
) -> QuestionInsight {
    let valid: Vec<&PersonaResponse> = question_responses
        .iter()
        .filter(|r| !r.is_error && !r.response_text.trim().is_empty())
        .collect();

    let sentiments: Vec<f64> = valid.iter().map(|r| text::score_sentiment(&r.response_text)).collect();
    let avg_sentiment = if sentiments.is_empty() { 0.0 } else { sentiments.iter().sum::<f64>() / sentiments.len() as f64 };

    let consensus = compute_consensus(ctx, &valid).await;
    let score = idea_score(avg_sentiment, consensus);

    let mut ranked: Vec<(&PersonaResponse, f64)> = valid
        .iter()
        .zip(sentiments.iter())
        .map(|(r, s)| (*r, *s))
        .collect();
    ranked.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(std::cmp::Ordering::Equal));

    let top_quotes = ranked
        .into_iter()
        .take(TOP_QUOTES)
        .map(|(r, s)| Quote {
            persona_id: r.persona_id.clone(),
            persona_label: persona_lookup
                .get(&r.persona_id)
                .map(|p| p.label())
                .unwrap_or_else(|| r.persona_id.clone()),
            text: r.response_text.clone(),
            sentiment: s,
        })
        .collect();

    QuestionInsight {
        question_index,
        question: question.to_string(),
        idea_score: score,
        consensus,
        avg_sentiment,
        top_quotes,
        participant_count: valid.len() as i64,
    }
}

fn compute_key_themes(
    all_valid: &[&PersonaResponse],
    stopwords: &[String],
    persona_lookup: &HashMap<String, Persona>,
) -> Vec<Theme> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    let mut first_seen: HashMap<String, &PersonaResponse> = HashMap::new();

    for r in all_valid {
        for token in text::tokenize(&r.response_text, stopwords) {
            *counts.entry(token.clone()).or_insert(0) += 1;
            first_seen.entry(token).or_insert(r);
        }
    }

    let mut ranked: Vec<(&String, &i64)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(TOP_THEMES)
        .map(|(keyword, count)| {
            let representative = first_seen.get(keyword).map(|r| Quote {
                persona_id: r.persona_id.clone(),
                persona_label: persona_lookup
                    .get(&r.persona_id)
                    .map(|p| p.label())
                    .unwrap_or_else(|| r.persona_id.clone()),
                text: r.response_text.clone(),
                sentiment: text::score_sentiment(&r.response_text),
            });
            Theme { keyword: keyword.clone(), count: *count, representative_quote: representative }
        })
        .collect()
}

/// Generate (and persist) the derived insight blob for a focus group.
pub async fn generate_insights(ctx: &PlatformContext, focus_group_id: &str) -> Result<InsightBlob> {
    let fg = focus_groups::get_by_id(&ctx.db, focus_group_id)?;
    let all_responses = responses::get_by_focus_group(&ctx.db, focus_group_id)?;

    if all_responses.is_empty() {
        let blob = InsightBlob::empty(focus_group_id);
        persist(ctx, focus_group_id, &blob)?;
        return Ok(blob);
    }

    let persona_ids: Vec<String> =
        all_responses.iter().map(|r| r.persona_id.clone()).collect::<std::collections::HashSet<_>>().into_iter().collect();
    let persona_lookup: HashMap<String, Persona> = personas::get_by_ids(&ctx.db, &persona_ids)
        .unwrap_or_default()
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut by_question: HashMap<i64, Vec<PersonaResponse>> = HashMap::new();
    for r in &all_responses {
        by_question.entry(r.question_index).or_default().push(r.clone());
    }

    let mut per_question = Vec::new();
    let mut question_indices: Vec<i64> = by_question.keys().copied().collect();
    question_indices.sort();
    for idx in question_indices {
        let question = fg.questions.get(idx as usize).cloned().unwrap_or_default();
        let insight =
            compute_question_insight(ctx, idx, &question, &by_question[&idx], &persona_lookup).await;
        per_question.push(insight);
    }

    let overall_idea_score = per_question.iter().map(|q| q.idea_score).sum::<f64>() / per_question.len() as f64;
    let overall_consensus = per_question.iter().map(|q| q.consensus).sum::<f64>() / per_question.len() as f64;
    let overall_avg_sentiment =
        per_question.iter().map(|q| q.avg_sentiment).sum::<f64>() / per_question.len() as f64;

    let valid_responses: Vec<&PersonaResponse> =
        all_responses.iter().filter(|r| !r.is_error && !r.response_text.trim().is_empty()).collect();
    let sentiments: Vec<f64> = valid_responses.iter().map(|r| text::score_sentiment(&r.response_text)).collect();
    let positive = sentiments.iter().filter(|s| **s >= RATIO_THRESHOLD).count() as f64;
    let negative = sentiments.iter().filter(|s| **s <= -RATIO_THRESHOLD).count() as f64;
    let neutral = sentiments.len() as f64 - positive - negative;
    let denom = sentiments.len().max(1) as f64;

    let stopwords = ctx.settings.stopwords_for("en").to_vec();
    let key_themes = compute_key_themes(&valid_responses, &stopwords, &persona_lookup);

    let latencies: Vec<i64> = all_responses.iter().filter(|r| !r.is_error).map(|r| r.response_time_ms).collect();
    let mean_latency = if latencies.is_empty() { 0.0 } else { latencies.iter().sum::<i64>() as f64 / latencies.len() as f64 };
    let expected_panel_size = if fg.persona_ids.is_empty() { persona_ids.len() } else { fg.persona_ids.len() };
    let expected_total = (expected_panel_size as f64) * (fg.questions.len().max(1) as f64);
    let completion_rate = if expected_total > 0.0 {
        (all_responses.len() as f64 / expected_total).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let consistency_scores: Vec<f64> = all_responses.iter().filter_map(|r| r.consistency_score).collect();
    let mean_consistency = if consistency_scores.is_empty() {
        None
    } else {
        Some(consistency_scores.iter().sum::<f64>() / consistency_scores.len() as f64)
    };

    let blob = InsightBlob {
        focus_group_id: focus_group_id.to_string(),
        per_question,
        overall: OverallInsight {
            idea_score: overall_idea_score,
            grade: grade_for_score(overall_idea_score).to_string(),
            consensus: overall_consensus,
            avg_sentiment: overall_avg_sentiment,
            positive_ratio: positive / denom,
            negative_ratio: negative / denom,
            neutral_ratio: neutral / denom,
            key_themes,
            engagement: EngagementMetrics {
                mean_response_latency_ms: mean_latency,
                completion_rate,
                mean_consistency_score: mean_consistency,
            },
        },
    };

    persist(ctx, focus_group_id, &blob)?;
    Ok(blob)
}

fn persist(ctx: &PlatformContext, focus_group_id: &str, blob: &InsightBlob) -> Result<()> {
    let summary_json = serde_json::to_string(blob)?;
    // The field really is the overall idea score divided by 100, not a
    // literal polarization measure — the name is carried over verbatim
    // from the system this was derived from.
    let polarization_score = blob.overall.idea_score / 100.0;
    focus_groups::record_insight_summary(
        &ctx.db,
        focus_group_id,
        &summary_json,
        polarization_score,
        blob.overall.engagement.mean_consistency_score,
    )
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
    async fn test_unanimous_positive_yields_high_score() {
        let ctx = PlatformContext::for_tests();
        let project = projects::create(
            &ctx.db,
            CreateProjectInput {
                owner_id: "u1".into(),
                name: "P".into(),
                target_distribution: Default::default(),
                target_sample_size: 5,
            },
        )
        .unwrap();

        let mut persona_ids = Vec::new();
        for i in 0..5 {
            let p = personas::create(&ctx.db, sample_persona_input(&project.id, &format!("P{i}"))).unwrap();
            persona_ids.push(p.id);
        }

        let fg = focus_groups::create(
            &ctx.db,
            CreateFocusGroupInput {
                project_id: project.id,
                name: "FG".into(),
                persona_ids: persona_ids.clone(),
                questions: vec!["Q1".into()],
                mode: None,
            },
        )
        .unwrap();

        let inputs = persona_ids
            .iter()
            .map(|pid| CreateResponseInput {
                focus_group_id: fg.id.clone(),
                persona_id: pid.clone(),
                question_index: 0,
                question: "Q1".into(),
                response_text: "I love it, amazing".into(),
                is_error: false,
                response_time_ms: 500,
                consistency_score: None,
            })
            .collect();
        response_repo::create_batch(&ctx.db, inputs).unwrap();

        let blob = generate_insights(&ctx, &fg.id).await.unwrap();
        assert!(blob.overall.consensus >= 0.9);
        assert!(blob.overall.avg_sentiment > 0.0);
        assert!(blob.overall.idea_score >= 70.0);
    }

    #[tokio::test]
    async fn test_no_responses_yields_zero_filled_blob() {
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

        let blob = generate_insights(&ctx, &fg.id).await.unwrap();
        assert_eq!(blob.overall.idea_score, 0.0);
        assert!(blob.per_question.is_empty());
    }

    #[test]
    fn test_idea_score_bounds() {
        assert_eq!(idea_score(1.0, 1.0), 100.0);
        assert_eq!(idea_score(-1.0, 0.0), 0.0);
    }
}
