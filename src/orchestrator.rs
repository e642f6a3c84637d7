//! Focus-Group Orchestrator (§4.F): the central subsystem. Drives a focus
//! group through `pending -> running -> {completed | failed}`, fanning a
//! question out to every participating persona with bounded parallelism,
//! and never letting one persona's failure abort the whole run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::context::PlatformContext;
use crate::db::models::{
    CreateResponseInput, EventData, FocusGroup, FocusGroupStatus, Persona, RunMetrics,
};
use crate::db::repos::{focus_groups, personas, responses};
use crate::error::{AppError, Result};
use crate::llm::ChatMessage;
use crate::memory::{retrieve_context, EventStore};

/// Cooperative cancellation handle: checked between questions, never
/// preempts an in-flight LLM call (which still obeys its own timeout).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One persona's outcome for a single question, prior to batch persistence.
struct RawResponse {
    persona_id: String,
    text: String,
    is_error: bool,
    response_time_ms: i64,
}

fn build_prompt(persona: &Persona, question: &str, context_snippets: &[String]) -> Vec<ChatMessage> {
    let mut system = format!(
        "You are role-playing as {}. {}\nBackground: {}\nValues: {}. Interests: {}.\n\
         Answer every question in character, in your own voice, as a focus-group participant.",
        persona.full_name, persona.headline, persona.background_story, persona.values, persona.interests,
    );
    if !context_snippets.is_empty() {
        system.push_str("\n\nRelevant things you said earlier:\n");
        for snippet in context_snippets {
            system.push_str("- ");
            system.push_str(snippet);
            system.push('\n');
        }
    }
    vec![ChatMessage::system(system), ChatMessage::user(question.to_string())]
}

async fn answer_one(
    ctx: Arc<PlatformContext>,
    store: Arc<EventStore>,
    persona: Persona,
    focus_group_id: String,
    question: String,
) -> RawResponse {
    let start = Instant::now();

    let context_snippets = retrieve_context(&ctx, &persona.id, &question, ctx.settings.top_k_retrieval, true)
        .await
        .map(|items| items.into_iter().map(|c| c.event_data.to_embedding_text()).collect::<Vec<_>>())
        .unwrap_or_default();

    let prompt = build_prompt(&persona, &question, &context_snippets);

    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(ctx.settings.llm_timeout_ms),
        ctx.chat.complete(&prompt, ctx.settings.llm_temperature),
    )
    .await;

    let response_time_ms = start.elapsed().as_millis() as i64;

    match outcome {
        Ok(Ok(text)) => {
            let _ = store
                .append(
                    &ctx,
                    &persona.id,
                    Some(&focus_group_id),
                    EventData::ResponseGiven { question: question.clone(), response: text.clone() },
                )
                .await;
            RawResponse { persona_id: persona.id, text, is_error: false, response_time_ms }
        }
        Ok(Err(e)) => {
            tracing::warn!(persona_id = %persona.id, error = %e, "persona call failed");
            RawResponse { persona_id: persona.id, text: String::new(), is_error: true, response_time_ms: 0 }
        }
        Err(_) => {
            tracing::warn!(persona_id = %persona.id, "persona call timed out");
            RawResponse { persona_id: persona.id, text: String::new(), is_error: true, response_time_ms: 0 }
        }
    }
}

/// Resolve the participant list: an explicit `persona_ids` on the focus
/// group, or every persona in the owning project when empty (§9 open
/// question — `FocusGroup.persona_ids` is the source of truth either way).
fn resolve_personas(ctx: &PlatformContext, fg: &FocusGroup) -> Result<Vec<Persona>> {
    let resolved = if fg.persona_ids.is_empty() {
        personas::get_by_project(&ctx.db, &fg.project_id)?
    } else {
        personas::get_by_ids(&ctx.db, &fg.persona_ids)?
    };
    if resolved.is_empty() {
        return Err(AppError::NoPersonas);
    }
    Ok(resolved)
}

/// Run every question of `focus_group_id` to completion. Questions run in
/// order; within a question, personas are answered concurrently, bounded by
/// `settings.worker_parallelism`.
#[tracing::instrument(skip(ctx, cancellation))]
pub async fn run_focus_group(
    ctx: Arc<PlatformContext>,
    focus_group_id: &str,
    cancellation: CancellationToken,
) -> Result<FocusGroup> {
    let fg = focus_groups::get_by_id(&ctx.db, focus_group_id)?;
    if fg.status != FocusGroupStatus::Pending {
        return Err(AppError::IllegalState(format!(
            "focus group {focus_group_id} is {:?}, not pending",
            fg.status
        )));
    }

    let participants = match resolve_personas(&ctx, &fg) {
        Ok(p) => p,
        Err(e) => {
            focus_groups::mark_failed(&ctx.db, focus_group_id, &e.to_string())?;
            return Err(e);
        }
    };

    focus_groups::mark_running(&ctx.db, focus_group_id)?;
    let store = Arc::new(EventStore::new());
    let semaphore = Arc::new(Semaphore::new(ctx.settings.worker_parallelism.max(1)));
    let run_start = Instant::now();

    let mut all_latencies_ms: Vec<i64> = Vec::new();

    for (question_index, question) in fg.questions.iter().enumerate() {
        if cancellation.is_cancelled() {
            let err = AppError::IllegalState("run cancelled".into());
            focus_groups::mark_failed(&ctx.db, focus_group_id, "cancelled by caller")?;
            return Err(err);
        }

        for persona in &participants {
            let _ = store
                .append(
                    &ctx,
                    &persona.id,
                    Some(focus_group_id),
                    EventData::QuestionAsked { question: question.clone() },
                )
                .await;
        }

        let mut handles = Vec::with_capacity(participants.len());
        for persona in participants.clone() {
            let ctx = ctx.clone();
            let store = store.clone();
            let semaphore = semaphore.clone();
            let focus_group_id = focus_group_id.to_string();
            let question = question.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                answer_one(ctx, store, persona, focus_group_id, question).await
            }));
        }

        let mut raw_responses = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(r) => raw_responses.push(r),
                Err(e) => tracing::error!(error = %e, "answer task panicked"),
            }
        }

        let inputs: Vec<CreateResponseInput> = raw_responses
            .iter()
            .map(|r| CreateResponseInput {
                focus_group_id: focus_group_id.to_string(),
                persona_id: r.persona_id.clone(),
                question_index: question_index as i64,
                question: question.clone(),
                response_text: r.text.clone(),
                is_error: r.is_error,
                response_time_ms: r.response_time_ms,
                consistency_score: None,
            })
            .collect();

        responses::create_batch(&ctx.db, inputs)?;

        all_latencies_ms.extend(raw_responses.iter().filter(|r| !r.is_error).map(|r| r.response_time_ms));
    }

    let total_execution_time_ms = run_start.elapsed().as_millis() as i64;
    let avg_response_time_ms = if all_latencies_ms.is_empty() {
        0
    } else {
        all_latencies_ms.iter().sum::<i64>() / all_latencies_ms.len() as i64
    };
    let meets_requirements = total_execution_time_ms <= ctx.settings.slo_total_ms as i64
        && avg_response_time_ms <= ctx.settings.slo_avg_ms as i64;

    let completed = focus_groups::mark_completed(
        &ctx.db,
        focus_group_id,
        RunMetrics { total_execution_time_ms, avg_response_time_ms, meets_requirements },
    )?;

    // Graph construction is a best-effort side effect: a focus group that
    // otherwise ran to completion should not be reported as failed because
    // graph building choked on one malformed extraction.
    if let Err(e) = crate::graph::build_graph(&ctx, focus_group_id).await {
        tracing::warn!(focus_group_id, error = %e, "graph build failed after focus group completion");
    }

    Ok(completed)
}
