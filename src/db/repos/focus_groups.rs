use rusqlite::{params, Row};

use crate::db::models::{
    CreateFocusGroupInput, FocusGroup, FocusGroupMode, FocusGroupStatus, RunMetrics,
};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_focus_group(row: &Row) -> rusqlite::Result<FocusGroup> {
    let persona_ids_raw: String = row.get("persona_ids")?;
    let questions_raw: String = row.get("questions")?;
    let mode_raw: String = row.get("mode")?;
    let status_raw: String = row.get("status")?;
    Ok(FocusGroup {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        persona_ids: serde_json::from_str(&persona_ids_raw).unwrap_or_default(),
        questions: serde_json::from_str(&questions_raw).unwrap_or_default(),
        mode: FocusGroupMode::parse(&mode_raw),
        status: FocusGroupStatus::parse(&status_raw),
        error_message: row.get("error_message")?,
        started_at: row.get("started_at")?,
        completed_at: row.get("completed_at")?,
        total_execution_time_ms: row.get("total_execution_time_ms")?,
        avg_response_time_ms: row.get("avg_response_time_ms")?,
        meets_requirements: row
            .get::<_, Option<i64>>("meets_requirements")?
            .map(|v| v != 0),
        summary: row.get("summary")?,
        polarization_score: row.get("polarization_score")?,
        overall_consistency_score: row.get("overall_consistency_score")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn create(pool: &DbPool, input: CreateFocusGroupInput) -> Result<FocusGroup, AppError> {
    if input.questions.is_empty() {
        return Err(AppError::Validation(
            "A focus group needs at least one question".into(),
        ));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let mode = input.mode.unwrap_or(FocusGroupMode::Normal);

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO focus_groups
         (id, project_id, name, persona_ids, questions, mode, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
        params![
            id,
            input.project_id,
            input.name,
            serde_json::to_string(&input.persona_ids)?,
            serde_json::to_string(&input.questions)?,
            mode.as_str(),
            now,
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<FocusGroup, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM focus_groups WHERE id = ?1",
        params![id],
        row_to_focus_group,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("FocusGroup {id}")),
        other => AppError::Database(other),
    })
}

pub fn get_by_project(pool: &DbPool, project_id: &str) -> Result<Vec<FocusGroup>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM focus_groups WHERE project_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![project_id], row_to_focus_group)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

/// Transition to `running`, stamping `started_at`. Callers must have already
/// checked the current status is `pending` (§4.F idempotency).
pub fn mark_running(pool: &DbPool, id: &str) -> Result<FocusGroup, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE focus_groups SET status = 'running', started_at = ?1, updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    get_by_id(pool, id)
}

pub fn mark_completed(
    pool: &DbPool,
    id: &str,
    metrics: RunMetrics,
) -> Result<FocusGroup, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE focus_groups SET status = 'completed', completed_at = ?1,
         total_execution_time_ms = ?2, avg_response_time_ms = ?3, meets_requirements = ?4,
         updated_at = ?1 WHERE id = ?5",
        params![
            now,
            metrics.total_execution_time_ms,
            metrics.avg_response_time_ms,
            metrics.meets_requirements as i64,
            id,
        ],
    )?;
    get_by_id(pool, id)
}

pub fn mark_failed(pool: &DbPool, id: &str, error_message: &str) -> Result<FocusGroup, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE focus_groups SET status = 'failed', completed_at = ?1, error_message = ?2,
         updated_at = ?1 WHERE id = ?3",
        params![now, error_message, id],
    )?;
    get_by_id(pool, id)
}

/// Persist aggregator side effects in one transaction (§4.G side effect).
pub fn record_insight_summary(
    pool: &DbPool,
    id: &str,
    summary_json: &str,
    polarization_score: f64,
    overall_consistency_score: Option<f64>,
) -> Result<(), AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    conn.execute(
        "UPDATE focus_groups SET summary = ?1, polarization_score = ?2,
         overall_consistency_score = ?3, updated_at = ?4 WHERE id = ?5",
        params![
            summary_json,
            polarization_score,
            overall_consistency_score,
            now,
            id,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::CreateProjectInput;
    use crate::db::repos::projects;

    #[test]
    fn test_focus_group_lifecycle() {
        let pool = init_test_db().unwrap();
        let project = projects::create(
            &pool,
            CreateProjectInput {
                owner_id: "u1".into(),
                name: "P".into(),
                target_distribution: Default::default(),
                target_sample_size: 10,
            },
        )
        .unwrap();

        let fg = create(
            &pool,
            CreateFocusGroupInput {
                project_id: project.id.clone(),
                name: "Concept reaction".into(),
                persona_ids: vec!["p1".into(), "p2".into()],
                questions: vec!["Q1".into(), "Q2".into()],
                mode: None,
            },
        )
        .unwrap();
        assert_eq!(fg.status, FocusGroupStatus::Pending);

        let running = mark_running(&pool, &fg.id).unwrap();
        assert_eq!(running.status, FocusGroupStatus::Running);
        assert!(running.started_at.is_some());

        let completed = mark_completed(
            &pool,
            &fg.id,
            RunMetrics {
                total_execution_time_ms: 4200,
                avg_response_time_ms: 900,
                meets_requirements: true,
            },
        )
        .unwrap();
        assert_eq!(completed.status, FocusGroupStatus::Completed);
        assert_eq!(completed.total_execution_time_ms, Some(4200));
    }
}
