use rusqlite::{params, Row};

use crate::db::models::{CreateResponseInput, PersonaResponse};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_response(row: &Row) -> rusqlite::Result<PersonaResponse> {
    Ok(PersonaResponse {
        id: row.get("id")?,
        focus_group_id: row.get("focus_group_id")?,
        persona_id: row.get("persona_id")?,
        question_index: row.get("question_index")?,
        question: row.get("question")?,
        response_text: row.get("response_text")?,
        is_error: row.get::<_, i64>("is_error")? != 0,
        response_time_ms: row.get("response_time_ms")?,
        consistency_score: row.get("consistency_score")?,
        created_at: row.get("created_at")?,
    })
}

/// Transactionally persist every response for one question batch (§4.F step
/// 3.d): all rows commit together, or none do.
pub fn create_batch(
    pool: &DbPool,
    inputs: Vec<CreateResponseInput>,
) -> Result<Vec<PersonaResponse>, AppError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let now = chrono::Utc::now().to_rfc3339();
    let mut ids = Vec::with_capacity(inputs.len());

    for input in &inputs {
        let id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO persona_responses
             (id, focus_group_id, persona_id, question_index, question, response_text,
              is_error, response_time_ms, consistency_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                input.focus_group_id,
                input.persona_id,
                input.question_index,
                input.question,
                input.response_text,
                input.is_error as i64,
                input.response_time_ms,
                input.consistency_score,
                now,
            ],
        )
        .map_err(|e| AppError::PersistenceFailed(e.to_string()))?;
        ids.push(id);
    }

    tx.commit().map_err(|e| AppError::PersistenceFailed(e.to_string()))?;

    ids.iter().map(|id| get_by_id(pool, id)).collect()
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<PersonaResponse, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM persona_responses WHERE id = ?1",
        params![id],
        row_to_response,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::NotFound(format!("PersonaResponse {id}"))
        }
        other => AppError::Database(other),
    })
}

pub fn get_by_focus_group(
    pool: &DbPool,
    focus_group_id: &str,
) -> Result<Vec<PersonaResponse>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM persona_responses WHERE focus_group_id = ?1
         ORDER BY question_index ASC, created_at ASC",
    )?;
    let rows = stmt.query_map(params![focus_group_id], row_to_response)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

pub fn get_by_question(
    pool: &DbPool,
    focus_group_id: &str,
    question_index: i64,
) -> Result<Vec<PersonaResponse>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM persona_responses WHERE focus_group_id = ?1 AND question_index = ?2
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![focus_group_id, question_index], row_to_response)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

pub fn count_by_focus_group(pool: &DbPool, focus_group_id: &str) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM persona_responses WHERE focus_group_id = ?1",
        params![focus_group_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::{CreateFocusGroupInput, CreateProjectInput};
    use crate::db::repos::{focus_groups, projects};

    #[test]
    fn test_batch_persist_and_order() {
        let pool = init_test_db().unwrap();
        let project = projects::create(
            &pool,
            CreateProjectInput {
                owner_id: "u1".into(),
                name: "P".into(),
                target_distribution: Default::default(),
                target_sample_size: 5,
            },
        )
        .unwrap();
        let fg = focus_groups::create(
            &pool,
            CreateFocusGroupInput {
                project_id: project.id,
                name: "FG".into(),
                persona_ids: vec!["p1".into(), "p2".into()],
                questions: vec!["Q1".into(), "Q2".into()],
                mode: None,
            },
        )
        .unwrap();

        let batch1 = create_batch(
            &pool,
            vec![
                CreateResponseInput {
                    focus_group_id: fg.id.clone(),
                    persona_id: "p1".into(),
                    question_index: 0,
                    question: "Q1".into(),
                    response_text: "I like it".into(),
                    is_error: false,
                    response_time_ms: 500,
                    consistency_score: None,
                },
                CreateResponseInput {
                    focus_group_id: fg.id.clone(),
                    persona_id: "p2".into(),
                    question_index: 0,
                    question: "Q1".into(),
                    response_text: "".into(),
                    is_error: true,
                    response_time_ms: 0,
                    consistency_score: None,
                },
            ],
        )
        .unwrap();
        assert_eq!(batch1.len(), 2);

        let by_question = get_by_question(&pool, &fg.id, 0).unwrap();
        assert_eq!(by_question.len(), 2);

        let count = count_by_focus_group(&pool, &fg.id).unwrap();
        assert_eq!(count, 2);
    }
}
