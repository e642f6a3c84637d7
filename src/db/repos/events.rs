use rusqlite::{params, Row};

use crate::db::models::{EventData, PersonaEvent};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_event(row: &Row) -> rusqlite::Result<PersonaEvent> {
    let event_data_raw: String = row.get("event_data")?;
    let embedding_raw: Option<String> = row.get("embedding")?;
    Ok(PersonaEvent {
        id: row.get("id")?,
        persona_id: row.get("persona_id")?,
        focus_group_id: row.get("focus_group_id")?,
        event_data: serde_json::from_str(&event_data_raw)
            .unwrap_or(EventData::Other(serde_json::Value::Null)),
        sequence_number: row.get("sequence_number")?,
        embedding: embedding_raw.and_then(|s| serde_json::from_str(&s).ok()),
        timestamp: row.get("timestamp")?,
    })
}

/// Append an event with `sequence_number = max(existing) + 1`, computed and
/// written inside one SQLite transaction so readers never observe a gap
/// (§4.D append semantics / §5 per-persona critical section). This is the
/// storage-layer half of the guarantee; `memory::EventStore` additionally
/// holds an in-process per-persona async mutex so concurrent Rust tasks
/// serialize before they ever reach this transaction.
pub fn append(
    pool: &DbPool,
    persona_id: &str,
    focus_group_id: Option<&str>,
    event_data: &EventData,
    embedding: Option<&[f32]>,
    timestamp: &str,
) -> Result<PersonaEvent, AppError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let last_seq: Option<i64> = tx
        .query_row(
            "SELECT MAX(sequence_number) FROM persona_events WHERE persona_id = ?1",
            params![persona_id],
            |row| row.get(0),
        )
        .map_err(AppError::Database)?;
    let sequence_number = last_seq.unwrap_or(0) + 1;

    let id = uuid::Uuid::new_v4().to_string();
    let event_data_json = serde_json::to_string(event_data)?;
    let embedding_json = embedding.map(|e| serde_json::to_string(e).unwrap_or_default());

    tx.execute(
        "INSERT INTO persona_events
         (id, persona_id, focus_group_id, event_type, event_data, sequence_number, embedding, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            persona_id,
            focus_group_id,
            event_data.event_type(),
            event_data_json,
            sequence_number,
            embedding_json,
            timestamp,
        ],
    )
    .map_err(AppError::Database)?;

    tx.commit().map_err(AppError::Database)?;

    Ok(PersonaEvent {
        id,
        persona_id: persona_id.to_string(),
        focus_group_id: focus_group_id.map(str::to_string),
        event_data: event_data.clone(),
        sequence_number,
        embedding: embedding.map(|e| e.to_vec()),
        timestamp: timestamp.to_string(),
    })
}

pub fn history(pool: &DbPool, persona_id: &str, limit: i64) -> Result<Vec<PersonaEvent>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM persona_events WHERE persona_id = ?1
         ORDER BY sequence_number DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![persona_id, limit], row_to_event)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

/// All events for a persona, newest first — the shape the Context Retriever
/// scores over (§4.E).
pub fn all_for_persona(pool: &DbPool, persona_id: &str) -> Result<Vec<PersonaEvent>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM persona_events WHERE persona_id = ?1 ORDER BY timestamp DESC",
    )?;
    let rows = stmt.query_map(params![persona_id], row_to_event)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
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

    #[test]
    fn test_sequence_numbers_are_contiguous() {
        let pool = init_test_db().unwrap();
        let project = projects::create(
            &pool,
            CreateProjectInput {
                owner_id: "u1".into(),
                name: "P".into(),
                target_distribution: Default::default(),
                target_sample_size: 1,
            },
        )
        .unwrap();
        let persona = personas::create(&pool, sample_persona_input(&project.id)).unwrap();

        let e1 = append(
            &pool,
            &persona.id,
            None,
            &EventData::QuestionAsked { question: "Q1".into() },
            None,
            "2026-01-01T00:00:00Z",
        )
        .unwrap();
        assert_eq!(e1.sequence_number, 1);

        let e2 = append(
            &pool,
            &persona.id,
            None,
            &EventData::ResponseGiven {
                question: "Q1".into(),
                response: "A1".into(),
            },
            Some(&[0.1, 0.2, 0.3]),
            "2026-01-01T00:00:05Z",
        )
        .unwrap();
        assert_eq!(e2.sequence_number, 2);

        let hist = history(&pool, &persona.id, 10).unwrap();
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0].sequence_number, 2); // DESC by seq
    }
}
