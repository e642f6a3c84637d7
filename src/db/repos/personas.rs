use rusqlite::{params, Row};

use crate::db::models::{BigFive, CreatePersonaInput, Hofstede, Persona};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_persona(row: &Row) -> rusqlite::Result<Persona> {
    Ok(Persona {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        age: row.get("age")?,
        gender: row.get("gender")?,
        location: row.get("location")?,
        education: row.get("education")?,
        income_bracket: row.get("income_bracket")?,
        occupation: row.get("occupation")?,
        traits: BigFive {
            openness: row.get("openness")?,
            conscientiousness: row.get("conscientiousness")?,
            extraversion: row.get("extraversion")?,
            agreeableness: row.get("agreeableness")?,
            neuroticism: row.get("neuroticism")?,
        },
        dimensions: Hofstede {
            power_distance: row.get("power_distance")?,
            individualism: row.get("individualism")?,
            masculinity: row.get("masculinity")?,
            uncertainty_avoidance: row.get("uncertainty_avoidance")?,
            long_term_orientation: row.get("long_term_orientation")?,
            indulgence: row.get("indulgence")?,
        },
        full_name: row.get("full_name")?,
        headline: row.get("headline")?,
        background_story: row.get("background_story")?,
        values: row.get("values")?,
        interests: row.get("interests")?,
        synthesis_prompt: row.get("synthesis_prompt")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn create(pool: &DbPool, input: CreatePersonaInput) -> Result<Persona, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO personas
         (id, project_id, age, gender, location, education, income_bracket, occupation,
          openness, conscientiousness, extraversion, agreeableness, neuroticism,
          power_distance, individualism, masculinity, uncertainty_avoidance,
          long_term_orientation, indulgence,
          full_name, headline, background_story, values, interests, synthesis_prompt,
          created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?26)",
        params![
            id,
            input.project_id,
            input.age,
            input.gender,
            input.location,
            input.education,
            input.income_bracket,
            input.occupation,
            input.traits.openness,
            input.traits.conscientiousness,
            input.traits.extraversion,
            input.traits.agreeableness,
            input.traits.neuroticism,
            input.dimensions.power_distance,
            input.dimensions.individualism,
            input.dimensions.masculinity,
            input.dimensions.uncertainty_avoidance,
            input.dimensions.long_term_orientation,
            input.dimensions.indulgence,
            input.full_name,
            input.headline,
            input.background_story,
            input.values,
            input.interests,
            input.synthesis_prompt,
            now,
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Persona, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM personas WHERE id = ?1",
        params![id],
        row_to_persona,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Persona {id}")),
        other => AppError::Database(other),
    })
}

pub fn get_by_project(pool: &DbPool, project_id: &str) -> Result<Vec<Persona>, AppError> {
    let conn = pool.get()?;
    let mut stmt =
        conn.prepare("SELECT * FROM personas WHERE project_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map(params![project_id], row_to_persona)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

/// Resolve an explicit list of persona ids, in the order given, erroring if
/// any id does not belong to a persisted persona.
pub fn get_by_ids(pool: &DbPool, ids: &[String]) -> Result<Vec<Persona>, AppError> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        out.push(get_by_id(pool, id)?);
    }
    Ok(out)
}

pub fn count_by_project(pool: &DbPool, project_id: &str) -> Result<i64, AppError> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM personas WHERE project_id = ?1",
        params![project_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CreateProjectInput;
    use crate::db::repos::projects;
    use crate::db::init_test_db;

    fn sample_persona_input(project_id: &str) -> CreatePersonaInput {
        CreatePersonaInput {
            project_id: project_id.to_string(),
            age: 34,
            gender: "female".into(),
            location: "Warsaw".into(),
            education: "Bachelor".into(),
            income_bracket: "50k-75k".into(),
            occupation: "Designer".into(),
            traits: BigFive {
                openness: 0.7,
                conscientiousness: 0.6,
                extraversion: 0.5,
                agreeableness: 0.8,
                neuroticism: 0.3,
            },
            dimensions: Hofstede {
                power_distance: 0.4,
                individualism: 0.6,
                masculinity: 0.5,
                uncertainty_avoidance: 0.5,
                long_term_orientation: 0.5,
                indulgence: 0.5,
            },
            full_name: "Jane Kowalski".into(),
            headline: "Pragmatic design lead".into(),
            background_story: "Grew up in Warsaw, studied design.".into(),
            values: "creativity, honesty".into(),
            interests: "cycling, ceramics".into(),
            synthesis_prompt: None,
        }
    }

    #[test]
    fn test_persona_crud() {
        let pool = init_test_db().unwrap();
        let project = projects::create(
            &pool,
            CreateProjectInput {
                owner_id: "user-1".into(),
                name: "Test".into(),
                target_distribution: Default::default(),
                target_sample_size: 10,
            },
        )
        .unwrap();

        let persona = create(&pool, sample_persona_input(&project.id)).unwrap();
        assert_eq!(persona.full_name, "Jane Kowalski");

        let fetched = get_by_id(&pool, &persona.id).unwrap();
        assert_eq!(fetched.age, 34);

        let by_project = get_by_project(&pool, &project.id).unwrap();
        assert_eq!(by_project.len(), 1);

        let count = count_by_project(&pool, &project.id).unwrap();
        assert_eq!(count, 1);

        let by_ids = get_by_ids(&pool, &[persona.id.clone()]).unwrap();
        assert_eq!(by_ids.len(), 1);
    }
}
