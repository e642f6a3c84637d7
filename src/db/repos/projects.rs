use rusqlite::{params, Row};

use crate::db::models::{CreateProjectInput, DemographicDistribution, Project, UpdateProjectInput};
use crate::db::DbPool;
use crate::error::AppError;

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    let target_distribution_raw: String = row.get("target_distribution")?;
    let target_distribution: DemographicDistribution =
        serde_json::from_str(&target_distribution_raw).unwrap_or_default();
    Ok(Project {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        target_distribution,
        target_sample_size: row.get("target_sample_size")?,
        statistically_valid: row.get::<_, i64>("statistically_valid")? != 0,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn create(pool: &DbPool, input: CreateProjectInput) -> Result<Project, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("Project name cannot be empty".into()));
    }
    if input.target_sample_size <= 0 {
        return Err(AppError::Validation(
            "target_sample_size must be positive".into(),
        ));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO projects
         (id, owner_id, name, target_distribution, target_sample_size, statistically_valid, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
        params![
            id,
            input.owner_id,
            input.name,
            input.target_distribution.to_json_string(),
            input.target_sample_size,
            now,
        ],
    )?;

    get_by_id(pool, &id)
}

pub fn get_by_id(pool: &DbPool, id: &str) -> Result<Project, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        "SELECT * FROM projects WHERE id = ?1 AND deleted_at IS NULL",
        params![id],
        row_to_project,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound(format!("Project {id}")),
        other => AppError::Database(other),
    })
}

pub fn get_by_owner(pool: &DbPool, owner_id: &str) -> Result<Vec<Project>, AppError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT * FROM projects WHERE owner_id = ?1 AND deleted_at IS NULL ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![owner_id], row_to_project)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(AppError::Database)
}

pub fn update(pool: &DbPool, id: &str, input: UpdateProjectInput) -> Result<Project, AppError> {
    let existing = get_by_id(pool, id)?;
    let name = input.name.unwrap_or(existing.name);
    let target_distribution = input
        .target_distribution
        .unwrap_or(existing.target_distribution);
    let target_sample_size = input
        .target_sample_size
        .unwrap_or(existing.target_sample_size);
    let statistically_valid = input
        .statistically_valid
        .unwrap_or(existing.statistically_valid);
    let now = chrono::Utc::now().to_rfc3339();

    let conn = pool.get()?;
    conn.execute(
        "UPDATE projects SET name = ?1, target_distribution = ?2, target_sample_size = ?3,
         statistically_valid = ?4, updated_at = ?5 WHERE id = ?6",
        params![
            name,
            target_distribution.to_json_string(),
            target_sample_size,
            statistically_valid as i64,
            now,
            id,
        ],
    )?;

    get_by_id(pool, id)
}

/// Soft delete: cascades logically to Personas/FocusGroups via their own
/// foreign keys, but the row itself is retained with a `deleted_at` marker.
pub fn soft_delete(pool: &DbPool, id: &str) -> Result<bool, AppError> {
    let now = chrono::Utc::now().to_rfc3339();
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE projects SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![now, id],
    )?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    fn sample_distribution() -> DemographicDistribution {
        let mut d = DemographicDistribution::default();
        d.age_groups.insert("25-34".into(), 0.5);
        d.age_groups.insert("35-44".into(), 0.5);
        d
    }

    #[test]
    fn test_project_crud() {
        let pool = init_test_db().unwrap();

        let project = create(
            &pool,
            CreateProjectInput {
                owner_id: "user-1".into(),
                name: "Concept Test".into(),
                target_distribution: sample_distribution(),
                target_sample_size: 100,
            },
        )
        .unwrap();
        assert_eq!(project.name, "Concept Test");
        assert!(!project.statistically_valid);

        let fetched = get_by_id(&pool, &project.id).unwrap();
        assert_eq!(fetched.target_sample_size, 100);

        let updated = update(
            &pool,
            &project.id,
            UpdateProjectInput {
                statistically_valid: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(updated.statistically_valid);

        let by_owner = get_by_owner(&pool, "user-1").unwrap();
        assert_eq!(by_owner.len(), 1);

        assert!(soft_delete(&pool, &project.id).unwrap());
        assert!(get_by_id(&pool, &project.id).is_err());
    }
}
