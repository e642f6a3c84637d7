use rusqlite::Connection;

use crate::error::AppError;

/// Run the consolidated schema migration. Idempotent: every statement uses
/// `IF NOT EXISTS` so this is safe to call on every startup.
pub fn run(conn: &Connection) -> Result<(), AppError> {
    tracing::debug!("running database migrations");

    conn.execute_batch(SCHEMA)?;

    tracing::info!("database migrations complete");
    Ok(())
}

const SCHEMA: &str = r#"

-- ============================================================================
-- Projects
-- ============================================================================

CREATE TABLE IF NOT EXISTS projects (
    id                  TEXT PRIMARY KEY,
    owner_id            TEXT NOT NULL,
    name                TEXT NOT NULL,
    target_distribution TEXT NOT NULL,
    target_sample_size  INTEGER NOT NULL,
    statistically_valid INTEGER NOT NULL DEFAULT 0,
    deleted_at          TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id);
CREATE INDEX IF NOT EXISTS idx_projects_deleted ON projects(deleted_at);

-- ============================================================================
-- Personas
-- ============================================================================

CREATE TABLE IF NOT EXISTS personas (
    id                  TEXT PRIMARY KEY,
    project_id          TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    age                 INTEGER NOT NULL,
    gender              TEXT NOT NULL,
    location            TEXT NOT NULL,
    education           TEXT NOT NULL,
    income_bracket      TEXT NOT NULL,
    occupation          TEXT NOT NULL,
    openness            REAL NOT NULL,
    conscientiousness   REAL NOT NULL,
    extraversion        REAL NOT NULL,
    agreeableness       REAL NOT NULL,
    neuroticism         REAL NOT NULL,
    power_distance      REAL NOT NULL,
    individualism       REAL NOT NULL,
    masculinity         REAL NOT NULL,
    uncertainty_avoidance REAL NOT NULL,
    long_term_orientation REAL NOT NULL,
    indulgence          REAL NOT NULL,
    full_name           TEXT NOT NULL,
    headline            TEXT NOT NULL,
    background_story    TEXT NOT NULL,
    values              TEXT NOT NULL,
    interests           TEXT NOT NULL,
    synthesis_prompt    TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_personas_project ON personas(project_id);

-- ============================================================================
-- Focus groups
-- ============================================================================

CREATE TABLE IF NOT EXISTS focus_groups (
    id                      TEXT PRIMARY KEY,
    project_id              TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name                    TEXT NOT NULL,
    persona_ids             TEXT NOT NULL,
    questions               TEXT NOT NULL,
    mode                    TEXT NOT NULL DEFAULT 'normal',
    status                  TEXT NOT NULL DEFAULT 'pending',
    error_message           TEXT,
    started_at              TEXT,
    completed_at            TEXT,
    total_execution_time_ms INTEGER,
    avg_response_time_ms    INTEGER,
    meets_requirements      INTEGER,
    summary                 TEXT,
    polarization_score      REAL,
    overall_consistency_score REAL,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_focus_groups_project ON focus_groups(project_id);
CREATE INDEX IF NOT EXISTS idx_focus_groups_status ON focus_groups(status);

-- ============================================================================
-- Persona responses
-- ============================================================================

CREATE TABLE IF NOT EXISTS persona_responses (
    id                  TEXT PRIMARY KEY,
    focus_group_id      TEXT NOT NULL REFERENCES focus_groups(id) ON DELETE CASCADE,
    persona_id          TEXT NOT NULL REFERENCES personas(id) ON DELETE CASCADE,
    question_index      INTEGER NOT NULL,
    question            TEXT NOT NULL,
    response_text       TEXT NOT NULL,
    is_error            INTEGER NOT NULL DEFAULT 0,
    response_time_ms    INTEGER NOT NULL DEFAULT 0,
    consistency_score   REAL,
    created_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_responses_group ON persona_responses(focus_group_id);
CREATE INDEX IF NOT EXISTS idx_responses_persona ON persona_responses(persona_id);
CREATE INDEX IF NOT EXISTS idx_responses_question ON persona_responses(focus_group_id, question_index);

-- ============================================================================
-- Persona events (append-only memory log)
-- ============================================================================

CREATE TABLE IF NOT EXISTS persona_events (
    id                  TEXT PRIMARY KEY,
    persona_id          TEXT NOT NULL REFERENCES personas(id) ON DELETE CASCADE,
    focus_group_id      TEXT,
    event_type          TEXT NOT NULL,
    event_data          TEXT NOT NULL,
    sequence_number     INTEGER NOT NULL,
    embedding           TEXT,
    timestamp           TEXT NOT NULL,
    UNIQUE(persona_id, sequence_number)
);
CREATE INDEX IF NOT EXISTS idx_events_persona_seq ON persona_events(persona_id, sequence_number);

"#;
