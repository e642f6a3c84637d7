use serde::{Deserialize, Serialize};

/// One row per (persona, focus_group, question). §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaResponse {
    pub id: String,
    pub focus_group_id: String,
    pub persona_id: String,
    pub question_index: i64,
    pub question: String,
    pub response_text: String,
    pub is_error: bool,
    pub response_time_ms: i64,
    pub consistency_score: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponseInput {
    pub focus_group_id: String,
    pub persona_id: String,
    pub question_index: i64,
    pub question: String,
    pub response_text: String,
    pub is_error: bool,
    pub response_time_ms: i64,
    pub consistency_score: Option<f64>,
}
