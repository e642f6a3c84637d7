use serde::{Deserialize, Serialize};

/// Tagged event payloads. Modeled as a sum type per the redesign guidance in
/// §9 rather than an opaque JSON blob, while still persisting as a single
/// structured JSON column (`event_data`) so the schema doesn't grow a new
/// table per event kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "snake_case")]
pub enum EventData {
    QuestionAsked { question: String },
    ResponseGiven { question: String, response: String },
    Other(serde_json::Value),
}

impl EventData {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventData::QuestionAsked { .. } => "question_asked",
            EventData::ResponseGiven { .. } => "response_given",
            EventData::Other(_) => "other",
        }
    }

    /// Textual rendering used as the embedding input (§4.D append semantics).
    pub fn to_embedding_text(&self) -> String {
        match self {
            EventData::QuestionAsked { question } => format!("Question: {question}"),
            EventData::ResponseGiven { question, response } => {
                format!("Question: {question}\nResponse: {response}")
            }
            EventData::Other(v) => v.to_string(),
        }
    }
}

/// Append-only per-persona event. §3 PersonaEvent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaEvent {
    pub id: String,
    pub persona_id: String,
    pub focus_group_id: Option<String>,
    pub event_data: EventData,
    pub sequence_number: i64,
    pub embedding: Option<Vec<f32>>,
    pub timestamp: String,
}

/// One scored context item returned by the Context Retriever (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedContext {
    pub event_id: String,
    pub event_data: EventData,
    pub timestamp: String,
    pub similarity: f64,
    pub relevance_score: f64,
    pub age_days: f64,
}
