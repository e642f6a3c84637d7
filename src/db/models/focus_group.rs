use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusGroupMode {
    Normal,
    Adversarial,
}

impl FocusGroupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusGroupMode::Normal => "normal",
            FocusGroupMode::Adversarial => "adversarial",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "adversarial" => FocusGroupMode::Adversarial,
            _ => FocusGroupMode::Normal,
        }
    }
}

/// `pending -> running -> {completed | failed}`. Transitions only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusGroupStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl FocusGroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusGroupStatus::Pending => "pending",
            FocusGroupStatus::Running => "running",
            FocusGroupStatus::Completed => "completed",
            FocusGroupStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "running" => FocusGroupStatus::Running,
            "completed" => FocusGroupStatus::Completed,
            "failed" => FocusGroupStatus::Failed,
            _ => FocusGroupStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FocusGroupStatus::Completed | FocusGroupStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusGroup {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub persona_ids: Vec<String>,
    pub questions: Vec<String>,
    pub mode: FocusGroupMode,
    pub status: FocusGroupStatus,
    pub error_message: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub total_execution_time_ms: Option<i64>,
    pub avg_response_time_ms: Option<i64>,
    pub meets_requirements: Option<bool>,
    pub summary: Option<String>,
    pub polarization_score: Option<f64>,
    pub overall_consistency_score: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFocusGroupInput {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub persona_ids: Vec<String>,
    pub questions: Vec<String>,
    #[serde(default)]
    pub mode: Option<FocusGroupMode>,
}

/// Latency + SLO metrics computed by the orchestrator at the end of a run
/// (§4.F step 4).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub total_execution_time_ms: i64,
    pub avg_response_time_ms: i64,
    pub meets_requirements: bool,
}
