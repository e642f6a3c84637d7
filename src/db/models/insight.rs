use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInsight {
    pub question_index: i64,
    pub question: String,
    pub idea_score: f64,
    pub consensus: f64,
    pub avg_sentiment: f64,
    pub top_quotes: Vec<Quote>,
    pub participant_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub persona_id: String,
    pub persona_label: String,
    pub text: String,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub keyword: String,
    pub count: i64,
    pub representative_quote: Option<Quote>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub mean_response_latency_ms: f64,
    pub completion_rate: f64,
    pub mean_consistency_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallInsight {
    pub idea_score: f64,
    pub grade: String,
    pub consensus: f64,
    pub avg_sentiment: f64,
    pub positive_ratio: f64,
    pub negative_ratio: f64,
    pub neutral_ratio: f64,
    pub key_themes: Vec<Theme>,
    pub engagement: EngagementMetrics,
}

/// Derived, keyed by focus_group_id. §3 InsightBlob, §4.G Insight Aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightBlob {
    pub focus_group_id: String,
    pub per_question: Vec<QuestionInsight>,
    pub overall: OverallInsight,
}

impl InsightBlob {
    /// A zero-filled but well-formed blob for focus groups with no responses
    /// (§4.G failure clause).
    pub fn empty(focus_group_id: impl Into<String>) -> Self {
        InsightBlob {
            focus_group_id: focus_group_id.into(),
            per_question: Vec::new(),
            overall: OverallInsight {
                idea_score: 0.0,
                grade: grade_for_score(0.0).to_string(),
                consensus: 0.0,
                avg_sentiment: 0.0,
                positive_ratio: 0.0,
                negative_ratio: 0.0,
                neutral_ratio: 0.0,
                key_themes: Vec::new(),
                engagement: EngagementMetrics::default(),
            },
        }
    }
}

/// Five-tier letter grade for the overall idea score.
pub fn grade_for_score(score: f64) -> &'static str {
    if score >= 85.0 {
        "A"
    } else if score >= 70.0 {
        "B"
    } else if score >= 55.0 {
        "C"
    } else if score >= 40.0 {
        "D"
    } else {
        "F"
    }
}
