use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Five independent categorical distributions over demographic axes. Each
/// map is label -> weight; weights are renormalized to sum to 1 within an
/// axis before use. An axis with no entries falls back to the platform
/// default for that axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicDistribution {
    #[serde(default)]
    pub age_groups: HashMap<String, f64>,
    #[serde(default)]
    pub genders: HashMap<String, f64>,
    #[serde(default)]
    pub education_levels: HashMap<String, f64>,
    #[serde(default)]
    pub income_brackets: HashMap<String, f64>,
    #[serde(default)]
    pub locations: HashMap<String, f64>,
}

impl DemographicDistribution {
    /// Iterate over the five axes as (name, map) pairs, in a fixed order.
    pub fn axes(&self) -> [(&'static str, &HashMap<String, f64>); 5] {
        [
            ("age_groups", &self.age_groups),
            ("genders", &self.genders),
            ("education_levels", &self.education_levels),
            ("income_brackets", &self.income_brackets),
            ("locations", &self.locations),
        ]
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json_str(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub target_distribution: DemographicDistribution,
    pub target_sample_size: i64,
    pub statistically_valid: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectInput {
    pub owner_id: String,
    pub name: String,
    pub target_distribution: DemographicDistribution,
    pub target_sample_size: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub target_distribution: Option<DemographicDistribution>,
    pub target_sample_size: Option<i64>,
    pub statistically_valid: Option<bool>,
}
