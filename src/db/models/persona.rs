use serde::{Deserialize, Serialize};

/// Big-Five (OCEAN) personality traits, each in [0,1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigFive {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

/// Hofstede cultural dimensions, each in [0,1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hofstede {
    pub power_distance: f64,
    pub individualism: f64,
    pub masculinity: f64,
    pub uncertainty_avoidance: f64,
    pub long_term_orientation: f64,
    pub indulgence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub project_id: String,
    pub age: i64,
    pub gender: String,
    pub location: String,
    pub education: String,
    pub income_bracket: String,
    pub occupation: String,
    pub traits: BigFive,
    pub dimensions: Hofstede,
    pub full_name: String,
    pub headline: String,
    pub background_story: String,
    pub values: String,
    pub interests: String,
    pub synthesis_prompt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Persona {
    /// Short label used by quote attribution and the query layer
    /// ("Jane (34, Warsaw)").
    pub fn label(&self) -> String {
        format!("{} ({}, {})", self.full_name, self.age, self.location)
    }
}

/// One sampled demographic profile, prior to LLM synthesis (4.A output).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicProfile {
    pub age_group: String,
    pub age: i64,
    pub gender: String,
    pub education: String,
    pub income_bracket: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePersonaInput {
    pub project_id: String,
    pub age: i64,
    pub gender: String,
    pub location: String,
    pub education: String,
    pub income_bracket: String,
    pub occupation: String,
    pub traits: BigFive,
    pub dimensions: Hofstede,
    pub full_name: String,
    pub headline: String,
    pub background_story: String,
    pub values: String,
    pub interests: String,
    pub synthesis_prompt: Option<String>,
}
