use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normalize a raw extracted concept/emotion name: trim, collapse internal
/// whitespace, title-case. §3 KnowledgeGraphSnapshot invariant.
pub fn normalize_label(raw: &str) -> String {
    let collapsed: Vec<&str> = raw.split_whitespace().collect();
    collapsed
        .iter()
        .map(|word| title_case_word(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Persona,
    Concept,
    Emotion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// Display size proportional to degree (§4.I graph_data).
    pub size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    /// Mention/feeling count for Concept/Emotion nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Mentions,
    Feels,
    Agrees,
    Disagrees,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    /// For `mentions`/`feels`: running-blend mean sentiment/intensity.
    /// For `agrees`/`disagrees`: signed similarity strength.
    pub value: f64,
    pub count: i64,
}

/// A concept or emotion node's aggregate state, tracked per focus group
/// during graph construction (§4.H node & edge construction).
#[derive(Debug, Clone)]
pub struct ConceptAggregate {
    pub label: String,
    pub frequency: i64,
    /// persona_id -> (running mean sentiment, mention count) for AGREES/DISAGREES.
    pub per_persona_sentiment: HashMap<String, f64>,
    pub per_persona_mentions: HashMap<String, i64>,
}

#[derive(Debug, Clone)]
pub struct EmotionAggregate {
    pub label: String,
    pub count: i64,
    pub per_persona_intensity: HashMap<String, f64>,
}

/// The full derived graph for one focus group. §3 KnowledgeGraphSnapshot.
/// Held in the in-process graph snapshot registry (§4.H persistence model).
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub focus_group_id: String,
    pub persona_nodes: HashMap<String, GraphNode>,
    pub concepts: HashMap<String, ConceptAggregate>,
    pub emotions: HashMap<String, EmotionAggregate>,
    pub persona_links: Vec<GraphLink>,
}

impl GraphSnapshot {
    pub fn new(focus_group_id: impl Into<String>) -> Self {
        GraphSnapshot {
            focus_group_id: focus_group_id.into(),
            ..Default::default()
        }
    }

    /// Total degree (number of edges touching this node id), used both for
    /// display sizing and the `influence` filter (§4.I).
    pub fn degree(&self, node_id: &str) -> i64 {
        let mut n = 0i64;
        for c in self.concepts.values() {
            if c.per_persona_mentions.contains_key(node_id) {
                n += 1;
            }
        }
        for e in self.emotions.values() {
            if e.per_persona_intensity.contains_key(node_id) {
                n += 1;
            }
        }
        for link in &self.persona_links {
            if link.source == node_id || link.target == node_id {
                n += 1;
            }
        }
        n
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphBuildSummary {
    pub personas_added: i64,
    pub concepts_extracted: i64,
    pub relationships_created: i64,
    pub emotions_created: i64,
}

/// One extraction result per response (§4.H concept extraction).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptExtraction {
    pub concepts: Vec<String>,
    pub emotions: Vec<String>,
    pub sentiment: f64,
    pub key_phrases: Vec<String>,
}
