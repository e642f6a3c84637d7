//! Persona Synthesizer (§4.C): turns one demographic draw into a full
//! persona — Big Five / Hofstede trait scores sampled independently of the
//! LLM, and a narrative identity (name, headline, background, values,
//! interests) generated by an LLM call constrained to JSON output.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::context::PlatformContext;
use crate::db::models::persona::{BigFive, CreatePersonaInput, Hofstede};
use crate::error::{AppError, Result};
use crate::llm::{parse_json_response, ChatMessage};
use crate::sampler::DemographicDraw;
use crate::text::{sanitize_line, sanitize_narrative};

const TRAIT_STD_DEV: f64 = 0.15;

/// Sample one trait value from N(0.5, 0.15²), clipped to [0, 1]. Rejection
/// sampling would bias the tails; a simple clip is what the narrative
/// identity is layered on top of, so exact tail shape doesn't matter here.
fn sample_trait(rng: &mut impl Rng) -> f64 {
    let normal = Normal::new(0.5, TRAIT_STD_DEV).expect("valid normal params");
    normal.sample(rng).clamp(0.0, 1.0)
}

fn sample_big_five(rng: &mut impl Rng) -> BigFive {
    BigFive {
        openness: sample_trait(rng),
        conscientiousness: sample_trait(rng),
        extraversion: sample_trait(rng),
        agreeableness: sample_trait(rng),
        neuroticism: sample_trait(rng),
    }
}

fn sample_hofstede(rng: &mut impl Rng) -> Hofstede {
    Hofstede {
        power_distance: sample_trait(rng),
        individualism: sample_trait(rng),
        masculinity: sample_trait(rng),
        uncertainty_avoidance: sample_trait(rng),
        long_term_orientation: sample_trait(rng),
        indulgence: sample_trait(rng),
    }
}

#[derive(Debug, Deserialize)]
struct NarrativeIdentity {
    full_name: String,
    headline: String,
    background_story: String,
    values: String,
    interests: String,
}

fn build_prompt(draw: &DemographicDraw, traits: &BigFive, dimensions: &Hofstede) -> Vec<ChatMessage> {
    let system = ChatMessage::system(
        "You invent realistic, specific synthetic market-research personas. \
         Respond with JSON only, no commentary, matching exactly this shape: \
         {\"fullName\": string, \"headline\": string, \"backgroundStory\": string, \
         \"values\": string, \"interests\": string}.",
    );
    let user = ChatMessage::user(format!(
        "Demographics: age group {}, gender {}, education {}, income {}, location {}.\n\
         Big Five traits (0-1): openness={:.2}, conscientiousness={:.2}, extraversion={:.2}, \
         agreeableness={:.2}, neuroticism={:.2}.\n\
         Hofstede dimensions (0-1): power_distance={:.2}, individualism={:.2}, masculinity={:.2}, \
         uncertainty_avoidance={:.2}, long_term_orientation={:.2}, indulgence={:.2}.\n\
         Invent one coherent person matching all of the above.",
        draw.age_group,
        draw.gender,
        draw.education_level,
        draw.income_bracket,
        draw.location,
        traits.openness,
        traits.conscientiousness,
        traits.extraversion,
        traits.agreeableness,
        traits.neuroticism,
        dimensions.power_distance,
        dimensions.individualism,
        dimensions.masculinity,
        dimensions.uncertainty_avoidance,
        dimensions.long_term_orientation,
        dimensions.indulgence,
    ));
    vec![system, user]
}

/// Synthesize one full persona for `project_id` from a demographic draw.
/// Trait scores are sampled before the LLM call so a malformed response
/// never loses the statistical draw; only the narrative identity depends
/// on the LLM succeeding.
pub async fn synthesize_persona(
    ctx: &PlatformContext,
    project_id: &str,
    draw: DemographicDraw,
) -> Result<CreatePersonaInput> {
    let (traits, dimensions) = {
        let mut rng = ctx.rng.lock().unwrap();
        (sample_big_five(&mut *rng), sample_hofstede(&mut *rng))
    };

    let prompt = build_prompt(&draw, &traits, &dimensions);
    let raw = tokio::time::timeout(
        std::time::Duration::from_millis(ctx.settings.llm_timeout_ms),
        ctx.chat.complete(&prompt, ctx.settings.llm_temperature),
    )
    .await
    .map_err(|_| AppError::LLMTimeout(ctx.settings.llm_timeout_ms))??;

    let identity: NarrativeIdentity = parse_json_response(&raw)
        .map_err(|e| AppError::SynthesisFailed(format!("bad narrative identity: {e}")))?;

    let age = age_group_midpoint(&draw.age_group);
    let prompt_text =
        prompt.iter().map(|m| format!("[{}]\n{}", m.role, m.content)).collect::<Vec<_>>().join("\n\n");

    let full_name = sanitize_line(&identity.full_name);
    let headline = sanitize_line(&identity.headline);
    let values = sanitize_line(&identity.values);
    let interests = sanitize_line(&identity.interests);
    let background_story = sanitize_narrative(&identity.background_story);

    Ok(CreatePersonaInput {
        project_id: project_id.to_string(),
        age,
        gender: draw.gender,
        location: draw.location,
        education: draw.education_level,
        income_bracket: draw.income_bracket,
        occupation: headline.clone(),
        traits,
        dimensions,
        full_name,
        headline,
        background_story,
        values,
        interests,
        synthesis_prompt: Some(prompt_text),
    })
}

/// Map an age-group label like "25-34" to a representative age. Anything
/// that doesn't parse as `low-high` falls back to 35, the platform default
/// midpoint used elsewhere for unlabeled adults.
fn age_group_midpoint(age_group: &str) -> i64 {
    let parts: Vec<&str> = age_group.split('-').collect();
    if parts.len() == 2 {
        if let (Ok(low), Ok(high)) = (parts[0].parse::<i64>(), parts[1].trim_end_matches('+').parse::<i64>()) {
            return (low + high) / 2;
        }
    }
    35
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::StubChatProvider;
    use std::sync::Arc;

    fn sample_draw() -> DemographicDraw {
        DemographicDraw {
            age_group: "25-34".into(),
            gender: "female".into(),
            education_level: "Bachelor".into(),
            income_bracket: "50k-75k".into(),
            location: "Warsaw".into(),
        }
    }

    #[tokio::test]
    async fn test_synthesize_persona_with_fixed_llm_response() {
        let mut ctx = PlatformContext::for_tests();
        ctx.chat = Arc::new(StubChatProvider::with_fixed_response(
            r#"{"fullName":"Jane Kowalski","headline":"Pragmatic design lead",
               "backgroundStory":"Grew up in Warsaw.","values":"creativity, honesty",
               "interests":"cycling, ceramics"}"#,
        ));

        let input = synthesize_persona(&ctx, "project-1", sample_draw()).await.unwrap();
        assert_eq!(input.full_name, "Jane Kowalski");
        assert_eq!(input.age, 29);
        assert!(input.traits.openness >= 0.0 && input.traits.openness <= 1.0);
        assert!(input.synthesis_prompt.is_some());
    }

    #[tokio::test]
    async fn test_synthesize_persona_sanitizes_whitespace() {
        let mut ctx = PlatformContext::for_tests();
        ctx.chat = Arc::new(StubChatProvider::with_fixed_response(
            "{\"fullName\":\"  Jane   Kowalski \",\"headline\":\"Pragmatic  design\\nlead\",\
             \"backgroundStory\":\"Grew up   in Warsaw.\\n\\n\\nStudied  design.\",\
             \"values\":\"creativity,   honesty\",\"interests\":\"cycling,  ceramics\"}",
        ));

        let input = synthesize_persona(&ctx, "project-1", sample_draw()).await.unwrap();
        assert_eq!(input.full_name, "Jane Kowalski");
        assert_eq!(input.headline, "Pragmatic design lead");
        assert_eq!(input.background_story, "Grew up in Warsaw.\n\nStudied design.");
    }

    #[tokio::test]
    async fn test_synthesize_persona_rejects_malformed_json() {
        let mut ctx = PlatformContext::for_tests();
        ctx.chat = Arc::new(StubChatProvider::with_fixed_response("not json at all"));

        let err = synthesize_persona(&ctx, "project-1", sample_draw()).await.unwrap_err();
        assert!(matches!(err, AppError::SynthesisFailed(_)));
    }

    #[test]
    fn test_age_group_midpoint() {
        assert_eq!(age_group_midpoint("18-24"), 21);
        assert_eq!(age_group_midpoint("65+"), 35);
    }
}
