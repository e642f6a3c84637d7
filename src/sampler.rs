//! Demographic Sampler (§4.A): draws a panel of personas whose categorical
//! make-up matches a target distribution, using inverse-CDF sampling per
//! axis against a seeded RNG so runs are reproducible.

use std::collections::HashMap;

use rand::Rng;

use crate::db::models::project::DemographicDistribution;
use crate::error::{AppError, Result};

/// One sampled persona's demographic draw, before synthesis fills in the
/// rest of the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicDraw {
    pub age_group: String,
    pub gender: String,
    pub education_level: String,
    pub income_bracket: String,
    pub location: String,
}

/// Platform default weights for one of the five known axes. Used when a
/// project leaves that axis unspecified (§3: "axes with no explicit target
/// fall back to defaults").
fn platform_default(axis_name: &str) -> &'static [(&'static str, f64)] {
    match axis_name {
        "age_groups" => &[
            ("18-24", 0.2),
            ("25-34", 0.25),
            ("35-44", 0.2),
            ("45-54", 0.15),
            ("55+", 0.2),
        ],
        "genders" => &[("male", 0.5), ("female", 0.5)],
        "education_levels" => &[
            ("Secondary", 0.3),
            ("Bachelor", 0.4),
            ("Master", 0.25),
            ("Doctorate", 0.05),
        ],
        "income_brackets" => &[
            ("<35k", 0.2),
            ("35k-50k", 0.25),
            ("50k-75k", 0.25),
            ("75k-100k", 0.2),
            ("100k+", 0.1),
        ],
        "locations" => &[
            ("Warsaw", 0.3),
            ("Krakow", 0.2),
            ("Wroclaw", 0.15),
            ("Gdansk", 0.15),
            ("Poznan", 0.2),
        ],
        _ => &[],
    }
}

/// Renormalize one axis's weights to sum to 1. An axis with no entries or
/// all-non-positive weights falls back to the platform default for that
/// axis; only when the platform default is also missing/invalid does this
/// fail with `InvalidDistribution` (§4.A).
fn renormalize_axis(axis_name: &str, weights: &HashMap<String, f64>) -> Result<Vec<(String, f64)>> {
    let total: f64 = weights.values().filter(|w| w.is_finite() && **w > 0.0).sum();
    if !weights.is_empty() && total > 0.0 {
        return Ok(weights
            .iter()
            .filter(|(_, w)| w.is_finite() && **w > 0.0)
            .map(|(label, w)| (label.clone(), w / total))
            .collect());
    }

    let fallback = platform_default(axis_name);
    let fallback_total: f64 = fallback.iter().map(|(_, w)| w).sum();
    if fallback.is_empty() || fallback_total <= 0.0 {
        return Err(AppError::InvalidDistribution(format!(
            "axis '{axis_name}' has no positive weights and no platform default"
        )));
    }
    Ok(fallback.iter().map(|(label, w)| (label.to_string(), w / fallback_total)).collect())
}

/// Inverse-CDF draw: given normalized (label, weight) pairs and a uniform
/// sample in [0, 1), return the label whose cumulative bucket contains it.
fn draw_from_cdf<'a>(normalized: &'a [(String, f64)], u: f64) -> &'a str {
    let mut cumulative = 0.0;
    for (label, w) in normalized {
        cumulative += w;
        if u < cumulative {
            return label;
        }
    }
    // Floating point drift can leave `u` just past 1.0 worth of cumulative
    // weight; fall back to the last bucket rather than panicking.
    normalized.last().map(|(label, _)| label.as_str()).unwrap_or("unknown")
}

/// Draw `count` demographic profiles matching `distribution`. Each axis is
/// renormalized independently (axes are sampled independently of each
/// other, per §4.A — there is no attempt to model cross-axis correlation).
pub fn sample_panel(
    distribution: &DemographicDistribution,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<DemographicDraw>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut normalized_axes = HashMap::new();
    for (name, weights) in distribution.axes() {
        normalized_axes.insert(name, renormalize_axis(name, weights)?);
    }

    let mut draws = Vec::with_capacity(count);
    for _ in 0..count {
        draws.push(DemographicDraw {
            age_group: draw_from_cdf(&normalized_axes["age_groups"], rng.gen_range(0.0..1.0)).to_string(),
            gender: draw_from_cdf(&normalized_axes["genders"], rng.gen_range(0.0..1.0)).to_string(),
            education_level: draw_from_cdf(&normalized_axes["education_levels"], rng.gen_range(0.0..1.0))
                .to_string(),
            income_bracket: draw_from_cdf(&normalized_axes["income_brackets"], rng.gen_range(0.0..1.0))
                .to_string(),
            location: draw_from_cdf(&normalized_axes["locations"], rng.gen_range(0.0..1.0)).to_string(),
        });
    }
    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_distribution() -> DemographicDistribution {
        let mut d = DemographicDistribution::default();
        d.age_groups.insert("18-24".into(), 0.5);
        d.age_groups.insert("25-34".into(), 0.5);
        d.genders.insert("female".into(), 1.0);
        d.education_levels.insert("Bachelor".into(), 1.0);
        d.income_brackets.insert("50k-75k".into(), 1.0);
        d.locations.insert("Warsaw".into(), 1.0);
        d
    }

    #[test]
    fn test_sample_panel_is_deterministic_for_fixed_seed() {
        let dist = sample_distribution();
        let mut rng1 = StdRng::seed_from_u64(7);
        let mut rng2 = StdRng::seed_from_u64(7);
        let a = sample_panel(&dist, 20, &mut rng1).unwrap();
        let b = sample_panel(&dist, 20, &mut rng2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_panel_respects_single_valued_axes() {
        let dist = sample_distribution();
        let mut rng = StdRng::seed_from_u64(1);
        let draws = sample_panel(&dist, 10, &mut rng).unwrap();
        assert!(draws.iter().all(|d| d.gender == "female"));
        assert!(draws.iter().all(|d| d.location == "Warsaw"));
    }

    #[test]
    fn test_partially_specified_distribution_falls_back_to_defaults() {
        // A project that only targets age + gender, leaving education,
        // income, and location unspecified, must still sample successfully
        // (§3: unspecified axes fall back to platform defaults).
        let mut dist = DemographicDistribution::default();
        dist.age_groups.insert("25-34".into(), 1.0);
        dist.genders.insert("female".into(), 1.0);

        let mut rng = StdRng::seed_from_u64(3);
        let draws = sample_panel(&dist, 25, &mut rng).unwrap();

        assert!(draws.iter().all(|d| d.age_group == "25-34"));
        assert!(draws.iter().all(|d| d.gender == "female"));
        let known_locations = platform_default("locations").iter().map(|(l, _)| *l).collect::<Vec<_>>();
        assert!(draws.iter().all(|d| known_locations.contains(&d.location.as_str())));
    }

    #[test]
    fn test_fully_empty_distribution_samples_from_platform_defaults() {
        let dist = DemographicDistribution::default();
        let mut rng = StdRng::seed_from_u64(1);
        let draws = sample_panel(&dist, 5, &mut rng).unwrap();
        assert_eq!(draws.len(), 5);
    }

    #[test]
    fn test_unknown_axis_with_no_platform_default_is_invalid() {
        let err = renormalize_axis("not_a_real_axis", &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::InvalidDistribution(_)));
    }
}
