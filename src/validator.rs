//! Chi-square Validator (§4.B): checks whether a drawn panel's observed
//! demographic counts are statistically consistent with the project's
//! target distribution, axis by axis.

use std::collections::HashMap;

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::db::models::project::DemographicDistribution;
use crate::sampler::DemographicDraw;

/// Chi-square goodness-of-fit result for one demographic axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisValidation {
    pub axis: String,
    pub chi_square_statistic: f64,
    pub degrees_of_freedom: i32,
    pub p_value: f64,
    /// True when `p_value >= 0.05` — conventional significance threshold,
    /// meaning the observed counts are not significantly different from
    /// the target distribution.
    pub valid: bool,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub axes: Vec<AxisValidation>,
    pub overall_valid: bool,
}

const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

fn chi_square_for_axis(
    axis_name: &str,
    expected_weights: &HashMap<String, f64>,
    observed_counts: &HashMap<String, i64>,
    total: f64,
) -> AxisValidation {
    let expected_total: f64 = expected_weights.values().filter(|w| **w > 0.0).sum();

    let mut statistic = 0.0;
    let mut buckets = 0;
    for (label, weight) in expected_weights.iter().filter(|(_, w)| **w > 0.0) {
        let expected_count = total * (weight / expected_total);
        if expected_count <= 0.0 {
            continue;
        }
        let observed_count = *observed_counts.get(label).unwrap_or(&0) as f64;
        statistic += (observed_count - expected_count).powi(2) / expected_count;
        buckets += 1;
    }

    let degrees_of_freedom = (buckets - 1).max(1);
    let p_value = if buckets <= 1 {
        // A single-category axis has no freedom to deviate; trivially valid.
        1.0
    } else {
        let chi = ChiSquared::new(degrees_of_freedom as f64).expect("positive dof");
        1.0 - chi.cdf(statistic)
    };

    AxisValidation {
        axis: axis_name.to_string(),
        chi_square_statistic: statistic,
        degrees_of_freedom,
        p_value,
        valid: p_value >= SIGNIFICANCE_THRESHOLD,
    }
}

fn counts_for<'a>(draws: &'a [DemographicDraw], selector: impl Fn(&'a DemographicDraw) -> &'a str) -> HashMap<String, i64> {
    let mut counts = HashMap::new();
    for draw in draws {
        *counts.entry(selector(draw).to_string()).or_insert(0) += 1;
    }
    counts
}

/// Validate a drawn panel against its target distribution, one chi-square
/// test per axis.
pub fn validate_panel(
    distribution: &DemographicDistribution,
    draws: &[DemographicDraw],
) -> ValidationReport {
    let total = draws.len() as f64;

    let age_counts = counts_for(draws, |d| &d.age_group);
    let gender_counts = counts_for(draws, |d| &d.gender);
    let education_counts = counts_for(draws, |d| &d.education_level);
    let income_counts = counts_for(draws, |d| &d.income_bracket);
    let location_counts = counts_for(draws, |d| &d.location);

    let axes = vec![
        chi_square_for_axis("age_groups", &distribution.age_groups, &age_counts, total),
        chi_square_for_axis("genders", &distribution.genders, &gender_counts, total),
        chi_square_for_axis(
            "education_levels",
            &distribution.education_levels,
            &education_counts,
            total,
        ),
        chi_square_for_axis(
            "income_brackets",
            &distribution.income_brackets,
            &income_counts,
            total,
        ),
        chi_square_for_axis("locations", &distribution.locations, &location_counts, total),
    ];

    let overall_valid = axes.iter().all(|a| a.valid);
    ValidationReport { axes, overall_valid }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even_distribution() -> DemographicDistribution {
        let mut d = DemographicDistribution::default();
        d.age_groups.insert("18-24".into(), 0.5);
        d.age_groups.insert("25-34".into(), 0.5);
        d.genders.insert("female".into(), 0.5);
        d.genders.insert("male".into(), 0.5);
        d.education_levels.insert("Bachelor".into(), 1.0);
        d.income_brackets.insert("50k-75k".into(), 1.0);
        d.locations.insert("Warsaw".into(), 1.0);
        d
    }

    fn draw(age: &str, gender: &str) -> DemographicDraw {
        DemographicDraw {
            age_group: age.to_string(),
            gender: gender.to_string(),
            education_level: "Bachelor".to_string(),
            income_bracket: "50k-75k".to_string(),
            location: "Warsaw".to_string(),
        }
    }

    #[test]
    fn test_perfectly_matching_panel_is_valid() {
        let dist = even_distribution();
        let mut draws = Vec::new();
        for _ in 0..25 {
            draws.push(draw("18-24", "female"));
            draws.push(draw("18-24", "male"));
            draws.push(draw("25-34", "female"));
            draws.push(draw("25-34", "male"));
        }
        let report = validate_panel(&dist, &draws);
        assert!(report.overall_valid);
    }

    #[test]
    fn test_wildly_skewed_panel_fails_age_axis() {
        let dist = even_distribution();
        let mut draws = Vec::new();
        for _ in 0..100 {
            draws.push(draw("18-24", "female"));
        }
        let report = validate_panel(&dist, &draws);
        let age_axis = report.axes.iter().find(|a| a.axis == "age_groups").unwrap();
        assert!(!age_axis.valid);
        assert!(!report.overall_valid);
    }

    #[test]
    fn test_single_category_axis_is_trivially_valid() {
        let dist = even_distribution();
        let draws = vec![draw("18-24", "female")];
        let report = validate_panel(&dist, &draws);
        let education_axis = report
            .axes
            .iter()
            .find(|a| a.axis == "education_levels")
            .unwrap();
        assert!(education_axis.valid);
    }
}
