//! # Matcher Tuning
//!
//! All numeric knobs of the resolution engine in one place. The defaults are
//! the calibrated production values; profiles shift the decision thresholds
//! for deployments that prefer recall over precision or vice versa.

use serde::{Deserialize, Serialize};

/// Numeric configuration for the resolution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherTuning {
    /// Confidence at or above which a row is auto-accepted
    pub matched_threshold: f64,
    /// Confidence at or above which a row goes to human review
    pub review_threshold: f64,
    /// Minimum fuzzy ratio (0-100) for a fuzzy candidate to be kept
    pub fuzzy_threshold: f64,
    /// Fuzzy candidates retained per corpus scan
    pub fuzzy_candidate_limit: usize,
    /// Signals with weighted score at or above this define a candidate's
    /// theoretical-maximum denominator
    pub useful_signal_floor: f64,
    /// Weighted score a signal needs to count toward the agreement bonus
    pub agreement_floor: f64,
    /// Bonus per additional agreeing category
    pub agreement_bonus: f64,
    /// Confidence cap when CAS and name evidence point to different
    /// chemicals
    pub cross_field_cap: f64,
    /// Confidence cap when any conflict is present
    pub conflict_cap: f64,
    /// Weight multiplier for variant records behind a shared CAS/UN key
    pub variant_discount: f64,
    /// Maximum suggestions attached to a result
    pub max_suggestions: usize,
    /// Minimum fuzzy ratio (0-100) for standalone suggestion queries
    pub suggestion_floor: f64,
}

impl Default for MatcherTuning {
    fn default() -> Self {
        Self {
            matched_threshold: 0.85,
            review_threshold: 0.60,
            fuzzy_threshold: 70.0,
            fuzzy_candidate_limit: 5,
            useful_signal_floor: 0.50,
            agreement_floor: 0.40,
            agreement_bonus: 0.12,
            cross_field_cap: 0.80,
            conflict_cap: 0.84,
            variant_discount: 0.6,
            max_suggestions: 5,
            suggestion_floor: 50.0,
        }
    }
}

/// Preset threshold profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherProfile {
    /// Production defaults
    Balanced,
    /// Fewer auto-accepts, more review
    Strict,
    /// More auto-accepts, for pre-curated inventories
    Permissive,
}

impl MatcherTuning {
    pub fn from_profile(profile: MatcherProfile) -> Self {
        let base = Self::default();
        match profile {
            MatcherProfile::Balanced => base,
            MatcherProfile::Strict => Self {
                matched_threshold: 0.92,
                review_threshold: 0.70,
                fuzzy_threshold: 80.0,
                ..base
            },
            MatcherProfile::Permissive => Self {
                matched_threshold: 0.80,
                review_threshold: 0.50,
                fuzzy_threshold: 65.0,
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_are_ordered() {
        let tuning = MatcherTuning::default();
        assert!(tuning.matched_threshold > tuning.review_threshold);
        assert!(tuning.review_threshold > 0.0);
        assert!(tuning.conflict_cap > tuning.cross_field_cap);
        assert!(tuning.conflict_cap < tuning.matched_threshold);
    }

    #[test]
    fn test_profiles_shift_thresholds() {
        let strict = MatcherTuning::from_profile(MatcherProfile::Strict);
        let permissive = MatcherTuning::from_profile(MatcherProfile::Permissive);
        let balanced = MatcherTuning::from_profile(MatcherProfile::Balanced);
        assert_eq!(balanced, MatcherTuning::default());
        assert!(strict.matched_threshold > balanced.matched_threshold);
        assert!(permissive.matched_threshold < balanced.matched_threshold);
        assert!(strict.fuzzy_threshold > permissive.fuzzy_threshold);
    }
}
