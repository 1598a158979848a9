//! # Safety Veto Engine
//!
//! Blocks matches where a benign input (food flavoring, wax, pharmaceutical)
//! would resolve to a hazardous substance (explosives, cyanides, radioactive
//! materials) on superficial text similarity alone. A veto forces the pair's
//! score to zero; no fuzzy ratio can override it.
//!
//! When not vetoed, the pair gets a semantic score from BASE/SALT token
//! overlap that the fuzzy signal generators blend into their raw scores.

use crate::semantics::{base_tokens, conc_tokens, salt_tokens, Lexicon, TokenRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of the safety check for one input/candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoOutcome {
    pub vetoed: bool,
    /// Human-readable veto reason; `None` when not vetoed
    pub reason: Option<String>,
    /// Semantic similarity in [0, 1]; 0.0 when vetoed
    pub score: f64,
    /// Fraction of input BASE tokens present in the candidate
    pub base_overlap: f64,
    /// Fraction of input SALT tokens present in the candidate
    pub salt_overlap: f64,
}

impl VetoOutcome {
    fn vetoed(reason: String) -> Self {
        Self {
            vetoed: true,
            reason: Some(reason),
            score: 0.0,
            base_overlap: 0.0,
            salt_overlap: 0.0,
        }
    }
}

/// Weight of BASE-token overlap in the semantic score.
const BASE_WEIGHT: f64 = 0.60;
/// Weight of SALT-token overlap in the semantic score.
const SALT_WEIGHT: f64 = 0.25;
/// Bonus when every input BASE token appears in the candidate.
const FULL_BASE_BONUS: f64 = 0.10;
/// Bonus when every input SALT token appears in the candidate.
const FULL_SALT_BONUS: f64 = 0.05;
/// Hard cap when input BASE tokens exist but none overlap the candidate.
/// Keeps "Zinc Gluconate" from confidently matching "Zinc Chloride".
const NO_BASE_OVERLAP_CAP: f64 = 0.35;

/// Evaluates veto rules and semantic overlap for input/candidate pairs.
#[derive(Debug, Clone, Copy)]
pub struct SafetyVeto<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> SafetyVeto<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Run the veto rules (in order, any one sufficient) and, when clear,
    /// compute the BASE/SALT overlap score.
    pub fn evaluate(&self, input_name: &str, candidate_name: &str) -> VetoOutcome {
        let lex = self.lexicon;
        let input_tokens = lex.classify_name(input_name);
        let cand_tokens = lex.classify_name(candidate_name);

        let input_bases = base_tokens(&input_tokens);
        let cand_bases = base_tokens(&cand_tokens);
        let input_salts = salt_tokens(&input_tokens);
        let cand_salts = salt_tokens(&cand_tokens);

        let hazard_labels = lex.hazard_labels(&cand_tokens, candidate_name);
        let candidate_hazardous = !hazard_labels.is_empty();

        // Rule 1: benign context must never match a hazardous candidate
        if lex.has_safety_context(&input_tokens) && candidate_hazardous {
            let safety_labels: Vec<&str> = input_tokens
                .iter()
                .filter(|t| t.role == TokenRole::Safety)
                .map(|t| t.text.as_str())
                .collect();
            return VetoOutcome::vetoed(format!(
                "SAFETY VETO: input has benign context [{}] but candidate contains hazard [{}]",
                safety_labels.join(", "),
                hazard_labels.join(", ")
            ));
        }

        // Rule 2: pharmaceutical names never match industrial hazmat
        if candidate_hazardous {
            if let Some(drug) = input_tokens
                .iter()
                .find(|t| t.role == TokenRole::Base && lex.is_pharma_name(&t.text))
            {
                return VetoOutcome::vetoed(format!(
                    "PHARMA VETO: '{}' is a drug name but candidate contains hazard [{}]",
                    drug.text,
                    hazard_labels.join(", ")
                ));
            }
        }

        // Rule 3: disjoint chemical identity with a dangerous substance
        if candidate_hazardous
            && !input_bases.is_empty()
            && input_bases.is_disjoint(&cand_bases)
        {
            return VetoOutcome::vetoed(format!(
                "BASE MISMATCH VETO: input base tokens [{}] absent from hazardous candidate [{}]",
                join(&input_bases),
                hazard_labels.join(", ")
            ));
        }

        // Rule 4: edible oils never match fuel/explosive oil mixtures
        if lex.is_edible_oil_context(input_name) {
            let cand_lower = candidate_name.to_lowercase();
            let fuel_marker = ["fuel", "nitrate", "explosive", "mixture"]
                .iter()
                .find(|m| cand_lower.contains(**m));
            if let Some(marker) = fuel_marker {
                return VetoOutcome::vetoed(format!(
                    "EDIBLE OIL VETO: '{input_name}' is an edible oil but candidate \
                     '{candidate_name}' carries the hazard marker '{marker}'"
                ));
            }
        }

        // Not vetoed: score BASE/SALT overlap
        let base_overlap = overlap_ratio(&input_bases, &cand_bases);
        let salt_overlap = overlap_ratio(&input_salts, &cand_salts);

        let mut score = if !input_bases.is_empty() && base_overlap == 0.0 {
            // Salt/form agreement alone is a very weak match
            (salt_overlap * SALT_WEIGHT).min(NO_BASE_OVERLAP_CAP)
        } else if input_bases.is_empty() {
            // No base tokens at all: lean on the salt evidence
            salt_overlap * 0.50
        } else {
            let mut s = base_overlap * BASE_WEIGHT + salt_overlap * SALT_WEIGHT;
            if input_bases.is_subset(&cand_bases) {
                s += FULL_BASE_BONUS;
            }
            if !input_salts.is_empty() && input_salts.is_subset(&cand_salts) {
                s += FULL_SALT_BONUS;
            }
            s
        };

        // Concentration-only agreement is meaningless
        let input_conc = conc_tokens(&input_tokens);
        if !input_conc.is_empty() && input_bases.is_empty() && input_salts.is_empty() {
            score = 0.0;
        }

        VetoOutcome {
            vetoed: false,
            reason: None,
            score: score.clamp(0.0, 1.0),
            base_overlap,
            salt_overlap,
        }
    }
}

/// Fraction of `input` tokens present in `candidate` (asymmetric).
fn overlap_ratio(input: &BTreeSet<String>, candidate: &BTreeSet<String>) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    input.intersection(candidate).count() as f64 / input.len() as f64
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn veto() -> SafetyVeto<'static> {
        SafetyVeto::new(Lexicon::embedded())
    }

    #[test]
    fn test_safety_context_blocks_hazard() {
        let outcome = veto().evaluate("White Wax", "PHOSPHORUS, WHITE");
        assert!(outcome.vetoed);
        assert_eq!(outcome.score, 0.0);
        let reason = outcome.reason.unwrap().to_lowercase();
        assert!(reason.contains("safety"));
        assert!(reason.contains("hazard"));
    }

    #[test]
    fn test_pharma_never_matches_hazmat() {
        let outcome = veto().evaluate("Atorvastatin 20mg", "ARSENIC TRIOXIDE");
        assert!(outcome.vetoed);
        assert!(outcome.reason.unwrap().contains("PHARMA VETO"));
    }

    #[test]
    fn test_disjoint_base_blocks_hazardous_candidate() {
        let outcome = veto().evaluate("Glucose Syrup Solids", "SODIUM CYANIDE");
        assert!(outcome.vetoed);

        // Same rule does not fire for benign candidates
        let outcome = veto().evaluate("Glucose", "FRUCTOSE");
        assert!(!outcome.vetoed);
    }

    #[test]
    fn test_edible_oil_blocks_fuel_mixtures() {
        let outcome = veto().evaluate("Arachis Oil", "AMMONIUM NITRATE-FUEL OIL MIXTURE");
        assert!(outcome.vetoed);
        assert!(outcome.reason.unwrap().contains("EDIBLE OIL VETO"));

        let outcome = veto().evaluate("Olive Oil", "OLIVE OIL, REFINED");
        assert!(!outcome.vetoed);
    }

    #[test]
    fn test_shared_base_with_hazard_is_not_vetoed() {
        // Input explicitly names the hazardous base; that is a legitimate match
        let outcome = veto().evaluate("Phosphorus pellets", "PHOSPHORUS, WHITE");
        assert!(!outcome.vetoed);
    }

    #[test]
    fn test_full_base_and_salt_overlap_scores_high() {
        let outcome = veto().evaluate("Zinc Gluconate", "ZINC GLUCONATE");
        assert!(!outcome.vetoed);
        // zinc and gluconate both classify as SALT; full subset bonuses apply
        assert!(outcome.score > 0.0);
        assert_eq!(outcome.salt_overlap, 1.0);
    }

    #[test]
    fn test_no_base_overlap_is_capped() {
        let outcome = veto().evaluate("Ibuprofen Gluconate", "Ibufenac Chloride");
        assert!(!outcome.vetoed);
        assert!(outcome.score <= NO_BASE_OVERLAP_CAP + 1e-9);
    }

    #[test]
    fn test_concentration_only_scores_zero() {
        let outcome = veto().evaluate("39% solution", "Ethanol 39%");
        assert!(!outcome.vetoed);
        assert_eq!(outcome.score, 0.0);
    }
}
