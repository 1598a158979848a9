//! # Signal Fusion
//!
//! Combines per-field signals into one calibrated confidence per candidate.
//!
//! The denominator is candidate-relative: each candidate is scored against
//! the theoretical maximum of the categories it actually has solid evidence
//! in, not against every field the input happened to populate. A row with a
//! CAS pointing at chemical A and a name pointing at chemical B gives both
//! candidates strong same-category confidence; the cross-field conflict cap
//! is what pulls them into the review band.

use crate::config::MatcherTuning;
use crate::model::{
    ChemicalId, Conflict, ConflictKind, Signal, SignalCategory, SignalSource,
};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One candidate after fusion, ranked by calibrated confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
    pub chemical_id: ChemicalId,
    pub chemical_name: String,
    /// Calibrated confidence in [0, 1], cross-field cap applied
    pub confidence: f64,
    /// Sum of the best weighted signal per category, before calibration
    pub raw_total: f64,
    /// Source of the strongest signal, reported as the match method
    pub best_source: SignalSource,
    /// Best signal per source tag, strongest first
    pub signals: Vec<Signal>,
}

/// Ranked candidates plus the cross-field conflicts found while fusing.
#[derive(Debug, Clone, Default)]
pub struct FusionOutcome {
    pub candidates: Vec<FusedCandidate>,
    pub conflicts: Vec<Conflict>,
}

/// The part of a candidate name that identifies the substance: everything
/// before the first comma. "ACETONE, TECHNICAL GRADE" agrees with "ACETONE".
fn base_name(name: &str) -> &str {
    name.split(',').next().unwrap_or(name).trim()
}

/// Fuse signals into ranked candidates.
///
/// `input_categories` lists the categories the input populated at all; it is
/// the denominator fallback for candidates whose signals are all weak.
pub fn fuse(
    signals: &[Signal],
    input_categories: &[SignalCategory],
    tuning: &MatcherTuning,
) -> FusionOutcome {
    if signals.is_empty() {
        return FusionOutcome::default();
    }

    // Best signal per (candidate, source)
    let mut best: FxHashMap<(ChemicalId, SignalSource), Signal> = FxHashMap::default();
    for signal in signals {
        let key = (signal.chemical_id, signal.source);
        match best.get(&key) {
            Some(current) if current.weighted() >= signal.weighted() => {}
            _ => {
                best.insert(key, signal.clone());
            }
        }
    }

    let mut per_candidate: FxHashMap<ChemicalId, Vec<Signal>> = FxHashMap::default();
    for signal in best.into_values() {
        per_candidate.entry(signal.chemical_id).or_default().push(signal);
    }

    let conflicts = detect_conflicts(&per_candidate, tuning);
    let cross_field = conflicts
        .iter()
        .any(|c| matches!(c.kind, ConflictKind::CasNameMismatch | ConflictKind::FormulaNameMismatch));

    // Agreement lookup: for each base name, the categories backing it with
    // a solid weighted score. Variant records credit their parent.
    let mut agreement: FxHashMap<String, BTreeSet<SignalCategory>> = FxHashMap::default();
    for signals in per_candidate.values() {
        for signal in signals {
            if signal.weighted() >= tuning.agreement_floor {
                agreement
                    .entry(base_name(&signal.chemical_name).to_uppercase())
                    .or_default()
                    .insert(signal.source.category());
            }
        }
    }

    let mut candidates: Vec<FusedCandidate> = per_candidate
        .into_iter()
        .map(|(id, mut signals)| {
            signals.sort_by(|a, b| {
                b.weighted()
                    .partial_cmp(&a.weighted())
                    .unwrap_or(Ordering::Equal)
                    .then(a.source.as_str().cmp(b.source.as_str()))
            });
            let name = signals[0].chemical_name.clone();
            let best_source = signals[0].source;

            // Best weighted signal per category
            let mut per_category: FxHashMap<SignalCategory, f64> = FxHashMap::default();
            for signal in &signals {
                let entry = per_category.entry(signal.source.category()).or_insert(0.0);
                if signal.weighted() > *entry {
                    *entry = signal.weighted();
                }
            }
            let raw_total: f64 = per_category.values().sum();

            // Candidate-relative theoretical maximum. Only categories with
            // solid evidence count, so a weak supporting signal can never
            // lower the confidence a strong signal earns alone.
            let solid: BTreeSet<SignalCategory> = signals
                .iter()
                .filter(|s| s.weighted() >= tuning.useful_signal_floor)
                .map(|s| s.source.category())
                .collect();
            let denominator_categories: Vec<SignalCategory> = if solid.is_empty() {
                input_categories.to_vec()
            } else {
                solid.into_iter().collect()
            };
            let max: f64 = denominator_categories
                .iter()
                .map(|c| c.top_weight())
                .sum();

            let ratio = if max > 0.0 {
                (raw_total / max).min(1.0)
            } else {
                0.0
            };

            let agreeing = agreement
                .get(&base_name(&name).to_uppercase())
                .map(BTreeSet::len)
                .unwrap_or(0);
            let bonus = if agreeing > 1 {
                tuning.agreement_bonus * (agreeing as f64 - 1.0)
            } else {
                0.0
            };

            // Cross-field disagreement caps here; the resolver applies the
            // general conflict cap once all conflict kinds are known
            let mut confidence = (ratio + bonus).min(1.0);
            if cross_field {
                confidence = confidence.min(tuning.cross_field_cap);
            }

            FusedCandidate {
                chemical_id: id,
                chemical_name: name,
                confidence,
                raw_total,
                best_source,
                signals,
            }
        })
        .collect();

    // Deterministic order: confidence, evidence mass, shortest name, id
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then(
                b.raw_total
                    .partial_cmp(&a.raw_total)
                    .unwrap_or(Ordering::Equal),
            )
            .then(a.chemical_name.len().cmp(&b.chemical_name.len()))
            .then(a.chemical_id.cmp(&b.chemical_id))
    });

    FusionOutcome {
        candidates,
        conflicts,
    }
}

/// Cross-field disagreement: two categories each hold strong evidence, and
/// the substances they point at share no base name.
fn detect_conflicts(
    per_candidate: &FxHashMap<ChemicalId, Vec<Signal>>,
    tuning: &MatcherTuning,
) -> Vec<Conflict> {
    let strong_bases = |category: SignalCategory| -> BTreeSet<String> {
        per_candidate
            .values()
            .flatten()
            .filter(|s| s.source.category() == category && s.weighted() >= tuning.useful_signal_floor)
            .map(|s| base_name(&s.chemical_name).to_uppercase())
            .collect()
    };

    let cas = strong_bases(SignalCategory::Cas);
    let name = strong_bases(SignalCategory::Name);
    let formula = strong_bases(SignalCategory::Formula);

    let mut conflicts = Vec::new();

    if !cas.is_empty() && !name.is_empty() && cas.is_disjoint(&name) {
        conflicts.push(Conflict::new(
            ConflictKind::CasNameMismatch,
            format!(
                "CAS evidence points to [{}] but name evidence points to [{}]",
                join(&cas),
                join(&name)
            ),
        ));
    }

    if !formula.is_empty() && !name.is_empty() && formula.is_disjoint(&name) {
        conflicts.push(Conflict::new(
            ConflictKind::FormulaNameMismatch,
            format!(
                "formula evidence points to [{}] but name evidence points to [{}]",
                join(&formula),
                join(&name)
            ),
        ));
    }

    conflicts
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
}
