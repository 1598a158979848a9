//! # chemresolve
//!
//! Multi-signal identity resolution for messy chemical inventory data.
//!
//! Inventory rows arrive with typos, swapped columns, trade names and
//! product codes where CAS numbers should be. The resolver reconciles each
//! row against an authoritative reference store by generating weighted
//! evidence from every populated field (CAS, name, formula, UN number),
//! fusing it into a calibrated confidence, and refusing to guess: a safety
//! veto blocks matches that would pair benign materials with hazardous
//! substances, and the engine never returns an identifier that is not in
//! the reference store.
//!
//! ```
//! use chemresolve::{ChemicalId, ChemicalRecord, ChemicalResolver, CleanedInput, MatchStatus};
//!
//! let resolver = ChemicalResolver::new(vec![
//!     ChemicalRecord::new(ChemicalId(1), "ACETONE").with_cas("67-64-1"),
//! ])?;
//!
//! let result = resolver.resolve(&CleanedInput::named("Acetone").with_cas("67-64-1"));
//! assert_eq!(result.status, MatchStatus::Matched);
//! assert_eq!(result.chemical_id, Some(ChemicalId(1)));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cas;
pub mod config;
pub mod fusion;
pub mod index;
pub mod model;
pub mod semantics;
pub mod signals;
pub mod test_support;
pub mod veto;

pub use cas::{find_cas_in_text, is_plausible_cas, strip_cas, validate_cas, CasError, NormalizedCas};
pub use config::{MatcherProfile, MatcherTuning};
pub use index::ReferenceIndex;
pub use model::{
    ChemicalId, ChemicalRecord, CleanedInput, Conflict, ConflictKind, FieldSwap, MatchResult,
    MatchStatus, Signal, SignalCategory, SignalSource, Suggestion,
};
pub use semantics::{Lexicon, TokenRole};
pub use signals::{SimilarityScorer, TokenSetRatio};
pub use veto::{SafetyVeto, VetoOutcome};

use anyhow::Result;
use fusion::FusedCandidate;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use signals::{detect_field_swaps, SignalEngine};
use tracing::{debug, error, info, warn};

/// The resolution engine: an immutable reference index plus tuning, a
/// string scorer and the token lexicon.
///
/// Construction is the only fallible step; `resolve` itself never fails.
/// A row the engine cannot place comes back as
/// [`MatchStatus::Unidentified`] with suggestions, not as an error.
pub struct ChemicalResolver {
    index: ReferenceIndex,
    tuning: MatcherTuning,
    lexicon: Lexicon,
    scorer: Box<dyn SimilarityScorer>,
}

impl ChemicalResolver {
    /// Build a resolver over the reference store with production defaults.
    pub fn new(records: Vec<ChemicalRecord>) -> Result<Self> {
        Ok(Self {
            index: ReferenceIndex::from_records(records)?,
            tuning: MatcherTuning::default(),
            lexicon: Lexicon::embedded().clone(),
            scorer: Box::new(TokenSetRatio),
        })
    }

    /// Replace the tuning knobs.
    pub fn with_tuning(mut self, tuning: MatcherTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Replace the token lexicon (deployments with extended token sets).
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// Replace the string similarity scorer.
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Resolve one cleaned inventory row.
    pub fn resolve(&self, input: &CleanedInput) -> MatchResult {
        debug!(name = %input.name, cas = ?input.cas, "resolving input");

        let mut conflicts: Vec<Conflict> = Vec::new();

        // Pre-match screen: flavorings, packaging and trade names can never
        // resolve to a reference chemical as written
        let mut effective_name = input.name.clone();
        if let Some(screen) = self.lexicon.screen_material(&input.name) {
            conflicts.push(Conflict::new(ConflictKind::PreMatchScreen, screen.reason.clone()));
            match screen.replacement {
                Some(generic) => {
                    debug!(name = %input.name, generic = %generic, "trade name replaced");
                    effective_name = generic;
                }
                None => {
                    let mut result = MatchResult::unidentified();
                    result.conflicts = conflicts;
                    result.suggestions = self.suggest(&input.name, &[]);
                    return result;
                }
            }
        }

        let field_swaps = detect_field_swaps(input);
        if !field_swaps.is_empty() {
            debug!(?field_swaps, "field swaps detected");
        }
        let engine = SignalEngine::new(&self.index, &self.lexicon, &self.tuning, &*self.scorer);
        let signals = engine.generate(input, &effective_name, &field_swaps);

        let input_categories = self.input_categories(input, &effective_name, &field_swaps);
        let fused = fusion::fuse(&signals, &input_categories, &self.tuning);
        conflicts.extend(fused.conflicts);

        // Safety veto: absolute, applied to every surviving candidate
        let mut candidates = fused.candidates;
        let mut vetoed_ids: FxHashSet<ChemicalId> = FxHashSet::default();
        for candidate in &mut candidates {
            let outcome = SafetyVeto::new(&self.lexicon)
                .evaluate(&effective_name, &candidate.chemical_name);
            if outcome.vetoed {
                let reason = outcome.reason.unwrap_or_default();
                warn!(
                    input = %effective_name,
                    candidate = %candidate.chemical_name,
                    %reason,
                    "candidate vetoed"
                );
                conflicts.push(Conflict::new(ConflictKind::SafetyVeto, reason));
                candidate.confidence = 0.0;
                vetoed_ids.insert(candidate.chemical_id);
            }
        }
        // Any recorded conflict keeps the row out of the auto-accept band
        if !conflicts.is_empty() {
            for candidate in &mut candidates {
                candidate.confidence = candidate.confidence.min(self.tuning.conflict_cap);
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chemical_id.cmp(&b.chemical_id))
        });

        let mut result = self.decide(&candidates, &vetoed_ids);
        result.conflicts = conflicts;
        result.field_swaps = field_swaps;
        if result.suggestions.is_empty() {
            let shown: Vec<ChemicalId> = result.chemical_id.into_iter().collect();
            result.suggestions = self
                .suggest(&effective_name, &shown)
                .into_iter()
                .filter(|s| !vetoed_ids.contains(&s.chemical_id))
                .collect();
        }

        // The engine must never surface an identifier that is not in the
        // reference store, whatever the scoring said
        if let Some(id) = result.chemical_id {
            if !self.index.contains(id) {
                error!(%id, "resolved id missing from reference index, downgrading");
                result.downgrade();
            }
        }

        info!(
            name = %input.name,
            status = %result.status,
            confidence = result.confidence,
            method = %result.match_method,
            "input resolved"
        );
        result
    }

    /// Resolve a batch of rows in parallel. Output order matches input
    /// order and is byte-identical across runs.
    pub fn resolve_batch(&self, inputs: &[CleanedInput]) -> Vec<MatchResult> {
        inputs.par_iter().map(|input| self.resolve(input)).collect()
    }

    /// Standalone "did you mean" query over the reference names, for review
    /// UIs. `excluding` drops chemicals already shown to the user.
    pub fn suggest(&self, name: &str, excluding: &[ChemicalId]) -> Vec<Suggestion> {
        if name.trim().is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<Suggestion> = self
            .index
            .name_corpus()
            .iter()
            .filter(|(_, id)| !excluding.contains(id))
            .filter_map(|(entry, id)| {
                let ratio = self.scorer.ratio(name, entry);
                if ratio < self.tuning.suggestion_floor {
                    return None;
                }
                Some(Suggestion {
                    chemical_id: *id,
                    chemical_name: self.index.name_of(*id)?.to_string(),
                    score: ratio / 100.0,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chemical_name.len().cmp(&b.chemical_name.len()))
                .then(a.chemical_id.cmp(&b.chemical_id))
        });
        hits.truncate(self.tuning.max_suggestions);
        hits
    }

    /// Which signal categories the input populated at all.
    fn input_categories(
        &self,
        input: &CleanedInput,
        effective_name: &str,
        swaps: &[FieldSwap],
    ) -> Vec<SignalCategory> {
        let mut categories = Vec::new();
        let cas_present = input.cas.is_some()
            || input.cas_scanned.is_some()
            || swaps.iter().any(|s| matches!(s, FieldSwap::CasInName { .. }));
        if cas_present {
            categories.push(SignalCategory::Cas);
        }
        if !effective_name.trim().is_empty()
            || swaps.iter().any(|s| matches!(s, FieldSwap::NameInCas { .. }))
        {
            categories.push(SignalCategory::Name);
        }
        if input.formula.is_some() {
            categories.push(SignalCategory::Formula);
        }
        if input.un_number.is_some() {
            categories.push(SignalCategory::Un);
        }
        categories
    }

    /// Turn the ranked candidate list into a result: pick the top surviving
    /// candidate, apply the status thresholds, list the rest as suggestions.
    fn decide(
        &self,
        candidates: &[FusedCandidate],
        vetoed_ids: &FxHashSet<ChemicalId>,
    ) -> MatchResult {
        let mut result = MatchResult::unidentified();

        result.signals = candidates
            .iter()
            .flat_map(|c| c.signals.iter().cloned())
            .collect();
        result.suggestions = candidates
            .iter()
            .filter(|c| !vetoed_ids.contains(&c.chemical_id) && c.confidence > 0.0)
            .skip(1)
            .take(self.tuning.max_suggestions)
            .map(|c| Suggestion {
                chemical_id: c.chemical_id,
                chemical_name: c.chemical_name.clone(),
                score: c.confidence,
            })
            .collect();

        let Some(top) = candidates.first() else {
            return result;
        };
        if vetoed_ids.contains(&top.chemical_id) || top.confidence <= 0.0 {
            return result;
        }

        if top.confidence >= self.tuning.matched_threshold {
            result.status = MatchStatus::Matched;
        } else if top.confidence >= self.tuning.review_threshold {
            result.status = MatchStatus::ReviewRequired;
        } else {
            // Best candidate is too weak to assert an identity; it stays
            // visible as the first suggestion
            result.suggestions.insert(
                0,
                Suggestion {
                    chemical_id: top.chemical_id,
                    chemical_name: top.chemical_name.clone(),
                    score: top.confidence,
                },
            );
            result.suggestions.truncate(self.tuning.max_suggestions);
            return result;
        }

        result.chemical_id = Some(top.chemical_id);
        result.chemical_name = Some(top.chemical_name.clone());
        result.match_method = top.best_source.as_str().to_string();
        result.confidence = top.confidence;
        result
    }
}
