//! # Signal Generators
//!
//! Turns each populated input field into weighted evidence against the
//! reference index. Exact lookups produce raw score 1.0; fuzzy name matches
//! blend a token-set string ratio with the semantic token-overlap score so
//! that surface similarity alone cannot carry a match.
//!
//! Also detects field swaps, the most common inventory data error: a CAS
//! number typed into the name column, or a chemical name typed into the CAS
//! column.

use crate::cas::{find_cas_in_text, is_plausible_cas};
use crate::config::MatcherTuning;
use crate::index::ReferenceIndex;
use crate::model::{ChemicalId, CleanedInput, FieldSwap, Signal, SignalSource};
use crate::semantics::Lexicon;
use crate::veto::SafetyVeto;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// Weight of the string ratio in a fuzzy signal's raw score.
const FUZZY_RATIO_WEIGHT: f64 = 0.55;
/// Weight of the semantic token-overlap score in a fuzzy signal's raw score.
const FUZZY_SEMANTIC_WEIGHT: f64 = 0.45;

/// String similarity on a 0-100 scale.
///
/// The engine only assumes symmetry and that 100 means equal; swapping in a
/// different scorer (trigram, phonetic) is a one-line change on the resolver.
pub trait SimilarityScorer: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;
}

/// Token-set ratio: compares the sorted shared tokens against each side's
/// full sorted token string and takes the best pairwise similarity. Word
/// order and duplicated tokens stop mattering, which suits chemical names
/// ("PHOSPHORUS, WHITE" vs "white phosphorus").
///
/// Pairwise similarity is the indel ratio `2*lcs / (len_a + len_b)`; plain
/// edit-distance similarity over the full strings is kept as a floor for
/// near-identical names that share no exact token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetRatio;

impl TokenSetRatio {
    fn tokens(s: &str) -> BTreeSet<String> {
        s.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn join(tokens: impl IntoIterator<Item = String>) -> String {
        tokens.into_iter().collect::<Vec<_>>().join(" ")
    }
}

impl SimilarityScorer for TokenSetRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let ta = Self::tokens(a);
        let tb = Self::tokens(b);
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }

        let shared: BTreeSet<String> = ta.intersection(&tb).cloned().collect();
        let only_a: Vec<String> = ta.difference(&tb).cloned().collect();
        let only_b: Vec<String> = tb.difference(&ta).cloned().collect();

        let base = Self::join(shared.iter().cloned());
        let combined_a = Self::join(shared.iter().cloned().chain(only_a));
        let combined_b = Self::join(shared.iter().cloned().chain(only_b));

        let token_set = indel_similarity(&base, &combined_a)
            .max(indel_similarity(&base, &combined_b))
            .max(indel_similarity(&combined_a, &combined_b));

        // Whole-string floor catches typos inside single tokens
        let whole = strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase());

        token_set.max(whole) * 100.0
    }
}

/// Indel similarity: `2*lcs(a, b) / (|a| + |b|)`, in [0, 1].
fn indel_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    2.0 * lcs as f64 / (a.len() + b.len()) as f64
}

/// Inspect the input for data landed in the wrong column.
pub fn detect_field_swaps(input: &CleanedInput) -> Vec<FieldSwap> {
    let mut swaps = Vec::new();

    if let Some(cas) = find_cas_in_text(&input.name) {
        swaps.push(FieldSwap::CasInName {
            cas: cas.as_str().to_string(),
        });
    }

    // Name-shaped text in the CAS column: only when validation already
    // failed, and only for values that carry letters
    if input.cas.is_none() {
        if let Some(raw) = &input.cas_raw {
            let trimmed = raw.trim();
            if trimmed.len() > 3
                && trimmed.chars().any(|c| c.is_alphabetic())
                && !is_plausible_cas(trimmed)
            {
                swaps.push(FieldSwap::NameInCas {
                    text: trimmed.to_string(),
                });
            }
        }
    }

    swaps
}

/// Generates signals for one input against the reference index.
pub struct SignalEngine<'a> {
    index: &'a ReferenceIndex,
    tuning: &'a MatcherTuning,
    scorer: &'a dyn SimilarityScorer,
    veto: SafetyVeto<'a>,
}

impl<'a> SignalEngine<'a> {
    pub fn new(
        index: &'a ReferenceIndex,
        lexicon: &'a Lexicon,
        tuning: &'a MatcherTuning,
        scorer: &'a dyn SimilarityScorer,
    ) -> Self {
        Self {
            index,
            tuning,
            scorer,
            veto: SafetyVeto::new(lexicon),
        }
    }

    /// All signals for one input. `effective_name` is the name after the
    /// pre-match screen (a trade name may have been replaced by its generic
    /// equivalent); `swaps` comes from [`detect_field_swaps`].
    pub fn generate(
        &self,
        input: &CleanedInput,
        effective_name: &str,
        swaps: &[FieldSwap],
    ) -> Vec<Signal> {
        let mut signals = Vec::new();
        self.cas_signals(input, swaps, &mut signals);
        self.name_signals(effective_name, swaps, &mut signals);
        self.formula_signals(input, &mut signals);
        self.un_signals(input, &mut signals);
        signals
    }

    /// Emit one signal per record in a shared-key bucket. The bucket is
    /// sorted shortest-name-first; records after the first are variants and
    /// carry a discounted weight.
    fn bucket_signals(
        &self,
        ids: &[ChemicalId],
        source: SignalSource,
        detail: &str,
        out: &mut Vec<Signal>,
    ) {
        for (rank, id) in ids.iter().enumerate() {
            let Some(name) = self.index.name_of(*id) else {
                continue;
            };
            let mut signal = Signal::new(*id, name, source, 1.0, detail);
            if rank > 0 {
                signal = signal.discounted(self.tuning.variant_discount);
            }
            out.push(signal);
        }
    }

    fn cas_signals(&self, input: &CleanedInput, swaps: &[FieldSwap], out: &mut Vec<Signal>) {
        if let Some(cas) = &input.cas {
            self.bucket_signals(
                self.index.lookup_cas(cas),
                SignalSource::CasExact,
                &format!("CAS {cas} matched"),
                out,
            );
        }

        if let Some(cas) = &input.cas_scanned {
            self.bucket_signals(
                self.index.lookup_cas(cas),
                SignalSource::CasScanned,
                &format!("scanned CAS {cas} matched"),
                out,
            );
        }

        for swap in swaps {
            if let FieldSwap::CasInName { cas } = swap {
                self.bucket_signals(
                    self.index.lookup_cas(cas),
                    SignalSource::CasFromName,
                    &format!("CAS {cas} recovered from name field"),
                    out,
                );
            }
        }
    }

    fn name_signals(&self, name: &str, swaps: &[FieldSwap], out: &mut Vec<Signal>) {
        if name.trim().is_empty() {
            return;
        }

        // Ids with an exact-tier name hit; weaker name sources skip these
        let mut exact_ids: FxHashSet<ChemicalId> = FxHashSet::default();

        if let Some(id) = self.index.lookup_name(name) {
            if let Some(cand) = self.index.name_of(id) {
                out.push(Signal::new(
                    id,
                    cand,
                    SignalSource::NameExact,
                    1.0,
                    "exact name match",
                ));
                exact_ids.insert(id);
            }
        }

        for id in self.index.lookup_synonym(name) {
            if exact_ids.contains(id) {
                continue;
            }
            if let Some(cand) = self.index.name_of(*id) {
                out.push(Signal::new(
                    *id,
                    cand,
                    SignalSource::SynonymExact,
                    1.0,
                    format!("synonym '{name}' matched"),
                ));
                exact_ids.insert(*id);
            }
        }

        if let Some(id) = self.index.lookup_normalized_name(name) {
            if !exact_ids.contains(&id) {
                if let Some(cand) = self.index.name_of(id) {
                    out.push(Signal::new(
                        id,
                        cand,
                        SignalSource::NameNormalized,
                        1.0,
                        "name matched after normalization",
                    ));
                    exact_ids.insert(id);
                }
            }
        }

        self.fuzzy_signals(
            name,
            self.index.name_corpus(),
            SignalSource::NameFuzzy,
            &exact_ids,
            out,
        );
        self.fuzzy_signals(
            name,
            self.index.synonym_corpus(),
            SignalSource::SynonymFuzzy,
            &exact_ids,
            out,
        );

        // A chemical name in the CAS column still identifies the chemical,
        // just with less trust
        for swap in swaps {
            if let FieldSwap::NameInCas { text } = swap {
                if let Some(id) = self.index.lookup_name(text) {
                    if let Some(cand) = self.index.name_of(id) {
                        out.push(Signal::new(
                            id,
                            cand,
                            SignalSource::NameInCas,
                            1.0,
                            format!("name '{text}' found in CAS column"),
                        ));
                    }
                } else {
                    for id in self.index.lookup_synonym(text) {
                        if let Some(cand) = self.index.name_of(*id) {
                            out.push(Signal::new(
                                *id,
                                cand,
                                SignalSource::NameInCas,
                                1.0,
                                format!("synonym '{text}' found in CAS column"),
                            ));
                        }
                    }
                }
            }
        }
    }

    /// Scan a corpus for approximate matches, blending the string ratio with
    /// the semantic overlap score. Vetoed pairs keep only the ratio part;
    /// the resolver zeroes them out later with an explanation.
    fn fuzzy_signals(
        &self,
        name: &str,
        corpus: &[(String, ChemicalId)],
        source: SignalSource,
        exact_ids: &FxHashSet<ChemicalId>,
        out: &mut Vec<Signal>,
    ) {
        // A record can surface several times in the corpus (one entry per
        // synonym); keep the best-scoring entry per record
        let mut best: FxHashMap<ChemicalId, Signal> = FxHashMap::default();

        for (entry, id) in corpus {
            if exact_ids.contains(id) {
                continue;
            }
            let ratio = self.scorer.ratio(name, entry);
            if ratio < self.tuning.fuzzy_threshold {
                continue;
            }
            let Some(cand_name) = self.index.name_of(*id) else {
                continue;
            };
            let semantic = self.veto.evaluate(name, cand_name).score;
            let raw =
                FUZZY_RATIO_WEIGHT * (ratio / 100.0) + FUZZY_SEMANTIC_WEIGHT * semantic;
            if best.get(id).is_some_and(|s| s.raw_score >= raw) {
                continue;
            }
            best.insert(
                *id,
                Signal::new(
                    *id,
                    cand_name,
                    source,
                    raw,
                    format!("fuzzy ratio {ratio:.0}, semantic {semantic:.2}"),
                ),
            );
        }

        let mut hits: Vec<Signal> = best.into_values().collect();
        hits.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chemical_id.cmp(&b.chemical_id))
        });
        hits.truncate(self.tuning.fuzzy_candidate_limit);
        out.extend(hits);
    }

    fn formula_signals(&self, input: &CleanedInput, out: &mut Vec<Signal>) {
        if let Some(formula) = &input.formula {
            for id in self.index.lookup_formula(formula) {
                if let Some(cand) = self.index.name_of(*id) {
                    out.push(Signal::new(
                        *id,
                        cand,
                        SignalSource::FormulaExact,
                        1.0,
                        format!("formula {formula} matched"),
                    ));
                }
            }
        }
    }

    fn un_signals(&self, input: &CleanedInput, out: &mut Vec<Signal>) {
        if let Some(un) = input.un_number {
            self.bucket_signals(
                self.index.lookup_un(un),
                SignalSource::UnExact,
                &format!("UN {un} matched"),
                out,
            );
        }
    }
}
