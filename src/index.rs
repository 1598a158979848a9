//! # Reference Index
//!
//! Immutable lookup structure built once over the reference chemical store.
//! Every exact-match signal the engine emits comes from one of these maps;
//! fuzzy matching scans the name and synonym corpora linearly.
//!
//! CAS and UN keys can be shared by several records (hydrates, grades,
//! concentrations of the same substance). Those buckets are sorted by name
//! length ascending so the shortest, most generic record ranks first and the
//! rest are treated as discounted variants.

use crate::cas::strip_cas;
use crate::model::{ChemicalId, ChemicalRecord};
use anyhow::{bail, Result};
use rustc_hash::FxHashMap;
use tracing::{info, warn};

/// Uppercase and drop everything that is not a letter or digit. Collapses
/// spacing, punctuation and case so "N,N-Dimethylformamide" and
/// "n n dimethylformamide" share a key.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Uppercase and drop whitespace and dots. Formulas arrive as "C3H6O",
/// "C3 H6 O" or "C3H6O.H2O" depending on the source system.
pub fn normalize_formula(formula: &str) -> String {
    formula
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Immutable index over the reference store.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    records: FxHashMap<ChemicalId, ChemicalRecord>,
    by_cas: FxHashMap<String, Vec<ChemicalId>>,
    by_un: FxHashMap<u32, Vec<ChemicalId>>,
    by_name: FxHashMap<String, ChemicalId>,
    by_normalized_name: FxHashMap<String, ChemicalId>,
    by_synonym: FxHashMap<String, Vec<ChemicalId>>,
    by_formula: FxHashMap<String, Vec<ChemicalId>>,
    /// (uppercase canonical name, id) pairs for fuzzy scans
    name_corpus: Vec<(String, ChemicalId)>,
    /// (uppercase synonym, id) pairs for fuzzy scans
    synonym_corpus: Vec<(String, ChemicalId)>,
}

impl ReferenceIndex {
    /// Build the index from the full reference store. Fails closed: an empty
    /// store would silently mark every input UNIDENTIFIED, so it is an error.
    pub fn from_records(source: Vec<ChemicalRecord>) -> Result<Self> {
        if source.is_empty() {
            bail!("reference store is empty, refusing to build an index");
        }

        let mut records: FxHashMap<ChemicalId, ChemicalRecord> = FxHashMap::default();
        let mut by_cas: FxHashMap<String, Vec<ChemicalId>> = FxHashMap::default();
        let mut by_un: FxHashMap<u32, Vec<ChemicalId>> = FxHashMap::default();
        let mut by_name: FxHashMap<String, ChemicalId> = FxHashMap::default();
        let mut by_normalized_name: FxHashMap<String, ChemicalId> = FxHashMap::default();
        let mut by_synonym: FxHashMap<String, Vec<ChemicalId>> = FxHashMap::default();
        let mut by_formula: FxHashMap<String, Vec<ChemicalId>> = FxHashMap::default();
        let mut name_corpus = Vec::with_capacity(source.len());
        let mut synonym_corpus = Vec::new();

        for record in source {
            let id = record.id;
            if records.contains_key(&id) {
                warn!(%id, name = %record.name, "duplicate reference id, keeping first");
                continue;
            }

            let name_upper = record.name.trim().to_uppercase();
            if name_upper.is_empty() {
                warn!(%id, "reference record with empty name, skipping");
                continue;
            }

            by_name.entry(name_upper.clone()).or_insert(id);
            by_normalized_name
                .entry(normalize_name(&record.name))
                .or_insert(id);
            name_corpus.push((name_upper, id));

            for synonym in &record.synonyms {
                let syn_upper = synonym.trim().to_uppercase();
                if syn_upper.is_empty() {
                    continue;
                }
                by_synonym.entry(syn_upper.clone()).or_default().push(id);
                synonym_corpus.push((syn_upper, id));
            }

            for cas in &record.cas_numbers {
                let key = strip_cas(cas);
                if !key.is_empty() {
                    by_cas.entry(key).or_default().push(id);
                }
            }

            for un in &record.un_numbers {
                by_un.entry(*un).or_default().push(id);
            }

            for formula in &record.formulas {
                let key = normalize_formula(formula);
                if !key.is_empty() {
                    by_formula.entry(key).or_default().push(id);
                }
            }

            records.insert(id, record);
        }

        if records.is_empty() {
            bail!("no usable reference records after filtering");
        }

        // Shortest name first inside shared-key buckets, id as tie-break
        let by_len = |ids: &mut Vec<ChemicalId>, records: &FxHashMap<ChemicalId, ChemicalRecord>| {
            ids.sort_by_key(|id| {
                let len = records.get(id).map(|r| r.name.len()).unwrap_or(usize::MAX);
                (len, *id)
            });
            ids.dedup();
        };
        for ids in by_cas.values_mut() {
            by_len(ids, &records);
        }
        for ids in by_un.values_mut() {
            by_len(ids, &records);
        }
        for ids in by_synonym.values_mut() {
            by_len(ids, &records);
        }
        for ids in by_formula.values_mut() {
            by_len(ids, &records);
        }

        info!(
            records = records.len(),
            cas_keys = by_cas.len(),
            un_keys = by_un.len(),
            synonyms = synonym_corpus.len(),
            formulas = by_formula.len(),
            "reference index built"
        );

        Ok(Self {
            records,
            by_cas,
            by_un,
            by_name,
            by_normalized_name,
            by_synonym,
            by_formula,
            name_corpus,
            synonym_corpus,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether an id exists in the reference store. The resolver's final
    /// anti-hallucination check goes through here.
    pub fn contains(&self, id: ChemicalId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn record(&self, id: ChemicalId) -> Option<&ChemicalRecord> {
        self.records.get(&id)
    }

    /// Canonical name for an id, if it exists.
    pub fn name_of(&self, id: ChemicalId) -> Option<&str> {
        self.records.get(&id).map(|r| r.name.as_str())
    }

    /// Records sharing a CAS number, shortest name first. `cas` may be
    /// dashed or stripped.
    pub fn lookup_cas(&self, cas: &str) -> &[ChemicalId] {
        self.by_cas
            .get(&strip_cas(cas))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records sharing a UN number, shortest name first.
    pub fn lookup_un(&self, un: u32) -> &[ChemicalId] {
        self.by_un.get(&un).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Case-insensitive exact canonical-name lookup.
    pub fn lookup_name(&self, name: &str) -> Option<ChemicalId> {
        self.by_name.get(&name.trim().to_uppercase()).copied()
    }

    /// Lookup after stripping all non-alphanumerics.
    pub fn lookup_normalized_name(&self, name: &str) -> Option<ChemicalId> {
        self.by_normalized_name.get(&normalize_name(name)).copied()
    }

    /// Case-insensitive exact synonym lookup.
    pub fn lookup_synonym(&self, synonym: &str) -> &[ChemicalId] {
        self.by_synonym
            .get(&synonym.trim().to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whitespace-and-case-normalized formula lookup.
    pub fn lookup_formula(&self, formula: &str) -> &[ChemicalId] {
        self.by_formula
            .get(&normalize_formula(formula))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All (uppercase name, id) pairs, for fuzzy scans.
    pub fn name_corpus(&self) -> &[(String, ChemicalId)] {
        &self.name_corpus
    }

    /// All (uppercase synonym, id) pairs, for fuzzy scans.
    pub fn synonym_corpus(&self) -> &[(String, ChemicalId)] {
        &self.synonym_corpus
    }
}
