//! # Data Model
//!
//! Core data structures for chemical identity resolution: reference records,
//! cleaned inventory inputs, matching signals, and the final match result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact identifier for reference chemicals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChemicalId(pub u32);

impl fmt::Display for ChemicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

/// One chemical from the authoritative reference store.
///
/// Records are created and owned entirely by the reference store; the engine
/// reads them once at construction and never writes them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalRecord {
    /// Stable identifier within the reference store
    pub id: ChemicalId,
    /// Canonical name
    pub name: String,
    /// Known synonyms
    pub synonyms: Vec<String>,
    /// Molecular formulas (a record may list variants)
    pub formulas: Vec<String>,
    /// CAS Registry Numbers associated with this chemical
    pub cas_numbers: Vec<String>,
    /// UN/NA transport identifiers
    pub un_numbers: Vec<u32>,
}

impl ChemicalRecord {
    /// Create a record with just an id and canonical name.
    pub fn new(id: ChemicalId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            synonyms: Vec::new(),
            formulas: Vec::new(),
            cas_numbers: Vec::new(),
            un_numbers: Vec::new(),
        }
    }

    /// Add a CAS number.
    pub fn with_cas(mut self, cas: impl Into<String>) -> Self {
        self.cas_numbers.push(cas.into());
        self
    }

    /// Add a synonym.
    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }

    /// Add a molecular formula.
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formulas.push(formula.into());
        self
    }

    /// Add a UN number.
    pub fn with_un_number(mut self, un: u32) -> Self {
        self.un_numbers.push(un);
        self
    }
}

/// One inventory row after upstream cleaning.
///
/// The cleaning collaborator normalizes encoding/whitespace, validates the
/// CAS column, and scans the remaining columns for CAS-shaped values before
/// handing the row to the resolver. Absent fields simply produce no signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedInput {
    /// Material name as written in the inventory
    pub name: String,
    /// CAS from the CAS column, already checksum-validated upstream
    pub cas: Option<String>,
    /// Raw CAS-column text when validation failed (field-swap detection)
    pub cas_raw: Option<String>,
    /// Best-effort CAS recovered by scanning other columns
    pub cas_scanned: Option<String>,
    /// Molecular formula column
    pub formula: Option<String>,
    /// UN/NA number column
    pub un_number: Option<u32>,
}

impl CleanedInput {
    /// Create an input carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cas: None,
            cas_raw: None,
            cas_scanned: None,
            formula: None,
            un_number: None,
        }
    }

    /// Attach a validated CAS number.
    pub fn with_cas(mut self, cas: impl Into<String>) -> Self {
        self.cas = Some(cas.into());
        self
    }

    /// Attach the raw (unvalidated) CAS-column text.
    pub fn with_cas_raw(mut self, raw: impl Into<String>) -> Self {
        self.cas_raw = Some(raw.into());
        self
    }

    /// Attach a CAS recovered from scanning other columns.
    pub fn with_cas_scanned(mut self, cas: impl Into<String>) -> Self {
        self.cas_scanned = Some(cas.into());
        self
    }

    /// Attach a molecular formula.
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Attach a UN number.
    pub fn with_un_number(mut self, un: u32) -> Self {
        self.un_number = Some(un);
        self
    }
}

/// The input field a signal was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Cas,
    Name,
    Formula,
    Un,
}

impl SignalCategory {
    /// The strongest static weight any source in this category can carry.
    /// Used as the per-category contribution to the theoretical maximum.
    pub fn top_weight(self) -> f64 {
        match self {
            Self::Cas => SignalSource::CasExact.weight(),
            Self::Name => SignalSource::NameExact.weight(),
            Self::Formula => SignalSource::FormulaExact.weight(),
            Self::Un => SignalSource::UnExact.weight(),
        }
    }
}

/// Source tag for a matching signal. Each tag carries a fixed static weight
/// reflecting how much an exact hit from that source is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Validated CAS column matched the reference CAS index
    CasExact,
    /// CAS recovered from scanning other columns
    CasScanned,
    /// CAS pattern detected inside the name field (field swap)
    CasFromName,
    /// Case-insensitive exact name match
    NameExact,
    /// Case-insensitive exact synonym match
    SynonymExact,
    /// Match after stripping all non-alphanumerics
    NameNormalized,
    /// Name-shaped text found in the CAS column (field swap)
    NameInCas,
    /// Approximate name match
    NameFuzzy,
    /// Approximate synonym match
    SynonymFuzzy,
    /// Whitespace-normalized formula match
    FormulaExact,
    /// UN number matched the reference UN index
    UnExact,
}

impl SignalSource {
    /// Static trust weight for this source.
    pub fn weight(self) -> f64 {
        match self {
            Self::CasExact => 1.00,
            Self::CasScanned => 0.97,
            Self::NameExact => 0.95,
            Self::SynonymExact => 0.92,
            Self::CasFromName => 0.90,
            Self::NameNormalized => 0.88,
            Self::FormulaExact => 0.85,
            Self::NameInCas => 0.80,
            Self::UnExact => 0.80,
            Self::NameFuzzy => 0.70,
            Self::SynonymFuzzy => 0.65,
        }
    }

    /// The input field this source draws on.
    pub fn category(self) -> SignalCategory {
        match self {
            Self::CasExact | Self::CasScanned | Self::CasFromName => SignalCategory::Cas,
            Self::NameExact
            | Self::SynonymExact
            | Self::NameNormalized
            | Self::NameInCas
            | Self::NameFuzzy
            | Self::SynonymFuzzy => SignalCategory::Name,
            Self::FormulaExact => SignalCategory::Formula,
            Self::UnExact => SignalCategory::Un,
        }
    }

    /// Stable wire name, also used as the `match_method` of a result.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CasExact => "cas_exact",
            Self::CasScanned => "cas_scanned",
            Self::CasFromName => "cas_from_name",
            Self::NameExact => "name_exact",
            Self::SynonymExact => "synonym_exact",
            Self::NameNormalized => "name_normalized",
            Self::NameInCas => "name_in_cas",
            Self::NameFuzzy => "name_fuzzy",
            Self::SynonymFuzzy => "synonym_fuzzy",
            Self::FormulaExact => "formula_exact",
            Self::UnExact => "un_exact",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of matching evidence tying an input field to a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// The candidate this evidence points to
    pub chemical_id: ChemicalId,
    /// Candidate canonical name (denormalized for diagnostics)
    pub chemical_name: String,
    /// Where the evidence came from
    pub source: SignalSource,
    /// Raw strength in [0, 1] (1.0 for exact hits, ratio-derived for fuzzy)
    pub raw_score: f64,
    /// Static weight of the source, possibly discounted for variant records
    pub weight: f64,
    /// Human-readable explanation
    pub detail: String,
}

impl Signal {
    /// Create a signal carrying the source's full static weight.
    pub fn new(
        chemical_id: ChemicalId,
        chemical_name: impl Into<String>,
        source: SignalSource,
        raw_score: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            chemical_id,
            chemical_name: chemical_name.into(),
            source,
            raw_score,
            weight: source.weight(),
            detail: detail.into(),
        }
    }

    /// Apply a weight discount (variant records behind a shared CAS/UN key).
    pub fn discounted(mut self, factor: f64) -> Self {
        self.weight *= factor;
        self
    }

    /// Weighted contribution of this signal.
    pub fn weighted(&self) -> f64 {
        self.raw_score * self.weight
    }
}

/// Final status of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Confidence cleared the auto-accept threshold
    #[serde(rename = "MATCHED")]
    Matched,
    /// Plausible match that needs a human decision
    #[serde(rename = "REVIEW_REQUIRED")]
    ReviewRequired,
    /// No acceptable candidate (or the best candidate was vetoed)
    #[serde(rename = "UNIDENTIFIED")]
    Unidentified,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Matched => "MATCHED",
            Self::ReviewRequired => "REVIEW_REQUIRED",
            Self::Unidentified => "UNIDENTIFIED",
        };
        f.write_str(s)
    }
}

/// A ranked "did you mean" candidate for review UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub chemical_id: ChemicalId,
    pub chemical_name: String,
    /// Confidence or similarity score in [0, 1]
    pub score: f64,
}

/// Kind of a diagnostic conflict attached to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// CAS evidence and name evidence point to disjoint candidates
    CasNameMismatch,
    /// Formula evidence and name evidence point to disjoint candidates
    FormulaNameMismatch,
    /// A candidate was blocked by the safety veto engine
    SafetyVeto,
    /// The input was screened out before matching (flavoring, trade name, packaging)
    PreMatchScreen,
}

/// Cross-field disagreement or safety outcome, surfaced as data.
///
/// Conflicts never raise errors; they cap confidence and feed review queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub detail: String,
}

impl Conflict {
    pub fn new(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

/// Input data found in the wrong column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSwap {
    /// A checksum-valid CAS pattern was found inside the name field
    CasInName { cas: String },
    /// Name-shaped text was found in the CAS column
    NameInCas { text: String },
}

impl fmt::Display for FieldSwap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CasInName { cas } => write!(f, "CAS pattern '{cas}' found in name field"),
            Self::NameInCas { text } => write!(f, "name-shaped text '{text}' found in CAS field"),
        }
    }
}

/// Final resolution output for one cleaned inventory row.
///
/// Invariant: `chemical_id` is either `None` or an id that existed in the
/// reference index when the engine was constructed. The resolver re-verifies
/// this before returning and downgrades to [`MatchStatus::Unidentified`]
/// rather than surfacing an unknown id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub chemical_id: Option<ChemicalId>,
    pub chemical_name: Option<String>,
    /// Source tag of the decisive signal, or `"unmatched"`
    pub match_method: String,
    /// Calibrated confidence in [0, 1]
    pub confidence: f64,
    pub status: MatchStatus,
    /// Up to five ranked alternatives for review UIs
    pub suggestions: Vec<Suggestion>,
    /// All retained signals, for diagnostics
    pub signals: Vec<Signal>,
    /// Cross-field conflicts and veto outcomes
    pub conflicts: Vec<Conflict>,
    /// Misplaced-column notes
    pub field_swaps: Vec<FieldSwap>,
}

impl MatchResult {
    /// An empty, unidentified result.
    pub fn unidentified() -> Self {
        Self {
            chemical_id: None,
            chemical_name: None,
            match_method: "unmatched".to_string(),
            confidence: 0.0,
            status: MatchStatus::Unidentified,
            suggestions: Vec::new(),
            signals: Vec::new(),
            conflicts: Vec::new(),
            field_swaps: Vec::new(),
        }
    }

    /// Strip the identity, keeping diagnostics. Used when the final
    /// anti-hallucination check or a veto forces the row back to
    /// unidentified.
    pub fn downgrade(&mut self) {
        self.chemical_id = None;
        self.chemical_name = None;
        self.match_method = "unmatched".to_string();
        self.confidence = 0.0;
        self.status = MatchStatus::Unidentified;
    }
}
