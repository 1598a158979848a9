//! # Token Semantic Classifier
//!
//! Assigns each token of a chemical name a semantic role so matching can
//! separate the true chemical identity (BASE) from counter-ions (SALT),
//! physical forms, quality grades, concentrations, benign context (SAFETY)
//! and hazard markers. The role sets are data, not code: a versioned
//! lexicon embedded at build time and deserialized at startup, so new
//! tokens can be added without touching the classifier.
//!
//! Classification is fail-safe: an unknown token defaults to BASE, which
//! preserves matching; nothing here ever returns an error for bad input.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Concentration tokens: `39%`, `50mg/ml`, `5ppm`, ...
static CONC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[\d.,]+\s*(%|mg/ml|mg/l|g/l|ppm|ppb|w/w|v/v|w/v|mol/l|m|mm|µm)$")
        .expect("valid concentration regex")
});

/// Pure numbers are noise.
static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d.,]+$").expect("valid number regex"));

/// EU food-additive codes (E100-E1599) are identities, not noise.
static E_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^e\d{3,4}[a-z]?$").expect("valid E-number regex"));

/// Separators replaced by spaces before tokenizing.
static PUNCT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;:]+").expect("valid punctuation regex"));

/// Everything outside word chars, %, ., /, - is dropped.
static NON_TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s%./\-]").expect("valid token regex"));

/// Splitter for loose word-set membership checks.
static WORD_SPLIT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,;:()/\-]+").expect("valid word-split regex"));

static EMBEDDED_LEXICON: Lazy<Lexicon> = Lazy::new(|| {
    serde_json::from_str(include_str!("lexicon.json")).expect("embedded lexicon parses")
});

/// Semantic role of one token in a chemical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenRole {
    /// The core active ingredient (default for unknown tokens)
    Base,
    /// Counter-ion or salt form
    Salt,
    /// Physical form descriptor
    Form,
    /// Quality/standard descriptor
    Grade,
    /// Concentration or percentage
    Conc,
    /// Benign context indicator
    Safety,
    /// Known hazardous-substance marker
    Hazard,
    /// Numbers, articles, colors, other irrelevant tokens
    Noise,
}

impl fmt::Display for TokenRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Base => "BASE",
            Self::Salt => "SALT",
            Self::Form => "FORM",
            Self::Grade => "GRADE",
            Self::Conc => "CONC",
            Self::Safety => "SAFETY",
            Self::Hazard => "HAZARD",
            Self::Noise => "NOISE",
        };
        f.write_str(s)
    }
}

/// One classified token from a chemical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedToken {
    /// Original text as written
    pub text: String,
    /// Lowercased text used for set membership
    pub normalized: String,
    pub role: TokenRole,
}

/// Outcome of the pre-match material screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialScreen {
    /// Why this material cannot resolve to a reference chemical
    pub reason: String,
    /// Generic chemical name to match instead, when a trade name has one
    pub replacement: Option<String>,
}

/// Versioned token-role lookup sets, loaded from embedded JSON at startup.
///
/// Extension happens by editing the data file, not the classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    pub version: u32,
    noise_words: FxHashSet<String>,
    grade_tokens: FxHashSet<String>,
    form_tokens: FxHashSet<String>,
    salt_tokens: FxHashSet<String>,
    safety_tokens: FxHashSet<String>,
    hazard_tokens: FxHashSet<String>,
    dangerous_salt_tokens: FxHashSet<String>,
    dangerous_name_patterns: Vec<String>,
    pharma_suffixes: Vec<String>,
    flavor_keywords: FxHashSet<String>,
    packaging_patterns: Vec<String>,
    trade_names: FxHashMap<String, Option<String>>,
    edible_oil_contexts: FxHashSet<String>,
    non_chemical_words: FxHashSet<String>,
}

impl Lexicon {
    /// The lexicon compiled into the crate.
    pub fn embedded() -> &'static Lexicon {
        &EMBEDDED_LEXICON
    }

    /// Load an external lexicon (same schema) for deployments that extend
    /// the token sets without recompiling.
    pub fn from_json(json: &str) -> anyhow::Result<Lexicon> {
        Ok(serde_json::from_str(json)?)
    }

    /// Classify a single token. Rules apply in strict priority order;
    /// the first match wins and unknown tokens default to BASE.
    pub fn classify_token(&self, word: &str) -> TokenRole {
        let w = word.trim().to_lowercase();
        if w.is_empty() {
            return TokenRole::Noise;
        }
        if CONC_PATTERN.is_match(&w) {
            return TokenRole::Conc;
        }
        if NUMBER_PATTERN.is_match(&w) || w.chars().count() <= 1 || self.noise_words.contains(&w) {
            return TokenRole::Noise;
        }
        // E-numbers ARE the identity (E330 = citric acid)
        if E_NUMBER_PATTERN.is_match(&w) {
            return TokenRole::Base;
        }
        if self.grade_tokens.contains(&w) {
            return TokenRole::Grade;
        }
        if self.form_tokens.contains(&w) {
            return TokenRole::Form;
        }
        if self.salt_tokens.contains(&w) {
            return TokenRole::Salt;
        }
        if self.safety_tokens.contains(&w) {
            return TokenRole::Safety;
        }
        if self.hazard_tokens.contains(&w) {
            return TokenRole::Hazard;
        }
        TokenRole::Base
    }

    /// Tokenize a chemical name and classify every token, preserving order.
    pub fn classify_name(&self, name: &str) -> Vec<ClassifiedToken> {
        if name.trim().is_empty() {
            return Vec::new();
        }
        let spaced = PUNCT_PATTERN.replace_all(name, " ");
        let cleaned = NON_TOKEN_PATTERN.replace_all(&spaced, " ");

        cleaned
            .split_whitespace()
            .filter_map(|t| {
                let trimmed = t.trim_matches(|c| c == '-' || c == '.');
                if trimmed.is_empty() {
                    return None;
                }
                Some(ClassifiedToken {
                    text: trimmed.to_string(),
                    normalized: trimmed.to_lowercase(),
                    role: self.classify_token(trimmed),
                })
            })
            .collect()
    }

    /// Whether a SALT-role token is hazard-equivalent (cyanide, azide, ...).
    pub fn is_dangerous_salt(&self, normalized: &str) -> bool {
        self.dangerous_salt_tokens.contains(normalized)
    }

    /// Whether the input carries benign/safety context tokens.
    pub fn has_safety_context(&self, tokens: &[ClassifiedToken]) -> bool {
        tokens.iter().any(|t| t.role == TokenRole::Safety)
    }

    /// Collect hazard indicators from a candidate: HAZARD-role tokens,
    /// dangerous SALT tokens, and multi-word dangerous patterns matched
    /// against the full candidate string.
    pub fn hazard_labels(&self, tokens: &[ClassifiedToken], full_name: &str) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for t in tokens {
            match t.role {
                TokenRole::Hazard => labels.push(t.text.clone()),
                TokenRole::Salt if self.is_dangerous_salt(&t.normalized) => {
                    labels.push(t.text.clone())
                }
                _ => {}
            }
        }
        let name_lower = full_name.to_lowercase();
        for pattern in &self.dangerous_name_patterns {
            if name_lower.contains(pattern.as_str())
                && !labels.iter().any(|l| l.eq_ignore_ascii_case(pattern))
            {
                labels.push(pattern.clone());
            }
        }
        labels
    }

    /// Whether a candidate name contains any hazard marker.
    pub fn has_hazard_markers(&self, tokens: &[ClassifiedToken], full_name: &str) -> bool {
        !self.hazard_labels(tokens, full_name).is_empty()
    }

    /// Detect pharmaceutical drug names by INN stem suffix.
    pub fn is_pharma_name(&self, token: &str) -> bool {
        let lower = token.trim().to_lowercase();
        self.pharma_suffixes
            .iter()
            .any(|suffix| lower.ends_with(suffix.as_str()))
    }

    /// Whether a name containing "oil" refers to an edible oil
    /// (olive, soybean, ...) rather than a fuel or industrial oil.
    pub fn is_edible_oil_context(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if !lower.contains("oil") {
            return false;
        }
        WORD_SPLIT_PATTERN
            .split(&lower)
            .any(|w| self.edible_oil_contexts.contains(w))
    }

    /// Pre-match screen: materials that can never resolve to a reference
    /// chemical (flavorings, packaging, trade names) are routed to
    /// UNIDENTIFIED before signal generation. Trade names with a known
    /// generic equivalent return a replacement name to match instead.
    pub fn screen_material(&self, name: &str) -> Option<MaterialScreen> {
        let lower = name.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }

        // Flavoring agents: token or substring hit (catches misspellings
        // and parenthesized content)
        let words: FxHashSet<&str> = WORD_SPLIT_PATTERN.split(&lower).collect();
        let flavor_hit = self.flavor_keywords.iter().any(|kw| words.contains(kw.as_str()))
            || self.flavor_keywords.iter().any(|kw| lower.contains(kw.as_str()));
        if flavor_hit {
            return Some(MaterialScreen {
                reason: "food flavoring agent, not a reference chemical".to_string(),
                replacement: None,
            });
        }

        for pattern in &self.packaging_patterns {
            if lower.contains(pattern.as_str()) {
                return Some(MaterialScreen {
                    reason: format!("packaging material '{pattern}'"),
                    replacement: None,
                });
            }
        }

        for (trade, generic) in &self.trade_names {
            if lower.contains(trade.as_str()) {
                return Some(MaterialScreen {
                    reason: format!("trade name '{trade}', not a standard chemical name"),
                    replacement: generic.clone(),
                });
            }
        }

        if self.non_chemical_words.contains(lower.as_str()) {
            return Some(MaterialScreen {
                reason: "non-chemical auxiliary material".to_string(),
                replacement: None,
            });
        }

        None
    }
}

/// BASE tokens of a classified name, as a sorted set.
pub fn base_tokens(tokens: &[ClassifiedToken]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter(|t| t.role == TokenRole::Base)
        .map(|t| t.normalized.clone())
        .collect()
}

/// SALT tokens of a classified name, as a sorted set.
pub fn salt_tokens(tokens: &[ClassifiedToken]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter(|t| t.role == TokenRole::Salt)
        .map(|t| t.normalized.clone())
        .collect()
}

/// CONC tokens of a classified name, as a sorted set.
pub fn conc_tokens(tokens: &[ClassifiedToken]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter(|t| t.role == TokenRole::Conc)
        .map(|t| t.normalized.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> &'static Lexicon {
        Lexicon::embedded()
    }

    #[test]
    fn test_embedded_lexicon_loads() {
        assert_eq!(lex().version, 1);
    }

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(lex().classify_token("39%"), TokenRole::Conc);
        assert_eq!(lex().classify_token("50mg/ml"), TokenRole::Conc);
        assert_eq!(lex().classify_token("1234"), TokenRole::Noise);
        assert_eq!(lex().classify_token("x"), TokenRole::Noise);
        assert_eq!(lex().classify_token("the"), TokenRole::Noise);
        assert_eq!(lex().classify_token("USP"), TokenRole::Grade);
        assert_eq!(lex().classify_token("powder"), TokenRole::Form);
        assert_eq!(lex().classify_token("sodium"), TokenRole::Salt);
        assert_eq!(lex().classify_token("wax"), TokenRole::Safety);
        assert_eq!(lex().classify_token("phosphorus"), TokenRole::Hazard);
        assert_eq!(lex().classify_token("gluconate"), TokenRole::Salt);
        assert_eq!(lex().classify_token("atorvastatin"), TokenRole::Base);
    }

    #[test]
    fn test_e_numbers_are_base() {
        assert_eq!(lex().classify_token("E330"), TokenRole::Base);
        assert_eq!(lex().classify_token("e1510"), TokenRole::Base);
    }

    #[test]
    fn test_grade_beats_form_for_shared_tokens() {
        // "raw" is in both sets; grade wins by priority
        assert_eq!(lex().classify_token("raw"), TokenRole::Grade);
    }

    #[test]
    fn test_classify_name_preserves_order() {
        let tokens = lex().classify_name("Zinc Gluconate Powder USP 39%");
        let roles: Vec<TokenRole> = tokens.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                TokenRole::Salt,
                TokenRole::Salt,
                TokenRole::Form,
                TokenRole::Grade,
                TokenRole::Conc
            ]
        );
    }

    #[test]
    fn test_classify_name_strips_punctuation() {
        let tokens = lex().classify_name("PHOSPHORUS, WHITE");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].role, TokenRole::Hazard);
        assert_eq!(tokens[1].role, TokenRole::Noise); // colors are noise
    }

    #[test]
    fn test_base_and_salt_extraction() {
        let tokens = lex().classify_name("Atorvastatin Calcium Tablets");
        assert!(base_tokens(&tokens).contains("atorvastatin"));
        assert!(salt_tokens(&tokens).contains("calcium"));
    }

    #[test]
    fn test_hazard_labels_three_layers() {
        // HAZARD role
        let tokens = lex().classify_name("white phosphorus");
        assert!(lex().has_hazard_markers(&tokens, "white phosphorus"));

        // Dangerous SALT token stays SALT but counts as hazard
        let tokens = lex().classify_name("potassium cyanide");
        assert_eq!(tokens[1].role, TokenRole::Salt);
        assert!(lex().has_hazard_markers(&tokens, "potassium cyanide"));

        // Multi-word pattern against the full name
        let tokens = lex().classify_name("AMMONIUM NITRATE-FUEL OIL MIXTURE");
        assert!(lex().has_hazard_markers(&tokens, "AMMONIUM NITRATE-FUEL OIL MIXTURE"));

        // Benign candidate has no markers
        let tokens = lex().classify_name("zinc gluconate");
        assert!(!lex().has_hazard_markers(&tokens, "zinc gluconate"));
    }

    #[test]
    fn test_pharma_stems() {
        assert!(lex().is_pharma_name("atorvastatin"));
        assert!(lex().is_pharma_name("Omeprazole"));
        assert!(lex().is_pharma_name("adalimumab"));
        assert!(!lex().is_pharma_name("acetone"));
    }

    #[test]
    fn test_edible_oil_context() {
        assert!(lex().is_edible_oil_context("Arachis Oil"));
        assert!(lex().is_edible_oil_context("extra virgin olive oil"));
        assert!(!lex().is_edible_oil_context("fuel oil no. 2"));
        assert!(!lex().is_edible_oil_context("olive paste"));
    }

    #[test]
    fn test_material_screen() {
        let screen = lex().screen_material("Caramel(Toffee Flavore)").unwrap();
        assert!(screen.reason.contains("flavoring"));

        let screen = lex().screen_material("Empty Gelatin Capsule Size 0").unwrap();
        assert!(screen.reason.contains("packaging"));

        // Trade name with a generic equivalent offers a replacement
        let screen = lex().screen_material("Avicel PH-102").unwrap();
        assert_eq!(
            screen.replacement.as_deref(),
            Some("microcrystalline cellulose")
        );

        // Trade name without one does not
        let screen = lex().screen_material("Coatafilm Brown").unwrap();
        assert_eq!(screen.replacement, None);

        assert!(lex().screen_material("Acetone").is_none());
    }
}
