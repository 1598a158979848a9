//! # Test Support
//!
//! Deterministic generators for reference stores and messy inventory rows.
//! Everything is seeded so failures reproduce exactly.

use crate::model::{ChemicalId, ChemicalRecord, CleanedInput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASES: &[&str] = &[
    "ACETONE", "BENZENE", "TOLUENE", "METHANOL", "ETHANOL", "GLYCEROL", "PHENOL", "ANILINE",
    "HEXANE", "HEPTANE", "XYLENE", "ACETONITRILE", "CHLOROFORM", "FORMALDEHYDE", "UREA",
    "GLUCOSE", "FRUCTOSE", "SUCROSE", "CAFFEINE", "ASPIRIN",
];

const SALT_PAIRS: &[(&str, &str)] = &[
    ("SODIUM", "CHLORIDE"),
    ("POTASSIUM", "CARBONATE"),
    ("CALCIUM", "SULFATE"),
    ("MAGNESIUM", "OXIDE"),
    ("ZINC", "GLUCONATE"),
    ("AMMONIUM", "ACETATE"),
    ("FERROUS", "SULFATE"),
    ("LITHIUM", "CITRATE"),
];

const GRADES: &[&str] = &["USP", "BP", "ACS", "TECHNICAL", "REAGENT"];
const FORMS: &[&str] = &["POWDER", "GRANULES", "SOLUTION", "CRYSTALS", "PELLETS"];

/// Synthesize a checksum-valid CAS number.
pub fn synth_cas(rng: &mut StdRng) -> String {
    let body_len = rng.random_range(2..=7usize);
    let mut body = String::new();
    for i in 0..body_len {
        let lo = if i == 0 { 1 } else { 0 };
        body.push(char::from_digit(rng.random_range(lo..10u32), 10).unwrap());
    }
    let middle = format!("{:02}", rng.random_range(0..100u32));

    let digits: Vec<u32> = body
        .chars()
        .chain(middle.chars())
        .filter_map(|c| c.to_digit(10))
        .collect();
    let check: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| (i as u32 + 1) * d)
        .sum::<u32>()
        % 10;

    format!("{body}-{middle}-{check}")
}

/// A deterministic reference store of `count` records with distinct names,
/// CAS numbers and occasional synonyms, formulas and UN numbers.
pub fn reference_store(count: usize, seed: u64) -> Vec<ChemicalRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(count);

    for i in 0..count {
        let name = if rng.random_bool(0.6) {
            let base = BASES[rng.random_range(0..BASES.len())];
            if i < BASES.len() {
                base.to_string()
            } else {
                format!("{base}, {} GRADE", GRADES[rng.random_range(0..GRADES.len())])
            }
        } else {
            let (cation, anion) = SALT_PAIRS[rng.random_range(0..SALT_PAIRS.len())];
            format!("{cation} {anion} {}", i)
        };

        let mut record =
            ChemicalRecord::new(ChemicalId(i as u32), format!("{name} #{i}")).with_cas(synth_cas(&mut rng));
        if rng.random_bool(0.3) {
            record = record.with_synonym(format!("SYN-{i}"));
        }
        if rng.random_bool(0.3) {
            record = record.with_formula(format!("C{}H{}O", i % 9 + 1, i % 19 + 1));
        }
        if rng.random_bool(0.2) {
            record = record.with_un_number(1000 + (i as u32 % 3000));
        }
        records.push(record);
    }

    records
}

/// Swap two adjacent characters, a common transcription error.
pub fn typo(name: &str, rng: &mut StdRng) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() < 4 {
        return name.to_string();
    }
    let i = rng.random_range(1..chars.len() - 1);
    let mut out = chars.clone();
    out.swap(i, i + 1);
    out.into_iter().collect()
}

/// Messy inventory rows derived from a reference store: case changes,
/// appended form tokens, typos, and the occasional swapped column.
pub fn messy_inputs(records: &[ChemicalRecord], seed: u64) -> Vec<CleanedInput> {
    let mut rng = StdRng::seed_from_u64(seed);
    records
        .iter()
        .map(|record| {
            let mut name = match rng.random_range(0..4u8) {
                0 => record.name.to_lowercase(),
                1 => format!(
                    "{} {}",
                    record.name,
                    FORMS[rng.random_range(0..FORMS.len())]
                ),
                2 => typo(&record.name, &mut rng),
                _ => record.name.clone(),
            };

            let mut input = CleanedInput::named(name.clone());
            if let Some(cas) = record.cas_numbers.first() {
                if rng.random_bool(0.1) {
                    // Swapped columns: CAS lands in the name
                    name = format!("{name} {cas}");
                    input = CleanedInput::named(name);
                } else if rng.random_bool(0.7) {
                    input = input.with_cas(cas.clone());
                }
            }
            if rng.random_bool(0.2) {
                if let Some(formula) = record.formulas.first() {
                    input = input.with_formula(formula.clone());
                }
            }
            input
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::validate_cas;

    #[test]
    fn test_synth_cas_is_checksum_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let cas = synth_cas(&mut rng);
            assert!(validate_cas(&cas).is_ok(), "invalid synthetic CAS: {cas}");
        }
    }

    #[test]
    fn test_generators_are_deterministic() {
        let a = reference_store(50, 42);
        let b = reference_store(50, 42);
        assert_eq!(a, b);
        assert_eq!(messy_inputs(&a, 9), messy_inputs(&b, 9));
    }

    #[test]
    fn test_store_names_are_distinct() {
        let records = reference_store(100, 3);
        let mut names: Vec<&String> = records.iter().map(|r| &r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), records.len());
    }
}
