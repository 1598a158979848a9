//! Veto behavior end-to-end: no scoring path may pair a benign input with a
//! hazardous reference chemical.

use chemresolve::{
    ChemicalId, ChemicalRecord, ChemicalResolver, CleanedInput, ConflictKind, MatchStatus,
};

fn reference() -> Vec<ChemicalRecord> {
    vec![
        ChemicalRecord::new(ChemicalId(1), "PHOSPHORUS, WHITE")
            .with_cas("12185-10-3")
            .with_un_number(1381),
        ChemicalRecord::new(ChemicalId(2), "AMMONIUM NITRATE-FUEL OIL MIXTURE")
            .with_un_number(3375),
        ChemicalRecord::new(ChemicalId(3), "SODIUM CYANIDE")
            .with_cas("143-33-9")
            .with_un_number(1689),
        ChemicalRecord::new(ChemicalId(4), "BEESWAX, WHITE").with_cas("8012-89-3"),
        ChemicalRecord::new(ChemicalId(5), "OLIVE OIL, REFINED").with_cas("8001-25-0"),
    ]
}

fn resolver() -> ChemicalResolver {
    ChemicalResolver::new(reference()).unwrap()
}

fn assert_vetoed(result: &chemresolve::MatchResult, hazardous: ChemicalId) {
    assert_eq!(result.status, MatchStatus::Unidentified);
    assert_eq!(result.chemical_id, None);
    assert!(result
        .conflicts
        .iter()
        .any(|c| c.kind == ConflictKind::SafetyVeto));
    assert!(!result
        .suggestions
        .iter()
        .any(|s| s.chemical_id == hazardous));
}

#[test]
fn test_veto_overrides_exact_cas() {
    // The CAS column points straight at white phosphorus, but the name says
    // this is a wax; the veto wins over the strongest possible signal
    let result = resolver().resolve(&CleanedInput::named("Candle Wax").with_cas("12185-10-3"));
    assert_vetoed(&result, ChemicalId(1));
}

#[test]
fn test_veto_overrides_un_number() {
    let result = resolver().resolve(&CleanedInput::named("Arachis Oil").with_un_number(3375));
    assert_vetoed(&result, ChemicalId(2));
    let veto = result
        .conflicts
        .iter()
        .find(|c| c.kind == ConflictKind::SafetyVeto)
        .unwrap();
    assert!(veto.detail.contains("EDIBLE OIL VETO"));
}

#[test]
fn test_fuzzy_similarity_cannot_beat_the_veto() {
    let result = resolver().resolve(&CleanedInput::named("White Wax"));
    assert_vetoed(&result, ChemicalId(1));
}

#[test]
fn test_pharma_input_never_matches_hazmat() {
    let result =
        resolver().resolve(&CleanedInput::named("Atorvastatin Calcium").with_cas("143-33-9"));
    assert_vetoed(&result, ChemicalId(3));
    let veto = result
        .conflicts
        .iter()
        .find(|c| c.kind == ConflictKind::SafetyVeto)
        .unwrap();
    assert!(veto.detail.contains("PHARMA VETO"));
}

#[test]
fn test_benign_wax_matches_benign_wax_record() {
    // The same input that is vetoed against phosphorus matches fine when a
    // legitimate wax record exists
    let result = resolver().resolve(&CleanedInput::named("Beeswax, White"));
    assert_eq!(result.chemical_id, Some(ChemicalId(4)));
    assert_ne!(result.status, MatchStatus::Unidentified);
}

#[test]
fn test_hazardous_input_matches_hazardous_record() {
    // Naming the hazard explicitly is a legitimate match, not a veto case
    let result = resolver().resolve(&CleanedInput::named("Sodium Cyanide").with_cas("143-33-9"));
    assert_eq!(result.status, MatchStatus::Matched);
    assert_eq!(result.chemical_id, Some(ChemicalId(3)));
    assert!(result
        .conflicts
        .iter()
        .all(|c| c.kind != ConflictKind::SafetyVeto));
}

#[test]
fn test_edible_oil_matches_edible_oil() {
    let result = resolver().resolve(&CleanedInput::named("Olive Oil, Refined"));
    assert_eq!(result.chemical_id, Some(ChemicalId(5)));
}

#[test]
fn test_veto_reason_names_both_sides() {
    let result = resolver().resolve(&CleanedInput::named("White Wax"));
    let veto = result
        .conflicts
        .iter()
        .find(|c| c.kind == ConflictKind::SafetyVeto)
        .unwrap();
    let detail = veto.detail.to_lowercase();
    assert!(detail.contains("wax"));
    assert!(detail.contains("phosphorus"));
}
