//! Engine-wide invariants checked over generated reference stores and
//! messy inputs. Seeds are fixed so failures reproduce.

use chemresolve::test_support::{messy_inputs, reference_store};
use chemresolve::{ChemicalResolver, CleanedInput, MatchStatus};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_resolved_ids_always_exist_in_the_reference() {
    init_tracing();
    let records = reference_store(150, 11);
    let resolver = ChemicalResolver::new(records.clone()).unwrap();
    let inputs = messy_inputs(&records, 12);

    for result in resolver.resolve_batch(&inputs) {
        if let Some(id) = result.chemical_id {
            assert!(resolver.index().contains(id), "unknown id {id} surfaced");
            assert_eq!(
                result.chemical_name.as_deref(),
                resolver.index().name_of(id),
                "name does not belong to {id}"
            );
        } else {
            assert_eq!(result.status, MatchStatus::Unidentified);
        }
    }
}

#[test]
fn test_confidence_and_suggestions_stay_bounded() {
    let records = reference_store(120, 21);
    let resolver = ChemicalResolver::new(records.clone()).unwrap();
    let inputs = messy_inputs(&records, 22);

    for result in resolver.resolve_batch(&inputs) {
        assert!(
            (0.0..=1.0).contains(&result.confidence),
            "confidence {} out of range",
            result.confidence
        );
        assert!(result.suggestions.len() <= 5);
        for suggestion in &result.suggestions {
            assert!((0.0..=1.0).contains(&suggestion.score));
            assert!(resolver.index().contains(suggestion.chemical_id));
        }
    }
}

#[test]
fn test_status_follows_confidence_thresholds() {
    let records = reference_store(120, 31);
    let resolver = ChemicalResolver::new(records.clone()).unwrap();
    let inputs = messy_inputs(&records, 32);

    for result in resolver.resolve_batch(&inputs) {
        match result.status {
            MatchStatus::Matched => {
                assert!(result.confidence >= 0.85);
                assert!(result.chemical_id.is_some());
            }
            MatchStatus::ReviewRequired => {
                assert!(result.confidence >= 0.60);
                assert!(result.confidence < 0.85);
                assert!(result.chemical_id.is_some());
            }
            MatchStatus::Unidentified => {
                assert_eq!(result.chemical_id, None);
                assert_eq!(result.chemical_name, None);
                assert_eq!(result.match_method, "unmatched");
            }
        }
    }
}

#[test]
fn test_batch_output_is_byte_identical_across_runs() {
    init_tracing();
    let records = reference_store(100, 41);
    let inputs = messy_inputs(&records, 42);

    let first = ChemicalResolver::new(records.clone()).unwrap();
    let second = ChemicalResolver::new(records).unwrap();

    let a = serde_json::to_string(&first.resolve_batch(&inputs)).unwrap();
    let b = serde_json::to_string(&second.resolve_batch(&inputs)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_exact_rows_resolve_to_their_own_record() {
    let records = reference_store(80, 51);
    let resolver = ChemicalResolver::new(records.clone()).unwrap();

    for record in &records {
        let result = resolver.resolve(&CleanedInput::named(record.name.clone()));
        assert_eq!(
            result.chemical_id,
            Some(record.id),
            "exact name '{}' resolved elsewhere",
            record.name
        );
        assert_eq!(result.status, MatchStatus::Matched);
        assert_eq!(result.match_method, "name_exact");
    }
}

#[test]
fn test_cas_only_rows_resolve_to_a_record_carrying_that_cas() {
    let records = reference_store(80, 61);
    let resolver = ChemicalResolver::new(records.clone()).unwrap();

    for record in &records {
        let Some(cas) = record.cas_numbers.first() else {
            continue;
        };
        let result = resolver.resolve(&CleanedInput::named("").with_cas(cas.clone()));
        let id = result.chemical_id.expect("valid CAS must resolve");
        let resolved = resolver.index().record(id).unwrap();
        assert!(
            resolved.cas_numbers.contains(cas),
            "CAS {cas} resolved to a record without it"
        );
    }
}

#[test]
fn test_cas_embedded_in_name_is_flagged_as_swap() {
    let records = reference_store(60, 71);
    let resolver = ChemicalResolver::new(records.clone()).unwrap();

    let record = &records[0];
    let cas = record.cas_numbers.first().unwrap();
    let result = resolver.resolve(&CleanedInput::named(format!("unlabeled drum {cas}")));
    assert!(!result.field_swaps.is_empty());
    if let Some(id) = result.chemical_id {
        let resolved = resolver.index().record(id).unwrap();
        assert!(resolved.cas_numbers.contains(cas));
    }
}

#[test]
fn test_empty_input_is_unidentified_not_an_error() {
    let records = reference_store(10, 81);
    let resolver = ChemicalResolver::new(records).unwrap();

    let result = resolver.resolve(&CleanedInput::named(""));
    assert_eq!(result.status, MatchStatus::Unidentified);
    assert!(result.signals.is_empty());
}
